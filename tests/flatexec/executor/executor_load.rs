use anyhow::Result;
use flatexec::program;
use flatexec::{
    ChainBuilder, Error, Executor, ExecutorConfig, OperatorRegistry, Program, ProgramBuilder,
    ScalarType, StorageId,
};

use crate::common;

fn executor<'p>(
    program: &'p Program,
    activations: &'p mut [u8],
    registry: &'p OperatorRegistry,
) -> Result<Executor<'p>> {
    let memory = common::memory(activations)?;
    Ok(Executor::with_config(
        program,
        memory,
        registry,
        ExecutorConfig::default(),
    ))
}

fn tensor_mut(program: &mut Program, value: usize) -> &mut program::Tensor {
    match &mut program.execution_plans[0].values[value] {
        program::EValue::Tensor(tensor) => tensor,
        other => panic!("expected tensor, got {:?}", other),
    }
}

#[test]
fn load_resolves_values_and_kernels() -> Result<()> {
    let (program, idx) = common::mul_add_program()?;
    let registry = OperatorRegistry::with_builtins()?;
    let mut activations = vec![0u8; idx.activation_bytes];
    let mut executor = executor(&program, &mut activations, &registry)?;

    assert!(!executor.is_loaded());
    executor.init_execution_plan(0)?;
    assert!(executor.is_loaded());

    let plan = executor.plan()?;
    assert_eq!(plan.num_values(), 6);
    assert_eq!(plan.inputs(), &[idx.x]);
    assert_eq!(plan.outputs(), &[idx.y]);

    let b = plan.values()[idx.b].as_tensor()?;
    assert_eq!(b.dtype(), ScalarType::Int);
    assert_eq!(b.dim(), 2);
    assert!(b.is_constant());
    assert_eq!(b.elements::<i32>()?.get(3), 8);
    assert_eq!(plan.values()[idx.c].to_int()?, 1);

    assert_eq!(plan.num_chains(), 1);
    let chain = &plan.chains()[0];
    assert_eq!(chain.kernels().len(), 2);
    assert_eq!(chain.kernels()[0].num_args(), 3);
    assert_eq!(chain.kernels()[0].op_index(), 0);
    assert_eq!(chain.kernels()[1].args(), &[idx.z, idx.b, idx.c, idx.y]);
    assert_eq!(plan.operators()[1].name, "add_out");
    assert_eq!(plan.num_instructions(), 2);
    Ok(())
}

#[test]
fn storage_points_into_lent_buffers() -> Result<()> {
    let (program, idx) = common::mul_add_program()?;
    let registry = OperatorRegistry::with_builtins()?;
    let mut activations = vec![0u8; idx.activation_bytes];
    let base = activations.as_ptr() as usize;
    let constants = program.constant_buffer.as_ptr() as usize;
    let mut executor = executor(&program, &mut activations, &registry)?;
    executor.init_execution_plan(0)?;
    let plan = executor.plan()?;

    let addr = |value: usize| -> Result<usize> {
        Ok(plan.values()[value].as_tensor()?.storage().addr())
    };
    assert_eq!(addr(idx.a)?, constants);
    assert_eq!(addr(idx.b)?, constants + 16);
    assert_eq!(addr(idx.x)?, base);
    assert_eq!(addr(idx.y)?, base + 16);
    assert_eq!(addr(idx.z)?, base + 32);
    Ok(())
}

#[test]
fn load_is_deterministic() -> Result<()> {
    let (program, idx) = common::mul_add_program()?;
    let registry = OperatorRegistry::with_builtins()?;
    let mut first = vec![0u8; idx.activation_bytes];
    let mut second = vec![0u8; idx.activation_bytes];
    let mut one = executor(&program, &mut first, &registry)?;
    let mut two = executor(&program, &mut second, &registry)?;
    one.init_execution_plan(0)?;
    two.init_execution_plan(0)?;

    for value in [idx.a, idx.b, idx.x, idx.y, idx.z] {
        let lhs = one.plan()?.values()[value].as_tensor()?.storage().offset();
        let rhs = two.plan()?.values()[value].as_tensor()?.storage().offset();
        assert_eq!(lhs, rhs, "value {}", value);
    }
    Ok(())
}

#[test]
fn plan_index_out_of_range_leaves_pools_untouched() -> Result<()> {
    let (program, idx) = common::mul_add_program()?;
    let registry = OperatorRegistry::with_builtins()?;
    let mut activations = vec![0xabu8; idx.activation_bytes];
    {
        let mut executor = executor(&program, &mut activations, &registry)?;
        let err = executor.init_execution_plan(1).unwrap_err();
        assert!(matches!(
            err,
            Error::PlanIndexOutOfRange { index: 1, count: 1 }
        ));
        assert!(!executor.is_loaded());
        assert!(matches!(
            executor.init_execution_plan(0),
            Err(Error::InvalidState {
                expected: "unloaded",
                found: "failed"
            })
        ));
    }
    assert!(activations.iter().all(|byte| *byte == 0xab));
    Ok(())
}

#[test]
fn missing_operator_is_named() -> Result<()> {
    let (program, idx) = common::mul_add_program()?;
    let mut registry = OperatorRegistry::new();
    registry.register("mul_out", flatexec::ops::mul_out)?;
    let mut activations = vec![0u8; idx.activation_bytes];
    let mut executor = executor(&program, &mut activations, &registry)?;
    let err = executor.init_execution_plan(0).unwrap_err();
    assert!(matches!(err, Error::OperatorNotFound { ref name } if name == "add_out"));
    assert!(matches!(executor.execute(), Err(Error::InvalidState { .. })));
    Ok(())
}

#[test]
fn undersized_pool_rejected() -> Result<()> {
    let (program, idx) = common::mul_add_program()?;
    let registry = OperatorRegistry::with_builtins()?;
    let mut activations = vec![0u8; idx.activation_bytes - 8];
    let mut executor = executor(&program, &mut activations, &registry)?;
    assert!(matches!(
        executor.init_execution_plan(0),
        Err(Error::PoolOutOfBounds {
            pool: 1,
            offset: 32,
            nbytes: 16,
            capacity: 40
        })
    ));
    Ok(())
}

#[test]
fn unknown_pool_rejected() -> Result<()> {
    let (mut program, idx) = common::mul_add_program()?;
    tensor_mut(&mut program, idx.z).mem_id = 3;
    let registry = OperatorRegistry::with_builtins()?;
    let mut activations = vec![0u8; idx.activation_bytes];
    let mut executor = executor(&program, &mut activations, &registry)?;
    assert!(matches!(
        executor.init_execution_plan(0),
        Err(Error::UnknownPool { pool: 3 })
    ));
    Ok(())
}

#[test]
fn unknown_dtype_rejected() -> Result<()> {
    let (mut program, idx) = common::mul_add_program()?;
    tensor_mut(&mut program, idx.x).dtype = 9;
    let registry = OperatorRegistry::with_builtins()?;
    let mut activations = vec![0u8; idx.activation_bytes];
    let mut executor = executor(&program, &mut activations, &registry)?;
    assert!(matches!(
        executor.init_execution_plan(0),
        Err(Error::UnknownDType(9))
    ));
    Ok(())
}

#[test]
fn negative_offset_rejected() -> Result<()> {
    let (mut program, idx) = common::mul_add_program()?;
    tensor_mut(&mut program, idx.y).mem_offset = -4;
    let registry = OperatorRegistry::with_builtins()?;
    let mut activations = vec![0u8; idx.activation_bytes];
    let mut executor = executor(&program, &mut activations, &registry)?;
    assert!(matches!(
        executor.init_execution_plan(0),
        Err(Error::InvalidProgram(_))
    ));
    Ok(())
}

#[test]
fn kernel_argument_out_of_range_rejected() -> Result<()> {
    let (mut program, idx) = common::mul_add_program()?;
    program.execution_plans[0].chains[0].kernels[1].args[2] = 6;
    let registry = OperatorRegistry::with_builtins()?;
    let mut activations = vec![0u8; idx.activation_bytes];
    let mut executor = executor(&program, &mut activations, &registry)?;
    assert!(matches!(
        executor.init_execution_plan(0),
        Err(Error::IndexOutOfRange {
            what: "kernel argument",
            index: 6,
            len: 6
        })
    ));
    Ok(())
}

#[test]
fn instruction_kernel_index_checked() -> Result<()> {
    let (mut program, idx) = common::mul_add_program()?;
    program.execution_plans[0].chains[0].instructions[1].kernel_index = 2;
    let registry = OperatorRegistry::with_builtins()?;
    let mut activations = vec![0u8; idx.activation_bytes];
    let mut executor = executor(&program, &mut activations, &registry)?;
    assert!(matches!(
        executor.init_execution_plan(0),
        Err(Error::IndexOutOfRange { what: "kernel", .. })
    ));
    Ok(())
}

#[test]
fn constant_chain_input_rejected() -> Result<()> {
    let mut builder = ProgramBuilder::new();
    let mut plan = builder.plan();
    let a = plan.add_constant_from(StorageId(1), &[2], &[1i32, 2])?;
    let out = plan.add_activation(ScalarType::Int, &[2])?;
    let mul = plan.add_operator("mul_out");
    plan.add_chain(
        ChainBuilder::new()
            .inputs(&[a])
            .outputs(&[out])
            .call(mul, &[a, a, out]),
    )?;
    let activation_bytes = plan.activation_bytes();
    plan.finish();
    let program = builder.build();

    let registry = OperatorRegistry::with_builtins()?;
    let mut activations = vec![0u8; activation_bytes];
    let mut executor = executor(&program, &mut activations, &registry)?;
    assert!(matches!(
        executor.init_execution_plan(0),
        Err(Error::InvalidProgram(_))
    ));
    Ok(())
}

#[test]
fn second_load_rejected() -> Result<()> {
    let (program, idx) = common::mul_add_program()?;
    let registry = OperatorRegistry::with_builtins()?;
    let mut activations = vec![0u8; idx.activation_bytes];
    let mut executor = executor(&program, &mut activations, &registry)?;
    executor.init_execution_plan(0)?;
    assert!(matches!(
        executor.init_execution_plan(0),
        Err(Error::InvalidState {
            expected: "unloaded",
            found: "loaded"
        })
    ));
    assert!(executor.is_loaded());
    Ok(())
}

#[test]
fn accessors_before_load_fail() -> Result<()> {
    let (program, idx) = common::mul_add_program()?;
    let registry = OperatorRegistry::with_builtins()?;
    let mut activations = vec![0u8; idx.activation_bytes];
    let mut executor = executor(&program, &mut activations, &registry)?;
    assert!(matches!(
        executor.execute(),
        Err(Error::InvalidState {
            expected: "loaded",
            found: "unloaded"
        })
    ));
    assert!(executor.input(0).is_err());
    assert!(executor.plan().is_err());
    Ok(())
}

#[test]
fn load_from_container_bytes() -> Result<()> {
    let (original, idx) = common::mul_add_program()?;
    let program = Program::from_bytes(&original.to_bytes()?)?;
    let registry = OperatorRegistry::with_builtins()?;
    let mut activations = vec![0u8; idx.activation_bytes];
    let mut executor = executor(&program, &mut activations, &registry)?;
    executor.init_execution_plan(0)?;
    let a = executor.plan()?.values()[idx.a].as_tensor()?;
    assert_eq!(a.to_vec::<i32>()?, common::A_DATA.to_vec());
    Ok(())
}
