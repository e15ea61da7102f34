//! Plan loading: every name and address in a serialized plan is resolved
//! here, once. Nothing is written into any pool.
use crate::error::{Error, Result};
use crate::memory::{MemoryManager, CONSTANT_POOL};
use crate::program::{self, Program};
use crate::registry::OperatorRegistry;
use crate::value::{byte_len, EValue, ScalarType, Tensor};

use super::plan::{BoundOperator, Chain, Instruction, Kernel, LoadedPlan};

pub(crate) fn load_plan<'p>(
    program: &'p Program,
    plan_index: usize,
    memory: &mut MemoryManager<'p>,
    registry: &OperatorRegistry,
) -> Result<LoadedPlan<'p>> {
    let serialized = program
        .plan(plan_index)
        .ok_or(Error::PlanIndexOutOfRange {
            index: plan_index,
            count: program.num_plans(),
        })?;

    memory.bind_constant(&program.constant_buffer);
    let memory: &MemoryManager<'p> = memory;

    let values = serialized
        .values
        .iter()
        .enumerate()
        .map(|(idx, value)| load_value(idx, value, memory))
        .collect::<Result<Vec<_>>>()?;

    let operators = serialized
        .operators
        .iter()
        .map(|op| bind_operator(op, registry))
        .collect::<Result<Vec<_>>>()?;

    let chains = serialized
        .chains
        .iter()
        .map(|chain| load_chain(chain, &values, &operators))
        .collect::<Result<Vec<_>>>()?;

    let inputs = boundary_indices(&serialized.inputs, "plan input", &values)?;
    let outputs = boundary_indices(&serialized.outputs, "plan output", &values)?;

    crate::trace!(
        "loaded plan {}: {} values, {} operators, {} chains",
        plan_index,
        values.len(),
        operators.len(),
        chains.len()
    );

    Ok(LoadedPlan {
        values,
        inputs,
        outputs,
        chains,
        operators,
    })
}

fn load_value<'p>(
    idx: usize,
    value: &program::EValue,
    memory: &MemoryManager<'p>,
) -> Result<EValue<'p>> {
    Ok(match value {
        program::EValue::None => EValue::None,
        program::EValue::Int(v) => EValue::Int(*v),
        program::EValue::Double(v) => EValue::Double(*v),
        program::EValue::Bool(v) => EValue::Bool(*v),
        program::EValue::Tensor(tensor) => EValue::Tensor(
            load_tensor(tensor, memory).map_err(|err| {
                crate::error!("value {}: {}", idx, err);
                err
            })?,
        ),
    })
}

fn load_tensor<'p>(tensor: &program::Tensor, memory: &MemoryManager<'p>) -> Result<Tensor<'p>> {
    let dtype = ScalarType::from_code(tensor.dtype)?;
    let sizes = tensor
        .sizes
        .iter()
        .map(|dim| {
            usize::try_from(*dim)
                .map_err(|_| Error::invalid_program(format!("negative tensor dimension {}", dim)))
        })
        .collect::<Result<Vec<_>>>()?;
    let nbytes = byte_len(dtype, &sizes)
        .ok_or_else(|| Error::invalid_program("tensor byte length overflows usize"))?;
    let pool = u32::try_from(tensor.mem_id)
        .map_err(|_| Error::invalid_program(format!("negative mem_id {}", tensor.mem_id)))?;
    let offset = usize::try_from(tensor.mem_offset).map_err(|_| {
        Error::invalid_program(format!("negative mem_offset {}", tensor.mem_offset))
    })?;
    let storage = memory.resolve(pool, offset, nbytes)?;
    Tensor::new(dtype, sizes, storage)
}

fn bind_operator(op: &program::Operator, registry: &OperatorRegistry) -> Result<BoundOperator> {
    let function = registry.get(&op.name).ok_or_else(|| {
        crate::error!("operator {} is not registered", op.name);
        Error::OperatorNotFound {
            name: op.name.clone(),
        }
    })?;
    Ok(BoundOperator {
        name: op.name.clone(),
        overload: op.overload.clone(),
        function,
    })
}

fn load_chain(
    chain: &program::Chain,
    values: &[EValue<'_>],
    operators: &[BoundOperator],
) -> Result<Chain> {
    let inputs = boundary_indices(&chain.inputs, "chain input", values)?;
    let outputs = boundary_indices(&chain.outputs, "chain output", values)?;

    let kernels = chain
        .kernels
        .iter()
        .map(|kernel| {
            let op_index = checked_index(kernel.op_index, "operator", operators.len())?;
            let args = kernel
                .args
                .iter()
                .map(|arg| checked_index(*arg, "kernel argument", values.len()))
                .collect::<Result<Vec<_>>>()?;
            Ok(Kernel {
                op_index,
                function: operators[op_index].function,
                args,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let instructions = chain
        .instructions
        .iter()
        .map(|instruction| match instruction.opcode {
            program::CALL_KERNEL => Ok(Instruction::CallKernel {
                kernel_index: checked_index(instruction.kernel_index, "kernel", kernels.len())?,
            }),
            opcode => {
                crate::warning!("chain keeps unsupported opcode {}", opcode);
                Ok(Instruction::Unsupported { opcode })
            }
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Chain {
        inputs,
        outputs,
        kernels,
        instructions,
    })
}

/// Inputs and outputs name runtime-mutable values only; constants are
/// rejected.
fn boundary_indices(
    indices: &[i32],
    what: &'static str,
    values: &[EValue<'_>],
) -> Result<Vec<usize>> {
    indices
        .iter()
        .map(|raw| {
            let idx = checked_index(*raw, what, values.len())?;
            if let EValue::Tensor(tensor) = &values[idx] {
                if tensor.storage().pool() == CONSTANT_POOL {
                    return Err(Error::invalid_program(format!(
                        "{} {} refers to a constant tensor",
                        what, idx
                    )));
                }
            }
            Ok(idx)
        })
        .collect()
}

fn checked_index(raw: i32, what: &'static str, len: usize) -> Result<usize> {
    usize::try_from(raw)
        .ok()
        .filter(|idx| *idx < len)
        .ok_or(Error::IndexOutOfRange {
            what,
            index: raw as i64,
            len,
        })
}
