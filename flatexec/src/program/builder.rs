//! Programmatic construction of [`Program`]s.
//!
//! Constant tensors are packed back to back into the constant buffer and
//! deduplicated by a caller-assigned [`StorageId`]: two tensors added with
//! the same id share one byte range. Activation tensors are bump-allocated
//! in pool 1.
use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::value::{byte_len, Element, ScalarType};

use super::{Chain, EValue, ExecutionPlan, Instruction, Kernel, Operator, Program, Tensor};
use super::PROGRAM_VERSION;

/// Pool id the builder places activation tensors in.
pub const ACTIVATION_POOL: i32 = 1;

const ACTIVATION_ALIGN: usize = 8;

/// Owner-assigned identity of a constant tensor's backing storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StorageId(pub u64);

#[derive(Debug, Clone, Copy)]
struct ConstantRange {
    offset: usize,
    nbytes: usize,
}

#[derive(Debug, Default)]
pub struct ProgramBuilder {
    plans: Vec<ExecutionPlan>,
    constant_buffer: Vec<u8>,
    storages: HashMap<StorageId, ConstantRange>,
}

impl ProgramBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new execution plan. It is appended when
    /// [`PlanBuilder::finish`] is called.
    pub fn plan(&mut self) -> PlanBuilder<'_> {
        PlanBuilder {
            program: self,
            plan: ExecutionPlan::default(),
            activation_bytes: 0,
        }
    }

    pub fn constant_bytes(&self) -> usize {
        self.constant_buffer.len()
    }

    pub fn build(self) -> Program {
        Program {
            version: PROGRAM_VERSION,
            execution_plans: self.plans,
            constant_buffer: self.constant_buffer.into(),
        }
    }

    fn intern_constant(&mut self, id: StorageId, bytes: &[u8]) -> Result<usize> {
        if let Some(range) = self.storages.get(&id) {
            if range.nbytes != bytes.len() {
                return Err(Error::invalid_program(format!(
                    "storage {:?} reused with {} bytes, first seen with {}",
                    id,
                    bytes.len(),
                    range.nbytes
                )));
            }
            return Ok(range.offset);
        }
        let offset = self.constant_buffer.len();
        self.constant_buffer.extend_from_slice(bytes);
        self.storages.insert(
            id,
            ConstantRange {
                offset,
                nbytes: bytes.len(),
            },
        );
        Ok(offset)
    }
}

pub struct PlanBuilder<'b> {
    program: &'b mut ProgramBuilder,
    plan: ExecutionPlan,
    activation_bytes: usize,
}

impl<'b> PlanBuilder<'b> {
    /// Add a constant tensor backed by `bytes`.
    pub fn add_constant(
        &mut self,
        id: StorageId,
        dtype: ScalarType,
        sizes: &[usize],
        bytes: &[u8],
    ) -> Result<usize> {
        let expected = tensor_bytes(dtype, sizes)?;
        if bytes.len() != expected {
            return Err(Error::ElementCount {
                expected,
                actual: bytes.len(),
            });
        }
        let offset = self.program.intern_constant(id, bytes)?;
        self.push_tensor(dtype, sizes, 0, offset)
    }

    /// Add a constant tensor from typed elements.
    pub fn add_constant_from<T: Element>(
        &mut self,
        id: StorageId,
        sizes: &[usize],
        data: &[T],
    ) -> Result<usize> {
        self.add_constant(id, T::DTYPE, sizes, bytemuck::cast_slice(data))
    }

    /// Add a tensor living in the activation pool.
    pub fn add_activation(&mut self, dtype: ScalarType, sizes: &[usize]) -> Result<usize> {
        let nbytes = tensor_bytes(dtype, sizes)?;
        let offset = align_up(self.activation_bytes, ACTIVATION_ALIGN);
        self.activation_bytes = offset
            .checked_add(nbytes)
            .ok_or_else(|| Error::invalid_program("activation pool overflows usize"))?;
        self.push_tensor(dtype, sizes, ACTIVATION_POOL, offset)
    }

    pub fn add_none(&mut self) -> usize {
        self.push_value(EValue::None)
    }

    pub fn add_int(&mut self, value: i64) -> usize {
        self.push_value(EValue::Int(value))
    }

    pub fn add_double(&mut self, value: f64) -> usize {
        self.push_value(EValue::Double(value))
    }

    pub fn add_bool(&mut self, value: bool) -> usize {
        self.push_value(EValue::Bool(value))
    }

    /// Add an operator by name, reusing an existing entry with that name.
    pub fn add_operator(&mut self, name: &str) -> usize {
        if let Some(idx) = self.plan.operators.iter().position(|op| op.name == name) {
            return idx;
        }
        self.plan.operators.push(Operator {
            name: name.to_string(),
            overload: String::new(),
        });
        self.plan.operators.len() - 1
    }

    pub fn add_chain(&mut self, chain: ChainBuilder) -> Result<usize> {
        let chain = Chain {
            inputs: wire_indices(&chain.inputs)?,
            outputs: wire_indices(&chain.outputs)?,
            kernels: chain
                .kernels
                .iter()
                .map(|(op_index, args)| {
                    Ok(Kernel {
                        op_index: wire_index(*op_index)?,
                        args: wire_indices(args)?,
                    })
                })
                .collect::<Result<Vec<_>>>()?,
            instructions: chain.instructions,
        };
        self.plan.chains.push(chain);
        Ok(self.plan.chains.len() - 1)
    }

    pub fn set_inputs(&mut self, inputs: &[usize]) -> Result<()> {
        self.plan.inputs = wire_indices(inputs)?;
        Ok(())
    }

    pub fn set_outputs(&mut self, outputs: &[usize]) -> Result<()> {
        self.plan.outputs = wire_indices(outputs)?;
        Ok(())
    }

    /// Bytes the host must provide for pool 1.
    pub fn activation_bytes(&self) -> usize {
        self.activation_bytes
    }

    /// Append the plan to the program and return its index.
    pub fn finish(self) -> usize {
        self.program.plans.push(self.plan);
        self.program.plans.len() - 1
    }

    fn push_tensor(
        &mut self,
        dtype: ScalarType,
        sizes: &[usize],
        mem_id: i32,
        offset: usize,
    ) -> Result<usize> {
        let sizes = sizes
            .iter()
            .map(|dim| {
                i32::try_from(*dim)
                    .map_err(|_| Error::invalid_program(format!("dimension {} exceeds i32", dim)))
            })
            .collect::<Result<Vec<_>>>()?;
        let mem_offset = i32::try_from(offset)
            .map_err(|_| Error::invalid_program(format!("offset {} exceeds i32", offset)))?;
        Ok(self.push_value(EValue::Tensor(Tensor {
            dtype: dtype.code(),
            sizes,
            requires_grad: false,
            mem_id,
            mem_offset,
        })))
    }

    fn push_value(&mut self, value: EValue) -> usize {
        self.plan.values.push(value);
        self.plan.values.len() - 1
    }
}

/// Straight-line chain under construction.
#[derive(Debug, Clone, Default)]
pub struct ChainBuilder {
    inputs: Vec<usize>,
    outputs: Vec<usize>,
    kernels: Vec<(usize, Vec<usize>)>,
    instructions: Vec<Instruction>,
}

impl ChainBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inputs(mut self, inputs: &[usize]) -> Self {
        self.inputs = inputs.to_vec();
        self
    }

    pub fn outputs(mut self, outputs: &[usize]) -> Self {
        self.outputs = outputs.to_vec();
        self
    }

    /// Add a kernel and the `CALL_KERNEL` instruction that runs it.
    pub fn call(mut self, op_index: usize, args: &[usize]) -> Self {
        let kernel_index = self.kernels.len();
        self.kernels.push((op_index, args.to_vec()));
        self.instructions
            .push(Instruction::call_kernel(kernel_index as i32));
        self
    }

    /// Append a raw instruction.
    pub fn instruction(mut self, instruction: Instruction) -> Self {
        self.instructions.push(instruction);
        self
    }
}

fn tensor_bytes(dtype: ScalarType, sizes: &[usize]) -> Result<usize> {
    byte_len(dtype, sizes).ok_or_else(|| Error::invalid_program("tensor byte length overflows"))
}

fn wire_index(index: usize) -> Result<i32> {
    i32::try_from(index)
        .map_err(|_| Error::invalid_program(format!("index {} exceeds i32", index)))
}

fn wire_indices(indices: &[usize]) -> Result<Vec<i32>> {
    indices.iter().map(|idx| wire_index(*idx)).collect()
}

fn align_up(value: usize, alignment: usize) -> usize {
    (value + alignment - 1) / alignment * alignment
}
