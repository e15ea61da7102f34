//! Serialized program schema.
//!
//! A [`Program`] is read-only once built or decoded. The loader turns one of
//! its execution plans into a [`crate::LoadedPlan`]; nothing here holds live
//! addresses. Tensors name their storage as `(mem_id, mem_offset)`, where
//! `mem_id` 0 is the program's constant buffer.
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

mod buffer;
pub mod builder;
pub mod container;

pub use buffer::{ConstantBuffer, MappedSlice};

/// Schema version written by [`builder::ProgramBuilder`].
pub const PROGRAM_VERSION: u32 = 1;

/// Opcode of [`Instruction`] calling a kernel.
pub const CALL_KERNEL: u32 = 0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Program {
    pub version: u32,
    pub execution_plans: Vec<ExecutionPlan>,
    #[serde(default)]
    pub constant_buffer: ConstantBuffer,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionPlan {
    pub values: Vec<EValue>,
    pub inputs: Vec<i32>,
    pub outputs: Vec<i32>,
    pub chains: Vec<Chain>,
    pub operators: Vec<Operator>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Chain {
    pub inputs: Vec<i32>,
    pub outputs: Vec<i32>,
    pub kernels: Vec<Kernel>,
    pub instructions: Vec<Instruction>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Kernel {
    pub op_index: i32,
    pub args: Vec<i32>,
}

/// Wire instruction. `opcode` stays a raw integer so programs carrying
/// opcodes this build does not know still decode; the executor rejects them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instruction {
    pub opcode: u32,
    pub kernel_index: i32,
    #[serde(default)]
    pub reserved: i32,
}

impl Instruction {
    pub fn call_kernel(kernel_index: i32) -> Self {
        Self {
            opcode: CALL_KERNEL,
            kernel_index,
            reserved: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operator {
    pub name: String,
    #[serde(default)]
    pub overload: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EValue {
    None,
    Tensor(Tensor),
    Int(i64),
    Double(f64),
    Bool(bool),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tensor {
    pub dtype: i8,
    pub sizes: Vec<i32>,
    #[serde(default)]
    pub requires_grad: bool,
    pub mem_id: i32,
    pub mem_offset: i32,
}

impl Program {
    pub fn num_plans(&self) -> usize {
        self.execution_plans.len()
    }

    pub fn plan(&self, index: usize) -> Option<&ExecutionPlan> {
        self.execution_plans.get(index)
    }

    /// Full JSON form, constant buffer included.
    pub fn to_json(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }

    pub fn from_json(value: Value) -> Result<Self> {
        Ok(serde_json::from_value(value)?)
    }
}
