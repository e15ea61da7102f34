use std::fmt;

use crate::registry::OpFn;
use crate::value::EValue;

/// Resolved instruction.
///
/// `Unsupported` keeps opcodes this build does not implement; executing one
/// is a format violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    CallKernel { kernel_index: usize },
    Unsupported { opcode: u32 },
}

/// Operator name bound to its native function.
#[derive(Clone)]
pub struct BoundOperator {
    pub name: String,
    pub overload: String,
    pub(crate) function: OpFn,
}

impl BoundOperator {
    pub fn function(&self) -> OpFn {
        self.function
    }
}

impl fmt::Debug for BoundOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundOperator")
            .field("name", &self.name)
            .field("overload", &self.overload)
            .finish_non_exhaustive()
    }
}

/// Kernel with its function bound and argument indices validated.
#[derive(Clone)]
pub struct Kernel {
    pub(crate) op_index: usize,
    pub(crate) function: OpFn,
    pub(crate) args: Vec<usize>,
}

impl Kernel {
    pub fn op_index(&self) -> usize {
        self.op_index
    }

    pub fn args(&self) -> &[usize] {
        &self.args
    }

    pub fn num_args(&self) -> usize {
        self.args.len()
    }
}

impl fmt::Debug for Kernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Kernel")
            .field("op_index", &self.op_index)
            .field("args", &self.args)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub struct Chain {
    pub(crate) inputs: Vec<usize>,
    pub(crate) outputs: Vec<usize>,
    pub(crate) kernels: Vec<Kernel>,
    pub(crate) instructions: Vec<Instruction>,
}

impl Chain {
    pub fn inputs(&self) -> &[usize] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[usize] {
        &self.outputs
    }

    pub fn kernels(&self) -> &[Kernel] {
        &self.kernels
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }
}

/// Execution plan after load: value table rebuilt over live storage,
/// operators bound, every index validated.
#[derive(Debug)]
pub struct LoadedPlan<'p> {
    pub(crate) values: Vec<EValue<'p>>,
    pub(crate) inputs: Vec<usize>,
    pub(crate) outputs: Vec<usize>,
    pub(crate) chains: Vec<Chain>,
    pub(crate) operators: Vec<BoundOperator>,
}

impl<'p> LoadedPlan<'p> {
    pub fn values(&self) -> &[EValue<'p>] {
        &self.values
    }

    pub fn value(&self, index: usize) -> Option<&EValue<'p>> {
        self.values.get(index)
    }

    pub fn num_values(&self) -> usize {
        self.values.len()
    }

    pub fn inputs(&self) -> &[usize] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[usize] {
        &self.outputs
    }

    pub fn chains(&self) -> &[Chain] {
        &self.chains
    }

    pub fn num_chains(&self) -> usize {
        self.chains.len()
    }

    pub fn operators(&self) -> &[BoundOperator] {
        &self.operators
    }

    pub fn num_instructions(&self) -> usize {
        self.chains.iter().map(|chain| chain.instructions.len()).sum()
    }
}
