//! Operator registry and the native kernel ABI.
//!
//! The registry is built once at host startup and then shared by reference
//! with every executor. Programs name operators by string; the loader binds
//! each name to the function registered here and rejects the plan when a
//! name is missing from this build.
use std::collections::HashMap;
use std::fmt;

use anyhow::anyhow;

use crate::error::{Error, Result};
use crate::value::{EValue, Scalar, Tensor};

/// Native operator entry point. Outputs are written in place into the
/// values the kernel's argument list designates (last, by convention).
pub type OpFn = fn(&mut KernelArgs<'_, '_>) -> anyhow::Result<()>;

/// Named native function.
#[derive(Clone)]
pub struct Operator {
    pub name: String,
    /// Reserved; always empty today.
    pub overload: String,
    pub function: OpFn,
}

impl Operator {
    pub fn new(name: impl Into<String>, function: OpFn) -> Self {
        Self {
            name: name.into(),
            overload: String::new(),
            function,
        }
    }
}

impl fmt::Debug for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operator")
            .field("name", &self.name)
            .field("overload", &self.overload)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Default)]
pub struct OperatorRegistry {
    ops: HashMap<String, Operator>,
}

impl OperatorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the builtin operators from [`crate::ops`].
    pub fn with_builtins() -> Result<Self> {
        let mut registry = Self::new();
        for op in crate::ops::BUILTINS.iter() {
            registry.register_operator(op.clone())?;
        }
        Ok(registry)
    }

    pub fn register(&mut self, name: impl Into<String>, function: OpFn) -> Result<()> {
        self.register_operator(Operator::new(name, function))
    }

    pub fn register_operator(&mut self, op: Operator) -> Result<()> {
        if self.ops.contains_key(&op.name) {
            return Err(Error::DuplicateOperator { name: op.name });
        }
        crate::trace!("register operator {}", op.name);
        self.ops.insert(op.name.clone(), op);
        Ok(())
    }

    pub fn has(&self, name: &str) -> bool {
        self.ops.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<OpFn> {
        self.ops.get(name).map(|op| op.function)
    }

    pub fn operator(&self, name: &str) -> Option<&Operator> {
        self.ops.get(name)
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.ops.keys().map(String::as_str)
    }
}

/// Arguments of one kernel call: the kernel's declared value-table indices
/// viewed over the plan's value table, in declared order.
pub struct KernelArgs<'a, 'p> {
    values: &'a mut [EValue<'p>],
    args: &'a [usize],
}

impl<'a, 'p> KernelArgs<'a, 'p> {
    /// Checked constructor for calling kernels outside an executor.
    pub fn new(values: &'a mut [EValue<'p>], args: &'a [usize]) -> Result<Self> {
        if let Some(&index) = args.iter().find(|&&idx| idx >= values.len()) {
            return Err(Error::IndexOutOfRange {
                what: "kernel argument",
                index: index as i64,
                len: values.len(),
            });
        }
        Ok(Self { values, args })
    }

    /// Indices were validated when the plan was loaded.
    pub(crate) fn trusted(values: &'a mut [EValue<'p>], args: &'a [usize]) -> Self {
        Self { values, args }
    }

    pub fn len(&self) -> usize {
        self.args.len()
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    /// Value-table index of argument `pos`.
    pub fn index(&self, pos: usize) -> anyhow::Result<usize> {
        self.args
            .get(pos)
            .copied()
            .ok_or_else(|| anyhow!("argument {} missing ({} declared)", pos, self.args.len()))
    }

    pub fn get(&self, pos: usize) -> anyhow::Result<&EValue<'p>> {
        let idx = self.index(pos)?;
        Ok(&self.values[idx])
    }

    pub fn get_mut(&mut self, pos: usize) -> anyhow::Result<&mut EValue<'p>> {
        let idx = self.index(pos)?;
        Ok(&mut self.values[idx])
    }

    pub fn tensor(&self, pos: usize) -> anyhow::Result<&Tensor<'p>> {
        Ok(self.get(pos)?.as_tensor()?)
    }

    pub fn scalar(&self, pos: usize) -> anyhow::Result<Scalar> {
        Ok(self.get(pos)?.to_scalar()?)
    }
}
