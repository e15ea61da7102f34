//! Ahead-of-time graph executor.
//!
//! A [`Program`] holds a value table and straight-line chains of operator
//! calls per execution plan. [`Executor::init_execution_plan`] resolves one
//! plan against a [`MemoryManager`] (pool id + offset to live storage) and an
//! [`OperatorRegistry`] (operator name to native function), exactly once.
//! [`Executor::execute`] then runs the resolved plan with no lookups and no
//! allocation.
//!
//! ```no_run
//! # use flatexec::{Executor, MemoryManager, MemoryPool, OperatorRegistry, Program};
//! # fn main() -> flatexec::Result<()> {
//! let program = Program::open("model.fxpg")?;
//! let registry = OperatorRegistry::with_builtins()?;
//! let mut activations = vec![0u8; 4096];
//! let memory = MemoryManager::new(vec![
//!     MemoryPool::constant(),
//!     MemoryPool::new(&mut activations),
//! ])?;
//! let mut executor = Executor::new(&program, memory, &registry);
//! executor.init_execution_plan(0)?;
//! executor.input(0)?.as_tensor()?.copy_from_slice(&[1i32, 1, 1, 1])?;
//! executor.execute()?;
//! let y: Vec<i32> = executor.output(0)?.as_tensor()?.to_vec()?;
//! # let _ = y;
//! # Ok(()) }
//! ```
#[doc(hidden)]
pub mod logging;

mod config;
mod error;
mod memory;
mod registry;
mod trace;
mod value;

pub mod executor;
pub mod ops;
pub mod program;

pub use config::ExecutorConfig;
pub use error::{Error, Result};
pub use executor::{Executor, LoadedPlan};
pub use memory::{MemoryManager, MemoryPool, Storage, CONSTANT_POOL};
pub use program::builder::{
    ChainBuilder, PlanBuilder, ProgramBuilder, StorageId, ACTIVATION_POOL,
};
pub use program::Program;
pub use registry::{KernelArgs, OpFn, Operator, OperatorRegistry};
pub use trace::{TraceEvent, TraceEventKind};
pub use value::{
    byte_len, numel, EValue, Element, Elements, ElementsMut, Scalar, ScalarType, Tag, Tensor,
};
