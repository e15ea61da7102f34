//! Crate error type.
//!
//! Load-time and execute-time failures are both fatal for the call that
//! reports them; nothing here is retried.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("execution plan index {index} out of range ({count} plans)")]
    PlanIndexOutOfRange { index: usize, count: usize },

    #[error("operator not found in registry: {name}")]
    OperatorNotFound { name: String },

    #[error("operator already registered: {name}")]
    DuplicateOperator { name: String },

    #[error("pool {pool}: range [{offset}, {offset} + {nbytes}) exceeds capacity {capacity}")]
    PoolOutOfBounds {
        pool: u32,
        offset: usize,
        nbytes: usize,
        capacity: usize,
    },

    #[error("unknown or unbound memory pool {pool}")]
    UnknownPool { pool: u32 },

    #[error("invalid memory pool configuration: {0}")]
    InvalidPool(String),

    #[error("{what} index {index} out of range ({len} entries)")]
    IndexOutOfRange {
        what: &'static str,
        index: i64,
        len: usize,
    },

    #[error("unknown dtype code {0}")]
    UnknownDType(i8),

    #[error("invalid program: {0}")]
    InvalidProgram(String),

    #[error("unsupported opcode {opcode} at chain {chain}, instruction {instruction}")]
    UnsupportedOpcode {
        chain: usize,
        instruction: usize,
        opcode: u32,
    },

    #[error("operator {op} failed at chain {chain}, instruction {instruction}: {source}")]
    KernelFailed {
        op: String,
        chain: usize,
        instruction: usize,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },

    #[error("executor is {found}, expected {expected}")]
    InvalidState {
        expected: &'static str,
        found: &'static str,
    },

    #[error("type mismatch: expected {expected}, found {actual}")]
    TypeMismatch {
        expected: &'static str,
        actual: &'static str,
    },

    #[error("tensor lives in the constant pool and is read-only")]
    ReadOnlyTensor,

    #[error("element count mismatch: expected {expected}, got {actual}")]
    ElementCount { expected: usize, actual: usize },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn invalid_program(msg: impl Into<String>) -> Self {
        Error::InvalidProgram(msg.into())
    }
}
