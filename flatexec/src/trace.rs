use std::fmt;

use serde::Serialize;

/// Kind of trace event emitted during execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TraceEventKind {
    CallKernel,
}

impl fmt::Display for TraceEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TraceEventKind::CallKernel => write!(f, "CallKernel"),
        }
    }
}

/// Execution trace record for a single instruction.
///
/// Holds indices only, so recording an event never allocates; names are
/// looked up through the loaded plan when the trace is inspected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TraceEvent {
    pub kind: TraceEventKind,
    pub chain_index: usize,
    pub instruction_index: usize,
    pub kernel_index: usize,
    pub op_index: usize,
    /// Kernel wall time, zero unless the timer is enabled.
    pub micros: u64,
}

impl fmt::Display for TraceEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[chain {}] #{} {} kernel={} op={} ({} us)",
            self.chain_index,
            self.instruction_index,
            self.kind,
            self.kernel_index,
            self.op_index,
            self.micros
        )
    }
}
