use std::env;

/// Executor options.
///
/// `trace` records one [`crate::TraceEvent`] per executed instruction into a
/// buffer sized at load time. `timer` additionally measures each kernel call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecutorConfig {
    pub trace: bool,
    pub timer: bool,
}

impl ExecutorConfig {
    /// Read options from `FLATEXEC_TRACE` and `FLATEXEC_TIMER`.
    pub fn from_env() -> Self {
        let timer = env::var("FLATEXEC_TIMER")
            .map(|value| matches!(value.trim(), "1" | "true"))
            .unwrap_or(false);
        Self {
            trace: crate::logging::trace_enabled(),
            timer,
        }
    }

    pub fn with_trace(mut self, enabled: bool) -> Self {
        self.trace = enabled;
        self
    }

    pub fn with_timer(mut self, enabled: bool) -> Self {
        self.timer = enabled;
        self
    }
}
