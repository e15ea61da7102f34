//! Console logging for load and execute.
//!
//! `FLATEXEC_TRACE` selects the verbosity: unset or `0` keeps the executor
//! quiet apart from critical messages, `1`/`basic` adds traces and errors,
//! `full` adds warnings. The value is read once per process.
use std::env;
use std::fmt::{self, Arguments};
use std::sync::OnceLock;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

const TRACE_ENV: &str = "FLATEXEC_TRACE";

static VERBOSITY: OnceLock<Verbosity> = OnceLock::new();

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Verbosity {
    Quiet,
    Basic,
    Full,
}

impl Verbosity {
    fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "1" | "basic" => Verbosity::Basic,
            "full" => Verbosity::Full,
            _ => Verbosity::Quiet,
        }
    }

    fn current() -> Self {
        *VERBOSITY.get_or_init(|| {
            env::var(TRACE_ENV)
                .map(|value| Verbosity::parse(&value))
                .unwrap_or(Verbosity::Quiet)
        })
    }
}

#[doc(hidden)]
#[derive(Clone, Copy)]
pub enum Level {
    Trace,
    Warning,
    Error,
    Critical,
}

impl Level {
    fn label(self) -> &'static str {
        match self {
            Level::Trace => "TRACE",
            Level::Warning => "WARNING",
            Level::Error => "ERROR",
            Level::Critical => "CRITICAL",
        }
    }

    fn color(self) -> &'static str {
        match self {
            Level::Trace => "34",
            Level::Warning => "33",
            Level::Error => "91",
            Level::Critical => "31",
        }
    }

    /// Least verbosity at which this level is printed.
    fn threshold(self) -> Verbosity {
        match self {
            Level::Critical => Verbosity::Quiet,
            Level::Trace | Level::Error => Verbosity::Basic,
            Level::Warning => Verbosity::Full,
        }
    }
}

/// True when `FLATEXEC_TRACE` is set to `1`, `basic` or `full`.
pub fn trace_enabled() -> bool {
    Verbosity::current() >= Verbosity::Basic
}

/// Wall-clock time of day, formatted straight into the log line.
struct Clock(Duration);

impl Clock {
    fn now() -> Self {
        Clock(
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default(),
        )
    }
}

impl fmt::Display for Clock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let secs = self.0.as_secs() % 86_400;
        write!(
            f,
            "{:02}:{:02}:{:02}.{:03}",
            secs / 3_600,
            (secs % 3_600) / 60,
            secs % 60,
            self.0.subsec_millis()
        )
    }
}

#[doc(hidden)]
pub fn emit(level: Level, args: Arguments) {
    if Verbosity::current() < level.threshold() {
        return;
    }
    println!(
        "{} [\u{001b}[{}m{}\u{001b}[0m] flatexec -- {}",
        Clock::now(),
        level.color(),
        level.label(),
        args
    );
}

/// Log a load or execute step.
#[macro_export]
macro_rules! trace {
    ($($arg:tt)*) => {
        $crate::logging::emit($crate::logging::Level::Trace, format_args!($($arg)*))
    };
}

/// Log a recoverable oddity in a program.
#[macro_export]
macro_rules! warning {
    ($($arg:tt)*) => {
        $crate::logging::emit($crate::logging::Level::Warning, format_args!($($arg)*))
    };
}

/// Log a failure that is also returned as an error.
#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => {
        $crate::logging::emit($crate::logging::Level::Error, format_args!($($arg)*))
    };
}

/// Log a malformed program regardless of verbosity.
#[macro_export]
macro_rules! critical {
    ($($arg:tt)*) => {
        $crate::logging::emit($crate::logging::Level::Critical, format_args!($($arg)*))
    };
}
