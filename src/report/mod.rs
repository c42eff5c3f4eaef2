//! Reporting of decisions made during a packaging run.
//!
//! Every component receives a [`Reporter`] at construction instead of
//! reaching for a global logger. The binary uses [`TracingReporter`], tests
//! use [`MockReporter`] and assert on what was reported.
//!
//! # Example
//!
//! ```
//! use vcrbpkg::report::{MockReporter, Reporter};
//!
//! let reporter = MockReporter::new();
//! reporter.warn("Unable to find Ruby version");
//! assert!(reporter.has_warning("Ruby version"));
//! ```

pub mod mock;

pub use mock::MockReporter;

/// Severity of a reported message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Debug,
    Info,
    Warn,
    Error,
}

/// Sink for operator-facing messages.
///
/// Degraded paths must be reported at [`Level::Warn`] so a fallback can be
/// audited after the run.
pub trait Reporter {
    /// Report a message at the given level.
    fn report(&self, level: Level, msg: &str);

    /// Report a debug message.
    fn debug(&self, msg: &str) {
        self.report(Level::Debug, msg);
    }

    /// Report an informational message.
    fn info(&self, msg: &str) {
        self.report(Level::Info, msg);
    }

    /// Report a warning.
    fn warn(&self, msg: &str) {
        self.report(Level::Warn, msg);
    }

    /// Report an error.
    fn error(&self, msg: &str) {
        self.report(Level::Error, msg);
    }
}

/// Reporter that forwards to `tracing` events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl TracingReporter {
    pub fn new() -> Self {
        Self
    }
}

impl Reporter for TracingReporter {
    fn report(&self, level: Level, msg: &str) {
        match level {
            Level::Debug => tracing::debug!("{}", msg),
            Level::Info => tracing::info!("{}", msg),
            Level::Warn => tracing::warn!("{}", msg),
            Level::Error => tracing::error!("{}", msg),
        }
    }
}
