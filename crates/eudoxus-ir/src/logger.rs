//! Logger collaborator interface.
//!
//! IR producers and the compiler report through a caller-supplied
//! callback rather than a global logging facility. Errors imply the
//! operation failed; warnings are recoverable; info is informational.

/// Message severity.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warn,
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warn => write!(f, "warn"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// Logger callback type.
pub type LogFn<'a> = dyn Fn(Severity, &str) + 'a;

/// Logger that discards everything.
pub fn nop_logger(_severity: Severity, _message: &str) {}
