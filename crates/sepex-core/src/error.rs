//! Domain error taxonomy for the scheduling core.
//!
//! Kinds are abstract and transport-independent; the HTTP layer in
//! `sepex-server` maps each onto a status code separately.

use std::borrow::Cow;
use std::error::Error as StdError;
use std::fmt;

/// Type alias for boxed dynamic errors that can be sent across threads.
pub type BoxedError = Box<dyn StdError + Send + Sync>;

/// Convenience alias for `Result<T, Error>`.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Abstract error classification, independent of transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad process spec, bad inputs, env-var prefix mismatch, resources over limits.
    /// Surfaced to the caller as 4xx; never a job state change.
    Validation,
    /// Resources unavailable for a sync request. Surfaced as 429/503; no job created.
    Admission,
    /// Container/subprocess/runtime failure at start. Job transitions to `failed`.
    Backend,
    /// Child exited non-zero or a wait error occurred. Status becomes `failed`.
    Execution,
    /// Child exit coincided with a dismissal. Status stays `dismissed`, not `failed`.
    DismissedDuringExecution,
    /// Metadata write, log upload, or image-digest read failure. Logged, non-terminal.
    Auxiliary,
    /// Double-release, duplicate jobId, or another broken invariant. Logged loudly.
    InternalInvariantViolation,
}

impl ErrorKind {
    /// Whether an error of this kind should force a job's status to `failed`
    /// (when the job still exists), per the error-handling policy table.
    pub fn forces_failed_status(self) -> bool {
        matches!(
            self,
            ErrorKind::Backend | ErrorKind::Execution | ErrorKind::InternalInvariantViolation
        )
    }

    /// Whether an error of this kind is recovered locally and never surfaces as
    /// a job state change.
    pub fn is_auxiliary(self) -> bool {
        matches!(self, ErrorKind::Auxiliary)
    }
}

/// The domain error type returned by scheduling-core operations.
#[derive(Debug, thiserror::Error)]
#[error("{kind} error: {message}")]
pub struct Error {
    kind: ErrorKind,
    message: Cow<'static, str>,
    #[source]
    source: Option<BoxedError>,
}

impl Error {
    fn new(kind: ErrorKind, message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Attaches a source error, preserved in the `std::error::Error` chain.
    #[must_use]
    pub fn with_source(mut self, source: impl Into<BoxedError>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn validation(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    pub fn admission(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::Admission, message)
    }

    pub fn backend(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::Backend, message)
    }

    pub fn execution(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::Execution, message)
    }

    pub fn dismissed_during_execution(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::DismissedDuringExecution, message)
    }

    pub fn auxiliary(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::Auxiliary, message)
    }

    pub fn invariant(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::InternalInvariantViolation, message)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::Validation => "validation",
            ErrorKind::Admission => "admission",
            ErrorKind::Backend => "backend",
            ErrorKind::Execution => "execution",
            ErrorKind::DismissedDuringExecution => "dismissed_during_execution",
            ErrorKind::Auxiliary => "auxiliary",
            ErrorKind::InternalInvariantViolation => "internal_invariant_violation",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_kind_and_message() {
        let err = Error::admission("no cpus available");
        assert_eq!(err.to_string(), "admission error: no cpus available");
    }

    #[test]
    fn with_source_preserves_chain() {
        let source = std::io::Error::other("boom");
        let err = Error::backend("failed to start").with_source(source);
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn forces_failed_status_matches_policy() {
        assert!(ErrorKind::Backend.forces_failed_status());
        assert!(ErrorKind::Execution.forces_failed_status());
        assert!(ErrorKind::InternalInvariantViolation.forces_failed_status());
        assert!(!ErrorKind::Validation.forces_failed_status());
        assert!(!ErrorKind::Admission.forces_failed_status());
        assert!(!ErrorKind::Auxiliary.forces_failed_status());
        assert!(!ErrorKind::DismissedDuringExecution.forces_failed_status());
    }
}
