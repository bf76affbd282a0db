//! Error kinds recognized by the orchestration core.
//!
//! Components recover locally only from log-write failures; every other error
//! propagates to the invocation boundary (worker runner or orchestrator entry
//! point), which logs a `*_failed` event, patches session state, and exits
//! non-zero.

use thiserror::Error;

/// Typed errors shared across the session substrate, router, orchestrator,
/// and worker runner.
#[derive(Debug, Error)]
pub enum HiveError {
    /// Session validation failed. Always fatal where it arises.
    #[error("session not found or incomplete: {0}")]
    SessionNotFound(String),

    /// A required file is missing (e.g., a worker's prompt file). Fatal within
    /// the current invocation.
    #[error("protocol violation: {0}")]
    ProtocolViolation(String),

    /// A structured output is missing a required, non-defaultable field.
    /// Logged, not retried; the worker reports `failed`.
    #[error("output validation failed: {0}")]
    Validation(String),

    /// Health probe or request to the model service failed. The orchestrator
    /// applies its retry policy; workers propagate without retry.
    #[error("model backend unavailable: {0}")]
    BackendUnavailable(String),

    /// A model request exceeded its configured timeout.
    #[error("model request timed out after {secs}s")]
    Timeout { secs: u64 },

    /// The model backend returned a rate-limit response.
    #[error("model backend rate limited, suggested wait {wait_secs}s")]
    RateLimited { wait_secs: u64 },

    /// A worker has been blocked on an unfulfilled dependency beyond its
    /// stall threshold. Recorded by the monitor; never raised.
    #[error("worker '{worker_type}' still waiting on dependency '{dependency}'")]
    DependencyStillPending {
        worker_type: String,
        dependency: String,
    },
}

impl HiveError {
    /// True for the backend-unavailable family (including its timeout and
    /// rate-limit refinements), which is the set the orchestrator retries.
    pub fn is_backend_unavailable(&self) -> bool {
        matches!(
            self,
            HiveError::BackendUnavailable(_)
                | HiveError::Timeout { .. }
                | HiveError::RateLimited { .. }
        )
    }

    /// Short stable name for stderr messages and `*_failed` event details.
    pub fn kind(&self) -> &'static str {
        match self {
            HiveError::SessionNotFound(_) => "session_not_found",
            HiveError::ProtocolViolation(_) => "protocol_violation",
            HiveError::Validation(_) => "validation_error",
            HiveError::BackendUnavailable(_) => "model_backend_unavailable",
            HiveError::Timeout { .. } => "timeout",
            HiveError::RateLimited { .. } => "rate_limited",
            HiveError::DependencyStillPending { .. } => "dependency_still_pending",
        }
    }
}

/// Classify an arbitrary error chain for event details.
///
/// Downcasts to [`HiveError`] when possible; anything else is reported under
/// a generic kind so `worker_failed` events always carry a stable tag.
pub fn error_kind(err: &anyhow::Error) -> &'static str {
    match err.downcast_ref::<HiveError>() {
        Some(hive) => hive.kind(),
        None => "internal_error",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_unavailable_family() {
        assert!(HiveError::BackendUnavailable("down".into()).is_backend_unavailable());
        assert!(HiveError::Timeout { secs: 120 }.is_backend_unavailable());
        assert!(HiveError::RateLimited { wait_secs: 4 }.is_backend_unavailable());
        assert!(!HiveError::SessionNotFound("x".into()).is_backend_unavailable());
    }

    #[test]
    fn test_error_kind_downcast() {
        let err = anyhow::Error::new(HiveError::Timeout { secs: 5 });
        assert_eq!(error_kind(&err), "timeout");

        let other = anyhow::anyhow!("something else");
        assert_eq!(error_kind(&other), "internal_error");
    }
}
