//! Unified error types surfaced by the runtime API.
//!
//! Wraps failures from worker coordination, the result store and the session
//! rules so clients can bubble them up with consistent context.
use thiserror::Error;
use tokio::sync::oneshot;

use memory_core::{ErrorSeverity, GameError, SessionError, ValidationError};

pub use crate::repository::RepositoryError;

pub type Result<T> = std::result::Result<T, RuntimeError>;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("session worker command channel closed")]
    CommandChannelClosed,

    #[error("session worker reply channel closed")]
    ReplyChannelClosed(#[source] oneshot::error::RecvError),

    #[error("session worker join failed")]
    WorkerJoin(#[source] tokio::task::JoinError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("registration form invalid: {0}")]
    Validation(#[from] ValidationError),
}

impl RuntimeError {
    /// True when a registration was refused because the identifier already
    /// played (or is registered for the running session).
    pub fn is_duplicate_identifier(&self) -> bool {
        matches!(
            self,
            Self::Repository(RepositoryError::DuplicateIdentifier { .. })
        )
    }

    /// Severity used by frontends to decide whether to surface the error.
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Session(err) => err.severity(),
            Self::Validation(err) => err.severity(),
            Self::Repository(RepositoryError::DuplicateIdentifier { .. }) => {
                ErrorSeverity::Validation
            }
            Self::Repository(_) => ErrorSeverity::Internal,
            Self::CommandChannelClosed | Self::ReplyChannelClosed(_) | Self::WorkerJoin(_) => {
                ErrorSeverity::Fatal
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use memory_core::{Field, SessionState};

    #[test]
    fn duplicate_identifier_is_a_validation_problem() {
        let err = RuntimeError::from(RepositoryError::DuplicateIdentifier {
            identifier: "12345678901".into(),
        });
        assert!(err.is_duplicate_identifier());
        assert_eq!(err.severity(), ErrorSeverity::Validation);
    }

    #[test]
    fn severity_follows_wrapped_core_errors() {
        let err = RuntimeError::from(SessionError::DurationsLocked {
            state: SessionState::Playing,
        });
        assert_eq!(err.severity(), ErrorSeverity::Validation);
        assert!(!err.is_duplicate_identifier());

        let err = RuntimeError::from(ValidationError::MissingField(Field::Name));
        assert_eq!(err.severity(), ErrorSeverity::Validation);

        assert_eq!(
            RuntimeError::CommandChannelClosed.severity(),
            ErrorSeverity::Fatal
        );
    }
}
