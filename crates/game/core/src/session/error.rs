//! Error types for session transitions.

use crate::board::BoardError;
use crate::error::{ErrorSeverity, GameError};

use super::SessionState;

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("cannot {event} while session is {state}")]
    InvalidTransition {
        state: SessionState,
        event: &'static str,
    },

    #[error("durations can only be changed during registration (session is {state})")]
    DurationsLocked { state: SessionState },

    #[error("durations must be at least one second (memorize {memorize_secs}s, play {play_secs}s)")]
    InvalidDuration { memorize_secs: u32, play_secs: u32 },

    #[error("session is {state} but has no board")]
    MissingBoard { state: SessionState },

    #[error(transparent)]
    Board(#[from] BoardError),
}

impl SessionError {
    pub(crate) fn invalid(state: SessionState, event: &'static str) -> Self {
        Self::InvalidTransition { state, event }
    }
}

impl GameError for SessionError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::InvalidTransition { .. } => ErrorSeverity::Recoverable,
            Self::DurationsLocked { .. } | Self::InvalidDuration { .. } => {
                ErrorSeverity::Validation
            }
            Self::MissingBoard { .. } => ErrorSeverity::Internal,
            Self::Board(err) => err.severity(),
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidTransition { .. } => "SESSION_INVALID_TRANSITION",
            Self::DurationsLocked { .. } => "SESSION_DURATIONS_LOCKED",
            Self::InvalidDuration { .. } => "SESSION_INVALID_DURATION",
            Self::MissingBoard { .. } => "SESSION_MISSING_BOARD",
            Self::Board(err) => err.error_code(),
        }
    }
}
