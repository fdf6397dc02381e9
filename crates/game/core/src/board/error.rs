use crate::error::{ErrorSeverity, GameError};
use crate::session::SessionState;

use super::IconId;

/// Reasons a flip request was refused.
///
/// None of these are faults: they are the expected outcome of fast or
/// repeated taps and are dropped by the caller without changing any state.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FlipRejection {
    #[error("flips are only accepted while playing (session is {state})")]
    NotPlaying { state: SessionState },

    #[error("board is frozen")]
    Frozen,

    #[error("board is evaluating a pair")]
    Locked,

    #[error("card {position} is already face up")]
    AlreadyFaceUp { position: usize },

    #[error("card {position} is already matched")]
    AlreadyMatched { position: usize },

    #[error("card {position} does not exist on a board of {len} cards")]
    OutOfRange { position: usize, len: usize },
}

impl GameError for FlipRejection {
    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::OutOfRange { .. } => ErrorSeverity::Validation,
            _ => ErrorSeverity::Recoverable,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::NotPlaying { .. } => "FLIP_NOT_PLAYING",
            Self::Frozen => "FLIP_BOARD_FROZEN",
            Self::Locked => "FLIP_BOARD_LOCKED",
            Self::AlreadyFaceUp { .. } => "FLIP_ALREADY_FACE_UP",
            Self::AlreadyMatched { .. } => "FLIP_ALREADY_MATCHED",
            Self::OutOfRange { .. } => "FLIP_OUT_OF_RANGE",
        }
    }
}

/// Errors raised while assembling an icon set or a board.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum BoardError {
    #[error("icon set must contain at least one icon")]
    EmptyIconSet,

    #[error("icon '{0}' appears more than once in the icon set")]
    DuplicateIcon(IconId),

    #[error("requested {requested} pairs but only {available} icons are available")]
    NotEnoughIcons { requested: usize, available: usize },

    #[error("a board needs at least one pair")]
    NoPairs,
}

impl GameError for BoardError {
    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Validation
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::EmptyIconSet => "BOARD_EMPTY_ICON_SET",
            Self::DuplicateIcon(_) => "BOARD_DUPLICATE_ICON",
            Self::NotEnoughIcons { .. } => "BOARD_NOT_ENOUGH_ICONS",
            Self::NoPairs => "BOARD_NO_PAIRS",
        }
    }
}
