//! Session lifecycle: registration, memorize, play and outcome.
//!
//! [`SessionMachine`] is the authoritative reducer for a kiosk session. It
//! never touches a clock: every timed transition is requested through an
//! [`Effect`] and confirmed by the caller (`memorize_expired`,
//! `play_expired`, `resolve_mismatch`). This keeps the rules deterministic
//! and lets the runtime own timers and cancellation.

mod error;
mod machine;

pub use error::SessionError;
pub use machine::{FlipResult, SessionMachine};

use crate::board::{BoardLock, CardView};
use crate::config::Durations;
use crate::identity::PlayerIdentity;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, strum::Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case")]
pub enum SessionState {
    #[default]
    Registration,
    Memorize,
    Playing,
    Won,
    Lost,
}

impl SessionState {
    /// `Won` and `Lost` wait for an explicit reset.
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Won | Self::Lost)
    }
}

/// The two timed phases. Only one countdown runs at a time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case")]
pub enum Phase {
    Memorize,
    Play,
}

/// Per-session fields. Rebuilt from scratch on every reset; only the
/// configured durations carry over.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Session {
    pub state: SessionState,
    pub attempts: u32,
    pub elapsed_play_secs: u32,
    pub memorize_remaining: u32,
    pub play_remaining: u32,
    pub durations: Durations,
    pub player: Option<PlayerIdentity>,
}

impl Session {
    pub fn new(durations: Durations) -> Self {
        Self {
            state: SessionState::Registration,
            attempts: 0,
            elapsed_play_secs: 0,
            memorize_remaining: durations.memorize_secs(),
            play_remaining: durations.play_secs(),
            durations,
            player: None,
        }
    }
}

/// How a session ended. Handed to the result store by the runtime.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SessionOutcome {
    Won {
        player: PlayerIdentity,
        elapsed_secs: u32,
        attempts: u32,
    },
    Lost {
        player: PlayerIdentity,
        pairs_found: usize,
        total_pairs: usize,
        attempts: u32,
    },
}

impl SessionOutcome {
    pub fn player(&self) -> &PlayerIdentity {
        match self {
            Self::Won { player, .. } | Self::Lost { player, .. } => player,
        }
    }
}

/// Side effects requested by a transition, applied by the runtime in order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Effect {
    /// Cancel whatever countdown is active, then start this one.
    StartCountdown { phase: Phase, seconds: u32 },
    CancelCountdown,
    /// Call `resolve_mismatch` after the presentation delay.
    ScheduleMismatchResolve { delay_ms: u64 },
    /// Drop a pending mismatch resolution, if any.
    CancelMismatchResolve,
    Finish(SessionOutcome),
}

/// Read-only view for the presentation layer.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub attempts: u32,
    pub elapsed_play_secs: u32,
    pub memorize_remaining: u32,
    pub play_remaining: u32,
    pub durations: Durations,
    pub player_name: Option<String>,
    pub cards: Vec<CardView>,
    pub pending: Vec<usize>,
    pub lock: Option<BoardLock>,
    pub matched_pairs: usize,
    pub total_pairs: usize,
}
