//! Deterministic rules for the memory-matching kiosk game.
//!
//! `memory-core` defines the canonical rules (board, matching, session
//! lifecycle) and exposes pure APIs reused by the runtime and by tests. All
//! session mutation flows through [`session::SessionMachine`]; it never reads
//! a clock or spawns work, it returns [`session::Effect`]s for the runtime to
//! schedule.
pub mod board;
pub mod config;
pub mod error;
pub mod identity;
pub mod session;

pub use board::{
    Board, BoardError, BoardLock, Card, CardState, CardView, FlipOutcome, FlipRejection, IconId,
    IconSet,
};
pub use config::{Durations, GameConfig};
pub use error::{ErrorSeverity, GameError};
pub use identity::{Field, PlayerIdentity, RegistrationForm, ValidationError};
pub use session::{
    Effect, FlipResult, Phase, Session, SessionError, SessionMachine, SessionOutcome,
    SessionSnapshot, SessionState,
};
