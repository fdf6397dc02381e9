//! Worker tasks that back the runtime orchestration.
//!
//! The session worker owns the state machine, the result store and every
//! running timer; everything else talks to it through [`Command`]s.

mod session;

pub use session::{Command, SessionWorker};
