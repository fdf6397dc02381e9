//! Runtime orchestration for the memory-matching kiosk.
//!
//! This crate wires together the session state machine from `memory-core`,
//! cancellable timers, the result store and worker tasks into a cohesive
//! runtime API. Consumers embed [`Runtime`] to run sessions, subscribe to
//! events, and query results through [`RuntimeHandle`].
//!
//! Modules are organized by responsibility:
//! - [`runtime`] hosts the orchestrator and builder
//! - [`api`] exposes the types downstream clients interact with
//! - [`events`] provides topic-based event bus for presentation updates
//! - [`timer`] owns countdowns and delayed callbacks on the tokio clock
//! - [`workers`] keeps background tasks internal to the crate
//! - [`repository`] persists used identifiers, the player log and the ranking
pub mod api;
pub mod events;
pub mod repository;
pub mod runtime;
pub mod timer;

mod workers;

pub use api::{FlipReport, Result, RuntimeError, RuntimeHandle};
pub use events::{BoardEvent, Event, EventBus, SessionEvent, TimerEvent, Topic};
pub use repository::{
    FileResultStore, InMemoryResultStore, PlayerRecord, RankingEntry, RepositoryError,
    ResultStore,
};
pub use runtime::{Runtime, RuntimeBuilder, RuntimeConfig};
pub use timer::{TimerHandle, TimerId};
