//! Result store for data that outlives a game session.
//!
//! Repositories hold the records that CHANGE across sessions:
//! - Used identifiers (one play per participant)
//! - The append-only player log
//! - The bounded ranking
//!
//! Boards and sessions are transient and never pass through here.

mod error;
mod export;
mod file_store;
mod in_memory;
mod ledger;
mod traits;

pub use error::{RepositoryError, Result};
pub use export::{CSV_HEADER, render_csv};
pub use file_store::FileResultStore;
pub use in_memory::InMemoryResultStore;
pub use ledger::{PlayerRecord, Ranking, RankingEntry, ResultLedger};
pub use traits::ResultStore;
