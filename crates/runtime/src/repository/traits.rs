//! Result store contract.

use memory_core::PlayerIdentity;

use super::error::Result;
use super::ledger::{PlayerRecord, RankingEntry};

/// Persistence for everything that outlives a single game session:
/// the used-identifier set, the player log and the ranking.
///
/// The session worker owns its store exclusively, so mutating operations
/// take `&mut self`.
pub trait ResultStore: Send {
    /// Membership test against the used-identifier set.
    fn is_used(&self, identifier: &str) -> bool;

    /// Appends a player record.
    ///
    /// Fails with `DuplicateIdentifier` if the identifier was already used
    /// or already registered, so a double submission is harmless.
    fn register_player(&mut self, identity: &PlayerIdentity) -> Result<()>;

    /// Idempotent add to the used-identifier set.
    fn mark_used(&mut self, identifier: &str) -> Result<()>;

    /// Inserts into the ranking, keeping the best entries only.
    ///
    /// Returns the 0-based rank, or `None` if the time did not qualify.
    fn record_score(&mut self, entry: RankingEntry) -> Result<Option<usize>>;

    /// Current ranking, best first.
    fn ranking(&self) -> Vec<RankingEntry>;

    /// Player log in registration order.
    fn players(&self) -> Vec<PlayerRecord>;

    /// Returns a CSV dump of the player log and clears the player log, the
    /// used-identifier set and the ranking together. Either all three are
    /// cleared or, on error, none are.
    fn export_and_clear(&mut self) -> Result<String>;
}
