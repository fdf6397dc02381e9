//! Records kept by the result store and the ledger that groups them.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use memory_core::PlayerIdentity;
use serde::{Deserialize, Serialize};

use super::error::{RepositoryError, Result};
use super::export;

/// One completed registration. Append-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub name: String,
    pub phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub identifier: String,
    pub registered_at: DateTime<Utc>,
}

impl PlayerRecord {
    pub fn from_identity(identity: &PlayerIdentity, registered_at: DateTime<Utc>) -> Self {
        Self {
            name: identity.name().to_string(),
            phone: identity.phone().to_string(),
            email: identity.email().map(str::to_string),
            identifier: identity.identifier().to_string(),
            registered_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankingEntry {
    pub name: String,
    pub elapsed_secs: u32,
}

impl RankingEntry {
    pub fn new(name: impl Into<String>, elapsed_secs: u32) -> Self {
        Self {
            name: name.into(),
            elapsed_secs,
        }
    }
}

/// Bounded leaderboard, ascending by elapsed time.
///
/// Ties keep insertion order: an earlier entry stays ahead of a later one
/// with the same time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ranking {
    limit: usize,
    entries: Vec<RankingEntry>,
}

impl Ranking {
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            entries: Vec::with_capacity(limit + 1),
        }
    }

    /// Inserts, re-sorts and truncates. Returns the 0-based rank of the new
    /// entry, or `None` if it did not make the cut.
    pub fn insert(&mut self, entry: RankingEntry) -> Option<usize> {
        self.entries.push(entry);
        let inserted = self.entries.len() - 1;

        // Stable sort keeps earlier entries ahead on ties; the new entry is
        // last among equals, so its rank is the count of entries not slower.
        let elapsed = self.entries[inserted].elapsed_secs;
        let rank = self.entries[..inserted]
            .iter()
            .filter(|e| e.elapsed_secs <= elapsed)
            .count();

        self.entries.sort_by_key(|e| e.elapsed_secs);
        self.entries.truncate(self.limit);
        (rank < self.limit).then_some(rank)
    }

    pub fn entries(&self) -> &[RankingEntry] {
        &self.entries
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Changes the limit, dropping the slowest entries that no longer fit.
    pub fn set_limit(&mut self, limit: usize) {
        self.limit = limit;
        self.entries.truncate(limit);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Everything the kiosk persists, kept together so it can be cleared as a unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultLedger {
    used_identifiers: BTreeSet<String>,
    players: Vec<PlayerRecord>,
    ranking: Ranking,
}

impl ResultLedger {
    pub fn new(ranking_limit: usize) -> Self {
        Self {
            used_identifiers: BTreeSet::new(),
            players: Vec::new(),
            ranking: Ranking::new(ranking_limit),
        }
    }

    pub fn is_used(&self, identifier: &str) -> bool {
        self.used_identifiers.contains(identifier)
    }

    /// Used, or registered for a session that has not finished yet.
    pub fn is_known(&self, identifier: &str) -> bool {
        self.is_used(identifier) || self.players.iter().any(|p| p.identifier == identifier)
    }

    pub fn register_player(
        &mut self,
        identity: &PlayerIdentity,
        registered_at: DateTime<Utc>,
    ) -> Result<()> {
        if self.is_known(identity.identifier()) {
            return Err(RepositoryError::DuplicateIdentifier {
                identifier: identity.identifier().to_string(),
            });
        }
        self.players
            .push(PlayerRecord::from_identity(identity, registered_at));
        Ok(())
    }

    /// Returns false if the identifier was already marked.
    pub fn mark_used(&mut self, identifier: &str) -> bool {
        self.used_identifiers.insert(identifier.to_string())
    }

    pub fn record_score(&mut self, entry: RankingEntry) -> Option<usize> {
        self.ranking.insert(entry)
    }

    pub fn used_identifiers(&self) -> impl Iterator<Item = &str> {
        self.used_identifiers.iter().map(String::as_str)
    }

    pub fn players(&self) -> &[PlayerRecord] {
        &self.players
    }

    pub fn ranking(&self) -> &Ranking {
        &self.ranking
    }

    pub fn set_ranking_limit(&mut self, limit: usize) {
        self.ranking.set_limit(limit);
    }

    /// CSV dump of the player log.
    pub fn export_csv(&self) -> String {
        export::render_csv(&self.players)
    }

    /// An empty ledger with the same ranking limit.
    pub fn cleared(&self) -> Self {
        Self::new(self.ranking.limit())
    }
}
