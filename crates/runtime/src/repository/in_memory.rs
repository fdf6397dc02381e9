use chrono::Utc;
use memory_core::PlayerIdentity;

use super::error::Result;
use super::ledger::{PlayerRecord, RankingEntry, ResultLedger};
use super::traits::ResultStore;

/// In-memory implementation of [`ResultStore`], for tests and kiosks that
/// run without a data directory.
#[derive(Debug, Clone)]
pub struct InMemoryResultStore {
    ledger: ResultLedger,
}

impl InMemoryResultStore {
    pub fn new(ranking_limit: usize) -> Self {
        Self {
            ledger: ResultLedger::new(ranking_limit),
        }
    }

    pub fn ledger(&self) -> &ResultLedger {
        &self.ledger
    }
}

impl ResultStore for InMemoryResultStore {
    fn is_used(&self, identifier: &str) -> bool {
        self.ledger.is_used(identifier)
    }

    fn register_player(&mut self, identity: &PlayerIdentity) -> Result<()> {
        self.ledger.register_player(identity, Utc::now())
    }

    fn mark_used(&mut self, identifier: &str) -> Result<()> {
        self.ledger.mark_used(identifier);
        Ok(())
    }

    fn record_score(&mut self, entry: RankingEntry) -> Result<Option<usize>> {
        Ok(self.ledger.record_score(entry))
    }

    fn ranking(&self) -> Vec<RankingEntry> {
        self.ledger.ranking().entries().to_vec()
    }

    fn players(&self) -> Vec<PlayerRecord> {
        self.ledger.players().to_vec()
    }

    fn export_and_clear(&mut self) -> Result<String> {
        let dump = self.ledger.export_csv();
        self.ledger = self.ledger.cleared();
        Ok(dump)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::RepositoryError;

    #[test]
    fn second_registration_fails_and_used_set_stays_at_one() {
        let mut store = InMemoryResultStore::new(5);
        let identity = PlayerIdentity::new("12345678901", "Ana", "51998765432");

        store.register_player(&identity).unwrap();
        store.mark_used(identity.identifier()).unwrap();

        let err = store.register_player(&identity).unwrap_err();
        assert!(matches!(err, RepositoryError::DuplicateIdentifier { .. }));
        store.mark_used(identity.identifier()).unwrap();

        assert!(store.is_used("12345678901"));
        assert_eq!(store.ledger().used_identifiers().count(), 1);
        assert_eq!(store.players().len(), 1);
    }

    #[test]
    fn export_and_clear_empties_everything() {
        let mut store = InMemoryResultStore::new(5);
        let identity = PlayerIdentity::new("12345678901", "Ana", "51998765432");
        store.register_player(&identity).unwrap();
        store.mark_used(identity.identifier()).unwrap();
        store.record_score(RankingEntry::new("Ana", 25)).unwrap();

        let dump = store.export_and_clear().unwrap();
        assert!(dump.contains("\"Ana\",\"51998765432\",\"\",\"12345678901\""));

        assert!(!store.is_used("12345678901"));
        assert!(store.players().is_empty());
        assert!(store.ranking().is_empty());
        assert_eq!(store.ledger().ranking().limit(), 5);

        // The identifier can play again after a clear.
        store.register_player(&identity).unwrap();
    }
}
