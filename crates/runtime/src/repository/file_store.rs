//! JSON-file backed [`ResultStore`].

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use memory_core::PlayerIdentity;

use super::error::{RepositoryError, Result};
use super::ledger::{PlayerRecord, RankingEntry, ResultLedger};
use super::traits::ResultStore;

/// File-based implementation of [`ResultStore`].
///
/// The used-identifier list, player log and ranking live in a single JSON
/// document. Every mutation is applied to a copy of the ledger, written to a
/// temp file and renamed over the previous document; the in-memory ledger is
/// only replaced once the rename succeeded. A failed write therefore leaves
/// both the file and the in-memory view untouched.
pub struct FileResultStore {
    path: PathBuf,
    ledger: ResultLedger,
}

impl FileResultStore {
    pub const FILE_NAME: &'static str = "results.json";

    /// Opens (or creates) the store in `base_dir`.
    ///
    /// The configured `ranking_limit` wins over the one stored in the file; a
    /// lower limit drops the slowest stored entries on the next write.
    pub fn open(base_dir: impl AsRef<Path>, ranking_limit: usize) -> Result<Self> {
        let base_dir = base_dir.as_ref();
        fs::create_dir_all(base_dir)?;
        let path = base_dir.join(Self::FILE_NAME);

        let ledger = if path.exists() {
            let json = fs::read_to_string(&path)?;
            let mut ledger: ResultLedger =
                serde_json::from_str(&json).map_err(|e| RepositoryError::Json(e.to_string()))?;
            if ledger.ranking().limit() != ranking_limit {
                tracing::info!(
                    stored = ledger.ranking().limit(),
                    configured = ranking_limit,
                    "applying configured ranking limit to stored ledger"
                );
                ledger.set_ranking_limit(ranking_limit);
            }
            tracing::info!(
                "Loaded result ledger from {} ({} players, {} used identifiers)",
                path.display(),
                ledger.players().len(),
                ledger.used_identifiers().count()
            );
            ledger
        } else {
            ResultLedger::new(ranking_limit)
        };

        Ok(Self { path, ledger })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn ledger(&self) -> &ResultLedger {
        &self.ledger
    }

    /// Applies `change` to a copy, persists it, then commits it in memory.
    fn commit<T>(&mut self, change: impl FnOnce(&mut ResultLedger) -> Result<T>) -> Result<T> {
        let mut next = self.ledger.clone();
        let value = change(&mut next)?;
        self.persist(&next)?;
        self.ledger = next;
        Ok(value)
    }

    fn persist(&self, ledger: &ResultLedger) -> Result<()> {
        let temp_path = self.path.with_extension("json.tmp");

        let json = serde_json::to_string_pretty(ledger)
            .map_err(|e| RepositoryError::Json(e.to_string()))?;
        fs::write(&temp_path, json)?;

        // Atomic rename
        fs::rename(&temp_path, &self.path)?;

        tracing::debug!("Saved result ledger: {}", self.path.display());
        Ok(())
    }
}

impl ResultStore for FileResultStore {
    fn is_used(&self, identifier: &str) -> bool {
        self.ledger.is_used(identifier)
    }

    fn register_player(&mut self, identity: &PlayerIdentity) -> Result<()> {
        let now = Utc::now();
        self.commit(|ledger| ledger.register_player(identity, now))
    }

    fn mark_used(&mut self, identifier: &str) -> Result<()> {
        if self.ledger.is_used(identifier) {
            return Ok(());
        }
        self.commit(|ledger| {
            ledger.mark_used(identifier);
            Ok(())
        })
    }

    fn record_score(&mut self, entry: RankingEntry) -> Result<Option<usize>> {
        self.commit(|ledger| Ok(ledger.record_score(entry)))
    }

    fn ranking(&self) -> Vec<RankingEntry> {
        self.ledger.ranking().entries().to_vec()
    }

    fn players(&self) -> Vec<PlayerRecord> {
        self.ledger.players().to_vec()
    }

    fn export_and_clear(&mut self) -> Result<String> {
        let dump = self.ledger.export_csv();
        let cleared = self.ledger.cleared();
        self.persist(&cleared)?;
        self.ledger = cleared;
        tracing::info!("Exported and cleared result ledger");
        Ok(dump)
    }
}
