//! High-level runtime orchestrator.
//!
//! The runtime owns the session worker, wires up command/event channels, and
//! exposes a builder-based API for kiosk frontends.

use std::path::PathBuf;

use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use memory_core::{GameConfig, SessionMachine};

use crate::api::{Result, RuntimeError, RuntimeHandle};
use crate::events::EventBus;
use crate::repository::{FileResultStore, InMemoryResultStore, ResultStore};
use crate::workers::{Command, SessionWorker};

/// Runtime configuration shared across the orchestrator and workers.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub game: GameConfig,
    pub event_buffer_size: usize,
    pub command_buffer_size: usize,
    /// Directory for the result ledger. `None` keeps results in memory only.
    pub data_dir: Option<PathBuf>,
    /// Fixed shuffle seed, for rehearsals and tests.
    pub seed: Option<u64>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            game: GameConfig::default(),
            event_buffer_size: 100,
            command_buffer_size: 32,
            data_dir: None,
            seed: None,
        }
    }
}

/// Main runtime that hosts a kiosk session
///
/// Design: Runtime owns the worker task.
/// [`RuntimeHandle`] provides a cloneable façade for clients.
pub struct Runtime {
    // Shared handle (can be cloned for clients)
    handle: RuntimeHandle,

    // Background worker
    worker_handle: JoinHandle<()>,
}

impl Runtime {
    /// Create a new runtime builder
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Get a cloneable handle to this runtime
    ///
    /// The handle can be shared across clients and async tasks.
    pub fn handle(&self) -> RuntimeHandle {
        self.handle.clone()
    }

    /// Shutdown the runtime gracefully
    ///
    /// Cancels every running timer and waits for the worker to exit, even if
    /// other handle clones are still alive.
    pub async fn shutdown(self) -> Result<()> {
        match self.handle.shutdown().await {
            Ok(()) | Err(RuntimeError::CommandChannelClosed) => {}
            Err(err) => tracing::debug!("worker stopped before shutdown reply: {err}"),
        }
        drop(self.handle);

        self.worker_handle
            .await
            .map_err(RuntimeError::WorkerJoin)?;

        Ok(())
    }
}

/// Builder for [`Runtime`] with flexible configuration.
pub struct RuntimeBuilder {
    config: RuntimeConfig,
    store: Option<Box<dyn ResultStore>>,
}

impl RuntimeBuilder {
    fn new() -> Self {
        Self {
            config: RuntimeConfig::default(),
            store: None,
        }
    }

    /// Override runtime configuration
    pub fn config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    /// Override the game rules configuration only
    pub fn game_config(mut self, game: GameConfig) -> Self {
        self.config.game = game;
        self
    }

    /// Fix the shuffle seed
    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = Some(seed);
        self
    }

    /// Persist results under `dir`
    pub fn data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.data_dir = Some(dir.into());
        self
    }

    /// Use a custom result store instead of the one derived from `data_dir`.
    pub fn store(mut self, store: impl ResultStore + 'static) -> Self {
        self.store = Some(Box::new(store));
        self
    }

    /// Build the runtime
    ///
    /// Must be called from within a tokio runtime.
    pub async fn build(self) -> Result<Runtime> {
        let ranking_limit = self.config.game.ranking_limit;
        let store: Box<dyn ResultStore> = match (self.store, &self.config.data_dir) {
            (Some(store), _) => store,
            (None, Some(dir)) => Box::new(FileResultStore::open(dir, ranking_limit)?),
            (None, None) => Box::new(InMemoryResultStore::new(ranking_limit)),
        };

        let rng = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        let (command_tx, command_rx) =
            mpsc::channel::<Command>(self.config.command_buffer_size.max(1));
        let event_bus = EventBus::with_capacity(self.config.event_buffer_size);

        let handle = RuntimeHandle::new(command_tx, event_bus.clone());

        let machine = SessionMachine::new(self.config.game);
        let worker = SessionWorker::new(machine, store, rng, command_rx, event_bus);

        let worker_handle = tokio::spawn(async move {
            worker.run().await;
        });

        Ok(Runtime {
            handle,
            worker_handle,
        })
    }
}
