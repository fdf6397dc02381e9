//! Cloneable façade for issuing commands to the runtime.
//!
//! [`RuntimeHandle`] hides channel plumbing and offers async helpers for
//! driving a kiosk session or streaming events from specific topics.
use tokio::sync::{broadcast, mpsc, oneshot};

use memory_core::{
    Durations, FlipOutcome, FlipRejection, PlayerIdentity, RegistrationForm, SessionSnapshot,
};

use super::errors::{Result, RuntimeError};
use crate::events::{Event, EventBus, SessionEvent, Topic};
use crate::repository::RankingEntry;
use crate::workers::Command;

/// What happened to a flip request.
///
/// A rejection is an ordinary answer (fast taps, taps while the board is
/// evaluating a pair), not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlipReport {
    Accepted(FlipOutcome),
    Rejected(FlipRejection),
}

impl FlipReport {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted(_))
    }
}

/// Client-facing handle to interact with the runtime
#[derive(Clone)]
pub struct RuntimeHandle {
    command_tx: mpsc::Sender<Command>,
    event_bus: EventBus,
}

impl RuntimeHandle {
    pub(crate) fn new(command_tx: mpsc::Sender<Command>, event_bus: EventBus) -> Self {
        Self {
            command_tx,
            event_bus,
        }
    }

    async fn request<T>(&self, build: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T> {
        let (reply_tx, reply_rx) = oneshot::channel();

        self.command_tx
            .send(build(reply_tx))
            .await
            .map_err(|_| RuntimeError::CommandChannelClosed)?;

        reply_rx.await.map_err(RuntimeError::ReplyChannelClosed)
    }

    /// Registers a validated player and starts the memorize phase.
    ///
    /// Fails with a duplicate-identifier repository error when the
    /// identifier already played; the session stays in registration.
    pub async fn register(&self, identity: PlayerIdentity) -> Result<()> {
        self.request(|reply| Command::Register { identity, reply })
            .await?
    }

    /// Validates raw form input, then registers.
    ///
    /// Validation failures are published as `RegistrationRejected` so a
    /// screen listening on [`Topic::Session`] can show the message.
    pub async fn register_form(&self, form: &RegistrationForm) -> Result<()> {
        match form.validate() {
            Ok(identity) => self.register(identity).await,
            Err(err) => {
                tracing::warn!("registration form rejected: {err}");
                self.event_bus.publish(SessionEvent::RegistrationRejected {
                    identifier: form.identifier.trim().to_string(),
                    reason: err.to_string(),
                });
                Err(err.into())
            }
        }
    }

    /// Flips the card at `position`.
    pub async fn flip(&self, position: usize) -> Result<FlipReport> {
        let result = self
            .request(|reply| Command::Flip { position, reply })
            .await?;
        Ok(match result {
            Ok(outcome) => FlipReport::Accepted(outcome),
            Err(rejection) => FlipReport::Rejected(rejection),
        })
    }

    /// Returns from a finished session to registration.
    pub async fn reset(&self) -> Result<()> {
        self.request(|reply| Command::Reset { reply }).await?
    }

    /// Changes the countdown lengths. Only accepted during registration.
    pub async fn configure_durations(&self, durations: Durations) -> Result<()> {
        self.request(|reply| Command::ConfigureDurations { durations, reply })
            .await?
    }

    /// Query the current session (read-only snapshot)
    pub async fn snapshot(&self) -> Result<SessionSnapshot> {
        self.request(|reply| Command::Snapshot { reply }).await
    }

    /// Current ranking, fastest first.
    pub async fn ranking(&self) -> Result<Vec<RankingEntry>> {
        self.request(|reply| Command::Ranking { reply }).await
    }

    pub async fn is_used(&self, identifier: impl Into<String>) -> Result<bool> {
        let identifier = identifier.into();
        self.request(|reply| Command::IsUsed { identifier, reply })
            .await
    }

    /// CSV dump of the player log. Clears the player log, the used
    /// identifiers and the ranking together.
    pub async fn export_and_clear(&self) -> Result<String> {
        self.request(|reply| Command::ExportAndClear { reply })
            .await?
    }

    pub(crate) async fn shutdown(&self) -> Result<()> {
        self.request(|reply| Command::Shutdown { reply }).await
    }

    /// Subscribe to events from a specific topic
    ///
    /// # Topics
    ///
    /// - `Topic::Session` - Registration, phase changes, outcomes
    /// - `Topic::Board` - Card flips, matches, redraws
    /// - `Topic::Timer` - Countdown ticks
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// use runtime::Topic;
    ///
    /// // Only subscribe to timer events
    /// let mut timer_rx = handle.subscribe(Topic::Timer);
    /// while let Ok(event) = timer_rx.recv().await {
    ///     // Redraw the progress bar
    /// }
    /// ```
    pub fn subscribe(&self, topic: Topic) -> broadcast::Receiver<Event> {
        self.event_bus.subscribe(topic)
    }

    /// Subscribe to multiple topics at once
    ///
    /// Returns a map of topic to receiver for each requested topic.
    pub fn subscribe_multiple(
        &self,
        topics: &[Topic],
    ) -> std::collections::HashMap<Topic, broadcast::Receiver<Event>> {
        self.event_bus.subscribe_multiple(topics)
    }

    /// Get a reference to the event bus for advanced usage
    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }
}
