//! Session worker that owns the authoritative [`SessionMachine`].
//!
//! Receives commands from [`RuntimeHandle`](crate::RuntimeHandle), turns the
//! machine's [`Effect`]s into timers and result-store writes, and publishes
//! presentation events to the EventBus.
//!
//! Timer callbacks never touch the machine directly. They post a [`Signal`]
//! tagged with their [`TimerId`] back into this worker, and a signal whose
//! timer is no longer the active one is dropped. Together with the handles
//! aborting on cancel, this keeps a stale countdown or mismatch resolution
//! from leaking into the next session.

use std::time::Duration;

use rand::rngs::StdRng;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, trace, warn};

use memory_core::{
    CardView, Durations, Effect, ErrorSeverity, FlipOutcome, FlipRejection, FlipResult,
    GameError, Phase, PlayerIdentity, SessionError, SessionMachine, SessionOutcome,
    SessionSnapshot, SessionState,
};

use crate::api::Result;
use crate::events::{BoardEvent, EventBus, SessionEvent, TimerEvent};
use crate::repository::{RankingEntry, ResultStore};
use crate::timer::{self, TimerHandle, TimerId};

/// Commands that can be sent to the session worker
pub enum Command {
    /// Register a validated player and start the memorize phase.
    Register {
        identity: PlayerIdentity,
        reply: oneshot::Sender<Result<()>>,
    },
    /// Flip the card at `position`.
    Flip {
        position: usize,
        reply: oneshot::Sender<std::result::Result<FlipOutcome, FlipRejection>>,
    },
    /// Return from a finished session to registration.
    Reset { reply: oneshot::Sender<Result<()>> },
    /// Change countdown lengths (registration only).
    ConfigureDurations {
        durations: Durations,
        reply: oneshot::Sender<Result<()>>,
    },
    /// Read-only view of the session and board.
    Snapshot {
        reply: oneshot::Sender<SessionSnapshot>,
    },
    Ranking {
        reply: oneshot::Sender<Vec<RankingEntry>>,
    },
    IsUsed {
        identifier: String,
        reply: oneshot::Sender<bool>,
    },
    /// CSV dump of the player log; clears the whole store.
    ExportAndClear {
        reply: oneshot::Sender<Result<String>>,
    },
    /// Cancel every timer and stop the worker loop.
    Shutdown { reply: oneshot::Sender<()> },
}

/// Messages posted by timer callbacks.
#[derive(Debug)]
enum Signal {
    Tick {
        timer: TimerId,
        phase: Phase,
        remaining: u32,
    },
    Expired {
        timer: TimerId,
        phase: Phase,
    },
    MismatchDue {
        timer: TimerId,
    },
}

/// The single countdown slot. Starting a countdown replaces (and thereby
/// cancels) whatever was here.
struct ActiveCountdown {
    phase: Phase,
    total: u32,
    handle: TimerHandle,
}

/// Background task that processes session commands and timer signals.
pub struct SessionWorker {
    machine: SessionMachine,
    store: Box<dyn ResultStore>,
    rng: StdRng,
    event_bus: EventBus,
    command_rx: mpsc::Receiver<Command>,
    signal_tx: mpsc::UnboundedSender<Signal>,
    signal_rx: mpsc::UnboundedReceiver<Signal>,
    countdown: Option<ActiveCountdown>,
    mismatch: Option<TimerHandle>,
}

impl SessionWorker {
    pub fn new(
        machine: SessionMachine,
        store: Box<dyn ResultStore>,
        rng: StdRng,
        command_rx: mpsc::Receiver<Command>,
        event_bus: EventBus,
    ) -> Self {
        let (signal_tx, signal_rx) = mpsc::unbounded_channel();

        info!(
            "SessionWorker initialized with {} pairs, durations {}s/{}s",
            machine.config().pair_count(),
            machine.durations().memorize_secs(),
            machine.durations().play_secs()
        );

        Self {
            machine,
            store,
            rng,
            event_bus,
            command_rx,
            signal_tx,
            signal_rx,
            countdown: None,
            mismatch: None,
        }
    }

    /// Main worker loop.
    ///
    /// Runs until a `Shutdown` command arrives or every handle is dropped.
    /// Pending timer signals are handled before new commands.
    pub async fn run(mut self) {
        loop {
            tokio::select! {
                biased;
                Some(signal) = self.signal_rx.recv() => {
                    self.handle_signal(signal);
                }
                cmd = self.command_rx.recv() => match cmd {
                    Some(cmd) => {
                        if !self.handle_command(cmd) {
                            break;
                        }
                    }
                    None => break,
                },
            }
        }

        self.cancel_timers();
        info!("SessionWorker stopped");
    }

    /// Returns `false` once the worker should stop.
    fn handle_command(&mut self, cmd: Command) -> bool {
        match cmd {
            Command::Register { identity, reply } => {
                let result = self.handle_register(identity);
                if reply.send(result).is_err() {
                    debug!("Register reply channel closed (caller dropped)");
                }
            }
            Command::Flip { position, reply } => {
                let result = self.handle_flip(position);
                if reply.send(result).is_err() {
                    debug!("Flip reply channel closed (caller dropped)");
                }
            }
            Command::Reset { reply } => {
                let result = self.handle_reset();
                if reply.send(result).is_err() {
                    debug!("Reset reply channel closed (caller dropped)");
                }
            }
            Command::ConfigureDurations { durations, reply } => {
                let result = self.handle_configure_durations(durations);
                if reply.send(result).is_err() {
                    debug!("ConfigureDurations reply channel closed (caller dropped)");
                }
            }
            Command::Snapshot { reply } => {
                if reply.send(self.machine.snapshot()).is_err() {
                    debug!("Snapshot reply channel closed (caller dropped)");
                }
            }
            Command::Ranking { reply } => {
                if reply.send(self.store.ranking()).is_err() {
                    debug!("Ranking reply channel closed (caller dropped)");
                }
            }
            Command::IsUsed { identifier, reply } => {
                if reply.send(self.store.is_used(&identifier)).is_err() {
                    debug!("IsUsed reply channel closed (caller dropped)");
                }
            }
            Command::ExportAndClear { reply } => {
                let result = self.handle_export_and_clear();
                if reply.send(result).is_err() {
                    debug!("ExportAndClear reply channel closed (caller dropped)");
                }
            }
            Command::Shutdown { reply } => {
                self.cancel_timers();
                if reply.send(()).is_err() {
                    debug!("Shutdown reply channel closed (caller dropped)");
                }
                return false;
            }
        }
        true
    }

    // ---------------------------------------------------------------------
    // Commands
    // ---------------------------------------------------------------------

    fn handle_register(&mut self, identity: PlayerIdentity) -> Result<()> {
        let state = self.machine.state();
        if state != SessionState::Registration {
            return Err(SessionError::InvalidTransition {
                state,
                event: "register",
            }
            .into());
        }

        if let Err(err) = self.store.register_player(&identity) {
            warn!(identifier = identity.identifier(), "registration rejected: {err}");
            self.event_bus.publish(SessionEvent::RegistrationRejected {
                identifier: identity.identifier().to_string(),
                reason: err.to_string(),
            });
            return Err(err.into());
        }

        let effects = self.machine.start(identity.clone(), &mut self.rng)?;
        info!(
            identifier = identity.identifier(),
            "player {} registered; memorize phase started",
            identity.name()
        );

        self.event_bus.publish(SessionEvent::Registered {
            name: identity.name().to_string(),
            identifier: identity.identifier().to_string(),
        });
        self.publish_phase_change(SessionState::Registration);
        self.publish_board();
        self.apply_effects(effects);
        Ok(())
    }

    fn handle_flip(&mut self, position: usize) -> std::result::Result<FlipOutcome, FlipRejection> {
        match self.machine.flip(position) {
            Ok(FlipResult { outcome, effects }) => {
                debug!(position, ?outcome, "flip accepted");
                self.publish_flip(&outcome);
                self.apply_effects(effects);
                Ok(outcome)
            }
            Err(rejection) => {
                log_rejection(position, &rejection);
                self.event_bus.publish(BoardEvent::FlipRejected {
                    rejection: rejection.clone(),
                });
                Err(rejection)
            }
        }
    }

    fn handle_reset(&mut self) -> Result<()> {
        let from = self.machine.state();
        let effects = self.machine.reset()?;
        if from == SessionState::Registration {
            trace!("reset while registering; nothing to do");
            return Ok(());
        }

        self.apply_effects(effects);
        info!("session reset from {from}");
        self.event_bus.publish(SessionEvent::Reset);
        self.publish_phase_change(from);
        self.event_bus
            .publish(BoardEvent::Rendered { cards: Vec::new() });
        Ok(())
    }

    fn handle_configure_durations(&mut self, durations: Durations) -> Result<()> {
        self.machine.configure_durations(durations)?;
        let durations = self.machine.durations();
        info!(
            memorize_secs = durations.memorize_secs(),
            play_secs = durations.play_secs(),
            "durations updated"
        );
        self.event_bus
            .publish(SessionEvent::DurationsChanged { durations });
        Ok(())
    }

    fn handle_export_and_clear(&mut self) -> Result<String> {
        let exported_players = self.store.players().len();
        let dump = self.store.export_and_clear()?;
        info!(exported_players, "result store exported and cleared");
        self.event_bus
            .publish(SessionEvent::StoreCleared { exported_players });
        Ok(dump)
    }

    // ---------------------------------------------------------------------
    // Timer signals
    // ---------------------------------------------------------------------

    fn handle_signal(&mut self, signal: Signal) {
        match signal {
            Signal::Tick {
                timer,
                phase,
                remaining,
            } => {
                let Some(total) = self.active_countdown(timer).map(|c| c.total) else {
                    trace!(%timer, "dropping stale tick");
                    return;
                };
                if self.machine.tick(phase, remaining) {
                    trace!(%phase, remaining, "tick");
                    let critical = self.machine.config().is_critical(phase, remaining);
                    self.event_bus
                        .publish(TimerEvent::tick(phase, remaining, total, critical));
                }
            }
            Signal::Expired { timer, phase } => {
                if self.active_countdown(timer).is_none() {
                    trace!(%timer, "dropping stale expiry");
                    return;
                }
                self.countdown = None;
                self.handle_expiry(phase);
            }
            Signal::MismatchDue { timer } => {
                if self.mismatch.as_ref().map(TimerHandle::id) != Some(timer) {
                    trace!(%timer, "dropping stale mismatch resolution");
                    return;
                }
                self.mismatch = None;
                if let Some((first, second)) = self.machine.resolve_mismatch() {
                    debug!(first, second, "mismatched pair hidden");
                    self.event_bus
                        .publish(BoardEvent::PairHidden { first, second });
                }
            }
        }
    }

    fn handle_expiry(&mut self, phase: Phase) {
        let from = self.machine.state();
        let result = match phase {
            Phase::Memorize => self.machine.memorize_expired(),
            Phase::Play => self.machine.play_expired(),
        };

        match result {
            Ok(effects) => {
                if phase == Phase::Memorize {
                    info!("memorize phase over; play phase started");
                    self.publish_phase_change(from);
                    self.publish_board();
                }
                self.apply_effects(effects);
            }
            Err(err) => warn!(%phase, "ignoring countdown expiry: {err}"),
        }
    }

    fn active_countdown(&self, timer: TimerId) -> Option<&ActiveCountdown> {
        self.countdown
            .as_ref()
            .filter(|countdown| countdown.handle.id() == timer)
    }

    // ---------------------------------------------------------------------
    // Effects
    // ---------------------------------------------------------------------

    fn apply_effects(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::StartCountdown { phase, seconds } => self.start_countdown(phase, seconds),
                Effect::CancelCountdown => {
                    if let Some(countdown) = self.countdown.take() {
                        countdown.handle.cancel();
                        debug!(timer = %countdown.handle.id(), phase = %countdown.phase, "countdown cancelled");
                    }
                }
                Effect::ScheduleMismatchResolve { delay_ms } => {
                    let tx = self.signal_tx.clone();
                    let handle = timer::schedule(Duration::from_millis(delay_ms), move |timer| {
                        if tx.send(Signal::MismatchDue { timer }).is_err() {
                            trace!(%timer, "session worker gone; dropping mismatch signal");
                        }
                    });
                    debug!(timer = %handle.id(), delay_ms, "mismatch resolution scheduled");
                    self.mismatch = Some(handle);
                }
                Effect::CancelMismatchResolve => {
                    if let Some(handle) = self.mismatch.take() {
                        handle.cancel();
                        debug!(timer = %handle.id(), "mismatch resolution cancelled");
                    }
                }
                Effect::Finish(outcome) => self.finish(outcome),
            }
        }
    }

    fn start_countdown(&mut self, phase: Phase, seconds: u32) {
        if let Some(previous) = self.countdown.take() {
            previous.handle.cancel();
            debug!(timer = %previous.handle.id(), "replaced running countdown");
        }

        let tick_tx = self.signal_tx.clone();
        let expire_tx = self.signal_tx.clone();
        let handle = timer::start_countdown(
            seconds,
            move |timer, remaining| {
                if tick_tx
                    .send(Signal::Tick {
                        timer,
                        phase,
                        remaining,
                    })
                    .is_err()
                {
                    trace!(%timer, "session worker gone; dropping tick");
                }
            },
            move |timer| {
                if expire_tx.send(Signal::Expired { timer, phase }).is_err() {
                    trace!(%timer, "session worker gone; dropping expiry");
                }
            },
        );

        let critical = self.machine.config().is_critical(phase, seconds);
        self.event_bus
            .publish(TimerEvent::tick(phase, seconds, seconds, critical));
        self.countdown = Some(ActiveCountdown {
            phase,
            total: seconds,
            handle,
        });
    }

    fn finish(&mut self, outcome: SessionOutcome) {
        let identifier = outcome.player().identifier().to_string();
        let name = outcome.player().name().to_string();
        let from = SessionState::Playing;

        match outcome {
            SessionOutcome::Won {
                elapsed_secs,
                attempts,
                ..
            } => {
                let rank = self
                    .store
                    .record_score(RankingEntry::new(name.clone(), elapsed_secs))
                    .unwrap_or_else(|err| {
                        warn!("failed to record score for {name}: {err}");
                        None
                    });
                self.mark_used(&identifier);
                info!(elapsed_secs, attempts, ?rank, "{name} won");

                self.publish_phase_change(from);
                self.event_bus.publish(SessionEvent::Won {
                    name,
                    elapsed_secs,
                    attempts,
                    rank,
                    ranking: self.store.ranking(),
                });
            }
            SessionOutcome::Lost {
                pairs_found,
                total_pairs,
                attempts,
                ..
            } => {
                self.mark_used(&identifier);
                info!(pairs_found, total_pairs, attempts, "{name} ran out of time");

                self.publish_phase_change(from);
                self.event_bus.publish(SessionEvent::Lost {
                    name,
                    pairs_found,
                    total_pairs,
                    attempts,
                });
            }
        }
    }

    fn mark_used(&mut self, identifier: &str) {
        if let Err(err) = self.store.mark_used(identifier) {
            error!(identifier, "failed to mark identifier as used: {err}");
        }
    }

    fn cancel_timers(&mut self) {
        if let Some(countdown) = self.countdown.take() {
            countdown.handle.cancel();
        }
        if let Some(handle) = self.mismatch.take() {
            handle.cancel();
        }
    }

    // ---------------------------------------------------------------------
    // Presentation
    // ---------------------------------------------------------------------

    fn publish_phase_change(&self, from: SessionState) {
        let to = self.machine.state();
        if from != to {
            self.event_bus
                .publish(SessionEvent::PhaseChanged { from, to });
        }
    }

    fn publish_board(&self) {
        let cards = self
            .machine
            .board()
            .map(|board| board.views())
            .unwrap_or_default();
        self.event_bus.publish(BoardEvent::Rendered { cards });
    }

    fn publish_flip(&self, outcome: &FlipOutcome) {
        let flipped = match *outcome {
            FlipOutcome::FirstCard { position } => position,
            FlipOutcome::Matched { second, .. } | FlipOutcome::Mismatch { second, .. } => second,
        };
        if let Some(card) = self.machine.board().and_then(|b| b.card(flipped)) {
            self.event_bus.publish(BoardEvent::CardFlipped {
                card: CardView::from(card),
            });
        }

        if let FlipOutcome::Matched { first, second, .. } = *outcome {
            self.event_bus
                .publish(BoardEvent::PairMatched { first, second });
        }
        if outcome.completes_attempt() {
            self.event_bus.publish(BoardEvent::AttemptsChanged {
                attempts: self.machine.session().attempts,
            });
        }
    }
}

fn log_rejection(position: usize, rejection: &FlipRejection) {
    let code = rejection.error_code();
    match rejection.severity() {
        ErrorSeverity::Recoverable => debug!(position, code, "flip dropped: {rejection}"),
        ErrorSeverity::Validation => warn!(position, code, "flip rejected: {rejection}"),
        ErrorSeverity::Internal | ErrorSeverity::Fatal => {
            error!(position, code, "flip failed: {rejection}")
        }
    }
}
