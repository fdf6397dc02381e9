use rand::Rng;

use crate::board::{Board, FlipOutcome, FlipRejection};
use crate::config::{Durations, GameConfig};
use crate::identity::PlayerIdentity;

use super::{Effect, Phase, Session, SessionError, SessionOutcome, SessionSnapshot, SessionState};

/// An accepted flip together with the effects it triggered.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FlipResult {
    pub outcome: FlipOutcome,
    pub effects: Vec<Effect>,
}

/// State machine that owns the session fields and the board.
///
/// Transitions:
///
/// ```text
/// Registration --start--> Memorize --memorize_expired--> Playing
/// Playing --last pair matched--> Won
/// Playing --play_expired--> Lost
/// Won | Lost --reset--> Registration
/// ```
pub struct SessionMachine {
    config: GameConfig,
    session: Session,
    board: Option<Board>,
}

impl SessionMachine {
    pub fn new(config: GameConfig) -> Self {
        let session = Session::new(config.durations);
        Self {
            config,
            session,
            board: None,
        }
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn state(&self) -> SessionState {
        self.session.state
    }

    pub fn board(&self) -> Option<&Board> {
        self.board.as_ref()
    }

    pub fn durations(&self) -> Durations {
        self.session.durations
    }

    pub fn player(&self) -> Option<&PlayerIdentity> {
        self.session.player.as_ref()
    }

    /// Changes the countdown lengths used by the next session.
    pub fn configure_durations(&mut self, durations: Durations) -> Result<(), SessionError> {
        if self.session.state != SessionState::Registration {
            return Err(SessionError::DurationsLocked {
                state: self.session.state,
            });
        }
        let durations = Durations::new(durations.memorize_secs(), durations.play_secs())?;
        self.session = Session::new(durations);
        Ok(())
    }

    /// Registration -> Memorize. Builds a fresh board over the full icon set
    /// and shows it face up.
    pub fn start<R: Rng + ?Sized>(
        &mut self,
        player: PlayerIdentity,
        rng: &mut R,
    ) -> Result<Vec<Effect>, SessionError> {
        self.expect_state(SessionState::Registration, "start a session")?;

        let mut board = Board::build(&self.config.icons, self.config.pair_count(), rng)?;
        board.freeze();
        board.reveal_all();

        let durations = self.session.durations;
        self.session = Session::new(durations);
        self.session.state = SessionState::Memorize;
        self.session.player = Some(player);
        self.board = Some(board);

        Ok(vec![Effect::StartCountdown {
            phase: Phase::Memorize,
            seconds: durations.memorize_secs(),
        }])
    }

    /// Records a countdown tick. Ticks for a phase that is no longer active
    /// are ignored and reported as `false`.
    pub fn tick(&mut self, phase: Phase, remaining: u32) -> bool {
        match (phase, self.session.state) {
            (Phase::Memorize, SessionState::Memorize) => {
                self.session.memorize_remaining = remaining;
                true
            }
            (Phase::Play, SessionState::Playing) => {
                self.session.play_remaining = remaining;
                self.session.elapsed_play_secs =
                    self.session.durations.play_secs().saturating_sub(remaining);
                true
            }
            _ => false,
        }
    }

    /// Memorize -> Playing. Only the memorize countdown may trigger this.
    pub fn memorize_expired(&mut self) -> Result<Vec<Effect>, SessionError> {
        self.expect_state(SessionState::Memorize, "end memorization")?;
        let state = self.session.state;
        let board = self
            .board
            .as_mut()
            .ok_or(SessionError::MissingBoard { state })?;
        board.hide_all();
        board.unlock();

        let play_secs = self.session.durations.play_secs();
        self.session.state = SessionState::Playing;
        self.session.memorize_remaining = 0;
        self.session.play_remaining = play_secs;
        self.session.elapsed_play_secs = 0;
        self.session.attempts = 0;

        Ok(vec![Effect::StartCountdown {
            phase: Phase::Play,
            seconds: play_secs,
        }])
    }

    /// Flips a card during play.
    pub fn flip(&mut self, position: usize) -> Result<FlipResult, FlipRejection> {
        let state = self.session.state;
        if state != SessionState::Playing {
            return Err(FlipRejection::NotPlaying { state });
        }
        let board = self
            .board
            .as_mut()
            .ok_or(FlipRejection::NotPlaying { state })?;

        let outcome = board.flip(position)?;
        if outcome.completes_attempt() {
            self.session.attempts = self.session.attempts.saturating_add(1);
        }

        let effects = match outcome {
            FlipOutcome::Matched { won: true, .. } => self.finish_won(),
            FlipOutcome::Mismatch { .. } => vec![Effect::ScheduleMismatchResolve {
                delay_ms: self.config.mismatch_delay_ms,
            }],
            _ => Vec::new(),
        };

        Ok(FlipResult { outcome, effects })
    }

    /// Hides a pending mismatched pair once its presentation delay has passed.
    pub fn resolve_mismatch(&mut self) -> Option<(usize, usize)> {
        if self.session.state != SessionState::Playing {
            return None;
        }
        self.board.as_mut()?.resolve_mismatch()
    }

    /// Playing -> Lost. Triggered by the play countdown reaching zero.
    pub fn play_expired(&mut self) -> Result<Vec<Effect>, SessionError> {
        self.expect_state(SessionState::Playing, "expire the play countdown")?;

        self.session.state = SessionState::Lost;
        self.session.play_remaining = 0;
        self.session.elapsed_play_secs = self.session.durations.play_secs();

        let (pairs_found, total_pairs) = match self.board.as_mut() {
            Some(board) => {
                board.freeze();
                (board.matched_pairs(), board.pair_count())
            }
            None => (0, self.config.pair_count()),
        };

        let mut effects = vec![Effect::CancelMismatchResolve];
        if let Some(player) = self.session.player.clone() {
            effects.push(Effect::Finish(SessionOutcome::Lost {
                player,
                pairs_found,
                total_pairs,
                attempts: self.session.attempts,
            }));
        }
        Ok(effects)
    }

    /// Won | Lost -> Registration. A reset while already registering is a no-op.
    pub fn reset(&mut self) -> Result<Vec<Effect>, SessionError> {
        match self.session.state {
            SessionState::Registration => Ok(Vec::new()),
            SessionState::Won | SessionState::Lost => {
                self.session = Session::new(self.session.durations);
                self.board = None;
                Ok(vec![Effect::CancelCountdown, Effect::CancelMismatchResolve])
            }
            state => Err(SessionError::invalid(state, "reset")),
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let session = &self.session;
        let (cards, pending, lock, matched_pairs) = match &self.board {
            Some(board) => (
                board.views(),
                board.pending().to_vec(),
                Some(board.lock()),
                board.matched_pairs(),
            ),
            None => (Vec::new(), Vec::new(), None, 0),
        };

        SessionSnapshot {
            state: session.state,
            attempts: session.attempts,
            elapsed_play_secs: session.elapsed_play_secs,
            memorize_remaining: session.memorize_remaining,
            play_remaining: session.play_remaining,
            durations: session.durations,
            player_name: session.player.as_ref().map(|p| p.name().to_string()),
            cards,
            pending,
            lock,
            matched_pairs,
            total_pairs: self.config.pair_count(),
        }
    }

    fn finish_won(&mut self) -> Vec<Effect> {
        let elapsed_secs = self
            .session
            .durations
            .play_secs()
            .saturating_sub(self.session.play_remaining);
        self.session.elapsed_play_secs = elapsed_secs;
        self.session.state = SessionState::Won;
        if let Some(board) = self.board.as_mut() {
            board.freeze();
        }

        let mut effects = vec![Effect::CancelCountdown];
        if let Some(player) = self.session.player.clone() {
            effects.push(Effect::Finish(SessionOutcome::Won {
                player,
                elapsed_secs,
                attempts: self.session.attempts,
            }));
        }
        effects
    }

    fn expect_state(&self, expected: SessionState, event: &'static str) -> Result<(), SessionError> {
        if self.session.state == expected {
            Ok(())
        } else {
            Err(SessionError::invalid(self.session.state, event))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{BoardLock, CardState, IconSet};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn machine(pairs: usize, memorize: u32, play: u32) -> SessionMachine {
        let config = GameConfig::new()
            .with_icons(IconSet::numbered(pairs).unwrap())
            .with_durations(Durations::new(memorize, play).unwrap());
        SessionMachine::new(config)
    }

    fn player() -> PlayerIdentity {
        PlayerIdentity::new("12345678901", "Ana", "51998765432")
    }

    fn started(pairs: usize, memorize: u32, play: u32) -> SessionMachine {
        let mut machine = machine(pairs, memorize, play);
        let mut rng = StdRng::seed_from_u64(3);
        machine.start(player(), &mut rng).unwrap();
        machine
    }

    fn playing(pairs: usize, memorize: u32, play: u32) -> SessionMachine {
        let mut machine = started(pairs, memorize, play);
        machine.memorize_expired().unwrap();
        machine
    }

    /// Pairs of positions sharing an icon, in board order.
    fn solution(machine: &SessionMachine) -> Vec<(usize, usize)> {
        let cards = machine.board().unwrap().cards();
        let mut pairs = Vec::new();
        for (i, card) in cards.iter().enumerate() {
            if let Some(j) = cards[i + 1..].iter().position(|c| c.icon == card.icon) {
                pairs.push((i, i + 1 + j));
            }
        }
        pairs
    }

    fn mismatched_pair(machine: &SessionMachine) -> (usize, usize) {
        let cards = machine.board().unwrap().cards();
        let other = cards.iter().position(|c| c.icon != cards[0].icon).unwrap();
        (0, other)
    }

    #[test]
    fn start_reveals_a_frozen_board_and_starts_memorize_countdown() {
        let mut machine = machine(6, 10, 45);
        let mut rng = StdRng::seed_from_u64(1);
        let effects = machine.start(player(), &mut rng).unwrap();

        assert_eq!(
            effects,
            vec![Effect::StartCountdown {
                phase: Phase::Memorize,
                seconds: 10
            }]
        );
        assert_eq!(machine.state(), SessionState::Memorize);
        let board = machine.board().unwrap();
        assert_eq!(board.len(), 12);
        assert_eq!(board.lock(), BoardLock::Frozen);
        assert!(board.cards().iter().all(|c| c.state == CardState::FaceUp));
    }

    #[test]
    fn start_is_only_valid_during_registration() {
        let mut machine = started(2, 5, 5);
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(
            machine.start(player(), &mut rng),
            Err(SessionError::InvalidTransition {
                state: SessionState::Memorize,
                event: "start a session"
            })
        );
    }

    #[test]
    fn flips_during_memorize_are_rejected() {
        let mut machine = started(2, 5, 5);
        assert_eq!(
            machine.flip(0),
            Err(FlipRejection::NotPlaying {
                state: SessionState::Memorize
            })
        );
    }

    #[test]
    fn memorize_expiry_hides_board_and_starts_play_countdown() {
        let mut machine = started(6, 10, 45);
        for remaining in (0..10).rev() {
            assert!(machine.tick(Phase::Memorize, remaining));
        }
        let effects = machine.memorize_expired().unwrap();

        assert_eq!(
            effects,
            vec![Effect::StartCountdown {
                phase: Phase::Play,
                seconds: 45
            }]
        );
        assert_eq!(machine.state(), SessionState::Playing);
        assert_eq!(machine.session().play_remaining, 45);
        assert_eq!(machine.session().attempts, 0);
        let board = machine.board().unwrap();
        assert_eq!(board.lock(), BoardLock::Unlocked);
        assert!(board.cards().iter().all(|c| c.state == CardState::FaceDown));
    }

    #[test]
    fn stale_ticks_are_ignored() {
        let mut machine = playing(2, 5, 30);
        assert!(!machine.tick(Phase::Memorize, 2));
        assert_eq!(machine.session().memorize_remaining, 0);
        assert!(machine.tick(Phase::Play, 21));
        assert_eq!(machine.session().elapsed_play_secs, 9);
    }

    #[test]
    fn matching_every_pair_wins_with_elapsed_time() {
        let mut machine = playing(6, 10, 45);
        for remaining in (20..45).rev() {
            machine.tick(Phase::Play, remaining);
        }

        let pairs = solution(&machine);
        assert_eq!(pairs.len(), 6);
        let mut last = None;
        for (first, second) in pairs {
            machine.flip(first).unwrap();
            last = Some(machine.flip(second).unwrap());
        }

        let result = last.unwrap();
        assert!(matches!(
            result.outcome,
            FlipOutcome::Matched { won: true, .. }
        ));
        assert_eq!(
            result.effects,
            vec![
                Effect::CancelCountdown,
                Effect::Finish(SessionOutcome::Won {
                    player: player(),
                    elapsed_secs: 25,
                    attempts: 6,
                })
            ]
        );
        assert_eq!(machine.state(), SessionState::Won);
        assert_eq!(machine.session().elapsed_play_secs, 25);
    }

    #[test]
    fn win_requires_at_least_one_attempt_per_pair() {
        let mut machine = playing(3, 5, 60);
        let (a, b) = mismatched_pair(&machine);
        machine.flip(a).unwrap();
        let result = machine.flip(b).unwrap();
        assert_eq!(
            result.effects,
            vec![Effect::ScheduleMismatchResolve { delay_ms: 800 }]
        );
        assert_eq!(machine.resolve_mismatch(), Some((a, b)));

        for (first, second) in solution(&machine) {
            assert_ne!(machine.state(), SessionState::Won);
            machine.flip(first).unwrap();
            machine.flip(second).unwrap();
        }
        assert_eq!(machine.state(), SessionState::Won);
        assert_eq!(machine.session().attempts, 4);
        assert_eq!(machine.board().unwrap().matched_pairs(), 3);
    }

    #[test]
    fn third_flip_during_mismatch_is_rejected() {
        let mut machine = playing(3, 5, 60);
        let (a, b) = mismatched_pair(&machine);
        machine.flip(a).unwrap();
        machine.flip(b).unwrap();

        let third = (0..6).find(|p| *p != a && *p != b).unwrap();
        assert_eq!(machine.flip(third), Err(FlipRejection::Locked));
        assert_eq!(machine.session().attempts, 1);
    }

    #[test]
    fn play_expiry_loses_and_reports_pairs_found() {
        let mut machine = playing(3, 5, 30);
        let (first, second) = solution(&machine)[0];
        machine.flip(first).unwrap();
        machine.flip(second).unwrap();

        let effects = machine.play_expired().unwrap();
        assert_eq!(
            effects,
            vec![
                Effect::CancelMismatchResolve,
                Effect::Finish(SessionOutcome::Lost {
                    player: player(),
                    pairs_found: 1,
                    total_pairs: 3,
                    attempts: 1,
                })
            ]
        );
        assert_eq!(machine.state(), SessionState::Lost);
        assert!(machine.flip(0).is_err());
    }

    #[test]
    fn pending_mismatch_is_discarded_on_loss() {
        let mut machine = playing(3, 5, 30);
        let (a, b) = mismatched_pair(&machine);
        machine.flip(a).unwrap();
        machine.flip(b).unwrap();

        machine.play_expired().unwrap();
        assert_eq!(machine.resolve_mismatch(), None);
    }

    #[test]
    fn durations_are_locked_outside_registration() {
        let mut machine = started(2, 10, 45);
        let change = Durations::new(3, 3).unwrap();
        assert_eq!(
            machine.configure_durations(change),
            Err(SessionError::DurationsLocked {
                state: SessionState::Memorize
            })
        );
        machine.memorize_expired().unwrap();
        assert_eq!(machine.session().play_remaining, 45);
    }

    #[test]
    fn reset_restores_defaults_but_keeps_durations() {
        let mut machine = machine(2, 10, 45);
        machine
            .configure_durations(Durations::new(7, 33).unwrap())
            .unwrap();
        let mut rng = StdRng::seed_from_u64(9);
        machine.start(player(), &mut rng).unwrap();
        machine.memorize_expired().unwrap();
        machine.play_expired().unwrap();

        let effects = machine.reset().unwrap();
        assert_eq!(
            effects,
            vec![Effect::CancelCountdown, Effect::CancelMismatchResolve]
        );
        assert_eq!(machine.state(), SessionState::Registration);
        assert!(machine.board().is_none());
        assert_eq!(*machine.session(), Session::new(Durations::new(7, 33).unwrap()));
    }

    #[test]
    fn reset_mid_session_is_rejected_and_stale_expiry_after_reset_fails() {
        let mut machine = started(2, 5, 5);
        assert!(machine.reset().is_err());

        machine.memorize_expired().unwrap();
        machine.play_expired().unwrap();
        machine.reset().unwrap();
        assert!(machine.memorize_expired().is_err());
        assert!(machine.play_expired().is_err());
        assert_eq!(machine.reset(), Ok(Vec::new()));
    }

    #[test]
    fn snapshot_exposes_only_visible_icons() {
        let mut machine = playing(2, 5, 30);
        machine.flip(1).unwrap();
        let snapshot = machine.snapshot();
        assert_eq!(snapshot.state, SessionState::Playing);
        assert_eq!(snapshot.pending, vec![1]);
        assert_eq!(snapshot.total_pairs, 2);
        assert_eq!(snapshot.player_name.as_deref(), Some("Ana"));
        let visible: Vec<_> = snapshot.cards.iter().filter(|c| c.icon.is_some()).collect();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].position, 1);
    }
}
