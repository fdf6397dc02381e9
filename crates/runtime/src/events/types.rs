//! Event types for different topics.

use memory_core::{CardView, Durations, FlipRejection, Phase, SessionState};
use serde::{Deserialize, Serialize};

use crate::repository::RankingEntry;

/// Session lifecycle events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SessionEvent {
    /// A player was accepted and the memorize phase is about to start.
    Registered { name: String, identifier: String },

    /// A registration was refused (validation failure or repeat identifier).
    RegistrationRejected { identifier: String, reason: String },

    PhaseChanged { from: SessionState, to: SessionState },

    Won {
        name: String,
        elapsed_secs: u32,
        attempts: u32,
        /// 0-based position in the ranking, if the time qualified.
        rank: Option<usize>,
        ranking: Vec<RankingEntry>,
    },

    Lost {
        name: String,
        pairs_found: usize,
        total_pairs: usize,
        attempts: u32,
    },

    /// Back to registration with a blank board.
    Reset,

    DurationsChanged { durations: Durations },

    /// The result store was exported and emptied.
    StoreCleared { exported_players: usize },
}

/// Board presentation events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum BoardEvent {
    /// Full board redraw (new board, reveal or hide all).
    Rendered { cards: Vec<CardView> },

    CardFlipped { card: CardView },

    PairMatched { first: usize, second: usize },

    /// A mismatched pair turned face down again.
    PairHidden { first: usize, second: usize },

    /// Input refused by the engine. Presentation usually ignores these.
    FlipRejected { rejection: FlipRejection },

    AttemptsChanged { attempts: u32 },
}

/// Countdown events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TimerEvent {
    Tick {
        phase: Phase,
        remaining: u32,
        total: u32,
        /// Fraction of the phase still left, `remaining / total`.
        progress: f32,
        /// Final stretch of the play countdown. Every new countdown starts
        /// with this cleared.
        critical: bool,
    },
}

impl TimerEvent {
    pub fn tick(phase: Phase, remaining: u32, total: u32, critical: bool) -> Self {
        let progress = if total == 0 {
            0.0
        } else {
            remaining as f32 / total as f32
        };
        TimerEvent::Tick {
            phase,
            remaining,
            total,
            progress,
            critical,
        }
    }
}
