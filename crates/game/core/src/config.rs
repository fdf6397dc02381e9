use crate::board::IconSet;
use crate::session::{Phase, SessionError};

/// Countdown lengths for the two timed phases, in whole seconds.
///
/// These are operator settings: they survive session resets and can only be
/// changed while the kiosk is waiting for a registration.
///
/// Both values are at least one second. Deserialization goes through
/// [`Durations::new`], so a stored or received value cannot break that.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "RawDurations"))]
pub struct Durations {
    memorize_secs: u32,
    play_secs: u32,
}

#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct RawDurations {
    memorize_secs: u32,
    play_secs: u32,
}

#[cfg(feature = "serde")]
impl TryFrom<RawDurations> for Durations {
    type Error = SessionError;

    fn try_from(raw: RawDurations) -> Result<Self, Self::Error> {
        Self::new(raw.memorize_secs, raw.play_secs)
    }
}

impl Durations {
    pub const DEFAULT_MEMORIZE_SECS: u32 = 10;
    pub const DEFAULT_PLAY_SECS: u32 = 60;

    /// Creates validated durations. Both phases must last at least one second.
    pub fn new(memorize_secs: u32, play_secs: u32) -> Result<Self, SessionError> {
        if memorize_secs == 0 || play_secs == 0 {
            return Err(SessionError::InvalidDuration {
                memorize_secs,
                play_secs,
            });
        }
        Ok(Self {
            memorize_secs,
            play_secs,
        })
    }

    pub fn memorize_secs(&self) -> u32 {
        self.memorize_secs
    }

    pub fn play_secs(&self) -> u32 {
        self.play_secs
    }

    /// Countdown length of `phase`.
    pub fn of(&self, phase: Phase) -> u32 {
        match phase {
            Phase::Memorize => self.memorize_secs,
            Phase::Play => self.play_secs,
        }
    }
}

impl Default for Durations {
    fn default() -> Self {
        Self {
            memorize_secs: Self::DEFAULT_MEMORIZE_SECS,
            play_secs: Self::DEFAULT_PLAY_SECS,
        }
    }
}

/// Game configuration constants and tunable parameters.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GameConfig {
    /// Initial countdown lengths; changed later through the session machine.
    pub durations: Durations,
    /// How long a mismatched pair stays visible before flipping back.
    pub mismatch_delay_ms: u64,
    /// Symbols placed on the board. Every icon yields exactly one pair.
    pub icons: IconSet,
    /// Number of entries kept on the leaderboard.
    pub ranking_limit: usize,
    /// The play countdown is flagged critical once this many seconds or
    /// fewer remain. Zero disables the flag.
    pub critical_secs: u32,
}

impl GameConfig {
    pub const DEFAULT_MISMATCH_DELAY_MS: u64 = 800;
    pub const DEFAULT_RANKING_LIMIT: usize = 5;
    pub const DEFAULT_CRITICAL_SECS: u32 = 10;

    pub fn new() -> Self {
        Self {
            durations: Durations::default(),
            mismatch_delay_ms: Self::DEFAULT_MISMATCH_DELAY_MS,
            icons: IconSet::default(),
            ranking_limit: Self::DEFAULT_RANKING_LIMIT,
            critical_secs: Self::DEFAULT_CRITICAL_SECS,
        }
    }

    pub fn with_durations(mut self, durations: Durations) -> Self {
        self.durations = durations;
        self
    }

    pub fn with_icons(mut self, icons: IconSet) -> Self {
        self.icons = icons;
        self
    }

    pub fn with_mismatch_delay_ms(mut self, delay_ms: u64) -> Self {
        self.mismatch_delay_ms = delay_ms;
        self
    }

    pub fn with_critical_secs(mut self, critical_secs: u32) -> Self {
        self.critical_secs = critical_secs;
        self
    }

    /// Whether a countdown showing `remaining` seconds is in its final stretch.
    /// Only the play phase ever becomes critical.
    pub fn is_critical(&self, phase: Phase, remaining: u32) -> bool {
        phase == Phase::Play && remaining <= self.critical_secs && self.critical_secs > 0
    }

    /// Number of pairs on every board built from this configuration.
    pub fn pair_count(&self) -> usize {
        self.icons.len()
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_kiosk_settings() {
        let config = GameConfig::default();
        assert_eq!(config.durations.memorize_secs(), 10);
        assert_eq!(config.durations.play_secs(), 60);
        assert_eq!(config.mismatch_delay_ms, 800);
        assert_eq!(config.pair_count(), 10);
        assert_eq!(config.ranking_limit, 5);
        assert_eq!(config.critical_secs, 10);
    }

    #[test]
    fn only_the_end_of_play_is_critical() {
        let config = GameConfig::default();
        assert!(!config.is_critical(Phase::Play, 11));
        assert!(config.is_critical(Phase::Play, 10));
        assert!(config.is_critical(Phase::Play, 0));
        assert!(!config.is_critical(Phase::Memorize, 3));

        let disabled = GameConfig::default().with_critical_secs(0);
        assert!(!disabled.is_critical(Phase::Play, 0));
    }

    #[test]
    fn zero_durations_are_rejected() {
        assert!(Durations::new(0, 45).is_err());
        assert!(Durations::new(10, 0).is_err());
        let durations = Durations::new(10, 45).unwrap();
        assert_eq!(durations.memorize_secs(), 10);
        assert_eq!(durations.of(Phase::Play), 45);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn deserialization_validates_durations() {
        let ok: Durations =
            serde_json::from_str(r#"{"memorize_secs":5,"play_secs":30}"#).unwrap();
        assert_eq!(ok, Durations::new(5, 30).unwrap());

        let zero = serde_json::from_str::<Durations>(r#"{"memorize_secs":0,"play_secs":30}"#);
        assert!(zero.is_err());
    }
}
