//! Kiosk configuration loaded from the environment.
use std::env;
use std::path::PathBuf;

use memory_core::{Durations, GameConfig};
use runtime::RuntimeConfig;

/// Everything the kiosk binary reads from the environment.
#[derive(Clone, Debug)]
pub struct KioskConfig {
    pub durations: Durations,
    pub mismatch_delay_ms: u64,
    /// Where the result ledger (and the log directory) live.
    pub data_dir: PathBuf,
    /// Where `export` writes CSV files.
    pub export_dir: PathBuf,
    pub seed: Option<u64>,
    pub log_to_file: bool,
}

impl Default for KioskConfig {
    fn default() -> Self {
        let data_dir = default_data_dir();
        Self {
            durations: Durations::default(),
            mismatch_delay_ms: GameConfig::DEFAULT_MISMATCH_DELAY_MS,
            export_dir: data_dir.join("exports"),
            data_dir,
            seed: None,
            log_to_file: true,
        }
    }
}

impl KioskConfig {
    /// Construct configuration from environment variables.
    ///
    /// Environment variables:
    /// - `KIOSK_MEMORIZE_SECS` - Memorize countdown in seconds (default: 10)
    /// - `KIOSK_PLAY_SECS` - Play countdown in seconds (default: 60)
    /// - `KIOSK_MISMATCH_DELAY_MS` - How long a wrong pair stays visible (default: 800)
    /// - `KIOSK_DATA_DIR` - Result ledger directory (default: platform data dir)
    /// - `KIOSK_EXPORT_DIR` - CSV export directory (default: `<data dir>/exports`)
    /// - `KIOSK_SEED` - Fixed shuffle seed (default: random)
    /// - `KIOSK_LOG_FILE` - Also log to a daily file (default: true)
    ///
    /// Values that fail to parse fall back to the default.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        let memorize =
            read_env::<u32>("KIOSK_MEMORIZE_SECS").unwrap_or(config.durations.memorize_secs());
        let play = read_env::<u32>("KIOSK_PLAY_SECS").unwrap_or(config.durations.play_secs());
        if let Ok(durations) = Durations::new(memorize, play) {
            config.durations = durations;
        }

        if let Some(delay) = read_env::<u64>("KIOSK_MISMATCH_DELAY_MS") {
            config.mismatch_delay_ms = delay;
        }

        if let Ok(dir) = env::var("KIOSK_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
            config.export_dir = config.data_dir.join("exports");
        }

        if let Ok(dir) = env::var("KIOSK_EXPORT_DIR") {
            config.export_dir = PathBuf::from(dir);
        }

        config.seed = read_env::<u64>("KIOSK_SEED");

        if let Some(enable) = read_env::<bool>("KIOSK_LOG_FILE") {
            config.log_to_file = enable;
        }

        config
    }

    pub fn log_dir(&self) -> PathBuf {
        self.data_dir.join("logs")
    }

    pub fn runtime_config(&self) -> RuntimeConfig {
        let game = GameConfig::new()
            .with_durations(self.durations)
            .with_mismatch_delay_ms(self.mismatch_delay_ms);

        RuntimeConfig {
            game,
            data_dir: Some(self.data_dir.clone()),
            seed: self.seed,
            ..RuntimeConfig::default()
        }
    }
}

/// Platform data directory, e.g. `~/.local/share/memory-kiosk` on Linux.
fn default_data_dir() -> PathBuf {
    directories::ProjectDirs::from("", "", "memory-kiosk")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("./kiosk_data"))
}

fn read_env<T>(key: &str) -> Option<T>
where
    T: std::str::FromStr,
{
    env::var(key).ok()?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runtime_config_carries_kiosk_settings() {
        let config = KioskConfig {
            durations: Durations::new(5, 45).unwrap(),
            mismatch_delay_ms: 500,
            data_dir: PathBuf::from("/srv/kiosk"),
            export_dir: PathBuf::from("/srv/kiosk/exports"),
            seed: Some(9),
            log_to_file: false,
        };

        let runtime = config.runtime_config();
        assert_eq!(runtime.game.durations, Durations::new(5, 45).unwrap());
        assert_eq!(runtime.game.mismatch_delay_ms, 500);
        assert_eq!(runtime.game.pair_count(), 10);
        assert_eq!(
            runtime.data_dir.as_deref(),
            Some(std::path::Path::new("/srv/kiosk"))
        );
        assert_eq!(runtime.seed, Some(9));
        assert_eq!(config.log_dir(), PathBuf::from("/srv/kiosk/logs"));
    }

    #[test]
    fn defaults_match_the_stock_kiosk() {
        let config = KioskConfig::default();
        assert_eq!(config.durations.memorize_secs(), 10);
        assert_eq!(config.durations.play_secs(), 60);
        assert_eq!(config.mismatch_delay_ms, 800);
        assert!(config.export_dir.starts_with(&config.data_dir));
    }
}
