//! Memory kiosk binary.
//!
//! Composition root: reads configuration from the environment, installs
//! logging, builds the [`runtime::Runtime`] and hands its handle to the
//! terminal frontend.
//!
//! ```bash
//! KIOSK_PLAY_SECS=45 cargo run -p memory-kiosk
//! ```

mod config;
mod frontend;
mod logging;

use anyhow::Result;
use runtime::Runtime;

use crate::config::KioskConfig;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let config = KioskConfig::from_env();
    let _guard = logging::setup_logging(&config)?;

    tracing::info!("Starting memory kiosk");
    tracing::info!(
        "Durations: memorize {}s, play {}s",
        config.durations.memorize_secs(),
        config.durations.play_secs()
    );
    tracing::info!("Data directory: {}", config.data_dir.display());

    let runtime = Runtime::builder()
        .config(config.runtime_config())
        .build()
        .await?;

    let result = frontend::run(runtime.handle(), &config).await;

    runtime.shutdown().await?;
    tracing::info!("Memory kiosk stopped");
    result
}
