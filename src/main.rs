//! Revwatch - Directory Revision Notifier
//!
//! Entry point: loads the settings, wires the pipeline, and runs until
//! interrupted. On Unix, `SIGHUP` reloads the settings file.

use std::sync::Arc;

use {
    anyhow::Result,
    tokio::{runtime::Handle, signal::ctrl_c},
    tracing::info,
    tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt},
};

use revwatch::{LogDelivery, Notifier, SettingsManager, error::ResultExt};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings = SettingsManager::new().add_context("Failed to load settings")?;
    info!(
        "Loaded {} folders from {:?}",
        settings.get_settings().folders.len(),
        settings.get_config_path()
    );

    let notifier = Notifier::new(settings, Arc::new(LogDelivery), Handle::current());
    notifier.start();

    run_until_interrupted(&notifier).await?;

    info!("Shutting down");
    notifier.stop();

    Ok(())
}

#[cfg(unix)]
async fn run_until_interrupted(notifier: &Notifier) -> Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut hangup = signal(SignalKind::hangup()).add_context("Failed to listen for SIGHUP")?;
    loop {
        tokio::select! {
            interrupted = ctrl_c() => {
                return interrupted.add_context("Failed to listen for Ctrl-C");
            }
            _ = hangup.recv() => {
                info!("Reloading settings");
                notifier.reload();
            }
        }
    }
}

#[cfg(not(unix))]
async fn run_until_interrupted(_notifier: &Notifier) -> Result<()> {
    ctrl_c().await.add_context("Failed to listen for Ctrl-C")
}
