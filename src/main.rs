// Command line entry point
use anyhow::{anyhow, Context, Result};
use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use spatial_callouts::audio::AudioEngine;
use spatial_callouts::{Backends, Navigator, NavigatorSettings, OperatingMode};

// One worker: mode teardown and the announcer task never run in parallel
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let mut args = env::args().skip(1);
    let app_dir = PathBuf::from(
        args.next()
            .ok_or_else(|| anyhow!("usage: spatial-callouts <app_dir> [near_me|callouts]"))?,
    );
    let mode: OperatingMode = match args.next() {
        Some(name) => name.parse().map_err(|e: String| anyhow!(e))?,
        None => OperatingMode::AnnouncePlacesNearMe,
    };

    let settings = NavigatorSettings::load(&app_dir)?;

    let engine = Arc::new(AudioEngine::start(settings.audio.volume).context("Failed to start audio output")?);
    let backends = Backends::native(&settings, &app_dir, engine.clone())?;
    let navigator = Navigator::new(&settings, backends, app_dir);

    if let Err(e) = navigator.load_voices(&settings).await {
        tracing::warn!("Could not list voices, using the synthesizer default: {}", e);
    }

    let active = navigator.toggle(mode).await.context("Failed to enter mode")?;
    tracing::info!("Mode is now {}", active);

    if active == OperatingMode::TrackingWithCallouts {
        // Follow the track until it goes quiet
        let mut updates = navigator.subscribe();
        let quiet = (settings.location.track_interval() * 2).max(Duration::from_secs(1));
        while let Ok(Some(_)) = tokio::time::timeout(quiet, updates.next()).await {}
    }
    navigator.player.wait_until_idle().await;

    navigator.shutdown().await;
    drop(navigator);
    if let Ok(engine) = Arc::try_unwrap(engine) {
        engine.shutdown();
    }
    Ok(())
}
