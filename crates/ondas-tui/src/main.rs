mod action;
mod analyser;
mod app;
mod app_state;
mod component;
mod components;
mod core;
mod playback;
mod theme;
mod viz;
mod widgets;

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};

use ondas_core::events::PlayerEvent;
use ondas_core::state::SessionStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let data_dir = ondas_core::platform::data_dir();
    std::fs::create_dir_all(&data_dir)?;

    let log_path = data_dir.join("ondas.log");
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    // Allow RUST_LOG override; default to debug for app code but suppress
    // noisy connection-level DEBUG from HTTP client internals.
    let log_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "debug,hyper_util=warn,reqwest=warn,hyper=warn".to_string());
    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_env_filter(log_filter.as_str())
        .with_ansi(false)
        .init();

    eprintln!("ondas log: {}", log_path.display());
    tracing::info!("ondas starting…");

    // ── Config + station catalog (fetched once) ─────────────────────────────
    let config = ondas_core::config::Config::load().unwrap_or_default();
    let stations = ondas_core::stations::load_catalog(&config).await?;

    // ── Session store (restores last station + volume) ──────────────────────
    let store = Arc::new(SessionStore::new(data_dir.join("session.json"), stations));

    // ── Channels: PlayerEvent bus + core command queue ──────────────────────
    let (events_tx, events_rx) = broadcast::channel::<PlayerEvent>(256);
    let (core_tx, core_rx) = mpsc::channel::<core::CoreEvent>(64);

    // ── Audio graph: one analyser tap for the whole session ─────────────────
    let tap = analyser::AnalyserTap::new();

    // ── Player core event loop ──────────────────────────────────────────────
    let player_core = core::PlayerCore::new(
        config.clone(),
        Arc::clone(&store),
        events_tx.clone(),
        core_tx.clone(),
        tap.clone(),
    )?;
    tokio::spawn(async move {
        if let Err(e) = player_core.run(core_rx).await {
            tracing::error!("PlayerCore exited with error: {}", e);
        }
    });

    // ── Tune the restored (or default) station immediately ──────────────────
    let initial_session = store.snapshot().await;
    let startup_idx = initial_session.current_station.or_else(|| {
        let wanted = &config.stations.default_station;
        if wanted.is_empty() {
            (!initial_session.stations.is_empty()).then_some(0)
        } else {
            initial_session.stations.iter().position(|s| &s.id == wanted)
        }
    });
    if let Some(idx) = startup_idx {
        let _ = core_tx
            .send(core::CoreEvent::Command(core::PlayerCommand::Tune(idx)))
            .await;
    }

    // ── Run the UI ──────────────────────────────────────────────────────────
    let app = app::App::new(config, store, core_tx, tap, initial_session);
    app.run(events_rx).await?;

    Ok(())
}
