mod bus;
mod config;
mod console;
mod controller;
mod daemon;
mod dialog;
mod discord;
mod event;
mod logging;
mod paths;
mod presence;
mod process_monitor;
mod status;
#[cfg(test)]
mod testing;
mod transport;

use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration};

use crate::bus::EventBus;
use crate::controller::ControllerContext;
use crate::daemon::{Daemon, Flow};
use crate::event::DaemonEvent;

#[tokio::main]
async fn main() {
    // ── App data directory ────────────────────────────────────────────────────
    let app_dir = paths::app_data_dir();
    if let Err(e) = std::fs::create_dir_all(&app_dir) {
        eprintln!("Failed to create app data directory {}: {e}", app_dir.display());
        std::process::exit(1);
    }

    // ── Configuration + logging ───────────────────────────────────────────────
    let config_path = paths::config_file_path();
    let (initial_config, config_error) = match config::load_or_default(&config_path) {
        Ok(c) => (c, None),
        Err(e) => (config::Config::default(), Some(e)),
    };

    let log_dir = paths::log_dir();
    let _log_guard = logging::init_logging(&log_dir, initial_config.global.verbose);
    if let Some(e) = config_error {
        tracing::error!("Config error (using defaults): {:#}", e);
    }
    tracing::info!("psdiscord-daemon v{} started", env!("CARGO_PKG_VERSION"));

    let mut refresh_secs = initial_config.global.effective_update_interval();
    let shared_config = Arc::new(RwLock::new(initial_config));

    // ── Event bus + status file ───────────────────────────────────────────────
    let bus = Arc::new(EventBus::new(32));
    tokio::spawn(status::run(bus.subscribe(), paths::status_file_path()));

    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<DaemonEvent>();

    // ── Background tasks ──────────────────────────────────────────────────────
    tokio::spawn(config::watch_config(config_path, event_tx.clone()));
    tokio::spawn(process_monitor::run(Arc::clone(&shared_config), event_tx.clone()));
    let mut refresh_task = spawn_refresh_ticker(refresh_secs, event_tx.clone());

    // Graceful shutdown on Ctrl+C.
    {
        let tx = event_tx.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                let _ = tx.send(DaemonEvent::Shutdown);
            }
        });
    }

    let ctx = ControllerContext {
        transports: Arc::new(discord::DiscordTransports),
        notifier: Arc::new(dialog::SystemNotifier),
        bus: Arc::clone(&bus),
        events: event_tx.clone(),
        verbose: shared_config.read().await.global.verbose,
        alert_user: true,
        log_dir,
        version: option_env!("CARGO_PKG_VERSION").unwrap_or("").to_string(),
    };

    // ── Event loop ────────────────────────────────────────────────────────────
    let mut daemon = Daemon::new(shared_config, ctx);

    while let Some(evt) = event_rx.recv().await {
        if let DaemonEvent::ConfigReloaded(new_config) = &evt {
            let new_secs = new_config.global.effective_update_interval();
            if new_secs != refresh_secs {
                refresh_task.abort();
                refresh_task = spawn_refresh_ticker(new_secs, event_tx.clone());
                refresh_secs = new_secs;
            }
        }

        if daemon.handle(evt).await == Flow::Exit {
            break;
        }
    }

    refresh_task.abort();
}

fn spawn_refresh_ticker(secs: u64, tx: mpsc::UnboundedSender<DaemonEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(Duration::from_secs(secs));
        // The first tick completes immediately; start-up already pushes an update.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            if tx.send(DaemonEvent::RefreshPresence).is_err() {
                break;
            }
        }
    })
}
