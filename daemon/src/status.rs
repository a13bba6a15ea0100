use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::broadcast;

use crate::bus::AppEvent;

/// Current presence state as seen from outside the daemon.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
#[serde(rename_all = "lowercase")]
pub enum DaemonState {
    /// No emulator is running; nothing is being reported.
    Idle,
    /// A console is active and its Discord session is up.
    Connected,
    /// A console is active but its Discord session failed.
    Disconnected,
}

/// Runtime status written by the daemon to `status.toml`.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DaemonStatus {
    /// Daemon binary version (set from Cargo.toml at compile time).
    pub version: String,
    pub state: DaemonState,
    /// Display name of the console currently presented, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_console: Option<String>,
    /// Last Discord error, cleared when a new session starts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DaemonStatus {
    pub fn new() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            state: DaemonState::Idle,
            active_console: None,
            error: None,
        }
    }

    pub fn apply(&mut self, event: &AppEvent) {
        match event {
            AppEvent::PresenceStarted(kind) => {
                self.state = DaemonState::Connected;
                self.active_console = Some(kind.display_name().to_string());
                self.error = None;
            }
            AppEvent::PresenceStopped => {
                self.state = DaemonState::Idle;
                self.active_console = None;
                self.error = None;
            }
            AppEvent::DiscordDisconnected(error) => {
                self.state = DaemonState::Disconnected;
                self.error = Some(match error {
                    Some(e) => e.to_string(),
                    None => "Discord closed the connection".to_string(),
                });
            }
        }
    }
}

/// Serializes `status` to TOML and writes it to `path`.
/// Creates the parent directory if it does not exist. Failures are logged, not returned.
pub fn write_status(path: &Path, status: &DaemonStatus) {
    if let Some(parent) = path.parent() {
        if let Err(e) = std::fs::create_dir_all(parent) {
            tracing::warn!("Failed to create directory {}: {}", parent.display(), e);
            return;
        }
    }
    match toml::to_string_pretty(status) {
        Ok(content) => {
            if let Err(e) = std::fs::write(path, content) {
                tracing::warn!("Failed to write status file: {}", e);
            }
        }
        Err(e) => tracing::warn!("Failed to serialize status: {}", e),
    }
}

/// Keeps `path` in sync with presence events until the bus closes.
pub async fn run(mut rx: broadcast::Receiver<AppEvent>, path: PathBuf) {
    let mut status = DaemonStatus::new();
    write_status(&path, &status);

    loop {
        match rx.recv().await {
            Ok(event) => {
                status.apply(&event);
                write_status(&path, &status);
            }
            Err(broadcast::error::RecvError::Lagged(n)) => {
                tracing::debug!("Status writer skipped {} events", n);
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
