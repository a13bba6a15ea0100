use anyhow::{Context, Result};
use notify::{Config as NotifyConfig, RecommendedWatcher, RecursiveMode, Watcher};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;

use crate::console::{Console, ConsoleKind};
use crate::event::DaemonEvent;

/// Discord rejects presence updates sent more often than this.
pub const MIN_UPDATE_INTERVAL_SECS: u64 = 15;
pub const MAX_UPDATE_INTERVAL_SECS: u64 = 300;
pub const DEFAULT_UPDATE_INTERVAL_SECS: u64 = MIN_UPDATE_INTERVAL_SECS;

/// Root configuration structure. Deserialized from `<config dir>/PlayStationDiscord/config.toml`.
#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub global: GlobalConfig,
    #[serde(default)]
    pub app_ids: AppIds,
    #[serde(default = "default_emulators")]
    pub emulators: Vec<EmulatorConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            global: GlobalConfig::default(),
            app_ids: AppIds::default(),
            emulators: default_emulators(),
        }
    }
}

impl Config {
    /// Builds the descriptor for `kind`, honouring any app id override.
    pub fn console(&self, kind: ConsoleKind) -> Console {
        match self.app_ids.get(kind) {
            Some(id) => Console::with_app_id(kind, id),
            None => Console::new(kind),
        }
    }
}

/// Per-console Discord application id overrides.
#[derive(Debug, Default, Deserialize, Clone, PartialEq, Eq)]
pub struct AppIds {
    pub ps3: Option<String>,
    pub ps4: Option<String>,
    pub ps5: Option<String>,
    pub vita: Option<String>,
}

impl AppIds {
    pub fn get(&self, kind: ConsoleKind) -> Option<&str> {
        match kind {
            ConsoleKind::Ps3 => self.ps3.as_deref(),
            ConsoleKind::Ps4 => self.ps4.as_deref(),
            ConsoleKind::Ps5 => self.ps5.as_deref(),
            ConsoleKind::Vita => self.vita.as_deref(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct GlobalConfig {
    /// Log every outgoing presence record and lower the log filter to debug.
    #[serde(default)]
    pub verbose: bool,
    /// Seconds between presence refreshes. Clamped to [15, 300].
    #[serde(default = "default_update_interval")]
    pub update_interval_secs: u64,
    /// Show the elapsed-time counter in Discord.
    #[serde(default = "default_true")]
    pub show_elapsed_time: bool,
    /// Restart a failed Discord session on the next refresh.
    #[serde(default)]
    pub auto_reconnect: bool,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            update_interval_secs: DEFAULT_UPDATE_INTERVAL_SECS,
            show_elapsed_time: true,
            auto_reconnect: false,
        }
    }
}

impl GlobalConfig {
    pub fn effective_update_interval(&self) -> u64 {
        self.update_interval_secs
            .clamp(MIN_UPDATE_INTERVAL_SECS, MAX_UPDATE_INTERVAL_SECS)
    }
}

/// An emulator whose process marks a console as active.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct EmulatorConfig {
    pub console: ConsoleKind,
    /// Shown in the presence details line (e.g. "RPCS3").
    pub display_name: String,
    /// Executable filename used for process detection. A trailing `.exe` is optional.
    pub executable_name: String,
}

/// Loads the config file at `path`, returning `Config::default()` if the file does not exist.
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_or_default(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Spawns a file watcher on the parent directory of `path`.  Whenever the config
/// file is created or modified, reloads it and sends a `ConfigReloaded` event.
pub async fn watch_config(path: PathBuf, tx: mpsc::UnboundedSender<DaemonEvent>) {
    let (watch_tx, mut watch_rx) = mpsc::channel::<notify::Event>(16);

    let mut watcher = match RecommendedWatcher::new(
        move |res: notify::Result<notify::Event>| {
            if let Ok(event) = res {
                let _ = watch_tx.blocking_send(event);
            }
        },
        NotifyConfig::default(),
    ) {
        Ok(w) => w,
        Err(e) => {
            tracing::warn!("Failed to create config watcher: {}", e);
            return;
        }
    };

    // Editors often save by writing a new file and renaming it over the old one.
    let watch_dir = match path.parent() {
        Some(d) => d.to_path_buf(),
        None => {
            tracing::warn!("Config path has no parent directory");
            return;
        }
    };

    if let Err(e) = watcher.watch(&watch_dir, RecursiveMode::NonRecursive) {
        tracing::warn!("Failed to watch config directory: {}", e);
        return;
    }

    while let Some(event) = watch_rx.recv().await {
        let affects_config = event.paths.iter().any(|p| p == path.as_path());
        let is_write = matches!(
            event.kind,
            notify::EventKind::Create(_) | notify::EventKind::Modify(_)
        );

        if affects_config && is_write {
            match load_or_default(&path) {
                Ok(config) => {
                    if tx.send(DaemonEvent::ConfigReloaded(config)).is_err() {
                        break;
                    }
                }
                Err(e) => tracing::warn!("Failed to reload config: {:#}", e),
            }
        }
    }
}

fn default_emulators() -> Vec<EmulatorConfig> {
    [
        (ConsoleKind::Ps3, "RPCS3", "rpcs3.exe"),
        (ConsoleKind::Ps4, "shadPS4", "shadPS4.exe"),
        (ConsoleKind::Vita, "Vita3K", "Vita3K.exe"),
    ]
    .into_iter()
    .map(|(console, display_name, executable_name)| EmulatorConfig {
        console,
        display_name: display_name.to_string(),
        executable_name: executable_name.to_string(),
    })
    .collect()
}

fn default_update_interval() -> u64 {
    DEFAULT_UPDATE_INTERVAL_SECS
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── defaults ──────────────────────────────────────────────────────────────

    #[test]
    fn global_config_default_values() {
        let g = GlobalConfig::default();
        assert!(!g.verbose);
        assert_eq!(g.update_interval_secs, DEFAULT_UPDATE_INTERVAL_SECS);
        assert!(g.show_elapsed_time);
        assert!(!g.auto_reconnect);
    }

    #[test]
    fn config_default_watches_known_emulators() {
        let c = Config::default();
        let consoles: Vec<_> = c.emulators.iter().map(|e| e.console).collect();
        assert_eq!(consoles, vec![ConsoleKind::Ps3, ConsoleKind::Ps4, ConsoleKind::Vita]);
        assert_eq!(c.app_ids, AppIds::default());
    }

    // ── effective_update_interval ─────────────────────────────────────────────

    #[test]
    fn update_interval_clamps_below_min() {
        let g = GlobalConfig {
            update_interval_secs: 1,
            ..Default::default()
        };
        assert_eq!(g.effective_update_interval(), MIN_UPDATE_INTERVAL_SECS);
    }

    #[test]
    fn update_interval_clamps_above_max() {
        let g = GlobalConfig {
            update_interval_secs: 10_000,
            ..Default::default()
        };
        assert_eq!(g.effective_update_interval(), MAX_UPDATE_INTERVAL_SECS);
    }

    #[test]
    fn update_interval_in_range_is_kept() {
        let g = GlobalConfig {
            update_interval_secs: 60,
            ..Default::default()
        };
        assert_eq!(g.effective_update_interval(), 60);
    }

    // ── console ───────────────────────────────────────────────────────────────

    #[test]
    fn console_uses_builtin_app_id_without_override() {
        let c = Config::default();
        assert_eq!(
            c.console(ConsoleKind::Ps3).app_id(),
            ConsoleKind::Ps3.default_app_id()
        );
    }

    #[test]
    fn console_uses_app_id_override() {
        let mut c = Config::default();
        c.app_ids.ps4 = Some("1234".to_string());
        assert_eq!(c.console(ConsoleKind::Ps4).app_id(), "1234");
        assert_eq!(c.console(ConsoleKind::Ps4).asset_name(), "ps4_main");
    }

    // ── load_or_default ───────────────────────────────────────────────────────

    #[test]
    fn load_or_default_missing_file_returns_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nonexistent.toml");
        let config = load_or_default(&path).unwrap();
        assert_eq!(config.global.update_interval_secs, DEFAULT_UPDATE_INTERVAL_SECS);
        assert_eq!(config.emulators.len(), 3);
    }

    #[test]
    fn load_or_default_parses_valid_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[global]
verbose = true
update_interval_secs = 30
show_elapsed_time = false
auto_reconnect = true

[app_ids]
ps3 = "111"

[[emulators]]
console = "ps3"
display_name = "RPCS3"
executable_name = "rpcs3"
"#,
        )
        .unwrap();

        let config = load_or_default(&path).unwrap();
        assert!(config.global.verbose);
        assert_eq!(config.global.update_interval_secs, 30);
        assert!(!config.global.show_elapsed_time);
        assert!(config.global.auto_reconnect);
        assert_eq!(config.app_ids.get(ConsoleKind::Ps3), Some("111"));
        assert_eq!(config.app_ids.get(ConsoleKind::Vita), None);
        assert_eq!(config.emulators.len(), 1);
        assert_eq!(config.emulators[0].executable_name, "rpcs3");
    }

    #[test]
    fn load_or_default_partial_toml_uses_field_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[global]\nverbose = true\n").unwrap();

        let config = load_or_default(&path).unwrap();
        assert!(config.global.verbose);
        assert_eq!(config.global.update_interval_secs, DEFAULT_UPDATE_INTERVAL_SECS);
        assert!(config.global.show_elapsed_time);
        assert_eq!(config.emulators.len(), 3);
    }

    #[test]
    fn load_or_default_invalid_toml_returns_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "this is not valid toml ][[[").unwrap();
        assert!(load_or_default(&path).is_err());
    }

    #[test]
    fn load_or_default_unknown_console_returns_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[[emulators]]
console = "ps2"
display_name = "PCSX2"
executable_name = "pcsx2.exe"
"#,
        )
        .unwrap();
        assert!(load_or_default(&path).is_err());
    }
}
