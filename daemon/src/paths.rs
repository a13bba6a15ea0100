/// Canonical file paths for PlayStationDiscord data files.
///
/// Everything lives under `<config dir>/PlayStationDiscord/` (`%APPDATA%` on
/// Windows, `~/.config` on Linux, `~/Library/Application Support` on macOS):
///   - config.toml  Edited by the user, read (and watched) by the daemon.
///   - status.toml  Written by the daemon for anything that wants to display it.
///   - logs/        Daily rolling log files.
use std::path::PathBuf;

const APP_DIR_NAME: &str = "PlayStationDiscord";
pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const STATUS_FILE_NAME: &str = "status.toml";
pub const LOG_DIR_NAME: &str = "logs";

/// Returns the application data directory, falling back to the working
/// directory on platforms without a config dir.
pub fn app_data_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR_NAME)
}

pub fn config_file_path() -> PathBuf {
    app_data_dir().join(CONFIG_FILE_NAME)
}

pub fn status_file_path() -> PathBuf {
    app_data_dir().join(STATUS_FILE_NAME)
}

pub fn log_dir() -> PathBuf {
    app_data_dir().join(LOG_DIR_NAME)
}
