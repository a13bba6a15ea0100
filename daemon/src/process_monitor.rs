use sysinfo::{ProcessesToUpdate, System};
use tokio::sync::{mpsc, RwLock};
use tokio::time::{interval, Duration};

use std::sync::Arc;

use crate::config::{Config, EmulatorConfig};
use crate::event::DaemonEvent;

const POLL_INTERVAL_SECS: u64 = 2;

/// Polls the OS process list every [`POLL_INTERVAL_SECS`] seconds and emits
/// [`DaemonEvent::ConsoleStarted`] / [`DaemonEvent::ConsoleStopped`] events
/// whenever a configured emulator appears, disappears or is swapped for another.
///
/// Only one emulator is considered active at a time. If several are running,
/// the first match in the config list wins.
pub async fn run(config: Arc<RwLock<Config>>, tx: mpsc::UnboundedSender<DaemonEvent>) {
    let mut sys = System::new();
    let mut active: Option<EmulatorConfig> = None;
    let mut ticker = interval(Duration::from_secs(POLL_INTERVAL_SECS));

    loop {
        ticker.tick().await;

        sys.refresh_processes(ProcessesToUpdate::All, true);

        let found = {
            let config = config.read().await;
            let names: Vec<String> = sys
                .processes()
                .values()
                .map(|p| p.name().to_string_lossy().into_owned())
                .collect();
            find_active(&config.emulators, &names).cloned()
        };

        let events = transition(active.as_ref(), found.as_ref());
        for event in events {
            match &event {
                DaemonEvent::ConsoleStarted(emu) => {
                    tracing::info!("Detected {} ({})", emu.display_name, emu.console)
                }
                DaemonEvent::ConsoleStopped => {
                    if let Some(emu) = &active {
                        tracing::info!("Exited: {}", emu.display_name);
                    }
                }
                _ => {}
            }
            if tx.send(event).is_err() {
                return;
            }
        }
        active = found;
    }
}

/// Events needed to move from the `previous` active emulator to `current`.
fn transition(
    previous: Option<&EmulatorConfig>,
    current: Option<&EmulatorConfig>,
) -> Vec<DaemonEvent> {
    match (previous, current) {
        (None, Some(now)) => vec![DaemonEvent::ConsoleStarted(now.clone())],
        (Some(_), None) => vec![DaemonEvent::ConsoleStopped],
        (Some(before), Some(now)) if before != now => vec![
            DaemonEvent::ConsoleStopped,
            DaemonEvent::ConsoleStarted(now.clone()),
        ],
        _ => Vec::new(),
    }
}

/// First emulator in `emulators` whose executable is among `process_names`.
pub fn find_active<'a>(
    emulators: &'a [EmulatorConfig],
    process_names: &[String],
) -> Option<&'a EmulatorConfig> {
    let running: Vec<&str> = process_names.iter().map(|n| normalize(n)).collect();
    emulators.iter().find(|emu| {
        let target = normalize(&emu.executable_name);
        running.iter().any(|name| name.eq_ignore_ascii_case(target))
    })
}

/// Drops a trailing `.exe` so Windows and Unix process names compare equal.
fn normalize(name: &str) -> &str {
    let len = name.len();
    if len > 4 && name.is_char_boundary(len - 4) && name[len - 4..].eq_ignore_ascii_case(".exe") {
        &name[..len - 4]
    } else {
        name
    }
}
