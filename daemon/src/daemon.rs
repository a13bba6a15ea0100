use std::sync::Arc;
use tokio::sync::RwLock;

use crate::bus::AppEvent;
use crate::config::{Config, EmulatorConfig, GlobalConfig};
use crate::console::Console;
use crate::controller::{ControllerContext, PresenceController};
use crate::event::DaemonEvent;
use crate::presence::{PresencePayload, UpdateOptions};

/// Longest wait between automatic reconnect attempts, in refresh ticks.
const MAX_BACKOFF_SHIFT: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

/// Event-loop state: the shared config, the controller collaborators and the
/// console currently being presented, if any.
pub struct Daemon {
    config: Arc<RwLock<Config>>,
    ctx: ControllerContext,
    active: Option<ActiveConsole>,
}

impl Daemon {
    pub fn new(config: Arc<RwLock<Config>>, ctx: ControllerContext) -> Self {
        Self {
            config,
            ctx,
            active: None,
        }
    }

    pub async fn handle(&mut self, evt: DaemonEvent) -> Flow {
        match evt {
            DaemonEvent::ConsoleStarted(emulator) => {
                self.stop_active(false);

                let cfg = self.config.read().await;
                let console = cfg.console(emulator.console);
                let mut current = ActiveConsole::new(
                    emulator,
                    console,
                    chrono::Utc::now().timestamp(),
                    self.ctx.clone(),
                );
                self.ctx
                    .bus
                    .publish(AppEvent::PresenceStarted(current.controller.console().kind()));
                current.refresh(&cfg.global);
                self.active = Some(current);
            }

            DaemonEvent::ConsoleStopped => self.stop_active(true),

            DaemonEvent::RefreshPresence => {
                let cfg = self.config.read().await;
                if let Some(current) = self.active.take() {
                    let (mut current, restarted) = current.on_tick(&cfg.global, &self.ctx);
                    if restarted {
                        self.ctx
                            .bus
                            .publish(AppEvent::PresenceStarted(current.controller.console().kind()));
                    }
                    current.refresh(&cfg.global);
                    self.active = Some(current);
                }
            }

            DaemonEvent::TransportFailed { session, error } => match self.active.as_mut() {
                Some(current) if current.controller.session() == session => {
                    current.controller.handle_transport_error(error);
                }
                _ => tracing::debug!("Ignoring failure from stale Discord session {}", session),
            },

            DaemonEvent::ConfigReloaded(new_config) => {
                tracing::info!("Config reloaded");
                self.ctx.verbose = new_config.global.verbose;

                if let Some(current) = self.active.take() {
                    let wanted = new_config.console(current.emulator.console);
                    self.active = Some(if &wanted != current.controller.console() {
                        tracing::info!(
                            "Discord application for {} changed, reconnecting",
                            wanted.display_name()
                        );
                        let (emulator, started_at) =
                            (current.emulator.clone(), current.started_at);
                        current.stop();
                        let mut replacement =
                            ActiveConsole::new(emulator, wanted, started_at, self.ctx.clone());
                        self.ctx
                            .bus
                            .publish(AppEvent::PresenceStarted(replacement.controller.console().kind()));
                        replacement.refresh(&new_config.global);
                        replacement
                    } else {
                        current
                    });
                }

                *self.config.write().await = new_config;
            }

            DaemonEvent::Shutdown => {
                tracing::info!("Shutting down");
                self.stop_active(true);
                return Flow::Exit;
            }
        }
        Flow::Continue
    }

    fn stop_active(&mut self, announce: bool) {
        if let Some(prev) = self.active.take() {
            prev.stop();
            if announce {
                self.ctx.bus.publish(AppEvent::PresenceStopped);
            }
        }
    }
}

/// The detected emulator together with the controller presenting it.
struct ActiveConsole {
    emulator: EmulatorConfig,
    /// Unix seconds when the emulator was first seen.
    started_at: i64,
    controller: PresenceController,
    /// Whether the current controller already remembers `started_at`.
    announced: bool,
    /// Automatic reconnects since the last session that stayed up for a tick.
    failed_restarts: u32,
    /// Ticks waited since the last reconnect attempt.
    skipped_ticks: u32,
}

impl ActiveConsole {
    fn new(
        emulator: EmulatorConfig,
        console: Console,
        started_at: i64,
        ctx: ControllerContext,
    ) -> Self {
        Self {
            emulator,
            started_at,
            controller: PresenceController::start(console, ctx),
            announced: false,
            failed_restarts: 0,
            skipped_ticks: 0,
        }
    }

    /// Sends the current status. The start time is only included when the
    /// controller does not remember it yet; later refreshes rely on it sticking.
    fn refresh(&mut self, global: &GlobalConfig) {
        let hide_timestamp = !global.show_elapsed_time;
        let payload = PresencePayload {
            state: Some("Online".to_string()),
            details: Some(format!("Using {}", self.emulator.display_name)),
            start_timestamp: (!hide_timestamp && !self.announced).then_some(self.started_at),
            ..Default::default()
        };

        match self.controller.update(payload, UpdateOptions { hide_timestamp }) {
            Ok(()) => self.announced = !hide_timestamp,
            Err(e) => tracing::debug!("Presence update skipped: {}", e),
        }
    }

    /// Reconnects a stopped controller when `auto_reconnect` is on. The flag
    /// reports whether a new controller was started.
    ///
    /// Attempts back off exponentially (1, 2, 4 ... 32 ticks) while Discord
    /// stays unreachable, and only the first failure in a row alerts the user.
    fn on_tick(mut self, global: &GlobalConfig, ctx: &ControllerContext) -> (Self, bool) {
        if self.controller.running() {
            if self.failed_restarts > 0 {
                tracing::info!("Discord connection restored");
                self.controller.set_alert_user(ctx.alert_user);
            }
            self.failed_restarts = 0;
            self.skipped_ticks = 0;
            return (self, false);
        }
        if !global.auto_reconnect {
            return (self, false);
        }
        if self.skipped_ticks + 1 < backoff_ticks(self.failed_restarts) {
            self.skipped_ticks += 1;
            return (self, false);
        }

        let quiet = ControllerContext {
            alert_user: false,
            ..ctx.clone()
        };
        let restarted = Self {
            controller: self.controller.restart(quiet),
            announced: false,
            failed_restarts: self.failed_restarts + 1,
            skipped_ticks: 0,
            ..self
        };
        (restarted, true)
    }

    fn stop(mut self) {
        self.controller.stop();
    }
}

fn backoff_ticks(failed_restarts: u32) -> u32 {
    1 << failed_restarts.min(MAX_BACKOFF_SHIFT)
}
