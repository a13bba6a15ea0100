/// Presence controller: owns one Discord session for one console.
///
/// A controller is either running or stopped. It starts running as soon as its
/// session is opened and stops on [`PresenceController::stop`] or when the
/// session reports a failure. A stopped controller never runs again; recovery
/// goes through [`PresenceController::restart`], which builds a fresh one.
///
/// Dropping a controller without calling `stop` (or `restart`) leaves closing
/// the session up to the transport. Callers are expected to stop it first.
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::bus::{AppEvent, EventBus};
use crate::console::Console;
use crate::dialog::{Dialog, DialogKind, Notifier};
use crate::event::DaemonEvent;
use crate::presence::{DefaultInfo, PresencePayload, UpdateOptions, PRODUCT_NAME};
use crate::transport::{ErrorObserver, PresenceTransport, TransportError, TransportFactory};

static NEXT_SESSION: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ControllerError {
    /// `update` was called after the controller stopped.
    #[error("Discord controller not running")]
    Inactive,
}

/// Collaborators shared by every controller the daemon creates.
#[derive(Clone)]
pub struct ControllerContext {
    pub transports: Arc<dyn TransportFactory>,
    pub notifier: Arc<dyn Notifier>,
    pub bus: Arc<EventBus>,
    /// Session failures are posted here as [`DaemonEvent::TransportFailed`].
    pub events: mpsc::UnboundedSender<DaemonEvent>,
    /// Log every merged presence record before sending it.
    pub verbose: bool,
    /// Show the error dialog on session failure. Cleared for automatic
    /// reconnect attempts so a missing Discord client does not stack dialogs.
    pub alert_user: bool,
    /// Shown in the error dialog so users know where to look.
    pub log_dir: PathBuf,
    /// Product version embedded in the small-image text; may be empty.
    pub version: String,
}

pub struct PresenceController {
    console: Console,
    ctx: ControllerContext,
    session: u64,
    transport: Box<dyn PresenceTransport>,
    running: bool,
    last_start_timestamp: Option<i64>,
    defaults: DefaultInfo,
}

impl PresenceController {
    /// Opens a session as `console`'s Discord application and starts running.
    ///
    /// Connection problems are not reported here; they arrive later through
    /// [`PresenceController::handle_transport_error`].
    pub fn start(console: Console, ctx: ControllerContext) -> Self {
        let session = NEXT_SESSION.fetch_add(1, Ordering::Relaxed);

        let events = ctx.events.clone();
        let on_error: ErrorObserver = Box::new(move |error| {
            let _ = events.send(DaemonEvent::TransportFailed { session, error });
        });
        let transport = ctx.transports.connect(console.app_id(), on_error);
        let defaults = DefaultInfo::for_console(&console, &ctx.version);

        tracing::info!(
            "Presence controller started for {} (application {}, session {})",
            console.display_name(),
            console.app_id(),
            session
        );

        Self {
            console,
            ctx,
            session,
            transport,
            running: true,
            last_start_timestamp: None,
            defaults,
        }
    }

    pub fn running(&self) -> bool {
        self.running
    }

    pub fn session(&self) -> u64 {
        self.session
    }

    pub fn console(&self) -> &Console {
        &self.console
    }

    /// Merges `payload` over this console's defaults and hands it to Discord.
    ///
    /// Without `hide_timestamp`, a missing start timestamp is filled in from the
    /// last one sent and a present one becomes the new remembered value, so the
    /// elapsed-time counter survives updates that omit it.
    pub fn update(
        &mut self,
        mut payload: PresencePayload,
        options: UpdateOptions,
    ) -> Result<(), ControllerError> {
        if !self.running {
            return Err(ControllerError::Inactive);
        }

        if !options.hide_timestamp {
            match payload.start_timestamp {
                None => payload.start_timestamp = self.last_start_timestamp,
                Some(ts) => self.last_start_timestamp = Some(ts),
            }
        }

        let presence = self.defaults.overlay(payload);
        if self.ctx.verbose {
            tracing::info!("Presence update: {:?}", presence);
        }
        self.transport.update_presence(&presence);
        Ok(())
    }

    /// Closes the session. Safe to call more than once.
    pub fn stop(&mut self) {
        self.transport.disconnect();
        if self.running {
            tracing::info!("Presence controller stopped (session {})", self.session);
        }
        self.running = false;
    }

    /// Stops this controller and returns a brand-new one for the same console,
    /// built from `ctx` (the caller's current collaborators and settings).
    ///
    /// Nothing carries over: the remembered start timestamp is gone, so callers
    /// that want the elapsed time to continue must send it again.
    pub fn restart(mut self, ctx: ControllerContext) -> Self {
        tracing::info!("Restarting presence controller for {}", self.console.display_name());
        self.stop();
        Self::start(self.console.clone(), ctx)
    }

    /// Whether a later session failure shows the error dialog.
    pub fn set_alert_user(&mut self, alert: bool) {
        self.ctx.alert_user = alert;
    }

    #[cfg(test)]
    pub fn context(&self) -> &ControllerContext {
        &self.ctx
    }

    /// Reacts to a failed session: logs it, alerts the user, announces
    /// [`AppEvent::DiscordDisconnected`] and stops.
    pub fn handle_transport_error(&mut self, error: Option<TransportError>) {
        match &error {
            Some(err) => {
                tracing::error!("An error occurred while communicating with Discord: {}", err)
            }
            None => tracing::error!(
                "An error occurred while communicating with Discord. Maybe the application {} for the {} has been deleted?",
                self.console.app_id(),
                self.console.display_name()
            ),
        }

        if self.ctx.alert_user {
            self.ctx.notifier.show(self.error_dialog());
        } else {
            tracing::debug!("Error dialog suppressed for session {}", self.session);
        }
        self.ctx.bus.publish(AppEvent::DiscordDisconnected(error));
        self.running = false;
    }

    fn error_dialog(&self) -> Dialog {
        Dialog {
            kind: DialogKind::Error,
            title: format!("{PRODUCT_NAME} Error"),
            message: "An error occurred while communicating with Discord".to_string(),
            detail: format!(
                "Maybe the application {} for the {} has been deleted?\n\n\
                 Please check the log file for additional information.\n{}",
                self.console.app_id(),
                self.console.display_name(),
                self.ctx.log_dir.display()
            ),
        }
    }
}
