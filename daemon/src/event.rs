use crate::config::{Config, EmulatorConfig};
use crate::transport::TransportError;

pub enum DaemonEvent {
    /// A configured emulator appeared in the process list.
    ConsoleStarted(EmulatorConfig),
    /// The previously active emulator exited.
    ConsoleStopped,
    /// The config file changed on disk and was successfully re-parsed.
    ConfigReloaded(Config),
    /// Periodic tick: push fresh status to Discord.
    RefreshPresence,
    /// A presence controller's Discord session failed.
    /// `session` identifies which controller the failure belongs to.
    TransportFailed {
        session: u64,
        error: Option<TransportError>,
    },
    /// Ctrl+C received; the daemon should clear presence and exit.
    Shutdown,
}
