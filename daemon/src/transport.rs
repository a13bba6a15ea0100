/// Seam between the presence controller and whatever talks to the Discord client.
use crate::presence::Presence;

/// Why a transport session ended.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("invalid Discord application id '{0}'")]
    InvalidAppId(String),
    #[error("Discord client not available: {0}")]
    Unavailable(String),
    #[error("Discord handshake timed out")]
    HandshakeTimeout,
    #[error("Discord disconnected: {0}")]
    Disconnected(String),
}

/// Called at most once per session when it fails. `None` means the session
/// closed without telling us why.
pub type ErrorObserver = Box<dyn Fn(Option<TransportError>) + Send + Sync>;

/// An open session to the local Discord client.
pub trait PresenceTransport: Send {
    /// Queues `presence` for sending; does not wait for Discord to acknowledge it.
    fn update_presence(&mut self, presence: &Presence);

    /// Closes the session. Must be a no-op on an already closed session.
    fn disconnect(&mut self);
}

/// Opens transport sessions for a given Discord application id.
pub trait TransportFactory: Send + Sync {
    fn connect(&self, app_id: &str, on_error: ErrorObserver) -> Box<dyn PresenceTransport>;
}
