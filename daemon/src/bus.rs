/// Process-wide notifications for anything interested in presence state
/// (currently the status file writer).
use tokio::sync::broadcast;

use crate::console::ConsoleKind;
use crate::transport::TransportError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    /// A controller was started for `console`.
    PresenceStarted(ConsoleKind),
    /// The active console went away and its controller was stopped.
    PresenceStopped,
    /// The Discord session failed; carries the error when the transport gave one.
    DiscordDisconnected(Option<TransportError>),
}

pub struct EventBus {
    sender: broadcast::Sender<AppEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AppEvent> {
        self.sender.subscribe()
    }

    /// Returns the number of subscribers that received the event.
    pub fn publish(&self, event: AppEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }
}
