//! Discord Rich Presence transport using discord-sdk

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use discord_sdk::{
    activity::{ActivityBuilder, Assets},
    wheel::{UserState, Wheel},
    Discord, Subscriptions,
};
use tokio::sync::mpsc;

use crate::presence::Presence;
use crate::transport::{ErrorObserver, PresenceTransport, TransportError, TransportFactory};

/// Timeout for waiting for Discord handshake
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

enum Command {
    Update(Presence),
    Disconnect,
}

/// Opens one background session per `connect` call.
///
/// Must be used from inside a tokio runtime.
pub struct DiscordTransports;

impl TransportFactory for DiscordTransports {
    fn connect(&self, app_id: &str, on_error: ErrorObserver) -> Box<dyn PresenceTransport> {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(run_session(app_id.to_string(), rx, on_error));
        Box::new(DiscordSession { tx: Some(tx) })
    }
}

/// Handle to a background session. Dropping it also ends the session.
struct DiscordSession {
    tx: Option<mpsc::UnboundedSender<Command>>,
}

impl PresenceTransport for DiscordSession {
    fn update_presence(&mut self, presence: &Presence) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(Command::Update(presence.clone()));
        }
    }

    fn disconnect(&mut self) {
        if let Some(tx) = self.tx.take() {
            let _ = tx.send(Command::Disconnect);
        }
    }
}

/// Background task that owns the Discord connection and forwards presence updates.
/// Updates queued before the handshake completes are sent once it does.
async fn run_session(
    app_id: String,
    mut rx: mpsc::UnboundedReceiver<Command>,
    on_error: ErrorObserver,
) {
    let id: i64 = match app_id.parse() {
        Ok(id) => id,
        Err(_) => {
            on_error(Some(TransportError::InvalidAppId(app_id)));
            return;
        }
    };

    let (wheel, handler) = Wheel::new(Box::new(|err| {
        tracing::warn!("Discord error: {:?}", err);
    }));

    let mut user_spoke = wheel.user();

    let discord = match Discord::new(id, Subscriptions::ACTIVITY, Box::new(handler)) {
        Ok(d) => d,
        Err(e) => {
            on_error(Some(TransportError::Unavailable(format!("{e:?}"))));
            return;
        }
    };

    tracing::info!("Discord connecting as application {}...", app_id);

    let handshake = tokio::time::timeout(HANDSHAKE_TIMEOUT, async {
        if user_spoke.0.changed().await.is_err() {
            Err(None)
        } else {
            match &*user_spoke.0.borrow() {
                UserState::Connected(user) => Ok(user.username.clone()),
                UserState::Disconnected(err) => Err(Some(TransportError::Disconnected(
                    format!("{err:?}"),
                ))),
            }
        }
    })
    .await;

    match handshake {
        Ok(Ok(username)) => tracing::info!("Discord Rich Presence connected as {}", username),
        Ok(Err(error)) => {
            on_error(error);
            discord.disconnect().await;
            return;
        }
        Err(_) => {
            on_error(Some(TransportError::HandshakeTimeout));
            discord.disconnect().await;
            return;
        }
    }

    loop {
        tokio::select! {
            cmd = rx.recv() => match cmd {
                Some(Command::Update(presence)) => {
                    if let Err(e) = discord.update_activity(build_activity(&presence)).await {
                        tracing::debug!("Failed to update Discord activity: {:?}", e);
                    }
                }
                Some(Command::Disconnect) | None => break,
            },
            changed = user_spoke.0.changed() => {
                let error = match changed {
                    Err(_) => None,
                    Ok(()) => match &*user_spoke.0.borrow() {
                        UserState::Connected(_) => continue,
                        UserState::Disconnected(err) => {
                            Some(TransportError::Disconnected(format!("{err:?}")))
                        }
                    },
                };
                on_error(error);
                break;
            }
        }
    }

    discord.disconnect().await;
    tracing::info!("Discord Rich Presence disconnected");
}

fn build_activity(presence: &Presence) -> ActivityBuilder {
    let mut activity = ActivityBuilder::new().assets(
        Assets::default()
            .large(
                presence.large_image_key.clone(),
                Some(presence.large_image_text.clone()),
            )
            .small(
                presence.small_image_key.clone(),
                Some(presence.small_image_text.clone()),
            ),
    );

    if let Some(state) = &presence.state {
        activity = activity.state(state.clone());
    }
    if let Some(details) = &presence.details {
        activity = activity.details(details.clone());
    }
    if let Some(ts) = presence.start_timestamp {
        activity = activity.start_timestamp(unix_time(ts));
    }
    if let Some(ts) = presence.end_timestamp {
        activity = activity.end_timestamp(unix_time(ts));
    }

    activity
}

/// Unix seconds to `SystemTime`; negative values clamp to the epoch.
fn unix_time(secs: i64) -> SystemTime {
    UNIX_EPOCH + Duration::from_secs(secs.max(0) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unix_time_converts_seconds() {
        let t = unix_time(1_700_000_000);
        assert_eq!(
            t.duration_since(UNIX_EPOCH).unwrap(),
            Duration::from_secs(1_700_000_000)
        );
    }

    #[test]
    fn unix_time_clamps_negative() {
        assert_eq!(unix_time(-5), UNIX_EPOCH);
    }

    #[test]
    fn disconnect_twice_is_noop() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut session = DiscordSession { tx: Some(tx) };
        session.disconnect();
        session.disconnect();
        assert!(matches!(rx.try_recv(), Ok(Command::Disconnect)));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn update_after_disconnect_is_dropped() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut session = DiscordSession { tx: Some(tx) };
        session.disconnect();
        let _ = rx.try_recv();
        session.update_presence(&Presence {
            state: None,
            details: None,
            start_timestamp: None,
            end_timestamp: None,
            instance: true,
            large_image_key: "ps3_main".to_string(),
            large_image_text: "PlayStation 3".to_string(),
            small_image_key: "ps3_main".to_string(),
            small_image_text: "PlayStationDiscord".to_string(),
        });
        assert!(rx.try_recv().is_err());
    }
}
