//! Observer WebSocket endpoint.
//!
//! Each accepted socket becomes one hub observer. Clients manage their room
//! memberships with text commands:
//!
//! ```json
//! {"action": "join", "room": "building:hq"}
//! {"action": "leave", "room": "zone:floor-1"}
//! ```
//!
//! Hub frames are forwarded as text messages. Every write is bounded by the
//! write timeout, and a socket that stays silent past the heartbeat timeout
//! is closed. Closing the socket removes every membership it held.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{Sink, SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::{interval, timeout, Instant, MissedTickBehavior};
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, trace, warn};

use crate::application::hub::{BroadcastHub, ObserverChannel};
use crate::domain::room::{ObserverId, RoomKey};
use crate::error::{Error, Result};
use crate::infrastructure::config::hub::HubConfig;

/// Socket timing limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SocketSettings {
    pub write_timeout: Duration,
    pub heartbeat_interval: Duration,
    pub heartbeat_timeout: Duration,
}

impl From<&HubConfig> for SocketSettings {
    fn from(config: &HubConfig) -> Self {
        Self {
            write_timeout: Duration::from_millis(config.write_timeout_ms),
            heartbeat_interval: Duration::from_secs(config.heartbeat_interval_secs.max(1)),
            heartbeat_timeout: Duration::from_secs(config.heartbeat_timeout_secs.max(1)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
enum ClientCommand {
    Join { room: RoomKey },
    Leave { room: RoomKey },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CommandReply {
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    action: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    room: Option<RoomKey>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl CommandReply {
    fn done(action: &'static str, room: RoomKey, changed: bool) -> Self {
        Self {
            ok: changed,
            action: Some(action),
            room: Some(room),
            error: None,
        }
    }

    fn rejected(error: String) -> Self {
        Self {
            ok: false,
            action: None,
            room: None,
            error: Some(error),
        }
    }
}

pub struct ObserverServer {
    hub: Arc<BroadcastHub>,
    settings: SocketSettings,
}

impl ObserverServer {
    #[must_use]
    pub fn new(hub: Arc<BroadcastHub>, settings: SocketSettings) -> Self {
        Self { hub, settings }
    }

    /// Accept connections until the listener fails.
    pub async fn serve(self: Arc<Self>, listener: TcpListener) -> Result<()> {
        if let Ok(addr) = listener.local_addr() {
            info!(addr = %addr, "Observer endpoint listening");
        }
        loop {
            let (stream, peer) = listener.accept().await?;
            let server = Arc::clone(&self);
            tokio::spawn(async move {
                if let Err(err) = server.handle(stream, peer).await {
                    debug!(peer = %peer, error = %err, "Observer connection ended with error");
                }
            });
        }
    }

    async fn handle(&self, stream: TcpStream, peer: SocketAddr) -> Result<()> {
        let socket = accept_async(stream).await?;
        let ObserverChannel { id, mut frames } = self.hub.register();
        info!(observer = %id, peer = %peer, "Observer connected");

        let (mut sink, mut source) = socket.split();
        let mut heartbeat = interval(self.settings.heartbeat_interval);
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);
        heartbeat.tick().await;
        let mut last_seen = Instant::now();

        let result = loop {
            tokio::select! {
                frame = frames.recv() => match frame {
                    Some(frame) => {
                        if let Err(err) = self.send(&mut sink, Message::Text(frame.to_string())).await {
                            break Err(err);
                        }
                    }
                    None => {
                        warn!(observer = %id, "Observer evicted by hub");
                        break Ok(());
                    }
                },
                incoming = source.next() => match incoming {
                    Some(Ok(Message::Text(text))) => {
                        last_seen = Instant::now();
                        let reply = self.apply(id, &text);
                        if let Err(err) = self.send_json(&mut sink, &reply).await {
                            break Err(err);
                        }
                    }
                    Some(Ok(Message::Ping(payload))) => {
                        last_seen = Instant::now();
                        if let Err(err) = self.send(&mut sink, Message::Pong(payload)).await {
                            break Err(err);
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break Ok(()),
                    Some(Ok(_)) => last_seen = Instant::now(),
                    Some(Err(err)) => break Err(err.into()),
                },
                _ = heartbeat.tick() => {
                    if last_seen.elapsed() > self.settings.heartbeat_timeout {
                        info!(observer = %id, "Observer heartbeat timed out");
                        break Ok(());
                    }
                    if let Err(err) = self.send(&mut sink, Message::Ping(Vec::new())).await {
                        break Err(err);
                    }
                }
            }
        };

        self.hub.disconnect(id);
        info!(observer = %id, "Observer disconnected");
        result
    }

    fn apply(&self, observer: ObserverId, text: &str) -> CommandReply {
        match serde_json::from_str::<ClientCommand>(text) {
            Ok(ClientCommand::Join { room }) => {
                let changed = self.hub.join(observer, room.clone());
                debug!(observer = %observer, room = %room, "Joined room");
                CommandReply::done("join", room, changed)
            }
            Ok(ClientCommand::Leave { room }) => {
                let changed = self.hub.leave(observer, &room);
                debug!(observer = %observer, room = %room, changed, "Left room");
                CommandReply::done("leave", room, changed)
            }
            Err(err) => {
                trace!(observer = %observer, error = %err, "Rejected observer command");
                CommandReply::rejected(err.to_string())
            }
        }
    }

    async fn send_json<S>(&self, sink: &mut S, value: &impl Serialize) -> Result<()>
    where
        S: Sink<Message, Error = tokio_tungstenite::tungstenite::Error> + Unpin,
    {
        let text = serde_json::to_string(value)?;
        self.send(sink, Message::Text(text)).await
    }

    async fn send<S>(&self, sink: &mut S, message: Message) -> Result<()>
    where
        S: Sink<Message, Error = tokio_tungstenite::tungstenite::Error> + Unpin,
    {
        match timeout(self.settings.write_timeout, sink.send(message)).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                "observer write timed out",
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands_parse_room_keys() {
        let join: ClientCommand = serde_json::from_str(r#"{"action":"join","room":"building:hq"}"#).unwrap();
        assert_eq!(
            join,
            ClientCommand::Join {
                room: RoomKey::building("hq")
            }
        );
        assert!(serde_json::from_str::<ClientCommand>(r#"{"action":"join","room":"floor:1"}"#).is_err());
        assert!(serde_json::from_str::<ClientCommand>(r#"{"action":"dance","room":"zone:1"}"#).is_err());
    }

    #[test]
    fn apply_updates_hub_membership() {
        let hub = Arc::new(BroadcastHub::default());
        let server = ObserverServer::new(hub.clone(), SocketSettings::from(&HubConfig::default()));
        let observer = hub.register();

        let reply = server.apply(observer.id, r#"{"action":"join","room":"zone:f1"}"#);
        assert!(reply.ok);
        assert_eq!(hub.room_size(&RoomKey::zone("f1")), 1);

        let reply = server.apply(observer.id, r#"{"action":"leave","room":"zone:f1"}"#);
        assert!(reply.ok);
        assert_eq!(hub.room_count(), 0);

        let reply = server.apply(observer.id, "not json");
        assert!(!reply.ok);
        assert!(reply.error.is_some());
    }
}
