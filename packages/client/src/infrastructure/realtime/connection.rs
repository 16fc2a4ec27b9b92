//! WebSocket connection supervisor with reconnection support.

use std::{sync::Weak, time::Duration};

use arrboard_server::infrastructure::dto::realtime::{ClientFrame, ServerFrame};
use futures_util::{Sink, SinkExt, StreamExt};
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};

use crate::error::RealtimeError;

use super::client::Shared;

const MAX_RECONNECT_ATTEMPTS: u32 = 5;
const RECONNECT_INTERVAL_SECS: u64 = 5;

/// State of the realtime connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    /// No transport (tests)
    Detached,
    Connecting,
    Connected,
    /// Waiting before reconnect attempt n
    Reconnecting(u32),
    /// Gave up after the maximum number of attempts
    Failed,
    Closed,
}

enum SessionEnd {
    /// The client went away; stop for good
    ClientGone,
}

/// Keep a connection up until the client is dropped or attempts run out
pub(super) async fn supervise(
    url: String,
    shared: Weak<Shared>,
    mut outbound: mpsc::UnboundedReceiver<ClientFrame>,
    status: watch::Sender<ConnectionStatus>,
) {
    let mut reconnect_count = 0;

    loop {
        tracing::info!(
            "Connecting to {} (attempt {}/{})",
            url,
            reconnect_count + 1,
            MAX_RECONNECT_ATTEMPTS
        );

        match run_session(&url, &shared, &mut outbound, &status, &mut reconnect_count).await {
            Ok(SessionEnd::ClientGone) => {
                tracing::info!("Realtime session ended");
                let _ = status.send(ConnectionStatus::Closed);
                break;
            }
            Err(e) => {
                tracing::warn!("Realtime connection lost: {}", e);
                reconnect_count += 1;

                if reconnect_count >= MAX_RECONNECT_ATTEMPTS {
                    tracing::error!(
                        "Failed to reconnect after {} attempts. Giving up.",
                        MAX_RECONNECT_ATTEMPTS
                    );
                    let _ = status.send(ConnectionStatus::Failed);
                    break;
                }

                tracing::info!(
                    "Reconnecting in {} seconds... (attempt {}/{})",
                    RECONNECT_INTERVAL_SECS,
                    reconnect_count + 1,
                    MAX_RECONNECT_ATTEMPTS
                );
                let _ = status.send(ConnectionStatus::Reconnecting(reconnect_count + 1));
                tokio::time::sleep(Duration::from_secs(RECONNECT_INTERVAL_SECS)).await;
            }
        }
    }
}

async fn run_session(
    url: &str,
    shared: &Weak<Shared>,
    outbound: &mut mpsc::UnboundedReceiver<ClientFrame>,
    status: &watch::Sender<ConnectionStatus>,
    reconnect_count: &mut u32,
) -> Result<SessionEnd, RealtimeError> {
    let (ws_stream, _) = connect_async(url)
        .await
        .map_err(|e| RealtimeError::Connection(e.to_string()))?;
    let (mut write, mut read) = ws_stream.split();

    // restore every subscription before any queued frame
    let Some(client) = shared.upgrade() else {
        return Ok(SessionEnd::ClientGone);
    };
    let frames = client.resubscribe_frames();
    drop(client);
    for frame in frames {
        send_frame(&mut write, &frame).await?;
    }

    tracing::info!("Connected to realtime server");
    *reconnect_count = 0;
    let _ = status.send(ConnectionStatus::Connected);

    loop {
        tokio::select! {
            frame = outbound.recv() => {
                let Some(frame) = frame else {
                    let _ = write.close().await;
                    return Ok(SessionEnd::ClientGone);
                };
                send_frame(&mut write, &frame).await?;
            }
            message = read.next() => {
                match message {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<ServerFrame>(&text) {
                            Ok(frame) => {
                                let Some(client) = shared.upgrade() else {
                                    return Ok(SessionEnd::ClientGone);
                                };
                                client.dispatch(frame);
                            }
                            Err(e) => tracing::debug!("Dropping malformed frame: {}", e),
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        return Err(RealtimeError::Connection(
                            "Server closed the connection".to_string(),
                        ));
                    }
                    Some(Err(e)) => return Err(RealtimeError::Connection(e.to_string())),
                    Some(Ok(_)) => {}
                }
            }
        }
    }
}

async fn send_frame<S>(write: &mut S, frame: &ClientFrame) -> Result<(), RealtimeError>
where
    S: Sink<Message> + Unpin,
    S::Error: std::fmt::Display,
{
    let json = serde_json::to_string(frame)
        .map_err(|e| RealtimeError::Connection(format!("Failed to serialize frame: {}", e)))?;
    write
        .send(Message::Text(json.into()))
        .await
        .map_err(|e| RealtimeError::Connection(e.to_string()))
}
