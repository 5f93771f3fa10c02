//! Persistent duplex channel over WebSocket.
//!
//! Each text frame carries one JSON-RPC request or batch and is dispatched on
//! its own task, so responses may complete out of order; the id is the only
//! correlation. Every outbound frame goes through one writer task:
//!
//! ```text
//! Call 1 ─┐
//! Call 2 ─┼─► mpsc::Sender<String> ─► Writer Task ─► WebSocket sink
//! Call N ─┘
//! ```

use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use funcrpc_core::{CallContext, ChannelSender};
use tokio::sync::mpsc;
use tokio::time::{self, Instant, Interval};

use crate::state::AppState;

/// How long a closing session waits for queued frames to be written.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

/// GET /websocket: upgrade to a duplex session.
pub async fn upgrade(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    let max_message_size = state.websocket.max_message_size;
    ws.max_message_size(max_message_size)
        .on_upgrade(move |socket| serve_session(state, socket))
}

async fn serve_session(state: AppState, socket: WebSocket) {
    let (sink, mut stream) = socket.split();
    let (tx, rx) = mpsc::channel::<String>(state.websocket.write_capacity);
    let mut writer = tokio::spawn(write_loop(sink, rx, state.websocket.ping_interval));
    let channel = ChannelSender::new(tx);
    tracing::debug!("duplex session opened");

    while let Some(frame) = stream.next().await {
        let text = match frame {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) => break,
            // pongs are answered by axum; binary frames are not part of the protocol
            Ok(_) => continue,
            Err(e) => {
                tracing::warn!(error = %e, "duplex read failed");
                break;
            }
        };

        let rpc = state.rpc.clone();
        let channel = channel.clone();
        tokio::spawn(async move {
            let ctx = CallContext::duplex(channel.clone());
            if let Some(resp) = rpc.handle_request(text.as_str(), ctx).await {
                if channel.send_raw(resp).await.is_err() {
                    tracing::debug!("duplex session ended before response was written");
                }
            }
        });
    }

    // The writer drains the queue and closes the sink once the last sender
    // is gone; calls still running keep their own clone.
    drop(channel);
    if time::timeout(SHUTDOWN_GRACE, &mut writer).await.is_err() {
        tracing::debug!("duplex writer still busy at shutdown; aborting");
        writer.abort();
    }
    tracing::debug!("duplex session closed");
}

async fn write_loop(
    mut sink: SplitSink<WebSocket, Message>,
    mut rx: mpsc::Receiver<String>,
    ping_interval: Option<Duration>,
) {
    let mut ping = ping_interval.map(|period| time::interval_at(Instant::now() + period, period));

    loop {
        let msg = tokio::select! {
            frame = rx.recv() => match frame {
                Some(frame) => Message::Text(frame.into()),
                None => break,
            },
            _ = next_ping(&mut ping) => Message::Ping(Default::default()),
        };

        if let Err(e) = sink.send(msg).await {
            tracing::warn!(error = %e, "duplex write failed");
            break;
        }
    }

    let _ = sink.close().await;
}

async fn next_ping(ping: &mut Option<Interval>) {
    match ping {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}
