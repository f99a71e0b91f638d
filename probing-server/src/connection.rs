use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use probing_observability_deps::tracing::{debug, info, warn};
use probing_repl::Executor;
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::Message;

/// Serves one WebSocket connection: every text frame is a source fragment
/// (or magic-command line), every reply is the JSON-encoded `Reply`.
/// Requests on this connection run in the order received; `executor` is
/// shared across every connection the server accepts, so the lock also
/// serialises requests *between* connections, so each
/// request runs to completion atomically with respect to REPL state.
///
/// Grounded on the accept-loop/per-connection task shape of the
/// `rerun`/`comms` crate's `Server::listen`, adapted from a broadcast feed
/// to a request/reply protocol.
pub async fn handle<S>(stream: S, executor: Arc<Mutex<Executor>>)
where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin,
{
    let ws_stream = match tokio_tungstenite::accept_async(stream).await {
        Ok(stream) => stream,
        Err(err) => {
            warn!(error = %err, "WebSocket handshake failed");
            return;
        }
    };
    info!("REPL connection established");

    let (mut sender, mut receiver) = ws_stream.split();

    while let Some(message) = receiver.next().await {
        let message = match message {
            Ok(message) => message,
            Err(err) => {
                warn!(error = %err, "WebSocket read failed, closing connection");
                break;
            }
        };

        match message {
            Message::Text(text) => {
                debug!(fragment = %text, "executing REPL fragment");
                let reply = {
                    let mut executor = executor.lock().await;
                    executor.execute(&text)
                };
                let encoded = match serde_json::to_string(&reply) {
                    Ok(encoded) => encoded,
                    Err(err) => {
                        warn!(error = %err, "failed to encode REPL reply");
                        continue;
                    }
                };
                if sender.send(Message::Text(encoded)).await.is_err() {
                    break;
                }
            }
            Message::Close(_) => break,
            Message::Ping(payload) => {
                let _ = sender.send(Message::Pong(payload)).await;
            }
            _ => {}
        }
    }

    info!("REPL connection closed");
}
