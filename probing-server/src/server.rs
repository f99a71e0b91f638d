use std::net::SocketAddr;
use std::sync::Arc;

use probing_observability_deps::tracing::info;
use probing_repl::Executor;
use tokio::sync::Mutex;

use crate::connection::handle;
use crate::listener::Listener;

/// The socket server. Accepts connections and spawns one
/// task per connection; every connection shares the same REPL `Executor`.
#[derive(Debug)]
pub struct Server {
    listener: Listener,
}

impl Server {
    pub async fn bind_tcp(addr: SocketAddr) -> std::io::Result<Self> {
        Ok(Self {
            listener: Listener::bind_tcp(addr).await?,
        })
    }

    pub fn bind_unix_abstract(id: &str) -> std::io::Result<Self> {
        Ok(Self {
            listener: Listener::bind_unix_abstract(id)?,
        })
    }

    /// Runs the accept loop until the listener errors. Each accepted
    /// connection gets its own task; `executor` is shared and locked per
    /// request, so connections interleave but no two requests execute
    /// concurrently against REPL state.
    pub async fn serve(self, executor: Arc<Mutex<Executor>>) -> std::io::Result<()> {
        match self.listener {
            Listener::Tcp(listener) => loop {
                let (stream, peer) = listener.accept().await?;
                info!(%peer, "accepted TCP connection");
                let executor = Arc::clone(&executor);
                tokio::spawn(handle(stream, executor));
            },
            Listener::Unix(listener) => loop {
                let (stream, _addr) = listener.accept().await?;
                info!("accepted UNIX connection");
                let executor = Arc::clone(&executor);
                tokio::spawn(handle(stream, executor));
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use probing_repl::{Executor, MagicTable, StubBackend};
    use tokio_tungstenite::tungstenite::Message;

    #[tokio::test]
    async fn tcp_round_trip_executes_a_fragment() {
        let server = Server::bind_tcp("127.0.0.1:0".parse().unwrap())
            .await
            .unwrap();
        let local_addr = match &server.listener {
            Listener::Tcp(listener) => listener.local_addr().unwrap(),
            _ => unreachable!(),
        };

        let executor = Arc::new(Mutex::new(Executor::new(
            Box::new(StubBackend::new()),
            MagicTable::new(),
        )));
        tokio::spawn(server.serve(executor));

        let (mut ws, _) = tokio_tungstenite::connect_async(format!("ws://{local_addr}"))
            .await
            .unwrap();
        use futures::{SinkExt, StreamExt};
        ws.send(Message::Text("x = 7".to_string())).await.unwrap();
        let _ack = ws.next().await.unwrap().unwrap();
        ws.send(Message::Text("x".to_string())).await.unwrap();
        let reply = ws.next().await.unwrap().unwrap();
        let Message::Text(text) = reply else {
            panic!("expected text frame");
        };
        assert!(text.contains("\"7\""));
    }
}
