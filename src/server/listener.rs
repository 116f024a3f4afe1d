use std::sync::Arc;
use std::sync::atomic::{AtomicI32, Ordering};

use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_util::codec::Framed;
use tokio_util::sync::CancellationToken;

use crate::protocol::LineCodec;
use crate::server::session::Session;
use crate::server::state::AppState;

/// TCP front door: accepts connections and runs one session per client.
pub struct Server {
    listener: TcpListener,
    next_id: AtomicI32,
    state: Arc<AppState>,
}

impl Server {
    /// Creates a new server over an already-bound listener.
    pub fn new(listener: TcpListener, state: Arc<AppState>) -> Self {
        Self {
            listener,
            next_id: AtomicI32::new(1),
            state,
        }
    }

    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.listener.local_addr()
    }

    /// Accepts connections until `shutdown` fires, then closes every
    /// session best-effort and returns.
    ///
    /// Each accepted transport is split: the session task owns the read
    /// half, and a writer task drains the peer's registry queue into the
    /// write half so one slow receiver never stalls anyone else.
    pub async fn serve(self, shutdown: CancellationToken) -> Result<(), std::io::Error> {
        loop {
            let accepted = tokio::select! {
                _ = shutdown.cancelled() => break,
                accepted = self.listener.accept() => accepted,
            };
            let (socket, peer_addr) = match accepted {
                Ok(accepted) => accepted,
                Err(e) => {
                    // Transient accept failures (e.g. EMFILE) can recover.
                    tracing::warn!("accept failed: {}", e);
                    continue;
                }
            };

            let id = self.next_id.fetch_add(1, Ordering::SeqCst);
            let state = self.state.clone();
            tracing::info!(id, %peer_addr, "accepted connection");

            tokio::spawn(async move {
                let (sink, lines) = Framed::new(socket, LineCodec::new()).split();
                let (cancel, rx) = state.registry().register(id);
                let writer = tokio::spawn(write_loop(sink, rx));

                let mut session = Session::new(id, lines, state.clone());
                if let Err(e) = session.run(cancel).await {
                    tracing::warn!(id, "session ended with error: {}", e);
                }
                state.handle_disconnect(id).await;

                // The registry entry is gone, so the queue sender is
                // dropped and the writer drains any final messages.
                let _ = writer.await;
            });
        }

        tracing::info!("shutting down; closing {} session(s)", self.state.registry().len());
        self.state.registry().close_all();
        Ok(())
    }
}

/// Drains one peer's outbound queue into its socket. Ends when the queue
/// closes (the peer left the registry) or a write fails.
async fn write_loop(
    mut sink: SplitSink<Framed<TcpStream, LineCodec>, String>,
    mut rx: mpsc::Receiver<String>,
) {
    while let Some(line) = rx.recv().await {
        if sink.send(line).await.is_err() {
            break;
        }
    }
    let _ = sink.close().await;
}
