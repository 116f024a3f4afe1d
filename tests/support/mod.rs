//! Test utilities for integration tests.
//!
//! Provides a wrapper that starts the real server on an ephemeral port over
//! a temp-file SQLite store, plus a scripted line client for driving it.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tempfile::TempDir;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_util::codec::Framed;
use tokio_util::sync::CancellationToken;

use crosstalk::protocol::LineCodec;
use crosstalk::server::{AppState, Server};
use crosstalk::store::{self, MatchStore, UserStore};

const RECV_TIMEOUT: Duration = Duration::from_secs(5);

/// A running server plus handles to its stores for assertions.
///
/// The server task is shut down when the value is dropped.
pub struct TestServer {
    port: u16,
    pub state: Arc<AppState>,
    pub users: UserStore,
    pub matches: MatchStore,
    shutdown: CancellationToken,
    handle: JoinHandle<()>,
    _db_dir: TempDir,
}

impl TestServer {
    /// Starts a server on an ephemeral port with a fresh database.
    pub async fn start() -> Self {
        let db_dir = TempDir::new().unwrap();
        let pool = store::connect(&db_dir.path().join("test.db")).await.unwrap();
        let users = UserStore::new(pool.clone());
        users.initialize().await.unwrap();
        let matches = MatchStore::new(pool);
        matches.initialize().await.unwrap();

        let state = Arc::new(AppState::new(users.clone(), matches.clone()));
        state.reset_game().await.unwrap();

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let shutdown = CancellationToken::new();
        let server = Server::new(listener, state.clone());
        let handle = tokio::spawn({
            let shutdown = shutdown.clone();
            async move {
                let _ = server.serve(shutdown).await;
            }
        });

        Self {
            port,
            state,
            users,
            matches,
            shutdown,
            handle,
            _db_dir: db_dir,
        }
    }

    pub async fn connect(&self) -> TestClient {
        let stream = TcpStream::connect(("127.0.0.1", self.port)).await.unwrap();
        TestClient {
            framed: Framed::new(stream, LineCodec::new()),
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.cancel();
        self.handle.abort();
    }
}

/// A scripted client speaking the real wire protocol.
pub struct TestClient {
    framed: Framed<TcpStream, LineCodec>,
}

impl TestClient {
    pub async fn send(&mut self, line: &str) {
        self.framed.send(line.to_string()).await.unwrap();
    }

    /// Receives the next line, panicking on timeout or close.
    pub async fn recv(&mut self) -> String {
        match tokio::time::timeout(RECV_TIMEOUT, self.framed.next()).await {
            Ok(Some(Ok(line))) => line,
            Ok(Some(Err(e))) => panic!("receive failed: {}", e),
            Ok(None) => panic!("connection closed while waiting for a line"),
            Err(_) => panic!("timed out waiting for a line"),
        }
    }

    /// Skips lines until one contains `needle`, returning it.
    pub async fn recv_containing(&mut self, needle: &str) -> String {
        for _ in 0..100 {
            let line = self.recv().await;
            if line.contains(needle) {
                return line;
            }
        }
        panic!("no line containing {:?} arrived", needle);
    }

    /// Collects lines up to and including the first one containing
    /// `needle`.
    pub async fn drain_until(&mut self, needle: &str) -> Vec<String> {
        let mut lines = Vec::new();
        for _ in 0..100 {
            let line = self.recv().await;
            let done = line.contains(needle);
            lines.push(line);
            if done {
                return lines;
            }
        }
        panic!("no line containing {:?} arrived; got {:?}", needle, lines);
    }

    /// Registers and waits for the success reply.
    pub async fn register(&mut self, username: &str, password: &str) {
        self.send(&format!("!register {} {}", username, password))
            .await;
        self.recv_containing("Registration successful").await;
    }

    /// Drains any pending lines until the server closes the connection.
    pub async fn expect_close(&mut self) {
        for _ in 0..100 {
            match tokio::time::timeout(RECV_TIMEOUT, self.framed.next()).await {
                Ok(None) | Ok(Some(Err(_))) => return,
                Ok(Some(Ok(_))) => continue,
                Err(_) => panic!("timed out waiting for the connection to close"),
            }
        }
        panic!("the connection never closed");
    }

    /// Drops the connection without a goodbye, as a crashing client would.
    pub fn abandon(self) {
        drop(self);
    }
}

/// Asserts that `expected` appears within `lines` in order (by substring
/// match), allowing unrelated lines in between.
pub fn assert_ordered(lines: &[String], expected: &[&str]) {
    let mut rest = lines.iter();
    for needle in expected {
        assert!(
            rest.any(|line| line.contains(needle)),
            "expected {:?} in order within {:#?}",
            needle,
            lines
        );
    }
}
