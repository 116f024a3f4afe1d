//! TCP chat server with the embedded Tic-Tac-Toe match.
//!
//! This module provides the network layer that accepts client connections
//! and manages their lifecycle, plus the chat router, game coordinator, and
//! host console that act on the shared state.
//!
//! ## Architecture
//!
//! ```text
//! +--------+
//! | Server |  <- Accepts TCP connections
//! +--------+
//!      |
//!      v
//! +---------+     +----------+
//! | Session | --> | AppState |  <- Registry + stores + the match
//! +---------+     +----------+
//!      |               |
//!      v               v
//! +----------+    +-----------------+
//! | Registry |    | chat / game /   |
//! | (peers)  |    | console handlers|
//! +----------+    +-----------------+
//! ```
//!
//! ## Terminology
//!
//! - **Server**: TCP listener that spawns a session per connection
//! - **Session**: per-client receive loop and state-guarded dispatcher
//! - **Registry**: the connected-user set; peers, queues, cancel tokens
//! - **AppState**: one server instance's registry, stores, and match

mod chat;
mod console;
mod error;
mod game;
mod listener;
mod registry;
mod session;
mod state;

pub use console::run_console;
pub use error::SessionError;
pub use listener::Server;
pub use registry::{PeerInfo, Registry, SessionId, SessionState};
pub use session::Session;
pub use state::AppState;
