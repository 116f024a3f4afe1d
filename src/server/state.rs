use parking_lot::Mutex;

use crate::board::Board;
use crate::server::registry::{Registry, SessionId, SessionState};
use crate::store::{MatchStore, StoreError, UserStore};

/// Reply sent when a per-request store call fails. Startup failures abort
/// the server instead.
pub(crate) const DB_ERROR_REPLY: &str = "[Server]: The database is unavailable. Try again later.";

/// In-memory mirror of the match: both slots, whose turn it is, and the
/// live board. One lock guards all four so turn checks and placements are
/// a single atomic step.
#[derive(Default)]
pub(crate) struct CurrentMatch {
    pub player1: Option<String>,
    pub player2: Option<String>,
    pub current_turn: Option<String>,
    pub board: Board,
}

/// Everything one server instance owns: the connected-user set, both
/// persistent stores, and the single match.
///
/// Handlers live in `impl AppState` blocks spread over the `chat` and
/// `game` modules; this file holds construction and session teardown.
pub struct AppState {
    registry: Registry,
    users: UserStore,
    matches: MatchStore,
    pub(crate) current: Mutex<CurrentMatch>,
}

impl AppState {
    pub fn new(users: UserStore, matches: MatchStore) -> Self {
        Self {
            registry: Registry::new(),
            users,
            matches,
            current: Mutex::new(CurrentMatch::default()),
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn users(&self) -> &UserStore {
        &self.users
    }

    pub fn match_store(&self) -> &MatchStore {
        &self.matches
    }

    /// Clears slots, turn, and board, in memory and in the store. Called at
    /// startup (no session can hold a slot across a restart) and on every
    /// terminal game state or dropout.
    pub async fn reset_game(&self) -> Result<(), StoreError> {
        {
            let mut m = self.current.lock();
            m.player1 = None;
            m.player2 = None;
            m.current_turn = None;
            m.board.reset();
        }
        self.matches.clear().await
    }

    /// Enqueues a reply for one session. An unreachable peer is cancelled
    /// so its normal teardown path runs instead of the message silently
    /// piling up.
    pub(crate) fn reply(&self, id: SessionId, message: impl Into<String>) {
        if !self.registry.try_send(id, message) {
            self.registry.cancel(id);
        }
    }

    /// Tears down one session: removal from the registry, dropout recovery
    /// when it was playing, and a leave announcement unless the room was
    /// already told (dropout, kick). Safe to call from any task and
    /// idempotent through the registry removal.
    pub async fn handle_disconnect(&self, id: SessionId) {
        self.reap(vec![id]).await;
    }

    /// Drains a quarantine list of failed peers. Each removal may fail
    /// further sends (dropout broadcasts, leave announcements), which are
    /// queued behind it rather than recursed into.
    pub(crate) async fn reap(&self, mut pending: Vec<SessionId>) {
        while let Some(id) = pending.pop() {
            let Some(info) = self.registry.remove(id) else {
                continue;
            };
            tracing::info!(id, username = %info.username, "session closed");

            // One departure announcement per session: the dropout line
            // covers a player, and a kicked peer was already announced.
            if info.state == SessionState::Playing {
                pending.extend(self.handle_dropout(&info.username).await);
            } else if info.state == SessionState::Chatting && !info.silenced {
                let line = format!("[Server]: {} left the chat.", info.username);
                pending.extend(self.registry.broadcast(&line, None));
            }
        }
    }
}
