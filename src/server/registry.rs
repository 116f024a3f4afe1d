use std::collections::HashMap;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Identifies one connection for its lifetime.
pub type SessionId = i32;

/// Per-connection lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Connected but not yet authenticated.
    Login,
    /// Authenticated; chatting and free to join the match.
    Chatting,
    /// Seated in the match.
    Playing,
}

/// Outbound queue capacity per peer. A receiver that falls this far behind
/// is quarantined and reaped rather than allowed to stall senders.
const SEND_QUEUE_CAPACITY: usize = 64;

struct Peer {
    /// Empty until authenticated; thereafter the stored display name.
    username: String,
    state: SessionState,
    moderator: bool,
    /// The room was already told this peer is leaving (kick); teardown
    /// skips the generic departure announcement.
    silenced: bool,
    tx: mpsc::Sender<String>,
    cancel: CancellationToken,
}

impl Peer {
    fn is_authenticated(&self) -> bool {
        self.state != SessionState::Login
    }
}

/// Public snapshot of one peer, taken under the registry lock.
#[derive(Debug, Clone)]
pub struct PeerInfo {
    pub id: SessionId,
    pub username: String,
    pub state: SessionState,
    pub moderator: bool,
    /// Departure was already announced to the room.
    pub silenced: bool,
}

/// The connected-user set.
///
/// One mutex guards membership, username claims, state flips, and
/// snapshot-for-broadcast; the lock is never held across an await. Each
/// peer carries a bounded outbound queue (drained by its writer task) and a
/// [`CancellationToken`] that stops its receive loop, used by kick, the
/// host console, and shutdown.
#[derive(Default)]
pub struct Registry {
    peers: Mutex<HashMap<SessionId, Peer>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a connection in `Login` state and returns its cancellation
    /// token plus the receiving end of its outbound queue.
    pub fn register(&self, id: SessionId) -> (CancellationToken, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(SEND_QUEUE_CAPACITY);
        let cancel = CancellationToken::new();
        self.peers.lock().insert(
            id,
            Peer {
                username: String::new(),
                state: SessionState::Login,
                moderator: false,
                silenced: false,
                tx,
                cancel: cancel.clone(),
            },
        );
        (cancel, rx)
    }

    /// Removes a connection, cancelling its token and dropping its queue
    /// sender so the writer task drains and exits. Returns `None` when the
    /// peer is already gone, making removal idempotent.
    pub fn remove(&self, id: SessionId) -> Option<PeerInfo> {
        let peer = self.peers.lock().remove(&id)?;
        peer.cancel.cancel();
        Some(PeerInfo {
            id,
            username: peer.username,
            state: peer.state,
            moderator: peer.moderator,
            silenced: peer.silenced,
        })
    }

    pub fn info(&self, id: SessionId) -> Option<PeerInfo> {
        let peers = self.peers.lock();
        let peer = peers.get(&id)?;
        Some(PeerInfo {
            id,
            username: peer.username.clone(),
            state: peer.state,
            moderator: peer.moderator,
            silenced: peer.silenced,
        })
    }

    /// Looks up an authenticated peer by display name, case-insensitively.
    pub fn find(&self, username: &str) -> Option<PeerInfo> {
        let peers = self.peers.lock();
        peers
            .iter()
            .find(|(_, p)| p.is_authenticated() && p.username.eq_ignore_ascii_case(username))
            .map(|(&id, p)| PeerInfo {
                id,
                username: p.username.clone(),
                state: p.state,
                moderator: p.moderator,
                silenced: p.silenced,
            })
    }

    /// Atomically claims `username` for a freshly authenticated peer and
    /// moves it to `Chatting`. Fails when any other peer already holds the
    /// name under case-insensitive comparison, keeping at most one session
    /// per case-folded username.
    pub fn claim_username(&self, id: SessionId, username: &str) -> bool {
        let mut peers = self.peers.lock();
        let taken = peers
            .iter()
            .any(|(&pid, p)| pid != id && p.username.eq_ignore_ascii_case(username));
        if taken {
            return false;
        }
        let Some(peer) = peers.get_mut(&id) else {
            return false;
        };
        peer.username = username.to_string();
        peer.state = SessionState::Chatting;
        true
    }

    /// Renames an authenticated peer under the same uniqueness rule as
    /// [`Registry::claim_username`]. A case-only change of the peer's own
    /// name is allowed.
    pub fn rename(&self, id: SessionId, new_name: &str) -> bool {
        let mut peers = self.peers.lock();
        let taken = peers
            .iter()
            .any(|(&pid, p)| pid != id && p.username.eq_ignore_ascii_case(new_name));
        if taken {
            return false;
        }
        let Some(peer) = peers.get_mut(&id) else {
            return false;
        };
        peer.username = new_name.to_string();
        true
    }

    pub fn set_state(&self, id: SessionId, state: SessionState) {
        if let Some(peer) = self.peers.lock().get_mut(&id) {
            peer.state = state;
        }
    }

    /// Flips the moderator flag on the named session. The flag lives only
    /// here; it is not persisted.
    pub fn toggle_moderator(&self, username: &str) -> Option<(PeerInfo, bool)> {
        let mut peers = self.peers.lock();
        let (&id, peer) = peers
            .iter_mut()
            .find(|(_, p)| p.is_authenticated() && p.username.eq_ignore_ascii_case(username))?;
        peer.moderator = !peer.moderator;
        let now = peer.moderator;
        Some((
            PeerInfo {
                id,
                username: peer.username.clone(),
                state: peer.state,
                moderator: now,
                silenced: peer.silenced,
            },
            now,
        ))
    }

    /// Display names of current moderators.
    pub fn moderators(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .peers
            .lock()
            .values()
            .filter(|p| p.moderator)
            .map(|p| p.username.clone())
            .collect();
        names.sort_by(|a, b| a.to_ascii_lowercase().cmp(&b.to_ascii_lowercase()));
        names
    }

    /// Display names of all authenticated peers, sorted for stable output.
    pub fn online_users(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .peers
            .lock()
            .values()
            .filter(|p| p.is_authenticated())
            .map(|p| p.username.clone())
            .collect();
        names.sort_by(|a, b| a.to_ascii_lowercase().cmp(&b.to_ascii_lowercase()));
        names
    }

    /// Enqueues one line for one peer without blocking. Returns `false`
    /// when the peer is gone or its queue is full; the caller is expected
    /// to reap it.
    pub fn try_send(&self, id: SessionId, message: impl Into<String>) -> bool {
        let peers = self.peers.lock();
        match peers.get(&id) {
            Some(peer) => peer.tx.try_send(message.into()).is_ok(),
            None => false,
        }
    }

    /// Sends a line to every authenticated peer except `exclude`, snapshot
    /// taken under the lock. Delivery is at-most-once per peer per call;
    /// per-recipient ordering is FIFO because each peer's queue is drained
    /// by a single writer. Returns the peers whose send failed, for the
    /// caller to reap after the loop.
    pub fn broadcast(&self, message: &str, exclude: Option<SessionId>) -> Vec<SessionId> {
        let peers = self.peers.lock();
        let mut failed = Vec::new();
        for (&id, peer) in peers.iter() {
            if Some(id) == exclude || !peer.is_authenticated() {
                continue;
            }
            if peer.tx.try_send(message.to_string()).is_err() {
                failed.push(id);
            }
        }
        failed
    }

    /// Marks a peer whose departure has already been announced to the room
    /// (kick); teardown then skips the generic leave broadcast.
    pub fn silence(&self, id: SessionId) {
        if let Some(peer) = self.peers.lock().get_mut(&id) {
            peer.silenced = true;
        }
    }

    /// Cancels one session's receive loop.
    pub fn cancel(&self, id: SessionId) {
        if let Some(peer) = self.peers.lock().get(&id) {
            peer.cancel.cancel();
        }
    }

    /// Cancels every session; used at shutdown.
    pub fn close_all(&self) {
        for peer in self.peers.lock().values() {
            peer.cancel.cancel();
        }
    }

    pub fn len(&self) -> usize {
        self.peers.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_claim_and_find() {
        let registry = Registry::new();
        let (_cancel, _rx) = registry.register(1);

        assert!(registry.find("Alice").is_none());
        assert!(registry.claim_username(1, "Alice"));

        let info = registry.find("alice").unwrap();
        assert_eq!(info.id, 1);
        assert_eq!(info.username, "Alice");
        assert_eq!(info.state, SessionState::Chatting);
    }

    #[test]
    fn test_claim_is_case_insensitive_exclusive() {
        let registry = Registry::new();
        let (_c1, _r1) = registry.register(1);
        let (_c2, _r2) = registry.register(2);

        assert!(registry.claim_username(1, "Alice"));
        assert!(!registry.claim_username(2, "ALICE"));
        assert!(registry.claim_username(2, "bob"));
    }

    #[test]
    fn test_rename_allows_case_only_change() {
        let registry = Registry::new();
        let (_c1, _r1) = registry.register(1);
        let (_c2, _r2) = registry.register(2);
        assert!(registry.claim_username(1, "alice"));
        assert!(registry.claim_username(2, "bob"));

        assert!(registry.rename(1, "Alice"));
        assert!(!registry.rename(2, "ALICE"));
        assert_eq!(registry.find("alice").unwrap().username, "Alice");
    }

    #[test]
    fn test_remove_is_idempotent_and_cancels() {
        let registry = Registry::new();
        let (cancel, _rx) = registry.register(1);
        assert!(registry.claim_username(1, "Alice"));

        let info = registry.remove(1).unwrap();
        assert_eq!(info.username, "Alice");
        assert!(cancel.is_cancelled());
        assert!(registry.remove(1).is_none());
    }

    #[test]
    fn test_broadcast_skips_login_and_exclude() {
        let registry = Registry::new();
        let (_c1, mut r1) = registry.register(1);
        let (_c2, mut r2) = registry.register(2);
        let (_c3, mut r3) = registry.register(3);
        assert!(registry.claim_username(1, "Alice"));
        assert!(registry.claim_username(2, "bob"));
        // Peer 3 stays in Login.

        let failed = registry.broadcast("hello", Some(2));
        assert!(failed.is_empty());
        assert_eq!(r1.try_recv().unwrap(), "hello");
        assert!(r2.try_recv().is_err());
        assert!(r3.try_recv().is_err());
    }

    #[test]
    fn test_broadcast_reports_full_queues() {
        let registry = Registry::new();
        let (_c1, _r1) = registry.register(1);
        assert!(registry.claim_username(1, "Alice"));

        for _ in 0..SEND_QUEUE_CAPACITY {
            assert!(registry.try_send(1, "fill"));
        }
        let failed = registry.broadcast("overflow", None);
        assert_eq!(failed, vec![1]);
    }

    #[test]
    fn test_silence_survives_removal() {
        let registry = Registry::new();
        let (_cancel, _rx) = registry.register(1);
        assert!(registry.claim_username(1, "Alice"));
        assert!(!registry.info(1).unwrap().silenced);

        registry.silence(1);
        assert!(registry.remove(1).unwrap().silenced);
    }

    #[test]
    fn test_toggle_moderator() {
        let registry = Registry::new();
        let (_c1, _r1) = registry.register(1);
        assert!(registry.claim_username(1, "Alice"));

        let (_, now) = registry.toggle_moderator("alice").unwrap();
        assert!(now);
        assert_eq!(registry.moderators(), vec!["Alice".to_string()]);

        let (_, now) = registry.toggle_moderator("Alice").unwrap();
        assert!(!now);
        assert!(registry.moderators().is_empty());
        assert!(registry.toggle_moderator("ghost").is_none());
    }
}
