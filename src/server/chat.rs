//! Chat routing: broadcast, whispers, rolls, renames, and moderation.

use rand::Rng;

use crate::protocol::command::{self, WhisperError};
use crate::server::registry::PeerInfo;
use crate::server::state::{AppState, DB_ERROR_REPLY};
use crate::store::{self, RenameError};

impl AppState {
    /// Broadcasts a chat line to the whole room, sender included.
    pub(crate) async fn handle_chat(&self, me: &PeerInfo, text: &str) {
        let line = format!("[{}]: {}", me.username, text);
        let failed = self.registry().broadcast(&line, None);
        self.reap(failed).await;
    }

    pub(crate) async fn handle_whisper(&self, me: &PeerInfo, args: &str) {
        let (target, message) = match command::parse_whisper(args) {
            Ok(parts) => parts,
            Err(WhisperError::MissingTarget) => {
                self.reply(me.id, "[Server]: Usage: !whisper <name> <message>");
                return;
            }
            Err(WhisperError::MissingClosingQuote) => {
                self.reply(me.id, "[Server]: Missing closing quote in whisper target.");
                return;
            }
            Err(WhisperError::EmptyMessage) => {
                self.reply(me.id, "[Server]: Whisper message may not be empty.");
                return;
            }
        };

        let Some(peer) = self.registry().find(target) else {
            self.reply(
                me.id,
                format!("[Server]: No user named '{}' is connected.", target),
            );
            return;
        };

        let mut failed = Vec::new();
        if !self
            .registry()
            .try_send(peer.id, format!("[Whisper from {}]: {}", me.username, message))
        {
            failed.push(peer.id);
        }
        self.reply(
            me.id,
            format!("[You whispered to {}]: {}", peer.username, message),
        );
        self.reap(failed).await;
    }

    pub(crate) async fn handle_roll(&self, me: &PeerInfo, args: &str) {
        let Some(max) = command::parse_roll(args) else {
            self.reply(
                me.id,
                "[Server]: Roll maximum must be a whole number of at least 1.",
            );
            return;
        };
        let rolled = rand::thread_rng().gen_range(1..=max);
        let line = format!("[Roll] {} rolled a {} (1 – {})", me.username, rolled, max);
        let failed = self.registry().broadcast(&line, None);
        self.reap(failed).await;
    }

    pub(crate) async fn handle_rename(&self, me: &PeerInfo, args: &str) {
        let new_name = args.trim();
        if new_name.is_empty() {
            self.reply(me.id, "[Server]: Usage: !user <new name>");
            return;
        }
        if let Err(reason) = store::validate_username(new_name) {
            self.reply(me.id, format!("[Server]: {}", reason));
            return;
        }

        // Claim against the live set first, then persist; the claim is
        // reverted if the store refuses.
        if !self.registry().rename(me.id, new_name) {
            self.reply(me.id, "[Server]: Username already exists.");
            return;
        }
        match self
            .users()
            .try_update_username(&me.username, new_name)
            .await
        {
            Ok(()) => {
                let line = format!("[{}] is now known as [{}]", me.username, new_name);
                let failed = self.registry().broadcast(&line, None);
                self.reap(failed).await;
            }
            Err(e) => {
                self.registry().rename(me.id, &me.username);
                match e {
                    RenameError::UsernameTaken => {
                        self.reply(me.id, "[Server]: Username already exists.");
                    }
                    RenameError::NotFound => {
                        self.reply(me.id, "[Server]: Your account could not be found.");
                    }
                    RenameError::Store(e) => {
                        tracing::error!("rename failed: {}", e);
                        self.reply(me.id, DB_ERROR_REPLY);
                    }
                }
            }
        }
    }

    pub(crate) async fn handle_who(&self, me: &PeerInfo) {
        let names = self.registry().online_users();
        self.reply(
            me.id,
            format!(
                "[Server]: Connected users ({}): {}",
                names.len(),
                names.join(", ")
            ),
        );
    }

    pub(crate) async fn handle_scores(&self, me: &PeerInfo) {
        let scores = match self.users().all_scores().await {
            Ok(scores) => scores,
            Err(e) => {
                tracing::error!("leaderboard query failed: {}", e);
                self.reply(me.id, DB_ERROR_REPLY);
                return;
            }
        };
        if scores.is_empty() {
            self.reply(me.id, "[Server]: No scores recorded yet.");
            return;
        }
        self.reply(me.id, "[Scores]");
        for row in scores {
            self.reply(
                me.id,
                format!(
                    "{}: {}W {}L {}D",
                    row.username, row.wins, row.losses, row.draws
                ),
            );
        }
    }

    pub(crate) async fn handle_commands(&self, me: &PeerInfo) {
        const HELP: [&str; 11] = [
            "[Server]: Available commands:",
            "  !user <name>              change your username",
            "  !who                      list connected users",
            "  !whisper <name> <msg>     send a private message",
            "  !roll [max]               roll a die (default 6)",
            "  !join                     take a seat in the Tic-Tac-Toe match",
            "  !startgame                start the match (player 1 only)",
            "  !move <0-8>               place your mark",
            "  !scores                   show the leaderboard",
            "  !about                    about this server",
            "  !exit                     disconnect",
        ];
        for line in HELP {
            self.reply(me.id, line);
        }
    }

    pub(crate) async fn handle_about(&self, me: &PeerInfo) {
        self.reply(
            me.id,
            format!(
                "[Server]: crosstalk {} - a chat server with a built-in Tic-Tac-Toe match.",
                env!("CARGO_PKG_VERSION")
            ),
        );
    }

    /// Moderator kick. Self-kick and mod-on-mod are refused; the target is
    /// told who kicked them, then disconnected, then the room is told.
    pub(crate) async fn handle_kick(&self, me: &PeerInfo, args: &str) {
        if !me.moderator {
            self.reply(me.id, "[Server]: You are not a moderator.");
            return;
        }
        let target = args.trim();
        if target.is_empty() {
            self.reply(me.id, "[Server]: Usage: !kick <name>");
            return;
        }
        let Some(peer) = self.registry().find(target) else {
            self.reply(
                me.id,
                format!("[Server]: No user named '{}' is connected.", target),
            );
            return;
        };
        if peer.id == me.id {
            self.reply(me.id, "[Server]: You cannot kick yourself.");
            return;
        }
        if peer.moderator {
            self.reply(me.id, "[Server]: You cannot kick another moderator.");
            return;
        }

        self.registry()
            .try_send(peer.id, format!("You were kicked by {}.", me.username));
        // The kick broadcast below is the only departure announcement.
        self.registry().silence(peer.id);
        self.registry().cancel(peer.id);
        let line = format!("[Server]: {} was kicked by {}.", peer.username, me.username);
        let failed = self.registry().broadcast(&line, Some(peer.id));
        self.reap(failed).await;
    }
}
