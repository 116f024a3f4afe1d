use std::sync::Arc;

use futures_util::StreamExt;
use futures_util::stream::SplitStream;
use tokio::net::TcpStream;
use tokio_util::codec::Framed;
use tokio_util::sync::CancellationToken;

use crate::protocol::command::{self, Input};
use crate::protocol::{LineCodec, ProtocolError};
use crate::server::error::SessionError;
use crate::server::registry::{PeerInfo, SessionId, SessionState};
use crate::server::state::{AppState, DB_ERROR_REPLY};
use crate::store::{self, LoginError, RegisterError};

/// One client connection's receive loop and command dispatcher.
///
/// The session owns only the read half of the framed transport; writes go
/// through the peer's registry queue, drained by a separate writer task.
/// Mutable session facts (username, state, moderator flag) live in the
/// registry entry so other tasks (kick, dropout recovery, the console) can
/// act on them under the registry lock.
pub struct Session {
    id: SessionId,
    lines: SplitStream<Framed<TcpStream, LineCodec>>,
    state: Arc<AppState>,
}

impl Session {
    pub fn new(
        id: SessionId,
        lines: SplitStream<Framed<TcpStream, LineCodec>>,
        state: Arc<AppState>,
    ) -> Self {
        Self { id, lines, state }
    }

    /// Reads and dispatches lines until the peer closes, the session is
    /// cancelled (kick, console, shutdown), or the transport fails. The
    /// caller runs the idempotent teardown afterwards in every case.
    pub async fn run(&mut self, cancel: CancellationToken) -> Result<(), SessionError> {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => return Ok(()),
                frame = self.lines.next() => match frame {
                    None => return Ok(()),
                    Some(Ok(line)) => {
                        if !self.dispatch(&line).await {
                            return Ok(());
                        }
                    }
                    Some(Err(ProtocolError::LineTooLong)) => {
                        self.reply("[Server]: Line too long.");
                    }
                    Some(Err(ProtocolError::InvalidUtf8)) => {
                        self.reply("[Server]: Messages must be valid UTF-8.");
                    }
                    Some(Err(e)) => return Err(e.into()),
                },
            }
        }
    }

    fn reply(&self, message: impl Into<String>) {
        self.state.reply(self.id, message);
    }

    /// Routes one line by session state. Returns `false` when the session
    /// should close.
    async fn dispatch(&self, line: &str) -> bool {
        if line.is_empty() {
            self.reply("Empty command ignored.");
            return true;
        }
        // The peer may have been reaped concurrently (kick, quarantine).
        let Some(me) = self.state.registry().info(self.id) else {
            return false;
        };
        match me.state {
            SessionState::Login => self.dispatch_login(line).await,
            SessionState::Chatting => self.dispatch_chatting(&me, line).await,
            SessionState::Playing => self.dispatch_playing(&me, line).await,
        }
    }

    async fn dispatch_login(&self, line: &str) -> bool {
        if let Input::Command { verb, args } = command::parse(line) {
            match verb.as_str() {
                "login" => {
                    self.handle_login(args).await;
                    return true;
                }
                "register" => {
                    self.handle_register(args).await;
                    return true;
                }
                "exit" => return false,
                _ => {}
            }
        }
        self.reply("Please login or register first...");
        true
    }

    async fn dispatch_chatting(&self, me: &PeerInfo, line: &str) -> bool {
        let state = &self.state;
        match command::parse(line) {
            Input::Chat(text) => state.handle_chat(me, text).await,
            Input::Command { verb, args } => match verb.as_str() {
                "user" => state.handle_rename(me, args).await,
                "who" => state.handle_who(me).await,
                "commands" => state.handle_commands(me).await,
                "about" => state.handle_about(me).await,
                "whisper" => state.handle_whisper(me, args).await,
                "roll" => state.handle_roll(me, args).await,
                "kick" => state.handle_kick(me, args).await,
                "join" => state.handle_join(me).await,
                "scores" => state.handle_scores(me).await,
                "exit" => return false,
                // Unrecognized commands are ordinary chat.
                _ => state.handle_chat(me, line).await,
            },
        }
        true
    }

    async fn dispatch_playing(&self, me: &PeerInfo, line: &str) -> bool {
        let state = &self.state;
        match command::parse(line) {
            Input::Chat(text) => state.handle_chat(me, text).await,
            Input::Command { verb, args } => match verb.as_str() {
                "whisper" => state.handle_whisper(me, args).await,
                "startgame" => state.handle_start(me).await,
                "move" => state.handle_move(me, args).await,
                "exit" => return false,
                _ => self.reply("[Server]: That command is not available during a game."),
            },
        }
        true
    }

    async fn handle_login(&self, args: &str) {
        let Some((username, password)) = command::parse_credentials(args) else {
            self.reply("[Server]: Usage: !login <username> <password>");
            return;
        };
        if self.state.registry().find(username).is_some() {
            self.reply("[Server]: That user is already logged in.");
            return;
        }
        match self.state.users().try_login(username, password).await {
            Ok(display) => {
                if !self.state.registry().claim_username(self.id, &display) {
                    self.reply("[Server]: That user is already logged in.");
                    return;
                }
                self.reply(format!("Login successful! Welcome back {}", display));
                let line = format!("[Server]: {} joined the chat.", display);
                let failed = self.state.registry().broadcast(&line, Some(self.id));
                self.state.reap(failed).await;
            }
            Err(LoginError::UserNotFound) => self.reply("[Server]: Unknown username."),
            Err(LoginError::WrongPassword) => self.reply("[Server]: Incorrect password."),
            Err(LoginError::Store(e)) => {
                tracing::error!("login failed: {}", e);
                self.reply(DB_ERROR_REPLY);
            }
        }
    }

    async fn handle_register(&self, args: &str) {
        let Some((username, password)) = command::parse_credentials(args) else {
            self.reply("[Server]: Usage: !register <username> <password>");
            return;
        };
        if let Err(reason) = store::validate_username(username) {
            self.reply(format!("[Server]: {}", reason));
            return;
        }
        match self.state.users().try_register(username, password).await {
            Ok(()) => {
                if !self.state.registry().claim_username(self.id, username) {
                    self.reply("[Server]: That user is already logged in.");
                    return;
                }
                self.reply(format!("Registration successful! Welcome {}", username));
                let line = format!("[Server]: {} joined the chat.", username);
                let failed = self.state.registry().broadcast(&line, Some(self.id));
                self.state.reap(failed).await;
            }
            Err(RegisterError::UsernameTaken) => {
                self.reply("[Server]: Username already exists.");
            }
            Err(RegisterError::Store(e)) => {
                tracing::error!("registration failed: {}", e);
                self.reply(DB_ERROR_REPLY);
            }
        }
    }
}
