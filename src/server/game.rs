//! Game coordination: seating, turn order, move validation, result
//! recording, and dropout recovery for the single server-wide match.

use crate::board::{Outcome, Tile};
use crate::protocol::ControlToken;
use crate::server::registry::{PeerInfo, SessionId, SessionState};
use crate::server::state::{AppState, DB_ERROR_REPLY};

/// Which seat a joining player received.
enum JoinDecision {
    Seated(Seat),
    AlreadySeated,
    Full,
}

#[derive(Clone, Copy)]
enum Seat {
    One,
    Two,
}

enum StartDecision {
    NotPlayerOne,
    NoOpponent,
    AlreadyStarted,
    Start { opponent: String },
}

enum MoveDecision {
    Rejected(&'static str),
    Placed {
        index: usize,
        tile: Tile,
        after: AfterMove,
    },
}

enum AfterMove {
    /// The game continues; the turn passed to this player.
    Turn(Option<String>),
    /// The position is terminal.
    Finished(Finished),
}

struct Finished {
    outcome: Outcome,
    player1: String,
    player2: String,
}

impl AppState {
    /// `!join`: fills the first empty slot and moves the session to
    /// `Playing`. Slot 1 plays cross, slot 2 plays naught.
    pub(crate) async fn handle_join(&self, me: &PeerInfo) {
        let decision = {
            let mut m = self.current.lock();
            if m.player1.as_deref() == Some(me.username.as_str())
                || m.player2.as_deref() == Some(me.username.as_str())
            {
                JoinDecision::AlreadySeated
            } else if m.player1.is_none() {
                m.player1 = Some(me.username.clone());
                JoinDecision::Seated(Seat::One)
            } else if m.player2.is_none() {
                m.player2 = Some(me.username.clone());
                JoinDecision::Seated(Seat::Two)
            } else {
                JoinDecision::Full
            }
        };

        let seat = match decision {
            JoinDecision::AlreadySeated => {
                self.reply(me.id, "[Server]: You are already in the game.");
                return;
            }
            JoinDecision::Full => {
                self.reply(me.id, "[Server]: The game is full.");
                return;
            }
            JoinDecision::Seated(seat) => seat,
        };

        let persisted = match seat {
            Seat::One => self.match_store().set_player1(Some(&me.username)).await,
            Seat::Two => self.match_store().set_player2(Some(&me.username)).await,
        };
        if let Err(e) = persisted {
            tracing::error!("failed to persist seat: {}", e);
            let mut m = self.current.lock();
            match seat {
                Seat::One => m.player1 = None,
                Seat::Two => m.player2 = None,
            }
            self.reply(me.id, DB_ERROR_REPLY);
            return;
        }

        self.registry().set_state(me.id, SessionState::Playing);
        let (token, mark) = match seat {
            Seat::One => (ControlToken::Player1, 'X'),
            Seat::Two => (ControlToken::Player2, 'O'),
        };
        self.reply(me.id, token.to_string());
        let line = format!(
            "[Server]: {} joined the Tic-Tac-Toe game as {}.",
            me.username, mark
        );
        let failed = self.registry().broadcast(&line, Some(me.id));
        self.reap(failed).await;
    }

    /// `!startgame`: only player 1 may start, both seats must be filled,
    /// and the match must not already be running. Player 1 moves first.
    pub(crate) async fn handle_start(&self, me: &PeerInfo) {
        let decision = {
            let mut m = self.current.lock();
            if m.player1.as_deref() != Some(me.username.as_str()) {
                StartDecision::NotPlayerOne
            } else {
                match (m.player2.clone(), m.current_turn.is_some()) {
                    (None, _) => StartDecision::NoOpponent,
                    (Some(_), true) => StartDecision::AlreadyStarted,
                    (Some(opponent), false) => {
                        m.current_turn = Some(me.username.clone());
                        StartDecision::Start { opponent }
                    }
                }
            }
        };

        let opponent = match decision {
            StartDecision::NotPlayerOne => {
                self.reply(me.id, "[Server]: Only player 1 may start the game.");
                return;
            }
            StartDecision::NoOpponent => {
                self.reply(me.id, "[Server]: Waiting for a second player to join.");
                return;
            }
            StartDecision::AlreadyStarted => {
                self.reply(me.id, "[Server]: The game has already started.");
                return;
            }
            StartDecision::Start { opponent } => opponent,
        };

        if let Err(e) = self.match_store().set_current_turn(Some(&me.username)).await {
            tracing::error!("failed to persist turn: {}", e);
            self.current.lock().current_turn = None;
            self.reply(me.id, DB_ERROR_REPLY);
            return;
        }

        self.reply(me.id, ControlToken::YourTurn.to_string());
        let mut failed = Vec::new();
        if let Some(peer) = self.registry().find(&opponent) {
            if !self
                .registry()
                .try_send(peer.id, ControlToken::WaitTurn.to_string())
            {
                failed.push(peer.id);
            }
        }
        failed.extend(
            self.registry()
                .broadcast("[Server]: Game has started.", None),
        );
        self.reap(failed).await;
    }

    /// `!move <i>`: validation order is turn, then index, then cell. A
    /// legal placement is broadcast as `!settile`, then the position is
    /// evaluated.
    pub(crate) async fn handle_move(&self, me: &PeerInfo, args: &str) {
        let decision = {
            let mut m = self.current.lock();
            match m.current_turn.as_deref() {
                None => MoveDecision::Rejected("[Server]: The game has not started yet."),
                Some(turn) if turn != me.username => {
                    MoveDecision::Rejected("[Server]: Not your turn.")
                }
                Some(_) => match args.trim().parse::<usize>() {
                    Err(_) => {
                        MoveDecision::Rejected("[Server]: Move must be a number from 0 to 8.")
                    }
                    Ok(index) if index > 8 => {
                        MoveDecision::Rejected("[Server]: Move must be a number from 0 to 8.")
                    }
                    Ok(index) => {
                        let tile = if m.player1.as_deref() == Some(me.username.as_str()) {
                            Tile::Cross
                        } else {
                            Tile::Naught
                        };
                        if !m.board.place(index, tile) {
                            MoveDecision::Rejected("[Server]: That tile is already taken.")
                        } else {
                            let after = match m.board.outcome() {
                                Outcome::Playing => {
                                    let next = if tile == Tile::Cross {
                                        m.player2.clone()
                                    } else {
                                        m.player1.clone()
                                    };
                                    m.current_turn = next.clone();
                                    AfterMove::Turn(next)
                                }
                                outcome => {
                                    tracing::debug!(board = %m.board, "match finished");
                                    let finished = Finished {
                                        outcome,
                                        player1: m.player1.clone().unwrap_or_default(),
                                        player2: m.player2.clone().unwrap_or_default(),
                                    };
                                    m.player1 = None;
                                    m.player2 = None;
                                    m.current_turn = None;
                                    m.board.reset();
                                    AfterMove::Finished(finished)
                                }
                            };
                            MoveDecision::Placed { index, tile, after }
                        }
                    }
                },
            }
        };

        let (index, tile, after) = match decision {
            MoveDecision::Rejected(msg) => {
                self.reply(me.id, msg);
                return;
            }
            MoveDecision::Placed { index, tile, after } => (index, tile, after),
        };

        let settile = ControlToken::SetTile { index, tile }.to_string();
        let mut failed = self.registry().broadcast(&settile, None);

        match after {
            AfterMove::Turn(next) => {
                if let Err(e) = self.match_store().set_current_turn(next.as_deref()).await {
                    tracing::error!("failed to persist turn: {}", e);
                    self.reply(me.id, DB_ERROR_REPLY);
                }
                if let Some(peer) = next.as_deref().and_then(|n| self.registry().find(n)) {
                    if !self
                        .registry()
                        .try_send(peer.id, ControlToken::YourTurn.to_string())
                    {
                        failed.push(peer.id);
                    }
                }
                if !self
                    .registry()
                    .try_send(me.id, ControlToken::WaitTurn.to_string())
                {
                    failed.push(me.id);
                }
                self.reap(failed).await;
            }
            AfterMove::Finished(finished) => {
                failed.extend(self.finish_game(finished).await);
                self.reap(failed).await;
            }
        }
    }

    /// End-of-game fanout. Records the result, then every recipient
    /// observes `[Game Over]` before `!resetboard`, and each participant
    /// sees their private `[Result]` line strictly after that, followed by
    /// `!leavegame`.
    async fn finish_game(&self, finished: Finished) -> Vec<SessionId> {
        let Finished {
            outcome,
            player1,
            player2,
        } = finished;

        if let Err(e) = self.match_store().clear().await {
            tracing::error!("failed to clear the stored match: {}", e);
        }

        let recorded = match outcome {
            Outcome::CrossWins => {
                let wins = self.users().increment_wins(&player1).await;
                let losses = self.users().increment_losses(&player2).await;
                wins.and(losses)
            }
            Outcome::NaughtWins => {
                let wins = self.users().increment_wins(&player2).await;
                let losses = self.users().increment_losses(&player1).await;
                wins.and(losses)
            }
            Outcome::Draw => {
                let first = self.users().increment_draws(&player1).await;
                let second = self.users().increment_draws(&player2).await;
                first.and(second)
            }
            Outcome::Playing => unreachable!("finish_game is only called on terminal positions"),
        };
        if let Err(e) = recorded {
            tracing::error!("failed to record the result: {}", e);
        }

        let message = match outcome {
            Outcome::CrossWins => "X wins!",
            Outcome::NaughtWins => "O wins!",
            Outcome::Draw => "It's a draw!",
            Outcome::Playing => unreachable!(),
        };
        let mut failed = self
            .registry()
            .broadcast(&format!("[Game Over]: {}", message), None);
        failed.extend(
            self.registry()
                .broadcast(&ControlToken::ResetBoard.to_string(), None),
        );

        for username in [&player1, &player2] {
            let Some(peer) = self.registry().find(username) else {
                continue;
            };
            self.registry().set_state(peer.id, SessionState::Chatting);
            match self.users().stats(username).await {
                Ok(Some(record)) => {
                    if !self.registry().try_send(
                        peer.id,
                        format!(
                            "[Result] Wins: {}, Losses: {}, Draws: {}",
                            record.wins, record.losses, record.draws
                        ),
                    ) {
                        failed.push(peer.id);
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::error!("failed to read stats for {}: {}", username, e);
                }
            }
            if !self
                .registry()
                .try_send(peer.id, ControlToken::LeaveGame.to_string())
            {
                failed.push(peer.id);
            }
        }
        failed
    }

    /// Dropout recovery: a `Playing` session ended, so any slot it held is
    /// cleared and the whole match resets. No forfeit is recorded. Returns
    /// peers whose notification failed, for the caller's quarantine.
    pub(crate) async fn handle_dropout(&self, username: &str) -> Vec<SessionId> {
        let remaining = {
            let mut m = self.current.lock();
            let seated = m.player1.as_deref() == Some(username)
                || m.player2.as_deref() == Some(username);
            if !seated {
                return Vec::new();
            }
            tracing::debug!(board = %m.board, "match abandoned");
            let remaining = if m.player1.as_deref() == Some(username) {
                m.player2.take()
            } else {
                m.player1.take()
            };
            m.player1 = None;
            m.player2 = None;
            m.current_turn = None;
            m.board.reset();
            remaining
        };

        if let Err(e) = self.match_store().clear().await {
            tracing::error!("failed to clear the stored match: {}", e);
        }

        let line = format!("[Server]: {} left the Tic-Tac-Toe game.", username);
        let mut failed = self.registry().broadcast(&line, None);
        failed.extend(
            self.registry()
                .broadcast(&ControlToken::ResetBoard.to_string(), None),
        );

        if let Some(other) = remaining {
            if let Some(peer) = self.registry().find(&other) {
                self.registry().set_state(peer.id, SessionState::Chatting);
                if !self
                    .registry()
                    .try_send(peer.id, ControlToken::LeaveGame.to_string())
                {
                    failed.push(peer.id);
                }
            }
        }
        failed
    }
}
