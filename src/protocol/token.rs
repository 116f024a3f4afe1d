//! Server-to-client control tokens.
//!
//! Control tokens are server-originated `!` lines that drive client UI state
//! rather than being printed as chat. This module is the single canonical
//! mapping between token values and their wire form; the server renders
//! through [`std::fmt::Display`] and clients parse through
//! [`ControlToken::parse`].

use std::fmt;

use crate::board::Tile;

/// A control token as it appears on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlToken {
    /// The recipient took slot 1 and plays cross.
    Player1,
    /// The recipient took slot 2 and plays naught.
    Player2,
    /// A tile was placed; all clients mirror it onto their board.
    SetTile { index: usize, tile: Tile },
    /// It is the recipient's turn to move.
    YourTurn,
    /// The opponent is moving.
    WaitTurn,
    /// Clear the board display.
    ResetBoard,
    /// The recipient is no longer in the match.
    LeaveGame,
}

impl ControlToken {
    /// Parses a server line into a token, or `None` when the line is
    /// ordinary text. The inverse of the `Display` rendering.
    pub fn parse(line: &str) -> Option<ControlToken> {
        match line {
            "!player1" => return Some(ControlToken::Player1),
            "!player2" => return Some(ControlToken::Player2),
            "!yourturn" => return Some(ControlToken::YourTurn),
            "!waitturn" => return Some(ControlToken::WaitTurn),
            "!resetboard" => return Some(ControlToken::ResetBoard),
            "!leavegame" => return Some(ControlToken::LeaveGame),
            _ => {}
        }

        let rest = line.strip_prefix("!settile ")?;
        let (index, mark) = rest.split_once(' ')?;
        let index = index.parse::<usize>().ok().filter(|&i| i <= 8)?;
        let tile = Tile::from_mark(mark)?;
        Some(ControlToken::SetTile { index, tile })
    }
}

impl fmt::Display for ControlToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlToken::Player1 => write!(f, "!player1"),
            ControlToken::Player2 => write!(f, "!player2"),
            ControlToken::SetTile { index, tile } => {
                write!(f, "!settile {} {}", index, tile.mark())
            }
            ControlToken::YourTurn => write!(f, "!yourturn"),
            ControlToken::WaitTurn => write!(f, "!waitturn"),
            ControlToken::ResetBoard => write!(f, "!resetboard"),
            ControlToken::LeaveGame => write!(f, "!leavegame"),
        }
    }
}
