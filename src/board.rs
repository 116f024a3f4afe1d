//! Pure 3x3 Tic-Tac-Toe rules engine.
//!
//! The board knows nothing about players, turns, or the wire protocol; it
//! only answers "may this tile go here" and "how does this position stand".
//! Cell indices are row-major:
//!
//! ```text
//!  0 | 1 | 2
//! ---+---+---
//!  3 | 4 | 5
//! ---+---+---
//!  6 | 7 | 8
//! ```

use std::fmt;

/// A single cell value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tile {
    Blank,
    Cross,
    Naught,
}

impl Tile {
    /// Character used in the 9-char board serialization.
    pub fn as_char(self) -> char {
        match self {
            Tile::Blank => '_',
            Tile::Cross => 'x',
            Tile::Naught => 'o',
        }
    }

    /// Inverse of [`Tile::as_char`].
    pub fn from_char(c: char) -> Option<Tile> {
        match c {
            '_' => Some(Tile::Blank),
            'x' => Some(Tile::Cross),
            'o' => Some(Tile::Naught),
            _ => None,
        }
    }

    /// Uppercase mark used on the wire (`!settile <i> <X|O>`).
    ///
    /// A blank renders as `_`, though blanks are never sent in practice.
    pub fn mark(self) -> char {
        match self {
            Tile::Blank => '_',
            Tile::Cross => 'X',
            Tile::Naught => 'O',
        }
    }

    /// Parses a wire mark, accepting either casing.
    pub fn from_mark(s: &str) -> Option<Tile> {
        match s {
            "X" | "x" => Some(Tile::Cross),
            "O" | "o" => Some(Tile::Naught),
            _ => None,
        }
    }
}

/// Evaluation of a board position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// At least one blank cell remains and no line is complete.
    Playing,
    CrossWins,
    NaughtWins,
    /// No blanks remain and no line is complete.
    Draw,
}

/// The eight winning lines: three rows, three columns, two diagonals.
const LINES: [[usize; 3]; 8] = [
    [0, 1, 2],
    [3, 4, 5],
    [6, 7, 8],
    [0, 3, 6],
    [1, 4, 7],
    [2, 5, 8],
    [0, 4, 8],
    [2, 4, 6],
];

/// A 3x3 board. Serialization order is row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    cells: [Tile; 9],
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl Board {
    /// Creates an all-blank board.
    pub fn new() -> Self {
        Self {
            cells: [Tile::Blank; 9],
        }
    }

    /// Places `tile` at `index`. Returns `false` when the index is out of
    /// range, the tile is blank, or the cell is already occupied; the board
    /// is left untouched in all three cases.
    pub fn place(&mut self, index: usize, tile: Tile) -> bool {
        if index > 8 || tile == Tile::Blank || self.cells[index] != Tile::Blank {
            return false;
        }
        self.cells[index] = tile;
        true
    }

    /// Returns the tile at `index`, or `None` when out of range.
    pub fn get(&self, index: usize) -> Option<Tile> {
        self.cells.get(index).copied()
    }

    /// Clears every cell back to blank.
    pub fn reset(&mut self) {
        self.cells = [Tile::Blank; 9];
    }

    /// Evaluates the position: a completed line first, then draw, then
    /// still-playing.
    pub fn outcome(&self) -> Outcome {
        for line in LINES {
            let [a, b, c] = line.map(|i| self.cells[i]);
            if a != Tile::Blank && a == b && b == c {
                return match a {
                    Tile::Cross => Outcome::CrossWins,
                    Tile::Naught => Outcome::NaughtWins,
                    Tile::Blank => unreachable!(),
                };
            }
        }
        if self.cells.contains(&Tile::Blank) {
            Outcome::Playing
        } else {
            Outcome::Draw
        }
    }

    /// Parses a 9-char `{x,o,_}` string. Inputs of any other length or with
    /// unknown characters yield `None`.
    pub fn parse(s: &str) -> Option<Board> {
        if s.chars().count() != 9 {
            return None;
        }
        let mut cells = [Tile::Blank; 9];
        for (i, c) in s.chars().enumerate() {
            cells[i] = Tile::from_char(c)?;
        }
        Some(Board { cells })
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for tile in self.cells {
            write!(f, "{}", tile.as_char())?;
        }
        Ok(())
    }
}
