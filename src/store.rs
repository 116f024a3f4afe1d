//! Persistent stores backed by a single SQLite database.
//!
//! Two stores share one connection pool:
//!
//! ```text
//! +-----------+     +------------+
//! | UserStore |     | MatchStore |
//! | (users)   |     | (3 keys)   |
//! +-----+-----+     +-----+------+
//!       |                 |
//!       +-----> pool <----+
//!              (SQLite)
//! ```
//!
//! - **UserStore**: the `users` table — credentials, display casing, and
//!   win/loss/draw counters
//! - **MatchStore**: the `match_state` key/value table holding the single
//!   match's `Player1`/`Player2`/`CurrentTurn` slots
//!
//! All operations are single statements, atomic per call; the pool
//! serialises access, so no higher-level lock is needed.

pub mod error;
pub mod match_state;
pub mod users;

use std::path::Path;

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

pub use error::{LoginError, RegisterError, RenameError, StoreError, UsernameError};
pub use match_state::{MatchStore, StoredMatch};
pub use users::{Record, ScoreRow, UserStore, validate_username};

/// Opens (creating if missing) the SQLite database at `path`.
pub async fn connect(path: &Path) -> Result<SqlitePool, StoreError> {
    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true);
    SqlitePoolOptions::new()
        .max_connections(4)
        .connect_with(options)
        .await
        .map_err(StoreError::Unavailable)
}

/// Opens a private in-memory database. Capped to one connection because
/// every in-memory connection would otherwise see its own empty database.
pub async fn connect_in_memory() -> Result<SqlitePool, StoreError> {
    SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .map_err(StoreError::Unavailable)
}
