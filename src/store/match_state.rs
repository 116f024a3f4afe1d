use sqlx::SqlitePool;

use crate::store::error::StoreError;

const KEY_PLAYER1: &str = "Player1";
const KEY_PLAYER2: &str = "Player2";
const KEY_CURRENT_TURN: &str = "CurrentTurn";

/// The persisted view of the single server-wide match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoredMatch {
    pub player1: Option<String>,
    pub player2: Option<String>,
    pub current_turn: Option<String>,
}

/// Persistent key/value slots for the single match.
///
/// Exactly three well-known keys are stored: `Player1`, `Player2`, and
/// `CurrentTurn`. Values are usernames or null; writes are upserts. The
/// live board is mirrored in memory by the game coordinator and is not
/// persisted here.
#[derive(Clone)]
pub struct MatchStore {
    pool: SqlitePool,
}

impl MatchStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Creates the key/value table when missing.
    pub async fn initialize(&self) -> Result<(), StoreError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS match_state (
                key TEXT PRIMARY KEY,
                value TEXT
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(StoreError::Unavailable)?;
        Ok(())
    }

    async fn set(&self, key: &str, value: Option<&str>) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO match_state (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let value: Option<Option<String>> =
            sqlx::query_scalar("SELECT value FROM match_state WHERE key = ?1")
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;
        Ok(value.flatten())
    }

    pub async fn set_player1(&self, username: Option<&str>) -> Result<(), StoreError> {
        self.set(KEY_PLAYER1, username).await
    }

    pub async fn set_player2(&self, username: Option<&str>) -> Result<(), StoreError> {
        self.set(KEY_PLAYER2, username).await
    }

    pub async fn set_current_turn(&self, username: Option<&str>) -> Result<(), StoreError> {
        self.set(KEY_CURRENT_TURN, username).await
    }

    /// Reads all three keys.
    pub async fn load(&self) -> Result<StoredMatch, StoreError> {
        Ok(StoredMatch {
            player1: self.get(KEY_PLAYER1).await?,
            player2: self.get(KEY_PLAYER2).await?,
            current_turn: self.get(KEY_CURRENT_TURN).await?,
        })
    }

    /// Nulls all three keys.
    pub async fn clear(&self) -> Result<(), StoreError> {
        self.set_player1(None).await?;
        self.set_player2(None).await?;
        self.set_current_turn(None).await
    }
}
