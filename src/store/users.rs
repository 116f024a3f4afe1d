use sqlx::SqlitePool;

use crate::store::error::{LoginError, RegisterError, RenameError, StoreError, UsernameError};

/// Usernames that no account may claim, compared case-insensitively.
pub const RESERVED_USERNAMES: [&str; 4] = ["host", "server", "admin", "moderator"];

/// Checks a username against the format rules: 3 to 16 characters, ASCII
/// letters, digits, and underscores only, and not a reserved word.
pub fn validate_username(name: &str) -> Result<(), UsernameError> {
    if name.len() < 3 {
        return Err(UsernameError::TooShort);
    }
    if name.len() > 16 {
        return Err(UsernameError::TooLong);
    }
    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(UsernameError::InvalidCharacter);
    }
    if RESERVED_USERNAMES
        .iter()
        .any(|r| name.eq_ignore_ascii_case(r))
    {
        return Err(UsernameError::Reserved);
    }
    Ok(())
}

/// A user's win/loss/draw record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::FromRow)]
pub struct Record {
    pub wins: i64,
    pub losses: i64,
    pub draws: i64,
}

/// One leaderboard row.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ScoreRow {
    pub username: String,
    pub wins: i64,
    pub losses: i64,
    pub draws: i64,
}

#[derive(sqlx::FromRow)]
struct CredentialRow {
    username: String,
    password: String,
}

/// Persistent users table: registration, login, rename, and W/L/D counters.
///
/// Usernames are unique under case-insensitive comparison (the column is
/// `COLLATE NOCASE`), but the display casing provided at registration is
/// preserved and returned by [`UserStore::try_login`].
#[derive(Clone)]
pub struct UserStore {
    pool: SqlitePool,
}

impl UserStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Creates the users table when missing. A failure here means the store
    /// is unusable and server startup must abort.
    pub async fn initialize(&self) -> Result<(), StoreError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT NOT NULL UNIQUE COLLATE NOCASE,
                password TEXT NOT NULL,
                wins INTEGER NOT NULL DEFAULT 0,
                losses INTEGER NOT NULL DEFAULT 0,
                draws INTEGER NOT NULL DEFAULT 0
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(StoreError::Unavailable)?;
        Ok(())
    }

    /// Probes the backing database with a trivial query.
    pub async fn test_connection(&self) -> bool {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .is_ok()
    }

    /// Inserts exactly one row for a new user. The password is stored as
    /// provided.
    pub async fn try_register(&self, username: &str, password: &str) -> Result<(), RegisterError> {
        let result = sqlx::query("INSERT INTO users (username, password) VALUES (?1, ?2)")
            .bind(username)
            .bind(password)
            .execute(&self.pool)
            .await;
        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(RegisterError::UsernameTaken)
            }
            Err(e) => Err(RegisterError::Store(e.into())),
        }
    }

    /// Checks credentials; the lookup is case-insensitive. On success the
    /// stored display casing is returned and the caller must use it from
    /// then on.
    pub async fn try_login(&self, username: &str, password: &str) -> Result<String, LoginError> {
        let row: Option<CredentialRow> =
            sqlx::query_as("SELECT username, password FROM users WHERE username = ?1")
                .bind(username)
                .fetch_optional(&self.pool)
                .await
                .map_err(StoreError::from)?;
        match row {
            None => Err(LoginError::UserNotFound),
            Some(r) if r.password != password => Err(LoginError::WrongPassword),
            Some(r) => Ok(r.username),
        }
    }

    /// Renames a user. A case-only change of the caller's own name is
    /// allowed; a clash with any other row is `UsernameTaken`.
    pub async fn try_update_username(
        &self,
        current: &str,
        new_name: &str,
    ) -> Result<(), RenameError> {
        let result = sqlx::query("UPDATE users SET username = ?1 WHERE username = ?2")
            .bind(new_name)
            .bind(current)
            .execute(&self.pool)
            .await;
        match result {
            Ok(r) if r.rows_affected() == 0 => Err(RenameError::NotFound),
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(RenameError::UsernameTaken)
            }
            Err(e) => Err(RenameError::Store(e.into())),
        }
    }

    pub async fn increment_wins(&self, username: &str) -> Result<(), StoreError> {
        sqlx::query("UPDATE users SET wins = wins + 1 WHERE username = ?1")
            .bind(username)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn increment_losses(&self, username: &str) -> Result<(), StoreError> {
        sqlx::query("UPDATE users SET losses = losses + 1 WHERE username = ?1")
            .bind(username)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn increment_draws(&self, username: &str) -> Result<(), StoreError> {
        sqlx::query("UPDATE users SET draws = draws + 1 WHERE username = ?1")
            .bind(username)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Returns a user's record, or `None` for an unknown username.
    pub async fn stats(&self, username: &str) -> Result<Option<Record>, StoreError> {
        let record = sqlx::query_as("SELECT wins, losses, draws FROM users WHERE username = ?1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        Ok(record)
    }

    /// All users ordered by wins desc, draws desc; ties keep insertion
    /// order.
    pub async fn all_scores(&self) -> Result<Vec<ScoreRow>, StoreError> {
        let rows = sqlx::query_as(
            "SELECT username, wins, losses, draws FROM users
             ORDER BY wins DESC, draws DESC, id ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
