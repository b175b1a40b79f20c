use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::auth::bootstrap::BootstrapGate;
use crate::models::user::User;

/// Profile facts fetched from the identity provider.
#[derive(Debug, Clone)]
pub struct ProviderProfile {
    /// Provider subject id (GitHub numeric user id as a string)
    pub openid: String,
    /// Display name
    pub username: String,
    /// Avatar image URL
    pub avatar: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("IO error: {0}")]
    IoError(String),
}

/// SQLite-backed user store.
pub struct UserStore {
    conn: Mutex<Connection>,
}

impl UserStore {
    pub fn open(database_url: &str) -> Result<Self, StoreError> {
        let path = database_url.strip_prefix("sqlite:").unwrap_or(database_url);

        let conn = if path == ":memory:" {
            Connection::open_in_memory().map_err(|e| StoreError::DatabaseError(e.to_string()))?
        } else {
            if let Some(parent) = Path::new(path).parent() {
                std::fs::create_dir_all(parent).map_err(|e| StoreError::IoError(e.to_string()))?;
            }
            Connection::open(path).map_err(|e| StoreError::DatabaseError(e.to_string()))?
        };

        conn.execute(
            "CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                openid TEXT NOT NULL UNIQUE,
                username TEXT NOT NULL,
                avatar TEXT,
                permission INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
            [],
        )
        .map_err(|e| StoreError::DatabaseError(e.to_string()))?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_users_openid ON users(openid)",
            [],
        )
        .map_err(|e| StoreError::DatabaseError(e.to_string()))?;

        tracing::info!("User store initialized with database: {}", path);

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn find_by_openid(&self, openid: &str) -> Result<Option<User>, StoreError> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?;

        conn.query_row(
            "SELECT id, openid, username, avatar, permission, created_at, updated_at
             FROM users WHERE openid = ?1",
            params![openid],
            row_to_user,
        )
        .optional()
        .map_err(|e| StoreError::DatabaseError(e.to_string()))
    }

    pub fn find_by_id(&self, id: i64) -> Result<Option<User>, StoreError> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?;

        conn.query_row(
            "SELECT id, openid, username, avatar, permission, created_at, updated_at
             FROM users WHERE id = ?1",
            params![id],
            row_to_user,
        )
        .optional()
        .map_err(|e| StoreError::DatabaseError(e.to_string()))
    }

    /// Direct existence check against the table, bypassing any cache.
    pub fn any_user(&self) -> Result<bool, StoreError> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?;

        let row: Option<i64> = conn
            .query_row("SELECT id FROM users LIMIT 1", [], |row| row.get(0))
            .optional()
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?;

        Ok(row.is_some())
    }

    /// Create or re-sync a user from a provider profile.
    ///
    /// An existing user (matched by `openid`) gets its username and avatar
    /// refreshed; permission keeps the stored value and is never re-derived
    /// from the provider. A first-time registrant is inserted with the
    /// permission decided by the bootstrap gate.
    pub fn upsert_from_provider(
        &self,
        profile: &ProviderProfile,
        gate: &BootstrapGate,
    ) -> Result<User, StoreError> {
        let existing = self.find_by_openid(&profile.openid)?;
        let now = Utc::now();

        match existing {
            Some(user) => {
                let conn = self
                    .conn
                    .lock()
                    .map_err(|e| StoreError::DatabaseError(e.to_string()))?;

                conn.execute(
                    "UPDATE users SET username = ?1, avatar = ?2, updated_at = ?3 WHERE id = ?4",
                    params![profile.username, profile.avatar, now.to_rfc3339(), user.id],
                )
                .map_err(|e| StoreError::DatabaseError(e.to_string()))?;

                Ok(User {
                    username: profile.username.clone(),
                    avatar: profile.avatar.clone(),
                    updated_at: now,
                    ..user
                })
            }
            None => {
                // Decide permission before taking the connection lock: the
                // gate performs its own existence queries through this store.
                let permission = gate.permission_for_new_user(self)?;

                let conn = self
                    .conn
                    .lock()
                    .map_err(|e| StoreError::DatabaseError(e.to_string()))?;

                conn.execute(
                    "INSERT INTO users (openid, username, avatar, permission, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    params![
                        profile.openid,
                        profile.username,
                        profile.avatar,
                        permission,
                        now.to_rfc3339(),
                        now.to_rfc3339(),
                    ],
                )
                .map_err(|e| StoreError::DatabaseError(e.to_string()))?;

                let id = conn.last_insert_rowid();

                tracing::info!(
                    "Registered new user: {} (id {}, permission {})",
                    profile.username,
                    id,
                    permission
                );

                Ok(User {
                    id,
                    openid: profile.openid.clone(),
                    username: profile.username.clone(),
                    avatar: profile.avatar.clone(),
                    permission,
                    created_at: now,
                    updated_at: now,
                })
            }
        }
    }

    /// Remove a user record. Used by admin moderation.
    pub fn delete_by_id(&self, id: i64) -> Result<bool, StoreError> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?;

        let affected = conn
            .execute("DELETE FROM users WHERE id = ?1", params![id])
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?;

        Ok(affected > 0)
    }
}

fn row_to_user(row: &Row<'_>) -> rusqlite::Result<User> {
    let created_at: String = row.get(5)?;
    let updated_at: String = row.get(6)?;
    Ok(User {
        id: row.get(0)?,
        openid: row.get(1)?,
        username: row.get(2)?,
        avatar: row.get(3)?,
        permission: row.get(4)?,
        created_at: parse_timestamp(&created_at),
        updated_at: parse_timestamp(&updated_at),
    })
}

fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}
