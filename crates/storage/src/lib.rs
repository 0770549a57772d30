use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    str::FromStr,
    sync::Mutex,
};

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shared::domain::SessionToken;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Pool, Row, Sqlite,
};

/// Key under which the active session token is kept.
pub const SESSION_TOKEN_KEY: &str = "worldleSession";

/// Durable home of the client's session token.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn load_session_token(&self) -> Result<Option<SessionToken>>;
    async fn save_session_token(&self, token: &SessionToken) -> Result<()>;
    async fn clear_session_token(&self) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct StoredValue {
    pub value: String,
    pub updated_at: DateTime<Utc>,
}

/// SQLite-backed key-value store.
#[derive(Clone)]
pub struct Storage {
    pool: Pool<Sqlite>,
}

impl Storage {
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)
            .with_context(|| format!("invalid sqlite url '{database_url}'"))?
            .create_if_missing(true);
        // Every in-memory connection is its own database.
        let max_connections = if database_url.contains(":memory:") { 1 } else { 5 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(connect_options)
            .await
            .with_context(|| format!("failed to open sqlite database '{database_url}'"))?;
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("failed to run client storage migrations")?;
        Ok(Self { pool })
    }

    #[cfg(test)]
    pub(crate) fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }

    pub async fn get(&self, key: &str) -> Result<Option<StoredValue>> {
        let row = sqlx::query("SELECT value, updated_at FROM client_kv WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("failed to read key '{key}'"))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let updated_at: String = row.try_get("updated_at")?;
        let updated_at = DateTime::parse_from_rfc3339(&updated_at)
            .map_err(|err| anyhow!("corrupt updated_at for key '{key}': {err}"))?
            .with_timezone(&Utc);
        Ok(Some(StoredValue {
            value: row.try_get("value")?,
            updated_at,
        }))
    }

    pub async fn put(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO client_kv (key, value, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .with_context(|| format!("failed to write key '{key}'"))?;
        Ok(())
    }

    /// Returns whether a value was present.
    pub async fn remove(&self, key: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM client_kv WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await
            .with_context(|| format!("failed to remove key '{key}'"))?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl SessionStore for Storage {
    async fn load_session_token(&self) -> Result<Option<SessionToken>> {
        Ok(self
            .get(SESSION_TOKEN_KEY)
            .await?
            .and_then(|stored| SessionToken::new(stored.value)))
    }

    async fn save_session_token(&self, token: &SessionToken) -> Result<()> {
        self.put(SESSION_TOKEN_KEY, token.as_str()).await
    }

    async fn clear_session_token(&self) -> Result<()> {
        self.remove(SESSION_TOKEN_KEY).await?;
        Ok(())
    }
}

/// Process-local store; nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session_token(token: &SessionToken) -> Self {
        let store = Self::default();
        store.lock_values().insert(
            SESSION_TOKEN_KEY.to_string(),
            token.as_str().to_string(),
        );
        store
    }

    fn lock_values(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.values
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn load_session_token(&self) -> Result<Option<SessionToken>> {
        Ok(self
            .lock_values()
            .get(SESSION_TOKEN_KEY)
            .cloned()
            .and_then(SessionToken::new))
    }

    async fn save_session_token(&self, token: &SessionToken) -> Result<()> {
        self.lock_values().insert(
            SESSION_TOKEN_KEY.to_string(),
            token.as_str().to_string(),
        );
        Ok(())
    }

    async fn clear_session_token(&self) -> Result<()> {
        self.lock_values().remove(SESSION_TOKEN_KEY);
        Ok(())
    }
}

/// Creates the directory a file-backed sqlite url points into. In-memory and
/// non-sqlite urls are left alone.
pub fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if database_url.contains(":memory:") || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
