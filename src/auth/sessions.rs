use anyhow::Context;
use async_trait::async_trait;
use rand::{distributions::Alphanumeric, Rng};
use sqlx::PgPool;
use time::{Duration, OffsetDateTime};
use tracing::debug;
use uuid::Uuid;

use crate::auth::repo_types::Session;

pub const TOKEN_LEN: usize = 48;

pub(crate) fn generate_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LEN)
        .map(char::from)
        .collect()
}

/// Keyed session store: token -> user, with expiry.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Start a new session for the user.
    async fn issue(&self, user_id: Uuid) -> anyhow::Result<Session>;

    /// Drop every session of the user, then issue a fresh one.
    async fn rotate(&self, user_id: Uuid) -> anyhow::Result<Session>;

    /// Resolve a live token to its user. Expired tokens are removed.
    async fn resolve(&self, token: &str) -> anyhow::Result<Option<Uuid>>;

    async fn revoke(&self, token: &str) -> anyhow::Result<()>;

    /// Remove expired sessions, returning how many were dropped.
    async fn purge_expired(&self) -> anyhow::Result<u64>;
}

#[derive(Clone)]
pub struct PgSessionStore {
    db: PgPool,
    ttl: Duration,
}

impl PgSessionStore {
    pub fn new(db: PgPool, ttl: Duration) -> Self {
        Self { db, ttl }
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn issue(&self, user_id: Uuid) -> anyhow::Result<Session> {
        let session = Session::new(user_id, self.ttl)?;
        sqlx::query(
            r#"
            INSERT INTO sessions (token, user_id, expires_at, created_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(&session.token)
        .bind(session.user_id)
        .bind(session.expires_at)
        .bind(session.created_at)
        .execute(&self.db)
        .await
        .context("insert session")?;
        debug!(%user_id, "session issued");
        Ok(session)
    }

    async fn rotate(&self, user_id: Uuid) -> anyhow::Result<Session> {
        let session = Session::new(user_id, self.ttl)?;
        let mut tx = self.db.begin().await.context("begin tx")?;
        // serialises concurrent logins of the same user
        sqlx::query("SELECT 1 FROM users WHERE id = $1 FOR UPDATE")
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .context("lock user row")?;
        sqlx::query("DELETE FROM sessions WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .context("delete user sessions")?;
        sqlx::query(
            r#"
            INSERT INTO sessions (token, user_id, expires_at, created_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(&session.token)
        .bind(session.user_id)
        .bind(session.expires_at)
        .bind(session.created_at)
        .execute(&mut *tx)
        .await
        .context("insert session")?;
        tx.commit().await.context("commit tx")?;
        debug!(%user_id, "session rotated");
        Ok(session)
    }

    async fn resolve(&self, token: &str) -> anyhow::Result<Option<Uuid>> {
        let session = sqlx::query_as::<_, Session>(
            r#"
            SELECT token, user_id, expires_at, created_at
            FROM sessions
            WHERE token = $1
            "#,
        )
        .bind(token)
        .fetch_optional(&self.db)
        .await
        .context("get session")?;

        let Some(session) = session else {
            return Ok(None);
        };
        if session.is_expired(OffsetDateTime::now_utc()) {
            self.revoke(token).await?;
            return Ok(None);
        }
        Ok(Some(session.user_id))
    }

    async fn revoke(&self, token: &str) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM sessions WHERE token = $1")
            .bind(token)
            .execute(&self.db)
            .await
            .context("delete session")?;
        Ok(())
    }

    async fn purge_expired(&self) -> anyhow::Result<u64> {
        let res = sqlx::query("DELETE FROM sessions WHERE expires_at <= $1")
            .bind(OffsetDateTime::now_utc())
            .execute(&self.db)
            .await
            .context("purge expired sessions")?;
        Ok(res.rows_affected())
    }
}
