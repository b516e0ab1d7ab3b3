use serde::Deserialize;

/// One year; longer session lifetimes fall back to the default.
pub const MAX_TTL_MINUTES: i64 = 60 * 24 * 365;
pub const MAX_PURGE_INTERVAL_SECS: u64 = 60 * 60 * 24;

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    pub cookie_name: String,
    pub ttl_minutes: i64,
    pub purge_interval_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// `None` selects the in-memory backend.
    pub database_url: Option<String>,
    pub max_connections: u32,
    pub session: SessionConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: "sessionId".into(),
            ttl_minutes: 60 * 24 * 7,
            purge_interval_secs: 60 * 60,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = SessionConfig::default();
        let database_url = std::env::var("DATABASE_URL")
            .ok()
            .filter(|v| !v.trim().is_empty());
        let session = SessionConfig {
            cookie_name: std::env::var("SESSION_COOKIE_NAME")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(defaults.cookie_name),
            ttl_minutes: parse_env("SESSION_TTL_MINUTES")
                .filter(|v: &i64| (1..=MAX_TTL_MINUTES).contains(v))
                .unwrap_or(defaults.ttl_minutes),
            purge_interval_secs: parse_env("SESSION_PURGE_INTERVAL_SECS")
                .filter(|v: &u64| (1..=MAX_PURGE_INTERVAL_SECS).contains(v))
                .unwrap_or(defaults.purge_interval_secs),
        };
        Ok(Self {
            database_url,
            max_connections: parse_env("DATABASE_MAX_CONNECTIONS").unwrap_or(10),
            session,
        })
    }
}

fn parse_env<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse::<T>().ok())
}
