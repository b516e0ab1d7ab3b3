use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub last_name: String,
    pub email: String, // normalised, unique
    #[serde(skip_serializing)]
    pub password_hash: String, // argon2 PHC string
    pub created_at: OffsetDateTime,
}

/// Fields required to insert a user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub last_name: String,
    pub email: String,
    pub password_hash: String,
}

impl NewUser {
    pub fn into_user(self) -> User {
        User {
            id: Uuid::new_v4(),
            name: self.name,
            last_name: self.last_name,
            email: self.email,
            password_hash: self.password_hash,
            created_at: OffsetDateTime::now_utc(),
        }
    }
}

/// Live login session, keyed by its opaque token.
#[derive(Debug, Clone, FromRow)]
pub struct Session {
    pub token: String,
    pub user_id: Uuid,
    pub expires_at: OffsetDateTime,
    pub created_at: OffsetDateTime,
}

impl Session {
    pub fn new(user_id: Uuid, ttl: Duration) -> anyhow::Result<Self> {
        let now = OffsetDateTime::now_utc();
        let expires_at = now
            .checked_add(ttl)
            .ok_or_else(|| anyhow::anyhow!("session ttl out of range: {ttl}"))?;
        Ok(Self {
            token: super::sessions::generate_token(),
            user_id,
            expires_at,
            created_at: now,
        })
    }

    pub fn is_expired(&self, now: OffsetDateTime) -> bool {
        self.expires_at <= now
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_expiry_is_relative_to_ttl() {
        let s = Session::new(Uuid::new_v4(), Duration::minutes(5)).unwrap();
        assert!(!s.is_expired(s.created_at));
        assert!(!s.is_expired(s.created_at + Duration::minutes(4)));
        assert!(s.is_expired(s.created_at + Duration::minutes(5)));
    }

    #[test]
    fn huge_ttl_is_an_error_not_a_panic() {
        let err = Session::new(Uuid::new_v4(), Duration::minutes(1_000_000_000_000)).unwrap_err();
        assert!(err.to_string().contains("out of range"));
    }

    #[test]
    fn password_hash_is_never_serialized() {
        let user = NewUser {
            name: "Ana".into(),
            last_name: "Lima".into(),
            email: "ana@example.com".into(),
            password_hash: "$argon2id$secret".into(),
        }
        .into_user();
        let json = serde_json::to_string(&user).unwrap();
        assert!(json.contains("ana@example.com"));
        assert!(!json.contains("argon2id"));
    }
}
