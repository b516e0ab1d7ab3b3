//! In-memory repositories, used when no database is configured and in tests.

use std::collections::HashMap;

use async_trait::async_trait;
use time::{Duration, OffsetDateTime};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    auth::{
        repo::{EmailTaken, UserRepository},
        repo_types::{NewUser, Session, User},
        sessions::SessionStore,
    },
    meals::{
        repo::MealRepository,
        repo_types::{Meal, MealPatch, NewMeal},
    },
};

#[derive(Default)]
pub struct MemoryUserRepository {
    users: RwLock<HashMap<Uuid, User>>,
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn create(&self, new: NewUser) -> anyhow::Result<User> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.email == new.email) {
            return Err(EmailTaken.into());
        }
        let user = new.into_user();
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        Ok(self.users.read().await.get(&id).cloned())
    }
}

/// Meals kept in insertion order, which is also creation order.
#[derive(Default)]
pub struct MemoryMealRepository {
    meals: RwLock<Vec<Meal>>,
}

#[async_trait]
impl MealRepository for MemoryMealRepository {
    async fn create(&self, new: NewMeal) -> anyhow::Result<Meal> {
        let mut meals = self.meals.write().await;
        let mut created_at = OffsetDateTime::now_utc();
        // keep created_at strictly increasing even when the clock does not move
        if let Some(last) = meals.last() {
            if created_at <= last.created_at {
                created_at = last.created_at + Duration::microseconds(1);
            }
        }
        let meal = new.into_meal(created_at);
        meals.push(meal.clone());
        Ok(meal)
    }

    async fn find_by_owner(&self, owner_id: Uuid) -> anyhow::Result<Vec<Meal>> {
        let meals = self.meals.read().await;
        Ok(meals.iter().filter(|m| m.owner_id == owner_id).cloned().collect())
    }

    async fn list_by_owner(
        &self,
        owner_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> anyhow::Result<Vec<Meal>> {
        let meals = self.meals.read().await;
        Ok(meals
            .iter()
            .rev()
            .filter(|m| m.owner_id == owner_id)
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn get(&self, owner_id: Uuid, meal_id: Uuid) -> anyhow::Result<Option<Meal>> {
        let meals = self.meals.read().await;
        Ok(meals
            .iter()
            .find(|m| m.id == meal_id && m.owner_id == owner_id)
            .cloned())
    }

    async fn update(
        &self,
        owner_id: Uuid,
        meal_id: Uuid,
        patch: MealPatch,
    ) -> anyhow::Result<Option<Meal>> {
        let mut meals = self.meals.write().await;
        let Some(meal) = meals
            .iter_mut()
            .find(|m| m.id == meal_id && m.owner_id == owner_id)
        else {
            return Ok(None);
        };
        patch.apply(meal, OffsetDateTime::now_utc());
        Ok(Some(meal.clone()))
    }

    async fn delete(&self, owner_id: Uuid, meal_id: Uuid) -> anyhow::Result<bool> {
        let mut meals = self.meals.write().await;
        let before = meals.len();
        meals.retain(|m| !(m.id == meal_id && m.owner_id == owner_id));
        Ok(meals.len() < before)
    }
}

pub struct MemorySessionStore {
    ttl: Duration,
    sessions: RwLock<HashMap<String, Session>>,
}

impl MemorySessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    #[cfg(test)]
    async fn insert(&self, session: Session) {
        self.sessions.write().await.insert(session.token.clone(), session);
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn issue(&self, user_id: Uuid) -> anyhow::Result<Session> {
        let session = Session::new(user_id, self.ttl)?;
        self.sessions
            .write()
            .await
            .insert(session.token.clone(), session.clone());
        Ok(session)
    }

    async fn rotate(&self, user_id: Uuid) -> anyhow::Result<Session> {
        let session = Session::new(user_id, self.ttl)?;
        let mut sessions = self.sessions.write().await;
        sessions.retain(|_, s| s.user_id != user_id);
        sessions.insert(session.token.clone(), session.clone());
        Ok(session)
    }

    async fn resolve(&self, token: &str) -> anyhow::Result<Option<Uuid>> {
        let now = OffsetDateTime::now_utc();
        let mut sessions = self.sessions.write().await;
        let Some((user_id, expired)) = sessions
            .get(token)
            .map(|s| (s.user_id, s.is_expired(now)))
        else {
            return Ok(None);
        };
        if expired {
            sessions.remove(token);
            return Ok(None);
        }
        Ok(Some(user_id))
    }

    async fn revoke(&self, token: &str) -> anyhow::Result<()> {
        self.sessions.write().await.remove(token);
        Ok(())
    }

    async fn purge_expired(&self) -> anyhow::Result<u64> {
        let now = OffsetDateTime::now_utc();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| !s.is_expired(now));
        Ok((before - sessions.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_meal(owner_id: Uuid, name: &str, inside_diet: bool) -> NewMeal {
        NewMeal {
            owner_id,
            name: name.into(),
            description: None,
            inside_diet,
        }
    }

    #[tokio::test]
    async fn find_by_owner_is_ascending_and_scoped() {
        let repo = MemoryMealRepository::default();
        let (ana, bia) = (Uuid::new_v4(), Uuid::new_v4());
        for i in 0..5 {
            repo.create(new_meal(ana, &format!("a{i}"), true)).await.unwrap();
            repo.create(new_meal(bia, &format!("b{i}"), false)).await.unwrap();
        }
        let meals = repo.find_by_owner(ana).await.unwrap();
        assert_eq!(meals.len(), 5);
        assert!(meals.iter().all(|m| m.owner_id == ana));
        assert!(meals.windows(2).all(|w| w[0].created_at < w[1].created_at));
        assert_eq!(meals[0].name, "a0");
    }

    #[tokio::test]
    async fn update_and_delete_respect_owner() {
        let repo = MemoryMealRepository::default();
        let (ana, bia) = (Uuid::new_v4(), Uuid::new_v4());
        let meal = repo.create(new_meal(ana, "salad", true)).await.unwrap();

        let patch = MealPatch {
            name: Some("stolen".into()),
            ..Default::default()
        };
        assert!(repo.update(bia, meal.id, patch).await.unwrap().is_none());
        assert!(!repo.delete(bia, meal.id).await.unwrap());
        assert!(repo.delete(ana, meal.id).await.unwrap());
        assert!(repo.get(ana, meal.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let repo = MemoryUserRepository::default();
        let new = NewUser {
            name: "Ana".into(),
            last_name: "Lima".into(),
            email: "ana@example.com".into(),
            password_hash: "hash".into(),
        };
        repo.create(new.clone()).await.unwrap();
        let err = repo.create(new).await.unwrap_err();
        assert!(err.is::<EmailTaken>());
    }

    #[tokio::test]
    async fn rotate_keeps_one_live_session() {
        let store = MemorySessionStore::new(Duration::minutes(10));
        let user = Uuid::new_v4();
        let first = store.issue(user).await.unwrap();
        let second = store.rotate(user).await.unwrap();
        assert_eq!(store.resolve(&first.token).await.unwrap(), None);
        assert_eq!(store.resolve(&second.token).await.unwrap(), Some(user));
    }

    #[tokio::test]
    async fn concurrent_rotations_leave_one_session() {
        let store = std::sync::Arc::new(MemorySessionStore::new(Duration::minutes(10)));
        let user = Uuid::new_v4();
        store.issue(user).await.unwrap();

        let logins: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.rotate(user).await.unwrap().token })
            })
            .collect();
        let mut tokens = Vec::new();
        for login in logins {
            tokens.push(login.await.unwrap());
        }

        let mut live = 0;
        for token in &tokens {
            if store.resolve(token).await.unwrap().is_some() {
                live += 1;
            }
        }
        assert_eq!(live, 1);
        assert_eq!(store.sessions.read().await.len(), 1);
    }

    #[tokio::test]
    async fn expired_sessions_do_not_resolve() {
        let store = MemorySessionStore::new(Duration::minutes(10));
        let user = Uuid::new_v4();
        let mut stale = Session::new(user, Duration::minutes(10)).unwrap();
        stale.expires_at = OffsetDateTime::now_utc() - Duration::seconds(1);
        store.insert(stale.clone()).await;
        let live = store.issue(user).await.unwrap();

        assert_eq!(store.purge_expired().await.unwrap(), 1);
        assert_eq!(store.resolve(&stale.token).await.unwrap(), None);
        assert_eq!(store.resolve(&live.token).await.unwrap(), Some(user));

        let mut stale = Session::new(user, Duration::minutes(10)).unwrap();
        stale.expires_at = OffsetDateTime::now_utc() - Duration::seconds(1);
        store.insert(stale.clone()).await;
        assert_eq!(store.resolve(&stale.token).await.unwrap(), None);
        assert_eq!(store.purge_expired().await.unwrap(), 0);
    }
}
