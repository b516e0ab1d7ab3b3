use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo_types::{Meal, MealPatch, NewMeal};

/// Meal persistence. Every lookup is scoped to the owning user.
#[async_trait]
pub trait MealRepository: Send + Sync {
    async fn create(&self, new: NewMeal) -> anyhow::Result<Meal>;

    /// All meals of the owner, oldest first.
    async fn find_by_owner(&self, owner_id: Uuid) -> anyhow::Result<Vec<Meal>>;

    /// A page of the owner's meals, newest first.
    async fn list_by_owner(
        &self,
        owner_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> anyhow::Result<Vec<Meal>>;

    async fn get(&self, owner_id: Uuid, meal_id: Uuid) -> anyhow::Result<Option<Meal>>;

    async fn update(
        &self,
        owner_id: Uuid,
        meal_id: Uuid,
        patch: MealPatch,
    ) -> anyhow::Result<Option<Meal>>;

    /// `false` when no meal of this owner had the id.
    async fn delete(&self, owner_id: Uuid, meal_id: Uuid) -> anyhow::Result<bool>;
}

#[derive(Clone)]
pub struct PgMealRepository {
    db: PgPool,
}

impl PgMealRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl MealRepository for PgMealRepository {
    async fn create(&self, new: NewMeal) -> anyhow::Result<Meal> {
        let meal = new.into_meal(OffsetDateTime::now_utc());
        let row = sqlx::query_as::<_, Meal>(
            r#"
            INSERT INTO meals (id, owner_id, name, description, inside_diet, created_at)
            VALUES (
                $1, $2, $3, $4, $5,
                GREATEST(
                    $6,
                    (SELECT MAX(created_at) + INTERVAL '1 microsecond'
                       FROM meals
                      WHERE owner_id = $2)
                )
            )
            RETURNING id, owner_id, name, description, inside_diet, created_at, updated_at
            "#,
        )
        .bind(meal.id)
        .bind(meal.owner_id)
        .bind(&meal.name)
        .bind(&meal.description)
        .bind(meal.inside_diet)
        .bind(meal.created_at)
        .fetch_one(&self.db)
        .await
        .context("insert meal")?;
        Ok(row)
    }

    async fn find_by_owner(&self, owner_id: Uuid) -> anyhow::Result<Vec<Meal>> {
        let rows = sqlx::query_as::<_, Meal>(
            r#"
            SELECT id, owner_id, name, description, inside_diet, created_at, updated_at
              FROM meals
             WHERE owner_id = $1
             ORDER BY created_at ASC, seq ASC
            "#,
        )
        .bind(owner_id)
        .fetch_all(&self.db)
        .await
        .context("find meals by owner")?;
        Ok(rows)
    }

    async fn list_by_owner(
        &self,
        owner_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> anyhow::Result<Vec<Meal>> {
        let rows = sqlx::query_as::<_, Meal>(
            r#"
            SELECT id, owner_id, name, description, inside_diet, created_at, updated_at
              FROM meals
             WHERE owner_id = $1
             ORDER BY created_at DESC, seq DESC
             LIMIT $2 OFFSET $3
            "#,
        )
        .bind(owner_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.db)
        .await
        .context("list meals by owner")?;
        Ok(rows)
    }

    async fn get(&self, owner_id: Uuid, meal_id: Uuid) -> anyhow::Result<Option<Meal>> {
        let row = sqlx::query_as::<_, Meal>(
            r#"
            SELECT id, owner_id, name, description, inside_diet, created_at, updated_at
              FROM meals
             WHERE id = $1 AND owner_id = $2
            "#,
        )
        .bind(meal_id)
        .bind(owner_id)
        .fetch_optional(&self.db)
        .await
        .context("get meal")?;
        Ok(row)
    }

    async fn update(
        &self,
        owner_id: Uuid,
        meal_id: Uuid,
        patch: MealPatch,
    ) -> anyhow::Result<Option<Meal>> {
        let row = sqlx::query_as::<_, Meal>(
            r#"
            UPDATE meals
               SET name = COALESCE($3, name),
                   description = CASE WHEN $4 THEN $5 ELSE description END,
                   inside_diet = COALESCE($6, inside_diet),
                   updated_at = $7
             WHERE id = $1 AND owner_id = $2
            RETURNING id, owner_id, name, description, inside_diet, created_at, updated_at
            "#,
        )
        .bind(meal_id)
        .bind(owner_id)
        .bind(patch.name)
        .bind(patch.description.is_some())
        .bind(patch.description.flatten())
        .bind(patch.inside_diet)
        .bind(OffsetDateTime::now_utc())
        .fetch_optional(&self.db)
        .await
        .context("update meal")?;
        Ok(row)
    }

    async fn delete(&self, owner_id: Uuid, meal_id: Uuid) -> anyhow::Result<bool> {
        let res = sqlx::query("DELETE FROM meals WHERE id = $1 AND owner_id = $2")
            .bind(meal_id)
            .bind(owner_id)
            .execute(&self.db)
            .await
            .context("delete meal")?;
        Ok(res.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{
        repo::{PgUserRepository, UserRepository},
        repo_types::NewUser,
    };

    // Runs against a real database: `DATABASE_URL=... cargo test -- --ignored`
    #[tokio::test]
    #[ignore = "needs DATABASE_URL"]
    async fn rapid_inserts_keep_creation_order() {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL");
        let db = PgPool::connect(&url).await.expect("connect");
        sqlx::migrate!("./migrations").run(&db).await.expect("migrate");

        let user = PgUserRepository::new(db.clone())
            .create(NewUser {
                name: "Ana".into(),
                last_name: "Lima".into(),
                email: format!("order-{}@example.com", Uuid::new_v4()),
                password_hash: "hash".into(),
            })
            .await
            .expect("create user");

        let repo = PgMealRepository::new(db);
        for i in 0..20 {
            repo.create(NewMeal {
                owner_id: user.id,
                name: format!("meal {i}"),
                description: None,
                inside_diet: i % 3 != 0,
            })
            .await
            .expect("create meal");
        }

        let meals = repo.find_by_owner(user.id).await.expect("find");
        let names: Vec<String> = meals.iter().map(|m| m.name.clone()).collect();
        let expected: Vec<String> = (0..20).map(|i| format!("meal {i}")).collect();
        assert_eq!(names, expected);
        assert!(meals.windows(2).all(|w| w[0].created_at < w[1].created_at));

        let page = repo.list_by_owner(user.id, 3, 0).await.expect("list");
        let names: Vec<&str> = page.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, ["meal 19", "meal 18", "meal 17"]);
    }
}
