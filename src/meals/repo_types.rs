use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Meal {
    pub id: Uuid,
    pub owner_id: Uuid, // never reassigned
    pub name: String,
    pub description: Option<String>,
    pub inside_diet: bool,
    pub created_at: OffsetDateTime, // total order for streaks
    pub updated_at: Option<OffsetDateTime>,
}

#[derive(Debug, Clone)]
pub struct NewMeal {
    pub owner_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub inside_diet: bool,
}

impl NewMeal {
    pub fn into_meal(self, created_at: OffsetDateTime) -> Meal {
        Meal {
            id: Uuid::new_v4(),
            owner_id: self.owner_id,
            name: self.name,
            description: self.description,
            inside_diet: self.inside_diet,
            created_at,
            updated_at: None,
        }
    }
}

/// Partial update; `None` leaves the field unchanged.
#[derive(Debug, Clone, Default)]
pub struct MealPatch {
    pub name: Option<String>,
    /// `Some(None)` clears the description.
    pub description: Option<Option<String>>,
    pub inside_diet: Option<bool>,
}

impl MealPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none() && self.inside_diet.is_none()
    }

    pub fn apply(self, meal: &mut Meal, now: OffsetDateTime) {
        if let Some(name) = self.name {
            meal.name = name;
        }
        if let Some(description) = self.description {
            meal.description = description;
        }
        if let Some(inside_diet) = self.inside_diet {
            meal.inside_diet = inside_diet;
        }
        meal.updated_at = Some(now);
    }
}
