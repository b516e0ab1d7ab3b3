use serde::{Deserialize, Deserializer, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::{repo_types::Meal, streak::MealSummary};

pub const MAX_NAME_LEN: usize = 200;
pub const MAX_PAGE: i64 = 100;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MealResponse {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub inside_diet: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub updated_at: Option<OffsetDateTime>,
}

impl From<Meal> for MealResponse {
    fn from(m: Meal) -> Self {
        Self {
            id: m.id,
            owner_id: m.owner_id,
            name: m.name,
            description: m.description,
            inside_diet: m.inside_diet,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMealRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub inside_diet: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMealRequest {
    #[serde(default)]
    pub name: Option<String>,
    /// Absent: unchanged. `null`: cleared.
    #[serde(default, deserialize_with = "present")]
    pub description: Option<Option<String>>,
    #[serde(default)]
    pub inside_diet: Option<bool>,
}

fn present<'de, D, T>(de: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(de).map(Some)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryResponse {
    pub total_meals: usize,
    pub total_inside_diet: usize,
    pub total_outside_diet: usize,
    pub best_streak: Vec<MealResponse>,
}

impl From<MealSummary> for SummaryResponse {
    fn from(s: MealSummary) -> Self {
        Self {
            total_meals: s.total_meals,
            total_inside_diet: s.total_inside_diet,
            total_outside_diet: s.total_outside_diet,
            best_streak: s.best_streak.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Pagination {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    20
}

impl Pagination {
    /// Limit clamped to `1..=MAX_PAGE`, offset to `>= 0`.
    pub fn clamped(&self) -> (i64, i64) {
        (self.limit.clamp(1, MAX_PAGE), self.offset.max(0))
    }
}
