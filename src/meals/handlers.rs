use anyhow::Context;
use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::{header, HeaderName, HeaderValue, StatusCode},
    routing::get,
    Json, Router,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{
    dto::{
        CreateMealRequest, MealResponse, Pagination, SummaryResponse, UpdateMealRequest,
        MAX_NAME_LEN,
    },
    repo_types::{MealPatch, NewMeal},
    streak,
};
use crate::{
    auth::extractors::AuthUser,
    error::{ApiError, ApiResult},
    state::AppState,
};

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/meals/summary", get(get_summary))
        .route("/meals", get(list_meals))
        .route("/meals/:id", get(get_meal))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/meals", axum::routing::post(create_meal))
        .route(
            "/meals/:id",
            axum::routing::put(update_meal).delete(delete_meal),
        )
}

fn validate_name(name: &str) -> ApiResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ApiError::Validation("Meal name is required".into()));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(ApiError::Validation("Meal name is too long".into()));
    }
    Ok(name.to_string())
}

/// Trimmed; blank descriptions are stored as null.
fn normalize_description(description: Option<String>) -> Option<String> {
    description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty())
}

fn not_found() -> ApiError {
    ApiError::NotFound("Meal not found".into())
}

#[instrument(skip(state, user, payload), fields(user_id = %user.id))]
pub async fn create_meal(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    payload: Result<Json<CreateMealRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, [(HeaderName, HeaderValue); 1], Json<MealResponse>)> {
    let Json(body) = payload?;
    let name = validate_name(&body.name).map_err(|e| {
        warn!(error = %e, "invalid meal");
        e
    })?;
    let description = normalize_description(body.description);

    let meal = state
        .meals
        .create(NewMeal {
            owner_id: user.id,
            name,
            description,
            inside_diet: body.inside_diet,
        })
        .await?;

    let location = HeaderValue::from_str(&format!("/meals/{}", meal.id))
        .context("build location header")?;

    info!(meal_id = %meal.id, inside_diet = meal.inside_diet, "meal created");
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(meal.into()),
    ))
}

#[instrument(skip(state, user, pagination), fields(user_id = %user.id))]
pub async fn list_meals(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    pagination: Result<Query<Pagination>, QueryRejection>,
) -> ApiResult<Json<Vec<MealResponse>>> {
    let Query(pagination) = pagination?;
    let (limit, offset) = pagination.clamped();
    let meals = state.meals.list_by_owner(user.id, limit, offset).await?;
    Ok(Json(meals.into_iter().map(Into::into).collect()))
}

#[instrument(skip(state, user, id), fields(user_id = %user.id))]
pub async fn get_meal(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Json<MealResponse>> {
    let Path(id) = id?;
    let meal = state.meals.get(user.id, id).await?.ok_or_else(not_found)?;
    Ok(Json(meal.into()))
}

#[instrument(skip(state, user, id, payload), fields(user_id = %user.id))]
pub async fn update_meal(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<UpdateMealRequest>, JsonRejection>,
) -> ApiResult<Json<MealResponse>> {
    let Path(id) = id?;
    let Json(body) = payload?;

    let patch = MealPatch {
        name: body.name.as_deref().map(validate_name).transpose()?,
        description: body.description.map(normalize_description),
        inside_diet: body.inside_diet,
    };
    if patch.is_empty() {
        warn!(meal_id = %id, "empty meal update");
        return Err(ApiError::Validation("Nothing to update".into()));
    }

    let meal = state
        .meals
        .update(user.id, id, patch)
        .await?
        .ok_or_else(not_found)?;

    info!(meal_id = %meal.id, "meal updated");
    Ok(Json(meal.into()))
}

#[instrument(skip(state, user, id), fields(user_id = %user.id))]
pub async fn delete_meal(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<StatusCode> {
    let Path(id) = id?;
    if !state.meals.delete(user.id, id).await? {
        return Err(not_found());
    }
    info!(meal_id = %id, "meal deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Counts plus the best inside-diet streak. A user without meals gets zeros.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn get_summary(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> ApiResult<Json<SummaryResponse>> {
    let meals = state.meals.find_by_owner(user.id).await?;
    let summary = streak::summarize(&meals);
    info!(
        total = summary.total_meals,
        best_streak = summary.best_streak.len(),
        "summary computed"
    );
    Ok(Json(summary.into()))
}
