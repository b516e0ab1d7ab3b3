use anyhow::Context;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode},
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{LoginRequest, PublicUser, RegisterRequest},
        extractors::AuthUser,
        password::{hash_password, verify_against_dummy, verify_password},
        repo::EmailTaken,
        repo_types::NewUser,
        services::{
            clear_session_cookie, extract_session_token, is_valid_email, normalize_email,
            session_cookie, MIN_PASSWORD_LEN,
        },
    },
    error::{ApiError, ApiResult},
    state::AppState,
};

type CookieHeader = [(HeaderName, HeaderValue); 1];

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me))
}

fn set_cookie(value: String) -> anyhow::Result<CookieHeader> {
    let value = HeaderValue::from_str(&value).context("build session cookie")?;
    Ok([(header::SET_COOKIE, value)])
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, CookieHeader, Json<PublicUser>)> {
    let Json(payload) = payload?;
    let email = normalize_email(&payload.email);
    let name = payload.name.trim().to_string();
    let last_name = payload.last_name.trim().to_string();

    if name.is_empty() || last_name.is_empty() {
        warn!("blank name on register");
        return Err(ApiError::Validation("Name and last name are required".into()));
    }
    if !is_valid_email(&email) {
        warn!(%email, "invalid email");
        return Err(ApiError::Validation("Invalid email".into()));
    }
    if payload.password.len() < MIN_PASSWORD_LEN {
        warn!("password too short");
        return Err(ApiError::Validation("Password too short".into()));
    }

    if state.users.find_by_email(&email).await?.is_some() {
        warn!(%email, "email already registered");
        return Err(ApiError::Conflict("Email already registered".into()));
    }

    let password_hash = hash_password(&payload.password)?;
    let user = match state
        .users
        .create(NewUser {
            name,
            last_name,
            email,
            password_hash,
        })
        .await
    {
        Ok(u) => u,
        Err(e) if e.is::<EmailTaken>() => {
            return Err(ApiError::Conflict("Email already registered".into()));
        }
        Err(e) => return Err(e.into()),
    };

    let session = state.sessions.issue(user.id).await?;
    let cookie = set_cookie(session_cookie(&state.config.session, &session.token))?;

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok((StatusCode::CREATED, cookie, Json(user.into())))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<(CookieHeader, Json<PublicUser>)> {
    let Json(payload) = payload?;
    let email = normalize_email(&payload.email);

    if !is_valid_email(&email) {
        warn!(%email, "invalid email");
        return Err(ApiError::Validation("Invalid email".into()));
    }

    let Some(user) = state.users.find_by_email(&email).await? else {
        verify_against_dummy(&payload.password);
        warn!(%email, "login unknown email");
        return Err(ApiError::Unauthorized("Invalid credentials".into()));
    };

    if !verify_password(&payload.password, &user.password_hash)? {
        warn!(%email, user_id = %user.id, "login invalid password");
        return Err(ApiError::Unauthorized("Invalid credentials".into()));
    }

    let session = state.sessions.rotate(user.id).await?;
    let cookie = set_cookie(session_cookie(&state.config.session, &session.token))?;

    info!(user_id = %user.id, email = %user.email, "user logged in");
    Ok((cookie, Json(user.into())))
}

#[instrument(skip(state, headers))]
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<(StatusCode, CookieHeader)> {
    if let Some(token) = extract_session_token(&headers, &state.config.session.cookie_name) {
        state.sessions.revoke(&token).await?;
        info!("session revoked");
    }
    let cookie = set_cookie(clear_session_cookie(&state.config.session))?;
    Ok((StatusCode::NO_CONTENT, cookie))
}

#[instrument(skip(user))]
pub async fn get_me(AuthUser(user): AuthUser) -> Json<PublicUser> {
    Json(user.into())
}
