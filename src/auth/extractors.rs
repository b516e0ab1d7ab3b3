use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use tracing::warn;

use super::{repo_types::User, services::extract_session_token};
use crate::{error::ApiError, state::AppState};

/// The user acting on the request, resolved from the session token.
pub struct AuthUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_session_token(&parts.headers, &state.config.session.cookie_name)
            .ok_or_else(|| ApiError::Unauthorized("Log in or register to continue".into()))?;

        let Some(user_id) = state.sessions.resolve(&token).await? else {
            warn!("invalid or expired session");
            return Err(ApiError::Unauthorized("Invalid or expired session".into()));
        };

        let Some(user) = state.users.find_by_id(user_id).await? else {
            warn!(%user_id, "session refers to missing user");
            return Err(ApiError::Unauthorized("Invalid or expired session".into()));
        };

        Ok(AuthUser(user))
    }
}
