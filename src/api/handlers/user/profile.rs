//! Authenticated profile lookup.

use axum::{extract::Extension, http::HeaderMap, response::IntoResponse, Json};
use std::sync::Arc;

use crate::api::handlers::auth::error::AuthError;
use crate::api::handlers::auth::state::AuthState;
use crate::api::handlers::auth::types::{MessageResponse, ProfileResponse};
use crate::api::principal::require_auth;
use crate::api::storage::UserStore;

/// Return the caller's stored profile. The password hash never leaves
/// the store layer.
#[utoipa::path(
    get,
    path = "/api/user/profile",
    responses(
        (status = 200, description = "Profile for the authenticated user", body = ProfileResponse),
        (status = 401, description = "Missing or invalid bearer token", body = MessageResponse),
        (status = 404, description = "Account no longer exists", body = MessageResponse)
    ),
    tag = "user"
)]
pub async fn profile(
    headers: HeaderMap,
    auth_state: Extension<Arc<AuthState>>,
    store: Extension<Arc<dyn UserStore>>,
) -> Result<impl IntoResponse, AuthError> {
    let principal = require_auth(&headers, auth_state.signer())?;

    let Some(user) = store.find_by_id(principal.user_id).await? else {
        return Err(AuthError::UserNotFound);
    };

    Ok(Json(ProfileResponse {
        id: user.id,
        name: user.name,
        email: user.email,
        profile_pic: user.profile_pic,
        created_at: user.created_at,
    }))
}
