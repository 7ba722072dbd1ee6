//! Password login endpoint.

use axum::{extract::Extension, response::IntoResponse, Json};
use std::sync::Arc;
use tracing::info;

use super::error::AuthError;
use super::state::AuthState;
use super::types::{AuthenticatedUser, LoginRequest, MessageResponse, TokenResponse};
use super::utils::verify_password;
use crate::api::storage::UserStore;

/// Exchange email and password for a bearer token.
///
/// Unknown email and wrong password return the same response so the
/// endpoint cannot be used to enumerate accounts.
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = TokenResponse),
        (status = 400, description = "Invalid credentials or payload missing", body = MessageResponse)
    ),
    tag = "auth"
)]
pub async fn login(
    auth_state: Extension<Arc<AuthState>>,
    store: Extension<Arc<dyn UserStore>>,
    payload: Option<Json<LoginRequest>>,
) -> Result<impl IntoResponse, AuthError> {
    let Some(Json(request)) = payload else {
        return Err(AuthError::MissingPayload);
    };

    let Some(user) = store.find_by_email(&request.email).await? else {
        return Err(AuthError::InvalidCredentials);
    };

    if !verify_password(&request.password, &user.password_hash)? {
        return Err(AuthError::InvalidCredentials);
    }

    let token = auth_state.signer().issue(user.id, &user.email, &user.name)?;

    info!("User logged in");
    Ok(Json(TokenResponse {
        message: "Login successful".to_string(),
        token,
        user: AuthenticatedUser {
            id: user.id,
            name: user.name,
            email: user.email,
        },
    }))
}
