//! OAuth login endpoints for Google and GitHub.
//!
//! The provider flow never renders JSON: the browser is bounced to the
//! provider, then back to the frontend. Any failure after the provider
//! handoff lands on the frontend login page rather than an error body.

use anyhow::Context;
use axum::{
    extract::{Extension, Path, Query},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::{error, info};
use url::Url;

use super::error::AuthError;
use super::state::AuthState;
use super::types::{AuthenticatedUser, MessageResponse, OAuthCallbackQuery};
use super::utils::hash_password;
use crate::api::storage::{InsertOutcome, NewUser, UserRecord, UserStore};
use crate::oauth::Provider;

fn found(location: &str) -> Response {
    (
        StatusCode::FOUND,
        [(header::LOCATION, location.to_string())],
    )
        .into_response()
}

/// Send the browser to the provider's consent screen.
#[utoipa::path(
    get,
    path = "/api/auth/{provider}",
    params(
        ("provider" = String, Path, description = "OAuth provider, google or github")
    ),
    responses(
        (status = 302, description = "Redirect to the provider"),
        (status = 404, description = "Unknown provider", body = MessageResponse),
        (status = 503, description = "Provider not configured", body = MessageResponse)
    ),
    tag = "oauth"
)]
pub async fn oauth_redirect(
    Path(provider): Path<String>,
    auth_state: Extension<Arc<AuthState>>,
) -> Result<Response, AuthError> {
    let provider = Provider::from_path(&provider).ok_or(AuthError::UnknownProvider)?;
    if !auth_state.oauth().is_configured(provider) {
        return Err(AuthError::ProviderNotConfigured);
    }

    let url = auth_state
        .oauth()
        .authorize_url(provider)
        .context("failed to build authorize url")?;

    Ok(found(url.as_str()))
}

/// Handle the provider redirect back to us.
#[utoipa::path(
    get,
    path = "/api/auth/{provider}/callback",
    params(
        ("provider" = String, Path, description = "OAuth provider, google or github"),
        ("code" = Option<String>, Query, description = "Authorization code from the provider"),
        ("state" = Option<String>, Query, description = "Opaque state echoed by the provider")
    ),
    responses(
        (status = 302, description = "Redirect to the frontend with a token, or to login on failure"),
        (status = 404, description = "Unknown provider", body = MessageResponse),
        (status = 503, description = "Provider not configured", body = MessageResponse)
    ),
    tag = "oauth"
)]
pub async fn oauth_callback(
    Path(provider): Path<String>,
    Query(params): Query<OAuthCallbackQuery>,
    auth_state: Extension<Arc<AuthState>>,
    store: Extension<Arc<dyn UserStore>>,
) -> Result<Response, AuthError> {
    let provider = Provider::from_path(&provider).ok_or(AuthError::UnknownProvider)?;
    if !auth_state.oauth().is_configured(provider) {
        return Err(AuthError::ProviderNotConfigured);
    }

    let login_url = format!("{}/login", auth_state.config().frontend_url());

    // The provider omits the code when the user denies consent.
    let Some(code) = params.code.as_deref().filter(|code| !code.is_empty()) else {
        return Ok(found(&login_url));
    };

    match finish_login(provider, code, &auth_state, store.0.as_ref()).await {
        Ok(success_url) => Ok(found(&success_url)),
        Err(error) => {
            error!(?error, provider = provider.as_str(), "OAuth callback failed");
            Ok(found(&login_url))
        }
    }
}

/// Exchange the code, find or create the account, and build the frontend
/// success URL carrying the token and the user object.
async fn finish_login(
    provider: Provider,
    code: &str,
    auth_state: &AuthState,
    store: &dyn UserStore,
) -> anyhow::Result<String> {
    let identity = auth_state.oauth().exchange(provider, code).await?;
    let user = find_or_create(provider, store, &identity).await?;

    let token = auth_state
        .signer()
        .issue(user.id, &user.email, &user.name)?;
    let user_json = serde_json::to_string(&AuthenticatedUser {
        id: user.id,
        name: user.name,
        email: user.email,
    })?;

    let mut url = Url::parse(&format!(
        "{}/oauth-success",
        auth_state.config().frontend_url()
    ))?;
    url.query_pairs_mut()
        .append_pair("token", &token)
        .append_pair("user", &user_json);

    info!(provider = provider.as_str(), "OAuth login completed");
    Ok(url.into())
}

async fn find_or_create(
    provider: Provider,
    store: &dyn UserStore,
    identity: &crate::oauth::ExternalIdentity,
) -> anyhow::Result<UserRecord> {
    if let Some(user) = store.find_by_email(&identity.email).await? {
        return Ok(user);
    }

    // First login through this provider. The account gets a hashed
    // sentinel password so the row satisfies the same schema as
    // password signups.
    let password_hash = hash_password(provider.sentinel_password())?;
    let outcome = store
        .insert(NewUser {
            name: identity.name.clone(),
            email: identity.email.clone(),
            password_hash,
            profile_pic: identity.avatar_url.clone(),
        })
        .await?;

    match outcome {
        InsertOutcome::Created(user) => Ok(user),
        // Lost a race with a concurrent signup for the same email.
        InsertOutcome::DuplicateEmail => store
            .find_by_email(&identity.email)
            .await?
            .context("account missing after duplicate insert"),
    }
}
