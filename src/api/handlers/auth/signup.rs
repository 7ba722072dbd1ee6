//! Signup endpoints: OTP request and verification.

use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};
use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;
use tracing::info;

use super::error::AuthError;
use super::otp::{OtpMatch, PendingSignup};
use super::state::AuthState;
use super::types::{
    AuthenticatedUser, MessageResponse, RegisterRequest, TokenResponse, VerifyOtpRequest,
};
use super::utils::{generate_otp, hash_password};
use crate::api::storage::{InsertOutcome, NewUser, UserStore};
use crate::mail::OtpPurpose;

/// Request an OTP for a new account.
///
/// The account is not created yet; its details are parked against the
/// email until the code is verified. The mail goes out before the entry
/// is stored so a delivery failure never leaves a usable pending code.
#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "OTP sent", body = MessageResponse),
        (status = 400, description = "Account already exists or payload missing", body = MessageResponse),
        (status = 500, description = "OTP email could not be sent", body = MessageResponse)
    ),
    tag = "auth"
)]
pub async fn register(
    auth_state: Extension<Arc<AuthState>>,
    store: Extension<Arc<dyn UserStore>>,
    payload: Option<Json<RegisterRequest>>,
) -> Result<impl IntoResponse, AuthError> {
    let Some(Json(request)) = payload else {
        return Err(AuthError::MissingPayload);
    };

    if store.find_by_email(&request.email).await?.is_some() {
        return Err(AuthError::DuplicateAccount);
    }

    let code = generate_otp();
    auth_state
        .mailer()
        .send_otp(&request.email, &code, OtpPurpose::Signup)
        .await
        .map_err(AuthError::MailDelivery)?;

    auth_state
        .signup_otps()
        .put(
            &request.email,
            code,
            PendingSignup {
                name: request.name,
                password: SecretString::from(request.password),
            },
        )
        .await;

    info!("Signup OTP issued");
    Ok(Json(MessageResponse::new("OTP sent to your email")))
}

/// Verify a signup OTP, create the account, and log the user in.
#[utoipa::path(
    post,
    path = "/api/auth/verify-otp",
    request_body = VerifyOtpRequest,
    responses(
        (status = 201, description = "Account created", body = TokenResponse),
        (status = 400, description = "Missing, expired, or wrong OTP", body = MessageResponse)
    ),
    tag = "auth"
)]
pub async fn verify_otp(
    auth_state: Extension<Arc<AuthState>>,
    store: Extension<Arc<dyn UserStore>>,
    payload: Option<Json<VerifyOtpRequest>>,
) -> Result<impl IntoResponse, AuthError> {
    let Some(Json(request)) = payload else {
        return Err(AuthError::MissingPayload);
    };

    let pending = match auth_state
        .signup_otps()
        .verify_and_remove(&request.email, &request.otp)
        .await
    {
        OtpMatch::Missing => return Err(AuthError::NoPendingRequest),
        OtpMatch::Expired => return Err(AuthError::OtpExpired),
        OtpMatch::Mismatch => return Err(AuthError::InvalidOtp),
        OtpMatch::Matched(pending) => pending,
    };

    let password_hash = hash_password(pending.password.expose_secret())?;
    let outcome = store
        .insert(NewUser {
            name: pending.name,
            email: request.email,
            password_hash,
            profile_pic: None,
        })
        .await?;

    let user = match outcome {
        InsertOutcome::Created(user) => user,
        // Another signup for the same email won the race after the OTP
        // was requested.
        InsertOutcome::DuplicateEmail => return Err(AuthError::DuplicateAccount),
    };

    let token = auth_state.signer().issue(user.id, &user.email, &user.name)?;

    info!("User registered");
    Ok((
        StatusCode::CREATED,
        Json(TokenResponse {
            message: "User registered successfully".to_string(),
            token,
            user: AuthenticatedUser {
                id: user.id,
                name: user.name,
                email: user.email,
            },
        }),
    ))
}
