//! Password reset endpoints: OTP request, OTP verification, reset.

use axum::{extract::Extension, response::IntoResponse, Json};
use std::sync::Arc;
use tracing::info;

use super::error::AuthError;
use super::otp::{OtpMatch, PendingReset};
use super::state::AuthState;
use super::types::{ForgotPasswordRequest, MessageResponse, ResetPasswordRequest, VerifyOtpRequest};
use super::utils::{generate_otp, hash_password};
use crate::api::storage::UserStore;
use crate::mail::OtpPurpose;

/// Request a password-reset OTP for an existing account.
#[utoipa::path(
    post,
    path = "/api/auth/forgot-password",
    request_body = ForgotPasswordRequest,
    responses(
        (status = 200, description = "Reset OTP sent", body = MessageResponse),
        (status = 404, description = "No account with this email", body = MessageResponse),
        (status = 500, description = "OTP email could not be sent", body = MessageResponse)
    ),
    tag = "auth"
)]
pub async fn forgot_password(
    auth_state: Extension<Arc<AuthState>>,
    store: Extension<Arc<dyn UserStore>>,
    payload: Option<Json<ForgotPasswordRequest>>,
) -> Result<impl IntoResponse, AuthError> {
    let Some(Json(request)) = payload else {
        return Err(AuthError::MissingPayload);
    };

    if store.find_by_email(&request.email).await?.is_none() {
        return Err(AuthError::AccountNotFound);
    }

    let code = generate_otp();
    auth_state
        .mailer()
        .send_otp(&request.email, &code, OtpPurpose::Reset)
        .await
        .map_err(AuthError::MailDelivery)?;

    auth_state
        .reset_otps()
        .put(&request.email, code, PendingReset { verified: false })
        .await;

    info!("Password reset OTP issued");
    Ok(Json(MessageResponse::new("Password reset OTP sent")))
}

/// Verify a reset OTP. The pending entry stays, marked verified, so the
/// follow-up reset call is allowed without resending the code.
#[utoipa::path(
    post,
    path = "/api/auth/verify-forgot-otp",
    request_body = VerifyOtpRequest,
    responses(
        (status = 200, description = "OTP verified", body = MessageResponse),
        (status = 400, description = "Missing, expired, or wrong OTP", body = MessageResponse)
    ),
    tag = "auth"
)]
pub async fn verify_forgot_otp(
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<VerifyOtpRequest>>,
) -> Result<impl IntoResponse, AuthError> {
    let Some(Json(request)) = payload else {
        return Err(AuthError::MissingPayload);
    };

    match auth_state
        .reset_otps()
        .verify_and_update(&request.email, &request.otp, |pending| {
            pending.verified = true;
        })
        .await
    {
        OtpMatch::Missing => Err(AuthError::NoPendingRequest),
        OtpMatch::Expired => Err(AuthError::OtpExpired),
        OtpMatch::Mismatch => Err(AuthError::InvalidOtp),
        OtpMatch::Matched(()) => Ok(Json(MessageResponse::new(
            "OTP verified. You may now reset your password.",
        ))),
    }
}

/// Set a new password after the reset OTP has been verified.
#[utoipa::path(
    post,
    path = "/api/auth/reset-password",
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Password reset", body = MessageResponse),
        (status = 400, description = "OTP not verified for this email", body = MessageResponse),
        (status = 404, description = "No account with this email", body = MessageResponse)
    ),
    tag = "auth"
)]
pub async fn reset_password(
    auth_state: Extension<Arc<AuthState>>,
    store: Extension<Arc<dyn UserStore>>,
    payload: Option<Json<ResetPasswordRequest>>,
) -> Result<impl IntoResponse, AuthError> {
    let Some(Json(request)) = payload else {
        return Err(AuthError::MissingPayload);
    };

    let verified = auth_state
        .reset_otps()
        .peek(&request.email)
        .await
        .is_some_and(|pending| pending.verified);
    if !verified {
        return Err(AuthError::VerificationRequired);
    }

    let Some(user) = store.find_by_email(&request.email).await? else {
        return Err(AuthError::AccountNotFound);
    };

    let password_hash = hash_password(&request.new_password)?;
    store.update_password(user.id, &password_hash).await?;
    auth_state.reset_otps().remove(&request.email).await;

    info!("Password reset completed");
    Ok(Json(MessageResponse::new("Password reset successful")))
}
