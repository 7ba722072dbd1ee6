//! Error type shared by the auth and user handlers.
//!
//! Every variant maps to a fixed status code and a fixed client-facing
//! message; upstream details stay in the logs. `InvalidCredentials` is
//! deliberately shared by the unknown-email and wrong-password paths so
//! the response cannot be used to probe which accounts exist.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;
use tracing::error;

use crate::api::handlers::auth::types::MessageResponse;
use crate::token::TokenError;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("User already exists")]
    DuplicateAccount,

    #[error("OTP not requested or expired")]
    NoPendingRequest,

    #[error("OTP expired")]
    OtpExpired,

    #[error("Invalid OTP")]
    InvalidOtp,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("No account found with this email")]
    AccountNotFound,

    #[error("OTP verification required")]
    VerificationRequired,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("User not found")]
    UserNotFound,

    #[error("Missing payload")]
    MissingPayload,

    #[error("No file uploaded")]
    NoFileUploaded,

    #[error("Unknown provider")]
    UnknownProvider,

    #[error("OAuth provider not configured")]
    ProviderNotConfigured,

    #[error("Failed to send OTP email")]
    MailDelivery(#[source] anyhow::Error),

    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl AuthError {
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::DuplicateAccount
            | Self::NoPendingRequest
            | Self::OtpExpired
            | Self::InvalidOtp
            | Self::InvalidCredentials
            | Self::VerificationRequired
            | Self::MissingPayload
            | Self::NoFileUploaded => StatusCode::BAD_REQUEST,
            Self::InvalidToken => StatusCode::UNAUTHORIZED,
            Self::AccountNotFound | Self::UserNotFound | Self::UnknownProvider => {
                StatusCode::NOT_FOUND
            }
            Self::ProviderNotConfigured => StatusCode::SERVICE_UNAVAILABLE,
            Self::MailDelivery(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match &self {
            Self::MailDelivery(error) => error!(?error, "Failed to send OTP email"),
            Self::Internal(error) => error!(?error, "Unhandled server error"),
            _ => {}
        }

        (self.status(), Json(MessageResponse::new(self.to_string()))).into_response()
    }
}

impl From<TokenError> for AuthError {
    fn from(error: TokenError) -> Self {
        match error {
            TokenError::Expired | TokenError::Invalid => Self::InvalidToken,
            TokenError::Signing => Self::Internal(anyhow::Error::new(TokenError::Signing)),
        }
    }
}
