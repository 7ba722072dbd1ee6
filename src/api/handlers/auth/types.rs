//! Request/response types for auth and user endpoints.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct VerifyOtpRequest {
    pub email: String,
    pub otp: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ResetPasswordRequest {
    pub email: String,
    #[serde(rename = "newPassword")]
    pub new_password: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// The user object embedded in login and OAuth responses.
#[derive(ToSchema, Serialize, Deserialize, Debug, Clone)]
pub struct AuthenticatedUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct TokenResponse {
    pub message: String,
    pub token: String,
    pub user: AuthenticatedUser,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub profile_pic: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ProfilePicResponse {
    pub message: String,
    pub profile_pic: String,
}

/// Query parameters an OAuth provider appends to the callback redirect.
#[derive(Deserialize, Debug)]
pub struct OAuthCallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{Context, Result};

    #[test]
    fn register_request_round_trips() -> Result<()> {
        let request = RegisterRequest {
            name: "Ann".to_string(),
            email: "ann@example.com".to_string(),
            password: "pw123".to_string(),
        };
        let value = serde_json::to_value(&request)?;
        let email = value
            .get("email")
            .and_then(serde_json::Value::as_str)
            .context("missing email")?;
        assert_eq!(email, "ann@example.com");
        let decoded: RegisterRequest = serde_json::from_value(value)?;
        assert_eq!(decoded.name, "Ann");
        Ok(())
    }

    #[test]
    fn reset_password_request_uses_camel_case_field() -> Result<()> {
        let decoded: ResetPasswordRequest = serde_json::from_value(serde_json::json!({
            "email": "ann@example.com",
            "newPassword": "pw456",
        }))?;
        assert_eq!(decoded.new_password, "pw456");

        let value = serde_json::to_value(&decoded)?;
        assert!(value.get("newPassword").is_some());
        assert!(value.get("new_password").is_none());
        Ok(())
    }

    #[test]
    fn token_response_nests_user_object() -> Result<()> {
        let response = TokenResponse {
            message: "Login successful".to_string(),
            token: "jwt".to_string(),
            user: AuthenticatedUser {
                id: Uuid::nil(),
                name: "Ann".to_string(),
                email: "ann@example.com".to_string(),
            },
        };
        let value = serde_json::to_value(&response)?;
        let name = value
            .pointer("/user/name")
            .and_then(serde_json::Value::as_str)
            .context("missing user.name")?;
        assert_eq!(name, "Ann");
        Ok(())
    }

    #[test]
    fn profile_response_serializes_camel_case() -> Result<()> {
        let response = ProfileResponse {
            id: Uuid::nil(),
            name: "Ann".to_string(),
            email: "ann@example.com".to_string(),
            profile_pic: Some("/uploads/abc.png".to_string()),
            created_at: Utc::now(),
        };
        let value = serde_json::to_value(&response)?;
        assert!(value.get("profilePic").is_some());
        assert!(value.get("createdAt").is_some());
        assert!(value.get("profile_pic").is_none());
        Ok(())
    }

    #[test]
    fn callback_query_tolerates_missing_code() -> Result<()> {
        let query: OAuthCallbackQuery = serde_json::from_value(serde_json::json!({
            "state": "abc",
        }))?;
        assert!(query.code.is_none());
        assert_eq!(query.state.as_deref(), Some("abc"));
        Ok(())
    }
}
