//! Authenticated principal extraction for protected endpoints.
//!
//! Reads the `Authorization` bearer token, verifies it, and returns a
//! principal that downstream handlers can use. Tokens are stateless, so
//! no lookup happens here; handlers that need the full user row fetch it
//! by id afterwards.

use axum::http::{header::AUTHORIZATION, HeaderMap};
use uuid::Uuid;

use crate::api::handlers::auth::error::AuthError;
use crate::token::TokenSigner;

/// Authenticated user context derived from the bearer token.
#[derive(Clone, Debug)]
pub struct Principal {
    pub user_id: Uuid,
    pub email: String,
    pub name: String,
}

fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let trimmed = value.trim();
    let token = trimmed
        .strip_prefix("Bearer ")
        .or_else(|| trimmed.strip_prefix("bearer "))?
        .trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

/// Resolve the `Authorization` header into a principal, or return 401.
pub fn require_auth(headers: &HeaderMap, signer: &TokenSigner) -> Result<Principal, AuthError> {
    let token = extract_bearer_token(headers).ok_or(AuthError::InvalidToken)?;
    let claims = signer.verify(&token)?;
    let user_id = claims.user_id().ok_or(AuthError::InvalidToken)?;

    Ok(Principal {
        user_id,
        email: claims.email,
        name: claims.name,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::{Claims, DEFAULT_TOKEN_TTL_SECONDS};
    use anyhow::Result;
    use axum::http::HeaderValue;
    use chrono::Utc;
    use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
    use secrecy::SecretString;

    fn signer() -> TokenSigner {
        TokenSigner::new(&SecretString::from("test-secret"), DEFAULT_TOKEN_TTL_SECONDS)
    }

    fn bearer_headers(token: &str) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {token}"))?);
        Ok(headers)
    }

    #[test]
    fn require_auth_accepts_valid_token() -> Result<()> {
        let signer = signer();
        let user_id = Uuid::new_v4();
        let token = signer.issue(user_id, "ann@x.com", "Ann")?;

        let principal = require_auth(&bearer_headers(&token)?, &signer)
            .map_err(|error| anyhow::anyhow!("expected principal: {error}"))?;
        assert_eq!(principal.user_id, user_id);
        assert_eq!(principal.email, "ann@x.com");
        assert_eq!(principal.name, "Ann");
        Ok(())
    }

    #[test]
    fn require_auth_accepts_lowercase_scheme() -> Result<()> {
        let signer = signer();
        let token = signer.issue(Uuid::new_v4(), "ann@x.com", "Ann")?;

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(&format!("bearer {token}"))?);
        assert!(require_auth(&headers, &signer).is_ok());
        Ok(())
    }

    #[test]
    fn require_auth_rejects_missing_header() {
        let result = require_auth(&HeaderMap::new(), &signer());
        assert!(matches!(result, Err(AuthError::InvalidToken)));
    }

    #[test]
    fn require_auth_rejects_wrong_scheme_and_empty_token() -> Result<()> {
        let signer = signer();

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert!(matches!(
            require_auth(&headers, &signer),
            Err(AuthError::InvalidToken)
        ));

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer   "));
        assert!(matches!(
            require_auth(&headers, &signer),
            Err(AuthError::InvalidToken)
        ));
        Ok(())
    }

    #[test]
    fn require_auth_rejects_expired_token() -> Result<()> {
        let expired_signer = TokenSigner::new(&SecretString::from("test-secret"), -120);
        let token = expired_signer.issue(Uuid::new_v4(), "ann@x.com", "Ann")?;

        let result = require_auth(&bearer_headers(&token)?, &signer());
        assert!(matches!(result, Err(AuthError::InvalidToken)));
        Ok(())
    }

    #[test]
    fn require_auth_rejects_non_uuid_subject() -> Result<()> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: "not-a-uuid".to_string(),
            email: "ann@x.com".to_string(),
            name: "Ann".to_string(),
            iat: now,
            exp: now + 60,
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(b"test-secret"),
        )?;

        let result = require_auth(&bearer_headers(&token)?, &signer());
        assert!(matches!(result, Err(AuthError::InvalidToken)));
        Ok(())
    }
}
