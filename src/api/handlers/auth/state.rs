//! Auth state and configuration shared across handlers.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use super::otp::{OtpLedger, PendingReset, PendingSignup};
use crate::mail::Mailer;
use crate::oauth::OAuthClient;
use crate::token::TokenSigner;

const DEFAULT_UPLOAD_DIR: &str = "uploads";

#[derive(Clone, Debug)]
pub struct AuthConfig {
    frontend_url: String,
    upload_dir: PathBuf,
}

impl AuthConfig {
    #[must_use]
    pub fn new(frontend_url: String) -> Self {
        // Redirect targets are built as {frontend_url}/path.
        let frontend_url = frontend_url.trim_end_matches('/').to_string();

        Self {
            frontend_url,
            upload_dir: PathBuf::from(DEFAULT_UPLOAD_DIR),
        }
    }

    #[must_use]
    pub fn with_upload_dir(mut self, upload_dir: PathBuf) -> Self {
        self.upload_dir = upload_dir;
        self
    }

    #[must_use]
    pub fn frontend_url(&self) -> &str {
        &self.frontend_url
    }

    #[must_use]
    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }
}

pub struct AuthState {
    config: AuthConfig,
    signer: TokenSigner,
    mailer: Arc<dyn Mailer>,
    oauth: OAuthClient,
    signup_otps: OtpLedger<PendingSignup>,
    reset_otps: OtpLedger<PendingReset>,
}

impl AuthState {
    pub fn new(
        config: AuthConfig,
        signer: TokenSigner,
        mailer: Arc<dyn Mailer>,
        oauth: OAuthClient,
    ) -> Self {
        Self {
            config,
            signer,
            mailer,
            oauth,
            signup_otps: OtpLedger::new(),
            reset_otps: OtpLedger::new(),
        }
    }

    /// Replace both ledgers with fresh ones using the given TTL. Meant to
    /// be called at construction, before any entries exist.
    #[must_use]
    pub fn with_otp_ttl(mut self, ttl: Duration) -> Self {
        self.signup_otps = OtpLedger::with_ttl(ttl);
        self.reset_otps = OtpLedger::with_ttl(ttl);
        self
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    #[must_use]
    pub fn signer(&self) -> &TokenSigner {
        &self.signer
    }

    pub(crate) fn mailer(&self) -> &dyn Mailer {
        self.mailer.as_ref()
    }

    pub(crate) fn oauth(&self) -> &OAuthClient {
        &self.oauth
    }

    pub(crate) fn signup_otps(&self) -> &OtpLedger<PendingSignup> {
        &self.signup_otps
    }

    pub(crate) fn reset_otps(&self) -> &OtpLedger<PendingReset> {
        &self.reset_otps
    }
}
