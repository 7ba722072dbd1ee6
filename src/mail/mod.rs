//! Outbound OTP email delivery.
//!
//! Delivery goes through a transactional-mail HTTP API. Handlers depend on
//! the [`Mailer`] trait so tests can capture outbound codes without network
//! access. A failed send is reported to the caller; the pending-verification
//! record is only written after the send succeeds.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use tracing::debug;

use crate::APP_USER_AGENT;

pub const DEFAULT_MAIL_URL: &str = "https://api.brevo.com/v3/smtp/email";

const SENDER_NAME: &str = "Auth System";

/// Which flow an OTP email belongs to. Picks subject and copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtpPurpose {
    Signup,
    Reset,
}

impl OtpPurpose {
    #[must_use]
    pub fn title(self) -> &'static str {
        match self {
            Self::Signup => "Email Verification OTP",
            Self::Reset => "Password Reset OTP",
        }
    }

    fn subtitle(self) -> &'static str {
        match self {
            Self::Signup => "Use this OTP to complete your sign up.",
            Self::Reset => "Use this OTP to reset your password.",
        }
    }
}

#[async_trait]
pub trait Mailer: Send + Sync {
    /// Send a one-time code to the given address.
    async fn send_otp(&self, to: &str, code: &str, purpose: OtpPurpose) -> Result<()>;
}

#[derive(Serialize)]
struct EmailAddress<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
    email: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SendEmailBody<'a> {
    sender: EmailAddress<'a>,
    to: Vec<EmailAddress<'a>>,
    subject: &'a str,
    html_content: String,
}

/// Mailer backed by a JSON mail API (Brevo-compatible).
pub struct ApiMailer {
    client: Client,
    url: String,
    api_key: SecretString,
    sender: String,
}

impl ApiMailer {
    /// Build the HTTP client for the mail API.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying client cannot be constructed.
    pub fn new(url: String, api_key: SecretString, sender: String) -> Result<Self> {
        let client = Client::builder().user_agent(APP_USER_AGENT).build()?;

        Ok(Self {
            client,
            url,
            api_key,
            sender,
        })
    }
}

#[async_trait]
impl Mailer for ApiMailer {
    async fn send_otp(&self, to: &str, code: &str, purpose: OtpPurpose) -> Result<()> {
        let body = SendEmailBody {
            sender: EmailAddress {
                name: Some(SENDER_NAME),
                email: &self.sender,
            },
            to: vec![EmailAddress {
                name: None,
                email: to,
            }],
            subject: purpose.title(),
            html_content: render_otp_html(code, purpose),
        };

        let response = self
            .client
            .post(&self.url)
            .header("api-key", self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .context("failed to reach mail API")?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();

            return Err(anyhow!("mail API returned {status}: {detail}"));
        }

        debug!("OTP email queued for {}", to);

        Ok(())
    }
}

fn render_otp_html(code: &str, purpose: OtpPurpose) -> String {
    format!(
        concat!(
            r#"<div style="font-family:Inter,Arial;padding:24px;background:#0b0f19;color:#e5e7eb">"#,
            r#"<div style="max-width:560px;margin:auto;background:#111827;border-radius:14px;padding:28px">"#,
            r#"<h2 style="margin:0 0 6px;font-size:22px;color:#fff">{title}</h2>"#,
            r#"<p style="margin:0 0 18px;color:#9ca3af">{subtitle} The OTP expires in <b>5 minutes</b>.</p>"#,
            r#"<div style="text-align:center;margin:20px 0">"#,
            r#"<span style="letter-spacing:6px;font-size:32px;background:#1f2937;border-radius:10px;padding:12px 20px;display:inline-block;color:#fff">{code}</span>"#,
            r#"</div>"#,
            r#"<p style="color:#9ca3af">If you didn't request this, you can ignore this email.</p>"#,
            r#"</div></div>"#,
        ),
        title = purpose.title(),
        subtitle = purpose.subtitle(),
        code = code,
    )
}
