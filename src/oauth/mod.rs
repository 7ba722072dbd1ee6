//! OAuth identity bridge for Google and GitHub.
//!
//! The bridge turns a provider authorization code into a plain
//! [`ExternalIdentity`] value; callers never see provider-specific payloads.
//! Accounts created from an external identity carry a hashed provider
//! sentinel instead of a password, so password login against them always
//! fails like any other bad credential.
//!
//! The authorize URL carries a random `state` parameter for the round trip
//! to the provider; the callback does not keep server-side state, an
//! intentional simplification of this deployment shape.

use anyhow::{anyhow, Context, Result};
use rand::{distributions::Alphanumeric, Rng};
use reqwest::{header::ACCEPT, Client};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::APP_USER_AGENT;

const GOOGLE_AUTHORIZE_ENDPOINT: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";
const GOOGLE_USERINFO_ENDPOINT: &str = "https://www.googleapis.com/oauth2/v2/userinfo";
const GITHUB_AUTHORIZE_ENDPOINT: &str = "https://github.com/login/oauth/authorize";
const GITHUB_TOKEN_ENDPOINT: &str = "https://github.com/login/oauth/access_token";
const GITHUB_USER_ENDPOINT: &str = "https://api.github.com/user";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Google,
    Github,
}

impl Provider {
    /// Map a path segment like `google` to a provider.
    #[must_use]
    pub fn from_path(value: &str) -> Option<Self> {
        match value {
            "google" => Some(Self::Google),
            "github" => Some(Self::Github),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Google => "google",
            Self::Github => "github",
        }
    }

    /// Placeholder credential stored for accounts created via this provider.
    /// Hashed like a password but never compared against user input.
    #[must_use]
    pub fn sentinel_password(self) -> &'static str {
        match self {
            Self::Google => "google-oauth",
            Self::Github => "github-oauth",
        }
    }

    fn authorize_endpoint(self) -> &'static str {
        match self {
            Self::Google => GOOGLE_AUTHORIZE_ENDPOINT,
            Self::Github => GITHUB_AUTHORIZE_ENDPOINT,
        }
    }

    fn token_endpoint(self) -> &'static str {
        match self {
            Self::Google => GOOGLE_TOKEN_ENDPOINT,
            Self::Github => GITHUB_TOKEN_ENDPOINT,
        }
    }

    fn scope(self) -> &'static str {
        match self {
            Self::Google => "openid email profile",
            Self::Github => "user:email",
        }
    }
}

/// Verified identity returned by a provider after the code exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalIdentity {
    pub email: String,
    pub name: String,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ProviderCredentials {
    client_id: String,
    client_secret: SecretString,
}

impl ProviderCredentials {
    #[must_use]
    pub fn new(client_id: String, client_secret: SecretString) -> Self {
        Self {
            client_id,
            client_secret,
        }
    }
}

/// HTTP client performing the authorize/exchange round trip per provider.
pub struct OAuthClient {
    client: Client,
    public_url: String,
    google: Option<ProviderCredentials>,
    github: Option<ProviderCredentials>,
}

impl OAuthClient {
    /// Build the bridge client. `public_url` is this service's externally
    /// reachable base URL, used to derive callback URLs.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(
        public_url: String,
        google: Option<ProviderCredentials>,
        github: Option<ProviderCredentials>,
    ) -> Result<Self> {
        let client = Client::builder().user_agent(APP_USER_AGENT).build()?;

        Ok(Self {
            client,
            public_url: public_url.trim_end_matches('/').to_string(),
            google,
            github,
        })
    }

    #[must_use]
    pub fn is_configured(&self, provider: Provider) -> bool {
        self.credentials(provider).is_some()
    }

    fn credentials(&self, provider: Provider) -> Option<&ProviderCredentials> {
        match provider {
            Provider::Google => self.google.as_ref(),
            Provider::Github => self.github.as_ref(),
        }
    }

    #[must_use]
    pub fn callback_url(&self, provider: Provider) -> String {
        format!("{}/api/auth/{}/callback", self.public_url, provider.as_str())
    }

    /// Build the provider authorize URL the browser is redirected to.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider has no configured credentials.
    pub fn authorize_url(&self, provider: Provider) -> Result<Url> {
        let creds = self
            .credentials(provider)
            .ok_or_else(|| anyhow!("{} OAuth is not configured", provider.as_str()))?;

        let mut url = Url::parse(provider.authorize_endpoint())?;
        let state: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(32)
            .map(char::from)
            .collect();

        url.query_pairs_mut()
            .append_pair("client_id", &creds.client_id)
            .append_pair("redirect_uri", &self.callback_url(provider))
            .append_pair("response_type", "code")
            .append_pair("scope", provider.scope())
            .append_pair("state", &state);

        Ok(url)
    }

    /// Exchange an authorization code for a verified external identity.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider is unconfigured, the token exchange
    /// fails, or the profile payload is missing the expected fields.
    pub async fn exchange(&self, provider: Provider, code: &str) -> Result<ExternalIdentity> {
        let access_token = self.fetch_access_token(provider, code).await?;

        let identity = match provider {
            Provider::Google => {
                let profile = self.fetch_profile(GOOGLE_USERINFO_ENDPOINT, &access_token).await?;
                identity_from_google_profile(&profile)?
            }
            Provider::Github => {
                let profile = self.fetch_profile(GITHUB_USER_ENDPOINT, &access_token).await?;
                identity_from_github_profile(&profile)?
            }
        };

        debug!("{} identity resolved for {}", provider.as_str(), identity.email);

        Ok(identity)
    }

    async fn fetch_access_token(&self, provider: Provider, code: &str) -> Result<String> {
        let creds = self
            .credentials(provider)
            .ok_or_else(|| anyhow!("{} OAuth is not configured", provider.as_str()))?;
        let callback_url = self.callback_url(provider);

        let params = [
            ("client_id", creds.client_id.as_str()),
            ("client_secret", creds.client_secret.expose_secret()),
            ("code", code),
            ("redirect_uri", callback_url.as_str()),
            ("grant_type", "authorization_code"),
        ];

        let response = self
            .client
            .post(provider.token_endpoint())
            .header(ACCEPT, "application/json")
            .form(&params)
            .send()
            .await
            .with_context(|| format!("{} token exchange failed", provider.as_str()))?;

        if !response.status().is_success() {
            let status = response.status();

            return Err(anyhow!(
                "{} token endpoint returned {}",
                provider.as_str(),
                status
            ));
        }

        let json_response: Value = response.json().await?;

        json_response["access_token"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| anyhow!("no access_token in {} response", provider.as_str()))
    }

    async fn fetch_profile(&self, endpoint: &str, access_token: &str) -> Result<Value> {
        let response = self
            .client
            .get(endpoint)
            .bearer_auth(access_token)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .with_context(|| format!("profile request to {endpoint} failed"))?;

        if !response.status().is_success() {
            let status = response.status();

            return Err(anyhow!("{endpoint} returned {status}"));
        }

        Ok(response.json().await?)
    }
}

fn identity_from_google_profile(profile: &Value) -> Result<ExternalIdentity> {
    let email = profile["email"]
        .as_str()
        .ok_or_else(|| anyhow!("Google profile has no email"))?
        .to_string();

    let name = profile["name"]
        .as_str()
        .map_or_else(|| local_part(&email), str::to_string);

    let avatar_url = profile["picture"].as_str().map(str::to_string);

    Ok(ExternalIdentity {
        email,
        name,
        avatar_url,
    })
}

fn identity_from_github_profile(profile: &Value) -> Result<ExternalIdentity> {
    let login = profile["login"]
        .as_str()
        .ok_or_else(|| anyhow!("GitHub profile has no login"))?;

    // The primary email is hidden for many accounts; fall back to the
    // conventional noreply-style address derived from the login.
    let email = profile["email"]
        .as_str()
        .map_or_else(|| format!("{login}@github.com"), str::to_string);

    let name = profile["name"]
        .as_str()
        .map_or_else(|| login.to_string(), str::to_string);

    let avatar_url = profile["avatar_url"].as_str().map(str::to_string);

    Ok(ExternalIdentity {
        email,
        name,
        avatar_url,
    })
}

fn local_part(email: &str) -> String {
    email.split('@').next().unwrap_or(email).to_string()
}
