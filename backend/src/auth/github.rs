use std::time::Duration;

use reqwest::{header, Client};
use serde::Deserialize;

use crate::store::ProviderProfile;

const GITHUB_OAUTH_BASE: &str = "https://github.com/login/oauth";
const GITHUB_API_BASE: &str = "https://api.github.com";

/// GitHub rejects API requests without a User-Agent.
const USER_AGENT: &str = concat!("quill-backend/", env!("CARGO_PKG_VERSION"));

/// Outbound provider calls get a hard deadline; a hung GitHub endpoint
/// surfaces as an exchange/fetch failure rather than a stuck request.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Scope requested on the consent screen: read-only profile access.
const OAUTH_SCOPE: &str = "read%3Auser";

#[derive(Debug, thiserror::Error)]
pub enum GithubError {
    #[error("Code exchange failed: {0}")]
    ExchangeFailed(String),
    #[error("Profile fetch failed: {0}")]
    ProfileFetchFailed(String),
}

/// Token endpoint response. GitHub reports errors with a 200 status and an
/// error payload, so both shapes are handled here.
#[derive(Debug, Deserialize)]
struct AccessTokenResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

/// GitHub's representation of the authenticated user.
#[derive(Debug, Deserialize)]
struct GithubUser {
    id: u64,
    login: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    avatar_url: Option<String>,
}

/// Client for the GitHub OAuth endpoints and user API.
pub struct GithubClient {
    http_client: Client,
    client_id: String,
    client_secret: String,
    oauth_base_url: String,
    api_base_url: String,
}

impl GithubClient {
    pub fn new(client_id: &str, client_secret: &str) -> Self {
        Self::with_base_urls(client_id, client_secret, GITHUB_OAUTH_BASE, GITHUB_API_BASE)
    }

    /// Construct against alternative endpoints (tests point this at a mock
    /// server).
    pub fn with_base_urls(
        client_id: &str,
        client_secret: &str,
        oauth_base_url: &str,
        api_base_url: &str,
    ) -> Self {
        Self {
            http_client: Client::new(),
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            oauth_base_url: oauth_base_url.trim_end_matches('/').to_string(),
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Consent screen URL the browser is redirected to.
    pub fn authorize_url(&self, state: &str) -> String {
        format!(
            "{}/authorize?client_id={}&scope={}&state={}",
            self.oauth_base_url, self.client_id, OAUTH_SCOPE, state
        )
    }

    /// Exchange an authorization code for an access token.
    pub async fn exchange_code(&self, code: &str) -> Result<String, GithubError> {
        let url = format!("{}/access_token", self.oauth_base_url);

        tracing::debug!("Exchanging authorization code at {}", url);

        let response = self
            .http_client
            .post(&url)
            .header(header::ACCEPT, "application/json")
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("code", code),
            ])
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(|e| GithubError::ExchangeFailed(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(GithubError::ExchangeFailed(format!("{}: {}", status, body)));
        }

        let payload: AccessTokenResponse = response
            .json()
            .await
            .map_err(|e| GithubError::ExchangeFailed(e.to_string()))?;

        match payload.access_token {
            Some(token) => Ok(token),
            None => Err(GithubError::ExchangeFailed(
                payload
                    .error_description
                    .unwrap_or_else(|| "no access token in response".to_string()),
            )),
        }
    }

    /// Fetch the authenticated user's profile with a provider access token.
    pub async fn fetch_profile(&self, access_token: &str) -> Result<ProviderProfile, GithubError> {
        let url = format!("{}/user", self.api_base_url);

        let response = self
            .http_client
            .get(&url)
            .header(header::AUTHORIZATION, format!("Bearer {}", access_token))
            .header(header::ACCEPT, "application/json")
            .header(header::USER_AGENT, USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(|e| GithubError::ProfileFetchFailed(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(GithubError::ProfileFetchFailed(format!("{}: {}", status, body)));
        }

        let user: GithubUser = response
            .json()
            .await
            .map_err(|e| GithubError::ProfileFetchFailed(e.to_string()))?;

        Ok(ProviderProfile {
            openid: user.id.to_string(),
            // GitHub users may leave the display name unset.
            username: user.name.unwrap_or(user.login),
            avatar: user.avatar_url,
        })
    }
}
