//! Access token acquisition for the calendar provider.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use reqwest::Client;
use serde::Deserialize;
use slotwise_domain::{CalendarConfig, Result, SchedulingError};
use tracing::debug;

use crate::errors::InfraError;

const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Renewal margin before the reported expiry.
const EXPIRY_SLACK_SECS: i64 = 60;

/// Source of bearer tokens for calendar API calls.
#[async_trait]
pub trait AccessTokenProvider: Send + Sync {
    async fn access_token(&self) -> Result<String>;
}

/// Fixed token, used in tests and for short-lived local runs.
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self { token: token.into() }
    }
}

#[async_trait]
impl AccessTokenProvider for StaticTokenProvider {
    async fn access_token(&self) -> Result<String> {
        Ok(self.token.clone())
    }
}

#[derive(Clone, Debug)]
struct CachedToken {
    value: String,
    expires_at: DateTime<Utc>,
}

/// Exchanges a long-lived OAuth refresh token for access tokens, caching the
/// result until shortly before expiry.
#[derive(Debug)]
pub struct RefreshTokenProvider {
    http: Client,
    token_url: String,
    client_id: String,
    client_secret: String,
    refresh_token: String,
    cached: Mutex<Option<CachedToken>>,
}

impl RefreshTokenProvider {
    /// Build from configuration. Credentials are required here, not at call
    /// time, so a misconfigured deployment fails at startup.
    pub fn from_config(http: Client, config: &CalendarConfig) -> Result<Self> {
        let missing = |name: &str| SchedulingError::Config(format!("{name} is not set"));
        Ok(Self {
            http,
            token_url: GOOGLE_TOKEN_URL.to_string(),
            client_id: config.client_id.clone().ok_or_else(|| missing("calendar client_id"))?,
            client_secret: config
                .client_secret
                .clone()
                .ok_or_else(|| missing("calendar client_secret"))?,
            refresh_token: config
                .refresh_token
                .clone()
                .ok_or_else(|| missing("calendar refresh_token"))?,
            cached: Mutex::new(None),
        })
    }

    #[cfg(test)]
    fn with_token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = url.into();
        self
    }

    fn cached_token(&self) -> Option<String> {
        let guard = self.cached.lock();
        guard
            .as_ref()
            .filter(|t| t.expires_at > Utc::now())
            .map(|t| t.value.clone())
    }

    async fn refresh(&self) -> Result<String> {
        let response = self
            .http
            .post(&self.token_url)
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("refresh_token", self.refresh_token.as_str()),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await
            .map_err(InfraError::from)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SchedulingError::Config(format!(
                "token refresh failed ({status}): {body}"
            )));
        }

        let grant: TokenGrant = response
            .json()
            .await
            .map_err(|e| SchedulingError::Config(format!("malformed token response: {e}")))?;

        let expires_at =
            Utc::now() + Duration::seconds((grant.expires_in - EXPIRY_SLACK_SECS).max(0));
        debug!(%expires_at, "access token refreshed");
        *self.cached.lock() =
            Some(CachedToken { value: grant.access_token.clone(), expires_at });
        Ok(grant.access_token)
    }
}

#[async_trait]
impl AccessTokenProvider for RefreshTokenProvider {
    async fn access_token(&self) -> Result<String> {
        if let Some(token) = self.cached_token() {
            return Ok(token);
        }
        self.refresh().await
    }
}

#[derive(Debug, Deserialize)]
struct TokenGrant {
    access_token: String,
    expires_in: i64,
}
