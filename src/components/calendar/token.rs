use crate::error::{google_calendar_error, missing_credentials, BoardResult};
use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Access tokens are renewed this long before they expire
const EXPIRY_MARGIN_SECS: i64 = 60;

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    3600
}

/// OAuth credentials for the Google Calendar sources
#[derive(Debug, Clone, Default)]
pub struct GoogleCredentials {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub refresh_token: Option<String>,
}

/// Exchanges the long-lived refresh token for access tokens.
///
/// Clones share one cache, so every Google calendar uses the same token.
#[derive(Clone)]
pub struct TokenManager {
    credentials: GoogleCredentials,
    token_url: String,
    client: Client,
    cache: Arc<RwLock<Option<CachedToken>>>,
}

impl TokenManager {
    pub fn new(credentials: GoogleCredentials, token_url: impl Into<String>, client: Client) -> Self {
        Self {
            credentials,
            token_url: token_url.into(),
            client,
            cache: Arc::new(RwLock::new(None)),
        }
    }

    /// Current access token, refreshed when missing or about to expire
    pub async fn get_token(&self) -> BoardResult<String> {
        if let Some(access_token) = fresh_token(&*self.cache.read().await) {
            return Ok(access_token);
        }

        let mut cache = self.cache.write().await;
        // A parallel fetch may have refreshed while we waited for the lock
        if let Some(access_token) = fresh_token(&cache) {
            return Ok(access_token);
        }

        let token = self.refresh_token().await?;
        let access_token = token.access_token.clone();
        *cache = Some(token);
        Ok(access_token)
    }

    /// Drop the cached token, e.g. after the API rejected it
    pub async fn invalidate(&self) {
        *self.cache.write().await = None;
    }

    async fn refresh_token(&self) -> BoardResult<CachedToken> {
        let client_id = required(&self.credentials.client_id, "GOOGLE_CLIENT_ID")?;
        let client_secret = required(&self.credentials.client_secret, "GOOGLE_CLIENT_SECRET")?;
        let refresh_token = required(&self.credentials.refresh_token, "GOOGLE_REFRESH_TOKEN")?;

        let params = [
            ("client_id", client_id),
            ("client_secret", client_secret),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ];

        let response = self
            .client
            .post(&self.token_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| google_calendar_error(&format!("Failed to refresh token: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Could not read error response".to_string());
            return Err(google_calendar_error(&format!(
                "Failed to refresh token: HTTP {} - {}",
                status, error_body
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| google_calendar_error(&format!("Failed to parse token response: {}", e)))?;

        debug!("Obtained Google access token valid for {}s", token.expires_in);

        Ok(CachedToken {
            access_token: token.access_token,
            expires_at: Utc::now() + Duration::seconds(token.expires_in),
        })
    }
}

fn fresh_token(cache: &Option<CachedToken>) -> Option<String> {
    cache
        .as_ref()
        .filter(|token| token.expires_at - Duration::seconds(EXPIRY_MARGIN_SECS) > Utc::now())
        .map(|token| token.access_token.clone())
}

fn required<'a>(value: &'a Option<String>, name: &str) -> BoardResult<&'a str> {
    value.as_deref().ok_or_else(|| missing_credentials(name))
}
