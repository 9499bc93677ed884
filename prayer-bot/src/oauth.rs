//! OAuth client-credentials grant with an in-memory token cache.

use std::time::{Duration, Instant};

use reqwest::Client as HttpClient;
use serde::Deserialize;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::secrets::ClientSecret;

/// Tokens are refreshed this long before they expire.
const REFRESH_MARGIN: Duration = Duration::from_secs(30);
const DEFAULT_EXPIRES_IN: u64 = 3600;

#[derive(Error, Debug)]
pub enum OAuthError {
    #[error("token request failed: {0}")]
    Request(String),

    #[error("token endpoint rejected credentials ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("cannot parse token response: {0}")]
    Parse(String),
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

pub struct OAuthClient {
    http: HttpClient,
    secret: ClientSecret,
    scope: Option<String>,
    token: Mutex<Option<CachedToken>>,
}

impl OAuthClient {
    pub fn new(http: HttpClient, secret: ClientSecret) -> Self {
        Self {
            http,
            secret,
            scope: None,
            token: Mutex::new(None),
        }
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    /// Returns a valid access token, requesting a new one when the cached token is missing or about to expire.
    pub async fn access_token(&self) -> Result<String, OAuthError> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            if token.expires_at > Instant::now() + REFRESH_MARGIN {
                debug!("Using cached access token");
                return Ok(token.access_token.clone());
            }
        }

        let fresh = self.request_token().await?;
        let access_token = fresh.access_token.clone();
        *cached = Some(fresh);
        Ok(access_token)
    }

    /// Drops the cached token so the next call fetches a new one.
    pub async fn invalidate(&self) {
        *self.token.lock().await = None;
    }

    async fn request_token(&self) -> Result<CachedToken, OAuthError> {
        let mut form = vec![
            ("grant_type", "client_credentials".to_string()),
            ("client_id", self.secret.client_id.clone()),
            ("client_secret", self.secret.client_secret.clone()),
        ];
        if let Some(scope) = &self.scope {
            form.push(("scope", scope.clone()));
        }

        let resp = self
            .http
            .post(&self.secret.token_uri)
            .form(&form)
            .send()
            .await
            .map_err(|e| OAuthError::Request(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(OAuthError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let token: TokenResponse = resp
            .json()
            .await
            .map_err(|e| OAuthError::Parse(e.to_string()))?;
        let expires_in = token.expires_in.unwrap_or(DEFAULT_EXPIRES_IN);
        info!(
            client_id = %self.secret.client_id,
            expires_in,
            "Obtained OAuth access token"
        );

        Ok(CachedToken {
            access_token: token.access_token,
            expires_at: Instant::now() + Duration::from_secs(expires_in),
        })
    }
}
