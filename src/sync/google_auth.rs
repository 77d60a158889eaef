use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::storage::config::GoogleConfig;
use crate::storage::ensure_private_dir;

pub const CALENDAR_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/calendar.readonly";
const TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";
const REDIRECT_URI: &str = "http://localhost:8080";

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Failed to read token file: {0}")]
    ReadError(#[from] std::io::Error),
    #[error("Failed to parse token: {0}")]
    ParseError(#[from] serde_json::Error),
    #[error("No stored token; run the consent flow")]
    NotAuthenticated,
    #[error("No refresh token available")]
    NoRefreshToken,
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("OAuth error: {0}")]
    OAuthError(String),
}

/// Supplies bearer tokens to the calendar API client.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn access_token(&self) -> Result<String, AuthError>;
}

/// A fixed token, for scripting against the API or for tests.
pub struct StaticToken(pub String);

#[async_trait]
impl CredentialProvider for StaticToken {
    async fn access_token(&self) -> Result<String, AuthError> {
        Ok(self.0.clone())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TokenInfo {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub token_type: String,
}

pub struct TokenStorage {
    path: PathBuf,
}

impl TokenStorage {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn save_token(&self, token: &TokenInfo) -> Result<(), AuthError> {
        if let Some(parent) = self.path.parent() {
            ensure_private_dir(parent)?;
        }
        let json = serde_json::to_string_pretty(token)?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }

    pub fn load_token(&self) -> Result<TokenInfo, AuthError> {
        if !self.path.exists() {
            return Err(AuthError::NotAuthenticated);
        }
        let content = std::fs::read_to_string(&self.path)?;
        let token: TokenInfo = serde_json::from_str(&content)?;
        Ok(token)
    }

    pub fn needs_refresh(&self, token: &TokenInfo) -> bool {
        let buffer = chrono::Duration::minutes(5);
        token.expires_at <= Utc::now() + buffer
    }
}

impl TokenInfo {
    pub fn new(access_token: String, expires_in_seconds: i64) -> Self {
        Self {
            access_token,
            refresh_token: None,
            expires_at: Utc::now() + chrono::Duration::seconds(expires_in_seconds),
            token_type: "Bearer".to_string(),
        }
    }

    pub fn with_refresh_token(mut self, refresh_token: String) -> Self {
        self.refresh_token = Some(refresh_token);
        self
    }

    pub fn is_valid(&self) -> bool {
        self.expires_at > Utc::now()
    }
}

pub struct GoogleAuthenticator {
    config: GoogleConfig,
    storage: TokenStorage,
    client: reqwest::Client,
    token_endpoint: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
    refresh_token: Option<String>,
    #[allow(dead_code)]
    token_type: String,
}

impl GoogleAuthenticator {
    pub fn new(config: GoogleConfig) -> Self {
        let storage = TokenStorage::new(config.token_cache.clone());

        Self {
            config,
            storage,
            client: reqwest::Client::new(),
            token_endpoint: TOKEN_ENDPOINT.to_string(),
        }
    }

    pub fn with_token_endpoint(mut self, endpoint: String) -> Self {
        self.token_endpoint = endpoint;
        self
    }

    /// Returns the stored token, refreshing it first when it is expired or
    /// about to expire.
    pub async fn get_valid_token(&self) -> Result<TokenInfo, AuthError> {
        let token = self.storage.load_token()?;

        if !self.storage.needs_refresh(&token) {
            return Ok(token);
        }

        match self.refresh_token(&token).await {
            Ok(refreshed) => Ok(refreshed),
            // Still usable for a few minutes; try again on the next call.
            Err(e) if token.is_valid() => {
                tracing::warn!("Token refresh failed, using current token: {}", e);
                Ok(token)
            }
            Err(e) => Err(e),
        }
    }

    pub async fn refresh_token(&self, token: &TokenInfo) -> Result<TokenInfo, AuthError> {
        let refresh_token = token.refresh_token.as_ref()
            .ok_or(AuthError::NoRefreshToken)?;

        let params = [
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("refresh_token", refresh_token.as_str()),
            ("grant_type", "refresh_token"),
        ];

        tracing::info!("Refreshing access token");

        let response = self.client
            .post(&self.token_endpoint)
            .timeout(self.config.request_timeout())
            .form(&params)
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response.text().await?;
            tracing::error!("Token refresh rejected: {}", error_text);
            return Err(AuthError::OAuthError(error_text));
        }

        let token_response: TokenResponse = response.json().await?;

        let new_token = TokenInfo::new(token_response.access_token, token_response.expires_in)
            .with_refresh_token(
                token_response.refresh_token.unwrap_or_else(|| refresh_token.clone()),
            );

        self.storage.save_token(&new_token)?;

        Ok(new_token)
    }

    pub fn get_auth_url(&self) -> String {
        format!(
            "https://accounts.google.com/o/oauth2/v2/auth?client_id={}&redirect_uri={}&response_type=code&scope={}&access_type=offline&prompt=consent",
            urlencoding::encode(&self.config.client_id),
            urlencoding::encode(REDIRECT_URI),
            urlencoding::encode(CALENDAR_READONLY_SCOPE)
        )
    }

    pub async fn exchange_code_for_token(&self, code: &str) -> Result<TokenInfo, AuthError> {
        let params = [
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("code", code),
            ("redirect_uri", REDIRECT_URI),
            ("grant_type", "authorization_code"),
        ];

        let response = self.client
            .post(&self.token_endpoint)
            .timeout(self.config.request_timeout())
            .form(&params)
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response.text().await?;
            return Err(AuthError::OAuthError(error_text));
        }

        let token_response: TokenResponse = response.json().await?;

        let new_token = TokenInfo::new(token_response.access_token, token_response.expires_in)
            .with_refresh_token(
                token_response.refresh_token
                    .ok_or(AuthError::NoRefreshToken)?
            );

        self.storage.save_token(&new_token)?;
        tracing::info!("Stored new token at {}", self.storage.path().display());

        Ok(new_token)
    }

    pub fn print_auth_instructions(&self) {
        println!("\n=== Google Calendar Authentication ===\n");
        println!("To give Desktop Agenda read-only access to your calendars:");
        println!("1. Visit this URL in your browser:\n");
        println!("{}\n", self.get_auth_url());
        println!("2. Sign in and authorize the application");
        println!("3. After authorizing, you'll be redirected to localhost:8080");
        println!("4. Copy the 'code' parameter from the URL");
        println!("5. Paste it when prompted\n");
    }
}

#[async_trait]
impl CredentialProvider for GoogleAuthenticator {
    async fn access_token(&self) -> Result<String, AuthError> {
        Ok(self.get_valid_token().await?.access_token)
    }
}
