//! Authentication module for the Digital Post client.
//!
//! The client never issues tokens itself. It asks a `TokenProvider` for a
//! bearer token, handing over its HTTP connection so the provider can reach
//! the authorization server through the same pool.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::instrument;

use crate::config::ClientCredentialsConfig;
use crate::errors::{DigitalPostError, DigitalPostResult};
use crate::transport::{HttpRequest, HttpTransport};

/// A bearer token.
#[derive(Clone)]
pub struct AccessToken {
    token: SecretString,
    expires_at: Option<Instant>,
}

impl AccessToken {
    /// Creates a token without a known expiry.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: SecretString::new(token.into()),
            expires_at: None,
        }
    }

    /// Creates a token that expires after `lifetime`.
    pub fn expiring_in(token: impl Into<String>, lifetime: Duration) -> Self {
        Self {
            token: SecretString::new(token.into()),
            expires_at: Instant::now().checked_add(lifetime),
        }
    }

    /// Returns the raw token.
    pub fn secret(&self) -> &str {
        self.token.expose_secret()
    }

    /// Value for the `Authorization` header.
    pub fn authorization_header(&self) -> String {
        format!("Bearer {}", self.token.expose_secret())
    }

    /// Returns true if the token expires within `buffer`.
    pub fn expires_within(&self, buffer: Duration) -> bool {
        match self.expires_at {
            Some(expires_at) => Instant::now() + buffer >= expires_at,
            None => false,
        }
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Source of bearer tokens.
///
/// Failures are reported as `DigitalPostError::Authentication`.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Obtains a token, using `connection` for any HTTP calls.
    async fn get_token(&self, connection: &dyn HttpTransport) -> DigitalPostResult<AccessToken>;
}

/// Provider for a pre-issued token.
pub struct StaticTokenProvider {
    token: AccessToken,
}

impl StaticTokenProvider {
    /// Creates a provider that always returns `token`.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: AccessToken::new(token),
        }
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn get_token(&self, _connection: &dyn HttpTransport) -> DigitalPostResult<AccessToken> {
        if self.token.secret().is_empty() {
            return Err(DigitalPostError::authentication("Token cannot be empty"));
        }
        Ok(self.token.clone())
    }
}

impl std::fmt::Debug for StaticTokenProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticTokenProvider").finish()
    }
}

/// Token endpoint response.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default)]
    expires_in: Option<u64>,
}

/// OAuth2 client credentials provider (RFC 6749 Section 4.4).
///
/// Tokens are cached until they come within the configured buffer of expiry.
/// Concurrent callers share a single token request.
pub struct ClientCredentialsTokenProvider {
    config: ClientCredentialsConfig,
    cache: Mutex<Option<AccessToken>>,
}

impl ClientCredentialsTokenProvider {
    /// Creates a new provider.
    pub fn new(config: ClientCredentialsConfig) -> Self {
        Self {
            config,
            cache: Mutex::new(None),
        }
    }

    fn build_request(&self) -> DigitalPostResult<HttpRequest> {
        let mut params = vec![
            ("grant_type", "client_credentials"),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret()),
        ];
        if let Some(scope) = &self.config.scope {
            params.push(("scope", scope.as_str()));
        }

        let body = serde_urlencoded::to_string(&params).map_err(|e| {
            DigitalPostError::Serialization {
                message: e.to_string(),
            }
        })?;

        Ok(HttpRequest::post(self.config.token_endpoint.as_str())
            .with_header("content-type", "application/x-www-form-urlencoded")
            .with_header("accept", "application/json")
            .with_body(body.into_bytes())
            .with_timeout(self.config.timeout))
    }

    async fn request_token(&self, connection: &dyn HttpTransport) -> DigitalPostResult<AccessToken> {
        let request = self.build_request()?;

        let response = connection.send(request).await.map_err(|e| {
            DigitalPostError::Authentication {
                message: format!("Unable to reach token endpoint: {}", e),
                detail: None,
            }
        })?;

        if response.status != 200 {
            tracing::warn!(status = response.status, "Token request rejected");
            return Err(DigitalPostError::Authentication {
                message: format!("Token endpoint returned HTTP {}", response.status),
                detail: Some(response.text()),
            });
        }

        let token: TokenResponse = response.json().map_err(|e| DigitalPostError::Authentication {
            message: format!("Invalid token response: {}", e),
            detail: None,
        })?;

        if let Some(token_type) = &token.token_type {
            if !token_type.eq_ignore_ascii_case("bearer") {
                tracing::warn!(token_type = %token_type, "Unexpected token type");
            }
        }

        Ok(match token.expires_in {
            Some(secs) => AccessToken::expiring_in(token.access_token, Duration::from_secs(secs)),
            None => AccessToken::new(token.access_token),
        })
    }
}

#[async_trait]
impl TokenProvider for ClientCredentialsTokenProvider {
    #[instrument(skip(self, connection), fields(client_id = %self.config.client_id))]
    async fn get_token(&self, connection: &dyn HttpTransport) -> DigitalPostResult<AccessToken> {
        let mut cache = self.cache.lock().await;

        if let Some(token) = cache.as_ref() {
            if !token.expires_within(self.config.expiry_buffer) {
                return Ok(token.clone());
            }
        }

        tracing::debug!("Requesting client credentials token");
        let token = self.request_token(connection).await?;
        *cache = Some(token.clone());
        Ok(token)
    }
}

impl std::fmt::Debug for ClientCredentialsTokenProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientCredentialsTokenProvider")
            .field("config", &self.config)
            .finish()
    }
}
