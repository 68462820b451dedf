//! Configuration module for the Digital Post client.
//!
//! Holds the service options bound into a client and the client credentials
//! used to obtain bearer tokens.

use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;
use url::Url;
use uuid::Uuid;

use crate::errors::{DigitalPostError, DigitalPostResult};

/// Default base URI of the Digital Post service.
pub const DEFAULT_BASE_URL: &str = "https://gateway.kmdlogic.io/digital-post/v1";

/// Default request timeout (60 seconds).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// How long before expiry a cached token is considered stale.
pub const DEFAULT_TOKEN_EXPIRY_BUFFER: Duration = Duration::from_secs(60);

/// Options bound into a `DigitalPostClient`.
///
/// Immutable once built. The base URI always ends with `/` so that relative
/// routes resolve beneath it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigitalPostOptions {
    service_base_uri: Url,
    subscription_id: Uuid,
    configuration_id: Uuid,
}

impl DigitalPostOptions {
    /// Creates a new options builder.
    pub fn builder() -> DigitalPostOptionsBuilder {
        DigitalPostOptionsBuilder::new()
    }

    /// Creates options from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `DIGITALPOST_SUBSCRIPTION_ID` (required): Logic subscription
    /// - `DIGITALPOST_CONFIGURATION_ID` (optional): Digital Post configuration
    /// - `DIGITALPOST_BASE_URL` (optional): Custom service URI
    pub fn from_env() -> DigitalPostResult<Self> {
        let subscription_id = required_env("DIGITALPOST_SUBSCRIPTION_ID")?;
        let mut builder = DigitalPostOptionsBuilder::new().subscription_id(parse_uuid(
            &subscription_id,
            "DIGITALPOST_SUBSCRIPTION_ID",
        )?);

        if let Ok(configuration_id) = std::env::var("DIGITALPOST_CONFIGURATION_ID") {
            builder = builder.configuration_id(parse_uuid(
                &configuration_id,
                "DIGITALPOST_CONFIGURATION_ID",
            )?);
        }

        if let Ok(base_url) = std::env::var("DIGITALPOST_BASE_URL") {
            builder = builder.service_base_uri(base_url);
        }

        builder.build()
    }

    /// The service base URI.
    pub fn service_base_uri(&self) -> &Url {
        &self.service_base_uri
    }

    /// The Logic subscription.
    pub fn subscription_id(&self) -> Uuid {
        self.subscription_id
    }

    /// The Digital Post configuration used when sending.
    ///
    /// Nil when only configuration listing is intended.
    pub fn configuration_id(&self) -> Uuid {
        self.configuration_id
    }
}

/// Builder for `DigitalPostOptions`.
#[derive(Debug, Default)]
pub struct DigitalPostOptionsBuilder {
    service_base_uri: Option<String>,
    subscription_id: Option<Uuid>,
    configuration_id: Option<Uuid>,
}

impl DigitalPostOptionsBuilder {
    /// Creates a new options builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the service URI. Intended for testing.
    pub fn service_base_uri(mut self, uri: impl Into<String>) -> Self {
        self.service_base_uri = Some(uri.into());
        self
    }

    /// Sets the Logic subscription.
    pub fn subscription_id(mut self, id: Uuid) -> Self {
        self.subscription_id = Some(id);
        self
    }

    /// Sets the Digital Post configuration.
    pub fn configuration_id(mut self, id: Uuid) -> Self {
        self.configuration_id = Some(id);
        self
    }

    /// Builds the options.
    pub fn build(self) -> DigitalPostResult<DigitalPostOptions> {
        let subscription_id = self.subscription_id.ok_or_else(|| {
            DigitalPostError::invalid_argument("Subscription id is required", "subscription_id")
        })?;

        if subscription_id.is_nil() {
            return Err(DigitalPostError::invalid_argument(
                "Subscription id cannot be empty",
                "subscription_id",
            ));
        }

        let raw = self
            .service_base_uri
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let mut service_base_uri = Url::parse(raw.trim())?;

        match service_base_uri.scheme() {
            "https" => {}
            "http" => tracing::warn!(uri = %service_base_uri, "Service URI does not use HTTPS"),
            other => {
                return Err(DigitalPostError::invalid_argument(
                    format!("Unsupported URI scheme '{}'", other),
                    "service_base_uri",
                ))
            }
        }

        if !service_base_uri.path().ends_with('/') {
            let path = format!("{}/", service_base_uri.path());
            service_base_uri.set_path(&path);
        }

        Ok(DigitalPostOptions {
            service_base_uri,
            subscription_id,
            configuration_id: self.configuration_id.unwrap_or_else(Uuid::nil),
        })
    }
}

/// OAuth2 client credentials used to obtain bearer tokens.
#[derive(Clone)]
pub struct ClientCredentialsConfig {
    /// Token endpoint of the authorization server.
    pub token_endpoint: Url,
    /// Client identifier.
    pub client_id: String,
    client_secret: SecretString,
    /// Requested scope.
    pub scope: Option<String>,
    /// Tokens closer than this to expiry are requested again.
    pub expiry_buffer: Duration,
    /// Timeout of the token request.
    pub timeout: Duration,
}

impl ClientCredentialsConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> ClientCredentialsConfigBuilder {
        ClientCredentialsConfigBuilder::default()
    }

    /// Creates a configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `LOGIC_TOKEN_ENDPOINT` (required)
    /// - `LOGIC_CLIENT_ID` (required)
    /// - `LOGIC_CLIENT_SECRET` (required)
    /// - `LOGIC_AUTHORIZATION_SCOPE` (optional)
    pub fn from_env() -> DigitalPostResult<Self> {
        let mut builder = ClientCredentialsConfigBuilder::default()
            .token_endpoint(required_env("LOGIC_TOKEN_ENDPOINT")?)
            .client_id(required_env("LOGIC_CLIENT_ID")?)
            .client_secret(required_env("LOGIC_CLIENT_SECRET")?);

        if let Ok(scope) = std::env::var("LOGIC_AUTHORIZATION_SCOPE") {
            builder = builder.scope(scope);
        }

        builder.build()
    }

    pub(crate) fn client_secret(&self) -> &str {
        self.client_secret.expose_secret()
    }
}

impl std::fmt::Debug for ClientCredentialsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientCredentialsConfig")
            .field("token_endpoint", &self.token_endpoint.as_str())
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("scope", &self.scope)
            .finish()
    }
}

/// Builder for `ClientCredentialsConfig`.
#[derive(Default)]
pub struct ClientCredentialsConfigBuilder {
    token_endpoint: Option<String>,
    client_id: Option<String>,
    client_secret: Option<String>,
    scope: Option<String>,
    expiry_buffer: Option<Duration>,
    timeout: Option<Duration>,
}

impl ClientCredentialsConfigBuilder {
    /// Sets the token endpoint.
    pub fn token_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.token_endpoint = Some(endpoint.into());
        self
    }

    /// Sets the client identifier.
    pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    /// Sets the client secret.
    pub fn client_secret(mut self, secret: impl Into<String>) -> Self {
        self.client_secret = Some(secret.into());
        self
    }

    /// Sets the requested scope.
    pub fn scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    /// Sets the expiry buffer.
    pub fn expiry_buffer(mut self, buffer: Duration) -> Self {
        self.expiry_buffer = Some(buffer);
        self
    }

    /// Sets the token request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Builds the configuration.
    pub fn build(self) -> DigitalPostResult<ClientCredentialsConfig> {
        let endpoint = self.token_endpoint.ok_or_else(|| {
            DigitalPostError::invalid_argument("Token endpoint is required", "token_endpoint")
        })?;
        let token_endpoint = Url::parse(endpoint.trim())?;

        let client_id = self
            .client_id
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| DigitalPostError::invalid_argument("Client id is required", "client_id"))?;

        let client_secret = self
            .client_secret
            .filter(|secret| !secret.is_empty())
            .ok_or_else(|| {
                DigitalPostError::invalid_argument("Client secret is required", "client_secret")
            })?;

        Ok(ClientCredentialsConfig {
            token_endpoint,
            client_id,
            client_secret: SecretString::new(client_secret),
            scope: self.scope.filter(|s| !s.trim().is_empty()),
            expiry_buffer: self.expiry_buffer.unwrap_or(DEFAULT_TOKEN_EXPIRY_BUFFER),
            timeout: self.timeout.unwrap_or(DEFAULT_TIMEOUT),
        })
    }
}

fn required_env(name: &str) -> DigitalPostResult<String> {
    std::env::var(name).map_err(|_| {
        DigitalPostError::invalid_argument(
            format!("{} environment variable not set", name),
            name,
        )
    })
}

fn parse_uuid(value: &str, name: &str) -> DigitalPostResult<Uuid> {
    Uuid::parse_str(value.trim()).map_err(|e| {
        DigitalPostError::invalid_argument(format!("{} is not a valid UUID: {}", name, e), name)
    })
}
