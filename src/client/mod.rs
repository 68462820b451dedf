//! Digital Post client.
//!
//! [`DigitalPostClient`] is the single entry point: it obtains a bearer
//! token, binds the internal REST client once, validates requests and turns
//! response status codes into results or classified errors.

mod call;

pub use call::CallOptions;

use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::OnceCell;
use tracing::instrument;

use crate::auth::TokenProvider;
use crate::config::{DigitalPostOptions, DEFAULT_TIMEOUT};
use crate::errors::{
    DigitalPostError, DigitalPostResult, CONFIGURATION_MESSAGE, VALIDATION_MESSAGE,
};
use crate::internal::{
    ApiResponse, InternalClient, InternalClientFactory, ResponseBody, RestInternalClientFactory,
};
use crate::observability::{DefaultMetricsCollector, MetricsCollector, RequestTimer};
use crate::transport::{HttpTransport, ReqwestTransport, TransportError};
use crate::types::{
    DigitalPostConfiguration, OutgoingDocument, OutgoingMessage, SendMessageResponse,
    UploadAttachmentResponse,
};

/// Securely sends messages and documents to citizens and companies.
///
/// Using the service requires a Logic subscription, a client credential
/// issued for the Logic platform, and a Digital Post configuration.
///
/// The client is cheap to share behind an `Arc`; all operations take `&self`
/// and may run concurrently. No operation is retried.
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use digitalpost_client::{
///     ClientCredentialsConfig, ClientCredentialsTokenProvider, DigitalPostClient,
///     DigitalPostOptions, IdentifierType, OutgoingMessage,
/// };
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let client = DigitalPostClient::builder()
///         .options(DigitalPostOptions::from_env()?)
///         .token_provider(Arc::new(ClientCredentialsTokenProvider::new(
///             ClientCredentialsConfig::from_env()?,
///         )))
///         .build()?;
///
///     let message = OutgoingMessage::new(IdentifierType::Cpr, "0101010000", "Hello", "Hi there");
///     let sent = client.send_message(message).await?;
///     println!("{}", sent.message_id);
///     Ok(())
/// }
/// ```
pub struct DigitalPostClient {
    options: DigitalPostOptions,
    connection: Arc<dyn HttpTransport>,
    token_provider: Arc<dyn TokenProvider>,
    factory: Arc<dyn InternalClientFactory>,
    internal: OnceCell<Arc<dyn InternalClient>>,
    metrics: Arc<dyn MetricsCollector>,
}

impl DigitalPostClient {
    /// Creates a new client builder.
    pub fn builder() -> DigitalPostClientBuilder {
        DigitalPostClientBuilder::new()
    }

    /// Creates a client over a caller-managed connection.
    pub fn new(
        connection: Arc<dyn HttpTransport>,
        token_provider: Arc<dyn TokenProvider>,
        options: DigitalPostOptions,
    ) -> Self {
        Self {
            options,
            connection,
            token_provider,
            factory: Arc::new(RestInternalClientFactory),
            internal: OnceCell::new(),
            metrics: Arc::new(DefaultMetricsCollector::new()),
        }
    }

    /// Returns the options.
    pub fn options(&self) -> &DigitalPostOptions {
        &self.options
    }

    /// Returns the metrics collector.
    pub fn metrics(&self) -> &Arc<dyn MetricsCollector> {
        &self.metrics
    }

    /// Uploads a document or attachment for later sends.
    ///
    /// The stream is read to its end once; it is neither closed nor kept.
    /// An upload may be referenced by any number of sends, see
    /// [`UploadAttachmentResponse::to_attachment`].
    pub async fn upload_attachment<R>(&self, stream: &mut R) -> DigitalPostResult<UploadAttachmentResponse>
    where
        R: AsyncRead + Unpin + Send,
    {
        self.upload_attachment_with_options(stream, &CallOptions::default())
            .await
    }

    /// [`upload_attachment`](Self::upload_attachment) with a deadline or cancellation.
    #[instrument(skip(self, stream, call), fields(subscription_id = %self.options.subscription_id()))]
    pub async fn upload_attachment_with_options<R>(
        &self,
        stream: &mut R,
        call: &CallOptions,
    ) -> DigitalPostResult<UploadAttachmentResponse>
    where
        R: AsyncRead + Unpin + Send,
    {
        let timer = RequestTimer::new("upload_attachment");

        let result = call
            .run(async {
                let mut content = Vec::new();
                stream
                    .read_to_end(&mut content)
                    .await
                    .map_err(|e| TransportError::Read {
                        message: e.to_string(),
                    })?;
                tracing::debug!(bytes = content.len(), "Uploading attachment");

                let client = self.internal_client().await?;
                let response = client
                    .upload_attachment(self.options.subscription_id(), content)
                    .await?;

                match response {
                    ApiResponse {
                        status: 200,
                        body: ResponseBody::Success(upload),
                    } => Ok(upload),
                    other => Err(unexpected(other)),
                }
            })
            .await;

        self.record(&timer, &result);
        result
    }

    /// Sends a message to a citizen or company.
    ///
    /// # Errors
    ///
    /// - `Validation` when no configuration is set or the service rejects the request
    /// - `Configuration` for any other non-OK status
    /// - `Authentication`, `Transport`, `Serialization` are passed through
    pub async fn send_message(&self, message: OutgoingMessage) -> DigitalPostResult<SendMessageResponse> {
        self.send_message_with_options(message, &CallOptions::default())
            .await
    }

    /// [`send_message`](Self::send_message) with a deadline or cancellation.
    #[instrument(
        skip(self, message, call),
        fields(identifier_type = %message.identifier_type, subscription_id = %self.options.subscription_id())
    )]
    pub async fn send_message_with_options(
        &self,
        message: OutgoingMessage,
        call: &CallOptions,
    ) -> DigitalPostResult<SendMessageResponse> {
        let timer = RequestTimer::new("send_message");

        let result = call
            .run(async {
                let request = message.into_request(self.options.configuration_id());
                request.validate()?;

                let client = self.internal_client().await?;
                let response = client
                    .send_message(self.options.subscription_id(), &request)
                    .await?;
                classify_send(response)
            })
            .await;

        self.record(&timer, &result);
        result
    }

    /// Sends a previously uploaded document to a citizen or company.
    ///
    /// The document reference is checked before anything goes over the
    /// network: it must carry a non-nil reference and a file name with an
    /// extension.
    ///
    /// # Errors
    ///
    /// As for [`send_message`](Self::send_message).
    pub async fn send_document(&self, document: OutgoingDocument) -> DigitalPostResult<SendMessageResponse> {
        self.send_document_with_options(document, &CallOptions::default())
            .await
    }

    /// [`send_document`](Self::send_document) with a deadline or cancellation.
    #[instrument(
        skip(self, document, call),
        fields(identifier_type = %document.identifier_type, subscription_id = %self.options.subscription_id())
    )]
    pub async fn send_document_with_options(
        &self,
        document: OutgoingDocument,
        call: &CallOptions,
    ) -> DigitalPostResult<SendMessageResponse> {
        let timer = RequestTimer::new("send_document");

        let result = call
            .run(async {
                let request = document.into_request(self.options.configuration_id())?;
                request.validate()?;

                let client = self.internal_client().await?;
                let response = client
                    .send_document(self.options.subscription_id(), &request)
                    .await?;
                classify_send(response)
            })
            .await;

        self.record(&timer, &result);
        result
    }

    /// Lists the Digital Post configurations of the subscription.
    pub async fn get_all_configurations(&self) -> DigitalPostResult<Vec<DigitalPostConfiguration>> {
        self.get_all_configurations_with_options(&CallOptions::default())
            .await
    }

    /// [`get_all_configurations`](Self::get_all_configurations) with a deadline or cancellation.
    #[instrument(skip(self, call), fields(subscription_id = %self.options.subscription_id()))]
    pub async fn get_all_configurations_with_options(
        &self,
        call: &CallOptions,
    ) -> DigitalPostResult<Vec<DigitalPostConfiguration>> {
        let timer = RequestTimer::new("get_all_configurations");

        let result = call
            .run(async {
                let client = self.internal_client().await?;
                client
                    .list_configurations(self.options.subscription_id())
                    .await
            })
            .await;

        self.record(&timer, &result);
        result
    }

    /// Returns the bound internal client, binding it on first use.
    ///
    /// Concurrent first callers wait on one initialization. A failed
    /// initialization leaves the client unbound.
    async fn internal_client(&self) -> DigitalPostResult<Arc<dyn InternalClient>> {
        let client = self
            .internal
            .get_or_try_init(|| async {
                tracing::debug!("Binding internal client");
                let token = self
                    .token_provider
                    .get_token(self.connection.as_ref())
                    .await?;
                self.factory.create(
                    self.options.service_base_uri(),
                    token,
                    Arc::clone(&self.connection),
                )
            })
            .await?;

        Ok(Arc::clone(client))
    }

    fn record<T>(&self, timer: &RequestTimer, result: &DigitalPostResult<T>) {
        let elapsed = timer.elapsed();
        self.metrics
            .record_request(timer.operation(), result.is_ok(), elapsed);

        if let Err(error) = result {
            self.metrics.record_error(error.kind());
            tracing::warn!(
                operation = timer.operation(),
                kind = error.kind(),
                error = %error,
                "Digital Post operation failed"
            );
        } else {
            tracing::debug!(
                operation = timer.operation(),
                elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
                "Digital Post operation completed"
            );
        }
    }
}

/// Classifies a send response by status code.
///
/// OK yields the body, BadRequest a validation error, anything else a
/// configuration error carrying the raw body.
fn classify_send(response: ApiResponse<SendMessageResponse>) -> DigitalPostResult<SendMessageResponse> {
    match (response.status, response.body) {
        (200, ResponseBody::Success(sent)) => Ok(sent),
        (200, _) => Err(DigitalPostError::Serialization {
            message: "Response did not contain a send result".to_string(),
        }),
        (400, ResponseBody::Invalid(errors)) => Err(DigitalPostError::from_validation_errors(errors)),
        (400, _) => Err(DigitalPostError::validation(VALIDATION_MESSAGE)),
        (_, body) => Err(DigitalPostError::configuration(
            CONFIGURATION_MESSAGE,
            body.into_raw(),
        )),
    }
}

fn unexpected<T>(response: ApiResponse<T>) -> DigitalPostError {
    let status = response.status;
    match response.body {
        ResponseBody::Success(_) => DigitalPostError::Serialization {
            message: format!("Unexpected success body for HTTP {}", status),
        },
        ResponseBody::Invalid(errors) => TransportError::UnexpectedStatus {
            status,
            body: serde_json::to_string(&errors).unwrap_or_default(),
        }
        .into(),
        ResponseBody::Raw(body) => TransportError::UnexpectedStatus { status, body }.into(),
    }
}

impl std::fmt::Debug for DigitalPostClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DigitalPostClient")
            .field("options", &self.options)
            .field("bound", &self.internal.initialized())
            .finish()
    }
}

/// Builder for the Digital Post client.
pub struct DigitalPostClientBuilder {
    options: Option<DigitalPostOptions>,
    connection: Option<Arc<dyn HttpTransport>>,
    token_provider: Option<Arc<dyn TokenProvider>>,
    factory: Option<Arc<dyn InternalClientFactory>>,
    metrics: Option<Arc<dyn MetricsCollector>>,
    timeout: Duration,
}

impl DigitalPostClientBuilder {
    /// Creates a new client builder.
    pub fn new() -> Self {
        Self {
            options: None,
            connection: None,
            token_provider: None,
            factory: None,
            metrics: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Sets the service options.
    pub fn options(mut self, options: DigitalPostOptions) -> Self {
        self.options = Some(options);
        self
    }

    /// Sets the HTTP connection shared with the token provider.
    pub fn connection(mut self, connection: Arc<dyn HttpTransport>) -> Self {
        self.connection = Some(connection);
        self
    }

    /// Sets the token provider.
    pub fn token_provider(mut self, provider: Arc<dyn TokenProvider>) -> Self {
        self.token_provider = Some(provider);
        self
    }

    /// Sets the factory used to bind the internal client.
    pub fn internal_client_factory(mut self, factory: Arc<dyn InternalClientFactory>) -> Self {
        self.factory = Some(factory);
        self
    }

    /// Sets a custom metrics collector.
    pub fn metrics(mut self, metrics: Arc<dyn MetricsCollector>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Sets the timeout of the default connection.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Builds the client.
    pub fn build(self) -> DigitalPostResult<DigitalPostClient> {
        let options = self
            .options
            .ok_or_else(|| DigitalPostError::invalid_argument("Options are required", "options"))?;

        let token_provider = self.token_provider.ok_or_else(|| {
            DigitalPostError::invalid_argument("A token provider is required", "token_provider")
        })?;

        let connection: Arc<dyn HttpTransport> = match self.connection {
            Some(connection) => connection,
            None => Arc::new(ReqwestTransport::new(self.timeout)?),
        };

        Ok(DigitalPostClient {
            options,
            connection,
            token_provider,
            factory: self
                .factory
                .unwrap_or_else(|| Arc::new(RestInternalClientFactory)),
            internal: OnceCell::new(),
            metrics: self
                .metrics
                .unwrap_or_else(|| Arc::new(DefaultMetricsCollector::new())),
        })
    }
}

impl Default for DigitalPostClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ValidationErrors;
    use uuid::Uuid;

    #[test]
    fn test_classify_ok() {
        let id = Uuid::new_v4();
        let result = classify_send(ApiResponse::ok(SendMessageResponse { message_id: id }));
        assert_eq!(result.unwrap().message_id, id);
    }

    #[test]
    fn test_classify_bad_request() {
        let mut errors = ValidationErrors::new();
        errors.insert("identifier".to_string(), vec!["required".to_string()]);

        let error = classify_send(ApiResponse::bad_request(errors)).unwrap_err();

        assert!(error.is_validation());
        assert!(error.to_string().contains("identifier: required"));
    }

    #[test]
    fn test_classify_bad_request_without_map() {
        let error = classify_send(ApiResponse::raw(400, "<html>")).unwrap_err();

        assert_eq!(error.to_string(), VALIDATION_MESSAGE);
        assert!(error.validation_errors().is_none());
    }

    #[test]
    fn test_classify_other_status() {
        for status in [401, 403, 404, 500, 503] {
            let error = classify_send(ApiResponse::raw(status, "boom")).unwrap_err();
            assert!(error.is_configuration());
            assert_eq!(error.detail(), Some("boom"));
        }
    }

    #[test]
    fn test_builder_requires_options_and_provider() {
        assert!(DigitalPostClient::builder().build().is_err());

        let options = DigitalPostOptions::builder()
            .subscription_id(Uuid::new_v4())
            .build()
            .unwrap();
        let result = DigitalPostClient::builder().options(options).build();
        assert!(matches!(result, Err(DigitalPostError::InvalidArgument { .. })));
    }
}
