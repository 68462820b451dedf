//! Mock implementations for testing.
//!
//! Provides a mock HTTP connection, token provider and internal client so
//! the facade can be exercised without reaching the Digital Post service.

pub mod fixtures;

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use url::Url;
use uuid::Uuid;

use crate::auth::{AccessToken, TokenProvider};
use crate::errors::{DigitalPostError, DigitalPostResult};
use crate::internal::{ApiResponse, InternalClient, InternalClientFactory};
use crate::transport::{
    HttpMethod, HttpRequest, HttpResponse, HttpTransport, MultipartPart, MultipartRequest,
    TransportError,
};
use crate::types::{
    DigitalPostConfiguration, SendDocumentRequest, SendMessageRequest, SendMessageResponse,
    UploadAttachmentResponse,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A recorded request.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    /// HTTP method.
    pub method: HttpMethod,
    /// Absolute URL.
    pub url: String,
    /// Request headers.
    pub headers: HashMap<String, String>,
    /// Request body; for multipart requests, the data of the file parts.
    pub body: Option<Vec<u8>>,
    /// Whether the request was sent as a multipart form.
    pub multipart: bool,
}

/// A mock response.
#[derive(Debug, Clone)]
pub struct MockResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response headers.
    pub headers: HashMap<String, String>,
    /// Response body.
    pub body: Vec<u8>,
}

impl MockResponse {
    /// Creates a 200 JSON response.
    pub fn json<T: serde::Serialize>(value: &T) -> Self {
        let mut headers = HashMap::new();
        headers.insert("content-type".to_string(), "application/json".to_string());

        Self {
            status: 200,
            headers,
            body: serde_json::to_vec(value).unwrap_or_default(),
        }
    }

    /// Creates a plain text response.
    pub fn text(status: u16, body: &str) -> Self {
        let mut headers = HashMap::new();
        headers.insert("content-type".to_string(), "text/plain".to_string());

        Self {
            status,
            headers,
            body: body.as_bytes().to_vec(),
        }
    }

    /// Overrides the status code.
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    /// Adds a header.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers
            .insert(name.to_lowercase(), value.to_string());
        self
    }

    fn into_response(self) -> HttpResponse {
        HttpResponse {
            status: self.status,
            headers: self.headers,
            body: Bytes::from(self.body),
        }
    }
}

/// Mock HTTP connection.
///
/// Queued outcomes are served in order; once the queue is empty the default
/// response is used, or a 500 if none is set.
#[derive(Default)]
pub struct MockTransport {
    outcomes: Mutex<VecDeque<Result<MockResponse, TransportError>>>,
    requests: Mutex<Vec<RecordedRequest>>,
    default_response: Mutex<Option<MockResponse>>,
}

impl MockTransport {
    /// Creates a new mock transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a response.
    pub fn queue(&self, response: MockResponse) {
        lock(&self.outcomes).push_back(Ok(response));
    }

    /// Queues a transport failure.
    pub fn queue_failure(&self, error: TransportError) {
        lock(&self.outcomes).push_back(Err(error));
    }

    /// Sets the default response.
    pub fn set_default(&self, response: MockResponse) {
        *lock(&self.default_response) = Some(response);
    }

    /// Gets all recorded requests.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        lock(&self.requests).clone()
    }

    /// Gets the last recorded request.
    pub fn last_request(&self) -> Option<RecordedRequest> {
        lock(&self.requests).last().cloned()
    }

    /// Returns the number of requests made.
    pub fn request_count(&self) -> usize {
        lock(&self.requests).len()
    }

    fn next_outcome(&self) -> Result<HttpResponse, TransportError> {
        if let Some(outcome) = lock(&self.outcomes).pop_front() {
            return outcome.map(MockResponse::into_response);
        }

        let response = lock(&self.default_response)
            .clone()
            .unwrap_or_else(|| MockResponse::text(500, "No mock response configured"));
        Ok(response.into_response())
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        lock(&self.requests).push(RecordedRequest {
            method: request.method,
            url: request.url,
            headers: request.headers,
            body: request.body,
            multipart: false,
        });

        self.next_outcome()
    }

    async fn send_multipart(
        &self,
        request: MultipartRequest,
    ) -> Result<HttpResponse, TransportError> {
        let data = request
            .parts
            .into_iter()
            .filter_map(|part| match part {
                MultipartPart::File { data, .. } => Some(data),
                MultipartPart::Text { .. } => None,
            })
            .flatten()
            .collect();

        lock(&self.requests).push(RecordedRequest {
            method: HttpMethod::Post,
            url: request.url,
            headers: request.headers,
            body: Some(data),
            multipart: true,
        });

        self.next_outcome()
    }
}

/// Mock token provider.
///
/// Hands out `mock-access-token` and counts how often it was asked.
#[derive(Default)]
pub struct MockTokenProvider {
    calls: AtomicUsize,
    failure: Mutex<Option<DigitalPostError>>,
    delay: Option<Duration>,
}

impl MockTokenProvider {
    /// Token returned by every successful call.
    pub const TOKEN: &'static str = "mock-access-token";

    /// Creates a new provider.
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits `delay` before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Fails the next call with `error`.
    pub fn fail_next(&self, error: DigitalPostError) {
        *lock(&self.failure) = Some(error);
    }

    /// Returns the number of token requests.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TokenProvider for MockTokenProvider {
    async fn get_token(&self, _connection: &dyn HttpTransport) -> DigitalPostResult<AccessToken> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let failure = lock(&self.failure).take();
        match failure {
            Some(error) => Err(error),
            None => Ok(AccessToken::new(Self::TOKEN)),
        }
    }
}

/// Mock internal client.
///
/// Queued results are served per operation; when a queue is empty the
/// matching fixture is returned.
#[derive(Default)]
pub struct MockInternalClient {
    uploads: Mutex<VecDeque<DigitalPostResult<ApiResponse<UploadAttachmentResponse>>>>,
    sends: Mutex<VecDeque<DigitalPostResult<ApiResponse<SendMessageResponse>>>>,
    configurations: Mutex<VecDeque<DigitalPostResult<Vec<DigitalPostConfiguration>>>>,
    uploaded: Mutex<Vec<Vec<u8>>>,
    messages: Mutex<Vec<SendMessageRequest>>,
    documents: Mutex<Vec<SendDocumentRequest>>,
    subscriptions: Mutex<Vec<Uuid>>,
}

impl MockInternalClient {
    /// Creates a new mock client.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues an upload result.
    pub fn queue_upload(&self, result: DigitalPostResult<ApiResponse<UploadAttachmentResponse>>) {
        lock(&self.uploads).push_back(result);
    }

    /// Queues a result for the next message or document send.
    pub fn queue_send(&self, result: DigitalPostResult<ApiResponse<SendMessageResponse>>) {
        lock(&self.sends).push_back(result);
    }

    /// Queues a configuration listing result.
    pub fn queue_configurations(&self, result: DigitalPostResult<Vec<DigitalPostConfiguration>>) {
        lock(&self.configurations).push_back(result);
    }

    /// Uploaded contents, in call order.
    pub fn uploaded(&self) -> Vec<Vec<u8>> {
        lock(&self.uploaded).clone()
    }

    /// Sent message requests, in call order.
    pub fn sent_messages(&self) -> Vec<SendMessageRequest> {
        lock(&self.messages).clone()
    }

    /// Sent document requests, in call order.
    pub fn sent_documents(&self) -> Vec<SendDocumentRequest> {
        lock(&self.documents).clone()
    }

    /// Subscription ids seen by any operation, in call order.
    pub fn subscriptions(&self) -> Vec<Uuid> {
        lock(&self.subscriptions).clone()
    }

    /// Total number of operations invoked.
    pub fn call_count(&self) -> usize {
        lock(&self.subscriptions).len()
    }

    fn next_send(&self) -> DigitalPostResult<ApiResponse<SendMessageResponse>> {
        lock(&self.sends)
            .pop_front()
            .unwrap_or_else(|| Ok(ApiResponse::ok(fixtures::send_message_response())))
    }
}

#[async_trait]
impl InternalClient for MockInternalClient {
    async fn upload_attachment(
        &self,
        subscription_id: Uuid,
        content: Vec<u8>,
    ) -> DigitalPostResult<ApiResponse<UploadAttachmentResponse>> {
        lock(&self.subscriptions).push(subscription_id);
        lock(&self.uploaded).push(content);

        lock(&self.uploads)
            .pop_front()
            .unwrap_or_else(|| Ok(ApiResponse::ok(fixtures::upload_response())))
    }

    async fn send_message(
        &self,
        subscription_id: Uuid,
        request: &SendMessageRequest,
    ) -> DigitalPostResult<ApiResponse<SendMessageResponse>> {
        lock(&self.subscriptions).push(subscription_id);
        lock(&self.messages).push(request.clone());
        self.next_send()
    }

    async fn send_document(
        &self,
        subscription_id: Uuid,
        request: &SendDocumentRequest,
    ) -> DigitalPostResult<ApiResponse<SendMessageResponse>> {
        lock(&self.subscriptions).push(subscription_id);
        lock(&self.documents).push(request.clone());
        self.next_send()
    }

    async fn list_configurations(
        &self,
        subscription_id: Uuid,
    ) -> DigitalPostResult<Vec<DigitalPostConfiguration>> {
        lock(&self.subscriptions).push(subscription_id);

        lock(&self.configurations)
            .pop_front()
            .unwrap_or_else(|| Ok(fixtures::configurations()))
    }
}

/// Mock factory that always hands out the same `MockInternalClient`.
pub struct MockInternalClientFactory {
    client: Arc<MockInternalClient>,
    creations: AtomicUsize,
    tokens: Mutex<Vec<String>>,
    base_uris: Mutex<Vec<Url>>,
}

impl MockInternalClientFactory {
    /// Creates a factory around `client`.
    pub fn new(client: Arc<MockInternalClient>) -> Self {
        Self {
            client,
            creations: AtomicUsize::new(0),
            tokens: Mutex::new(Vec::new()),
            base_uris: Mutex::new(Vec::new()),
        }
    }

    /// Returns the number of clients created.
    pub fn creation_count(&self) -> usize {
        self.creations.load(Ordering::SeqCst)
    }

    /// Tokens the clients were bound with.
    pub fn tokens(&self) -> Vec<String> {
        lock(&self.tokens).clone()
    }

    /// Base URIs the clients were bound to.
    pub fn base_uris(&self) -> Vec<Url> {
        lock(&self.base_uris).clone()
    }
}

impl InternalClientFactory for MockInternalClientFactory {
    fn create(
        &self,
        base_uri: &Url,
        credentials: AccessToken,
        _connection: Arc<dyn HttpTransport>,
    ) -> DigitalPostResult<Arc<dyn InternalClient>> {
        self.creations.fetch_add(1, Ordering::SeqCst);
        lock(&self.tokens).push(credentials.secret().to_string());
        lock(&self.base_uris).push(base_uri.clone());

        let client: Arc<dyn InternalClient> = self.client.clone();
        Ok(client)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_transport_serves_queue_then_default() {
        let transport = MockTransport::new();
        transport.queue(MockResponse::text(201, "first"));
        transport.set_default(MockResponse::text(204, ""));

        let first = transport.send(HttpRequest::get("https://a.test/")).await.unwrap();
        let second = transport.send(HttpRequest::get("https://b.test/")).await.unwrap();

        assert_eq!(first.status, 201);
        assert_eq!(second.status, 204);
        assert_eq!(transport.request_count(), 2);
        assert_eq!(transport.last_request().unwrap().url, "https://b.test/");
    }

    #[tokio::test]
    async fn test_mock_transport_without_responses() {
        let transport = MockTransport::new();
        let response = transport.send(HttpRequest::get("https://a.test/")).await.unwrap();
        assert_eq!(response.status, 500);
    }

    #[tokio::test]
    async fn test_mock_token_provider_fails_once() {
        let transport = MockTransport::new();
        let provider = MockTokenProvider::new();
        provider.fail_next(DigitalPostError::authentication("denied"));

        assert!(provider.get_token(&transport).await.is_err());
        assert_eq!(
            provider.get_token(&transport).await.unwrap().secret(),
            MockTokenProvider::TOKEN
        );
        assert_eq!(provider.call_count(), 2);
    }
}
