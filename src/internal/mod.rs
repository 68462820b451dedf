//! Low-level Digital Post REST capability.
//!
//! `InternalClient` performs one HTTP exchange per call and reports the
//! status alongside a typed body. It does not interpret status codes beyond
//! decoding the body; classification is the facade's job.

mod rest;

pub use rest::{RestInternalClient, RestInternalClientFactory};

use async_trait::async_trait;
use std::sync::Arc;
use url::Url;
use uuid::Uuid;

use crate::auth::AccessToken;
use crate::errors::{DigitalPostResult, ValidationErrors};
use crate::transport::HttpTransport;
use crate::types::{
    DigitalPostConfiguration, SendDocumentRequest, SendMessageRequest, SendMessageResponse,
    UploadAttachmentResponse,
};

/// Decoded response body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseBody<T> {
    /// Success payload.
    Success(T),
    /// Field level violations.
    Invalid(ValidationErrors),
    /// Anything else, verbatim.
    Raw(String),
}

impl<T> ResponseBody<T> {
    /// Returns the raw text of a `Raw` body.
    pub fn into_raw(self) -> Option<String> {
        match self {
            ResponseBody::Raw(raw) => Some(raw),
            _ => None,
        }
    }
}

/// Status code and decoded body of one exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse<T> {
    /// HTTP status code.
    pub status: u16,
    /// Decoded body.
    pub body: ResponseBody<T>,
}

impl<T> ApiResponse<T> {
    /// Creates a 200 response.
    pub fn ok(body: T) -> Self {
        Self {
            status: 200,
            body: ResponseBody::Success(body),
        }
    }

    /// Creates a 400 response with field violations.
    pub fn bad_request(errors: ValidationErrors) -> Self {
        Self {
            status: 400,
            body: ResponseBody::Invalid(errors),
        }
    }

    /// Creates a response with a raw body.
    pub fn raw(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: ResponseBody::Raw(body.into()),
        }
    }
}

/// The Digital Post REST operations, bound to a base URI and credential.
#[async_trait]
pub trait InternalClient: Send + Sync {
    /// Uploads attachment content.
    async fn upload_attachment(
        &self,
        subscription_id: Uuid,
        content: Vec<u8>,
    ) -> DigitalPostResult<ApiResponse<UploadAttachmentResponse>>;

    /// Sends a message with inline text.
    async fn send_message(
        &self,
        subscription_id: Uuid,
        request: &SendMessageRequest,
    ) -> DigitalPostResult<ApiResponse<SendMessageResponse>>;

    /// Sends an uploaded document.
    async fn send_document(
        &self,
        subscription_id: Uuid,
        request: &SendDocumentRequest,
    ) -> DigitalPostResult<ApiResponse<SendMessageResponse>>;

    /// Lists the subscription's configurations.
    async fn list_configurations(
        &self,
        subscription_id: Uuid,
    ) -> DigitalPostResult<Vec<DigitalPostConfiguration>>;
}

/// Builds the `InternalClient` a facade binds on first use.
pub trait InternalClientFactory: Send + Sync {
    /// Creates a client bound to `base_uri` and `credentials`.
    fn create(
        &self,
        base_uri: &Url,
        credentials: AccessToken,
        connection: Arc<dyn HttpTransport>,
    ) -> DigitalPostResult<Arc<dyn InternalClient>>;
}
