//! REST implementation of the internal client.

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::instrument;
use url::Url;
use uuid::Uuid;

use super::{ApiResponse, InternalClient, InternalClientFactory, ResponseBody};
use crate::auth::AccessToken;
use crate::errors::{DigitalPostError, DigitalPostResult, ValidationErrors};
use crate::transport::{
    HttpRequest, HttpResponse, HttpTransport, MultipartPart, MultipartRequest, TransportError,
};
use crate::types::{
    DigitalPostConfiguration, SendDocumentRequest, SendMessageRequest, SendMessageResponse,
    UploadAttachmentResponse,
};

/// Form field carrying uploaded content.
const ATTACHMENT_FIELD: &str = "attachment";

/// Body of a 400 response: either a bare field map or a problem document.
#[derive(Deserialize)]
#[serde(untagged)]
enum ValidationPayload {
    Problem { errors: ValidationErrors },
    Bare(ValidationErrors),
}

/// `InternalClient` over an `HttpTransport`.
pub struct RestInternalClient {
    base_uri: Url,
    credentials: AccessToken,
    connection: Arc<dyn HttpTransport>,
}

impl RestInternalClient {
    /// Creates a client. `base_uri` should end with `/`.
    pub fn new(base_uri: Url, credentials: AccessToken, connection: Arc<dyn HttpTransport>) -> Self {
        Self {
            base_uri,
            credentials,
            connection,
        }
    }

    fn endpoint(&self, subscription_id: Uuid, operation: &str) -> DigitalPostResult<String> {
        let route = format!("subscriptions/{}/digitalpost/{}", subscription_id, operation);
        Ok(self.base_uri.join(&route)?.to_string())
    }

    fn headers(&self) -> HashMap<String, String> {
        let mut headers = HashMap::new();
        headers.insert("Accept".to_string(), "application/json".to_string());
        headers.insert(
            "Authorization".to_string(),
            self.credentials.authorization_header(),
        );
        headers
    }

    async fn post_json<B: serde::Serialize>(
        &self,
        url: String,
        body: &B,
    ) -> DigitalPostResult<ApiResponse<SendMessageResponse>> {
        let mut request = HttpRequest::post(url).with_body(serde_json::to_vec(body)?);
        request.headers = self.headers();
        request
            .headers
            .insert("Content-Type".to_string(), "application/json".to_string());

        let response = self.connection.send(request).await?;
        decode(response)
    }
}

/// Decodes a response according to its status.
///
/// 200 bodies must match `T`; 400 bodies become field violations when they
/// parse as such; everything else is kept verbatim.
fn decode<T: serde::de::DeserializeOwned>(response: HttpResponse) -> DigitalPostResult<ApiResponse<T>> {
    let body = match response.status {
        200 => ResponseBody::Success(response.json()?),
        400 => match response.json::<ValidationPayload>() {
            Ok(ValidationPayload::Problem { errors } | ValidationPayload::Bare(errors)) => {
                ResponseBody::Invalid(errors)
            }
            Err(_) => ResponseBody::Raw(response.text()),
        },
        _ => ResponseBody::Raw(response.text()),
    };

    Ok(ApiResponse {
        status: response.status,
        body,
    })
}

#[async_trait]
impl InternalClient for RestInternalClient {
    #[instrument(skip(self, content), fields(bytes = content.len()))]
    async fn upload_attachment(
        &self,
        subscription_id: Uuid,
        content: Vec<u8>,
    ) -> DigitalPostResult<ApiResponse<UploadAttachmentResponse>> {
        let request = MultipartRequest {
            url: self.endpoint(subscription_id, "attachment")?,
            headers: self.headers(),
            parts: vec![MultipartPart::File {
                name: ATTACHMENT_FIELD.to_string(),
                filename: ATTACHMENT_FIELD.to_string(),
                content_type: mime::APPLICATION_OCTET_STREAM.to_string(),
                data: content,
            }],
            timeout: None,
        };

        let response = self.connection.send_multipart(request).await?;
        decode(response)
    }

    #[instrument(skip(self, request))]
    async fn send_message(
        &self,
        subscription_id: Uuid,
        request: &SendMessageRequest,
    ) -> DigitalPostResult<ApiResponse<SendMessageResponse>> {
        let url = self.endpoint(subscription_id, "message")?;
        self.post_json(url, request).await
    }

    #[instrument(skip(self, request))]
    async fn send_document(
        &self,
        subscription_id: Uuid,
        request: &SendDocumentRequest,
    ) -> DigitalPostResult<ApiResponse<SendMessageResponse>> {
        let url = self.endpoint(subscription_id, "document")?;
        self.post_json(url, request).await
    }

    #[instrument(skip(self))]
    async fn list_configurations(
        &self,
        subscription_id: Uuid,
    ) -> DigitalPostResult<Vec<DigitalPostConfiguration>> {
        let mut request = HttpRequest::get(self.endpoint(subscription_id, "configurations")?);
        request.headers = self.headers();

        let response = self.connection.send(request).await?;
        if response.status != 200 {
            return Err(TransportError::UnexpectedStatus {
                status: response.status,
                body: response.text(),
            }
            .into());
        }

        Ok(response.json()?)
    }
}

impl std::fmt::Debug for RestInternalClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestInternalClient")
            .field("base_uri", &self.base_uri.as_str())
            .field("credentials", &self.credentials)
            .finish()
    }
}

/// Factory for `RestInternalClient`.
#[derive(Debug, Default, Clone, Copy)]
pub struct RestInternalClientFactory;

impl InternalClientFactory for RestInternalClientFactory {
    fn create(
        &self,
        base_uri: &Url,
        credentials: AccessToken,
        connection: Arc<dyn HttpTransport>,
    ) -> DigitalPostResult<Arc<dyn InternalClient>> {
        if base_uri.cannot_be_a_base() {
            return Err(DigitalPostError::invalid_argument(
                "Service URI cannot be used as a base",
                "service_base_uri",
            ));
        }

        Ok(Arc::new(RestInternalClient::new(
            base_uri.clone(),
            credentials,
            connection,
        )))
    }
}
