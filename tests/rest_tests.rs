//! Tests for the default REST path against a mock Digital Post server.

use digitalpost_client::{
    ClientCredentialsConfig, ClientCredentialsTokenProvider, DigitalPostClient, DigitalPostError,
    DigitalPostOptions, IdentifierType, MessageAttachment, OutgoingDocument, OutgoingMessage,
    StaticTokenProvider, TokenProvider, TransportError,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;
use wiremock::matchers::{
    body_partial_json, body_string_contains, header, header_regex, method, path,
};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SUBSCRIPTION: Uuid = Uuid::from_u128(0x1111_2222_3333_4444_5555_6666_7777_8888);
const CONFIGURATION: Uuid = Uuid::from_u128(0x9999_aaaa_bbbb_cccc_dddd_eeee_ffff_0000);

fn route(operation: &str) -> String {
    format!(
        "/digital-post/v1/subscriptions/{}/digitalpost/{}",
        SUBSCRIPTION, operation
    )
}

fn options(server: &MockServer) -> DigitalPostOptions {
    DigitalPostOptions::builder()
        .service_base_uri(format!("{}/digital-post/v1", server.uri()))
        .subscription_id(SUBSCRIPTION)
        .configuration_id(CONFIGURATION)
        .build()
        .unwrap()
}

fn client_with(server: &MockServer, provider: Arc<dyn TokenProvider>) -> DigitalPostClient {
    DigitalPostClient::builder()
        .options(options(server))
        .token_provider(provider)
        .timeout(Duration::from_secs(5))
        .build()
        .unwrap()
}

fn client(server: &MockServer) -> DigitalPostClient {
    client_with(server, Arc::new(StaticTokenProvider::new("static-token")))
}

fn message() -> OutgoingMessage {
    OutgoingMessage::new(IdentifierType::Cpr, "0101501234", "Hello", "Hello from Logic")
}

#[tokio::test]
async fn test_send_message_success() {
    let server = MockServer::start().await;
    let message_id = Uuid::new_v4();

    Mock::given(method("POST"))
        .and(path(route("message")))
        .and(header("authorization", "Bearer static-token"))
        .and(body_partial_json(json!({
            "configurationId": CONFIGURATION,
            "identifierType": "Cpr",
            "identifier": "0101501234",
            "title": "Hello",
            "message": "Hello from Logic",
            "pNumber": "1000000001"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "messageId": message_id })))
        .expect(1)
        .mount(&server)
        .await;

    let result = client(&server)
        .send_message(message().p_number("1000000001"))
        .await
        .unwrap();

    assert_eq!(result.message_id, message_id);
}

#[tokio::test]
async fn test_send_message_omits_absent_fields() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(route("message")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "messageId": Uuid::new_v4() })))
        .mount(&server)
        .await;

    client(&server)
        .send_message(message().attachments(Vec::new()))
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    let fields = body.as_object().unwrap();
    assert!(!fields.contains_key("attachments"));
    assert!(!fields.contains_key("materialId"));
    assert!(!fields.contains_key("pNumber"));
    assert!(!fields.contains_key("metadata"));
}

#[tokio::test]
async fn test_send_message_bad_request() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(route("message")))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "type": "https://tools.ietf.org/html/rfc7231#section-6.5.1",
            "title": "One or more validation errors occurred.",
            "status": 400,
            "errors": { "identifier": ["required"] }
        })))
        .mount(&server)
        .await;

    let error = client(&server).send_message(message()).await.unwrap_err();

    assert!(error.is_validation());
    assert_eq!(
        error.to_string(),
        "Invalid digital post parameters (identifier: required)"
    );
}

#[tokio::test]
async fn test_send_document_server_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(route("document")))
        .and(body_partial_json(json!({ "contentExtension": "PDF" })))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let document = OutgoingDocument::new(
        IdentifierType::Cvr,
        "12345678",
        MessageAttachment::new(Uuid::new_v4(), "C:\\letters\\Letter.PDF"),
        "Letter",
    );

    let error = client(&server).send_document(document).await.unwrap_err();

    assert!(error.is_configuration());
    assert_eq!(error.detail(), Some("boom"));
}

#[tokio::test]
async fn test_upload_attachment_multipart() {
    let server = MockServer::start().await;
    let reference_id = Uuid::new_v4();

    Mock::given(method("POST"))
        .and(path(route("attachment")))
        .and(header_regex("content-type", "^multipart/form-data; boundary="))
        .and(body_string_contains("name=\"attachment\""))
        .and(body_string_contains("attachment content"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "referenceId": reference_id })))
        .expect(1)
        .mount(&server)
        .await;

    let mut stream: &[u8] = b"attachment content";
    let upload = client(&server).upload_attachment(&mut stream).await.unwrap();

    assert_eq!(upload.reference_id, Some(reference_id));
}

#[tokio::test]
async fn test_get_all_configurations() {
    let server = MockServer::start().await;
    let first = Uuid::new_v4();
    let second = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path(route("configurations")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": second, "name": "Test", "environment": "Test" },
            { "id": first, "name": "Production", "environment": "Production" }
        ])))
        .mount(&server)
        .await;

    let configurations = client(&server).get_all_configurations().await.unwrap();

    let ids: Vec<Uuid> = configurations.iter().map(|c| c.id).collect();
    assert_eq!(ids, vec![second, first]);
    assert_eq!(configurations[1].name, "Production");
}

#[tokio::test]
async fn test_get_all_configurations_forbidden() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(route("configurations")))
        .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
        .mount(&server)
        .await;

    let error = client(&server).get_all_configurations().await.unwrap_err();

    assert!(matches!(
        error,
        DigitalPostError::Transport(TransportError::UnexpectedStatus { status: 403, .. })
    ));
}

#[tokio::test]
async fn test_client_credentials_token_requested_once() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .and(body_string_contains("grant_type=client_credentials"))
        .and(body_string_contains("client_id=logic-client"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "issued-token",
            "token_type": "Bearer",
            "expires_in": 3600
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(route("configurations")))
        .and(header("authorization", "Bearer issued-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(3)
        .mount(&server)
        .await;

    let config = ClientCredentialsConfig::builder()
        .token_endpoint(format!("{}/oauth2/token", server.uri()))
        .client_id("logic-client")
        .client_secret("logic-secret")
        .build()
        .unwrap();
    let client = client_with(&server, Arc::new(ClientCredentialsTokenProvider::new(config)));

    for _ in 0..3 {
        assert!(client.get_all_configurations().await.unwrap().is_empty());
    }
}

#[tokio::test]
async fn test_client_credentials_rejected() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .respond_with(ResponseTemplate::new(401).set_body_string("{\"error\":\"invalid_client\"}"))
        .mount(&server)
        .await;

    let config = ClientCredentialsConfig::builder()
        .token_endpoint(format!("{}/oauth2/token", server.uri()))
        .client_id("logic-client")
        .client_secret("wrong")
        .build()
        .unwrap();
    let client = client_with(&server, Arc::new(ClientCredentialsTokenProvider::new(config)));

    let error = client.get_all_configurations().await.unwrap_err();

    assert!(matches!(error, DigitalPostError::Authentication { .. }));
    assert_eq!(error.detail(), Some("{\"error\":\"invalid_client\"}"));
}
