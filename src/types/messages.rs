//! Message and document types.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{DigitalPostError, DigitalPostResult, ValidationErrors};

/// Message used when a document reference is missing or unusable.
pub const NO_DOCUMENT_MESSAGE: &str = "No document provided to transmit";

/// Message used when the document file name has no extension.
pub const NO_EXTENSION_MESSAGE: &str =
    "Unable to determine the file extension for the document being transmitted";

/// Kind of recipient identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IdentifierType {
    /// Citizen identifier.
    Cpr,
    /// Company identifier.
    Cvr,
}

impl std::fmt::Display for IdentifierType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IdentifierType::Cpr => f.write_str("Cpr"),
            IdentifierType::Cvr => f.write_str("Cvr"),
        }
    }
}

/// Reference to previously uploaded content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageAttachment {
    /// Server-issued reference.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_id: Option<Uuid>,
    /// Caller supplied file name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
}

impl MessageAttachment {
    /// Creates an attachment reference.
    pub fn new(reference_id: Uuid, file_name: impl Into<String>) -> Self {
        Self {
            reference_id: Some(reference_id),
            file_name: Some(file_name.into()),
        }
    }
}

/// Returns the extension of the last path component, without the dot.
///
/// Both `/` and `\` separate path components, whatever the host platform.
/// Empty when the name has no `.` or ends with one.
pub fn file_extension(file_name: &str) -> &str {
    let name = file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(file_name);

    match name.rfind('.') {
        Some(index) => &name[index + 1..],
        None => "",
    }
}

/// Wire body of a send-message request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    /// Digital Post configuration.
    pub configuration_id: Uuid,
    /// Kind of recipient identifier.
    pub identifier_type: IdentifierType,
    /// Recipient identifier.
    pub identifier: String,
    /// Inline message text.
    pub message: String,
    /// Message title.
    pub title: String,
    /// Material or document type.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub material_id: Option<String>,
    /// Production unit identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub p_number: Option<String>,
    /// Free-form metadata.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<String>,
    /// Attachments, never empty when present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachments: Option<Vec<MessageAttachment>>,
}

impl SendMessageRequest {
    /// Checks that a configuration is set.
    ///
    /// Empty text fields are left for the service to judge.
    pub fn validate(&self) -> DigitalPostResult<()> {
        require_configuration(self.configuration_id)
    }
}

/// Wire body of a send-document request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendDocumentRequest {
    /// Digital Post configuration.
    pub configuration_id: Uuid,
    /// Kind of recipient identifier.
    pub identifier_type: IdentifierType,
    /// Recipient identifier.
    pub identifier: String,
    /// Reference of the uploaded document.
    pub content_reference_id: Uuid,
    /// Extension of the document, without the dot.
    pub content_extension: String,
    /// Message title.
    pub title: String,
    /// Material or document type.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub material_id: Option<String>,
    /// Production unit identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub p_number: Option<String>,
    /// Free-form metadata.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<String>,
    /// Attachments, never empty when present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachments: Option<Vec<MessageAttachment>>,
}

impl SendDocumentRequest {
    /// Checks that a configuration is set.
    pub fn validate(&self) -> DigitalPostResult<()> {
        require_configuration(self.configuration_id)
    }
}

/// Result of a successful send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageResponse {
    /// Identifier for correlation with the downstream channel.
    pub message_id: Uuid,
}

/// Optional fields shared by messages and documents.
///
/// Unset fields are omitted from the request; an empty attachment list is
/// sent as no attachments at all.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SendOptions {
    /// Material defined in e-Boks, or the Doc2Mail document type.
    pub material_id: Option<String>,
    /// Production unit agreed between sender and receiving company.
    pub p_number: Option<String>,
    /// Metadata attached to the message.
    pub metadata: Option<String>,
    /// Attachments transmitted with the message.
    pub attachments: Vec<MessageAttachment>,
}

impl SendOptions {
    fn attachments_or_none(attachments: Vec<MessageAttachment>) -> Option<Vec<MessageAttachment>> {
        if attachments.is_empty() {
            None
        } else {
            Some(attachments)
        }
    }
}

/// A message with inline text, addressed to a citizen or company.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    /// Kind of recipient identifier.
    pub identifier_type: IdentifierType,
    /// Recipient identifier (CPR/CVR).
    pub identifier: String,
    /// Message title.
    pub title: String,
    /// Message text.
    pub message: String,
    /// Optional fields.
    pub options: SendOptions,
}

impl OutgoingMessage {
    /// Creates a message.
    pub fn new(
        identifier_type: IdentifierType,
        identifier: impl Into<String>,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            identifier_type,
            identifier: identifier.into(),
            title: title.into(),
            message: message.into(),
            options: SendOptions::default(),
        }
    }

    /// Sets the material id.
    pub fn material_id(mut self, material_id: impl Into<String>) -> Self {
        self.options.material_id = Some(material_id.into());
        self
    }

    /// Sets the production unit.
    pub fn p_number(mut self, p_number: impl Into<String>) -> Self {
        self.options.p_number = Some(p_number.into());
        self
    }

    /// Sets the metadata.
    pub fn metadata(mut self, metadata: impl Into<String>) -> Self {
        self.options.metadata = Some(metadata.into());
        self
    }

    /// Replaces the attachments.
    pub fn attachments(mut self, attachments: impl IntoIterator<Item = MessageAttachment>) -> Self {
        self.options.attachments = attachments.into_iter().collect();
        self
    }

    /// Builds the wire request for a configuration.
    pub fn into_request(self, configuration_id: Uuid) -> SendMessageRequest {
        SendMessageRequest {
            configuration_id,
            identifier_type: self.identifier_type,
            identifier: self.identifier,
            message: self.message,
            title: self.title,
            material_id: self.options.material_id,
            p_number: self.options.p_number,
            metadata: self.options.metadata,
            attachments: SendOptions::attachments_or_none(self.options.attachments),
        }
    }
}

/// An uploaded document, addressed to a citizen or company.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingDocument {
    /// Kind of recipient identifier.
    pub identifier_type: IdentifierType,
    /// Recipient identifier (CPR/CVR).
    pub identifier: String,
    /// The uploaded document.
    pub document: Option<MessageAttachment>,
    /// Message title.
    pub title: String,
    /// Optional fields.
    pub options: SendOptions,
}

impl OutgoingDocument {
    /// Creates a document.
    pub fn new(
        identifier_type: IdentifierType,
        identifier: impl Into<String>,
        document: MessageAttachment,
        title: impl Into<String>,
    ) -> Self {
        Self {
            identifier_type,
            identifier: identifier.into(),
            document: Some(document),
            title: title.into(),
            options: SendOptions::default(),
        }
    }

    /// Sets the material id.
    pub fn material_id(mut self, material_id: impl Into<String>) -> Self {
        self.options.material_id = Some(material_id.into());
        self
    }

    /// Sets the production unit.
    pub fn p_number(mut self, p_number: impl Into<String>) -> Self {
        self.options.p_number = Some(p_number.into());
        self
    }

    /// Sets the metadata.
    pub fn metadata(mut self, metadata: impl Into<String>) -> Self {
        self.options.metadata = Some(metadata.into());
        self
    }

    /// Replaces the attachments.
    pub fn attachments(mut self, attachments: impl IntoIterator<Item = MessageAttachment>) -> Self {
        self.options.attachments = attachments.into_iter().collect();
        self
    }

    /// Builds the wire request for a configuration.
    ///
    /// Fails with a validation error when the document reference is unset,
    /// nil, has no file name, or the file name has no extension.
    pub fn into_request(self, configuration_id: Uuid) -> DigitalPostResult<SendDocumentRequest> {
        let (reference_id, file_name) = match self.document {
            Some(MessageAttachment {
                reference_id: Some(reference_id),
                file_name: Some(file_name),
            }) if !reference_id.is_nil() && !file_name.is_empty() => (reference_id, file_name),
            _ => return Err(DigitalPostError::validation(NO_DOCUMENT_MESSAGE)),
        };

        let extension = file_extension(&file_name);
        if extension.is_empty() {
            return Err(DigitalPostError::validation(NO_EXTENSION_MESSAGE));
        }

        Ok(SendDocumentRequest {
            configuration_id,
            identifier_type: self.identifier_type,
            identifier: self.identifier,
            content_reference_id: reference_id,
            content_extension: extension.to_string(),
            title: self.title,
            material_id: self.options.material_id,
            p_number: self.options.p_number,
            metadata: self.options.metadata,
            attachments: SendOptions::attachments_or_none(self.options.attachments),
        })
    }
}

fn require_configuration(configuration_id: Uuid) -> DigitalPostResult<()> {
    if !configuration_id.is_nil() {
        return Ok(());
    }

    let mut errors = ValidationErrors::new();
    errors.insert(
        "configurationId".to_string(),
        vec!["A configuration identifier is required".to_string()],
    );
    Err(DigitalPostError::from_validation_errors(errors))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    #[test_case("letter.pdf", "pdf")]
    #[test_case("archive.tar.gz", "gz")]
    #[test_case("Report.DOCX", "DOCX")]
    #[test_case("dir.v2/scan.png", "png")]
    #[test_case("C:\\docs\\scan.tiff", "tiff")]
    #[test_case(".profile", "profile")]
    #[test_case("noextension", "")]
    #[test_case("trailing.", "")]
    #[test_case("dir.v2/noextension", "")]
    fn test_file_extension(name: &str, expected: &str) {
        assert_eq!(file_extension(name), expected);
    }

    #[test]
    fn test_message_request_omits_unset_fields() {
        let request = OutgoingMessage::new(IdentifierType::Cpr, "0101010000", "Hello", "Hi there")
            .attachments(Vec::new())
            .into_request(Uuid::nil());

        let json = serde_json::to_value(&request).unwrap();
        let object = json.as_object().unwrap();

        assert_eq!(object["identifierType"], "Cpr");
        assert!(!object.contains_key("materialId"));
        assert!(!object.contains_key("pNumber"));
        assert!(!object.contains_key("metadata"));
        assert!(!object.contains_key("attachments"));
    }

    #[test]
    fn test_message_request_keeps_attachments() {
        let attachment = MessageAttachment::new(Uuid::new_v4(), "a.pdf");
        let request = OutgoingMessage::new(IdentifierType::Cvr, "12345678", "Title", "Body")
            .p_number("1003388")
            .attachments(vec![attachment.clone()])
            .into_request(Uuid::new_v4());

        assert_eq!(request.attachments, Some(vec![attachment]));

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["pNumber"], "1003388");
        assert_eq!(json["attachments"][0]["fileName"], "a.pdf");
    }

    #[test]
    fn test_document_request_derives_extension() {
        let reference = Uuid::new_v4();
        let request = OutgoingDocument::new(
            IdentifierType::Cpr,
            "0101010000",
            MessageAttachment::new(reference, "letter.pdf"),
            "Letter",
        )
        .into_request(Uuid::new_v4())
        .unwrap();

        assert_eq!(request.content_reference_id, reference);
        assert_eq!(request.content_extension, "pdf");
        assert_eq!(request.attachments, None);
    }

    #[test]
    fn test_document_request_rejects_missing_reference() {
        let mut document = OutgoingDocument::new(
            IdentifierType::Cpr,
            "0101010000",
            MessageAttachment::new(Uuid::nil(), "letter.pdf"),
            "Letter",
        );

        let error = document.clone().into_request(Uuid::new_v4()).unwrap_err();
        assert_eq!(error.to_string(), NO_DOCUMENT_MESSAGE);

        document.document = None;
        assert!(document.into_request(Uuid::new_v4()).unwrap_err().is_validation());
    }

    #[test]
    fn test_document_request_rejects_missing_extension() {
        let error = OutgoingDocument::new(
            IdentifierType::Cpr,
            "0101010000",
            MessageAttachment::new(Uuid::new_v4(), "letter"),
            "Letter",
        )
        .into_request(Uuid::new_v4())
        .unwrap_err();

        assert_eq!(error.to_string(), NO_EXTENSION_MESSAGE);
    }

    #[test]
    fn test_validate_requires_configuration() {
        let request = OutgoingMessage::new(IdentifierType::Cpr, "0101010000", "Title", "Body")
            .into_request(Uuid::nil());

        let error = request.validate().unwrap_err();
        let errors = error.validation_errors().unwrap();

        assert_eq!(
            errors.keys().map(String::as_str).collect::<Vec<_>>(),
            vec!["configurationId"]
        );
    }

    #[test]
    fn test_validate_leaves_empty_text_to_the_service() {
        let message = OutgoingMessage::new(IdentifierType::Cpr, " ", "", "").into_request(Uuid::new_v4());
        assert!(message.validate().is_ok());

        let document = OutgoingDocument::new(
            IdentifierType::Cvr,
            "",
            MessageAttachment::new(Uuid::new_v4(), "letter.pdf"),
            "",
        )
        .into_request(Uuid::new_v4())
        .unwrap();
        assert!(document.validate().is_ok());
    }

    #[test]
    fn test_send_response_deserializes() {
        let id = Uuid::new_v4();
        let response: SendMessageResponse =
            serde_json::from_value(serde_json::json!({ "messageId": id })).unwrap();

        assert_eq!(response.message_id, id);
    }
}
