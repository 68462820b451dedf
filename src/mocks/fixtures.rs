//! Test fixtures for the Digital Post client.

use uuid::Uuid;

use crate::errors::ValidationErrors;
use crate::types::{
    DigitalPostConfiguration, IdentifierType, MessageAttachment, OutgoingDocument,
    OutgoingMessage, SendMessageResponse, UploadAttachmentResponse,
};

/// Message id returned by the default send fixture.
pub const MESSAGE_ID: Uuid = Uuid::from_u128(0x6f1c_2a0e_8f3b_4d5e_9a7c_1b2d_3e4f_5a6b);

/// Reference id returned by the default upload fixture.
pub const REFERENCE_ID: Uuid = Uuid::from_u128(0x0d9e_8c7b_6a59_4837_a261_5f4e_3d2c_1b0a);

/// A successful send.
pub fn send_message_response() -> SendMessageResponse {
    SendMessageResponse {
        message_id: MESSAGE_ID,
    }
}

/// A successful upload.
pub fn upload_response() -> UploadAttachmentResponse {
    UploadAttachmentResponse {
        reference_id: Some(REFERENCE_ID),
    }
}

/// Two configurations, in service order.
pub fn configurations() -> Vec<DigitalPostConfiguration> {
    vec![
        DigitalPostConfiguration {
            id: Uuid::from_u128(1),
            name: "e-Boks production".to_string(),
            environment: "Production".to_string(),
        },
        DigitalPostConfiguration {
            id: Uuid::from_u128(2),
            name: "e-Boks test".to_string(),
            environment: "Test".to_string(),
        },
    ]
}

/// Field violations as a BadRequest body would carry them.
pub fn validation_errors() -> ValidationErrors {
    let mut errors = ValidationErrors::new();
    errors.insert(
        "identifier".to_string(),
        vec!["The Identifier field is required.".to_string()],
    );
    errors.insert(
        "title".to_string(),
        vec!["The field Title must be a string with a maximum length of 50.".to_string()],
    );
    errors
}

/// A complete message to a citizen.
pub fn outgoing_message() -> OutgoingMessage {
    OutgoingMessage::new(
        IdentifierType::Cpr,
        "0101501234",
        "Your appointment",
        "Your appointment is confirmed.",
    )
}

/// A complete document send to a company, referencing the upload fixture.
pub fn outgoing_document() -> OutgoingDocument {
    OutgoingDocument::new(
        IdentifierType::Cvr,
        "12345678",
        MessageAttachment::new(REFERENCE_ID, "invoice.pdf"),
        "Invoice",
    )
}
