//! Request and response types for the Digital Post API.

pub mod attachments;
pub mod callback;
pub mod configurations;
pub mod messages;

pub use attachments::{to_attachment, UploadAttachmentResponse};
pub use callback::{CallbackAttachment, CallbackModel, FesdMetadata, MailboxMetadata, MetadataEntry};
pub use configurations::DigitalPostConfiguration;
pub use messages::{
    file_extension, IdentifierType, MessageAttachment, OutgoingDocument, OutgoingMessage,
    SendDocumentRequest, SendMessageRequest, SendMessageResponse, SendOptions,
};
