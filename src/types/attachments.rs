//! Attachment upload types.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{DigitalPostError, DigitalPostResult};
use crate::types::messages::MessageAttachment;

/// Result of uploading attachment content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadAttachmentResponse {
    /// Server-issued reference, absent when the upload produced nothing usable.
    #[serde(default)]
    pub reference_id: Option<Uuid>,
}

impl UploadAttachmentResponse {
    /// Converts the upload into a reusable attachment reference.
    ///
    /// An attachment may be referenced by any number of later sends.
    pub fn to_attachment(&self, file_name: &str) -> DigitalPostResult<MessageAttachment> {
        to_attachment(Some(self), file_name)
    }
}

/// Converts an upload result into an attachment reference.
///
/// Fails when the upload is absent, carries no reference, or `file_name` is
/// empty.
pub fn to_attachment(
    upload: Option<&UploadAttachmentResponse>,
    file_name: &str,
) -> DigitalPostResult<MessageAttachment> {
    let upload = upload.ok_or_else(|| {
        DigitalPostError::invalid_argument("An upload response is required", "response")
    })?;

    let reference_id = upload.reference_id.ok_or_else(|| {
        DigitalPostError::invalid_argument("Transmission of attachment failed", "response")
    })?;

    if file_name.is_empty() {
        return Err(DigitalPostError::invalid_argument(
            "A file name is required",
            "file_name",
        ));
    }

    Ok(MessageAttachment::new(reference_id, file_name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_attachment_success() {
        let reference = Uuid::new_v4();
        let upload = UploadAttachmentResponse {
            reference_id: Some(reference),
        };

        let attachment = upload.to_attachment("letter.pdf").unwrap();

        assert_eq!(attachment, MessageAttachment::new(reference, "letter.pdf"));
    }

    #[test]
    fn test_to_attachment_requires_upload() {
        let result = to_attachment(None, "letter.pdf");
        assert!(matches!(result, Err(DigitalPostError::InvalidArgument { .. })));
    }

    #[test]
    fn test_to_attachment_requires_reference() {
        let upload = UploadAttachmentResponse { reference_id: None };

        let error = upload.to_attachment("letter.pdf").unwrap_err();

        assert!(error.to_string().contains("Transmission of attachment failed"));
    }

    #[test]
    fn test_to_attachment_requires_file_name() {
        let upload = UploadAttachmentResponse {
            reference_id: Some(Uuid::new_v4()),
        };

        assert!(upload.to_attachment("").is_err());
    }
}
