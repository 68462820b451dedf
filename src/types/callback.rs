//! Callback payload types.
//!
//! When a citizen responds to a message, the service PUTs a `CallbackModel`
//! to the subscriber's callback endpoint. Content is base64 encoded.

use base64::Engine;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::errors::DigitalPostResult;

/// A message received through the callback endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallbackModel {
    /// Reference to the message, used when responding.
    pub identifier: String,
    /// Time of receipt.
    #[serde(rename = "receipDateTime", alias = "receiptDateTime", deserialize_with = "datetime")]
    pub receipt_date_time: DateTime<Utc>,
    /// Message type.
    #[serde(default)]
    pub message_type: Option<String>,
    /// Authority that sent the message.
    #[serde(default)]
    pub sender_name: Option<String>,
    /// Content size in kilobytes, before encoding.
    #[serde(default)]
    pub file_size: i32,
    /// Message title.
    #[serde(default)]
    pub title: Option<String>,
    /// Base64 encoded content.
    #[serde(default)]
    pub content: Option<String>,
    /// Content format, the file suffix such as `pdf`.
    #[serde(default)]
    pub content_type: Option<String>,
    /// Links a response to the original inquiry.
    #[serde(default)]
    pub message_thread_identifier: Option<String>,
    /// Deadline associated with the message.
    #[serde(default, deserialize_with = "optional_datetime")]
    pub deadline: Option<DateTime<Utc>>,
    /// Sender's memo, for example describing the deadline.
    #[serde(default)]
    pub memo_text: Option<String>,
    /// Mailbox metadata.
    #[serde(default)]
    pub mailbox_metadata: Option<MailboxMetadata>,
    /// FESD metadata.
    #[serde(default)]
    pub fesd_metadata: Option<FesdMetadata>,
    /// Number of attachments in the message.
    #[serde(default)]
    pub number_of_attachments: i32,
    /// Attachments.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub attachments: Vec<CallbackAttachment>,
    /// Whether the sender allows a response.
    #[serde(default)]
    pub can_be_responded: bool,
    /// Logic subscription.
    pub subscription_id: Uuid,
    /// e-Boks system identifier.
    #[serde(default)]
    pub system_id: i32,
}

impl CallbackModel {
    /// Parses a callback body.
    pub fn from_json(body: &[u8]) -> DigitalPostResult<Self> {
        Ok(serde_json::from_slice(body)?)
    }

    /// Decodes the message content, if any.
    pub fn decode_content(&self) -> DigitalPostResult<Option<Vec<u8>>> {
        decode(self.content.as_deref())
    }

    /// File name for the message content, `content.<content_type>`.
    pub fn content_file_name(&self) -> String {
        match self.content_type.as_deref() {
            Some(ext) if !ext.is_empty() => format!("content.{}", ext),
            _ => "content".to_string(),
        }
    }
}

/// An attachment of a callback message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallbackAttachment {
    /// Attachment name.
    #[serde(default)]
    pub name: Option<String>,
    /// Content format, the file suffix such as `pdf`.
    #[serde(default)]
    pub content_type: Option<String>,
    /// Base64 encoded content.
    #[serde(default)]
    pub content: Option<String>,
    /// Size in kilobytes, before encoding.
    #[serde(default)]
    pub file_size: i32,
}

impl CallbackAttachment {
    /// Decodes the attachment content, if any.
    pub fn decode_content(&self) -> DigitalPostResult<Option<Vec<u8>>> {
        decode(self.content.as_deref())
    }
}

/// Mailbox metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MailboxMetadata {
    /// Mailbox identifier.
    #[serde(default)]
    pub identifier: Option<String>,
    /// Subject identifier.
    #[serde(default)]
    pub subject_identifier: Option<String>,
    /// Key/value metadata.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub metadata: Vec<MetadataEntry>,
}

impl MailboxMetadata {
    /// Looks up a metadata value by key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.metadata
            .iter()
            .find(|entry| entry.key.as_deref() == Some(key))
            .and_then(|entry| entry.value.as_deref())
    }
}

/// A metadata key/value pair.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataEntry {
    /// Key.
    #[serde(default)]
    pub key: Option<String>,
    /// Value.
    #[serde(default)]
    pub value: Option<String>,
}

/// FESD specific metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FesdMetadata {
    /// Document identifier.
    #[serde(default)]
    pub identifier: Option<String>,
    /// Participant identifier.
    #[serde(default)]
    pub participant_identifier: Option<String>,
    /// Case identifier.
    #[serde(default)]
    pub case_identifier: Option<String>,
    /// Case classification.
    #[serde(default)]
    pub case_classification_identifier: Option<String>,
}

fn decode(content: Option<&str>) -> DigitalPostResult<Option<Vec<u8>>> {
    content
        .map(|c| base64::engine::general_purpose::STANDARD.decode(c.trim()))
        .transpose()
        .map_err(Into::into)
}

// Timestamps arrive either with an offset or as naive UTC.
fn parse_datetime(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f").map(|dt| dt.and_utc()))
}

// Unset lists are sent as `null`.
fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

fn datetime<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_datetime(&raw).map_err(serde::de::Error::custom)
}

fn optional_datetime<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer)?
        .filter(|raw| !raw.is_empty())
        .map(|raw| parse_datetime(&raw).map_err(serde::de::Error::custom))
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};
    use serde_json::json;

    fn payload() -> serde_json::Value {
        json!({
            "identifier": "msg-1",
            "receipDateTime": "2021-03-04T10:11:12",
            "messageType": "Meddelelse",
            "senderName": "Kommune",
            "fileSize": 2,
            "title": "Svar",
            "content": "aGVsbG8=",
            "contentType": "txt",
            "deadline": "2021-04-01T00:00:00+02:00",
            "mailboxMetadata": {
                "identifier": "box",
                "subjectIdentifier": "subject",
                "metadata": [{ "key": "k", "value": "v" }]
            },
            "fesdMetadata": { "caseIdentifier": "case-9" },
            "numberOfAttachments": 1,
            "attachments": [{ "name": "a.txt", "contentType": "txt", "content": "d29ybGQ=", "fileSize": 1 }],
            "canBeResponded": true,
            "subscriptionId": "5b2d2a5e-6c7b-4a8e-9a37-1f7d1c9f2a10",
            "systemId": 42
        })
    }

    #[test]
    fn test_callback_deserializes() {
        let model: CallbackModel = serde_json::from_value(payload()).unwrap();

        assert_eq!(model.identifier, "msg-1");
        assert_eq!(model.receipt_date_time.year(), 2021);
        assert_eq!(model.receipt_date_time.hour(), 10);
        assert_eq!(model.deadline.map(|d| d.hour()), Some(22));
        assert_eq!(model.mailbox_metadata.as_ref().and_then(|m| m.get("k")), Some("v"));
        assert_eq!(
            model.fesd_metadata.and_then(|f| f.case_identifier).as_deref(),
            Some("case-9")
        );
        assert_eq!(model.system_id, 42);
        assert!(model.can_be_responded);
    }

    #[test]
    fn test_callback_decodes_content() {
        let model = CallbackModel::from_json(payload().to_string().as_bytes()).unwrap();

        assert_eq!(model.decode_content().unwrap(), Some(b"hello".to_vec()));
        assert_eq!(model.content_file_name(), "content.txt");
        assert_eq!(
            model.attachments[0].decode_content().unwrap(),
            Some(b"world".to_vec())
        );
    }

    #[test]
    fn test_callback_rejects_bad_base64() {
        let mut value = payload();
        value["content"] = json!("not base64!");
        let model: CallbackModel = serde_json::from_value(value).unwrap();

        assert!(model.decode_content().is_err());
    }

    #[test]
    fn test_callback_null_deadline() {
        let mut value = payload();
        value["deadline"] = serde_json::Value::Null;
        let model: CallbackModel = serde_json::from_value(value).unwrap();

        assert!(model.deadline.is_none());
    }

    #[test]
    fn test_callback_null_lists() {
        let mut value = payload();
        value["attachments"] = serde_json::Value::Null;
        value["mailboxMetadata"]["metadata"] = serde_json::Value::Null;
        let model: CallbackModel = serde_json::from_value(value).unwrap();

        assert!(model.attachments.is_empty());
        let mailbox = model.mailbox_metadata.unwrap();
        assert!(mailbox.metadata.is_empty());
        assert_eq!(mailbox.get("k"), None);
    }

    #[test]
    fn test_callback_missing_lists() {
        let mut value = payload();
        value.as_object_mut().unwrap().remove("attachments");
        value["mailboxMetadata"].as_object_mut().unwrap().remove("metadata");
        let model: CallbackModel = serde_json::from_value(value).unwrap();

        assert!(model.attachments.is_empty());
        assert!(model.mailbox_metadata.unwrap().metadata.is_empty());
    }
}
