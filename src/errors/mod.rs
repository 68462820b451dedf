//! Error types for the Digital Post client.
//!
//! Failures fall into caller-correctable validation errors, service-side
//! configuration errors, and passthrough failures (authentication, transport,
//! serialization) that keep their original classification.

use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;

use crate::transport::TransportError;

/// Result type alias for Digital Post operations.
pub type DigitalPostResult<T> = Result<T, DigitalPostError>;

/// Field name to violation messages, as reported by the service.
pub type ValidationErrors = BTreeMap<String, Vec<String>>;

/// Default message for a validation error.
pub const VALIDATION_MESSAGE: &str = "Invalid digital post parameters";

/// Message carried by every configuration error raised from a send response.
pub const CONFIGURATION_MESSAGE: &str = "Invalid configuration provided to access DigitalPost service";

/// Error type for Digital Post client operations.
#[derive(Debug, Error)]
pub enum DigitalPostError {
    /// The request was rejected, locally or by the service.
    #[error("{message}")]
    Validation {
        /// Human readable summary.
        message: String,
        /// Field level violations, when known.
        errors: Option<ValidationErrors>,
    },

    /// The service rejected the subscription or configuration.
    #[error("{message}")]
    Configuration {
        /// Human readable summary.
        message: String,
        /// Raw response body, for diagnostics only.
        detail: Option<String>,
    },

    /// A bearer token could not be issued.
    #[error("Authentication failed: {message}")]
    Authentication {
        /// Error message.
        message: String,
        /// Raw token endpoint response, if any.
        detail: Option<String>,
    },

    /// The underlying connection failed.
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// A payload could not be encoded or decoded.
    #[error("Serialization error: {message}")]
    Serialization {
        /// Error message.
        message: String,
    },

    /// An argument passed to the client was unusable.
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Error message.
        message: String,
        /// Name of the offending argument.
        param: Option<String>,
    },

    /// The caller-supplied deadline elapsed.
    #[error("Operation timed out after {timeout:?}")]
    Timeout {
        /// The deadline that elapsed.
        timeout: Duration,
    },

    /// The caller cancelled the operation.
    #[error("Operation cancelled")]
    Cancelled,
}

impl DigitalPostError {
    /// Creates a validation error with a plain message.
    pub fn validation(message: impl Into<String>) -> Self {
        DigitalPostError::Validation {
            message: message.into(),
            errors: None,
        }
    }

    /// Creates a validation error from a field map.
    ///
    /// The message lists every field as `field: msg1,msg2`, separated by `;`.
    /// An empty map yields the default message and no field detail.
    pub fn from_validation_errors(errors: ValidationErrors) -> Self {
        if errors.is_empty() {
            return DigitalPostError::validation(VALIDATION_MESSAGE);
        }

        let summary = errors
            .iter()
            .map(|(field, messages)| format!("{}: {}", field, messages.join(",")))
            .collect::<Vec<_>>()
            .join(";");

        DigitalPostError::Validation {
            message: format!("{} ({})", VALIDATION_MESSAGE, summary),
            errors: Some(errors),
        }
    }

    /// Creates a configuration error carrying the raw response body.
    pub fn configuration(message: impl Into<String>, detail: Option<String>) -> Self {
        DigitalPostError::Configuration {
            message: message.into(),
            detail,
        }
    }

    /// Creates an authentication error.
    pub fn authentication(message: impl Into<String>) -> Self {
        DigitalPostError::Authentication {
            message: message.into(),
            detail: None,
        }
    }

    /// Creates an invalid argument error.
    pub fn invalid_argument(message: impl Into<String>, param: impl Into<String>) -> Self {
        DigitalPostError::InvalidArgument {
            message: message.into(),
            param: Some(param.into()),
        }
    }

    /// Returns true for validation errors.
    pub fn is_validation(&self) -> bool {
        matches!(self, DigitalPostError::Validation { .. })
    }

    /// Returns true for configuration errors.
    pub fn is_configuration(&self) -> bool {
        matches!(self, DigitalPostError::Configuration { .. })
    }

    /// Returns the field level violations of a validation error.
    pub fn validation_errors(&self) -> Option<&ValidationErrors> {
        match self {
            DigitalPostError::Validation { errors, .. } => errors.as_ref(),
            _ => None,
        }
    }

    /// Returns the diagnostic detail of a configuration or authentication error.
    pub fn detail(&self) -> Option<&str> {
        match self {
            DigitalPostError::Configuration { detail, .. }
            | DigitalPostError::Authentication { detail, .. } => detail.as_deref(),
            _ => None,
        }
    }

    /// Short, stable name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            DigitalPostError::Validation { .. } => "validation",
            DigitalPostError::Configuration { .. } => "configuration",
            DigitalPostError::Authentication { .. } => "authentication",
            DigitalPostError::Transport(_) => "transport",
            DigitalPostError::Serialization { .. } => "serialization",
            DigitalPostError::InvalidArgument { .. } => "invalid_argument",
            DigitalPostError::Timeout { .. } => "timeout",
            DigitalPostError::Cancelled => "cancelled",
        }
    }
}

impl From<serde_json::Error> for DigitalPostError {
    fn from(err: serde_json::Error) -> Self {
        DigitalPostError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<url::ParseError> for DigitalPostError {
    fn from(err: url::ParseError) -> Self {
        DigitalPostError::InvalidArgument {
            message: format!("Invalid URL: {}", err),
            param: None,
        }
    }
}

impl From<base64::DecodeError> for DigitalPostError {
    fn from(err: base64::DecodeError) -> Self {
        DigitalPostError::Serialization {
            message: format!("Invalid base64 content: {}", err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_message_lists_fields() {
        let mut errors = ValidationErrors::new();
        errors.insert("identifier".to_string(), vec!["required".to_string()]);
        errors.insert(
            "title".to_string(),
            vec!["too long".to_string(), "invalid".to_string()],
        );

        let error = DigitalPostError::from_validation_errors(errors);

        assert_eq!(
            error.to_string(),
            "Invalid digital post parameters (identifier: required;title: too long,invalid)"
        );
        assert_eq!(error.validation_errors().map(|e| e.len()), Some(2));
    }

    #[test]
    fn test_validation_message_without_fields() {
        let error = DigitalPostError::from_validation_errors(ValidationErrors::new());

        assert_eq!(error.to_string(), VALIDATION_MESSAGE);
        assert!(error.validation_errors().is_none());
        assert!(error.is_validation());
    }

    #[test]
    fn test_configuration_detail() {
        let error = DigitalPostError::configuration(CONFIGURATION_MESSAGE, Some("boom".to_string()));

        assert!(error.is_configuration());
        assert_eq!(error.detail(), Some("boom"));
        assert_eq!(error.to_string(), CONFIGURATION_MESSAGE);
    }

    #[test]
    fn test_kinds_are_distinct() {
        let kinds = [
            DigitalPostError::validation("a").kind(),
            DigitalPostError::configuration("b", None).kind(),
            DigitalPostError::authentication("c").kind(),
            DigitalPostError::Transport(TransportError::Connection {
                message: "d".to_string(),
            })
            .kind(),
            DigitalPostError::Cancelled.kind(),
        ];

        let unique: std::collections::HashSet<_> = kinds.iter().collect();
        assert_eq!(unique.len(), kinds.len());
    }

    #[test]
    fn test_serde_error_is_serialization() {
        let err = serde_json::from_str::<u32>("nope").unwrap_err();
        let error: DigitalPostError = err.into();

        assert!(matches!(error, DigitalPostError::Serialization { .. }));
    }
}
