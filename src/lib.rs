//! Digital Post Client Library
//!
//! A Rust client for the Logic Digital Post service, which delivers messages
//! and documents to the digital mailboxes of Danish citizens (CPR) and
//! companies (CVR).
//!
//! # Features
//!
//! - **Messages**: Send text messages with optional attachments
//! - **Documents**: Upload content once, send it as a document or attachment any number of times
//! - **Configurations**: List the Digital Post configurations of a subscription
//! - **Authentication**: OAuth2 client credentials with token caching, or a static token
//! - **Typed Errors**: Validation and configuration failures kept apart from transport failures
//! - **Observability**: Tracing spans, structured logging and request metrics
//! - **Async/Await**: Built on Tokio; every call accepts a deadline and a cancellation token
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use digitalpost_client::{
//!     ClientCredentialsConfig, ClientCredentialsTokenProvider, DigitalPostClient,
//!     DigitalPostOptions, IdentifierType, OutgoingDocument,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = DigitalPostClient::builder()
//!         .options(DigitalPostOptions::from_env()?)
//!         .token_provider(Arc::new(ClientCredentialsTokenProvider::new(
//!             ClientCredentialsConfig::from_env()?,
//!         )))
//!         .build()?;
//!
//!     let mut file = tokio::fs::File::open("invoice.pdf").await?;
//!     let upload = client.upload_attachment(&mut file).await?;
//!     let document = upload.to_attachment("invoice.pdf")?;
//!
//!     let sent = client
//!         .send_document(OutgoingDocument::new(
//!             IdentifierType::Cvr,
//!             "12345678",
//!             document,
//!             "Invoice",
//!         ))
//!         .await?;
//!     println!("{}", sent.message_id);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod auth;
pub mod client;
pub mod config;
pub mod errors;
pub mod internal;
pub mod observability;
pub mod transport;
pub mod types;

// Re-exports for convenience
pub use auth::{AccessToken, ClientCredentialsTokenProvider, StaticTokenProvider, TokenProvider};
pub use client::{CallOptions, DigitalPostClient, DigitalPostClientBuilder};
pub use config::{ClientCredentialsConfig, DigitalPostOptions, DigitalPostOptionsBuilder};
pub use errors::{DigitalPostError, DigitalPostResult, ValidationErrors};
pub use internal::{InternalClient, InternalClientFactory, RestInternalClientFactory};
pub use observability::{LogConfig, LogFormat, LogLevel};
pub use transport::{HttpTransport, ReqwestTransport, TransportError};

// Type re-exports
pub use types::{
    to_attachment, CallbackAttachment, CallbackModel, DigitalPostConfiguration, FesdMetadata,
    IdentifierType, MailboxMetadata, MessageAttachment, MetadataEntry, OutgoingDocument,
    OutgoingMessage, SendMessageResponse, SendOptions, UploadAttachmentResponse,
};

/// Mock implementations for testing.
pub mod mocks;
