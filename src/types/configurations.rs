//! Configuration descriptor types.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A Digital Post configuration of a subscription.
///
/// Describes the downstream channel and environment messages are routed
/// through.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DigitalPostConfiguration {
    /// Configuration identifier.
    pub id: Uuid,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Downstream environment.
    #[serde(default)]
    pub environment: String,
}
