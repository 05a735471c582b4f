//! Request/response payloads for the remote store API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockroom_core::inventory::{CustomFieldDefinition, InventoryItem};

/// Error envelope returned by the API on failure.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorResponse {
    pub error: String,
    pub code: String,
    pub message: String,
}

/// Body for the ensure-row upsert: an empty row inserted only when the
/// identity has none yet.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnsureRowRequest {
    pub identity: String,
    pub inventory: Vec<InventoryItem>,
    pub custom_fields: Vec<CustomFieldDefinition>,
    pub updated_at: DateTime<Utc>,
}

impl EnsureRowRequest {
    pub fn empty(identity: &str) -> Self {
        Self {
            identity: identity.to_string(),
            inventory: Vec::new(),
            custom_fields: Vec::new(),
            updated_at: Utc::now(),
        }
    }
}

/// Body for the full-snapshot save upsert.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveRowRequest<'a> {
    pub inventory: &'a [InventoryItem],
    pub custom_fields: &'a [CustomFieldDefinition],
    pub updated_at: DateTime<Utc>,
}
