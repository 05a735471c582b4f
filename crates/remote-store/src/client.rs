//! Remote store API client.
//!
//! Implements the read/upsert contract the sync engine persists through:
//! ensure-row (insert-if-absent), point read, and full-snapshot save.

use log::debug;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use std::time::Duration;

use chrono::Utc;
use stockroom_core::errors::PersistenceError;
use stockroom_core::inventory::{CustomFieldDefinition, InventoryItem};
use stockroom_core::sync::{InventoryRow, RemoteInventoryStore};

use crate::error::{RemoteStoreError, Result};
use crate::types::{ApiErrorResponse, EnsureRowRequest, SaveRowRequest};

/// Default timeout for API requests.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Client for the remote inventory store API.
#[derive(Debug, Clone)]
pub struct RemoteStoreClient {
    client: reqwest::Client,
    base_url: String,
    access_token: String,
}

impl RemoteStoreClient {
    /// Create a new client.
    ///
    /// # Arguments
    ///
    /// * `base_url` - The base URL of the store API (e.g., "https://api.stockroom.app")
    /// * `access_token` - Bearer token for the signed-in identity
    pub fn new(base_url: &str, access_token: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            access_token: access_token.to_string(),
        }
    }

    /// Create headers for an API request.
    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let auth_value = HeaderValue::from_str(&format!("Bearer {}", self.access_token))
            .map_err(|_| RemoteStoreError::auth("Invalid access token format"))?;
        headers.insert(AUTHORIZATION, auth_value);

        Ok(headers)
    }

    fn row_url(&self, identity: &str) -> String {
        format!("{}/api/v1/inventory/rows/{}", self.base_url, identity)
    }

    /// Turn a failed response into the API error carried in its envelope.
    async fn error_from_response(response: reqwest::Response) -> RemoteStoreError {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        if let Ok(error) = serde_json::from_str::<ApiErrorResponse>(&body) {
            return RemoteStoreError::api(status, format!("{}: {}", error.code, error.message));
        }
        RemoteStoreError::api(status, format!("Request failed: {}", body))
    }

    /// Parse a JSON response body.
    async fn parse_response<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let status = response.status();
        if !status.is_success() {
            return Err(Self::error_from_response(response).await);
        }
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| {
            log::error!("Failed to deserialize response. Body: {}, Error: {}", body, e);
            RemoteStoreError::api(status.as_u16(), format!("Failed to parse response: {}", e))
        })
    }

    /// Insert an empty row for the identity if none exists.
    ///
    /// The endpoint upserts with conflict target = identity and
    /// ignore-if-exists semantics; a 409 from the server likewise means the
    /// row already exists and is success here. Existing data is never
    /// overwritten.
    ///
    /// POST /api/v1/inventory/rows
    pub async fn ensure_row(&self, identity: &str) -> Result<()> {
        let url = format!("{}/api/v1/inventory/rows", self.base_url);
        debug!("[RemoteStore] Ensuring row for '{}'", identity);

        let response = self
            .client
            .post(&url)
            .headers(self.headers()?)
            .json(&EnsureRowRequest::empty(identity))
            .send()
            .await?;

        let status = response.status();
        if status.is_success() || status.as_u16() == 409 {
            return Ok(());
        }
        Err(Self::error_from_response(response).await)
    }

    /// Point lookup; a 404 reads as absent, not an error.
    ///
    /// GET /api/v1/inventory/rows/{identity}
    pub async fn read_row(&self, identity: &str) -> Result<Option<InventoryRow>> {
        let response = self
            .client
            .get(self.row_url(identity))
            .headers(self.headers()?)
            .send()
            .await?;

        if response.status().as_u16() == 404 {
            debug!("[RemoteStore] No row for '{}'", identity);
            return Ok(None);
        }
        Ok(Some(Self::parse_response(response).await?))
    }

    /// Full-snapshot overwrite upsert. No partial updates.
    ///
    /// PUT /api/v1/inventory/rows/{identity}
    pub async fn save_row(
        &self,
        identity: &str,
        inventory: &[InventoryItem],
        custom_fields: &[CustomFieldDefinition],
    ) -> Result<()> {
        debug!(
            "[RemoteStore] Saving {} items for '{}'",
            inventory.len(),
            identity
        );
        let response = self
            .client
            .put(self.row_url(identity))
            .headers(self.headers()?)
            .json(&SaveRowRequest {
                inventory,
                custom_fields,
                updated_at: Utc::now(),
            })
            .send()
            .await?;

        if response.status().is_success() {
            return Ok(());
        }
        Err(Self::error_from_response(response).await)
    }
}

#[async_trait::async_trait]
impl RemoteInventoryStore for RemoteStoreClient {
    async fn ensure_row(&self, identity: &str) -> std::result::Result<(), PersistenceError> {
        RemoteStoreClient::ensure_row(self, identity)
            .await
            .map_err(PersistenceError::from)
    }

    async fn read_row(
        &self,
        identity: &str,
    ) -> std::result::Result<Option<InventoryRow>, PersistenceError> {
        RemoteStoreClient::read_row(self, identity)
            .await
            .map_err(PersistenceError::from)
    }

    async fn save_row(
        &self,
        identity: &str,
        inventory: &[InventoryItem],
        custom_fields: &[CustomFieldDefinition],
    ) -> std::result::Result<(), PersistenceError> {
        RemoteStoreClient::save_row(self, identity, inventory, custom_fields)
            .await
            .map_err(PersistenceError::from)
    }
}
