//! Server-authoritative cart API client.
//!
//! Once a visitor is signed in the server cart is the single writer of
//! record; this module is the REST client for it plus the [`RemoteCart`]
//! trait the service depends on, so tests can swap in a double.
//!
//! Failures propagate to the caller as-is - there is no retry or
//! backoff at this layer; the UI decides whether to retry the specific
//! action.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::instrument;

use pawtrait_core::CartLineId;

use crate::cart::line::{CartLine, StoredCartLine, resolve_stored_lines};
use crate::config::StorefrontConfig;

/// Errors that can occur when talking to the cart API.
#[derive(Debug, Error)]
pub enum RemoteCartError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Failed to parse a response body.
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Outcome of a migration batch.
///
/// The server attempts every submitted line and reports the ones it
/// could not accept; the batch as a whole still counts as attempted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MigrationOutcome {
    /// Number of lines accepted into the server cart.
    pub migrated: u32,
    /// Lines the server rejected, with reasons.
    #[serde(default)]
    pub failed: Vec<MigrationFailure>,
}

/// One line the server rejected during migration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationFailure {
    /// Id of the rejected line.
    pub line_id: CartLineId,
    /// Server-supplied reason.
    pub reason: String,
}

/// The server-side cart, as the synchronizer sees it.
#[async_trait]
pub trait RemoteCart: Send + Sync {
    /// Fetch the current server cart lines (validated).
    async fn fetch(&self) -> Result<Vec<CartLine>, RemoteCartError>;

    /// Add one line to the server cart.
    async fn add(&self, line: &CartLine) -> Result<(), RemoteCartError>;

    /// Replace the quantity of an existing line.
    async fn update_quantity(
        &self,
        id: &CartLineId,
        quantity: u32,
    ) -> Result<(), RemoteCartError>;

    /// Remove one line from the server cart.
    async fn remove(&self, id: &CartLineId) -> Result<(), RemoteCartError>;

    /// Empty the server cart.
    async fn clear(&self) -> Result<(), RemoteCartError>;

    /// Submit a guest cart as a migration batch.
    async fn migrate(&self, lines: &[CartLine]) -> Result<MigrationOutcome, RemoteCartError>;
}

// =============================================================================
// RemoteCartClient
// =============================================================================

/// Cart document returned by `GET /cart`.
#[derive(Debug, Deserialize)]
struct CartDocument {
    #[serde(default)]
    lines: Vec<StoredCartLine>,
}

#[derive(Debug, Serialize)]
struct QuantityUpdate {
    quantity: u32,
}

#[derive(Debug, Serialize)]
struct MigrationBatch<'a> {
    lines: &'a [CartLine],
}

/// REST client for the cart API.
#[derive(Clone)]
pub struct RemoteCartClient {
    client: reqwest::Client,
    base_url: String,
}

impl RemoteCartClient {
    /// Create a new cart API client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &StorefrontConfig) -> Result<Self, RemoteCartError> {
        let mut headers = HeaderMap::new();

        let auth_value = format!("Bearer {}", config.api_token.expose_secret());
        headers.insert(
            "Authorization",
            HeaderValue::from_str(&auth_value)
                .map_err(|e| RemoteCartError::Parse(format!("Invalid token format: {e}")))?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: config.api_base_url.as_str().trim_end_matches('/').to_owned(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }

    /// Map a non-success response to an API error.
    async fn check(response: reqwest::Response) -> Result<reqwest::Response, RemoteCartError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response.text().await.unwrap_or_default();
        Err(RemoteCartError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl RemoteCart for RemoteCartClient {
    #[instrument(skip(self))]
    async fn fetch(&self) -> Result<Vec<CartLine>, RemoteCartError> {
        let response = self.client.get(self.endpoint("cart")).send().await?;

        // A visitor without a server cart yet has an empty one.
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }

        let document: CartDocument = Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| RemoteCartError::Parse(e.to_string()))?;

        Ok(resolve_stored_lines(document.lines))
    }

    #[instrument(skip(self, line), fields(line_id = %line.id))]
    async fn add(&self, line: &CartLine) -> Result<(), RemoteCartError> {
        let response = self
            .client
            .post(self.endpoint("cart/lines"))
            .json(line)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn update_quantity(
        &self,
        id: &CartLineId,
        quantity: u32,
    ) -> Result<(), RemoteCartError> {
        let response = self
            .client
            .put(self.endpoint(&format!("cart/lines/{id}")))
            .json(&QuantityUpdate { quantity })
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn remove(&self, id: &CartLineId) -> Result<(), RemoteCartError> {
        let response = self
            .client
            .delete(self.endpoint(&format!("cart/lines/{id}")))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn clear(&self) -> Result<(), RemoteCartError> {
        let response = self.client.delete(self.endpoint("cart")).send().await?;
        Self::check(response).await?;
        Ok(())
    }

    #[instrument(skip(self, lines), fields(line_count = lines.len()))]
    async fn migrate(&self, lines: &[CartLine]) -> Result<MigrationOutcome, RemoteCartError> {
        let response = self
            .client
            .post(self.endpoint("cart/migrate"))
            .json(&MigrationBatch { lines })
            .send()
            .await?;

        Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| RemoteCartError::Parse(e.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_migration_outcome_deserializes_without_failures() {
        let outcome: MigrationOutcome = serde_json::from_str(r#"{"migrated":3}"#).unwrap();
        assert_eq!(outcome.migrated, 3);
        assert!(outcome.failed.is_empty());
    }

    #[test]
    fn test_migration_outcome_carries_failures() {
        let outcome: MigrationOutcome = serde_json::from_str(
            r#"{"migrated":1,"failed":[{"line_id":"l2","reason":"product retired"}]}"#,
        )
        .unwrap();
        assert_eq!(outcome.migrated, 1);
        assert_eq!(outcome.failed.len(), 1);
        assert_eq!(outcome.failed.first().unwrap().line_id.as_str(), "l2");
    }

    #[test]
    fn test_cart_document_tolerates_missing_lines() {
        let document: CartDocument = serde_json::from_str("{}").unwrap();
        assert!(document.lines.is_empty());
    }

    #[test]
    fn test_error_display() {
        let err = RemoteCartError::Api {
            status: 502,
            message: "upstream down".to_string(),
        };
        assert_eq!(err.to_string(), "API error: 502 - upstream down");
    }
}
