//! Unified error handling for the cart core.
//!
//! Errors keep their layer of origin: local storage failures, remote
//! API failures, and auth probe failures stay distinguishable so the UI
//! layer can offer the right retry. Data-integrity problems (corrupt
//! local JSON, price-less lines) are NOT errors - they degrade to an
//! empty or smaller cart at the ingestion boundary.

use thiserror::Error;

use crate::auth::AuthError;
use crate::store::{RemoteCartError, StoreError};

/// Top-level error type for cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    /// Device-local store operation failed.
    #[error("Local store error: {0}")]
    Store(#[from] StoreError),

    /// Remote cart API operation failed.
    #[error("Remote cart error: {0}")]
    Remote(#[from] RemoteCartError),

    /// Authentication probe failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),
}

/// Result type alias for `CartError`.
pub type Result<T> = std::result::Result<T, CartError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cart_error_display() {
        let err = CartError::Store(StoreError::Corrupt("not utf-8".to_string()));
        assert_eq!(
            err.to_string(),
            "Local store error: corrupt store value: not utf-8"
        );

        let err = CartError::Auth(AuthError::Unavailable("timed out".to_string()));
        assert_eq!(err.to_string(), "Auth error: auth status unavailable: timed out");
    }

    #[test]
    fn test_remote_error_wraps() {
        let err: CartError = RemoteCartError::Api {
            status: 503,
            message: "maintenance".to_string(),
        }
        .into();
        assert!(matches!(err, CartError::Remote(_)));
    }
}
