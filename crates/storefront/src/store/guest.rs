//! Guest cart document over the device-local store.
//!
//! The entire guest cart is one JSON array under one well-known key.
//! Corrupt JSON is treated as an empty cart, never as a fatal error -
//! losing a broken guest cart beats locking the visitor out of theirs.

use std::sync::Arc;

use crate::cart::line::{CartLine, StoredCartLine, resolve_stored_lines};
use crate::store::local::{LocalStore, StoreError};

/// Well-known key the guest cart document lives under.
pub const CART_KEY: &str = "pawtrait.cart";

/// The guest cart document, layered over an injected [`LocalStore`].
#[derive(Clone)]
pub struct GuestCart {
    store: Arc<dyn LocalStore>,
}

impl GuestCart {
    /// Create a guest cart over the given store.
    #[must_use]
    pub fn new(store: Arc<dyn LocalStore>) -> Self {
        Self { store }
    }

    /// Load and validate the stored lines.
    ///
    /// A missing key or a corrupt document yields an empty cart. Lines
    /// without a usable price are dropped during resolution.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] only for storage I/O failures; corruption
    /// is recovered locally.
    pub async fn load(&self) -> Result<Vec<CartLine>, StoreError> {
        let raw = match self.store.get(CART_KEY).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return Ok(Vec::new()),
            // A value that can't even be decoded to a string is treated
            // like corrupt JSON: empty cart.
            Err(StoreError::Corrupt(reason)) => {
                tracing::warn!(%reason, "guest cart value corrupt, starting empty");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e),
        };

        match serde_json::from_str::<Vec<StoredCartLine>>(&raw) {
            Ok(stored) => Ok(resolve_stored_lines(stored)),
            Err(e) => {
                tracing::warn!(error = %e, "guest cart JSON corrupt, starting empty");
                Ok(Vec::new())
            }
        }
    }

    /// Persist the full line list, replacing the previous document.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if serialization or the underlying write
    /// fails.
    pub async fn save(&self, lines: &[CartLine]) -> Result<(), StoreError> {
        let raw = serde_json::to_string(lines)?;
        self.store.set(CART_KEY, &raw).await
    }

    /// Delete the cart document.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the underlying delete fails.
    pub async fn clear(&self) -> Result<(), StoreError> {
        self.store.delete(CART_KEY).await
    }
}
