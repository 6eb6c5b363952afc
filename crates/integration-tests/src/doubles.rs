//! Shared test doubles for the cart collaborators.
//!
//! The storefront crate ships `MemoryStore` and `FixedAuth`; the
//! remaining collaborator, the remote cart API, is doubled here with an
//! in-memory server cart.

use async_trait::async_trait;
use tokio::sync::Mutex;

use pawtrait_core::{CartLineId, ProductId};
use pawtrait_storefront::cart::CartLine;
use pawtrait_storefront::store::{
    MigrationFailure, MigrationOutcome, RemoteCart, RemoteCartError,
};

/// In-memory stand-in for the server cart.
///
/// Optionally rejects configured products during migration, the way the
/// real API rejects retired catalog entries.
#[derive(Default)]
pub struct FakeRemoteCart {
    lines: Mutex<Vec<CartLine>>,
    reject_products: Vec<ProductId>,
    migrate_calls: Mutex<u32>,
}

impl FakeRemoteCart {
    /// An accepting server cart.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A server cart that rejects the given products during migration.
    #[must_use]
    pub fn rejecting(reject_products: Vec<ProductId>) -> Self {
        Self {
            reject_products,
            ..Self::default()
        }
    }

    /// Current server-side lines.
    pub async fn lines(&self) -> Vec<CartLine> {
        self.lines.lock().await.clone()
    }

    /// How many migration batches the server has seen.
    pub async fn migrate_calls(&self) -> u32 {
        *self.migrate_calls.lock().await
    }
}

#[async_trait]
impl RemoteCart for FakeRemoteCart {
    async fn fetch(&self) -> Result<Vec<CartLine>, RemoteCartError> {
        Ok(self.lines.lock().await.clone())
    }

    async fn add(&self, line: &CartLine) -> Result<(), RemoteCartError> {
        self.lines.lock().await.push(line.clone());
        Ok(())
    }

    async fn update_quantity(
        &self,
        id: &CartLineId,
        quantity: u32,
    ) -> Result<(), RemoteCartError> {
        let mut lines = self.lines.lock().await;
        if let Some(line) = lines.iter_mut().find(|line| &line.id == id) {
            line.quantity = quantity;
        }
        Ok(())
    }

    async fn remove(&self, id: &CartLineId) -> Result<(), RemoteCartError> {
        self.lines.lock().await.retain(|line| &line.id != id);
        Ok(())
    }

    async fn clear(&self) -> Result<(), RemoteCartError> {
        self.lines.lock().await.clear();
        Ok(())
    }

    async fn migrate(&self, lines: &[CartLine]) -> Result<MigrationOutcome, RemoteCartError> {
        *self.migrate_calls.lock().await += 1;
        let mut accepted = self.lines.lock().await;
        let mut outcome = MigrationOutcome::default();
        for line in lines {
            if self.reject_products.contains(&line.product_id) {
                outcome.failed.push(MigrationFailure {
                    line_id: line.id.clone(),
                    reason: "product retired".to_string(),
                });
            } else {
                accepted.push(line.clone());
                outcome.migrated += 1;
            }
        }
        Ok(outcome)
    }
}
