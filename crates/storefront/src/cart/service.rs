//! The cart synchronizer.
//!
//! [`CartService`] presents a single cart interface and routes every
//! mutation to the active backing store: the device-local guest store
//! until the visitor signs in, the server cart afterwards. On login the
//! guest cart is migrated to the server exactly once.
//!
//! # Ordering
//!
//! All operations on one service instance run under a single async
//! mutex, so two rapid `add_to_cart` calls cannot lose an update: each
//! mutation sees the state the previous one committed. Cross-device
//! ordering (same account, two open sessions) stays last-write-wins -
//! the server cart carries no version token.
//!
//! # Failure semantics
//!
//! Remote failures propagate to the caller, which may retry the
//! specific action; in-memory state is only committed after the backing
//! store accepted the write, so a failed operation never corrupts the
//! rest of the cart.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::instrument;

use pawtrait_core::{CartLineId, CurrencyCode, Money};

use crate::auth::AuthProbe;
use crate::cart::line::{CartLine, NewCartLine};
use crate::config::StorefrontConfig;
use crate::error::{CartError, Result};
use crate::store::guest::GuestCart;
use crate::store::local::{LocalStore, SledStore};
use crate::store::remote::{RemoteCart, RemoteCartClient};

/// Point-in-time view of the cart for UI layers.
#[derive(Debug, Clone)]
pub struct CartSnapshot {
    /// Current (validated) lines.
    pub lines: Vec<CartLine>,
    /// Whether the device-local store is the active one.
    pub is_guest: bool,
    /// True only during initial store detection/hydration.
    pub loading: bool,
    /// Sum of line quantities.
    pub total_items: u32,
    /// Sum of line totals over valid lines.
    pub total_price: Money,
}

struct CartState {
    lines: Vec<CartLine>,
    is_guest: bool,
    loading: bool,
}

struct CartServiceInner {
    auth: Arc<dyn AuthProbe>,
    guest: GuestCart,
    remote: Arc<dyn RemoteCart>,
    state: Mutex<CartState>,
}

/// The cart synchronizer service.
///
/// Cheaply cloneable via `Arc`; the UI layer holds a handle instead of
/// reaching for a module-level singleton, and tests inject collaborator
/// doubles through [`CartService::new`].
#[derive(Clone)]
pub struct CartService {
    inner: Arc<CartServiceInner>,
}

impl CartService {
    /// Create a service over injected collaborators.
    ///
    /// The service starts in guest mode with `loading` set; call
    /// [`initialize`](Self::initialize) to detect the visitor's store.
    /// Mutations issued before that are queued against the guest store
    /// rather than dropped, and a later migration picks them up.
    #[must_use]
    pub fn new(
        auth: Arc<dyn AuthProbe>,
        local: Arc<dyn LocalStore>,
        remote: Arc<dyn RemoteCart>,
    ) -> Self {
        Self {
            inner: Arc::new(CartServiceInner {
                auth,
                guest: GuestCart::new(local),
                remote,
                state: Mutex::new(CartState {
                    lines: Vec::new(),
                    is_guest: true,
                    loading: true,
                }),
            }),
        }
    }

    /// Create a service with production collaborators from config.
    ///
    /// # Errors
    ///
    /// Returns an error if the local store cannot be opened or the API
    /// client cannot be built.
    pub fn from_config(
        config: &StorefrontConfig,
        auth: Arc<dyn AuthProbe>,
    ) -> Result<Self> {
        let local = SledStore::open(&config.local_store_path).map_err(CartError::Store)?;
        let remote = RemoteCartClient::new(config).map_err(CartError::Remote)?;
        Ok(Self::new(auth, Arc::new(local), Arc::new(remote)))
    }

    /// Detect the visitor's store and hydrate the cart.
    ///
    /// Authenticated visitors with leftover guest items get a one-shot
    /// migration; otherwise the active store is loaded as-is. An auth
    /// probe failure falls back to guest behavior - the visitor is
    /// never locked out of their cart.
    ///
    /// # Errors
    ///
    /// Returns an error on storage or remote I/O failure. `loading` is
    /// cleared either way.
    #[instrument(skip(self))]
    pub async fn initialize(&self) -> Result<()> {
        let mut state = self.inner.state.lock().await;

        let authenticated = match self.inner.auth.is_authenticated().await {
            Ok(authenticated) => authenticated,
            Err(e) => {
                tracing::warn!(error = %e, "auth probe failed, falling back to guest cart");
                false
            }
        };

        let result = if authenticated {
            self.migrate_locked(&mut state).await
        } else {
            match self.inner.guest.load().await {
                Ok(lines) => {
                    state.lines = lines;
                    state.is_guest = true;
                    Ok(())
                }
                Err(e) => Err(e.into()),
            }
        };

        state.loading = false;
        result
    }

    /// Add a candidate line to the cart.
    ///
    /// A line sharing the `(product_id, image_id)` key with an existing
    /// line merges by summing quantities; otherwise the candidate gets a
    /// fresh id and timestamp. A zero quantity is clamped to one.
    ///
    /// # Errors
    ///
    /// Returns an error if the active store rejects the write; the
    /// in-memory cart is left unchanged in that case.
    #[instrument(skip(self, new), fields(product_id = %new.product_id, image_id = %new.image_id))]
    pub async fn add_to_cart(&self, new: NewCartLine) -> Result<CartLine> {
        let mut state = self.inner.state.lock().await;
        let added_quantity = new.quantity.max(1);

        let merge_target = state
            .lines
            .iter()
            .find(|line| line.merge_key() == (&new.product_id, &new.image_id))
            .map(|line| (line.id.clone(), line.quantity.saturating_add(added_quantity)));

        if let Some((id, merged_quantity)) = merge_target {
            let mut lines = state.lines.clone();
            if let Some(line) = lines.iter_mut().find(|line| line.id == id) {
                line.quantity = merged_quantity;
            }

            if state.is_guest {
                self.inner.guest.save(&lines).await?;
            } else {
                self.inner.remote.update_quantity(&id, merged_quantity).await?;
            }
            state.lines = lines;

            let merged = state
                .lines
                .iter()
                .find(|line| line.id == id)
                .cloned()
                .ok_or_else(|| unreachable_line(&id))?;
            return Ok(merged);
        }

        let mut new = new;
        new.quantity = added_quantity;
        let line = new.into_line();

        if state.is_guest {
            let mut lines = state.lines.clone();
            lines.push(line.clone());
            self.inner.guest.save(&lines).await?;
            state.lines = lines;
        } else {
            self.inner.remote.add(&line).await?;
            state.lines.push(line.clone());
        }

        Ok(line)
    }

    /// Replace a line's quantity; zero or negative removes the line.
    ///
    /// Updating an unknown line id is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the active store rejects the write.
    #[instrument(skip(self))]
    pub async fn update_quantity(&self, id: &CartLineId, quantity: i64) -> Result<()> {
        let mut state = self.inner.state.lock().await;

        if quantity <= 0 {
            return self.remove_locked(&mut state, id).await;
        }
        let quantity = u32::try_from(quantity).unwrap_or(u32::MAX);

        if !state.lines.iter().any(|line| &line.id == id) {
            tracing::debug!(line_id = %id, "quantity update for unknown cart line ignored");
            return Ok(());
        }

        let mut lines = state.lines.clone();
        if let Some(line) = lines.iter_mut().find(|line| &line.id == id) {
            line.quantity = quantity;
        }

        if state.is_guest {
            self.inner.guest.save(&lines).await?;
        } else {
            self.inner.remote.update_quantity(id, quantity).await?;
        }
        state.lines = lines;
        Ok(())
    }

    /// Remove a line from the cart. Removing an unknown id is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the active store rejects the write.
    #[instrument(skip(self))]
    pub async fn remove_from_cart(&self, id: &CartLineId) -> Result<()> {
        let mut state = self.inner.state.lock().await;
        self.remove_locked(&mut state, id).await
    }

    /// Empty the active store and the in-memory cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the active store rejects the clear.
    #[instrument(skip(self))]
    pub async fn clear_cart(&self) -> Result<()> {
        let mut state = self.inner.state.lock().await;

        if state.is_guest {
            self.inner.guest.clear().await?;
        } else {
            self.inner.remote.clear().await?;
        }
        state.lines.clear();
        Ok(())
    }

    /// Migrate leftover guest items to the server cart and switch to it.
    ///
    /// Safe to call repeatedly: with an empty or missing guest store the
    /// migration itself is a no-op and the call just refreshes the
    /// server view. Every guest line is attempted; server-rejected lines
    /// are logged and skipped, then the guest store is cleared.
    ///
    /// # Errors
    ///
    /// Returns an error if the guest store cannot be read or the
    /// migration submission fails; the guest store is left intact then.
    #[instrument(skip(self))]
    pub async fn migrate(&self) -> Result<()> {
        let mut state = self.inner.state.lock().await;
        self.migrate_locked(&mut state).await
    }

    /// Sum of line quantities.
    pub async fn total_items(&self) -> u32 {
        let state = self.inner.state.lock().await;
        count_items(&state.lines)
    }

    /// Sum of line totals over valid lines.
    pub async fn total_price(&self) -> Money {
        let state = self.inner.state.lock().await;
        sum_price(&state.lines)
    }

    /// Point-in-time view of the cart.
    pub async fn snapshot(&self) -> CartSnapshot {
        let state = self.inner.state.lock().await;
        CartSnapshot {
            lines: state.lines.clone(),
            is_guest: state.is_guest,
            loading: state.loading,
            total_items: count_items(&state.lines),
            total_price: sum_price(&state.lines),
        }
    }

    async fn remove_locked(&self, state: &mut CartState, id: &CartLineId) -> Result<()> {
        if !state.lines.iter().any(|line| &line.id == id) {
            tracing::debug!(line_id = %id, "removal of unknown cart line ignored");
            return Ok(());
        }

        let lines: Vec<CartLine> = state
            .lines
            .iter()
            .filter(|line| &line.id != id)
            .cloned()
            .collect();

        if state.is_guest {
            self.inner.guest.save(&lines).await?;
        } else {
            self.inner.remote.remove(id).await?;
        }
        state.lines = lines;
        Ok(())
    }

    async fn migrate_locked(&self, state: &mut CartState) -> Result<()> {
        let local = self.inner.guest.load().await?;
        let mut migrated_view = Vec::new();
        let had_local = !local.is_empty();

        if had_local {
            let outcome = self.inner.remote.migrate(&local).await?;
            let failed_ids: HashSet<CartLineId> = outcome
                .failed
                .iter()
                .map(|failure| failure.line_id.clone())
                .collect();
            for failure in &outcome.failed {
                tracing::error!(
                    line_id = %failure.line_id,
                    reason = %failure.reason,
                    "cart line lost during guest cart migration"
                );
            }
            tracing::info!(
                migrated = outcome.migrated,
                failed = outcome.failed.len(),
                "guest cart migrated"
            );

            migrated_view = local
                .into_iter()
                .filter(|line| !failed_ids.contains(&line.id))
                .collect();

            // The guest store is cleared once every line has been
            // attempted, whether or not the server accepted all of them.
            self.inner.guest.clear().await?;
        }

        state.is_guest = false;

        // Refresh from the authoritative store; the migration already
        // completed, so a failed refresh degrades to the migrated view
        // instead of erroring.
        match self.inner.remote.fetch().await {
            Ok(lines) => state.lines = lines,
            Err(e) => {
                tracing::warn!(error = %e, "post-migration fetch failed, keeping local view");
                if had_local {
                    state.lines = migrated_view;
                }
            }
        }
        Ok(())
    }
}

/// Sum of quantities across lines.
fn count_items(lines: &[CartLine]) -> u32 {
    lines
        .iter()
        .fold(0u32, |acc, line| acc.saturating_add(line.quantity))
}

/// Sum of line totals. Lines in a different currency than the first are
/// skipped with a warning; mixed-currency carts are upstream data bugs.
fn sum_price(lines: &[CartLine]) -> Money {
    let currency = lines
        .first()
        .map_or(CurrencyCode::default(), |line| line.unit_price.currency_code);

    lines.iter().fold(Money::zero(currency), |acc, line| {
        acc.checked_add(&line.line_total()).unwrap_or_else(|| {
            tracing::warn!(line_id = %line.id, "skipping mixed-currency line in cart total");
            acc
        })
    })
}

fn unreachable_line(id: &CartLineId) -> CartError {
    // The merge target was found under the same lock; it cannot vanish.
    CartError::Store(crate::store::StoreError::Corrupt(format!(
        "cart line {id} disappeared during merge"
    )))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    use async_trait::async_trait;
    use rust_decimal::Decimal;

    use pawtrait_core::{ImageId, ProductId};

    use crate::auth::{AuthError, FixedAuth};
    use crate::cart::line::LineMetadata;
    use crate::store::local::MemoryStore;
    use crate::store::remote::{MigrationFailure, MigrationOutcome, RemoteCartError};

    // =========================================================================
    // Doubles
    // =========================================================================

    /// In-memory server cart double.
    #[derive(Default)]
    struct MemoryRemote {
        lines: Mutex<Vec<CartLine>>,
        reject_products: Vec<ProductId>,
        fail_writes: bool,
        migrate_calls: Mutex<u32>,
    }

    impl MemoryRemote {
        fn rejecting(products: Vec<ProductId>) -> Self {
            Self {
                reject_products: products,
                ..Self::default()
            }
        }

        fn failing_writes() -> Self {
            Self {
                fail_writes: true,
                ..Self::default()
            }
        }

        async fn line_count(&self) -> usize {
            self.lines.lock().await.len()
        }
    }

    #[async_trait]
    impl RemoteCart for MemoryRemote {
        async fn fetch(&self) -> std::result::Result<Vec<CartLine>, RemoteCartError> {
            Ok(self.lines.lock().await.clone())
        }

        async fn add(&self, line: &CartLine) -> std::result::Result<(), RemoteCartError> {
            if self.fail_writes {
                return Err(RemoteCartError::Api {
                    status: 503,
                    message: "unavailable".to_string(),
                });
            }
            self.lines.lock().await.push(line.clone());
            Ok(())
        }

        async fn update_quantity(
            &self,
            id: &CartLineId,
            quantity: u32,
        ) -> std::result::Result<(), RemoteCartError> {
            if self.fail_writes {
                return Err(RemoteCartError::Api {
                    status: 503,
                    message: "unavailable".to_string(),
                });
            }
            let mut lines = self.lines.lock().await;
            if let Some(line) = lines.iter_mut().find(|line| &line.id == id) {
                line.quantity = quantity;
            }
            Ok(())
        }

        async fn remove(&self, id: &CartLineId) -> std::result::Result<(), RemoteCartError> {
            self.lines.lock().await.retain(|line| &line.id != id);
            Ok(())
        }

        async fn clear(&self) -> std::result::Result<(), RemoteCartError> {
            self.lines.lock().await.clear();
            Ok(())
        }

        async fn migrate(
            &self,
            lines: &[CartLine],
        ) -> std::result::Result<MigrationOutcome, RemoteCartError> {
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

    /// Probe whose provider is down.
    struct BrokenAuth;

    #[async_trait]
    impl AuthProbe for BrokenAuth {
        async fn is_authenticated(&self) -> std::result::Result<bool, AuthError> {
            Err(AuthError::Unavailable("connection refused".to_string()))
        }
    }

    fn new_line(product: &str, image: &str, quantity: u32, cents: i64) -> NewCartLine {
        NewCartLine {
            product_id: ProductId::new(product),
            image_id: ImageId::new(image),
            quantity,
            unit_price: Money::from_cents(cents, CurrencyCode::USD),
            product_title: "Portrait".to_string(),
            image_url: None,
            attribution: None,
            print_spec: None,
            metadata: LineMetadata::None,
        }
    }

    fn guest_service(local: Arc<MemoryStore>) -> (CartService, Arc<MemoryRemote>) {
        let remote = Arc::new(MemoryRemote::default());
        let service = CartService::new(Arc::new(FixedAuth::new(false)), local, remote.clone());
        (service, remote)
    }

    // =========================================================================
    // Tests
    // =========================================================================

    #[tokio::test]
    async fn test_add_merges_same_product_image_pair() {
        let (service, _) = guest_service(Arc::new(MemoryStore::new()));
        service.initialize().await.unwrap();

        service.add_to_cart(new_line("p1", "i1", 2, 1000)).await.unwrap();
        service.add_to_cart(new_line("p1", "i1", 3, 1000)).await.unwrap();

        let snapshot = service.snapshot().await;
        assert_eq!(snapshot.lines.len(), 1);
        assert_eq!(snapshot.lines.first().unwrap().quantity, 5);
    }

    #[tokio::test]
    async fn test_add_distinct_images_do_not_merge() {
        let (service, _) = guest_service(Arc::new(MemoryStore::new()));
        service.initialize().await.unwrap();

        service.add_to_cart(new_line("p1", "i1", 1, 1000)).await.unwrap();
        service.add_to_cart(new_line("p1", "i2", 1, 1000)).await.unwrap();

        assert_eq!(service.snapshot().await.lines.len(), 2);
    }

    #[tokio::test]
    async fn test_totals() {
        let (service, _) = guest_service(Arc::new(MemoryStore::new()));
        service.initialize().await.unwrap();

        service.add_to_cart(new_line("p1", "i1", 2, 1000)).await.unwrap();
        service.add_to_cart(new_line("p2", "i2", 1, 500)).await.unwrap();

        assert_eq!(service.total_items().await, 3);
        assert_eq!(service.total_price().await.amount, Decimal::new(2500, 2));
    }

    #[tokio::test]
    async fn test_update_quantity_zero_and_negative_remove() {
        let (service, _) = guest_service(Arc::new(MemoryStore::new()));
        service.initialize().await.unwrap();

        let a = service.add_to_cart(new_line("p1", "i1", 1, 1000)).await.unwrap();
        let b = service.add_to_cart(new_line("p2", "i2", 1, 1000)).await.unwrap();

        service.update_quantity(&a.id, 0).await.unwrap();
        service.update_quantity(&b.id, -1).await.unwrap();

        assert!(service.snapshot().await.lines.is_empty());
    }

    #[tokio::test]
    async fn test_add_before_initialize_goes_to_guest_store() {
        let local = Arc::new(MemoryStore::new());
        let (service, _) = guest_service(local.clone());

        // No initialize() yet - the write must not be dropped.
        service.add_to_cart(new_line("p1", "i1", 1, 1000)).await.unwrap();

        let persisted = GuestCart::new(local).load().await.unwrap();
        assert_eq!(persisted.len(), 1);
    }

    #[tokio::test]
    async fn test_auth_probe_failure_falls_back_to_guest() {
        let service = CartService::new(
            Arc::new(BrokenAuth),
            Arc::new(MemoryStore::new()),
            Arc::new(MemoryRemote::default()),
        );
        service.initialize().await.unwrap();

        let snapshot = service.snapshot().await;
        assert!(snapshot.is_guest);
        assert!(!snapshot.loading);
    }

    #[tokio::test]
    async fn test_initialize_migrates_leftover_guest_items() {
        let local = Arc::new(MemoryStore::new());

        // A guest session leaves items behind...
        let (guest, _) = guest_service(local.clone());
        guest.initialize().await.unwrap();
        guest.add_to_cart(new_line("p1", "i1", 2, 1000)).await.unwrap();

        // ...then the visitor signs in on the same device.
        let remote = Arc::new(MemoryRemote::default());
        let service =
            CartService::new(Arc::new(FixedAuth::new(true)), local.clone(), remote.clone());
        service.initialize().await.unwrap();

        let snapshot = service.snapshot().await;
        assert!(!snapshot.is_guest);
        assert_eq!(snapshot.lines.len(), 1);
        assert_eq!(remote.line_count().await, 1);
        assert!(GuestCart::new(local).load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_migration_is_idempotent() {
        let local = Arc::new(MemoryStore::new());
        let (guest, _) = guest_service(local.clone());
        guest.initialize().await.unwrap();
        guest.add_to_cart(new_line("p1", "i1", 2, 1000)).await.unwrap();

        let remote = Arc::new(MemoryRemote::default());
        let service =
            CartService::new(Arc::new(FixedAuth::new(true)), local, remote.clone());

        service.migrate().await.unwrap();
        service.migrate().await.unwrap();

        // Second call found an empty guest store: no second submission.
        assert_eq!(*remote.migrate_calls.lock().await, 1);
        assert_eq!(remote.line_count().await, 1);
    }

    #[tokio::test]
    async fn test_migration_continues_past_rejected_lines() {
        let local = Arc::new(MemoryStore::new());
        let (guest, _) = guest_service(local.clone());
        guest.initialize().await.unwrap();
        guest.add_to_cart(new_line("retired", "i1", 1, 1000)).await.unwrap();
        guest.add_to_cart(new_line("p2", "i2", 1, 500)).await.unwrap();

        let remote = Arc::new(MemoryRemote::rejecting(vec![ProductId::new("retired")]));
        let service =
            CartService::new(Arc::new(FixedAuth::new(true)), local.clone(), remote.clone());
        service.migrate().await.unwrap();

        // The accepted line made it; the guest store is cleared anyway.
        assert_eq!(remote.line_count().await, 1);
        assert!(GuestCart::new(local).load().await.unwrap().is_empty());
        assert_eq!(service.snapshot().await.lines.len(), 1);
    }

    #[tokio::test]
    async fn test_remote_write_failure_leaves_cart_unchanged() {
        let remote = Arc::new(MemoryRemote::failing_writes());
        let service = CartService::new(
            Arc::new(FixedAuth::new(true)),
            Arc::new(MemoryStore::new()),
            remote,
        );
        service.initialize().await.unwrap();

        let result = service.add_to_cart(new_line("p1", "i1", 1, 1000)).await;
        assert!(matches!(result, Err(CartError::Remote(_))));
        assert!(service.snapshot().await.lines.is_empty());
    }

    #[tokio::test]
    async fn test_post_migration_writes_route_to_remote() {
        let local = Arc::new(MemoryStore::new());
        let remote = Arc::new(MemoryRemote::default());
        let service =
            CartService::new(Arc::new(FixedAuth::new(true)), local.clone(), remote.clone());
        service.initialize().await.unwrap();

        service.add_to_cart(new_line("p1", "i1", 1, 1000)).await.unwrap();

        assert_eq!(remote.line_count().await, 1);
        // Nothing was written to the now-inactive guest store.
        assert!(GuestCart::new(local).load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_clear_cart_empties_active_store() {
        let local = Arc::new(MemoryStore::new());
        let (service, _) = guest_service(local.clone());
        service.initialize().await.unwrap();
        service.add_to_cart(new_line("p1", "i1", 1, 1000)).await.unwrap();

        service.clear_cart().await.unwrap();

        assert!(service.snapshot().await.lines.is_empty());
        assert!(GuestCart::new(local).load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_remove_unknown_line_is_noop() {
        let (service, _) = guest_service(Arc::new(MemoryStore::new()));
        service.initialize().await.unwrap();
        service
            .remove_from_cart(&CartLineId::new("missing"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_zero_quantity_add_clamps_to_one() {
        let (service, _) = guest_service(Arc::new(MemoryStore::new()));
        service.initialize().await.unwrap();

        let line = service.add_to_cart(new_line("p1", "i1", 0, 1000)).await.unwrap();
        assert_eq!(line.quantity, 1);
    }
}
