//! Integration tests for Pawtrait.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p pawtrait-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `cart_flow` - Guest-to-account cart lifecycle scenarios
//! - `attribution_report` - Referral tree ordering scenarios
//!
//! The cart scenarios drive [`pawtrait_storefront::CartService`] against
//! the in-repo `MemoryStore` plus local test doubles for the remote
//! cart API and the auth probe; no live backend is required.

pub mod doubles;

use std::sync::Once;

static INIT: Once = Once::new();

/// Initialize tracing once for the whole test binary.
///
/// Defaults to info level for the workspace crates if `RUST_LOG` is not
/// set; warnings from degradation paths (validation drops, migration
/// failures) then show up in test output.
pub fn init_tracing() {
    INIT.call_once(|| {
        let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "pawtrait_storefront=info,pawtrait_admin=info".into());

        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_test_writer()
            .init();
    });
}
