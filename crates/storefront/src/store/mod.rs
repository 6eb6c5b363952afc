//! Backing stores for the hybrid cart.
//!
//! Exactly one store is active for a visitor at any instant:
//!
//! - [`local`] - device-local key-value storage for guest carts
//! - [`guest`] - the guest cart document layered over a [`LocalStore`]
//! - [`remote`] - the server-authoritative cart API client

pub mod guest;
pub mod local;
pub mod remote;

pub use guest::{CART_KEY, GuestCart};
pub use local::{LocalStore, MemoryStore, SledStore, StoreError};
pub use remote::{
    MigrationFailure, MigrationOutcome, RemoteCart, RemoteCartClient, RemoteCartError,
};
