//! Pawtrait Storefront - customer-facing cart core.
//!
//! This crate owns the hybrid shopping cart: one logical cart per
//! visitor, backed by either a device-local store (guest) or the
//! server-authoritative cart API (signed in), with a one-shot migration
//! of guest items on login.
//!
//! # Architecture
//!
//! - [`cart::CartService`] presents the single cart interface and
//!   routes every mutation to the active backing store
//! - [`store::LocalStore`] / [`store::RemoteCart`] / [`auth::AuthProbe`]
//!   are injected collaborator traits, so the UI layer holds a service
//!   handle rather than reaching for module-level globals and tests can
//!   swap in doubles
//! - The attribution/reporting side of the platform lives in the
//!   `pawtrait-admin` crate; this crate owns no HTTP surface of its own

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod auth;
pub mod cart;
pub mod config;
pub mod error;
pub mod store;

pub use cart::{CartLine, CartService, CartSnapshot, NewCartLine};
pub use config::StorefrontConfig;
pub use error::CartError;
