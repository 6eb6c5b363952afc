//! Pawtrait Core - Shared types library.
//!
//! This crate provides common types used across all Pawtrait components:
//! - `storefront` - Customer-facing cart core
//! - `admin` - Partner referral and attribution reporting
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no storage access, no
//! HTTP clients. This keeps it lightweight and allows it to be used
//! anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, money, and emails

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
