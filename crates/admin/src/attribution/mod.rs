//! Multi-level referral attribution.
//!
//! Customers referred through partner links carry a referral path: the
//! ordered chain of referral codes from the root partner down to them.
//! This module rebuilds the parent/child forest from a flat record list
//! and orders it for display.

pub mod tree;
pub mod types;

pub use tree::flatten_tree;
pub use types::{AttributionCustomer, ReferralPath};
