//! Pawtrait Admin - partner referral and attribution reporting.
//!
//! This crate shapes referral data for the admin back-office. The heavy
//! lifting is [`attribution`]: rebuilding the referral forest from flat
//! records and ordering it for display. Everything here is pure,
//! in-memory computation over data an admin reporting endpoint already
//! fetched - no I/O, no suspension points.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod attribution;

pub use attribution::{AttributionCustomer, ReferralPath, flatten_tree};
