//! The hybrid cart: one logical cart, two backing stores.

pub mod line;
pub mod service;

pub use line::{
    CartLine, LegacyPricing, LineMetadata, NewCartLine, PartnerAttribution, PrintSpec,
    StoredCartLine,
};
pub use service::{CartService, CartSnapshot};
