//! Cart line domain types.
//!
//! A line is one product+image combination. Two lines with the same
//! `(product_id, image_id)` key never coexist in a cart - adds merge by
//! summing quantity.
//!
//! `unit_price` is the canonical price field. Older stored carts carried
//! a loose `pricing` object instead; that shape is accepted only at the
//! ingestion boundary (see [`StoredCartLine`]) and resolved here, never
//! inside the domain type.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use pawtrait_core::{
    CartLineId, CurrencyCode, ImageId, Money, PartnerId, ProductId, ReferralCode,
};

/// One product+image combination in a cart.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartLine {
    /// Line id, unique within one cart.
    pub id: CartLineId,
    /// Product being purchased.
    pub product_id: ProductId,
    /// Portrait image the product is printed with.
    pub image_id: ImageId,
    /// Number of units. Invariant: >= 1; a line driven to zero is
    /// removed, never persisted.
    pub quantity: u32,
    /// Canonical unit price snapshot taken at add time.
    pub unit_price: Money,
    /// Denormalized product title snapshot.
    pub product_title: String,
    /// Denormalized preview image URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// Partner/discount credit attached at add time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribution: Option<PartnerAttribution>,
    /// Fulfillment-provider print specification.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub print_spec: Option<PrintSpec>,
    /// Structured extra data attached to the line.
    #[serde(default)]
    pub metadata: LineMetadata,
    /// When the line was first added.
    pub added_at: DateTime<Utc>,
}

impl CartLine {
    /// Grouping key: lines sharing this key are merged, not duplicated.
    #[must_use]
    pub const fn merge_key(&self) -> (&ProductId, &ImageId) {
        (&self.product_id, &self.image_id)
    }

    /// Line total (unit price times quantity).
    #[must_use]
    pub fn line_total(&self) -> Money {
        self.unit_price.times(self.quantity)
    }
}

/// Candidate line passed to add-to-cart.
///
/// Carries no id or timestamp; those are minted when the line enters
/// the cart.
#[derive(Debug, Clone)]
pub struct NewCartLine {
    pub product_id: ProductId,
    pub image_id: ImageId,
    pub quantity: u32,
    pub unit_price: Money,
    pub product_title: String,
    pub image_url: Option<String>,
    pub attribution: Option<PartnerAttribution>,
    pub print_spec: Option<PrintSpec>,
    pub metadata: LineMetadata,
}

impl NewCartLine {
    /// Promote the candidate to a full line with a fresh id and
    /// timestamp.
    #[must_use]
    pub fn into_line(self) -> CartLine {
        CartLine {
            id: CartLineId::generate(),
            product_id: self.product_id,
            image_id: self.image_id,
            quantity: self.quantity,
            unit_price: self.unit_price,
            product_title: self.product_title,
            image_url: self.image_url,
            attribution: self.attribution,
            print_spec: self.print_spec,
            metadata: self.metadata,
            added_at: Utc::now(),
        }
    }
}

/// Partner/discount credit for a line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartnerAttribution {
    /// Referring partner.
    pub partner_id: PartnerId,
    /// Referral code the visitor arrived with.
    pub referral_code: ReferralCode,
    /// Discount applied by the referral, as a percentage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discount_percent: Option<Decimal>,
}

/// Print specification forwarded to the fulfillment provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrintSpec {
    /// Provider SKU for the physical product.
    pub provider_sku: String,
    /// Print width in millimeters.
    pub width_mm: u32,
    /// Print height in millimeters.
    pub height_mm: u32,
    /// Substrate name (e.g., "canvas", "fine-art-paper").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub substrate: Option<String>,
}

/// Structured per-line extra data.
///
/// Known shapes are tagged; anything else is preserved verbatim in
/// `Other` so newer writers don't lose data passing through older
/// readers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LineMetadata {
    /// No extra data.
    #[default]
    None,
    /// Gift note printed on the packing slip.
    GiftNote {
        /// Free-text note.
        message: String,
    },
    /// Pet profile the portrait was generated from.
    PetProfile {
        /// Pet display name.
        pet_name: String,
        /// Breed, when the owner supplied one.
        breed: Option<String>,
    },
    /// Unrecognized payload, carried as-is.
    #[serde(untagged)]
    Other(serde_json::Value),
}

// =============================================================================
// Ingestion boundary
// =============================================================================

/// Wire/stored shape of a cart line.
///
/// Accepts both current payloads (canonical `unit_price`) and legacy
/// payloads (loose `pricing` object with duck-typed fields). A stored
/// line without a usable price never becomes a [`CartLine`]; it is
/// dropped at load so totals can't go NaN-shaped or negative from
/// stale partial data.
#[derive(Debug, Clone, Deserialize)]
pub struct StoredCartLine {
    pub id: CartLineId,
    pub product_id: ProductId,
    pub image_id: ImageId,
    pub quantity: u32,
    #[serde(default)]
    pub unit_price: Option<Money>,
    #[serde(default)]
    pub pricing: LegacyPricing,
    #[serde(default)]
    pub product_title: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub attribution: Option<PartnerAttribution>,
    #[serde(default)]
    pub print_spec: Option<PrintSpec>,
    #[serde(default)]
    pub metadata: LineMetadata,
    #[serde(default)]
    pub added_at: Option<DateTime<Utc>>,
}

/// Legacy price fields carried by carts persisted before the canonical
/// `unit_price` field existed.
///
/// Compatibility shim only: resolution takes the first present and
/// positive field in the order `sale_price`, `price`, `amount`,
/// `total`. New writes always carry `unit_price`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LegacyPricing {
    pub sale_price: Option<Decimal>,
    pub price: Option<Decimal>,
    pub amount: Option<Decimal>,
    pub total: Option<Decimal>,
}

impl LegacyPricing {
    /// Resolve to a unit price, if any field is present and positive.
    ///
    /// Legacy payloads carried plain amounts with an implied store
    /// currency.
    fn resolve(&self) -> Option<Money> {
        [self.sale_price, self.price, self.amount, self.total]
            .into_iter()
            .flatten()
            .find(|amount| *amount > Decimal::ZERO)
            .map(|amount| Money::new(amount, CurrencyCode::USD))
    }
}

impl StoredCartLine {
    /// Resolve into a domain line.
    ///
    /// Returns `None` when the line has no usable price or a zero
    /// quantity; such lines are stale partial data and are never
    /// resurrected.
    #[must_use]
    pub fn into_line(self) -> Option<CartLine> {
        if self.quantity == 0 {
            return None;
        }

        let unit_price = self
            .unit_price
            .filter(Money::is_positive)
            .or_else(|| self.pricing.resolve())?;

        Some(CartLine {
            id: self.id,
            product_id: self.product_id,
            image_id: self.image_id,
            quantity: self.quantity,
            unit_price,
            product_title: self.product_title,
            image_url: self.image_url,
            attribution: self.attribution,
            print_spec: self.print_spec,
            metadata: self.metadata,
            added_at: self.added_at.unwrap_or_else(Utc::now),
        })
    }
}

/// Resolve a batch of stored lines, dropping (and logging) invalid ones.
#[must_use]
pub fn resolve_stored_lines(stored: Vec<StoredCartLine>) -> Vec<CartLine> {
    stored
        .into_iter()
        .filter_map(|line| {
            let id = line.id.clone();
            let resolved = line.into_line();
            if resolved.is_none() {
                tracing::warn!(line_id = %id, "dropping stored cart line without a usable price");
            }
            resolved
        })
        .collect()
}
