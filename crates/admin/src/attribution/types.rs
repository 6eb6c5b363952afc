//! Referral attribution domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use pawtrait_core::{CustomerId, Email, Money, ReferralCode};

/// Ordered referral codes from the root partner down to one customer.
///
/// Reporting endpoints carry the path as one dot-delimited string
/// (`"PAW1.PAW7.PAW9"`); parsing never fails - blank segments are
/// dropped, and a path that yields no codes simply makes the record a
/// root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct ReferralPath(Vec<ReferralCode>);

impl ReferralPath {
    /// Segment delimiter in the wire representation.
    pub const DELIMITER: char = '.';

    /// Parse a dot-delimited path string.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let codes = raw
            .split(Self::DELIMITER)
            .map(str::trim)
            .filter(|segment| !segment.is_empty())
            .map(ReferralCode::new)
            .collect();
        Self(codes)
    }

    /// Build a path from codes directly.
    #[must_use]
    pub fn from_codes(codes: Vec<ReferralCode>) -> Self {
        Self(codes)
    }

    /// The codes, root first.
    #[must_use]
    pub fn codes(&self) -> &[ReferralCode] {
        &self.0
    }

    /// Number of codes in the path.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the path carries no codes at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether this path makes its record a tree root: one code or
    /// fewer. Empty and unparseable paths land here by construction.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0.len() <= 1
    }

    /// The record's own code: the last path element.
    #[must_use]
    pub fn terminal(&self) -> Option<&ReferralCode> {
        self.0.last()
    }

    /// The claimed parent's code: the second-to-last path element.
    #[must_use]
    pub fn parent_code(&self) -> Option<&ReferralCode> {
        self.0.len().checked_sub(2).and_then(|idx| self.0.get(idx))
    }
}

impl From<String> for ReferralPath {
    fn from(raw: String) -> Self {
        Self::parse(&raw)
    }
}

impl From<ReferralPath> for String {
    fn from(path: ReferralPath) -> Self {
        path.to_string()
    }
}

impl std::fmt::Display for ReferralPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for code in &self.0 {
            if !first {
                write!(f, "{}", Self::DELIMITER)?;
            }
            write!(f, "{code}")?;
            first = false;
        }
        Ok(())
    }
}

/// One referred customer in an attribution report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttributionCustomer {
    /// Customer identifier.
    pub customer_id: CustomerId,
    /// Display key shown in the report.
    pub email: Email,
    /// 1-based depth in the referral tree (1 = directly referred).
    pub level: u32,
    /// Referral chain from the root partner down to this customer.
    pub path: ReferralPath,
    /// Orders placed by this customer.
    pub order_count: u32,
    /// Revenue attributed to this customer.
    pub revenue: Money,
    /// When the customer record was created. Missing timestamps sort
    /// earliest.
    pub created_at: Option<DateTime<Utc>>,
}

impl AttributionCustomer {
    /// Display indentation steps for this row (level 1 is flush left).
    #[must_use]
    pub const fn indent(&self) -> u32 {
        self.level.saturating_sub(1)
    }
}
