//! Output records produced by the pricing engine.

use rust_decimal::Decimal;
use serde::Serialize;

use super::models::Tier;

/// Monthly price breakdown for a quote.
///
/// Amounts keep full precision; round with
/// [`round_money`](super::calculators::round_money) only when presenting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuoteResult {
    pub tier: Tier,
    pub user_count: u32,
    pub device_count: u32,
    pub email_count: u32,
    pub server_protection: bool,
    /// Prepaid MSP support was requested, even if for zero hours
    pub include_msp: bool,
    #[serde(with = "rust_decimal::serde::str")]
    pub base_cost: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub extra_email_cost: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub server_cost: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub server_backup_cost: Decimal,
    /// Label of the billed backup capacity ("1 TB")
    pub server_backup_label: Option<String>,
    #[serde(with = "rust_decimal::serde::str")]
    pub fixed_labor_cost: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub bolt_on_cost: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub advanced_security_cost: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub msp_cost: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub subtotal: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub discount_rate: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub discount_amount: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub total: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub msp_hours: Decimal,
    /// Bolt-ons billed (selected and not included in the tier), in id order
    pub charged_bolt_ons: Vec<String>,
    /// Advanced security items billed, in id order
    pub charged_advanced_security: Vec<String>,
}

/// Why the engine declined to price a quote
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeclineReason {
    MissingUsers,
    MissingDevices,
    MissingEmails,
    MissingTier,
}

/// Outcome of a pricing pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum QuoteOutcome {
    Priced(QuoteResult),
    /// Input is incomplete; nothing should be rendered or changed
    Declined { reason: DeclineReason },
}

impl QuoteOutcome {
    pub fn priced(&self) -> Option<&QuoteResult> {
        match self {
            QuoteOutcome::Priced(result) => Some(result),
            QuoteOutcome::Declined { .. } => None,
        }
    }

    pub fn into_priced(self) -> Option<QuoteResult> {
        match self {
            QuoteOutcome::Priced(result) => Some(result),
            QuoteOutcome::Declined { .. } => None,
        }
    }

    pub fn is_declined(&self) -> bool {
        matches!(self, QuoteOutcome::Declined { .. })
    }
}

/// Per-device price a tier would cost once extras are spread over the users
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TierPricePreview {
    pub tier: Tier,
    #[serde(with = "rust_decimal::serde::str")]
    pub base_price: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub adjusted_price: Decimal,
    /// Adjusted price is below the list price ("was $x" display)
    pub discounted: bool,
}
