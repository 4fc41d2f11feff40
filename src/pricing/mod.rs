//! Pricing engine module for security quotes.
//!
//! Turns quote form values into a monthly price breakdown and decides which
//! bolt-on options are selectable for a tier.

pub mod availability;
pub mod calculators;
pub mod models;
pub mod msp;
pub mod requests;
pub mod responses;
pub mod services;

// Re-export commonly used items
pub use availability::{BoltOnAvailability, BoltOnSelection, OptionAvailability, OptionState};
pub use calculators::{format_money, round_money};
pub use models::{BoltOnPricing, RateTable, Tier, TierTable};
pub use msp::{recommended_msp_hours, MspHoursField};
pub use requests::QuoteInput;
pub use responses::{DeclineReason, QuoteOutcome, QuoteResult, TierPricePreview};
pub use services::{PricingEngine, PricingError};
