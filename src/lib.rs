//! Monthly pricing for IP Solutions managed security quotes.
//!
//! The quote form collects a [`QuoteInput`](pricing::QuoteInput); the
//! [`PricingEngine`](pricing::PricingEngine) turns it into a
//! [`QuoteOutcome`](pricing::QuoteOutcome); [`render`] and [`export`] present
//! the result.

pub mod config;
pub mod error;
pub mod export;
pub mod pricing;
pub mod render;
pub mod telemetry;

pub use error::{QuoteError, Result};
