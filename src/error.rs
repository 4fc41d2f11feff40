//! Error handling for the quote crate

use crate::config::ConfigError;
use crate::export::ExportError;
use crate::pricing::PricingError;
use crate::render::RenderError;

/// Crate-level error type
#[derive(Debug, thiserror::Error)]
pub enum QuoteError {
    #[error("Pricing error: {0}")]
    Pricing(#[from] PricingError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    #[error("Export error: {0}")]
    Export(#[from] ExportError),
}

pub type Result<T> = std::result::Result<T, QuoteError>;
