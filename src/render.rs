//! Human-readable price breakdown.
//!
//! Lines follow the order shown on the quote form. Optional charges that come
//! to zero are left out; base cost, fixed labor and subtotal are always shown.

use askama::Template;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::pricing::calculators::{format_money, format_percent, format_quantity};
use crate::pricing::{BoltOnPricing, PricingEngine, QuoteResult};

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LineKind {
    Charge,
    Subtotal,
    Discount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BreakdownLine {
    pub label: String,
    #[serde(with = "rust_decimal::serde::str")]
    pub amount: Decimal,
    pub kind: LineKind,
}

impl BreakdownLine {
    fn charge(label: String, amount: Decimal) -> Self {
        Self {
            label,
            amount,
            kind: LineKind::Charge,
        }
    }

    /// `Label: $12.00`, or `Label: -$12.00` for the discount
    pub fn text(&self) -> String {
        match self.kind {
            LineKind::Discount => format!("{}: -${}", self.label, format_money(self.amount)),
            LineKind::Charge | LineKind::Subtotal => {
                format!("{}: ${}", self.label, format_money(self.amount))
            }
        }
    }
}

/// Rendered breakdown of a priced quote
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Breakdown {
    pub lines: Vec<BreakdownLine>,
    #[serde(with = "rust_decimal::serde::str")]
    pub total: Decimal,
}

#[derive(Template)]
#[template(path = "breakdown.html")]
struct BreakdownTemplate {
    lines: Vec<String>,
    total: String,
}

impl Breakdown {
    pub fn build(result: &QuoteResult, engine: &PricingEngine) -> Self {
        let rates = engine.rates();
        let tier = result.tier;
        let hourly = format_quantity(rates.msp_hourly_rate);
        let mut lines = Vec::new();

        lines.push(BreakdownLine::charge(
            format!(
                "Base Security Cost ({} devices @ ${}/device)",
                result.device_count,
                format_quantity(*rates.base_price.get(tier))
            ),
            result.base_cost,
        ));

        if result.extra_email_cost > Decimal::ZERO {
            lines.push(BreakdownLine::charge(
                "Extra Emails Cost".to_string(),
                result.extra_email_cost,
            ));
        }

        if result.server_cost > Decimal::ZERO {
            lines.push(BreakdownLine::charge(
                "Server Protection Cost".to_string(),
                result.server_cost,
            ));
        }

        if result.server_backup_cost > Decimal::ZERO {
            let label = match &result.server_backup_label {
                Some(capacity) => format!("Server Backup ({})", capacity),
                None => "Server Backup".to_string(),
            };
            lines.push(BreakdownLine::charge(label, result.server_backup_cost));
        }

        lines.push(BreakdownLine::charge(
            format!(
                "Fixed Monthly Labor ({} hours @ ${}/hr)",
                format_quantity(*rates.fixed_labor_hours.get(tier)),
                hourly
            ),
            result.fixed_labor_cost,
        ));

        if result.bolt_on_cost > Decimal::ZERO {
            let fee = format_quantity(rates.bolt_on_fee);
            let label = match engine.bolt_on_pricing() {
                BoltOnPricing::PerOption => format!(
                    "Additional Security Options ({} @ ${} each)",
                    result.charged_bolt_ons.len(),
                    fee
                ),
                BoltOnPricing::FlatPerUser => format!(
                    "Additional Security Options ({} users @ ${}/user)",
                    result.user_count, fee
                ),
            };
            lines.push(BreakdownLine::charge(label, result.bolt_on_cost));
        }

        if result.advanced_security_cost > Decimal::ZERO {
            lines.push(BreakdownLine::charge(
                format!(
                    "Advanced Security ({} @ ${} each)",
                    result.charged_advanced_security.len(),
                    format_quantity(*rates.advanced_security_fee.get(tier))
                ),
                result.advanced_security_cost,
            ));
        }

        if result.msp_cost > Decimal::ZERO {
            lines.push(BreakdownLine::charge(
                format!(
                    "Prepaid MSP Support ({} hours @ ${}/hr)",
                    format_quantity(result.msp_hours),
                    hourly
                ),
                result.msp_cost,
            ));
        }

        lines.push(BreakdownLine {
            label: "Subtotal".to_string(),
            amount: result.subtotal,
            kind: LineKind::Subtotal,
        });

        if result.discount_amount > Decimal::ZERO {
            lines.push(BreakdownLine {
                label: format!("Volume Discount ({}%)", format_percent(result.discount_rate)),
                amount: result.discount_amount,
                kind: LineKind::Discount,
            });
        }

        Self {
            lines,
            total: result.total,
        }
    }

    pub fn total_text(&self) -> String {
        format!("Total Monthly Cost: ${}", format_money(self.total))
    }

    pub fn line_texts(&self) -> Vec<String> {
        self.lines.iter().map(BreakdownLine::text).collect()
    }

    /// One line per item followed by the total
    pub fn to_text(&self) -> String {
        let mut out = self.line_texts();
        out.push(self.total_text());
        out.join("\n")
    }

    /// HTML fragment for the results panel
    pub fn to_html(&self) -> Result<String, RenderError> {
        let template = BreakdownTemplate {
            lines: self.line_texts(),
            total: self.total_text(),
        };
        Ok(template.render()?)
    }
}
