//! Core pricing calculation functions.
//!
//! Pure functions for quote math - no configuration lookups, no logging.

use rust_decimal::prelude::*;
use rust_decimal::Decimal;

use super::models::DiscountBand;

/// Round to specified decimal places using banker's rounding (ROUND_HALF_EVEN).
///
/// Banker's rounding rounds to the nearest even number when the value is exactly
/// halfway between two possibilities. This reduces cumulative rounding bias.
///
/// # Examples
/// ```
/// use rust_decimal_macros::dec;
/// use security_quote::pricing::round_money;
///
/// assert_eq!(round_money(dec!(2.5), 0), dec!(2));   // rounds to even
/// assert_eq!(round_money(dec!(3.5), 0), dec!(4));   // rounds to even
/// assert_eq!(round_money(dec!(1.234), 2), dec!(1.23));
/// ```
pub fn round_money(amount: Decimal, places: u32) -> Decimal {
    amount.round_dp_with_strategy(places, RoundingStrategy::MidpointNearestEven)
}

/// Format an amount as dollars and cents, e.g. `1225.00`.
///
/// This is the only place money is rounded; accumulation keeps full precision.
pub fn format_money(amount: Decimal) -> String {
    format!("{:.2}", round_money(amount, 2))
}

/// Format a quantity or rate without trailing zeros (`2.50` -> `2.5`, `120.00` -> `120`)
pub fn format_quantity(value: Decimal) -> String {
    value.normalize().to_string()
}

/// Format a discount rate as a whole percentage (`0.05` -> `5`)
pub fn format_percent(rate: Decimal) -> String {
    format_quantity(rate * Decimal::ONE_HUNDRED)
}

/// Units above the per-user allotment (one mailbox / one device per user)
pub fn extra_units(count: u32, included: u32) -> u32 {
    count.saturating_sub(included)
}

/// Volume discount rate for a user count.
///
/// The band with the highest threshold that the user count strictly exceeds
/// wins; no matching band means no discount.
pub fn volume_discount_rate(user_count: u32, bands: &[DiscountBand]) -> Decimal {
    bands
        .iter()
        .filter(|band| user_count > band.above_users)
        .max_by_key(|band| band.above_users)
        .map(|band| band.rate)
        .unwrap_or(Decimal::ZERO)
}

/// Extra monthly cost per user once devices and mailboxes above the user
/// count are spread across the seats.
///
/// Returns zero when there are no users to spread over.
pub fn extra_cost_per_seat(
    users: u32,
    devices: u32,
    emails: u32,
    device_price: Decimal,
    email_price: Decimal,
) -> Decimal {
    if users == 0 {
        return Decimal::ZERO;
    }

    let extra_device_cost = Decimal::from(extra_units(devices, users)) * device_price;
    let extra_email_cost = Decimal::from(extra_units(emails, users)) * email_price;

    (extra_device_cost + extra_email_cost) / Decimal::from(users)
}
