//! Quote pricing service.
//!
//! `PricingEngine` holds the injected rate table and billing policy and turns
//! a `QuoteInput` into a `QuoteOutcome`. Every cost line is computed in full
//! precision; nothing here rounds.

use std::collections::BTreeSet;
use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::debug;

use super::availability::BoltOnAvailability;
use super::calculators::{extra_cost_per_seat, extra_units, volume_discount_rate};
use super::models::{BoltOnPricing, RateTable, Tier};
use super::requests::QuoteInput;
use super::responses::{DeclineReason, QuoteOutcome, QuoteResult, TierPricePreview};

/// Pricing calculation error types
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PricingError {
    #[error("No rate found in {table} for key '{key}'")]
    UnknownRate { table: String, key: String },

    #[error("Unknown {catalogue} option '{id}'")]
    UnknownFeature { catalogue: String, id: String },

    #[error("The {tier} tier allows at most {max} additional options")]
    BoltOnLimitReached { tier: Tier, max: u32 },

    #[error("'{id}' is included in the {tier} tier and cannot be removed")]
    FeatureLocked { tier: Tier, id: String },

    #[error("Invalid quantity for {field}: {value}")]
    InvalidQuantity { field: String, value: String },

    #[error("Amount out of range while computing {field}")]
    Overflow { field: String },
}

/// Pricing engine over an immutable rate table
#[derive(Debug, Clone)]
pub struct PricingEngine {
    rates: Arc<RateTable>,
    bolt_on_pricing: BoltOnPricing,
}

impl PricingEngine {
    pub fn new(rates: RateTable, bolt_on_pricing: BoltOnPricing) -> Self {
        Self {
            rates: Arc::new(rates),
            bolt_on_pricing,
        }
    }

    pub fn rates(&self) -> &RateTable {
        &self.rates
    }

    pub fn bolt_on_pricing(&self) -> BoltOnPricing {
        self.bolt_on_pricing
    }

    /// Price a quote.
    ///
    /// Incomplete input (a zero count or no tier) is declined, not an error.
    /// Unknown backup capacities and feature ids fail instead of pricing as zero.
    /// Amounts too large for a `Decimal` fail with [`PricingError::Overflow`].
    pub fn compute(&self, input: &QuoteInput) -> Result<QuoteOutcome, PricingError> {
        let tier = match check_required(input) {
            Ok(tier) => tier,
            Err(reason) => {
                debug!(?reason, "Quote declined");
                return Ok(QuoteOutcome::Declined { reason });
            }
        };

        let msp_hours = input.billed_msp_hours();
        if msp_hours < Decimal::ZERO {
            return Err(PricingError::InvalidQuantity {
                field: "msp_hours".to_string(),
                value: msp_hours.to_string(),
            });
        }

        let rates = &*self.rates;

        let base_cost = checked(
            rates.base_price.get(tier).checked_mul(Decimal::from(input.device_count)),
            "base_cost",
        )?;

        let extra_emails = extra_units(input.email_count, input.user_count);
        let extra_email_cost = checked(
            Decimal::from(extra_emails).checked_mul(*rates.email_price.get(tier)),
            "extra_email_cost",
        )?;

        let server_cost = if input.server_protection {
            rates.server_cost
        } else {
            Decimal::ZERO
        };

        let (server_backup_cost, server_backup_label) = match input.billed_backup_capacity() {
            Some(key) => {
                let backup = rates.backup(key)?;
                (backup.fee, Some(backup.label.clone()))
            }
            None => (Decimal::ZERO, None),
        };

        let fixed_labor_cost = checked(
            rates.fixed_labor_hours.get(tier).checked_mul(rates.msp_hourly_rate),
            "fixed_labor_cost",
        )?;

        let charged_bolt_ons = self.charged_bolt_ons(tier, &input.selected_bolt_ons)?;
        let bolt_on_cost = self.bolt_on_cost(charged_bolt_ons.len(), input.user_count)?;

        let charged_advanced_security =
            self.charged_advanced_security(tier, &input.selected_advanced_security)?;
        let advanced_security_cost = checked(
            rates
                .advanced_security_fee
                .get(tier)
                .checked_mul(Decimal::from(charged_advanced_security.len())),
            "advanced_security_cost",
        )?;

        let subtotal = [
            extra_email_cost,
            server_cost,
            server_backup_cost,
            fixed_labor_cost,
            bolt_on_cost,
            advanced_security_cost,
        ]
        .into_iter()
        .try_fold(base_cost, |sum, line| checked(sum.checked_add(line), "subtotal"))?;

        // Prepaid MSP hours are added after the discount and never discounted
        let discount_rate = volume_discount_rate(input.user_count, &rates.volume_discounts);
        let discount_amount = checked(subtotal.checked_mul(discount_rate), "discount_amount")?;
        let msp_cost = checked(msp_hours.checked_mul(rates.msp_hourly_rate), "msp_cost")?;
        let total = checked(
            subtotal
                .checked_sub(discount_amount)
                .and_then(|net| net.checked_add(msp_cost)),
            "total",
        )?;

        debug!(
            tier = %tier,
            %subtotal,
            %discount_amount,
            %msp_cost,
            %total,
            "Quote priced"
        );

        Ok(QuoteOutcome::Priced(QuoteResult {
            tier,
            user_count: input.user_count,
            device_count: input.device_count,
            email_count: input.email_count,
            server_protection: input.server_protection,
            include_msp: input.include_msp,
            base_cost,
            extra_email_cost,
            server_cost,
            server_backup_cost,
            server_backup_label,
            fixed_labor_cost,
            bolt_on_cost,
            advanced_security_cost,
            msp_cost,
            subtotal,
            discount_rate,
            discount_amount,
            total,
            msp_hours,
            charged_bolt_ons,
            charged_advanced_security,
        }))
    }

    /// Bolt-on option states for a tier and the current selection
    pub fn availability(&self, tier: Tier, selected: &BTreeSet<String>) -> BoltOnAvailability {
        BoltOnAvailability::evaluate(tier, selected, &self.rates)
    }

    /// Adjusted per-device price of every tier for the given counts.
    ///
    /// Empty until all three counts are known.
    pub fn tier_previews(&self, users: u32, devices: u32, emails: u32) -> Vec<TierPricePreview> {
        if users == 0 || devices == 0 || emails == 0 {
            return vec![];
        }

        Tier::ALL
            .into_iter()
            .map(|tier| {
                let base_price = *self.rates.base_price.get(tier);
                let adjusted_price = base_price
                    + extra_cost_per_seat(
                        users,
                        devices,
                        emails,
                        *self.rates.device_price.get(tier),
                        *self.rates.email_price.get(tier),
                    );

                TierPricePreview {
                    tier,
                    base_price,
                    adjusted_price,
                    discounted: adjusted_price < base_price,
                }
            })
            .collect()
    }

    fn charged_bolt_ons(
        &self,
        tier: Tier,
        selected: &BTreeSet<String>,
    ) -> Result<Vec<String>, PricingError> {
        let mut charged = Vec::new();
        for id in selected {
            if self.rates.bolt_on(id).is_none() {
                return Err(PricingError::UnknownFeature {
                    catalogue: "bolt-on".to_string(),
                    id: id.clone(),
                });
            }
            if !self.rates.is_included(tier, id) {
                charged.push(id.clone());
            }
        }
        Ok(charged)
    }

    fn charged_advanced_security(
        &self,
        tier: Tier,
        selected: &BTreeSet<String>,
    ) -> Result<Vec<String>, PricingError> {
        let mut charged = Vec::new();
        for id in selected {
            if self.rates.advanced_security_item(id).is_none() {
                return Err(PricingError::UnknownFeature {
                    catalogue: "advanced security".to_string(),
                    id: id.clone(),
                });
            }
            if !self.rates.is_included_advanced(tier, id) {
                charged.push(id.clone());
            }
        }
        Ok(charged)
    }

    fn bolt_on_cost(&self, charged: usize, user_count: u32) -> Result<Decimal, PricingError> {
        let units = match self.bolt_on_pricing {
            BoltOnPricing::PerOption => Decimal::from(charged),
            BoltOnPricing::FlatPerUser if charged > 0 => Decimal::from(user_count),
            BoltOnPricing::FlatPerUser => return Ok(Decimal::ZERO),
        };
        checked(self.rates.bolt_on_fee.checked_mul(units), "bolt_on_cost")
    }
}

impl Default for PricingEngine {
    fn default() -> Self {
        Self::new(RateTable::default(), BoltOnPricing::default())
    }
}

fn checked(value: Option<Decimal>, field: &str) -> Result<Decimal, PricingError> {
    value.ok_or_else(|| PricingError::Overflow {
        field: field.to_string(),
    })
}

fn check_required(input: &QuoteInput) -> Result<Tier, DeclineReason> {
    if input.user_count == 0 {
        return Err(DeclineReason::MissingUsers);
    }
    if input.device_count == 0 {
        return Err(DeclineReason::MissingDevices);
    }
    if input.email_count == 0 {
        return Err(DeclineReason::MissingEmails);
    }
    input.tier.ok_or(DeclineReason::MissingTier)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn engine() -> PricingEngine {
        PricingEngine::default()
    }

    fn priced(engine: &PricingEngine, input: &QuoteInput) -> QuoteResult {
        engine
            .compute(input)
            .unwrap()
            .into_priced()
            .expect("input should be priced")
    }

    fn select(ids: &[&str]) -> BTreeSet<String> {
        ids.iter().map(|id| id.to_string()).collect()
    }

    fn assert_total_identity(result: &QuoteResult) {
        assert_eq!(
            result.total,
            result.subtotal - result.discount_amount + result.msp_cost
        );
    }

    // ==================== declines ====================

    #[test]
    fn test_declines_incomplete_input() {
        let engine = engine();
        let complete = QuoteInput::new(10, 10, 10, Tier::Silver);

        let cases = [
            (QuoteInput { user_count: 0, ..complete.clone() }, DeclineReason::MissingUsers),
            (QuoteInput { device_count: 0, ..complete.clone() }, DeclineReason::MissingDevices),
            (QuoteInput { email_count: 0, ..complete.clone() }, DeclineReason::MissingEmails),
            (QuoteInput { tier: None, ..complete.clone() }, DeclineReason::MissingTier),
        ];

        for (input, expected) in cases {
            assert_eq!(
                engine.compute(&input).unwrap(),
                QuoteOutcome::Declined { reason: expected }
            );
        }
    }

    #[test]
    fn test_decline_wins_over_unknown_rate() {
        let mut input = QuoteInput::new(0, 10, 10, Tier::Gold);
        input.server_protection = true;
        input.server_backup_capacity = Some("bogus".to_string());

        assert!(engine().compute(&input).unwrap().is_declined());
    }

    // ==================== worked example ====================

    #[test]
    fn test_gold_example_quote() {
        let mut input = QuoteInput::new(30, 35, 40, Tier::Gold);
        input.server_protection = true;
        input.server_backup_capacity = Some("1000".to_string());
        input.include_msp = true;
        input.msp_hours = dec!(4);

        let result = priced(&engine(), &input);

        assert_eq!(result.base_cost, dec!(1225));
        assert_eq!(result.extra_email_cost, dec!(80));
        assert_eq!(result.server_cost, dec!(22.50));
        assert_eq!(result.server_backup_cost, dec!(300));
        assert_eq!(result.server_backup_label.as_deref(), Some("1 TB"));
        assert_eq!(result.fixed_labor_cost, dec!(300));
        assert_eq!(result.bolt_on_cost, dec!(0));
        assert_eq!(result.advanced_security_cost, dec!(0));
        assert_eq!(result.subtotal, dec!(1927.50));
        assert_eq!(result.discount_rate, dec!(0.05));
        assert_eq!(result.discount_amount, dec!(96.375));
        assert_eq!(result.msp_cost, dec!(480));
        assert_eq!(result.total, dec!(2311.125));
        assert_total_identity(&result);
    }

    // ==================== individual lines ====================

    #[test]
    fn test_base_cost_is_per_device() {
        let result = priced(&engine(), &QuoteInput::new(5, 12, 5, Tier::Platinum));
        assert_eq!(result.base_cost, dec!(540)); // 12 * 45
    }

    #[test]
    fn test_extra_email_cost() {
        let engine = engine();

        let fewer = priced(&engine, &QuoteInput::new(10, 10, 8, Tier::Silver));
        assert_eq!(fewer.extra_email_cost, dec!(0));

        let equal = priced(&engine, &QuoteInput::new(10, 10, 10, Tier::Silver));
        assert_eq!(equal.extra_email_cost, dec!(0));

        let one_over = priced(&engine, &QuoteInput::new(10, 10, 11, Tier::Silver));
        assert_eq!(one_over.extra_email_cost, dec!(6));

        let five_over = priced(&engine, &QuoteInput::new(10, 10, 15, Tier::Silver));
        assert_eq!(five_over.extra_email_cost, dec!(30));
    }

    #[test]
    fn test_server_backup_requires_protection_and_capacity() {
        let engine = engine();

        let mut input = QuoteInput::new(10, 10, 10, Tier::Silver);
        input.server_backup_capacity = Some("15000".to_string());
        let no_server = priced(&engine, &input);
        assert_eq!(no_server.server_cost, dec!(0));
        assert_eq!(no_server.server_backup_cost, dec!(0));

        input.server_protection = true;
        input.server_backup_capacity = None;
        let no_capacity = priced(&engine, &input);
        assert_eq!(no_capacity.server_cost, dec!(22.50));
        assert_eq!(no_capacity.server_backup_cost, dec!(0));

        input.server_backup_capacity = Some("15000".to_string());
        let both = priced(&engine, &input);
        assert_eq!(both.server_backup_cost, dec!(1200));
    }

    #[test]
    fn test_unknown_backup_capacity_fails_fast() {
        let mut input = QuoteInput::new(10, 10, 10, Tier::Silver);
        input.server_protection = true;
        input.server_backup_capacity = Some("500".to_string());

        assert_eq!(
            engine().compute(&input).unwrap_err(),
            PricingError::UnknownRate {
                table: "server_backup".to_string(),
                key: "500".to_string(),
            }
        );
    }

    #[test]
    fn test_unknown_backup_ignored_without_server_protection() {
        let mut input = QuoteInput::new(10, 10, 10, Tier::Silver);
        input.server_backup_capacity = Some("500".to_string());
        assert!(engine().compute(&input).is_ok());
    }

    #[test]
    fn test_fixed_labor_always_charged() {
        let engine = engine();
        for (tier, expected) in [
            (Tier::Silver, dec!(240)),
            (Tier::Gold, dec!(300)),
            (Tier::Platinum, dec!(360)),
        ] {
            let result = priced(&engine, &QuoteInput::new(1, 1, 1, tier));
            assert_eq!(result.fixed_labor_cost, expected);
        }
    }

    // ==================== bolt-ons ====================

    #[test]
    fn test_bolt_ons_per_option() {
        let mut input = QuoteInput::new(10, 10, 10, Tier::Gold);
        input.selected_bolt_ons = select(&["soc", "darkWeb", "mfa"]);

        let result = priced(&engine(), &input);
        // soc is included in gold
        assert_eq!(result.charged_bolt_ons, vec!["darkWeb", "mfa"]);
        assert_eq!(result.bolt_on_cost, dec!(20));
    }

    #[test]
    fn test_bolt_ons_flat_per_user() {
        let engine = PricingEngine::new(RateTable::default(), BoltOnPricing::FlatPerUser);

        let mut input = QuoteInput::new(12, 10, 10, Tier::Gold);
        input.selected_bolt_ons = select(&["darkWeb", "mfa"]);
        assert_eq!(priced(&engine, &input).bolt_on_cost, dec!(120));

        input.selected_bolt_ons = select(&["darkWeb"]);
        assert_eq!(priced(&engine, &input).bolt_on_cost, dec!(120));

        // Only the included feature: nothing charged
        input.selected_bolt_ons = select(&["soc"]);
        assert_eq!(priced(&engine, &input).bolt_on_cost, dec!(0));
    }

    #[test]
    fn test_included_bolt_ons_are_free() {
        let mut input = QuoteInput::new(10, 10, 10, Tier::Platinum);
        input.selected_bolt_ons = select(&["soc", "attackSim"]);

        let result = priced(&engine(), &input);
        assert!(result.charged_bolt_ons.is_empty());
        assert_eq!(result.bolt_on_cost, dec!(0));
    }

    #[test]
    fn test_unknown_bolt_on_fails() {
        let mut input = QuoteInput::new(10, 10, 10, Tier::Gold);
        input.selected_bolt_ons = select(&["quantumShield"]);

        assert!(matches!(
            engine().compute(&input),
            Err(PricingError::UnknownFeature { ref id, .. }) if id == "quantumShield"
        ));
    }

    // ==================== advanced security ====================

    #[test]
    fn test_advanced_security_per_item() {
        let mut input = QuoteInput::new(10, 10, 10, Tier::Silver);
        input.selected_advanced_security = select(&["vulnerabilityScan", "penetrationTest"]);

        let result = priced(&engine(), &input);
        assert_eq!(result.advanced_security_cost, dec!(500));
        assert_eq!(result.charged_advanced_security.len(), 2);
    }

    #[test]
    fn test_advanced_security_included_in_platinum() {
        let mut input = QuoteInput::new(10, 10, 10, Tier::Platinum);
        input.selected_advanced_security = select(&["vulnerabilityScan", "penetrationTest"]);

        let result = priced(&engine(), &input);
        assert_eq!(result.advanced_security_cost, dec!(0));
        assert!(result.charged_advanced_security.is_empty());
    }

    #[test]
    fn test_advanced_security_not_capped() {
        // silver allows one bolt-on; advanced security is separate
        let mut input = QuoteInput::new(10, 10, 10, Tier::Silver);
        input.selected_bolt_ons = select(&["darkWeb"]);
        input.selected_advanced_security = select(&["vulnerabilityScan", "penetrationTest"]);

        let result = priced(&engine(), &input);
        assert_eq!(result.bolt_on_cost, dec!(10));
        assert_eq!(result.advanced_security_cost, dec!(500));
    }

    // ==================== discount & MSP ====================

    #[test]
    fn test_discount_steps() {
        let engine = engine();
        let rate_for = |users| priced(&engine, &QuoteInput::new(users, 10, users, Tier::Silver)).discount_rate;

        assert_eq!(rate_for(25), dec!(0));
        assert_eq!(rate_for(26), dec!(0.05));
        assert_eq!(rate_for(50), dec!(0.05));
        assert_eq!(rate_for(51), dec!(0.10));
    }

    #[test]
    fn test_discount_never_applies_to_msp() {
        let mut input = QuoteInput::new(60, 10, 60, Tier::Silver);
        input.include_msp = true;
        input.msp_hours = dec!(8);

        let result = priced(&engine(), &input);
        // subtotal: 10 * 25 + 2 * 120 = 490
        assert_eq!(result.subtotal, dec!(490));
        assert_eq!(result.discount_amount, dec!(49));
        assert_eq!(result.msp_cost, dec!(960));
        assert_eq!(result.total, dec!(1401));
        assert_total_identity(&result);
    }

    #[test]
    fn test_msp_hours_ignored_when_not_included() {
        let mut input = QuoteInput::new(10, 10, 10, Tier::Silver);
        input.msp_hours = dec!(8);

        let result = priced(&engine(), &input);
        assert_eq!(result.msp_cost, dec!(0));
        assert_eq!(result.msp_hours, dec!(0));
    }

    #[test]
    fn test_fractional_msp_hours() {
        let mut input = QuoteInput::new(10, 10, 10, Tier::Silver);
        input.include_msp = true;
        input.msp_hours = dec!(2.5);

        assert_eq!(priced(&engine(), &input).msp_cost, dec!(300));
    }

    #[test]
    fn test_negative_msp_hours_rejected() {
        let mut input = QuoteInput::new(10, 10, 10, Tier::Silver);
        input.include_msp = true;
        input.msp_hours = dec!(-1);

        assert!(matches!(
            engine().compute(&input),
            Err(PricingError::InvalidQuantity { ref field, .. }) if field == "msp_hours"
        ));
    }

    #[test]
    fn test_huge_msp_hours_overflow_is_an_error() {
        let mut input = QuoteInput::new(10, 10, 10, Tier::Silver);
        input.include_msp = true;
        input.msp_hours = Decimal::MAX / dec!(10);

        assert_eq!(
            engine().compute(&input).unwrap_err(),
            PricingError::Overflow {
                field: "msp_cost".to_string(),
            }
        );
    }

    #[test]
    fn test_huge_rates_overflow_is_an_error() {
        let mut rates = RateTable::default();
        rates.base_price.gold = Decimal::MAX - dec!(100);
        let engine = PricingEngine::new(rates, BoltOnPricing::PerOption);

        let err = engine
            .compute(&QuoteInput::new(10, 10, 10, Tier::Gold))
            .unwrap_err();
        assert!(matches!(err, PricingError::Overflow { ref field } if field == "base_cost"));

        // a single device fits, but adding the labor line does not
        let err = engine
            .compute(&QuoteInput::new(1, 1, 1, Tier::Gold))
            .unwrap_err();
        assert!(matches!(err, PricingError::Overflow { ref field } if field == "subtotal"));
    }

    // ==================== properties ====================

    #[test]
    fn test_compute_is_idempotent() {
        let engine = engine();
        let mut input = QuoteInput::new(44, 70, 90, Tier::Platinum);
        input.server_protection = true;
        input.server_backup_capacity = Some("300".to_string());
        input.selected_bolt_ons = select(&["darkWeb", "mfa", "soc"]);
        input.include_msp = true;
        input.msp_hours = dec!(6);

        let first = engine.compute(&input).unwrap();
        let second = engine.compute(&input).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_total_identity_across_tiers_and_sizes() {
        let engine = engine();
        for tier in Tier::ALL {
            for users in [1, 25, 26, 50, 51, 120] {
                let mut input = QuoteInput::new(users, users + 3, users * 2, tier);
                input.include_msp = true;
                input.msp_hours = dec!(3.5);
                let result = priced(&engine, &input);
                assert_total_identity(&result);
                assert!(result.total >= Decimal::ZERO);
            }
        }
    }

    // ==================== tier previews ====================

    #[test]
    fn test_tier_previews() {
        let previews = engine().tier_previews(10, 15, 20);
        assert_eq!(previews.len(), 3);

        // silver: 25 + (5 * 8 + 10 * 6) / 10 = 35
        assert_eq!(previews[0].tier, Tier::Silver);
        assert_eq!(previews[0].adjusted_price, dec!(35));
        // platinum: 45 + (5 * 12 + 10 * 10) / 10 = 61
        assert_eq!(previews[2].adjusted_price, dec!(61));
        assert!(previews.iter().all(|p| !p.discounted));
    }

    #[test]
    fn test_tier_previews_need_all_counts() {
        assert!(engine().tier_previews(10, 0, 10).is_empty());
    }

    #[test]
    fn test_pricing_error_display() {
        let err = PricingError::BoltOnLimitReached {
            tier: Tier::Silver,
            max: 1,
        };
        assert_eq!(
            err.to_string(),
            "The silver tier allows at most 1 additional options"
        );

        let err = PricingError::FeatureLocked {
            tier: Tier::Gold,
            id: "soc".to_string(),
        };
        assert!(err.to_string().contains("soc"));
    }
}
