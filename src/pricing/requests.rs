//! Input record collected from the quote form.

use std::collections::BTreeSet;

use rust_decimal::Decimal;
use serde::Deserialize;

use super::models::Tier;

/// Raw quote form values.
///
/// Counts of zero and a missing tier are normal while the form is being
/// filled in; the engine declines such input instead of failing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct QuoteInput {
    #[serde(default)]
    pub user_count: u32,
    #[serde(default)]
    pub device_count: u32,
    #[serde(default)]
    pub email_count: u32,
    #[serde(default)]
    pub tier: Option<Tier>,
    #[serde(default)]
    pub server_protection: bool,
    /// Backup capacity key, only read when `server_protection` is set
    #[serde(default)]
    pub server_backup_capacity: Option<String>,
    #[serde(default)]
    pub include_msp: bool,
    /// Prepaid support hours, only read when `include_msp` is set
    #[serde(default)]
    pub msp_hours: Decimal,
    #[serde(default)]
    pub selected_bolt_ons: BTreeSet<String>,
    #[serde(default)]
    pub selected_advanced_security: BTreeSet<String>,
}

impl QuoteInput {
    /// Input with the three required counts and a tier, no add-ons
    pub fn new(user_count: u32, device_count: u32, email_count: u32, tier: Tier) -> Self {
        Self {
            user_count,
            device_count,
            email_count,
            tier: Some(tier),
            ..Self::default()
        }
    }

    /// MSP hours that will actually be billed
    pub fn billed_msp_hours(&self) -> Decimal {
        if self.include_msp {
            self.msp_hours
        } else {
            Decimal::ZERO
        }
    }

    /// Backup capacity that will actually be billed
    pub fn billed_backup_capacity(&self) -> Option<&str> {
        if self.server_protection {
            self.server_backup_capacity.as_deref()
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_deserialize_partial_form() {
        let input: QuoteInput = serde_json::from_str(r#"{"user_count": 12}"#).unwrap();
        assert_eq!(input.user_count, 12);
        assert_eq!(input.device_count, 0);
        assert_eq!(input.tier, None);
        assert!(input.selected_bolt_ons.is_empty());
    }

    #[test]
    fn test_deserialize_full_form() {
        let input: QuoteInput = serde_json::from_str(
            r#"{
                "user_count": 30,
                "device_count": 35,
                "email_count": 40,
                "tier": "gold",
                "server_protection": true,
                "server_backup_capacity": "1000",
                "include_msp": true,
                "msp_hours": "4.5",
                "selected_bolt_ons": ["darkWeb", "mfa"],
                "selected_advanced_security": ["penetrationTest"]
            }"#,
        )
        .unwrap();

        assert_eq!(input.tier, Some(Tier::Gold));
        assert_eq!(input.msp_hours, dec!(4.5));
        assert_eq!(input.selected_bolt_ons.len(), 2);
        assert!(input.selected_advanced_security.contains("penetrationTest"));
    }

    #[test]
    fn test_billed_msp_hours_requires_opt_in() {
        let mut input = QuoteInput::new(1, 1, 1, Tier::Silver);
        input.msp_hours = dec!(6);
        assert_eq!(input.billed_msp_hours(), dec!(0));

        input.include_msp = true;
        assert_eq!(input.billed_msp_hours(), dec!(6));
    }

    #[test]
    fn test_billed_backup_requires_server_protection() {
        let mut input = QuoteInput::new(1, 1, 1, Tier::Silver);
        input.server_backup_capacity = Some("300".to_string());
        assert_eq!(input.billed_backup_capacity(), None);

        input.server_protection = true;
        assert_eq!(input.billed_backup_capacity(), Some("300"));
    }
}
