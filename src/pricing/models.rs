//! Rate configuration for security quotes.
//!
//! The rate table is plain data. The engine receives it at construction and
//! never reaches for global state; every per-tier value lives in a
//! [`TierTable`] so a tier lookup cannot miss.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::config::ConfigError;

use super::services::PricingError;

/// Service plan selected on the quote form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Silver,
    Gold,
    Platinum,
}

impl Tier {
    /// All tiers, cheapest first
    pub const ALL: [Tier; 3] = [Tier::Silver, Tier::Gold, Tier::Platinum];

    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Silver => "silver",
            Tier::Gold => "gold",
            Tier::Platinum => "platinum",
        }
    }

    /// Capitalized name used on quote documents ("Gold")
    pub fn display_name(&self) -> &'static str {
        match self {
            Tier::Silver => "Silver",
            Tier::Gold => "Gold",
            Tier::Platinum => "Platinum",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tier {
    type Err = PricingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "silver" => Ok(Tier::Silver),
            "gold" => Ok(Tier::Gold),
            "platinum" => Ok(Tier::Platinum),
            _ => Err(PricingError::UnknownRate {
                table: "tier".to_string(),
                key: s.to_string(),
            }),
        }
    }
}

/// One value per tier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierTable<T> {
    pub silver: T,
    pub gold: T,
    pub platinum: T,
}

impl<T> TierTable<T> {
    pub fn new(silver: T, gold: T, platinum: T) -> Self {
        Self { silver, gold, platinum }
    }

    pub fn get(&self, tier: Tier) -> &T {
        match tier {
            Tier::Silver => &self.silver,
            Tier::Gold => &self.gold,
            Tier::Platinum => &self.platinum,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Tier, &T)> {
        Tier::ALL.into_iter().map(move |tier| (tier, self.get(tier)))
    }
}

/// A selectable feature (bolt-on or advanced security item)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSpec {
    pub id: String,
    pub label: String,
}

impl FeatureSpec {
    pub fn new(id: &str, label: &str) -> Self {
        Self {
            id: id.to_string(),
            label: label.to_string(),
        }
    }
}

/// Server backup capacity option with its flat monthly fee
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupTier {
    pub label: String,
    pub fee: Decimal,
}

/// Volume discount band: `rate` applies when the user count is strictly above `above_users`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscountBand {
    pub above_users: u32,
    pub rate: Decimal,
}

/// How selected (non-included) bolt-ons are billed.
///
/// Both policies appear in the calculator's history, so the choice is
/// configuration rather than code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoltOnPricing {
    /// `bolt_on_fee` for each charged bolt-on
    #[default]
    PerOption,
    /// `bolt_on_fee` per user, charged once if any bolt-on is charged
    FlatPerUser,
}

impl FromStr for BoltOnPricing {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "per_option" => Ok(BoltOnPricing::PerOption),
            "flat_per_user" => Ok(BoltOnPricing::FlatPerUser),
            other => Err(ConfigError::InvalidValue {
                key: "QUOTE_BOLT_ON_PRICING".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

/// Static pricing configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateTable {
    /// Monthly price per device
    pub base_price: TierTable<Decimal>,
    /// Price per device above the user count (tier previews only)
    pub device_price: TierTable<Decimal>,
    /// Price per mailbox above the user count
    pub email_price: TierTable<Decimal>,
    pub server_cost: Decimal,
    pub msp_hourly_rate: Decimal,
    /// Mandatory monthly service hours per tier
    pub fixed_labor_hours: TierTable<Decimal>,
    /// Capacity key (GB) -> backup option
    pub server_backup: BTreeMap<String, BackupTier>,
    /// Fee per charged advanced security item
    pub advanced_security_fee: TierTable<Decimal>,
    pub bolt_on_fee: Decimal,
    pub max_bolt_ons: TierTable<u32>,
    /// Bolt-ons granted free and locked as selected
    pub included_features: TierTable<Vec<String>>,
    pub included_advanced_security: TierTable<Vec<String>>,
    pub volume_discounts: Vec<DiscountBand>,
    pub bolt_ons: Vec<FeatureSpec>,
    pub advanced_security: Vec<FeatureSpec>,
    /// Features every tier lists on the quote document
    pub base_features: Vec<String>,
}

impl RateTable {
    pub fn bolt_on(&self, id: &str) -> Option<&FeatureSpec> {
        self.bolt_ons.iter().find(|f| f.id == id)
    }

    pub fn advanced_security_item(&self, id: &str) -> Option<&FeatureSpec> {
        self.advanced_security.iter().find(|f| f.id == id)
    }

    pub fn is_included(&self, tier: Tier, id: &str) -> bool {
        self.included_features.get(tier).iter().any(|f| f == id)
    }

    pub fn is_included_advanced(&self, tier: Tier, id: &str) -> bool {
        self.included_advanced_security
            .get(tier)
            .iter()
            .any(|f| f == id)
    }

    /// Look up a backup option, failing on keys the table does not know
    pub fn backup(&self, key: &str) -> Result<&BackupTier, PricingError> {
        self.server_backup
            .get(key)
            .ok_or_else(|| PricingError::UnknownRate {
                table: "server_backup".to_string(),
                key: key.to_string(),
            })
    }

    /// Check internal consistency, collecting every problem found
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        for (tier, ids) in self.included_features.iter() {
            for id in ids {
                if self.bolt_on(id).is_none() {
                    errors.push(format!("included_features.{}: unknown bolt-on '{}'", tier, id));
                }
            }
        }

        for (tier, ids) in self.included_advanced_security.iter() {
            for id in ids {
                if self.advanced_security_item(id).is_none() {
                    errors.push(format!(
                        "included_advanced_security.{}: unknown item '{}'",
                        tier, id
                    ));
                }
            }
        }

        for band in &self.volume_discounts {
            if band.rate < Decimal::ZERO || band.rate > Decimal::ONE {
                errors.push(format!(
                    "volume_discounts: rate {} above {} users is outside 0..=1",
                    band.rate, band.above_users
                ));
            }
        }

        let tier_rates = [
            ("base_price", &self.base_price),
            ("device_price", &self.device_price),
            ("email_price", &self.email_price),
            ("fixed_labor_hours", &self.fixed_labor_hours),
            ("advanced_security_fee", &self.advanced_security_fee),
        ];
        for (name, table) in tier_rates {
            for (tier, value) in table.iter() {
                if *value < Decimal::ZERO {
                    errors.push(format!("{}.{} must not be negative", name, tier));
                }
            }
        }

        let negative_rates = [
            ("server_cost", self.server_cost),
            ("msp_hourly_rate", self.msp_hourly_rate),
            ("bolt_on_fee", self.bolt_on_fee),
        ];
        for (name, value) in negative_rates {
            if value < Decimal::ZERO {
                errors.push(format!("{} must not be negative", name));
            }
        }

        for (key, backup) in &self.server_backup {
            if backup.fee < Decimal::ZERO {
                errors.push(format!("server_backup.{}: fee must not be negative", key));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::InvalidRateTable { errors })
        }
    }
}

impl Default for RateTable {
    fn default() -> Self {
        let backup = |label: &str, fee: Decimal| BackupTier {
            label: label.to_string(),
            fee,
        };

        Self {
            base_price: TierTable::new(dec!(25), dec!(35), dec!(45)),
            device_price: TierTable::new(dec!(8), dec!(10), dec!(12)),
            email_price: TierTable::new(dec!(6), dec!(8), dec!(10)),
            server_cost: dec!(22.50),
            msp_hourly_rate: dec!(120),
            fixed_labor_hours: TierTable::new(dec!(2), dec!(2.5), dec!(3)),
            server_backup: BTreeMap::from([
                ("300".to_string(), backup("300 GB", dec!(150))),
                ("1000".to_string(), backup("1 TB", dec!(300))),
                ("15000".to_string(), backup("15 TB", dec!(1200))),
            ]),
            advanced_security_fee: TierTable::new(dec!(250), dec!(200), dec!(0)),
            bolt_on_fee: dec!(10),
            max_bolt_ons: TierTable::new(1, 3, 5),
            included_features: TierTable::new(
                vec![],
                vec!["soc".to_string()],
                vec!["soc".to_string(), "attackSim".to_string()],
            ),
            included_advanced_security: TierTable::new(
                vec![],
                vec![],
                vec!["vulnerabilityScan".to_string(), "penetrationTest".to_string()],
            ),
            volume_discounts: vec![
                DiscountBand {
                    above_users: 50,
                    rate: dec!(0.10),
                },
                DiscountBand {
                    above_users: 25,
                    rate: dec!(0.05),
                },
            ],
            bolt_ons: vec![
                FeatureSpec::new("soc", "Security Operations Center (SOC)"),
                FeatureSpec::new("attackSim", "Attack Simulation"),
                FeatureSpec::new("darkWeb", "Dark Web Monitoring"),
                FeatureSpec::new("emailFiltering", "Advanced Email Filtering"),
                FeatureSpec::new("securityTraining", "Security Awareness Training"),
                FeatureSpec::new("mfa", "Multi-Factor Authentication"),
            ],
            advanced_security: vec![
                FeatureSpec::new("vulnerabilityScan", "Vulnerability Scan"),
                FeatureSpec::new("penetrationTest", "Penetration Test"),
            ],
            base_features: vec![
                "Endpoint Protection".to_string(),
                "Daily/Weekly Device Updates".to_string(),
                "Remote Monitoring and Management".to_string(),
            ],
        }
    }
}
