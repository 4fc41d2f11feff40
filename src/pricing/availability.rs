//! Bolt-on availability rules.
//!
//! Each tier caps how many chargeable bolt-ons can be picked. Features the tier
//! includes are always selected, locked, and never count against the cap.

use std::collections::BTreeSet;

use serde::Serialize;

use super::models::{RateTable, Tier};
use super::services::PricingError;

/// State of one bolt-on option on the form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OptionState {
    Enabled,
    Disabled,
    /// Included in the tier: selected and cannot be unchecked
    IncludedLocked,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OptionAvailability {
    pub id: String,
    pub label: String,
    pub selected: bool,
    pub state: OptionState,
}

/// Evaluated bolt-on options for a tier
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BoltOnAvailability {
    pub tier: Tier,
    pub max_bolt_ons: u32,
    pub remaining_slots: u32,
    /// In catalogue order
    pub options: Vec<OptionAvailability>,
}

impl BoltOnAvailability {
    /// Evaluate every option from scratch for `tier`.
    ///
    /// Selected ids outside the catalogue are ignored here; pricing rejects them.
    pub fn evaluate(tier: Tier, selected: &BTreeSet<String>, rates: &RateTable) -> Self {
        let max_bolt_ons = *rates.max_bolt_ons.get(tier);
        let counted = counted_selections(tier, selected, rates);
        let remaining_slots = max_bolt_ons.saturating_sub(counted);

        let options = rates
            .bolt_ons
            .iter()
            .map(|feature| {
                let included = rates.is_included(tier, &feature.id);
                let is_selected = included || selected.contains(&feature.id);
                let state = if included {
                    OptionState::IncludedLocked
                } else if !is_selected && remaining_slots == 0 {
                    OptionState::Disabled
                } else {
                    OptionState::Enabled
                };

                OptionAvailability {
                    id: feature.id.clone(),
                    label: feature.label.clone(),
                    selected: is_selected,
                    state,
                }
            })
            .collect();

        Self {
            tier,
            max_bolt_ons,
            remaining_slots,
            options,
        }
    }

    pub fn option(&self, id: &str) -> Option<&OptionAvailability> {
        self.options.iter().find(|o| o.id == id)
    }

    pub fn state_of(&self, id: &str) -> Option<OptionState> {
        self.option(id).map(|o| o.state)
    }

    /// Text shown under the bolt-on list
    pub fn summary(&self) -> String {
        format!(
            "{} options remaining for {} tier",
            self.remaining_slots, self.tier
        )
    }
}

/// Selected catalogue bolt-ons that count against the tier cap
fn counted_selections(tier: Tier, selected: &BTreeSet<String>, rates: &RateTable) -> u32 {
    let counted = selected
        .iter()
        .filter(|id| rates.bolt_on(id).is_some() && !rates.is_included(tier, id))
        .count();
    u32::try_from(counted).unwrap_or(u32::MAX)
}

/// Bolt-on selection as the form holds it, enforcing the tier rules on every change
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoltOnSelection {
    tier: Tier,
    selected: BTreeSet<String>,
}

impl BoltOnSelection {
    /// Empty selection for `tier`, with the tier's included features checked
    pub fn new(tier: Tier, rates: &RateTable) -> Self {
        let mut selection = Self {
            tier,
            selected: BTreeSet::new(),
        };
        selection.lock_included(rates);
        selection
    }

    pub fn tier(&self) -> Tier {
        self.tier
    }

    pub fn selected(&self) -> &BTreeSet<String> {
        &self.selected
    }

    pub fn is_selected(&self, id: &str) -> bool {
        self.selected.contains(id)
    }

    /// Check an option, rejecting it once the tier cap is used up
    pub fn select(&mut self, id: &str, rates: &RateTable) -> Result<(), PricingError> {
        if rates.bolt_on(id).is_none() {
            return Err(PricingError::UnknownFeature {
                catalogue: "bolt-on".to_string(),
                id: id.to_string(),
            });
        }
        if self.selected.contains(id) {
            return Ok(());
        }

        let max = *rates.max_bolt_ons.get(self.tier);
        if counted_selections(self.tier, &self.selected, rates) >= max {
            return Err(PricingError::BoltOnLimitReached {
                tier: self.tier,
                max,
            });
        }

        self.selected.insert(id.to_string());
        Ok(())
    }

    /// Uncheck an option; included features stay locked
    pub fn deselect(&mut self, id: &str, rates: &RateTable) -> Result<(), PricingError> {
        if rates.is_included(self.tier, id) {
            return Err(PricingError::FeatureLocked {
                tier: self.tier,
                id: id.to_string(),
            });
        }
        self.selected.remove(id);
        Ok(())
    }

    /// Switch tier.
    ///
    /// The new tier's included features are checked. Features only the old tier
    /// included stay checked but become ordinary, chargeable selections.
    pub fn set_tier(&mut self, tier: Tier, rates: &RateTable) {
        self.tier = tier;
        self.lock_included(rates);
    }

    pub fn availability(&self, rates: &RateTable) -> BoltOnAvailability {
        BoltOnAvailability::evaluate(self.tier, &self.selected, rates)
    }

    fn lock_included(&mut self, rates: &RateTable) {
        for id in rates.included_features.get(self.tier) {
            self.selected.insert(id.clone());
        }
    }
}
