//! Recommended prepaid MSP hours.

use rust_decimal::Decimal;

/// (max devices, recommended hours), checked in order
const RECOMMENDED_HOURS: [(u32, u32); 3] = [(25, 2), (50, 4), (100, 6)];
const RECOMMENDED_HOURS_ABOVE: u32 = 8;

/// Suggested monthly MSP hours for a device count
pub fn recommended_msp_hours(device_count: u32) -> Decimal {
    let hours = RECOMMENDED_HOURS
        .iter()
        .find(|(max_devices, _)| device_count <= *max_devices)
        .map(|(_, hours)| *hours)
        .unwrap_or(RECOMMENDED_HOURS_ABOVE);
    Decimal::from(hours)
}

/// Hint shown next to the MSP hours field
pub fn recommendation_label(device_count: u32) -> String {
    format!("(Recommended: {} hours)", recommended_msp_hours(device_count))
}

/// MSP hours form field.
///
/// Tracks whether the current value was filled in from the recommendation, so a
/// device count change refreshes it without clobbering a manual entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MspHoursField {
    value: Option<Decimal>,
    was_recommended: bool,
}

impl MspHoursField {
    pub fn value(&self) -> Option<Decimal> {
        self.value
    }

    pub fn was_recommended(&self) -> bool {
        self.was_recommended
    }

    /// Refresh the recommendation for a new device count.
    ///
    /// The field is overwritten only when empty or still holding an earlier
    /// recommendation. Returns the recommendation either way.
    pub fn apply_recommendation(&mut self, device_count: u32) -> Decimal {
        let recommended = recommended_msp_hours(device_count);
        if self.value.is_none() || self.was_recommended {
            self.value = Some(recommended);
            self.was_recommended = true;
        }
        recommended
    }

    /// Value typed by the user; clearing the field makes it eligible for auto-fill again
    pub fn set_manual(&mut self, value: Option<Decimal>) {
        self.value = value;
        self.was_recommended = false;
    }
}
