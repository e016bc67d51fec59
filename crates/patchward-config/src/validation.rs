//! Parameter validation

use thiserror::Error;

use crate::RawParameters;

/// Validation error
#[derive(Debug, Clone, Error)]
pub enum ValidationError {
    #[error("{name} must be a clock hour in 0..24, got {value}")]
    HourOutOfRange { name: &'static str, value: i64 },

    #[error("Minimum battery percentage must be in 0..=100, got {0}")]
    BatteryOutOfRange(i64),

    #[error("Deferral limit must be in 0..=365 days, got {0}")]
    DeferLimitOutOfRange(i64),
}

/// Validate the raw run parameters, collecting every problem rather than
/// stopping at the first.
pub fn validate_parameters(raw: &RawParameters) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if !(0..=365).contains(&raw.defer_limit_days) {
        errors.push(ValidationError::DeferLimitOutOfRange(raw.defer_limit_days));
    }
    if !(0..24).contains(&raw.quiet_hours_start) {
        errors.push(ValidationError::HourOutOfRange {
            name: "Quiet-hours start",
            value: raw.quiet_hours_start,
        });
    }
    if !(0..24).contains(&raw.quiet_hours_end) {
        errors.push(ValidationError::HourOutOfRange {
            name: "Quiet-hours end",
            value: raw.quiet_hours_end,
        });
    }
    if !(0..=100).contains(&raw.min_battery_percent) {
        errors.push(ValidationError::BatteryOutOfRange(raw.min_battery_percent));
    }

    errors
}
