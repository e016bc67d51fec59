//! Run parameters and validation for patchward
//!
//! The policy is parameterized by four integers supplied by the management
//! agent: deferral limit in days, quiet-hours start and end hour, and
//! minimum battery percentage. They are validated here before any side
//! effect; invalid input is a fatal configuration error.

mod assets;
mod policy;
mod validation;

pub use assets::*;
pub use policy::*;
pub use validation::*;

use thiserror::Error;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Validation failed: {errors:?}")]
    ValidationFailed { errors: Vec<ValidationError> },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;
    use patchward_util::QuietHours;

    #[test]
    fn build_policy_from_valid_parameters() {
        let raw = RawParameters {
            defer_limit_days: 3,
            quiet_hours_start: 23,
            quiet_hours_end: 5,
            min_battery_percent: 50,
        };

        let policy = build_policy(raw, RunPaths::defaults()).unwrap();
        assert_eq!(policy.defer_limit_days, 3);
        assert_eq!(policy.quiet_hours, QuietHours::new(23, 5).unwrap());
        assert_eq!(policy.min_battery_percent, 50);
    }

    #[test]
    fn reject_out_of_range_parameters() {
        let raw = RawParameters {
            defer_limit_days: -1,
            quiet_hours_start: 24,
            quiet_hours_end: 5,
            min_battery_percent: 101,
        };

        let err = build_policy(raw, RunPaths::defaults()).unwrap_err();
        let ConfigError::ValidationFailed { errors } = err;
        assert_eq!(errors.len(), 3);
    }
}
