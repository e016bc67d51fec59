//! Validated run policy

use patchward_util::QuietHours;
use std::path::PathBuf;
use std::time::Duration;

use crate::{validate_parameters, ConfigError, ConfigResult};

/// Raw run parameters as handed over by the management agent, before
/// validation.
#[derive(Debug, Clone, Copy)]
pub struct RawParameters {
    pub defer_limit_days: i64,
    pub quiet_hours_start: i64,
    pub quiet_hours_end: i64,
    pub min_battery_percent: i64,
}

/// Filesystem locations consulted during a run.
#[derive(Debug, Clone)]
pub struct RunPaths {
    /// Persisted deferral record.
    pub defer_file: PathBuf,

    /// Sentinel indicating a prerequisite bulk installation is in flight.
    pub lock_file: PathBuf,

    /// Where the OS stages downloaded updates and their manifests.
    pub updates_cache: PathBuf,
}

impl RunPaths {
    pub fn defaults() -> Self {
        Self {
            defer_file: patchward_util::default_defer_file(),
            lock_file: patchward_util::default_lock_file(),
            updates_cache: patchward_util::default_updates_cache(),
        }
    }
}

/// Validated policy ready for use by the enforcement engine.
#[derive(Debug, Clone)]
pub struct EnforcementPolicy {
    /// Days a user may postpone a restart-requiring update, counted from
    /// the first run that saw one.
    pub defer_limit_days: u32,

    /// Window during which unattended installs and reboots are permitted.
    pub quiet_hours: QuietHours,

    /// Battery floor for unattended installs off mains power.
    pub min_battery_percent: u8,

    /// How often the engine polls for the console emptying after a logout
    /// request, and how long it waits between polls.
    pub logout_poll_attempts: u32,
    pub logout_poll_interval: Duration,

    /// How many times the mandatory "logout failed" dialog is shown before
    /// the run gives up on forcing a logout.
    pub logout_reprompt_attempts: u32,

    pub paths: RunPaths,
}

impl EnforcementPolicy {
    pub const DEFAULT_LOGOUT_POLL_ATTEMPTS: u32 = 15;
    pub const DEFAULT_LOGOUT_POLL_INTERVAL: Duration = Duration::from_secs(2);
    pub const DEFAULT_LOGOUT_REPROMPT_ATTEMPTS: u32 = 3;
}

/// Validate the raw parameters and build a policy.
pub fn build_policy(raw: RawParameters, paths: RunPaths) -> ConfigResult<EnforcementPolicy> {
    let errors = validate_parameters(&raw);
    if !errors.is_empty() {
        return Err(ConfigError::ValidationFailed { errors });
    }

    // Ranges were just validated; the narrowing casts cannot lose values.
    let quiet_hours = QuietHours::new(raw.quiet_hours_start as u8, raw.quiet_hours_end as u8)
        .expect("validated hours");

    Ok(EnforcementPolicy {
        defer_limit_days: raw.defer_limit_days as u32,
        quiet_hours,
        min_battery_percent: raw.min_battery_percent as u8,
        logout_poll_attempts: EnforcementPolicy::DEFAULT_LOGOUT_POLL_ATTEMPTS,
        logout_poll_interval: EnforcementPolicy::DEFAULT_LOGOUT_POLL_INTERVAL,
        logout_reprompt_attempts: EnforcementPolicy::DEFAULT_LOGOUT_REPROMPT_ATTEMPTS,
        paths,
    })
}
