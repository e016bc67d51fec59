//! Environment probe adapter
//!
//! Answers the conditions gating unattended action: console occupancy,
//! session count, form factor, power. Readings that gate safety are
//! conservative on failure: an unreadable battery level blocks unattended
//! installs rather than permitting them.

use async_trait::async_trait;
use chrono::Local;
use patchward_host_api::{
    EnvironmentProbe, EnvironmentSnapshot, PowerSnapshot, ProbeError, ProbeResult,
};
use tracing::{debug, warn};

use crate::command::{self, CommandError};

const STAT: &str = "/usr/bin/stat";
const W: &str = "/usr/bin/w";
const SYSCTL: &str = "/usr/sbin/sysctl";
const PMSET: &str = "/usr/bin/pmset";
const SW_VERS: &str = "/usr/bin/sw_vers";

/// Map the owner of /dev/console onto the console user. At the login
/// window the device is owned by root.
pub fn parse_console_user(output: &str) -> Option<String> {
    let user = output.trim();
    match user {
        "" | "root" | "loginwindow" | "_mbsetupuser" => None,
        _ => Some(user.to_string()),
    }
}

/// Count login sessions from `w` output: two header lines, one line per
/// session.
pub fn parse_session_count(output: &str) -> u32 {
    output.trim_end().lines().count().saturating_sub(2) as u32
}

/// Laptop models identify themselves in `hw.model`.
pub fn parse_is_laptop(sysctl_output: &str) -> bool {
    sysctl_output.contains("MacBook")
}

/// Parse `pmset -g batt`:
///
/// ```text
/// Now drawing from 'AC Power'
///  -InternalBattery-0 (id=12345)	85%; discharging; 3:20 remaining present: true
/// ```
///
/// Desktops print only the first line. A missing or malformed battery
/// reading stays `None`.
pub fn parse_power(output: &str) -> PowerSnapshot {
    let on_ac_power = output
        .lines()
        .next()
        .is_some_and(|line| line.contains("'AC Power'"));

    let battery_percent = output.lines().find_map(|line| {
        let after_tab = line.split('\t').nth(1)?;
        let percent_field = after_tab.split(';').next()?.trim();
        percent_field.strip_suffix('%')?.parse().ok()
    });

    PowerSnapshot {
        on_ac_power,
        battery_percent,
    }
}

/// Query the OS product version, e.g. "10.14.6".
pub async fn os_product_version() -> ProbeResult<String> {
    let output = command::run(SW_VERS, &["-productVersion"])
        .await
        .map_err(probe_err)?;
    Ok(output.trim().to_string())
}

fn probe_err(e: CommandError) -> ProbeError {
    match e {
        CommandError::Io { source, .. } => ProbeError::Io(source),
        other => ProbeError::CommandFailed(other.to_string()),
    }
}

/// Environment probe backed by the usual command-line tools.
#[derive(Default)]
pub struct MacEnvironmentProbe;

impl MacEnvironmentProbe {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl EnvironmentProbe for MacEnvironmentProbe {
    async fn snapshot(&self) -> ProbeResult<EnvironmentSnapshot> {
        let console_owner = command::run(STAT, &["-f", "%Su", "/dev/console"])
            .await
            .map_err(probe_err)?;
        let console_user = parse_console_user(&console_owner);

        let sessions = command::run(W, &[]).await.map_err(probe_err)?;
        let session_count = parse_session_count(&sessions);

        let model = command::run(SYSCTL, &["hw.model"])
            .await
            .map_err(probe_err)?;
        let laptop = parse_is_laptop(&model);

        // Power is a safety gate, not a precondition: if the reading
        // fails, report the conservative default and let the policy skip
        // unattended work.
        let power = match command::run(PMSET, &["-g", "batt"]).await {
            Ok(output) => parse_power(&output),
            Err(e) => {
                warn!(error = %e, "Power reading failed, assuming unsafe");
                PowerSnapshot::default()
            }
        };

        let os_version = os_product_version().await?;

        let snapshot = EnvironmentSnapshot {
            now: Local::now(),
            console_user,
            session_count,
            laptop,
            power,
            os_version,
        };
        debug!(?snapshot, "Environment snapshot");
        Ok(snapshot)
    }
}
