//! Shared value types crossing the collaborator boundaries

use chrono::{DateTime, Local, Timelike};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// One update offered by the catalog. Enumerated fresh on every policy run;
/// never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingUpdate {
    /// Catalog product key, which names the update's directory in the
    /// updates cache.
    pub product_key: String,

    /// Human-readable name, shown in dialogs.
    pub display_name: String,

    /// Version string, shown in dialogs.
    pub display_version: String,

    /// Catalog identifier. Together with `display_version` this forms the
    /// name handed to the catalog's download/install operations.
    pub identifier: String,

    /// Whether the update's package is already staged in the updates cache.
    pub is_downloaded: bool,
}

impl PendingUpdate {
    /// The `Identifier-DisplayVersion` name the catalog tooling expects for
    /// download and install.
    pub fn install_name(&self) -> String {
        format!("{}-{}", self.identifier, self.display_version)
    }
}

/// Which button the user pressed on a modal dialog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonChoice {
    /// The primary action ("Restart now", "Continue", ...).
    Primary,
    /// The secondary action ("Restart later").
    Secondary,
}

/// A modal dialog to present to the console user.
///
/// The display adapter maps this onto whatever helper binary renders it; the
/// numeric button-code convention of that helper never leaves the adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialogSpec {
    pub title: String,
    pub heading: String,
    pub description: String,
    pub icon: PathBuf,
    pub primary_button: String,
    /// Present iff the dialog offers a choice.
    pub secondary_button: Option<String>,
    pub timeout: Duration,
}

/// Power reading at the time of the snapshot. A failed battery read is kept
/// as `None` and treated as unsafe to proceed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PowerSnapshot {
    pub on_ac_power: bool,
    pub battery_percent: Option<u8>,
}

impl PowerSnapshot {
    /// Whether unattended installation is permitted on this power reading:
    /// mains power, or a battery at or above the configured minimum.
    pub fn eligible_for_unattended(&self, min_battery_percent: u8) -> bool {
        self.on_ac_power
            || self
                .battery_percent
                .is_some_and(|level| level >= min_battery_percent)
    }
}

/// Environmental conditions gating unattended action. Recomputed on every
/// run; never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentSnapshot {
    /// Wall-clock time the snapshot was taken.
    pub now: DateTime<Local>,

    /// Owner of the graphical console session, or `None` at the login
    /// window.
    pub console_user: Option<String>,

    /// Number of login sessions (console and remote). Remote shells count:
    /// a console-absent machine with an active SSH session must still block
    /// unattended installs.
    pub session_count: u32,

    /// Laptop vs. desktop classification.
    pub laptop: bool,

    pub power: PowerSnapshot,

    /// OS product version, e.g. "10.14.6". Drives asset selection.
    pub os_version: String,
}

impl EnvironmentSnapshot {
    /// True only if no graphical console user AND no other sessions are
    /// present.
    pub fn nobody_logged_in(&self) -> bool {
        self.console_user.is_none() && self.session_count == 0
    }

    /// Current clock hour, for quiet-hours evaluation.
    pub fn hour(&self) -> u8 {
        self.now.hour() as u8
    }
}
