//! Login-window lock-out agent
//!
//! Before an unattended install the login window is covered by a
//! full-screen "installing updates" panel, kept alive by a LaunchAgent
//! limited to the LoginWindow session type. The agent is written
//! `Disabled` and loaded force-flagged, so it can never be picked up
//! accidentally at a later boot.

use patchward_host_api::{SessionError, SessionResult};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use crate::command;

pub const AGENT_LABEL: &str = "com.patchward.loginwindow-helper";

const AGENT_DIR: &str = "/Library/LaunchAgents";

/// How often and how long to wait for the agent file to materialize
/// before each load attempt.
const LOAD_ATTEMPTS: u32 = 5;
const LOAD_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Escape a string for embedding in plist XML text.
fn xml_escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// The login-window lock-out agent definition.
pub struct LoginWindowAgent {
    label: String,
    agent_path: PathBuf,
    helper: PathBuf,
    icon: PathBuf,
}

impl LoginWindowAgent {
    pub fn new(helper: impl Into<PathBuf>, icon: impl Into<PathBuf>) -> Self {
        Self {
            label: AGENT_LABEL.to_string(),
            agent_path: Path::new(AGENT_DIR).join(format!("{AGENT_LABEL}.plist")),
            helper: helper.into(),
            icon: icon.into(),
        }
    }

    pub fn with_agent_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.agent_path = path.into();
        self
    }

    pub fn agent_path(&self) -> &Path {
        &self.agent_path
    }

    /// Render the agent property list.
    pub fn plist(&self) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
<plist version="1.0">
<dict>
	<key>Label</key>
	<string>{label}</string>
	<key>Disabled</key>
	<true/>
	<key>LimitLoadToSessionType</key>
	<array>
		<string>LoginWindow</string>
	</array>
	<key>ProgramArguments</key>
	<array>
		<string>{helper}</string>
		<string>-windowType</string>
		<string>fs</string>
		<string>-heading</string>
		<string>Installing macOS updates...</string>
		<string>-icon</string>
		<string>{icon}</string>
		<string>-description</string>
		<string>Please do not turn off this computer.</string>
	</array>
	<key>RunAtLoad</key>
	<true/>
	<key>KeepAlive</key>
	<true/>
</dict>
</plist>
"#,
            label = xml_escape(&self.label),
            helper = xml_escape(&self.helper.to_string_lossy()),
            icon = xml_escape(&self.icon.to_string_lossy()),
        )
    }

    /// Write the agent (overwriting any previous copy) and load it into
    /// the LoginWindow session, waiting briefly for the file to appear.
    pub async fn install_and_load(&self) -> SessionResult<()> {
        info!(path = %self.agent_path.display(), "Writing login-window agent");
        std::fs::write(&self.agent_path, self.plist())
            .map_err(|e| SessionError::LockOutFailed(e.to_string()))?;

        for attempt in 1..=LOAD_ATTEMPTS {
            if self.agent_path.is_file() {
                info!(label = %self.label, "Loading login-window agent");
                let path = self.agent_path.to_string_lossy();
                command::run(
                    "/bin/launchctl",
                    &["load", "-F", "-S", "LoginWindow", &path],
                )
                .await
                .map_err(|e| SessionError::LockOutFailed(e.to_string()))?;
                return Ok(());
            }
            warn!(attempt, "Agent file not present yet, waiting");
            tokio::time::sleep(LOAD_RETRY_DELAY).await;
        }

        Err(SessionError::LockOutFailed(format!(
            "agent file never appeared at {}",
            self.agent_path.display()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agent() -> LoginWindowAgent {
        LoginWindowAgent::new(
            "/Library/Application Support/JAMF/bin/jamfHelper.app/Contents/MacOS/jamfHelper",
            "/System/Library/PreferencePanes/SoftwareUpdate.prefPane/Contents/Resources/SoftwareUpdate.icns",
        )
    }

    #[test]
    fn plist_is_disabled_and_loginwindow_scoped() {
        let plist = agent().plist();
        assert!(plist.contains("<key>Disabled</key>\n\t<true/>"));
        assert!(plist.contains("<string>LoginWindow</string>"));
        assert!(plist.contains(AGENT_LABEL));
        assert!(plist.contains("Please do not turn off this computer."));
    }

    #[test]
    fn plist_runs_the_helper_fullscreen() {
        let plist = agent().plist();
        assert!(plist.contains("jamfHelper</string>"));
        assert!(plist.contains("<string>fs</string>"));
    }

    #[test]
    fn xml_special_characters_are_escaped() {
        let agent = LoginWindowAgent::new("/opt/a&b/helper", "/tmp/icon.icns");
        assert!(agent.plist().contains("/opt/a&amp;b/helper"));
    }

    #[test]
    fn default_agent_path_is_under_launch_agents() {
        assert_eq!(
            agent().agent_path(),
            Path::new("/Library/LaunchAgents/com.patchward.loginwindow-helper.plist")
        );
    }
}
