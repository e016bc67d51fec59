//! Session-control adapter
//!
//! Logout, restart and application management go through `osascript` so
//! everything happens at the application layer: a logout lets the OS run
//! its own staged-install machinery, and a System Events restart gives
//! applications a chance to quit cleanly. The only exception is the
//! unauthenticated reboot used at the login window, where nothing is
//! running that could object.

use async_trait::async_trait;
use patchward_host_api::{SessionControl, SessionError, SessionResult};
use std::path::PathBuf;
use tracing::{info, warn};

use crate::command::{self, CommandError};
use crate::loginwindow::LoginWindowAgent;

const OSASCRIPT: &str = "/usr/bin/osascript";
const SUDO: &str = "/usr/bin/sudo";
const REBOOT: &str = "/sbin/reboot";

/// Raw Apple Event for a loginwindow logout, bypassing the confirmation
/// dialog.
const LOGOUT_EVENT: &str = "tell application \"loginwindow\" to \u{00ab}event aevtrlgo\u{00bb}";

const RESTART_SCRIPT: &str = "tell app \"System Events\" to restart";

const LIST_APPS_SCRIPT: &str =
    "tell app \"System Events\" to get name of (processes where background only is false)";

/// Close every visible process; delivered on stdin because of the repeat
/// block.
const FORCE_QUIT_SCRIPT: &str = r#"
tell application "System Events"
    set listOfProcesses to (name of every process where background only is false)
end tell
repeat with processName in listOfProcesses
    do shell script "killall " & quoted form of processName
end repeat
"#;

/// Parse the AppleScript list reply ("Safari, Mail, Finder") into names.
pub fn parse_application_list(output: &str) -> Vec<String> {
    output
        .trim()
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(String::from)
        .collect()
}

fn session_err(e: CommandError) -> SessionError {
    match e {
        CommandError::Io { source, .. } => SessionError::Io(source),
        other => SessionError::CommandFailed(other.to_string()),
    }
}

/// Session-control adapter backed by `osascript`.
pub struct OsaScriptSession {
    lock_out_agent: LoginWindowAgent,
}

impl OsaScriptSession {
    pub fn new(helper: impl Into<PathBuf>, lock_out_icon: impl Into<PathBuf>) -> Self {
        Self {
            lock_out_agent: LoginWindowAgent::new(helper, lock_out_icon),
        }
    }
}

#[async_trait]
impl SessionControl for OsaScriptSession {
    async fn log_out(&self, user: &str) -> SessionResult<()> {
        info!(user, "Requesting loginwindow logout");
        command::run(SUDO, &["-u", user, OSASCRIPT, "-e", LOGOUT_EVENT])
            .await
            .map_err(|e| SessionError::LogoutFailed(e.to_string()))?;
        Ok(())
    }

    async fn reboot_unauthenticated(&self) -> SessionResult<()> {
        warn!("Issuing unauthenticated reboot");
        command::run(REBOOT, &[])
            .await
            .map_err(|e| SessionError::RebootFailed(e.to_string()))?;
        Ok(())
    }

    async fn restart_via_apple_events(&self) -> SessionResult<()> {
        info!("Requesting restart via System Events");
        command::run(OSASCRIPT, &["-e", RESTART_SCRIPT])
            .await
            .map_err(|e| SessionError::RebootFailed(e.to_string()))?;
        Ok(())
    }

    async fn visible_applications(&self) -> SessionResult<Vec<String>> {
        let output = command::run(OSASCRIPT, &["-e", LIST_APPS_SCRIPT])
            .await
            .map_err(session_err)?;
        Ok(parse_application_list(&output))
    }

    async fn force_quit_visible_applications(&self) -> SessionResult<()> {
        warn!("Force quitting all visible applications");
        command::run_with_stdin(OSASCRIPT, &["-"], FORCE_QUIT_SCRIPT)
            .await
            .map_err(session_err)?;
        Ok(())
    }

    async fn lock_login_window(&self) -> SessionResult<()> {
        info!("Locking out the login window");
        self.lock_out_agent.install_and_load().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn application_list_splits_on_commas() {
        assert_eq!(
            parse_application_list("Safari, Mail, Finder\n"),
            vec!["Safari", "Mail", "Finder"]
        );
    }

    #[test]
    fn empty_reply_means_no_applications() {
        assert!(parse_application_list("").is_empty());
        assert!(parse_application_list("\n").is_empty());
    }

    #[test]
    fn single_application_parses() {
        assert_eq!(parse_application_list("Safari"), vec!["Safari"]);
    }

    #[test]
    fn logout_event_uses_the_raw_apple_event() {
        // The guillemets marking a raw event must survive any edit.
        assert!(LOGOUT_EVENT.contains("\u{00ab}event aevtrlgo\u{00bb}"));
    }
}
