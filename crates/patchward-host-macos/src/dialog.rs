//! Dialog helper adapter
//!
//! Presents modal dialogs through the management suite's helper binary.
//! The helper encodes the pressed button in its exit status: 0 for the
//! primary button, 2 for the secondary. Anything else (dismissal, a killed
//! helper) is reported as the primary choice, so walking away from a
//! mandatory dialog never counts as a deferral.

use async_trait::async_trait;
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use patchward_host_api::{ButtonChoice, DialogPresenter, DialogSpec, DisplayError, DisplayResult};
use std::path::PathBuf;
use tracing::{debug, info, warn};

use crate::command::{self, CommandError};

/// Default location of the management suite's dialog helper.
pub const JAMFHELPER_PATH: &str =
    "/Library/Application Support/JAMF/bin/jamfHelper.app/Contents/MacOS/jamfHelper";

const HELPER_PROCESS_NAME: &str = "jamfHelper";

const BUTTON_SECONDARY_CODE: i32 = 2;

/// Map a helper exit status onto the pressed button.
pub fn choice_from_exit_code(code: i32) -> ButtonChoice {
    if code == BUTTON_SECONDARY_CODE {
        ButtonChoice::Secondary
    } else {
        ButtonChoice::Primary
    }
}

/// Parse `pgrep` output into pids, ignoring anything malformed.
pub fn parse_pids(output: &str) -> Vec<i32> {
    output
        .lines()
        .filter_map(|line| line.trim().parse().ok())
        .collect()
}

/// Dialog adapter backed by the management helper binary.
pub struct JamfHelperDialogs {
    helper: PathBuf,
}

impl JamfHelperDialogs {
    pub fn new() -> Self {
        Self {
            helper: PathBuf::from(JAMFHELPER_PATH),
        }
    }

    pub fn with_helper(helper: impl Into<PathBuf>) -> Self {
        Self {
            helper: helper.into(),
        }
    }

    fn build_args(spec: &DialogSpec) -> Vec<String> {
        let mut args = vec![
            "-windowType".into(),
            "utility".into(),
            "-title".into(),
            spec.title.clone(),
            "-heading".into(),
            spec.heading.clone(),
            "-icon".into(),
            spec.icon.to_string_lossy().into_owned(),
            "-timeout".into(),
            spec.timeout.as_secs().to_string(),
            "-description".into(),
            spec.description.clone(),
            "-button1".into(),
            spec.primary_button.clone(),
        ];
        if let Some(secondary) = &spec.secondary_button {
            args.push("-button2".into());
            args.push(secondary.clone());
        }
        args
    }
}

impl Default for JamfHelperDialogs {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DialogPresenter for JamfHelperDialogs {
    async fn present(&self, spec: &DialogSpec) -> DisplayResult<ButtonChoice> {
        info!(heading = %spec.heading, "Presenting dialog");

        let args = Self::build_args(spec);
        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
        let helper = self.helper.to_string_lossy();

        let code = command::run_exit_code(&helper, &arg_refs)
            .await
            .map_err(|e| match e {
                CommandError::Io { source, .. } => DisplayError::Io(source),
                other => DisplayError::HelperFailed(other.to_string()),
            })?;

        let choice = choice_from_exit_code(code);
        debug!(code, ?choice, "Dialog dismissed");
        Ok(choice)
    }

    async fn dismiss_all(&self) -> DisplayResult<()> {
        let output = match command::run("/usr/bin/pgrep", &[HELPER_PROCESS_NAME]).await {
            Ok(output) => output,
            // pgrep exits 1 when nothing matches.
            Err(CommandError::Failed { status: 1, .. }) => {
                debug!("No dialog helper processes running");
                return Ok(());
            }
            Err(CommandError::Io { source, .. }) => return Err(DisplayError::Io(source)),
            Err(other) => return Err(DisplayError::HelperFailed(other.to_string())),
        };

        for pid in parse_pids(&output) {
            info!(pid, "Terminating dialog helper");
            if let Err(e) = signal::kill(Pid::from_raw(pid), Signal::SIGTERM) {
                warn!(pid, error = %e, "Could not terminate helper");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn spec(secondary: Option<&str>) -> DialogSpec {
        DialogSpec {
            title: "Managed Mac Support".into(),
            heading: "Software Update Available".into(),
            description: "desc".into(),
            icon: PathBuf::from("/tmp/icon.icns"),
            primary_button: "Restart now".into(),
            secondary_button: secondary.map(String::from),
            timeout: Duration::from_secs(99_999),
        }
    }

    #[test]
    fn exit_codes_map_to_buttons() {
        assert_eq!(choice_from_exit_code(0), ButtonChoice::Primary);
        assert_eq!(choice_from_exit_code(2), ButtonChoice::Secondary);
        // Dismissed or killed helpers count as the primary choice.
        assert_eq!(choice_from_exit_code(239), ButtonChoice::Primary);
        assert_eq!(choice_from_exit_code(-1), ButtonChoice::Primary);
    }

    #[test]
    fn two_button_dialogs_pass_both_labels() {
        let args = JamfHelperDialogs::build_args(&spec(Some("Restart later")));
        let joined = args.join(" ");
        assert!(joined.contains("-button1 Restart now"));
        assert!(joined.contains("-button2 Restart later"));
    }

    #[test]
    fn one_button_dialogs_omit_the_second_label() {
        let args = JamfHelperDialogs::build_args(&spec(None));
        assert!(!args.contains(&"-button2".to_string()));
    }

    #[test]
    fn pid_parsing_ignores_garbage() {
        assert_eq!(parse_pids("123\n456\n"), vec![123, 456]);
        assert_eq!(parse_pids("123\nnot-a-pid\n7"), vec![123, 7]);
        assert!(parse_pids("").is_empty());
    }
}
