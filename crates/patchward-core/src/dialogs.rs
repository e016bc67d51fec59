//! User-facing dialog construction
//!
//! All dialog wording lives here, next to the decision logic that chooses
//! between dialogs, so the display adapter stays a dumb renderer.

use patchward_config::Assets;
use patchward_host_api::DialogSpec;
use std::time::Duration;

const DIALOG_TITLE: &str = "Managed Mac Support";

/// Effectively "wait for the user"; the helper requires some timeout.
const DIALOG_TIMEOUT: Duration = Duration::from_secs(99_999);

/// Offer the user the choice between restarting now and deferring until
/// the deadline.
pub fn deferral_prompt(assets: &Assets, update_names: &str, deadline: &str) -> DialogSpec {
    DialogSpec {
        title: DIALOG_TITLE.into(),
        heading: "Software Update Available".into(),
        description: format!(
            "One or more software updates require a restart:\n\n{update_names}\n\n\
             Updates must be applied regularly.\n\nYou will be required to restart \
             after:\n{deadline}.\n"
        ),
        icon: assets.update_icon.clone(),
        primary_button: "Restart now".into(),
        secondary_button: Some("Restart later".into()),
        timeout: DIALOG_TIMEOUT,
    }
}

/// The deferral deadline has passed; no postpone option is offered.
pub fn mandatory_restart_notice(assets: &Assets, update_names: &str) -> DialogSpec {
    DialogSpec {
        title: DIALOG_TITLE.into(),
        heading: "Mandatory Restart Required".into(),
        description: format!(
            "One or more updates which require a restart have been deferred for the \
             maximum allowable time:\n\n{update_names}\n\nA restart is now mandatory.\n\n\
             Please save your work and restart now to install the update."
        ),
        icon: assets.update_icon.clone(),
        primary_button: "Restart now".into(),
        secondary_button: None,
        timeout: DIALOG_TIMEOUT,
    }
}

/// Shown when a requested logout did not complete within the polling
/// window.
pub fn logout_failed(assets: &Assets) -> DialogSpec {
    DialogSpec {
        title: DIALOG_TITLE.into(),
        heading: "Failed to log out!".into(),
        description: "Logout does not appear to have been successful.\n\nPlease save \
                      your work and restart now to install the update."
            .into(),
        icon: assets.update_icon.clone(),
        primary_button: "Restart now".into(),
        secondary_button: None,
        timeout: DIALOG_TIMEOUT,
    }
}

/// First panel of the attended-restart flow: give the user a moment to
/// save before anything is closed.
pub fn restart_save_warning(assets: &Assets) -> DialogSpec {
    DialogSpec {
        title: DIALOG_TITLE.into(),
        heading: "Update Notification".into(),
        description: "In order to install the latest security updates, it is essential \
                      that your Mac is restarted.\n\nPlease make sure you have saved \
                      your data before proceeding.\n\nTHIS PROCESS CANNOT BE DEFERRED!"
            .into(),
        icon: assets.branding_logo.clone(),
        primary_button: "Continue".into(),
        secondary_button: None,
        timeout: DIALOG_TIMEOUT,
    }
}

/// Second panel of the attended-restart flow: last call before
/// applications are closed.
pub fn restart_confirm(assets: &Assets) -> DialogSpec {
    DialogSpec {
        title: DIALOG_TITLE.into(),
        heading: "Update Notification".into(),
        description: "This Mac will now attempt to close all applications and \
                      restart.\n\nBefore selecting \"Restart now\", please make sure \
                      that you have saved all of your data!"
            .into(),
        icon: assets.caution_icon.clone(),
        primary_button: "Restart now".into(),
        secondary_button: None,
        timeout: DIALOG_TIMEOUT,
    }
}

/// Applications are still open; ask whether to force-quit them.
pub fn close_applications_prompt(assets: &Assets, open_apps: &[String]) -> DialogSpec {
    DialogSpec {
        title: DIALOG_TITLE.into(),
        heading: "Applications open".into(),
        description: format!(
            "Before the Mac can be restarted, the following applications need to be \
             closed:\n\n{}\n\nDo you wish to force quit these applications?\n\n\
             ANY UNSAVED DATA WILL BE LOST!",
            open_apps.join("\n")
        ),
        icon: assets.caution_icon.clone(),
        primary_button: "Close all".into(),
        secondary_button: Some("Cancel".into()),
        timeout: DIALOG_TIMEOUT,
    }
}
