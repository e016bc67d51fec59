//! Run states and outcomes

use chrono::{DateTime, Local};

/// States of the enforcement decision machine, traced as the run moves
/// through them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Idle,
    UpdatesPending,
    AwaitingUserChoice,
    Deferred,
    InstallSilently,
    ForceLogout,
    UnattendedInstall,
    Aborted,
}

/// How a run ended. Every variant except `LogoutAbandoned` maps to a
/// success exit: "deferred" and "nothing to do" are normal results, and
/// skipped branches are retried on the next scheduled invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// A prerequisite bulk installation is in flight; nothing was touched.
    ProvisioningActive,

    /// The catalog reported no recommended updates.
    NothingToDo,

    /// Updates were processed and none of the remaining ones requires a
    /// restart.
    NoRestartRequired { installed: usize },

    /// The console user chose to postpone the restart.
    Deferred { ok_until: DateTime<Local> },

    /// The console session was logged out; the OS pending-install
    /// mechanism takes over from here.
    LogoutTriggered { user: String },

    /// Logout never completed and the attended restart was evaded past
    /// every bounded retry.
    LogoutAbandoned { user: String },

    /// The user exhausted deferral and agreed (or declined to object) to a
    /// restart through the application layer.
    MandatoryRestartTriggered { user: String },

    /// Updates were installed at the login window and an unauthenticated
    /// reboot was issued.
    UnattendedInstalled,

    /// Unattended install skipped: laptops never get the login-window
    /// lock-out treatment.
    LaptopSkipped,

    /// Unattended install skipped: not on mains power and battery below
    /// the configured floor.
    PowerIneligible,

    /// Restart-requiring updates are pending but a remote session is
    /// present or the clock is outside quiet hours.
    BlockedBySessions,
}

impl RunOutcome {
    pub fn exit_code(&self) -> i32 {
        match self {
            RunOutcome::LogoutAbandoned { .. } => 1,
            _ => 0,
        }
    }
}

impl std::fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunOutcome::ProvisioningActive => {
                write!(f, "provisioning in flight, nothing done")
            }
            RunOutcome::NothingToDo => write!(f, "no recommended updates"),
            RunOutcome::NoRestartRequired { installed } => {
                write!(f, "{installed} update(s) installed, no restart required")
            }
            RunOutcome::Deferred { ok_until } => write!(
                f,
                "deferred until {}",
                patchward_util::format_datetime_full(ok_until)
            ),
            RunOutcome::LogoutTriggered { user } => {
                write!(f, "console session of {user} logged out")
            }
            RunOutcome::LogoutAbandoned { user } => {
                write!(f, "{user} evaded logout past every retry")
            }
            RunOutcome::MandatoryRestartTriggered { user } => {
                write!(f, "mandatory restart triggered for {user}")
            }
            RunOutcome::UnattendedInstalled => {
                write!(f, "unattended install complete, reboot issued")
            }
            RunOutcome::LaptopSkipped => write!(f, "laptop, unattended install skipped"),
            RunOutcome::PowerIneligible => {
                write!(f, "power conditions unacceptable for unattended install")
            }
            RunOutcome::BlockedBySessions => {
                write!(f, "remote session present or outside quiet hours")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_abandoned_logout_is_nonzero() {
        assert_eq!(RunOutcome::NothingToDo.exit_code(), 0);
        assert_eq!(RunOutcome::LaptopSkipped.exit_code(), 0);
        assert_eq!(RunOutcome::BlockedBySessions.exit_code(), 0);
        assert_eq!(
            RunOutcome::LogoutAbandoned {
                user: "alice".into()
            }
            .exit_code(),
            1
        );
    }
}
