//! The enforcement decision state machine
//!
//! One `run()` per scheduled invocation. The engine re-derives everything
//! (catalog snapshot, deferral record, environment) from scratch each time,
//! so an interrupted run is reconciled simply by running again.

use patchward_config::{Assets, EnforcementPolicy};
use patchward_host_api::{
    ButtonChoice, DialogPresenter, EnvironmentProbe, EnvironmentSnapshot, PendingUpdate,
    SessionControl, UpdateCatalog,
};
use patchward_store::DeferralStore;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::{dialogs, EnforceError, EngineState, RunOutcome};

/// The enforcement decision engine
pub struct EnforcementEngine {
    policy: EnforcementPolicy,
    assets: Assets,
    catalog: Arc<dyn UpdateCatalog>,
    dialogs: Arc<dyn DialogPresenter>,
    session: Arc<dyn SessionControl>,
    probe: Arc<dyn EnvironmentProbe>,
    store: Arc<dyn DeferralStore>,
    state: EngineState,
}

impl EnforcementEngine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        policy: EnforcementPolicy,
        assets: Assets,
        catalog: Arc<dyn UpdateCatalog>,
        dialogs: Arc<dyn DialogPresenter>,
        session: Arc<dyn SessionControl>,
        probe: Arc<dyn EnvironmentProbe>,
        store: Arc<dyn DeferralStore>,
    ) -> Self {
        info!(
            defer_limit_days = policy.defer_limit_days,
            quiet_hours = %policy.quiet_hours,
            min_battery_percent = policy.min_battery_percent,
            "Enforcement engine initialized"
        );

        Self {
            policy,
            assets,
            catalog,
            dialogs,
            session,
            probe,
            store,
            state: EngineState::Idle,
        }
    }

    /// Current machine state, for observability.
    pub fn state(&self) -> EngineState {
        self.state
    }

    fn transition(&mut self, next: EngineState) {
        debug!(from = ?self.state, to = ?next, "State transition");
        self.state = next;
    }

    /// Execute one full policy run.
    pub async fn run(&mut self) -> Result<RunOutcome, EnforceError> {
        self.state = EngineState::Idle;

        // Another privileged install is in flight: leave everything alone.
        if self.policy.paths.lock_file.exists() {
            info!(
                lock = %self.policy.paths.lock_file.display(),
                "Provisioning lock present, exiting without touching anything"
            );
            self.transition(EngineState::Aborted);
            return Ok(RunOutcome::ProvisioningActive);
        }

        info!("Checking what updates are available");
        let updates = self.catalog.list_recommended().await?;
        if updates.is_empty() {
            info!("No recommended updates to install");
            self.store.clear()?;
            return Ok(RunOutcome::NothingToDo);
        }

        self.transition(EngineState::InstallSilently);
        let (installed, restart_needed) = self.stage_and_partition(&updates).await?;

        if restart_needed.is_empty() {
            info!(installed, "No updates require a restart");
            self.store.clear()?;
            self.transition(EngineState::Idle);
            return Ok(RunOutcome::NoRestartRequired { installed });
        }

        self.transition(EngineState::UpdatesPending);
        let snapshot = self.probe.snapshot().await?;
        let names = restart_needed
            .iter()
            .map(|u| u.display_name.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        if let Some(user) = snapshot.console_user.clone() {
            info!(user = %user, "Console user is present");
            self.console_flow(&user, &names, &snapshot).await
        } else if snapshot.nobody_logged_in()
            && self.policy.quiet_hours.contains_hour(snapshot.hour())
        {
            self.unattended_flow(&snapshot).await
        } else {
            warn!(
                session_count = snapshot.session_count,
                hour = snapshot.hour(),
                "Updates require a restart but someone is logged in remotely \
                 or we are outside quiet hours, aborting"
            );
            self.transition(EngineState::Aborted);
            Ok(RunOutcome::BlockedBySessions)
        }
    }

    /// Download anything that isn't staged yet, install what can go in
    /// silently, and collect the updates that need a restart.
    ///
    /// Per-update download/install failures leave that update pending for
    /// the next run; timeouts and unreadable manifests abort the run.
    async fn stage_and_partition(
        &self,
        updates: &[PendingUpdate],
    ) -> Result<(usize, Vec<PendingUpdate>), EnforceError> {
        let mut installed = 0usize;
        let mut restart_needed = Vec::new();

        for update in updates {
            debug!(update = %update.display_name, "Processing update");

            let mut staged = update.clone();
            if !staged.is_downloaded {
                info!(update = %staged.install_name(), "Downloading");
                match self.catalog.download(&staged).await {
                    Ok(()) => staged.is_downloaded = true,
                    Err(e) if e.is_fatal() => return Err(e.into()),
                    Err(e) => {
                        warn!(
                            update = %staged.install_name(),
                            error = %e,
                            "Download failed, update stays pending"
                        );
                        continue;
                    }
                }
            }

            if self.catalog.requires_restart(&staged).await? {
                info!(update = %staged.display_name, "Requires a restart, queuing");
                restart_needed.push(staged);
            } else {
                info!(update = %staged.display_name, "No restart required, installing");
                match self.catalog.install(&staged).await {
                    Ok(()) => installed += 1,
                    Err(e) if e.is_fatal() => return Err(e.into()),
                    Err(e) => warn!(
                        update = %staged.install_name(),
                        error = %e,
                        "Install failed, update stays pending"
                    ),
                }
            }
        }

        Ok((installed, restart_needed))
    }

    /// A console user is present: establish the deferral deadline and
    /// either offer the choice or require the restart.
    async fn console_flow(
        &mut self,
        user: &str,
        names: &str,
        snapshot: &EnvironmentSnapshot,
    ) -> Result<RunOutcome, EnforceError> {
        self.transition(EngineState::AwaitingUserChoice);

        let ok_until = self
            .store
            .ensure(snapshot.now, self.policy.defer_limit_days)?;

        if self.store.is_deferral_still_allowed(snapshot.now)? {
            let spec = dialogs::deferral_prompt(
                &self.assets,
                names,
                &patchward_util::format_deadline(&ok_until),
            );
            match self.dialogs.present(&spec).await? {
                ButtonChoice::Secondary => {
                    info!(user, "User chose to defer the restart");
                    self.transition(EngineState::Deferred);
                    Ok(RunOutcome::Deferred { ok_until })
                }
                ButtonChoice::Primary => {
                    info!(user, "User permitted an immediate restart");
                    self.force_logout(user).await
                }
            }
        } else {
            warn!(
                user,
                ok_until = %patchward_util::format_datetime_full(&ok_until),
                "Deferral deadline has passed, restart is mandatory"
            );
            let spec = dialogs::mandatory_restart_notice(&self.assets, names);
            self.dialogs.present(&spec).await?;
            self.force_logout(user).await
        }
    }

    /// Request a graceful logout and poll for the console emptying. Logout
    /// rather than reboot: the OS applies staged updates on its own during
    /// logout, so we never install a restart-requiring update under a live
    /// session.
    async fn force_logout(&mut self, user: &str) -> Result<RunOutcome, EnforceError> {
        self.transition(EngineState::ForceLogout);

        for cycle in 1..=self.policy.logout_reprompt_attempts {
            info!(user, cycle, "Requesting logout of the console session");
            if let Err(e) = self.session.log_out(user).await {
                warn!(error = %e, "Logout request failed");
            }

            for attempt in 1..=self.policy.logout_poll_attempts {
                tokio::time::sleep(self.policy.logout_poll_interval).await;
                let snapshot = self.probe.snapshot().await?;
                if snapshot.nobody_logged_in() {
                    info!(attempts = attempt, "Console session is gone");
                    return Ok(RunOutcome::LogoutTriggered {
                        user: user.to_string(),
                    });
                }
                debug!(attempt, "Console still occupied");
            }

            warn!(cycle, "Still logged in after polling");
            if cycle < self.policy.logout_reprompt_attempts {
                self.dialogs
                    .present(&dialogs::logout_failed(&self.assets))
                    .await?;
            }
        }

        // Logout is being evaded; walk the user through an attended restart.
        self.friendly_restart(user).await
    }

    /// Attended restart: confirm, close applications if necessary, then
    /// restart through the application layer.
    async fn friendly_restart(&mut self, user: &str) -> Result<RunOutcome, EnforceError> {
        info!(user, "Attempting attended restart");

        if let Err(e) = self.dialogs.dismiss_all().await {
            warn!(error = %e, "Could not dismiss stray dialogs");
        }
        self.dialogs
            .present(&dialogs::restart_save_warning(&self.assets))
            .await?;

        for round in 1..=self.policy.logout_reprompt_attempts {
            debug!(round, "Restart confirmation round");
            self.dialogs
                .present(&dialogs::restart_confirm(&self.assets))
                .await?;

            let open_apps = match self.session.visible_applications().await {
                Ok(apps) => apps,
                Err(e) => {
                    warn!(error = %e, "Could not list open applications");
                    Vec::new()
                }
            };

            if open_apps.is_empty() {
                info!("No applications appear to be open, restarting");
                self.session.restart_via_apple_events().await?;
                return Ok(RunOutcome::MandatoryRestartTriggered {
                    user: user.to_string(),
                });
            }

            let choice = self
                .dialogs
                .present(&dialogs::close_applications_prompt(&self.assets, &open_apps))
                .await?;
            if choice == ButtonChoice::Primary {
                if let Err(e) = self.session.force_quit_visible_applications().await {
                    warn!(error = %e, "Force quit failed");
                }
                info!("Restarting");
                self.session.restart_via_apple_events().await?;
                return Ok(RunOutcome::MandatoryRestartTriggered {
                    user: user.to_string(),
                });
            }
            // Cancelled; give the user another round to save and agree.
        }

        warn!(user, "Attended restart evaded past every retry");
        Ok(RunOutcome::LogoutAbandoned {
            user: user.to_string(),
        })
    }

    /// Nobody is logged in and we are inside quiet hours: install at the
    /// login window and reboot, if the hardware and power situation allows.
    async fn unattended_flow(
        &mut self,
        snapshot: &EnvironmentSnapshot,
    ) -> Result<RunOutcome, EnforceError> {
        self.transition(EngineState::UnattendedInstall);
        info!("Nobody logged in and inside quiet hours, starting unattended install");

        if snapshot.laptop {
            // Laptops never get the login-window lock-out treatment: no
            // mains guarantee, and no network at the login window.
            info!("Laptop model, unattended install won't complete, skipping");
            self.transition(EngineState::Idle);
            return Ok(RunOutcome::LaptopSkipped);
        }

        if !snapshot
            .power
            .eligible_for_unattended(self.policy.min_battery_percent)
        {
            warn!(
                on_ac = snapshot.power.on_ac_power,
                battery = ?snapshot.power.battery_percent,
                "Power conditions unacceptable for unattended installation"
            );
            return Ok(RunOutcome::PowerIneligible);
        }

        if let Err(e) = self.session.lock_login_window().await {
            warn!(error = %e, "Could not lock the login window, continuing");
        }

        info!("Installing recommended updates");
        self.catalog.install_all_recommended().await?;

        info!("Issuing unauthenticated reboot");
        self.session.reboot_unauthenticated().await?;
        Ok(RunOutcome::UnattendedInstalled)
    }
}
