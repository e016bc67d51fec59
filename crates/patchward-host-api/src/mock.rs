//! Mock collaborators for testing
//!
//! The enforcement engine is exercised entirely against these fakes; no test
//! ever spawns a real process. Set-up follows a script-and-record shape:
//! tests preload responses and assert on the recorded calls afterwards.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use crate::{
    ButtonChoice, CatalogError, CatalogResult, DialogPresenter, DialogSpec, DisplayResult,
    EnvironmentProbe, EnvironmentSnapshot, PendingUpdate, ProbeError, ProbeResult, SessionControl,
    SessionResult, UpdateCatalog,
};

/// Mock update catalog
#[derive(Default)]
pub struct MockCatalog {
    updates: Mutex<Vec<PendingUpdate>>,
    restart_required: Mutex<HashMap<String, bool>>,

    /// Product keys whose manifest reads fail
    pub manifest_unreadable: Mutex<HashSet<String>>,

    /// Install names whose download fails (non-fatally)
    pub fail_download: Mutex<HashSet<String>>,

    /// Install names whose install fails (non-fatally)
    pub fail_install: Mutex<HashSet<String>>,

    /// Simulate the catalog refresh exceeding its bounded wait
    pub timeout_on_list: Mutex<bool>,

    /// Simulate the bulk install exceeding its bounded wait
    pub timeout_on_install_all: Mutex<bool>,

    downloaded: Mutex<Vec<String>>,
    installed: Mutex<Vec<String>>,
    install_all_calls: Mutex<u32>,
    list_calls: Mutex<u32>,
}

impl MockCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an update to the catalog, declaring its restart requirement.
    pub fn add_update(&self, update: PendingUpdate, requires_restart: bool) {
        self.restart_required
            .lock()
            .unwrap()
            .insert(update.product_key.clone(), requires_restart);
        self.updates.lock().unwrap().push(update);
    }

    /// Install names passed to `download`, in order.
    pub fn downloaded(&self) -> Vec<String> {
        self.downloaded.lock().unwrap().clone()
    }

    /// Install names passed to `install`, in order.
    pub fn installed(&self) -> Vec<String> {
        self.installed.lock().unwrap().clone()
    }

    pub fn install_all_calls(&self) -> u32 {
        *self.install_all_calls.lock().unwrap()
    }

    pub fn list_calls(&self) -> u32 {
        *self.list_calls.lock().unwrap()
    }
}

#[async_trait]
impl UpdateCatalog for MockCatalog {
    async fn list_recommended(&self) -> CatalogResult<Vec<PendingUpdate>> {
        *self.list_calls.lock().unwrap() += 1;
        if *self.timeout_on_list.lock().unwrap() {
            return Err(CatalogError::Timeout {
                command: "mock list".into(),
                timeout: Duration::from_secs(180),
            });
        }
        Ok(self.updates.lock().unwrap().clone())
    }

    async fn requires_restart(&self, update: &PendingUpdate) -> CatalogResult<bool> {
        if self
            .manifest_unreadable
            .lock()
            .unwrap()
            .contains(&update.product_key)
        {
            return Err(CatalogError::ManifestUnreadable {
                product_key: update.product_key.clone(),
                reason: "mock manifest failure".into(),
            });
        }
        self.restart_required
            .lock()
            .unwrap()
            .get(&update.product_key)
            .copied()
            .ok_or_else(|| CatalogError::ManifestUnreadable {
                product_key: update.product_key.clone(),
                reason: "unknown update".into(),
            })
    }

    async fn download(&self, update: &PendingUpdate) -> CatalogResult<()> {
        let name = update.install_name();
        if self.fail_download.lock().unwrap().contains(&name) {
            return Err(CatalogError::CommandFailed(format!(
                "mock download failure for {name}"
            )));
        }
        self.downloaded.lock().unwrap().push(name);
        Ok(())
    }

    async fn install(&self, update: &PendingUpdate) -> CatalogResult<()> {
        let name = update.install_name();
        if self.fail_install.lock().unwrap().contains(&name) {
            return Err(CatalogError::CommandFailed(format!(
                "mock install failure for {name}"
            )));
        }
        self.installed.lock().unwrap().push(name);
        Ok(())
    }

    async fn install_all_recommended(&self) -> CatalogResult<()> {
        if *self.timeout_on_install_all.lock().unwrap() {
            return Err(CatalogError::Timeout {
                command: "mock install all".into(),
                timeout: Duration::from_secs(3600),
            });
        }
        *self.install_all_calls.lock().unwrap() += 1;
        Ok(())
    }
}

/// Mock dialog presenter
#[derive(Default)]
pub struct MockDialogs {
    /// Scripted button presses, consumed front-to-back. When the script is
    /// exhausted the primary button is reported, matching a dialog that was
    /// dismissed without an explicit choice.
    responses: Mutex<VecDeque<ButtonChoice>>,

    /// Simulate the dialog helper failing to launch
    pub fail_present: Mutex<bool>,

    presented: Mutex<Vec<DialogSpec>>,
    dismiss_calls: Mutex<u32>,
}

impl MockDialogs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_response(&self, choice: ButtonChoice) {
        self.responses.lock().unwrap().push_back(choice);
    }

    /// Every dialog presented, in order.
    pub fn presented(&self) -> Vec<DialogSpec> {
        self.presented.lock().unwrap().clone()
    }

    pub fn dismiss_calls(&self) -> u32 {
        *self.dismiss_calls.lock().unwrap()
    }
}

#[async_trait]
impl DialogPresenter for MockDialogs {
    async fn present(&self, spec: &DialogSpec) -> DisplayResult<ButtonChoice> {
        if *self.fail_present.lock().unwrap() {
            return Err(crate::DisplayError::HelperFailed(
                "mock present failure".into(),
            ));
        }
        self.presented.lock().unwrap().push(spec.clone());
        Ok(self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(ButtonChoice::Primary))
    }

    async fn dismiss_all(&self) -> DisplayResult<()> {
        *self.dismiss_calls.lock().unwrap() += 1;
        Ok(())
    }
}

/// Mock session control
#[derive(Default)]
pub struct MockSessionControl {
    /// Simulate the logout command failing outright
    pub fail_log_out: Mutex<bool>,

    /// Applications reported as visible to the console user
    pub visible_apps: Mutex<Vec<String>>,

    logged_out: Mutex<Vec<String>>,
    rebooted: Mutex<u32>,
    restarted: Mutex<u32>,
    force_quit_calls: Mutex<u32>,
    lock_out_calls: Mutex<u32>,
}

impl MockSessionControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Users `log_out` was invoked for, in order.
    pub fn logged_out(&self) -> Vec<String> {
        self.logged_out.lock().unwrap().clone()
    }

    pub fn reboot_calls(&self) -> u32 {
        *self.rebooted.lock().unwrap()
    }

    pub fn restart_calls(&self) -> u32 {
        *self.restarted.lock().unwrap()
    }

    pub fn force_quit_calls(&self) -> u32 {
        *self.force_quit_calls.lock().unwrap()
    }

    pub fn lock_out_calls(&self) -> u32 {
        *self.lock_out_calls.lock().unwrap()
    }
}

#[async_trait]
impl SessionControl for MockSessionControl {
    async fn log_out(&self, user: &str) -> SessionResult<()> {
        if *self.fail_log_out.lock().unwrap() {
            return Err(crate::SessionError::LogoutFailed(
                "mock logout failure".into(),
            ));
        }
        self.logged_out.lock().unwrap().push(user.to_string());
        Ok(())
    }

    async fn reboot_unauthenticated(&self) -> SessionResult<()> {
        *self.rebooted.lock().unwrap() += 1;
        Ok(())
    }

    async fn restart_via_apple_events(&self) -> SessionResult<()> {
        *self.restarted.lock().unwrap() += 1;
        Ok(())
    }

    async fn visible_applications(&self) -> SessionResult<Vec<String>> {
        Ok(self.visible_apps.lock().unwrap().clone())
    }

    async fn force_quit_visible_applications(&self) -> SessionResult<()> {
        *self.force_quit_calls.lock().unwrap() += 1;
        self.visible_apps.lock().unwrap().clear();
        Ok(())
    }

    async fn lock_login_window(&self) -> SessionResult<()> {
        *self.lock_out_calls.lock().unwrap() += 1;
        Ok(())
    }
}

/// Mock environment probe
///
/// Returns scripted snapshots front-to-back; the final snapshot repeats once
/// the script is exhausted. The logout-confirmation loop takes one snapshot
/// per poll, so tests script the console emptying (or not) over time.
pub struct MockProbe {
    snapshots: Mutex<VecDeque<EnvironmentSnapshot>>,
    last: Mutex<Option<EnvironmentSnapshot>>,

    /// Simulate the probe failing entirely
    pub fail_snapshot: Mutex<bool>,

    snapshot_calls: Mutex<u32>,
}

impl MockProbe {
    /// A probe that always reports the same snapshot.
    pub fn fixed(snapshot: EnvironmentSnapshot) -> Self {
        Self {
            snapshots: Mutex::new(VecDeque::new()),
            last: Mutex::new(Some(snapshot)),
            fail_snapshot: Mutex::new(false),
            snapshot_calls: Mutex::new(0),
        }
    }

    /// A probe that plays back the given snapshots in order, repeating the
    /// final one.
    pub fn sequence(snapshots: Vec<EnvironmentSnapshot>) -> Self {
        Self {
            snapshots: Mutex::new(snapshots.into()),
            last: Mutex::new(None),
            fail_snapshot: Mutex::new(false),
            snapshot_calls: Mutex::new(0),
        }
    }

    pub fn snapshot_calls(&self) -> u32 {
        *self.snapshot_calls.lock().unwrap()
    }
}

#[async_trait]
impl EnvironmentProbe for MockProbe {
    async fn snapshot(&self) -> ProbeResult<EnvironmentSnapshot> {
        if *self.fail_snapshot.lock().unwrap() {
            return Err(ProbeError::CommandFailed("mock probe failure".into()));
        }
        *self.snapshot_calls.lock().unwrap() += 1;

        let mut queue = self.snapshots.lock().unwrap();
        let mut last = self.last.lock().unwrap();
        if let Some(next) = queue.pop_front() {
            *last = Some(next);
        }
        last.clone()
            .ok_or_else(|| ProbeError::CommandFailed("no snapshot scripted".into()))
    }
}
