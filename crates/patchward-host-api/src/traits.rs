//! Collaborator traits
//!
//! One trait per external system the policy drives. Adapters translate these
//! typed operations into process invocations; the engine never sees command
//! output.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

use crate::{ButtonChoice, DialogSpec, EnvironmentSnapshot, PendingUpdate};

/// Errors from the update catalog
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The external command exceeded its allotted time. Fatal to the run;
    /// the caller must abort rather than proceed with partial data.
    #[error("Catalog command '{command}' timed out after {timeout:?}")]
    Timeout { command: String, timeout: Duration },

    /// The update's distribution manifest cannot be located or parsed, so
    /// its restart requirement cannot be determined. Never guessed.
    #[error("Manifest unreadable for {product_key}: {reason}")]
    ManifestUnreadable { product_key: String, reason: String },

    #[error("Catalog command failed: {0}")]
    CommandFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CatalogError {
    /// Whether this error must abort the whole run (as opposed to skipping
    /// the sub-step it came from).
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            CatalogError::Timeout { .. } | CatalogError::ManifestUnreadable { .. }
        )
    }
}

pub type CatalogResult<T> = Result<T, CatalogError>;

/// Errors from the display layer
#[derive(Debug, Error)]
pub enum DisplayError {
    #[error("Dialog helper failed: {0}")]
    HelperFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type DisplayResult<T> = Result<T, DisplayError>;

/// Errors from session control
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Logout failed: {0}")]
    LogoutFailed(String),

    #[error("Reboot failed: {0}")]
    RebootFailed(String),

    #[error("Login window lock-out failed: {0}")]
    LockOutFailed(String),

    #[error("Session command failed: {0}")]
    CommandFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type SessionResult<T> = Result<T, SessionError>;

/// Errors from the environment probe
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("Probe command failed: {0}")]
    CommandFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type ProbeResult<T> = Result<T, ProbeError>;

/// The OS update mechanism: refresh, classify, download and install
/// recommended updates, each with a bounded wait.
#[async_trait]
pub trait UpdateCatalog: Send + Sync {
    /// Refresh the catalog and report the recommended updates, with a
    /// bounded wait on the order of minutes.
    async fn list_recommended(&self) -> CatalogResult<Vec<PendingUpdate>>;

    /// Whether installing the update requires a restart, determined from
    /// the update's staged distribution manifest. The update must already
    /// be downloaded.
    async fn requires_restart(&self, update: &PendingUpdate) -> CatalogResult<bool>;

    /// Download a single update into the cache.
    async fn download(&self, update: &PendingUpdate) -> CatalogResult<()>;

    /// Install a single, already-downloaded update.
    async fn install(&self, update: &PendingUpdate) -> CatalogResult<()>;

    /// Install every pending recommended update, with an hour-scale bound.
    async fn install_all_recommended(&self) -> CatalogResult<()>;
}

/// The display layer: present a modal dialog and report which button was
/// pressed.
#[async_trait]
pub trait DialogPresenter: Send + Sync {
    async fn present(&self, spec: &DialogSpec) -> DisplayResult<ButtonChoice>;

    /// Terminate stray dialog-helper processes left over from earlier
    /// prompts, so a superseding dialog is never stacked behind one.
    async fn dismiss_all(&self) -> DisplayResult<()>;
}

/// The session-control layer: log out the console session, reboot, and
/// manage the login-window lock-out.
#[async_trait]
pub trait SessionControl: Send + Sync {
    /// Application-level logout of the named console user. Logout (rather
    /// than a direct reboot) lets the OS run its own pending-install
    /// mechanism.
    async fn log_out(&self, user: &str) -> SessionResult<()>;

    /// Unauthenticated machine reboot; lands on the pre-login screen when
    /// disk encryption is enabled.
    async fn reboot_unauthenticated(&self) -> SessionResult<()>;

    /// Graceful restart through the application layer.
    async fn restart_via_apple_events(&self) -> SessionResult<()>;

    /// Names of applications visible to the console user.
    async fn visible_applications(&self) -> SessionResult<Vec<String>>;

    /// Force-quit every visible application. Unsaved data is lost; only
    /// invoked after the user confirms.
    async fn force_quit_visible_applications(&self) -> SessionResult<()>;

    /// Keep a full-screen "installing updates" panel over the login window
    /// for the duration of an unattended install.
    async fn lock_login_window(&self) -> SessionResult<()>;
}

/// The environment probe: one snapshot of every condition gating unattended
/// action.
#[async_trait]
pub trait EnvironmentProbe: Send + Sync {
    async fn snapshot(&self) -> ProbeResult<EnvironmentSnapshot>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeouts_and_manifest_errors_are_fatal() {
        let timeout = CatalogError::Timeout {
            command: "softwareupdate -l -r".into(),
            timeout: Duration::from_secs(180),
        };
        assert!(timeout.is_fatal());

        let manifest = CatalogError::ManifestUnreadable {
            product_key: "041-88800".into(),
            reason: "no dist file".into(),
        };
        assert!(manifest.is_fatal());

        let transient = CatalogError::CommandFailed("exit 1".into());
        assert!(!transient.is_fatal());
    }
}
