//! Enforcement decision engine for patchward
//!
//! One run of the engine decides, for the current catalog snapshot and
//! environment, whether to install silently, prompt the console user,
//! force a logout, install unattended, or do nothing. All interaction with
//! the outside world goes through the collaborator traits in
//! `patchward-host-api`, so the whole decision tree is testable against
//! fakes.

mod dialogs;
mod engine;
mod outcome;

pub use dialogs::*;
pub use engine::*;
pub use outcome::*;

use patchward_host_api::{CatalogError, DisplayError, ProbeError, SessionError};
use patchward_store::StoreError;
use thiserror::Error;

/// Errors that abort a run.
///
/// Anything that reaches this type unwinds to the top level and terminates
/// the process with a distinguished exit code; transient sub-step failures
/// are logged and swallowed at their call sites instead.
#[derive(Debug, Error)]
pub enum EnforceError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Display(#[from] DisplayError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Probe(#[from] ProbeError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl EnforceError {
    /// Process exit code for this failure. Fatal errors share the
    /// distinguished code the management agent alerts on.
    pub fn exit_code(&self) -> i32 {
        255
    }
}
