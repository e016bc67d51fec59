//! Shared utilities for patchward
//!
//! This crate provides:
//! - Quiet-hours window arithmetic (with midnight wraparound)
//! - Deadline formatting for user-facing dialogs
//! - Default paths for the deferral record, lock file, updates cache and log

mod paths;
mod time;

pub use paths::*;
pub use time::*;
