//! macOS adapters for patchward
//!
//! The real implementations of the collaborator traits: `softwareupdate`
//! for the catalog, a dialog helper for display, `osascript` and friends
//! for session control, and `pmset`/`sysctl`/`w` for the environment probe.
//! Every string-parsing boundary lives in a pure function with unit tests;
//! nothing above this crate ever sees command output.

mod catalog;
mod command;
mod dialog;
mod loginwindow;
mod manifest;
mod probe;
mod session;

pub use catalog::*;
pub use command::*;
pub use dialog::*;
pub use loginwindow::*;
pub use manifest::*;
pub use probe::*;
pub use session::*;
