//! Collaborator trait interfaces for patchward
//!
//! This crate defines the seams between the enforcement engine and the
//! external systems it drives: the update catalog, the display layer, the
//! session-control layer and the environment probe. It contains no platform
//! code itself; the engine is tested against the mock implementations here.

mod mock;
mod traits;
mod types;

pub use mock::*;
pub use traits::*;
pub use types::*;
