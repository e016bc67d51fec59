//! Persistence layer for patchward
//!
//! A durable single-record store holding the "OK to defer until" deadline.
//! The record exists exactly while a restart-requiring update is pending
//! and unresolved; it is created on first encounter, never extended, and
//! deleted once no restart-requiring updates remain.

mod file;
mod memory;
mod traits;

pub use file::*;
pub use memory::*;
pub use traits::*;

use thiserror::Error;

/// Store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
