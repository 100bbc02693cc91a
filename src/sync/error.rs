//! Error taxonomy for sync passes.

use thiserror::Error;

use crate::store::StorageError;

/// Errors raised by a sync pass.
///
/// `MalformedInput` and `InvalidReference` are raised before any storage I/O
/// and are caller errors; `StorageFailure` carries the store's error verbatim.
#[derive(Debug, Error)]
pub enum SyncError {
    /// An add/remove input is not an owner object or an array of them.
    #[error("malformed input: {0}")]
    MalformedInput(String),

    /// A foreign reference has no resolvable id.
    #[error("invalid reference: {0}")]
    InvalidReference(String),

    /// The batch write failed.
    #[error("storage failure: {0}")]
    StorageFailure(#[from] StorageError),
}

impl SyncError {
    /// Whether the caller sent bad input (as opposed to the store failing).
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::MalformedInput(_) | Self::InvalidReference(_))
    }
}
