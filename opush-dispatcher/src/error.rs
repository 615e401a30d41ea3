use opush_core::{CoreError, RecordId};
use thiserror::Error;

use crate::ports::StoreError;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error("no transfer record with id {0}")]
    NotFound(RecordId),
    #[error(transparent)]
    Core(#[from] CoreError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("record {id} has status {status} and cannot be retried")]
    NotRetryable { id: RecordId, status: i32 },
}

/// Failures of a single open attempt that are not shown to the user.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum OpenError {
    #[error("cannot open received file without a {0}")]
    PreconditionMissing(&'static str),
    #[error("viewer for {mime} disappeared before launching {uri}")]
    NoHandler { uri: String, mime: String },
    #[error(transparent)]
    Core(#[from] CoreError),
}
