//! Collaborators the dispatcher talks to.
//!
//! Every trait here is synchronous: calls are bounded and a stalled call only
//! stalls the event that issued it.

use opush_core::{NewTransfer, RecordId, TransferRow, Visibility};
use thiserror::Error;
use url::Url;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("record store unavailable: {0}")]
    Unavailable(String),
    #[error("record {0} does not exist")]
    Missing(RecordId),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LaunchError {
    #[error("no handler accepts {mime} for {uri}")]
    NoHandler { uri: String, mime: String },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecordUpdate {
    pub visibility: Option<Visibility>,
}

impl RecordUpdate {
    #[must_use]
    pub fn hide() -> Self {
        Self {
            visibility: Some(Visibility::Hidden),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Handler {
    pub name: String,
}

/// Screens the dispatcher can ask the UI to bring up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Activity {
    DevicePicker,
    IncomingConfirm { uri: Url },
    TransferDetail { uri: Url },
    Error { title: String, content: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutgoingBatch {
    pub file_count: usize,
    pub multiple: bool,
}

pub trait RecordStore: Send + Sync {
    fn get(&self, id: RecordId) -> Result<Option<TransferRow>, StoreError>;
    /// Rows inserted with `timestamp`, in ascending id order.
    fn query_batch(&self, timestamp: i64) -> Result<Vec<TransferRow>, StoreError>;
    fn update(&self, id: RecordId, update: RecordUpdate) -> Result<(), StoreError>;
    fn insert(&self, transfer: NewTransfer) -> Result<RecordId, StoreError>;
}

pub trait DeviceDirectory: Send + Sync {
    fn name_for(&self, address: &str) -> String;
}

pub trait ContentTypeResolver: Send + Sync {
    fn type_for(&self, uri: &str) -> Option<String>;
}

pub trait HandlerResolver: Send + Sync {
    fn find_handlers(&self, uri: &Url, mime: &str) -> Vec<Handler>;
    fn launch_viewer(&self, uri: &Url, mime: &str) -> Result<(), LaunchError>;
}

pub trait UiSurface: Send + Sync {
    fn show_toast(&self, text: &str);
    fn launch_activity(&self, activity: Activity);
    fn cancel_notification(&self, id: RecordId);
}

pub trait TransferManager: Send + Sync {
    fn ensure_running(&self);
    fn start_transfer(&self, address: &str) -> OutgoingBatch;
}
