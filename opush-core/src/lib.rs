use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

pub const STATUS_PENDING: i32 = 190;
pub const STATUS_RUNNING: i32 = 192;
pub const STATUS_SUCCESS: i32 = 200;
pub const STATUS_BAD_REQUEST: i32 = 400;
pub const STATUS_FORBIDDEN: i32 = 403;
pub const STATUS_NOT_ACCEPTABLE: i32 = 406;
pub const STATUS_LENGTH_REQUIRED: i32 = 411;
pub const STATUS_PRECONDITION_FAILED: i32 = 412;
pub const STATUS_CANCELED: i32 = 490;
pub const STATUS_UNKNOWN_ERROR: i32 = 491;
pub const STATUS_FILE_ERROR: i32 = 492;
pub const STATUS_NO_STORAGE: i32 = 493;
pub const STATUS_STORAGE_FULL: i32 = 494;
pub const STATUS_UNHANDLED_PROTOCOL_CODE: i32 = 495;
pub const STATUS_PROTOCOL_DATA_ERROR: i32 = 496;
pub const STATUS_CONNECTION_ERROR: i32 = 497;

pub const DEFAULT_RECORD_BASE_URI: &str = "content://com.opush.share/transfers";

const DESC_PROTOCOL_ERROR: &str = "Request can't be handled correctly.";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct RecordId(pub i64);

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    #[default]
    Outbound,
    Inbound,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    #[default]
    Visible,
    Hidden,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum UserConfirmation {
    #[default]
    Pending,
    Confirmed,
    Denied,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    BadRequest,
    LengthRequired,
    PreconditionFailed,
    UnhandledProtocolCode,
    ProtocolDataError,
    NotAcceptable,
    Forbidden,
    Canceled,
    FileError,
    NoStorage,
    StorageFull,
    ConnectionError,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusClass {
    Pending,
    Running,
    Success,
    Error(ErrorKind),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub class: StatusClass,
    pub description: &'static str,
}

/// One row of the transfer table as the store hands it over.
///
/// Nullable columns stay `Option` here; [`TransferRecord`] is the resolved
/// view built from it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TransferRow {
    pub id: RecordId,
    #[serde(default = "default_status")]
    pub status: i32,
    #[serde(default)]
    pub direction: Direction,
    #[serde(default)]
    pub total_bytes: u64,
    #[serde(default)]
    pub current_bytes: u64,
    #[serde(default)]
    pub timestamp: i64,
    #[serde(default)]
    pub destination: String,
    /// Local path of the stored file.
    #[serde(default)]
    pub data: Option<String>,
    #[serde(default)]
    pub filename_hint: Option<String>,
    /// Source URI of an outbound file.
    #[serde(default)]
    pub uri: Option<String>,
    #[serde(default)]
    pub mimetype: Option<String>,
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(default)]
    pub user_confirmation: UserConfirmation,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewTransfer {
    pub uri: Option<String>,
    pub mimetype: Option<String>,
    pub destination: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRecord {
    pub id: RecordId,
    pub status: i32,
    pub direction: Direction,
    pub total_bytes: u64,
    pub current_bytes: u64,
    pub timestamp: i64,
    pub destination: String,
    pub file_name: String,
    pub file_uri: Option<String>,
    pub file_type: Option<String>,
    pub device_name: String,
    pub visibility: Visibility,
    pub user_confirmation: UserConfirmation,
}

impl TransferRecord {
    #[must_use]
    pub fn classification(&self) -> Classification {
        classify(self.status)
    }

    #[must_use]
    pub fn progress_text(&self) -> String {
        format_progress_text(self.total_bytes, self.current_bytes)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RadioState {
    Off,
    TurningOn,
    On,
    TurningOff,
}

/// Inbound signals the dispatcher reacts to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    BootCompleted,
    RadioStateChanged { state: RadioState },
    PeerDeviceSelected { address: String },
    IncomingFileConfirm { uri: Url },
    IncomingFileConfirmationRequest,
    Open { uri: Url },
    List { uri: Url },
    Hide { uri: Url },
    TransferCompleted { uri: Url },
    #[serde(other)]
    Unknown,
}

impl Event {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Event::BootCompleted => "boot_completed",
            Event::RadioStateChanged { .. } => "radio_state_changed",
            Event::PeerDeviceSelected { .. } => "peer_device_selected",
            Event::IncomingFileConfirm { .. } => "incoming_file_confirm",
            Event::IncomingFileConfirmationRequest => "incoming_file_confirmation_request",
            Event::Open { .. } => "open",
            Event::List { .. } => "list",
            Event::Hide { .. } => "hide",
            Event::TransferCompleted { .. } => "transfer_completed",
            Event::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CoreError {
    #[error("record uri {0} does not end in a record id")]
    InvalidRecordUri(String),
    #[error("record base uri {0} cannot carry path segments")]
    InvalidBaseUri(String),
    #[error("path {0} cannot be expressed as a file uri")]
    InvalidFilePath(String),
}

pub fn classify(code: i32) -> Classification {
    let (class, description) = match code {
        STATUS_PENDING => (StatusClass::Pending, "Pending"),
        STATUS_RUNNING => (StatusClass::Running, "In progress"),
        STATUS_SUCCESS => (StatusClass::Success, "Complete"),
        STATUS_BAD_REQUEST => (StatusClass::Error(ErrorKind::BadRequest), DESC_PROTOCOL_ERROR),
        STATUS_LENGTH_REQUIRED => (
            StatusClass::Error(ErrorKind::LengthRequired),
            DESC_PROTOCOL_ERROR,
        ),
        STATUS_PRECONDITION_FAILED => (
            StatusClass::Error(ErrorKind::PreconditionFailed),
            DESC_PROTOCOL_ERROR,
        ),
        STATUS_UNHANDLED_PROTOCOL_CODE => (
            StatusClass::Error(ErrorKind::UnhandledProtocolCode),
            DESC_PROTOCOL_ERROR,
        ),
        STATUS_PROTOCOL_DATA_ERROR => (
            StatusClass::Error(ErrorKind::ProtocolDataError),
            DESC_PROTOCOL_ERROR,
        ),
        STATUS_NOT_ACCEPTABLE => (
            StatusClass::Error(ErrorKind::NotAcceptable),
            "Content is not supported.",
        ),
        STATUS_FORBIDDEN => (
            StatusClass::Error(ErrorKind::Forbidden),
            "Transfer forbidden by target device.",
        ),
        STATUS_CANCELED => (
            StatusClass::Error(ErrorKind::Canceled),
            "Transfer canceled by user.",
        ),
        STATUS_FILE_ERROR => (StatusClass::Error(ErrorKind::FileError), "Storage issue."),
        STATUS_NO_STORAGE => (
            StatusClass::Error(ErrorKind::NoStorage),
            "No storage available.",
        ),
        STATUS_STORAGE_FULL => (
            StatusClass::Error(ErrorKind::StorageFull),
            "There isn't enough space in storage to save the file.",
        ),
        STATUS_CONNECTION_ERROR => (
            StatusClass::Error(ErrorKind::ConnectionError),
            "Connection unsuccessful.",
        ),
        _ => (StatusClass::Error(ErrorKind::Unknown), "unknown error."),
    };

    Classification { class, description }
}

pub fn status_description(code: i32) -> &'static str {
    classify(code).description
}

pub fn is_success(code: i32) -> bool {
    matches!(classify(code).class, StatusClass::Success)
}

pub fn is_error(code: i32) -> bool {
    matches!(classify(code).class, StatusClass::Error(_))
}

pub fn is_completed(code: i32) -> bool {
    is_success(code) || is_error(code)
}

pub fn format_progress_text(total_bytes: u64, current_bytes: u64) -> String {
    if total_bytes == 0 {
        return "0%".to_owned();
    }
    let progress = (u128::from(current_bytes) * 100 / u128::from(total_bytes)).min(100);
    format!("{progress}%")
}

pub fn record_id_from_uri(uri: &Url) -> Result<RecordId, CoreError> {
    uri.path_segments()
        .and_then(|segments| segments.filter(|s| !s.is_empty()).next_back())
        .and_then(|last| last.parse::<i64>().ok())
        .filter(|id| *id >= 0)
        .map(RecordId)
        .ok_or_else(|| CoreError::InvalidRecordUri(uri.to_string()))
}

pub fn record_uri(base: &str, id: RecordId) -> Result<Url, CoreError> {
    let mut uri = Url::parse(base).map_err(|_| CoreError::InvalidBaseUri(base.to_owned()))?;
    uri.path_segments_mut()
        .map_err(|()| CoreError::InvalidBaseUri(base.to_owned()))?
        .pop_if_empty()
        .push(&id.to_string());
    Ok(uri)
}

/// Turns a stored file location into a URI.
///
/// Anything that already parses with a scheme is kept as is; everything else
/// is a local path and becomes a `file://` URI.
pub fn content_uri(location: &str) -> Result<Url, CoreError> {
    if let Ok(uri) = Url::parse(location) {
        return Ok(uri);
    }

    let absolute = std::path::absolute(Path::new(location))
        .map_err(|_| CoreError::InvalidFilePath(location.to_owned()))?;
    Url::from_file_path(&absolute).map_err(|()| CoreError::InvalidFilePath(location.to_owned()))
}

fn default_status() -> i32 {
    STATUS_PENDING
}
