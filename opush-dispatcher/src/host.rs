//! Adapters that log and remember what the dispatcher asked of the outside
//! world. The replay binary runs on them, and so do the tests.

use std::sync::{
    Mutex,
    atomic::{AtomicUsize, Ordering},
};

use opush_core::RecordId;
use tracing::info;
use url::Url;

use crate::ports::{
    Activity, Handler, HandlerResolver, LaunchError, OutgoingBatch, TransferManager, UiSurface,
};

#[derive(Debug, Default)]
struct UiLog {
    toasts: Vec<String>,
    activities: Vec<Activity>,
    cancelled: Vec<RecordId>,
}

#[derive(Debug, Default)]
pub struct RecordingUi {
    log: Mutex<UiLog>,
}

impl RecordingUi {
    pub fn toasts(&self) -> Vec<String> {
        self.with_log(|log| log.toasts.clone())
    }

    pub fn activities(&self) -> Vec<Activity> {
        self.with_log(|log| log.activities.clone())
    }

    pub fn cancelled_notifications(&self) -> Vec<RecordId> {
        self.with_log(|log| log.cancelled.clone())
    }

    fn with_log<T>(&self, f: impl FnOnce(&mut UiLog) -> T) -> T {
        let mut log = match self.log.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut log)
    }
}

impl UiSurface for RecordingUi {
    fn show_toast(&self, text: &str) {
        info!(text, "toast");
        self.with_log(|log| log.toasts.push(text.to_owned()));
    }

    fn launch_activity(&self, activity: Activity) {
        info!(?activity, "launch activity");
        self.with_log(|log| log.activities.push(activity));
    }

    fn cancel_notification(&self, id: RecordId) {
        info!(%id, "cancel notification");
        self.with_log(|log| log.cancelled.push(id));
    }
}

/// Claims a viewer for every MIME type matching one of its patterns.
///
/// A pattern ending in `/` matches the whole top-level type.
#[derive(Debug, Default)]
pub struct ViewerTable {
    patterns: Vec<String>,
    launched: Mutex<Vec<(Url, String)>>,
}

impl ViewerTable {
    #[must_use]
    pub fn new(patterns: Vec<String>) -> Self {
        Self {
            patterns,
            launched: Mutex::new(Vec::new()),
        }
    }

    pub fn launched(&self) -> Vec<(Url, String)> {
        match self.launched.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn accepts(&self, mime: &str) -> bool {
        self.patterns.iter().any(|pattern| {
            if pattern.ends_with('/') {
                mime.starts_with(pattern.as_str())
            } else {
                mime.eq_ignore_ascii_case(pattern)
            }
        })
    }
}

impl HandlerResolver for ViewerTable {
    fn find_handlers(&self, _uri: &Url, mime: &str) -> Vec<Handler> {
        if self.accepts(mime) {
            vec![Handler {
                name: format!("viewer for {mime}"),
            }]
        } else {
            Vec::new()
        }
    }

    fn launch_viewer(&self, uri: &Url, mime: &str) -> Result<(), LaunchError> {
        if !self.accepts(mime) {
            return Err(LaunchError::NoHandler {
                uri: uri.to_string(),
                mime: mime.to_owned(),
            });
        }
        info!("viewing {} as {}", uri, mime);
        let mut launched = match self.launched.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        launched.push((uri.clone(), mime.to_owned()));
        Ok(())
    }
}

#[derive(Debug)]
pub struct RecordingTransfers {
    batch: OutgoingBatch,
    service_starts: AtomicUsize,
    sessions: Mutex<Vec<String>>,
}

impl RecordingTransfers {
    /// `file_count` is the size of the outgoing batch every session reports.
    #[must_use]
    pub fn new(file_count: usize) -> Self {
        Self {
            batch: OutgoingBatch {
                file_count,
                multiple: file_count > 1,
            },
            service_starts: AtomicUsize::new(0),
            sessions: Mutex::new(Vec::new()),
        }
    }

    pub fn service_starts(&self) -> usize {
        self.service_starts.load(Ordering::Acquire)
    }

    pub fn sessions(&self) -> Vec<String> {
        match self.sessions.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl Default for RecordingTransfers {
    fn default() -> Self {
        Self::new(1)
    }
}

impl TransferManager for RecordingTransfers {
    fn ensure_running(&self) {
        let starts = self.service_starts.fetch_add(1, Ordering::AcqRel) + 1;
        info!(starts, "transfer service start requested");
    }

    fn start_transfer(&self, address: &str) -> OutgoingBatch {
        info!("starting transfer session to {}", address);
        let mut sessions = match self.sessions.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        sessions.push(address.to_owned());
        self.batch
    }
}
