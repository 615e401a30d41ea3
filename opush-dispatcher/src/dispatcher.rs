use std::sync::Arc;

use opush_core::{
    Direction, Event, RadioState, RecordId, StatusClass, TransferRecord, UserConfirmation,
    Visibility, is_completed, is_error, record_id_from_uri,
};
use tracing::{debug, info, warn};
use url::Url;

use crate::{
    accessor::RecordAccessor,
    config::{DispatcherConfig, fill_template},
    error::{DispatchError, OpenError},
    opener::FileOpener,
    ports::{
        Activity, ContentTypeResolver, DeviceDirectory, HandlerResolver, RecordStore,
        RecordUpdate, TransferManager, UiSurface,
    },
    retry::retry,
    send_intent::PendingDevicePicker,
};

#[derive(Clone)]
pub struct Collaborators {
    pub store: Arc<dyn RecordStore>,
    pub directory: Arc<dyn DeviceDirectory>,
    pub content_types: Arc<dyn ContentTypeResolver>,
    pub handlers: Arc<dyn HandlerResolver>,
    pub ui: Arc<dyn UiSurface>,
    pub transfers: Arc<dyn TransferManager>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    Handled,
    Ignored,
    Aborted(DispatchError),
}

/// Routes one external event at a time to the collaborators.
///
/// Holds no per-event state, so concurrent `dispatch` calls are independent.
pub struct Dispatcher {
    ports: Collaborators,
    config: DispatcherConfig,
    picker: PendingDevicePicker,
}

impl Dispatcher {
    #[must_use]
    pub fn new(ports: Collaborators, config: DispatcherConfig, picker: PendingDevicePicker) -> Self {
        Self {
            ports,
            config,
            picker,
        }
    }

    pub fn dispatch(&self, event: Event) -> Disposition {
        let name = event.name();
        debug!("dispatching {}", name);

        let result = match event {
            Event::BootCompleted => {
                self.ports.transfers.ensure_running();
                Ok(())
            }
            Event::RadioStateChanged { state } => {
                if state != RadioState::On {
                    return Disposition::Ignored;
                }
                self.on_radio_on();
                Ok(())
            }
            Event::PeerDeviceSelected { address } => {
                self.on_device_selected(&address);
                Ok(())
            }
            Event::IncomingFileConfirm { uri } => {
                self.on_incoming_confirm(uri);
                Ok(())
            }
            Event::IncomingFileConfirmationRequest => {
                self.ports.ui.show_toast(&self.config.strings.incoming_file);
                Ok(())
            }
            Event::Open { uri } | Event::List { uri } => self.on_open_or_list(uri),
            Event::Hide { uri } => self.on_hide(&uri),
            Event::TransferCompleted { uri } => self.on_transfer_completed(&uri),
            Event::Unknown => return Disposition::Ignored,
        };

        match result {
            Ok(()) => Disposition::Handled,
            Err(err) => {
                warn!("{} abandoned: {}", name, err);
                Disposition::Aborted(err)
            }
        }
    }

    /// Re-queues a failed transfer as a new record.
    pub fn retry_transfer(&self, uri: &Url) -> Result<RecordId, DispatchError> {
        let record = self.accessor().query_by_uri(uri)?;
        if !is_error(record.status) {
            return Err(DispatchError::NotRetryable {
                id: record.id,
                status: record.status,
            });
        }
        retry(
            self.ports.store.as_ref(),
            &record,
            &self.config.record_base_uri,
        )
    }

    pub fn record(&self, uri: &Url) -> Result<TransferRecord, DispatchError> {
        self.accessor().query_by_uri(uri)
    }

    pub fn batch_uris(&self, timestamp: i64) -> Result<Vec<Url>, DispatchError> {
        self.accessor().query_batch(timestamp)
    }

    fn accessor(&self) -> RecordAccessor<'_> {
        RecordAccessor {
            store: self.ports.store.as_ref(),
            directory: self.ports.directory.as_ref(),
            content_types: self.ports.content_types.as_ref(),
            strings: &self.config.strings,
        }
    }

    fn opener(&self) -> FileOpener<'_> {
        FileOpener {
            handlers: self.ports.handlers.as_ref(),
            ui: self.ports.ui.as_ref(),
            strings: &self.config.strings,
        }
    }

    fn on_radio_on(&self) {
        self.ports.transfers.ensure_running();
        if self.picker.take() {
            info!("radio on during a pending send, showing device picker");
            self.ports.ui.launch_activity(Activity::DevicePicker);
        }
    }

    fn on_device_selected(&self, address: &str) {
        debug!("device selected: {}", address);
        let batch = self.ports.transfers.start_transfer(address);
        let device_name = self.ports.directory.name_for(address);
        let strings = &self.config.strings;

        let toast = if batch.multiple {
            let count = batch.file_count.to_string();
            fill_template(
                &strings.sending_batch,
                &[("count", count.as_str()), ("device", device_name.as_str())],
            )
        } else {
            fill_template(&strings.sending_single, &[("device", device_name.as_str())])
        };
        self.ports.ui.show_toast(&toast);
    }

    fn on_incoming_confirm(&self, uri: Url) {
        let id = record_id_from_uri(&uri);
        self.ports
            .ui
            .launch_activity(Activity::IncomingConfirm { uri });
        match id {
            Ok(id) => self.ports.ui.cancel_notification(id),
            Err(err) => warn!("no notification to cancel: {}", err),
        }
    }

    fn on_open_or_list(&self, uri: Url) -> Result<(), DispatchError> {
        let record = self.accessor().query_by_uri(&uri)?;

        if record.direction == Direction::Inbound
            && record.classification().class == StatusClass::Success
        {
            let opened = self.opener().open_received(
                Some(&record.file_name),
                record.file_type.as_deref(),
                record.timestamp,
            );
            match opened {
                Ok(outcome) => debug!("open of record {}: {:?}", record.id, outcome),
                Err(err @ OpenError::NoHandler { .. }) => debug!("{}", err),
                Err(err) => warn!("open of record {} failed: {}", record.id, err),
            }
            self.hide_record(record.id);
        } else {
            self.ports
                .ui
                .launch_activity(Activity::TransferDetail { uri });
        }

        self.ports.ui.cancel_notification(record.id);
        Ok(())
    }

    fn on_hide(&self, uri: &Url) -> Result<(), DispatchError> {
        let id = record_id_from_uri(uri)?;
        let row = self
            .ports
            .store
            .get(id)?
            .ok_or(DispatchError::NotFound(id))?;

        let hideable = is_completed(row.status)
            || row.user_confirmation == UserConfirmation::Pending;
        if hideable && row.visibility == Visibility::Visible {
            self.ports.store.update(id, RecordUpdate::hide())?;
            debug!("record {} hidden", id);
        }
        Ok(())
    }

    fn on_transfer_completed(&self, uri: &Url) -> Result<(), DispatchError> {
        let record = self.accessor().query_by_uri(uri)?;
        let strings = &self.config.strings;
        let file = [("file", record.file_name.as_str())];

        let toast = match (record.classification().class, record.direction) {
            (StatusClass::Success, Direction::Outbound) => Some(fill_template(&strings.sent, &file)),
            (StatusClass::Success, Direction::Inbound) => {
                Some(fill_template(&strings.received, &file))
            }
            (StatusClass::Error(_), Direction::Outbound) => {
                Some(fill_template(&strings.send_failed, &file))
            }
            (StatusClass::Error(_), Direction::Inbound) => Some(strings.download_failed.clone()),
            (StatusClass::Pending | StatusClass::Running, _) => None,
        };

        debug!("completion toast for record {}: {:?}", record.id, toast);
        if let Some(toast) = toast {
            self.ports.ui.show_toast(&toast);
        }
        Ok(())
    }

    fn hide_record(&self, id: RecordId) {
        if let Err(err) = self.ports.store.update(id, RecordUpdate::hide()) {
            warn!("could not hide record {}: {}", id, err);
        }
    }
}
