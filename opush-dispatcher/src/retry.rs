use opush_core::{NewTransfer, RecordId, TransferRecord, record_uri};
use tracing::{info, warn};

use crate::{error::DispatchError, ports::RecordStore};

/// Queues a fresh outbound transfer carrying the failed record's routing fields.
///
/// The failed row itself is left as it is. A failed insert is reported once
/// and never retried here.
pub fn retry(
    store: &dyn RecordStore,
    record: &TransferRecord,
    base_uri: &str,
) -> Result<RecordId, DispatchError> {
    let transfer = NewTransfer {
        uri: record.file_uri.clone(),
        mimetype: record.file_type.clone(),
        destination: record.destination.clone(),
    };

    match store.insert(transfer) {
        Ok(id) => {
            match record_uri(base_uri, id) {
                Ok(uri) => info!("insert {} to device {}", uri, record.device_name),
                Err(_) => info!("insert record {} to device {}", id, record.device_name),
            }
            Ok(id)
        }
        Err(err) => {
            warn!("retry of record {} failed: {}", record.id, err);
            Err(err.into())
        }
    }
}
