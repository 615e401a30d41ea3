//! In-process adapters for the store, device directory and content types.

use std::{
    collections::{BTreeMap, HashMap},
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
    time::{SystemTime, UNIX_EPOCH},
};

use opush_core::{
    Direction, NewTransfer, RecordId, STATUS_PENDING, TransferRow, UserConfirmation, Visibility,
};
use serde::{Deserialize, Serialize};

use crate::ports::{ContentTypeResolver, DeviceDirectory, RecordStore, RecordUpdate, StoreError};

/// Initial contents for the replay host: known devices and existing rows.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreSeed {
    #[serde(default)]
    pub devices: HashMap<String, String>,
    #[serde(default)]
    pub records: Vec<TransferRow>,
}

#[derive(Debug, Default)]
struct Table {
    rows: BTreeMap<RecordId, TransferRow>,
    last_id: i64,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Table>,
}

impl MemoryStore {
    #[must_use]
    pub fn with_rows(rows: Vec<TransferRow>) -> Self {
        let mut table = Table::default();
        for row in rows {
            table.last_id = table.last_id.max(row.id.0);
            table.rows.insert(row.id, row);
        }
        Self {
            inner: RwLock::new(table),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Table>, StoreError> {
        self.inner
            .read()
            .map_err(|_| StoreError::Unavailable("table lock poisoned".to_owned()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Table>, StoreError> {
        self.inner
            .write()
            .map_err(|_| StoreError::Unavailable("table lock poisoned".to_owned()))
    }
}

impl RecordStore for MemoryStore {
    fn get(&self, id: RecordId) -> Result<Option<TransferRow>, StoreError> {
        Ok(self.read()?.rows.get(&id).cloned())
    }

    fn query_batch(&self, timestamp: i64) -> Result<Vec<TransferRow>, StoreError> {
        Ok(self
            .read()?
            .rows
            .values()
            .filter(|row| row.timestamp == timestamp)
            .cloned()
            .collect())
    }

    fn update(&self, id: RecordId, update: RecordUpdate) -> Result<(), StoreError> {
        let mut table = self.write()?;
        let row = table.rows.get_mut(&id).ok_or(StoreError::Missing(id))?;
        if let Some(visibility) = update.visibility {
            row.visibility = visibility;
        }
        Ok(())
    }

    fn insert(&self, transfer: NewTransfer) -> Result<RecordId, StoreError> {
        let mut table = self.write()?;
        table.last_id += 1;
        let id = RecordId(table.last_id);
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
            .unwrap_or_default();

        table.rows.insert(
            id,
            TransferRow {
                id,
                status: STATUS_PENDING,
                direction: Direction::Outbound,
                total_bytes: 0,
                current_bytes: 0,
                timestamp,
                destination: transfer.destination,
                data: None,
                filename_hint: None,
                uri: transfer.uri,
                mimetype: transfer.mimetype,
                visibility: Visibility::Visible,
                user_confirmation: UserConfirmation::Confirmed,
            },
        );
        Ok(id)
    }
}

#[derive(Debug, Clone, Default)]
pub struct StaticDirectory {
    names: HashMap<String, String>,
}

impl StaticDirectory {
    #[must_use]
    pub fn new(names: HashMap<String, String>) -> Self {
        Self { names }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for StaticDirectory {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            names: iter
                .into_iter()
                .map(|(address, name)| (address.into(), name.into()))
                .collect(),
        }
    }
}

impl DeviceDirectory for StaticDirectory {
    fn name_for(&self, address: &str) -> String {
        self.names.get(address).cloned().unwrap_or_default()
    }
}

/// Guesses MIME types from the file extension at the end of the URI path.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExtensionTypeResolver;

impl ContentTypeResolver for ExtensionTypeResolver {
    fn type_for(&self, uri: &str) -> Option<String> {
        let path = uri.split(['?', '#']).next().unwrap_or(uri);
        mime_guess::from_path(path).first_raw().map(str::to_owned)
    }
}
