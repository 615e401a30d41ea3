use opush_core::{TransferRecord, TransferRow, content_uri, record_id_from_uri};
use tracing::{debug, warn};
use url::Url;

use crate::{
    config::Strings,
    error::DispatchError,
    ports::{ContentTypeResolver, DeviceDirectory, RecordStore},
};

/// Reads transfer records and fills in the derived display fields.
pub struct RecordAccessor<'a> {
    pub store: &'a dyn RecordStore,
    pub directory: &'a dyn DeviceDirectory,
    pub content_types: &'a dyn ContentTypeResolver,
    pub strings: &'a Strings,
}

impl RecordAccessor<'_> {
    pub fn query_by_uri(&self, uri: &Url) -> Result<TransferRecord, DispatchError> {
        let id = record_id_from_uri(uri)?;
        let row = self.store.get(id)?.ok_or(DispatchError::NotFound(id))?;
        let record = self.resolve(row);
        debug!(
            id = %record.id,
            file_name = %record.file_name,
            file_type = ?record.file_type,
            destination = %record.destination,
            progress = %record.progress_text(),
            "record loaded"
        );
        Ok(record)
    }

    /// File URIs of every record in the batch, oldest insert first.
    pub fn query_batch(&self, timestamp: i64) -> Result<Vec<Url>, DispatchError> {
        let rows = self.store.query_batch(timestamp)?;

        let mut uris = Vec::with_capacity(rows.len());
        for row in rows {
            let Some(location) = non_empty(row.data.as_deref()) else {
                warn!("record {} in batch {} has no file path", row.id, timestamp);
                continue;
            };
            match content_uri(location) {
                Ok(uri) => {
                    debug!("uri in batch {}: {}", timestamp, uri);
                    uris.push(uri);
                }
                Err(err) => warn!("skipping record {} in batch {}: {}", row.id, timestamp, err),
            }
        }
        Ok(uris)
    }

    pub fn resolve(&self, row: TransferRow) -> TransferRecord {
        let file_name = resolve_file_name(&row, self.strings);
        let file_type = self.resolve_file_type(&row, &file_name);
        let device_name = self.directory.name_for(&row.destination);

        TransferRecord {
            id: row.id,
            status: row.status,
            direction: row.direction,
            total_bytes: row.total_bytes,
            current_bytes: row.current_bytes,
            timestamp: row.timestamp,
            destination: row.destination,
            file_name,
            file_uri: row.uri,
            file_type,
            device_name,
            visibility: row.visibility,
            user_confirmation: row.user_confirmation,
        }
    }

    fn resolve_file_type(&self, row: &TransferRow, file_name: &str) -> Option<String> {
        let probe = non_empty(row.uri.as_deref()).unwrap_or(file_name);
        self.content_types
            .type_for(probe)
            .filter(|mime| !mime.is_empty())
            .or_else(|| non_empty(row.mimetype.as_deref()).map(str::to_owned))
    }
}

pub fn resolve_file_name(row: &TransferRow, strings: &Strings) -> String {
    non_empty(row.data.as_deref())
        .or_else(|| non_empty(row.filename_hint.as_deref()))
        .unwrap_or(strings.unknown_file.as_str())
        .to_owned()
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use opush_core::{Direction, RecordId, STATUS_SUCCESS, Visibility};

    use super::*;
    use crate::{
        memory::{MemoryStore, StaticDirectory},
        ports::{StoreError, mock::MockStore},
    };

    struct NoTypes;

    impl ContentTypeResolver for NoTypes {
        fn type_for(&self, _uri: &str) -> Option<String> {
            None
        }
    }

    struct SuffixTypes;

    impl ContentTypeResolver for SuffixTypes {
        fn type_for(&self, uri: &str) -> Option<String> {
            uri.ends_with(".jpg").then(|| "image/jpeg".to_owned())
        }
    }

    fn row(id: i64) -> TransferRow {
        TransferRow {
            id: RecordId(id),
            status: STATUS_SUCCESS,
            direction: Direction::Inbound,
            total_bytes: 10,
            current_bytes: 10,
            timestamp: 1_700_000_000_000,
            destination: "00:11:22:33:44:55".to_owned(),
            data: None,
            filename_hint: None,
            uri: None,
            mimetype: None,
            visibility: Visibility::Visible,
            user_confirmation: Default::default(),
        }
    }

    fn accessor<'a>(
        store: &'a MemoryStore,
        directory: &'a StaticDirectory,
        types: &'a dyn ContentTypeResolver,
        strings: &'a Strings,
    ) -> RecordAccessor<'a> {
        RecordAccessor {
            store,
            directory,
            content_types: types,
            strings,
        }
    }

    #[test]
    fn file_name_prefers_data_then_hint_then_placeholder() {
        let strings = Strings::default();

        let mut with_data = row(1);
        with_data.data = Some("/sdcard/bluetooth/a.txt".to_owned());
        with_data.filename_hint = Some("hint.txt".to_owned());
        assert_eq!(resolve_file_name(&with_data, &strings), "/sdcard/bluetooth/a.txt");

        let mut hint_only = row(2);
        hint_only.filename_hint = Some("hint.txt".to_owned());
        assert_eq!(resolve_file_name(&hint_only, &strings), "hint.txt");

        assert_eq!(resolve_file_name(&row(3), &strings), "Unknown file");
    }

    #[test]
    fn file_type_falls_back_to_stored_mimetype() {
        let strings = Strings::default();
        let directory = StaticDirectory::default();
        let store = MemoryStore::default();

        let mut outbound = row(1);
        outbound.uri = Some("content://media/external/images/photo.jpg".to_owned());
        outbound.mimetype = Some("image/png".to_owned());
        let with_uri = accessor(&store, &directory, &SuffixTypes, &strings).resolve(outbound);
        assert_eq!(with_uri.file_type.as_deref(), Some("image/jpeg"));

        let mut by_name = row(2);
        by_name.data = Some("/sdcard/bluetooth/cat.jpg".to_owned());
        let named = accessor(&store, &directory, &SuffixTypes, &strings).resolve(by_name);
        assert_eq!(named.file_type.as_deref(), Some("image/jpeg"));

        let mut stored = row(3);
        stored.data = Some("/sdcard/bluetooth/blob".to_owned());
        stored.mimetype = Some("application/x-blob".to_owned());
        let fallback = accessor(&store, &directory, &NoTypes, &strings).resolve(stored);
        assert_eq!(fallback.file_type.as_deref(), Some("application/x-blob"));
    }

    #[test]
    fn device_name_comes_from_directory() {
        let strings = Strings::default();
        let directory = StaticDirectory::from_iter([("00:11:22:33:44:55", "Pixel")]);
        let store = MemoryStore::with_rows(vec![row(5)]);

        let uri = Url::parse("content://com.opush.share/transfers/5").unwrap();
        let record = accessor(&store, &directory, &NoTypes, &strings)
            .query_by_uri(&uri)
            .unwrap();
        assert_eq!(record.device_name, "Pixel");
        assert_eq!(record.id, RecordId(5));
    }

    #[test]
    fn missing_row_is_not_found() {
        let strings = Strings::default();
        let directory = StaticDirectory::default();
        let store = MemoryStore::default();

        let uri = Url::parse("content://com.opush.share/transfers/99").unwrap();
        let err = accessor(&store, &directory, &NoTypes, &strings)
            .query_by_uri(&uri)
            .unwrap_err();
        assert_eq!(err, DispatchError::NotFound(RecordId(99)));
    }

    #[test]
    fn batch_is_ordered_by_id_and_wraps_plain_paths() {
        let strings = Strings::default();
        let directory = StaticDirectory::default();

        let mut third = row(30);
        third.data = Some("/sdcard/bluetooth/c.txt".to_owned());
        let mut first = row(10);
        first.data = Some("content://media/external/file/81".to_owned());
        let mut second = row(20);
        second.data = Some("/sdcard/bluetooth/b.txt".to_owned());
        let mut other_batch = row(15);
        other_batch.timestamp = 42;
        other_batch.data = Some("/sdcard/bluetooth/other.txt".to_owned());

        let store = MemoryStore::with_rows(vec![third, first, other_batch, second]);
        let uris = accessor(&store, &directory, &NoTypes, &strings)
            .query_batch(1_700_000_000_000)
            .unwrap();
        let uris: Vec<&str> = uris.iter().map(Url::as_str).collect();
        assert_eq!(
            uris,
            vec![
                "content://media/external/file/81",
                "file:///sdcard/bluetooth/b.txt",
                "file:///sdcard/bluetooth/c.txt",
            ]
        );
    }

    #[test]
    fn empty_batch_is_not_an_error() {
        let strings = Strings::default();
        let directory = StaticDirectory::default();
        let store = MemoryStore::default();

        let uris = accessor(&store, &directory, &NoTypes, &strings)
            .query_batch(7)
            .unwrap();
        assert!(uris.is_empty());
    }

    #[test]
    fn batch_skips_rows_without_a_file_path() {
        let strings = Strings::default();
        let directory = StaticDirectory::default();

        let missing = row(1);
        let mut blank = row(2);
        blank.data = Some(String::new());
        let mut stored = row(3);
        stored.data = Some("/sdcard/bluetooth/kept.txt".to_owned());

        let store = MemoryStore::with_rows(vec![missing, blank, stored]);
        let uris = accessor(&store, &directory, &NoTypes, &strings)
            .query_batch(1_700_000_000_000)
            .unwrap();
        assert_eq!(
            uris,
            vec![Url::parse("file:///sdcard/bluetooth/kept.txt").unwrap()]
        );
    }

    #[test]
    fn batch_store_failure_is_an_error() {
        let strings = Strings::default();
        let directory = StaticDirectory::default();
        let mut store = MockStore::new();
        store
            .expect_query_batch()
            .times(1)
            .returning(|_| Err(StoreError::Unavailable("table locked".to_owned())));

        let err = RecordAccessor {
            store: &store,
            directory: &directory,
            content_types: &NoTypes,
            strings: &strings,
        }
        .query_batch(7)
        .unwrap_err();
        assert_eq!(
            err,
            DispatchError::Store(StoreError::Unavailable("table locked".to_owned()))
        );
    }
}
