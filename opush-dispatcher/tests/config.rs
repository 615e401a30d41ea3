use std::io::Write;

use opush_dispatcher::config::{
    ConfigLoadError, DispatcherConfig, MAX_CONFIG_BYTES, load_config_from_path,
    load_config_or_default,
};

#[test]
fn load_config_reads_overrides() {
    let dir = tempfile::tempdir().expect("create tempdir");
    let path = dir.path().join("opush.json");
    std::fs::write(
        &path,
        r#"{
            "record_base_uri": "content://example.share/items",
            "viewer_types": ["text/"],
            "strings": { "download_failed": "Download failed." }
        }"#,
    )
    .expect("write config");

    let config = load_config_from_path(&path).expect("config loads");
    assert_eq!(config.record_base_uri, "content://example.share/items");
    assert_eq!(config.viewer_types, vec!["text/".to_owned()]);
    assert_eq!(config.strings.download_failed, "Download failed.");
    assert_eq!(config.strings.incoming_file, "Incoming file");
}

#[test]
fn oversized_config_reports_its_size_before_parsing() {
    let dir = tempfile::tempdir().expect("create tempdir");
    let path = dir.path().join("opush.json");

    // Valid JSON padded past the cap: only the size check can reject it.
    let padding = " ".repeat(MAX_CONFIG_BYTES as usize);
    let mut file = std::fs::File::create(&path).expect("create opush.json");
    write!(file, "{{\"viewer_types\": [\"text/\"]}}{padding}").expect("write opush.json");
    drop(file);

    let written = std::fs::metadata(&path).expect("stat opush.json").len();
    match load_config_from_path(&path) {
        Err(ConfigLoadError::TooLarge { size, max }) => {
            assert_eq!(size, written);
            assert_eq!(max, MAX_CONFIG_BYTES);
        }
        other => panic!("expected TooLarge, got {other:?}"),
    }
}

#[test]
fn broken_or_missing_config_falls_back_to_defaults() {
    let dir = tempfile::tempdir().expect("create tempdir");
    let broken = dir.path().join("broken.json");
    std::fs::write(&broken, "{ not json").expect("write broken config");

    assert_eq!(load_config_or_default(Some(&broken)), DispatcherConfig::default());
    assert_eq!(
        load_config_or_default(Some(&dir.path().join("absent.json"))),
        DispatcherConfig::default()
    );
    assert_eq!(load_config_or_default(None), DispatcherConfig::default());
}
