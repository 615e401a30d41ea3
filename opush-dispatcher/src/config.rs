use std::{fs, io, path::Path};

use opush_core::DEFAULT_RECORD_BASE_URI;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

/// Config files are expected to be tiny; anything bigger is rejected unread.
pub const MAX_CONFIG_BYTES: u64 = 64 * 1024;

/// User-visible texts. Templates use `{file}`, `{device}` and `{count}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Strings {
    pub unknown_file: String,
    pub unknown_file_desc: String,
    pub not_exist_file: String,
    pub not_exist_file_desc: String,
    pub incoming_file: String,
    pub sending_single: String,
    pub sending_batch: String,
    pub sent: String,
    pub received: String,
    pub send_failed: String,
    pub download_failed: String,
}

impl Default for Strings {
    fn default() -> Self {
        Self {
            unknown_file: "Unknown file".to_owned(),
            unknown_file_desc: "No app to handle this type of file.".to_owned(),
            not_exist_file: "No file".to_owned(),
            not_exist_file_desc: "The file doesn't exist.".to_owned(),
            incoming_file: "Incoming file".to_owned(),
            sending_single: "Sending file to {device}".to_owned(),
            sending_batch: "Sending {count} files to {device}".to_owned(),
            sent: "sent: {file}".to_owned(),
            received: "received: {file}".to_owned(),
            send_failed: "send failed: {file}".to_owned(),
            download_failed: "download failed".to_owned(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DispatcherConfig {
    pub record_base_uri: String,
    /// MIME types (or `type/` prefixes) the replay host pretends to have viewers for.
    pub viewer_types: Vec<String>,
    pub strings: Strings,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            record_base_uri: DEFAULT_RECORD_BASE_URI.to_owned(),
            viewer_types: vec![
                "image/".to_owned(),
                "audio/".to_owned(),
                "video/".to_owned(),
                "text/".to_owned(),
                "application/pdf".to_owned(),
            ],
            strings: Strings::default(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("metadata read failed: {0}")]
    Metadata(#[source] io::Error),
    #[error("file too large: {size} bytes (max {max})")]
    TooLarge { size: u64, max: u64 },
    #[error("read failed: {0}")]
    Read(#[source] io::Error),
    #[error("parse failed: {0}")]
    Parse(#[source] serde_json::Error),
}

pub fn fill_template(template: &str, values: &[(&str, &str)]) -> String {
    values
        .iter()
        .fold(template.to_owned(), |text, (key, value)| {
            text.replace(&format!("{{{key}}}"), value)
        })
}

pub fn parse_config_json(data: &str) -> Result<DispatcherConfig, serde_json::Error> {
    serde_json::from_str::<DispatcherConfig>(data)
}

pub fn load_config_from_path(path: &Path) -> Result<DispatcherConfig, ConfigLoadError> {
    let meta = fs::metadata(path).map_err(ConfigLoadError::Metadata)?;
    if meta.len() > MAX_CONFIG_BYTES {
        return Err(ConfigLoadError::TooLarge {
            size: meta.len(),
            max: MAX_CONFIG_BYTES,
        });
    }

    let data = fs::read_to_string(path).map_err(ConfigLoadError::Read)?;
    parse_config_json(&data).map_err(ConfigLoadError::Parse)
}

pub fn load_config_or_default(path: Option<&Path>) -> DispatcherConfig {
    let Some(path) = path else {
        return DispatcherConfig::default();
    };

    match load_config_from_path(path) {
        Ok(config) => config,
        Err(err) => {
            warn!("config {} unusable, falling back to defaults: {}", path.display(), err);
            DispatcherConfig::default()
        }
    }
}
