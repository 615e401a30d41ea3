use std::path::Path;

use opush_core::content_uri;
use tracing::{debug, info};
use url::Url;

use crate::{
    config::Strings,
    error::OpenError,
    ports::{Activity, HandlerResolver, LaunchError, UiSurface},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenOutcome {
    Launched,
    /// The user was shown the "file not found" dialog.
    FileMissing,
    /// The user was shown the "unknown file type" dialog.
    UnrecognizedType,
}

pub struct FileOpener<'a> {
    pub handlers: &'a dyn HandlerResolver,
    pub ui: &'a dyn UiSurface,
    pub strings: &'a Strings,
}

impl FileOpener<'_> {
    /// Opens a received file in a viewer, or tells the user why it can't.
    ///
    /// A viewer that vanishes between the recognition check and the launch
    /// comes back as [`OpenError::NoHandler`] and is never shown to the user.
    pub fn open_received(
        &self,
        file_name: Option<&str>,
        mime_type: Option<&str>,
        timestamp: i64,
    ) -> Result<OpenOutcome, OpenError> {
        let file_name = file_name
            .filter(|name| !name.is_empty())
            .ok_or(OpenError::PreconditionMissing("file name"))?;
        let mime_type = mime_type
            .filter(|mime| !mime.is_empty())
            .ok_or(OpenError::PreconditionMissing("mime type"))?;

        if !Path::new(file_name).exists() {
            info!("received file {} (batch {}) no longer exists", file_name, timestamp);
            self.ui.launch_activity(Activity::Error {
                title: self.strings.not_exist_file.clone(),
                content: self.strings.not_exist_file_desc.clone(),
            });
            return Ok(OpenOutcome::FileMissing);
        }

        let uri = content_uri(file_name)?;
        if !self.is_recognized(&uri, mime_type) {
            self.ui.launch_activity(Activity::Error {
                title: self.strings.unknown_file.clone(),
                content: self.strings.unknown_file_desc.clone(),
            });
            return Ok(OpenOutcome::UnrecognizedType);
        }

        debug!("view request sent out: {} / {}", uri, mime_type);
        match self.handlers.launch_viewer(&uri, mime_type) {
            Ok(()) => Ok(OpenOutcome::Launched),
            Err(LaunchError::NoHandler { uri, mime }) => Err(OpenError::NoHandler { uri, mime }),
        }
    }

    pub fn is_recognized(&self, uri: &Url, mime_type: &str) -> bool {
        let handlers = self.handlers.find_handlers(uri, mime_type);
        if handlers.is_empty() {
            debug!("no handler for {} ({})", mime_type, uri);
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::host::RecordingUi;
    use crate::ports::Handler;

    #[derive(Default)]
    struct Viewers {
        listed: bool,
        launchable: bool,
        launched: Mutex<Vec<(String, String)>>,
    }

    impl HandlerResolver for Viewers {
        fn find_handlers(&self, _uri: &Url, _mime: &str) -> Vec<Handler> {
            if self.listed {
                vec![Handler {
                    name: "viewer".to_owned(),
                }]
            } else {
                Vec::new()
            }
        }

        fn launch_viewer(&self, uri: &Url, mime: &str) -> Result<(), LaunchError> {
            if !self.launchable {
                return Err(LaunchError::NoHandler {
                    uri: uri.to_string(),
                    mime: mime.to_owned(),
                });
            }
            self.launched
                .lock()
                .unwrap()
                .push((uri.to_string(), mime.to_owned()));
            Ok(())
        }
    }

    fn received_file(dir: &tempfile::TempDir) -> String {
        let path = dir.path().join("photo.jpg");
        std::fs::write(&path, b"jpeg").unwrap();
        path.to_string_lossy().into_owned()
    }

    #[test]
    fn recognized_file_launches_viewer() {
        let dir = tempfile::tempdir().unwrap();
        let file = received_file(&dir);
        let viewers = Viewers {
            listed: true,
            launchable: true,
            ..Default::default()
        };
        let ui = RecordingUi::default();
        let strings = Strings::default();
        let opener = FileOpener {
            handlers: &viewers,
            ui: &ui,
            strings: &strings,
        };

        let outcome = opener.open_received(Some(&file), Some("image/jpeg"), 1).unwrap();
        assert_eq!(outcome, OpenOutcome::Launched);

        let launched = viewers.launched.lock().unwrap();
        assert_eq!(launched.len(), 1);
        assert!(launched[0].0.starts_with("file:///"));
        assert!(launched[0].0.ends_with("/photo.jpg"));
        assert_eq!(launched[0].1, "image/jpeg");
        assert!(ui.activities().is_empty());
    }

    #[test]
    fn missing_file_shows_not_found_dialog() {
        let viewers = Viewers {
            listed: true,
            launchable: true,
            ..Default::default()
        };
        let ui = RecordingUi::default();
        let strings = Strings::default();
        let opener = FileOpener {
            handlers: &viewers,
            ui: &ui,
            strings: &strings,
        };

        let outcome = opener
            .open_received(Some("/definitely/not/here.jpg"), Some("image/jpeg"), 1)
            .unwrap();
        assert_eq!(outcome, OpenOutcome::FileMissing);
        assert_eq!(
            ui.activities(),
            vec![Activity::Error {
                title: "No file".to_owned(),
                content: "The file doesn't exist.".to_owned(),
            }]
        );
        assert!(viewers.launched.lock().unwrap().is_empty());
    }

    #[test]
    fn unrecognized_type_shows_unknown_file_dialog() {
        let dir = tempfile::tempdir().unwrap();
        let file = received_file(&dir);
        let viewers = Viewers::default();
        let ui = RecordingUi::default();
        let strings = Strings::default();
        let opener = FileOpener {
            handlers: &viewers,
            ui: &ui,
            strings: &strings,
        };

        let outcome = opener
            .open_received(Some(&file), Some("application/x-unknown"), 1)
            .unwrap();
        assert_eq!(outcome, OpenOutcome::UnrecognizedType);
        assert_eq!(
            ui.activities(),
            vec![Activity::Error {
                title: "Unknown file".to_owned(),
                content: "No app to handle this type of file.".to_owned(),
            }]
        );
    }

    #[test]
    fn vanished_viewer_is_reported_but_not_shown() {
        let dir = tempfile::tempdir().unwrap();
        let file = received_file(&dir);
        let viewers = Viewers {
            listed: true,
            launchable: false,
            ..Default::default()
        };
        let ui = RecordingUi::default();
        let strings = Strings::default();
        let opener = FileOpener {
            handlers: &viewers,
            ui: &ui,
            strings: &strings,
        };

        let err = opener
            .open_received(Some(&file), Some("image/jpeg"), 1)
            .unwrap_err();
        assert!(matches!(err, OpenError::NoHandler { .. }));
        assert!(ui.activities().is_empty());
        assert!(ui.toasts().is_empty());
    }

    #[test]
    fn missing_fields_are_a_silent_failure() {
        let viewers = Viewers::default();
        let ui = RecordingUi::default();
        let strings = Strings::default();
        let opener = FileOpener {
            handlers: &viewers,
            ui: &ui,
            strings: &strings,
        };

        assert_eq!(
            opener.open_received(None, Some("image/jpeg"), 1),
            Err(OpenError::PreconditionMissing("file name"))
        );
        assert_eq!(
            opener.open_received(Some("/sdcard/a.jpg"), Some(""), 1),
            Err(OpenError::PreconditionMissing("mime type"))
        );
        assert!(ui.activities().is_empty());
    }
}
