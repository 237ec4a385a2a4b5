//! Recording and replaying catalog traffic with httpmock.
//!
//! In record mode, requests are proxied to the configured catalog and the
//! exchanges are written to a file once the client is dropped. In replay mode
//! a recorded file is served instead of contacting the catalog at all.

use std::fmt::Debug;
use std::fs;
use std::path::{Path, PathBuf};

use httpmock::{MockServer, RecordingID};
use tracing::{debug, warn};

use crate::config::{CatalogClientConfig, CatalogMockMode};

/// Keeps a [MockServer] alive for as long as the transport using it.
#[allow(dead_code)] // https://github.com/rust-lang/rust/issues/122833
pub(crate) enum MockGuard {
    Record(MockRecorder),
    Replay(MockServer),
}

impl MockGuard {
    pub(crate) fn new(config: &CatalogClientConfig) -> Option<Self> {
        match &config.mock_mode {
            CatalogMockMode::None => None,
            CatalogMockMode::Record(path) => {
                let server = MockServer::start();
                let recording = forward_and_record(&server, &config.catalog_url);
                debug!(?path, server = server.base_url(), "recording catalog traffic");
                Some(MockGuard::Record(MockRecorder {
                    path: path.clone(),
                    server,
                    recording,
                }))
            },
            CatalogMockMode::Replay(path) => {
                let server = MockServer::start();
                server.playback(path);
                debug!(?path, server = server.base_url(), "replaying catalog traffic");
                Some(MockGuard::Replay(server))
            },
        }
    }

    /// The url requests should be sent to instead of the catalog.
    ///
    /// Catalog endpoints may carry a path, which is kept relative to the
    /// mock server.
    pub(crate) fn endpoint(&self, catalog_url: &url::Url) -> String {
        let server = match self {
            MockGuard::Record(recorder) => &recorder.server,
            MockGuard::Replay(server) => server,
        };
        let mut endpoint = server.url(catalog_url.path());
        if let Some(query) = catalog_url.query() {
            endpoint.push('?');
            endpoint.push_str(query);
        }
        endpoint
    }
}

fn forward_and_record(server: &MockServer, catalog_url: &str) -> RecordingID {
    let origin = match url::Url::parse(catalog_url) {
        Ok(url) => url.origin().ascii_serialization(),
        Err(_) => catalog_url.to_string(),
    };
    server.forward_to(origin, |rule| {
        rule.filter(|when| {
            when.any_request();
        });
    });
    server.record(|rule| {
        rule.filter(|when| {
            when.any_request();
        });
    })
}

impl Debug for MockGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MockGuard::Record(recorder) => write!(
                f,
                "MockGuard::Record url={} path={}",
                recorder.server.base_url(),
                recorder.path.display()
            ),
            MockGuard::Replay(server) => write!(f, "MockGuard::Replay url={}", server.base_url()),
        }
    }
}

/// Writes the recorded exchanges to `path` when dropped.
pub(crate) struct MockRecorder {
    path: PathBuf,
    server: MockServer,
    recording: RecordingID,
}

impl MockRecorder {
    fn save(&self) -> Result<PathBuf, String> {
        let file_name = self
            .path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| format!("invalid recording path {}", self.path.display()))?;
        // httpmock appends a timestamp to the name it is given, the prefix
        // keeps parallel recorders apart
        self.server
            .record_save(&self.recording, format!("httpmock_{file_name}"))
            .map_err(|err| format!("{err:?}"))
    }
}

impl Drop for MockRecorder {
    fn drop(&mut self) {
        let saved = match self.save() {
            Ok(saved) => saved,
            Err(err) => {
                warn!(path = ?self.path, %err, "failed to save catalog recording");
                return;
            },
        };
        if let Err(err) = move_file(&saved, &self.path) {
            warn!(src = ?saved, dest = ?self.path, %err, "failed to move catalog recording");
            return;
        }
        debug!(path = ?self.path, "saved catalog recording");
    }
}

/// Rename `from` to `to`, copying if both are on different file systems.
fn move_file(from: &Path, to: &Path) -> std::io::Result<()> {
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent)?;
    }
    if fs::rename(from, to).is_ok() {
        return Ok(());
    }
    fs::copy(from, to)?;
    fs::remove_file(from)
}
