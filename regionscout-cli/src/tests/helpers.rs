//! Test doubles and fixtures shared by the CLI tests.

use std::cell::RefCell;

use camino::Utf8PathBuf;
use regionscout_core::PlaceResult;
use regionscout_core::backend::{Estimate, TransportError};
use regionscout_core::test_support::StubBackend;
use regionscout_data::HttpBackendConfig;
use tempfile::TempDir;

use crate::CliError;
use crate::backend::BackendFactory;

/// Hands out stub backends configured up front and records the settings it
/// was asked to build with.
#[derive(Debug, Default)]
pub(super) struct StubBackendFactory {
    pub(super) places: Vec<PlaceResult>,
    pub(super) estimate: Estimate,
    pub(super) kmz_error: Option<TransportError>,
    pub(super) built_with: RefCell<Vec<HttpBackendConfig>>,
}

impl BackendFactory for StubBackendFactory {
    type Backend = StubBackend;

    fn build(&self, config: &HttpBackendConfig) -> Result<Self::Backend, CliError> {
        self.built_with.borrow_mut().push(config.clone());
        let backend = StubBackend::with_places(self.places.clone()).with_estimate(self.estimate);
        Ok(match &self.kmz_error {
            Some(error) => backend.failing_kmz(error.clone()),
            None => backend,
        })
    }
}

/// Temporary output directory with a UTF-8 path.
pub(super) struct OutputDir {
    _tmp: TempDir,
    pub(super) path: Utf8PathBuf,
}

impl OutputDir {
    pub(super) fn new() -> Self {
        let tmp = TempDir::new().expect("tempdir");
        let path = Utf8PathBuf::from_path_buf(tmp.path().join("exports")).expect("utf-8 tempdir");
        Self { _tmp: tmp, path }
    }

    /// Names of the files in the directory, sorted; empty if it is missing.
    pub(super) fn files(&self) -> Vec<String> {
        let Ok(entries) = std::fs::read_dir(&self.path) else {
            return Vec::new();
        };
        let mut names: Vec<String> = entries
            .map(|entry| {
                entry
                    .expect("readable entry")
                    .file_name()
                    .to_string_lossy()
                    .into_owned()
            })
            .collect();
        names.sort();
        names
    }
}

/// Two places near downtown Pittsburgh, one of them recommended.
pub(super) fn sample_places() -> Vec<PlaceResult> {
    let mut recommended = PlaceResult::new("Bean Bar", 40.44, -79.99);
    recommended.recommended = Some(true);
    vec![recommended, PlaceResult::new("Cup Corner", 40.45, -79.95)]
}
