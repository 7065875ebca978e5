//! Saving artifacts through transient references.
//!
//! A [`DownloadTarget`] hands out a reference to an artifact's bytes, saves
//! through it under a filename and releases it. [`trigger_download`] runs the
//! three steps and always releases the reference, whatever the save reports.

use std::collections::BTreeMap;

use log::debug;
use thiserror::Error;

use crate::query::ExportFormat;

/// A downloadable payload produced by a conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportArtifact {
    /// Format that produced the payload.
    pub format: ExportFormat,
    /// Raw bytes.
    pub payload: Vec<u8>,
    /// Name to save under.
    pub suggested_filename: String,
}

/// Errors raised while saving an artifact.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DownloadError {
    /// A transient reference could not be created.
    #[error("failed to prepare {filename} for download: {message}")]
    Reference {
        /// Target filename.
        filename: String,
        /// Underlying error description.
        message: String,
    },
    /// Saving through the reference failed.
    #[error("failed to save {filename}: {message}")]
    Save {
        /// Target filename.
        filename: String,
        /// Underlying error description.
        message: String,
    },
}

/// Somewhere artifacts can be saved.
pub trait DownloadTarget {
    /// Transient handle to an artifact's bytes.
    type Reference;

    /// Create a reference to `artifact`'s payload.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::Reference`] when no reference can be made.
    fn create_reference(
        &mut self,
        artifact: &ExportArtifact,
    ) -> Result<Self::Reference, DownloadError>;

    /// Save the referenced bytes under `filename`.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::Save`] when the save fails.
    fn trigger_save(
        &mut self,
        reference: &Self::Reference,
        filename: &str,
    ) -> Result<(), DownloadError>;

    /// Release a reference; it must not be used afterwards.
    fn release(&mut self, reference: Self::Reference);
}

/// Save `artifact` through `target`.
///
/// The reference never outlives this call: it is released after the save is
/// triggered, including when the save fails.
///
/// # Errors
///
/// Propagates the target's [`DownloadError`].
pub fn trigger_download<T>(target: &mut T, artifact: &ExportArtifact) -> Result<(), DownloadError>
where
    T: DownloadTarget + ?Sized,
{
    let reference = target.create_reference(artifact)?;
    let outcome = target.trigger_save(&reference, &artifact.suggested_filename);
    target.release(reference);
    debug!(
        "download of {} ({} bytes) {}",
        artifact.suggested_filename,
        artifact.payload.len(),
        if outcome.is_ok() { "saved" } else { "failed" }
    );
    outcome
}

/// Handle issued by [`MemoryDownloads`].
#[derive(Debug, PartialEq, Eq)]
pub struct MemoryReference(u64);

/// In-memory download target for headless hosts and tests.
///
/// Saved files are kept by name. Saves to names registered with
/// [`MemoryDownloads::fail_on`] fail, which lets tests exercise the release
/// path.
#[derive(Debug, Default)]
pub struct MemoryDownloads {
    live: BTreeMap<u64, Vec<u8>>,
    next_reference: u64,
    saved: Vec<(String, Vec<u8>)>,
    failing: Vec<String>,
}

impl MemoryDownloads {
    /// Create an empty target.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make saves under `filename` fail.
    #[must_use]
    pub fn fail_on(mut self, filename: impl Into<String>) -> Self {
        self.failing.push(filename.into());
        self
    }

    /// Saved files in save order.
    #[must_use]
    pub fn saved(&self) -> &[(String, Vec<u8>)] {
        &self.saved
    }

    /// Bytes saved under `filename`, if any.
    #[must_use]
    pub fn file(&self, filename: &str) -> Option<&[u8]> {
        self.saved
            .iter()
            .find(|(name, _)| name == filename)
            .map(|(_, bytes)| bytes.as_slice())
    }

    /// Number of references created and not yet released.
    #[must_use]
    pub fn live_references(&self) -> usize {
        self.live.len()
    }
}

impl DownloadTarget for MemoryDownloads {
    type Reference = MemoryReference;

    fn create_reference(
        &mut self,
        artifact: &ExportArtifact,
    ) -> Result<Self::Reference, DownloadError> {
        self.next_reference += 1;
        self.live
            .insert(self.next_reference, artifact.payload.clone());
        Ok(MemoryReference(self.next_reference))
    }

    fn trigger_save(
        &mut self,
        reference: &Self::Reference,
        filename: &str,
    ) -> Result<(), DownloadError> {
        if self.failing.iter().any(|name| name == filename) {
            return Err(DownloadError::Save {
                filename: filename.to_owned(),
                message: "save rejected".to_owned(),
            });
        }
        let bytes = self
            .live
            .get(&reference.0)
            .ok_or_else(|| DownloadError::Save {
                filename: filename.to_owned(),
                message: "reference already released".to_owned(),
            })?
            .clone();
        self.saved.push((filename.to_owned(), bytes));
        Ok(())
    }

    fn release(&mut self, reference: Self::Reference) {
        self.live.remove(&reference.0);
    }
}
