//! Error types produced while reading geospatial archives.

use thiserror::Error;

/// Errors that prevent an archive from being read at all.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ArchiveError {
    /// The payload is not a readable ZIP archive.
    #[error("archive is not a valid zip file: {source}")]
    InvalidArchive {
        /// Error reported by the zip reader.
        source: zip::result::ZipError,
    },
    /// No `.kml` document was found inside the archive.
    #[error("archive does not contain a KML document")]
    MissingDocument,
    /// More than one `.kml` document was found.
    #[error("archive contains {count} KML documents; expected exactly one")]
    AmbiguousDocument {
        /// Number of candidate documents.
        count: usize,
    },
    /// The document entry could not be decompressed or decoded.
    #[error("failed to read {name} from archive: {source}")]
    ReadDocument {
        /// Entry name inside the archive.
        name: String,
        /// I/O error raised while reading the entry.
        source: std::io::Error,
    },
    /// The document is not well-formed markup.
    #[error("invalid KML markup at byte {position}: {message}")]
    InvalidMarkup {
        /// Byte offset reported by the parser.
        position: u64,
        /// Parser message.
        message: String,
    },
}

/// Why a single placemark's coordinates were rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoordinateError {
    /// The placemark had no `coordinates` element or it was empty.
    #[error("placemark has no coordinates")]
    Missing,
    /// A tuple did not contain longitude and latitude.
    #[error("coordinate tuple `{tuple}` needs at least longitude and latitude")]
    IncompleteTuple {
        /// Offending tuple text.
        tuple: String,
    },
    /// A component was not a finite number.
    #[error("coordinate value `{value}` is not a finite number")]
    InvalidNumber {
        /// Offending component text.
        value: String,
    },
}
