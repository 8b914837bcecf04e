//! Error types of the archive scanner.
//!
//! Structural corruption of a header is reported as a [`HeaderError`] and is
//! only detected by [`TarArchive::check_archive`]. Every other query reports
//! an [`ArchiveError`].
//!
//! [`TarArchive::check_archive`]: crate::TarArchive::check_archive

use crate::EntryName;

/// Result type alias for archive queries.
pub type Result<T> = core::result::Result<T, ArchiveError>;

/// A header block that is not a valid USTAR header.
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HeaderError {
    /// The magic field is not `"ustar\0"`.
    #[error("invalid magic value")]
    InvalidMagic,
    /// The version field is not `"00"`.
    #[error("invalid version value")]
    InvalidVersion,
    /// The stored checksum doesn't match the sum over the header block.
    #[error("invalid header checksum")]
    InvalidChecksum,
}

impl HeaderError {
    /// Numeric code of the error as reported by archive validation:
    /// `-1` for the magic, `-2` for the version and `-3` for the checksum.
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::InvalidMagic => -1,
            Self::InvalidVersion => -2,
            Self::InvalidChecksum => -3,
        }
    }
}

/// Errors of the archive queries.
#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    /// Reading or seeking the underlying stream failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A header failed validation.
    #[error("header #{index} is malformed: {source}")]
    Header {
        /// Zero-based position of the header in the archive.
        index: usize,
        #[source]
        source: HeaderError,
    },

    /// The size field of a header is not an octal number, so the scan can't
    /// step over its payload.
    #[error("size field of entry '{name}' is not an octal number")]
    InvalidSize { name: EntryName },

    /// No entry of the requested kind exists at the path.
    #[error("no entry at '{path}'")]
    NotFound { path: String },

    /// The path (after following links) does not name a regular file.
    #[error("'{path}' is not a regular file")]
    NotAFile { path: String },

    /// The read offset lies beyond the end of the file.
    #[error("offset {offset} is outside of the file (size {size})")]
    OffsetOutOfRange { offset: u64, size: u64 },

    /// Link resolution revisited a path or exceeded the hop limit.
    #[error("too many or circular links at '{path}' after {hops} hop(s)")]
    SymlinkLoop { path: String, hops: usize },

    /// A directory has more direct children than the caller accepts.
    #[error("directory has more than {capacity} entries")]
    TooManyEntries { capacity: usize },
}

impl ArchiveError {
    /// The [`HeaderError`] behind a failed validation, if any.
    #[must_use]
    pub const fn header_error(&self) -> Option<HeaderError> {
        match self {
            Self::Header { source, .. } => Some(*source),
            _ => None,
        }
    }
}
