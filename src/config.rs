//! Module for [`ScanConfig`].

/// Number of link hops followed by default: a link to a regular file or a
/// directory resolves, a link to another link does not.
///
/// Raise the limit with [`ScanConfig::with_max_symlink_hops`] to resolve
/// chains transitively: with a limit of `n`, up to `n` links in a row are
/// followed before the final target is looked up.
pub const DEFAULT_MAX_SYMLINK_HOPS: usize = 1;

/// Tunables of a [`TarArchive`](crate::TarArchive).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ScanConfig {
    max_symlink_hops: usize,
}

impl ScanConfig {
    /// Default configuration.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            max_symlink_hops: DEFAULT_MAX_SYMLINK_HOPS,
        }
    }

    /// Sets how many symbolic or hard links are followed when resolving a
    /// path for [`TarArchive::list`](crate::TarArchive::list) and
    /// [`TarArchive::read_file`](crate::TarArchive::read_file). Zero disables
    /// link resolution.
    ///
    /// Every link in a chain counts as one hop, so `link -> link -> file`
    /// needs a limit of at least 2. A cycle fails with
    /// [`ArchiveError::SymlinkLoop`](crate::ArchiveError::SymlinkLoop) no
    /// matter the limit.
    #[must_use]
    pub const fn with_max_symlink_hops(mut self, hops: usize) -> Self {
        self.max_symlink_hops = hops;
        self
    }

    /// Maximum number of links followed per query.
    #[must_use]
    pub const fn max_symlink_hops(&self) -> usize {
        self.max_symlink_hops
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self::new()
    }
}
