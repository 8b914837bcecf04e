//! Path matching rules: bounded entry names, directory membership and link
//! hops.

use crate::{ArchiveError, Result, NAME_LEN};
use arrayvec::ArrayString;

/// Name of an archive entry (or a part of it). Never longer than the name
/// field of a header.
pub type EntryName = ArrayString<NAME_LEN>;

/// Path separator inside entry names.
pub const SEPARATOR: u8 = b'/';

/// Converts a name field to an [`EntryName`]. Returns `None` if the bytes
/// are not UTF-8 or don't fit.
pub(crate) fn entry_name(bytes: &[u8]) -> Option<EntryName> {
    let name = core::str::from_utf8(bytes).ok()?;
    EntryName::from(name).ok()
}

/// Like [`entry_name`], but replaces invalid UTF-8 and cuts off what doesn't
/// fit. Only used for diagnostics.
pub(crate) fn lossy_name(bytes: &[u8]) -> EntryName {
    let mut name = EntryName::new();
    for c in String::from_utf8_lossy(bytes).chars() {
        if name.try_push(c).is_err() {
            break;
        }
    }
    name
}

/// Appends a separator to `path` unless it already ends with one. Returns
/// `None` if the result can't be the name of an entry.
pub(crate) fn normalize_dir(path: &str) -> Option<EntryName> {
    let mut dir = EntryName::from(path).ok()?;
    if !path.as_bytes().ends_with(&[SEPARATOR]) {
        dir.try_push(char::from(SEPARATOR)).ok()?;
    }
    Some(dir)
}

/// If `name` is a direct child of the directory `dir` (which ends with a
/// separator), returns the part of `name` after `dir`.
///
/// Entries of nested directories are no direct children, but the entry of a
/// nested directory itself is: its remainder may end with one separator.
pub(crate) fn direct_child<'n>(dir: &[u8], name: &'n [u8]) -> Option<&'n [u8]> {
    let rest = name.strip_prefix(dir)?;
    let stem = rest.strip_suffix(&[SEPARATOR]).unwrap_or(rest);
    if stem.is_empty() || memchr::memchr(SEPARATOR, stem).is_some() {
        return None;
    }
    Some(rest)
}

/// Tracks the link hops taken while resolving one path.
#[derive(Debug)]
pub(crate) struct SymlinkResolver {
    max_hops: usize,
    visited: Vec<String>,
}

impl SymlinkResolver {
    pub fn new(path: &str, max_hops: usize) -> Self {
        Self {
            max_hops,
            visited: vec![path.to_owned()],
        }
    }

    /// The path to look up next.
    pub fn path(&self) -> &str {
        self.visited.last().map_or("", String::as_str)
    }

    /// Number of links followed so far.
    pub fn hops(&self) -> usize {
        self.visited.len() - 1
    }

    /// Continues resolution at the link target `target`.
    ///
    /// # Errors
    /// [`ArchiveError::SymlinkLoop`] if the hop limit is exhausted or the
    /// target was visited before. [`ArchiveError::NotFound`] if the target
    /// is not UTF-8 and therefore can't be looked up.
    pub fn follow(&mut self, target: &[u8]) -> Result<()> {
        let target = core::str::from_utf8(target).map_err(|_| ArchiveError::NotFound {
            path: lossy_name(target).to_string(),
        })?;
        let hops = self.hops() + 1;
        if hops > self.max_hops || self.visited.iter().any(|seen| seen == target) {
            return Err(ArchiveError::SymlinkLoop {
                path: self.path().to_owned(),
                hops,
            });
        }
        log::debug!("following link '{}' -> '{}'", self.path(), target);
        self.visited.push(target.to_owned());
        Ok(())
    }

    /// The final path after all hops.
    pub fn into_path(mut self) -> String {
        self.visited.pop().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_dir() {
        assert_eq!(normalize_dir("docs").unwrap().as_str(), "docs/");
        assert_eq!(normalize_dir("docs/").unwrap().as_str(), "docs/");
        assert_eq!(normalize_dir("").unwrap().as_str(), "/");

        let max = "d".repeat(NAME_LEN - 1);
        assert_eq!(normalize_dir(&max).unwrap().len(), NAME_LEN);
        let too_long = "d".repeat(NAME_LEN);
        assert_eq!(normalize_dir(&too_long), None);
    }

    #[test]
    fn test_direct_child() {
        let dir = b"docs/";
        assert_eq!(direct_child(dir, b"docs/readme.txt"), Some(&b"readme.txt"[..]));
        assert_eq!(direct_child(dir, b"docs/sub/"), Some(&b"sub/"[..]));
        assert_eq!(direct_child(dir, b"docs/sub/deep.txt"), None);
        assert_eq!(direct_child(dir, b"docs/"), None);
        assert_eq!(direct_child(dir, b"docs//"), None);
        assert_eq!(direct_child(dir, b"docsx/readme.txt"), None);
        assert_eq!(direct_child(dir, b"hello_world.txt"), None);
    }

    #[test]
    fn test_entry_name() {
        assert_eq!(entry_name(b"abc").unwrap().as_str(), "abc");
        assert_eq!(entry_name(&[0xff]), None);
        assert_eq!(entry_name(&[b'a'; NAME_LEN + 1]), None);
        assert_eq!(lossy_name(&[b'a', 0xff]).as_str(), "a\u{fffd}");
        assert_eq!(lossy_name(&[b'a'; NAME_LEN + 1]).len(), NAME_LEN);
    }

    #[test]
    fn test_resolver_single_hop() {
        let mut resolver = SymlinkResolver::new("link", 1);
        assert_eq!(resolver.path(), "link");
        resolver.follow(b"target").unwrap();
        assert_eq!(resolver.hops(), 1);
        let err = resolver.follow(b"further").unwrap_err();
        assert!(matches!(
            err,
            ArchiveError::SymlinkLoop { ref path, hops: 2 } if path == "target"
        ));
        assert_eq!(resolver.into_path(), "target");
    }

    #[test]
    fn test_resolver_detects_cycle() {
        let mut resolver = SymlinkResolver::new("a", 10);
        resolver.follow(b"b").unwrap();
        let err = resolver.follow(b"a").unwrap_err();
        assert!(matches!(err, ArchiveError::SymlinkLoop { hops: 2, .. }));
    }

    #[test]
    fn test_resolver_disabled() {
        let mut resolver = SymlinkResolver::new("a", 0);
        assert!(resolver.follow(b"b").is_err());
    }
}
