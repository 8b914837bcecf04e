/*
MIT License

Copyright (c) 2021 Philipp Schuster

Permission is hereby granted, free of charge, to any person obtaining a copy
of this software and associated documentation files (the "Software"), to deal
in the Software without restriction, including without limitation the rights
to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
copies of the Software, and to permit persons to whom the Software is
furnished to do so, subject to the following conditions:

The above copyright notice and this permission notice shall be included in all
copies or substantial portions of the Software.

THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
SOFTWARE.
*/
//! Module for [`TarArchive`].

use crate::header::PosixHeader;
use crate::resolve::{direct_child, entry_name, lossy_name, normalize_dir, SymlinkResolver};
use crate::walker::BlockWalker;
use crate::{ArchiveError, EntryName, ModeFlags, Result, ScanConfig, TypeFlag};
use std::io::{Read, Seek};

/// Result of [`TarArchive::read_file`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ReadOutcome {
    /// Number of bytes copied into the buffer.
    pub bytes_written: usize,
    /// Bytes of the file after the copied window.
    pub remaining: u64,
}

impl ReadOutcome {
    /// True if the read reached the end of the file.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.remaining == 0
    }
}

/// Header fields of one entry, see [`TarArchive::metadata`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryMetadata {
    /// Full name of the entry.
    pub name: EntryName,
    /// Type of the entry. `None` for type flags this library doesn't know.
    pub type_flag: Option<TypeFlag>,
    /// Declared payload size in bytes.
    pub size: u64,
    /// Permission bits, if the mode field is well-formed.
    pub mode: Option<ModeFlags>,
    pub uid: Option<u32>,
    pub gid: Option<u32>,
    /// Modification time in seconds since the UNIX epoch.
    pub mtime: Option<u64>,
    /// Target of a symbolic or hard link.
    pub link_target: Option<EntryName>,
}

impl EntryMetadata {
    fn from_header(hdr: &PosixHeader) -> Result<Self> {
        let name = lossy_name(hdr.name.as_bytes());
        let size = hdr
            .payload_size()
            .ok_or(ArchiveError::InvalidSize { name })?;
        let type_flag = hdr.type_flag();
        let link_target = type_flag
            .filter(|flag| flag.is_link())
            .and_then(|_| entry_name(hdr.linkname.as_bytes()));
        Ok(Self {
            name,
            type_flag,
            size,
            mode: hdr.mode.to_flags(),
            uid: hdr.uid.as_number(),
            gid: hdr.gid.as_number(),
            mtime: hdr.mtime.as_number(),
            link_target,
        })
    }
}

/// Read-only view of a USTAR archive behind a seekable stream.
///
/// No index is kept: every query scans the archive from its first block. The
/// stream is at offset 0 after every query, successful or not, so queries can
/// be issued in any order. Concurrent use needs external locking, which
/// `&mut self` enforces.
#[derive(Debug)]
pub struct TarArchive<R> {
    reader: R,
    config: ScanConfig,
}

impl<R: Read + Seek> TarArchive<R> {
    /// Interprets the provided stream as Tar archive.
    pub fn new(reader: R) -> Self {
        Self::with_config(reader, ScanConfig::default())
    }

    pub const fn with_config(reader: R, config: ScanConfig) -> Self {
        Self { reader, config }
    }

    pub const fn config(&self) -> &ScanConfig {
        &self.config
    }

    pub const fn get_ref(&self) -> &R {
        &self.reader
    }

    pub fn get_mut(&mut self) -> &mut R {
        &mut self.reader
    }

    pub fn into_inner(self) -> R {
        self.reader
    }

    fn walker(&mut self) -> Result<BlockWalker<'_, R>> {
        BlockWalker::start(&mut self.reader)
    }

    /// Finds the first entry named `path` for which `predicate` holds.
    fn lookup<P>(&mut self, path: &str, predicate: P) -> Result<Option<PosixHeader>>
    where
        P: Fn(&PosixHeader) -> bool,
    {
        self.walker()?.find_named(path, predicate)
    }

    fn lookup_type<P>(&mut self, path: &str, predicate: P) -> Result<bool>
    where
        P: Fn(TypeFlag) -> bool,
    {
        let found = self.lookup(path, |hdr| hdr.type_flag().is_some_and(&predicate))?;
        Ok(found.is_some())
    }

    /// Checks whether the archive is valid, i.e. every header up to the
    /// end-of-archive marker has the ustar magic, version `"00"` and a
    /// correct checksum. Returns the number of headers.
    ///
    /// # Errors
    /// [`ArchiveError::Header`] for the first malformed header. Headers after
    /// it are never inspected.
    pub fn check_archive(&mut self) -> Result<usize> {
        let mut walker = self.walker()?;
        while let Some(hdr) = walker.next_header()? {
            let index = walker.headers_seen() - 1;
            if let Err(source) = hdr.validate() {
                log::debug!("header #{index} is malformed: {source}");
                return Err(ArchiveError::Header { index, source });
            }
            walker.skip_payload(&hdr)?;
        }
        Ok(walker.headers_seen())
    }

    /// Checks whether an entry named `path` exists.
    pub fn exists(&mut self, path: &str) -> Result<bool> {
        Ok(self.lookup(path, |_| true)?.is_some())
    }

    /// Checks whether a directory entry named `path` exists. Directory names
    /// usually end with a separator.
    pub fn is_dir(&mut self, path: &str) -> Result<bool> {
        self.lookup_type(path, TypeFlag::is_directory)
    }

    /// Checks whether a regular file named `path` exists.
    pub fn is_file(&mut self, path: &str) -> Result<bool> {
        self.lookup_type(path, TypeFlag::is_regular_file)
    }

    /// Checks whether a symbolic link or a hard link named `path` exists.
    pub fn is_symlink(&mut self, path: &str) -> Result<bool> {
        self.lookup_type(path, TypeFlag::is_link)
    }

    /// Follows links starting at `path` until it names no link.
    fn resolve(&mut self, path: &str) -> Result<String> {
        let mut resolver = SymlinkResolver::new(path, self.config.max_symlink_hops());
        while let Some(link) = self.lookup(resolver.path(), |hdr| {
            hdr.type_flag().is_some_and(TypeFlag::is_link)
        })? {
            resolver.follow(link.linkname.as_bytes())?;
        }
        Ok(resolver.into_path())
    }

    /// Lists the direct children of the directory at `path`, in archive
    /// order. Links are resolved first. The returned names are relative to
    /// the directory; nested directories keep their trailing separator.
    ///
    /// # Errors
    /// - [`ArchiveError::NotFound`] if no directory exists at `path`.
    /// - [`ArchiveError::TooManyEntries`] if there are more than `capacity`
    ///   children.
    /// - [`ArchiveError::SymlinkLoop`] if links can't be resolved.
    pub fn list(&mut self, path: &str, capacity: usize) -> Result<Vec<EntryName>> {
        let not_found = || ArchiveError::NotFound {
            path: path.to_owned(),
        };
        let resolved = self.resolve(path)?;
        let dir = normalize_dir(&resolved).ok_or_else(not_found)?;
        if !self.is_dir(&dir)? {
            return Err(not_found());
        }

        let mut walker = self.walker()?;
        let mut children = Vec::new();
        while let Some(hdr) = walker.next_header()? {
            if let Some(child) = direct_child(dir.as_bytes(), hdr.name.as_bytes()) {
                match entry_name(child) {
                    Some(_) if children.len() == capacity => {
                        return Err(ArchiveError::TooManyEntries { capacity });
                    }
                    Some(name) => children.push(name),
                    None => log::warn!(
                        "Skipping entry {:?} of '{dir}': name is not UTF-8",
                        lossy_name(child)
                    ),
                }
            }
            walker.skip_payload(&hdr)?;
        }
        log::debug!("'{dir}' has {} direct children", children.len());
        Ok(children)
    }

    /// Reads the regular file at `path` (after resolving links), starting at
    /// byte `offset`, into `buf`. Reads at most `buf.len()` bytes.
    ///
    /// [`ReadOutcome::remaining`] is zero if the read reached the end of the
    /// file; otherwise continue at `offset + bytes_written`.
    ///
    /// # Errors
    /// - [`ArchiveError::NotAFile`] if `path` doesn't resolve to a regular
    ///   file.
    /// - [`ArchiveError::OffsetOutOfRange`] if `offset` is larger than the
    ///   file.
    /// - [`ArchiveError::SymlinkLoop`] if links can't be resolved.
    pub fn read_file(&mut self, path: &str, offset: u64, buf: &mut [u8]) -> Result<ReadOutcome> {
        let resolved = self.resolve(path)?;
        let mut walker = self.walker()?;
        let hdr = walker
            .find_named(&resolved, |hdr| {
                hdr.type_flag().is_some_and(TypeFlag::is_regular_file)
            })?
            .ok_or_else(|| ArchiveError::NotAFile {
                path: resolved.clone(),
            })?;
        let size = hdr.payload_size().ok_or_else(|| ArchiveError::InvalidSize {
            name: lossy_name(hdr.name.as_bytes()),
        })?;
        if offset > size {
            return Err(ArchiveError::OffsetOutOfRange { offset, size });
        }

        let left = size - offset;
        let len = usize::try_from(left).map_or(buf.len(), |left| left.min(buf.len()));
        walker.read_payload(offset, &mut buf[..len])?;
        Ok(ReadOutcome {
            bytes_written: len,
            remaining: left - len as u64,
        })
    }

    /// Header fields of the entry named `path`. Links are not followed.
    ///
    /// # Errors
    /// [`ArchiveError::NotFound`] if no entry exists at `path`.
    pub fn metadata(&mut self, path: &str) -> Result<EntryMetadata> {
        let hdr = self
            .lookup(path, |_| true)?
            .ok_or_else(|| ArchiveError::NotFound {
                path: path.to_owned(),
            })?;
        EntryMetadata::from_header(&hdr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{checksum_of, HeaderError, BLOCKSIZE, CHKSUM_RANGE};
    use std::io::{self, Cursor};

    const ARCHIVE: &[u8] = include_bytes!("../tests/ustar_tree.tar");

    fn archive() -> TarArchive<Cursor<&'static [u8]>> {
        TarArchive::new(Cursor::new(ARCHIVE))
    }

    fn corrupted(offset: usize, byte: u8) -> TarArchive<Cursor<Vec<u8>>> {
        let mut data = ARCHIVE.to_vec();
        data[offset] = byte;
        TarArchive::new(Cursor::new(data))
    }

    fn as_strs(entries: &[EntryName]) -> Vec<&str> {
        entries.iter().map(EntryName::as_str).collect()
    }

    fn read_to_end<R: Read + Seek>(archive: &mut TarArchive<R>, path: &str) -> Vec<u8> {
        let mut content = Vec::new();
        let mut buf = [0; 100];
        loop {
            let outcome = archive.read_file(path, content.len() as u64, &mut buf).unwrap();
            content.extend_from_slice(&buf[..outcome.bytes_written]);
            if outcome.is_complete() {
                return content;
            }
        }
    }

    #[test]
    fn test_check_archive() {
        let mut archive = archive();
        assert_eq!(archive.check_archive().unwrap(), 15);
        assert_eq!(archive.get_ref().position(), 0);
    }

    #[test]
    fn test_check_archive_bad_checksum() {
        // flip a byte of the name of "docs/readme.txt" (header #2 at 1536)
        let mut archive = corrupted(1536 + 1, b'O');
        let err = archive.check_archive().unwrap_err();
        assert!(matches!(
            err,
            ArchiveError::Header {
                index: 2,
                source: HeaderError::InvalidChecksum
            }
        ));
        assert_eq!(err.header_error().map(HeaderError::code), Some(-3));
        assert_eq!(archive.get_ref().position(), 0);
    }

    #[test]
    fn test_check_archive_bad_version() {
        // "link_to_docs" is header #8 at 7168
        let mut archive = corrupted(7168 + 264, b'1');
        let err = archive.check_archive().unwrap_err();
        assert_eq!(err.header_error(), Some(HeaderError::InvalidVersion));
    }

    #[test]
    fn test_check_archive_empty() {
        let mut archive = TarArchive::new(Cursor::new(vec![0_u8; 1024]));
        assert_eq!(archive.check_archive().unwrap(), 0);
        let mut archive = TarArchive::new(Cursor::new(Vec::new()));
        assert_eq!(archive.check_archive().unwrap(), 0);
    }

    #[test]
    fn test_check_archive_truncated() {
        // payload of "hello_world.txt" cut after 4 of 12 bytes
        let mut archive = TarArchive::new(Cursor::new(&ARCHIVE[..516]));
        let err = archive.check_archive().unwrap_err();
        assert!(matches!(err, ArchiveError::Io(e) if e.kind() == io::ErrorKind::UnexpectedEof));
        assert_eq!(archive.get_ref().position(), 0);

        // ending right after a zero-sized payload is a clean, unterminated end
        let mut archive = TarArchive::new(Cursor::new(&ARCHIVE[..1536]));
        assert_eq!(archive.check_archive().unwrap(), 2);
    }

    #[test]
    fn test_type_queries() {
        let mut archive = archive();
        assert!(archive.exists("docs/").unwrap());
        assert!(archive.is_dir("docs/").unwrap());
        assert!(!archive.is_dir("docs").unwrap());
        assert!(!archive.is_file("docs/").unwrap());
        assert!(archive.is_file("docs/sub/deep.txt").unwrap());
        assert!(archive.is_symlink("link_to_hello").unwrap());
        assert!(archive.is_symlink("hard_hello").unwrap());
        assert!(!archive.is_file("link_to_hello").unwrap());
        assert!(!archive.exists("nope").unwrap());
        assert!(!archive.exists("").unwrap());
        assert_eq!(archive.get_ref().position(), 0);
    }

    #[test]
    fn test_long_paths_are_not_found() {
        let mut archive = archive();
        let name = format!("{}.txt", "l".repeat(96));
        assert!(archive.is_file(&name).unwrap());
        let too_long = format!("{name}x");
        assert!(!archive.exists(&too_long).unwrap());
        assert!(matches!(
            archive.list(&too_long, 10),
            Err(ArchiveError::NotFound { .. })
        ));
        let mut buf = [0; 8];
        assert!(matches!(
            archive.read_file(&too_long, 0, &mut buf),
            Err(ArchiveError::NotAFile { path }) if path == too_long
        ));
        assert_eq!(archive.get_ref().position(), 0);
    }

    #[test]
    fn test_list() {
        let mut archive = archive();
        let entries = archive.list("docs", 10).unwrap();
        assert_eq!(as_strs(&entries), ["readme.txt", "sub/", "notes.txt"]);
        let entries = archive.list("docs/sub/", 10).unwrap();
        assert_eq!(as_strs(&entries), ["deep.txt"]);
        assert_eq!(archive.get_ref().position(), 0);
    }

    #[test]
    fn test_list_capacity() {
        let mut archive = archive();
        assert_eq!(archive.list("docs/", 3).unwrap().len(), 3);
        assert!(matches!(
            archive.list("docs/", 2),
            Err(ArchiveError::TooManyEntries { capacity: 2 })
        ));
        assert_eq!(archive.get_ref().position(), 0);
    }

    #[test]
    fn test_list_skips_non_utf8_names() {
        // rename "docs/readme.txt" (header #2 at 1536) to "docs/\xffeadme.txt"
        let mut data = ARCHIVE.to_vec();
        let block: &mut [u8; BLOCKSIZE] = (&mut data[1536..1536 + BLOCKSIZE]).try_into().unwrap();
        block[5] = 0xff;
        let cksum = format!("{:06o}\0 ", checksum_of(block));
        block[CHKSUM_RANGE].copy_from_slice(cksum.as_bytes());

        let mut archive = TarArchive::new(Cursor::new(data));
        assert_eq!(archive.check_archive().unwrap(), 15);
        let entries = archive.list("docs/", 10).unwrap();
        assert_eq!(as_strs(&entries), ["sub/", "notes.txt"]);
        assert_eq!(archive.get_ref().position(), 0);
    }

    #[test]
    fn test_list_not_a_directory() {
        let mut archive = archive();
        assert!(matches!(
            archive.list("hello_world.txt", 10),
            Err(ArchiveError::NotFound { path }) if path == "hello_world.txt"
        ));
        assert!(matches!(
            archive.list("dangling", 10),
            Err(ArchiveError::NotFound { .. })
        ));
    }

    #[test]
    fn test_list_through_link() {
        let mut archive = archive();
        assert_eq!(
            archive.list("link_to_docs", 10).unwrap(),
            archive.list("docs/", 10).unwrap()
        );
    }

    #[test]
    fn test_read_file() {
        let mut archive = archive();
        let mut buf = [0; 64];
        let outcome = archive.read_file("hello_world.txt", 0, &mut buf).unwrap();
        assert_eq!(
            outcome,
            ReadOutcome {
                bytes_written: 12,
                remaining: 0
            }
        );
        assert_eq!(&buf[..12], b"Hello World\n");

        let outcome = archive.read_file("hello_world.txt", 6, &mut buf[..3]).unwrap();
        assert_eq!(outcome.bytes_written, 3);
        assert_eq!(outcome.remaining, 3);
        assert_eq!(&buf[..3], b"Wor");
        assert_eq!(archive.get_ref().position(), 0);
    }

    #[test]
    fn test_read_file_offset_bounds() {
        let mut archive = archive();
        let mut buf = [0; 8];
        let outcome = archive.read_file("hello_world.txt", 12, &mut buf).unwrap();
        assert_eq!(outcome.bytes_written, 0);
        assert!(outcome.is_complete());
        assert!(matches!(
            archive.read_file("hello_world.txt", 13, &mut buf),
            Err(ArchiveError::OffsetOutOfRange { offset: 13, size: 12 })
        ));
        assert_eq!(archive.get_ref().position(), 0);
    }

    #[test]
    fn test_read_file_errors() {
        let mut archive = archive();
        let mut buf = [0; 8];
        assert!(matches!(
            archive.read_file("docs/", 0, &mut buf),
            Err(ArchiveError::NotAFile { .. })
        ));
        assert!(matches!(
            archive.read_file("missing.txt", 0, &mut buf),
            Err(ArchiveError::NotAFile { .. })
        ));
        assert!(matches!(
            archive.read_file("dangling", 0, &mut buf),
            Err(ArchiveError::NotAFile { path }) if path == "missing.txt"
        ));
        assert_eq!(archive.get_ref().position(), 0);
    }

    #[test]
    fn test_read_across_blocks() {
        let mut archive = archive();
        let content = read_to_end(&mut archive, "bye_world_513b.txt");
        assert_eq!(content, include_bytes!("../tests/bye_world_513b.txt"));
    }

    #[test]
    fn test_read_through_links() {
        let mut archive = archive();
        assert_eq!(read_to_end(&mut archive, "link_to_hello"), b"Hello World\n");
        assert_eq!(read_to_end(&mut archive, "hard_hello"), b"Hello World\n");
    }

    #[test]
    fn test_link_chains() {
        let mut buf = [0; 8];
        let mut archive = archive();
        assert!(matches!(
            archive.read_file("chain", 0, &mut buf),
            Err(ArchiveError::SymlinkLoop { hops: 2, .. })
        ));
        assert!(matches!(
            archive.read_file("loop_a", 0, &mut buf),
            Err(ArchiveError::SymlinkLoop { .. })
        ));
        assert_eq!(archive.get_ref().position(), 0);

        // chain -> link_to_hello -> hello_world.txt takes exactly two hops
        let config = ScanConfig::new().with_max_symlink_hops(2);
        let mut archive = TarArchive::with_config(Cursor::new(ARCHIVE), config);
        assert_eq!(read_to_end(&mut archive, "chain"), b"Hello World\n");

        let config = ScanConfig::new().with_max_symlink_hops(4);
        let mut archive = TarArchive::with_config(Cursor::new(ARCHIVE), config);
        assert_eq!(read_to_end(&mut archive, "chain"), b"Hello World\n");
        assert!(matches!(
            archive.list("loop_b", 10),
            Err(ArchiveError::SymlinkLoop { hops: 2, .. })
        ));
    }

    #[test]
    fn test_metadata() {
        let mut archive = archive();
        let meta = archive.metadata("link_to_docs").unwrap();
        assert_eq!(meta.name.as_str(), "link_to_docs");
        assert_eq!(meta.type_flag, Some(TypeFlag::SYMTYPE));
        assert_eq!(meta.size, 0);
        assert_eq!(meta.link_target.as_deref(), Some("docs"));
        assert_eq!(meta.mtime, Some(1_622_505_600));
        assert_eq!(meta.uid, Some(0));

        let meta = archive.metadata("docs/notes.txt").unwrap();
        assert_eq!(meta.type_flag, Some(TypeFlag::REGTYPE));
        assert_eq!(meta.size, 27);
        assert_eq!(meta.link_target, None);

        assert!(matches!(
            archive.metadata("nope"),
            Err(ArchiveError::NotFound { .. })
        ));
        assert_eq!(archive.get_ref().position(), 0);
    }
}
