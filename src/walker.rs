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
//! Block-by-block traversal of an archive stream.
//!
//! A [`BlockWalker`] borrows the stream for the duration of one scan. It
//! starts at offset 0 and seeks back to offset 0 when dropped, no matter how
//! the scan ends.

use crate::header::PosixHeader;
use crate::resolve::lossy_name;
use crate::{ArchiveError, Result, BLOCKSIZE, NAME_LEN};
use scopeguard::ScopeGuard;
use std::io::{self, Read, Seek, SeekFrom};

fn rewind<R: Seek>(reader: &mut R) {
    if let Err(e) = reader.seek(SeekFrom::Start(0)) {
        log::warn!("Failed to move the archive cursor back to the start: {e}");
    }
}

fn seek_distance(bytes: u64) -> io::Result<i64> {
    i64::try_from(bytes).map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "seek too far"))
}

/// Cursor over the headers of an archive. Each step starts at the next Tar
/// header entry.
pub(crate) struct BlockWalker<'a, R: Read + Seek> {
    reader: ScopeGuard<&'a mut R, fn(&'a mut R)>,
    headers_seen: usize,
    /// Offset of the next header, as implied by the headers read so far.
    offset: u64,
}

impl<'a, R: Read + Seek> BlockWalker<'a, R> {
    /// Positions `reader` at the first header.
    pub fn start(reader: &'a mut R) -> Result<Self> {
        let reader = scopeguard::guard(reader, rewind::<R> as fn(&'a mut R));
        let mut walker = Self {
            reader,
            headers_seen: 0,
            offset: 0,
        };
        walker.stream().seek(SeekFrom::Start(0))?;
        Ok(walker)
    }

    fn stream(&mut self) -> &mut R {
        &mut self.reader
    }

    /// Number of headers returned by [`Self::next_header`] so far.
    pub const fn headers_seen(&self) -> usize {
        self.headers_seen
    }

    /// Reads the header at the cursor. Returns `None` at the end of the
    /// archive, which is a header with an empty name or the end of the
    /// stream right at a header offset. A stream that ends anywhere else is
    /// an [`io::ErrorKind::UnexpectedEof`] error. On success the cursor
    /// stands at the first payload block.
    pub fn next_header(&mut self) -> Result<Option<PosixHeader>> {
        let mut block = [0_u8; BLOCKSIZE];
        if let Err(e) = self.stream().read_exact(&mut block) {
            if e.kind() != io::ErrorKind::UnexpectedEof {
                return Err(e.into());
            }
            return self.end_of_stream();
        }
        self.offset += BLOCKSIZE as u64;

        let hdr = PosixHeader::from_block(&block);
        if hdr.is_terminator() {
            if hdr.is_zero_block() {
                log::debug!("End of Tar archive after {} header(s)", self.headers_seen);
            } else {
                log::warn!("End-of-archive header with empty name carries non-zero bytes");
            }
            return Ok(None);
        }

        log::trace!(
            "header #{}: name={:?}, type={:?}, size={:?}",
            self.headers_seen,
            hdr.name,
            hdr.typeflag,
            hdr.size
        );
        self.headers_seen += 1;
        Ok(Some(hdr))
    }

    /// Moves the cursor from the payload of `hdr` to the next header.
    pub fn skip_payload(&mut self, hdr: &PosixHeader) -> Result<()> {
        let blocks = hdr.payload_block_count().ok_or_else(|| ArchiveError::InvalidSize {
            name: lossy_name(hdr.name.as_bytes()),
        })?;
        let bytes = blocks
            .checked_mul(BLOCKSIZE as u64)
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "payload too large"))?;
        self.stream().seek(SeekFrom::Current(seek_distance(bytes)?))?;
        self.offset += bytes;
        Ok(())
    }

    /// The stream ended where a header was expected. That is only a clean end
    /// (without end-of-archive marker) if the stream ends exactly at the
    /// expected header offset.
    fn end_of_stream(&mut self) -> Result<Option<PosixHeader>> {
        let len = self.stream().seek(SeekFrom::End(0))?;
        if len == self.offset {
            log::warn!("Reached end of Tar archive data without finding zero/end blocks!");
            return Ok(None);
        }
        let msg = if len < self.offset {
            "payload of the last entry is cut short"
        } else {
            "archive ends inside a header block"
        };
        log::debug!("{msg}: stream has {len} bytes, next header expected at {}", self.offset);
        Err(io::Error::new(io::ErrorKind::UnexpectedEof, msg).into())
    }

    /// Scans forward for the first header named `path` that satisfies
    /// `predicate`. Names are compared byte by byte. On a match, the cursor
    /// stands at the first payload block of that entry.
    pub fn find_named<P>(&mut self, path: &str, predicate: P) -> Result<Option<PosixHeader>>
    where
        P: Fn(&PosixHeader) -> bool,
    {
        if path.len() > NAME_LEN {
            log::debug!("'{path}' is longer than any entry name");
            return Ok(None);
        }
        while let Some(hdr) = self.next_header()? {
            if hdr.name.as_bytes() == path.as_bytes() && predicate(&hdr) {
                return Ok(Some(hdr));
            }
            self.skip_payload(&hdr)?;
        }
        Ok(None)
    }

    /// Fills `buf` with payload bytes starting `offset` bytes after the
    /// cursor. The cursor must stand at the start of a payload.
    ///
    /// A payload that ends before `buf` is filled is an
    /// [`io::ErrorKind::UnexpectedEof`] error. Ends the scan.
    pub fn read_payload(mut self, offset: u64, buf: &mut [u8]) -> Result<()> {
        self.stream().seek(SeekFrom::Current(seek_distance(offset)?))?;
        self.stream().read_exact(buf)?;
        Ok(())
    }
}
