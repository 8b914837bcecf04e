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
//! Read-only access to USTAR Tar archives behind any [`Read`] + [`Seek`]
//! stream. If you need to create archives or full support of the GNU and PAX
//! extensions, I recommend the use of <https://crates.io/crates/tar> instead.
//!
//! The crate answers a handful of queries, each with a single linear scan
//! over the archive starting at its first block:
//!
//! - [`TarArchive::check_archive`]: validates magic, version and checksum of
//!   every header and counts them.
//! - [`TarArchive::exists`], [`TarArchive::is_dir`], [`TarArchive::is_file`],
//!   [`TarArchive::is_symlink`]: existence and type tests.
//! - [`TarArchive::list`]: the direct children of a directory.
//! - [`TarArchive::read_file`]: a byte window of a regular file.
//! - [`TarArchive::metadata`]: the header fields of one entry.
//!
//! Nothing is cached between queries, and the stream is positioned at offset
//! 0 after every query. Symbolic and hard links are followed by
//! [`TarArchive::list`] and [`TarArchive::read_file`], one hop by default
//! (see [`ScanConfig`]).
//!
//! Only the "basic" ustar layout is supported: names are at most
//! 100 bytes long (the `prefix` field is ignored) and extensions such as GNU
//! Longname or PAX headers are not interpreted.
//!
//! ```no_run
//! use std::fs::File;
//! use ustar_scan::TarArchive;
//!
//! let mut archive = TarArchive::new(File::open("archive.tar")?);
//! println!("{} headers", archive.check_archive()?);
//! for name in archive.list("docs/", 64)? {
//!     println!("docs/{name}");
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! [`Read`]: std::io::Read
//! [`Seek`]: std::io::Seek

#![deny(rustdoc::all)]
#![allow(rustdoc::missing_doc_code_examples)]
#![deny(clippy::all)]
#![deny(missing_debug_implementations)]

/// Each Archive Entry (either Header or Data Block) is a block of 512 bytes.
pub const BLOCKSIZE: usize = 512;

/// Length of the name and linkname fields of a header.
pub const NAME_LEN: usize = 100;

/// Length of the prefix field of a header.
pub const PREFIX_LEN: usize = 155;

mod archive;
mod config;
mod error;
mod header;
mod resolve;
mod tar_format_types;
mod walker;

pub use archive::*;
pub use config::*;
pub use error::*;
pub use header::*;
pub use resolve::{EntryName, SEPARATOR};
pub use tar_format_types::*;
