/*
MIT License

Copyright (c) 2023 Philipp Schuster

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
//! TAR header definition taken from <https://www.gnu.org/software/tar/manual/html_node/Standard.html>.
//! A Tar-archive is a collection of 512-byte sized blocks. Unfortunately there are several
//! TAR-like archive specifications. An Overview can be found here:
//! <https://www.gnu.org/software/tar/manual/html_node/Formats.html#Formats>
//!
//! This library only accepts headers of the POSIX "ustar" format: magic `"ustar\0"`, version
//! `"00"` and a correct checksum.

#![allow(non_upper_case_globals)]

use crate::{HeaderError, TarFormatOctal, TarFormatString, BLOCKSIZE, NAME_LEN, PREFIX_LEN};
use core::fmt::{Debug, Display, Formatter};
use core::ops::Range;

/// Expected content of [`PosixHeader::magic`].
pub const USTAR_MAGIC: &[u8; 6] = b"ustar\0";

/// Expected content of [`PosixHeader::version`].
pub const USTAR_VERSION: &[u8; 2] = b"00";

/// Byte range of the checksum field inside a header block.
pub const CHKSUM_RANGE: Range<usize> = 148..156;

/// Sum of all bytes of a header block, where the bytes of the checksum field
/// count as ASCII spaces.
#[must_use]
pub fn checksum_of(block: &[u8; BLOCKSIZE]) -> u64 {
    block
        .iter()
        .enumerate()
        .map(|(i, &byte)| {
            if CHKSUM_RANGE.contains(&i) {
                u64::from(b' ')
            } else {
                u64::from(byte)
            }
        })
        .sum()
}

/// Wrapper around the UNIX file permissions given in octal ASCII.
#[derive(Copy, Clone, PartialEq, Eq)]
#[repr(transparent)]
pub struct Mode(TarFormatOctal<8>);

impl Mode {
    /// Parses the [`ModeFlags`] from the mode string. Returns `None` if the
    /// field is no octal number or holds bits other than permission bits.
    pub fn to_flags(self) -> Option<ModeFlags> {
        ModeFlags::from_bits(self.0.as_number::<u64>()?)
    }
}

impl Debug for Mode {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        Debug::fmt(&self.to_flags(), f)
    }
}

/// Header of the TAR format as specified by POSIX (POSIX 1003.1-1990).
///
/// Each entry is started by such a header, that describes the size and
/// the file name. After that, the file content stands in chunks of 512 bytes.
/// The number of bytes can be derived from the file size.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(C, packed)]
pub struct PosixHeader {
    pub name: TarFormatString<NAME_LEN>,
    pub mode: Mode,
    pub uid: TarFormatOctal<8>,
    pub gid: TarFormatOctal<8>,
    // confusing; size is stored as ASCII string
    pub size: TarFormatOctal<12>,
    pub mtime: TarFormatOctal<12>,
    pub cksum: TarFormatOctal<8>,
    pub typeflag: TypeFlagRaw,
    /// Target of a link. Only meaningful for [`TypeFlag::LINK`] and
    /// [`TypeFlag::SYMTYPE`].
    pub linkname: TarFormatString<NAME_LEN>,
    pub magic: TarFormatString<6>,
    pub version: TarFormatString<2>,
    /// Username. There is always a null byte, therefore
    /// the max len is N-1.
    pub uname: TarFormatString<32>,
    /// Groupname. There is always a null byte, therefore
    /// the max len is N-1.
    pub gname: TarFormatString<32>,
    pub dev_major: TarFormatOctal<8>,
    pub dev_minor: TarFormatOctal<8>,
    pub prefix: TarFormatString<PREFIX_LEN>,
    // padding => to BLOCKSIZE bytes
    pub _pad: [u8; 12],
}

impl PosixHeader {
    /// Interprets a raw block as header. Any block is accepted, see
    /// [`Self::validate`] for the structural checks.
    #[must_use]
    pub fn from_block(block: &[u8; BLOCKSIZE]) -> Self {
        // SAFETY: `PosixHeader` is `repr(C, packed)`, exactly BLOCKSIZE bytes
        // large and only made of byte arrays, so every bit pattern is valid.
        unsafe { core::ptr::read_unaligned(block.as_ptr().cast::<Self>()) }
    }

    /// The header as raw block.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; BLOCKSIZE] {
        // SAFETY: see `from_block`; the alignment of both types is 1.
        unsafe { &*(self as *const Self).cast::<[u8; BLOCKSIZE]>() }
    }

    /// An empty name marks the end of the archive.
    pub const fn is_terminator(&self) -> bool {
        self.name.is_empty()
    }

    /// A Tar archive is terminated, if an end-of-archive entry, which consists
    /// of two 512 blocks of zero bytes, is found.
    pub fn is_zero_block(&self) -> bool {
        self.as_bytes().iter().all(|&byte| byte == 0)
    }

    /// Declared payload length in bytes, or `None` if the size field is no
    /// octal number.
    pub fn payload_size(&self) -> Option<u64> {
        self.size.as_number::<u64>()
    }

    /// Returns the number of blocks that are required to read the whole file
    /// content. Returns `None`, if the file size can't be parsed from the
    /// header.
    pub fn payload_block_count(&self) -> Option<u64> {
        self.payload_size().map(payload_block_count)
    }

    /// Checksum over this header, see [`checksum_of`].
    pub fn compute_checksum(&self) -> u64 {
        checksum_of(self.as_bytes())
    }

    /// Checks magic, version and checksum, in this order.
    ///
    /// # Errors
    /// Returns the first check that failed.
    pub fn validate(&self) -> Result<(), HeaderError> {
        if self.magic.raw() != USTAR_MAGIC {
            return Err(HeaderError::InvalidMagic);
        }
        if self.version.raw() != USTAR_VERSION {
            return Err(HeaderError::InvalidVersion);
        }
        match self.cksum.as_number::<u64>() {
            Some(stored) if stored == self.compute_checksum() => Ok(()),
            _ => Err(HeaderError::InvalidChecksum),
        }
    }

    /// Parsed type of the entry. Unknown type flags are `None`.
    pub fn type_flag(&self) -> Option<TypeFlag> {
        self.typeflag.try_to_type_flag().ok()
    }
}

/// Number of 512-byte blocks occupied by a payload of `size` bytes.
#[must_use]
pub const fn payload_block_count(size: u64) -> u64 {
    size.div_ceil(BLOCKSIZE as u64)
}

#[derive(Copy, Clone, Debug, PartialOrd, PartialEq, Eq)]
pub struct InvalidTypeFlagError(u8);

impl Display for InvalidTypeFlagError {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        f.write_fmt(format_args!("{:x} is not a valid TypeFlag", self.0))
    }
}

impl std::error::Error for InvalidTypeFlagError {}

#[derive(Copy, Clone, PartialOrd, PartialEq, Eq)]
pub struct TypeFlagRaw(u8);

impl TypeFlagRaw {
    /// Tries to parse the underlying value as [`TypeFlag`]. This fails if the
    /// Tar file is corrupt and the type is invalid.
    pub fn try_to_type_flag(self) -> Result<TypeFlag, InvalidTypeFlagError> {
        TypeFlag::try_from(self)
    }
}

impl Debug for TypeFlagRaw {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        Debug::fmt(&self.try_to_type_flag(), f)
    }
}

/// Describes the kind of payload, that follows after a
/// [`PosixHeader`]. The properties of this payload are
/// described inside the header.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u8)]
#[allow(unused)]
pub enum TypeFlag {
    /// Represents a regular file. New archives should be created using this flag.
    REGTYPE = b'0',
    /// Legacy marker of a regular file. Silently recognized as [`TypeFlag::REGTYPE`].
    AREGTYPE = b'\0',
    /// This flag represents a file linked to another file, of any type, previously archived. The
    /// linked-to name is specified in the linkname field with a trailing null.
    LINK = b'1',
    /// This represents a symbolic link to another file. The linked-to name is specified in the
    /// linkname field with a trailing null.
    SYMTYPE = b'2',
    /// Character special file.
    CHRTYPE = b'3',
    /// Block special file.
    BLKTYPE = b'4',
    /// This flag specifies a directory or sub-directory. The directory name in the name field
    /// should end with a slash.
    DIRTYPE = b'5',
    /// This specifies a FIFO special file. Note that the archiving of a FIFO file archives the
    /// existence of this file and not its contents.
    FIFOTYPE = b'6',
    /// Contiguous file. Not treated as a regular file by this library.
    CONTTYPE = b'7',
    /// Extended header referring to the next file in the archive
    XHDTYPE = b'x',
    /// Global extended header
    XGLTYPE = b'g',
}

impl TypeFlag {
    /// Whether we have a regular file.
    pub fn is_regular_file(self) -> bool {
        // Equivalent, see POSIX.
        self == Self::AREGTYPE || self == Self::REGTYPE
    }

    /// Whether we have a directory.
    pub fn is_directory(self) -> bool {
        self == Self::DIRTYPE
    }

    /// Whether we have a hard link or a symbolic link. Both are followed the
    /// same way when resolving paths.
    pub fn is_link(self) -> bool {
        self == Self::LINK || self == Self::SYMTYPE
    }
}

impl TryFrom<TypeFlagRaw> for TypeFlag {
    type Error = InvalidTypeFlagError;

    fn try_from(value: TypeFlagRaw) -> Result<Self, Self::Error> {
        match value.0 {
            b'0' => Ok(Self::REGTYPE),
            b'\0' => Ok(Self::AREGTYPE),
            b'1' => Ok(Self::LINK),
            b'2' => Ok(Self::SYMTYPE),
            b'3' => Ok(Self::CHRTYPE),
            b'4' => Ok(Self::BLKTYPE),
            b'5' => Ok(Self::DIRTYPE),
            b'6' => Ok(Self::FIFOTYPE),
            b'7' => Ok(Self::CONTTYPE),
            b'x' => Ok(Self::XHDTYPE),
            b'g' => Ok(Self::XGLTYPE),
            e => Err(InvalidTypeFlagError(e)),
        }
    }
}

bitflags::bitflags! {
    /// UNIX file permissions in octal format.
    #[repr(transparent)]
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ModeFlags: u64 {
        /// Set UID on execution.
        const SetUID = 0o4000;
        /// Set GID on execution.
        const SetGID = 0o2000;
        /// Reserved.
        const TSVTX = 0o1000;
        /// Owner read.
        const OwnerRead = 0o400;
        /// Owner write.
        const OwnerWrite = 0o200;
        /// Owner execute.
        const OwnerExec = 0o100;
        /// Group read.
        const GroupRead = 0o040;
        /// Group write.
        const GroupWrite = 0o020;
        /// Group execute.
        const GroupExec = 0o010;
        /// Others read.
        const OthersRead = 0o004;
        /// Others write.
        const OthersWrite = 0o002;
        /// Others execute.
        const OthersExec = 0o001;
    }
}
