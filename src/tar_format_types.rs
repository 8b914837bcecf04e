//! Fixed-width fields of a Tar header block.

use core::fmt::{Debug, Formatter};
use core::str::{from_utf8, Utf8Error};
use num_traits::Num;

/// Base type for strings embedded in a Tar header. The length depends on the
/// context. The returned string is likely to be UTF-8/ASCII, which is verified
/// by getters, such as [`TarFormatString::as_str`].
///
/// An optionally null terminated string. The contents are either:
/// 1. A fully populated string with no null termination or
/// 2. A partially populated string where the unused bytes are zero.
#[derive(Copy, Clone, PartialEq, Eq)]
#[repr(C)]
pub struct TarFormatString<const N: usize> {
    bytes: [u8; N],
}

impl<const N: usize> TarFormatString<N> {
    /// Constructor.
    ///
    /// # Panics
    /// Panics of `N` is zero, i.e., the underlying array has no length.
    #[must_use]
    pub const fn new(bytes: [u8; N]) -> Self {
        assert!(N > 0, "array should have at least one element");
        Self { bytes }
    }

    /// True if the is string empty (ignoring NULL bytes).
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.bytes[0] == 0
    }

    /// Returns the length of the payload in bytes. This is either the full
    /// capacity `N` or the data until the first NULL byte.
    #[must_use]
    pub fn size(&self) -> usize {
        memchr::memchr(0, &self.bytes).unwrap_or(N)
    }

    /// Payload bytes up to (excluding) the first NULL byte.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[0..self.size()]
    }

    /// The complete field including any NULL bytes.
    #[must_use]
    pub const fn raw(&self) -> &[u8; N] {
        &self.bytes
    }

    /// Returns a str ref without terminating or intermediate NULL bytes. The
    /// string is truncated at the first NULL byte, in case not the full length
    /// was used.
    ///
    /// # Errors
    /// Returns a [`Utf8Error`] error for invalid strings.
    pub fn as_str(&self) -> Result<&str, Utf8Error> {
        from_utf8(self.as_bytes())
    }

    /// The digits of a numeric field: leading spaces are skipped and the
    /// value ends at the first NULL byte or space.
    fn digits(&self) -> &[u8] {
        let start = self
            .bytes
            .iter()
            .position(|&byte| byte != b' ')
            .unwrap_or(N);
        let field = &self.bytes[start..];
        let len = memchr::memchr2(0, b' ', field).unwrap_or(field.len());
        &field[..len]
    }
}

impl<const N: usize> Debug for TarFormatString<N> {
    fn fmt(&self, f: &mut Formatter) -> core::fmt::Result {
        write!(
            f,
            "str='{:?}',byte_usage={}/{}",
            from_utf8(self.as_bytes()),
            self.size(),
            N
        )
    }
}

/// A number with a specified base, stored as ASCII digits.
#[derive(Copy, Clone, PartialEq, Eq)]
#[repr(C)]
pub struct TarFormatNumber<const N: usize, const R: u32>(TarFormatString<N>);

/// An octal number. Leading and trailing spaces in the string are ignored.
#[derive(Copy, Clone, PartialEq, Eq)]
#[repr(C)]
pub struct TarFormatOctal<const N: usize>(TarFormatNumber<N, 8>);

impl<const N: usize, const R: u32> TarFormatNumber<N, R> {
    #[cfg(test)]
    const fn new(bytes: [u8; N]) -> Self {
        Self(TarFormatString::<N> { bytes })
    }

    /// Interprets the underlying value as a number of the specified type using
    /// its respective radix. An empty field is zero.
    ///
    /// Returns `None` if the digits are not a number of the specified type
    /// and radix.
    pub fn as_number<T>(&self) -> Option<T>
    where
        T: Num,
    {
        let digits = from_utf8(self.0.digits()).ok()?;
        if digits.is_empty() {
            return Some(T::zero());
        }
        T::from_str_radix(digits, R).ok()
    }
}

impl<const N: usize, const R: u32> Debug for TarFormatNumber<N, R> {
    fn fmt(&self, f: &mut Formatter) -> core::fmt::Result {
        let raw = from_utf8(self.0.as_bytes()).unwrap_or("<invalid utf-8>");
        match self.as_number::<u64>() {
            None => write!(f, "NaN [{raw}]"),
            Some(val) => write!(f, "{val} [{raw}]"),
        }
    }
}

impl<const N: usize> TarFormatOctal<N> {
    #[cfg(test)]
    #[must_use]
    pub const fn new(bytes: [u8; N]) -> Self {
        Self(TarFormatNumber::<N, 8>::new(bytes))
    }

    /// See [`TarFormatNumber::as_number`].
    pub fn as_number<T>(&self) -> Option<T>
    where
        T: Num,
    {
        self.0.as_number::<T>()
    }
}

impl<const N: usize> Debug for TarFormatOctal<N> {
    fn fmt(&self, f: &mut Formatter) -> core::fmt::Result {
        self.0.fmt(f)
    }
}
