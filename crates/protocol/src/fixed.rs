//! Fixed-width ASCII wire fields
//!
//! The wire format uses NUL-padded ASCII for frame type tags and KV keys.
//! `FixedAscii` enforces truncation at construction so the padded form and
//! the trimmed string view can never disagree.

use std::fmt;

/// A NUL-padded ASCII field of exactly `N` wire bytes
///
/// Construction truncates over-long input at `N` bytes; the stored form is
/// always the padded wire representation.
///
/// # Example
///
/// ```
/// use aircap_protocol::FixedAscii;
///
/// let tag = FixedAscii::<16>::new("OPENDEVICE");
/// assert_eq!(tag.as_str(), "OPENDEVICE");
/// assert_eq!(tag.padded().len(), 16);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FixedAscii<const N: usize> {
    bytes: [u8; N],
}

impl<const N: usize> FixedAscii<N> {
    /// Create a field from a string, truncating at `N` bytes
    pub fn new(s: &str) -> Self {
        let mut bytes = [0u8; N];
        let take = s.len().min(N);
        bytes[..take].copy_from_slice(&s.as_bytes()[..take]);
        Self { bytes }
    }

    /// Create a field from raw wire bytes
    pub fn from_wire(bytes: [u8; N]) -> Self {
        Self { bytes }
    }

    /// The padded wire bytes
    #[inline]
    pub fn padded(&self) -> &[u8; N] {
        &self.bytes
    }

    /// The trimmed string view, stopping at the first NUL
    ///
    /// Non-UTF-8 bytes before the first NUL are replaced, which cannot occur
    /// for fields we encoded ourselves but may for hostile wire input.
    pub fn as_str(&self) -> &str {
        let end = self.bytes.iter().position(|&b| b == 0).unwrap_or(N);
        std::str::from_utf8(&self.bytes[..end]).unwrap_or("")
    }

    /// The trimmed field lowercased, for case-insensitive lookup
    pub fn to_lowercase(&self) -> String {
        self.as_str().to_ascii_lowercase()
    }
}

impl<const N: usize> fmt::Display for FixedAscii<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl<const N: usize> From<&str> for FixedAscii<N> {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}
