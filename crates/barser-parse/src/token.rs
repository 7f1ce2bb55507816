//! Scanned tokens.

use std::borrow::Cow;

/// A single scanned token.
///
/// Unquoted tokens borrow their bytes straight from the input buffer;
/// quoted tokens own a buffer with escape sequences already resolved.
/// Either way, [`ScanToken::into_owned`] yields a dictionary-owned string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanToken<'buf> {
    /// The token bytes.
    pub data: Cow<'buf, [u8]>,
    /// Whether the token was quoted in the source.
    pub quoted: bool,
}

impl<'buf> ScanToken<'buf> {
    /// Borrow the token bytes.
    #[inline]
    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    /// Length of the token in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the token is empty (only possible for quoted tokens).
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Convert the token into an owned byte string, taking the quoted
    /// allocation as-is or copying the borrowed slice.
    #[inline]
    pub fn into_owned(self) -> Vec<u8> {
        self.data.into_owned()
    }
}
