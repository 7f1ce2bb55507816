//! Scan events emitted by the scanner.

use crate::error::BsErrorKind;
use crate::token::ScanToken;

/// Events emitted by the scanner, one per call to
/// [`Scanner::next_event`](crate::Scanner::next_event).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanEvent<'buf> {
    /// A token or quoted string.
    Token(ScanToken<'buf>),
    /// End of value: `;` or `,`.
    EndVal,
    /// Start of a block: `{`.
    BlockBegin,
    /// End of a block: `}`.
    BlockEnd,
    /// Start of an array: `[`.
    ArrayBegin,
    /// End of an array: `]`.
    ArrayEnd,
    /// Clean end of input (buffer exhausted or NUL byte).
    Eof,
    /// Scan error. Position details come from
    /// [`Scanner::describe`](crate::Scanner::describe).
    Error(BsErrorKind),
}
