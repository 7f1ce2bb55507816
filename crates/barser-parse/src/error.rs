//! Parse errors and their diagnostic rendering.

use crate::chartable::{self as ct, has_class};

/// Maximum line width displayed when rendering an error hint.
pub const ERROR_LINE_WIDTH: usize = 80;

/// Parse error kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BsErrorKind {
    /// Unexpected end of input. Inside a quoted string or multi-line
    /// comment this means the construct was never terminated.
    Eof,
    /// Illegal character outside a quoted string.
    Unexpected,
    /// A name / identifier was required but absent.
    ExpId,
    /// An identifier appeared where none was permitted.
    UnexpId,
    /// Too many consecutive identifiers without a terminator.
    Tokens,
    /// Unbalanced brackets.
    Level,
    /// Structural element in a position where it cannot apply.
    Block,
    /// Operation on an absent dictionary.
    Null,
    /// Newline inside a quoted string or invalid multi-line continuation.
    Quoted,
    /// Internal / other error.
    Generic,
}

/// What construct an EOF error interrupted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unterminated {
    /// EOF inside a quoted string.
    QuotedString,
    /// EOF inside a multi-line comment.
    MultilineComment,
}

/// A captured window of the source line an error points into.
///
/// The window is materialized eagerly so the error stays valid after the
/// input buffer is dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineWindow {
    /// 1-based line number.
    pub line: usize,
    /// 0-based position within the line.
    pub col: usize,
    /// Up to [`ERROR_LINE_WIDTH`] bytes of the line around the position.
    pub text: String,
    /// The window was clipped on the left.
    pub trunc_left: bool,
    /// The window was clipped on the right.
    pub trunc_right: bool,
}

impl LineWindow {
    /// Capture a window of the line starting at `line_start` in `buf`,
    /// centered so that `col` stays visible.
    pub fn capture(buf: &[u8], line_start: usize, line: usize, col: usize) -> Self {
        let half = ERROR_LINE_WIDTH / 2;
        let trunc_left = col > half;
        let start = if trunc_left {
            line_start + col - half
        } else {
            line_start
        };

        let mut text = Vec::new();
        let mut trunc_right = true;
        for i in 0..ERROR_LINE_WIDTH {
            match buf.get(start + i) {
                None | Some(&0) => {
                    trunc_right = false;
                    break;
                }
                Some(&b) if has_class(b, ct::NLN) => {
                    trunc_right = false;
                    break;
                }
                Some(&b) => text.push(b),
            }
        }

        LineWindow {
            line,
            col,
            text: String::from_utf8_lossy(&text).into_owned(),
            trunc_left,
            trunc_right,
        }
    }

    /// An empty window for errors raised outside a scan.
    pub fn empty() -> Self {
        LineWindow {
            line: 0,
            col: 0,
            text: String::new(),
            trunc_left: false,
            trunc_right: false,
        }
    }
}

/// A parse error with source position and context window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BsError {
    /// The kind of error.
    pub kind: BsErrorKind,
    /// The byte at the error position, if any.
    pub byte: Option<u8>,
    /// Where the error is reported. For unterminated constructs and
    /// bracket imbalance this is the saved opening position.
    pub at: LineWindow,
    /// Which construct an EOF error interrupted, if any.
    pub unterminated: Option<Unterminated>,
}

impl BsError {
    /// An error with no source context (raised outside a scan).
    pub fn bare(kind: BsErrorKind) -> Self {
        BsError {
            kind,
            byte: None,
            at: LineWindow::empty(),
            unterminated: None,
        }
    }

    /// The two-line context hint: the captured line window with a caret
    /// under the error position.
    pub fn hint(&self) -> String {
        let caret_col = if self.at.trunc_left {
            ERROR_LINE_WIDTH / 2
        } else {
            self.at.col.min(ERROR_LINE_WIDTH / 2)
        };
        let left = if self.at.trunc_left { "..." } else { "" };
        let right = if self.at.trunc_right { "..." } else { "" };
        let pad = if self.at.trunc_left { "   " } else { "" };
        format!(
            "\t{}{}{}\n\t{}{}^",
            left,
            self.at.text,
            right,
            pad,
            " ".repeat(caret_col)
        )
    }

    /// Full diagnostic: message, position and context hint.
    pub fn render(&self) -> String {
        format!("Parser error: {}\n\n{}", self, self.hint())
    }
}

impl std::fmt::Display for BsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            BsErrorKind::Eof => match self.unterminated {
                Some(Unterminated::QuotedString) => write!(f, "unterminated quoted string")?,
                Some(Unterminated::MultilineComment) => {
                    write!(f, "unterminated multi-line comment")?
                }
                None => write!(f, "unexpected end of input")?,
            },
            BsErrorKind::Unexpected => match self.byte {
                Some(b) => write!(
                    f,
                    "unexpected character: '{}' (0x{:02x})",
                    if b.is_ascii_graphic() { b as char } else { '?' },
                    b
                )?,
                None => write!(f, "unexpected character")?,
            },
            BsErrorKind::ExpId => write!(f, "expected node name / identifier")?,
            BsErrorKind::UnexpId => write!(f, "unexpected node name / identifier")?,
            BsErrorKind::Tokens => write!(f, "too many consecutive identifiers")?,
            BsErrorKind::Level => write!(f, "unbalanced bracket(s) found")?,
            BsErrorKind::Block => write!(f, "unexpected block element")?,
            BsErrorKind::Null => write!(f, "dictionary object is absent")?,
            BsErrorKind::Quoted => {
                write!(f, "newline in quoted string or invalid continuation")?
            }
            BsErrorKind::Generic => write!(f, "internal parser error")?,
        }
        write!(f, " at line {} position {}", self.at.line, self.at.col)
    }
}

impl std::error::Error for BsError {}
