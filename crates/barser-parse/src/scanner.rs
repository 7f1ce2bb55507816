//! Scanner state machine.
//!
//! A byte-at-a-time scanner over a raw input buffer. It never re-reads the
//! buffer: each call to [`Scanner::next_event`] consumes bytes until a scan
//! event falls out (a token, a structural delimiter, end of input, or an
//! error). Line and column are tracked as it goes, and states with a
//! far-away closing delimiter (quoted strings, multi-line comments, blocks,
//! arrays) checkpoint the position of the opener so errors can point at it
//! instead of the point of exhaustion.

use std::borrow::Cow;

use crate::chartable::{self as ct, has_class};
use crate::error::{BsError, BsErrorKind, LineWindow, Unterminated};
use crate::escape;
use crate::event::ScanEvent;
use crate::token::ScanToken;
use crate::trace;

/// Initial allocation for a quoted string.
const QUOTED_STARTSIZE: usize = 50;

/// Scanner sub-states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    /// Skipping whitespace (newlines included).
    SkipWhitespace,
    /// Skipping newlines when explicitly required.
    SkipNewline,
    /// Acquiring a token.
    GetToken,
    /// Acquiring a quoted / escaped string.
    GetQuoted,
    /// Skipping a comment until after the next newline.
    SkipComment,
    /// Skipping a multi-line comment until `*/`.
    SkipMlComment,
}

/// A saved scan position.
#[derive(Debug, Clone, Copy)]
struct Checkpoint {
    line_start: usize,
    line: usize,
    col: usize,
}

/// Byte-at-a-time scanner producing [`ScanEvent`]s.
pub struct Scanner<'buf> {
    buf: &'buf [u8],
    /// Index of the current byte.
    pos: usize,
    /// The previously consumed byte.
    prev: Option<u8>,
    /// Start of the current line.
    line_start: usize,
    /// 1-based line number.
    line: usize,
    /// 0-based position within the current line.
    col: usize,
    /// Position saved on entry to a far-delimiter state.
    saved: Checkpoint,
    saved_set: bool,
    state: ScanState,
}

impl<'buf> Scanner<'buf> {
    /// Create a scanner over an input buffer.
    pub fn new(buf: &'buf [u8]) -> Self {
        Self {
            buf,
            pos: 0,
            prev: None,
            line_start: 0,
            line: 1,
            col: 0,
            saved: Checkpoint {
                line_start: 0,
                line: 1,
                col: 0,
            },
            saved_set: false,
            state: ScanState::SkipWhitespace,
        }
    }

    /// The current byte, or `None` at end of buffer or on a NUL byte
    /// (which terminates parsing as clean EOF).
    #[inline]
    fn cur(&self) -> Option<u8> {
        match self.buf.get(self.pos) {
            Some(&0) | None => None,
            Some(&b) => Some(b),
        }
    }

    /// The byte after the current one.
    #[inline]
    fn peek(&self) -> Option<u8> {
        match self.buf.get(self.pos + 1) {
            Some(&0) | None => None,
            Some(&b) => Some(b),
        }
    }

    /// Step onto the next byte, maintaining line and column counters.
    /// A `\r\n` pair advances the line counter once.
    fn forward(&mut self) -> Option<u8> {
        if self.pos >= self.buf.len() {
            return None;
        }
        self.prev = self.buf.get(self.pos).copied();
        self.pos += 1;

        let c = match self.cur() {
            // the step past the last byte still counts for error positions
            None => {
                self.col += 1;
                return None;
            }
            Some(c) => c,
        };
        if has_class(c, ct::NLN) {
            let prev_nln = self.prev.map_or(false, |p| has_class(p, ct::NLN));
            if !prev_nln || Some(c) == self.prev {
                self.line_start = self.pos + 1;
                self.line += 1;
                self.col = 0;
            }
        } else {
            self.col += 1;
        }
        Some(c)
    }

    /// Checkpoint the position when entering a state whose closing
    /// delimiter may be far away.
    fn save(&mut self) {
        self.saved = Checkpoint {
            line_start: self.line_start,
            line: self.line,
            col: self.col,
        };
        self.saved_set = true;
    }

    /// Consume input until the next scan event.
    pub fn next_event(&mut self) -> ScanEvent<'buf> {
        loop {
            match self.state {
                ScanState::SkipWhitespace => {
                    while let Some(c) = self.cur() {
                        if has_class(c, ct::SPC | ct::NLN) {
                            self.forward();
                        } else {
                            break;
                        }
                    }
                    // comment openers are only recognized at token-start
                    // position; inside a token '/' and '*' are ordinary bytes
                    if self.cur() == Some(ct::MLCOMMENT_OUT_CHAR) {
                        if self.peek() == Some(ct::MLCOMMENT_IN_CHAR) {
                            self.save();
                            self.forward();
                            self.state = ScanState::SkipMlComment;
                            continue;
                        }
                        if self.peek() == Some(ct::MLCOMMENT_OUT_CHAR) {
                            self.forward();
                            self.state = ScanState::SkipComment;
                            continue;
                        }
                    }
                    self.state = ScanState::GetToken;
                }

                ScanState::GetToken => {
                    let start = self.pos;
                    while let Some(c) = self.cur() {
                        if has_class(c, ct::TOK | ct::EXT) {
                            self.forward();
                        } else {
                            break;
                        }
                    }
                    if self.pos > start {
                        self.state = ScanState::SkipWhitespace;
                        trace!("token {:?}", &self.buf[start..self.pos]);
                        return ScanEvent::Token(ScanToken {
                            data: Cow::Borrowed(&self.buf[start..self.pos]),
                            quoted: false,
                        });
                    }
                    // empty run: fall through to the control byte check
                }

                ScanState::SkipComment => {
                    while let Some(c) = self.cur() {
                        if !has_class(c, ct::NLN) {
                            self.forward();
                        } else {
                            break;
                        }
                    }
                    self.state = ScanState::SkipNewline;
                    continue;
                }

                ScanState::SkipNewline => {
                    while let Some(c) = self.cur() {
                        if has_class(c, ct::NLN) {
                            self.forward();
                        } else {
                            break;
                        }
                    }
                    self.state = ScanState::SkipWhitespace;
                }

                ScanState::SkipMlComment => {
                    while let Some(c) = self.cur() {
                        if c != ct::MLCOMMENT_OUT_CHAR {
                            self.forward();
                        } else {
                            break;
                        }
                    }
                    if self.cur().is_none() {
                        return ScanEvent::Error(BsErrorKind::Eof);
                    }
                    // a '/' preceded by '*' closes the comment
                    if self.prev == Some(ct::MLCOMMENT_IN_CHAR) {
                        self.state = ScanState::SkipWhitespace;
                        self.forward();
                    } else {
                        self.forward();
                        continue;
                    }
                }

                // quoted strings are scanned synchronously in lex_quoted
                ScanState::GetQuoted => {
                    return ScanEvent::Error(BsErrorKind::Generic);
                }
            }

            // no event so far: check for control bytes
            let c = match self.cur() {
                None => return ScanEvent::Eof,
                Some(c) => c,
            };

            match c {
                ct::QUOTE_CHAR | ct::QUOTE1_CHAR => {
                    self.save();
                    self.forward();
                    return self.lex_quoted(c);
                }
                ct::ENDVAL_CHAR | ct::ENDVAL1_CHAR => {
                    self.state = ScanState::SkipWhitespace;
                    self.forward();
                    return ScanEvent::EndVal;
                }
                ct::STARTBLOCK_CHAR => {
                    self.save();
                    self.state = ScanState::SkipWhitespace;
                    self.forward();
                    return ScanEvent::BlockBegin;
                }
                ct::ENDBLOCK_CHAR => {
                    self.state = ScanState::SkipWhitespace;
                    self.forward();
                    return ScanEvent::BlockEnd;
                }
                ct::STARTARRAY_CHAR => {
                    self.save();
                    self.state = ScanState::SkipWhitespace;
                    self.forward();
                    return ScanEvent::ArrayBegin;
                }
                ct::ENDARRAY_CHAR => {
                    self.state = ScanState::SkipWhitespace;
                    self.forward();
                    return ScanEvent::ArrayEnd;
                }
                ct::COMMENT_CHAR => {
                    self.state = ScanState::SkipComment;
                    self.forward();
                }
                _ if has_class(c, ct::ILL) => {
                    return ScanEvent::Error(BsErrorKind::Unexpected);
                }
                _ => {}
            }
        }
    }

    /// Scan a quoted string. The opening quote has been consumed and its
    /// position checkpointed; the same byte must close the string.
    fn lex_quoted(&mut self, qchar: u8) -> ScanEvent<'buf> {
        self.state = ScanState::GetQuoted;
        let mut data: Vec<u8> = Vec::with_capacity(QUOTED_STARTSIZE);

        loop {
            let c = match self.cur() {
                None => return ScanEvent::Error(BsErrorKind::Eof),
                Some(c) => c,
            };

            if c == qchar {
                self.forward();
                // a closing quote immediately followed by the escape byte,
                // whitespace/newlines, then the same quote byte resumes the
                // string (multi-line concatenation)
                if self.cur() == Some(ct::ESCAPE_CHAR) {
                    self.forward();
                    while let Some(w) = self.cur() {
                        if has_class(w, ct::SPC | ct::NLN) {
                            self.forward();
                        } else {
                            break;
                        }
                    }
                    if self.cur() == Some(qchar) {
                        self.forward();
                        continue;
                    }
                    return ScanEvent::Error(BsErrorKind::Quoted);
                }
                break;
            }

            if c == ct::ESCAPE_CHAR {
                match self.forward() {
                    None => return ScanEvent::Error(BsErrorKind::Eof),
                    Some(e) => {
                        data.push(escape::unescape_byte(e));
                        self.forward();
                    }
                }
                continue;
            }

            if has_class(c, ct::NLN) {
                return ScanEvent::Error(BsErrorKind::Quoted);
            }

            data.push(c);
            self.forward();
        }

        self.state = ScanState::SkipWhitespace;
        trace!("quoted token, {} bytes", data.len());
        ScanEvent::Token(ScanToken {
            data: Cow::Owned(data),
            quoted: true,
        })
    }

    /// Build a positioned [`BsError`] for an error kind, whether raised by
    /// the scanner itself or by the layer consuming its events.
    ///
    /// EOF inside a quoted string or multi-line comment and bracket
    /// imbalance report the saved opening position.
    pub fn describe(&self, kind: BsErrorKind) -> BsError {
        let unterminated = match (kind, self.state) {
            (BsErrorKind::Eof, ScanState::GetQuoted) => Some(Unterminated::QuotedString),
            (BsErrorKind::Eof, ScanState::SkipMlComment) => Some(Unterminated::MultilineComment),
            _ => None,
        };

        let use_saved =
            unterminated.is_some() || (kind == BsErrorKind::Level && self.saved_set);
        let at = if use_saved {
            LineWindow::capture(self.buf, self.saved.line_start, self.saved.line, self.saved.col)
        } else {
            LineWindow::capture(self.buf, self.line_start, self.line, self.col)
        };

        BsError {
            kind,
            byte: self.cur(),
            at,
            unterminated,
        }
    }
}
