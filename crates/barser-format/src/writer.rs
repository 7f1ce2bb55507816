//! Low-level dump writer.
//!
//! A thin layer over an `io::Write` sink handling indentation and quoted
//! re-emission: quoted names and values go out between double quotes with
//! every escapable byte rendered through the escape codec, so that parsing
//! the output reproduces the original bytes.

use std::io::{self, Write};

use barser_parse::chartable as ct;
use barser_parse::escape::escape_letter;

/// Spaces per indentation level.
pub const INDENT_WIDTH: usize = 4;

/// Indent-aware byte writer for dumps.
pub struct DumpWriter<W: Write> {
    out: W,
}

impl<W: Write> DumpWriter<W> {
    /// Wrap a sink.
    pub fn new(out: W) -> Self {
        Self { out }
    }

    /// Write indentation for a nesting level.
    pub fn indent(&mut self, level: usize) -> io::Result<()> {
        for _ in 0..level * INDENT_WIDTH {
            self.out.write_all(&[ct::INDENT_CHAR])?;
        }
        Ok(())
    }

    /// Write raw bytes.
    pub fn raw(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.out.write_all(bytes)
    }

    /// Write a single byte.
    pub fn byte(&mut self, b: u8) -> io::Result<()> {
        self.out.write_all(&[b])
    }

    /// Write a name or value, quoting and escaping it when its quoted
    /// flag is set.
    ///
    /// Output always uses double quotes, so single quotes inside stay
    /// unescaped.
    pub fn quoted(&mut self, bytes: &[u8], quoted: bool) -> io::Result<()> {
        if !quoted {
            return self.out.write_all(bytes);
        }
        self.byte(ct::QUOTE_CHAR)?;
        for &b in bytes {
            match escape_letter(b) {
                Some(letter) if b != ct::QUOTE1_CHAR => {
                    self.out.write_all(&[ct::ESCAPE_CHAR, letter])?;
                }
                _ => self.byte(b)?,
            }
        }
        self.byte(ct::QUOTE_CHAR)
    }
}
