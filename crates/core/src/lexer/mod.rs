//! Lexical core shared by the three source formats.
//!
//! [`Scanner`] walks the source text, skipping trivia (blanks and `//`
//! line comments) and tracking line/column positions. Each format module
//! builds its own token vocabulary on top of it and always terminates the
//! token vector with an end-of-input token.

use crate::ast::Position;
use crate::error::CompileError;
use std::ops::Range;

pub mod dictionary;
pub mod phoneme;
pub mod vowel;

/// Implemented by each format's token enum.
pub trait TokenKind {
    fn is_eof(&self) -> bool;
}

/// A token with the raw text it was read from and where it starts.
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned<K> {
    pub kind: K,
    pub text: String,
    pub pos: Position,
    /// Byte range of `text` in the source.
    pub span: Range<usize>,
}

impl<K: TokenKind> Spanned<K> {
    /// Human-readable form used in `found ...` diagnostics.
    pub fn describe(&self) -> String {
        if self.kind.is_eof() {
            "end of input".to_owned()
        } else if self.text == "\n" {
            "end of line".to_owned()
        } else {
            format!("'{}'", self.text)
        }
    }
}

/// Whether newlines are skipped as trivia or left for the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Newlines {
    Skip,
    Keep,
}

pub struct Scanner<'a> {
    src: &'a str,
    offset: usize,
    line: u32,
    column: u32,
}

impl<'a> Scanner<'a> {
    pub fn new(src: &'a str) -> Self {
        Scanner::with_origin(src, Position::new(1, 1))
    }

    /// Scan a fragment embedded in a larger file, reporting positions
    /// relative to that file.
    pub fn with_origin(src: &'a str, origin: Position) -> Self {
        Scanner {
            src,
            offset: 0,
            line: origin.line,
            column: origin.column,
        }
    }

    pub fn position(&self) -> Position {
        Position::new(self.line, self.column)
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn rest(&self) -> &'a str {
        &self.src[self.offset..]
    }

    pub fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    pub fn at_end(&self) -> bool {
        self.offset >= self.src.len()
    }

    pub fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.offset += c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    /// Advance over the next `len` bytes, which must lie on a char boundary.
    pub fn advance_bytes(&mut self, len: usize) {
        let end = (self.offset + len).min(self.src.len());
        while self.offset < end {
            self.bump();
        }
    }

    /// Skip blanks and `//` comments. With [`Newlines::Keep`] the scanner
    /// stops in front of a newline.
    pub fn skip_trivia(&mut self, newlines: Newlines) {
        while let Some(c) = self.peek() {
            if c == '/' && self.rest().starts_with("//") {
                while let Some(c) = self.peek() {
                    if c == '\n' {
                        break;
                    }
                    self.bump();
                }
                continue;
            }
            if c == '\n' && newlines == Newlines::Keep {
                return;
            }
            if c.is_whitespace() {
                self.bump();
                continue;
            }
            return;
        }
    }

    /// Length in bytes of the word at the scanner position: the maximal run
    /// of characters that are neither whitespace nor `delimiter`.
    pub fn word_len(&self, delimiter: impl Fn(char) -> bool) -> usize {
        self.rest()
            .char_indices()
            .find(|&(_, c)| c.is_whitespace() || delimiter(c))
            .map(|(i, _)| i)
            .unwrap_or_else(|| self.rest().len())
    }

    /// Consume `len` bytes and wrap them into a token.
    pub fn token<K>(&mut self, kind: K, len: usize) -> Spanned<K> {
        let pos = self.position();
        let start = self.offset;
        self.advance_bytes(len);
        Spanned {
            kind,
            text: self.src[start..self.offset].to_owned(),
            pos,
            span: start..self.offset,
        }
    }

    pub fn eof<K>(&self, kind: K) -> Spanned<K> {
        Spanned {
            kind,
            text: String::new(),
            pos: self.position(),
            span: self.offset..self.offset,
        }
    }

    /// Reject control characters that can never start a token.
    pub fn check_printable(&self) -> Result<(), CompileError> {
        match self.peek() {
            Some(c) if c.is_control() && !c.is_whitespace() => Err(CompileError::Lex {
                position: self.position(),
                text: c.escape_default().to_string(),
            }),
            _ => Ok(()),
        }
    }
}
