//! Recursive-descent parsers for the three formats.
//!
//! Each parser walks a token vector that always ends in an end-of-input
//! token; [`Cursor`] holds the shared navigation helpers.

use crate::ast::Position;
use crate::error::CompileError;
use crate::lexer::{Spanned, TokenKind};

pub mod conditions;
pub mod dictionary;
pub mod instructions;
pub mod phoneme;
pub mod vowel;

pub(crate) struct Cursor<'t, K> {
    tokens: &'t [Spanned<K>],
    pos: usize,
}

impl<'t, K: TokenKind + PartialEq> Cursor<'t, K> {
    pub(crate) fn new(tokens: &'t [Spanned<K>]) -> Self {
        debug_assert!(tokens.last().map_or(false, |t| t.kind.is_eof()));
        Cursor { tokens, pos: 0 }
    }

    pub(crate) fn cur(&self) -> &'t Spanned<K> {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    pub(crate) fn peek(&self) -> &'t K {
        &self.cur().kind
    }

    pub(crate) fn position(&self) -> Position {
        self.cur().pos
    }

    pub(crate) fn at_eof(&self) -> bool {
        self.peek().is_eof()
    }

    pub(crate) fn advance(&mut self) -> &'t Spanned<K> {
        let t = self.cur();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        t
    }

    /// Consume the current token if it is `kind`.
    pub(crate) fn eat(&mut self, kind: &K) -> bool {
        if self.peek() == kind {
            self.advance();
            true
        } else {
            false
        }
    }

    pub(crate) fn expect(&mut self, kind: &K, shown: &str) -> Result<&'t Spanned<K>, CompileError> {
        if self.peek() == kind {
            Ok(self.advance())
        } else {
            Err(self.unexpected(&[shown]))
        }
    }

    /// A syntax error at the current token.
    pub(crate) fn unexpected(&self, expected: &[&str]) -> CompileError {
        CompileError::syntax(self.position(), expected, self.cur().describe())
    }
}
