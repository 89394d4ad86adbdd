//! Tokens of vowel-transition parameter lists (`len=150 rate -20`).

use super::{Newlines, Scanner, Spanned, TokenKind};
use crate::ast::{Position, VowelParam};
use crate::error::CompileError;

#[derive(Debug, Clone, PartialEq)]
pub enum VowelToken {
    Key(VowelParam),
    Equals,
    Literal(String),
    Eof,
}

impl TokenKind for VowelToken {
    fn is_eof(&self) -> bool {
        matches!(self, VowelToken::Eof)
    }
}

pub fn lex(src: &str) -> Result<Vec<Spanned<VowelToken>>, CompileError> {
    lex_at(src, Position::new(1, 1))
}

/// Lex a parameter list embedded at `origin` in an enclosing file.
pub fn lex_at(src: &str, origin: Position) -> Result<Vec<Spanned<VowelToken>>, CompileError> {
    let mut s = Scanner::with_origin(src, origin);
    let mut tokens = Vec::new();
    loop {
        s.skip_trivia(Newlines::Skip);
        let Some(c) = s.peek() else {
            tokens.push(s.eof(VowelToken::Eof));
            return Ok(tokens);
        };
        if c == '=' {
            tokens.push(s.token(VowelToken::Equals, 1));
            continue;
        }
        s.check_printable()?;
        let len = s.word_len(|c| c == '=');
        let word = &s.rest()[..len];
        let kind = VowelParam::from_keyword(word)
            .map(VowelToken::Key)
            .unwrap_or_else(|| VowelToken::Literal(word.to_owned()));
        tokens.push(s.token(kind, len));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn longest_key_wins() {
        let kinds: Vec<_> = lex("lenadd=3 len=1")
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect();
        assert_eq!(
            kinds,
            vec![
                VowelToken::Key(VowelParam::LenAdd),
                VowelToken::Equals,
                VowelToken::Literal("3".into()),
                VowelToken::Key(VowelParam::Len),
                VowelToken::Equals,
                VowelToken::Literal("1".into()),
                VowelToken::Eof
            ]
        );
    }

    #[test]
    fn embedded_positions() {
        let toks = lex_at("rate -20", Position::new(3, 10)).unwrap();
        assert_eq!(toks[1].pos, Position::new(3, 15));
    }
}
