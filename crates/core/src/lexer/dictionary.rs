//! Tokens of dictionary rule files.
//!
//! Recognition order at each scanner position: directives, parentheses,
//! `_^_` language qualifiers and `Lnn` letter-group references, the
//! single-character wildcards, and finally the catch-all literal.

use super::{Newlines, Scanner, Spanned, TokenKind};
use crate::ast::SpecialChar;
use crate::error::CompileError;

#[derive(Debug, Clone, PartialEq)]
pub enum DictToken {
    Replace,
    /// `.Lnn`, with the two digits decoded.
    LetterGroup(String),
    Group,
    EndGroup,
    LParen,
    RParen,
    Special(SpecialChar),
    Literal(String),
    Eof,
}

impl DictToken {
    pub fn is_directive(&self) -> bool {
        matches!(
            self,
            DictToken::Replace | DictToken::LetterGroup(_) | DictToken::Group | DictToken::EndGroup
        )
    }

    /// Tokens that may stand for plain text.
    pub fn is_atom(&self) -> bool {
        matches!(self, DictToken::Special(_) | DictToken::Literal(_))
    }
}

impl TokenKind for DictToken {
    fn is_eof(&self) -> bool {
        matches!(self, DictToken::Eof)
    }
}

const LANGUAGE_PREFIX: &str = "_^_";

fn is_delimiter(c: char) -> bool {
    c == '(' || c == ')'
}

fn two_digits(s: &str) -> Option<&str> {
    let digits = s.get(..2)?;
    digits
        .chars()
        .all(|c| c.is_ascii_digit())
        .then_some(digits)
}

fn directive(word: &str) -> Option<DictToken> {
    match word {
        ".replace" => Some(DictToken::Replace),
        ".group" => Some(DictToken::Group),
        ".endgroup" => Some(DictToken::EndGroup),
        _ => {
            let rest = word.strip_prefix(".L")?;
            (rest.len() == 2)
                .then(|| two_digits(rest))
                .flatten()
                .map(|id| DictToken::LetterGroup(id.to_owned()))
        }
    }
}

fn next_token(s: &mut Scanner<'_>) -> Result<Spanned<DictToken>, CompileError> {
    s.check_printable()?;
    let rest = s.rest();

    if rest.starts_with('.') {
        let len = s.word_len(is_delimiter);
        if let Some(kind) = directive(&rest[..len]) {
            return Ok(s.token(kind, len));
        }
    }

    match s.peek() {
        Some('(') => return Ok(s.token(DictToken::LParen, 1)),
        Some(')') => return Ok(s.token(DictToken::RParen, 1)),
        _ => {}
    }

    if let Some(after) = rest.strip_prefix(LANGUAGE_PREFIX) {
        let code_len = after
            .char_indices()
            .find(|&(_, c)| !c.is_ascii_alphabetic())
            .map(|(i, _)| i)
            .unwrap_or(after.len());
        if code_len > 0 {
            let code = after[..code_len].to_owned();
            return Ok(s.token(
                DictToken::Special(SpecialChar::LanguageQualifier(code)),
                LANGUAGE_PREFIX.len() + code_len,
            ));
        }
    }

    if let Some(id) = rest.strip_prefix('L').and_then(two_digits) {
        let kind = DictToken::Special(SpecialChar::LetterGroupRef(id.to_owned()));
        return Ok(s.token(kind, 3));
    }

    let special = match s.peek() {
        Some('_') => Some(SpecialChar::WordBoundary),
        Some('-') => Some(SpecialChar::Hyphen),
        Some('A') => Some(SpecialChar::AnyVowel),
        Some('C') => Some(SpecialChar::AnyConsonant),
        _ => None,
    };
    if let Some(c) = special {
        return Ok(s.token(DictToken::Special(c), 1));
    }

    let len = s.word_len(is_delimiter);
    let text = rest[..len].to_owned();
    Ok(s.token(DictToken::Literal(text), len))
}

pub fn lex(src: &str) -> Result<Vec<Spanned<DictToken>>, CompileError> {
    let mut s = Scanner::new(src);
    let mut tokens = Vec::new();
    loop {
        s.skip_trivia(Newlines::Skip);
        if s.at_end() {
            tokens.push(s.eof(DictToken::Eof));
            return Ok(tokens);
        }
        tokens.push(next_token(&mut s)?);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<DictToken> {
        lex(src).unwrap().into_iter().map(|t| t.kind).collect()
    }

    fn lit(s: &str) -> DictToken {
        DictToken::Literal(s.to_owned())
    }

    #[test]
    fn directives_and_letter_group_ids() {
        assert_eq!(
            kinds(".replace .group .L07 .endgroup"),
            vec![
                DictToken::Replace,
                DictToken::Group,
                DictToken::LetterGroup("07".into()),
                DictToken::EndGroup,
                DictToken::Eof
            ]
        );
    }

    #[test]
    fn directives_match_whole_words_only() {
        assert_eq!(kinds(".replaced"), vec![lit(".replaced"), DictToken::Eof]);
        assert_eq!(kinds(".L123"), vec![lit(".L123"), DictToken::Eof]);
    }

    #[test]
    fn wildcards_only_split_at_token_start() {
        assert_eq!(
            kinds("_C a_"),
            vec![
                DictToken::Special(SpecialChar::WordBoundary),
                DictToken::Special(SpecialChar::AnyConsonant),
                lit("a_"),
                DictToken::Eof
            ]
        );
    }

    #[test]
    fn language_qualifier_is_decoded() {
        assert_eq!(
            kinds("_^_EN"),
            vec![
                DictToken::Special(SpecialChar::LanguageQualifier("EN".into())),
                DictToken::Eof
            ]
        );
        // Without a code the prefix is an ordinary word boundary.
        assert_eq!(kinds("_^_")[0], DictToken::Special(SpecialChar::WordBoundary));
    }

    #[test]
    fn letter_group_reference() {
        assert_eq!(
            kinds("L01e"),
            vec![
                DictToken::Special(SpecialChar::LetterGroupRef("01".into())),
                lit("e"),
                DictToken::Eof
            ]
        );
    }

    #[test]
    fn parentheses_end_literals() {
        assert_eq!(
            kinds("ab)c(d"),
            vec![
                lit("ab"),
                DictToken::RParen,
                lit("c"),
                DictToken::LParen,
                lit("d"),
                DictToken::Eof
            ]
        );
    }

    #[test]
    fn positions_follow_lines() {
        let toks = lex("// c\n.group a\n  x y").unwrap();
        assert_eq!(toks[0].pos.line, 2);
        assert_eq!(toks[2].pos.line, 3);
        assert_eq!(toks[2].pos.column, 3);
    }
}
