//! Vowel-transition parameter lists: `(KEY ["="] INTEGER)*`.

use super::Cursor;
use crate::ast::{VowelParam, VowelTransitionParams};
use crate::error::CompileError;
use crate::lexer::vowel::VowelToken;
use crate::lexer::Spanned;
use std::collections::BTreeMap;

pub fn parse(tokens: &[Spanned<VowelToken>]) -> Result<VowelTransitionParams, CompileError> {
    let mut cur = Cursor::new(tokens);
    let mut values = BTreeMap::new();
    let mut seen = BTreeMap::new();

    while !cur.at_eof() {
        let key_tok = cur.cur();
        let key = match &key_tok.kind {
            VowelToken::Key(k) => *k,
            VowelToken::Literal(word) if word.parse::<i64>().is_err() => {
                return Err(CompileError::UnknownKey {
                    key: word.clone(),
                    position: key_tok.pos,
                });
            }
            _ => return Err(cur.unexpected(&["vowel-transition key"])),
        };
        if let Some(first) = seen.get(&key) {
            return Err(CompileError::DuplicateDefinition {
                kind: "vowel-transition key".to_owned(),
                name: key.as_str().to_owned(),
                position: key_tok.pos,
                first: *first,
            });
        }
        seen.insert(key, key_tok.pos);
        cur.advance();
        cur.eat(&VowelToken::Equals);

        let value_tok = cur.cur();
        let VowelToken::Literal(text) = &value_tok.kind else {
            return Err(cur.unexpected(&["integer"]));
        };
        let value = text.parse::<i32>().map_err(|_| CompileError::InvalidLiteral {
            text: text.clone(),
            expected: "integer".to_owned(),
            position: value_tok.pos,
        })?;
        cur.advance();
        values.insert(key, value);
    }

    Ok(VowelTransitionParams { values })
}
