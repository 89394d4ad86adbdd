//! Phoneme source tables: header, includes, procedures and phonemes.
//!
//! Every open `phoneme`, `procedure`, `IF` and `NextVowelStarts` is kept on
//! a block stack so that a block left open when its enclosing block (or
//! the input) ends is reported with the position that opened it.

use super::Cursor;
use crate::ast::{
    Block, PhonemeDef, PhonemeProperty, PhonemeTable, Position, ProcedureDef, StaticProperty,
};
use crate::error::{CompileError, Diagnostic};
use crate::lexer::phoneme::PhToken;
use crate::lexer::{Spanned, TokenKind};
use crate::options::CompileOptions;
use std::collections::HashMap;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum BlockKind {
    Phoneme,
    Procedure,
    If,
    Switch,
}

#[derive(Debug)]
pub(super) struct OpenBlock {
    kind: BlockKind,
    name: Option<String>,
    opened_at: Position,
}

impl OpenBlock {
    fn describe(&self) -> String {
        let keyword = match self.kind {
            BlockKind::Phoneme => "phoneme",
            BlockKind::Procedure => "procedure",
            BlockKind::If => "IF",
            BlockKind::Switch => "NextVowelStarts",
        };
        match &self.name {
            Some(name) => format!("{} '{}'", keyword, name),
            None => keyword.to_owned(),
        }
    }
}

pub(crate) struct TableParser<'a> {
    pub(super) cur: Cursor<'a, PhToken>,
    pub(super) src: &'a str,
    options: &'a CompileOptions,
    open: Vec<OpenBlock>,
    warnings: Vec<Diagnostic>,
}

const TOP_LEVEL: &[&str] = &["'phonemetable'", "'include'", "'procedure'", "'phoneme'"];

impl<'a> TableParser<'a> {
    fn new(tokens: &'a [Spanned<PhToken>], src: &'a str, options: &'a CompileOptions) -> Self {
        TableParser {
            cur: Cursor::new(tokens),
            src,
            options,
            open: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub(super) fn skip_newlines(&mut self) {
        while self.cur.eat(&PhToken::Newline) {}
    }

    pub(super) fn take_name(&mut self, what: &str) -> Result<String, CompileError> {
        if self.cur.peek().is_word() {
            Ok(self.cur.advance().text.clone())
        } else {
            Err(self.cur.unexpected(&[what]))
        }
    }

    pub(super) fn take_int(&mut self, what: &str) -> Result<i32, CompileError> {
        let tok = self.cur.cur();
        if !tok.kind.is_word() {
            return Err(self.cur.unexpected(&[what]));
        }
        let value = tok
            .text
            .parse::<i32>()
            .map_err(|_| CompileError::InvalidLiteral {
                text: tok.text.clone(),
                expected: "integer".to_owned(),
                position: tok.pos,
            })?;
        self.cur.advance();
        Ok(value)
    }

    pub(super) fn open_block(&mut self, kind: BlockKind, name: Option<&str>, opened_at: Position) {
        self.open.push(OpenBlock {
            kind,
            name: name.map(str::to_owned),
            opened_at,
        });
    }

    pub(super) fn close_block(&mut self, kind: BlockKind) {
        let closed = self.open.pop();
        debug_assert_eq!(closed.map(|b| b.kind), Some(kind));
    }

    /// The innermost open block did not see its closing keyword.
    pub(super) fn unterminated(&self) -> CompileError {
        match self.open.last() {
            Some(block) => CompileError::UnterminatedBlock {
                block: block.describe(),
                opened_at: block.opened_at,
                position: self.cur.position(),
                found: self.cur.cur().describe(),
            },
            None => self.cur.unexpected(TOP_LEVEL),
        }
    }

    fn parse_table(&mut self) -> Result<PhonemeTable, CompileError> {
        let mut header: Option<(String, String, Position)> = None;
        let mut blocks = Vec::new();
        let mut phonemes: HashMap<String, Position> = HashMap::new();
        let mut procedures: HashMap<String, Position> = HashMap::new();

        loop {
            self.skip_newlines();
            let tok = self.cur.cur();
            match &tok.kind {
                PhToken::Eof => break,
                PhToken::PhonemeTable if self.options.root => {
                    self.cur.advance();
                    let name = self.take_name("table name")?;
                    let language = self.take_name("table language")?;
                    if let Some((_, _, first)) = &header {
                        return Err(CompileError::DuplicateDefinition {
                            kind: "phonemetable".to_owned(),
                            name,
                            position: tok.pos,
                            first: *first,
                        });
                    }
                    header = Some((name, language, tok.pos));
                }
                PhToken::Include => {
                    self.cur.advance();
                    let name = self.take_name("table name")?;
                    blocks.push(Block::Include {
                        name,
                        position: tok.pos,
                    });
                }
                PhToken::Procedure => {
                    blocks.push(Block::Procedure(self.parse_procedure(&mut procedures)?));
                }
                PhToken::Phoneme => {
                    blocks.push(Block::Phoneme(self.parse_phoneme(&mut phonemes)?));
                }
                PhToken::PhonemeTable => {
                    // included tables are fragments of their root table
                    return Err(self.cur.unexpected(&TOP_LEVEL[1..]));
                }
                _ => return Err(self.cur.unexpected(TOP_LEVEL)),
            }
        }

        let (name, declared_language) = match header {
            Some((name, language, _)) => (name, Some(language)),
            None => (self.options.table_name.clone().unwrap_or_default(), None),
        };
        Ok(PhonemeTable {
            name,
            declared_language,
            blocks,
        })
    }

    fn open_named(
        &mut self,
        kind: BlockKind,
        seen: &mut HashMap<String, Position>,
    ) -> Result<String, CompileError> {
        let opened_at = self.cur.advance().pos;
        let name = self.take_name(match kind {
            BlockKind::Phoneme => "phoneme name",
            _ => "procedure name",
        })?;
        if let Some(first) = seen.get(&name) {
            return Err(CompileError::DuplicateDefinition {
                kind: match kind {
                    BlockKind::Phoneme => "phoneme".to_owned(),
                    _ => "procedure".to_owned(),
                },
                name,
                position: opened_at,
                first: *first,
            });
        }
        seen.insert(name.clone(), opened_at);
        self.open_block(kind, Some(&name), opened_at);
        Ok(name)
    }

    fn parse_procedure(
        &mut self,
        seen: &mut HashMap<String, Position>,
    ) -> Result<ProcedureDef, CompileError> {
        let name = self.open_named(BlockKind::Procedure, seen)?;
        let mut instructions = Vec::new();
        loop {
            self.skip_newlines();
            match self.cur.peek() {
                PhToken::EndProcedure => {
                    self.cur.advance();
                    break;
                }
                k if k.is_eof() || k.is_block_keyword() => return Err(self.unterminated()),
                _ => instructions.push(self.parse_instruction()?),
            }
        }
        self.close_block(BlockKind::Procedure);
        Ok(ProcedureDef { name, instructions })
    }

    fn parse_phoneme(
        &mut self,
        seen: &mut HashMap<String, Position>,
    ) -> Result<PhonemeDef, CompileError> {
        let name = self.open_named(BlockKind::Phoneme, seen)?;
        let mut properties = Vec::new();
        loop {
            self.skip_newlines();
            let tok = self.cur.cur();
            let prop = match &tok.kind {
                PhToken::EndPhoneme => {
                    self.cur.advance();
                    break;
                }
                k if k.is_eof() || k.is_block_keyword() => return Err(self.unterminated()),
                PhToken::Feature(code) => {
                    self.cur.advance();
                    StaticProperty::Feature(code.clone())
                }
                PhToken::Phonation(code) => {
                    self.cur.advance();
                    StaticProperty::Type(code.clone())
                }
                PhToken::LengthMod => {
                    self.cur.advance();
                    StaticProperty::LengthMod(self.take_int("lengthmod value")?)
                }
                PhToken::StartType => {
                    self.cur.advance();
                    StaticProperty::StartType(self.take_name("start type")?)
                }
                PhToken::EndType => {
                    self.cur.advance();
                    StaticProperty::EndType(self.take_name("end type")?)
                }
                _ => {
                    let instruction = self.parse_instruction()?;
                    properties.push(PhonemeProperty::Instruction(instruction));
                    continue;
                }
            };
            self.push_static(&name, &mut properties, prop, tok.pos);
        }
        self.close_block(BlockKind::Phoneme);
        Ok(PhonemeDef { name, properties })
    }

    /// A repeated static property replaces the earlier one with a warning.
    fn push_static(
        &mut self,
        phoneme: &str,
        properties: &mut Vec<PhonemeProperty>,
        prop: StaticProperty,
        pos: Position,
    ) {
        let key = prop.key();
        let earlier = properties
            .iter()
            .position(|p| matches!(p, PhonemeProperty::Static(s) if s.key() == key));
        if let Some(i) = earlier {
            properties.remove(i);
            let message = format!(
                "duplicate static property '{}' in phoneme '{}', the last value wins",
                key, phoneme
            );
            warn!(line = pos.line, column = pos.column, "{}", message);
            self.warnings.push(Diagnostic::new(pos, message));
        }
        properties.push(PhonemeProperty::Static(prop));
    }
}

/// Build a phoneme table from its tokens. `src` is the text the tokens
/// were lexed from; embedded vowel-transition lists are re-lexed from it.
pub fn parse(
    tokens: &[Spanned<PhToken>],
    src: &str,
    options: &CompileOptions,
) -> Result<(PhonemeTable, Vec<Diagnostic>), CompileError> {
    let mut p = TableParser::new(tokens, src, options);
    let table = p.parse_table()?;
    Ok((table, p.warnings))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Instruction;
    use crate::lexer::phoneme::lex;

    fn parse_src(src: &str) -> Result<(PhonemeTable, Vec<Diagnostic>), CompileError> {
        parse(&lex(src)?, src, &CompileOptions::default())
    }

    fn table(src: &str) -> PhonemeTable {
        parse_src(src).unwrap().0
    }

    #[test]
    fn header_and_blocks() {
        let t = table(
            "phonemetable en base1\ninclude ph_english\n\nprocedure stress\n  RETURN\nendprocedure\nphoneme a\nendphoneme\n",
        );
        assert_eq!(t.name, "en");
        assert_eq!(t.declared_language.as_deref(), Some("base1"));
        assert_eq!(t.blocks.len(), 3);
        assert_eq!(
            t.blocks[0],
            Block::Include {
                name: "ph_english".into(),
                position: Position::new(2, 1)
            }
        );
        assert_eq!(t.procedures().next().map(|p| p.name.as_str()), Some("stress"));
        assert_eq!(
            t.procedures().next().map(|p| p.instructions.clone()),
            Some(vec![Instruction::Return])
        );
    }

    #[test]
    fn headerless_table_uses_configured_name() {
        let src = "phoneme a\nendphoneme";
        let opts = CompileOptions {
            table_name: Some("fragment".into()),
            ..CompileOptions::default()
        };
        let (t, _) = parse(&lex(src).unwrap(), src, &opts).unwrap();
        assert_eq!(t.name, "fragment");
        assert_eq!(t.declared_language, None);
    }

    #[test]
    fn included_tables_cannot_declare_a_header() {
        let src = "phonemetable en base1\n";
        let opts = CompileOptions::default().for_include("ph_x");
        let err = parse(&lex(src).unwrap(), src, &opts).unwrap_err();
        assert!(matches!(err, CompileError::Syntax { .. }));
    }

    #[test]
    fn second_header_is_a_duplicate() {
        let err = parse_src("phonemetable en base1\nphonemetable de base1\n").unwrap_err();
        assert!(matches!(err, CompileError::DuplicateDefinition { .. }));
    }

    #[test]
    fn static_properties_interleave_with_instructions() {
        let t = table("phoneme t\n  vls alv stop\n  lengthmod 2\n  WAV(ustop/t)\n  starttype #t endtype #t\nendphoneme");
        let p = t.phonemes().next().unwrap();
        assert_eq!(
            p.properties,
            vec![
                PhonemeProperty::Static(StaticProperty::Type("vls".into())),
                PhonemeProperty::Static(StaticProperty::Feature("alv".into())),
                PhonemeProperty::Static(StaticProperty::Feature("stop".into())),
                PhonemeProperty::Static(StaticProperty::LengthMod(2)),
                PhonemeProperty::Instruction(Instruction::Wav(crate::ast::WavRef {
                    file: "ustop/t".into(),
                    gain: None
                })),
                PhonemeProperty::Static(StaticProperty::StartType("#t".into())),
                PhonemeProperty::Static(StaticProperty::EndType("#t".into())),
            ]
        );
    }

    #[test]
    fn duplicate_static_property_warns_and_last_wins() {
        let (t, warnings) = parse_src("phoneme a\n  lengthmod 1\n  vcd\n  lengthmod 5\nendphoneme").unwrap();
        let p = t.phonemes().next().unwrap();
        assert_eq!(
            p.properties,
            vec![
                PhonemeProperty::Static(StaticProperty::Type("vcd".into())),
                PhonemeProperty::Static(StaticProperty::LengthMod(5)),
            ]
        );
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].position, Position::new(4, 3));
        assert!(warnings[0].message.contains("lengthmod"));
    }

    #[test]
    fn conflicting_phonation_types() {
        let (t, warnings) = parse_src("phoneme b\n vcd vls\nendphoneme").unwrap();
        assert_eq!(warnings.len(), 1);
        assert_eq!(
            t.phonemes().next().unwrap().properties,
            vec![PhonemeProperty::Static(StaticProperty::Type("vls".into()))]
        );
    }

    #[test]
    fn duplicate_phoneme_name() {
        let err = parse_src("phoneme a\nendphoneme\nphoneme a\nendphoneme").unwrap_err();
        match err {
            CompileError::DuplicateDefinition { kind, first, position, .. } => {
                assert_eq!(kind, "phoneme");
                assert_eq!(first, Position::new(1, 1));
                assert_eq!(position, Position::new(3, 1));
            }
            other => panic!("expected duplicate, got {:?}", other),
        }
    }

    #[test]
    fn duplicate_procedure_name() {
        let err = parse_src("procedure p\nendprocedure\nprocedure p\nendprocedure").unwrap_err();
        assert!(matches!(err, CompileError::DuplicateDefinition { ref kind, .. } if kind == "procedure"));
    }

    #[test]
    fn phoneme_left_open_at_end_of_input() {
        let err = parse_src("phoneme a\n  vwl\n").unwrap_err();
        match err {
            CompileError::UnterminatedBlock { block, opened_at, .. } => {
                assert_eq!(block, "phoneme 'a'");
                assert_eq!(opened_at, Position::new(1, 1));
            }
            other => panic!("expected unterminated block, got {:?}", other),
        }
    }

    #[test]
    fn phoneme_closed_by_wrong_keyword() {
        let err = parse_src("phoneme a\nendprocedure\n").unwrap_err();
        assert!(matches!(err, CompileError::UnterminatedBlock { .. }));
        let err = parse_src("procedure p\nphoneme a\nendphoneme\n").unwrap_err();
        assert!(matches!(err, CompileError::UnterminatedBlock { ref block, .. } if block == "procedure 'p'"));
    }

    #[test]
    fn stray_closer_at_top_level() {
        let err = parse_src("endphoneme\n").unwrap_err();
        assert!(matches!(err, CompileError::Syntax { .. }));
    }

    #[test]
    fn static_property_not_allowed_in_procedure() {
        let err = parse_src("procedure p\n  vwl\nendprocedure").unwrap_err();
        assert!(matches!(err, CompileError::Syntax { .. }));
    }

    #[test]
    fn non_numeric_lengthmod() {
        let err = parse_src("phoneme a\n lengthmod x\nendphoneme").unwrap_err();
        assert!(matches!(err, CompileError::InvalidLiteral { .. }));
    }

    #[test]
    fn empty_table() {
        let t = table("// nothing\n");
        assert!(t.blocks.is_empty());
    }
}
