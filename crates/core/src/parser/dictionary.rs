//! Dictionary rule files: `.replace`, `.Lnn`, `.group` and pronunciation
//! rules.
//!
//! Letter groups and pronunciation rules are line-oriented; `.replace`
//! pairs run until the next directive or the close of the enclosing
//! group. Words are split into atoms by the lexer; the match, the
//! replacement and both sides of a substitution are read back as whole
//! words. A `.group` closes at `.endgroup`,
//! at end of input, at a `.group` that is not indented further than its
//! own, or at any line that starts left of it.

use super::Cursor;
use crate::ast::{Atom, Position, PronunciationRule, Rule, RuleSet, Substitution};
use crate::error::CompileError;
use crate::lexer::dictionary::DictToken;
use crate::lexer::Spanned;
use std::collections::HashMap;

/// An open `.group` header.
#[derive(Clone, Copy)]
struct GroupScope {
    column: u32,
    opened_at: Position,
}

struct DictParser<'t> {
    cur: Cursor<'t, DictToken>,
}

fn to_atom(tok: &Spanned<DictToken>) -> Atom {
    match &tok.kind {
        DictToken::Special(c) => Atom::Special(c.clone()),
        _ => Atom::Literal(tok.text.clone()),
    }
}

type Word<'t> = Vec<&'t Spanned<DictToken>>;

/// Group tokens back into the blank-separated words they were cut from.
fn words<'t>(tokens: &[&'t Spanned<DictToken>]) -> Vec<Word<'t>> {
    let mut words: Vec<Word<'t>> = Vec::new();
    for &tok in tokens {
        match words.last_mut() {
            Some(word) if word.last().map(|t| t.span.end) == Some(tok.span.start) => {
                word.push(tok)
            }
            _ => words.push(vec![tok]),
        }
    }
    words
}

fn word_text(word: &[&Spanned<DictToken>]) -> String {
    word.iter().map(|t| t.text.as_str()).collect()
}

impl<'t> DictParser<'t> {
    /// Is the current token on `line` and not end of input?
    fn on_line(&self, line: u32) -> bool {
        !self.cur.at_eof() && self.cur.position().line == line
    }

    fn expect_line_end(&self, line: u32) -> Result<(), CompileError> {
        if self.on_line(line) {
            Err(self.cur.unexpected(&["end of line"]))
        } else {
            Ok(())
        }
    }

    fn closes(&self, scope: Option<GroupScope>) -> bool {
        let Some(scope) = scope else {
            return false;
        };
        let column = self.cur.position().column;
        match self.cur.peek() {
            DictToken::Eof | DictToken::EndGroup => true,
            DictToken::Group => column <= scope.column,
            _ => column < scope.column,
        }
    }

    fn parse_rules(&mut self, scope: Option<GroupScope>) -> Result<Vec<Rule>, CompileError> {
        let mut rules = Vec::new();
        let mut letter_groups: HashMap<String, Position> = HashMap::new();

        while !self.cur.at_eof() && !self.closes(scope) {
            let tok = self.cur.cur();
            let rule = match &tok.kind {
                DictToken::Replace => self.parse_replace(scope)?,
                DictToken::LetterGroup(id) => {
                    if let Some(first) = letter_groups.get(id) {
                        return Err(CompileError::DuplicateDefinition {
                            kind: "letter group".to_owned(),
                            name: id.clone(),
                            position: tok.pos,
                            first: *first,
                        });
                    }
                    letter_groups.insert(id.clone(), tok.pos);
                    self.parse_letter_group()?
                }
                DictToken::Group => self.parse_group()?,
                DictToken::EndGroup => return Err(self.cur.unexpected(&["rule"])),
                DictToken::Literal(text) if text.starts_with('.') => {
                    return Err(self.cur.unexpected(&["'.replace'", "'.group'", "'.Lnn'"]));
                }
                _ => Rule::Pronunciation(self.parse_pronunciation()?),
            };
            rules.push(rule);
        }
        Ok(rules)
    }

    /// Pairs run until the next directive or until the enclosing group
    /// closes.
    fn parse_replace(&mut self, scope: Option<GroupScope>) -> Result<Rule, CompileError> {
        self.cur.advance();
        let mut tokens: Vec<&Spanned<DictToken>> = Vec::new();
        while self.cur.peek().is_atom() && !self.closes(scope) {
            tokens.push(self.cur.advance());
        }
        let words = words(&tokens);
        if words.is_empty() {
            return Err(self.cur.unexpected(&["substitution"]));
        }
        if !self.cur.peek().is_directive() && !self.cur.at_eof() && !self.closes(scope) {
            return Err(self.cur.unexpected(&["substitution"]));
        }
        if words.len() % 2 != 0 {
            // the unmatched `from` has no `to`
            return Err(self.cur.unexpected(&["replacement literal"]));
        }
        let substitutions = words
            .chunks(2)
            .map(|pair| Substitution {
                from: word_text(&pair[0]),
                to: word_text(&pair[1]),
            })
            .collect();
        Ok(Rule::Replace { substitutions })
    }

    fn parse_letter_group(&mut self) -> Result<Rule, CompileError> {
        let header = self.cur.advance();
        let DictToken::LetterGroup(id) = &header.kind else {
            return Err(CompileError::syntax(header.pos, &["'.Lnn'"], header.describe()));
        };
        let line = header.pos.line;
        let tokens = self.take_atoms(line);
        if self.on_line(line) {
            return Err(self.cur.unexpected(&["letter-group entry"]));
        }
        // adjacent atoms belong to the same entry
        let entries: Vec<Vec<Atom>> = words(&tokens)
            .iter()
            .map(|word| word.iter().map(|t| to_atom(t)).collect())
            .collect();
        if entries.is_empty() {
            return Err(self.cur.unexpected(&["letter-group entry"]));
        }
        Ok(Rule::LetterGroup {
            id: id.clone(),
            entries,
        })
    }

    fn parse_group(&mut self) -> Result<Rule, CompileError> {
        let header = self.cur.advance();
        let line = header.pos.line;
        if !self.on_line(line) || !self.cur.peek().is_atom() {
            return Err(self.cur.unexpected(&["group qualifier"]));
        }
        let tokens = self.take_atoms(line);
        let qualifier = match words(&tokens).as_slice() {
            [word] => word_text(word),
            [_, extra, ..] => {
                let tok = extra[0];
                return Err(CompileError::syntax(tok.pos, &["end of line"], tok.describe()));
            }
            [] => return Err(self.cur.unexpected(&["group qualifier"])),
        };
        self.expect_line_end(line)?;

        let scope = GroupScope {
            column: header.pos.column,
            opened_at: header.pos,
        };
        let rules = self.parse_rules(Some(scope))?;
        if rules.is_empty() {
            if self.cur.at_eof() {
                return Err(CompileError::UnterminatedBlock {
                    block: format!(".group {}", qualifier),
                    opened_at: scope.opened_at,
                    position: self.cur.position(),
                    found: self.cur.cur().describe(),
                });
            }
            return Err(self.cur.unexpected(&["rule"]));
        }
        if self.cur.peek() == &DictToken::EndGroup {
            let end_line = self.cur.advance().pos.line;
            self.expect_line_end(end_line)?;
        }
        Ok(Rule::Group {
            qualifier,
            body: RuleSet { rules },
        })
    }

    /// Context atoms up to a parenthesis or the end of `line`.
    fn take_atoms(&mut self, line: u32) -> Vec<&'t Spanned<DictToken>> {
        let mut atoms = Vec::new();
        while self.on_line(line) && self.cur.peek().is_atom() {
            atoms.push(self.cur.advance());
        }
        atoms
    }

    /// `[pre ")"] MATCH ["(" post] REPLACEMENT` on a single line.
    fn parse_pronunciation(&mut self) -> Result<PronunciationRule, CompileError> {
        let line = self.cur.position().line;
        let first = self.take_atoms(line);

        let (pre_context, rest) = if self.on_line(line) && self.cur.peek() == &DictToken::RParen {
            if first.is_empty() {
                return Err(self.cur.unexpected(&["pre-context"]));
            }
            self.cur.advance();
            let pre = first.iter().map(|t| to_atom(t)).collect();
            (Some(pre), self.take_atoms(line))
        } else {
            (None, first)
        };

        // the match and the replacement are whole words
        let rest = words(&rest);
        let Some(match_word) = rest.first() else {
            return Err(self.cur.unexpected(&["match literal"]));
        };
        let match_text = word_text(match_word);

        if rest.len() == 1 && self.on_line(line) && self.cur.peek() == &DictToken::LParen {
            self.cur.advance();
            let mut post = words(&self.take_atoms(line));
            if self.on_line(line) {
                return Err(self.cur.unexpected(&["post-context", "replacement literal"]));
            }
            let replacement = post.pop();
            let (Some(replacement), false) = (replacement, post.is_empty()) else {
                return Err(self.cur.unexpected(&["post-context", "replacement literal"]));
            };
            return Ok(PronunciationRule {
                pre_context,
                match_text,
                post_context: Some(post.iter().flatten().map(|t| to_atom(t)).collect()),
                replacement: word_text(&replacement),
            });
        }

        match rest.len() {
            1 => Err(self.cur.unexpected(&["replacement literal", "'('"])),
            2 => {
                self.expect_line_end(line)?;
                Ok(PronunciationRule {
                    pre_context,
                    match_text,
                    post_context: None,
                    replacement: word_text(&rest[1]),
                })
            }
            _ => {
                let extra = rest[2][0];
                Err(CompileError::syntax(extra.pos, &["end of line"], extra.describe()))
            }
        }
    }
}

/// Build the rule tree of a dictionary file (one or more rules).
pub fn parse(tokens: &[Spanned<DictToken>]) -> Result<RuleSet, CompileError> {
    let mut p = DictParser {
        cur: Cursor::new(tokens),
    };
    let rules = p.parse_rules(None)?;
    if !p.cur.at_eof() {
        // `.endgroup` with no open group
        return Err(p.cur.unexpected(&["rule"]));
    }
    if rules.is_empty() {
        return Err(p.cur.unexpected(&["rule"]));
    }
    Ok(RuleSet { rules })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::SpecialChar;
    use crate::lexer::dictionary::lex;

    fn parse_src(src: &str) -> Result<RuleSet, CompileError> {
        parse(&lex(src)?)
    }

    fn pron(src: &str) -> PronunciationRule {
        match parse_src(src).unwrap().rules.remove(0) {
            Rule::Pronunciation(r) => r,
            other => panic!("expected pronunciation rule, got {:?}", other),
        }
    }

    #[test]
    fn replace_pairs_across_lines() {
        let set = parse_src(".replace\n  ô o\n  ö o\n  ß ss\n").unwrap();
        let Rule::Replace { substitutions } = &set.rules[0] else {
            panic!("expected replace");
        };
        assert_eq!(substitutions.len(), 3);
        assert_eq!(substitutions[2].from, "ß");
        assert_eq!(substitutions[2].to, "ss");
    }

    #[test]
    fn replace_words_starting_with_wildcard_letters() {
        let set = parse_src(".replace x Ab y Ac\n  _q -r L01s Cz\n").unwrap();
        let Rule::Replace { substitutions } = &set.rules[0] else {
            panic!("expected replace");
        };
        let pairs: Vec<(&str, &str)> = substitutions
            .iter()
            .map(|s| (s.from.as_str(), s.to.as_str()))
            .collect();
        assert_eq!(
            pairs,
            vec![("x", "Ab"), ("y", "Ac"), ("_q", "-r"), ("L01s", "Cz")]
        );
    }

    #[test]
    fn replace_inside_group_ends_at_dedent() {
        let src = "\
.group a
   .group ab
     .replace
       ä ae
  b c
";
        let set = parse_src(src).unwrap();
        let Rule::Group { body, .. } = &set.rules[0] else {
            panic!("expected group");
        };
        // `b c` is left of `.group ab`: it closes the pairs and the group
        assert_eq!(body.rules.len(), 2);
        let Rule::Group { body: inner, .. } = &body.rules[0] else {
            panic!("expected nested group");
        };
        let Rule::Replace { substitutions } = &inner.rules[0] else {
            panic!("expected replace");
        };
        assert_eq!(substitutions.len(), 1);
        assert!(matches!(&body.rules[1], Rule::Pronunciation(r) if r.match_text == "b"));
    }

    #[test]
    fn replace_inside_nested_group_ends_at_endgroup() {
        let src = ".group a\n  .group ab\n    .replace ä ae\n.endgroup\n  b c\n";
        let set = parse_src(src).unwrap();
        let Rule::Group { body, .. } = &set.rules[0] else {
            panic!("expected group");
        };
        let Rule::Group { body: inner, .. } = &body.rules[0] else {
            panic!("expected nested group");
        };
        assert_eq!(inner.rules.len(), 1);
        assert!(matches!(body.rules[1], Rule::Pronunciation(_)));
    }

    #[test]
    fn odd_replace_reports_following_position() {
        let err = parse_src(".replace a b c\n.group x\n y z").unwrap_err();
        assert_eq!(err.position(), Some(Position::new(2, 1)));
    }

    #[test]
    fn empty_replace_is_rejected() {
        assert!(matches!(
            parse_src(".replace\n.group a\n b c").unwrap_err(),
            CompileError::Syntax { .. }
        ));
    }

    #[test]
    fn letter_group_entries_keep_wildcards() {
        let set = parse_src(".L02 _a ou A\n").unwrap();
        let Rule::LetterGroup { id, entries } = &set.rules[0] else {
            panic!("expected letter group");
        };
        assert_eq!(id, "02");
        assert_eq!(
            entries,
            &vec![
                vec![Atom::Special(SpecialChar::WordBoundary), Atom::literal("a")],
                vec![Atom::literal("ou")],
                vec![Atom::Special(SpecialChar::AnyVowel)],
            ]
        );
    }

    #[test]
    fn duplicate_letter_group_in_same_scope() {
        let err = parse_src(".L01 a\n.L01 b\n").unwrap_err();
        assert!(matches!(err, CompileError::DuplicateDefinition { ref name, .. } if name == "01"));
    }

    #[test]
    fn same_letter_group_id_in_different_scopes() {
        let src = ".L01 a\n.group x\n  .L01 b\n  x ks\n";
        assert!(parse_src(src).is_ok());
    }

    #[test]
    fn empty_letter_group() {
        assert!(parse_src(".L01\n.group a\n a b").is_err());
    }

    #[test]
    fn full_context_rule() {
        let r = pron("_ C ) ough ( t _ Of");
        assert_eq!(
            r.pre_context,
            Some(vec![
                Atom::Special(SpecialChar::WordBoundary),
                Atom::Special(SpecialChar::AnyConsonant)
            ])
        );
        assert_eq!(r.match_text, "ough");
        assert_eq!(
            r.post_context,
            Some(vec![Atom::literal("t"), Atom::Special(SpecialChar::WordBoundary)])
        );
        assert_eq!(r.replacement, "Of");
    }

    #[test]
    fn rule_without_context() {
        let r = pron("ph f");
        assert_eq!(r.pre_context, None);
        assert_eq!(r.post_context, None);
        assert_eq!(r.match_text, "ph");
        assert_eq!(r.replacement, "f");
    }

    #[test]
    fn special_in_match_position_reads_as_text() {
        let r = pron("A eI");
        assert_eq!(r.match_text, "A");
    }

    #[test]
    fn language_qualifier_in_post_context() {
        let r = pron("x ( _^_EN _^_EN");
        assert_eq!(
            r.post_context,
            Some(vec![Atom::Special(SpecialChar::LanguageQualifier("EN".into()))])
        );
        assert_eq!(r.replacement, "_^_EN");
    }

    #[test]
    fn replacement_starting_with_vowel_wildcard() {
        let r = pron("ar A:");
        assert_eq!(r.match_text, "ar");
        assert_eq!(r.replacement, "A:");

        let r = pron("_ ) Ch ( e Cel");
        assert_eq!(r.match_text, "Ch");
        assert_eq!(r.post_context, Some(vec![Atom::literal("e")]));
        assert_eq!(r.replacement, "Cel");
    }

    #[test]
    fn group_qualifier_is_one_word() {
        let set = parse_src(".group Ab\n  a b\n").unwrap();
        assert!(matches!(&set.rules[0], Rule::Group { qualifier, .. } if qualifier == "Ab"));
        let err = parse_src(".group a b\n  a b\n").unwrap_err();
        assert_eq!(err.position(), Some(Position::new(1, 10)));
    }

    #[test]
    fn rule_missing_replacement() {
        let err = parse_src("a (b\n").unwrap_err();
        assert!(matches!(err, CompileError::Syntax { .. }));
        let err = parse_src("ab\n").unwrap_err();
        assert!(matches!(err, CompileError::Syntax { .. }));
    }

    #[test]
    fn rule_with_extra_tokens() {
        let err = parse_src("a b c\n").unwrap_err();
        assert_eq!(err.position(), Some(Position::new(1, 5)));
    }

    #[test]
    fn empty_pre_context() {
        assert!(parse_src(") a b").is_err());
    }

    #[test]
    fn group_nesting_by_indentation() {
        let src = "\
.group a
  a (b x
  .group ab
    b y
  c z
.group b
  b b
";
        let set = parse_src(src).unwrap();
        assert_eq!(set.rules.len(), 2);
        let Rule::Group { qualifier, body } = &set.rules[0] else {
            panic!("expected group");
        };
        assert_eq!(qualifier, "a");
        // `c z` is not left of `.group ab`, so it stays in the nested group
        assert_eq!(body.rules.len(), 2);
        let Rule::Group { qualifier, body: inner } = &body.rules[1] else {
            panic!("expected nested group");
        };
        assert_eq!(qualifier, "ab");
        assert_eq!(inner.rules.len(), 2);
    }

    #[test]
    fn dedent_closes_nested_group() {
        let src = "\
.group a
   .group ab
      b y
  c z
";
        let set = parse_src(src).unwrap();
        let Rule::Group { body, .. } = &set.rules[0] else {
            panic!("expected group");
        };
        assert_eq!(body.rules.len(), 2);
        assert!(matches!(body.rules[1], Rule::Pronunciation(_)));
    }

    #[test]
    fn explicit_endgroup() {
        let set = parse_src(".group a\n a b\n.endgroup\nx y\n").unwrap();
        assert_eq!(set.rules.len(), 2);
        assert!(matches!(set.rules[1], Rule::Pronunciation(_)));
    }

    #[test]
    fn stray_endgroup() {
        assert!(matches!(
            parse_src("a b\n.endgroup\n").unwrap_err(),
            CompileError::Syntax { .. }
        ));
    }

    #[test]
    fn group_without_rules() {
        let err = parse_src(".group a\n").unwrap_err();
        assert!(matches!(err, CompileError::UnterminatedBlock { .. }));
        let err = parse_src(".group a\n.group b\n b c").unwrap_err();
        assert!(matches!(err, CompileError::Syntax { .. }));
        let err = parse_src(".group\n").unwrap_err();
        assert!(matches!(err, CompileError::Syntax { .. }));
    }

    #[test]
    fn unknown_directive() {
        assert!(parse_src(".grop a\n a b").is_err());
    }

    #[test]
    fn empty_file_has_no_rules() {
        assert!(parse_src("// nothing here\n").is_err());
    }
}
