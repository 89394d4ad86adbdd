//! Condition expressions after `IF` and `ELIF`.
//!
//! `NOT` binds tighter than `AND`, which binds tighter than `OR`; both
//! binary operators are left-associative. Parentheses group. Newlines
//! inside a condition are ignored.

use super::phoneme::TableParser;
use crate::ast::ConditionExpr;
use crate::error::CompileError;
use crate::lexer::phoneme::PhToken;

impl<'a> TableParser<'a> {
    pub(super) fn parse_condition(&mut self) -> Result<ConditionExpr, CompileError> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> Result<ConditionExpr, CompileError> {
        let mut left = self.parse_and()?;
        loop {
            self.skip_newlines();
            if !self.cur.eat(&PhToken::Or) {
                return Ok(left);
            }
            let right = self.parse_and()?;
            left = ConditionExpr::Or(Box::new(left), Box::new(right));
        }
    }

    fn parse_and(&mut self) -> Result<ConditionExpr, CompileError> {
        let mut left = self.parse_unary()?;
        loop {
            self.skip_newlines();
            if !self.cur.eat(&PhToken::And) {
                return Ok(left);
            }
            let right = self.parse_unary()?;
            left = ConditionExpr::And(Box::new(left), Box::new(right));
        }
    }

    fn parse_unary(&mut self) -> Result<ConditionExpr, CompileError> {
        self.skip_newlines();
        if self.cur.eat(&PhToken::Not) {
            let operand = self.parse_unary()?;
            return Ok(ConditionExpr::Not(Box::new(operand)));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<ConditionExpr, CompileError> {
        match self.cur.peek() {
            PhToken::Condition(name) => {
                self.cur.advance();
                self.cur.expect(&PhToken::LParen, "'('")?;
                let attribute = self.take_name("phoneme attribute")?;
                self.cur.expect(&PhToken::RParen, "')'")?;
                Ok(ConditionExpr::Predicate {
                    name: name.clone(),
                    attribute,
                })
            }
            PhToken::FlagCondition(name) => {
                self.cur.advance();
                Ok(ConditionExpr::Flag { name: name.clone() })
            }
            PhToken::LParen => {
                self.cur.advance();
                let inner = self.parse_or()?;
                self.skip_newlines();
                self.cur.expect(&PhToken::RParen, "')'")?;
                Ok(inner)
            }
            _ => Err(self.cur.unexpected(&["condition"])),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::{Block, ConditionExpr, Instruction, PhonemeProperty};
    use crate::error::CompileError;
    use crate::lexer::phoneme::lex;
    use crate::options::CompileOptions;
    use crate::parser::phoneme::parse;

    fn condition(cond: &str) -> Result<ConditionExpr, CompileError> {
        let src = format!("phoneme x\nIF {} THEN\nENDIF\nendphoneme\n", cond);
        let (table, _) = parse(&lex(&src)?, &src, &CompileOptions::default())?;
        match &table.blocks[0] {
            Block::Phoneme(p) => match &p.properties[0] {
                PhonemeProperty::Instruction(Instruction::Conditional(c)) => {
                    Ok(c.if_branch.condition.clone())
                }
                other => panic!("expected conditional, got {:?}", other),
            },
            other => panic!("expected phoneme, got {:?}", other),
        }
    }

    fn not(e: ConditionExpr) -> ConditionExpr {
        ConditionExpr::Not(Box::new(e))
    }

    fn and(a: ConditionExpr, b: ConditionExpr) -> ConditionExpr {
        ConditionExpr::And(Box::new(a), Box::new(b))
    }

    fn or(a: ConditionExpr, b: ConditionExpr) -> ConditionExpr {
        ConditionExpr::Or(Box::new(a), Box::new(b))
    }

    #[test]
    fn single_predicate() {
        assert_eq!(
            condition("nextPh(isVowel)").unwrap(),
            ConditionExpr::predicate("nextPh", "isVowel")
        );
    }

    #[test]
    fn and_binds_tighter_than_or() {
        let a = ConditionExpr::predicate("thisPh", "isStressed");
        let b = ConditionExpr::flag("KlattSynth");
        let c = ConditionExpr::predicate("prevPh", "isPause");
        assert_eq!(
            condition("thisPh(isStressed) OR KlattSynth AND prevPh(isPause)").unwrap(),
            or(a.clone(), and(b.clone(), c.clone()))
        );
        assert_eq!(
            condition("thisPh(isStressed) AND KlattSynth OR prevPh(isPause)").unwrap(),
            or(and(a, b), c)
        );
    }

    #[test]
    fn not_binds_tightest() {
        let a = ConditionExpr::predicate("nextPh", "isVowel");
        let b = ConditionExpr::flag("PreVoicing");
        assert_eq!(
            condition("NOT nextPh(isVowel) AND PreVoicing").unwrap(),
            and(not(a.clone()), b.clone())
        );
        assert_eq!(
            condition("NOT NOT PreVoicing").unwrap(),
            not(not(b.clone()))
        );
        assert_eq!(
            condition("NOT (nextPh(isVowel) AND PreVoicing)").unwrap(),
            not(and(a, b))
        );
    }

    #[test]
    fn left_associative() {
        let a = ConditionExpr::flag("KlattSynth");
        let b = ConditionExpr::flag("PreVoicing");
        let c = ConditionExpr::predicate("thisPh", "isWordEnd");
        assert_eq!(
            condition("KlattSynth OR PreVoicing OR thisPh(isWordEnd)").unwrap(),
            or(or(a, b), c)
        );
    }

    #[test]
    fn condition_may_span_lines() {
        let got = condition("nextPh(isPause)\n  OR nextPh(isNasal)").unwrap();
        assert_eq!(got.to_string(), "nextPh(isPause) OR nextPh(isNasal)");
    }

    #[test]
    fn missing_operand() {
        assert!(matches!(
            condition("KlattSynth AND").unwrap_err(),
            CompileError::Syntax { .. }
        ));
        assert!(matches!(
            condition("NOT").unwrap_err(),
            CompileError::Syntax { .. }
        ));
    }

    #[test]
    fn unbalanced_parentheses() {
        assert!(condition("(KlattSynth").is_err());
        assert!(condition("thisPh(isVowel").is_err());
    }

    #[test]
    fn bare_word_is_not_a_condition() {
        let err = condition("isVowel").unwrap_err();
        assert_eq!(err.to_string(), "2:4: expected condition, found 'isVowel'");
    }
}
