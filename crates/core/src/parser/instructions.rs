//! Instruction grammar shared by phoneme and procedure bodies.

use super::phoneme::{BlockKind, TableParser};
use super::vowel;
use crate::ast::{
    Branch, Conditional, Instruction, VowelModKind, VowelModification, VowelTransitionParams,
    WavRef,
};
use crate::error::CompileError;
use crate::lexer::phoneme::PhToken;
use crate::lexer::{self, TokenKind};

impl<'a> TableParser<'a> {
    pub(super) fn parse_instruction(&mut self) -> Result<Instruction, CompileError> {
        let instruction = match self.cur.peek() {
            PhToken::Length => {
                self.cur.advance();
                Instruction::SetLength(self.take_int("length value")?)
            }
            PhToken::Ipa => {
                self.cur.advance();
                Instruction::SetIpa(self.take_name("IPA string")?)
            }
            PhToken::Call => {
                self.cur.advance();
                Instruction::Call(self.take_name("procedure name")?)
            }
            PhToken::Return => {
                self.cur.advance();
                Instruction::Return
            }
            PhToken::Fmt => {
                self.cur.advance();
                self.cur.expect(&PhToken::LParen, "'('")?;
                let wav_ref = self.take_name("formant data name")?;
                self.cur.expect(&PhToken::RParen, "')'")?;
                let add_wav = if self.cur.eat(&PhToken::AddWav) {
                    Some(self.parse_wav_args()?)
                } else {
                    None
                };
                Instruction::Formant { wav_ref, add_wav }
            }
            PhToken::Wav => {
                self.cur.advance();
                Instruction::Wav(self.parse_wav_args()?)
            }
            PhToken::AddWav => {
                self.cur.advance();
                Instruction::AddWav(self.parse_wav_args()?)
            }
            PhToken::VowelTransition(direction) => {
                self.cur.advance();
                Instruction::VowelTransition {
                    direction: *direction,
                    params: self.parse_vowel_params()?,
                }
            }
            PhToken::VowelModification(kind) => {
                self.cur.advance();
                Instruction::VowelModification(self.parse_vowel_modification(*kind)?)
            }
            PhToken::NextVowelStarts => self.parse_switch()?,
            PhToken::PhonemeChange(kind) => {
                self.cur.advance();
                self.cur.expect(&PhToken::LParen, "'('")?;
                let target = self.take_name("phoneme name")?;
                self.cur.expect(&PhToken::RParen, "')'")?;
                Instruction::ChangePhoneme {
                    kind: *kind,
                    target,
                }
            }
            PhToken::If => Instruction::Conditional(self.parse_conditional()?),
            _ => return Err(self.cur.unexpected(&["instruction"])),
        };
        Ok(instruction)
    }

    /// `"(" FILE ["," GAIN] ")"`
    fn parse_wav_args(&mut self) -> Result<WavRef, CompileError> {
        self.cur.expect(&PhToken::LParen, "'('")?;
        let file = self.take_name("wave file name")?;
        let gain = if self.cur.eat(&PhToken::Comma) {
            Some(self.take_int("gain")?)
        } else {
            None
        };
        self.cur.expect(&PhToken::RParen, "')'")?;
        Ok(WavRef { file, gain })
    }

    /// The literals after `Vowelin`/`Vowelout` on the same line, compiled by
    /// the vowel-transition parser from their exact source text.
    fn parse_vowel_params(&mut self) -> Result<VowelTransitionParams, CompileError> {
        let first = self.cur.cur();
        let mut last = None;
        while matches!(self.cur.peek(), PhToken::Literal(_)) {
            last = Some(self.cur.advance());
        }
        let Some(last) = last else {
            return Ok(VowelTransitionParams::default());
        };
        let text = &self.src[first.span.start..last.span.end];
        let tokens = lexer::vowel::lex_at(text, first.pos)?;
        vowel::parse(&tokens)
    }

    fn parse_vowel_modification(
        &mut self,
        kind: VowelModKind,
    ) -> Result<VowelModification, CompileError> {
        self.cur.expect(&PhToken::LParen, "'('")?;
        let mut args = vec![self.take_name("argument")?];
        while self.cur.eat(&PhToken::Comma) {
            args.push(self.take_name("argument")?);
        }
        self.cur.expect(&PhToken::RParen, "')'")?;
        Ok(VowelModification { kind, args })
    }

    /// `NextVowelStarts (VowelStart|VowelEnding)* EndSwitch`
    fn parse_switch(&mut self) -> Result<Instruction, CompileError> {
        let opened_at = self.cur.advance().pos;
        self.open_block(BlockKind::Switch, None, opened_at);
        let mut cases = Vec::new();
        loop {
            self.skip_newlines();
            match self.cur.peek() {
                PhToken::EndSwitch => {
                    self.cur.advance();
                    break;
                }
                PhToken::VowelModification(kind) => {
                    self.cur.advance();
                    cases.push(self.parse_vowel_modification(*kind)?);
                }
                k if k.is_eof()
                    || k.is_block_keyword()
                    || matches!(k, PhToken::Elif | PhToken::Else | PhToken::EndIf) =>
                {
                    return Err(self.unterminated())
                }
                _ => {
                    return Err(self.cur.unexpected(&[
                        "'VowelStart'",
                        "'VowelEnding'",
                        "'EndSwitch'",
                    ]))
                }
            }
        }
        self.close_block(BlockKind::Switch);
        Ok(Instruction::NextVowelSwitch { cases })
    }

    /// `IF cond THEN body (ELIF cond THEN body)* (ELSE body)? ENDIF`
    fn parse_conditional(&mut self) -> Result<Conditional, CompileError> {
        let opened_at = self.cur.advance().pos;
        self.open_block(BlockKind::If, None, opened_at);
        let if_branch = self.parse_branch()?;
        let mut elif_branches = Vec::new();
        let mut else_branch = None;
        loop {
            match self.cur.peek() {
                PhToken::Elif if else_branch.is_none() => {
                    self.cur.advance();
                    elif_branches.push(self.parse_branch()?);
                }
                PhToken::Else if else_branch.is_none() => {
                    self.cur.advance();
                    else_branch = Some(self.parse_body()?);
                }
                PhToken::EndIf => {
                    self.cur.advance();
                    break;
                }
                _ => return Err(self.cur.unexpected(&["'ENDIF'"])),
            }
        }
        self.close_block(BlockKind::If);
        Ok(Conditional {
            if_branch,
            elif_branches,
            else_branch,
        })
    }

    fn parse_branch(&mut self) -> Result<Branch, CompileError> {
        let condition = self.parse_condition()?;
        self.skip_newlines();
        self.cur.expect(&PhToken::Then, "'THEN'")?;
        let body = self.parse_body()?;
        Ok(Branch { condition, body })
    }

    /// Instructions up to the next `ELIF`, `ELSE` or `ENDIF`.
    fn parse_body(&mut self) -> Result<Vec<Instruction>, CompileError> {
        let mut body = Vec::new();
        loop {
            self.skip_newlines();
            match self.cur.peek() {
                PhToken::Elif | PhToken::Else | PhToken::EndIf => return Ok(body),
                k if k.is_eof() || k.is_block_keyword() || *k == PhToken::EndSwitch => {
                    return Err(self.unterminated())
                }
                _ => body.push(self.parse_instruction()?),
            }
        }
    }
}
