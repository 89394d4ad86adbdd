//! Tokens of phoneme source tables.
//!
//! A word (maximal run of characters other than whitespace, `(`, `)` and
//! `,`) becomes a keyword only when it equals one exactly; everything else
//! is a literal. Newlines are kept as tokens.

use super::{Newlines, Scanner, Spanned, TokenKind};
use crate::ast::{Direction, PhonemeChange, VowelModKind};
use crate::error::CompileError;

#[derive(Debug, Clone, PartialEq)]
pub enum PhToken {
    // blocks
    PhonemeTable,
    Include,
    Phoneme,
    EndPhoneme,
    Procedure,
    EndProcedure,
    // conditionals
    If,
    Then,
    Elif,
    Else,
    EndIf,
    And,
    Or,
    Not,
    // instructions
    Fmt,
    Wav,
    AddWav,
    Call,
    Return,
    Length,
    Ipa,
    VowelTransition(Direction),
    VowelModification(VowelModKind),
    NextVowelStarts,
    EndSwitch,
    PhonemeChange(PhonemeChange),
    // static properties
    LengthMod,
    StartType,
    EndType,
    Feature(String),
    Phonation(String),
    // condition vocabulary
    Condition(String),
    FlagCondition(String),
    Attribute(String),
    // punctuation
    LParen,
    RParen,
    Comma,
    Newline,
    Literal(String),
    Eof,
}

impl PhToken {
    /// Anything that has word text, i.e. can serve as a name.
    pub fn is_word(&self) -> bool {
        !matches!(
            self,
            PhToken::LParen | PhToken::RParen | PhToken::Comma | PhToken::Newline | PhToken::Eof
        )
    }

    /// Keywords that can only begin or end a top-level block.
    pub fn is_block_keyword(&self) -> bool {
        matches!(
            self,
            PhToken::PhonemeTable
                | PhToken::Include
                | PhToken::Phoneme
                | PhToken::EndPhoneme
                | PhToken::Procedure
                | PhToken::EndProcedure
        )
    }
}

impl TokenKind for PhToken {
    fn is_eof(&self) -> bool {
        matches!(self, PhToken::Eof)
    }
}

pub const FEATURES: &[&str] = &[
    "vwl", "stop", "frc", "afr", "nasal", "liquid", "vstop", "vfrc", "virtual", "pause",
    "nopause", "stress", "unstressed", "blb", "lbd", "dnt", "alv", "pla", "rfx", "alp", "pal",
    "vel", "lbv", "uvl", "phr", "glt", "sib", "lat", "trl", "flp", "palatal", "rhotic", "nolink",
];

pub const PHONATIONS: &[&str] = &["vcd", "vls"];

pub const CONDITIONS: &[&str] = &[
    "thisPh", "prevPh", "prevPhW", "prev2PhW", "nextPh", "next2Ph", "nextPhW", "next2PhW",
    "next3PhW", "nextVowel", "prevVowel",
];

pub const FLAG_CONDITIONS: &[&str] = &["PreVoicing", "KlattSynth"];

pub const ATTRIBUTES: &[&str] = &[
    "isPause", "isPause2", "isVowel", "isNotVowel", "isLiquid", "isNasal", "isVFricative",
    "isPalatal", "isRhotic", "isWordStart", "notWordStart", "isWordEnd", "isFirstVowel",
    "isSecondVowel", "isFinalVowel", "isAfterStress", "isVoiced", "isDiminished",
    "isUnstressed", "isNotStressed", "isStressed", "isMaxStress",
];

fn keyword(word: &str) -> Option<PhToken> {
    let fixed = match word {
        "phonemetable" => PhToken::PhonemeTable,
        "include" => PhToken::Include,
        "phoneme" => PhToken::Phoneme,
        "endphoneme" => PhToken::EndPhoneme,
        "procedure" => PhToken::Procedure,
        "endprocedure" => PhToken::EndProcedure,
        "IF" => PhToken::If,
        "THEN" => PhToken::Then,
        "ELIF" => PhToken::Elif,
        "ELSE" => PhToken::Else,
        "ENDIF" => PhToken::EndIf,
        "AND" => PhToken::And,
        "OR" => PhToken::Or,
        "NOT" => PhToken::Not,
        "FMT" => PhToken::Fmt,
        "WAV" => PhToken::Wav,
        "addWav" => PhToken::AddWav,
        "CALL" => PhToken::Call,
        "RETURN" => PhToken::Return,
        "length" => PhToken::Length,
        "ipa" => PhToken::Ipa,
        "Vowelin" => PhToken::VowelTransition(Direction::In),
        "Vowelout" => PhToken::VowelTransition(Direction::Out),
        "VowelStart" => PhToken::VowelModification(VowelModKind::Start),
        "VowelEnding" => PhToken::VowelModification(VowelModKind::Ending),
        "NextVowelStarts" => PhToken::NextVowelStarts,
        "EndSwitch" => PhToken::EndSwitch,
        "ChangePhoneme" => PhToken::PhonemeChange(PhonemeChange::Always),
        "ChangeIfDiminished" => PhToken::PhonemeChange(PhonemeChange::IfDiminished),
        "ChangeIfUnstressed" => PhToken::PhonemeChange(PhonemeChange::IfUnstressed),
        "ChangeIfNotStressed" => PhToken::PhonemeChange(PhonemeChange::IfNotStressed),
        "ChangeIfStressed" => PhToken::PhonemeChange(PhonemeChange::IfStressed),
        "IfNextVowelAppend" => PhToken::PhonemeChange(PhonemeChange::IfNextVowelAppend),
        "lengthmod" => PhToken::LengthMod,
        "starttype" => PhToken::StartType,
        "endtype" => PhToken::EndType,
        _ => return keyword_class(word),
    };
    Some(fixed)
}

fn keyword_class(word: &str) -> Option<PhToken> {
    let owned = word.to_owned();
    if FEATURES.contains(&word) {
        Some(PhToken::Feature(owned))
    } else if PHONATIONS.contains(&word) {
        Some(PhToken::Phonation(owned))
    } else if CONDITIONS.contains(&word) {
        Some(PhToken::Condition(owned))
    } else if FLAG_CONDITIONS.contains(&word) {
        Some(PhToken::FlagCondition(owned))
    } else if ATTRIBUTES.contains(&word) {
        Some(PhToken::Attribute(owned))
    } else {
        None
    }
}

fn is_delimiter(c: char) -> bool {
    matches!(c, '(' | ')' | ',')
}

pub fn lex(src: &str) -> Result<Vec<Spanned<PhToken>>, CompileError> {
    let mut s = Scanner::new(src);
    let mut tokens: Vec<Spanned<PhToken>> = Vec::new();
    loop {
        s.skip_trivia(Newlines::Keep);
        let Some(c) = s.peek() else {
            tokens.push(s.eof(PhToken::Eof));
            return Ok(tokens);
        };
        let tok = match c {
            '\n' => {
                let tok = s.token(PhToken::Newline, 1);
                // collapse blank-line runs into one token
                if matches!(tokens.last(), Some(t) if t.kind == PhToken::Newline) {
                    continue;
                }
                tok
            }
            '(' => s.token(PhToken::LParen, 1),
            ')' => s.token(PhToken::RParen, 1),
            ',' => s.token(PhToken::Comma, 1),
            _ => {
                s.check_printable()?;
                let len = s.word_len(is_delimiter);
                let word = &s.rest()[..len];
                let kind = keyword(word).unwrap_or_else(|| PhToken::Literal(word.to_owned()));
                s.token(kind, len)
            }
        };
        tokens.push(tok);
    }
}
