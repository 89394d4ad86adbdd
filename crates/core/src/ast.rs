//! Trees produced by the three compilers.
//!
//! Every tree owns its data: decoded values are copied out of the tokens,
//! so nothing here borrows from the source text.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ──────────────────────────────────────────────
// Positions
// ──────────────────────────────────────────────

/// 1-based line and column (columns count characters).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

impl Position {
    pub fn new(line: u32, column: u32) -> Self {
        Position { line, column }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

// ──────────────────────────────────────────────
// Dictionary rules
// ──────────────────────────────────────────────

/// Pattern wildcards allowed in rule contexts and letter-group entries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpecialChar {
    /// `_^_XX`: switch to language `XX`.
    LanguageQualifier(String),
    /// `A`
    AnyVowel,
    /// `C`
    AnyConsonant,
    /// `_`
    WordBoundary,
    /// `-`
    Hyphen,
    /// `Lnn`: any entry of letter group `nn`.
    LetterGroupRef(String),
}

impl fmt::Display for SpecialChar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpecialChar::LanguageQualifier(code) => write!(f, "_^_{}", code),
            SpecialChar::AnyVowel => f.write_str("A"),
            SpecialChar::AnyConsonant => f.write_str("C"),
            SpecialChar::WordBoundary => f.write_str("_"),
            SpecialChar::Hyphen => f.write_str("-"),
            SpecialChar::LetterGroupRef(id) => write!(f, "L{}", id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Atom {
    Literal(String),
    Special(SpecialChar),
}

impl Atom {
    pub fn literal(text: &str) -> Self {
        Atom::Literal(text.to_owned())
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Atom::Literal(text) => f.write_str(text),
            Atom::Special(c) => fmt::Display::fmt(c, f),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSet {
    pub rules: Vec<Rule>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Substitution {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rule {
    Replace {
        substitutions: Vec<Substitution>,
    },
    LetterGroup {
        /// Two-digit code exactly as written.
        id: String,
        entries: Vec<Vec<Atom>>,
    },
    Group {
        qualifier: String,
        body: RuleSet,
    },
    Pronunciation(PronunciationRule),
}

/// `pre ) match ( post replacement`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PronunciationRule {
    /// Atoms immediately before the match, in source order.
    pub pre_context: Option<Vec<Atom>>,
    pub match_text: String,
    pub post_context: Option<Vec<Atom>>,
    pub replacement: String,
}

fn write_atoms(f: &mut fmt::Formatter<'_>, atoms: &[Atom]) -> fmt::Result {
    for (i, atom) in atoms.iter().enumerate() {
        if i > 0 {
            f.write_str(" ")?;
        }
        fmt::Display::fmt(atom, f)?;
    }
    Ok(())
}

/// Atoms are written space-separated so that each one re-lexes on its own.
impl fmt::Display for PronunciationRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(pre) = &self.pre_context {
            write_atoms(f, pre)?;
            f.write_str(" ) ")?;
        }
        f.write_str(&self.match_text)?;
        if let Some(post) = &self.post_context {
            f.write_str(" ( ")?;
            write_atoms(f, post)?;
        }
        write!(f, " {}", self.replacement)
    }
}

// ──────────────────────────────────────────────
// Phoneme tables
// ──────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhonemeTable {
    pub name: String,
    pub declared_language: Option<String>,
    pub blocks: Vec<Block>,
}

impl PhonemeTable {
    pub fn phonemes(&self) -> impl Iterator<Item = &PhonemeDef> {
        self.blocks.iter().filter_map(|b| match b {
            Block::Phoneme(p) => Some(p),
            _ => None,
        })
    }

    pub fn procedures(&self) -> impl Iterator<Item = &ProcedureDef> {
        self.blocks.iter().filter_map(|b| match b {
            Block::Procedure(p) => Some(p),
            _ => None,
        })
    }

    pub fn includes(&self) -> impl Iterator<Item = (&str, Position)> {
        self.blocks.iter().filter_map(|b| match b {
            Block::Include { name, position } => Some((name.as_str(), *position)),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Block {
    /// Stored by name only; expansion belongs to the include loader.
    Include { name: String, position: Position },
    Procedure(ProcedureDef),
    Phoneme(PhonemeDef),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcedureDef {
    pub name: String,
    pub instructions: Vec<Instruction>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhonemeDef {
    pub name: String,
    pub properties: Vec<PhonemeProperty>,
}

impl PhonemeDef {
    pub fn instructions(&self) -> impl Iterator<Item = &Instruction> {
        self.properties.iter().filter_map(|p| match p {
            PhonemeProperty::Instruction(i) => Some(i),
            PhonemeProperty::Static(_) => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PhonemeProperty {
    Static(StaticProperty),
    Instruction(Instruction),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StaticProperty {
    Feature(String),
    /// Phonation type (`vcd`, `vls`).
    Type(String),
    LengthMod(i32),
    StartType(String),
    EndType(String),
}

impl StaticProperty {
    /// Two properties with the same key may not both be kept on a phoneme.
    pub fn key(&self) -> String {
        match self {
            StaticProperty::Feature(code) => code.clone(),
            StaticProperty::Type(_) => "phonation type".to_owned(),
            StaticProperty::LengthMod(_) => "lengthmod".to_owned(),
            StaticProperty::StartType(_) => "starttype".to_owned(),
            StaticProperty::EndType(_) => "endtype".to_owned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WavRef {
    pub file: String,
    pub gain: Option<i32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    In,
    Out,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VowelModKind {
    Start,
    Ending,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VowelModification {
    pub kind: VowelModKind,
    pub args: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PhonemeChange {
    Always,
    IfDiminished,
    IfUnstressed,
    IfNotStressed,
    IfStressed,
    IfNextVowelAppend,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Instruction {
    SetLength(i32),
    SetIpa(String),
    /// Procedure name, resolved by the consumer.
    Call(String),
    Return,
    Formant {
        wav_ref: String,
        add_wav: Option<WavRef>,
    },
    Wav(WavRef),
    AddWav(WavRef),
    VowelTransition {
        direction: Direction,
        params: VowelTransitionParams,
    },
    VowelModification(VowelModification),
    NextVowelSwitch {
        cases: Vec<VowelModification>,
    },
    ChangePhoneme {
        kind: PhonemeChange,
        target: String,
    },
    Conditional(Conditional),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branch {
    pub condition: ConditionExpr,
    pub body: Vec<Instruction>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conditional {
    pub if_branch: Branch,
    pub elif_branches: Vec<Branch>,
    pub else_branch: Option<Vec<Instruction>>,
}

impl Conditional {
    /// Every instruction list of the conditional, in source order.
    pub fn bodies(&self) -> impl Iterator<Item = &[Instruction]> {
        std::iter::once(self.if_branch.body.as_slice())
            .chain(self.elif_branches.iter().map(|b| b.body.as_slice()))
            .chain(self.else_branch.as_deref())
    }
}

// ──────────────────────────────────────────────
// Condition expressions
// ──────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConditionExpr {
    /// `nextPh(isVowel)`
    Predicate { name: String, attribute: String },
    /// Attribute-less test such as `KlattSynth`.
    Flag { name: String },
    Not(Box<ConditionExpr>),
    And(Box<ConditionExpr>, Box<ConditionExpr>),
    Or(Box<ConditionExpr>, Box<ConditionExpr>),
}

impl ConditionExpr {
    pub fn predicate(name: &str, attribute: &str) -> Self {
        ConditionExpr::Predicate {
            name: name.to_owned(),
            attribute: attribute.to_owned(),
        }
    }

    pub fn flag(name: &str) -> Self {
        ConditionExpr::Flag {
            name: name.to_owned(),
        }
    }

    fn is_leaf(&self) -> bool {
        matches!(
            self,
            ConditionExpr::Predicate { .. } | ConditionExpr::Flag { .. }
        )
    }

    fn fmt_operand(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_leaf() || matches!(self, ConditionExpr::Not(_)) {
            write!(f, "{}", self)
        } else {
            write!(f, "({})", self)
        }
    }
}

impl fmt::Display for ConditionExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConditionExpr::Predicate { name, attribute } => write!(f, "{}({})", name, attribute),
            ConditionExpr::Flag { name } => f.write_str(name),
            ConditionExpr::Not(e) => {
                f.write_str("NOT ")?;
                e.fmt_operand(f)
            }
            ConditionExpr::And(l, r) => {
                l.fmt_operand(f)?;
                f.write_str(" AND ")?;
                r.fmt_operand(f)
            }
            ConditionExpr::Or(l, r) => {
                l.fmt_operand(f)?;
                f.write_str(" OR ")?;
                r.fmt_operand(f)
            }
        }
    }
}

// ──────────────────────────────────────────────
// Vowel transitions
// ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VowelParam {
    Len,
    LenAdd,
    Rate,
    Rms,
    GlStop,
    F1,
    F2,
    F3,
    F4,
}

impl VowelParam {
    pub const ALL: [VowelParam; 9] = [
        VowelParam::Len,
        VowelParam::LenAdd,
        VowelParam::Rate,
        VowelParam::Rms,
        VowelParam::GlStop,
        VowelParam::F1,
        VowelParam::F2,
        VowelParam::F3,
        VowelParam::F4,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            VowelParam::Len => "len",
            VowelParam::LenAdd => "lenadd",
            VowelParam::Rate => "rate",
            VowelParam::Rms => "rms",
            VowelParam::GlStop => "glstop",
            VowelParam::F1 => "f1",
            VowelParam::F2 => "f2",
            VowelParam::F3 => "f3",
            VowelParam::F4 => "f4",
        }
    }

    pub fn from_keyword(word: &str) -> Option<Self> {
        VowelParam::ALL.into_iter().find(|p| p.as_str() == word)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VowelTransitionParams {
    pub values: BTreeMap<VowelParam, i32>,
}

impl VowelTransitionParams {
    pub fn get(&self, key: VowelParam) -> Option<i32> {
        self.values.get(&key).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl FromIterator<(VowelParam, i32)> for VowelTransitionParams {
    fn from_iter<I: IntoIterator<Item = (VowelParam, i32)>>(iter: I) -> Self {
        VowelTransitionParams {
            values: iter.into_iter().collect(),
        }
    }
}

impl fmt::Display for VowelTransitionParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (key, value)) in self.values.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{}={}", key.as_str(), value)?;
        }
        Ok(())
    }
}
