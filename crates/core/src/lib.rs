#![allow(clippy::result_large_err)]
//! phonrules-core: compiler front-end for the rule languages of a
//! rule-based text-to-speech engine.
//!
//! Three source formats are compiled into owned, serializable trees:
//!
//! - dictionary rule files ([`compile_dictionary()`] -> [`RuleSet`])
//! - phoneme source tables ([`compile_phoneme_table()`] -> [`TableBundle`])
//! - vowel-transition parameter lists ([`compile_vowel_transition()`] ->
//!   [`VowelTransitionParams`])
//!
//! Compilation stops at the first [`CompileError`]. Includes between
//! phoneme tables are resolved through a caller-supplied
//! [`IncludeResolver`]; [`link`] checks references across finished trees
//! and [`batch`] compiles many files on worker threads.

pub mod ast;
pub mod batch;
pub mod compile;
pub mod error;
pub mod include;
pub mod lexer;
pub mod link;
pub mod options;
pub(crate) mod parser;
pub mod source;

// ── Convenience re-exports: key types ────────────────────────────────

pub use ast::{
    Atom, Block, ConditionExpr, Instruction, PhonemeTable, Position, PronunciationRule, Rule,
    RuleSet, SpecialChar, VowelParam, VowelTransitionParams,
};
pub use batch::{BatchReport, FileOutcome, SourceFile, SourceKind};
pub use compile::Compilation;
pub use error::{CompileError, Diagnostic};
pub use include::{IncludeCache, TableBundle};
pub use options::CompileOptions;
pub use source::{FileSystemResolver, InMemoryResolver, IncludeResolver, NoIncludes};

// ── Convenience re-exports: entry points ─────────────────────────────

pub use batch::compile_batch;
pub use compile::{
    compile_dictionary, compile_phoneme_table, compile_phoneme_table_with,
    compile_vowel_transition, parse_phoneme_table,
};
pub use link::{check_dictionary_references, check_table_references};
