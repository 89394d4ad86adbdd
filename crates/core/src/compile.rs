//! Compiler entry points: source text in, validated tree or first error out.
//!
//! Each function is a thin pipeline of lexer, parser and (for phoneme
//! tables) include expansion. None of them keeps state between calls.

use crate::ast::{PhonemeTable, RuleSet, VowelTransitionParams};
use crate::error::{CompileError, Diagnostic};
use crate::include::{self, IncludeCache, TableBundle};
use crate::lexer;
use crate::options::CompileOptions;
use crate::parser;
use crate::source::IncludeResolver;
use serde::Serialize;
use tracing::debug;

/// A compiled tree with the non-fatal findings made while building it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Compilation<T> {
    pub tree: T,
    pub warnings: Vec<Diagnostic>,
}

/// Compile a dictionary rule file.
pub fn compile_dictionary(source: &str) -> Result<RuleSet, CompileError> {
    let tokens = lexer::dictionary::lex(source)?;
    debug!(tokens = tokens.len(), "dictionary lexed");
    let rules = parser::dictionary::parse(&tokens)?;
    debug!(rules = rules.rules.len(), "dictionary compiled");
    Ok(rules)
}

/// Compile a vowel-transition parameter list such as `len=150 rate -20`.
pub fn compile_vowel_transition(source: &str) -> Result<VowelTransitionParams, CompileError> {
    let tokens = lexer::vowel::lex(source)?;
    let params = parser::vowel::parse(&tokens)?;
    debug!(params = params.len(), "vowel transition compiled");
    Ok(params)
}

/// Compile one phoneme table without touching its includes.
pub fn parse_phoneme_table(
    source: &str,
    options: &CompileOptions,
) -> Result<Compilation<PhonemeTable>, CompileError> {
    let tokens = lexer::phoneme::lex(source)?;
    debug!(tokens = tokens.len(), root = options.root, "phoneme table lexed");
    let (tree, warnings) = parser::phoneme::parse(&tokens, source, options)?;
    debug!(
        table = %tree.name,
        blocks = tree.blocks.len(),
        warnings = warnings.len(),
        "phoneme table compiled"
    );
    Ok(Compilation { tree, warnings })
}

/// Compile a root phoneme table and every table it includes, using
/// default options and no cache.
pub fn compile_phoneme_table(
    source: &str,
    resolver: &dyn IncludeResolver,
) -> Result<TableBundle, CompileError> {
    compile_phoneme_table_with(source, resolver, &CompileOptions::default(), None)
}

/// [`compile_phoneme_table`] with explicit options and an optional shared
/// include cache.
pub fn compile_phoneme_table_with(
    source: &str,
    resolver: &dyn IncludeResolver,
    options: &CompileOptions,
    cache: Option<&IncludeCache>,
) -> Result<TableBundle, CompileError> {
    include::load_table(source, resolver, options, cache)
}
