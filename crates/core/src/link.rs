//! Link-time reference checks.
//!
//! The compilers accept references to names they cannot see (procedures
//! from other tables, letter groups defined later). These checks run on
//! finished trees and report every reference that has no definition.

use crate::ast::{Atom, Instruction, Rule, RuleSet, SpecialChar};
use crate::error::CompileError;
use crate::include::TableBundle;
use std::collections::HashSet;

/// Every `CALL` whose procedure is defined in no table of the bundle.
pub fn check_table_references(bundle: &TableBundle) -> Vec<CompileError> {
    let defined: HashSet<&str> = bundle
        .tables()
        .flat_map(|t| t.procedures())
        .map(|p| p.name.as_str())
        .collect();

    let mut errors = Vec::new();
    for table in bundle.tables() {
        for phoneme in table.phonemes() {
            let context = format!("phoneme '{}' in table '{}'", phoneme.name, table.name);
            for instruction in phoneme.instructions() {
                check_calls(instruction, &defined, &context, &mut errors);
            }
        }
        for procedure in table.procedures() {
            let context = format!("procedure '{}' in table '{}'", procedure.name, table.name);
            for instruction in &procedure.instructions {
                check_calls(instruction, &defined, &context, &mut errors);
            }
        }
    }
    errors
}

fn check_calls(
    instruction: &Instruction,
    defined: &HashSet<&str>,
    context: &str,
    errors: &mut Vec<CompileError>,
) {
    match instruction {
        Instruction::Call(name) if !defined.contains(name.as_str()) => {
            errors.push(CompileError::UnknownReference {
                kind: "procedure".to_owned(),
                name: name.clone(),
                context: context.to_owned(),
            });
        }
        Instruction::Conditional(c) => {
            for body in c.bodies() {
                for nested in body {
                    check_calls(nested, defined, context, errors);
                }
            }
        }
        _ => {}
    }
}

/// Every `Lnn` reference with no `.Lnn` definition in its own rule set or
/// an enclosing one. Definitions may follow their first use.
pub fn check_dictionary_references(rules: &RuleSet) -> Vec<CompileError> {
    let mut errors = Vec::new();
    let mut scopes = Vec::new();
    check_scope(rules, "top level", &mut scopes, &mut errors);
    errors
}

fn check_scope<'r>(
    rules: &'r RuleSet,
    context: &str,
    scopes: &mut Vec<HashSet<&'r str>>,
    errors: &mut Vec<CompileError>,
) {
    scopes.push(
        rules
            .rules
            .iter()
            .filter_map(|r| match r {
                Rule::LetterGroup { id, .. } => Some(id.as_str()),
                _ => None,
            })
            .collect(),
    );

    for rule in &rules.rules {
        match rule {
            Rule::LetterGroup { entries, .. } => {
                for entry in entries {
                    check_atoms(entry, context, scopes, errors);
                }
            }
            Rule::Pronunciation(p) => {
                for atoms in p.pre_context.iter().chain(p.post_context.iter()) {
                    check_atoms(atoms, context, scopes, errors);
                }
            }
            Rule::Group { qualifier, body } => {
                let context = format!("group '{}'", qualifier);
                check_scope(body, &context, scopes, errors);
            }
            Rule::Replace { .. } => {}
        }
    }

    scopes.pop();
}

fn check_atoms(
    atoms: &[Atom],
    context: &str,
    scopes: &[HashSet<&str>],
    errors: &mut Vec<CompileError>,
) {
    for atom in atoms {
        if let Atom::Special(SpecialChar::LetterGroupRef(id)) = atom {
            if !scopes.iter().any(|s| s.contains(id.as_str())) {
                errors.push(CompileError::UnknownReference {
                    kind: "letter group".to_owned(),
                    name: format!("L{}", id),
                    context: context.to_owned(),
                });
            }
        }
    }
}
