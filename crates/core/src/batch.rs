//! Concurrent compilation of many source files.
//!
//! Files are compiled as a rayon parallel map on a pool sized to the
//! requested worker count. A fatal error in one file is recorded in its
//! outcome and never stops the batch. Outcomes are reported in input order.

use crate::ast::{RuleSet, VowelTransitionParams};
use crate::compile::{compile_dictionary, compile_phoneme_table_with, compile_vowel_transition};
use crate::error::CompileError;
use crate::include::{IncludeCache, TableBundle};
use crate::options::CompileOptions;
use crate::source::IncludeResolver;
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Dictionary,
    PhonemeTable,
    VowelTransition,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Used in reports; phoneme tables without a header are named after it.
    pub name: String,
    pub kind: SourceKind,
    pub text: String,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, kind: SourceKind, text: impl Into<String>) -> Self {
        SourceFile {
            name: name.into(),
            kind,
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Compiled {
    Dictionary(RuleSet),
    PhonemeTable(TableBundle),
    VowelTransition(VowelTransitionParams),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FileOutcome {
    pub name: String,
    pub result: Result<Compiled, CompileError>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BatchReport {
    pub outcomes: Vec<FileOutcome>,
}

impl BatchReport {
    pub fn succeeded(&self) -> impl Iterator<Item = (&str, &Compiled)> {
        self.outcomes.iter().filter_map(|o| match &o.result {
            Ok(compiled) => Some((o.name.as_str(), compiled)),
            Err(_) => None,
        })
    }

    /// Failed files with their errors, in input order.
    pub fn failures(&self) -> Vec<(&str, &CompileError)> {
        self.outcomes
            .iter()
            .filter_map(|o| match &o.result {
                Ok(_) => None,
                Err(e) => Some((o.name.as_str(), e)),
            })
            .collect()
    }

    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(|o| o.result.is_ok())
    }

    /// Summary for host tools: counts plus one error record per failed file.
    pub fn to_json_value(&self) -> serde_json::Value {
        let failures: Vec<serde_json::Value> = self
            .failures()
            .into_iter()
            .map(|(name, error)| {
                let mut record = error.to_json_value();
                record["file"] = serde_json::Value::String(name.to_owned());
                record
            })
            .collect();
        serde_json::json!({
            "files":     self.outcomes.len(),
            "succeeded": self.outcomes.len() - failures.len(),
            "failed":    failures.len(),
            "failures":  failures,
        })
    }
}

/// Compile `files` on up to `workers` threads.
///
/// Phoneme tables resolve includes through `resolver` and share `cache`
/// when one is given. A panicking worker panics the caller.
pub fn compile_batch(
    files: &[SourceFile],
    resolver: &dyn IncludeResolver,
    options: &CompileOptions,
    cache: Option<&IncludeCache>,
    workers: usize,
) -> BatchReport {
    let workers = workers.clamp(1, files.len().max(1));
    let compile_all = || {
        files
            .par_iter()
            .map(|file| compile_file(file, resolver, options, cache))
            .collect::<Vec<_>>()
    };
    let outcomes = match ThreadPoolBuilder::new().num_threads(workers).build() {
        Ok(pool) => pool.install(compile_all),
        Err(e) => {
            warn!(error = %e, "cannot build worker pool, using the global pool");
            compile_all()
        }
    };

    let report = BatchReport { outcomes };
    info!(
        files = report.outcomes.len(),
        failed = report.failures().len(),
        workers,
        "batch compiled"
    );
    report
}

fn compile_file(
    file: &SourceFile,
    resolver: &dyn IncludeResolver,
    options: &CompileOptions,
    cache: Option<&IncludeCache>,
) -> FileOutcome {
    let result = match file.kind {
        SourceKind::Dictionary => compile_dictionary(&file.text).map(Compiled::Dictionary),
        SourceKind::VowelTransition => {
            compile_vowel_transition(&file.text).map(Compiled::VowelTransition)
        }
        SourceKind::PhonemeTable => {
            let named;
            let options = if options.table_name.is_none() {
                named = CompileOptions {
                    table_name: Some(file.name.clone()),
                    ..options.clone()
                };
                &named
            } else {
                options
            };
            compile_phoneme_table_with(&file.text, resolver, options, cache)
                .map(Compiled::PhonemeTable)
        }
    };
    if let Err(e) = &result {
        warn!(file = %file.name, error = %e, "compilation failed");
    }
    FileOutcome {
        name: file.name.clone(),
        result,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::InMemoryResolver;

    fn files() -> Vec<SourceFile> {
        vec![
            SourceFile::new("en_rules", SourceKind::Dictionary, ".replace teh the\n"),
            SourceFile::new("broken_rules", SourceKind::Dictionary, ".replace teh\n"),
            SourceFile::new(
                "ph_english",
                SourceKind::PhonemeTable,
                "include ph_common\nphoneme a\nendphoneme\n",
            ),
            SourceFile::new("vowel", SourceKind::VowelTransition, "len=150 rate -20"),
            SourceFile::new("bad_vowel", SourceKind::VowelTransition, "len=loud"),
        ]
    }

    fn resolver() -> InMemoryResolver {
        [("ph_common", "procedure p\nRETURN\nendprocedure\n")]
            .into_iter()
            .collect()
    }

    #[test]
    fn failures_do_not_stop_the_batch() {
        let report = compile_batch(&files(), &resolver(), &CompileOptions::default(), None, 3);
        assert_eq!(report.outcomes.len(), 5);
        assert!(!report.is_success());

        let failed: Vec<&str> = report.failures().into_iter().map(|(n, _)| n).collect();
        assert_eq!(failed, vec!["broken_rules", "bad_vowel"]);

        let ok: Vec<&str> = report.succeeded().map(|(n, _)| n).collect();
        assert_eq!(ok, vec!["en_rules", "ph_english", "vowel"]);
    }

    #[test]
    fn tables_are_named_after_their_file() {
        let report = compile_batch(&files(), &resolver(), &CompileOptions::default(), None, 1);
        let table = report
            .succeeded()
            .find_map(|(_, c)| match c {
                Compiled::PhonemeTable(bundle) => Some(bundle),
                _ => None,
            })
            .unwrap();
        assert_eq!(table.root.name, "ph_english");
        assert!(table.included.contains_key("ph_common"));
    }

    #[test]
    fn shared_cache_across_workers() {
        let cache = IncludeCache::new();
        let tables: Vec<SourceFile> = (0..8)
            .map(|i| {
                SourceFile::new(
                    format!("t{}", i),
                    SourceKind::PhonemeTable,
                    "include ph_common\n",
                )
            })
            .collect();
        let report = compile_batch(&tables, &resolver(), &CompileOptions::default(), Some(&cache), 4);
        assert!(report.is_success());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn outcomes_keep_input_order_on_many_workers() {
        let many: Vec<SourceFile> = (0..40)
            .map(|i| {
                let text = if i % 3 == 0 { "len=".to_owned() } else { format!("len={}", i) };
                SourceFile::new(format!("v{}", i), SourceKind::VowelTransition, text)
            })
            .collect();
        let report = compile_batch(&many, &resolver(), &CompileOptions::default(), None, 6);
        let names: Vec<&str> = report.outcomes.iter().map(|o| o.name.as_str()).collect();
        let expected: Vec<String> = (0..40).map(|i| format!("v{}", i)).collect();
        assert_eq!(names, expected);
        assert_eq!(report.failures().len(), 14);
    }

    #[test]
    fn zero_workers_still_compiles() {
        let report = compile_batch(&files(), &resolver(), &CompileOptions::default(), None, 0);
        assert_eq!(report.outcomes.len(), 5);
    }

    #[test]
    fn empty_batch() {
        let report = compile_batch(&[], &resolver(), &CompileOptions::default(), None, 8);
        assert!(report.is_success());
        assert_eq!(report.to_json_value()["files"], 0);
    }

    #[test]
    fn json_summary_lists_failed_files() {
        let report = compile_batch(&files(), &resolver(), &CompileOptions::default(), None, 2);
        let json = report.to_json_value();
        assert_eq!(json["failed"], 2);
        assert_eq!(json["succeeded"], 3);
        assert_eq!(json["failures"][0]["file"], "broken_rules");
        assert_eq!(json["failures"][0]["kind"], "SyntaxError");
        assert_eq!(json["failures"][1]["kind"], "InvalidLiteralError");
    }
}
