//! Include expansion: root table plus every table it transitively includes.

use crate::ast::{PhonemeTable, Position};
use crate::compile::parse_phoneme_table;
use crate::error::{CompileError, Diagnostic};
use crate::options::CompileOptions;
use crate::source::IncludeResolver;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::io;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{info, warn};

/// A root table with its expanded includes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableBundle {
    pub root: PhonemeTable,
    /// Every table reached through `include`, keyed by include name.
    pub included: BTreeMap<String, Arc<PhonemeTable>>,
    pub warnings: Vec<Diagnostic>,
}

impl TableBundle {
    /// The root table followed by the included tables in name order.
    pub fn tables(&self) -> impl Iterator<Item = &PhonemeTable> {
        std::iter::once(&self.root).chain(self.included.values().map(|t| t.as_ref()))
    }
}

/// Compiled included tables, shared between compilations.
///
/// Entries are keyed by include name only, so one cache should not be
/// shared between resolvers that map the same name to different sources.
#[derive(Debug, Default)]
pub struct IncludeCache {
    tables: Mutex<HashMap<String, Arc<PhonemeTable>>>,
}

impl IncludeCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<Arc<PhonemeTable>> {
        self.lock().get(name).cloned()
    }

    /// Store `table` unless another thread got there first; returns the
    /// cached entry either way.
    pub fn insert(&self, name: &str, table: Arc<PhonemeTable>) -> Arc<PhonemeTable> {
        self.lock()
            .entry(name.to_owned())
            .or_insert(table)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // A panic elsewhere cannot leave the map half-written.
    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Arc<PhonemeTable>>> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Compile `source` as a root table and expand its includes depth-first.
pub fn load_table(
    source: &str,
    resolver: &dyn IncludeResolver,
    options: &CompileOptions,
    cache: Option<&IncludeCache>,
) -> Result<TableBundle, CompileError> {
    let compiled = parse_phoneme_table(source, options)?;
    let root = compiled.tree;

    let mut loader = Loader {
        resolver,
        options,
        cache,
        stack: Vec::new(),
        stack_set: HashSet::new(),
        included: BTreeMap::new(),
        warnings: compiled.warnings,
    };
    if !root.name.is_empty() {
        loader.stack.push(root.name.clone());
        loader.stack_set.insert(root.name.clone());
    }
    loader.expand(None, &root)?;

    Ok(TableBundle {
        root,
        included: loader.included,
        warnings: loader.warnings,
    })
}

struct Loader<'r> {
    resolver: &'r dyn IncludeResolver,
    options: &'r CompileOptions,
    cache: Option<&'r IncludeCache>,
    // Include chain from the root to the table being expanded.
    stack: Vec<String>,
    stack_set: HashSet<String>,
    included: BTreeMap<String, Arc<PhonemeTable>>,
    warnings: Vec<Diagnostic>,
}

impl Loader<'_> {
    /// Expand the includes of `table`; `owner` is its include name, `None`
    /// for the root.
    fn expand(&mut self, owner: Option<&str>, table: &PhonemeTable) -> Result<(), CompileError> {
        for (name, position) in table.includes() {
            self.include(name, position)
                .map_err(|error| in_table(owner, error))?;
        }
        Ok(())
    }

    fn include(&mut self, name: &str, position: Position) -> Result<(), CompileError> {
        if self.stack_set.contains(name) {
            let mut chain = self.stack.clone();
            chain.push(name.to_owned());
            return Err(CompileError::Include {
                name: name.to_owned(),
                position,
                message: format!("include cycle: {}", chain.join(" -> ")),
            });
        }
        if self.included.contains_key(name) {
            return Ok(());
        }
        if self.stack.len() >= self.options.max_include_depth {
            return Err(CompileError::Include {
                name: name.to_owned(),
                position,
                message: format!(
                    "includes nested deeper than {}",
                    self.options.max_include_depth
                ),
            });
        }

        let Some(table) = self.fetch(name, position)? else {
            return Ok(());
        };

        self.stack.push(name.to_owned());
        self.stack_set.insert(name.to_owned());
        let expanded = self.expand(Some(name), &table);
        self.stack.pop();
        self.stack_set.remove(name);
        expanded?;

        self.included.insert(name.to_owned(), table);
        Ok(())
    }

    /// The compiled table for `name`, or `None` when a missing table is
    /// tolerated.
    fn fetch(
        &mut self,
        name: &str,
        position: Position,
    ) -> Result<Option<Arc<PhonemeTable>>, CompileError> {
        if let Some(table) = self.cache.and_then(|c| c.get(name)) {
            info!(table = name, "include served from cache");
            return Ok(Some(table));
        }

        let source = match self.resolver.resolve(name) {
            Ok(source) => source,
            Err(e) if e.kind() == io::ErrorKind::NotFound && !self.options.strict_includes => {
                let message = format!("include '{}' not found, left unexpanded", name);
                warn!(line = position.line, column = position.column, "{}", message);
                self.warnings.push(Diagnostic::new(position, message));
                return Ok(None);
            }
            Err(e) => {
                return Err(CompileError::Include {
                    name: name.to_owned(),
                    position,
                    message: e.to_string(),
                })
            }
        };

        let compiled = parse_phoneme_table(&source, &self.options.for_include(name))
            .map_err(|error| in_table(Some(name), error))?;
        self.warnings.extend(compiled.warnings.into_iter().map(|d| {
            Diagnostic::new(d.position, format!("in table '{}': {}", name, d.message))
        }));
        info!(table = name, "include resolved");

        let table = Arc::new(compiled.tree);
        Ok(Some(match self.cache {
            Some(cache) => cache.insert(name, table),
            None => table,
        }))
    }
}

/// Attach the table name to an error raised inside an included table.
/// Errors that already name their table pass through unchanged.
fn in_table(owner: Option<&str>, error: CompileError) -> CompileError {
    match (owner, error) {
        (_, error @ CompileError::InTable { .. }) | (None, error) => error,
        (Some(table), error) => CompileError::InTable {
            table: table.to_owned(),
            error: Box::new(error),
        },
    }
}
