//! Per-invocation compiler configuration.

use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_INCLUDE_DEPTH: usize = 32;

/// Immutable settings passed into each compiler call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompileOptions {
    /// Root tables may declare `phonemetable`; included tables may not.
    pub root: bool,
    /// Name used when the source has no `phonemetable` header.
    pub table_name: Option<String>,
    /// Treat an include the resolver cannot find as fatal.
    pub strict_includes: bool,
    pub max_include_depth: usize,
}

impl Default for CompileOptions {
    fn default() -> Self {
        CompileOptions {
            root: true,
            table_name: None,
            strict_includes: true,
            max_include_depth: DEFAULT_MAX_INCLUDE_DEPTH,
        }
    }
}

impl CompileOptions {
    /// Options for compiling the table included under `name`.
    pub fn for_include(&self, name: &str) -> Self {
        CompileOptions {
            root: false,
            table_name: Some(name.to_owned()),
            ..self.clone()
        }
    }

    pub fn from_json(src: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(src)
    }
}
