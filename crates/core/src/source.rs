//! Include resolution for phoneme tables.
//!
//! The [`IncludeResolver`] trait abstracts where included tables come from,
//! so compilation can run against the file system, an in-memory map, or a
//! host callback.

use std::collections::HashMap;
use std::io;
use std::path::{Component, Path, PathBuf};

/// Maps an `include` name to the source text of that table.
///
/// Resolvers are shared across batch worker threads, hence `Send + Sync`.
/// A missing table must be reported with [`io::ErrorKind::NotFound`] so
/// that non-strict compilation can downgrade it to a warning.
pub trait IncludeResolver: Send + Sync {
    fn resolve(&self, name: &str) -> Result<String, io::Error>;
}

/// Any `Fn(&str) -> Option<String>` is a resolver; `None` means not found.
impl<F> IncludeResolver for F
where
    F: Fn(&str) -> Option<String> + Send + Sync,
{
    fn resolve(&self, name: &str) -> Result<String, io::Error> {
        self(name).ok_or_else(|| not_found(name))
    }
}

fn not_found(name: &str) -> io::Error {
    io::Error::new(
        io::ErrorKind::NotFound,
        format!("table '{}' not found", name),
    )
}

/// Resolves nothing. Every include is reported as not found.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoIncludes;

impl IncludeResolver for NoIncludes {
    fn resolve(&self, name: &str) -> Result<String, io::Error> {
        Err(not_found(name))
    }
}

/// Tables held in memory, keyed by include name.
#[derive(Debug, Clone, Default)]
pub struct InMemoryResolver {
    tables: HashMap<String, String>,
}

impl InMemoryResolver {
    pub fn new(tables: HashMap<String, String>) -> Self {
        Self { tables }
    }

    /// Add or replace a table.
    pub fn insert(&mut self, name: impl Into<String>, source: impl Into<String>) {
        self.tables.insert(name.into(), source.into());
    }
}

impl<N: Into<String>, S: Into<String>> FromIterator<(N, S)> for InMemoryResolver {
    fn from_iter<I: IntoIterator<Item = (N, S)>>(iter: I) -> Self {
        Self {
            tables: iter
                .into_iter()
                .map(|(n, s)| (n.into(), s.into()))
                .collect(),
        }
    }
}

impl IncludeResolver for InMemoryResolver {
    fn resolve(&self, name: &str) -> Result<String, io::Error> {
        self.tables.get(name).cloned().ok_or_else(|| not_found(name))
    }
}

/// Reads `<root>/<name>[.<extension>]` from disk.
///
/// Include names are confined to `root`: absolute names and names with
/// `..` components are rejected with [`io::ErrorKind::PermissionDenied`].
#[derive(Debug, Clone)]
pub struct FileSystemResolver {
    root: PathBuf,
    extension: Option<String>,
}

impl FileSystemResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            extension: None,
        }
    }

    /// Append `.<extension>` to every include name.
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = Some(extension.into());
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, name: &str) -> Result<PathBuf, io::Error> {
        let relative = Path::new(name);
        let confined = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
        if name.is_empty() || !confined {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("include '{}' escapes {}", name, self.root.display()),
            ));
        }
        let file = match &self.extension {
            Some(ext) => format!("{}.{}", name, ext),
            None => name.to_owned(),
        };
        Ok(self.root.join(file))
    }
}

impl IncludeResolver for FileSystemResolver {
    fn resolve(&self, name: &str) -> Result<String, io::Error> {
        let path = self.path_for(name)?;
        std::fs::read_to_string(&path).map_err(|e| {
            io::Error::new(e.kind(), format!("cannot read {}: {}", path.display(), e))
        })
    }
}
