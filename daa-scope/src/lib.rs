pub mod index;
pub mod languages;
pub mod lookup;
pub mod package;
pub mod snapshot;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub use index::ScopeIndexBuilder;
pub use languages::{LanguageRegistry, LanguageSupport};
pub use lookup::{LookupOutcome, Resolution, ScopeLookup};
pub use package::{IndexFailure, PackageIndex, ScopeRow};
pub use snapshot::SourceSnapshot;

/// Error type for the scope engine.
#[derive(thiserror::Error, Debug)]
pub enum ScopeError {
    #[error("Parse error in {path}: {message}")]
    Parse { path: String, message: String },

    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),

    #[error("Tree-sitter error: {0}")]
    TreeSitter(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ScopeError>;

// ── Scope kind ─────────────────────────────────────────────────────

/// Named lexical region a line of source can belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScopeKind {
    /// Whole Python file with no top-level declarations.
    Module,
    /// A class, interface, enum or record.
    Class,
    /// A top-level function.
    Function,
    /// A member of a class: method, constructor, or (Java) nested type.
    Method,
    /// Whole Java file with no type declarations.
    File,
}

impl ScopeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Module => "module",
            Self::Class => "class",
            Self::Function => "function",
            Self::Method => "method",
            Self::File => "file",
        }
    }

    /// Whole-file fallback scopes render as the bare filename.
    pub fn is_whole_file(self) -> bool {
        matches!(self, Self::Module | Self::File)
    }

    /// Tie-break rank used when several scopes of equal width contain a line.
    pub(crate) fn specificity(self) -> u8 {
        match self {
            Self::Method => 3,
            Self::Function => 2,
            Self::Class => 1,
            Self::Module | Self::File => 0,
        }
    }
}

impl std::fmt::Display for ScopeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Scope entry ────────────────────────────────────────────────────

/// One named region of a file with a concrete, 1-based, inclusive line range.
///
/// Whole-file entries start at line 0.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScopeEntry {
    pub file_path: PathBuf,
    pub kind: ScopeKind,
    /// Absent for [`ScopeKind::Module`].
    pub name: Option<String>,
    pub start_line: usize,
    pub end_line: usize,
    /// Enclosing class name, set only for [`ScopeKind::Method`].
    pub parent_name: Option<String>,
}

impl ScopeEntry {
    pub fn contains(&self, line: usize) -> bool {
        self.start_line <= line && line <= self.end_line
    }

    /// Number of lines covered beyond the first.
    pub fn width(&self) -> usize {
        self.end_line.saturating_sub(self.start_line)
    }

    /// The context string this entry contributes for a finding inside it.
    ///
    /// Methods are qualified with their class; whole-file entries and
    /// unnamed entries fall back to `file_name`.
    pub fn context_name(&self, file_name: &str) -> String {
        if self.kind.is_whole_file() {
            return file_name.to_string();
        }
        match (&self.name, &self.parent_name) {
            (Some(name), Some(parent)) if self.kind == ScopeKind::Method => {
                format!("{parent}.{name}")
            }
            (Some(name), _) => name.clone(),
            (None, _) => file_name.to_string(),
        }
    }
}

/// Last path segment of a `/`- or `\`-separated path.
pub fn bare_filename(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}
