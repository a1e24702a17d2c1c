pub(crate) mod helpers;
pub mod java;
pub mod python;

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use crate::ScopeKind;

/// How a grammar adapter knows where a declaration ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndLines {
    /// The adapter reports an exact end line for every declaration.
    Exact,
    /// Only start lines are reported; ends are inferred from successors.
    Inferred,
}

/// A declaration reported by a grammar adapter, before its range is settled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub kind: ScopeKind,
    pub name: String,
    /// 1-based line the declaration starts on.
    pub start_line: usize,
    /// 1-based last line, when the adapter reports [`EndLines::Exact`].
    pub end_line: Option<usize>,
    /// Index of the enclosing type declaration in the same list.
    pub parent: Option<usize>,
}

/// Trait implemented by each grammar's declaration support.
pub trait LanguageSupport: Send + Sync + std::fmt::Debug {
    /// Language identifier (e.g., "python", "java").
    fn id(&self) -> &'static str;

    /// File extensions this language handles.
    fn extensions(&self) -> &'static [&'static str];

    /// Tree-sitter language for parsing.
    fn tree_sitter_language(&self) -> tree_sitter::Language;

    /// Whether reported declarations carry their end lines.
    fn end_lines(&self) -> EndLines;

    /// Scope kind emitted for a file with no declarations.
    fn whole_file_kind(&self) -> ScopeKind;

    /// Collect the declarations that form this file's scope index, in
    /// document order. Parents always precede their members.
    fn declarations(&self, tree: &tree_sitter::Tree, source: &str) -> Vec<Declaration>;
}

/// Registry of all supported languages.
#[derive(Debug)]
pub struct LanguageRegistry {
    languages: HashMap<String, Arc<dyn LanguageSupport>>,
    extension_map: HashMap<String, String>,
}

impl LanguageRegistry {
    pub fn new() -> Self {
        let mut reg = Self {
            languages: HashMap::new(),
            extension_map: HashMap::new(),
        };
        reg.register(Arc::new(python::PythonSupport));
        reg.register(Arc::new(java::JavaSupport));
        reg
    }

    fn register(&mut self, lang: Arc<dyn LanguageSupport>) {
        for ext in lang.extensions() {
            self.extension_map
                .insert((*ext).to_string(), lang.id().to_string());
        }
        self.languages.insert(lang.id().to_string(), lang);
    }

    /// Look up the language support for a file by its extension.
    pub fn for_file(&self, path: &Path) -> Option<Arc<dyn LanguageSupport>> {
        let ext = path.extension()?.to_str()?;
        let lang_id = self.extension_map.get(ext)?;
        self.languages.get(lang_id).cloned()
    }

}

impl Default for LanguageRegistry {
    fn default() -> Self {
        Self::new()
    }
}
