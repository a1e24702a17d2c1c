use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::lookup::{Resolution, ScopeLookup};
use crate::snapshot::SourceSnapshot;
use crate::{Result, ScopeEntry, ScopeIndexBuilder, ScopeKind, bare_filename};

/// A file that could not be indexed, kept for the run report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexFailure {
    pub path: String,
    pub message: String,
}

/// One row of the scope-index table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeRow {
    pub filepath: String,
    #[serde(rename = "type")]
    pub kind: ScopeKind,
    pub name: Option<String>,
    pub lineno: usize,
    pub end_lineno: usize,
    pub parent_class: Option<String>,
    pub filename_clean: String,
}

/// Scope entries of every indexed file in one package revision.
///
/// Built once per revision and reused for every finding's lookup.
#[derive(Debug, Clone, Default)]
pub struct PackageIndex {
    root: PathBuf,
    files: BTreeMap<String, Vec<ScopeEntry>>,
    failures: Vec<IndexFailure>,
}

impl PackageIndex {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            files: BTreeMap::new(),
            failures: Vec::new(),
        }
    }

    /// Index every supported file in `snapshot`. Files that fail to parse are
    /// recorded and skipped.
    pub fn build(snapshot: &SourceSnapshot, builder: &ScopeIndexBuilder) -> Self {
        Self::build_with(snapshot, builder, |_| {})
    }

    /// Like [`build`](Self::build), calling `on_file` after each supported
    /// file is attempted.
    pub fn build_with(
        snapshot: &SourceSnapshot,
        builder: &ScopeIndexBuilder,
        mut on_file: impl FnMut(&str),
    ) -> Self {
        let mut index = Self::new(snapshot.root());
        index.failures.extend(snapshot.unreadable().iter().cloned());

        for (relative, source) in snapshot.files() {
            if !builder.supports(Path::new(relative)) {
                continue;
            }
            // Failures are recorded inside index_file.
            let _ = index.index_file(builder, relative, source);
            on_file(relative);
        }

        info!(
            root = %index.root.display(),
            files = index.files.len(),
            entries = index.entry_count(),
            failures = index.failures.len(),
            "Package index built"
        );
        index
    }

    /// Index one file under its package-relative path. On failure the file is
    /// recorded in [`failures`](Self::failures) and left out of the index.
    pub fn index_file(
        &mut self,
        builder: &ScopeIndexBuilder,
        relative: &str,
        source: &str,
    ) -> Result<usize> {
        let full_path = self.root.join(relative);
        match builder.build(&full_path, source) {
            Ok(entries) => {
                let count = entries.len();
                self.files.insert(relative.to_string(), entries);
                Ok(count)
            }
            Err(e) => {
                warn!(path = %relative, error = %e, "Skipping file that failed to index");
                self.failures.push(IndexFailure {
                    path: relative.to_string(),
                    message: e.to_string(),
                });
                Err(e)
            }
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn entries(&self, relative: &str) -> Option<&[ScopeEntry]> {
        self.files.get(relative).map(Vec::as_slice)
    }

    /// Resolve the context of `line` in `relative`. Files that are not in the
    /// index resolve to their bare filename.
    pub fn lookup(&self, relative: &str, line: usize) -> Resolution {
        let entries = self.entries(relative).unwrap_or(&[]);
        ScopeLookup::new(relative, entries).resolve(line)
    }

    pub fn contains_file(&self, relative: &str) -> bool {
        self.files.contains_key(relative)
    }

    /// Whether `context` names a scope of `relative` in this revision. The
    /// bare filename always counts once the file itself exists.
    pub fn contains_context(&self, relative: &str, context: &str) -> bool {
        let Some(entries) = self.entries(relative) else {
            return false;
        };
        let file_name = bare_filename(relative);
        context == file_name || entries.iter().any(|e| e.context_name(file_name) == context)
    }

    pub fn failures(&self) -> &[IndexFailure] {
        &self.failures
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    pub fn entry_count(&self) -> usize {
        self.files.values().map(Vec::len).sum()
    }

    /// Flatten the index into scope-index table rows, in path order.
    pub fn rows(&self) -> Vec<ScopeRow> {
        self.files
            .iter()
            .flat_map(|(relative, entries)| {
                entries.iter().map(move |e| ScopeRow {
                    filepath: e.file_path.display().to_string(),
                    kind: e.kind,
                    name: e.name.clone(),
                    lineno: e.start_line,
                    end_lineno: e.end_line,
                    parent_class: e.parent_name.clone(),
                    filename_clean: relative.clone(),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LookupOutcome;

    fn snapshot() -> SourceSnapshot {
        SourceSnapshot::new("/work/pkg")
            .with_file(
                "app/views.py",
                "def index():\n    return 1\n\nclass Admin:\n    def save(self):\n        pass\n",
            )
            .with_file("app/broken.py", "def broken(:\n")
            .with_file("app/Svc.java", "class Svc {\n    void call() {\n    }\n}\n")
            .with_file("docs/notes.txt", "not source\n")
    }

    #[test]
    fn build_indexes_supported_files_and_skips_failures() {
        let index = PackageIndex::build(&snapshot(), &ScopeIndexBuilder::new());

        assert_eq!(index.file_count(), 2);
        assert!(index.contains_file("app/views.py"));
        assert!(index.contains_file("app/Svc.java"));
        assert!(!index.contains_file("app/broken.py"));
        assert!(!index.contains_file("docs/notes.txt"));

        assert_eq!(index.failures().len(), 1);
        assert_eq!(index.failures()[0].path, "app/broken.py");
    }

    #[test]
    fn build_with_reports_each_supported_file() {
        let mut seen = Vec::new();
        let index =
            PackageIndex::build_with(&snapshot(), &ScopeIndexBuilder::new(), |f| seen.push(f.to_string()));

        assert_eq!(seen, vec!["app/Svc.java", "app/broken.py", "app/views.py"]);
        assert_eq!(index.file_count(), 2);
    }

    #[test]
    fn lookup_uses_cached_entries() {
        let index = PackageIndex::build(&snapshot(), &ScopeIndexBuilder::new());

        assert_eq!(index.lookup("app/views.py", 2).context, "index");
        assert_eq!(index.lookup("app/views.py", 6).context, "Admin.save");
        assert_eq!(index.lookup("app/Svc.java", 3).context, "Svc.call");

        let missing = index.lookup("app/broken.py", 1);
        assert_eq!(missing.context, "broken.py");
        assert_eq!(missing.outcome, LookupOutcome::Unscoped);
    }

    #[test]
    fn contains_context_checks_rendered_names() {
        let index = PackageIndex::build(&snapshot(), &ScopeIndexBuilder::new());

        assert!(index.contains_context("app/views.py", "Admin.save"));
        assert!(index.contains_context("app/views.py", "index"));
        assert!(index.contains_context("app/views.py", "views.py"));
        assert!(!index.contains_context("app/views.py", "Admin.delete"));
        assert!(!index.contains_context("app/gone.py", "gone.py"));
    }

    #[test]
    fn rows_carry_table_columns() {
        let index = PackageIndex::build(&snapshot(), &ScopeIndexBuilder::new());
        let rows = index.rows();

        let save = rows
            .iter()
            .find(|r| r.name.as_deref() == Some("save"))
            .expect("method row");
        assert_eq!(save.kind, ScopeKind::Method);
        assert_eq!(save.parent_class.as_deref(), Some("Admin"));
        assert_eq!(save.filename_clean, "app/views.py");
        assert_eq!((save.lineno, save.end_lineno), (5, 6));
        assert!(save.filepath.ends_with("app/views.py"));

        let json = serde_json::to_value(save).unwrap();
        assert_eq!(json["type"], "method");
        assert_eq!(json["parent_class"], "Admin");
    }
}
