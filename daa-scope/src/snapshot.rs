use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::package::IndexFailure;

/// Immutable capture of one revision's source files.
///
/// Keys are package-relative paths with `/` separators. Once loaded, a
/// snapshot no longer depends on the working tree it came from.
#[derive(Debug, Clone, Default)]
pub struct SourceSnapshot {
    root: PathBuf,
    files: BTreeMap<String, String>,
    unreadable: Vec<IndexFailure>,
}

impl SourceSnapshot {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            files: BTreeMap::new(),
            unreadable: Vec::new(),
        }
    }

    /// Add a file by its package-relative path.
    #[must_use]
    pub fn with_file(mut self, relative: &str, source: impl Into<String>) -> Self {
        self.insert(relative, source);
        self
    }

    pub fn insert(&mut self, relative: &str, source: impl Into<String>) {
        self.files.insert(normalize_relative(relative), source.into());
    }

    /// Read every file under `root` that matches an include pattern and no
    /// exclude pattern. Files that cannot be read, are not valid UTF-8, or sit
    /// in a directory the walk cannot enter are recorded and skipped.
    pub fn load(root: &Path, include: &[String], exclude: &[String]) -> Self {
        let mut snapshot = Self::new(root);
        let excluded: Vec<glob::Pattern> = exclude
            .iter()
            .filter_map(|p| match glob::Pattern::new(p) {
                Ok(pattern) => Some(pattern),
                Err(e) => {
                    warn!(pattern = %p, error = %e, "Invalid exclude pattern");
                    None
                }
            })
            .collect();

        let mut matched = Vec::new();
        for pattern in include {
            let full_pattern = root.join(pattern).to_string_lossy().to_string();
            match glob::glob(&full_pattern) {
                Ok(paths) => {
                    for entry in paths {
                        match entry {
                            Ok(path) if path.is_file() => matched.push(path),
                            Ok(_) => {}
                            Err(e) => {
                                let relative = relative_key(e.path(), root);
                                if excluded.iter().any(|p| p.matches(&relative)) {
                                    continue;
                                }
                                warn!(
                                    path = %relative,
                                    error = %e.error(),
                                    "Skipping unreadable path"
                                );
                                snapshot.unreadable.push(IndexFailure {
                                    path: relative,
                                    message: e.error().to_string(),
                                });
                            }
                        }
                    }
                }
                Err(e) => {
                    warn!(pattern = %pattern, error = %e, "Invalid glob pattern");
                }
            }
        }
        matched.sort();
        matched.dedup();

        for path in matched {
            let relative = relative_key(&path, root);
            if excluded.iter().any(|p| p.matches(&relative)) {
                continue;
            }
            snapshot.record(relative, std::fs::read(&path));
        }

        info!(
            root = %root.display(),
            files = snapshot.files.len(),
            skipped = snapshot.unreadable.len(),
            "Loaded source snapshot"
        );
        snapshot
    }

    /// Keep the outcome of reading one file: its text, or why it was skipped.
    fn record(&mut self, relative: String, read: std::io::Result<Vec<u8>>) {
        let message = match read.map(String::from_utf8) {
            Ok(Ok(text)) => {
                self.files.insert(relative, text);
                return;
            }
            Ok(Err(_)) => "file is not valid UTF-8".to_string(),
            Err(e) => e.to_string(),
        };
        warn!(path = %relative, reason = %message, "Skipping unreadable file");
        self.unreadable.push(IndexFailure {
            path: relative,
            message,
        });
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Files in path order.
    pub fn files(&self) -> impl Iterator<Item = (&str, &str)> {
        self.files.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Files that were found but could not be read as text.
    pub fn unreadable(&self) -> &[IndexFailure] {
        &self.unreadable
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

fn relative_key(path: &Path, root: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    normalize_relative(&relative.to_string_lossy())
}

fn normalize_relative(path: &str) -> String {
    let unified = path.replace('\\', "/");
    unified
        .trim_start_matches("./")
        .trim_start_matches('/')
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patterns(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn load_respects_include_and_exclude() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("pkg/sub")).unwrap();
        std::fs::create_dir_all(root.join("build")).unwrap();
        std::fs::write(root.join("pkg/a.py"), "def a():\n    pass\n").unwrap();
        std::fs::write(root.join("pkg/sub/B.java"), "class B {}\n").unwrap();
        std::fs::write(root.join("build/gen.py"), "x = 1\n").unwrap();
        std::fs::write(root.join("README.md"), "# readme\n").unwrap();

        let snapshot = SourceSnapshot::load(
            root,
            &patterns(&["**/*.py", "**/*.java"]),
            &patterns(&["build/**"]),
        );

        let keys: Vec<&str> = snapshot.files().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["pkg/a.py", "pkg/sub/B.java"]);
        assert_eq!(snapshot.files().nth(1), Some(("pkg/sub/B.java", "class B {}\n")));
        assert_eq!(snapshot.root(), root);
    }

    #[test]
    fn non_utf8_files_are_recorded_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("bad.py"), [0xff, 0xfe, 0x00]).unwrap();
        std::fs::write(dir.path().join("good.py"), "x = 1\n").unwrap();

        let snapshot = SourceSnapshot::load(dir.path(), &patterns(&["*.py"]), &[]);

        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.unreadable().len(), 1);
        assert_eq!(snapshot.unreadable()[0].path, "bad.py");
    }

    #[test]
    fn read_errors_are_recorded_and_the_rest_kept() {
        let mut snapshot = SourceSnapshot::new("/pkg");
        snapshot.record("a.py".to_string(), Ok(b"x = 1\n".to_vec()));
        snapshot.record(
            "locked.py".to_string(),
            Err(std::io::Error::from(std::io::ErrorKind::PermissionDenied)),
        );
        snapshot.record("z.py".to_string(), Ok(b"y = 2\n".to_vec()));

        let keys: Vec<&str> = snapshot.files().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["a.py", "z.py"]);
        assert_eq!(snapshot.unreadable().len(), 1);
        assert_eq!(snapshot.unreadable()[0].path, "locked.py");
        assert!(snapshot.unreadable()[0].message.contains("ermission"));
    }

    #[test]
    fn inserted_paths_are_normalized() {
        let snapshot = SourceSnapshot::new("/tmp/x")
            .with_file("./a/b.py", "")
            .with_file(r"c\d.java", "");
        let keys: Vec<&str> = snapshot.files().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["a/b.py", "c/d.java"]);
    }
}
