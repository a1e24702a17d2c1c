// Revision materialization.
//
// A source produces an immutable snapshot per side. Git checkouts mutate the
// working tree, so callers must finish with one side before asking for the
// other.

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;

use daa_scope::SourceSnapshot;
use serde::Serialize;
use tracing::{info, instrument};

use crate::config::ScopeSection;
use crate::error::{CheckoutError, Result};

/// Which revision of the pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Previous,
    Current,
}

impl Side {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Previous => "previous",
            Self::Current => "current",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Produces the source files of each side of a comparison.
pub trait RevisionSource {
    /// Package root of `side`, as the analysis tools saw it.
    fn root(&self, side: Side) -> PathBuf;

    /// Capture the files of `side`.
    fn materialize(&mut self, side: Side, scope: &ScopeSection) -> Result<SourceSnapshot>;

    /// Path prefixes the tools may have recorded in front of
    /// package-relative paths.
    fn report_prefixes(&self, side: Side) -> Vec<String> {
        vec![self.root(side).display().to_string()]
    }
}

/// Two already checked-out package directories.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    previous: PathBuf,
    current: PathBuf,
}

impl DirectorySource {
    pub fn new(previous: impl Into<PathBuf>, current: impl Into<PathBuf>) -> Self {
        Self {
            previous: previous.into(),
            current: current.into(),
        }
    }
}

impl RevisionSource for DirectorySource {
    fn root(&self, side: Side) -> PathBuf {
        match side {
            Side::Previous => self.previous.clone(),
            Side::Current => self.current.clone(),
        }
    }

    fn materialize(&mut self, side: Side, scope: &ScopeSection) -> Result<SourceSnapshot> {
        load_package(&self.root(side), scope)
    }
}

/// One git working tree switched between the parent of a fix commit
/// (previous) and the fix commit itself (current).
#[derive(Debug, Clone)]
pub struct GitCheckout {
    repo: PathBuf,
    commit: String,
    package: Option<PathBuf>,
}

impl GitCheckout {
    pub fn new(repo: impl Into<PathBuf>, commit: impl Into<String>) -> Self {
        Self {
            repo: repo.into(),
            commit: commit.into(),
            package: None,
        }
    }

    /// Restrict indexing to a package directory inside the repository.
    #[must_use]
    pub fn with_package(mut self, package: impl Into<PathBuf>) -> Self {
        self.package = Some(package.into());
        self
    }

    /// Revision checked out for `side`.
    pub fn revision(&self, side: Side) -> String {
        match side {
            Side::Previous => format!("{}^", self.commit),
            Side::Current => self.commit.clone(),
        }
    }

    #[instrument(skip(self), fields(repo = %self.repo.display()))]
    fn checkout(&self, rev: &str) -> std::result::Result<(), CheckoutError> {
        let output = Command::new("git")
            .args(["checkout", "--quiet", "--detach", rev])
            .current_dir(&self.repo)
            .output()?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(CheckoutError::Failed {
                rev: rev.to_string(),
                stderr,
            });
        }
        info!(rev, "Checked out revision");
        Ok(())
    }
}

impl RevisionSource for GitCheckout {
    fn root(&self, _side: Side) -> PathBuf {
        match &self.package {
            Some(package) => self.repo.join(package),
            None => self.repo.clone(),
        }
    }

    fn materialize(&mut self, side: Side, scope: &ScopeSection) -> Result<SourceSnapshot> {
        self.checkout(&self.revision(side))?;
        load_package(&self.root(side), scope)
    }

    fn report_prefixes(&self, side: Side) -> Vec<String> {
        let mut prefixes = vec![self.root(side).display().to_string()];
        if let Some(package) = &self.package {
            prefixes.push(package.display().to_string());
        }
        prefixes
    }
}

fn load_package(root: &Path, scope: &ScopeSection) -> Result<SourceSnapshot> {
    if !root.is_dir() {
        return Err(CheckoutError::MissingPackage(root.to_path_buf()).into());
    }
    Ok(SourceSnapshot::load(
        root,
        &scope.include_patterns,
        &scope.exclude_patterns,
    ))
}
