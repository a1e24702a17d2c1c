// Integration test utilities and fixture management for DAA.

use std::path::Path;
use std::process::Command;

use daa_core::config::DaaConfig;
use daa_core::finding::{Finding, Tool, parse_report};
use daa_core::pipeline::DaaPipeline;
use daa_core::report::ResolutionReport;
use daa_core::revision::GitCheckout;

pub const PYTHON_BEFORE: &str = "import os


def run(cmd):
    os.system(cmd)
";

pub const PYTHON_AFTER: &str = "import subprocess


def validate(cmd):
    return cmd.strip()


def run(cmd):
    subprocess.run(validate(cmd).split(), check=True)
";

pub const JAVA_BEFORE: &str = "package com.acme;

import java.sql.Connection;

public class Dao {
    private final Connection conn;

    public Dao(Connection conn) {
        this.conn = conn;
    }

    public void find(String id) throws Exception {
        conn.createStatement().executeQuery(\"SELECT * FROM t WHERE id = \" + id);
    }
}
";

pub const JAVA_AFTER: &str = "package com.acme;

import java.sql.Connection;
import java.sql.PreparedStatement;

public class Dao {
    private final Connection conn;

    public Dao(Connection conn) {
        this.conn = conn;
    }

    public void find(String id) throws Exception {
        PreparedStatement stmt = conn.prepareStatement(\"SELECT * FROM t WHERE id = ?\");
        stmt.setString(1, id);
        stmt.executeQuery();
    }
}
";

/// A test fixture with a temporary git repository holding a vulnerable
/// commit followed by its fix.
#[derive(Debug)]
pub struct TestRepo {
    pub dir: tempfile::TempDir,
    /// Package directory inside the repository.
    pub package: String,
    pub fix_commit: String,
}

impl TestRepo {
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Python package `pkg/` whose `os.system` call is replaced by
    /// `subprocess.run`, with a new function inserted above it.
    pub fn python_fix() -> Self {
        Self::with_fix("pkg", "app.py", PYTHON_BEFORE, PYTHON_AFTER)
    }

    /// Java package `svc/` whose string-built query becomes a prepared
    /// statement.
    pub fn java_fix() -> Self {
        Self::with_fix("svc", "Dao.java", JAVA_BEFORE, JAVA_AFTER)
    }

    fn with_fix(package: &str, file: &str, before: &str, after: &str) -> Self {
        let dir = tempfile::tempdir().expect("create tempdir");
        let root = dir.path();

        git(root, &["init"]);
        git(root, &["config", "user.email", "test@daa.dev"]);
        git(root, &["config", "user.name", "Test"]);

        // Commit 1: vulnerable revision
        std::fs::create_dir_all(root.join(package)).unwrap();
        write_file(root, &format!("{package}/{file}"), before);
        write_file(root, "README.md", "# Fixture\n");
        git(root, &["add", "."]);
        git(root, &["commit", "-m", "Initial commit"]);

        // Commit 2: the fix
        write_file(root, &format!("{package}/{file}"), after);
        git(root, &["add", "."]);
        git(root, &["commit", "-m", "Fix injection"]);

        let fix_commit = rev_parse(root, "HEAD");
        Self {
            dir,
            package: package.to_string(),
            fix_commit,
        }
    }

    /// Commit SHA `rev` resolves to.
    pub fn rev_parse(&self, rev: &str) -> String {
        rev_parse(self.path(), rev)
    }

    pub fn checkout(&self) -> GitCheckout {
        GitCheckout::new(self.path(), self.fix_commit.clone()).with_package(&self.package)
    }
}

/// Run a git command in `dir` with fixed dates, panicking on failure.
pub fn git(dir: &Path, args: &[&str]) {
    git_output(dir, args);
}

fn git_output(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .env("GIT_AUTHOR_DATE", "2025-01-15T10:00:00+00:00")
        .env("GIT_COMMITTER_DATE", "2025-01-15T10:00:00+00:00")
        .output()
        .unwrap_or_else(|e| panic!("git {}: {e}", args.join(" ")));
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        panic!("git {} failed: {stderr}", args.join(" "));
    }
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

fn rev_parse(dir: &Path, rev: &str) -> String {
    git_output(dir, &["rev-parse", rev])
}

fn write_file(root: &Path, rel: &str, content: &str) {
    std::fs::write(root.join(rel), content).unwrap();
}

/// Decode an in-memory report for `tool`.
pub fn findings(tool: Tool, records: &serde_json::Value) -> Vec<Finding> {
    parse_report(tool, &records.to_string(), Path::new("<fixture>")).unwrap()
}

/// Run a comparison of the repo's fix commit against its parent.
pub fn run_checkout(
    repo: &TestRepo,
    tool: Tool,
    previous: Vec<Finding>,
    current: Vec<Finding>,
) -> daa_core::error::Result<ResolutionReport> {
    let config = DaaConfig::default();
    let mut source = repo.checkout();
    DaaPipeline::new(tool, &config).run(previous, current, &mut source)
}
