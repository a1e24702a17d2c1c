use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;

const PREVIOUS_APP: &str = "import os


def run(cmd):
    os.system(cmd)


def safe():
    return 1
";

const CURRENT_APP: &str = "import subprocess


def run(cmd):
    subprocess.run(cmd.split(), check=True)


def safe():
    return 1
";

fn daa() -> Command {
    Command::cargo_bin("daa").unwrap()
}

fn bandit_record(file: &str, test_name: &str, test_id: &str, line: usize) -> serde_json::Value {
    serde_json::json!({
        "filename": file,
        "test_name": test_name,
        "test_id": test_id,
        "issue_severity": "HIGH",
        "issue_confidence": "HIGH",
        "issue_text": format!("{test_name} detected."),
        "line_number": line,
        "line_range": [line],
    })
}

fn write_json(path: &Path, value: &serde_json::Value) {
    std::fs::write(path, serde_json::to_string_pretty(value).unwrap()).unwrap();
}

/// Two package revisions plus one Bandit report for each.
struct Fixture {
    dir: tempfile::TempDir,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        for (side, app) in [("prev", PREVIOUS_APP), ("curr", CURRENT_APP)] {
            std::fs::create_dir_all(root.join(side)).unwrap();
            std::fs::write(root.join(side).join("app.py"), app).unwrap();
        }
        write_json(
            &root.join("prev.json"),
            &serde_json::json!([
                bandit_record("app.py", "start_process_with_a_shell", "B605", 5),
                bandit_record("app.py", "import_subprocess", "B404", 1),
            ]),
        );
        write_json(
            &root.join("curr.json"),
            &serde_json::json!([bandit_record("app.py", "import_subprocess", "B404", 1)]),
        );
        Self { dir }
    }

    fn path(&self, rel: &str) -> std::path::PathBuf {
        self.dir.path().join(rel)
    }

    fn compare(&self) -> Command {
        let mut cmd = daa();
        cmd.arg("compare")
            .args(["--tool", "bandit"])
            .arg("--previous")
            .arg(self.path("prev.json"))
            .arg("--current")
            .arg(self.path("curr.json"))
            .arg("--previous-root")
            .arg(self.path("prev"))
            .arg("--current-root")
            .arg(self.path("curr"));
        cmd
    }
}

#[test]
fn help_lists_subcommands() {
    daa()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("index"))
        .stdout(predicate::str::contains("context"))
        .stdout(predicate::str::contains("compare"));
}

#[test]
fn context_resolves_enclosing_function() {
    let fixture = Fixture::new();
    daa()
        .arg("context")
        .arg(fixture.path("prev/app.py"))
        .arg("5")
        .assert()
        .success()
        .stdout("run\n");
}

#[test]
fn context_outside_any_scope_uses_filename() {
    let fixture = Fixture::new();
    daa()
        .arg("context")
        .arg(fixture.path("prev/app.py"))
        .arg("1")
        .assert()
        .success()
        .stdout("app.py\n")
        .stderr(predicate::str::contains("outside every scope"));
}

#[test]
fn context_missing_file_exits_with_path_code() {
    daa()
        .args(["context", "/nonexistent/app.py", "3"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("Cannot resolve path"));
}

#[test]
fn index_json_lists_scopes() {
    let fixture = Fixture::new();
    let output = daa()
        .arg("index")
        .arg(fixture.path("prev"))
        .args(["--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["files"], 1);
    let names: Vec<&str> = json["scopes"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|row| row["name"].as_str())
        .collect();
    assert_eq!(names, vec!["run", "safe"]);
}

#[test]
fn compare_text_reports_resolved_finding() {
    let fixture = Fixture::new();
    fixture
        .compare()
        .arg("--quiet")
        .assert()
        .success()
        .stdout(predicate::str::contains("Resolution: bandit"))
        .stdout(predicate::str::contains("1 resolved by exact match"))
        .stdout(predicate::str::contains("app.py:5 in run"))
        .stdout(predicate::str::contains("2 lookup ambiguity"));
}

#[test]
fn compare_json_has_summary_and_hierarchy() {
    let fixture = Fixture::new();
    let output = fixture
        .compare()
        .args(["--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["tool"], "bandit");
    assert_eq!(json["summary"]["previous_findings"], 2);
    assert_eq!(json["summary"]["current_findings"], 1);
    assert_eq!(json["summary"]["resolved_exact"], 1);
    assert_eq!(json["summary"]["daa_resolved"], 1);
    assert_eq!(json["findings"][0]["context"], "run");
    assert_eq!(json["findings"][0]["resolved"], true);
    assert_eq!(json["findings"][1]["resolved"], false);
}

#[test]
fn compare_markdown_has_level_table() {
    let fixture = Fixture::new();
    fixture
        .compare()
        .args(["--format", "markdown"])
        .assert()
        .success()
        .stdout(predicate::str::contains("| Level | Key columns | Resolved | Keys |"))
        .stdout(predicate::str::contains("| `app.py` | `run` | 5 |"));
}

#[test]
fn compare_rejects_unknown_tool() {
    let fixture = Fixture::new();
    daa()
        .arg("compare")
        .args(["--tool", "pylint"])
        .arg("--previous")
        .arg(fixture.path("prev.json"))
        .arg("--current")
        .arg(fixture.path("curr.json"))
        .assert()
        .failure();
}

#[test]
fn compare_requires_a_revision_source() {
    let fixture = Fixture::new();
    daa()
        .arg("compare")
        .args(["--tool", "bandit"])
        .arg("--previous")
        .arg(fixture.path("prev.json"))
        .arg("--current")
        .arg(fixture.path("curr.json"))
        .assert()
        .code(1)
        .stderr(predicate::str::contains("--repo and --commit"));
}

#[test]
fn compare_malformed_report_exits_with_ingest_code() {
    let fixture = Fixture::new();
    std::fs::write(fixture.path("prev.json"), "{ not an array").unwrap();
    fixture
        .compare()
        .assert()
        .code(4)
        .stderr(predicate::str::contains("malformed report"));
}

#[test]
fn compare_missing_report_in_config_directory_exits_with_ingest_code() {
    let fixture = Fixture::new();
    daa()
        .arg("compare")
        .args(["--tool", "bandit"])
        .arg("--previous")
        .arg(fixture.path("config/prev.json"))
        .arg("--current")
        .arg(fixture.path("curr.json"))
        .arg("--previous-root")
        .arg(fixture.path("prev"))
        .arg("--current-root")
        .arg(fixture.path("curr"))
        .assert()
        .code(4)
        .stderr(predicate::str::contains("cannot read report"));
}

#[test]
fn compare_invalid_config_exits_with_config_code() {
    let fixture = Fixture::new();
    std::fs::write(
        fixture.path("curr/.daa.toml"),
        "[scope]\ninclude_patterns = []\n",
    )
    .unwrap();
    fixture
        .compare()
        .assert()
        .code(2)
        .stderr(predicate::str::contains("include_patterns"));
}
