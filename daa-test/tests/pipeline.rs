use daa_core::error::{CheckoutError, DaaError};
use daa_core::finding::Tool;
use daa_core::hierarchy::HierarchyLevel;
use daa_core::report::RunIssue;
use daa_core::revision::{GitCheckout, Side};
use daa_test::{TestRepo, findings, run_checkout};

fn bandit(file: &str, test_name: &str, test_id: &str, line: usize) -> serde_json::Value {
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

fn spotbugs(file: &str, category: &str, message: &str, line: usize) -> serde_json::Value {
    serde_json::json!({
        "category": category,
        "severity": "1",
        "message": message,
        "fileName": file,
        "startLine": line,
        "endLine": line,
    })
}

#[test]
fn python_fix_commit_resolves_shell_call() -> anyhow::Result<()> {
    let repo = TestRepo::python_fix();
    let previous = findings(
        Tool::Bandit,
        &serde_json::json!([bandit("./pkg/app.py", "start_process_with_a_shell", "B605", 5)]),
    );
    let current = findings(
        Tool::Bandit,
        &serde_json::json!([bandit(
            "pkg/app.py",
            "subprocess_without_shell_equals_true",
            "B603",
            9
        )]),
    );

    let report = run_checkout(&repo, Tool::Bandit, previous, current)?;

    // Line 5 is inside `run` only in the parent revision.
    assert_eq!(report.findings[0].filename_clean, "app.py");
    assert_eq!(report.findings[0].context, "run");
    assert!(report.findings[0].resolved);
    assert_eq!(report.summary.daa_resolved, 1);

    let new_finding = report
        .hierarchy
        .line
        .rows
        .iter()
        .find(|row| row.key.start_line == Some(9))
        .expect("current finding keyed at line 9");
    assert_eq!(new_finding.key.context.as_deref(), Some("run"));
    assert_eq!(new_finding.verdict.previous_count, 0);
    assert!(!new_finding.verdict.resolved);

    let resolved = &report.hierarchy.combined[0];
    assert_eq!(resolved.file_in_current, Some(true));
    assert_eq!(resolved.context_in_current, Some(true));

    // Current revision is checked out last.
    assert_eq!(repo.rev_parse("HEAD"), repo.fix_commit);
    assert!(report.issues.is_empty());
    Ok(())
}

#[test]
fn java_fix_commit_resolves_query_but_keeps_constructor_finding() -> anyhow::Result<()> {
    let repo = TestRepo::java_fix();
    let previous = findings(
        Tool::SpotBugs,
        &serde_json::json!([
            spotbugs("svc/Dao.java", "SECURITY", "SQL injection in find", 13),
            spotbugs("svc/Dao.java", "BAD_PRACTICE", "Field stored without copy", 9),
        ]),
    );
    let current = findings(
        Tool::SpotBugs,
        &serde_json::json!([spotbugs(
            "svc/Dao.java",
            "BAD_PRACTICE",
            "Field stored without copy",
            10
        )]),
    );

    let report = run_checkout(&repo, Tool::SpotBugs, previous, current)?;

    assert_eq!(report.findings[0].context, "Dao.find");
    assert!(report.findings[0].resolved);
    assert_eq!(report.findings[1].context, "Dao.Dao");
    assert!(report.findings[1].still_present);

    // The constructor finding moved a line, so only its line key resolves.
    assert_eq!(report.summary.resolved_keys(HierarchyLevel::Package), 1);
    assert_eq!(report.summary.resolved_keys(HierarchyLevel::Function), 1);
    assert_eq!(report.summary.resolved_keys(HierarchyLevel::Line), 2);
    assert_eq!(report.summary.daa_resolved, 1);
    Ok(())
}

#[test]
fn empty_current_report_leaves_parent_checked_out() -> anyhow::Result<()> {
    let repo = TestRepo::python_fix();
    let previous = findings(
        Tool::Bandit,
        &serde_json::json!([bandit("pkg/app.py", "start_process_with_a_shell", "B605", 5)]),
    );

    let report = run_checkout(&repo, Tool::Bandit, previous, Vec::new())?;

    assert_eq!(report.findings[0].context, "run");
    assert_eq!(report.summary.daa_resolved, 1);
    assert_eq!(
        report.issues,
        vec![RunIssue::EmptyRevision {
            side: Side::Current
        }]
    );
    assert_eq!(report.hierarchy.combined[0].file_in_current, None);
    assert_eq!(repo.rev_parse("HEAD"), repo.rev_parse(&format!("{}^", repo.fix_commit)));
    Ok(())
}

#[test]
fn missing_package_directory_fails_the_run() {
    let repo = TestRepo::python_fix();
    let previous = findings(
        Tool::Bandit,
        &serde_json::json!([bandit("pkg/app.py", "start_process_with_a_shell", "B605", 5)]),
    );
    let config = daa_core::config::DaaConfig::default();
    let mut source = GitCheckout::new(repo.path(), repo.fix_commit.clone()).with_package("nope");

    let err = daa_core::pipeline::DaaPipeline::new(Tool::Bandit, &config)
        .run(previous, Vec::new(), &mut source)
        .unwrap_err();
    assert!(matches!(
        err,
        DaaError::Checkout(CheckoutError::MissingPackage(_))
    ));
}

#[test]
fn unknown_commit_fails_the_checkout() {
    let repo = TestRepo::python_fix();
    let previous = findings(
        Tool::Bandit,
        &serde_json::json!([bandit("pkg/app.py", "start_process_with_a_shell", "B605", 5)]),
    );
    let config = daa_core::config::DaaConfig::default();
    let mut source = GitCheckout::new(repo.path(), "0000000000000000000000000000000000000000");

    let err = daa_core::pipeline::DaaPipeline::new(Tool::Bandit, &config)
        .run(previous, Vec::new(), &mut source)
        .unwrap_err();
    assert!(matches!(
        err,
        DaaError::Checkout(CheckoutError::Failed { .. })
    ));
}
