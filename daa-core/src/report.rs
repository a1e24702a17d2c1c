use serde::Serialize;

use crate::finding::Tool;
use crate::hierarchy::{HierarchyDiff, HierarchyLevel};
use crate::matching::{Granularity, MatchVerdict};
use crate::revision::Side;

/// Non-fatal condition met during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RunIssue {
    /// A source file could not be parsed and was left out of the index.
    ParseFailure {
        side: Side,
        path: String,
        message: String,
    },
    /// A finding's line had no enclosing scope, or overlapping scopes that
    /// are not a class/method pair.
    LookupAmbiguity {
        side: Side,
        path: String,
        line: usize,
        candidates: usize,
        context: String,
    },
    /// A revision has no findings at all.
    EmptyRevision { side: Side },
}

impl RunIssue {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ParseFailure { .. } => "parse_failure",
            Self::LookupAmbiguity { .. } => "lookup_ambiguity",
            Self::EmptyRevision { .. } => "empty_revision",
        }
    }
}

/// Headline numbers of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub previous_findings: usize,
    pub current_findings: usize,
    /// Previous findings without an exact counterpart in the current revision.
    pub resolved_exact: usize,
    pub resolved_package_keys: usize,
    pub resolved_file_keys: usize,
    pub resolved_function_keys: usize,
    pub resolved_line_keys: usize,
    /// Line-level keys resolved at every level.
    pub daa_resolved: usize,
}

impl Summary {
    pub fn resolved_keys(&self, level: HierarchyLevel) -> usize {
        match level {
            HierarchyLevel::Package => self.resolved_package_keys,
            HierarchyLevel::File => self.resolved_file_keys,
            HierarchyLevel::Function => self.resolved_function_keys,
            HierarchyLevel::Line => self.resolved_line_keys,
        }
    }
}

/// Everything a comparison run produces.
#[derive(Debug, Clone, Serialize)]
pub struct ResolutionReport {
    pub tool: Tool,
    pub granularity: Granularity,
    pub summary: Summary,
    /// Exact-match verdicts for the previous revision, in report order.
    pub findings: Vec<MatchVerdict>,
    pub hierarchy: HierarchyDiff,
    pub issues: Vec<RunIssue>,
}

impl ResolutionReport {
    pub fn new(
        tool: Tool,
        granularity: Granularity,
        current_findings: usize,
        findings: Vec<MatchVerdict>,
        hierarchy: HierarchyDiff,
        issues: Vec<RunIssue>,
    ) -> Self {
        let summary = Summary {
            previous_findings: findings.len(),
            current_findings,
            resolved_exact: findings.iter().filter(|v| v.resolved).count(),
            resolved_package_keys: hierarchy.package.resolved().count(),
            resolved_file_keys: hierarchy.file.resolved().count(),
            resolved_function_keys: hierarchy.function.resolved().count(),
            resolved_line_keys: hierarchy.line.resolved().count(),
            daa_resolved: hierarchy.daa_resolved().count(),
        };
        Self {
            tool,
            granularity,
            summary,
            findings,
            hierarchy,
            issues,
        }
    }

    pub fn issues_of<'a>(&'a self, kind: &'a str) -> impl Iterator<Item = &'a RunIssue> + 'a {
        self.issues.iter().filter(move |i| i.kind() == kind)
    }
}
