// Hierarchical resolution: Package ⊂ File ⊂ Function ⊂ Line.
//
// Each level counts findings per key on both sides and marks a key resolved
// when the previous revision has more of them than the current one. Counts
// are compared as populations; two identically keyed findings that are
// swapped between revisions cancel out.

use std::collections::BTreeMap;
use std::fmt;

use daa_scope::PackageIndex;
use serde::Serialize;
use tracing::debug;

use crate::finding::{Finding, RuleIdentity, Tool};

/// One grouping granularity. Each level's key extends the previous one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HierarchyLevel {
    Package,
    File,
    Function,
    Line,
}

impl HierarchyLevel {
    pub const ALL: [HierarchyLevel; 4] = [
        HierarchyLevel::Package,
        HierarchyLevel::File,
        HierarchyLevel::Function,
        HierarchyLevel::Line,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Package => "package",
            Self::File => "file",
            Self::Function => "function",
            Self::Line => "line",
        }
    }

    /// Location columns this level adds on top of the rule identity.
    pub fn location_columns(self) -> &'static [&'static str] {
        match self {
            Self::Package => &[],
            Self::File => &["filename_clean"],
            Self::Function => &["filename_clean", "context"],
            Self::Line => &["filename_clean", "context", "start_line"],
        }
    }

    /// Full ordered key-column list for `tool`.
    pub fn key_columns(self, tool: Tool) -> Vec<&'static str> {
        tool.identity_columns()
            .iter()
            .chain(self.location_columns())
            .copied()
            .collect()
    }
}

impl fmt::Display for HierarchyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Grouping key of a finding at some level. Columns below the level are
/// `None`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct HierarchyKey {
    #[serde(flatten)]
    pub identity: RuleIdentity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename_clean: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_line: Option<usize>,
}

impl HierarchyKey {
    pub fn of(finding: &Finding, level: HierarchyLevel) -> Self {
        Self {
            identity: finding.identity(),
            filename_clean: Some(finding.filename_clean.clone()),
            context: Some(finding.context.clone()),
            start_line: Some(finding.start_line),
        }
        .truncate(level)
    }

    /// The key of the broader `level` sharing this key's column prefix.
    #[must_use]
    pub fn truncate(&self, level: HierarchyLevel) -> Self {
        Self {
            identity: self.identity.clone(),
            filename_clean: (level >= HierarchyLevel::File)
                .then(|| self.filename_clean.clone())
                .flatten(),
            context: (level >= HierarchyLevel::Function)
                .then(|| self.context.clone())
                .flatten(),
            start_line: (level >= HierarchyLevel::Line)
                .then_some(self.start_line)
                .flatten(),
        }
    }
}

/// Counts and verdict for one key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LevelVerdict {
    pub previous_count: usize,
    pub current_count: usize,
    pub resolved: bool,
    pub resolved_count: usize,
}

impl LevelVerdict {
    pub fn from_counts(previous_count: usize, current_count: usize) -> Self {
        let resolved = previous_count > current_count;
        Self {
            previous_count,
            current_count,
            resolved,
            resolved_count: if resolved {
                previous_count - current_count
            } else {
                0
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LevelRow {
    #[serde(flatten)]
    pub key: HierarchyKey,
    #[serde(flatten)]
    pub verdict: LevelVerdict,
}

/// Outer-joined count table of one level, sorted by key.
#[derive(Debug, Clone, Serialize)]
pub struct LevelDiff {
    pub level: HierarchyLevel,
    pub rows: Vec<LevelRow>,
}

impl LevelDiff {
    pub fn compute(level: HierarchyLevel, previous: &[Finding], current: &[Finding]) -> Self {
        let mut counts: BTreeMap<HierarchyKey, (usize, usize)> = BTreeMap::new();
        for f in previous {
            counts.entry(HierarchyKey::of(f, level)).or_default().0 += 1;
        }
        for f in current {
            counts.entry(HierarchyKey::of(f, level)).or_default().1 += 1;
        }

        let rows = counts
            .into_iter()
            .map(|(key, (prev, curr))| LevelRow {
                key,
                verdict: LevelVerdict::from_counts(prev, curr),
            })
            .collect();
        Self { level, rows }
    }

    pub fn get(&self, key: &HierarchyKey) -> Option<&LevelRow> {
        self.rows
            .binary_search_by(|row| row.key.cmp(key))
            .ok()
            .map(|i| &self.rows[i])
    }

    pub fn resolved(&self) -> impl Iterator<Item = &LevelRow> {
        self.rows.iter().filter(|r| r.verdict.resolved)
    }
}

/// One line-level key with the verdicts of every enclosing level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CombinedRow {
    #[serde(flatten)]
    pub key: HierarchyKey,
    pub package: LevelVerdict,
    pub file: LevelVerdict,
    pub function: LevelVerdict,
    pub line: LevelVerdict,
    pub daa_resolved: bool,
    /// Whether the file is in the current revision's index. `None` when the
    /// current revision was not indexed.
    pub file_in_current: Option<bool>,
    pub context_in_current: Option<bool>,
}

impl CombinedRow {
    pub fn verdict(&self, level: HierarchyLevel) -> &LevelVerdict {
        match level {
            HierarchyLevel::Package => &self.package,
            HierarchyLevel::File => &self.file,
            HierarchyLevel::Function => &self.function,
            HierarchyLevel::Line => &self.line,
        }
    }
}

/// Per-level tables plus the combined line-level table.
#[derive(Debug, Clone, Serialize)]
pub struct HierarchyDiff {
    pub package: LevelDiff,
    pub file: LevelDiff,
    pub function: LevelDiff,
    pub line: LevelDiff,
    pub combined: Vec<CombinedRow>,
}

impl HierarchyDiff {
    pub fn level(&self, level: HierarchyLevel) -> &LevelDiff {
        match level {
            HierarchyLevel::Package => &self.package,
            HierarchyLevel::File => &self.file,
            HierarchyLevel::Function => &self.function,
            HierarchyLevel::Line => &self.line,
        }
    }

    pub fn daa_resolved(&self) -> impl Iterator<Item = &CombinedRow> {
        self.combined.iter().filter(|r| r.daa_resolved)
    }

    /// Record whether each row's file and context still exist in `current`.
    pub fn annotate_presence(&mut self, current: &PackageIndex) {
        for row in &mut self.combined {
            let file = row.key.filename_clean.as_deref().unwrap_or_default();
            let context = row.key.context.as_deref().unwrap_or_default();
            row.file_in_current = Some(current.contains_file(file));
            row.context_in_current = Some(current.contains_context(file, context));
        }
    }
}

/// Groups both revisions at every level and joins the verdicts.
#[derive(Debug, Default, Clone, Copy)]
pub struct HierarchicalResolver;

impl HierarchicalResolver {
    pub fn resolve(&self, previous: &[Finding], current: &[Finding]) -> HierarchyDiff {
        let package = LevelDiff::compute(HierarchyLevel::Package, previous, current);
        let file = LevelDiff::compute(HierarchyLevel::File, previous, current);
        let function = LevelDiff::compute(HierarchyLevel::Function, previous, current);
        let line = LevelDiff::compute(HierarchyLevel::Line, previous, current);

        // Every line key's prefixes were counted from the same findings, so
        // the lookups below only miss on a broken invariant.
        let verdict_of = |diff: &LevelDiff, key: &HierarchyKey| {
            diff.get(&key.truncate(diff.level))
                .map(|row| row.verdict)
                .unwrap_or_default()
        };

        let combined: Vec<CombinedRow> = line
            .rows
            .iter()
            .map(|row| {
                let package_v = verdict_of(&package, &row.key);
                let file_v = verdict_of(&file, &row.key);
                let function_v = verdict_of(&function, &row.key);
                let line_v = row.verdict;
                CombinedRow {
                    key: row.key.clone(),
                    package: package_v,
                    file: file_v,
                    function: function_v,
                    line: line_v,
                    daa_resolved: package_v.resolved
                        && file_v.resolved
                        && function_v.resolved
                        && line_v.resolved,
                    file_in_current: None,
                    context_in_current: None,
                }
            })
            .collect();

        debug!(
            package_keys = package.rows.len(),
            line_keys = line.rows.len(),
            daa_resolved = combined.iter().filter(|r| r.daa_resolved).count(),
            "Resolved hierarchy"
        );

        HierarchyDiff {
            package,
            file,
            function,
            line,
            combined,
        }
    }
}
