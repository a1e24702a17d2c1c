// Comparison pipeline: materialize → index → normalize/enrich → match → resolve.
//
// The previous revision is captured and fully indexed before the current one
// is materialized. A side without findings is never indexed.

use std::path::{Path, PathBuf};

use daa_scope::{LookupOutcome, PackageIndex, ScopeIndexBuilder};
use tracing::{debug, info, instrument, warn};

use crate::config::DaaConfig;
use crate::error::Result;
use crate::finding::{Finding, Tool};
use crate::hierarchy::HierarchicalResolver;
use crate::matching::FindingMatcher;
use crate::normalize::FindingNormalizer;
use crate::progress::{NoopReporter, ProgressReporter};
use crate::report::{ResolutionReport, RunIssue};
use crate::revision::{RevisionSource, Side};

/// Enriched findings of both revisions, ready for comparison.
#[derive(Debug, Clone, Default)]
pub struct RevisionPair {
    pub previous: Vec<Finding>,
    pub current: Vec<Finding>,
    pub package_root: PathBuf,
}

/// Runs one comparison between two revisions of a package.
pub struct DaaPipeline<'a> {
    tool: Tool,
    config: &'a DaaConfig,
    builder: ScopeIndexBuilder,
    progress: &'a dyn ProgressReporter,
}

impl std::fmt::Debug for DaaPipeline<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DaaPipeline")
            .field("tool", &self.tool)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<'a> DaaPipeline<'a> {
    pub fn new(tool: Tool, config: &'a DaaConfig) -> Self {
        Self {
            tool,
            config,
            builder: ScopeIndexBuilder::new(),
            progress: &NoopReporter,
        }
    }

    #[must_use]
    pub fn with_progress(mut self, progress: &'a dyn ProgressReporter) -> Self {
        self.progress = progress;
        self
    }

    /// Compare `previous` against `current`, materializing each side from
    /// `source` in order.
    #[instrument(skip_all, name = "daa_run", fields(tool = %self.tool))]
    pub fn run(
        &self,
        previous: Vec<Finding>,
        current: Vec<Finding>,
        source: &mut dyn RevisionSource,
    ) -> Result<ResolutionReport> {
        let mut issues = Vec::new();

        let (previous, _) = self.prepare_side(Side::Previous, previous, source, &mut issues)?;
        let (current, current_index) =
            self.prepare_side(Side::Current, current, source, &mut issues)?;

        let pair = RevisionPair {
            previous,
            current,
            package_root: source.root(Side::Current),
        };
        Ok(self.compare(&pair, current_index.as_ref(), issues))
    }

    /// Match and resolve an already enriched pair.
    #[instrument(skip_all, name = "daa_compare")]
    pub fn compare(
        &self,
        pair: &RevisionPair,
        current_index: Option<&PackageIndex>,
        issues: Vec<RunIssue>,
    ) -> ResolutionReport {
        let granularity = self.config.matching.granularity;
        let verdicts = FindingMatcher::new(granularity, &pair.current).verdicts(&pair.previous);

        let mut hierarchy = HierarchicalResolver.resolve(&pair.previous, &pair.current);
        if let Some(index) = current_index {
            hierarchy.annotate_presence(index);
        }

        let report = ResolutionReport::new(
            self.tool,
            granularity,
            pair.current.len(),
            verdicts,
            hierarchy,
            issues,
        );
        info!(
            previous = report.summary.previous_findings,
            current = report.summary.current_findings,
            resolved_exact = report.summary.resolved_exact,
            daa_resolved = report.summary.daa_resolved,
            issues = report.issues.len(),
            "Comparison finished"
        );
        report
    }

    /// Index one side and attach contexts to its findings. A side without
    /// findings is recorded and skipped.
    #[instrument(skip_all, fields(side = %side))]
    fn prepare_side(
        &self,
        side: Side,
        findings: Vec<Finding>,
        source: &mut dyn RevisionSource,
        issues: &mut Vec<RunIssue>,
    ) -> Result<(Vec<Finding>, Option<PackageIndex>)> {
        if findings.is_empty() {
            warn!(side = %side, "Revision has no findings; skipping its index");
            self.progress
                .message(&format!("{side} revision has no findings; not indexed"));
            issues.push(RunIssue::EmptyRevision { side });
            return Ok((Vec::new(), None));
        }

        let index = self.index_side(side, source, issues)?;
        let normalizer = self.normalizer(source, side);
        let enriched = findings
            .into_iter()
            .map(|f| enrich(side, normalizer.normalize(f), &index, issues))
            .collect();
        Ok((enriched, Some(index)))
    }

    fn index_side(
        &self,
        side: Side,
        source: &mut dyn RevisionSource,
        issues: &mut Vec<RunIssue>,
    ) -> Result<PackageIndex> {
        let snapshot = source.materialize(side, &self.config.scope)?;
        if snapshot.is_empty() {
            warn!(
                side = %side,
                root = %snapshot.root().display(),
                "No source files matched the scope patterns"
            );
        } else {
            debug!(side = %side, files = snapshot.len(), "Materialized revision");
        }
        let total = snapshot
            .files()
            .filter(|(path, _)| self.builder.supports(Path::new(path)))
            .count();

        self.progress
            .start(&format!("Indexing {side} revision"), u64::try_from(total).ok());
        let index = PackageIndex::build_with(&snapshot, &self.builder, |_| self.progress.advance(1));
        self.progress.finish();

        for failure in index.failures() {
            issues.push(RunIssue::ParseFailure {
                side,
                path: failure.path.clone(),
                message: failure.message.clone(),
            });
        }
        Ok(index)
    }

    fn normalizer(&self, source: &dyn RevisionSource, side: Side) -> FindingNormalizer {
        source
            .report_prefixes(side)
            .iter()
            .fold(FindingNormalizer::new(&self.config.normalize), |n, prefix| {
                n.with_prefix(prefix)
            })
    }
}

fn enrich(side: Side, mut finding: Finding, index: &PackageIndex, issues: &mut Vec<RunIssue>) -> Finding {
    let resolution = index.lookup(&finding.filename_clean, finding.start_line);
    let candidates = match resolution.outcome {
        LookupOutcome::Ambiguous { candidates } => Some(candidates),
        LookupOutcome::Unscoped if index.contains_file(&finding.filename_clean) => Some(0),
        _ => None,
    };
    if let Some(candidates) = candidates {
        debug!(
            path = %finding.filename_clean,
            line = finding.start_line,
            candidates,
            context = %resolution.context,
            "Ambiguous scope lookup"
        );
        issues.push(RunIssue::LookupAmbiguity {
            side,
            path: finding.filename_clean.clone(),
            line: finding.start_line,
            candidates,
            context: resolution.context.clone(),
        });
    }
    finding.context = resolution.context;
    finding
}
