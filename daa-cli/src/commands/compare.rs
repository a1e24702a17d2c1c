use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Args;

use daa_core::finding::{Tool, load_report};
use daa_core::hierarchy::HierarchyLevel;
use daa_core::matching::Granularity;
use daa_core::pipeline::DaaPipeline;
use daa_core::progress::IndicatifReporter;
use daa_core::report::{ResolutionReport, RunIssue};
use daa_core::revision::{DirectorySource, GitCheckout, RevisionSource};

#[derive(Args, Debug)]
pub struct CompareArgs {
    /// Analysis tool that produced both reports
    #[arg(long, value_parser = ["bandit", "codeql", "spotbugs"])]
    pub tool: String,
    /// Report (JSON array) of the previous revision
    #[arg(long)]
    pub previous: PathBuf,
    /// Report (JSON array) of the current revision
    #[arg(long)]
    pub current: PathBuf,
    /// Package directory of the previous revision
    #[arg(long, requires = "current_root", conflicts_with = "repo")]
    pub previous_root: Option<PathBuf>,
    /// Package directory of the current revision
    #[arg(long, requires = "previous_root", conflicts_with = "repo")]
    pub current_root: Option<PathBuf>,
    /// Git repository to check out the fix commit and its parent in
    #[arg(long, requires = "commit")]
    pub repo: Option<PathBuf>,
    /// Fix commit; its parent is the previous revision
    #[arg(long, requires = "repo")]
    pub commit: Option<String>,
    /// Package directory inside --repo
    #[arg(long, requires = "repo")]
    pub package: Option<PathBuf>,
    /// Override the configured matching granularity
    #[arg(long, value_parser = ["context", "package"])]
    pub granularity: Option<String>,
    /// Output format
    #[arg(long, default_value = "text", value_parser = ["text", "json", "markdown"])]
    pub format: String,
    /// Config file (default: .daa.toml in the package root when present)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

pub fn run(args: &CompareArgs, quiet: bool) -> anyhow::Result<()> {
    let tool: Tool = args.tool.parse()?;
    let mut source = revision_source(args)?;

    let mut config = super::load_config(args.config.as_deref(), &config_dir(args))?;
    if let Some(granularity) = args.granularity.as_deref() {
        config.matching.granularity = parse_granularity(granularity);
    }

    let previous = load_report(tool, &args.previous)
        .with_context(|| format!("Cannot load previous report: {}", args.previous.display()))?;
    let current = load_report(tool, &args.current)
        .with_context(|| format!("Cannot load current report: {}", args.current.display()))?;

    let progress = if quiet || args.format != "text" {
        IndicatifReporter::hidden()
    } else {
        IndicatifReporter::new()
    };
    let report = DaaPipeline::new(tool, &config)
        .with_progress(&progress)
        .run(previous, current, source.as_mut())?;

    match args.format.as_str() {
        "json" => print_json(&report)?,
        "markdown" => print_markdown(&report),
        _ => print_text(&report),
    }
    Ok(())
}

fn revision_source(args: &CompareArgs) -> anyhow::Result<Box<dyn RevisionSource>> {
    match (&args.previous_root, &args.current_root, &args.repo, &args.commit) {
        (Some(previous), Some(current), None, None) => Ok(Box::new(DirectorySource::new(
            super::resolve_path(previous)?,
            super::resolve_path(current)?,
        ))),
        (None, None, Some(repo), Some(commit)) => {
            let mut checkout = GitCheckout::new(super::resolve_path(repo)?, commit.clone());
            if let Some(package) = &args.package {
                checkout = checkout.with_package(package.clone());
            }
            Ok(Box::new(checkout))
        }
        _ => anyhow::bail!(
            "Specify either --previous-root and --current-root, or --repo and --commit"
        ),
    }
}

/// Directory whose `.daa.toml` applies when `--config` is not given.
fn config_dir(args: &CompareArgs) -> PathBuf {
    args.current_root
        .clone()
        .or_else(|| {
            args.repo.as_ref().map(|repo| match &args.package {
                Some(package) => repo.join(package),
                None => repo.clone(),
            })
        })
        .unwrap_or_else(|| Path::new(".").to_path_buf())
}

fn parse_granularity(value: &str) -> Granularity {
    match value {
        "package" => Granularity::Package,
        _ => Granularity::Context,
    }
}

const ISSUE_KINDS: [&str; 3] = ["parse_failure", "lookup_ambiguity", "empty_revision"];

fn describe_issue(issue: &RunIssue) -> String {
    match issue {
        RunIssue::ParseFailure {
            side,
            path,
            message,
        } => format!("[{side}] could not parse {path}: {message}"),
        RunIssue::LookupAmbiguity {
            side,
            path,
            line,
            candidates: 0,
            context,
        } => format!("[{side}] {path}:{line} is outside every scope; using {context}"),
        RunIssue::LookupAmbiguity {
            side,
            path,
            line,
            candidates,
            context,
        } => format!("[{side}] {path}:{line} has {candidates} overlapping scopes; using {context}"),
        RunIssue::EmptyRevision { side } => format!("[{side}] report has no findings"),
    }
}

// ── Output ────────────────────────────────────────────────────────

fn print_text(report: &ResolutionReport) {
    let s = &report.summary;
    println!(
        "Resolution: {} ({} granularity)",
        report.tool,
        granularity_label(report.granularity)
    );
    println!();
    println!("Findings:");
    println!("  {} previous, {} current", s.previous_findings, s.current_findings);
    println!("  {} resolved by exact match", s.resolved_exact);
    println!();

    println!("Resolved keys by level:");
    for level in HierarchyLevel::ALL {
        println!(
            "  {:<9} {} of {}",
            level.as_str(),
            s.resolved_keys(level),
            report.hierarchy.level(level).rows.len()
        );
    }
    println!("  resolved at every level: {}", s.daa_resolved);
    println!();

    let resolved: Vec<_> = report.findings.iter().filter(|v| v.resolved).collect();
    if !resolved.is_empty() {
        println!("Resolved Findings:");
        for v in resolved.iter().take(30) {
            println!(
                "  {}:{} in {} - {}",
                v.filename_clean, v.start_line, v.context, v.identity
            );
        }
        if resolved.len() > 30 {
            println!("  ... and {} more", resolved.len() - 30);
        }
        println!();
    }

    if !report.issues.is_empty() {
        println!("Issues:");
        for kind in ISSUE_KINDS {
            let count = report.issues_of(kind).count();
            if count > 0 {
                println!("  {count} {}", kind.replace('_', " "));
            }
        }
        for issue in report.issues.iter().take(30) {
            println!("  {}", describe_issue(issue));
        }
        if report.issues.len() > 30 {
            println!("  ... and {} more", report.issues.len() - 30);
        }
        println!();
    }
}

fn print_markdown(report: &ResolutionReport) {
    let s = &report.summary;
    println!("# Resolution: {}", report.tool);
    println!();
    println!(
        "- **{}** previous findings, **{}** current findings",
        s.previous_findings, s.current_findings
    );
    println!("- **{}** resolved by exact match", s.resolved_exact);
    println!(
        "- Matching granularity: {}",
        granularity_label(report.granularity)
    );
    println!();

    println!("## Resolved Keys by Level");
    println!();
    println!("| Level | Key columns | Resolved | Keys |");
    println!("|-------|-------------|----------|------|");
    for level in HierarchyLevel::ALL {
        println!(
            "| {} | {} | {} | {} |",
            level.as_str(),
            level.key_columns(report.tool).join(", "),
            s.resolved_keys(level),
            report.hierarchy.level(level).rows.len()
        );
    }
    println!(
        "| all levels | | {} | {} |",
        s.daa_resolved,
        report.hierarchy.combined.len()
    );
    println!();

    let resolved: Vec<_> = report.hierarchy.daa_resolved().collect();
    if !resolved.is_empty() {
        println!("## Resolved Findings");
        println!();
        println!("| File | Context | Line | Rule | Resolved |");
        println!("|------|---------|------|------|----------|");
        for row in resolved.iter().take(50) {
            println!(
                "| `{}` | `{}` | {} | {} | {} |",
                row.key.filename_clean.as_deref().unwrap_or_default(),
                row.key.context.as_deref().unwrap_or_default(),
                row.key.start_line.unwrap_or_default(),
                row.key.identity.rule,
                row.verdict(HierarchyLevel::Line).resolved_count
            );
        }
        if resolved.len() > 50 {
            println!("| | | | ... and {} more | |", resolved.len() - 50);
        }
        println!();
    }

    if !report.issues.is_empty() {
        println!("## Issues");
        println!();
        for issue in &report.issues {
            println!("- {}", describe_issue(issue));
        }
        println!();
    }
}

fn print_json(report: &ResolutionReport) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(report)?);
    Ok(())
}

fn granularity_label(granularity: Granularity) -> &'static str {
    match granularity {
        Granularity::Context => "context",
        Granularity::Package => "package",
    }
}
