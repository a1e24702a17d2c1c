use std::path::PathBuf;

use anyhow::Context;
use clap::Args;

use daa_scope::{LookupOutcome, ScopeIndexBuilder, ScopeLookup};

#[derive(Args, Debug)]
pub struct ContextArgs {
    /// Source file (.py or .java)
    pub file: PathBuf,
    /// 1-based line number
    pub line: usize,
    /// Output format
    #[arg(long, default_value = "text", value_parser = ["text", "json"])]
    pub format: String,
}

pub fn run(args: &ContextArgs) -> anyhow::Result<()> {
    let path = super::resolve_path(&args.file)?;
    let builder = ScopeIndexBuilder::new();
    if !builder.supports(&path) {
        anyhow::bail!(
            "Unsupported source file: {} (expected .py or .java)",
            path.display()
        );
    }

    let source = std::fs::read_to_string(&path)
        .with_context(|| format!("Cannot read {}", path.display()))?;
    let entries = builder
        .build(&path, &source)
        .with_context(|| format!("Cannot index {}", path.display()))?;

    let display = path.display().to_string();
    let resolution = ScopeLookup::new(&display, &entries).resolve(args.line);

    if args.format == "json" {
        let output = serde_json::json!({
            "file": display,
            "line": args.line,
            "context": resolution.context,
            "lookup": resolution.outcome,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("{}", resolution.context);
    match resolution.outcome {
        LookupOutcome::Unscoped => {
            eprintln!("note: line {} is outside every scope", args.line);
        }
        LookupOutcome::Ambiguous { candidates } => {
            eprintln!(
                "note: {candidates} overlapping scopes contain line {}; narrowest chosen",
                args.line
            );
        }
        LookupOutcome::Enclosed | LookupOutcome::Qualified => {}
    }
    Ok(())
}
