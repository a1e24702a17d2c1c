use std::path::PathBuf;

use clap::Args;

use daa_scope::{PackageIndex, ScopeIndexBuilder, SourceSnapshot};

#[derive(Args, Debug)]
pub struct IndexArgs {
    /// Package directory to index
    #[arg(default_value = ".")]
    pub path: PathBuf,
    /// Output format
    #[arg(long, default_value = "text", value_parser = ["text", "json"])]
    pub format: String,
    /// Config file (default: <path>/.daa.toml when present)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

pub fn run(args: &IndexArgs) -> anyhow::Result<()> {
    let root = super::resolve_path(&args.path)?;
    let config = super::load_config(args.config.as_deref(), &root)?;

    let snapshot = SourceSnapshot::load(
        &root,
        &config.scope.include_patterns,
        &config.scope.exclude_patterns,
    );
    let index = PackageIndex::build(&snapshot, &ScopeIndexBuilder::new());

    match args.format.as_str() {
        "json" => print_json(&index)?,
        _ => print_text(&index),
    }

    for failure in index.failures() {
        eprintln!("warning: skipped {}: {}", failure.path, failure.message);
    }
    Ok(())
}

fn print_text(index: &PackageIndex) {
    println!("Scope index: {}", index.root().display());
    println!(
        "  {} files, {} scopes, {} skipped",
        index.file_count(),
        index.entry_count(),
        index.failures().len()
    );
    println!();

    let mut current_file = None;
    for row in index.rows() {
        if current_file.as_deref() != Some(row.filename_clean.as_str()) {
            println!("{}", row.filename_clean);
            current_file = Some(row.filename_clean.clone());
        }
        let name = match (&row.parent_class, &row.name) {
            (Some(parent), Some(name)) => format!("{parent}.{name}"),
            (None, Some(name)) => name.clone(),
            (_, None) => "-".to_string(),
        };
        println!(
            "  {:<8} {name} [{}-{}]",
            row.kind.as_str(),
            row.lineno,
            row.end_lineno
        );
    }
}

fn print_json(index: &PackageIndex) -> anyhow::Result<()> {
    let output = serde_json::json!({
        "root": index.root().display().to_string(),
        "files": index.file_count(),
        "scopes": index.rows(),
        "failures": index.failures(),
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
