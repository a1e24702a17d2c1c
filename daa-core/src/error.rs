use std::path::PathBuf;

/// Top-level DAA error type.
///
/// Fatal failures only. Per-file parse failures, lookup ambiguity and empty
/// revisions are recorded as run issues in the report instead.
#[derive(thiserror::Error, Debug)]
pub enum DaaError {
    /// Error from the scope engine (parser setup, source loading).
    #[error("Scope index error: {0}")]
    Scope(#[from] daa_scope::ScopeError),

    /// A tool report could not be read or decoded.
    #[error("Report ingestion error: {0}")]
    Ingest(#[from] IngestError),

    /// A revision could not be materialized.
    #[error("Revision error: {0}")]
    Checkout(#[from] CheckoutError),

    /// Error in configuration parsing or validation.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Errors while loading a tool report.
#[derive(thiserror::Error, Debug)]
pub enum IngestError {
    #[error("cannot read report {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The report is not a JSON array of records of the expected shape.
    #[error("malformed report {}: {source}", path.display())]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// One record lacks a column every finding needs.
    #[error("record {index} has no {field} column")]
    MissingField { index: usize, field: &'static str },

    #[error("unknown tool: {0} (expected bandit, codeql or spotbugs)")]
    UnknownTool(String),
}

/// Errors from materializing a revision's working tree.
#[derive(thiserror::Error, Debug)]
pub enum CheckoutError {
    /// The `git` executable could not be started.
    #[error("failed to run git: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("git checkout {rev} failed: {stderr}")]
    Failed { rev: String, stderr: String },

    #[error("package directory not found: {}", .0.display())]
    MissingPackage(PathBuf),
}

/// Errors in DAA configuration parsing and validation.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// The configuration file does not exist at the expected path.
    #[error("Config file not found: {0}")]
    NotFound(String),

    /// Configuration values are present but semantically invalid.
    #[error("Invalid config: {0}")]
    Invalid(String),

    /// Configuration file syntax could not be parsed (TOML error).
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Convenience alias for `Result<T, DaaError>`.
pub type Result<T> = std::result::Result<T, DaaError>;
