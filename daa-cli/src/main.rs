use clap::Parser;

use daa_core::error::{CheckoutError, ConfigError, DaaError, IngestError};

mod commands;

#[derive(Parser, Debug)]
#[command(
    name = "daa",
    version,
    about = "Decide whether static-analysis findings were resolved between two revisions"
)]
struct Cli {
    #[command(subcommand)]
    command: commands::Command,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    quiet: bool,
}

/// Classify an error into an exit code by the first typed cause in its chain.
///
/// Exit codes:
///   0: success
///   1: general/unknown error
///   2: configuration error
///   3: path not found
///   4: report ingestion error
///   5: revision checkout error
fn classify_exit_code(err: &anyhow::Error) -> i32 {
    for cause in err.chain() {
        if let Some(e) = cause.downcast_ref::<DaaError>() {
            return match e {
                DaaError::Config(_) => 2,
                DaaError::Ingest(_) => 4,
                DaaError::Checkout(c) => checkout_code(c),
                DaaError::Scope(_) => 1,
            };
        }
        if cause.is::<ConfigError>() {
            return 2;
        }
        if cause.is::<IngestError>() {
            return 4;
        }
        if let Some(c) = cause.downcast_ref::<CheckoutError>() {
            return checkout_code(c);
        }
        if cause
            .downcast_ref::<std::io::Error>()
            .is_some_and(|io| io.kind() == std::io::ErrorKind::NotFound)
        {
            return 3;
        }
    }
    1
}

fn checkout_code(err: &CheckoutError) -> i32 {
    match err {
        CheckoutError::MissingPackage(_) => 3,
        CheckoutError::Spawn(_) | CheckoutError::Failed { .. } => 5,
    }
}

fn main() {
    let cli = Cli::parse();

    // Initialize tracing based on verbosity
    let filter = match (cli.quiet, cli.verbose) {
        (true, _) => "error",
        (_, 0) => "warn",
        (_, 1) => "info",
        (_, 2) => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .init();

    match commands::run(cli.command, cli.quiet) {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            eprintln!("Error: {e:#}");
            std::process::exit(classify_exit_code(&e));
        }
    }
}
