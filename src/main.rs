//! Wire-binding conformance runner.
//!
//! Runs the built-in restJson1 corpus, plus any vector files given on the
//! command line, and exits non-zero when the suite does not pass.
//!
//! ```text
//! wire-binding [--config FILE] [--vectors FILE]... [--protocol ID]... [--json]
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use wire_binding::config::{load_config, validate_config, ConfigError, EngineConfig};
use wire_binding::harness::{corpus, load_vectors, Harness, Outcome, SuiteReport};
use wire_binding::observability::logging::init_logging;
use wire_binding::observability::metrics::init_metrics;

#[derive(Parser)]
#[command(name = "wire-binding")]
#[command(about = "Run HTTP binding conformance vectors", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Additional JSON vector files, run against the built-in service
    #[arg(short, long)]
    vectors: Vec<PathBuf>,

    /// Protocol shape ids to run; replaces the configured allow-list
    #[arg(short, long)]
    protocol: Vec<String>,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(2)
        }
    }
}

async fn run(cli: Cli) -> Result<bool, Box<dyn std::error::Error>> {
    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => EngineConfig::default(),
    };
    if !cli.protocol.is_empty() {
        config.harness.protocols = Some(cli.protocol.clone());
        validate_config(&config).map_err(ConfigError::Validation)?;
    }

    init_logging(&config.observability.log_level)?;
    tracing::info!("wire-binding v{} starting", env!("CARGO_PKG_VERSION"));

    if config.observability.metrics_enabled {
        let addr: SocketAddr = config.observability.metrics_address.parse()?;
        init_metrics(addr)?;
    }

    let mut vectors = corpus::vectors();
    for path in &cli.vectors {
        let loaded = load_vectors(path)?;
        tracing::info!(path = %path.display(), count = loaded.len(), "Loaded vector file");
        vectors.extend(loaded);
    }

    let service = corpus::service()?;
    let harness = Harness::new(&config.harness).with_expected_failures(corpus::known_failures());
    let report = harness.run(&service, &vectors);

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(report.all_passed())
}

fn print_report(report: &SuiteReport) {
    println!("{}", report.suite);
    for result in &report.results {
        let marker = match result.outcome {
            Outcome::Passed => "ok",
            Outcome::ExpectedFailure(_) => "xfail",
            Outcome::Failed(_) => "FAIL",
            Outcome::UnexpectedPass => "XPASS",
        };
        println!("  [{:>5}] {} ({})", marker, result.id, result.action);
        if let Outcome::Failed(reason) | Outcome::ExpectedFailure(reason) = &result.outcome {
            println!("          {}", reason);
        }
    }
    println!(
        "{} cases, {} passed, {} skipped, {} failures",
        report.case_count,
        report.pass_count,
        report.skipped,
        report.failures.len()
    );
}
