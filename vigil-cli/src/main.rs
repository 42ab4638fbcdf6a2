//! vigil -- scans project dependencies and matches them against a
//! vulnerability database.
//!
//! Inputs are lockfiles, SBOM documents, source directories or container
//! image references; output is a table, JSON, markdown or SARIF report.

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

mod cli;
mod error;
mod output;
mod reporter;
mod scan;

use cli::{Cli, ParseAs};
use error::CliError;
use reporter::Reporter;
use scan::ScanActions;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Compact subscriber on stderr; structured JSON would be noisy for
    // interactive use, and stdout must stay reserved for results.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();

    let reporter = Reporter::new();

    let code = match run(cli, &reporter).await {
        Ok(code) => code,
        Err(e) => {
            reporter.warn(&e.to_string());
            e.exit_code()
        }
    };

    std::process::exit(code);
}

async fn run(cli: Cli, reporter: &Reporter) -> Result<i32, CliError> {
    let parse_as = cli
        .parse_as
        .as_deref()
        .map(ParseAs::parse)
        .transpose()
        .map_err(CliError::Usage)?;

    let config = match &cli.config {
        Some(path) => vigil_core::config::VigilConfig::load_from_path(path)
            .map_err(|e| CliError::Config(e.to_string()))?,
        None => vigil_core::config::VigilConfig::default(),
    };

    // Root cancellation context: ctrl-c propagates to all in-flight
    // extractions, queries and hydration fetches.
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        });
    }

    let actions = ScanActions {
        lockfile_paths: cli.lockfile.clone(),
        sbom_paths: cli.sbom.clone(),
        docker_images: cli.docker.clone(),
        directory_paths: cli.directories.clone(),
        parse_as,
        recursive: cli.recursive,
        skip_git: cli.skip_git,
    };

    let format = cli.effective_format();
    let outcome = scan::do_scan(actions, &config, reporter, cancel).await?;

    {
        let stdout = std::io::stdout();
        let mut handle = stdout.lock();
        output::render(&outcome.results, format, &mut handle)?;
    }

    Ok(if outcome.parse_failures > 0 {
        127
    } else if outcome.results.has_vulnerabilities() {
        1
    } else {
        0
    })
}
