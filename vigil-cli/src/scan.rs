//! Scan orchestration: enumerate → extract → query → hydrate → group
//!
//! Files are parsed concurrently up to the configured worker cap; the
//! extractor registry is read-only by the time this module runs. Failure
//! of one file never aborts the batch -- it is reported per-file and
//! reflected in the process exit code.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use vigil_advisory::models::Query;
use vigil_advisory::results::VulnerabilityResults;
use vigil_advisory::{assemble_source, make_purl_query, make_query, OsvClient};
use vigil_core::config::VigilConfig;
use vigil_core::error::{AdvisoryError, ExtractError};
use vigil_core::types::{Ecosystem, Lockfile, PackageDetails, SourceInfo};
use vigil_lockfile::{
    extract_deps, find_git_repos, find_lockfiles, list_extractors, read_head_commit, sbom, DepFile,
};

use crate::cli::ParseAs;
use crate::error::CliError;
use crate::reporter::Reporter;

/// Everything a single scan invocation needs, decoupled from clap.
#[derive(Debug, Default)]
pub struct ScanActions {
    pub lockfile_paths: Vec<PathBuf>,
    pub sbom_paths: Vec<PathBuf>,
    pub docker_images: Vec<String>,
    pub directory_paths: Vec<PathBuf>,
    pub parse_as: Option<ParseAs>,
    pub recursive: bool,
    pub skip_git: bool,
}

/// Scan result plus the error tally that feeds the exit code.
#[derive(Debug)]
pub struct ScanOutcome {
    pub results: VulnerabilityResults,
    pub parse_failures: usize,
}

/// One source with its packages and the queries derived from them (1:1).
struct SourceBundle {
    source: SourceInfo,
    packages: Vec<PackageDetails>,
    queries: Vec<Query>,
}

/// Run the full scan pipeline.
pub async fn do_scan(
    actions: ScanActions,
    config: &VigilConfig,
    reporter: &Reporter,
    cancel: CancellationToken,
) -> Result<ScanOutcome, CliError> {
    // A requested parser that does not exist is a hard input error; list
    // the closed set of supported parsers for the user.
    if let Some(parse_as) = &actions.parse_as {
        if !list_extractors().contains(&parse_as.parser.as_str()) {
            return Err(CliError::ParserNotFound(format!(
                "could not determine parser, requested {}; supported parsers: {}",
                parse_as.parser,
                list_extractors().join(", ")
            )));
        }
    }

    // --- enumerate ---

    let mut lockfile_jobs: Vec<PathBuf> = Vec::new();
    let mut seen_jobs: HashSet<PathBuf> = HashSet::new();
    let mut push_job = |jobs: &mut Vec<PathBuf>, path: PathBuf| {
        if seen_jobs.insert(path.clone()) {
            jobs.push(path);
        }
    };

    // Explicitly given files are always scanned, even with unknown basenames.
    for path in &actions.lockfile_paths {
        push_job(&mut lockfile_jobs, path.clone());
    }

    let mut git_bundles: Vec<SourceBundle> = Vec::new();
    for dir in &actions.directory_paths {
        reporter.progress(&format!("Scanning dir {}", dir.display()));

        for found in find_lockfiles(dir, actions.recursive) {
            push_job(&mut lockfile_jobs, found);
        }

        if !actions.skip_git {
            for repo in find_git_repos(dir, actions.recursive) {
                let Some(commit) = read_head_commit(&repo) else {
                    continue;
                };

                let source = SourceInfo::git(repo.display().to_string());
                let package = PackageDetails::new("", "", Ecosystem::Git).with_commit(commit);
                let query = make_query(&source, &package);
                git_bundles.push(SourceBundle {
                    source,
                    packages: vec![package],
                    queries: vec![query],
                });
            }
        }
    }

    // Container image inspection is an external collaborator; without an
    // inspector wired in, named images are reported and skipped.
    for image in &actions.docker_images {
        reporter.warn(&format!(
            "Skipping docker image {image}: no container image inspector is available"
        ));
    }

    if lockfile_jobs.is_empty() && actions.sbom_paths.is_empty() && git_bundles.is_empty() {
        return Err(CliError::NoSources);
    }

    // --- extract (bounded fan-out, deterministic reporting order) ---

    let mut parse_failures = 0usize;
    let extracted = extract_all(&lockfile_jobs, actions.parse_as.as_ref(), config, &cancel).await;

    if cancel.is_cancelled() {
        return Err(CliError::Cancelled);
    }

    let mut bundles: Vec<SourceBundle> = Vec::new();

    for (path, result) in lockfile_jobs.iter().zip(extracted) {
        match result {
            Ok(lockfile) => {
                reporter.progress(&format!(
                    "Scanned {} file and found {} packages",
                    display_path(path),
                    lockfile.packages.len()
                ));
                bundles.push(lockfile_bundle(lockfile));
            }
            Err(e) => {
                reporter.warn(&format!("Attempted to scan file but failed: {}", path.display()));
                tracing::warn!(path = %path.display(), error = %e, "extraction failed");
                parse_failures += 1;
            }
        }
    }

    for path in &actions.sbom_paths {
        match read_sbom(path) {
            Ok(bundle) => {
                reporter.progress(&format!(
                    "Scanned {} file and found {} packages",
                    display_path(path),
                    bundle.packages.len()
                ));
                bundles.push(bundle);
            }
            Err(e) => {
                reporter.warn(&format!("Attempted to scan file but failed: {}", path.display()));
                tracing::warn!(path = %path.display(), error = %e, "sbom read failed");
                parse_failures += 1;
            }
        }
    }

    bundles.extend(git_bundles);

    // --- query & hydrate ---

    let all_queries: Vec<Query> =
        bundles.iter().flat_map(|b| b.queries.iter().cloned()).collect();

    let client = OsvClient::new(&config.advisory, cancel.clone())
        .map_err(|e| CliError::Domain(e.into()))?;

    let batched = client.query_batched(&all_queries).await.map_err(advisory_error)?;
    for failure in &batched.failures {
        reporter.warn(&format!("Query batch failed: {failure}"));
    }

    let hydrated =
        client.hydrate(batched.per_query.iter().flatten()).await.map_err(advisory_error)?;
    for failure in &hydrated.failures {
        reporter.warn(&format!("Failed to fetch advisory details: {failure}"));
    }

    // --- group per source ---

    let mut results = VulnerabilityResults::default();
    let mut offset = 0usize;

    for bundle in bundles {
        let count = bundle.queries.len();
        let ids = &batched.per_query[offset..offset + count];
        offset += count;

        let bucket = assemble_source(
            bundle.source,
            &bundle.packages,
            ids,
            &hydrated.vulns,
            &config.ignored_vulns,
        );

        if !bucket.packages.is_empty() {
            results.results.push(bucket);
        }
    }

    Ok(ScanOutcome { results, parse_failures })
}

fn advisory_error(e: AdvisoryError) -> CliError {
    match e {
        AdvisoryError::Cancelled => CliError::Cancelled,
        other => CliError::Domain(other.into()),
    }
}

/// Parse all lockfile jobs concurrently, preserving job order in the output.
async fn extract_all(
    jobs: &[PathBuf],
    parse_as: Option<&ParseAs>,
    config: &VigilConfig,
    cancel: &CancellationToken,
) -> Vec<Result<Lockfile, ExtractError>> {
    let semaphore = Arc::new(Semaphore::new(config.scan.workers));
    let mut tasks: JoinSet<(usize, Result<Lockfile, ExtractError>)> = JoinSet::new();

    for (idx, path) in jobs.iter().enumerate() {
        let semaphore = Arc::clone(&semaphore);
        let cancel = cancel.clone();
        let path = path.clone();
        let forced_parser = parse_as
            .map(|pa| pa.parser_for(&path).to_owned())
            .unwrap_or_default();

        tasks.spawn(async move {
            let interrupted = || ExtractError::Io {
                path: path.display().to_string(),
                source: std::io::Error::new(std::io::ErrorKind::Interrupted, "scan cancelled"),
            };

            let Ok(_permit) = semaphore.acquire_owned().await else {
                return (idx, Err(interrupted()));
            };
            if cancel.is_cancelled() {
                return (idx, Err(interrupted()));
            }

            let blocking_path = path.clone();
            let result = tokio::task::spawn_blocking(move || {
                let depfile = DepFile::open(&blocking_path)?;
                extract_deps(&depfile, &forced_parser)
            })
            .await;

            match result {
                Ok(extracted) => (idx, extracted),
                Err(join_error) => (
                    idx,
                    Err(ExtractError::Io {
                        path: path.display().to_string(),
                        source: std::io::Error::new(
                            std::io::ErrorKind::Other,
                            join_error.to_string(),
                        ),
                    }),
                ),
            }
        });
    }

    let mut results: Vec<Option<Result<Lockfile, ExtractError>>> =
        (0..jobs.len()).map(|_| None).collect();

    while let Some(joined) = tasks.join_next().await {
        let Ok((idx, result)) = joined else {
            continue;
        };
        results[idx] = Some(result);
    }

    results
        .into_iter()
        .enumerate()
        .map(|(idx, slot)| {
            slot.unwrap_or_else(|| {
                Err(ExtractError::Io {
                    path: jobs[idx].display().to_string(),
                    source: std::io::Error::new(std::io::ErrorKind::Other, "worker lost"),
                })
            })
        })
        .collect()
}

fn lockfile_bundle(lockfile: Lockfile) -> SourceBundle {
    let source = SourceInfo::lockfile(lockfile.file_path.clone());
    let queries = lockfile.packages.iter().map(|pkg| make_query(&source, pkg)).collect();

    SourceBundle { source, packages: lockfile.packages, queries }
}

fn read_sbom(path: &Path) -> Result<SourceBundle, ExtractError> {
    let depfile = DepFile::open(path)?;
    let purls = sbom::extract_purls(&depfile)?;

    let source = SourceInfo::sbom(path.display().to_string());
    let mut packages = Vec::new();
    let mut queries = Vec::new();

    for purl in &purls {
        let Some(details) = purl_to_details(purl) else {
            tracing::warn!(purl = %purl, "unsupported purl type in SBOM, skipping");
            continue;
        };

        queries.push(make_purl_query(&source, purl));
        packages.push(details);
    }

    Ok(SourceBundle { source, packages, queries })
}

/// Best-effort reverse mapping of a purl to package coordinates, used to
/// label SBOM entries in results.
fn purl_to_details(purl: &str) -> Option<PackageDetails> {
    let rest = purl.strip_prefix("pkg:")?;
    let (purl_type, rest) = rest.split_once('/')?;
    let (name, version) = match rest.rsplit_once('@') {
        Some((name, version)) => (name, version),
        None => (rest, ""),
    };

    let ecosystem = match purl_type {
        "npm" => Ecosystem::Npm,
        "pypi" => Ecosystem::PyPI,
        "maven" => Ecosystem::Maven,
        "golang" => Ecosystem::Go,
        "composer" => Ecosystem::Packagist,
        "gem" => Ecosystem::RubyGems,
        "nuget" => Ecosystem::NuGet,
        "cargo" => Ecosystem::CratesIo,
        "pub" => Ecosystem::Pub,
        "hex" => Ecosystem::Hex,
        "conan" => Ecosystem::ConanCenter,
        _ => return None,
    };

    // maven purls carry the group as a namespace segment
    let name = if ecosystem == Ecosystem::Maven {
        name.replacen('/', ":", 1)
    } else {
        name.to_owned()
    };

    Some(PackageDetails::new(name, version, ecosystem))
}

fn display_path(path: &Path) -> String {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf()).display().to_string()
}
