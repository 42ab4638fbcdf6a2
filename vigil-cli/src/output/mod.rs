//! Result rendering for the supported output formats
//!
//! Human table and JSON results go to stdout; progress stays on stderr
//! (see [`crate::reporter`]). Table and markdown render nothing for a
//! clean scan; JSON and SARIF always emit a complete document.

pub mod markdown;
pub mod sarif;
pub mod table;

use std::io::Write;

use vigil_advisory::results::VulnerabilityResults;

use crate::cli::OutputFormat;
use crate::error::CliError;

/// Render results in the requested format.
pub fn render(
    results: &VulnerabilityResults,
    format: OutputFormat,
    writer: &mut dyn Write,
) -> Result<(), CliError> {
    match format {
        OutputFormat::Table => table::render(results, writer)?,
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *writer, results)?;
            writeln!(writer)?;
        }
        OutputFormat::Markdown => markdown::render(results, writer)?,
        OutputFormat::Sarif => sarif::render(results, writer)?,
    }

    Ok(())
}

/// One flattened output row: a vulnerability group on a package.
pub(crate) struct Row {
    pub ids: Vec<String>,
    pub ecosystem: String,
    pub package: String,
    pub version: String,
    pub source: String,
}

/// Flatten results into rows, preserving bucket and package order.
pub(crate) fn flatten_rows(results: &VulnerabilityResults) -> Vec<Row> {
    let mut rows = Vec::new();

    for bucket in &results.results {
        for package_vulns in &bucket.packages {
            let pkg = &package_vulns.package;
            for group in &package_vulns.groups {
                rows.push(Row {
                    ids: group.ids.clone(),
                    ecosystem: pkg.ecosystem.to_string(),
                    package: pkg.name.clone(),
                    version: if pkg.version.is_empty() {
                        pkg.commit.clone()
                    } else {
                        pkg.version.clone()
                    },
                    source: bucket.source.path.clone(),
                });
            }
        }
    }

    rows
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flatten_rows_one_group_per_row() {
        let results = test_fixtures::sample_results();
        let rows = flatten_rows(&results);

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].ids, vec!["CVE-2021-23424", "GHSA-whgm-jr23-g3j9"]);
        assert_eq!(rows[0].ecosystem, "npm");
        assert_eq!(rows[0].package, "ansi-html");
        assert_eq!(rows[0].version, "0.0.1");
        assert_eq!(rows[0].source, "fixtures/my-package-lock.json");
    }

    #[test]
    fn json_format_emits_document_even_when_clean() {
        let results = VulnerabilityResults::default();
        let mut buffer = Vec::new();
        render(&results, OutputFormat::Json, &mut buffer).unwrap();

        let text = String::from_utf8(buffer).unwrap();
        assert!(text.contains("\"results\""));
    }

    #[test]
    fn table_format_is_silent_when_clean() {
        let results = VulnerabilityResults::default();
        let mut buffer = Vec::new();
        render(&results, OutputFormat::Table, &mut buffer).unwrap();
        assert!(buffer.is_empty());
    }

    #[test]
    fn json_roundtrip_is_byte_identical() {
        let results = test_fixtures::sample_results();

        let mut first = Vec::new();
        render(&results, OutputFormat::Json, &mut first).unwrap();

        let reparsed: VulnerabilityResults =
            serde_json::from_slice(&first).expect("rendered JSON parses back");
        let mut second = Vec::new();
        render(&reparsed, OutputFormat::Json, &mut second).unwrap();

        assert_eq!(first, second);
    }
}
