//! SARIF 2.1.0 renderer
//!
//! One `run.tool.driver.rules` entry per vulnerability group (rule id =
//! the group's minimum advisory ID). Each result references its rule and
//! carries the source file as an artifact location, with an optional
//! region from the package's line span.

use std::io::Write;

use serde::Serialize;

use vigil_advisory::results::VulnerabilityResults;

use crate::error::CliError;

const SARIF_SCHEMA: &str =
    "https://raw.githubusercontent.com/oasis-tcs/sarif-spec/master/Schemata/sarif-schema-2.1.0.json";

#[derive(Serialize)]
struct Sarif {
    #[serde(rename = "$schema")]
    schema: &'static str,
    version: &'static str,
    runs: Vec<Run>,
}

#[derive(Serialize)]
struct Run {
    tool: Tool,
    results: Vec<SarifResult>,
}

#[derive(Serialize)]
struct Tool {
    driver: Driver,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Driver {
    name: &'static str,
    information_uri: &'static str,
    version: &'static str,
    rules: Vec<Rule>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Rule {
    id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    short_description: Option<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    help_uri: Option<String>,
}

#[derive(Serialize)]
struct Message {
    text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SarifResult {
    rule_id: String,
    rule_index: usize,
    message: Message,
    locations: Vec<Location>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Location {
    physical_location: PhysicalLocation,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PhysicalLocation {
    artifact_location: ArtifactLocation,
    #[serde(skip_serializing_if = "Option::is_none")]
    region: Option<Region>,
}

#[derive(Serialize)]
struct ArtifactLocation {
    uri: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Region {
    start_line: usize,
    end_line: usize,
}

fn build_document(results: &VulnerabilityResults) -> Sarif {
    let mut rules: Vec<Rule> = Vec::new();
    let mut rule_index_of = std::collections::BTreeMap::new();
    let mut sarif_results = Vec::new();

    for bucket in &results.results {
        for package_vulns in &bucket.packages {
            let pkg = &package_vulns.package;

            for group in &package_vulns.groups {
                let rule_id = group.representative().to_owned();

                let rule_index = *rule_index_of.entry(rule_id.clone()).or_insert_with(|| {
                    let summary = package_vulns
                        .vulnerabilities
                        .iter()
                        .find(|v| v.id == rule_id)
                        .and_then(|v| v.summary.clone());

                    rules.push(Rule {
                        id: rule_id.clone(),
                        short_description: summary.map(|text| Message { text }),
                        help_uri: Some(format!("https://osv.dev/{rule_id}")),
                    });
                    rules.len() - 1
                });

                let message = Message {
                    text: format!(
                        "Package {}@{} is vulnerable to {} ({})",
                        pkg.name,
                        pkg.version,
                        rule_id,
                        group.ids.join(", "),
                    ),
                };

                sarif_results.push(SarifResult {
                    rule_id,
                    rule_index,
                    message,
                    locations: vec![Location {
                        physical_location: PhysicalLocation {
                            artifact_location: ArtifactLocation { uri: bucket.source.path.clone() },
                            region: pkg.line_span.map(|span| Region {
                                start_line: span.start,
                                end_line: span.end,
                            }),
                        },
                    }],
                });
            }
        }
    }

    Sarif {
        schema: SARIF_SCHEMA,
        version: "2.1.0",
        runs: vec![Run {
            tool: Tool {
                driver: Driver {
                    name: "vigil",
                    information_uri: "https://github.com/dongwonkwak/vigil",
                    version: env!("CARGO_PKG_VERSION"),
                    rules,
                },
            },
            results: sarif_results,
        }],
    }
}

/// Render a complete SARIF document (also for clean scans).
pub fn render(results: &VulnerabilityResults, writer: &mut dyn Write) -> Result<(), CliError> {
    let document = build_document(results);
    serde_json::to_writer_pretty(&mut *writer, &document)?;
    writeln!(writer)?;
    Ok(())
}
