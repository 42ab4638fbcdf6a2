//! CLI argument parsing using clap derive API
//!
//! This module defines the command-line interface structure using clap's derive macros.
//! It is purely declarative with no side effects or I/O.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// vigil -- scans various mediums for dependencies and matches them
/// against a vulnerability database.
#[derive(Parser, Debug)]
#[command(name = "vigil", version, about, long_about = None, arg_required_else_help = false)]
pub struct Cli {
    /// Scan package lockfile on this path (repeatable).
    #[arg(short = 'L', long = "lockfile", value_name = "path")]
    pub lockfile: Vec<PathBuf>,

    /// Scan SBOM file on this path (repeatable).
    #[arg(short = 'S', long = "sbom", value_name = "path")]
    pub sbom: Vec<PathBuf>,

    /// Scan docker image with this name (repeatable).
    #[arg(short = 'D', long = "docker", value_name = "name")]
    pub docker: Vec<String>,

    /// Set/override config file.
    #[arg(long, value_name = "path")]
    pub config: Option<PathBuf>,

    /// Force a parser for files: <parser>:<path-or-empty>.
    ///
    /// With a non-empty path the parser applies to that path only;
    /// with an empty path it applies to every scanned file.
    #[arg(long = "parse-as", value_name = "parser:path")]
    pub parse_as: Option<String>,

    /// (legacy) equivalent to --format json.
    #[arg(long)]
    pub json: bool,

    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,

    /// Skip scanning git repositories.
    #[arg(long)]
    pub skip_git: bool,

    /// Check subdirectories.
    #[arg(short = 'r', long)]
    pub recursive: bool,

    /// Directories (or files) to scan.
    #[arg(value_name = "directory")]
    pub directories: Vec<PathBuf>,
}

/// Supported output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table.
    Table,
    /// Machine-readable JSON.
    Json,
    /// Markdown table.
    Markdown,
    /// SARIF 2.1.0.
    Sarif,
}

impl Cli {
    /// Resolve the effective output format, honoring the legacy `--json` flag.
    pub fn effective_format(&self) -> OutputFormat {
        if self.json {
            OutputFormat::Json
        } else {
            self.format
        }
    }
}

/// A validated `--parse-as` value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseAs {
    /// Canonical parser name (registry key).
    pub parser: String,
    /// Restrict the parser to this path; `None` applies it to all files.
    pub path: Option<PathBuf>,
}

impl ParseAs {
    /// Parse the `<parser>:<path-or-empty>` syntax. Both halves are
    /// mandatory; a missing colon is a usage error.
    pub fn parse(value: &str) -> Result<Self, String> {
        let Some((parser, path)) = value.split_once(':') else {
            return Err(format!(
                "parse-as should be formatted as <parser>:<file> (got \"{value}\")"
            ));
        };

        if parser.is_empty() {
            return Err(format!(
                "parse-as should be formatted as <parser>:<file> (got \"{value}\")"
            ));
        }

        let path = if path.is_empty() { None } else { Some(PathBuf::from(path)) };

        Ok(Self { parser: parser.to_owned(), path })
    }

    /// The parser name to force for the given file, or empty for auto-dispatch.
    pub fn parser_for(&self, file: &std::path::Path) -> &str {
        match &self.path {
            None => &self.parser,
            Some(restricted) if restricted == file => &self.parser,
            Some(_) => "",
        }
    }
}
