//! CLI-specific error types and exit code mapping

use vigil_core::error::VigilError;

/// CLI-specific error type.
///
/// Each variant carries enough context for a user-friendly message.
/// The `exit_code()` method maps errors to the scanner's exit code contract.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Malformed CLI flag value (e.g. `--parse-as` missing its colon).
    #[error("{0}")]
    Usage(String),

    /// A requested parser does not exist; carries the message listing
    /// the closed set of supported parsers.
    #[error("{0}")]
    ParserNotFound(String),

    /// No discoverable package sources after enumeration.
    #[error("No package sources found, --help for usage information.")]
    NoSources,

    /// Interrupted by the user (ctrl-c).
    #[error("scan cancelled")]
    Cancelled,

    /// Configuration loading or validation failure.
    #[error("configuration error: {0}")]
    Config(String),

    /// JSON serialisation failed during output rendering.
    #[error("json output error: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    /// IO error (file read, stdout write, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Wrapped domain error.
    #[error("{0}")]
    Domain(#[from] VigilError),
}

impl CliError {
    /// Map the error to a process exit code.
    ///
    /// | Code | Meaning                                    |
    /// |------|--------------------------------------------|
    /// | 0    | Clean scan, no vulnerabilities             |
    /// | 1    | Vulnerabilities found / general error      |
    /// | 127  | Usage or input error                       |
    /// | 128  | No package sources found                   |
    /// | 130  | Cancelled by the user                      |
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Usage(_) | Self::ParserNotFound(_) | Self::Config(_) => 127,
            Self::NoSources => 128,
            Self::Cancelled => 130,
            Self::JsonSerialize(_) | Self::Io(_) | Self::Domain(_) => 1,
        }
    }
}
