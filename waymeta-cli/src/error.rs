//! CLI error type and exit codes.

use std::fmt;
use std::process;

use waymeta::config::ConfigError;
use waymeta::logging::LoggingError;
use waymeta::pipeline::PipelineError;
use waymeta::provider::ProviderError;
use waymeta::store::StoreError;

/// Errors surfaced to the user by the CLI.
#[derive(Debug)]
pub enum CliError {
    /// Configuration file or settings problem.
    Config(String),
    /// Invalid command-line argument.
    InvalidArgument(String),
    /// Logger could not be installed.
    Logging(String),
    /// Database connection or query failure.
    Database(String),
    /// HTTP client setup failure.
    Http(String),
    /// A run failed after it started.
    Run { source: String, message: String },
    /// Tokio runtime could not be created.
    Runtime(String),
}

impl CliError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::InvalidArgument(_) => 2,
            CliError::Config(_) | CliError::Logging(_) => 3,
            CliError::Database(_) => 4,
            CliError::Http(_) => 5,
            CliError::Run { .. } | CliError::Runtime(_) => 1,
        }
    }

    /// Prints the error and exits the process.
    pub fn exit(&self) -> ! {
        eprintln!("{} {}", console::style("Error:").red().bold(), self);
        process::exit(self.exit_code())
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::InvalidArgument(msg) => write!(f, "Invalid argument: {}", msg),
            CliError::Logging(msg) => write!(f, "Logging setup failed: {}", msg),
            CliError::Database(msg) => write!(f, "Database error: {}", msg),
            CliError::Http(msg) => write!(f, "HTTP client error: {}", msg),
            CliError::Run { source, message } => write!(f, "Run for {} failed: {}", source, message),
            CliError::Runtime(msg) => write!(f, "Runtime error: {}", msg),
        }
    }
}

impl std::error::Error for CliError {}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        CliError::Config(e.to_string())
    }
}

impl From<LoggingError> for CliError {
    fn from(e: LoggingError) -> Self {
        CliError::Logging(e.to_string())
    }
}

impl From<StoreError> for CliError {
    fn from(e: StoreError) -> Self {
        CliError::Database(e.to_string())
    }
}

impl From<ProviderError> for CliError {
    fn from(e: ProviderError) -> Self {
        CliError::Http(e.to_string())
    }
}

impl CliError {
    /// Wraps a pipeline failure with the source it happened in.
    pub fn run(source: &str, error: PipelineError) -> Self {
        match error {
            PipelineError::Store(e) => CliError::Database(format!("{}: {}", source, e)),
            other => CliError::Run {
                source: source.to_string(),
                message: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_distinguish_categories() {
        assert_eq!(CliError::InvalidArgument("x".into()).exit_code(), 2);
        assert_eq!(CliError::Config("x".into()).exit_code(), 3);
        assert_eq!(CliError::Database("x".into()).exit_code(), 4);
        assert_eq!(
            CliError::Run {
                source: "greenery".into(),
                message: "x".into()
            }
            .exit_code(),
            1
        );
    }

    #[test]
    fn test_store_failure_maps_to_database() {
        let err = CliError::run(
            "popularity",
            PipelineError::Store(StoreError::Rejected("read-only".into())),
        );
        assert!(matches!(err, CliError::Database(ref msg) if msg.starts_with("popularity")));
    }
}
