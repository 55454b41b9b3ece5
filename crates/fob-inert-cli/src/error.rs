//! Error types for the `fob-inert` binary.
//!
//! `CliError` is what commands return; [`cli_error_to_miette`] turns it into a
//! report at the binary edge. Errors from the inert crates keep their
//! diagnostic codes and help text on the way through.

use fob_inert::InertError;
use fob_plugin_inert::PluginError;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T, E = CliError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Errors from the inert plugin or the Rolldown build it drives.
    #[error(transparent)]
    Build(#[from] PluginError),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// An output filename would land outside the output directory.
    #[error("Refusing to write '{filename}': path escapes {}", .out_dir.display())]
    UnsafeOutputPath { filename: String, out_dir: PathBuf },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("File watcher error: {0}")]
    Watch(#[from] notify::Error),
}

impl From<InertError> for CliError {
    fn from(err: InertError) -> Self {
        Self::Build(PluginError::Inert(err))
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file not found: {}\n\nHint: Create inert.config.json or pass --config <path>", .0.display())]
    NotFound(PathBuf),

    #[error("Unsupported config format: {}\n\nHint: Use a .json or .toml file", .0.display())]
    UnsupportedFormat(PathBuf),

    #[error("Invalid configuration: {0}\n\nHint: Check field names and types in your config file")]
    Extract(#[from] Box<figment::Error>),

    #[error("Invalid value for '{field}': {value}\n\nHint: {hint}")]
    InvalidValue {
        field: String,
        value: String,
        hint: String,
    },

    #[error("Missing required field: {field}\n\nHint: {hint}")]
    MissingField { field: String, hint: String },
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Extract(Box::new(err))
    }
}

/// Convert a command failure into a miette report.
///
/// Plugin errors are already diagnostics and are reported as such, keeping
/// their `fob::inert::*` codes.
pub fn cli_error_to_miette(err: CliError) -> miette::Report {
    match err {
        CliError::Build(e) => miette::Report::new(e),
        CliError::Config(e) => miette::miette!("Configuration error: {}", e),
        other => miette::miette!("{}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inert_errors_become_build_errors() {
        let err: CliError = InertError::invalid_entry("main", "request is empty").into();
        assert!(matches!(err, CliError::Build(PluginError::Inert(_))));
    }

    #[test]
    fn test_build_errors_keep_diagnostic_code() {
        let report = cli_error_to_miette(CliError::Build(PluginError::NoInputs));
        let code = report.code().map(|c| c.to_string());
        assert_eq!(code.as_deref(), Some("fob::inert::no_inputs"));
    }

    #[test]
    fn test_config_hints_are_kept() {
        let err = CliError::from(ConfigError::NotFound(PathBuf::from("x.json")));
        assert!(err.to_string().contains("Hint:"));
    }
}
