//! Command-line interface for inert entry builds.
//!
//! The binary wraps [`fob_plugin_inert::InertBuild`]: it loads configuration
//! from `inert.config.json` / `inert.config.toml`, the environment and the
//! command line, runs a Rolldown build with the inert plugin installed and
//! writes the result to the output directory. With `--watch` every change
//! under the project root triggers a full rebuild.
//!
//! # Modules
//!
//! - [`cli`] - clap argument definitions
//! - [`config`] - layered configuration (defaults < file < env < CLI)
//! - [`commands`] - command implementations
//! - [`writer`] - output writing with path validation
//! - [`watcher`] - debounced file watching for `--watch`
//! - [`error`] - error types and miette conversion
//! - [`logger`] - tracing subscriber setup
//! - [`ui`] - terminal status messages

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod logger;
pub mod ui;
pub mod watcher;
pub mod writer;

pub use error::{CliError, ConfigError, Result};
