//! Errors from running an inert Rolldown build.

use fob_inert::InertError;
use miette::Diagnostic;
use thiserror::Error;

pub type Result<T, E = PluginError> = std::result::Result<T, E>;

#[derive(Error, Debug, Diagnostic)]
pub enum PluginError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Inert(#[from] InertError),

    /// Every configured entry was a pattern, so there is nothing to build.
    #[error("No entry names a file; pattern entries only classify requests")]
    #[diagnostic(
        code(fob::inert::no_inputs),
        help("Add at least one `name = \"path\"` entry")
    )]
    NoInputs,

    #[error("Bundler error: {0}")]
    #[diagnostic(code(fob::inert::bundler))]
    Bundler(String),

    #[error("I/O error: {0}")]
    #[diagnostic(code(fob::inert::io))]
    Io(#[from] std::io::Error),
}

impl PluginError {
    /// Wrap a Rolldown diagnostic batch, which only promises `Debug`.
    pub fn from_rolldown(error: &dyn std::fmt::Debug) -> Self {
        Self::Bundler(format!("{error:?}"))
    }
}
