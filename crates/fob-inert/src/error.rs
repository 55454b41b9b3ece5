//! Error types for inert entry handling

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Result alias used throughout `fob-inert`.
pub type Result<T, E = InertError> = std::result::Result<T, E>;

/// Errors raised by the inert entry adapter.
///
/// [`InertError::UnitCardinality`] and [`InertError::DuplicateOutput`] are
/// raised during a build; the other variants are configuration problems
/// reported before any module is touched.
#[derive(Error, Debug, Diagnostic)]
pub enum InertError {
    /// An inert unit picked up modules besides its entry module.
    #[error(
        "Assertion failed: inert entry point must have exactly 1 module \
         (unit '{unit}' for entry '{entry}' contains {} modules: {})",
        .modules.len(),
        .modules.join(", ")
    )]
    #[diagnostic(
        code(fob::inert::unit_cardinality),
        help(
            "An inert entry is emitted verbatim, so its unit cannot be merged with other modules. \
             Check code-splitting options that may move shared modules into the entry unit."
        )
    )]
    UnitCardinality {
        unit: String,
        entry: String,
        modules: Vec<String>,
    },

    /// Two inert outputs (or an inert output and another emitted file) render
    /// to the same filename.
    #[error("Inert output '{filename}' for entry '{second}' collides with '{first}'")]
    #[diagnostic(
        code(fob::inert::duplicate_output),
        help("Include [chunkname] or [name] in the filename template so every entry gets its own file")
    )]
    DuplicateOutput {
        filename: String,
        first: String,
        second: String,
    },

    /// Two entry names point at the same request.
    #[error("Entries '{first}' and '{second}' both map to request '{request}'")]
    #[diagnostic(
        code(fob::inert::duplicate_request),
        help("Each inert entry must name a distinct file")
    )]
    DuplicateRequest {
        first: String,
        second: String,
        request: String,
    },

    /// An entry name or request was empty.
    #[error("Invalid entry '{name}': {reason}")]
    #[diagnostic(code(fob::inert::invalid_entry))]
    InvalidEntry { name: String, reason: String },

    /// A regex matcher could not be compiled.
    #[error("Invalid pattern for entry '{name}': {source}")]
    #[diagnostic(code(fob::inert::invalid_pattern))]
    InvalidPattern {
        name: String,
        #[source]
        source: regex::Error,
    },

    /// An `attrs` item was not of the form `tag:attribute`.
    #[error("Invalid attribute selector '{0}'")]
    #[diagnostic(
        code(fob::inert::invalid_attribute),
        help("Use 'tag:attribute' pairs such as 'img:src' or 'script:src'")
    )]
    InvalidAttribute(String),

    /// The passthrough generator ran before the parser captured anything.
    #[error("No captured source for inert module {}", .0.display())]
    #[diagnostic(
        code(fob::inert::missing_source),
        help("The module was generated before it was built; this is a host ordering bug")
    )]
    MissingSource(PathBuf),
}

impl InertError {
    pub fn invalid_entry(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidEntry {
            name: name.into(),
            reason: reason.into(),
        }
    }
}
