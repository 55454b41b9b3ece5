//! # fob-inert
//!
//! Inert entry handling: designated entry files are emitted verbatim instead
//! of being bundled, while the files they reference still go through the
//! normal pipeline and get their references rewritten.
//!
//! This crate is host-agnostic. A host (see `fob-plugin-inert` for Rolldown)
//! calls into an [`InertCompilation`] at four points of every build:
//!
//! ```text
//! resolve ──► after_resolve()      tag entry, install passthrough parser/generator
//!   build ──► parse + generate     raw bytes captured, no dependencies
//!  render ──► render_manifest()    unit checked, replaced by the raw bytes, contributions stopped
//!    emit ──► after_emit()         placeholder artifacts removed (placeholder strategy)
//! ```
//!
//! ## Example
//!
//! ```rust
//! use fob_inert::{CompilationInfo, EntryConfig, InertEntryPlugin, InertOptions, ResolveData};
//!
//! # fn main() -> Result<(), fob_inert::InertError> {
//! let plugin = InertEntryPlugin::new(InertOptions::new().with_attrs(["img:src", "script:src"]))?;
//! let entries = EntryConfig::from("./src/index.html").resolve()?;
//!
//! let compilation = plugin
//!     .compilation(&entries, &CompilationInfo::root(), "/project")?
//!     .expect("root compilations always participate");
//!
//! let mut data = ResolveData::new("./src/index.html", "/project/src/index.html");
//! let classification = compilation.after_resolve(&mut data).expect("entry is inert");
//! assert_eq!(classification.entry_name, "main");
//! # Ok(())
//! # }
//! ```

pub mod classify;
pub mod entry;
pub mod error;
pub mod host;
pub mod passthrough;
pub mod placeholder;
pub mod plugin;
pub mod references;
pub mod render;
pub mod template;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use classify::{Classification, Classifier, RequestNormalizer};
pub use entry::{EntryConfig, EntryFn, EntryMap, EntryRequest, EntryValue, DEFAULT_ENTRY_NAME};
pub use error::{InertError, Result};
pub use host::{
    AssetSet, CompilationInfo, InertModule, InertModules, ManifestEntry, ManifestFlow,
    OutputClaims, OutputOptions, ResolveData, UnitView,
};
pub use passthrough::{
    BuildInfo, ModuleGenerator, ModuleParser, ParseOutcome, PassthroughGenerator,
    PassthroughParser,
};
pub use placeholder::PlaceholderFilename;
pub use plugin::{InertCompilation, InertEntryPlugin, InertOptions, Strategy};
pub use references::{Reference, ReferenceScanner};
pub use template::{render_path, substitute_entry_name, PathData, DEFAULT_INERT_FILENAME};
