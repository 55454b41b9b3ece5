//! Rolldown plugin for inert entries.
//!
//! Entries handled by this plugin are emitted exactly as they are on disk
//! (HTML pages, manifests, templates). Scripts they reference are bundled by
//! Rolldown as ordinary chunks, other referenced files are emitted as assets,
//! and the references inside the entry are rewritten to the emitted names.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use fob_inert::{EntryMap, InertOptions};
//! use fob_plugin_inert::InertRolldownPlugin;
//! use std::sync::Arc;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let entries = EntryMap::new().with_entry("index", "./src/index.html")?;
//! let options = InertOptions::new()
//!     .with_attrs(["img:src", "script:src"])
//!     .with_filename("[chunkname].html");
//!
//! // Hand to a Rolldown `BundlerBuilder` alongside any other plugins
//! let plugin = Arc::new(InertRolldownPlugin::new(entries, options, "/project")?);
//! # Ok(())
//! # }
//! ```

mod build;
mod error;
mod plugin;

pub use build::{InertBuild, InertBundle, OutputFile, OutputKind};
pub use error::{PluginError, Result};
pub use plugin::{InertRolldownPlugin, DEFAULT_ASSET_FILENAME};

pub use fob_inert::{EntryConfig, EntryMap, EntryValue, InertOptions, Strategy};
