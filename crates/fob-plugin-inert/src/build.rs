//! One-shot inert builds.

use crate::error::{PluginError, Result};
use crate::plugin::InertRolldownPlugin;
use fob_inert::{EntryConfig, InertOptions};
use rolldown::{BundleOutput, BundlerBuilder, BundlerOptions, InputItem};
use rolldown_common::Output;
use rolldown_plugin::__inner::SharedPluginable;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

/// Kind of an emitted file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    Chunk,
    Asset,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputFile {
    /// Path relative to the output directory.
    pub filename: String,
    pub content: Vec<u8>,
    pub kind: OutputKind,
    /// Files a chunk imports, statically or dynamically. Empty for assets.
    pub imports: Vec<String>,
}

/// Files produced by one build, in Rolldown's output order.
#[derive(Debug, Clone, Default)]
pub struct InertBundle {
    pub files: Vec<OutputFile>,
}

impl InertBundle {
    pub fn from_output(output: &BundleOutput) -> Self {
        let files = output
            .assets
            .iter()
            .map(|item| match item {
                Output::Asset(asset) => OutputFile {
                    filename: asset.filename.as_str().to_string(),
                    content: asset.source.as_bytes().to_vec(),
                    kind: OutputKind::Asset,
                    imports: Vec::new(),
                },
                Output::Chunk(chunk) => OutputFile {
                    filename: chunk.filename.as_str().to_string(),
                    content: chunk.code.as_bytes().to_vec(),
                    kind: OutputKind::Chunk,
                    imports: chunk
                        .imports
                        .iter()
                        .chain(chunk.dynamic_imports.iter())
                        .map(|f| f.to_string())
                        .collect(),
                },
            })
            .collect();
        Self { files }
    }

    pub fn get(&self, filename: &str) -> Option<&OutputFile> {
        self.files.iter().find(|f| f.filename == filename)
    }

    pub fn text(&self, filename: &str) -> Option<String> {
        self.get(filename)
            .map(|f| String::from_utf8_lossy(&f.content).into_owned())
    }

    pub fn filenames(&self) -> Vec<&str> {
        self.files.iter().map(|f| f.filename.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Builder for a Rolldown build with the inert plugin installed.
///
/// ```rust,no_run
/// use fob_plugin_inert::{InertBuild, InertOptions};
///
/// # async fn example() -> fob_plugin_inert::Result<()> {
/// let bundle = InertBuild::new("./src/index.html")
///     .cwd("/project")
///     .options(InertOptions::new().with_attrs(["img:src", "script:src"]))
///     .run()
///     .await?;
/// assert!(bundle.get("main.html").is_some());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct InertBuild {
    entry: EntryConfig,
    cwd: Option<PathBuf>,
    options: InertOptions,
    asset_filename: Option<String>,
    entry_filenames: Option<String>,
}

impl InertBuild {
    pub fn new(entry: impl Into<EntryConfig>) -> Self {
        Self {
            entry: entry.into(),
            cwd: None,
            options: InertOptions::default(),
            asset_filename: None,
            entry_filenames: None,
        }
    }

    pub fn cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    pub fn options(mut self, options: InertOptions) -> Self {
        self.options = options;
        self
    }

    pub fn asset_filename(mut self, template: impl Into<String>) -> Self {
        self.asset_filename = Some(template.into());
        self
    }

    /// Template for inert entry units, used when the `filename` option is
    /// unset. Defaults to `[name][extname]`.
    pub fn entry_filenames(mut self, template: impl Into<String>) -> Self {
        self.entry_filenames = Some(template.into());
        self
    }

    /// Evaluate entries, build, and return the generated files.
    ///
    /// Entries are evaluated once per call, so a function entry sees every
    /// rebuild.
    pub async fn run(&self) -> Result<InertBundle> {
        let entries = self.entry.resolve()?;
        let inputs: Vec<InputItem> = entries
            .paths()
            .map(|(name, request)| InputItem {
                name: Some(name.to_string()),
                import: request.to_string(),
            })
            .collect();
        if inputs.is_empty() {
            return Err(PluginError::NoInputs);
        }

        let cwd = match &self.cwd {
            Some(cwd) => cwd.clone(),
            None => std::env::current_dir()?,
        };
        debug!(entries = inputs.len(), cwd = %cwd.display(), "starting inert build");

        let mut plugin = InertRolldownPlugin::new(entries, self.options.clone(), &cwd)?;
        if let Some(template) = &self.asset_filename {
            plugin = plugin.with_asset_filename(template.clone());
        }
        if let Some(template) = &self.entry_filenames {
            plugin = plugin.with_entry_filenames(template.clone());
        }
        let plugin: SharedPluginable = Arc::new(plugin);

        let mut bundler = BundlerBuilder::default()
            .with_options(BundlerOptions {
                input: Some(inputs),
                cwd: Some(cwd),
                ..Default::default()
            })
            .with_plugins(vec![plugin])
            .build()
            .map_err(|e| PluginError::from_rolldown(&e))?;

        let output = bundler
            .generate()
            .await
            .map_err(|e| PluginError::from_rolldown(&e))?;

        Ok(InertBundle::from_output(&output))
    }
}
