//! The inert entry adapter.
//!
//! [`InertEntryPlugin`] is created once from [`InertOptions`] and lives for as
//! long as the host's compiler. Each (re)build asks it for an
//! [`InertCompilation`], which carries all per-build state; nothing but the
//! options and the remembered placeholder template survives between builds.

use crate::classify::{Classification, Classifier};
use crate::entry::EntryMap;
use crate::error::Result;
use crate::host::{
    AssetSet, CompilationInfo, InertModules, ManifestEntry, ManifestFlow, OutputOptions,
    ResolveData, UnitView,
};
use crate::passthrough::{PassthroughGenerator, PassthroughParser};
use crate::placeholder::{self, PlaceholderFilename};
use crate::references::{reference_url, rewrite, Reference, ReferenceScanner, DEFAULT_ATTRIBUTES};
use crate::render;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// How the inert output gets its name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Replace the unit's rendered content directly.
    #[default]
    Override,
    /// Emit under a placeholder name, copy the raw file, delete the placeholder.
    Placeholder,
}

/// Plugin options.
///
/// # Example
///
/// ```
/// use fob_inert::{InertOptions, Strategy};
///
/// let options = InertOptions::new()
///     .with_filename("[chunkname].html")
///     .with_attrs(["img:src", "script:src"])
///     .with_public_path("/static/");
///
/// assert_eq!(options.strategy, Strategy::Override);
/// assert_eq!(options.attrs.len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InertOptions {
    /// Also run inside child compilations.
    pub include_children: bool,

    /// Filename template for inert output. Takes precedence over the unit's
    /// own template when set.
    pub filename: Option<String>,

    /// `tag:attribute` pairs whose values are treated as sibling references.
    pub attrs: Vec<String>,

    /// Prefix for rewritten references. Relative URLs are written when unset.
    pub public_path: Option<String>,

    pub strategy: Strategy,
}

impl Default for InertOptions {
    fn default() -> Self {
        Self {
            include_children: false,
            filename: None,
            attrs: DEFAULT_ATTRIBUTES.iter().map(|a| a.to_string()).collect(),
            public_path: None,
            strategy: Strategy::Override,
        }
    }
}

impl InertOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take part in child compilations as well.
    pub fn with_include_children(mut self, include: bool) -> Self {
        self.include_children = include;
        self
    }

    /// Template for inert output; `[chunkname]` becomes the entry name.
    pub fn with_filename(mut self, template: impl Into<String>) -> Self {
        self.filename = Some(template.into());
        self
    }

    /// Replace the scanned `tag:attribute` pairs.
    pub fn with_attrs<I, S>(mut self, attrs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attrs = attrs.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_public_path(mut self, public_path: impl Into<String>) -> Self {
        self.public_path = Some(public_path.into());
        self
    }

    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }
}

/// Long-lived adapter state.
#[derive(Debug, Clone)]
pub struct InertEntryPlugin {
    options: Arc<InertOptions>,
    scanner: ReferenceScanner,
    placeholder: Arc<PlaceholderFilename>,
}

impl InertEntryPlugin {
    pub fn new(options: InertOptions) -> Result<Self> {
        let scanner = ReferenceScanner::new(&options.attrs)?;
        Ok(Self {
            options: Arc::new(options),
            scanner,
            placeholder: Arc::new(PlaceholderFilename::new()),
        })
    }

    pub fn options(&self) -> &InertOptions {
        &self.options
    }

    pub fn placeholder(&self) -> &PlaceholderFilename {
        &self.placeholder
    }

    /// Per-build state for one compilation.
    ///
    /// `entries` must be the mapping resolved for this build. Returns `None`
    /// when the adapter sits this compilation out (child compilations unless
    /// `include_children` is set).
    pub fn compilation(
        &self,
        entries: &EntryMap,
        info: &CompilationInfo,
        context: impl Into<PathBuf>,
    ) -> Result<Option<InertCompilation>> {
        if info.is_child && !self.options.include_children {
            debug!(compilation = ?info.name, "skipping child compilation");
            return Ok(None);
        }

        Ok(Some(InertCompilation {
            classifier: Classifier::new(entries, context)?,
            options: Arc::clone(&self.options),
            scanner: self.scanner.clone(),
            placeholder: Arc::clone(&self.placeholder),
        }))
    }
}

/// Hooks for a single compilation.
#[derive(Debug)]
pub struct InertCompilation {
    classifier: Classifier,
    options: Arc<InertOptions>,
    scanner: ReferenceScanner,
    placeholder: Arc<PlaceholderFilename>,
}

impl InertCompilation {
    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    pub fn strategy(&self) -> Strategy {
        self.options.strategy
    }

    /// Tag a resolution as inert and install the passthrough parser and
    /// generator. Non-entries are left exactly as the host resolved them.
    pub fn after_resolve(&self, data: &mut ResolveData) -> Option<Classification> {
        let classification = self.classifier.classify(&data.request).or_else(|| {
            let resource = data.resource.to_string_lossy();
            (!resource.is_empty())
                .then(|| self.classifier.classify(&resource))
                .flatten()
        })?;

        data.parser = Some(Arc::new(PassthroughParser));
        data.generator = Some(Arc::new(PassthroughGenerator));
        data.inert = Some(classification.entry_name.clone());
        Some(classification)
    }

    /// Swap in the placeholder filename (placeholder strategy only).
    pub fn prepare_output(&self, output: &mut OutputOptions) {
        if self.options.strategy == Strategy::Placeholder {
            self.placeholder.install(output);
        }
    }

    /// Render override for one unit.
    ///
    /// Every inert unit is checked to hold only its entry module under both
    /// strategies. Only the override strategy renders it; the placeholder
    /// strategy lets the host render under the placeholder name.
    pub fn render_manifest(
        &self,
        unit: &UnitView<'_>,
        modules: &dyn InertModules,
        output: &OutputOptions,
        result: &mut Vec<ManifestEntry>,
    ) -> Result<ManifestFlow> {
        if self.options.strategy != Strategy::Override {
            render::inert_unit(unit, modules)?;
            return Ok(ManifestFlow::Continue);
        }
        match self.options.filename.as_deref() {
            Some(template) => {
                let unit = UnitView {
                    filename_template: Some(template),
                    ..unit.clone()
                };
                render::render_manifest(&unit, modules, output, result)
            }
            None => render::render_manifest(unit, modules, output, result),
        }
    }

    /// Raw copy of an inert entry under its real name (placeholder strategy
    /// side-loader). `None` under the override strategy.
    pub fn passthrough_asset(
        &self,
        entry_name: &str,
        resource: &Path,
        content: &Arc<[u8]>,
    ) -> Option<(String, Arc<[u8]>)> {
        if self.options.strategy != Strategy::Placeholder {
            return None;
        }
        let filename = match self.options.filename.as_deref() {
            Some(template) => {
                placeholder::passthrough_filename(template, entry_name, resource, content)
            }
            None => self.placeholder.passthrough_filename(entry_name, resource, content),
        };
        info!(entry = entry_name, filename = %filename, "emitting inert copy");
        Some((filename, Arc::clone(content)))
    }

    /// Remove placeholder artifacts. Runs after every pass.
    pub fn after_emit(&self, assets: &mut AssetSet) -> usize {
        if self.options.strategy != Strategy::Placeholder {
            return 0;
        }
        self.placeholder.cleanup(assets)
    }

    /// Sibling references in an inert source.
    pub fn scan(&self, source: &[u8]) -> Vec<Reference> {
        self.scanner.scan(source)
    }

    /// Point each reference in `content` at its emitted file.
    ///
    /// `emitted` maps a reference to the sibling's output filename;
    /// unresolved references are kept as written.
    pub fn link(
        &self,
        from_file: &str,
        content: &[u8],
        refs: &[Reference],
        mut emitted: impl FnMut(&Reference) -> Option<String>,
    ) -> Vec<u8> {
        let public_path = self.options.public_path.as_deref();
        rewrite(content, refs, |r| {
            emitted(r).map(|to| reference_url(from_file, &to, public_path))
        })
    }
}
