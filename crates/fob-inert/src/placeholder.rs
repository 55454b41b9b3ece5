//! Placeholder filename strategy.
//!
//! For hosts without a render override: the entry unit is emitted under a
//! throwaway name, the raw file is emitted separately under the real name,
//! and the throwaway artifact is deleted after every pass.

use crate::host::{AssetSet, OutputOptions};
use crate::template::{render_path, substitute_entry_name, PathData, DEFAULT_INERT_FILENAME};
use once_cell::sync::OnceCell;
use std::path::Path;
use tracing::{debug, trace};
use uuid::Uuid;

#[derive(Debug)]
pub struct PlaceholderFilename {
    placeholder: String,
    original: OnceCell<String>,
}

impl PlaceholderFilename {
    pub fn new() -> Self {
        Self {
            placeholder: format!("inert-entry-{}", Uuid::new_v4()),
            original: OnceCell::new(),
        }
    }

    pub fn placeholder(&self) -> &str {
        &self.placeholder
    }

    /// The user's template, once captured.
    pub fn original_template(&self) -> Option<&str> {
        self.original.get().map(String::as_str)
    }

    /// Swap the output filename for the placeholder.
    ///
    /// The first call remembers the configured template. Later calls see
    /// either the placeholder (which is never captured) or a fresh copy of
    /// the user's options; both leave the remembered template untouched.
    pub fn install(&self, output: &mut OutputOptions) {
        if output.filename != self.placeholder {
            let captured = self.original.get_or_init(|| output.filename.clone());
            trace!(template = %captured, "captured output filename");
        }
        output.filename = self.placeholder.clone();
    }

    /// Real filename for the raw copy of an inert entry, rendered from the
    /// remembered template.
    pub fn passthrough_filename(&self, entry_name: &str, resource: &Path, content: &[u8]) -> String {
        let template = self.original_template().unwrap_or(DEFAULT_INERT_FILENAME);
        passthrough_filename(template, entry_name, resource, content)
    }

    /// Delete every placeholder-derived asset. Returns how many were removed.
    pub fn cleanup(&self, assets: &mut AssetSet) -> usize {
        let before = assets.len();
        assets.retain(|name| !name.contains(&self.placeholder));
        let removed = before - assets.len();
        if removed > 0 {
            debug!(removed, "removed placeholder assets");
        }
        removed
    }
}

/// Render a side-loader filename.
///
/// `[chunkname]` becomes the entry name; `[name]` and `[ext]` come from the
/// resource file.
pub fn passthrough_filename(
    template: &str,
    entry_name: &str,
    resource: &Path,
    content: &[u8],
) -> String {
    let template = substitute_entry_name(template, entry_name);
    let stem = resource.file_stem().and_then(|s| s.to_str()).unwrap_or(entry_name);
    let ext = resource.extension().and_then(|e| e.to_str());
    let data = PathData::named(stem).with_ext(ext).with_content(content);
    render_path(&template, &data)
}

impl Default for PlaceholderFilename {
    fn default() -> Self {
        Self::new()
    }
}
