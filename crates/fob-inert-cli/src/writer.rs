//! Writing build output to disk.
//!
//! Every filename comes from a template the user controls, so each one is
//! cleaned and checked against the output directory before anything is
//! written. Validation happens for the whole bundle up front; a bad name
//! means nothing gets written.

use crate::error::{CliError, Result};
use fob_plugin_inert::{InertBundle, OutputKind};
use path_clean::PathClean;
use std::fs;
use std::path::{Component, Path, PathBuf};

/// One file written by [`write_bundle`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenFile {
    pub filename: String,
    pub path: PathBuf,
    pub size: u64,
    pub kind: OutputKind,
}

/// Resolve `filename` inside `out_dir`, rejecting anything that would land
/// elsewhere.
pub fn validate_output_path(out_dir: &Path, filename: &str) -> Result<PathBuf> {
    let unsafe_path = || CliError::UnsafeOutputPath {
        filename: filename.to_string(),
        out_dir: out_dir.to_path_buf(),
    };

    if filename.is_empty() || filename.contains('\0') {
        return Err(unsafe_path());
    }

    let relative = Path::new(filename).clean();
    let escapes = relative.components().any(|c| {
        matches!(
            c,
            Component::ParentDir | Component::RootDir | Component::Prefix(_)
        )
    });
    if escapes || relative.is_absolute() {
        return Err(unsafe_path());
    }

    let base = out_dir.clean();
    let full = base.join(&relative).clean();
    if !full.starts_with(&base) || full == base {
        return Err(unsafe_path());
    }
    Ok(full)
}

/// Write every file of `bundle` under `out_dir`, creating directories as
/// needed. Existing files are overwritten.
pub fn write_bundle(bundle: &InertBundle, out_dir: &Path) -> Result<Vec<WrittenFile>> {
    let targets = bundle
        .files
        .iter()
        .map(|file| validate_output_path(out_dir, &file.filename).map(|path| (file, path)))
        .collect::<Result<Vec<_>>>()?;

    fs::create_dir_all(out_dir)?;

    let mut written = Vec::with_capacity(targets.len());
    for (file, path) in targets {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, &file.content)?;
        tracing::debug!(file = %file.filename, bytes = file.content.len(), "wrote output");
        written.push(WrittenFile {
            filename: file.filename.clone(),
            path,
            size: file.content.len() as u64,
            kind: file.kind,
        });
    }
    Ok(written)
}

/// Delete files a previous build wrote that the latest build did not.
///
/// Watch mode calls this after every successful rebuild so hashed names from
/// earlier passes do not pile up. Files already gone are skipped. Returns the
/// paths removed.
pub fn remove_stale(previous: &[WrittenFile], current: &[WrittenFile]) -> Result<Vec<PathBuf>> {
    let mut removed = Vec::new();
    for old in previous {
        if current.iter().any(|file| file.path == old.path) {
            continue;
        }
        match fs::remove_file(&old.path) {
            Ok(()) => {
                tracing::debug!(file = %old.filename, "removed stale output");
                removed.push(old.path.clone());
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => return Err(err.into()),
        }
    }
    Ok(removed)
}
