//! Records exchanged with the host pipeline.
//!
//! These are the points where a host (Rolldown, or the in-memory pipeline in
//! `test_utils`) hands its state to the adapter. The adapter mutates them and
//! never holds on to them past the hook call.

use crate::error::{InertError, Result};
use crate::passthrough::{ModuleGenerator, ModuleParser};
use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Identity of the compilation a hook is running in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompilationInfo {
    pub name: Option<String>,
    /// Spawned by another plugin or loader to build a sub-graph.
    pub is_child: bool,
}

impl CompilationInfo {
    /// The top-level compilation.
    pub fn root() -> Self {
        Self::default()
    }

    pub fn child(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            is_child: true,
        }
    }
}

/// A resolution in progress.
///
/// The adapter tags inert modules by filling `inert` and replacing the parser
/// and generator; the host uses its defaults wherever they are `None`.
#[derive(Clone, Default)]
pub struct ResolveData {
    /// Request as written by the importer (or the entry configuration).
    pub request: String,
    /// File the host resolved the request to.
    pub resource: PathBuf,
    pub parser: Option<Arc<dyn ModuleParser>>,
    pub generator: Option<Arc<dyn ModuleGenerator>>,
    /// Entry name, when the module is inert.
    pub inert: Option<String>,
}

impl ResolveData {
    pub fn new(request: impl Into<String>, resource: impl Into<PathBuf>) -> Self {
        Self {
            request: request.into(),
            resource: resource.into(),
            ..Default::default()
        }
    }

    pub fn is_inert(&self) -> bool {
        self.inert.is_some()
    }
}

impl fmt::Debug for ResolveData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolveData")
            .field("request", &self.request)
            .field("resource", &self.resource)
            .field("parser", &self.parser.is_some())
            .field("generator", &self.generator.is_some())
            .field("inert", &self.inert)
            .finish()
    }
}

/// Output options shared by every unit of a compilation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputOptions {
    /// Filename template for entry units.
    pub filename: String,
    /// Prefix for rewritten references; relative paths are used when unset.
    pub public_path: Option<String>,
}

impl OutputOptions {
    pub fn new(filename: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            public_path: None,
        }
    }
}

/// Read-only view of a unit (chunk) at render time.
#[derive(Debug, Clone)]
pub struct UnitView<'a> {
    pub id: &'a str,
    /// Ids of every module rendered into the unit.
    pub modules: Vec<&'a str>,
    pub entry_module: Option<&'a str>,
    /// Unit-specific template; falls back to [`OutputOptions::filename`].
    pub filename_template: Option<&'a str>,
}

/// One renderable contribution to the output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    pub identifier: String,
    pub filename: String,
    pub content: Arc<[u8]>,
}

/// Whether later renderers may still contribute to a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestFlow {
    Continue,
    /// The unit is fully rendered; drop every later contribution.
    Stop,
}

/// Emitted files keyed by filename, in emission order.
#[derive(Debug, Clone, Default)]
pub struct AssetSet {
    assets: IndexMap<String, Arc<[u8]>>,
}

impl AssetSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Emit (or overwrite) a file. Hosts check inert names with
    /// [`OutputClaims`] first; this only stores bytes.
    pub fn emit(&mut self, filename: impl Into<String>, content: impl Into<Arc<[u8]>>) {
        self.assets.insert(filename.into(), content.into());
    }

    pub fn get(&self, filename: &str) -> Option<&[u8]> {
        self.assets.get(filename).map(|c| &c[..])
    }

    pub fn remove(&mut self, filename: &str) -> Option<Arc<[u8]>> {
        self.assets.shift_remove(filename)
    }

    pub fn retain(&mut self, mut keep: impl FnMut(&str) -> bool) {
        self.assets.retain(|name, _| keep(name));
    }

    pub fn contains(&self, filename: &str) -> bool {
        self.assets.contains_key(filename)
    }

    pub fn filenames(&self) -> impl Iterator<Item = &str> {
        self.assets.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.assets.iter().map(|(name, c)| (name.as_str(), &c[..]))
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}

/// Owners of the filenames written during one build.
///
/// Hosts claim every inert output (and any other file an inert output could
/// replace) before emitting it, so two entries rendering to the same name fail
/// the build instead of one silently replacing the other.
///
/// # Example
///
/// ```
/// use fob_inert::OutputClaims;
///
/// let mut claims = OutputClaims::new();
/// claims.claim("one.html", "one").unwrap();
/// claims.claim("one.html", "one").unwrap();
/// assert!(claims.claim("one.html", "two").is_err());
/// ```
#[derive(Debug, Clone, Default)]
pub struct OutputClaims {
    owners: FxHashMap<String, String>,
}

impl OutputClaims {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `owner` as the producer of `filename`.
    ///
    /// Claiming a name again for the same owner is allowed; a different owner
    /// is a [`InertError::DuplicateOutput`].
    pub fn claim(&mut self, filename: &str, owner: &str) -> Result<()> {
        match self.owners.get(filename) {
            Some(first) if first != owner => Err(InertError::DuplicateOutput {
                filename: filename.to_string(),
                first: first.clone(),
                second: owner.to_string(),
            }),
            Some(_) => Ok(()),
            None => {
                self.owners.insert(filename.to_string(), owner.to_string());
                Ok(())
            }
        }
    }

    pub fn owner(&self, filename: &str) -> Option<&str> {
        self.owners.get(filename).map(String::as_str)
    }
}

/// An inert module as seen from the render step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InertModule {
    pub entry_name: String,
    pub resource: PathBuf,
    /// Generated bytes (the passthrough generator's output).
    pub content: Arc<[u8]>,
}

/// Lookup of inert modules by module id.
pub trait InertModules {
    fn inert_module(&self, module_id: &str) -> Option<InertModule>;
}

impl InertModules for FxHashMap<String, InertModule> {
    fn inert_module(&self, module_id: &str) -> Option<InertModule> {
        self.get(module_id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claims_reject_second_owner() {
        let mut claims = OutputClaims::new();
        claims.claim("site.html", "one").unwrap();
        claims.claim("other.html", "two").unwrap();

        let err = claims.claim("site.html", "two").unwrap_err();
        assert!(matches!(
            err,
            InertError::DuplicateOutput { ref filename, ref first, ref second }
                if filename == "site.html" && first == "one" && second == "two"
        ));
        assert_eq!(claims.owner("site.html"), Some("one"));
    }

    #[test]
    fn test_asset_set_keeps_emission_order() {
        let mut assets = AssetSet::new();
        assets.emit("b.js", &b"b"[..]);
        assets.emit("a.html", &b"a"[..]);
        assert_eq!(assets.filenames().collect::<Vec<_>>(), vec!["b.js", "a.html"]);
        assert!(assets.remove("b.js").is_some());
        assert_eq!(assets.len(), 1);
    }
}
