//! In-memory host pipeline for tests.
//!
//! [`MemoryHost`] is a small loader-style bundler that drives the adapter the
//! way a real host would:
//!
//! - entries are resolved (`after_resolve`), built with whichever parser and
//!   generator the resolution ends up with, then rendered one unit per entry;
//! - the default renderer wraps module code in bootstrap code and every
//!   unit that is not stopped gets a trailing `;` from a later renderer;
//! - script siblings are built in child compilations (`[name]-dist.js`),
//!   other siblings are copied by a file loader (`[name]-dist.[ext]`);
//! - output options persist across builds, the way a watching compiler keeps
//!   its configuration between passes;
//! - every named output is claimed once per build, so two files rendering to
//!   the same name fail instead of overwriting each other.
//!
//! Only compiled for tests and the `test-utils` feature.

use crate::classify::RequestNormalizer;
use crate::entry::{EntryConfig, EntryMap};
use crate::error::InertError;
use crate::host::{
    AssetSet, CompilationInfo, InertModule, ManifestFlow, OutputClaims, OutputOptions,
    ResolveData, UnitView,
};
use crate::passthrough::BuildInfo;
use crate::plugin::{InertCompilation, InertEntryPlugin};
use crate::references::Reference;
use crate::template::{render_path, PathData};
use rustc_hash::FxHashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

/// Function name present in every bootstrapped unit.
pub const BOOTSTRAP_MARKER: &str = "function __host_require__";

const SCRIPT_EXTENSIONS: &[&str] = &["js", "mjs", "cjs"];

#[derive(Debug, Error)]
pub enum MemoryError {
    #[error(transparent)]
    Inert(#[from] InertError),

    #[error("Module not found: {}", .0.display())]
    NotFound(PathBuf),
}

/// Output of one [`MemoryHost::build`] pass.
#[derive(Debug, Clone)]
pub struct MemoryBuild {
    pub assets: AssetSet,
    /// Compilations the adapter took part in, in the order they ran.
    pub participated: Vec<CompilationInfo>,
}

impl MemoryBuild {
    pub fn text(&self, filename: &str) -> Option<String> {
        self.assets
            .get(filename)
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
    }

    pub fn filenames(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.assets.filenames().collect();
        names.sort_unstable();
        names
    }
}

#[derive(Debug, Clone)]
pub struct MemoryHost {
    context: PathBuf,
    files: FxHashMap<PathBuf, Arc<[u8]>>,
    output: OutputOptions,
    script_filename: String,
    asset_filename: String,
    extra_modules: FxHashMap<String, Vec<String>>,
}

struct BuildState {
    entries: EntryMap,
    assets: AssetSet,
    participated: Vec<CompilationInfo>,
    siblings: FxHashMap<PathBuf, String>,
    claims: OutputClaims,
}

impl MemoryHost {
    pub fn new(context: impl Into<PathBuf>) -> Self {
        Self {
            context: context.into(),
            files: FxHashMap::default(),
            output: OutputOptions::new("[name].js"),
            script_filename: "[name]-dist.js".to_string(),
            asset_filename: "[name]-dist.[ext]".to_string(),
            extra_modules: FxHashMap::default(),
        }
    }

    /// Add a file; relative paths are taken from the context directory.
    pub fn with_file(mut self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) -> Self {
        let path = self.context.join(path);
        self.files.insert(path, Arc::from(content.into()));
        self
    }

    pub fn with_output_filename(mut self, template: impl Into<String>) -> Self {
        self.output.filename = template.into();
        self
    }

    pub fn with_public_path(mut self, public_path: impl Into<String>) -> Self {
        self.output.public_path = Some(public_path.into());
        self
    }

    pub fn with_script_filename(mut self, template: impl Into<String>) -> Self {
        self.script_filename = template.into();
        self
    }

    pub fn with_asset_filename(mut self, template: impl Into<String>) -> Self {
        self.asset_filename = template.into();
        self
    }

    /// Force `module_id` into the unit of `entry_name`, as an aggressive
    /// chunk-merging optimization would.
    pub fn with_extra_module(
        mut self,
        entry_name: impl Into<String>,
        module_id: impl Into<String>,
    ) -> Self {
        self.extra_modules
            .entry(entry_name.into())
            .or_default()
            .push(module_id.into());
        self
    }

    /// Output options as they stand after the last build.
    pub fn output(&self) -> &OutputOptions {
        &self.output
    }

    /// Run one full compilation pass.
    pub fn build(
        &mut self,
        plugin: &InertEntryPlugin,
        entry: &EntryConfig,
    ) -> Result<MemoryBuild, MemoryError> {
        let entries = entry.resolve()?;
        let root = CompilationInfo::root();
        let comp = plugin.compilation(&entries, &root, &self.context)?;

        let mut state = BuildState {
            entries,
            assets: AssetSet::new(),
            participated: Vec::new(),
            siblings: FxHashMap::default(),
            claims: OutputClaims::new(),
        };
        if let Some(c) = &comp {
            state.participated.push(root);
            c.prepare_output(&mut self.output);
        }
        let output = self.output.clone();
        let normalizer = RequestNormalizer::new(&self.context);

        let requests: Vec<(String, String)> = state
            .entries
            .paths()
            .map(|(name, request)| (name.to_string(), request.to_string()))
            .collect();

        for (index, (name, request)) in requests.iter().enumerate() {
            let resource = normalizer.normalize(request);
            let mut data = ResolveData::new(request.clone(), resource.clone());
            if let Some(c) = &comp {
                c.after_resolve(&mut data);
            }

            let source = self.read(&resource)?;
            let module_id = resource.to_string_lossy().into_owned();
            let unit_id = index.to_string();
            let mut inert: FxHashMap<String, InertModule> = FxHashMap::default();

            let code = build_module(&data, &source)?;
            let mut links: FxHashMap<String, String> = FxHashMap::default();
            let mut refs: Vec<Reference> = Vec::new();

            if let (Some(c), Some(entry_name)) = (&comp, &data.inert) {
                inert.insert(
                    module_id.clone(),
                    InertModule {
                        entry_name: entry_name.clone(),
                        resource: resource.clone(),
                        content: Arc::clone(&code),
                    },
                );
                refs = c.scan(&source);
                let dir = resource.parent().unwrap_or(&self.context).to_path_buf();
                for r in &refs {
                    let path = RequestNormalizer::new(&dir).normalize(r.request());
                    let filename = self.build_sibling(plugin, &path, &mut state)?;
                    links.insert(r.request().to_string(), filename);
                }
            }

            let mut modules = vec![module_id.as_str()];
            if let Some(extra) = self.extra_modules.get(name) {
                modules.extend(extra.iter().map(String::as_str));
            }
            let unit = UnitView {
                id: &unit_id,
                modules,
                entry_module: Some(module_id.as_str()),
                filename_template: None,
            };

            let mut result = Vec::new();
            let flow = match &comp {
                Some(c) => c.render_manifest(&unit, &inert, &output, &mut result)?,
                None => ManifestFlow::Continue,
            };

            // Side-loaded copy of an inert entry (placeholder strategy).
            if let (ManifestFlow::Continue, Some(c), Some(entry_name)) = (flow, &comp, &data.inert) {
                if let Some((filename, bytes)) = c.passthrough_asset(entry_name, &resource, &code) {
                    state.claims.claim(&filename, entry_name)?;
                    let linked = c.link(&filename, &bytes, &refs, |r| {
                        links.get(r.request()).cloned()
                    });
                    state.assets.emit(filename, linked);
                }
            }

            match (flow, &comp) {
                (ManifestFlow::Stop, Some(c)) => {
                    for rendered in result {
                        state.claims.claim(&rendered.filename, name)?;
                        let linked = c.link(&rendered.filename, &rendered.content, &refs, |r| {
                            links.get(r.request()).cloned()
                        });
                        state.assets.emit(rendered.filename, linked);
                    }
                }
                _ => {
                    let filename = render_path(
                        &output.filename,
                        &PathData::named(name)
                            .with_id(&unit_id)
                            .with_content(&code),
                    );
                    let mut module_code = vec![(module_id.clone(), code.to_vec())];
                    for extra in unit.modules.iter().skip(1) {
                        let extra_code = self
                            .files
                            .get(Path::new(extra))
                            .map(|c| c.to_vec())
                            .unwrap_or_default();
                        module_code.push((extra.to_string(), extra_code));
                    }
                    state.assets.emit(filename, contribute(bootstrap(&module_id, &module_code)));
                }
            }
        }

        if let Some(c) = &comp {
            c.after_emit(&mut state.assets);
        }

        Ok(MemoryBuild {
            assets: state.assets,
            participated: state.participated,
        })
    }

    fn read(&self, path: &Path) -> Result<Arc<[u8]>, MemoryError> {
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| MemoryError::NotFound(path.to_path_buf()))
    }

    /// Build a referenced file and return its emitted filename.
    fn build_sibling(
        &self,
        plugin: &InertEntryPlugin,
        path: &Path,
        state: &mut BuildState,
    ) -> Result<String, MemoryError> {
        if let Some(filename) = state.siblings.get(path) {
            return Ok(filename.clone());
        }

        let source = self.read(path)?;
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("sibling");
        let ext = path.extension().and_then(|e| e.to_str());
        let data = PathData::named(stem).with_ext(ext).with_content(&source);

        let is_script = ext.is_some_and(|e| SCRIPT_EXTENSIONS.contains(&e));
        let owner = path.to_string_lossy();
        let filename = if is_script {
            let filename = render_path(&self.script_filename, &data);
            state.claims.claim(&filename, &owner)?;
            let info = CompilationInfo::child(format!("spawn:{stem}"));
            let child = plugin.compilation(&state.entries, &info, &self.context)?;
            if child.is_some() {
                state.participated.push(info);
            }
            let content = self.build_child(child.as_ref(), path, &source, &filename)?;
            state.assets.emit(filename.clone(), content);
            filename
        } else {
            let filename = render_path(&self.asset_filename, &data);
            state.claims.claim(&filename, &owner)?;
            state.assets.emit(filename.clone(), Arc::clone(&source));
            filename
        };

        state.siblings.insert(path.to_path_buf(), filename.clone());
        Ok(filename)
    }

    /// Child compilation for a single script.
    fn build_child(
        &self,
        child: Option<&InertCompilation>,
        path: &Path,
        source: &Arc<[u8]>,
        filename: &str,
    ) -> Result<Vec<u8>, MemoryError> {
        let module_id = path.to_string_lossy().into_owned();
        let mut data = ResolveData::new(module_id.clone(), path.to_path_buf());
        if let Some(c) = child {
            c.after_resolve(&mut data);
        }
        let code = build_module(&data, source)?;

        if let (Some(c), Some(entry_name)) = (child, &data.inert) {
            let mut inert = FxHashMap::default();
            inert.insert(
                module_id.clone(),
                InertModule {
                    entry_name: entry_name.clone(),
                    resource: path.to_path_buf(),
                    content: Arc::clone(&code),
                },
            );
            let unit = UnitView {
                id: filename,
                modules: vec![module_id.as_str()],
                entry_module: Some(module_id.as_str()),
                filename_template: Some(filename),
            };
            let mut result = Vec::new();
            let output = OutputOptions::new(filename);
            if c.render_manifest(&unit, &inert, &output, &mut result)? == ManifestFlow::Stop {
                return Ok(result
                    .into_iter()
                    .flat_map(|rendered| rendered.content.to_vec())
                    .collect());
            }
        }

        Ok(contribute(bootstrap(
            &module_id,
            &[(module_id.clone(), code.to_vec())],
        )))
    }
}

/// Parse then generate with the resolution's parser and generator, or the
/// host defaults (identity) when none were installed.
fn build_module(data: &ResolveData, source: &Arc<[u8]>) -> Result<Arc<[u8]>, MemoryError> {
    match (&data.parser, &data.generator) {
        (Some(parser), Some(generator)) => {
            let mut info = BuildInfo::new();
            parser.parse(source, &mut info)?;
            Ok(generator.generate(&data.resource, &info)?)
        }
        _ => Ok(Arc::clone(source)),
    }
}

fn bootstrap(entry_id: &str, modules: &[(String, Vec<u8>)]) -> Vec<u8> {
    let mut out = String::new();
    out.push_str("(function(modules) {\n");
    out.push_str("  function __host_require__(moduleId) {\n");
    out.push_str("    var module = { exports: {} };\n");
    out.push_str("    modules[moduleId](module, module.exports, __host_require__);\n");
    out.push_str("    return module.exports;\n");
    out.push_str("  }\n");
    out.push_str(&format!("  return __host_require__({entry_id:?});\n"));
    out.push_str("})({\n");
    for (id, code) in modules {
        out.push_str(&format!(
            "{id:?}: (function(module, exports, __host_require__) {{\n{}\n}}),\n",
            String::from_utf8_lossy(code)
        ));
    }
    out.push_str("})");
    out.into_bytes()
}

/// What a later renderer adds to every unit it still gets to see.
fn contribute(mut rendered: Vec<u8>) -> Vec<u8> {
    rendered.extend_from_slice(b";\n");
    rendered
}
