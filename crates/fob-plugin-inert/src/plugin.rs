//! Rolldown binding for inert entries.
//!
//! ```text
//! build_start      fresh per-build state
//! resolve_id       entry specifiers → normalized absolute ids
//! load             raw bytes captured; script siblings become `import()`s in a
//!                  stub module, other siblings are emitted as assets
//! generate_bundle  entry chunk replaced by the raw bytes, references rewritten
//! ```
//!
//! Rolldown only ever sees the stub, so the entry's chunk holds a single
//! module and its siblings land in chunks and assets of their own. Rolldown
//! may still place its runtime helpers in the entry chunk and have sibling
//! chunks import them from there; such a chunk is kept under its own name and
//! the inert output is added next to it.

use crate::error::Result;
use anyhow::Context;
use fob_inert::{
    render_path, BuildInfo, CompilationInfo, EntryMap, InertCompilation, InertEntryPlugin,
    InertModule, InertOptions, ManifestFlow, OutputClaims, OutputOptions, PathData, Reference,
    RequestNormalizer, ResolveData, UnitView, DEFAULT_INERT_FILENAME,
};
use parking_lot::RwLock;
use rolldown_common::{EmittedAsset, LogWithoutPlugin, ModuleType, Output, OutputAsset};
use rolldown_plugin::{
    HookBuildStartArgs, HookGenerateBundleArgs, HookLoadArgs, HookLoadOutput, HookLoadReturn,
    HookNoopReturn, HookResolveIdArgs, HookResolveIdOutput, HookResolveIdReturn, HookUsage,
    Plugin, PluginContext,
};
use rustc_hash::{FxHashMap, FxHashSet};
use std::borrow::Cow;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Template for non-script siblings.
pub const DEFAULT_ASSET_FILENAME: &str = "[name]-[hash][extname]";

const SCRIPT_EXTENSIONS: &[&str] = &["js", "mjs", "cjs", "jsx", "ts", "tsx", "mts", "cts"];

/// Ids of modules Rolldown injects on its own.
const RUNTIME_MODULE_PREFIX: &str = "rolldown:";

#[derive(Debug, Clone)]
enum LinkTarget {
    /// Facade module id of the sibling's chunk.
    Chunk(String),
    /// Final asset filename.
    Asset(String),
}

#[derive(Debug, Clone)]
struct LoadedEntry {
    module: InertModule,
    refs: Vec<Reference>,
    links: FxHashMap<String, LinkTarget>,
}

#[derive(Debug, Default)]
struct BuildState {
    compilation: Option<Arc<InertCompilation>>,
    loaded: FxHashMap<String, LoadedEntry>,
    emitted: FxHashSet<String>,
}

/// Rolldown plugin emitting the configured entries verbatim.
#[derive(Debug, Clone)]
pub struct InertRolldownPlugin {
    adapter: InertEntryPlugin,
    entries: Arc<EntryMap>,
    cwd: PathBuf,
    asset_filename: String,
    entry_filenames: String,
    state: Arc<RwLock<BuildState>>,
}

impl InertRolldownPlugin {
    pub fn new(entries: EntryMap, options: InertOptions, cwd: impl Into<PathBuf>) -> Result<Self> {
        let plugin = Self {
            adapter: InertEntryPlugin::new(options)?,
            entries: Arc::new(entries),
            cwd: cwd.into(),
            asset_filename: DEFAULT_ASSET_FILENAME.to_string(),
            entry_filenames: DEFAULT_INERT_FILENAME.to_string(),
            state: Arc::new(RwLock::new(BuildState::default())),
        };
        plugin.reset()?;
        Ok(plugin)
    }

    /// Filename template for emitted sibling assets.
    pub fn with_asset_filename(mut self, template: impl Into<String>) -> Self {
        self.asset_filename = template.into();
        self
    }

    /// Filename template of inert entry units. The `filename` option, when
    /// set, takes precedence.
    pub fn with_entry_filenames(mut self, template: impl Into<String>) -> Self {
        self.entry_filenames = template.into();
        self
    }

    pub fn entries(&self) -> &EntryMap {
        &self.entries
    }

    /// Drop everything captured by the previous build.
    fn reset(&self) -> Result<()> {
        let compilation = self
            .adapter
            .compilation(&self.entries, &CompilationInfo::root(), &self.cwd)?
            .map(Arc::new);
        *self.state.write() = BuildState {
            compilation,
            ..Default::default()
        };
        Ok(())
    }

    /// Hand the entry template to the compilation so the placeholder strategy
    /// remembers it. Runs from `build_start`, after every builder method.
    fn prepare_output(&self) {
        if let Some(compilation) = &self.state.read().compilation {
            compilation.prepare_output(&mut OutputOptions::new(self.entry_filenames.clone()));
        }
    }
}

impl Plugin for InertRolldownPlugin {
    fn name(&self) -> Cow<'static, str> {
        "fob-inert-entry".into()
    }

    fn register_hook_usage(&self) -> HookUsage {
        HookUsage::BuildStart | HookUsage::ResolveId | HookUsage::Load | HookUsage::GenerateBundle
    }

    fn build_start(
        &self,
        _ctx: &PluginContext,
        _args: &HookBuildStartArgs<'_>,
    ) -> impl std::future::Future<Output = HookNoopReturn> + Send {
        let result = self.reset().map(|()| self.prepare_output());
        async move {
            result?;
            debug!("inert entry state reset");
            Ok(())
        }
    }

    /// Entry specifiers resolve to the same normalized path the classifier
    /// compares against, so `load` sees a stable id.
    fn resolve_id(
        &self,
        _ctx: &PluginContext,
        args: &HookResolveIdArgs,
    ) -> impl std::future::Future<Output = HookResolveIdReturn> + Send {
        let specifier = args.specifier.to_string();
        let is_entry = args.importer.is_none();
        let state = Arc::clone(&self.state);

        async move {
            if !is_entry {
                return Ok(None);
            }
            let Some(compilation) = state.read().compilation.clone() else {
                return Ok(None);
            };
            let Some(classification) = compilation.classifier().classify(&specifier) else {
                return Ok(None);
            };

            Ok(Some(HookResolveIdOutput {
                id: classification.resource.to_string_lossy().into_owned().into(),
                ..Default::default()
            }))
        }
    }

    fn load(
        &self,
        ctx: &PluginContext,
        args: &HookLoadArgs<'_>,
    ) -> impl std::future::Future<Output = HookLoadReturn> + Send {
        let id = args.id.to_string();
        let state = Arc::clone(&self.state);
        let asset_filename = self.asset_filename.clone();

        async move {
            let Some(compilation) = state.read().compilation.clone() else {
                return Ok(None);
            };
            let mut data = ResolveData::new(id.clone(), PathBuf::from(&id));
            let Some(classification) = compilation.after_resolve(&mut data) else {
                return Ok(None);
            };
            let (Some(parser), Some(generator)) = (&data.parser, &data.generator) else {
                return Ok(None);
            };

            let resource = classification.resource;
            let source = std::fs::read(&resource)
                .with_context(|| format!("Failed to read inert entry: {}", resource.display()))?;
            let mut build_info = BuildInfo::new();
            parser.parse(&source, &mut build_info)?;
            let content = generator.generate(&resource, &build_info)?;

            let refs = compilation.scan(&source);
            let normalizer =
                RequestNormalizer::new(resource.parent().map(Path::to_path_buf).unwrap_or_default());
            let mut stub = String::new();
            let mut links = FxHashMap::default();

            for reference in &refs {
                let request = reference.request();
                if links.contains_key(request) {
                    continue;
                }
                let path = normalizer.normalize(request);
                if !path.is_file() {
                    ctx.warn(LogWithoutPlugin {
                        message: format!(
                            "Inert entry '{}' references missing file {} ({}:{})",
                            classification.entry_name,
                            path.display(),
                            reference.tag,
                            reference.attribute
                        ),
                        ..Default::default()
                    });
                    continue;
                }

                let target = if is_script(&path) {
                    let specifier = path.to_string_lossy().into_owned();
                    stub.push_str(&format!("import({});\n", serde_json::to_string(&specifier)?));
                    LinkTarget::Chunk(specifier)
                } else {
                    let bytes = std::fs::read(&path)
                        .with_context(|| format!("Failed to read asset: {}", path.display()))?;
                    let filename = asset_name(&asset_filename, &path, &bytes);
                    let first = state.write().emitted.insert(filename.clone());
                    if first {
                        if let Err(e) = ctx.emit_file(
                            EmittedAsset {
                                name: path
                                    .file_name()
                                    .and_then(|n| n.to_str())
                                    .map(|s| s.to_string()),
                                original_file_name: Some(path.to_string_lossy().into_owned()),
                                file_name: Some(filename.clone().into()),
                                source: bytes.into(),
                            },
                            None,
                            None,
                        ) {
                            ctx.warn(LogWithoutPlugin {
                                message: format!("Failed to emit asset {}: {}", path.display(), e),
                                ..Default::default()
                            });
                            state.write().emitted.remove(&filename);
                            continue;
                        }
                    }
                    LinkTarget::Asset(filename)
                };
                links.insert(request.to_string(), target);
            }

            debug!(
                entry = %classification.entry_name,
                references = refs.len(),
                "loaded inert entry"
            );

            state.write().loaded.insert(
                id,
                LoadedEntry {
                    module: InertModule {
                        entry_name: classification.entry_name,
                        resource,
                        content,
                    },
                    refs,
                    links,
                },
            );

            Ok(Some(HookLoadOutput {
                code: stub.into(),
                module_type: Some(ModuleType::Js),
                ..Default::default()
            }))
        }
    }

    fn generate_bundle(
        &self,
        _ctx: &PluginContext,
        args: &mut HookGenerateBundleArgs<'_>,
    ) -> impl std::future::Future<Output = HookNoopReturn> + Send {
        let state = Arc::clone(&self.state);
        let options = self.adapter.options().clone();
        let entry_filenames = self.entry_filenames.clone();

        async move {
            let (compilation, loaded) = {
                let state = state.read();
                (state.compilation.clone(), state.loaded.clone())
            };
            let Some(compilation) = compilation else {
                return Ok(());
            };
            if loaded.is_empty() {
                return Ok(());
            }

            let mut chunk_files: FxHashMap<String, String> = FxHashMap::default();
            let mut imported: FxHashSet<String> = FxHashSet::default();
            for output in args.bundle.iter() {
                if let Output::Chunk(chunk) = output {
                    if let Some(facade) = &chunk.facade_module_id {
                        chunk_files.insert(facade.to_string(), chunk.filename.to_string());
                    }
                    imported.extend(
                        chunk
                            .imports
                            .iter()
                            .chain(chunk.dynamic_imports.iter())
                            .map(|f| f.to_string()),
                    );
                }
            }

            // Files the inert outputs must not collide with: everything except
            // the entry chunks that are about to be replaced.
            let mut claims = OutputClaims::new();
            for output in args.bundle.iter() {
                let filename = match output {
                    Output::Chunk(chunk) => {
                        let replaced = chunk
                            .facade_module_id
                            .as_ref()
                            .is_some_and(|id| loaded.contains_key(&id.to_string()))
                            && !imported.contains(chunk.filename.as_str());
                        if replaced {
                            continue;
                        }
                        chunk.filename.to_string()
                    }
                    Output::Asset(asset) => asset.filename.to_string(),
                };
                claims.claim(&filename, &filename)?;
            }

            let modules: FxHashMap<String, InertModule> = loaded
                .iter()
                .map(|(id, entry)| (id.clone(), entry.module.clone()))
                .collect();
            let output_options = OutputOptions {
                filename: DEFAULT_INERT_FILENAME.to_string(),
                public_path: options.public_path.clone(),
            };

            let mut replacements = Vec::new();
            let mut additions = Vec::new();
            for (index, output) in args.bundle.iter().enumerate() {
                let Output::Chunk(chunk) = output else {
                    continue;
                };
                let Some(facade) = chunk.facade_module_id.as_ref().map(|id| id.to_string()) else {
                    continue;
                };
                let Some(entry) = loaded.get(&facade) else {
                    continue;
                };

                // An empty stub can be rendered without any module at all.
                let mut module_ids: Vec<String> = chunk
                    .modules
                    .keys
                    .iter()
                    .map(|id| id.to_string())
                    .filter(|id| !id.starts_with(RUNTIME_MODULE_PREFIX))
                    .collect();
                if module_ids.is_empty() {
                    module_ids.push(facade.clone());
                }

                let unit_id = chunk.name.to_string();
                let unit = UnitView {
                    id: &unit_id,
                    modules: module_ids.iter().map(String::as_str).collect(),
                    entry_module: Some(facade.as_str()),
                    filename_template: Some(entry_filenames.as_str()),
                };

                let mut rendered = Vec::new();
                let flow =
                    compilation.render_manifest(&unit, &modules, &output_options, &mut rendered)?;
                let (filename, content) = match flow {
                    ManifestFlow::Stop => match rendered.pop() {
                        Some(manifest) => (manifest.filename, manifest.content),
                        None => continue,
                    },
                    ManifestFlow::Continue => match compilation.passthrough_asset(
                        &entry.module.entry_name,
                        &entry.module.resource,
                        &entry.module.content,
                    ) {
                        Some(asset) => asset,
                        None => continue,
                    },
                };
                claims.claim(&filename, &entry.module.entry_name)?;

                let linked = compilation.link(&filename, &content, &entry.refs, |r| {
                    match entry.links.get(r.request())? {
                        LinkTarget::Chunk(id) => chunk_files.get(id).cloned(),
                        LinkTarget::Asset(name) => Some(name.clone()),
                    }
                });

                info!(entry = %entry.module.entry_name, filename = %filename, "emitting inert entry");
                let asset = OutputAsset {
                    names: vec![entry.module.entry_name.clone()],
                    original_file_names: vec![entry.module.resource.to_string_lossy().into_owned()],
                    filename: filename.into(),
                    source: linked.into(),
                };
                if imported.contains(chunk.filename.as_str()) {
                    debug!(
                        entry = %entry.module.entry_name,
                        chunk = %chunk.filename,
                        "entry chunk is imported by other chunks; keeping it"
                    );
                    additions.push(asset);
                } else {
                    replacements.push((index, asset));
                }
            }

            for (index, asset) in replacements {
                args.bundle[index] = Output::Asset(Arc::new(asset));
            }
            args.bundle
                .extend(additions.into_iter().map(|asset| Output::Asset(Arc::new(asset))));
            Ok(())
        }
    }
}

fn is_script(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| SCRIPT_EXTENSIONS.contains(&ext))
}

fn asset_name(template: &str, path: &Path, content: &[u8]) -> String {
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("asset");
    let ext = path.extension().and_then(|e| e.to_str());
    render_path(template, &PathData::named(stem).with_ext(ext).with_content(content))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn plugin_for(dir: &TempDir, attrs: &[&str]) -> InertRolldownPlugin {
        let entries = EntryMap::single("./index.html").unwrap();
        InertRolldownPlugin::new(
            entries,
            InertOptions::new().with_attrs(attrs.iter().copied()),
            dir.path(),
        )
        .unwrap()
    }

    #[test]
    fn test_is_script() {
        assert!(is_script(Path::new("/a/app.js")));
        assert!(is_script(Path::new("/a/app.tsx")));
        assert!(!is_script(Path::new("/a/hi.jpg")));
        assert!(!is_script(Path::new("/a/LICENSE")));
    }

    #[test]
    fn test_asset_name_uses_content_hash() {
        let a = asset_name(DEFAULT_ASSET_FILENAME, Path::new("/a/hi.jpg"), b"one");
        let b = asset_name(DEFAULT_ASSET_FILENAME, Path::new("/a/hi.jpg"), b"two");
        assert!(a.starts_with("hi-") && a.ends_with(".jpg"));
        assert_ne!(a, b);
        assert_eq!(asset_name("[name]-dist.[ext]", Path::new("/a/hi.jpg"), b""), "hi-dist.jpg");
    }

    #[test]
    fn test_invalid_attrs_fail_construction() {
        let dir = TempDir::new().unwrap();
        let entries = EntryMap::single("./index.html").unwrap();
        let result = InertRolldownPlugin::new(
            entries,
            InertOptions::new().with_attrs(["nope"]),
            dir.path(),
        );
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_load_stubs_script_references() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("index.html"),
            "<html><script src=\"./app.js\"></script></html>",
        )
        .unwrap();
        fs::write(dir.path().join("app.js"), "console.log('app')").unwrap();

        let plugin = plugin_for(&dir, &["script:src"]);
        let ctx = PluginContext::new_napi_context();
        let id = dir.path().join("index.html").to_string_lossy().into_owned();

        let output = plugin
            .load(&ctx, &HookLoadArgs { id: &id })
            .await
            .unwrap()
            .unwrap();
        assert!(output.code.starts_with("import("));
        assert!(output.code.contains("app.js"));
        assert!(matches!(output.module_type, Some(ModuleType::Js)));

        let state = plugin.state.read();
        let entry = state.loaded.get(&id).unwrap();
        assert_eq!(entry.module.entry_name, "main");
        assert_eq!(
            &entry.module.content[..],
            b"<html><script src=\"./app.js\"></script></html>"
        );
    }

    #[tokio::test]
    async fn test_load_ignores_other_modules() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("other.js"), "export {}").unwrap();

        let plugin = plugin_for(&dir, &["img:src"]);
        let ctx = PluginContext::new_napi_context();
        let id = dir.path().join("other.js").to_string_lossy().into_owned();

        let output = plugin.load(&ctx, &HookLoadArgs { id: &id }).await.unwrap();
        assert!(output.is_none());
        assert!(plugin.state.read().loaded.is_empty());
    }

    #[tokio::test]
    async fn test_load_without_references_yields_empty_stub() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("index.html"), "<p>plain</p>").unwrap();

        let plugin = plugin_for(&dir, &["img:src"]);
        let ctx = PluginContext::new_napi_context();
        let id = dir.path().join("index.html").to_string_lossy().into_owned();

        let output = plugin
            .load(&ctx, &HookLoadArgs { id: &id })
            .await
            .unwrap()
            .unwrap();
        assert!(output.code.is_empty());
    }
}
