//! Unit render override.

use crate::error::{InertError, Result};
use crate::host::{InertModule, InertModules, ManifestEntry, ManifestFlow, OutputOptions, UnitView};
use crate::template::{render_path, substitute_entry_name, PathData};
use tracing::debug;

/// Prefix of the manifest identifier for units rendered by this crate.
pub const MANIFEST_IDENTIFIER_PREFIX: &str = "inert-entry-plugin";

/// The inert module a unit renders, if its entry module is inert.
///
/// An inert unit must contain only its entry module; anything else is a
/// configuration error and fails the build, whichever strategy names the
/// output.
pub fn inert_unit(unit: &UnitView<'_>, modules: &dyn InertModules) -> Result<Option<InertModule>> {
    let Some(entry_id) = unit.entry_module else {
        return Ok(None);
    };
    let Some(module) = modules.inert_module(entry_id) else {
        return Ok(None);
    };

    if unit.modules.len() != 1 || unit.modules[0] != entry_id {
        return Err(InertError::UnitCardinality {
            unit: unit.id.to_string(),
            entry: module.entry_name,
            modules: unit.modules.iter().map(|m| m.to_string()).collect(),
        });
    }
    Ok(Some(module))
}

/// Render an inert unit as its entry module's generated bytes.
///
/// Units whose entry module is not inert are left to the host
/// ([`ManifestFlow::Continue`]). See [`inert_unit`] for the unit check.
pub fn render_manifest(
    unit: &UnitView<'_>,
    modules: &dyn InertModules,
    output: &OutputOptions,
    result: &mut Vec<ManifestEntry>,
) -> Result<ManifestFlow> {
    let Some(module) = inert_unit(unit, modules)? else {
        return Ok(ManifestFlow::Continue);
    };

    let template = unit.filename_template.unwrap_or(&output.filename);
    let template = substitute_entry_name(template, &module.entry_name);
    let ext = module.resource.extension().and_then(|e| e.to_str());
    let data = PathData::named(&module.entry_name)
        .with_ext(ext)
        .with_id(unit.id)
        .with_content(&module.content);
    let filename = render_path(&template, &data);

    debug!(
        unit = unit.id,
        entry = %module.entry_name,
        filename = %filename,
        "rendering inert unit"
    );

    result.push(ManifestEntry {
        identifier: format!("{MANIFEST_IDENTIFIER_PREFIX}.{}", unit.id),
        filename,
        content: module.content,
    });
    Ok(ManifestFlow::Stop)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::InertModule;
    use rustc_hash::FxHashMap;
    use std::path::PathBuf;
    use std::sync::Arc;

    fn inert_modules() -> FxHashMap<String, InertModule> {
        let mut map = FxHashMap::default();
        map.insert(
            "/p/index.html".to_string(),
            InertModule {
                entry_name: "one".to_string(),
                resource: PathBuf::from("/p/index.html"),
                content: Arc::from(&b"<html></html>\n"[..]),
            },
        );
        map
    }

    #[test]
    fn test_non_inert_unit_continues() {
        let unit = UnitView {
            id: "0",
            modules: vec!["/p/app.js"],
            entry_module: Some("/p/app.js"),
            filename_template: None,
        };
        let mut result = Vec::new();
        let flow = render_manifest(
            &unit,
            &inert_modules(),
            &OutputOptions::new("[name].js"),
            &mut result,
        )
        .unwrap();
        assert_eq!(flow, ManifestFlow::Continue);
        assert!(result.is_empty());
    }

    #[test]
    fn test_inert_unit_rendered_verbatim() {
        let unit = UnitView {
            id: "3",
            modules: vec!["/p/index.html"],
            entry_module: Some("/p/index.html"),
            filename_template: None,
        };
        let mut result = Vec::new();
        let flow = render_manifest(
            &unit,
            &inert_modules(),
            &OutputOptions::new("[chunkname]-dist.html"),
            &mut result,
        )
        .unwrap();
        assert_eq!(flow, ManifestFlow::Stop);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].filename, "one-dist.html");
        assert_eq!(result[0].identifier, "inert-entry-plugin.3");
        assert_eq!(&result[0].content[..], b"<html></html>\n");
    }

    #[test]
    fn test_unit_template_wins_over_output() {
        let unit = UnitView {
            id: "1",
            modules: vec!["/p/index.html"],
            entry_module: Some("/p/index.html"),
            filename_template: Some("pages/[name][extname]"),
        };
        let mut result = Vec::new();
        render_manifest(
            &unit,
            &inert_modules(),
            &OutputOptions::new("[name].js"),
            &mut result,
        )
        .unwrap();
        assert_eq!(result[0].filename, "pages/one.html");
    }

    #[test]
    fn test_extra_module_is_fatal() {
        let unit = UnitView {
            id: "2",
            modules: vec!["/p/index.html", "/p/runtime.js"],
            entry_module: Some("/p/index.html"),
            filename_template: None,
        };
        let mut result = Vec::new();
        let err = render_manifest(
            &unit,
            &inert_modules(),
            &OutputOptions::new("[name]"),
            &mut result,
        )
        .unwrap_err();
        assert!(matches!(err, InertError::UnitCardinality { ref modules, .. } if modules.len() == 2));
        assert!(err.to_string().contains("exactly 1 module"));
        assert!(result.is_empty());
    }

    #[test]
    fn test_inert_unit_checks_module_order() {
        let unit = UnitView {
            id: "4",
            modules: vec!["/p/runtime.js"],
            entry_module: Some("/p/index.html"),
            filename_template: None,
        };
        let err = inert_unit(&unit, &inert_modules()).unwrap_err();
        assert!(matches!(err, InertError::UnitCardinality { ref entry, .. } if entry == "one"));

        let unit = UnitView {
            modules: vec!["/p/index.html"],
            ..unit
        };
        let module = inert_unit(&unit, &inert_modules()).unwrap().unwrap();
        assert_eq!(module.entry_name, "one");
    }
}
