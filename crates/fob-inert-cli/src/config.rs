//! Layered configuration for `fob-inert build`.
//!
//! Priority: CLI > `FOB_INERT_*` environment > config file > defaults.
//!
//! ```json
//! {
//!   "entry": { "one": "./src/one.html", "two": "./src/two.html" },
//!   "outDir": "dist",
//!   "filename": "[chunkname].html",
//!   "attrs": ["img:src", "link:href", "script:src"]
//! }
//! ```
//!
//! Entries given on the command line replace the file's entries outright
//! rather than merging with them.

use crate::cli::{parse_entries, BuildArgs};
use crate::error::{ConfigError, Result};
use figment::{
    providers::{Env, Format as _, Json, Serialized, Toml},
    Figment,
};
use fob_inert::{EntryConfig, EntryValue, InertOptions};
use fob_plugin_inert::DEFAULT_ASSET_FILENAME;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Config files looked up in the project root, in order.
pub const CONFIG_FILES: &[&str] = &["inert.config.json", "inert.config.toml"];

pub const ENV_PREFIX: &str = "FOB_INERT_";

const ENV_KEYS: &[&str] = &[
    "entry",
    "out_dir",
    "filename",
    "asset_filename",
    "attrs",
    "public_path",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct InertConfig {
    /// A request, or a table of `name = request` pairs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry: Option<EntryValue>,

    #[serde(default = "default_out_dir")]
    pub out_dir: PathBuf,

    /// Template for inert output. Unset means `[name][extname]`, so entry
    /// `main` from `index.html` is written as `main.html`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,

    #[serde(default = "default_asset_filename")]
    pub asset_filename: String,

    #[serde(default = "default_attrs")]
    pub attrs: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_path: Option<String>,
}

fn default_out_dir() -> PathBuf {
    PathBuf::from("dist")
}

fn default_asset_filename() -> String {
    DEFAULT_ASSET_FILENAME.to_string()
}

fn default_attrs() -> Vec<String> {
    InertOptions::default().attrs
}

impl Default for InertConfig {
    fn default() -> Self {
        Self {
            entry: None,
            out_dir: default_out_dir(),
            filename: None,
            asset_filename: default_asset_filename(),
            attrs: default_attrs(),
            public_path: None,
        }
    }
}

/// Values the user actually passed on the command line.
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
struct CliOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    out_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    filename: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    asset_filename: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    attrs: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    public_path: Option<String>,
}

impl From<&BuildArgs> for CliOverrides {
    fn from(args: &BuildArgs) -> Self {
        Self {
            out_dir: args.out_dir.clone(),
            filename: args.filename.clone(),
            asset_filename: args.asset_filename.clone(),
            attrs: (!args.attrs.is_empty()).then(|| args.attrs.clone()),
            public_path: args.public_path.clone(),
        }
    }
}

/// `OUT_DIR` -> `outDir`, matching the file's key style.
fn env_key_to_field(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for (i, part) in key.split('_').filter(|p| !p.is_empty()).enumerate() {
        let lower = part.to_ascii_lowercase();
        if i == 0 {
            out.push_str(&lower);
        } else {
            let mut chars = lower.chars();
            if let Some(first) = chars.next() {
                out.push(first.to_ascii_uppercase());
                out.push_str(chars.as_str());
            }
        }
    }
    out
}

fn env_provider() -> Env {
    Env::prefixed(ENV_PREFIX)
        .only(ENV_KEYS)
        .map(|key| env_key_to_field(key.as_str()).into())
        .lowercase(false)
}

impl InertConfig {
    /// Load configuration for a build rooted at `root`.
    pub fn load(args: &BuildArgs, root: &Path) -> Result<Self> {
        let mut figment = Figment::new().merge(Serialized::defaults(Self::default()));

        if let Some(path) = Self::config_file(args.config.as_deref(), root)? {
            tracing::debug!(path = %path.display(), "loading config file");
            figment = match path.extension().and_then(|ext| ext.to_str()) {
                Some("json") => figment.merge(Json::file(&path)),
                Some("toml") => figment.merge(Toml::file(&path)),
                _ => return Err(ConfigError::UnsupportedFormat(path).into()),
            };
        }

        figment = figment
            .merge(env_provider())
            .merge(Serialized::defaults(CliOverrides::from(args)));

        let mut config: Self = figment.extract().map_err(ConfigError::from)?;
        if let Some(entry) = parse_entries(&args.entry)? {
            config.entry = Some(entry);
        }
        Ok(config)
    }

    /// The explicit `--config` path, or the first default file present in
    /// `root`.
    pub fn config_file(explicit: Option<&Path>, root: &Path) -> Result<Option<PathBuf>> {
        if let Some(path) = explicit {
            if !path.is_file() {
                return Err(ConfigError::NotFound(path.to_path_buf()).into());
            }
            return Ok(Some(path.to_path_buf()));
        }
        Ok(CONFIG_FILES
            .iter()
            .map(|name| root.join(name))
            .find(|path| path.is_file()))
    }

    pub fn validate(&self) -> Result<()> {
        if self.entry.is_none() {
            return Err(ConfigError::MissingField {
                field: "entry".to_string(),
                hint: "Pass an entry (`fob-inert build src/index.html`) or set `entry` in inert.config.json"
                    .to_string(),
            }
            .into());
        }
        if self.out_dir.as_os_str().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "outDir".to_string(),
                value: String::new(),
                hint: "Use a directory such as `dist`".to_string(),
            }
            .into());
        }
        for (field, template) in [
            ("filename", self.filename.as_deref()),
            ("assetFilename", Some(self.asset_filename.as_str())),
        ] {
            match template {
                Some(template) if template.trim().is_empty() => {
                    return Err(ConfigError::InvalidValue {
                        field: field.to_string(),
                        value: template.to_string(),
                        hint: "Templates look like `[name][extname]`".to_string(),
                    }
                    .into());
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Entry configuration for the plugin. Call after [`validate`](Self::validate).
    pub fn entry_config(&self) -> Result<EntryConfig> {
        self.entry
            .clone()
            .map(EntryConfig::from)
            .ok_or_else(|| {
                ConfigError::MissingField {
                    field: "entry".to_string(),
                    hint: "Set `entry` in inert.config.json".to_string(),
                }
                .into()
            })
    }

    pub fn options(&self) -> InertOptions {
        let mut options = InertOptions::new().with_attrs(self.attrs.iter().cloned());
        if let Some(filename) = &self.filename {
            options = options.with_filename(filename.clone());
        }
        if let Some(public_path) = &self.public_path {
            options = options.with_public_path(public_path.clone());
        }
        options
    }

    /// Output directory resolved against the project root.
    pub fn out_dir(&self, root: &Path) -> PathBuf {
        if self.out_dir.is_absolute() {
            self.out_dir.clone()
        } else {
            root.join(&self.out_dir)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;
    use tempfile::TempDir;

    fn args(entries: &[&str]) -> BuildArgs {
        BuildArgs {
            entry: entries.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_env_keys_become_camel_case() {
        assert_eq!(env_key_to_field("OUT_DIR"), "outDir");
        assert_eq!(env_key_to_field("public_path"), "publicPath");
        assert_eq!(env_key_to_field("ENTRY"), "entry");
    }

    #[test]
    #[serial]
    fn test_defaults_apply_without_file() {
        let dir = TempDir::new().unwrap();
        let config = InertConfig::load(&args(&["src/index.html"]), dir.path()).unwrap();
        assert_eq!(config.out_dir, PathBuf::from("dist"));
        assert_eq!(config.attrs, ["img:src"]);
        assert_eq!(config.filename, None);
        assert_eq!(config.entry, Some(EntryValue::Single("src/index.html".into())));
        config.validate().unwrap();
    }

    #[test]
    #[serial]
    fn test_reads_json_file() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("inert.config.json"),
            r#"{
                "entry": { "one": "./one.html", "two": "./two.html" },
                "outDir": "public",
                "filename": "[chunkname].html",
                "attrs": ["img:src", "link:href"],
                "publicPath": "/static/"
            }"#,
        )
        .unwrap();

        let config = InertConfig::load(&args(&[]), dir.path()).unwrap();
        assert_eq!(config.out_dir, PathBuf::from("public"));
        assert_eq!(config.filename.as_deref(), Some("[chunkname].html"));
        assert_eq!(config.public_path.as_deref(), Some("/static/"));
        let Some(EntryValue::Named(entries)) = config.entry else {
            panic!("expected named entries");
        };
        assert_eq!(entries.len(), 2);
    }

    #[test]
    #[serial]
    fn test_reads_toml_file() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("inert.config.toml"),
            "entry = \"./index.html\"\nassetFilename = \"[name].[ext]\"\n",
        )
        .unwrap();

        let config = InertConfig::load(&args(&[]), dir.path()).unwrap();
        assert_eq!(config.asset_filename, "[name].[ext]");
        assert_eq!(config.entry, Some(EntryValue::Single("./index.html".into())));
    }

    #[test]
    #[serial]
    fn test_cli_entries_replace_file_entries() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("inert.config.json"),
            r#"{ "entry": { "one": "./one.html" }, "outDir": "public" }"#,
        )
        .unwrap();

        let mut build = args(&["two=./two.html"]);
        build.out_dir = Some(PathBuf::from("out"));
        let config = InertConfig::load(&build, dir.path()).unwrap();

        assert_eq!(config.out_dir, PathBuf::from("out"));
        let Some(EntryValue::Named(entries)) = config.entry else {
            panic!("expected named entries");
        };
        assert_eq!(entries.keys().collect::<Vec<_>>(), ["two"]);
    }

    #[test]
    #[serial]
    fn test_env_overrides_file() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("inert.config.json"),
            r#"{ "entry": "./index.html", "outDir": "public" }"#,
        )
        .unwrap();

        unsafe {
            std::env::set_var("FOB_INERT_OUT_DIR", "from-env");
        }
        let config = InertConfig::load(&args(&[]), dir.path());
        unsafe {
            std::env::remove_var("FOB_INERT_OUT_DIR");
        }

        assert_eq!(config.unwrap().out_dir, PathBuf::from("from-env"));
    }

    #[test]
    #[serial]
    fn test_missing_explicit_config_is_an_error() {
        let dir = TempDir::new().unwrap();
        let mut build = args(&[]);
        build.config = Some(dir.path().join("nope.json"));
        let err = InertConfig::load(&build, dir.path()).unwrap_err();
        assert!(err.to_string().contains("Config file not found"));
    }

    #[test]
    #[serial]
    fn test_unknown_fields_are_rejected() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("inert.config.json"), r#"{ "entyr": "x" }"#).unwrap();
        assert!(InertConfig::load(&args(&[]), dir.path()).is_err());
    }

    #[test]
    #[serial]
    fn test_host_only_keys_are_rejected() {
        let dir = TempDir::new().unwrap();
        for body in [
            r#"{ "entry": "./index.html", "includeChildren": true }"#,
            r#"{ "entry": "./index.html", "strategy": "placeholder" }"#,
        ] {
            fs::write(dir.path().join("inert.config.json"), body).unwrap();
            let err = InertConfig::load(&args(&[]), dir.path()).unwrap_err();
            assert!(err.to_string().contains("unknown field"), "{err}");
        }
    }

    #[test]
    fn test_validate_requires_entry() {
        let err = InertConfig::default().validate().unwrap_err();
        assert!(err.to_string().contains("entry"));
    }

    #[test]
    fn test_options_carry_every_field() {
        let config = InertConfig {
            filename: Some("[chunkname].html".into()),
            public_path: Some("/static/".into()),
            attrs: vec!["link:href".into()],
            ..Default::default()
        };
        let options = config.options();
        assert_eq!(options.filename.as_deref(), Some("[chunkname].html"));
        assert_eq!(options.public_path.as_deref(), Some("/static/"));
        assert!(!options.include_children);
        assert_eq!(options.strategy, fob_inert::Strategy::Override);
        assert_eq!(options.attrs, ["link:href"]);
    }
}
