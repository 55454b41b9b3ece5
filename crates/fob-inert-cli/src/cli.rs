//! Command-line interface definition.

use crate::error::{ConfigError, Result};
use clap::{Args, Parser, Subcommand};
use fob_inert::{EntryValue, DEFAULT_ENTRY_NAME};
use indexmap::IndexMap;
use std::path::PathBuf;

/// fob-inert - emit entry files verbatim instead of bundling them
#[derive(Parser, Debug)]
#[command(
    name = "fob-inert",
    version,
    about = "Emit HTML and other non-JS entries verbatim",
    long_about = "fob-inert runs a Rolldown build in which each configured entry file is\n\
                  emitted byte-for-byte under its own name. Assets and scripts the entry\n\
                  references are built alongside it and their URLs are rewritten."
)]
pub struct Cli {
    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build inert entries
    ///
    /// Each entry is emitted verbatim; referenced images, styles and scripts
    /// are emitted next to it.
    Build(BuildArgs),
}

/// Arguments for `fob-inert build`.
#[derive(Args, Debug, Clone, Default)]
pub struct BuildArgs {
    /// Entries to build, as `name=path` or a bare path
    ///
    /// A bare path is named `main`. When omitted, entries come from the
    /// config file.
    ///
    /// Examples:
    ///   fob-inert build src/index.html
    ///   fob-inert build one=src/one.html two=src/two.html
    #[arg(value_name = "ENTRY")]
    pub entry: Vec<String>,

    /// Path to a config file (.json or .toml)
    ///
    /// Defaults to inert.config.json or inert.config.toml in the project root.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Output directory
    #[arg(short = 'd', long, value_name = "DIR")]
    pub out_dir: Option<PathBuf>,

    /// Filename template for inert output, e.g. `[chunkname].html`
    ///
    /// Defaults to `[name][extname]`: entry `main` from `index.html` is
    /// written as `main.html`.
    #[arg(short, long, value_name = "TEMPLATE")]
    pub filename: Option<String>,

    /// Filename template for referenced assets, e.g. `[name]-[hash][extname]`
    #[arg(long, value_name = "TEMPLATE")]
    pub asset_filename: Option<String>,

    /// `tag:attribute` pairs treated as references (repeatable or comma separated)
    #[arg(short, long, value_name = "TAG:ATTR", value_delimiter = ',')]
    pub attrs: Vec<String>,

    /// Prefix for rewritten references instead of relative URLs
    #[arg(long, value_name = "URL")]
    pub public_path: Option<String>,

    /// Project root (defaults to the current directory)
    #[arg(long, value_name = "DIR")]
    pub cwd: Option<PathBuf>,

    /// Rebuild whenever a file under the project root changes
    #[arg(short, long)]
    pub watch: bool,
}

/// Parse positional entries.
///
/// A single bare path becomes a `Single` value (named `main` downstream);
/// anything else becomes a named table. Returns `None` when no entries were
/// given so the config file's entries apply.
pub fn parse_entries(raw: &[String]) -> Result<Option<EntryValue>> {
    match raw {
        [] => Ok(None),
        [only] if !only.contains('=') => Ok(Some(EntryValue::Single(only.clone()))),
        _ => {
            let mut named = IndexMap::new();
            for item in raw {
                let (name, request) = match item.split_once('=') {
                    Some((name, request)) => (name.trim(), request.trim()),
                    None => (DEFAULT_ENTRY_NAME, item.trim()),
                };
                if name.is_empty() || request.is_empty() {
                    return Err(ConfigError::InvalidValue {
                        field: "entry".to_string(),
                        value: item.clone(),
                        hint: "Entries look like `name=path/to/file.html`".to_string(),
                    }
                    .into());
                }
                if named.insert(name.to_string(), request.to_string()).is_some() {
                    return Err(ConfigError::InvalidValue {
                        field: "entry".to_string(),
                        value: item.clone(),
                        hint: format!("Entry name '{name}' is given more than once"),
                    }
                    .into());
                }
            }
            Ok(Some(EntryValue::Named(named)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_no_entries_defer_to_config() {
        assert!(parse_entries(&[]).unwrap().is_none());
    }

    #[test]
    fn test_bare_path_is_single() {
        let value = parse_entries(&strings(&["src/index.html"])).unwrap();
        assert_eq!(value, Some(EntryValue::Single("src/index.html".into())));
    }

    #[test]
    fn test_named_entries_keep_order() {
        let value = parse_entries(&strings(&["two=b.html", "one=a.html"]))
            .unwrap()
            .unwrap();
        let EntryValue::Named(map) = value else {
            panic!("expected named entries");
        };
        assert_eq!(map.keys().collect::<Vec<_>>(), ["two", "one"]);
        assert_eq!(map["one"], "a.html");
    }

    #[test]
    fn test_duplicate_names_are_rejected() {
        assert!(parse_entries(&strings(&["a=x.html", "a=y.html"])).is_err());
        assert!(parse_entries(&strings(&["x.html", "y.html"])).is_err());
    }

    #[test]
    fn test_empty_halves_are_rejected() {
        assert!(parse_entries(&strings(&["=x.html", "b=y.html"])).is_err());
        assert!(parse_entries(&strings(&["a=", "b=y.html"])).is_err());
    }

    #[test]
    fn test_parses_build_flags() {
        let cli = Cli::try_parse_from([
            "fob-inert",
            "build",
            "one=a.html",
            "--attrs",
            "img:src,link:href",
            "--public-path",
            "/static/",
            "-d",
            "out",
        ])
        .unwrap();
        let Command::Build(args) = cli.command;
        assert_eq!(args.attrs, ["img:src", "link:href"]);
        assert_eq!(args.public_path.as_deref(), Some("/static/"));
        assert_eq!(args.out_dir, Some(PathBuf::from("out")));
    }

    #[test]
    fn test_host_only_flags_are_not_accepted() {
        // Rolldown has no child compilations and the override strategy is
        // the only one that changes its output.
        for flag in [&["--include-children"][..], &["--strategy", "placeholder"][..]] {
            let mut argv = vec!["fob-inert", "build", "a.html"];
            argv.extend_from_slice(flag);
            let err = Cli::try_parse_from(argv).unwrap_err();
            assert_eq!(err.kind(), clap::error::ErrorKind::UnknownArgument);
        }
    }

    #[test]
    fn test_verbose_conflicts_with_quiet() {
        assert!(Cli::try_parse_from(["fob-inert", "-v", "-q", "build"]).is_err());
    }
}
