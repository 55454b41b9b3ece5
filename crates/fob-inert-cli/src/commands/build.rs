//! `fob-inert build`.
//!
//! 1. Resolve the project root (`--cwd` or the current directory)
//! 2. Load and validate configuration
//! 3. Run the Rolldown build with the inert plugin installed
//! 4. Write output files
//!
//! With `--watch`, steps 2-4 repeat on every change. Configuration and entries
//! are re-read each time so an entry function or an edited config file takes
//! effect on the next rebuild. Each rebuild's output directory joins the
//! watcher's ignore list, and files the previous pass wrote but the new one
//! did not are deleted.

use crate::cli::BuildArgs;
use crate::config::InertConfig;
use crate::error::{CliError, Result};
use crate::ui;
use crate::watcher::{FileWatcher, WatchFilter, DEFAULT_DEBOUNCE};
use crate::writer::{remove_stale, write_bundle, WrittenFile};
use fob_plugin_inert::{InertBuild, OutputKind};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::debug;

pub async fn execute(args: BuildArgs) -> Result<()> {
    let root = project_root(args.cwd.as_deref())?;
    let config = InertConfig::load(&args, &root)?;
    config.validate()?;

    if args.watch {
        return watch(&args, config, &root).await;
    }

    build(&config, &root).await?;
    Ok(())
}

/// Canonical project root. Watch events carry canonical paths, so the root
/// must match them.
pub fn project_root(cwd: Option<&Path>) -> Result<PathBuf> {
    let root = match cwd {
        Some(dir) => dir.to_path_buf(),
        None => std::env::current_dir()?,
    };
    if !root.is_dir() {
        return Err(CliError::FileNotFound(root));
    }
    Ok(root.canonicalize()?)
}

/// One build: evaluate entries, bundle, write.
pub async fn build(config: &InertConfig, root: &Path) -> Result<Vec<WrittenFile>> {
    let start = Instant::now();
    let out_dir = config.out_dir(root);

    let bundle = InertBuild::new(config.entry_config()?)
        .cwd(root)
        .options(config.options())
        .asset_filename(config.asset_filename.clone())
        .run()
        .await?;
    debug!(files = bundle.len(), "build finished");

    let written = write_bundle(&bundle, &out_dir)?;
    print_summary(&written);
    ui::success(&format!(
        "Built {} file(s) to {} in {}",
        written.len(),
        out_dir.display(),
        ui::format_duration(start.elapsed())
    ));
    Ok(written)
}

fn print_summary(written: &[WrittenFile]) {
    for file in written {
        let kind = match file.kind {
            OutputKind::Chunk => "chunk",
            OutputKind::Asset => "asset",
        };
        ui::info(&format!(
            "{:<40} {:>10}  {}",
            file.filename,
            ui::format_size(file.size),
            kind
        ));
    }
}

async fn watch(args: &BuildArgs, config: InertConfig, root: &Path) -> Result<()> {
    let filter = WatchFilter::new(root, [config.out_dir(root)]);

    // A failed first build still leaves the watcher running.
    let mut previous = match build(&config, root).await {
        Ok(written) => written,
        Err(err) => {
            ui::error(&err.to_string());
            Vec::new()
        }
    };

    let (watcher, mut changes) = FileWatcher::new(filter, DEFAULT_DEBOUNCE)?;
    ui::info(&format!(
        "Watching {} for changes (Ctrl+C to stop)",
        watcher.root().display()
    ));

    loop {
        tokio::select! {
            change = changes.recv() => {
                let Some(change) = change else {
                    break;
                };
                // Let editors finish multi-step saves before rebuilding.
                tokio::time::sleep(DEFAULT_DEBOUNCE).await;
                let mut skipped = 0usize;
                while changes.try_recv().is_ok() {
                    skipped += 1;
                }
                debug!(path = %change.path().display(), skipped, "change detected");
                ui::info(&format!("Change in {}, rebuilding", change.path().display()));

                match rebuild(args, root, watcher.filter()).await {
                    Ok(written) => {
                        if let Err(err) = remove_stale(&previous, &written) {
                            ui::warning(&format!("Could not remove stale output: {err}"));
                        }
                        previous = written;
                    }
                    Err(err) => ui::error(&err.to_string()),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                ui::info("Stopping watch");
                break;
            }
        }
    }
    Ok(())
}

/// Reload configuration and build. The output directory is ignored before
/// anything is written to it.
async fn rebuild(args: &BuildArgs, root: &Path, filter: &WatchFilter) -> Result<Vec<WrittenFile>> {
    let config = InertConfig::load(args, root)?;
    config.validate()?;
    filter.ignore(config.out_dir(root));
    build(&config, root).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    #[test]
    fn test_project_root_must_exist() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing");
        assert!(matches!(
            project_root(Some(&missing)),
            Err(CliError::FileNotFound(_))
        ));
    }

    #[tokio::test]
    #[serial]
    async fn test_rebuild_ignores_new_out_dir() {
        let dir = TempDir::new().unwrap();
        let root = project_root(Some(dir.path())).unwrap();
        std::fs::write(root.join("index.html"), "<p>hi</p>").unwrap();
        let filter = WatchFilter::new(&root, [PathBuf::from("dist")]);

        let args = BuildArgs {
            entry: vec!["./index.html".to_string()],
            out_dir: Some(PathBuf::from("public")),
            ..Default::default()
        };
        let written = rebuild(&args, &root, &filter).await.unwrap();

        assert!(root.join("public/main.html").is_file());
        assert_eq!(written.len(), 1);
        assert!(filter.should_ignore(&root.join("public/main.html")));
        assert!(filter.should_ignore(&root.join("dist/main.html")));
        assert!(!filter.should_ignore(&root.join("index.html")));
    }

    #[test]
    fn test_project_root_is_canonical() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a");
        std::fs::create_dir(&nested).unwrap();
        let root = project_root(Some(&nested.join("..").join("a"))).unwrap();
        assert_eq!(root, nested.canonicalize().unwrap());
    }
}
