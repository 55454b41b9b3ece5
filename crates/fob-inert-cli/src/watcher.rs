//! Debounced file watching for `fob-inert build --watch`.
//!
//! Watches the project root recursively and forwards relevant changes over a
//! channel. Output directories, `node_modules` and hidden paths are ignored
//! so writing a build never triggers the next one. The ignore list is shared
//! with the running watcher, so an output directory picked up from an edited
//! config file is ignored from then on.

use crate::error::{CliError, Result};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(100);

const ALWAYS_IGNORED: &[&str] = &["node_modules"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileChange {
    Modified(PathBuf),
    Created(PathBuf),
    Removed(PathBuf),
}

impl FileChange {
    pub fn path(&self) -> &Path {
        match self {
            FileChange::Modified(p) | FileChange::Created(p) | FileChange::Removed(p) => p,
        }
    }
}

/// Which paths under the root are worth a rebuild.
///
/// Clones share one ignore list.
#[derive(Debug, Clone)]
pub struct WatchFilter {
    root: PathBuf,
    ignored: Arc<RwLock<Vec<PathBuf>>>,
}

impl WatchFilter {
    /// `ignored` paths may be absolute or relative to `root`.
    pub fn new(root: impl Into<PathBuf>, ignored: impl IntoIterator<Item = PathBuf>) -> Self {
        let filter = Self {
            root: root.into(),
            ignored: Arc::default(),
        };
        for path in ignored {
            filter.ignore(path);
        }
        filter
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Ignore `path` (absolute or relative to the root) from now on.
    pub fn ignore(&self, path: impl Into<PathBuf>) {
        let path = path.into();
        let path = if path.is_absolute() {
            path
        } else {
            self.root.join(path)
        };
        let mut ignored = self.ignored.write();
        if !ignored.contains(&path) {
            ignored.push(path);
        }
    }

    pub fn should_ignore(&self, path: &Path) -> bool {
        let Ok(relative) = path.strip_prefix(&self.root) else {
            return true;
        };
        if self.ignored.read().iter().any(|ignored| path.starts_with(ignored)) {
            return true;
        }
        relative.components().any(|component| {
            let name = component.as_os_str().to_string_lossy();
            (name.starts_with('.') && name != "." && name != "..")
                || ALWAYS_IGNORED.contains(&name.as_ref())
        })
    }
}

/// Owns the notify watcher; dropping it stops the stream.
pub struct FileWatcher {
    _watcher: RecommendedWatcher,
    filter: WatchFilter,
}

impl FileWatcher {
    /// Start watching. Repeated events for one path inside `debounce` are
    /// collapsed.
    pub fn new(
        filter: WatchFilter,
        debounce: Duration,
    ) -> Result<(Self, mpsc::Receiver<FileChange>)> {
        if !filter.root().exists() {
            return Err(CliError::FileNotFound(filter.root().to_path_buf()));
        }

        let (tx, rx) = mpsc::channel(100);
        let callback_filter = filter.clone();
        let mut last_event: Option<(PathBuf, Instant)> = None;

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let Ok(event) = res else {
                return;
            };
            for path in &event.paths {
                if callback_filter.should_ignore(path) {
                    continue;
                }

                let now = Instant::now();
                if let Some((last_path, last_time)) = &last_event {
                    if last_path == path && now.duration_since(*last_time) < debounce {
                        continue;
                    }
                }
                last_event = Some((path.clone(), now));

                let change = match event.kind {
                    EventKind::Create(_) => FileChange::Created(path.clone()),
                    EventKind::Modify(_) => FileChange::Modified(path.clone()),
                    EventKind::Remove(_) => FileChange::Removed(path.clone()),
                    _ => continue,
                };
                // Receiver gone means the watch loop is shutting down.
                let _ = tx.blocking_send(change);
            }
        })?;

        watcher.watch(filter.root(), RecursiveMode::Recursive)?;

        Ok((
            Self {
                _watcher: watcher,
                filter,
            },
            rx,
        ))
    }

    pub fn root(&self) -> &Path {
        self.filter.root()
    }

    /// The filter the running watcher consults.
    pub fn filter(&self) -> &WatchFilter {
        &self.filter
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter() -> WatchFilter {
        WatchFilter::new("/project", [PathBuf::from("dist")])
    }

    #[test]
    fn test_sources_are_watched() {
        assert!(!filter().should_ignore(Path::new("/project/src/index.html")));
    }

    #[test]
    fn test_output_dir_is_ignored() {
        assert!(filter().should_ignore(Path::new("/project/dist/index.html")));
    }

    #[test]
    fn test_node_modules_and_hidden_are_ignored() {
        let filter = filter();
        assert!(filter.should_ignore(Path::new("/project/node_modules/x/index.js")));
        assert!(filter.should_ignore(Path::new("/project/.git/HEAD")));
        assert!(filter.should_ignore(Path::new("/project/src/.index.html.swp")));
    }

    #[test]
    fn test_outside_root_is_ignored() {
        assert!(filter().should_ignore(Path::new("/elsewhere/index.html")));
    }

    #[test]
    fn test_absolute_ignores_are_kept() {
        let filter = WatchFilter::new("/project", [PathBuf::from("/project/public")]);
        assert!(filter.should_ignore(Path::new("/project/public/a.html")));
    }

    #[test]
    fn test_ignores_added_later_reach_clones() {
        let filter = filter();
        let running = filter.clone();
        assert!(!running.should_ignore(Path::new("/project/public/a.html")));

        filter.ignore("public");
        filter.ignore("public");
        assert!(running.should_ignore(Path::new("/project/public/a.html")));
        assert!(running.should_ignore(Path::new("/project/dist/a.html")));
        assert_eq!(running.ignored.read().len(), 2);
    }

    #[test]
    fn test_change_exposes_path() {
        let change = FileChange::Removed(PathBuf::from("/project/a.html"));
        assert_eq!(change.path(), Path::new("/project/a.html"));
    }
}
