//! Entry classification.
//!
//! Every resolution the host performs is offered to the [`Classifier`]. A raw
//! request is inert when, after normalization, it equals one of the configured
//! entry requests (or matches an entry pattern). Everything else falls through
//! to the host's default behavior.

use crate::entry::{EntryMap, EntryRequest};
use crate::error::{InertError, Result};
use path_clean::PathClean;
use regex::Regex;
use rustc_hash::FxHashMap;
use std::path::{Path, PathBuf};

/// Puts entry values and raw requests on the same footing before comparison.
///
/// Relative requests are joined onto the context directory, then both forms
/// are lexically cleaned (`a/./b/../c` → `a/c`).
#[derive(Debug, Clone)]
pub struct RequestNormalizer {
    context: PathBuf,
}

impl RequestNormalizer {
    pub fn new(context: impl Into<PathBuf>) -> Self {
        Self {
            context: context.into(),
        }
    }

    pub fn context(&self) -> &Path {
        &self.context
    }

    pub fn normalize(&self, request: &str) -> PathBuf {
        let path = Path::new(request);
        if path.is_absolute() {
            path.to_path_buf().clean()
        } else {
            self.context.join(path).clean()
        }
    }
}

/// Outcome of a successful classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    /// Name of the matched entry.
    pub entry_name: String,
    /// Normalized path of the inert module.
    pub resource: PathBuf,
}

/// Reverse lookup from request to entry name.
#[derive(Debug, Clone)]
pub struct Classifier {
    normalizer: RequestNormalizer,
    exact: FxHashMap<PathBuf, String>,
    patterns: Vec<(String, Regex)>,
}

impl Classifier {
    /// Build a classifier for one build.
    ///
    /// Two names resolving to the same file are rejected: there is no sensible
    /// choice of which name the emitted asset should carry.
    pub fn new(entries: &EntryMap, context: impl Into<PathBuf>) -> Result<Self> {
        let normalizer = RequestNormalizer::new(context);
        let mut exact: FxHashMap<PathBuf, String> = FxHashMap::default();
        let mut patterns = Vec::new();

        for (name, request) in entries.iter() {
            match request {
                EntryRequest::Path(path) => {
                    let resource = normalizer.normalize(path);
                    if let Some(first) = exact.get(&resource) {
                        return Err(InertError::DuplicateRequest {
                            first: first.clone(),
                            second: name.to_string(),
                            request: resource.display().to_string(),
                        });
                    }
                    exact.insert(resource, name.to_string());
                }
                EntryRequest::Pattern(re) => patterns.push((name.to_string(), re.clone())),
            }
        }

        Ok(Self {
            normalizer,
            exact,
            patterns,
        })
    }

    pub fn normalizer(&self) -> &RequestNormalizer {
        &self.normalizer
    }

    /// Classify a raw request. `None` means "not inert, leave it alone".
    pub fn classify(&self, raw_request: &str) -> Option<Classification> {
        let resource = self.normalizer.normalize(raw_request);

        if let Some(name) = self.exact.get(&resource) {
            tracing::debug!(entry = %name, resource = %resource.display(), "classified inert entry");
            return Some(Classification {
                entry_name: name.clone(),
                resource,
            });
        }

        let resource_str = resource.to_string_lossy();
        for (name, re) in &self.patterns {
            if re.is_match(raw_request) || re.is_match(&resource_str) {
                tracing::debug!(entry = %name, request = raw_request, "pattern matched inert entry");
                return Some(Classification {
                    entry_name: name.clone(),
                    resource,
                });
            }
        }

        tracing::trace!(request = raw_request, "not an inert entry");
        None
    }

    /// Whether the classifier can ever match anything.
    pub fn is_empty(&self) -> bool {
        self.exact.is_empty() && self.patterns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier(pairs: &[(&str, &str)]) -> Classifier {
        let mut entries = EntryMap::new();
        for (name, request) in pairs {
            entries.insert(*name, *request).unwrap();
        }
        Classifier::new(&entries, "/project").unwrap()
    }

    #[test]
    fn test_relative_and_absolute_forms_match() {
        let c = classifier(&[("one", "./src/one.html")]);

        let relative = c.classify("src/one.html").unwrap();
        let absolute = c.classify("/project/src/one.html").unwrap();
        let dotted = c.classify("/project/src/../src/./one.html").unwrap();

        assert_eq!(relative.entry_name, "one");
        assert_eq!(relative, absolute);
        assert_eq!(absolute, dotted);
        assert_eq!(relative.resource, PathBuf::from("/project/src/one.html"));
    }

    #[test]
    fn test_non_entry_falls_through() {
        let c = classifier(&[("one", "src/one.html")]);
        assert!(c.classify("src/app.js").is_none());
        assert!(c.classify("src/one.html.js").is_none());
    }

    #[test]
    fn test_multiple_entries_resolve_independently() {
        let c = classifier(&[("one", "src/main.html"), ("two", "src/other.html")]);
        assert_eq!(c.classify("src/main.html").unwrap().entry_name, "one");
        assert_eq!(c.classify("src/other.html").unwrap().entry_name, "two");
    }

    #[test]
    fn test_duplicate_requests_rejected() {
        let entries = EntryMap::new()
            .with_entry("one", "src/a.html")
            .unwrap()
            .with_entry("two", "./src/a.html")
            .unwrap();
        let err = Classifier::new(&entries, "/project").unwrap_err();
        assert!(matches!(
            err,
            InertError::DuplicateRequest { ref first, ref second, .. } if first == "one" && second == "two"
        ));
    }

    #[test]
    fn test_exact_entries_win_over_patterns() {
        let mut entries = EntryMap::new();
        entries.insert_pattern("pages", r"\.html$").unwrap();
        entries.insert("index", "src/index.html").unwrap();
        let c = Classifier::new(&entries, "/project").unwrap();

        assert_eq!(c.classify("src/index.html").unwrap().entry_name, "index");
        assert_eq!(c.classify("src/about.html").unwrap().entry_name, "pages");
        assert!(c.classify("src/about.js").is_none());
    }

    #[test]
    fn test_empty_classifier() {
        let c = Classifier::new(&EntryMap::new(), "/project").unwrap();
        assert!(c.is_empty());
        assert!(c.classify("anything").is_none());
    }
}
