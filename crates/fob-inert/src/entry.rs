//! Entry mapping: which requests are inert, and under which names.
//!
//! Entries arrive in one of three shapes, the same ones a bundler accepts for
//! its `entry` option:
//!
//! ```text
//! "src/index.html"                          → { main: "src/index.html" }
//! { one: "src/one.html", two: "src/two.html" }
//! || { ... }                                → evaluated once per build
//! ```
//!
//! [`EntryConfig::resolve`] turns any of them into an [`EntryMap`], which stays
//! immutable for the rest of the build.

use crate::error::{InertError, Result};
use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Name given to an entry supplied as a bare request.
pub const DEFAULT_ENTRY_NAME: &str = "main";

/// What an entry name points at.
#[derive(Debug, Clone)]
pub enum EntryRequest {
    /// An exact import request, compared after normalization.
    Path(String),
    /// A matcher tested against raw requests. Cannot seed a build on its own.
    Pattern(Regex),
}

impl EntryRequest {
    /// The request path, if this entry names a concrete file.
    pub fn as_path(&self) -> Option<&str> {
        match self {
            EntryRequest::Path(path) => Some(path),
            EntryRequest::Pattern(_) => None,
        }
    }
}

impl fmt::Display for EntryRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryRequest::Path(path) => f.write_str(path),
            EntryRequest::Pattern(re) => write!(f, "/{}/", re.as_str()),
        }
    }
}

/// Immutable mapping from entry name to request, in declaration order.
///
/// # Example
///
/// ```
/// use fob_inert::EntryMap;
///
/// let entries = EntryMap::new()
///     .with_entry("one", "./src/one.html")?
///     .with_entry("two", "./src/two.html")?;
///
/// assert_eq!(entries.len(), 2);
/// assert_eq!(entries.get("two").and_then(|r| r.as_path()), Some("./src/two.html"));
/// # Ok::<(), fob_inert::InertError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct EntryMap {
    entries: IndexMap<String, EntryRequest>,
}

impl EntryMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// One-entry map under [`DEFAULT_ENTRY_NAME`].
    pub fn single(request: impl Into<String>) -> Result<Self> {
        let mut map = Self::new();
        map.insert(DEFAULT_ENTRY_NAME, request)?;
        Ok(map)
    }

    /// Add an exact-request entry.
    pub fn insert(&mut self, name: impl Into<String>, request: impl Into<String>) -> Result<()> {
        let name = name.into();
        let request = request.into();
        if request.trim().is_empty() {
            return Err(InertError::invalid_entry(name, "request is empty"));
        }
        self.insert_request(name, EntryRequest::Path(request))
    }

    /// Add an entry that matches raw requests against a regular expression.
    pub fn insert_pattern(&mut self, name: impl Into<String>, pattern: &str) -> Result<()> {
        let name = name.into();
        let re = Regex::new(pattern).map_err(|source| InertError::InvalidPattern {
            name: name.clone(),
            source,
        })?;
        self.insert_request(name, EntryRequest::Pattern(re))
    }

    /// Builder form of [`EntryMap::insert`].
    pub fn with_entry(
        mut self,
        name: impl Into<String>,
        request: impl Into<String>,
    ) -> Result<Self> {
        self.insert(name, request)?;
        Ok(self)
    }

    fn insert_request(&mut self, name: String, request: EntryRequest) -> Result<()> {
        if name.trim().is_empty() {
            return Err(InertError::invalid_entry(name, "entry name is empty"));
        }
        if self.entries.contains_key(&name) {
            return Err(InertError::invalid_entry(name, "entry is defined twice"));
        }
        self.entries.insert(name, request);
        Ok(())
    }

    /// The request configured for `name`.
    pub fn get(&self, name: &str) -> Option<&EntryRequest> {
        self.entries.get(name)
    }

    /// Every entry, paths and patterns alike, in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &EntryRequest)> {
        self.entries.iter().map(|(name, req)| (name.as_str(), req))
    }

    /// Entries that name a concrete file, as `(name, request)`.
    ///
    /// These are the entries a host builds; pattern entries only classify.
    ///
    /// ```
    /// use fob_inert::EntryMap;
    ///
    /// let mut entries = EntryMap::single("./index.html")?;
    /// entries.insert_pattern("pages", r"\.html$")?;
    ///
    /// assert_eq!(entries.paths().collect::<Vec<_>>(), [("main", "./index.html")]);
    /// # Ok::<(), fob_inert::InertError>(())
    /// ```
    pub fn paths(&self) -> impl Iterator<Item = (&str, &str)> {
        self.iter()
            .filter_map(|(name, req)| req.as_path().map(|path| (name, path)))
    }

    /// Number of entries, patterns included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Static entry value, as written in configuration files.
///
/// Deserializes from either a string or a table of `name = request` pairs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntryValue {
    Single(String),
    Named(IndexMap<String, String>),
}

impl EntryValue {
    /// Build a named value from `(name, request)` pairs.
    pub fn named<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self::Named(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    pub fn into_map(self) -> Result<EntryMap> {
        match self {
            EntryValue::Single(request) => EntryMap::single(request),
            EntryValue::Named(pairs) => {
                if pairs.is_empty() {
                    return Err(InertError::invalid_entry("<entry>", "no entries declared"));
                }
                let mut map = EntryMap::new();
                for (name, request) in pairs {
                    map.insert(name, request)?;
                }
                Ok(map)
            }
        }
    }
}

impl From<&str> for EntryValue {
    fn from(request: &str) -> Self {
        Self::Single(request.to_string())
    }
}

impl From<String> for EntryValue {
    fn from(request: String) -> Self {
        Self::Single(request)
    }
}

impl From<IndexMap<String, String>> for EntryValue {
    fn from(pairs: IndexMap<String, String>) -> Self {
        Self::Named(pairs)
    }
}

/// Entry function evaluated at the start of every build.
pub type EntryFn = Arc<dyn Fn() -> EntryValue + Send + Sync>;

/// Entry configuration: a static value or a function producing one.
#[derive(Clone)]
pub enum EntryConfig {
    Value(EntryValue),
    Dynamic(EntryFn),
    /// A mapping built in code; the only form that can carry patterns.
    Map(EntryMap),
}

impl EntryConfig {
    /// Wrap a zero-argument entry function.
    pub fn dynamic<F>(f: F) -> Self
    where
        F: Fn() -> EntryValue + Send + Sync + 'static,
    {
        Self::Dynamic(Arc::new(f))
    }

    /// Evaluate the configuration into an entry map.
    ///
    /// The function form is called exactly once per invocation; hosts call
    /// this once per build.
    pub fn resolve(&self) -> Result<EntryMap> {
        match self {
            EntryConfig::Value(value) => value.clone().into_map(),
            EntryConfig::Dynamic(f) => {
                let value = f();
                tracing::debug!(?value, "evaluated entry function");
                value.into_map()
            }
            EntryConfig::Map(map) => Ok(map.clone()),
        }
    }
}

impl fmt::Debug for EntryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryConfig::Value(value) => f.debug_tuple("Value").field(value).finish(),
            EntryConfig::Dynamic(_) => f.write_str("Dynamic(<fn>)"),
            EntryConfig::Map(map) => f.debug_tuple("Map").field(map).finish(),
        }
    }
}

impl From<EntryValue> for EntryConfig {
    fn from(value: EntryValue) -> Self {
        Self::Value(value)
    }
}

impl From<EntryMap> for EntryConfig {
    fn from(map: EntryMap) -> Self {
        Self::Map(map)
    }
}

impl From<&str> for EntryConfig {
    fn from(request: &str) -> Self {
        Self::Value(request.into())
    }
}

impl From<String> for EntryConfig {
    fn from(request: String) -> Self {
        Self::Value(request.into())
    }
}
