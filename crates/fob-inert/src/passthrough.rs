//! Passthrough parse and generate steps.
//!
//! A host normally parses a module into something that tracks its
//! dependencies and later generates code wrapped in a module factory plus
//! bootstrap runtime. For inert modules both steps are replaced:
//!
//! ```text
//! parse:    raw bytes ──► BuildInfo.source      (no dependencies)
//! generate: BuildInfo.source ──► output bytes   (no prologue, no epilogue, no `;`)
//! ```

use crate::error::{InertError, Result};
use std::fmt::Debug;
use std::path::Path;
use std::sync::Arc;

/// Per-module build metadata owned by the host's module record.
#[derive(Debug, Clone, Default)]
pub struct BuildInfo {
    source: Option<Arc<[u8]>>,
}

impl BuildInfo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Captured source, if the module went through the passthrough parser.
    pub fn source(&self) -> Option<&Arc<[u8]>> {
        self.source.as_ref()
    }

    /// Drop anything captured by a previous build.
    pub fn reset(&mut self) {
        self.source = None;
    }

    fn capture(&mut self, source: &[u8]) {
        self.source = Some(Arc::from(source));
    }
}

/// What a parser learned about a module.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseOutcome {
    /// Requests the host should resolve and build as dependencies.
    pub dependencies: Vec<String>,
}

/// Substitutable parse step (source → build state).
pub trait ModuleParser: Debug + Send + Sync {
    fn parse(&self, source: &[u8], build_info: &mut BuildInfo) -> Result<ParseOutcome>;
}

/// Substitutable generate step (build state → emitted bytes).
pub trait ModuleGenerator: Debug + Send + Sync {
    fn generate(&self, resource: &Path, build_info: &BuildInfo) -> Result<Arc<[u8]>>;
}

/// Stores the raw bytes unchanged and reports no dependencies.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughParser;

impl ModuleParser for PassthroughParser {
    fn parse(&self, source: &[u8], build_info: &mut BuildInfo) -> Result<ParseOutcome> {
        build_info.capture(source);
        Ok(ParseOutcome::default())
    }
}

/// Returns the captured bytes verbatim.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughGenerator;

impl ModuleGenerator for PassthroughGenerator {
    fn generate(&self, resource: &Path, build_info: &BuildInfo) -> Result<Arc<[u8]>> {
        build_info
            .source()
            .cloned()
            .ok_or_else(|| InertError::MissingSource(resource.to_path_buf()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_captures_without_dependencies() {
        let mut info = BuildInfo::new();
        let src = b"<!DOCTYPE html>\n<script src=\"app.js\"></script>\n";

        let outcome = PassthroughParser.parse(src, &mut info).unwrap();

        assert!(outcome.dependencies.is_empty());
        assert_eq!(info.source().map(|s| &s[..]), Some(&src[..]));
    }

    #[test]
    fn test_generate_is_byte_identical() {
        let mut info = BuildInfo::new();
        let src = [0xffu8, 0x00, b'a', b'\n'];
        PassthroughParser.parse(&src, &mut info).unwrap();

        let out = PassthroughGenerator
            .generate(Path::new("blob.bin"), &info)
            .unwrap();
        assert_eq!(&out[..], &src[..]);
    }

    #[test]
    fn test_generate_before_parse_fails() {
        let err = PassthroughGenerator
            .generate(Path::new("src/one.html"), &BuildInfo::new())
            .unwrap_err();
        assert!(matches!(err, InertError::MissingSource(_)));
    }

    #[test]
    fn test_rebuild_overwrites_capture() {
        let mut info = BuildInfo::new();
        PassthroughParser.parse(b"first", &mut info).unwrap();
        info.reset();
        assert!(info.source().is_none());
        PassthroughParser.parse(b"second", &mut info).unwrap();
        assert_eq!(info.source().map(|s| &s[..]), Some(&b"second"[..]));
    }
}
