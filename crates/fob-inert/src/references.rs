//! Sibling references inside inert sources.
//!
//! Inert files are emitted verbatim, so the files they point at (scripts,
//! images, stylesheets) would otherwise keep their source-tree names. The
//! scanner finds configured `tag:attribute` pairs in HTML-like text, the host
//! builds each referenced file through its normal pipeline, and [`rewrite`]
//! swaps the written specifiers for the emitted filenames.
//!
//! NOTE: regex based; markup inside comments or `<script>` bodies is scanned
//! like any other text.

use crate::error::{InertError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::ops::Range;
use tracing::trace;

/// Attributes scanned when none are configured.
pub const DEFAULT_ATTRIBUTES: &[&str] = &["img:src"];

static TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<([A-Za-z][A-Za-z0-9:-]*)(\s[^>]*)?>").expect("tag pattern is valid"));

static ATTR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"([^\s"'=<>/]+)\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'=<>`]+))"#)
        .expect("attribute pattern is valid")
});

/// One `tag:attribute` pair to scan for. An empty or `*` tag matches any tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeSpec {
    pub tag: Option<String>,
    pub attribute: String,
}

impl AttributeSpec {
    /// Parse `tag:attr`, `:attr` or `*:attr`.
    pub fn parse(spec: &str) -> Result<Self> {
        let (tag, attribute) = spec
            .split_once(':')
            .ok_or_else(|| InertError::InvalidAttribute(spec.to_string()))?;
        let attribute = attribute.trim();
        if attribute.is_empty() || attribute.contains(char::is_whitespace) {
            return Err(InertError::InvalidAttribute(spec.to_string()));
        }
        let tag = match tag.trim() {
            "" | "*" => None,
            t => Some(t.to_ascii_lowercase()),
        };
        Ok(Self {
            tag,
            attribute: attribute.to_ascii_lowercase(),
        })
    }

    fn matches(&self, tag: &str, attribute: &str) -> bool {
        self.tag.as_deref().is_none_or(|t| t.eq_ignore_ascii_case(tag))
            && self.attribute.eq_ignore_ascii_case(attribute)
    }
}

impl fmt::Display for AttributeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.tag.as_deref().unwrap_or("*"), self.attribute)
    }
}

/// A reference found in an inert source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub tag: String,
    pub attribute: String,
    /// Attribute value as written.
    pub specifier: String,
    /// Byte range of the value, quotes excluded.
    pub span: Range<usize>,
}

impl Reference {
    /// Specifier without its query string or fragment.
    pub fn request(&self) -> &str {
        let end = self.specifier.find(['?', '#']).unwrap_or(self.specifier.len());
        &self.specifier[..end]
    }
}

/// Finds references for a fixed set of attributes.
#[derive(Debug, Clone)]
pub struct ReferenceScanner {
    specs: Vec<AttributeSpec>,
}

impl ReferenceScanner {
    pub fn new<S: AsRef<str>>(attrs: &[S]) -> Result<Self> {
        let specs = attrs
            .iter()
            .map(|a| AttributeSpec::parse(a.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { specs })
    }

    pub fn specs(&self) -> &[AttributeSpec] {
        &self.specs
    }

    /// Scan `source`. Non-UTF-8 input has no references.
    pub fn scan(&self, source: &[u8]) -> Vec<Reference> {
        let Ok(text) = std::str::from_utf8(source) else {
            return Vec::new();
        };
        if self.specs.is_empty() {
            return Vec::new();
        }

        let mut refs = Vec::new();
        for tag_caps in TAG_RE.captures_iter(text) {
            let tag = &tag_caps[1];
            let Some(attrs) = tag_caps.get(2) else {
                continue;
            };
            for attr_caps in ATTR_RE.captures_iter(attrs.as_str()) {
                let attribute = &attr_caps[1];
                if !self.specs.iter().any(|s| s.matches(tag, attribute)) {
                    continue;
                }
                let Some(value) = attr_caps
                    .get(2)
                    .or_else(|| attr_caps.get(3))
                    .or_else(|| attr_caps.get(4))
                else {
                    continue;
                };
                let specifier = value.as_str();
                if !is_request(specifier) {
                    trace!(tag, attribute, specifier, "skipping non-request reference");
                    continue;
                }
                let start = attrs.start() + value.start();
                refs.push(Reference {
                    tag: tag.to_ascii_lowercase(),
                    attribute: attribute.to_ascii_lowercase(),
                    specifier: specifier.to_string(),
                    span: start..start + value.len(),
                });
            }
        }
        refs
    }
}

impl Default for ReferenceScanner {
    fn default() -> Self {
        Self {
            specs: DEFAULT_ATTRIBUTES
                .iter()
                .filter_map(|a| AttributeSpec::parse(a).ok())
                .collect(),
        }
    }
}

/// Whether an attribute value names a file the build should process.
pub fn is_request(specifier: &str) -> bool {
    let s = specifier.trim();
    if s.is_empty() || s.starts_with('#') || s.starts_with("//") {
        return false;
    }
    if s.contains("{{") || s.contains("${") || s.contains("<%") {
        return false;
    }
    let lower = s.to_ascii_lowercase();
    !["http:", "https:", "data:", "mailto:", "tel:", "javascript:", "blob:"]
        .iter()
        .any(|scheme| lower.starts_with(scheme))
}

/// Replace each reference span with the value `lookup` returns for it.
///
/// References without a replacement keep their original text.
pub fn rewrite(
    source: &[u8],
    refs: &[Reference],
    mut lookup: impl FnMut(&Reference) -> Option<String>,
) -> Vec<u8> {
    let mut ordered: Vec<&Reference> = refs.iter().collect();
    ordered.sort_by_key(|r| r.span.start);

    let mut out = Vec::with_capacity(source.len());
    let mut cursor = 0;
    for r in ordered {
        if r.span.start < cursor || r.span.end > source.len() {
            continue;
        }
        let Some(replacement) = lookup(r) else {
            continue;
        };
        out.extend_from_slice(&source[cursor..r.span.start]);
        out.extend_from_slice(replacement.as_bytes());
        cursor = r.span.end;
    }
    out.extend_from_slice(&source[cursor..]);
    out
}

/// Relative URL from one emitted file to another (both `/`-separated and
/// relative to the output directory).
pub fn relative_url(from_file: &str, to_file: &str) -> String {
    let from_dir: Vec<&str> = {
        let mut parts: Vec<&str> = from_file.split('/').filter(|p| !p.is_empty()).collect();
        parts.pop();
        parts
    };
    let to: Vec<&str> = to_file.split('/').filter(|p| !p.is_empty()).collect();

    let common = from_dir
        .iter()
        .zip(to.iter())
        .take_while(|(a, b)| a == b)
        .count()
        .min(to.len().saturating_sub(1));

    let mut parts: Vec<&str> = vec![".."; from_dir.len() - common];
    parts.extend_from_slice(&to[common..]);
    parts.join("/")
}

/// URL written into an inert file for an emitted sibling.
pub fn reference_url(from_file: &str, to_file: &str, public_path: Option<&str>) -> String {
    match public_path {
        Some(prefix) => format!("{prefix}{to_file}"),
        None => relative_url(from_file, to_file),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const PAGE: &str = r##"<!doctype html>
<html>
  <head><script src="./app.js"></script></head>
  <body>
    <img src="hi.jpg"/>
    <img alt='x' src='./img/logo.png?v=2'>
    <img src=https://example.com/a.png>
    <a href="#top">top</a>
  </body>
</html>
"##;

    #[test]
    fn test_default_scans_img_src_only() {
        let refs = ReferenceScanner::default().scan(PAGE.as_bytes());
        let specs: Vec<_> = refs.iter().map(|r| r.specifier.as_str()).collect();
        assert_eq!(specs, vec!["hi.jpg", "./img/logo.png?v=2"]);
        assert_eq!(refs[1].request(), "./img/logo.png");
        assert_eq!(&PAGE[refs[0].span.clone()], "hi.jpg");
    }

    #[test]
    fn test_configured_attributes() {
        let scanner = ReferenceScanner::new(&["script:src", "img:src", "a:href"]).unwrap();
        let refs = scanner.scan(PAGE.as_bytes());
        assert_eq!(refs.len(), 3);
        assert_eq!(refs[0].tag, "script");
        assert_eq!(refs[0].specifier, "./app.js");
    }

    #[test]
    fn test_invalid_attribute_spec() {
        assert!(matches!(
            ReferenceScanner::new(&["img"]),
            Err(InertError::InvalidAttribute(_))
        ));
        assert!(AttributeSpec::parse("img:").is_err());
        assert_eq!(AttributeSpec::parse(":data-src").unwrap().tag, None);
    }

    #[test]
    fn test_non_requests() {
        for s in ["", "#x", "//cdn/a.js", "data:image/png;base64,AA", "HTTPS://x", "{{ url }}"] {
            assert!(!is_request(s), "{s}");
        }
        assert!(is_request("./a.png"));
        assert!(is_request("/abs/a.png"));
    }

    #[test]
    fn test_rewrite_spans() {
        let scanner = ReferenceScanner::new(&["script:src", "img:src"]).unwrap();
        let refs = scanner.scan(PAGE.as_bytes());
        let out = rewrite(PAGE.as_bytes(), &refs, |r| match r.request() {
            "./app.js" => Some("app-dist.js".to_string()),
            "hi.jpg" => Some("hi-dist.jpg".to_string()),
            _ => None,
        });
        let out = String::from_utf8(out).unwrap();
        assert!(out.contains(r#"<script src="app-dist.js">"#));
        assert!(out.contains(r#"<img src="hi-dist.jpg"/>"#));
        assert!(out.contains("./img/logo.png?v=2"));
    }

    #[test]
    fn test_relative_url() {
        assert_eq!(relative_url("index.html", "app-dist.js"), "app-dist.js");
        assert_eq!(relative_url("pages/a.html", "assets/x.png"), "../assets/x.png");
        assert_eq!(relative_url("pages/a.html", "pages/x.png"), "x.png");
        assert_eq!(relative_url("a.html", "assets/x.png"), "assets/x.png");
        assert_eq!(reference_url("a.html", "x.png", Some("/static/")), "/static/x.png");
    }

    #[test]
    fn test_binary_input_has_no_references() {
        let bytes = [0xff, 0xfe, b'<', b'i', b'm', b'g'];
        assert!(ReferenceScanner::default().scan(&bytes).is_empty());
    }

    proptest! {
        #[test]
        fn test_rewrite_without_replacements_is_identity(body in "[ -~\n]{0,200}") {
            let scanner = ReferenceScanner::new(&["img:src", "script:src"]).unwrap();
            let refs = scanner.scan(body.as_bytes());
            prop_assert_eq!(rewrite(body.as_bytes(), &refs, |_| None), body.as_bytes().to_vec());
        }

        #[test]
        fn test_spans_point_at_specifiers(name in "[a-z]{1,10}", ext in "(png|jpg|svg)") {
            let html = format!("<p><img class=\"c\" src=\"./{name}.{ext}\"></p>");
            let refs = ReferenceScanner::default().scan(html.as_bytes());
            prop_assert_eq!(refs.len(), 1);
            prop_assert_eq!(&html[refs[0].span.clone()], refs[0].specifier.as_str());
        }
    }
}
