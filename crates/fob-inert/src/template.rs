//! Output filename templates.
//!
//! Two stages, in order: the entry-name token `[chunkname]` is replaced
//! textually, then the host-standard tokens are rendered from [`PathData`].

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

/// Token replaced with the matched entry name.
pub const ENTRY_NAME_TOKEN: &str = "[chunkname]";

/// Template used for inert output when nothing else is configured.
pub const DEFAULT_INERT_FILENAME: &str = "[name][extname]";

const DEFAULT_HASH_LEN: usize = 8;

static TOKEN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[(name|id|ext|extname|hash|contenthash)(?::(\d+))?\]")
        .expect("token pattern is valid")
});

/// Replace every `[chunkname]` in `template` with `entry_name`.
pub fn substitute_entry_name(template: &str, entry_name: &str) -> String {
    template.replace(ENTRY_NAME_TOKEN, entry_name)
}

/// Values available to [`render_path`].
///
/// # Example
///
/// ```
/// use fob_inert::{render_path, PathData};
///
/// let data = PathData::named("one").with_ext(Some("html")).with_id("3");
/// assert_eq!(render_path("[name]-[id][extname]", &data), "one-3.html");
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct PathData<'a> {
    pub name: Option<&'a str>,
    /// Extension without the leading dot.
    pub ext: Option<&'a str>,
    pub id: Option<&'a str>,
    pub content: Option<&'a [u8]>,
}

impl<'a> PathData<'a> {
    /// Data with only `[name]` set.
    pub fn named(name: &'a str) -> Self {
        Self {
            name: Some(name),
            ..Default::default()
        }
    }

    /// Set `[ext]` and `[extname]`. Empty extensions count as none.
    pub fn with_ext(mut self, ext: Option<&'a str>) -> Self {
        self.ext = ext.filter(|e| !e.is_empty());
        self
    }

    /// Set `[id]`.
    pub fn with_id(mut self, id: &'a str) -> Self {
        self.id = Some(id);
        self
    }

    /// Bytes hashed for `[hash]` and `[contenthash]`.
    pub fn with_content(mut self, content: &'a [u8]) -> Self {
        self.content = Some(content);
        self
    }
}

/// Render host-standard tokens.
///
/// Tokens without a value (for example `[hash]` with no content) and unknown
/// tokens are left as written.
pub fn render_path(template: &str, data: &PathData<'_>) -> String {
    TOKEN_RE
        .replace_all(template, |caps: &Captures<'_>| {
            let token = &caps[1];
            let value = match token {
                "name" => data.name.map(str::to_string),
                "id" => data.id.map(str::to_string),
                "ext" => Some(data.ext.unwrap_or_default().to_string()),
                "extname" => Some(data.ext.map(|e| format!(".{e}")).unwrap_or_default()),
                "hash" | "contenthash" => data.content.map(|content| {
                    let len = caps
                        .get(2)
                        .and_then(|m| m.as_str().parse::<usize>().ok())
                        .unwrap_or(DEFAULT_HASH_LEN);
                    content_hash(content, len)
                }),
                _ => None,
            };
            value.unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

/// Hex blake3 digest truncated to `len` characters.
pub fn content_hash(content: &[u8], len: usize) -> String {
    let hex = blake3::hash(content).to_hex();
    let len = len.clamp(1, hex.len());
    hex[..len].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_entry_name_substituted_first() {
        let tpl = substitute_entry_name("[chunkname]-dist.html", "one");
        assert_eq!(tpl, "one-dist.html");
        assert_eq!(render_path(&tpl, &PathData::named("ignored")), "one-dist.html");
    }

    #[test]
    fn test_name_and_ext() {
        let data = PathData::named("index").with_ext(Some("html"));
        assert_eq!(render_path("[name].[ext]", &data), "index.html");
        assert_eq!(render_path(DEFAULT_INERT_FILENAME, &data), "index.html");
        assert_eq!(render_path("[name][extname]", &PathData::named("LICENSE")), "LICENSE");
    }

    #[test]
    fn test_hash_lengths() {
        let data = PathData::named("a").with_content(b"hello");
        let short = render_path("[hash]", &data);
        let long = render_path("[hash:16]", &data);
        assert_eq!(short.len(), 8);
        assert_eq!(long.len(), 16);
        assert!(long.starts_with(&short));
        assert_eq!(render_path("[contenthash:8]", &data), short);
    }

    #[test]
    fn test_missing_values_left_alone() {
        assert_eq!(render_path("[name]-[hash]", &PathData::named("x")), "x-[hash]");
        assert_eq!(render_path("[query][name]", &PathData::named("x")), "[query]x");
        assert_eq!(render_path("[id]", &PathData::default().with_id("7")), "7");
    }

    proptest! {
        #[test]
        fn test_token_free_templates_are_unchanged(tpl in "[a-z0-9_./-]{0,24}") {
            let data = PathData::named("n").with_ext(Some("js")).with_content(b"x");
            prop_assert_eq!(render_path(&tpl, &data), tpl);
        }

        #[test]
        fn test_entry_name_never_survives(prefix in "[a-z]{0,6}", name in "[a-z]{1,8}") {
            let tpl = format!("{prefix}[chunkname]/[chunkname]");
            let out = substitute_entry_name(&tpl, &name);
            prop_assert!(!out.contains(ENTRY_NAME_TOKEN));
            prop_assert_eq!(out, format!("{prefix}{name}/{name}"));
        }
    }
}
