//! Tag definitions and the built-in catalog.
//!
//! A [`TagDefinition`] couples a tag name with its attribute contract and a
//! transform that produces the HTML fragment for one occurrence. The engine
//! hands the transform its already-recursively-expanded inner content, so
//! transforms never re-enter the parser.

use crate::sanitize::{escape_html, sanitize_color, sanitize_identifier, sanitize_url};
use regex::Regex;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};
use thiserror::Error;

/// Names of the built-in tags, in catalog declaration order.
///
/// The order is authoritative: overlapping spans of two different tags are
/// resolved by this order, not by input position.
pub const BUILTIN_TAGS: &[&str] = &[
    "b", "i", "u", "s", "color", "size", "url", "img", "youtube", "code", "pre", "quote",
    "spoiler", "list", "center", "right", "table",
];

/// Error returned by a failing transform.
///
/// The engine degrades a failed transform to literal passthrough of the
/// matched source span; built-in transforms never fail.
#[derive(Error, Debug, Clone)]
#[error("{message}")]
pub struct TransformError {
    message: String,
}

impl TransformError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Attribute values bound for a single tag occurrence.
///
/// The `=value` suffix of an open tag is bound to the first name the tag
/// declares; tags that declare no attributes silently consume the suffix.
#[derive(Debug, Clone, Default)]
pub struct TagAttrs {
    values: HashMap<String, String>,
}

impl TagAttrs {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub(crate) fn insert(&mut self, name: String, value: String) {
        self.values.insert(name, value);
    }
}

/// Transform from (expanded inner content, bound attributes) to HTML.
pub type TagTransform =
    Arc<dyn Fn(&str, &TagAttrs) -> Result<String, TransformError> + Send + Sync>;

/// Immutable descriptor of one tag: name, attribute contract, structural
/// flags, and the HTML transform.
#[derive(Clone)]
pub struct TagDefinition {
    name: String,
    allowed_attributes: Vec<String>,
    self_closing: bool,
    block_level: bool,
    transform: TagTransform,
}

impl TagDefinition {
    pub fn new(name: impl Into<String>, transform: TagTransform) -> Self {
        Self {
            name: name.into(),
            allowed_attributes: Vec::new(),
            self_closing: false,
            block_level: false,
            transform,
        }
    }

    /// Declare an attribute name. The open tag's `=value` is bound to the
    /// first declared name.
    pub fn with_attribute(mut self, name: impl Into<String>) -> Self {
        self.allowed_attributes.push(name.into());
        self
    }

    /// Mark the tag as having no close tag.
    pub fn self_closing(mut self) -> Self {
        self.self_closing = true;
        self
    }

    /// Mark the tag as block structure (a hint for validators/renderers,
    /// matching behavior is unchanged).
    pub fn block_level(mut self) -> Self {
        self.block_level = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn allowed_attributes(&self) -> &[String] {
        &self.allowed_attributes
    }

    pub fn is_self_closing(&self) -> bool {
        self.self_closing
    }

    pub fn is_block_level(&self) -> bool {
        self.block_level
    }

    /// Run the transform for one occurrence.
    pub fn apply(&self, content: &str, attrs: &TagAttrs) -> Result<String, TransformError> {
        (self.transform)(content, attrs)
    }

    /// The matcher pattern for this tag. Paired tags match
    /// `[name]…[/name]` and `[name=value]…[/name]` non-greedily, case
    /// insensitively, with `.` crossing line-break markers; self-closing
    /// tags match the open token alone.
    pub(crate) fn pattern(&self) -> String {
        let name = regex::escape(&self.name);
        if self.self_closing {
            format!(r"(?i)\[{}(?:=([^\]]*))?\]", name)
        } else {
            format!(r"(?is)\[{}(?:=([^\]]*))?\](.*?)\[/{}\]", name, name)
        }
    }
}

impl fmt::Debug for TagDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TagDefinition")
            .field("name", &self.name)
            .field("allowed_attributes", &self.allowed_attributes)
            .field("self_closing", &self.self_closing)
            .field("block_level", &self.block_level)
            .finish()
    }
}

// ─── Built-in catalog ────────────────────────────────────────────────────────

/// Build the built-in catalog in declaration order.
///
/// `url_whitelist` is captured by the url/img transforms; an empty list
/// means any http(s) host is acceptable.
pub fn builtin_catalog(url_whitelist: &[String]) -> Vec<TagDefinition> {
    vec![
        wrap_tag("b", "<strong>", "</strong>"),
        wrap_tag("i", "<em>", "</em>"),
        wrap_tag("u", "<u>", "</u>"),
        wrap_tag("s", "<del>", "</del>"),
        color_tag(),
        size_tag(),
        url_tag(url_whitelist.to_vec()),
        img_tag(url_whitelist.to_vec()),
        youtube_tag(),
        code_tag(),
        pre_tag(),
        quote_tag(),
        spoiler_tag(),
        list_tag(),
        wrap_tag("center", "<div style=\"text-align:center\">", "</div>").block_level(),
        wrap_tag("right", "<div style=\"text-align:right\">", "</div>").block_level(),
        table_tag(),
    ]
}

fn wrap_tag(name: &str, open: &'static str, close: &'static str) -> TagDefinition {
    TagDefinition::new(
        name,
        Arc::new(move |content, _| Ok(format!("{}{}{}", open, content, close))),
    )
}

fn color_tag() -> TagDefinition {
    TagDefinition::new(
        "color",
        Arc::new(|content, attrs| {
            let color = sanitize_color(attrs.get("color").unwrap_or(""));
            Ok(format!(
                "<span style=\"color:{}\">{}</span>",
                color, content
            ))
        }),
    )
    .with_attribute("color")
}

fn size_tag() -> TagDefinition {
    TagDefinition::new(
        "size",
        Arc::new(|content, attrs| {
            match attrs.get("size").and_then(|v| v.trim().parse::<i64>().ok()) {
                Some(level) => {
                    let px = 8 + 2 * level.clamp(1, 7);
                    Ok(format!("<span style=\"font-size:{}px\">{}</span>", px, content))
                }
                // unusable size: emit the content unwrapped
                None => Ok(content.to_string()),
            }
        }),
    )
    .with_attribute("size")
}

fn url_tag(whitelist: Vec<String>) -> TagDefinition {
    TagDefinition::new(
        "url",
        Arc::new(move |content, attrs| {
            let target = attrs.get("url").unwrap_or(content);
            let href = sanitize_url(target, &whitelist);
            if href.is_empty() {
                // rejected URL: drop the link, keep the content
                return Ok(content.to_string());
            }
            let label = if content.is_empty() {
                escape_html(&href)
            } else {
                content.to_string()
            };
            Ok(format!(
                "<a href=\"{}\" target=\"_blank\" rel=\"noopener noreferrer\">{}</a>",
                escape_html(&href),
                label
            ))
        }),
    )
    .with_attribute("url")
}

fn img_tag(whitelist: Vec<String>) -> TagDefinition {
    TagDefinition::new(
        "img",
        Arc::new(move |content, _| {
            let src = sanitize_url(content.trim(), &whitelist);
            if src.is_empty() {
                return Ok(String::new());
            }
            Ok(format!(
                "<img src=\"{}\" loading=\"lazy\">",
                escape_html(&src)
            ))
        }),
    )
}

fn youtube_tag() -> TagDefinition {
    TagDefinition::new(
        "youtube",
        Arc::new(|content, _| match extract_youtube_id(content.trim()) {
            Some(id) => Ok(format!(
                "<iframe src=\"https://www.youtube.com/embed/{}\" \
                 frameborder=\"0\" allowfullscreen></iframe>",
                id
            )),
            None => Ok(content.to_string()),
        }),
    )
    .block_level()
}

fn code_tag() -> TagDefinition {
    TagDefinition::new(
        "code",
        Arc::new(|content, attrs| {
            let escaped = escape_html(&restore_line_breaks(content));
            let language = attrs.get("language").map(sanitize_identifier).unwrap_or_default();
            if language.is_empty() {
                Ok(format!("<pre><code>{}</code></pre>", escaped))
            } else {
                Ok(format!(
                    "<pre><code class=\"language-{}\">{}</code></pre>",
                    language, escaped
                ))
            }
        }),
    )
    .with_attribute("language")
    .block_level()
}

fn pre_tag() -> TagDefinition {
    TagDefinition::new(
        "pre",
        Arc::new(|content, _| {
            Ok(format!(
                "<pre>{}</pre>",
                escape_html(&restore_line_breaks(content))
            ))
        }),
    )
    .block_level()
}

fn quote_tag() -> TagDefinition {
    TagDefinition::new(
        "quote",
        Arc::new(|content, attrs| match attrs.get("author") {
            Some(author) if !author.is_empty() => Ok(format!(
                "<blockquote><cite>{} wrote:</cite>{}</blockquote>",
                escape_html(author),
                content
            )),
            _ => Ok(format!("<blockquote>{}</blockquote>", content)),
        }),
    )
    .with_attribute("author")
    .block_level()
}

fn spoiler_tag() -> TagDefinition {
    TagDefinition::new(
        "spoiler",
        Arc::new(|content, attrs| {
            let title = match attrs.get("title") {
                Some(title) if !title.is_empty() => escape_html(title),
                _ => "Spoiler".to_string(),
            };
            Ok(format!(
                "<details><summary>{}</summary>{}</details>",
                title, content
            ))
        }),
    )
    .with_attribute("title")
    .block_level()
}

fn list_tag() -> TagDefinition {
    TagDefinition::new(
        "list",
        Arc::new(|content, attrs| {
            let items = format!("<li>{}</li>", content.replace("[*]", "</li><li>"));
            let items = tidy_list_items(&items);
            if attrs.get("type").map(str::trim) == Some("1") {
                Ok(format!("<ol>{}</ol>", items))
            } else {
                Ok(format!("<ul>{}</ul>", items))
            }
        }),
    )
    .with_attribute("type")
    .block_level()
}

fn table_tag() -> TagDefinition {
    TagDefinition::new(
        "table",
        Arc::new(|content, _| Ok(format!("<table>{}</table>", expand_table_markers(content)))),
    )
    .block_level()
}

// ─── Tag-local helpers ───────────────────────────────────────────────────────

/// Undo the line-break conversion that runs before tag parsing, so code
/// blocks keep their verbatim newlines instead of its markers.
fn restore_line_breaks(content: &str) -> String {
    content.replace("</p><p>", "\n\n").replace("<br>", "\n")
}

/// Extract an 11-character video id from the known YouTube URL shapes
/// (`watch?v=`, `youtu.be/`, `/embed/`) or from a bare id.
fn extract_youtube_id(input: &str) -> Option<String> {
    static URL_SHAPES: OnceLock<Regex> = OnceLock::new();
    static BARE_ID: OnceLock<Regex> = OnceLock::new();

    let shapes = URL_SHAPES.get_or_init(|| {
        Regex::new(
            r"(?:youtube\.com/watch\?(?:.*?&)?v=|youtu\.be/|youtube\.com/embed/)([A-Za-z0-9_-]{11})",
        )
        .unwrap()
    });
    if let Some(caps) = shapes.captures(input) {
        return Some(caps[1].to_string());
    }

    let bare = BARE_ID.get_or_init(|| Regex::new(r"^[A-Za-z0-9_-]{11}$").unwrap());
    if bare.is_match(input) {
        Some(input.to_string())
    } else {
        None
    }
}

/// Drop line-break markers hugging item boundaries, then empty items.
/// The leading `<li></li>` produced when a list starts with `[*]` disappears
/// here as well.
fn tidy_list_items(items: &str) -> String {
    static BREAK_BEFORE_CLOSE: OnceLock<Regex> = OnceLock::new();
    static BREAK_AFTER_OPEN: OnceLock<Regex> = OnceLock::new();
    static EMPTY_ITEM: OnceLock<Regex> = OnceLock::new();

    let before_close =
        BREAK_BEFORE_CLOSE.get_or_init(|| Regex::new(r"(?:\s*<br>)+\s*</li>").unwrap());
    let after_open = BREAK_AFTER_OPEN.get_or_init(|| Regex::new(r"<li>\s*(?:<br>\s*)+").unwrap());
    let empty_item = EMPTY_ITEM.get_or_init(|| Regex::new(r"<li>\s*</li>").unwrap());

    let items = before_close.replace_all(items, "</li>");
    let items = after_open.replace_all(&items, "<li>");
    empty_item.replace_all(&items, "").into_owned()
}

/// Rewrite `[tr]`, `[td]`, `[th]` markers (and their closers) to HTML,
/// consuming whitespace and line-break markers around each one.
fn expand_table_markers(content: &str) -> String {
    static TABLE_MARKER: OnceLock<Regex> = OnceLock::new();
    let marker = TABLE_MARKER
        .get_or_init(|| Regex::new(r"(?i)(?:\s|<br>)*\[(/?)(tr|td|th)\](?:\s|<br>)*").unwrap());

    marker
        .replace_all(content, |caps: &regex::Captures| {
            format!("<{}{}>", &caps[1], caps[2].to_lowercase())
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs(pairs: &[(&str, &str)]) -> TagAttrs {
        let mut attrs = TagAttrs::default();
        for (name, value) in pairs {
            attrs.insert(name.to_string(), value.to_string());
        }
        attrs
    }

    fn builtin(name: &str) -> TagDefinition {
        builtin_catalog(&[])
            .into_iter()
            .find(|def| def.name() == name)
            .unwrap()
    }

    #[test]
    fn test_builtin_order_matches_name_table() {
        let names: Vec<String> = builtin_catalog(&[])
            .iter()
            .map(|def| def.name().to_string())
            .collect();
        assert_eq!(names, BUILTIN_TAGS);
    }

    #[test]
    fn extracts_watch_urls() {
        assert_eq!(
            extract_youtube_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ"),
            Some("dQw4w9WgXcQ".to_string())
        );
        assert_eq!(
            extract_youtube_id("https://youtube.com/watch?t=30&v=dQw4w9WgXcQ"),
            Some("dQw4w9WgXcQ".to_string())
        );
    }

    #[test]
    fn extracts_short_and_embed_urls() {
        assert_eq!(
            extract_youtube_id("https://youtu.be/dQw4w9WgXcQ"),
            Some("dQw4w9WgXcQ".to_string())
        );
        assert_eq!(
            extract_youtube_id("https://www.youtube.com/embed/dQw4w9WgXcQ?rel=0"),
            Some("dQw4w9WgXcQ".to_string())
        );
    }

    #[test]
    fn extracts_bare_id_only_when_exact() {
        assert_eq!(
            extract_youtube_id("dQw4w9WgXcQ"),
            Some("dQw4w9WgXcQ".to_string())
        );
        assert_eq!(extract_youtube_id("short"), None);
        assert_eq!(extract_youtube_id("not a video id at all"), None);
    }

    #[test]
    fn test_color_transform() {
        let tag = builtin("color");
        assert_eq!(
            tag.apply("hi", &attrs(&[("color", "#ff0000")])).unwrap(),
            "<span style=\"color:#ff0000\">hi</span>"
        );
        assert_eq!(
            tag.apply("hi", &attrs(&[("color", "url(evil)")])).unwrap(),
            "<span style=\"color:inherit\">hi</span>"
        );
    }

    #[test]
    fn test_size_transform_clamps() {
        let tag = builtin("size");
        assert_eq!(
            tag.apply("x", &attrs(&[("size", "3")])).unwrap(),
            "<span style=\"font-size:14px\">x</span>"
        );
        assert_eq!(
            tag.apply("x", &attrs(&[("size", "99")])).unwrap(),
            "<span style=\"font-size:22px\">x</span>"
        );
        assert_eq!(tag.apply("x", &attrs(&[("size", "huge")])).unwrap(), "x");
        assert_eq!(tag.apply("x", &TagAttrs::default()).unwrap(), "x");
    }

    #[test]
    fn test_url_transform_falls_back_to_content() {
        let tag = builtin("url");
        assert_eq!(
            tag.apply("here", &attrs(&[("url", "javascript:alert(1)")]))
                .unwrap(),
            "here"
        );
        assert_eq!(
            tag.apply("", &attrs(&[("url", "https://x.com")])).unwrap(),
            "<a href=\"https://x.com/\" target=\"_blank\" rel=\"noopener noreferrer\">https://x.com/</a>"
        );
    }

    #[test]
    fn test_img_transform_drops_bad_urls() {
        let tag = builtin("img");
        assert_eq!(tag.apply("javascript:alert(1)", &TagAttrs::default()).unwrap(), "");
        assert_eq!(
            tag.apply("https://example.com/a.png", &TagAttrs::default()).unwrap(),
            "<img src=\"https://example.com/a.png\" loading=\"lazy\">"
        );
    }

    #[test]
    fn test_code_transform_escapes_and_restores_breaks() {
        let tag = builtin("code");
        assert_eq!(
            tag.apply("let x = 1;<br>x < 2", &attrs(&[("language", "rust")]))
                .unwrap(),
            "<pre><code class=\"language-rust\">let x = 1;\nx &lt; 2</code></pre>"
        );
        assert_eq!(
            tag.apply("a", &attrs(&[("language", "+++")])).unwrap(),
            "<pre><code>a</code></pre>"
        );
    }

    #[test]
    fn test_list_transform() {
        let tag = builtin("list");
        assert_eq!(
            tag.apply("<br>[*]one<br>[*]two<br>", &TagAttrs::default()).unwrap(),
            "<ul><li>one</li><li>two</li></ul>"
        );
        assert_eq!(
            tag.apply("[*]one[*]two", &attrs(&[("type", "1")])).unwrap(),
            "<ol><li>one</li><li>two</li></ol>"
        );
    }

    #[test]
    fn test_table_transform() {
        let tag = builtin("table");
        assert_eq!(
            tag.apply("<br>[tr][th]H[/th][/tr]<br>[tr][td]1[/td][/tr]<br>", &TagAttrs::default())
                .unwrap(),
            "<table><tr><th>H</th></tr><tr><td>1</td></tr></table>"
        );
    }

    #[test]
    fn test_quote_and_spoiler_escape_attribute_text() {
        assert_eq!(
            builtin("quote")
                .apply("hi", &attrs(&[("author", "<x>")]))
                .unwrap(),
            "<blockquote><cite>&lt;x&gt; wrote:</cite>hi</blockquote>"
        );
        assert_eq!(
            builtin("spoiler").apply("hi", &TagAttrs::default()).unwrap(),
            "<details><summary>Spoiler</summary>hi</details>"
        );
    }
}
