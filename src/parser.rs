//! The parser facade and the rendering pipeline.
//!
//! `render` runs four stages: the XSS pre-pass, line-break conversion,
//! recursive catalog-order tag expansion, and a final cleanup. Expansion is
//! regex-driven multi-pass rather than a token parser: every active tag's
//! pattern is applied in catalog order with global replacement, recursing
//! into each captured body. Overlapping spans of two different tags are
//! therefore resolved by catalog order, not input order, and unrecognized
//! tags pass through as literal text. Existing content depends on both
//! behaviors.

use crate::config::ParserConfig;
use crate::convert;
use crate::error::{BbCodeError, BbCodeResult};
use crate::sanitize::sanitize_input;
use crate::tags::{builtin_catalog, TagAttrs, TagDefinition};
use crate::validator::{self, ValidationResult};
use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

/// A catalog entry with its compiled matcher.
struct ActiveTag {
    def: TagDefinition,
    pattern: Regex,
}

/// The public entry point: a configuration wired to a prepared catalog.
///
/// Construction validates the catalog and compiles every matcher once;
/// the five operations are pure functions over `(self, input)` and can be
/// called from any number of threads.
pub struct BbCode {
    config: ParserConfig,
    active: Vec<ActiveTag>,
}

impl BbCode {
    /// Engine over the default configuration (full catalog, depth 10,
    /// XSS pre-pass on, no URL whitelist).
    pub fn new() -> Self {
        Self::with_config(ParserConfig::default())
            .expect("default catalog contains no duplicate or invalid names")
    }

    /// Engine over an explicit configuration.
    pub fn with_config(config: ParserConfig) -> BbCodeResult<Self> {
        let catalog = merge_catalog(&config)?;
        let mut active = Vec::with_capacity(catalog.len());
        for def in catalog {
            let pattern = Regex::new(&def.pattern()).map_err(|err| {
                BbCodeError::InvalidTagPattern {
                    name: def.name().to_string(),
                    reason: err.to_string(),
                }
            })?;
            active.push(ActiveTag { def, pattern });
        }
        Ok(Self { config, active })
    }

    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    /// Render markup to HTML. Total: malformed input degrades to literal
    /// bracket text, never to an error.
    pub fn render(&self, markup: &str) -> String {
        let input = if self.config.xss_protection {
            sanitize_input(markup)
        } else {
            markup.to_string()
        };
        let text = convert_line_breaks(&input);
        let expanded = self.expand(&text, 0);
        cleanup_html(&expanded)
    }

    /// Best-effort inverse of `render` for the fixed construct set.
    pub fn to_markup(&self, html: &str) -> String {
        convert::to_markup(html)
    }

    /// Plain text with every bracket token removed.
    pub fn strip_tags(&self, markup: &str) -> String {
        convert::strip_tags(markup)
    }

    /// Plain-text excerpt of at most [`convert::DEFAULT_PREVIEW_LENGTH`]
    /// characters.
    pub fn preview(&self, markup: &str) -> String {
        convert::preview(markup, convert::DEFAULT_PREVIEW_LENGTH)
    }

    /// Plain-text excerpt with an explicit length budget.
    pub fn preview_with_limit(&self, markup: &str, max_len: usize) -> String {
        convert::preview(markup, max_len)
    }

    /// Structural feedback over the raw markup, independent of rendering.
    pub fn validate(&self, markup: &str) -> ValidationResult {
        let refs: Vec<&TagDefinition> = self.active.iter().map(|tag| &tag.def).collect();
        validator::validate_markup(markup, &refs, self.config.max_depth)
    }

    /// One expansion level: every active tag's pattern in catalog order,
    /// recursing into captured bodies. Beyond `max_depth` the input is
    /// returned untouched, so adversarial nesting ends as literal text.
    fn expand(&self, input: &str, depth: usize) -> String {
        if depth > self.config.max_depth {
            return input.to_string();
        }

        let mut text = input.to_string();
        for tag in &self.active {
            if !text.contains('[') {
                break;
            }
            text = tag
                .pattern
                .replace_all(&text, |caps: &regex::Captures| {
                    let mut attrs = TagAttrs::default();
                    if let (Some(name), Some(value)) =
                        (tag.def.allowed_attributes().first(), caps.get(1))
                    {
                        attrs.insert(name.clone(), unquote(value.as_str()));
                    }
                    let content = if tag.def.is_self_closing() {
                        String::new()
                    } else {
                        let inner = caps.get(2).map(|m| m.as_str()).unwrap_or("");
                        self.expand(inner, depth + 1)
                    };
                    match tag.def.apply(&content, &attrs) {
                        Ok(html) => html,
                        // failed transform: the span stays as written
                        Err(_) => caps[0].to_string(),
                    }
                })
                .into_owned();
        }
        text
    }
}

impl Default for BbCode {
    fn default() -> Self {
        Self::new()
    }
}

/// Built-ins filtered to `allowed_tags`, then custom tags merged in:
/// same-name customs replace the built-in in its slot (catalog order is a
/// documented tie-break and must stay stable), new names are appended.
fn merge_catalog(config: &ParserConfig) -> BbCodeResult<Vec<TagDefinition>> {
    static TAG_NAME: OnceLock<Regex> = OnceLock::new();
    let tag_name = TAG_NAME.get_or_init(|| Regex::new(r"^[a-z0-9]+$").unwrap());

    let mut seen = HashSet::new();
    for tag in &config.custom_tags {
        if !tag_name.is_match(tag.name()) {
            return Err(BbCodeError::InvalidTagName {
                name: tag.name().to_string(),
            });
        }
        if !seen.insert(tag.name().to_string()) {
            return Err(BbCodeError::DuplicateTag {
                name: tag.name().to_string(),
            });
        }
    }

    let mut catalog: Vec<TagDefinition> = builtin_catalog(&config.url_whitelist)
        .into_iter()
        .filter(|def| config.allowed_tags.contains(def.name()))
        .collect();

    for tag in &config.custom_tags {
        match catalog.iter_mut().find(|def| def.name() == tag.name()) {
            Some(slot) => *slot = tag.clone(),
            None => catalog.push(tag.clone()),
        }
    }

    Ok(catalog)
}

/// Normalize newlines, turn blank-line runs into paragraph breaks and
/// single newlines into `<br>`, and wrap everything in one paragraph.
/// Runs before tag parsing so tags can span paragraphs.
fn convert_line_breaks(input: &str) -> String {
    static PARAGRAPH_BREAK: OnceLock<Regex> = OnceLock::new();
    let paragraph_break = PARAGRAPH_BREAK.get_or_init(|| Regex::new(r"\n{2,}").unwrap());

    let text = input.replace("\r\n", "\n").replace('\r', "\n");
    let text = paragraph_break.replace_all(&text, "</p><p>");
    let text = text.replace('\n', "<br>");
    format!("<p>{}</p>", text)
}

/// Remove paragraphs the pipeline emptied out, collapse whitespace runs,
/// trim. `<pre>` spans are skipped so code blocks keep verbatim spacing.
fn cleanup_html(html: &str) -> String {
    static PRE_SPAN: OnceLock<Regex> = OnceLock::new();
    let pre_span = PRE_SPAN.get_or_init(|| Regex::new(r"(?s)<pre>.*?</pre>").unwrap());

    let mut out = String::with_capacity(html.len());
    let mut last = 0;
    for span in pre_span.find_iter(html) {
        out.push_str(&tidy_fragment(&html[last..span.start()]));
        out.push_str(span.as_str());
        last = span.end();
    }
    out.push_str(&tidy_fragment(&html[last..]));
    out.trim().to_string()
}

fn tidy_fragment(fragment: &str) -> String {
    static EMPTY_PARAGRAPH: OnceLock<Regex> = OnceLock::new();
    static WHITESPACE_RUN: OnceLock<Regex> = OnceLock::new();

    let empty_paragraph =
        EMPTY_PARAGRAPH.get_or_init(|| Regex::new(r"<p>(?:\s|<br>)*</p>").unwrap());
    let whitespace_run = WHITESPACE_RUN.get_or_init(|| Regex::new(r"\s{2,}").unwrap());

    let fragment = empty_paragraph.replace_all(fragment, "");
    whitespace_run.replace_all(&fragment, " ").into_owned()
}

/// Strip one pair of matching quotes from an attribute value.
fn unquote(value: &str) -> String {
    let trimmed = value.trim();
    let bytes = trimmed.as_bytes();
    if bytes.len() >= 2 && (bytes[0] == b'"' || bytes[0] == b'\'') && bytes[bytes.len() - 1] == bytes[0]
    {
        trimmed[1..trimmed.len() - 1].to_string()
    } else {
        trimmed.to_string()
    }
}
