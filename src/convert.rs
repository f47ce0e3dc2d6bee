//! Plain-text extraction, preview truncation, and the HTML-to-markup
//! inverse.
//!
//! `to_markup` is intentionally lossy: it recovers the fixed construct set
//! `render` emits (formatting wrappers, anchors, images, code blocks,
//! blockquotes, lists, line breaks) and drops everything else. Attributes
//! other than an anchor's href and a code block's language are not
//! recovered, and nested formatting inside list items is not guaranteed to
//! round-trip.

use crate::sanitize::unescape_html;
use regex::Regex;
use std::sync::OnceLock;

/// Default `preview` length budget.
pub const DEFAULT_PREVIEW_LENGTH: usize = 150;

/// Remove every `[...]` token, collapse whitespace, trim.
///
/// A single global pass is enough: removing a token never forms a new one,
/// so stripping is idempotent.
pub fn strip_tags(markup: &str) -> String {
    static TAG_TOKEN: OnceLock<Regex> = OnceLock::new();
    static WHITESPACE: OnceLock<Regex> = OnceLock::new();

    let tag_token = TAG_TOKEN.get_or_init(|| Regex::new(r"\[[^\]]*\]").unwrap());
    let whitespace = WHITESPACE.get_or_init(|| Regex::new(r"\s+").unwrap());

    let text = tag_token.replace_all(markup, "");
    let text = whitespace.replace_all(&text, " ");
    text.trim().to_string()
}

/// Plain-text excerpt of at most `max_len` characters.
///
/// Longer text is cut at the last whitespace boundary within the first
/// `max_len - 3` characters (hard cut when there is none) and finished
/// with `"..."`.
pub fn preview(markup: &str, max_len: usize) -> String {
    let text = strip_tags(markup);
    if text.chars().count() <= max_len {
        return text;
    }

    let budget = max_len.saturating_sub(3);
    let cut: String = text.chars().take(budget).collect();
    let cut = match cut.rfind(char::is_whitespace) {
        Some(pos) => cut[..pos].trim_end().to_string(),
        None => cut,
    };
    format!("{}...", cut)
}

/// Best-effort inverse of rendering for the fixed construct set.
pub fn to_markup(html: &str) -> String {
    let text = html.replace("\r\n", "\n");

    // line structure first, while paragraph tags still exist
    let text = apply_passes(&text, line_passes());

    // code blocks keep their entities until the final unescape, which is
    // what protects their content from the tag-stripping pass below
    let text = recover_code_blocks(&text);
    let text = recover_anchors(&text);
    let text = recover_images(&text);

    let text = apply_passes(&text, wrapper_passes());

    static LEFTOVER_TAG: OnceLock<Regex> = OnceLock::new();
    let leftover = LEFTOVER_TAG.get_or_init(|| Regex::new(r"<[^>]+>").unwrap());
    let text = leftover.replace_all(&text, "");

    // unescape last so decoded angle brackets cannot look like tags above
    let text = unescape_html(&text);

    static NEWLINE_RUN: OnceLock<Regex> = OnceLock::new();
    let newline_run = NEWLINE_RUN.get_or_init(|| Regex::new(r"\n{3,}").unwrap());
    newline_run.replace_all(&text, "\n\n").trim().to_string()
}

fn apply_passes(text: &str, passes: &[(Regex, &'static str)]) -> String {
    let mut text = text.to_string();
    for (pattern, replacement) in passes {
        text = pattern.replace_all(&text, *replacement).into_owned();
    }
    text
}

fn line_passes() -> &'static [(Regex, &'static str)] {
    static PASSES: OnceLock<Vec<(Regex, &'static str)>> = OnceLock::new();
    PASSES.get_or_init(|| {
        compile_passes(&[
            (r"(?i)<br\s*/?>", "\n"),
            // \b keeps <pre> out of the paragraph patterns
            (r"(?i)</p>\s*<p\b[^>]*>", "\n\n"),
            (r"(?i)</?p\b[^>]*>", ""),
        ])
    })
}

fn wrapper_passes() -> &'static [(Regex, &'static str)] {
    static PASSES: OnceLock<Vec<(Regex, &'static str)>> = OnceLock::new();
    PASSES.get_or_init(|| {
        compile_passes(&[
            (r"(?i)<(?:strong|b)>", "[b]"),
            (r"(?i)</(?:strong|b)>", "[/b]"),
            (r"(?i)<(?:em|i)>", "[i]"),
            (r"(?i)</(?:em|i)>", "[/i]"),
            (r"(?i)<u>", "[u]"),
            (r"(?i)</u>", "[/u]"),
            (r"(?i)<(?:del|strike|s)>", "[s]"),
            (r"(?i)</(?:del|strike|s)>", "[/s]"),
            (r"(?i)<blockquote[^>]*>", "[quote]"),
            (r"(?i)</blockquote>", "[/quote]"),
            (r"(?i)<ul[^>]*>", "[list]"),
            (r"(?i)<ol[^>]*>", "[list=1]"),
            (r"(?i)</(?:ul|ol)>", "[/list]"),
            (r"(?i)<li[^>]*>", "\n[*]"),
            (r"(?i)</li>", ""),
        ])
    })
}

fn compile_passes(
    pairs: &[(&'static str, &'static str)],
) -> Vec<(Regex, &'static str)> {
    pairs
        .iter()
        .map(|(pattern, replacement)| (Regex::new(pattern).unwrap(), *replacement))
        .collect()
}

fn recover_code_blocks(text: &str) -> String {
    static CODE_WITH_LANG: OnceLock<Regex> = OnceLock::new();
    static CODE_PLAIN: OnceLock<Regex> = OnceLock::new();
    static PRE_PLAIN: OnceLock<Regex> = OnceLock::new();

    let with_lang = CODE_WITH_LANG.get_or_init(|| {
        Regex::new(r#"(?is)<pre><code class="language-([^"]*)">(.*?)</code></pre>"#).unwrap()
    });
    let plain =
        CODE_PLAIN.get_or_init(|| Regex::new(r"(?is)<pre><code>(.*?)</code></pre>").unwrap());
    let pre = PRE_PLAIN.get_or_init(|| Regex::new(r"(?is)<pre>(.*?)</pre>").unwrap());

    let text = with_lang.replace_all(text, "[code=${1}]${2}[/code]");
    let text = plain.replace_all(&text, "[code]${1}[/code]");
    pre.replace_all(&text, "[pre]${1}[/pre]").into_owned()
}

fn recover_anchors(text: &str) -> String {
    static ANCHOR: OnceLock<Regex> = OnceLock::new();
    let anchor = ANCHOR
        .get_or_init(|| Regex::new(r#"(?is)<a\s+href="([^"]*)"[^>]*>(.*?)</a>"#).unwrap());
    anchor.replace_all(text, "[url=${1}]${2}[/url]").into_owned()
}

fn recover_images(text: &str) -> String {
    static IMAGE: OnceLock<Regex> = OnceLock::new();
    let image =
        IMAGE.get_or_init(|| Regex::new(r#"(?i)<img\s+src="([^"]*)"[^>]*>"#).unwrap());
    image.replace_all(text, "[img]${1}[/img]").into_owned()
}
