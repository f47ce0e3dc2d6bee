//! Sanitization helpers for attacker-controlled values.
//!
//! Everything here is a pure function that deterministically neutralizes
//! unsafe input: bad URLs become empty strings, bad colors become `inherit`,
//! identifiers lose their unsafe characters. None of these return errors.

use regex::Regex;
use std::sync::OnceLock;
use url::Url;

/// Escape text for interpolation into HTML (server-side, no DOM).
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Decode the entities produced by [`escape_html`].
///
/// `&amp;` is decoded last so that `&amp;lt;` round-trips to `&lt;` instead
/// of collapsing to `<`. `&#x27;` is accepted as an alternate apostrophe.
pub fn unescape_html(html: &str) -> String {
    html.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&amp;", "&")
}

/// Validate and normalize a user-supplied URL.
///
/// Protocol-relative input (`//host/…`) is treated as https. Only http and
/// https schemes are accepted. When `whitelist` is non-empty the host must
/// equal an entry or be a subdomain of one. Returns the normalized absolute
/// URL on success and an empty string on any failure.
pub fn sanitize_url(raw: &str, whitelist: &[String]) -> String {
    let raw = raw.trim();
    let candidate = if raw.starts_with("//") {
        format!("https:{}", raw)
    } else {
        raw.to_string()
    };

    let parsed = match Url::parse(&candidate) {
        Ok(parsed) => parsed,
        Err(_) => return String::new(),
    };

    match parsed.scheme() {
        "http" | "https" => {}
        _ => return String::new(),
    }

    if !whitelist.is_empty() {
        let host = match parsed.host_str() {
            Some(host) => host.to_lowercase(),
            None => return String::new(),
        };
        let allowed = whitelist.iter().any(|domain| {
            let domain = domain.to_lowercase();
            host == domain || host.ends_with(&format!(".{}", domain))
        });
        if !allowed {
            return String::new();
        }
    }

    parsed.to_string()
}

const NAMED_COLORS: &[&str] = &[
    "aqua", "black", "blue", "fuchsia", "gray", "green", "lime", "maroon", "navy", "olive",
    "orange", "purple", "red", "silver", "teal", "transparent", "white", "yellow",
];

/// Accept a 3-6 digit hex color or a known color name; anything else
/// becomes `inherit` so a bad value cannot break out of the style attribute.
pub fn sanitize_color(raw: &str) -> String {
    static HEX_COLOR_REGEX: OnceLock<Regex> = OnceLock::new();
    let hex_regex = HEX_COLOR_REGEX.get_or_init(|| Regex::new(r"^#[0-9a-fA-F]{3,6}$").unwrap());

    let value = raw.trim();
    if hex_regex.is_match(value) {
        return value.to_string();
    }

    let lower = value.to_lowercase();
    if NAMED_COLORS.contains(&lower.as_str()) {
        return lower;
    }

    "inherit".to_string()
}

/// Strip every character outside `[A-Za-z0-9_-]`.
///
/// Used for language/class names so they can be echoed into an HTML
/// attribute without any escaping concerns.
pub fn sanitize_identifier(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .collect()
}

/// Defense-in-depth pre-pass applied before tag parsing.
///
/// Strips `<script>`/`<iframe>` blocks and orphan open/close tags,
/// `javascript:` URI prefixes, and inline `on*=` event handlers. This is a
/// blunt filter, not an allow-list sanitizer; output safety still rests on
/// the escaping inside the tag transforms.
pub fn sanitize_input(raw: &str) -> String {
    static SCRIPT_BLOCK: OnceLock<Regex> = OnceLock::new();
    static IFRAME_BLOCK: OnceLock<Regex> = OnceLock::new();
    static ORPHAN_TAG: OnceLock<Regex> = OnceLock::new();
    static JS_URI: OnceLock<Regex> = OnceLock::new();
    static EVENT_HANDLER: OnceLock<Regex> = OnceLock::new();

    let script_block = SCRIPT_BLOCK
        .get_or_init(|| Regex::new(r"(?is)<script\b[^>]*>.*?</script\s*>").unwrap());
    let iframe_block = IFRAME_BLOCK
        .get_or_init(|| Regex::new(r"(?is)<iframe\b[^>]*>.*?</iframe\s*>").unwrap());
    let orphan_tag =
        ORPHAN_TAG.get_or_init(|| Regex::new(r"(?i)</?(?:script|iframe)\b[^>]*>").unwrap());
    let js_uri = JS_URI.get_or_init(|| Regex::new(r"(?i)javascript\s*:").unwrap());
    let event_handler = EVENT_HANDLER
        .get_or_init(|| Regex::new(r#"(?i)\bon\w+\s*=\s*(?:"[^"]*"|'[^']*'|[^\s>]+)"#).unwrap());

    let cleaned = script_block.replace_all(raw, "");
    let cleaned = iframe_block.replace_all(&cleaned, "");
    let cleaned = orphan_tag.replace_all(&cleaned, "");
    let cleaned = js_uri.replace_all(&cleaned, "");
    let cleaned = event_handler.replace_all(&cleaned, "");
    cleaned.into_owned()
}
