//! # Quorum BBCode
//!
//! A safe BBCode rendering engine for the Quorum forum platform.
//!
//! ## Features
//! - Fixed catalog of forum tags (formatting, links, images, embeds, code
//!   blocks, quotes, spoilers, lists, tables) with custom-tag extension
//! - Sanitization of every attacker-controlled value: URLs, colors,
//!   language identifiers, plus a script/iframe/handler stripping pre-pass
//! - Depth-bounded recursive expansion; adversarial nesting degrades to
//!   literal text instead of recursion blowups
//! - Independent structural validation for editor feedback
//! - Plain-text stripping, preview truncation, and a best-effort
//!   HTML-to-markup inverse
//!
//! ## Example
//! ```
//! use quorum_bbcode::render;
//!
//! let html = render("[b]Hello[/b] [url=https://example.com]forum[/url]");
//! assert!(html.contains("<strong>Hello</strong>"));
//! ```
//!
//! ## Example: custom configuration
//! ```
//! use quorum_bbcode::{BbCode, ParserConfig};
//!
//! let mut config = ParserConfig::default();
//! config.url_whitelist = vec!["example.com".to_string()];
//! let engine = BbCode::with_config(config).expect("valid configuration");
//! let html = engine.render("[img]https://evil.test/x.png[/img]");
//! assert!(!html.contains("<img"));
//! ```

pub mod config;
pub mod convert;
pub mod error;
pub mod parser;
pub mod sanitize;
pub mod tags;
pub mod validator;

pub use config::{ParserConfig, DEFAULT_MAX_DEPTH};
pub use error::{BbCodeError, BbCodeResult};
pub use parser::BbCode;
pub use tags::{TagAttrs, TagDefinition, TagTransform, TransformError, BUILTIN_TAGS};
pub use validator::ValidationResult;

use std::sync::OnceLock;

fn default_engine() -> &'static BbCode {
    static DEFAULT_ENGINE: OnceLock<BbCode> = OnceLock::new();
    DEFAULT_ENGINE.get_or_init(BbCode::new)
}

/// Render markup to HTML with the shared default configuration.
pub fn render(markup: &str) -> String {
    default_engine().render(markup)
}

/// Convert HTML back to markup, best effort.
pub fn to_markup(html: &str) -> String {
    default_engine().to_markup(html)
}

/// Strip every tag token, returning plain text.
pub fn strip_tags(markup: &str) -> String {
    default_engine().strip_tags(markup)
}

/// Plain-text excerpt of at most 150 characters.
pub fn preview(markup: &str) -> String {
    default_engine().preview(markup)
}

/// Plain-text excerpt with an explicit length budget.
pub fn preview_with_limit(markup: &str, max_len: usize) -> String {
    default_engine().preview_with_limit(markup, max_len)
}

/// Validate tag balance and nesting depth with the default configuration.
pub fn validate(markup: &str) -> validator::ValidationResult {
    default_engine().validate(markup)
}
