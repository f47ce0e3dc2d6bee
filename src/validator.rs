//! Structural validation for editor feedback.
//!
//! The validator re-scans the raw markup with its own token pass instead of
//! sharing state with the rendering engine: it must report on exactly the
//! malformed input the engine is designed to tolerate. The two stay
//! consistent by consuming the same catalog.

use crate::tags::TagDefinition;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::OnceLock;

/// Outcome of one `validate` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<String>,
}

impl ValidationResult {
    fn from_errors(errors: Vec<String>) -> Self {
        Self {
            is_valid: errors.is_empty(),
            errors,
        }
    }
}

/// Scan `markup` once, tracking a stack of open tags from `catalog`.
///
/// Only non-self-closing catalog names participate; `[*]` item markers,
/// `[tr]`-style table markers and unknown bracket text are content to the
/// engine and stay out of balance errors here too. Nesting depth is checked
/// over the same stream, independently of the engine's own cutoff.
pub fn validate_markup(
    markup: &str,
    catalog: &[&TagDefinition],
    max_depth: usize,
) -> ValidationResult {
    static TOKEN: OnceLock<Regex> = OnceLock::new();
    let token = TOKEN.get_or_init(|| Regex::new(r"(?i)\[(/?)([a-z0-9]+)(?:=[^\]]*)?\]").unwrap());

    let mut paired: HashSet<&str> = HashSet::new();
    for def in catalog {
        if !def.is_self_closing() {
            paired.insert(def.name());
        }
    }

    let mut errors = Vec::new();
    let mut stack: Vec<String> = Vec::new();
    let mut max_seen = 0usize;

    for caps in token.captures_iter(markup) {
        let name = caps[2].to_lowercase();
        if !paired.contains(name.as_str()) {
            continue;
        }
        let closing = !caps[1].is_empty();
        if closing {
            match stack.last() {
                None => errors.push(format!("unexpected closing tag [/{}]", name)),
                Some(top) if *top != name => {
                    errors.push(format!(
                        "mismatched tags: expected [/{}], found [/{}]",
                        top, name
                    ));
                    // pop anyway to resynchronize
                    stack.pop();
                }
                Some(_) => {
                    stack.pop();
                }
            }
        } else {
            stack.push(name);
            max_seen = max_seen.max(stack.len());
        }
    }

    for name in &stack {
        errors.push(format!("unclosed tag [{}]", name));
    }

    if max_seen > max_depth {
        errors.push(format!(
            "nesting depth {} exceeds maximum depth {}",
            max_seen, max_depth
        ));
    }

    ValidationResult::from_errors(errors)
}
