use crate::error::BbCodeResult;
use crate::tags::{TagDefinition, BUILTIN_TAGS};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Default recursion bound for nested tags.
pub const DEFAULT_MAX_DEPTH: usize = 10;

/// Parser configuration: active tags, recursion bound, and URL policy.
///
/// A config is built once and never mutated; any number of concurrent
/// renders may share it. `custom_tags` carry transform functions and are
/// therefore not part of the serialized form.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Built-in tag names to activate. Defaults to the whole catalog.
    pub allowed_tags: HashSet<String>,
    /// Recursion bound; markup nested deeper stays literal.
    pub max_depth: usize,
    /// Hosts (and their subdomains) acceptable in urls and images.
    /// Empty means any http(s) host.
    pub url_whitelist: Vec<String>,
    /// Run the script/iframe/handler stripping pre-pass before parsing.
    pub xss_protection: bool,
    /// Extra tags, merged after the built-ins. A custom tag with a
    /// built-in's name replaces it in place; new names are appended and
    /// implicitly active.
    #[serde(skip)]
    pub custom_tags: Vec<TagDefinition>,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            allowed_tags: BUILTIN_TAGS.iter().map(|name| name.to_string()).collect(),
            max_depth: DEFAULT_MAX_DEPTH,
            url_whitelist: Vec::new(),
            xss_protection: true,
            custom_tags: Vec::new(),
        }
    }
}

impl ParserConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a config from YAML. Unspecified fields keep their defaults.
    pub fn from_yaml(yaml: &str) -> BbCodeResult<Self> {
        let config: ParserConfig = serde_yaml::from_str(yaml)?;
        Ok(config)
    }
}
