//! Editor and processor settings.

use serde::{Deserialize, Serialize};

use crate::operations::{DEFAULT_PLACEHOLDER, DEFAULT_SPLIT_BOUNDARIES};

pub const DEFAULT_BASE: &str = "http://rdfa.invalid/";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProcessorOptions {
    /// Base IRI used when the document has no `<base href>`.
    pub base: String,
    /// Honour `xmlns:` attributes as prefix declarations.
    pub xmlns_prefixes: bool,
    /// Expand `rdfa:copy` references to `rdfa:Pattern` resources.
    pub pattern_copying: bool,
}

impl Default for ProcessorOptions {
    fn default() -> Self {
        Self {
            base: DEFAULT_BASE.to_string(),
            xmlns_prefixes: true,
            pattern_copying: true,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EditorConfig {
    /// Tags a parent split never crosses.
    pub split_boundaries: Vec<String>,
    /// Tags the update engine may synthesize as wrappers or new elements.
    pub wrapper_tags: Vec<String>,
    pub allowed_tags: Vec<String>,
    pub allowed_attributes: Vec<String>,
    /// Text inserted when a mark is toggled on a collapsed selection.
    pub placeholder: String,
    pub history_limit: usize,
    pub processor: ProcessorOptions,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            split_boundaries: strings(DEFAULT_SPLIT_BOUNDARIES),
            wrapper_tags: strings(&[
                "span", "div", "p", "section", "article", "aside", "a", "strong", "em", "b",
                "i", "u", "ul", "ol", "li", "h1", "h2", "h3", "h4", "h5", "h6", "blockquote",
                "time", "table", "tr", "td", "th",
            ]),
            allowed_tags: strings(&[
                "a", "abbr", "b", "blockquote", "br", "code", "div", "em", "h1", "h2", "h3",
                "h4", "h5", "h6", "hr", "i", "img", "li", "ol", "p", "pre", "s", "section",
                "span", "strong", "sub", "sup", "table", "tbody", "td", "th", "thead", "time",
                "tr", "u", "ul",
            ]),
            allowed_attributes: strings(&[
                "about", "property", "typeof", "datatype", "resource", "rel", "rev", "content",
                "vocab", "prefix", "href", "src", "lang", "datetime", "class", "id", "title",
                "alt", "inlist",
            ]),
            placeholder: DEFAULT_PLACEHOLDER.to_string(),
            history_limit: 100,
            processor: ProcessorOptions::default(),
        }
    }
}

impl EditorConfig {
    pub fn allows_wrapper(&self, tag: &str) -> bool {
        self.wrapper_tags.iter().any(|t| t.eq_ignore_ascii_case(tag))
    }
}
