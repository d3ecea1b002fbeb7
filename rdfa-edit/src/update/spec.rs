//! The change spec accepted by the update engine.

use std::collections::BTreeMap;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::Error;

/// The closed set of keys a change spec may touch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RdfaKey {
    About,
    Property,
    Typeof,
    Datatype,
    Resource,
    Rel,
    Rev,
    Content,
    Vocab,
    Prefix,
    Href,
    Tag,
    #[serde(rename = "innerHTML")]
    InnerHtml,
}

impl RdfaKey {
    /// The HTML attribute behind this key; `tag` and `innerHTML` are not
    /// attributes.
    pub fn attribute(self) -> Option<&'static str> {
        Some(match self {
            RdfaKey::About => "about",
            RdfaKey::Property => "property",
            RdfaKey::Typeof => "typeof",
            RdfaKey::Datatype => "datatype",
            RdfaKey::Resource => "resource",
            RdfaKey::Rel => "rel",
            RdfaKey::Rev => "rev",
            RdfaKey::Content => "content",
            RdfaKey::Vocab => "vocab",
            RdfaKey::Prefix => "prefix",
            RdfaKey::Href => "href",
            RdfaKey::Tag | RdfaKey::InnerHtml => return None,
        })
    }

    /// Keys holding a space-separated list of values.
    pub fn is_token_list(self) -> bool {
        matches!(
            self,
            RdfaKey::Property | RdfaKey::Typeof | RdfaKey::Rel | RdfaKey::Rev
        )
    }

    /// Keys where `href` and `resource` compete on link elements.
    pub fn is_link_sensitive(self) -> bool {
        matches!(self, RdfaKey::Href | RdfaKey::Resource)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegexValue {
    pub regex: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Flag(bool),
    Text(String),
    List(Vec<String>),
    Regex(RegexValue),
    Regexes(Vec<RegexValue>),
}

impl AttrValue {
    /// The values to write for `add`/`set`; flags and patterns have none.
    pub fn tokens(&self) -> Vec<&str> {
        match self {
            AttrValue::Text(value) => value.split_ascii_whitespace().collect(),
            AttrValue::List(values) => values
                .iter()
                .flat_map(|v| v.split_ascii_whitespace())
                .collect(),
            AttrValue::Flag(_) | AttrValue::Regex(_) | AttrValue::Regexes(_) => Vec::new(),
        }
    }

    /// The value verbatim, for keys that are not token lists.
    pub fn as_text(&self) -> Option<String> {
        match self {
            AttrValue::Text(value) => Some(value.clone()),
            AttrValue::List(values) => Some(values.join(" ")),
            AttrValue::Flag(_) | AttrValue::Regex(_) | AttrValue::Regexes(_) => None,
        }
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        AttrValue::Text(value.to_string())
    }
}

pub type AttrMap = BTreeMap<RdfaKey, AttrValue>;

/// What to strip from an attribute.
#[derive(Clone, Debug)]
pub enum RemovalPattern {
    All,
    Value(String),
    Values(Vec<String>),
    Regex(Regex),
    Regexes(Vec<Regex>),
}

fn compile(pattern: &str) -> Result<Regex, Error> {
    Regex::new(pattern).map_err(|source| Error::InvalidRegex {
        source,
        pattern: pattern.to_string(),
    })
}

impl RemovalPattern {
    /// `false` selects nothing.
    pub fn from_value(value: &AttrValue) -> Result<Option<Self>, Error> {
        Ok(Some(match value {
            AttrValue::Flag(true) => RemovalPattern::All,
            AttrValue::Flag(false) => return Ok(None),
            AttrValue::Text(v) => RemovalPattern::Value(v.clone()),
            AttrValue::List(vs) => RemovalPattern::Values(vs.clone()),
            AttrValue::Regex(r) => RemovalPattern::Regex(compile(&r.regex)?),
            AttrValue::Regexes(rs) => RemovalPattern::Regexes(
                rs.iter()
                    .map(|r| compile(&r.regex))
                    .collect::<Result<_, _>>()?,
            ),
        }))
    }

    pub fn matches(&self, token: &str) -> bool {
        match self {
            RemovalPattern::All => true,
            RemovalPattern::Value(v) => v.split_ascii_whitespace().any(|v| v == token),
            RemovalPattern::Values(vs) => vs.iter().any(|v| v == token),
            RemovalPattern::Regex(r) => r.is_match(token),
            RemovalPattern::Regexes(rs) => rs.iter().any(|r| r.is_match(token)),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UpdateSpec {
    pub remove: Option<AttrMap>,
    pub add: Option<AttrMap>,
    pub set: Option<AttrMap>,
    pub before: Option<AttrMap>,
    pub after: Option<AttrMap>,
    pub append: Option<AttrMap>,
    pub prepend: Option<AttrMap>,
    pub desc: Option<String>,
}

impl UpdateSpec {
    pub fn sets_inner_html(&self) -> bool {
        self.set
            .as_ref()
            .is_some_and(|set| set.contains_key(&RdfaKey::InnerHtml))
    }

    pub fn adds(&self, key: RdfaKey) -> bool {
        self.add.as_ref().is_some_and(|add| add.contains_key(&key))
    }

    /// The tag requested for a synthesized element, from `set` then `add`.
    pub fn tag(&self) -> Option<String> {
        [&self.set, &self.add]
            .into_iter()
            .flatten()
            .find_map(|map| map.get(&RdfaKey::Tag))
            .and_then(AttrValue::as_text)
    }

    /// Compiles the removal patterns up front so a bad regex fails before
    /// anything is mutated.
    pub(crate) fn removals(&self) -> Result<Vec<(RdfaKey, RemovalPattern)>, Error> {
        let mut out = Vec::new();
        for (&key, value) in self.remove.iter().flatten() {
            if let Some(pattern) = RemovalPattern::from_value(value)? {
                out.push((key, pattern));
            }
        }
        Ok(out)
    }
}

/// How an update is carried out.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    Replace,
    Wrap,
    Nest,
    Update,
}
