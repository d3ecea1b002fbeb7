//! In-place attribute mutation for the UPDATE strategy.

use std::collections::BTreeMap;

use itertools::Itertools;

use crate::model::Element;

use super::spec::{AttrMap, RdfaKey, RemovalPattern};

/// Elements on which `href` and `resource` are alternatives.
pub const LINK_TAGS: &[&str] = &["a", "link", "area"];

fn is_link_element(element: &Element) -> bool {
    LINK_TAGS.iter().any(|t| element.tag.eq_ignore_ascii_case(t))
}

/// Reads `prefix: iri` pairs. A token that is not a prefix where one is
/// expected is skipped, and a prefix directly followed by another prefix
/// maps to the empty IRI.
fn prefix_pairs(value: &str) -> Vec<(&str, &str)> {
    let mut tokens = value.split_ascii_whitespace().peekable();
    let mut pairs = Vec::new();
    while let Some(token) = tokens.next() {
        let Some(prefix) = token.strip_suffix(':') else {
            tracing::debug!(token, "skipping malformed prefix token");
            continue;
        };
        let iri = tokens.next_if(|next| !next.ends_with(':')).unwrap_or_default();
        pairs.push((prefix, iri));
    }
    pairs
}

/// Parses `prefix` attribute syntax into ordered `prefix -> iri` pairs.
fn parse_prefixes(value: &str) -> BTreeMap<String, String> {
    prefix_pairs(value)
        .into_iter()
        .map(|(prefix, iri)| (prefix.to_string(), iri.to_string()))
        .collect()
}

/// Merges two `prefix` values: new mappings win, mappings to an empty IRI
/// are dropped and the output is sorted by prefix.
pub fn merge_prefixes(existing: &str, new: &str) -> String {
    let mut merged = parse_prefixes(existing);
    merged.extend(parse_prefixes(new));
    merged
        .into_iter()
        .filter(|(_, iri)| !iri.is_empty() && iri != "\"\"")
        .map(|(prefix, iri)| format!("{prefix}: {iri}"))
        .join(" ")
}

/// Strips the tokens selected by `pattern`; `None` when nothing is left.
pub fn remove_tokens(value: &str, pattern: &RemovalPattern) -> Option<String> {
    if matches!(pattern, RemovalPattern::All) {
        return None;
    }
    let kept = value
        .split_ascii_whitespace()
        .filter(|token| !pattern.matches(token))
        .join(" ");
    (!kept.is_empty()).then_some(kept)
}

fn append_tokens(existing: Option<&str>, tokens: &[&str]) -> String {
    let mut out: Vec<&str> = existing
        .map(|e| e.split_ascii_whitespace().collect())
        .unwrap_or_default();
    for &token in tokens {
        if !out.contains(&token) {
            out.push(token);
        }
    }
    out.join(" ")
}

/// Writes `href` or `resource`, keeping link elements to one of the two.
fn set_link(element: &mut Element, key: RdfaKey, value: String) {
    let (own, other) = match key {
        RdfaKey::Href => ("href", "resource"),
        _ => ("resource", "href"),
    };
    if is_link_element(element) && element.attrs.shift_remove(other).is_some() {
        tracing::debug!(tag = %element.tag, dropped = other, "link element keeps one target");
    }
    element.attrs.insert(own.to_string(), value);
}

pub fn apply_removals(element: &mut Element, removals: &[(RdfaKey, RemovalPattern)]) {
    for (key, pattern) in removals {
        let Some(name) = key.attribute() else {
            continue;
        };
        let Some(current) = element.attrs.get(name) else {
            continue;
        };
        match remove_tokens(current, pattern) {
            Some(kept) => {
                element.attrs.insert(name.to_string(), kept);
            }
            None => {
                element.attrs.shift_remove(name);
            }
        }
    }
}

/// Applies `add` (append) or `set` (overwrite) to the attributes of
/// `element`. `tag` renames the element; `innerHTML` is left to the caller.
pub fn apply_values(element: &mut Element, values: &AttrMap, overwrite: bool) {
    for (&key, value) in values {
        if key == RdfaKey::Tag {
            if let Some(tag) = value.as_text().filter(|t| !t.is_empty()) {
                element.tag = tag.to_ascii_lowercase();
            }
            continue;
        }
        let Some(name) = key.attribute() else {
            continue;
        };

        if key.is_link_sensitive() {
            if let Some(target) = value.as_text() {
                set_link(element, key, target);
            }
        } else if key == RdfaKey::Prefix {
            let Some(new) = value.as_text() else {
                continue;
            };
            let existing = if overwrite {
                ""
            } else {
                element.attr(name).unwrap_or_default()
            };
            let merged = merge_prefixes(existing, &new);
            if merged.is_empty() {
                element.attrs.shift_remove(name);
            } else {
                element.attrs.insert(name.to_string(), merged);
            }
        } else if key.is_token_list() && !overwrite {
            let joined = append_tokens(element.attr(name), &value.tokens());
            element.attrs.insert(name.to_string(), joined);
        } else if let Some(text) = value.as_text() {
            element.attrs.insert(name.to_string(), text);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::update::spec::AttrValue;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn map(pairs: &[(RdfaKey, AttrValue)]) -> AttrMap {
        pairs.iter().cloned().collect()
    }

    #[test]
    fn prefix_merge_is_deterministic() {
        let merged = merge_prefixes(
            "schema: http://schema.org/ ex: http://old/ dc: http://purl.org/dc/terms/",
            "ex: http://new/ foaf: http://xmlns.com/foaf/0.1/ dc: \"\"",
        );
        assert_eq!(
            merged,
            "ex: http://new/ foaf: http://xmlns.com/foaf/0.1/ schema: http://schema.org/"
        );
        assert_eq!(merge_prefixes(&merged, ""), merged);
    }

    #[rstest]
    #[case::malformed_token("ex:http://x foaf: http://xmlns.com/foaf/0.1/")]
    #[case::dangling_prefix("ex: foaf: http://xmlns.com/foaf/0.1/")]
    #[case::trailing_junk("foaf: http://xmlns.com/foaf/0.1/ http://stray/")]
    fn prefix_merge_recovers_after_bad_tokens(#[case] new: &str) {
        assert_eq!(
            merge_prefixes("", new),
            "foaf: http://xmlns.com/foaf/0.1/"
        );
    }

    #[rstest]
    #[case(RemovalPattern::All, None)]
    #[case(RemovalPattern::Value("ex:b".into()), Some("ex:a ex:c"))]
    #[case(RemovalPattern::Values(vec!["ex:a".into(), "ex:c".into()]), Some("ex:b"))]
    #[case(RemovalPattern::Regex(regex::Regex::new("^ex:[ab]$").unwrap()), Some("ex:c"))]
    fn token_removal(#[case] pattern: RemovalPattern, #[case] expected: Option<&str>) {
        assert_eq!(
            remove_tokens("ex:a ex:b ex:c", &pattern).as_deref(),
            expected
        );
    }

    #[test]
    fn add_appends_deduplicated_tokens_and_set_overwrites() {
        let mut el = Element::new("span").with_attr("typeof", "ex:A");
        apply_values(
            &mut el,
            &map(&[(RdfaKey::Typeof, AttrValue::List(vec!["ex:A".into(), "ex:B".into()]))]),
            false,
        );
        assert_eq!(el.attr("typeof"), Some("ex:A ex:B"));
        apply_values(&mut el, &map(&[(RdfaKey::Typeof, "ex:C".into())]), true);
        assert_eq!(el.attr("typeof"), Some("ex:C"));
    }

    #[test]
    fn link_elements_keep_one_target() {
        let mut a = Element::new("a").with_attr("resource", "http://ex/r");
        apply_values(&mut a, &map(&[(RdfaKey::Href, "http://ex/h".into())]), false);
        assert_eq!(a.attr("href"), Some("http://ex/h"));
        assert!(!a.has_attr("resource"));

        let mut span = Element::new("span").with_attr("resource", "http://ex/r");
        apply_values(&mut span, &map(&[(RdfaKey::Href, "http://ex/h".into())]), false);
        assert!(span.has_attr("resource"));
    }

    #[test]
    fn tag_renames() {
        let mut el = Element::new("span");
        apply_values(&mut el, &map(&[(RdfaKey::Tag, "DIV".into())]), true);
        assert_eq!(el.tag, "div");
    }
}
