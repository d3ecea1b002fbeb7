//! The boundary every piece of author-supplied HTML passes through before it
//! is inserted into a document.

use std::fmt::Write;

use scraper::Html;

pub trait Sanitizer {
    fn sanitize(&self, html: &str, allowed_tags: &[String], allowed_attributes: &[String])
    -> String;
}

/// Keeps allow-listed tags and attributes; other tags are unwrapped, their
/// text kept. Script-like elements are dropped with their content, and event
/// handler attributes and `javascript:` URLs never survive.
#[derive(Clone, Copy, Debug, Default)]
pub struct AllowListSanitizer;

const DROPPED_WITH_CONTENT: &[&str] = &[
    "script", "style", "iframe", "object", "embed", "template", "noscript",
];

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];

fn allowed(list: &[String], name: &str) -> bool {
    list.iter().any(|item| item.eq_ignore_ascii_case(name))
}

fn is_safe_value(name: &str, value: &str) -> bool {
    if !matches!(name, "href" | "src" | "resource" | "about") {
        return true;
    }
    let scheme: String = value
        .trim_start()
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .take(11)
        .collect();
    !scheme.to_ascii_lowercase().starts_with("javascript:")
}

impl AllowListSanitizer {
    fn write(
        &self,
        node: ego_tree::NodeRef<'_, scraper::Node>,
        tags: &[String],
        attributes: &[String],
        out: &mut String,
    ) {
        match node.value() {
            scraper::Node::Text(text) => {
                let value: &str = text;
                out.push_str(
                    &value
                        .replace('&', "&amp;")
                        .replace('<', "&lt;")
                        .replace('>', "&gt;"),
                );
            }
            scraper::Node::Element(el) => {
                let tag = el.name();
                if DROPPED_WITH_CONTENT.contains(&tag) {
                    tracing::debug!(tag, "dropping element and content");
                    return;
                }
                let keep = allowed(tags, tag);
                if keep {
                    out.push('<');
                    out.push_str(tag);
                    for (name, value) in el.attrs() {
                        let name = name.to_ascii_lowercase();
                        if name.starts_with("on")
                            || !allowed(attributes, &name)
                            || !is_safe_value(&name, value)
                        {
                            continue;
                        }
                        let _ = write!(
                            out,
                            " {name}=\"{}\"",
                            value.replace('&', "&amp;").replace('"', "&quot;")
                        );
                    }
                    out.push('>');
                    if VOID_ELEMENTS.contains(&tag) {
                        return;
                    }
                } else {
                    tracing::debug!(tag, "unwrapping disallowed element");
                }
                for child in node.children() {
                    self.write(child, tags, attributes, out);
                }
                if keep {
                    let _ = write!(out, "</{tag}>");
                }
            }
            _ => {}
        }
    }
}

impl Sanitizer for AllowListSanitizer {
    fn sanitize(
        &self,
        html: &str,
        allowed_tags: &[String],
        allowed_attributes: &[String],
    ) -> String {
        let parsed = Html::parse_fragment(html);
        let mut out = String::new();
        for child in parsed.root_element().children() {
            self.write(child, allowed_tags, allowed_attributes, &mut out);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EditorConfig;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn sanitize(html: &str) -> String {
        let config = EditorConfig::default();
        AllowListSanitizer.sanitize(html, &config.allowed_tags, &config.allowed_attributes)
    }

    #[rstest]
    #[case("<b>X</b>", "<b>X</b>")]
    #[case("<b onclick=\"x()\">X</b>", "<b>X</b>")]
    #[case("a<script>alert(1)</script>b", "ab")]
    #[case("<blink>old</blink>", "old")]
    #[case("<a href=\"javascript:alert(1)\">x</a>", "<a>x</a>")]
    #[case(
        "<span property=\"http://ex/p\" style=\"color: red\">v</span>",
        "<span property=\"http://ex/p\">v</span>"
    )]
    #[case("1 &lt; 2<br>", "1 &lt; 2<br>")]
    fn allow_list(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(sanitize(input), expected);
    }
}
