//! Loading documents from HTML and writing them back.
//!
//! Marks travel as `<span data-mark="name" ...>` wrappers; roles travel as
//! the wire attributes plus a hidden first-child container, which is dropped
//! on load and regenerated on output.

use std::fmt::Write;

use scraper::Html;

use crate::Error;
use crate::rdfa::projection::{
    CONTAINER_ATTR, attrs_to_serialized_form, serialized_form_to_attrs, sync_element,
};

use super::{Document, Element, Fragment, Mark, MarkSet, NodeId, NodeKind, Text};

pub const MARK_ATTR: &str = "data-mark";

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];

fn is_void(tag: &str) -> bool {
    VOID_ELEMENTS.contains(&tag)
}

fn escape_text(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('\u{a0}', "&nbsp;")
}

fn escape_attr(s: &str) -> String {
    s.replace('&', "&amp;").replace('"', "&quot;")
}

fn convert(
    node: ego_tree::NodeRef<'_, scraper::Node>,
    marks: &MarkSet,
    out: &mut Vec<Fragment>,
) -> Result<(), Error> {
    match node.value() {
        scraper::Node::Text(text) => {
            let value: &str = text;
            if !value.is_empty() {
                out.push(Fragment::Text(Text::with_marks(value, marks.clone())));
            }
        }
        scraper::Node::Element(el) => {
            let attrs = el.attrs.iter().map(|(qn, val)| {
                let name = match qn.prefix.as_deref() {
                    Some(prefix) => format!("{prefix}:{}", qn.local.as_ref()),
                    None => qn.local.to_string(),
                };
                (name, val.to_string())
            });

            if let Some(mark_name) = el.attr(MARK_ATTR) {
                let mut mark = Mark::new(mark_name);
                mark.attrs.extend(attrs.filter(|(name, _)| name != MARK_ATTR));
                let mut inner = marks.clone();
                inner.retain(|m| m.name != mark.name);
                inner.insert(mark);
                for child in node.children() {
                    convert(child, &inner, out)?;
                }
                return Ok(());
            }

            let mut element = Element::new(el.name());
            element.attrs.extend(attrs);
            element.rdfa = serialized_form_to_attrs(&element.attrs)?;
            if element.rdfa.is_some() {
                sync_element(&mut element)?;
            }

            let mut children = Vec::new();
            for child in node.children() {
                let is_role_container = element.rdfa.is_some()
                    && child
                        .value()
                        .as_element()
                        .is_some_and(|c| c.attr(CONTAINER_ATTR).is_some());
                if !is_role_container {
                    convert(child, marks, &mut children)?;
                }
            }
            out.push(Fragment::Element { element, children });
        }
        // comments, doctypes and processing instructions are not content
        _ => {}
    }
    Ok(())
}

/// Parses an HTML fragment as it would appear inside `<body>`.
pub fn parse_fragment(input: &str) -> Result<Vec<Fragment>, Error> {
    let parsed = Html::parse_fragment(input);
    let mut out = Vec::new();
    for child in parsed.root_element().children() {
        convert(child, &MarkSet::new(), &mut out)?;
    }
    Ok(out)
}

fn load(root: Fragment) -> Document {
    let Fragment::Element { element, children } = root else {
        return Document::empty();
    };
    let mut doc = Document::new(element);
    let ids: Vec<NodeId> = children.iter().map(|c| doc.instantiate(c)).collect();
    // the root is attached and every id is fresh
    let _ = doc.insert_children(doc.root(), 0, &ids);
    doc
}

impl Document {
    /// Loads a complete HTML document; the `<html>` element becomes the root.
    pub fn from_html(input: &str) -> Result<Document, Error> {
        let parsed = Html::parse_document(input);
        for err in parsed.errors.iter() {
            tracing::debug!(%err, "HTML parse error");
        }
        let mut out = Vec::new();
        convert(*parsed.root_element(), &MarkSet::new(), &mut out)?;
        Ok(out.pop().map(load).unwrap_or_else(Document::empty))
    }

    /// Loads an HTML fragment under an editing root `<div>`.
    pub fn from_fragment(input: &str) -> Result<Document, Error> {
        let children = parse_fragment(input)?;
        Ok(load(Fragment::element("div").with_children(children)))
    }

    /// Serializes the whole document, root element included.
    pub fn to_html(&self) -> Result<String, Error> {
        let mut out = String::new();
        write_node(self, self.root(), true, &mut out)?;
        Ok(out)
    }

    /// Serializes the children of `id`, role containers included.
    pub fn inner_html(&self, id: NodeId) -> Result<String, Error> {
        let mut out = String::new();
        write_children(self, id, true, &mut out)?;
        Ok(out)
    }
}

fn open_tag(element: &Element, out: &mut String) {
    out.push('<');
    out.push_str(&element.tag);
    for (name, value) in &element.attrs {
        let _ = write!(out, " {name}=\"{}\"", escape_attr(value));
    }
    out.push('>');
}

fn close_tag(tag: &str, out: &mut String) {
    let _ = write!(out, "</{tag}>");
}

fn write_text(text: &Text, out: &mut String) {
    for mark in &text.marks {
        let mut element = Element::new("span").with_attr(MARK_ATTR, mark.name.as_str());
        element.attrs.extend(mark.attrs.clone());
        open_tag(&element, out);
    }
    out.push_str(&escape_text(&text.value));
    for _ in &text.marks {
        close_tag("span", out);
    }
}

fn write_node(doc: &Document, id: NodeId, containers: bool, out: &mut String) -> Result<(), Error> {
    match doc.node(id)?.kind() {
        NodeKind::Text(text) => write_text(text, out),
        NodeKind::Element(element) => {
            open_tag(element, out);
            if is_void(&element.tag) {
                return Ok(());
            }
            write_children(doc, id, containers, out)?;
            close_tag(&element.tag, out);
        }
    }
    Ok(())
}

fn write_children(
    doc: &Document,
    id: NodeId,
    containers: bool,
    out: &mut String,
) -> Result<(), Error> {
    if containers {
        if let Some(rdfa) = doc.element(id).and_then(|el| el.rdfa.as_ref()) {
            if let Some(container) = attrs_to_serialized_form(rdfa)?.container {
                write_fragment(&container, out);
            }
        }
    }
    for &child in doc.children(id) {
        write_node(doc, child, containers, out)?;
    }
    Ok(())
}

fn write_fragment(fragment: &Fragment, out: &mut String) {
    match fragment {
        Fragment::Text(text) => write_text(text, out),
        Fragment::Element { element, children } => {
            open_tag(element, out);
            if is_void(&element.tag) {
                return;
            }
            for child in children {
                write_fragment(child, out);
            }
            close_tag(&element.tag, out);
        }
    }
}

pub fn fragment_to_html(fragment: &Fragment) -> String {
    let mut out = String::new();
    write_fragment(fragment, &mut out);
    out
}

/// Inner HTML of `id` without role containers, as literal values see it.
pub(crate) fn plain_inner_html(doc: &Document, id: NodeId) -> String {
    let mut out = String::new();
    // ids handed out by the processor are attached nodes
    let _ = write_children(doc, id, false, &mut out);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rdfa::attrs::{OutgoingTriple, RdfaAttrs, ResourceAttrs, Term};
    use pretty_assertions::assert_eq;

    #[test]
    fn fragment_round_trips() {
        let doc = Document::from_fragment(r#"<p class="x">a &amp; b<br>c</p>"#).unwrap();
        assert_eq!(
            doc.inner_html(doc.root()).unwrap(),
            r#"<p class="x">a &amp; b<br>c</p>"#
        );
    }

    #[test]
    fn mark_spans_become_marks() {
        let doc = Document::from_fragment(r#"ab<span data-mark="strong">cd</span>"#).unwrap();
        let children = doc.children(doc.root());
        assert_eq!(children.len(), 2);
        let marked = doc.text(children[1]).unwrap();
        assert_eq!(marked.value, "cd");
        assert!(marked.marks.iter().any(|m| m.name == "strong"));
        assert_eq!(
            doc.inner_html(doc.root()).unwrap(),
            r#"ab<span data-mark="strong">cd</span>"#
        );
    }

    #[test]
    fn role_containers_are_regenerated() {
        let mut attrs = ResourceAttrs::new("n1", "http://ex/a");
        attrs.properties = vec![OutgoingTriple::new(
            "http://ex/knows",
            Term::named("http://ex/b"),
        )];
        let mut element = Element::new("div");
        element.rdfa = Some(RdfaAttrs::Resource(attrs));
        sync_element(&mut element).unwrap();
        let fragment = Fragment::from_element(element).with_child(Fragment::text("hi"));

        let html = fragment_to_html(&fragment);
        let doc = Document::from_fragment(&html).unwrap();
        let div = doc.children(doc.root())[0];
        // the container is not part of the editable content
        assert_eq!(doc.children(div).len(), 1);
        assert_eq!(doc.text_content(div), "hi");

        let written = doc.inner_html(doc.root()).unwrap();
        assert!(written.contains(CONTAINER_ATTR));
        let reloaded = Document::from_fragment(&written).unwrap();
        let div2 = reloaded.children(reloaded.root())[0];
        assert_eq!(reloaded.element(div2).unwrap().rdfa, doc.element(div).unwrap().rdfa);
    }
}
