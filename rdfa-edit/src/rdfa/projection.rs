//! Projection between a node's RDFa role and the attributes that persist it.
//!
//! A node with a role is written out with native RDFa attributes where they
//! can express a triple, wire attributes that carry the full role, and a
//! hidden container of marker elements for every other triple. Reading a
//! node back only looks at the wire attributes.

use indexmap::IndexMap;

use crate::Error;
use crate::model::{Element, Fragment};

use super::attrs::{
    FullTriple, IncomingTriple, LiteralAttrs, OutgoingTriple, RdfaAttrs, ResourceAttrs, Term,
};

pub const NODE_ID_ATTR: &str = "__rdfaId";
pub const NODE_TYPE_ATTR: &str = "data-rdfa-node-type";
pub const SUBJECT_ATTR: &str = "data-subject";
pub const OUTGOING_ATTR: &str = "data-outgoing-props";
pub const INCOMING_ATTR: &str = "data-incoming-props";
pub const EXTERNAL_ATTR: &str = "data-external-triples";
pub const LITERAL_NODE_ATTR: &str = "data-literal-node";
pub const CONTENT_ATTR: &str = "data-content";
pub const DATATYPE_ATTR: &str = "data-datatype";
pub const LANGUAGE_ATTR: &str = "data-language";
pub const CONTAINER_ATTR: &str = "data-rdfa-container";
pub const EXTERNAL_CONTAINER_ATTR: &str = "data-external-triple-container";

/// Attributes owned by the projection; anything else on an element is
/// left alone when the role is re-synced.
const MANAGED_ATTRS: &[&str] = &[
    NODE_ID_ATTR,
    NODE_TYPE_ATTR,
    SUBJECT_ATTR,
    OUTGOING_ATTR,
    INCOMING_ATTR,
    EXTERNAL_ATTR,
    LITERAL_NODE_ATTR,
    CONTENT_ATTR,
    DATATYPE_ATTR,
    LANGUAGE_ATTR,
    "about",
    "property",
    "datatype",
    "lang",
    "content",
];

/// Attributes plus the hidden marker container for one node.
#[derive(Clone, Debug, PartialEq)]
pub struct SerializedForm {
    pub attributes: IndexMap<String, String>,
    pub container: Option<Fragment>,
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, Error> {
    Ok(serde_json::to_string(value)?)
}

fn set_opt(attributes: &mut IndexMap<String, String>, key: &str, value: Option<&String>) {
    if let Some(value) = value {
        attributes.insert(key.to_string(), value.clone());
    }
}

fn marker() -> Fragment {
    Fragment::element("span")
}

fn literal_marker(
    subject: &str,
    predicate: &str,
    value: &str,
    datatype: Option<&String>,
    language: Option<&String>,
) -> Fragment {
    let mut fragment = marker()
        .with_attr("about", subject)
        .with_attr("property", predicate)
        .with_attr("content", value);
    if let Some(datatype) = datatype {
        fragment = fragment.with_attr("datatype", datatype.as_str());
    }
    if let Some(language) = language {
        fragment = fragment.with_attr("lang", language.as_str());
    }
    fragment
}

/// Marker for `subject predicate object`, or `None` when the object cannot
/// be written as an attribute value.
fn triple_marker(subject: &str, predicate: &str, object: &Term) -> Option<Fragment> {
    match object {
        Term::NamedNode { value } | Term::ResourceNode { value } => Some(
            marker()
                .with_attr("about", subject)
                .with_attr("property", predicate)
                .with_attr("resource", value.as_str()),
        ),
        Term::BlankNode { value } => Some(
            marker()
                .with_attr("about", subject)
                .with_attr("property", predicate)
                .with_attr("resource", format!("[_:{value}]")),
        ),
        Term::Literal {
            value,
            datatype,
            language,
        } => Some(literal_marker(
            subject,
            predicate,
            value,
            datatype.as_ref(),
            language.as_ref(),
        )),
        // literal nodes carry their own triple; content literals are the
        // text of the owning node
        Term::LiteralNode { .. } | Term::ContentLiteral { .. } => None,
    }
}

fn subject_value(term: &Term) -> Option<String> {
    match term {
        Term::NamedNode { value } | Term::ResourceNode { value } => Some(value.clone()),
        Term::BlankNode { value } => Some(format!("[_:{value}]")),
        _ => None,
    }
}

fn container(markers: Vec<Fragment>, external: Vec<Fragment>) -> Option<Fragment> {
    if markers.is_empty() && external.is_empty() {
        return None;
    }
    let mut container = Fragment::element("span")
        .with_attr("style", "display: none")
        .with_attr(CONTAINER_ATTR, "true")
        .with_children(markers);
    if !external.is_empty() {
        container = container.with_child(
            Fragment::element("span")
                .with_attr(EXTERNAL_CONTAINER_ATTR, "true")
                .with_children(external),
        );
    }
    Some(container)
}

fn resource_form(attrs: &ResourceAttrs) -> Result<SerializedForm, Error> {
    let mut attributes = IndexMap::new();
    attributes.insert(NODE_ID_ATTR.to_string(), attrs.node_id.clone());
    attributes.insert(NODE_TYPE_ATTR.to_string(), "resource".to_string());
    attributes.insert("about".to_string(), attrs.subject.clone());
    attributes.insert(SUBJECT_ATTR.to_string(), attrs.subject.clone());
    attributes.insert(OUTGOING_ATTR.to_string(), to_json(&attrs.properties)?);
    attributes.insert(INCOMING_ATTR.to_string(), to_json(&attrs.backlinks)?);
    attributes.insert(EXTERNAL_ATTR.to_string(), to_json(&attrs.external_triples)?);

    let content_literals: Vec<&OutgoingTriple> = attrs
        .properties
        .iter()
        .filter(|p| matches!(p.object, Term::ContentLiteral { .. }))
        .collect();
    if let [only] = content_literals.as_slice() {
        attributes.insert("property".to_string(), only.predicate.clone());
        if let Term::ContentLiteral { datatype, language } = &only.object {
            set_opt(&mut attributes, "datatype", datatype.as_ref());
            set_opt(&mut attributes, "lang", language.as_ref());
        }
    }

    let mut markers: Vec<Fragment> = attrs
        .properties
        .iter()
        .filter_map(|p| triple_marker(&attrs.subject, &p.predicate, &p.object))
        .collect();
    markers.extend(attrs.backlinks.iter().filter_map(|b| {
        Some(
            marker()
                .with_attr("rev", b.predicate.as_str())
                .with_attr("resource", subject_value(&b.subject)?),
        )
    }));
    let external = attrs
        .external_triples
        .iter()
        .filter_map(|t| triple_marker(&subject_value(&t.subject)?, &t.predicate, &t.object))
        .collect();

    Ok(SerializedForm {
        attributes,
        container: container(markers, external),
    })
}

fn literal_form(attrs: &LiteralAttrs) -> Result<SerializedForm, Error> {
    let mut attributes = IndexMap::new();
    attributes.insert(NODE_ID_ATTR.to_string(), attrs.node_id.clone());
    attributes.insert(NODE_TYPE_ATTR.to_string(), "literal".to_string());
    attributes.insert(LITERAL_NODE_ATTR.to_string(), "true".to_string());
    attributes.insert(INCOMING_ATTR.to_string(), to_json(&attrs.backlinks)?);
    set_opt(&mut attributes, CONTENT_ATTR, attrs.content.as_ref());
    set_opt(&mut attributes, DATATYPE_ATTR, attrs.datatype.as_ref());
    set_opt(&mut attributes, LANGUAGE_ATTR, attrs.language.as_ref());

    let mut backlinks = attrs.backlinks.iter();
    if let Some(first) = backlinks.next() {
        if let Some(subject) = subject_value(&first.subject) {
            attributes.insert("about".to_string(), subject);
            attributes.insert("property".to_string(), first.predicate.clone());
        }
    }
    set_opt(&mut attributes, "datatype", attrs.datatype.as_ref());
    set_opt(&mut attributes, "lang", attrs.language.as_ref());
    set_opt(&mut attributes, "content", attrs.content.as_ref());

    // further backlinks can only be written out when the value is explicit
    let markers = match &attrs.content {
        Some(content) => backlinks
            .filter_map(|b| {
                Some(literal_marker(
                    &subject_value(&b.subject)?,
                    &b.predicate,
                    content,
                    attrs.datatype.as_ref(),
                    attrs.language.as_ref(),
                ))
            })
            .collect(),
        None => Vec::new(),
    };

    Ok(SerializedForm {
        attributes,
        container: container(markers, Vec::new()),
    })
}

pub fn attrs_to_serialized_form(attrs: &RdfaAttrs) -> Result<SerializedForm, Error> {
    match attrs {
        RdfaAttrs::Resource(resource) => resource_form(resource),
        RdfaAttrs::Literal(literal) => literal_form(literal),
    }
}

/// HTML parsing lowercases attribute names, so lookups ignore case.
fn lookup<'a>(attributes: &'a IndexMap<String, String>, name: &str) -> Option<&'a str> {
    attributes
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}

fn from_json<T: serde::de::DeserializeOwned + Default>(
    attributes: &IndexMap<String, String>,
    name: &str,
) -> Result<T, Error> {
    match lookup(attributes, name) {
        Some(json) if !json.trim().is_empty() => Ok(serde_json::from_str(json)?),
        _ => Ok(T::default()),
    }
}

pub(crate) fn fresh_node_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Rebuilds a role from wire attributes. Elements without a node type carry
/// no role.
pub fn serialized_form_to_attrs(
    attributes: &IndexMap<String, String>,
) -> Result<Option<RdfaAttrs>, Error> {
    let Some(node_type) = lookup(attributes, NODE_TYPE_ATTR) else {
        return Ok(None);
    };
    let node_id = lookup(attributes, NODE_ID_ATTR)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .unwrap_or_else(fresh_node_id);
    let backlinks: Vec<IncomingTriple> = from_json(attributes, INCOMING_ATTR)?;

    match node_type {
        "resource" => {
            let subject = lookup(attributes, SUBJECT_ATTR)
                .or_else(|| lookup(attributes, "about"))
                .ok_or_else(|| Error::MissingWireAttribute {
                    name: SUBJECT_ATTR.to_string(),
                })?;
            let properties: Vec<OutgoingTriple> = from_json(attributes, OUTGOING_ATTR)?;
            let external_triples: Vec<FullTriple> = from_json(attributes, EXTERNAL_ATTR)?;
            Ok(Some(RdfaAttrs::Resource(ResourceAttrs {
                node_id,
                subject: subject.to_string(),
                properties,
                backlinks,
                external_triples,
            })))
        }
        "literal" => Ok(Some(RdfaAttrs::Literal(LiteralAttrs {
            node_id,
            content: lookup(attributes, CONTENT_ATTR).map(str::to_string),
            datatype: lookup(attributes, DATATYPE_ATTR).map(str::to_string),
            language: lookup(attributes, LANGUAGE_ATTR).map(str::to_string),
            backlinks,
        }))),
        other => {
            tracing::warn!(node_type = other, "unknown RDFa node type, ignoring role");
            Ok(None)
        }
    }
}

/// Rewrites the managed attributes of an element from its role. Elements
/// without a role lose their wire attributes.
pub fn sync_element(element: &mut Element) -> Result<(), Error> {
    let form = element
        .rdfa
        .as_ref()
        .map(attrs_to_serialized_form)
        .transpose()?;
    element
        .attrs
        .retain(|key, _| !MANAGED_ATTRS.iter().any(|m| m.eq_ignore_ascii_case(key)));
    if let Some(form) = form {
        element.attrs.extend(form.attributes);
    }
    Ok(())
}

/// Whether an element is the hidden container written for a role.
pub fn is_container(element: &Element) -> bool {
    element.attrs.contains_key(CONTAINER_ATTR)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn resource() -> RdfaAttrs {
        let mut attrs = ResourceAttrs::new("n1", "http://ex/a");
        attrs.properties = vec![
            OutgoingTriple::new(
                "http://ex/name",
                Term::ContentLiteral {
                    datatype: None,
                    language: Some("en".into()),
                },
            ),
            OutgoingTriple::new("http://ex/knows", Term::resource_node("http://ex/b")),
            OutgoingTriple::new("http://ex/age", Term::literal("42")),
            OutgoingTriple::new("http://ex/title", Term::literal_node("n9")),
        ];
        attrs.backlinks = vec![IncomingTriple::new(
            Term::resource_node("http://ex/c"),
            "http://ex/knows",
        )];
        attrs.external_triples = vec![FullTriple {
            subject: Term::named("http://other/x"),
            predicate: "http://ex/p".into(),
            object: Term::BlankNode { value: "b0".into() },
        }];
        RdfaAttrs::Resource(attrs)
    }

    fn literal() -> RdfaAttrs {
        let mut attrs = LiteralAttrs::new("n9");
        attrs.datatype = Some("http://www.w3.org/2001/XMLSchema#string".into());
        attrs.backlinks = vec![IncomingTriple::new(
            Term::resource_node("http://ex/a"),
            "http://ex/title",
        )];
        RdfaAttrs::Literal(attrs)
    }

    #[test]
    fn round_trips_every_term_type() {
        for attrs in [resource(), literal()] {
            let form = attrs_to_serialized_form(&attrs).unwrap();
            assert_eq!(
                serialized_form_to_attrs(&form.attributes).unwrap(),
                Some(attrs)
            );
        }
    }

    #[test]
    fn single_content_literal_is_native() {
        let form = attrs_to_serialized_form(&resource()).unwrap();
        assert_eq!(form.attributes.get("about").unwrap(), "http://ex/a");
        assert_eq!(form.attributes.get("property").unwrap(), "http://ex/name");
        assert_eq!(form.attributes.get("lang").unwrap(), "en");
    }

    #[test]
    fn container_holds_one_marker_per_remaining_triple() {
        let form = attrs_to_serialized_form(&resource()).unwrap();
        let container = form.container.unwrap();
        assert_eq!(container.as_element().unwrap().attr(CONTAINER_ATTR), Some("true"));
        let children = container.children();
        // knows, age, one backlink, then the external container
        assert_eq!(children.len(), 4);
        let knows = children[0].as_element().unwrap();
        assert_eq!(knows.attr("resource"), Some("http://ex/b"));
        let age = children[1].as_element().unwrap();
        assert_eq!(age.attr("content"), Some("42"));
        let backlink = children[2].as_element().unwrap();
        assert_eq!(backlink.attr("rev"), Some("http://ex/knows"));
        assert_eq!(backlink.attr("resource"), Some("http://ex/c"));
        let external = &children[3];
        assert!(external.as_element().unwrap().has_attr(EXTERNAL_CONTAINER_ATTR));
        assert_eq!(
            external.children()[0].as_element().unwrap().attr("resource"),
            Some("[_:b0]")
        );
    }

    #[test]
    fn literal_uses_first_backlink_natively() {
        let form = attrs_to_serialized_form(&literal()).unwrap();
        assert_eq!(form.attributes.get("about").unwrap(), "http://ex/a");
        assert_eq!(form.attributes.get("property").unwrap(), "http://ex/title");
        assert!(form.container.is_none());
    }

    #[test]
    fn missing_id_is_generated() {
        let mut attributes = attrs_to_serialized_form(&literal()).unwrap().attributes;
        attributes.shift_remove(NODE_ID_ATTR);
        let attrs = serialized_form_to_attrs(&attributes).unwrap().unwrap();
        assert!(!attrs.node_id().is_empty());
        assert_ne!(attrs.node_id(), "n9");
    }

    #[test]
    fn lookup_ignores_case() {
        let mut attributes = attrs_to_serialized_form(&literal()).unwrap().attributes;
        let id = attributes.shift_remove(NODE_ID_ATTR).unwrap();
        attributes.insert(NODE_ID_ATTR.to_lowercase(), id);
        let attrs = serialized_form_to_attrs(&attributes).unwrap().unwrap();
        assert_eq!(attrs.node_id(), "n9");
    }

    #[test]
    fn sync_replaces_managed_attributes_only() {
        let mut element = Element::new("div")
            .with_attr("class", "card")
            .with_attr("about", "http://stale");
        element.rdfa = Some(resource());
        sync_element(&mut element).unwrap();
        assert_eq!(element.attr("class"), Some("card"));
        assert_eq!(element.attr("about"), Some("http://ex/a"));

        element.rdfa = None;
        sync_element(&mut element).unwrap();
        assert_eq!(element.attrs.len(), 1);
    }
}
