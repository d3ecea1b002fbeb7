//! The RDFa role a document node can carry.

use serde::{Deserialize, Serialize};

/// A triple object (or backlink subject) as stored in the wire format.
///
/// `ResourceNode` and `LiteralNode` bridge into the document: the first
/// names a subject defined by some resource node, the second the stable id
/// of a literal node. `ContentLiteral` stands for the text of the node that
/// holds the triple.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "termType")]
pub enum Term {
    NamedNode {
        value: String,
    },
    BlankNode {
        value: String,
    },
    Literal {
        value: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        datatype: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        language: Option<String>,
    },
    ResourceNode {
        value: String,
    },
    LiteralNode {
        value: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        datatype: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        language: Option<String>,
    },
    ContentLiteral {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        datatype: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        language: Option<String>,
    },
}

impl Term {
    pub fn named(value: impl Into<String>) -> Self {
        Term::NamedNode {
            value: value.into(),
        }
    }

    pub fn literal(value: impl Into<String>) -> Self {
        Term::Literal {
            value: value.into(),
            datatype: None,
            language: None,
        }
    }

    pub fn resource_node(subject: impl Into<String>) -> Self {
        Term::ResourceNode {
            value: subject.into(),
        }
    }

    pub fn literal_node(node_id: impl Into<String>) -> Self {
        Term::LiteralNode {
            value: node_id.into(),
            datatype: None,
            language: None,
        }
    }

    /// Whether this term points at another node of the document.
    pub fn is_link(&self) -> bool {
        matches!(self, Term::ResourceNode { .. } | Term::LiteralNode { .. })
    }

    pub fn value(&self) -> Option<&str> {
        match self {
            Term::NamedNode { value }
            | Term::BlankNode { value }
            | Term::Literal { value, .. }
            | Term::ResourceNode { value }
            | Term::LiteralNode { value, .. } => Some(value),
            Term::ContentLiteral { .. } => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OutgoingTriple {
    pub predicate: String,
    pub object: Term,
}

impl OutgoingTriple {
    pub fn new(predicate: impl Into<String>, object: Term) -> Self {
        Self {
            predicate: predicate.into(),
            object,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IncomingTriple {
    pub subject: Term,
    pub predicate: String,
}

impl IncomingTriple {
    pub fn new(subject: Term, predicate: impl Into<String>) -> Self {
        Self {
            subject,
            predicate: predicate.into(),
        }
    }
}

/// A triple imported from another document, kept verbatim.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FullTriple {
    pub subject: Term,
    pub predicate: String,
    pub object: Term,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResourceAttrs {
    pub node_id: String,
    pub subject: String,
    pub properties: Vec<OutgoingTriple>,
    pub backlinks: Vec<IncomingTriple>,
    pub external_triples: Vec<FullTriple>,
}

impl ResourceAttrs {
    pub fn new(node_id: impl Into<String>, subject: impl Into<String>) -> Self {
        Self {
            node_id: node_id.into(),
            subject: subject.into(),
            properties: Vec::new(),
            backlinks: Vec::new(),
            external_triples: Vec::new(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LiteralAttrs {
    pub node_id: String,
    /// Explicit value; when absent the node's text is the value.
    pub content: Option<String>,
    pub datatype: Option<String>,
    pub language: Option<String>,
    pub backlinks: Vec<IncomingTriple>,
}

impl LiteralAttrs {
    pub fn new(node_id: impl Into<String>) -> Self {
        Self {
            node_id: node_id.into(),
            content: None,
            datatype: None,
            language: None,
            backlinks: Vec::new(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RdfaAttrs {
    Resource(ResourceAttrs),
    Literal(LiteralAttrs),
}

impl RdfaAttrs {
    pub fn node_id(&self) -> &str {
        match self {
            RdfaAttrs::Resource(r) => &r.node_id,
            RdfaAttrs::Literal(l) => &l.node_id,
        }
    }

    pub fn subject(&self) -> Option<&str> {
        match self {
            RdfaAttrs::Resource(r) => Some(&r.subject),
            RdfaAttrs::Literal(_) => None,
        }
    }

    pub fn as_resource(&self) -> Option<&ResourceAttrs> {
        match self {
            RdfaAttrs::Resource(r) => Some(r),
            RdfaAttrs::Literal(_) => None,
        }
    }

    pub fn as_resource_mut(&mut self) -> Option<&mut ResourceAttrs> {
        match self {
            RdfaAttrs::Resource(r) => Some(r),
            RdfaAttrs::Literal(_) => None,
        }
    }

    pub fn backlinks(&self) -> &[IncomingTriple] {
        match self {
            RdfaAttrs::Resource(r) => &r.backlinks,
            RdfaAttrs::Literal(l) => &l.backlinks,
        }
    }

    pub fn backlinks_mut(&mut self) -> &mut Vec<IncomingTriple> {
        match self {
            RdfaAttrs::Resource(r) => &mut r.backlinks,
            RdfaAttrs::Literal(l) => &mut l.backlinks,
        }
    }

    pub fn node_type(&self) -> &'static str {
        match self {
            RdfaAttrs::Resource(_) => "resource",
            RdfaAttrs::Literal(_) => "literal",
        }
    }

    /// Whether this node is what `term` points at.
    pub fn is_target_of(&self, term: &Term) -> bool {
        match (self, term) {
            (RdfaAttrs::Resource(r), Term::ResourceNode { value }) => r.subject == *value,
            (RdfaAttrs::Literal(l), Term::LiteralNode { value, .. }) => l.node_id == *value,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn terms_are_tagged_by_term_type() {
        let json = serde_json::to_string(&vec![
            OutgoingTriple::new("http://ex/p", Term::named("http://ex/o")),
            OutgoingTriple::new(
                "http://ex/q",
                Term::ContentLiteral {
                    datatype: None,
                    language: Some("en".into()),
                },
            ),
        ])
        .unwrap();
        assert_eq!(
            json,
            r#"[{"predicate":"http://ex/p","object":{"termType":"NamedNode","value":"http://ex/o"}},{"predicate":"http://ex/q","object":{"termType":"ContentLiteral","language":"en"}}]"#
        );
    }

    #[test]
    fn link_targets() {
        let resource = RdfaAttrs::Resource(ResourceAttrs::new("r1", "http://ex/b"));
        let literal = RdfaAttrs::Literal(LiteralAttrs::new("l1"));
        assert!(resource.is_target_of(&Term::resource_node("http://ex/b")));
        assert!(!resource.is_target_of(&Term::named("http://ex/b")));
        assert!(literal.is_target_of(&Term::literal_node("l1")));
        assert!(!literal.is_target_of(&Term::literal_node("l2")));
    }
}
