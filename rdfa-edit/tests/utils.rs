use std::collections::HashSet;

use itertools::Itertools;
use oxrdf::Graph;
use rdfa_edit::{Document, NodeId};

pub const BASE: &str = "http://example.org/";

/// Canonical Turtle for `graph`: blank nodes relabelled, known prefixes
/// declared and triples sorted with `a` first.
#[allow(unused)]
pub fn serialize_graph(graph: Graph, base: &str) -> String {
    // rdf_canon rather than oxrdf, whose canonicalization hangs on some inputs
    let idents = rdf_canon::issue_graph_with::<sha2::Sha256>(&graph, &Default::default()).unwrap();
    let graph = rdf_canon::relabel_graph(&graph, &idents).unwrap();

    let mut prefixes = HashSet::new();
    let mut note = |full_iri: &str| {
        if let Some(found) = rdfa_edit::initial_context_prefixes()
            .mappings()
            .find(|(prefix, iri)| !prefix.is_empty() && full_iri.starts_with(*iri))
        {
            prefixes.insert(found);
        }
    };
    for triple in graph.iter() {
        if let oxrdf::SubjectRef::NamedNode(n) = triple.subject {
            note(n.as_str());
        }
        note(triple.predicate.as_str());
        match triple.object {
            oxrdf::TermRef::NamedNode(n) => note(n.as_str()),
            oxrdf::TermRef::Literal(l) if !l.is_plain() => note(l.datatype().as_str()),
            _ => {}
        }
    }

    let mut serializer = oxttl::TurtleSerializer::new().with_base_iri(base).unwrap();
    for (prefix, iri) in prefixes {
        serializer = serializer.with_prefix(prefix, iri).unwrap();
    }

    let mut output = Vec::new();
    let mut writer = serializer.for_writer(&mut output);
    for triple in graph.iter().sorted_by_cached_key(|t| {
        (
            t.subject.to_string(),
            (t.predicate.as_str() != "http://www.w3.org/1999/02/22-rdf-syntax-ns#type")
                .then(|| t.predicate.to_string()),
            t.object.to_string(),
        )
    }) {
        writer.serialize_triple(triple).unwrap();
    }
    writer.finish().unwrap();

    String::from_utf8_lossy(&output).into_owned()
}

fn turtle_graph(ttl: &str) -> Graph {
    let mut graph = Graph::new();
    for triple in oxttl::TurtleParser::new()
        .with_base_iri(BASE)
        .unwrap()
        .for_slice(ttl.as_bytes())
    {
        graph.insert(&triple.unwrap());
    }
    graph
}

/// Extracts `html` with pattern copying and compares the result against
/// the Turtle in `ttl`.
#[allow(unused)]
pub fn assert_graph(html: &str, ttl: &str) {
    let mut output_graph = Graph::new();
    let mut processor_graph = Graph::new();
    let base = oxiri::Iri::parse(BASE.to_string()).unwrap();
    rdfa_edit::process(html, base, &mut output_graph, &mut processor_graph).unwrap();

    pretty_assertions::assert_eq!(
        serialize_graph(output_graph, BASE),
        serialize_graph(turtle_graph(ttl), BASE)
    );
}

/// The first element with `tag`, in document order.
#[allow(unused)]
pub fn find_tag(doc: &Document, tag: &str) -> NodeId {
    doc.descendants(doc.root())
        .find(|&id| doc.element(id).is_some_and(|e| e.tag == tag))
        .unwrap_or_else(|| panic!("no <{tag}> in document"))
}
