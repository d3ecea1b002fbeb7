//! `rdfa:copy` / `rdfa:Pattern` expansion, run after processing.

use std::collections::HashSet;

use oxrdf::vocab::rdf;
use oxrdf::{Graph, NamedOrBlankNodeRef, Subject, TermRef, Triple, TripleRef};

use super::context::{PGType, emit_processor, rdfa_vocab};

fn copy_target(object: TermRef<'_>) -> Option<NamedOrBlankNodeRef<'_>> {
    match object {
        TermRef::NamedNode(n) => Some(n.into()),
        TermRef::BlankNode(n) => Some(n.into()),
        TermRef::Literal(_) => None,
    }
}

/// Copies the properties of every referenced pattern onto the referencing
/// subject, then removes the patterns and the `rdfa:copy` triples.
///
/// Patterns may reference other patterns; each (subject, pattern) pair is
/// expanded at most once, so reference cycles terminate.
pub fn property_copying(graph: &mut Graph, processor_graph: &mut Graph) {
    let mut expanded: HashSet<(Subject, Subject)> = HashSet::new();

    loop {
        let mut new_triples = Vec::new();
        for copy_triple in graph.triples_for_predicate(rdfa_vocab::COPY) {
            let Some(target) = copy_target(copy_triple.object) else {
                continue;
            };
            if !graph.contains(TripleRef::new(target, rdf::TYPE, rdfa_vocab::PATTERN)) {
                continue;
            }
            let pair = (
                copy_triple.subject.into_owned(),
                Subject::from(target.into_owned()),
            );
            if !expanded.insert(pair) {
                continue;
            }

            for trip in graph.triples_for_subject(target) {
                new_triples.push(Triple::from(TripleRef::new(
                    copy_triple.subject,
                    trip.predicate,
                    trip.object,
                )));
            }
        }

        if new_triples.is_empty() {
            break;
        }
        for triple in &new_triples {
            graph.insert(triple);
        }
    }

    let mut to_remove = Graph::new();
    for copy_triple in graph.triples_for_predicate(rdfa_vocab::COPY) {
        to_remove.insert(copy_triple);
        let target = match copy_target(copy_triple.object) {
            Some(target) => target,
            None => {
                emit_processor(
                    processor_graph,
                    PGType::Warning,
                    &format!("rdfa:copy of {} points at a literal", copy_triple.subject),
                );
                continue;
            }
        };

        if !graph.contains(TripleRef::new(target, rdf::TYPE, rdfa_vocab::PATTERN)) {
            emit_processor(
                processor_graph,
                PGType::Warning,
                &format!("rdfa:copy target {target} is not an rdfa:Pattern"),
            );
            continue;
        }

        // the pattern's own type travels with the copy
        to_remove.insert(TripleRef::new(
            copy_triple.subject,
            rdf::TYPE,
            rdfa_vocab::PATTERN,
        ));
        for trip in graph.triples_for_subject(target) {
            to_remove.insert(trip);
        }
    }

    for triple in to_remove.iter() {
        graph.remove(triple);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxrdf::{LiteralRef, NamedNodeRef};

    const A: NamedNodeRef = NamedNodeRef::new_unchecked("http://ex/a");
    const P: NamedNodeRef = NamedNodeRef::new_unchecked("http://ex/p");
    const Q: NamedNodeRef = NamedNodeRef::new_unchecked("http://ex/q");
    const PAT: NamedNodeRef = NamedNodeRef::new_unchecked("http://ex/pat");
    const PAT2: NamedNodeRef = NamedNodeRef::new_unchecked("http://ex/pat2");

    #[test]
    fn pattern_properties_are_copied_and_pattern_removed() {
        let mut graph = Graph::new();
        let mut pg = Graph::new();
        graph.insert(TripleRef::new(A, rdfa_vocab::COPY, PAT));
        graph.insert(TripleRef::new(PAT, rdf::TYPE, rdfa_vocab::PATTERN));
        graph.insert(TripleRef::new(PAT, P, LiteralRef::new_simple_literal("v")));

        property_copying(&mut graph, &mut pg);

        assert!(graph.contains(TripleRef::new(A, P, LiteralRef::new_simple_literal("v"))));
        assert_eq!(graph.len(), 1);
        assert!(pg.is_empty());
    }

    #[test]
    fn cyclic_patterns_terminate() {
        let mut graph = Graph::new();
        let mut pg = Graph::new();
        graph.insert(TripleRef::new(A, rdfa_vocab::COPY, PAT));
        graph.insert(TripleRef::new(PAT, rdf::TYPE, rdfa_vocab::PATTERN));
        graph.insert(TripleRef::new(PAT, rdfa_vocab::COPY, PAT2));
        graph.insert(TripleRef::new(PAT2, rdf::TYPE, rdfa_vocab::PATTERN));
        graph.insert(TripleRef::new(PAT2, rdfa_vocab::COPY, PAT));
        graph.insert(TripleRef::new(PAT2, Q, LiteralRef::new_simple_literal("w")));

        property_copying(&mut graph, &mut pg);

        assert!(graph.contains(TripleRef::new(A, Q, LiteralRef::new_simple_literal("w"))));
        assert!(!graph.contains(TripleRef::new(A, rdfa_vocab::COPY, PAT)));
    }

    #[test]
    fn dangling_copy_is_reported() {
        let mut graph = Graph::new();
        let mut pg = Graph::new();
        graph.insert(TripleRef::new(A, rdfa_vocab::COPY, PAT));

        property_copying(&mut graph, &mut pg);

        assert!(graph.is_empty());
        assert_eq!(pg.triples_for_object(rdfa_vocab::WARNING).count(), 1);
    }
}
