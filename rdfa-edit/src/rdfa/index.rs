use indexmap::IndexMap;
use oxrdf::{Graph, NamedNode, NamedOrBlankNode, Term, Triple, TripleRef};

use crate::model::NodeId;

use super::context::{PGType, emit_processor};

/// The triples of a document together with the nodes that produced them.
///
/// Built in one pass by the processor and never patched afterwards: the
/// editor drops it on every content change and rebuilds it on demand.
#[derive(Clone, Debug, Default)]
pub struct RdfaGraph {
    graph: Graph,
    processor_graph: Graph,
    subject_nodes: IndexMap<NamedOrBlankNode, Vec<NodeId>>,
    node_subjects: IndexMap<NodeId, NamedOrBlankNode>,
    predicate_nodes: IndexMap<NamedNode, Vec<NodeId>>,
    object_nodes: IndexMap<Term, Vec<NodeId>>,
    content_nodes: IndexMap<Triple, NodeId>,
}

fn push_unique(list: &mut Vec<NodeId>, node: NodeId) {
    if !list.contains(&node) {
        list.push(node);
    }
}

impl RdfaGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn processor_graph(&self) -> &Graph {
        &self.processor_graph
    }

    pub fn into_graphs(self) -> (Graph, Graph) {
        (self.graph, self.processor_graph)
    }

    /// Nodes that define `subject`.
    pub fn nodes_for_subject(&self, subject: &NamedOrBlankNode) -> &[NodeId] {
        self.subject_nodes
            .get(subject)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn subject_of(&self, node: NodeId) -> Option<&NamedOrBlankNode> {
        self.node_subjects.get(&node)
    }

    /// Nodes that emitted at least one triple with `predicate`.
    pub fn nodes_for_predicate(&self, predicate: &NamedNode) -> &[NodeId] {
        self.predicate_nodes
            .get(predicate)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn nodes_for_object(&self, object: &Term) -> &[NodeId] {
        self.object_nodes
            .get(object)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// The node whose text is the literal object of `triple`.
    pub fn content_node(&self, triple: &Triple) -> Option<NodeId> {
        self.content_nodes.get(triple).copied()
    }

    pub fn subjects(&self) -> impl Iterator<Item = &NamedOrBlankNode> {
        self.subject_nodes.keys()
    }

    pub(crate) fn record_triple(&mut self, triple: TripleRef<'_>, node: NodeId) {
        tracing::trace!(%triple, %node, "emitting output triple");
        self.graph.insert(triple);
        push_unique(
            self.predicate_nodes
                .entry(triple.predicate.into_owned())
                .or_default(),
            node,
        );
        push_unique(
            self.object_nodes.entry(triple.object.into_owned()).or_default(),
            node,
        );
    }

    pub(crate) fn record_subject(&mut self, subject: &NamedOrBlankNode, node: NodeId) {
        push_unique(self.subject_nodes.entry(subject.clone()).or_default(), node);
        self.node_subjects.entry(node).or_insert_with(|| subject.clone());
    }

    pub(crate) fn record_content(&mut self, triple: TripleRef<'_>, node: NodeId) {
        self.content_nodes.insert(triple.into_owned(), node);
    }

    pub(crate) fn warn(&mut self, pg_type: PGType, msg: &str) {
        emit_processor(&mut self.processor_graph, pg_type, msg);
    }

    pub(crate) fn graphs_mut(&mut self) -> (&mut Graph, &mut Graph) {
        (&mut self.graph, &mut self.processor_graph)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxrdf::LiteralRef;

    #[test]
    fn records_are_deduplicated_per_node() {
        let mut index = RdfaGraph::new();
        let s = NamedNode::new_unchecked("http://ex/s");
        let p = NamedNode::new_unchecked("http://ex/p");
        let o = LiteralRef::new_simple_literal("o");
        let node = NodeId::from_index(3);
        index.record_subject(&s.clone().into(), node);
        index.record_triple(TripleRef::new(&s, &p, o), node);
        index.record_triple(TripleRef::new(&s, &p, o), node);
        assert_eq!(index.graph().len(), 1);
        assert_eq!(index.nodes_for_predicate(&p), &[node]);
        assert_eq!(index.nodes_for_subject(&s.clone().into()), &[node]);
        assert_eq!(index.subject_of(node), Some(&s.into()));
        assert!(index.nodes_for_object(&Term::from(o.into_owned())).contains(&node));
    }
}
