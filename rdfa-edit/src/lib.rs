//! A rich-text document model whose content carries RDFa, kept consistent
//! with the RDF graph it expresses while it is edited.

use oxiri::Iri;
use oxrdf::Graph;

pub mod commands;
pub mod config;
pub mod editor;
pub mod events;
pub mod mapping;
pub mod model;
pub mod operations;
pub mod position;
pub mod rdfa;
pub mod sanitize;
pub mod transaction;
pub mod update;

pub use config::{EditorConfig, ProcessorOptions};
pub use editor::Editor;
pub use model::{Document, Element, Fragment, Mark, MarkSet, NodeId, Text};
pub use position::{Position, Range};
pub use rdfa::{RdfaGraph, extract, initial_context_prefixes, initial_context_terms};

#[derive(derive_more::Error, derive_more::Display, derive_more::From, Debug)]
pub enum Error {
    #[display("IRI parse error: `{iri}`")]
    IriParseError {
        source: oxiri::IriParseError,
        iri: String,
    },

    #[display("Invalid language tag")]
    LanguageIdentifierError(icu::locale::ParseError),

    #[display("Malformed wire attribute")]
    WireFormat(serde_json::Error),

    #[display("Missing wire attribute `{name}`")]
    #[from(skip)]
    MissingWireAttribute { name: String },

    #[display("Invalid regex `{pattern}`")]
    #[from(skip)]
    InvalidRegex {
        source: regex::Error,
        pattern: String,
    },

    #[display("No node {node}")]
    #[from(skip)]
    NodeNotFound { node: NodeId },

    #[display("Node {node} is not an element")]
    #[from(skip)]
    NotAnElement { node: NodeId },

    #[display("Node {node} is not a text node")]
    #[from(skip)]
    NotText { node: NodeId },

    #[display("Node {node} has no parent")]
    #[from(skip)]
    NoParent { node: NodeId },

    #[display("Node {node} is already attached")]
    #[from(skip)]
    NodeAttached { node: NodeId },

    #[display("Inserting {node} would make it its own ancestor")]
    #[from(skip)]
    CyclicInsertion { node: NodeId },

    #[display("Child index {index} out of bounds for {node}")]
    #[from(skip)]
    ChildIndexOutOfBounds { node: NodeId, index: usize },

    #[display("Offset {offset} out of bounds for text node {node}")]
    #[from(skip)]
    TextOffsetOutOfBounds { node: NodeId, offset: usize },

    #[display("Cannot split inside non-splittable element {node}")]
    #[from(skip)]
    NotSplittable { node: NodeId },

    #[display("Position {offset} is outside a root of size {size}")]
    #[from(skip)]
    PositionOutOfBounds { offset: usize, size: usize },

    #[display("Invalid path {path:?}")]
    #[from(skip)]
    InvalidPath { path: Vec<usize> },

    #[display("Positions belong to different roots")]
    #[from(skip)]
    DifferentRoots,

    #[display("Cannot move {start}..{end} to {target}, which lies inside it")]
    #[from(skip)]
    MoveIntoSelf {
        start: usize,
        end: usize,
        target: usize,
    },

    #[display("Internal error: {message}")]
    #[from(skip)]
    Internal { message: String },
}

fn run(
    input: &str,
    base: Iri<String>,
    pattern_copying: bool,
    output_graph: &mut Graph,
    processor_graph: &mut Graph,
) -> Result<(), Error> {
    let options = ProcessorOptions {
        base: base.into_inner(),
        pattern_copying,
        ..ProcessorOptions::default()
    };
    let doc = Document::from_html(input)?;
    let (graph, pg) = extract(&doc, &options)?.into_graphs();
    output_graph.extend(&graph);
    processor_graph.extend(&pg);
    Ok(())
}

/// Extracts the triples of an HTML+RDFa document, without property copying.
pub fn parse(
    input: &str,
    base: Iri<String>,
    output_graph: &mut Graph,
    processor_graph: &mut Graph,
) -> Result<(), Error> {
    run(input, base, false, output_graph, processor_graph)
}

/// Extracts the triples of an HTML+RDFa document, expanding `rdfa:copy`.
pub fn process(
    input: &str,
    base: Iri<String>,
    output_graph: &mut Graph,
    processor_graph: &mut Graph,
) -> Result<(), Error> {
    run(input, base, true, output_graph, processor_graph)
}
