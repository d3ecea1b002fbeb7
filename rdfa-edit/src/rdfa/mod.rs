//! RDFa roles on document nodes and extraction of the document's graph.

pub mod attrs;
pub mod context;
pub mod copy;
pub mod index;
pub(crate) mod processor;
pub mod projection;

use std::collections::HashMap;

use oxiri::Iri;

use crate::Error;
use crate::config::ProcessorOptions;
use crate::model::{Document, Fragment, NodeId};

pub use attrs::{
    FullTriple, IncomingTriple, LiteralAttrs, OutgoingTriple, RdfaAttrs, ResourceAttrs, Term,
};
pub use context::{PGType, initial_context_prefixes, initial_context_terms};
pub use index::RdfaGraph;
pub use projection::{SerializedForm, attrs_to_serialized_form, serialized_form_to_attrs};

use processor::{RdfaProcessor, Source};

fn document_base(doc: &Document, options: &ProcessorOptions) -> Result<Iri<String>, Error> {
    let base_href = doc.descendants(doc.root()).find_map(|id| {
        let el = doc.element(id)?;
        (el.tag == "base").then(|| el.attr("href")).flatten()
    });
    let base = base_href.unwrap_or(options.base.as_str());
    if let Some(href) = base_href {
        tracing::trace!(%href, "<base> found");
    }
    Iri::parse(base.to_string()).map_err(|source| Error::IriParseError {
        source,
        iri: base.to_string(),
    })
}

/// Extracts the graph of `doc` and indexes every triple against the node
/// that produced it.
///
/// Problems with the document itself end up in the processor graph; only
/// internal inconsistencies are returned as errors.
pub fn extract(doc: &Document, options: &ProcessorOptions) -> Result<RdfaGraph, Error> {
    let mut containers: HashMap<NodeId, Fragment> = HashMap::new();
    for id in doc.rdfa_nodes() {
        let Some(rdfa) = doc.element(id).and_then(|el| el.rdfa.as_ref()) else {
            continue;
        };
        if let Some(container) = attrs_to_serialized_form(rdfa)?.container {
            containers.insert(id, container);
        }
    }

    let processor = RdfaProcessor::new(Source::new(doc, &containers), options);
    let outcome = document_base(doc, options).and_then(|base| processor.run(doc.root(), base));
    match outcome {
        Ok(()) => {}
        Err(err @ Error::Internal { .. }) => return Err(err),
        Err(err) => processor.warn(PGType::DocumentError, &err.to_string()),
    }

    let mut output = processor.finish();
    if options.pattern_copying {
        let (graph, processor_graph) = output.graphs_mut();
        copy::property_copying(graph, processor_graph);
    }
    Ok(output)
}
