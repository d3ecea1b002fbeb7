//! Vocabulary constants, the initial RDFa context and processor-graph
//! reporting.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use curie::PrefixMapping;
use icu::locale::LanguageIdentifier;
use oxrdf::{Graph, NamedNode, TripleRef};

pub(crate) mod dc_vocab {
    pub static DESCRIPTION: oxrdf::NamedNodeRef =
        oxrdf::NamedNodeRef::new_unchecked("http://purl.org/dc/terms/description");
}

pub(crate) mod xhv_vocab {
    pub static VOCAB: &str = "http://www.w3.org/1999/xhtml/vocab#";

    pub static ROLE: oxrdf::NamedNodeRef =
        oxrdf::NamedNodeRef::new_unchecked("http://www.w3.org/1999/xhtml/vocab#role");
}

pub(crate) mod rdfa_vocab {
    pub static COPY: oxrdf::NamedNodeRef =
        oxrdf::NamedNodeRef::new_unchecked("http://www.w3.org/ns/rdfa#copy");

    pub static PATTERN: oxrdf::NamedNodeRef =
        oxrdf::NamedNodeRef::new_unchecked("http://www.w3.org/ns/rdfa#Pattern");

    pub static ERROR: oxrdf::NamedNodeRef =
        oxrdf::NamedNodeRef::new_unchecked("http://www.w3.org/ns/rdfa#Error");

    pub static WARNING: oxrdf::NamedNodeRef =
        oxrdf::NamedNodeRef::new_unchecked("http://www.w3.org/ns/rdfa#Warning");

    pub static DOCUMENT_ERROR: oxrdf::NamedNodeRef =
        oxrdf::NamedNodeRef::new_unchecked("http://www.w3.org/ns/rdfa#DocumentError");

    pub static VOCAB_REFERENCE_ERROR: oxrdf::NamedNodeRef =
        oxrdf::NamedNodeRef::new_unchecked("http://www.w3.org/ns/rdfa#VocabReferenceError");

    pub static UNRESOLVED_CURIE: oxrdf::NamedNodeRef =
        oxrdf::NamedNodeRef::new_unchecked("http://www.w3.org/ns/rdfa#UnresolvedCurie");

    pub static UNRESOLVED_TERM: oxrdf::NamedNodeRef =
        oxrdf::NamedNodeRef::new_unchecked("http://www.w3.org/ns/rdfa#UnresolvedTerm");

    pub static PREFIX_REDEFINITION: oxrdf::NamedNodeRef =
        oxrdf::NamedNodeRef::new_unchecked("http://www.w3.org/ns/rdfa#PrefixRedefinition");

    pub static USES_VOCABULARY: oxrdf::NamedNodeRef =
        oxrdf::NamedNodeRef::new_unchecked("http://www.w3.org/ns/rdfa#usesVocabulary");
}

/// Classes of processor-graph entries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PGType {
    Error,
    Warning,
    DocumentError,
    VocabReferenceError,
    UnresolvedCurie,
    UnresolvedTerm,
    PrefixRedefinition,
}

impl From<PGType> for oxrdf::NamedNodeRef<'static> {
    fn from(val: PGType) -> Self {
        match val {
            PGType::Error => rdfa_vocab::ERROR,
            PGType::Warning => rdfa_vocab::WARNING,
            PGType::DocumentError => rdfa_vocab::DOCUMENT_ERROR,
            PGType::VocabReferenceError => rdfa_vocab::VOCAB_REFERENCE_ERROR,
            PGType::UnresolvedCurie => rdfa_vocab::UNRESOLVED_CURIE,
            PGType::UnresolvedTerm => rdfa_vocab::UNRESOLVED_TERM,
            PGType::PrefixRedefinition => rdfa_vocab::PREFIX_REDEFINITION,
        }
    }
}

/// Records a processor message as a fresh blank node typed with `pg_type`
/// and described by `msg`.
pub fn emit_processor(pg: &mut Graph, pg_type: PGType, msg: &str) {
    tracing::debug!(?pg_type, "{msg}");
    let subject = oxrdf::BlankNode::default();
    let class: oxrdf::NamedNodeRef = pg_type.into();
    pg.insert(TripleRef::new(&subject, oxrdf::vocab::rdf::TYPE, class));
    pg.insert(TripleRef::new(
        &subject,
        dc_vocab::DESCRIPTION,
        oxrdf::LiteralRef::new_simple_literal(msg),
    ));
}

pub(crate) trait HostLanguage {
    fn default_language(&self) -> Option<LanguageIdentifier>;
    fn default_vocabulary(&self) -> Option<NamedNode>;
}

/// HTML+RDFa: no default vocabulary, no default language, and an
/// additional initial context that is currently empty.
pub(crate) struct HtmlHost;

impl HostLanguage for HtmlHost {
    fn default_vocabulary(&self) -> Option<NamedNode> {
        None
    }

    fn default_language(&self) -> Option<LanguageIdentifier> {
        None
    }
}

/// Terms of the RDFa 1.1 initial context.
pub fn initial_context_terms() -> &'static BTreeMap<String, NamedNode> {
    static TERMS: OnceLock<BTreeMap<String, NamedNode>> = OnceLock::new();
    TERMS.get_or_init(|| {
        [
            ("describedBy", "http://www.w3.org/2007/05/powder-s#describedby"),
            ("license", "http://www.w3.org/1999/xhtml/vocab#license"),
            ("role", "http://www.w3.org/1999/xhtml/vocab#role"),
        ]
        .into_iter()
        .map(|(term, iri)| (term.to_string(), NamedNode::new_unchecked(iri)))
        .collect()
    })
}

/// Prefixes of the RDFa 1.1 initial context.
pub fn initial_context_prefixes() -> &'static PrefixMapping {
    static PREFIXES: OnceLock<PrefixMapping> = OnceLock::new();
    PREFIXES.get_or_init(|| {
        let mut mapping = PrefixMapping::default();
        for (prefix, iri) in [
            ("", "http://www.w3.org/1999/xhtml/vocab#"),
            ("as", "https://www.w3.org/ns/activitystreams#"),
            ("csvw", "http://www.w3.org/ns/csvw#"),
            ("dcat", "http://www.w3.org/ns/dcat#"),
            ("dqv", "http://www.w3.org/ns/dqv#"),
            ("duv", "http://www.w3.org/ns/duv#"),
            ("grddl", "http://www.w3.org/2003/g/data-view#"),
            ("jsonld", "http://json-ld.org/vocab#"),
            ("ma", "http://www.w3.org/ns/ma-ont#"),
            ("org", "http://www.w3.org/ns/org#"),
            ("owl", "http://www.w3.org/2002/07/owl#"),
            ("prov", "http://www.w3.org/ns/prov#"),
            ("qb", "http://purl.org/linked-data/cube#"),
            ("rdf", "http://www.w3.org/1999/02/22-rdf-syntax-ns#"),
            ("rdfa", "http://www.w3.org/ns/rdfa#"),
            ("rdfs", "http://www.w3.org/2000/01/rdf-schema#"),
            ("rif", "http://www.w3.org/2007/rif#"),
            ("rr", "http://www.w3.org/ns/r2rml#"),
            ("sd", "http://www.w3.org/ns/sparql-service-description#"),
            ("skos", "http://www.w3.org/2004/02/skos/core#"),
            ("skosxl", "http://www.w3.org/2008/05/skos-xl#"),
            ("sosa", "http://www.w3.org/ns/sosa/"),
            ("ssn", "http://www.w3.org/ns/ssn/"),
            ("time", "http://www.w3.org/2006/time#"),
            ("void", "http://rdfs.org/ns/void#"),
            ("wdr", "http://www.w3.org/2007/05/powder#"),
            ("wdrs", "http://www.w3.org/2007/05/powder-s#"),
            ("xhv", "http://www.w3.org/1999/xhtml/vocab#"),
            ("xml", "http://www.w3.org/XML/1998/namespace"),
            ("xsd", "http://www.w3.org/2001/XMLSchema#"),
            ("cc", "http://creativecommons.org/ns#"),
            ("ctag", "http://commontag.org/ns#"),
            ("dc", "http://purl.org/dc/terms/"),
            ("dc11", "http://purl.org/dc/elements/1.1/"),
            ("dcterms", "http://purl.org/dc/terms/"),
            ("foaf", "http://xmlns.com/foaf/0.1/"),
            ("gr", "http://purl.org/goodrelations/v1#"),
            ("ical", "http://www.w3.org/2002/12/cal/icaltzd#"),
            ("og", "http://ogp.me/ns#"),
            ("rev", "http://purl.org/stuff/rev#"),
            ("schema", "http://schema.org/"),
            ("schemas", "https://schema.org/"),
            ("sioc", "http://rdfs.org/sioc/ns#"),
            ("v", "http://rdf.data-vocabulary.org/#"),
            ("vcard", "http://www.w3.org/2006/vcard/ns#"),
        ] {
            // none of these prefixes is the reserved `_`
            let _ = mapping.add_prefix(prefix, iri);
        }
        mapping
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn processor_entries_are_typed_and_described() {
        let mut pg = Graph::new();
        emit_processor(&mut pg, PGType::UnresolvedCurie, "no such prefix");
        assert_eq!(pg.len(), 2);
        assert_eq!(
            pg.triples_for_object(rdfa_vocab::UNRESOLVED_CURIE).count(),
            1
        );
    }

    #[test]
    fn initial_context_knows_common_prefixes() {
        let schema = initial_context_prefixes()
            .mappings()
            .find(|(prefix, _)| *prefix == "schema")
            .map(|(_, iri)| iri.to_string());
        assert_eq!(schema.as_deref(), Some("http://schema.org/"));
        assert!(initial_context_terms().contains_key("license"));
    }
}
