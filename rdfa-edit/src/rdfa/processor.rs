//! RDFa Core 1.1 processing over the document tree.
//!
//! Elements are visited depth first with an explicit stack. Nodes carrying an
//! RDFa role contribute their hidden marker container as a virtual first
//! child, so triples that only live in the role still reach the graph and are
//! indexed against the owning node.

use std::borrow::Cow;
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;
use std::str::FromStr;

use curie::{Curie, ExpansionError, PrefixMapping};
use icu::locale::LanguageIdentifier;
use itertools::Itertools;
use oxiri::{Iri, IriParseError};
use oxrdf::vocab::{self, rdf};
use oxrdf::{NamedNode, NamedNodeRef, NamedOrBlankNode, TripleRef};
use vec1::{Size0Error, Vec1};

use crate::Error;
use crate::config::ProcessorOptions;
use crate::model::{Document, Element, Fragment, NodeId, html};

use super::context::{
    HostLanguage, HtmlHost, PGType, initial_context_prefixes, initial_context_terms, rdfa_vocab,
    xhv_vocab,
};
use super::index::RdfaGraph;

/// An element as seen by the processor: either a node of the document or a
/// marker inside the hidden container of `owner`.
#[derive(Clone, Copy, Debug)]
pub(crate) enum ElementView<'a> {
    Tree(NodeId),
    Marker { owner: NodeId, fragment: &'a Fragment },
}

impl ElementView<'_> {
    /// The document node triples from this element are indexed against.
    fn node(&self) -> NodeId {
        match self {
            ElementView::Tree(id) => *id,
            ElementView::Marker { owner, .. } => *owner,
        }
    }
}

pub(crate) struct Source<'a> {
    doc: &'a Document,
    containers: &'a HashMap<NodeId, Fragment>,
}

impl<'a> Source<'a> {
    pub(crate) fn new(doc: &'a Document, containers: &'a HashMap<NodeId, Fragment>) -> Self {
        Self { doc, containers }
    }

    fn element(&self, view: ElementView<'a>) -> Option<&'a Element> {
        match view {
            ElementView::Tree(id) => self.doc.element(id),
            ElementView::Marker { fragment, .. } => fragment.as_element(),
        }
    }

    fn children(&self, view: ElementView<'a>) -> Vec<ElementView<'a>> {
        match view {
            ElementView::Tree(id) => {
                let mut out = Vec::new();
                if let Some(container) = self.containers.get(&id) {
                    out.push(ElementView::Marker {
                        owner: id,
                        fragment: container,
                    });
                }
                out.extend(
                    self.doc
                        .children(id)
                        .iter()
                        .filter(|&&c| self.doc.element(c).is_some())
                        .map(|&c| ElementView::Tree(c)),
                );
                out
            }
            ElementView::Marker { owner, fragment } => fragment
                .children()
                .iter()
                .filter(|f| f.as_element().is_some())
                .map(|f| ElementView::Marker { owner, fragment: f })
                .collect(),
        }
    }

    fn text(&self, view: ElementView<'a>) -> String {
        match view {
            ElementView::Tree(id) => self.doc.text_content(id),
            ElementView::Marker { fragment, .. } => fragment.text_content(),
        }
    }

    fn inner_html(&self, view: ElementView<'a>) -> String {
        match view {
            ElementView::Tree(id) => html::plain_inner_html(self.doc, id),
            ElementView::Marker { fragment, .. } => fragment
                .children()
                .iter()
                .map(html::fragment_to_html)
                .join(""),
        }
    }
}

type SharedList = RefCell<Vec<Rc<oxrdf::Term>>>;

#[derive(Default, Clone)]
struct ListMapping {
    lists: BTreeMap<NamedNode, Rc<SharedList>>,
}

impl ListMapping {
    fn ensure_list(&mut self, predicate: &NamedNode) -> Rc<SharedList> {
        self.lists
            .entry(predicate.clone())
            .or_insert_with(|| {
                tracing::trace!(%predicate, "created new list");
                Default::default()
            })
            .clone()
    }

    fn insert_value(&mut self, predicate: NamedNode, term: Rc<oxrdf::Term>) {
        tracing::trace!(%predicate, %term, "inserting into list");
        self.lists
            .entry(predicate)
            .or_default()
            .borrow_mut()
            .push(term);
    }
}

enum Attr<T> {
    Missing,
    Empty,
    Value(T),
}

impl<T> Attr<T> {
    fn map<U>(self, f: impl FnOnce(T) -> U) -> Attr<U> {
        match self {
            Attr::Missing => Attr::Missing,
            Attr::Empty => Attr::Empty,
            Attr::Value(v) => Attr::Value(f(v)),
        }
    }

    fn is_present(&self) -> bool {
        !matches!(self, Attr::Missing)
    }

    fn value(&self) -> Option<&T> {
        match self {
            Attr::Value(v) => Some(v),
            Attr::Missing | Attr::Empty => None,
        }
    }

    fn into_value(self) -> Option<T> {
        match self {
            Attr::Value(v) => Some(v),
            Attr::Missing | Attr::Empty => None,
        }
    }
}

/// What an element hands down to its children.
#[derive(Clone)]
struct EvaluationContext {
    /// Stands in for `[_:]`, which RDFa allows but oxrdf cannot name.
    empty_bnode: oxrdf::BlankNode,
    base: Iri<String>,
    parent_subject: Rc<NamedOrBlankNode>,
    /// `None` only for the root element.
    parent_object: Option<Rc<NamedOrBlankNode>>,
    iri_mappings: Rc<PrefixMapping>,
    incomplete_triples: Vec<IncompleteTriple>,
    list_mapping: Rc<RefCell<ListMapping>>,
    language: Option<Rc<LanguageIdentifier>>,
    term_mappings: Rc<BTreeMap<String, NamedNode>>,
    default_vocab: Option<NamedNode>,
}

impl EvaluationContext {
    fn new(base: Iri<String>) -> Result<Self, Error> {
        // the base without its fragment doubles as the empty CURIE
        let resolved = base.resolve("").map_err(|source| Error::IriParseError {
            source,
            iri: base.to_string(),
        })?;

        Ok(Self {
            empty_bnode: oxrdf::BlankNode::default(),
            base: resolved,
            parent_subject: Rc::new(NamedNode::new_unchecked(base.into_inner()).into()),
            parent_object: None,
            iri_mappings: Rc::new(initial_context_prefixes().clone()),
            incomplete_triples: Vec::new(),
            list_mapping: Default::default(),
            language: None,
            term_mappings: Rc::new(initial_context_terms().clone()),
            default_vocab: None,
        })
    }
}

/// Values local to the processing of one element.
#[derive(Clone)]
struct LocalScope<'a> {
    emit_warning: &'a dyn Fn(PGType, String),
    eval_context: &'a EvaluationContext,
    iri_mappings: Rc<PrefixMapping>,
    incomplete_triples: Vec<IncompleteTriple>,
    current_language: Option<Rc<LanguageIdentifier>>,
    skip_element: bool,
    new_subject: Option<Rc<NamedOrBlankNode>>,
    current_object_resource: Option<Rc<NamedOrBlankNode>>,
    typed_resource: Option<Rc<NamedOrBlankNode>>,
    term_mappings: Rc<BTreeMap<String, NamedNode>>,
    list_mappings: Rc<RefCell<ListMapping>>,
    default_vocab: Option<NamedNode>,
}

enum CurieError {
    EmptyCurie,
    InvalidIri(String),
    InvalidBlankNode(String),
    Expansion(ExpansionError),
}

struct NotCurie;
struct NotTerm;

impl<'a> LocalScope<'a> {
    fn new(eval_context: &'a EvaluationContext, emit_warning: &'a dyn Fn(PGType, String)) -> Self {
        Self {
            emit_warning,
            eval_context,
            skip_element: false,
            new_subject: None,
            current_object_resource: None,
            typed_resource: None,
            iri_mappings: eval_context.iri_mappings.clone(),
            incomplete_triples: Vec::new(),
            list_mappings: eval_context.list_mapping.clone(),
            current_language: eval_context.language.clone(),
            term_mappings: eval_context.term_mappings.clone(),
            default_vocab: eval_context.default_vocab.clone(),
        }
    }

    fn warn(&self, pg_type: PGType, msg: String) {
        (self.emit_warning)(pg_type, msg)
    }

    fn empty_curie(&self) -> NamedNodeRef<'_> {
        NamedNodeRef::new_unchecked(self.eval_context.base.as_str())
    }

    /// `Ok(None)` means the value is a term that must be ignored.
    fn resolve_term(&self, term: &str) -> Result<Option<NamedNode>, NotTerm> {
        // an NCName that also permits non-leading slashes
        let is_term = !term.is_empty()
            && !term.starts_with('/')
            && term
                .split('/')
                .all(|s| rxml_validation::validate_ncname(s).is_ok());
        if !is_term {
            return Err(NotTerm);
        }

        if let Some(vocab) = &self.default_vocab {
            return Ok(NamedNode::new(format!("{}{term}", vocab.as_str())).ok());
        }
        if let Some(iri) = self.term_mappings.get(term) {
            return Ok(Some(iri.clone()));
        }
        Ok(self
            .term_mappings
            .iter()
            .find_map(|(key, iri)| key.eq_ignore_ascii_case(term).then(|| iri.clone())))
    }

    fn resolve_curie(&self, value: &str) -> Result<NamedOrBlankNode, CurieError> {
        if value.is_empty() {
            return Err(CurieError::EmptyCurie);
        }

        let curie = if let Some((prefix, suffix)) = value.split_once(':') {
            if prefix == "_" {
                if suffix.is_empty() {
                    return Ok(self.eval_context.empty_bnode.clone().into());
                }
                return oxrdf::BlankNode::new(suffix)
                    .map(Into::into)
                    .map_err(|_| CurieError::InvalidBlankNode(suffix.to_string()));
            }
            Curie::new(Some(prefix), suffix)
        } else {
            Curie::new(None, value)
        };

        match self.iri_mappings.expand_curie(&curie) {
            // a prefix may itself be relative
            Ok(iri) => match self.resolve_relative_iri(&iri) {
                Ok(absolute) => Ok(absolute.into()),
                Err(_) => Err(CurieError::InvalidIri(iri)),
            },
            Err(err) => Err(CurieError::Expansion(err)),
        }
    }

    /// `Ok(None)` means a safe CURIE that must be ignored.
    fn resolve_safecurie_or_curie(
        &self,
        value: &str,
    ) -> Result<Option<NamedOrBlankNode>, NotCurie> {
        let Some(inner) = value.strip_prefix('[').and_then(|v| v.strip_suffix(']')) else {
            return self.resolve_curie(value).map(Some).map_err(|_| NotCurie);
        };

        match self.resolve_curie(inner) {
            Ok(iri) => Ok(Some(iri)),
            Err(CurieError::EmptyCurie | CurieError::Expansion(ExpansionError::MissingDefault)) => {
                Ok(None)
            }
            Err(CurieError::InvalidIri(iri)) => {
                self.warn(
                    PGType::UnresolvedCurie,
                    format!("Invalid CURIE: {value} (expanded to invalid IRI value <{iri}>)"),
                );
                Ok(None)
            }
            Err(CurieError::InvalidBlankNode(label)) => {
                self.warn(
                    PGType::Warning,
                    format!("Invalid CURIE: {value} (invalid blank node label `{label}`)"),
                );
                Ok(None)
            }
            Err(CurieError::Expansion(ExpansionError::Invalid)) => {
                self.warn(
                    PGType::UnresolvedCurie,
                    format!("Invalid CURIE: {value} (no such prefix defined)"),
                );
                Ok(None)
            }
        }
    }

    fn attribute_iri(&self, value: &str) -> Option<NamedNode> {
        self.resolve_relative_iri(value).ok()
    }

    fn resolve_relative_iri(&self, value: &str) -> Result<NamedNode, IriParseError> {
        let iri = self.eval_context.base.resolve(value)?;
        Ok(NamedNode::new_unchecked(iri.into_inner()))
    }

    fn report_invalid_iri(&self, err: IriParseError, value: &str) {
        self.warn(PGType::Warning, format!("Invalid IRI: <{value}> ({err})"));
    }

    fn safecurie_or_curie_or_iri(&self, value: &str) -> Option<NamedOrBlankNode> {
        match self.resolve_safecurie_or_curie(value) {
            Ok(val) => val,
            Err(NotCurie) => match self.resolve_relative_iri(value) {
                Ok(val) => Some(val.into()),
                Err(err) => {
                    self.report_invalid_iri(err, value);
                    None
                }
            },
        }
    }

    fn curie_or_absiri(&self, value: &str) -> Option<NamedOrBlankNode> {
        match self.resolve_curie(value) {
            Ok(val) => Some(val),
            Err(_) => match NamedNode::new(value) {
                Ok(iri) => Some(iri.into()),
                Err(err) => {
                    self.report_invalid_iri(err, value);
                    None
                }
            },
        }
    }

    fn term_or_curie_or_absiri(&self, value: &str) -> Option<NamedOrBlankNode> {
        match self.resolve_term(value) {
            Ok(result) => result.map(NamedOrBlankNode::from),
            Err(NotTerm) => self.curie_or_absiri(value),
        }
    }

    fn many_curie_or_absiri(&self, value: &str) -> Vec<NamedOrBlankNode> {
        value
            .split_ascii_whitespace()
            .filter_map(|v| self.curie_or_absiri(v))
            .collect()
    }

    fn many_term_or_curie_or_absiri(&self, value: &str) -> Vec<NamedOrBlankNode> {
        value
            .split_ascii_whitespace()
            .filter_map(|v| self.term_or_curie_or_absiri(v))
            .collect()
    }
}

enum Relation {
    Forward(NamedNode),
    Reverse(NamedNode),
    List(NamedNode),
}

#[derive(Clone, Debug)]
enum IncompleteTriple {
    List(Rc<SharedList>),
    Forward(NamedNode),
    Reverse(NamedNode),
}

fn missing_subject(step: &str) -> Error {
    Error::Internal {
        message: format!("no subject available at {step}"),
    }
}

/// Guesses an XSD datatype for a `datetime` value.
fn temporal_datatype(value: &str) -> Option<NamedNodeRef<'static>> {
    use oxsdatatypes::{Date, DateTime, Duration, GYear, GYearMonth, Time};

    if Duration::from_str(value).is_ok() {
        Some(vocab::xsd::DURATION)
    } else if DateTime::from_str(value).is_ok() {
        Some(vocab::xsd::DATE_TIME)
    } else if Date::from_str(value).is_ok() {
        Some(vocab::xsd::DATE)
    } else if Time::from_str(value).is_ok() {
        Some(vocab::xsd::TIME)
    } else if GYearMonth::from_str(value).is_ok() {
        Some(vocab::xsd::G_YEAR_MONTH)
    } else if GYear::from_str(value).is_ok() {
        Some(vocab::xsd::G_YEAR)
    } else {
        None
    }
}

fn plain_literal(value: &str, lang: Option<&String>) -> oxrdf::Term {
    match lang {
        Some(lang) => oxrdf::Literal::new_language_tagged_literal_unchecked(value, lang).into(),
        None => oxrdf::Literal::new_simple_literal(value).into(),
    }
}

pub(crate) struct RdfaProcessor<'a> {
    source: Source<'a>,
    options: &'a ProcessorOptions,
    output: RefCell<RdfaGraph>,
}

impl<'a> RdfaProcessor<'a> {
    pub(crate) fn new(source: Source<'a>, options: &'a ProcessorOptions) -> Self {
        Self {
            source,
            options,
            output: RefCell::new(RdfaGraph::new()),
        }
    }

    pub(crate) fn warn(&self, pg_type: PGType, msg: &str) {
        self.output.borrow_mut().warn(pg_type, msg);
    }

    pub(crate) fn finish(self) -> RdfaGraph {
        self.output.into_inner()
    }

    fn emit_output(&self, triple: TripleRef<'_>, node: NodeId) {
        self.output.borrow_mut().record_triple(triple, node);
    }

    pub(crate) fn run(&self, root: NodeId, base: Iri<String>) -> Result<(), Error> {
        enum S<'v> {
            Child(ElementView<'v>, Rc<EvaluationContext>),
            OutputList(Rc<NamedOrBlankNode>, Rc<RefCell<ListMapping>>, NodeId),
        }

        let eval_context = EvaluationContext::new(base)?;
        let mut stack = vec![S::Child(ElementView::Tree(root), Rc::new(eval_context))];
        let host = HtmlHost;

        while let Some(item) = stack.pop() {
            match item {
                S::Child(view, base_ctx) => {
                    let is_root = matches!(view, ElementView::Tree(id) if id == root);
                    let new_ctx = Rc::new(self.process_element(&base_ctx, view, is_root, &host)?);
                    stack.push(S::OutputList(
                        new_ctx.parent_subject.clone(),
                        new_ctx.list_mapping.clone(),
                        view.node(),
                    ));
                    for child in self.source.children(view).into_iter().rev() {
                        stack.push(S::Child(child, new_ctx.clone()));
                    }
                }
                S::OutputList(subject, list_mapping, node) => {
                    // only lists instantiated on the closing element are
                    // still uniquely owned here
                    let Ok(list_mapping) = Rc::try_unwrap(list_mapping) else {
                        continue;
                    };
                    for (iri, list) in list_mapping.into_inner().lists.iter() {
                        let mut next: NamedOrBlankNode = rdf::NIL.into();
                        for item in list.borrow().iter().rev() {
                            let me = oxrdf::BlankNode::default();
                            self.emit_output(TripleRef::new(&me, rdf::FIRST, item.as_ref()), node);
                            self.emit_output(TripleRef::new(&me, rdf::REST, &next), node);
                            next = me.into();
                        }
                        self.emit_output(TripleRef::new(subject.as_ref(), iri, &next), node);
                    }
                }
            }
        }

        Ok(())
    }

    fn to_predicate(&self, name: &str, v: NamedOrBlankNode) -> Option<NamedNode> {
        match v {
            NamedOrBlankNode::NamedNode(x) => Some(x),
            NamedOrBlankNode::BlankNode(b) => {
                self.warn(
                    PGType::Warning,
                    &format!("@{name} cannot refer to a bnode: [{b}]"),
                );
                None
            }
        }
    }

    fn process_element(
        &self,
        eval_context: &EvaluationContext,
        view: ElementView<'a>,
        is_root_element: bool,
        host: &impl HostLanguage,
    ) -> Result<EvaluationContext, Error> {
        let emit_warning = |pg_type: PGType, msg: String| self.warn(pg_type, &msg);

        let Some(el) = self.source.element(view) else {
            return Err(Error::NotAnElement { node: view.node() });
        };
        let node = view.node();

        let attr_iri = |name, proj: &dyn Fn(&str) -> Option<NamedNode>| match el.attr(name) {
            None => Attr::Missing,
            Some(v) => match proj(v) {
                None => Attr::Empty,
                Some(v) => Attr::Value(v),
            },
        };

        let attr1 = |name, proj: &dyn Fn(&str) -> Option<NamedOrBlankNode>| match el.attr(name) {
            None => Attr::Missing,
            Some(v) => match proj(v) {
                None => Attr::Empty,
                Some(v) => Attr::Value(v),
            },
        };

        let attr_many = |name, proj: &dyn Fn(&str) -> Vec<NamedOrBlankNode>| match el.attr(name) {
            None => Attr::Missing,
            Some(v) => match Vec1::try_from_vec(proj(v)) {
                Err(Size0Error) => Attr::Empty,
                Ok(v) => Attr::Value(v),
            },
        };

        let attr_many_pred =
            |name, proj: &dyn Fn(&str) -> Vec<NamedOrBlankNode>| match el.attr(name) {
                None => Attr::Missing,
                Some(v) => {
                    let data = proj(v)
                        .into_iter()
                        .filter_map(|v| self.to_predicate(name, v))
                        .collect();
                    match Vec1::try_from_vec(data) {
                        Err(Size0Error) => Attr::Empty,
                        Ok(v) => Attr::Value(v),
                    }
                }
            };

        tracing::trace!(
            tag = %el.tag,
            %node,
            marker = matches!(view, ElementView::Marker { .. }),
            attrs = %el.attrs.iter().map(|(n, v)| format!("@{n}='{v}'")).join(" "),
            "processing element"
        );

        debug_assert!(is_root_element == eval_context.parent_object.is_none());

        // 1.
        let mut local = LocalScope::new(eval_context, &emit_warning);

        // 2. default vocabulary
        if let Some(vocab) = el.attr("vocab") {
            if vocab.is_empty() {
                tracing::trace!("@vocab is empty, resetting default vocabulary");
                local.default_vocab = host.default_vocabulary();
            } else if let Ok(vocab) = local.resolve_relative_iri(vocab) {
                tracing::trace!(%vocab, "default vocabulary changed");
                self.emit_output(
                    TripleRef::new(
                        NamedNodeRef::new_unchecked(eval_context.base.as_str()),
                        rdfa_vocab::USES_VOCABULARY,
                        &vocab,
                    ),
                    node,
                );
                local.default_vocab = Some(vocab);
            }
        }

        // 3. IRI mappings; xmlns: declarations go first so @prefix wins
        let xmlns_prefixes: Vec<(&str, &str)> = if self.options.xmlns_prefixes {
            el.attrs
                .iter()
                .filter_map(|(name, value)| {
                    Some((name.strip_prefix("xmlns:")?, value.as_str()))
                })
                .collect()
        } else {
            Vec::new()
        };

        let mut prefixes = Vec::new();
        if let Some(declared) = el.attr("prefix") {
            for (prefix, value) in declared.split_ascii_whitespace().tuples() {
                match prefix.strip_suffix(':') {
                    Some(prefix) => prefixes.push((prefix, value)),
                    None => local.warn(
                        PGType::Warning,
                        format!("@prefix syntax error: `{prefix}` must end with ':'"),
                    ),
                }
            }
        }

        if !xmlns_prefixes.is_empty() || !prefixes.is_empty() {
            // never set_default: RDFa has no "no prefix" mapping
            let mut mappings = Rc::unwrap_or_clone(local.iri_mappings.clone());
            for (prefix, iri) in xmlns_prefixes.into_iter().chain(prefixes) {
                if mappings.add_prefix(prefix, iri).is_err() {
                    local.warn(
                        PGType::Warning,
                        format!("Invalid prefix: `{prefix}` is reserved"),
                    );
                }
            }
            local.iri_mappings = Rc::new(mappings);
        }

        // 4. language, @xml:lang taking precedence
        if let Some(lang) = el.attr("xml:lang").or(el.attr("lang")) {
            if lang.is_empty() {
                local.current_language = None;
            } else {
                match LanguageIdentifier::from_str(lang) {
                    Ok(lang) => {
                        tracing::trace!(%lang, "current language changed");
                        local.current_language = Some(Rc::new(lang));
                    }
                    Err(e) => local.warn(
                        PGType::Warning,
                        format!("Invalid language identifier ({lang}): {e}"),
                    ),
                }
            }
        }

        let property: Attr<Vec1<NamedNode>> =
            attr_many_pred("property", &|v| local.many_term_or_curie_or_absiri(v));

        let inlist = el.attr("inlist").is_some();
        let rel_dir = if inlist {
            Relation::List
        } else {
            Relation::Forward
        };
        let rev_dir = Relation::Reverse;

        let (rel, rev): (Option<Vec<Relation>>, Option<Vec<Relation>>) = if property.is_present() {
            // with @property, terms in @rel/@rev are dropped and an
            // attribute left empty counts as absent
            let rel = attr_many_pred("rel", &|v| local.many_curie_or_absiri(v))
                .into_value()
                .map(|v| v.into_iter().map(rel_dir).collect());
            let rev = attr_many_pred("rev", &|v| local.many_curie_or_absiri(v))
                .into_value()
                .map(|v| v.into_iter().map(rev_dir).collect());
            (rel, rev)
        } else {
            let many = |name| match attr_many_pred(name, &|v| local.many_term_or_curie_or_absiri(v)) {
                Attr::Missing => None,
                Attr::Empty => Some(Vec::new()),
                Attr::Value(v) => Some(v.into_vec()),
            };
            (
                many("rel").map(|v| v.into_iter().map(rel_dir).collect()),
                many("rev").map(|v| v.into_iter().map(rev_dir).collect()),
            )
        };

        let relations: Option<Vec<Relation>> = match (rel, rev) {
            (None, None) => None,
            (Some(rel), None) => Some(rel),
            (None, Some(rev)) => Some(rev),
            (Some(mut rel), Some(rev)) => {
                rel.extend(rev);
                Some(rel)
            }
        };

        // @role triples, with the XHTML vocabulary in scope
        if let Some(role) = el.attr("role") {
            let role_subject: NamedOrBlankNode = match el.attr("id") {
                Some(id) => match NamedNode::new(format!("{}#{id}", eval_context.base)) {
                    Ok(subject) => subject.into(),
                    Err(err) => {
                        local.report_invalid_iri(err, id);
                        oxrdf::BlankNode::default().into()
                    }
                },
                None => oxrdf::BlankNode::default().into(),
            };

            let role_local = LocalScope {
                default_vocab: Some(NamedNode::new_unchecked(xhv_vocab::VOCAB)),
                ..local.clone()
            };
            for role in role_local.many_term_or_curie_or_absiri(role) {
                self.emit_output(TripleRef::new(&role_subject, xhv_vocab::ROLE, &role), node);
            }
        }

        let content = el.attr("content");

        let type_of: Attr<Vec1<NamedOrBlankNode>> =
            attr_many("typeof", &|v| local.many_term_or_curie_or_absiri(v));

        let about: Attr<Rc<NamedOrBlankNode>> =
            attr1("about", &|v| local.safecurie_or_curie_or_iri(v)).map(Rc::new);
        let resource: Attr<Rc<NamedOrBlankNode>> =
            attr1("resource", &|v| local.safecurie_or_curie_or_iri(v)).map(Rc::new);

        let href: Attr<NamedNode> = attr_iri("href", &|v| local.attribute_iri(v));
        let src: Attr<NamedNode> = attr_iri("src", &|v| local.attribute_iri(v));

        let datatype: Attr<NamedOrBlankNode> =
            attr1("datatype", &|v| local.term_or_curie_or_absiri(v));

        let resource_present = resource.is_present() || href.is_present() || src.is_present();
        let resource_value: Option<Rc<NamedOrBlankNode>> = resource
            .value()
            .cloned()
            .or_else(|| Some(Rc::new(href.into_value()?.into())))
            .or_else(|| Some(Rc::new(src.into_value()?.into())));

        if relations.is_none() {
            // 5.1 @property without @content or @datatype
            if property.is_present() && content.is_none() && !datatype.is_present() {
                if let Some(about) = about.value() {
                    local.new_subject = Some(about.clone());
                } else if is_root_element {
                    local.new_subject = Some(Rc::new(local.empty_curie().into()));
                } else if eval_context.parent_object.is_some() {
                    local.new_subject = eval_context.parent_object.clone();
                }

                if type_of.is_present() {
                    if let Some(about) = about.value() {
                        local.typed_resource = Some(about.clone());
                    } else if is_root_element {
                        local.typed_resource = Some(Rc::new(local.empty_curie().into()));
                    } else {
                        let typed_resource = resource_value
                            .clone()
                            .unwrap_or_else(|| Rc::new(oxrdf::BlankNode::default().into()));
                        local.typed_resource = Some(typed_resource.clone());
                        local.current_object_resource = Some(typed_resource);
                    }
                }
            }
            // 5.2
            else {
                if about.is_present() || resource_present {
                    if let Some(about) = about.value() {
                        local.new_subject = Some(about.clone());
                    } else if let Some(resource) = &resource_value {
                        local.new_subject = Some(resource.clone());
                    }
                }

                // head and body inherit the parent object
                if local.new_subject.is_none() && (el.tag == "head" || el.tag == "body") {
                    local.new_subject = eval_context.parent_object.clone();
                }

                if local.new_subject.is_none() {
                    if is_root_element {
                        local.new_subject = Some(Rc::new(local.empty_curie().into()));
                    } else if type_of.is_present() {
                        local.new_subject = Some(Rc::new(oxrdf::BlankNode::default().into()));
                    } else if eval_context.parent_object.is_some() {
                        local.new_subject = eval_context.parent_object.clone();
                        if !property.is_present() {
                            local.skip_element = true;
                        }
                    }
                }

                if type_of.is_present() {
                    local.typed_resource = local.new_subject.clone();
                }
            }
        }
        // 6. @rel or @rev present
        else {
            if let Some(about) = about.value() {
                local.new_subject = Some(about.clone());
                if type_of.is_present() {
                    local.typed_resource = local.new_subject.clone();
                }
            }

            if local.new_subject.is_none() {
                local.new_subject = if is_root_element {
                    Some(Rc::new(local.empty_curie().into()))
                } else {
                    eval_context.parent_object.clone()
                };
            }

            if let Some(resource) = &resource_value {
                local.current_object_resource = Some(resource.clone());
            } else if type_of.is_present() && !about.is_present() {
                local.current_object_resource = Some(Rc::new(oxrdf::BlankNode::default().into()));
            }

            if type_of.is_present() && !about.is_present() {
                local.typed_resource = local.current_object_resource.clone();
            }
        }

        tracing::trace!(
            new_subject = ?local.new_subject.as_deref(),
            object = ?local.current_object_resource.as_deref(),
            skip = local.skip_element,
            "subject resolved"
        );

        if let Some(new_subject) = &local.new_subject {
            if Some(new_subject) != eval_context.parent_object.as_ref()
                && matches!(view, ElementView::Tree(_))
            {
                self.output.borrow_mut().record_subject(new_subject, node);
            }
        }

        // 7. types
        if let (Some(typed_resource), Some(type_of)) =
            (local.typed_resource.as_deref(), type_of.value())
        {
            for type_iri in type_of {
                self.emit_output(TripleRef::new(typed_resource, rdf::TYPE, type_iri), node);
            }
        }

        // 8. a new subject starts a new list mapping
        if let Some(ns) = &local.new_subject {
            if Some(ns) != eval_context.parent_object.as_ref() {
                local.list_mappings = Default::default();
            }
        }

        // 9. relations with a known object
        if let Some(current_object_resource) = local.current_object_resource.as_deref() {
            if let Some(relations) = &relations {
                let new_subject = local
                    .new_subject
                    .as_deref()
                    .ok_or_else(|| missing_subject("relation emission"))?;
                let term: Rc<oxrdf::Term> = Rc::new(current_object_resource.clone().into());
                for relation in relations {
                    match relation {
                        Relation::List(predicate) => local
                            .list_mappings
                            .borrow_mut()
                            .insert_value(predicate.clone(), term.clone()),
                        Relation::Forward(predicate) => self.emit_output(
                            TripleRef::new(new_subject, predicate, current_object_resource),
                            node,
                        ),
                        Relation::Reverse(predicate) => self.emit_output(
                            TripleRef::new(current_object_resource, predicate, new_subject),
                            node,
                        ),
                    }
                }
            }
        }
        // 10. relations waiting for an object
        else if let Some(relations) = &relations {
            local.current_object_resource = Some(Rc::new(oxrdf::BlankNode::default().into()));
            for relation in relations {
                let incomplete = match relation {
                    Relation::List(p) => {
                        IncompleteTriple::List(local.list_mappings.borrow_mut().ensure_list(p))
                    }
                    Relation::Forward(p) => IncompleteTriple::Forward(p.clone()),
                    Relation::Reverse(p) => IncompleteTriple::Reverse(p.clone()),
                };
                local.incomplete_triples.push(incomplete);
            }
            tracing::trace!(incomplete = ?local.incomplete_triples, "stored incomplete triples");
        }

        // 11. property value
        if let Some(properties) = property.into_value() {
            let lang = local.current_language.as_ref().map(|l| l.to_string());
            let mut otherwise_datatype: Option<NamedNodeRef> = None;
            let mut from_text = false;
            let content_val: Cow<str> = if let Some(content) = content {
                content.into()
            } else {
                let datetime = el.attr("datetime").map(Cow::Borrowed).or_else(|| {
                    (el.tag == "time").then(|| Cow::Owned(self.source.text(view)))
                });
                match datetime {
                    Some(dt) => {
                        otherwise_datatype = temporal_datatype(&dt);
                        dt
                    }
                    None => {
                        from_text = true;
                        Cow::Owned(self.source.text(view))
                    }
                }
            };

            let current_property_value: oxrdf::Term = match &datatype {
                Attr::Empty => plain_literal(&content_val, lang.as_ref()),
                Attr::Value(NamedOrBlankNode::NamedNode(datatype)) => {
                    let is_markup = datatype.as_str() == rdf::XML_LITERAL.as_str()
                        || datatype.as_str() == rdf::HTML.as_str();
                    if is_markup {
                        from_text = false;
                        let serialized = self.source.inner_html(view);
                        oxrdf::Literal::new_typed_literal(serialized, datatype.clone()).into()
                    } else {
                        oxrdf::Literal::new_typed_literal(content_val.as_ref(), datatype.clone())
                            .into()
                    }
                }
                Attr::Value(NamedOrBlankNode::BlankNode(bnode)) => {
                    local.warn(
                        PGType::Warning,
                        format!("@datatype cannot refer to a bnode: [{bnode}]"),
                    );
                    plain_literal(&content_val, lang.as_ref())
                }
                Attr::Missing => {
                    if let Some(otherwise_datatype) = otherwise_datatype {
                        oxrdf::Literal::new_typed_literal(content_val.as_ref(), otherwise_datatype)
                            .into()
                    } else if let Some(content) = content {
                        plain_literal(content, lang.as_ref())
                    } else if let (None, Some(resource)) = (&relations, &resource_value) {
                        from_text = false;
                        NamedOrBlankNode::clone(resource).into()
                    } else if type_of.is_present() && !about.is_present() {
                        from_text = false;
                        let typed = local
                            .typed_resource
                            .clone()
                            .ok_or_else(|| missing_subject("typed property value"))?;
                        Rc::unwrap_or_clone(typed).into()
                    } else {
                        plain_literal(&content_val, lang.as_ref())
                    }
                }
            };

            if inlist {
                let term: Rc<oxrdf::Term> = Rc::new(current_property_value);
                for property in properties {
                    local
                        .list_mappings
                        .borrow_mut()
                        .insert_value(property, term.clone());
                }
            } else if let Some(subject) = local.new_subject.as_deref() {
                for property in properties {
                    let triple = TripleRef::new(subject, &property, &current_property_value);
                    self.emit_output(triple, node);
                    if from_text && matches!(view, ElementView::Tree(_)) {
                        self.output.borrow_mut().record_content(triple, node);
                    }
                }
            }
        }

        // 12. complete the parent's incomplete triples
        if !local.skip_element {
            if let Some(new_subject) = &local.new_subject {
                for incomplete in eval_context.incomplete_triples.iter() {
                    match incomplete {
                        IncompleteTriple::List(list) => list
                            .borrow_mut()
                            .push(Rc::new(NamedOrBlankNode::clone(new_subject).into())),
                        IncompleteTriple::Forward(predicate) => self.emit_output(
                            TripleRef::new(
                                eval_context.parent_subject.as_ref(),
                                predicate,
                                new_subject.as_ref(),
                            ),
                            node,
                        ),
                        IncompleteTriple::Reverse(predicate) => self.emit_output(
                            TripleRef::new(
                                new_subject.as_ref(),
                                predicate,
                                eval_context.parent_subject.as_ref(),
                            ),
                            node,
                        ),
                    }
                }
            } else if !eval_context.incomplete_triples.is_empty() {
                return Err(missing_subject("incomplete triple completion"));
            }
        }

        // 13. context for the children
        if local.skip_element {
            // the vocabulary is carried along as well
            Ok(EvaluationContext {
                language: local.current_language,
                iri_mappings: local.iri_mappings,
                default_vocab: local.default_vocab,
                ..eval_context.clone()
            })
        } else {
            let parent_object = local
                .current_object_resource
                .as_ref()
                .or(local.new_subject.as_ref())
                .cloned()
                .unwrap_or_else(|| eval_context.parent_subject.clone());
            Ok(EvaluationContext {
                empty_bnode: eval_context.empty_bnode.clone(),
                base: eval_context.base.clone(),
                parent_subject: local
                    .new_subject
                    .clone()
                    .unwrap_or_else(|| eval_context.parent_subject.clone()),
                parent_object: Some(parent_object),
                iri_mappings: local.iri_mappings,
                incomplete_triples: local.incomplete_triples,
                list_mapping: local.list_mappings,
                language: local.current_language,
                default_vocab: local.default_vocab,
                term_mappings: local.term_mappings,
            })
        }
    }
}
