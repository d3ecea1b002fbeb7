use oxrdf::{Literal, NamedNode, NamedNodeRef, TripleRef, vocab::rdf};
use pretty_assertions::assert_eq;
use rdfa_edit::operations::{InsertTextOperation, MoveOperation};
use rdfa_edit::rdfa::attrs::{
    IncomingTriple, LiteralAttrs, OutgoingTriple, RdfaAttrs, ResourceAttrs, Term,
};
use rdfa_edit::rdfa::projection::sync_element;
use rdfa_edit::update::{Selection, Strategy, UpdateSpec};
use rdfa_edit::{Document, Editor, EditorConfig, Element, Error, Fragment, NodeId, Position, Range};

mod utils;

const ALICE: &str = "http://ex/alice";
const BOB: &str = "http://ex/bob";
const NAME: &str = "http://ex/name";
const KNOWS: &str = "http://ex/knows";

fn append_role(doc: &mut Document, tag: &str, rdfa: RdfaAttrs, text: Option<&str>) -> NodeId {
    let mut element = Element::new(tag);
    element.rdfa = Some(rdfa);
    sync_element(&mut element).unwrap();
    let mut fragment = Fragment::from_element(element);
    if let Some(text) = text {
        fragment = fragment.with_child(Fragment::text(text));
    }
    let id = doc.instantiate(&fragment);
    let root = doc.root();
    let at = doc.children(root).len();
    doc.insert_children(root, at, &[id]).unwrap();
    id
}

/// Alice and Bob as resource nodes, plus a literal node holding a name.
fn people() -> (Editor, [NodeId; 3]) {
    let mut doc = Document::empty();
    let alice = append_role(
        &mut doc,
        "div",
        RdfaAttrs::Resource(ResourceAttrs::new("n-alice", ALICE)),
        None,
    );
    let name = append_role(
        &mut doc,
        "span",
        RdfaAttrs::Literal(LiteralAttrs::new("n-name")),
        Some("Alice"),
    );
    let bob = append_role(
        &mut doc,
        "div",
        RdfaAttrs::Resource(ResourceAttrs::new("n-bob", BOB)),
        None,
    );
    (
        Editor::new(doc, EditorConfig::default()),
        [alice, name, bob],
    )
}

fn role(doc: &Document, id: NodeId) -> &RdfaAttrs {
    doc.element(id).and_then(|e| e.rdfa.as_ref()).unwrap()
}

fn named(iri: &str) -> NamedNode {
    NamedNode::new(iri).unwrap()
}

#[test]
fn links_stay_symmetric_and_survive_a_reload() {
    let (mut editor, [alice, name, bob]) = people();
    assert!(
        editor
            .add_property(ALICE, OutgoingTriple::new(NAME, Term::literal_node("n-name")))
            .unwrap()
    );
    assert!(
        editor
            .add_property(ALICE, OutgoingTriple::new(KNOWS, Term::resource_node(BOB)))
            .unwrap()
    );

    let doc = editor.document();
    assert_eq!(
        role(doc, name).backlinks(),
        [IncomingTriple::new(Term::resource_node(ALICE), NAME)]
    );
    assert_eq!(
        role(doc, bob).backlinks(),
        [IncomingTriple::new(Term::resource_node(ALICE), KNOWS)]
    );

    let graph = editor.index().unwrap().graph();
    assert_eq!(graph.len(), 2);
    assert!(graph.contains(TripleRef::new(
        &named(ALICE),
        &named(NAME),
        &Literal::new_simple_literal("Alice"),
    )));
    assert!(graph.contains(TripleRef::new(&named(ALICE), &named(KNOWS), &named(BOB))));

    let html = doc.inner_html(doc.root()).unwrap();
    let reloaded = Document::from_fragment(&html).unwrap();
    let roles: Vec<&RdfaAttrs> = reloaded
        .rdfa_nodes()
        .map(|id| role(&reloaded, id))
        .collect();
    assert_eq!(
        roles,
        [role(doc, alice), role(doc, name), role(doc, bob)]
    );
}

#[test]
fn removing_a_backlink_removes_the_link() {
    let (mut editor, [alice, _, bob]) = people();
    editor
        .add_property(ALICE, OutgoingTriple::new(NAME, Term::literal_node("n-name")))
        .unwrap();
    editor
        .add_property(ALICE, OutgoingTriple::new(KNOWS, Term::resource_node(BOB)))
        .unwrap();

    assert!(editor.remove_backlink(bob, 0).unwrap());

    let doc = editor.document();
    assert!(role(doc, bob).backlinks().is_empty());
    assert_eq!(
        role(doc, alice).as_resource().unwrap().properties,
        [OutgoingTriple::new(NAME, Term::literal_node("n-name"))]
    );
    assert_eq!(editor.index().unwrap().graph().len(), 1);

    assert!(editor.undo());
    assert_eq!(role(editor.document(), bob).backlinks().len(), 1);
}

#[test]
fn repeated_links_collapse_and_unlink_together() {
    let (mut editor, [alice, _, bob]) = people();
    for _ in 0..2 {
        editor
            .add_property(ALICE, OutgoingTriple::new(KNOWS, Term::resource_node(BOB)))
            .unwrap();
    }

    let doc = editor.document();
    assert_eq!(role(doc, alice).as_resource().unwrap().properties.len(), 1);
    assert_eq!(role(doc, bob).backlinks().len(), 1);

    assert!(editor.remove_backlink(bob, 0).unwrap());

    let doc = editor.document();
    assert!(role(doc, alice).as_resource().unwrap().properties.is_empty());
    assert!(role(doc, bob).backlinks().is_empty());
    assert!(editor.index().unwrap().graph().is_empty());
}

fn first_child(editor: &Editor) -> NodeId {
    let doc = editor.document();
    doc.children(doc.root())[0]
}

#[test]
fn update_swaps_a_type_and_undo_restores_it() {
    let mut editor = Editor::new(
        Document::from_fragment(r#"<p about="http://ex/a" typeof="http://ex/A">text</p>"#)
            .unwrap(),
        EditorConfig::default(),
    );
    let p = first_child(&editor);
    let selection = Selection::of_nodes(editor.document(), &[p]).unwrap();
    let spec: UpdateSpec = serde_json::from_str(
        r#"{"remove": {"typeof": true}, "add": {"typeof": "http://ex/B"}, "desc": "retype"}"#,
    )
    .unwrap();

    let report = editor.update(&selection, &spec, None).unwrap();
    assert_eq!(report.strategy, Some(Strategy::Update));
    assert_eq!(report.nodes, [p]);
    assert_eq!(
        editor.document().element(p).unwrap().attr("typeof"),
        Some("http://ex/B")
    );

    let typed = |editor: &Editor, class: &str| {
        editor.index().unwrap().graph().contains(TripleRef::new(
            NamedNodeRef::new("http://ex/a").unwrap(),
            rdf::TYPE,
            NamedNodeRef::new(class).unwrap(),
        ))
    };
    assert!(typed(&editor, "http://ex/B"));
    assert!(!typed(&editor, "http://ex/A"));

    assert!(editor.undo());
    assert!(typed(&editor, "http://ex/A"));
}

#[test]
fn adding_a_type_to_a_bare_node_updates_it_in_place() {
    let mut editor = Editor::new(
        Document::from_fragment("<p>Alice</p>").unwrap(),
        EditorConfig::default(),
    );
    let p = first_child(&editor);
    let selection = Selection::of_nodes(editor.document(), &[p]).unwrap();
    let spec: UpdateSpec =
        serde_json::from_str(r#"{"add": {"typeof": "http://ex/Person"}}"#).unwrap();

    let report = editor.update(&selection, &spec, None).unwrap();
    assert_eq!(report.strategy, Some(Strategy::Update));
    assert_eq!(
        editor.to_html().unwrap(),
        r#"<div><p typeof="http://ex/Person">Alice</p></div>"#
    );
}

#[test]
fn bad_removal_pattern_changes_nothing() {
    let mut editor = Editor::new(
        Document::from_fragment(r#"<p rel="http://ex/r">x</p>"#).unwrap(),
        EditorConfig::default(),
    );
    let before = editor.to_html().unwrap();
    let p = first_child(&editor);
    let selection = Selection::of_nodes(editor.document(), &[p]).unwrap();
    let spec: UpdateSpec =
        serde_json::from_str(r#"{"remove": {"rel": {"regex": "("}}}"#).unwrap();

    let result = editor.update(&selection, &spec, None);
    assert!(matches!(result, Err(Error::InvalidRegex { .. })));
    assert_eq!(editor.to_html().unwrap(), before);
    assert!(!editor.can_undo());
}

#[test]
fn replacing_highlighted_text_inside_a_paragraph() {
    let mut editor = Editor::new(
        Document::from_fragment("<p>Hello world</p>").unwrap(),
        EditorConfig::default(),
    );
    let selection = Selection::highlight(editor.document(), 6, 11).unwrap();
    let spec: UpdateSpec =
        serde_json::from_str(r#"{"set": {"innerHTML": "<b onclick=\"x()\">there</b>"}}"#)
            .unwrap();

    let report = editor.update(&selection, &spec, None).unwrap();
    assert_eq!(report.strategy, Some(Strategy::Replace));
    assert_eq!(editor.to_html().unwrap(), "<div><p>Hello <b>there</b></p></div>");
}

#[test]
fn added_prefix_makes_curies_resolve() {
    let mut editor = Editor::new(
        Document::from_fragment(
            r#"<div about="http://ex/a"><span property="ex:p">v</span></div>"#,
        )
        .unwrap(),
        EditorConfig::default(),
    );
    let div = first_child(&editor);
    let selection = Selection::of_nodes(editor.document(), &[div]).unwrap();
    let spec: UpdateSpec =
        serde_json::from_str(r#"{"add": {"prefix": "ex: http://example.com/ns#"}}"#).unwrap();

    editor.update(&selection, &spec, None).unwrap();

    assert!(editor.index().unwrap().graph().contains(TripleRef::new(
        &named("http://ex/a"),
        &named("http://example.com/ns#p"),
        &Literal::new_simple_literal("v"),
    )));
}

#[test]
fn highlights_follow_edits_and_queued_updates_apply_on_flush() {
    let mut editor = Editor::new(
        Document::from_fragment("<p>Hello world</p>").unwrap(),
        EditorConfig::default(),
    );
    let world = editor.highlights_mut().add(Range::between(7, 12), "match");
    let hello = editor.highlights_mut().queue_add(Range::between(1, 6), "match");

    editor
        .apply(InsertTextOperation::new(Range::between(1, 1), "Oh "))
        .unwrap();
    assert_eq!(editor.highlights_mut().flush(), 1);

    let highlights = editor.highlights();
    assert_eq!(highlights.get(world).unwrap().range, Range::between(10, 15));
    assert_eq!(highlights.get(hello).unwrap().range, Range::between(4, 9));
}

#[test]
fn only_the_latest_reindex_request_runs() {
    let mut editor = Editor::new(
        Document::from_fragment("<p>ab</p>").unwrap(),
        EditorConfig::default(),
    );
    for text in ["x", "y"] {
        editor
            .apply(InsertTextOperation::new(Range::between(1, 1), text))
            .unwrap();
    }
    assert!(editor.scheduler().is_pending());
    assert!(editor.flush_reindex().unwrap());
    assert!(!editor.scheduler().is_pending());
    assert!(!editor.flush_reindex().unwrap());
}

#[test]
fn moving_a_range_into_itself_is_rejected() {
    let mut editor = Editor::new(
        Document::from_fragment("<p>ab</p><p>cd</p>").unwrap(),
        EditorConfig::default(),
    );
    let before = editor.to_html().unwrap();
    let result = editor.apply(MoveOperation::new(Range::between(0, 8), Position::new(5)));
    assert!(matches!(
        result,
        Err(Error::MoveIntoSelf {
            start: 0,
            end: 8,
            target: 5
        })
    ));
    assert_eq!(editor.to_html().unwrap(), before);
    assert_eq!(utils::find_tag(editor.document(), "div"), editor.document().root());
}
