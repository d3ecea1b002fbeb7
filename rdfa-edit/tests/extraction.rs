use oxiri::Iri;
use oxrdf::{Graph, NamedNode, NamedOrBlankNode};
use rdfa_edit::{Document, ProcessorOptions, extract, parse};
use rstest::rstest;

mod utils;

fn base() -> Iri<String> {
    Iri::parse("http://rdfa.invalid/".to_string()).unwrap()
}

#[test]
fn vocab_alone_is_recorded() {
    let input =
        r#"<html><head><title>foo</title></head><body vocab="http://schema.org/"></body></html>"#;

    let mut output_graph = Graph::new();
    let mut processor_graph = Graph::new();
    parse(input, base(), &mut output_graph, &mut processor_graph).unwrap();

    assert_eq!(output_graph.len(), 1);
    assert!(processor_graph.is_empty());
    utils::assert_graph(
        input,
        r#"
        @prefix rdfa: <http://www.w3.org/ns/rdfa#> .
        <> rdfa:usesVocabulary <http://schema.org/> .
        "#,
    );
}

#[test]
fn content_attribute_wins_over_text() {
    let input = r#"
        <html>
        <head><title>foo</title></head>
        <body vocab="http://schema.org/">
            <p typeof="Book"><span property="name" content="bar">foo</span></p>
        </body>
        </html>
        "#;

    let mut output_graph = Graph::new();
    let mut processor_graph = Graph::new();
    parse(input, base(), &mut output_graph, &mut processor_graph).unwrap();

    assert!(processor_graph.is_empty());
    insta::assert_snapshot!(utils::serialize_graph(output_graph, "http://rdfa.invalid/"), @r##"
    @base <http://rdfa.invalid/> .
    @prefix schema: <//schema.org/> .
    @prefix rdf: <//www.w3.org/1999/02/22-rdf-syntax-ns#> .
    @prefix rdfa: <//www.w3.org/ns/rdfa#> .
    <> rdfa:usesVocabulary schema: .
    _:c14n0 a schema:Book ;
    	schema:name "bar" .
    "##);
}

// https://www.w3.org/TR/html-rdfa/ example 1/2
#[test]
fn html_rdfa_blog_example() {
    let html = r#"<!DOCTYPE html>
    <html lang="en">
      <head>
        <title>Example Document</title>
      </head>
      <body vocab="http://schema.org/">
        <p typeof="Blog">
          Welcome to my <a property="url" href="http://example.org/">blog</a>.
        </p>
      </body>
    </html>"#;

    utils::assert_graph(
        html,
        r#"
        @prefix rdfa: <http://www.w3.org/ns/rdfa#> .
        <> rdfa:usesVocabulary <http://schema.org/> .
        [] a <http://schema.org/Blog>;
        <http://schema.org/url> <http://example.org/> .
        "#,
    );
}

#[rstest]
#[case::prefix_declaration(
    r#"<div prefix="ex: http://example.com/ns#" about="http://example.org/a"><span property="ex:p">v</span></div>"#,
    r#"<http://example.org/a> <http://example.com/ns#p> "v" ."#
)]
#[case::xmlns_declaration(
    r#"<div xmlns:ex="http://example.com/ns#" about="http://example.org/a"><span property="ex:p">v</span></div>"#,
    r#"<http://example.org/a> <http://example.com/ns#p> "v" ."#
)]
#[case::typed_literal(
    r#"<span about="http://example.org/a" property="http://example.com/p" datatype="http://www.w3.org/2001/XMLSchema#integer">5</span>"#,
    r#"<http://example.org/a> <http://example.com/p> "5"^^<http://www.w3.org/2001/XMLSchema#integer> ."#
)]
#[case::language(
    r#"<p lang="en" about="http://example.org/a" property="http://example.com/p">hi</p>"#,
    r#"<http://example.org/a> <http://example.com/p> "hi"@en ."#
)]
#[case::link(
    r#"<div about="http://example.org/a"><a rel="http://example.com/knows" href="http://example.org/b">b</a></div>"#,
    r#"<http://example.org/a> <http://example.com/knows> <http://example.org/b> ."#
)]
#[case::hanging_rel(
    r#"<div about="http://example.org/a" rel="http://example.com/knows"><span about="http://example.org/b"></span></div>"#,
    r#"<http://example.org/a> <http://example.com/knows> <http://example.org/b> ."#
)]
#[case::pattern_copy(
    r#"<div about="http://example.org/a" property="rdfa:copy" resource="_:p"></div>
       <div resource="_:p" typeof="rdfa:Pattern"><span property="http://example.com/name">Pat</span></div>"#,
    r#"<http://example.org/a> <http://example.com/name> "Pat" ."#
)]
#[case::html_literal(
    r#"<span about="http://example.org/a" property="http://example.com/p" datatype="http://www.w3.org/1999/02/22-rdf-syntax-ns#HTML">a <b>b</b></span>"#,
    r#"<http://example.org/a> <http://example.com/p> "a <b>b</b>"^^<http://www.w3.org/1999/02/22-rdf-syntax-ns#HTML> ."#
)]
fn extracts(#[case] body: &str, #[case] ttl: &str) {
    let html = format!("<html><head><title>t</title></head><body>{body}</body></html>");
    utils::assert_graph(&html, ttl);
}

#[test]
fn literal_content_node_is_indexed() {
    let doc = Document::from_fragment(
        r#"<div about="http://ex/1"><p property="http://ex/name">Alice</p></div>"#,
    )
    .unwrap();
    let index = extract(&doc, &ProcessorOptions::default()).unwrap();

    assert_eq!(index.graph().len(), 1);
    let triple = index.graph().iter().next().unwrap().into_owned();
    assert_eq!(triple.object.to_string(), "\"Alice\"");

    let div = utils::find_tag(&doc, "div");
    let div = doc.children(div)[0];
    let p = utils::find_tag(&doc, "p");
    assert_eq!(index.content_node(&triple), Some(p));

    let subject = NamedOrBlankNode::from(NamedNode::new("http://ex/1").unwrap());
    assert_eq!(index.nodes_for_subject(&subject), &[div]);
    assert_eq!(
        index.nodes_for_predicate(&NamedNode::new("http://ex/name").unwrap()),
        &[p]
    );
}

#[test]
fn pattern_copying_can_be_disabled() {
    let doc = Document::from_fragment(
        r#"<div about="http://example.org/a" property="rdfa:copy" resource="_:p"></div>
           <div resource="_:p" typeof="rdfa:Pattern"><span property="http://example.com/name">Pat</span></div>"#,
    )
    .unwrap();
    let options = ProcessorOptions {
        pattern_copying: false,
        ..ProcessorOptions::default()
    };
    let graph = extract(&doc, &options).unwrap().into_graphs().0;
    // the copy link, the pattern type and the pattern's own triple
    assert_eq!(graph.len(), 3);
}
