use crate::model::Document;

use super::selection::Selection;
use super::spec::{RdfaKey, Strategy, UpdateSpec};

/// Picks how an update is carried out. `force` only applies to context
/// selections that add attributes, and only ever picks WRAP or NEST.
pub fn new_context_heuristic(
    doc: &Document,
    selection: &Selection,
    spec: &UpdateSpec,
    force: Option<Strategy>,
) -> Strategy {
    if selection.is_highlight() {
        if spec.sets_inner_html() {
            return Strategy::Replace;
        }
        return Strategy::Wrap;
    }

    if spec.remove.is_some() || spec.set.is_some() {
        return Strategy::Update;
    }
    if spec.add.is_none() {
        return Strategy::Update;
    }
    if let Some(strategy) = force.filter(|s| matches!(s, Strategy::Wrap | Strategy::Nest)) {
        return strategy;
    }
    if selection.selections.len() > 1 {
        return Strategy::Nest;
    }

    // A literal property node that gains an `about` would turn its text into
    // the value of a property of a new subject. Nesting keeps both.
    let bare_property = selection
        .nodes()
        .next()
        .and_then(|id| doc.element(id))
        .is_some_and(|el| {
            el.has_attr("property") && !el.has_attr("content") && !el.has_attr("datatype")
        });
    if bare_property && spec.adds(RdfaKey::About) {
        Strategy::Nest
    } else {
        Strategy::Update
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Fragment;
    use rstest::rstest;

    fn spec(json: &str) -> UpdateSpec {
        serde_json::from_str(json).unwrap()
    }

    fn doc_with(fragment: Fragment) -> (Document, Vec<crate::model::NodeId>) {
        let mut doc = Document::empty();
        let root = doc.root();
        let id = doc.instantiate(&fragment);
        let other = doc.instantiate(&Fragment::element("p").with_child(Fragment::text("x")));
        doc.insert_children(root, 0, &[id, other]).unwrap();
        (doc, vec![id, other])
    }

    #[rstest]
    #[case(r#"{"add": {"typeof": "http://ex/Person"}}"#, 1, None, Strategy::Update)]
    #[case(r#"{"remove": {"typeof": true}}"#, 2, None, Strategy::Update)]
    #[case(r#"{"set": {"about": "http://ex/1"}}"#, 1, None, Strategy::Update)]
    #[case(r#"{"add": {"typeof": "http://ex/Person"}}"#, 2, None, Strategy::Nest)]
    #[case(r#"{"add": {"typeof": "http://ex/Person"}}"#, 1, Some(Strategy::Wrap), Strategy::Wrap)]
    #[case(r#"{"add": {"typeof": "http://ex/Person"}}"#, 1, Some(Strategy::Replace), Strategy::Update)]
    #[case(r#"{"add": {"typeof": "http://ex/Person"}}"#, 2, Some(Strategy::Wrap), Strategy::Wrap)]
    #[case(r#"{"remove": {"typeof": true}}"#, 1, Some(Strategy::Wrap), Strategy::Update)]
    #[case(r#"{"set": {"about": "http://ex/1"}}"#, 1, Some(Strategy::Nest), Strategy::Update)]
    #[case(
        r#"{"remove": {"typeof": true}, "add": {"about": "http://ex/1"}}"#,
        2,
        Some(Strategy::Nest),
        Strategy::Update
    )]
    fn context_selection(
        #[case] json: &str,
        #[case] count: usize,
        #[case] force: Option<Strategy>,
        #[case] expected: Strategy,
    ) {
        let (doc, ids) = doc_with(Fragment::element("span").with_child(Fragment::text("a")));
        let selection = Selection::of_nodes(&doc, &ids[..count]).unwrap();
        assert_eq!(
            new_context_heuristic(&doc, &selection, &spec(json), force),
            expected
        );
    }

    #[test]
    fn about_on_bare_property_nests() {
        let (doc, ids) = doc_with(
            Fragment::element("span")
                .with_attr("property", "http://ex/name")
                .with_child(Fragment::text("Alice")),
        );
        let selection = Selection::of_nodes(&doc, &ids[..1]).unwrap();
        assert_eq!(
            new_context_heuristic(
                &doc,
                &selection,
                &spec(r#"{"add": {"about": "http://ex/1"}}"#),
                None
            ),
            Strategy::Nest
        );
    }

    #[test]
    fn highlight_wraps_unless_inner_html_is_set() {
        let (doc, _) = doc_with(Fragment::text("abcdef"));
        let selection = Selection::highlight(&doc, 2, 4).unwrap();
        assert_eq!(
            new_context_heuristic(&doc, &selection, &spec(r#"{"add": {"typeof": "x"}}"#), None),
            Strategy::Wrap
        );
        assert_eq!(
            new_context_heuristic(
                &doc,
                &selection,
                &spec(r#"{"add": {"typeof": "x"}}"#),
                Some(Strategy::Nest)
            ),
            Strategy::Wrap
        );
        assert_eq!(
            new_context_heuristic(
                &doc,
                &selection,
                &spec(r#"{"set": {"innerHTML": "<b>X</b>"}}"#),
                Some(Strategy::Wrap)
            ),
            Strategy::Replace
        );
    }
}
