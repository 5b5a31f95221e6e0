use rstest::rstest;

use quill::TextSize;
use quill::syntax::{Document, NodeKind};

use crate::helpers::fixtures::{YAML, parse};

/// `(text of the collection, closed)` for every flow collection.
fn flow_collections(doc: &Document) -> Vec<(&str, bool)> {
    doc.ids()
        .filter(|&id| doc.kind_of(id).is_flow())
        .map(|id| (doc.text_of(id), doc.node(id).closed))
        .collect()
}

#[rstest]
#[case("a: [1, 2]\n", vec![("[1, 2]", true)])]
#[case("a: {b: 1, c: [x]}\n", vec![("{b: 1, c: [x]}", true), ("[x]", true)])]
#[case("a: [1, 2\n", vec![("[1, 2", false)])]
#[case("a: {b: [1]\n", vec![("{b: [1]", false), ("[1]", true)])]
fn test_flow_closing(#[case] text: &str, #[case] expected: Vec<(&str, bool)>) {
    let doc = parse(YAML, text);
    let found = flow_collections(&doc);
    assert_eq!(found.len(), expected.len());
    for ((text, closed), (want_text, want_closed)) in found.into_iter().zip(expected) {
        assert_eq!(closed, want_closed, "{want_text}");
        if closed {
            assert_eq!(text, want_text);
        } else {
            // an unclosed collection runs to wherever input gave out
            assert!(text.starts_with(want_text), "{text:?}");
        }
    }
}

#[test]
fn test_closed_flow_ends_at_terminator() {
    let text = "key: [one, two]  # trailing\n";
    let doc = parse(YAML, text);
    let sequence = doc
        .ids()
        .find(|&id| matches!(doc.kind_of(id), NodeKind::Sequence { flow: true }))
        .unwrap();
    let terminator = text.find(']').unwrap() + 1;
    assert_eq!(doc.range(sequence).end(), TextSize::new(terminator as u32));
}

#[test]
fn test_unclosed_flow_is_reported() {
    use quill::hir::DiagnosticCode;

    use crate::helpers::assertions::{codes, diagnostics};
    use crate::helpers::fixtures::project;

    let mut project = project();
    let found = diagnostics(&mut project, YAML, "quarkus:\n  log: {level: INFO\n");
    assert!(codes(&found).contains(&DiagnosticCode::UnclosedCollection));
}
