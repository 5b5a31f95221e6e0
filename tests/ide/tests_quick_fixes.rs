use rstest::rstest;

use quill::hir::DiagnosticCode;
use quill::ide::{CodeAction, is_similar};
use quill::project::Project;
use quill::{TextRange, TextSize};

use crate::helpers::assertions::diagnostics;
use crate::helpers::fixtures::{PAGE, PROPERTIES, project};

#[rstest]
#[case("stri", "string", true)]
#[case("abc", "string", false)]
#[case("cdj", "cdi", true)]
#[case("quarkus.http.prot", "quarkus.http.port", true)]
#[case("lenght", "length", true)]
#[case("zzzzzz", "length", false)]
fn test_similarity(#[case] name: &str, #[case] candidate: &str, #[case] expected: bool) {
    assert_eq!(is_similar(name, candidate), expected);
}

fn fixes(project: &mut Project, uri: &str, text: &str) -> Vec<CodeAction> {
    let found = diagnostics(project, uri, text);
    let analysis = project.analysis(uri).unwrap();
    analysis.code_actions(analysis.document().span(TextRange::up_to(TextSize::of(text))), &found)
}

fn did_you_mean(actions: &[CodeAction]) -> Vec<&str> {
    actions
        .iter()
        .filter(|a| a.title.starts_with("Did you mean"))
        .map(|a| a.title.as_str())
        .collect()
}

#[test]
fn test_reference_suggestion_from_scope() {
    let mut project = project();
    let actions = fixes(&mut project, PAGE, "{@java.lang.String string}{stri}");
    assert_eq!(did_you_mean(&actions), vec!["Did you mean 'string'?"]);
    assert!(actions[0].is_preferred);
    assert_eq!(actions[0].diagnostic.code, DiagnosticCode::UnknownObject);

    let actions = fixes(&mut project, PAGE, "{@java.lang.String string}{abc}");
    assert!(did_you_mean(&actions).is_empty());
    // declaring and marking optional are still offered
    assert_eq!(actions.len(), 2);
}

#[test]
fn test_member_suggestion() {
    let mut project = project();
    let text = "{@org.acme.Item item}{item.name.lenght()}";
    let actions = fixes(&mut project, PAGE, text);
    assert_eq!(did_you_mean(&actions), vec!["Did you mean 'length'?"]);
    let edit = &actions[0].edit.edits(PAGE)[0];
    assert_eq!(&text[edit.range], "lenght");
    assert_eq!(edit.new_text, "length");
}

#[test]
fn test_namespace_suggestion() {
    let mut project = project();
    let actions = fixes(&mut project, PAGE, "{cdj:items}");
    assert_eq!(did_you_mean(&actions), vec!["Did you mean 'cdi'?"]);
}

#[test]
fn test_config_key_suggestion() {
    let mut project = project();
    let actions = fixes(&mut project, PROPERTIES, "quarkus.http.prot=80\n");
    assert_eq!(did_you_mean(&actions), vec!["Did you mean 'quarkus.http.port'?"]);
}

#[test]
fn test_actions_follow_the_requested_range() {
    let mut project = project();
    let text = "{first}\n{second}";
    let found = diagnostics(&mut project, PAGE, text);
    let analysis = project.analysis(PAGE).unwrap();
    let second_line = quill::Span::from_coords(1, 2, 1, 2);
    let actions = analysis.code_actions(second_line, &found);
    assert!(actions.iter().all(|a| a.title.contains("second")));
    assert!(!actions.is_empty());
}
