use std::sync::Arc;

use rstest::rstest;

use quill::hir::{DiagnosticCode, StaticOracle, TagOrigin, TagPayload, infer_signature};
use quill::project::{Project, ProjectSettings};
use quill::{CancellationToken, ProjectId};

use crate::helpers::assertions::{codes, diagnostics};
use crate::helpers::fixtures::{PAGE, oracle, parse};

/// `(name, required)` for each inferred parameter.
fn parameters(body: &str) -> Vec<(String, bool)> {
    let doc = parse("file:///app/templates/tags/t.html", body);
    infer_signature(&doc, &CancellationToken::new())
        .unwrap()
        .parameters
        .into_iter()
        .map(|p| (p.name.to_string(), p.required))
        .collect()
}

#[rstest]
#[case("{foo}", vec![("foo", true)])]
#[case("{#if foo}{foo}{/if}", vec![("foo", false)])]
#[case("{#let foo='x'}{foo}{/let}", vec![])]
#[case("{#for x in items}{x.name}{/for}", vec![("items", true)])]
#[case("{#if a}{a}{/if}{a}", vec![("a", true)])]
fn test_inferred_parameters(#[case] body: &str, #[case] expected: Vec<(&str, bool)>) {
    let expected: Vec<(String, bool)> = expected
        .into_iter()
        .map(|(name, required)| (name.to_owned(), required))
        .collect();
    assert_eq!(parameters(body), expected);
}

#[test]
fn test_source_tags_from_tag_roots() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("alert.html"), "{#if icon}{icon}{/if}{message}").unwrap();
    std::fs::write(dir.path().join("card.html"), "{heading}").unwrap();

    let cancel = CancellationToken::new();
    let mut project = Project::new(
        ProjectId::new("app"),
        Arc::new(oracle()),
        ProjectSettings::new().with_tag_root(dir.path()),
    );

    let tags = project.tags();
    let card = tags.get("card").unwrap();
    assert!(matches!(card.origin, TagOrigin::Source { .. }));
    let alert = tags.get("alert").unwrap();
    let signature = alert.signature(&cancel).unwrap();
    assert_eq!(signature.required().map(|p| p.name.as_str()).collect::<Vec<_>>(), vec!["message"]);

    // the source `card` shadows the binary one and wants `heading`
    let found = diagnostics(&mut project, PAGE, "{#card title='x' /}{#alert message='m' /}");
    assert_eq!(codes(&found), vec![DiagnosticCode::MissingTagParameter]);
    assert!(found[0].message.contains("heading"));
}

#[test]
fn test_refresh_picks_up_new_binary_tags() {
    let oracle = Arc::new(StaticOracle::new());
    let mut project = Project::new(ProjectId::new("app"), oracle.clone(), ProjectSettings::new());
    assert_eq!(
        codes(&diagnostics(&mut project, PAGE, "{#badge /}")),
        vec![DiagnosticCode::UnknownSection]
    );

    oracle.set_tags(vec![TagPayload::new("badge", "static", "jar:///tags/badge.html")]);
    project.on_type_info_changed().unwrap();
    assert!(project.diagnostics(PAGE, &CancellationToken::new()).unwrap().is_empty());
}

#[test]
fn test_editing_a_tag_template_changes_its_signature() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("card.html");
    std::fs::write(&path, "{title}").unwrap();
    let mut project = Project::new(
        ProjectId::new("app"),
        Arc::new(oracle()),
        ProjectSettings::new().with_tag_root(dir.path()),
    );
    let cancel = CancellationToken::new();
    project
        .open_document(format!("file://{}", path.display()), "{title}{subtitle}", &cancel)
        .unwrap();

    let found = diagnostics(&mut project, PAGE, "{#card title='x' /}");
    assert_eq!(codes(&found), vec![DiagnosticCode::MissingTagParameter]);
    assert!(found[0].message.contains("subtitle"));
}
