use std::sync::Arc;

use quill::hir::{DiagnosticCode, StaticOracle, TypeInfo};
use quill::project::{Project, ProjectError, ProjectSettings};
use quill::{CancellationToken, DocumentKind, Position, ProjectId};

use crate::helpers::assertions::{codes, diagnostics};
use crate::helpers::fixtures::{PAGE, PROPERTIES, YAML, project};

#[test]
fn test_update_and_close() {
    let cancel = CancellationToken::new();
    let mut project = project();
    assert_eq!(
        codes(&diagnostics(&mut project, PAGE, "{missing}")),
        vec![DiagnosticCode::UnknownObject]
    );

    let doc = project.update_document(PAGE, "plain text", &cancel).unwrap();
    assert_eq!(doc.text(), "plain text");
    assert!(project.diagnostics(PAGE, &cancel).unwrap().is_empty());

    project.close_document(PAGE).unwrap();
    assert_eq!(project.document_count(), 0);
    assert!(matches!(
        project.diagnostics(PAGE, &cancel),
        Err(ProjectError::DocumentNotOpen(_))
    ));
    assert!(matches!(
        project.update_document(PAGE, "x", &cancel),
        Err(ProjectError::DocumentNotOpen(_))
    ));
}

#[test]
fn test_document_kinds_follow_the_uri() {
    let cancel = CancellationToken::new();
    let mut project = project();
    for (uri, kind) in [
        (PAGE, DocumentKind::Template),
        (PROPERTIES, DocumentKind::Properties),
        (YAML, DocumentKind::Yaml),
    ] {
        let doc = project.open_document(uri, "", &cancel).unwrap();
        assert_eq!(doc.kind(), kind);
    }
    let uris: Vec<&str> = project.documents().map(|d| &**d.uri()).collect();
    assert_eq!(uris, vec![PAGE, PROPERTIES, YAML]);
}

#[test]
fn test_all_diagnostics_cover_every_document() {
    let cancel = CancellationToken::new();
    let mut project = project();
    project.open_document(PAGE, "{missing}", &cancel).unwrap();
    project.open_document(PROPERTIES, "a=1\na=2\n", &cancel).unwrap();
    project.open_document(YAML, "quarkus:\n  http:\n    port: 1\n", &cancel).unwrap();

    let all = project.all_diagnostics(&cancel).unwrap();
    let summary: Vec<(&str, usize)> = all.iter().map(|(uri, d)| (&**uri, d.len())).collect();
    assert_eq!(summary, vec![(PAGE, 1), (PROPERTIES, 4), (YAML, 0)]);
}

#[test]
fn test_cancelled_checks() {
    let mut project = project();
    project
        .open_document(PAGE, "{missing}", &CancellationToken::new())
        .unwrap();
    let cancel = CancellationToken::new();
    cancel.cancel();
    let err = project.diagnostics(PAGE, &cancel).unwrap_err();
    assert!(err.is_cancelled());
    assert!(project.all_diagnostics(&cancel).is_err());
}

#[test]
fn test_yaml_value_overrides_properties_in_hover() {
    let cancel = CancellationToken::new();
    let mut project = project();
    project.open_document(PROPERTIES, "quarkus.http.port=9090\n", &cancel).unwrap();
    project.open_document(YAML, "quarkus:\n  http:\n    port: 7070\n", &cancel).unwrap();

    let analysis = project.analysis(PROPERTIES).unwrap();
    let hover = analysis.hover(Position::new(0, 3), &cancel).unwrap().unwrap();
    assert!(hover.contents.contains("Effective value: `7070`"));

    project.close_document(YAML).unwrap();
    let analysis = project.analysis(PROPERTIES).unwrap();
    let hover = analysis.hover(Position::new(0, 3), &cancel).unwrap().unwrap();
    assert!(hover.contents.contains("Effective value: `9090`"));
}

#[test]
fn test_unavailable_oracle_recovers_on_change() {
    let cancel = CancellationToken::new();
    let oracle = Arc::new(StaticOracle::new());
    oracle.set_unavailable(true);
    let mut project = Project::new(ProjectId::new("app"), oracle.clone(), ProjectSettings::new());
    assert!(project.config().is_empty());

    oracle.set_unavailable(false);
    oracle.insert_type(TypeInfo::new("org.acme.Item").with_field("name", "java.lang.String"));
    project.on_type_info_changed().unwrap();
    project
        .open_document(PAGE, "{@org.acme.Item item}{item.name}", &cancel)
        .unwrap();
    let found = project.diagnostics(PAGE, &cancel).unwrap();
    assert!(
        found.iter().all(|d| d.code != DiagnosticCode::UnknownProperty),
        "{found:?}"
    );
}
