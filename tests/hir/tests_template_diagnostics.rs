use quill::hir::{DiagnosticCode, DiagnosticData, Severity};

use crate::helpers::assertions::{codes, diagnostics, flagged};
use crate::helpers::fixtures::{PAGE, project};

#[test]
fn test_resolved_template_is_clean() {
    let text = "{@org.acme.Catalog catalog}\
        {#for item in catalog.items}{item.name.length()} {item.price} {item_index}{/for}\
        {#let total=catalog.items.size}{total}{/let}\
        {cdi:items.get(0).discount(5)}";
    let found = diagnostics(&mut project(), PAGE, text);
    assert!(found.is_empty(), "{found:#?}");
}

#[test]
fn test_unresolved_links() {
    let text = "{@org.acme.Item item}{itm.name} {item.nam} {item.name.size()} {cdx:items} {cdi:nothing}";
    let found = diagnostics(&mut project(), PAGE, text);
    assert_eq!(
        codes(&found),
        vec![
            DiagnosticCode::UnknownObject,
            DiagnosticCode::UnknownProperty,
            DiagnosticCode::UnknownMethod,
            DiagnosticCode::UnknownNamespace,
            DiagnosticCode::UnknownObject,
        ]
    );
    assert_eq!(flagged(text, &found), vec!["itm", "nam", "size", "cdx", "nothing"]);
    assert!(found.iter().all(|d| d.severity == Severity::Error));

    match &found[1].data {
        Some(DiagnosticData::Member { name, base_type, .. }) => {
            assert_eq!(name, "nam");
            assert_eq!(base_type, "org.acme.Item");
        }
        other => panic!("unexpected data {other:?}"),
    }
}

#[test]
fn test_only_first_unresolved_link_is_reported() {
    let text = "{@org.acme.Item item}{item.missing.deeper.still}";
    let found = diagnostics(&mut project(), PAGE, text);
    assert_eq!(flagged(text, &found), vec!["missing"]);
}

#[test]
fn test_optional_expression_is_not_an_error() {
    let found = diagnostics(&mut project(), PAGE, "{maybe??} {maybe.name??}");
    assert!(found.is_empty(), "{found:#?}");
}

#[test]
fn test_unclosed_section() {
    let text = "{#for item in cdi:items}{item.name}";
    let found = diagnostics(&mut project(), PAGE, text);
    assert_eq!(codes(&found), vec![DiagnosticCode::UnclosedSection]);
}

#[test]
fn test_anonymous_end_tag_after_branch() {
    let text = "{@java.lang.Boolean a}{#if a}x{#else}y{/}";
    assert!(diagnostics(&mut project(), PAGE, text).is_empty());
    let text = "{@java.lang.Boolean a}{#if a}x{/}";
    assert!(diagnostics(&mut project(), PAGE, text).is_empty());
}

#[test]
fn test_user_tag_parameters() {
    let mut project = project();
    let found = diagnostics(&mut project, PAGE, "{#card /}");
    assert_eq!(codes(&found), vec![DiagnosticCode::MissingTagParameter]);
    assert_eq!(found[0].severity, Severity::Warning);
    assert!(found[0].message.contains("title"));

    assert!(diagnostics(&mut project, PAGE, "{#card title='Hi' /}").is_empty());
    assert_eq!(
        codes(&diagnostics(&mut project, PAGE, "{#crad title='Hi' /}")),
        vec![DiagnosticCode::UnknownSection]
    );
}
