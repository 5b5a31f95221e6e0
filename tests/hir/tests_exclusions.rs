use rstest::rstest;

use quill::hir::{DiagnosticCode, Severity};
use quill::project::{SeverityLevel, ValidationSettings};

use crate::helpers::assertions::{codes, diagnostics, flagged};
use crate::helpers::fixtures::{PAGE, PROPERTIES, YAML, project_with};

const UNKNOWN_KEYS: &str = "\
org.acme.Other/mp-rest/url=http://a\n\
org.acme.Other/mp-rest/scope=x\n\
a/b/mp-rest/url=http://b\n\
quarkus.custom.flag=1\n";

fn unknown_keys(validation: ValidationSettings) -> Vec<&'static str> {
    let mut project = project_with(validation);
    let found = diagnostics(&mut project, PROPERTIES, UNKNOWN_KEYS);
    flagged(UNKNOWN_KEYS, &found)
}

#[rstest]
#[case(
    "*/mp-rest/url",
    vec!["org.acme.Other/mp-rest/scope", "a/b/mp-rest/url", "quarkus.custom.flag"]
)]
#[case("**/mp-rest/url", vec!["org.acme.Other/mp-rest/scope", "quarkus.custom.flag"])]
#[case("quarkus.*", vec![
    "org.acme.Other/mp-rest/url",
    "org.acme.Other/mp-rest/scope",
    "a/b/mp-rest/url",
])]
#[case("*", vec![])]
fn test_exclusion_globs(#[case] pattern: &str, #[case] remaining: Vec<&str>) {
    assert_eq!(unknown_keys(ValidationSettings::default().with_excluded(pattern)), remaining);
}

#[test]
fn test_per_check_exclusion() {
    let validation = ValidationSettings::default()
        .with_check_excluded(DiagnosticCode::UnknownConfigProperty, "**/mp-rest/*");
    assert_eq!(unknown_keys(validation), vec!["quarkus.custom.flag"]);

    // the pattern belongs to another check and excludes nothing here
    let validation = ValidationSettings::default()
        .with_check_excluded(DiagnosticCode::UnknownObject, "**/mp-rest/*");
    assert_eq!(unknown_keys(validation).len(), 4);
}

#[test]
fn test_exclusion_applies_to_template_references() {
    let mut project = project_with(ValidationSettings::default().with_excluded("legacy.*"));
    let text = "{legacy.name} {other.name}";
    assert_eq!(flagged(text, &diagnostics(&mut project, PAGE, text)), vec!["other"]);
}

#[test]
fn test_severity_override_and_ignore() {
    let validation = ValidationSettings::default()
        .with_severity(DiagnosticCode::UnknownObject, SeverityLevel::Info)
        .with_severity(DiagnosticCode::UnknownConfigProperty, SeverityLevel::Ignore);
    let mut project = project_with(validation);

    let found = diagnostics(&mut project, PAGE, "{missing}");
    assert_eq!(found[0].severity, Severity::Info);
    assert!(diagnostics(&mut project, PROPERTIES, UNKNOWN_KEYS).is_empty());
}

#[test]
fn test_disabled_documents() {
    let validation = ValidationSettings::default().with_disabled_document("**/generated/**");
    let mut project = project_with(validation);
    assert!(diagnostics(&mut project, "file:///app/generated/page.html", "{missing}").is_empty());
    assert_eq!(diagnostics(&mut project, PAGE, "{missing}").len(), 1);
}

#[rstest]
#[case("quarkus.log", false)]
#[case("quarkus.*", false)]
#[case("quarkus.http.*", true)]
fn test_unclosed_collection_is_excluded_by_key_path(#[case] pattern: &str, #[case] reported: bool) {
    let mut project = project_with(ValidationSettings::default().with_excluded(pattern));
    let found = diagnostics(&mut project, YAML, "quarkus:\n  log: {level: INFO\n");
    assert_eq!(codes(&found).contains(&DiagnosticCode::UnclosedCollection), reported);
}
