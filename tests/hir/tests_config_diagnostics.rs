use rstest::rstest;

use quill::TextSize;
use quill::hir::DiagnosticCode;

use crate::helpers::assertions::{codes, diagnostics, flagged};
use crate::helpers::fixtures::{PROPERTIES, YAML, project};

#[test]
fn test_duplicate_keys_flag_every_occurrence() {
    let text = "a=1\nb=2\na=3";
    let found: Vec<_> = diagnostics(&mut project(), PROPERTIES, text)
        .into_iter()
        .filter(|d| d.code == DiagnosticCode::DuplicateKey)
        .collect();
    let starts: Vec<TextSize> = found.iter().map(|d| d.range.start()).collect();
    assert_eq!(starts, vec![TextSize::new(0), TextSize::new(8)]);
    assert_eq!(found[0].related[0].range.start(), TextSize::new(8));
    assert_eq!(found[1].related[0].range.start(), TextSize::new(0));
}

#[test]
fn test_profiled_key_is_a_different_key() {
    let found = diagnostics(&mut project(), PROPERTIES, "%dev.a=1\na=2");
    assert!(!codes(&found).contains(&DiagnosticCode::DuplicateKey));
}

#[test]
fn test_yaml_duplicates_per_mapping() {
    let text = "a:\n  x: 1\nb:\n  x: 2\na: 3\n";
    let found: Vec<_> = diagnostics(&mut project(), YAML, text)
        .into_iter()
        .filter(|d| d.code == DiagnosticCode::DuplicateKey)
        .collect();
    assert_eq!(flagged(text, &found), vec!["a", "a"]);
}

#[rstest]
#[case("quarkus.http.port=8080", vec![])]
#[case("quarkus.http.port=80a", vec![DiagnosticCode::ValueTypeMismatch])]
#[case("quarkus.http.port=${PORT:8080}", vec![])]
#[case("quarkus.log.enabled=maybe", vec![DiagnosticCode::ValueTypeMismatch])]
#[case("%prod.quarkus.log.enabled=true", vec![])]
#[case("quarkus.log.level=DEBUG", vec![])]
#[case("quarkus.log.level=LOUD", vec![DiagnosticCode::ValueTypeMismatch])]
#[case("quarkus.htp.port=1", vec![DiagnosticCode::UnknownConfigProperty])]
#[case("org.acme.Client/mp-rest/url=http://localhost", vec![])]
#[case("quarkus.http.port", vec![DiagnosticCode::MissingSeparator])]
fn test_properties_values(#[case] text: &str, #[case] expected: Vec<DiagnosticCode>) {
    assert_eq!(codes(&diagnostics(&mut project(), PROPERTIES, text)), expected);
}

#[test]
fn test_yaml_keys_are_flattened_for_metadata() {
    let text = "quarkus:\n  http:\n    port: high\n  log:\n    levle: INFO\n";
    let found = diagnostics(&mut project(), YAML, text);
    assert_eq!(
        codes(&found),
        vec![DiagnosticCode::ValueTypeMismatch, DiagnosticCode::UnknownConfigProperty]
    );
    assert_eq!(flagged(text, &found), vec!["high", "levle"]);
}
