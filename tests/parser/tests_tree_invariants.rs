use rstest::rstest;

use quill::syntax::{DocumentKind, NodeKind};

use crate::helpers::assertions::assert_well_nested;
use crate::helpers::fixtures::{PAGE, PROPERTIES, YAML, parse};

#[rstest]
#[case(PAGE, "")]
#[case(PAGE, "<p>{item.name}</p>")]
#[case(PAGE, "{#for item in items}{item_index}: {item.name ?: 'x'}{/for}")]
#[case(PAGE, "{#if a}{#else}{b}{/if}")]
#[case(PAGE, "{#each items}{it}{/each")]
#[case(PAGE, "{#let x=1 y='two'}{x}{y}{/let}{/for}")]
#[case(PAGE, "{item.method(a.b, 'c').name??}")]
#[case(PAGE, "{{{{ }}}} {! unterminated")]
#[case(PAGE, "{#card title=item.name /}{@java.util.List<org.acme.Item> items}")]
#[case(PAGE, "\\{escaped} { spaced } {#}")]
#[case(PROPERTIES, "a=1\n# comment\n%dev.b : 2\nc\nd = multi \\\n  line\n")]
#[case(PROPERTIES, "=\n:\n\\\n")]
#[case(YAML, "a:\n  b: 1\n  c:\n    - x\n    - y\nd: [1, 2, {e: f}]\n")]
#[case(YAML, "a: {b: [1, 2\nc:\n- - - \n---\n: : :")]
#[case(YAML, "\u{feff}key: 'quoted: value'\nother: \"dq \\\" esc\"\n")]
fn test_parse_terminates_with_nested_ranges(#[case] uri: &str, #[case] text: &str) {
    let doc = parse(uri, text);
    assert_eq!(doc.range(doc.root()).len(), text.len().try_into().unwrap());
    assert_well_nested(&doc);
}

#[test]
fn test_every_prefix_parses() {
    let sources = [
        (PAGE, "{#for item in cdi:items}{#if item.name}{item.name.length()}{/if}{/for}"),
        (PROPERTIES, "%dev.quarkus.http.port=8080\nquarkus.log.level : INFO\n"),
        (YAML, "quarkus:\n  http: {port: 8080, host: [a, b]}\n  log:\n    - level: INFO\n"),
    ];
    for (uri, text) in sources {
        for end in (0..=text.len()).filter(|&i| text.is_char_boundary(i)) {
            assert_well_nested(&parse(uri, &text[..end]));
        }
    }
}

#[rstest]
#[case(PAGE, "{#for x in list}{x.name}{#if x}{x}{/if}{/for}{missing")]
#[case(PROPERTIES, "a=1\nb\n%prod.c:3\n")]
#[case(YAML, "root:\n  - a: 1\n    b: [x, y\n")]
fn test_reparse_is_deterministic(#[case] uri: &str, #[case] text: &str) {
    assert_eq!(parse(uri, text), parse(uri, text));
}

#[test]
fn test_document_kind_from_uri() {
    assert_eq!(parse(PAGE, "").kind(), DocumentKind::Template);
    assert_eq!(parse(PROPERTIES, "").kind(), DocumentKind::Properties);
    assert_eq!(parse(YAML, "").kind(), DocumentKind::Yaml);
    assert_eq!(parse("file:///app/application.yml", "").kind(), DocumentKind::Yaml);
}

#[test]
fn test_unterminated_section_stays_open() {
    let text = "{#if ok}{#for x in xs}{x}{/if}{#each ys}";
    let doc = parse(PAGE, text);
    let sections: Vec<(String, bool)> = doc
        .ids()
        .filter_map(|id| match doc.kind_of(id) {
            NodeKind::Section(data) => Some((data.name.to_string(), doc.node(id).closed)),
            _ => None,
        })
        .collect();
    // `{/if}` ends the `for` it skips over, which stays unclosed
    assert_eq!(
        sections,
        vec![
            ("if".to_owned(), true),
            ("for".to_owned(), false),
            ("each".to_owned(), false),
        ]
    );
}

#[test]
fn test_property_without_separator() {
    let doc = parse(PROPERTIES, "a=1\nbroken\n");
    let separators: Vec<bool> = doc
        .ids()
        .filter_map(|id| match doc.kind_of(id) {
            NodeKind::Property(data) => Some(data.separator.is_some()),
            _ => None,
        })
        .collect();
    assert_eq!(separators, vec![true, false]);
}
