use quill::ide::{CompletionKind, GotoResult};
use quill::project::Project;
use quill::{CancellationToken, Position};

use crate::helpers::fixtures::{PAGE, PROPERTIES, project};

fn opened(uri: &str, text: &str) -> Project {
    let mut project = project();
    project
        .open_document(uri, text, &CancellationToken::new())
        .unwrap();
    project
}

fn labels(project: &Project, uri: &str, position: Position) -> Vec<String> {
    project
        .analysis(uri)
        .unwrap()
        .completions(position, &CancellationToken::new())
        .unwrap()
        .into_iter()
        .map(|item| item.label.to_string())
        .collect()
}

fn goto(project: &Project, uri: &str, position: Position) -> GotoResult {
    project
        .analysis(uri)
        .unwrap()
        .goto_definition(position, &CancellationToken::new())
        .unwrap()
}

#[test]
fn test_hover_on_member_across_lines() {
    let project = opened(PAGE, "{@org.acme.Item item}\n{item.name}");
    let analysis = project.analysis(PAGE).unwrap();
    let result = analysis
        .hover(Position::new(1, 8), &CancellationToken::new())
        .unwrap()
        .unwrap();
    assert!(result.contents.contains("org.acme.Item.name : java.lang.String"));
    assert_eq!(result.span.start, Position::new(1, 6));
    assert_eq!(result.span.end, Position::new(1, 10));
}

#[test]
fn test_hover_outside_the_document() {
    let project = opened(PAGE, "{missing}");
    let analysis = project.analysis(PAGE).unwrap();
    assert!(
        analysis
            .hover(Position::new(9, 0), &CancellationToken::new())
            .unwrap()
            .is_none()
    );
}

#[test]
fn test_hover_on_config_key() {
    let project = opened(PROPERTIES, "quarkus.http.port=9090\n");
    let analysis = project.analysis(PROPERTIES).unwrap();
    let result = analysis
        .hover(Position::new(0, 9), &CancellationToken::new())
        .unwrap()
        .unwrap();
    assert!(result.contents.contains("Type: `int`"));
    assert!(result.contents.contains("Default: `8080`"));
}

#[test]
fn test_member_completion_through_generic_list() {
    let text = "{@org.acme.Catalog catalog}{catalog.items.get(0).}";
    let project = opened(PAGE, text);
    let found = labels(&project, PAGE, Position::new(0, text.len() as u32 - 1));
    assert!(found.contains(&"name".to_owned()));
    assert!(found.contains(&"discount".to_owned()));
    assert!(!found.contains(&"size".to_owned()));
}

#[test]
fn test_section_completion_offers_user_tags() {
    let project = opened(PAGE, "{#");
    let analysis = project.analysis(PAGE).unwrap();
    let items = analysis
        .completions(Position::new(0, 2), &CancellationToken::new())
        .unwrap();
    let card = items.iter().find(|item| &*item.label == "card").unwrap();
    assert_eq!(card.kind, CompletionKind::UserTag);
    assert_eq!(card.insert_text.as_deref(), Some("card title= /"));
    let builtin = items.iter().find(|item| &*item.label == "if").unwrap();
    assert!(builtin.sort_priority < card.sort_priority);
}

#[test]
fn test_property_key_completion() {
    let project = opened(PROPERTIES, "quarkus.http.");
    assert_eq!(
        labels(&project, PROPERTIES, Position::new(0, 13)),
        vec!["quarkus.http.port"]
    );
}

#[test]
fn test_goto_binding_declaration() {
    let text = "{@org.acme.Item item}\n{item.name}";
    let project = opened(PAGE, text);
    let result = goto(&project, PAGE, Position::new(1, 2));
    assert_eq!(result.targets.len(), 1);
    let target = &result.targets[0];
    assert_eq!(&*target.uri, PAGE);
    assert_eq!(&text[target.range.unwrap()], "item");
    assert_eq!(target.span.start, Position::new(0, 16));
}

#[test]
fn test_goto_user_tag_template() {
    let project = opened(PAGE, "{#card title='x' /}");
    let result = goto(&project, PAGE, Position::new(0, 3));
    assert_eq!(&*result.targets[0].uri, "jar:///app/templates/tags/card.html");
}

#[test]
fn test_goto_on_config_is_empty() {
    let project = opened(PROPERTIES, "quarkus.http.port=1\n");
    assert!(goto(&project, PROPERTIES, Position::new(0, 3)).is_empty());
}
