use super::*;
use crate::hir::oracle::StaticOracle;
use crate::hir::types::TypeInfo;
use crate::parser::template;

fn oracle() -> StaticOracle {
    StaticOracle::new()
        .with_type(TypeInfo::new("java.lang.String").with_method("length", &[], "int"))
        .with_type(TypeInfo::new("java.lang.Integer"))
        .with_type(TypeInfo::new("java.lang.Boolean"))
        .with_type(TypeInfo::new("java.math.BigDecimal").with_method("scale", &[], "int"))
        .with_type(
            TypeInfo::new("java.util.List")
                .with_type_params(&["E"])
                .with_method("get", &["int"], "E")
                .with_method("size", &[], "int"),
        )
        .with_type(
            TypeInfo::new("java.util.Map")
                .with_type_params(&["K", "V"])
                .with_method("get", &["java.lang.Object"], "V"),
        )
        .with_type(
            TypeInfo::new("java.util.Map.Entry")
                .with_type_params(&["K", "V"])
                .with_method("getKey", &[], "K")
                .with_method("getValue", &[], "V"),
        )
        .with_type(
            TypeInfo::new("io.smallrye.mutiny.Uni").with_type_params(&["T"]),
        )
        .with_type(
            TypeInfo::new("org.acme.Base")
                .with_type_params(&["T"])
                .with_field("id", "T"),
        )
        .with_type(
            TypeInfo::new("org.acme.Item")
                .with_super_type("org.acme.Base<java.lang.Integer>")
                .with_field("name", "java.lang.String")
                .with_method("getPrice", &[], "java.math.BigDecimal")
                .with_method("children", &[], "java.util.List<org.acme.Item>")
                .with_method("related", &[], "io.smallrye.mutiny.Uni<org.acme.Item>"),
        )
        .with_type(
            TypeInfo::new("org.acme.Items").with_super_type("java.util.List<org.acme.Item>"),
        )
        .with_type(
            TypeInfo::new("org.acme.Beans").with_method("items", &[], "java.util.List<org.acme.Item>"),
        )
}

fn resolver(oracle: StaticOracle) -> Resolver {
    Resolver::new(Arc::new(oracle), Arc::new(ResolutionCache::new()))
        .with_namespaces(vec![NamespaceResolver::new("inject", "org.acme.Beans")])
}

fn parse(text: &str) -> Document {
    template::parse(text, "file:///t/page.html", &CancellationToken::new()).unwrap()
}

/// Top-level expressions (not section parameters or arguments).
fn expressions(doc: &Document) -> Vec<NodeId> {
    doc.ids()
        .filter(|&id| {
            matches!(doc.kind_of(id), NodeKind::Expression(_))
                && !doc
                    .parent(id)
                    .is_some_and(|p| matches!(doc.kind_of(p), NodeKind::Parameter(_) | NodeKind::MethodPart(_)))
        })
        .collect()
}

/// Resolved type name per link; `?` for unknown and `!` for unresolved.
fn describe(doc: &Document, text_index: usize, resolver: &Resolver) -> Vec<String> {
    let expr = expressions(doc)[text_index];
    let chain = resolver
        .resolve_chain(doc, expr, &CancellationToken::new())
        .unwrap();
    chain
        .links
        .iter()
        .map(|link| match &link.state {
            LinkState::Resolved(ty) => ty.to_string(),
            LinkState::Unknown => "?".to_owned(),
            LinkState::Unresolved => "!".to_owned(),
        })
        .collect()
}

#[test]
fn test_declared_chain() {
    let doc = parse("{@org.acme.Item item}{item.price.scale}");
    assert_eq!(
        describe(&doc, 0, &resolver(oracle())),
        vec!["org.acme.Item", "java.math.BigDecimal", "java.lang.Integer"]
    );
}

#[test]
fn test_unresolved_member_keeps_prefix() {
    let doc = parse("{@org.acme.Item item}{item.nme.size}");
    let r = resolver(oracle());
    assert_eq!(describe(&doc, 0, &r), vec!["org.acme.Item", "!"]);

    let chain = r
        .resolve_chain(&doc, expressions(&doc)[0], &CancellationToken::new())
        .unwrap();
    let (index, _) = chain.first_unresolved().unwrap();
    assert_eq!(chain.base_type(index).unwrap().name(), "org.acme.Item");
    assert!(chain.result_type(&doc).is_none());
}

#[test]
fn test_unknown_object_is_unresolved() {
    let doc = parse("{missing.name}");
    assert_eq!(describe(&doc, 0, &resolver(oracle())), vec!["!"]);
}

#[test]
fn test_inherited_generic_member() {
    let doc = parse("{@org.acme.Item item}{item.id}");
    assert_eq!(
        describe(&doc, 0, &resolver(oracle())),
        vec!["org.acme.Item", "java.lang.Integer"]
    );
}

#[test]
fn test_loop_element_types() {
    let doc = parse(
        "{@java.util.List<org.acme.Item> items}{@org.acme.Item[] array}{@org.acme.Items custom}\
         {#for a in items}{a.name}{/for}{#each array}{it.name}{/each}{#for c in custom}{c.name}{/for}",
    );
    let r = resolver(oracle());
    for index in 0..3 {
        assert_eq!(
            describe(&doc, index, &r),
            vec!["org.acme.Item", "java.lang.String"],
            "expression {index}"
        );
    }
}

#[test]
fn test_map_iterates_entries() {
    let doc = parse(
        "{@java.util.Map<java.lang.String, org.acme.Item> map}{#for e in map}{e.value.name}{/for}",
    );
    assert_eq!(
        describe(&doc, 0, &resolver(oracle())),
        vec![
            "java.util.Map.Entry<java.lang.String, org.acme.Item>",
            "org.acme.Item",
            "java.lang.String"
        ]
    );
}

#[test]
fn test_async_unwrapped_before_member_lookup() {
    let doc = parse("{@org.acme.Item item}{item.related.name}");
    assert_eq!(
        describe(&doc, 0, &resolver(oracle())),
        vec![
            "org.acme.Item",
            "io.smallrye.mutiny.Uni<org.acme.Item>",
            "java.lang.String"
        ]
    );
}

#[test]
fn test_let_and_with_bindings() {
    let doc = parse(
        "{@org.acme.Item item}{#let p=item.price}{p.scale}{/let}{#with item}{name.length}{/with}",
    );
    let r = resolver(oracle());
    assert_eq!(
        describe(&doc, 0, &r),
        vec!["java.math.BigDecimal", "java.lang.Integer"]
    );
    assert_eq!(
        describe(&doc, 1, &r),
        vec!["java.lang.String", "java.lang.Integer"]
    );
}

#[test]
fn test_namespace_root() {
    let doc = parse("{inject:items.size}{cdi:items}");
    let r = resolver(oracle());
    assert_eq!(
        describe(&doc, 0, &r),
        vec!["java.util.List<org.acme.Item>", "java.lang.Integer"]
    );
    assert_eq!(describe(&doc, 1, &r), vec!["!"]);
}

#[test]
fn test_builtins_and_literals() {
    let doc = parse("{@org.acme.Item item}{item.name.or('x').length}{'abc'.length}{item.ifTruthy(12)}");
    let r = resolver(oracle());
    assert_eq!(
        describe(&doc, 0, &r),
        vec!["org.acme.Item", "java.lang.String", "java.lang.String", "java.lang.Integer"]
    );
    assert_eq!(describe(&doc, 1, &r), vec!["java.lang.String", "java.lang.Integer"]);
    assert_eq!(describe(&doc, 2, &r), vec!["org.acme.Item", "java.lang.Integer"]);
}

#[test]
fn test_oracle_failure_is_unknown() {
    let oracle = oracle();
    oracle.set_unavailable(true);
    let doc = parse("{@org.acme.Item item}{item.name}");
    assert_eq!(describe(&doc, 0, &resolver(oracle)), vec!["?", "?"]);
}

#[test]
fn test_missing_declared_type_is_unknown() {
    let doc = parse("{@org.acme.Gone item}{item.name}");
    assert_eq!(describe(&doc, 0, &resolver(oracle())), vec!["?", "?"]);
}

#[test]
fn test_lookups_are_cached() {
    let oracle = Arc::new(oracle());
    let r = Resolver::new(oracle.clone(), Arc::new(ResolutionCache::new()));
    let doc = parse("{@org.acme.Item item}{item.name}{item.name}");
    for index in 0..2 {
        describe(&doc, index, &r);
    }
    // org.acme.Item once, java.lang.String once
    assert_eq!(oracle.type_lookups(), 2);
}

#[test]
fn test_members_of_includes_inherited() {
    let r = resolver(oracle());
    let LinkState::Resolved(item) = r.resolve_type_name("org.acme.Item") else {
        panic!("Item should resolve");
    };
    let members = r.members_of(&item);
    let id = members.iter().find(|m| m.name == "id").unwrap();
    assert_eq!(id.return_type.name, "java.lang.Integer");
}

#[test]
fn test_cancelled() {
    let doc = parse("{@org.acme.Item item}{item.name}");
    let cancel = CancellationToken::new();
    cancel.cancel();
    let expr = expressions(&doc)[0];
    assert_eq!(
        resolver(oracle()).resolve_chain(&doc, expr, &cancel),
        Err(Cancelled)
    );
}
