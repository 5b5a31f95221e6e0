//! Template scopes: which names are bound at a given node.
//!
//! Bindings come from enclosing sections (loop aliases and their metadata,
//! `let`/`set` assignments, `with` objects), nearest first, then from the
//! document's `{@type alias}` declarations.

use smol_str::SmolStr;
use text_size::TextRange;

use crate::syntax::{Document, NodeId, NodeKind, SectionKind};

use super::types::TypeSignature;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BindingKind {
    /// `{@org.acme.Item item}`
    Declaration,
    /// `{#for item in items}` / `{#each items}` (`it`)
    LoopAlias,
    /// `item_index`, `item_hasNext`, ...
    LoopMetadata,
    /// `{#let name=value}` / `{#set}`
    Let,
}

/// Where the type of a binding comes from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BindingType {
    /// Written in a declaration.
    Declared(TypeSignature),
    /// The type of an expression node.
    Expression(NodeId),
    /// The element type of the iterable expression node.
    ElementOf(NodeId),
    Fixed(TypeSignature),
    Unknown,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Binding {
    pub name: SmolStr,
    pub kind: BindingKind,
    /// Node that introduces the binding.
    pub node: NodeId,
    /// Range to navigate to (the name, when written).
    pub range: TextRange,
    pub ty: BindingType,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ScopeEntry {
    Binding(Binding),
    /// `{#with obj}`: members of `obj` are visible unqualified.
    With { section: NodeId, expression: NodeId },
}

/// Loop metadata suffixes (`item_index`, `item_hasNext`, ...) and their types.
pub const LOOP_METADATA: &[(&str, &str)] = &[
    ("index", "java.lang.Integer"),
    ("count", "java.lang.Integer"),
    ("hasNext", "java.lang.Boolean"),
    ("isFirst", "java.lang.Boolean"),
    ("isLast", "java.lang.Boolean"),
    ("odd", "java.lang.Boolean"),
    ("even", "java.lang.Boolean"),
    ("indexParity", "java.lang.String"),
];

/// Scope entries visible at `at`, nearest first.
pub fn visible_scopes(doc: &Document, at: NodeId) -> Vec<ScopeEntry> {
    let mut entries = Vec::new();
    let mut via = at;
    for ancestor in doc.ancestors(at) {
        if let NodeKind::Section(section) = doc.kind_of(ancestor)
            && !hides_bindings(doc, section.kind, via)
        {
            section_entries(doc, ancestor, section.kind, &mut entries);
        }
        via = ancestor;
    }
    entries.extend(declarations(doc).map(ScopeEntry::Binding));
    entries
}

/// A section's own parameters cannot see its bindings, and neither can the
/// `{#else}` branch of a loop (it runs when there is nothing to iterate).
fn hides_bindings(doc: &Document, kind: SectionKind, via: NodeId) -> bool {
    match doc.kind_of(via) {
        NodeKind::Parameter(_) => true,
        NodeKind::Section(child) => {
            child.kind == SectionKind::Else
                && matches!(kind, SectionKind::For | SectionKind::Each)
        }
        _ => false,
    }
}

fn section_entries(doc: &Document, section: NodeId, kind: SectionKind, out: &mut Vec<ScopeEntry>) {
    let parameters = doc.children(section).iter().filter_map(|&c| match doc.kind_of(c) {
        NodeKind::Parameter(data) => Some((c, data)),
        _ => None,
    });
    let expression_of = |parameter: NodeId| {
        doc.children(parameter)
            .iter()
            .copied()
            .find(|&c| matches!(doc.kind_of(c), NodeKind::Expression(_)))
    };

    match kind {
        SectionKind::For | SectionKind::Each => {
            for (parameter, data) in parameters.take(1) {
                let Some(name) = data.name.clone() else { continue };
                let range = data.name_range.unwrap_or_else(|| doc.range(parameter));
                let ty = expression_of(parameter)
                    .map(BindingType::ElementOf)
                    .unwrap_or(BindingType::Unknown);
                for (suffix, type_name) in LOOP_METADATA {
                    out.push(ScopeEntry::Binding(Binding {
                        name: SmolStr::new(format!("{name}_{suffix}")),
                        kind: BindingKind::LoopMetadata,
                        node: parameter,
                        range,
                        ty: BindingType::Fixed(TypeSignature::simple(*type_name)),
                    }));
                }
                out.push(ScopeEntry::Binding(Binding {
                    name,
                    kind: BindingKind::LoopAlias,
                    node: parameter,
                    range,
                    ty,
                }));
            }
        }
        SectionKind::Let | SectionKind::Set => {
            // later assignments shadow earlier ones
            let mut assigned: Vec<ScopeEntry> = parameters
                .filter_map(|(parameter, data)| {
                    let name = data.name.clone()?;
                    Some(ScopeEntry::Binding(Binding {
                        name,
                        kind: BindingKind::Let,
                        node: parameter,
                        range: data.name_range.unwrap_or_else(|| doc.range(parameter)),
                        ty: expression_of(parameter)
                            .map(BindingType::Expression)
                            .unwrap_or(BindingType::Unknown),
                    }))
                })
                .collect();
            assigned.reverse();
            out.extend(assigned);
        }
        SectionKind::With => {
            if let Some(expression) = parameters
                .map(|(p, _)| p)
                .next()
                .and_then(expression_of)
            {
                out.push(ScopeEntry::With {
                    section,
                    expression,
                });
            }
        }
        _ => {}
    }
}

/// `{@type alias}` declarations in document order.
pub fn declarations(doc: &Document) -> impl Iterator<Item = Binding> + '_ {
    doc.ids().filter_map(move |id| match doc.kind_of(id) {
        NodeKind::ParameterDeclaration(data) => Some(Binding {
            name: data.alias.clone(),
            kind: BindingKind::Declaration,
            node: id,
            range: data.alias_range,
            ty: BindingType::Declared(TypeSignature::parse(&data.type_name)),
        }),
        _ => None,
    })
}

/// Nearest binding named `name` visible at `at`.
pub fn lookup(doc: &Document, at: NodeId, name: &str) -> Option<Binding> {
    visible_scopes(doc, at).into_iter().find_map(|entry| match entry {
        ScopeEntry::Binding(binding) if binding.name == name => Some(binding),
        _ => None,
    })
}

/// Every binding visible at `at`, shadowed names removed.
pub fn visible_bindings(doc: &Document, at: NodeId) -> Vec<Binding> {
    let mut seen = rustc_hash::FxHashSet::default();
    visible_scopes(doc, at)
        .into_iter()
        .filter_map(|entry| match entry {
            ScopeEntry::Binding(binding) => Some(binding),
            ScopeEntry::With { .. } => None,
        })
        .filter(|binding| seen.insert(binding.name.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::template;
    use tokio_util::sync::CancellationToken;

    fn parse(text: &str) -> Document {
        template::parse(text, "file:///t/page.html", &CancellationToken::new()).unwrap()
    }

    /// The object part whose name is `name`, last occurrence.
    fn object_part(doc: &Document, name: &str) -> NodeId {
        doc.ids()
            .filter(|&id| matches!(doc.kind_of(id), NodeKind::ObjectPart(p) if p.name == name))
            .last()
            .unwrap()
    }

    fn names(doc: &Document, at: NodeId) -> Vec<String> {
        visible_bindings(doc, at)
            .into_iter()
            .filter(|b| b.kind != BindingKind::LoopMetadata)
            .map(|b| b.name.to_string())
            .collect()
    }

    #[test]
    fn test_loop_alias_and_declarations() {
        let doc = parse("{@org.acme.Item[] items}{#for item in items}{item.name}{/for}");
        let part = object_part(&doc, "item");
        assert_eq!(names(&doc, part), vec!["item", "items"]);
        let alias = lookup(&doc, part, "item").unwrap();
        assert_eq!(alias.kind, BindingKind::LoopAlias);
        assert!(matches!(alias.ty, BindingType::ElementOf(_)));
        assert_eq!(doc.slice(alias.range), "item");
    }

    #[test]
    fn test_loop_metadata() {
        let doc = parse("{#for item in items}{item_count}{/for}");
        let part = object_part(&doc, "item_count");
        let binding = lookup(&doc, part, "item_count").unwrap();
        assert_eq!(
            binding.ty,
            BindingType::Fixed(TypeSignature::simple("java.lang.Integer"))
        );
    }

    #[test]
    fn test_iterable_does_not_see_own_alias() {
        let doc = parse("{#for item in item.children}{/for}");
        let part = object_part(&doc, "item");
        assert!(lookup(&doc, part, "item").is_none());
    }

    #[test]
    fn test_each_binds_it_but_not_in_else() {
        let doc = parse("{#each items}{it}{#else}{it}{/each}");
        let parts: Vec<_> = doc
            .ids()
            .filter(|&id| matches!(doc.kind_of(id), NodeKind::ObjectPart(p) if p.name == "it"))
            .collect();
        assert_eq!(parts.len(), 2);
        assert!(lookup(&doc, parts[0], "it").is_some());
        assert!(lookup(&doc, parts[1], "it").is_none());
    }

    #[test]
    fn test_let_and_with() {
        let doc = parse("{#with item}{#let total=item.price}{name}{/let}{/with}");
        let part = object_part(&doc, "name");
        let scopes = visible_scopes(&doc, part);
        assert!(matches!(&scopes[0], ScopeEntry::Binding(b) if b.name == "total"));
        assert!(matches!(scopes[1], ScopeEntry::With { .. }));
    }

    #[test]
    fn test_nearest_binding_shadows() {
        let doc = parse("{@java.lang.String item}{#for item in items}{item}{/for}");
        let part = object_part(&doc, "item");
        assert_eq!(lookup(&doc, part, "item").unwrap().kind, BindingKind::LoopAlias);
    }
}
