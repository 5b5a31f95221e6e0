//! "Did you mean" candidates for unresolved names.

use smol_str::SmolStr;

use crate::hir::{
    ConfigMetadata, Diagnostic, DiagnosticData, LinkState, MemberForm, MemberKind, Resolver,
    strip_profile, visible_bindings,
};
use crate::syntax::Document;

/// Whether `candidate` is close enough to `name` to be offered.
///
/// Distances are Levenshtein over chars. The candidate also matches when its
/// leading run of `name`'s length does, so `stri` finds `string`.
pub fn is_similar(name: &str, candidate: &str) -> bool {
    let len = name.chars().count();
    if len == 0 || name == candidate {
        return false;
    }
    let threshold = len * 2 / 5;
    if strsim::levenshtein(name, candidate) <= threshold {
        return true;
    }
    let prefix_end = candidate
        .char_indices()
        .nth(len)
        .map_or(candidate.len(), |(i, _)| i);
    strsim::levenshtein(name, &candidate[..prefix_end]) <= threshold
}

/// Similar candidates, closest first. Duplicates are dropped.
pub fn similar_names<'c>(name: &str, candidates: impl IntoIterator<Item = &'c str>) -> Vec<&'c str> {
    let mut found: Vec<(usize, &str)> = Vec::new();
    for candidate in candidates {
        if found.iter().any(|(_, c)| *c == candidate) || !is_similar(name, candidate) {
            continue;
        }
        found.push((strsim::levenshtein(name, candidate), candidate));
    }
    found.sort_by_key(|&(distance, _)| distance);
    found.into_iter().map(|(_, c)| c).collect()
}

/// Replacement names for the subject of `diagnostic`.
pub fn suggestions(
    resolver: &Resolver,
    doc: &Document,
    config: &ConfigMetadata,
    diagnostic: &Diagnostic,
) -> Vec<SmolStr> {
    let Some(data) = &diagnostic.data else {
        return Vec::new();
    };
    let candidates: Vec<SmolStr> = match data {
        DiagnosticData::Reference { part, .. } => visible_bindings(doc, *part)
            .into_iter()
            .map(|b| b.name)
            .collect(),
        DiagnosticData::Member { base_type, kind, .. } => {
            let LinkState::Resolved(base) = resolver.resolve_type_name(base_type) else {
                return Vec::new();
            };
            let mut names = Vec::new();
            for member in resolver.members_of(&base) {
                match kind {
                    MemberKind::Method => {
                        if member.form == MemberForm::Method {
                            names.push(member.name.clone());
                        }
                    }
                    MemberKind::Property => {
                        if let Some(property) = member.getter_property() {
                            names.push(SmolStr::new(property));
                        }
                        names.push(member.name.clone());
                    }
                }
            }
            names
        }
        DiagnosticData::ConfigKey { .. } => config.iter().map(|p| p.name.clone()).collect(),
        DiagnosticData::Namespace { .. } => resolver
            .namespaces()
            .iter()
            .map(|n| n.namespace.clone())
            .collect(),
    };

    let name = match data {
        DiagnosticData::Reference { name, .. } | DiagnosticData::Member { name, .. } => name.as_str(),
        DiagnosticData::ConfigKey { key } => strip_profile(key).1,
        DiagnosticData::Namespace { namespace } => namespace.as_str(),
    };
    similar_names(name, candidates.iter().map(SmolStr::as_str))
        .into_iter()
        .map(SmolStr::new)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("stri", "string", true)]
    #[case("abc", "string", false)]
    #[case("nme", "name", true)]
    #[case("iten", "item", true)]
    #[case("itme", "item", false)]
    #[case("x", "y", false)]
    #[case("x", "xs", true)]
    #[case("name", "name", false)]
    #[case("", "name", false)]
    #[case("prise", "price", true)]
    fn test_is_similar(#[case] name: &str, #[case] candidate: &str, #[case] expected: bool) {
        assert_eq!(is_similar(name, candidate), expected);
    }

    #[test]
    fn test_similar_names_sorted_and_deduplicated() {
        let found = similar_names("itms", ["itmz", "items", "other", "items", "item"]);
        assert_eq!(found, vec!["itmz", "items"]);
    }

    #[test]
    fn test_multibyte_prefix() {
        assert!(is_similar("größ", "größe"));
    }
}
