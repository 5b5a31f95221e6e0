//! Configuration property metadata, key flattening and source ordinals.
//!
//! Properties and YAML documents are both reduced to flat `key = value`
//! entries ([`ConfigEntry`]). Entries are checked against the metadata
//! the oracle reports ([`ConfigMetadata`]) and ranked across documents by
//! ordinal ([`ConfigSources`]).

use std::sync::Arc;

use rustc_hash::FxHashMap;
use smol_str::SmolStr;
use text_size::TextRange;

use crate::parser::properties::unescape;
use crate::syntax::{Document, DocumentKind, NodeId, NodeKind};

// ============================================================================
// METADATA
// ============================================================================

/// How a raw string is turned into an enum constant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ConverterKind {
    /// The constant name as declared.
    Verbatim,
    /// `MY_VALUE` written as `my-value`.
    KebabCase,
}

/// Metadata of one configuration property.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PropertyInfo {
    /// Key, possibly with `{*}` map placeholders and `[*]` indexes.
    pub name: SmolStr,
    pub type_name: SmolStr,
    pub default_value: Option<String>,
    pub enum_values: Vec<SmolStr>,
    pub converter_kinds: Vec<ConverterKind>,
    pub description: Option<String>,
    pub required: bool,
}

impl PropertyInfo {
    pub fn new(name: impl Into<SmolStr>, type_name: impl Into<SmolStr>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            default_value: None,
            enum_values: Vec::new(),
            converter_kinds: Vec::new(),
            description: None,
            required: false,
        }
    }

    pub fn with_default(mut self, value: impl Into<String>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    pub fn with_enum_values(mut self, values: &[&str]) -> Self {
        self.enum_values = values.iter().map(|v| SmolStr::new(v)).collect();
        self
    }

    pub fn with_converter(mut self, kind: ConverterKind) -> Self {
        self.converter_kinds.push(kind);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

/// Property metadata of a project, indexed for key lookup.
#[derive(Clone, Debug, Default)]
pub struct ConfigMetadata {
    exact: FxHashMap<SmolStr, PropertyInfo>,
    patterns: Vec<(Vec<String>, PropertyInfo)>,
}

impl ConfigMetadata {
    pub fn new(properties: impl IntoIterator<Item = PropertyInfo>) -> Self {
        let mut metadata = Self::default();
        for property in properties {
            if property.name.contains("{*}") || property.name.contains("[*]") {
                let segments = split_key(&property.name);
                metadata.patterns.push((segments, property));
            } else {
                metadata.exact.insert(property.name.clone(), property);
            }
        }
        metadata
    }

    pub fn is_empty(&self) -> bool {
        self.exact.is_empty() && self.patterns.is_empty()
    }

    /// Metadata for `key`. A profile prefix is ignored.
    pub fn lookup(&self, key: &str) -> Option<&PropertyInfo> {
        let (_, key) = strip_profile(key);
        if let Some(info) = self.exact.get(key) {
            return Some(info);
        }
        let segments = split_key(key);
        self.patterns
            .iter()
            .find(|(pattern, _)| segments_match(pattern, &segments))
            .map(|(_, info)| info)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PropertyInfo> {
        self.exact
            .values()
            .chain(self.patterns.iter().map(|(_, info)| info))
    }
}

fn segments_match(pattern: &[String], segments: &[String]) -> bool {
    pattern.len() == segments.len()
        && pattern
            .iter()
            .zip(segments)
            .all(|(p, s)| segment_matches(p, s))
}

fn segment_matches(pattern: &str, segment: &str) -> bool {
    if pattern == "{*}" {
        return true;
    }
    match (pattern.strip_suffix("[*]"), segment.strip_suffix(']')) {
        (Some(base), Some(indexed)) => match indexed.split_once('[') {
            Some((name, index)) => {
                segment_matches(base, name) && index.chars().all(|c| c.is_ascii_digit())
            }
            None => false,
        },
        _ => pattern == segment,
    }
}

/// Split a key on `.`, keeping double-quoted segments (which may contain
/// dots) whole and unquoted.
pub fn split_key(key: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    for c in key.chars() {
        match c {
            '"' => quoted = !quoted,
            '.' if !quoted => segments.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    segments.push(current);
    segments
}

/// Split `%profile.key` into its profile and the plain key.
pub fn strip_profile(key: &str) -> (Option<&str>, &str) {
    match key.strip_prefix('%').and_then(|rest| rest.split_once('.')) {
        Some((profile, plain)) if !profile.is_empty() => (Some(profile), plain),
        _ => (None, key),
    }
}

// ============================================================================
// VALUE CHECKS
// ============================================================================

/// A value that cannot be converted to the property's type.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ValueMismatch {
    #[error("'{value}' is not a valid boolean")]
    NotBoolean { value: String },
    #[error("'{value}' is not a valid {type_name}")]
    NotInteger { value: String, type_name: SmolStr },
    #[error("'{value}' is not a valid {type_name}")]
    NotNumber { value: String, type_name: SmolStr },
    #[error("'{value}' is not one of: {}", allowed.join(", "))]
    NotInEnum { value: String, allowed: Vec<String> },
}

/// Check a raw value against a property's type. Empty values and values
/// with `${...}` expressions are accepted.
pub fn check_value(info: &PropertyInfo, value: &str) -> Result<(), ValueMismatch> {
    let value = value.trim();
    if value.is_empty() || value.contains("${") {
        return Ok(());
    }
    let type_name = unwrap_optional(&info.type_name);

    if !info.enum_values.is_empty() {
        let kinds: &[ConverterKind] = if info.converter_kinds.is_empty() {
            &[ConverterKind::Verbatim]
        } else {
            &info.converter_kinds
        };
        let accepted = info
            .enum_values
            .iter()
            .any(|constant| kinds.iter().any(|kind| kind.accepts(constant, value)));
        return if accepted {
            Ok(())
        } else {
            Err(ValueMismatch::NotInEnum {
                value: value.to_owned(),
                allowed: info
                    .enum_values
                    .iter()
                    .map(|c| kinds[0].render(c))
                    .collect(),
            })
        };
    }

    match type_name {
        "boolean" | "java.lang.Boolean" => {
            const ACCEPTED: &[&str] = &["true", "false", "yes", "no", "on", "off", "y", "n", "1", "0"];
            if ACCEPTED.iter().any(|a| a.eq_ignore_ascii_case(value)) {
                Ok(())
            } else {
                Err(ValueMismatch::NotBoolean {
                    value: value.to_owned(),
                })
            }
        }
        "int" | "java.lang.Integer" | "java.util.OptionalInt" => {
            check_integer(value, type_name, i32::MIN as i64, i32::MAX as i64)
        }
        "long" | "java.lang.Long" | "java.util.OptionalLong" => {
            check_integer(value, type_name, i64::MIN, i64::MAX)
        }
        "short" | "java.lang.Short" => check_integer(value, type_name, i16::MIN as i64, i16::MAX as i64),
        "byte" | "java.lang.Byte" => check_integer(value, type_name, i8::MIN as i64, i8::MAX as i64),
        "float" | "double" | "java.lang.Float" | "java.lang.Double" | "java.util.OptionalDouble" => {
            value
                .trim_end_matches(['f', 'F', 'd', 'D'])
                .parse::<f64>()
                .map(|_| ())
                .map_err(|_| ValueMismatch::NotNumber {
                    value: value.to_owned(),
                    type_name: SmolStr::new(type_name),
                })
        }
        _ => Ok(()),
    }
}

fn check_integer(value: &str, type_name: &str, min: i64, max: i64) -> Result<(), ValueMismatch> {
    match value.strip_prefix('+').unwrap_or(value).parse::<i64>() {
        Ok(n) if (min..=max).contains(&n) => Ok(()),
        _ => Err(ValueMismatch::NotInteger {
            value: value.to_owned(),
            type_name: SmolStr::new(type_name),
        }),
    }
}

/// `java.util.Optional<X>` → `X`.
fn unwrap_optional(type_name: &str) -> &str {
    type_name
        .strip_prefix("java.util.Optional<")
        .and_then(|inner| inner.strip_suffix('>'))
        .unwrap_or(type_name)
}

impl ConverterKind {
    fn accepts(&self, constant: &str, value: &str) -> bool {
        match self {
            ConverterKind::Verbatim => constant == value,
            ConverterKind::KebabCase => value == hyphenate(constant) || value == constant,
        }
    }

    fn render(&self, constant: &str) -> String {
        match self {
            ConverterKind::Verbatim => constant.to_owned(),
            ConverterKind::KebabCase => hyphenate(constant),
        }
    }
}

/// `MY_VALUE` / `MyValue` → `my-value`.
pub fn hyphenate(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut prev_lower = false;
    for c in name.chars() {
        if c == '_' {
            out.push('-');
            prev_lower = false;
        } else if c.is_uppercase() {
            if prev_lower {
                out.push('-');
            }
            out.extend(c.to_lowercase());
            prev_lower = false;
        } else {
            out.push(c);
            prev_lower = c.is_lowercase() || c.is_ascii_digit();
        }
    }
    out
}

// ============================================================================
// FLAT ENTRIES
// ============================================================================

/// One `key = value` pair of a config document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConfigEntry {
    /// Full key, profile prefix included.
    pub key: String,
    pub value: Option<String>,
    pub key_range: TextRange,
    pub value_range: Option<TextRange>,
    /// The property node the entry came from.
    pub property: NodeId,
}

/// Flatten a config document. Templates have no entries.
pub fn config_entries(doc: &Document) -> Vec<ConfigEntry> {
    match doc.kind() {
        DocumentKind::Properties => properties_entries(doc),
        DocumentKind::Yaml => flatten_yaml(doc),
        DocumentKind::Template => Vec::new(),
    }
}

fn properties_entries(doc: &Document) -> Vec<ConfigEntry> {
    doc.children(doc.root())
        .iter()
        .filter_map(|&property| {
            let NodeKind::Property(data) = doc.kind_of(property) else {
                return None;
            };
            let key = data.key?;
            Some(ConfigEntry {
                key: unescape(doc.text_of(key)),
                value: data.value.map(|v| unescape(doc.text_of(v))),
                key_range: doc.range(key),
                value_range: data.value.map(|v| doc.range(v)),
                property,
            })
        })
        .collect()
}

/// Flatten YAML mappings to dotted keys. A `~` key stands for its parent
/// key; scalar sequences are joined with `,`; other sequences are indexed
/// as `key[i]`.
pub fn flatten_yaml(doc: &Document) -> Vec<ConfigEntry> {
    let mut entries = Vec::new();
    for &child in doc.children(doc.root()) {
        if matches!(doc.kind_of(child), NodeKind::Mapping { .. }) {
            flatten_mapping(doc, child, "", &mut entries);
        }
    }
    entries
}

fn join_key(prefix: &str, key: &str) -> String {
    match (prefix.is_empty(), key) {
        (_, "~") => prefix.to_owned(),
        (true, _) => key.to_owned(),
        (false, _) => format!("{prefix}.{key}"),
    }
}

fn flatten_mapping(doc: &Document, mapping: NodeId, prefix: &str, out: &mut Vec<ConfigEntry>) {
    for &property in doc.children(mapping) {
        let NodeKind::Property(data) = doc.kind_of(property) else {
            continue;
        };
        let Some(key_node) = data.key else { continue };
        let key = join_key(prefix, doc.scalar_text(key_node));
        let key_range = doc.range(key_node);
        match data.value.map(|v| (v, doc.kind_of(v))) {
            Some((value, NodeKind::Mapping { .. })) => flatten_mapping(doc, value, &key, out),
            Some((value, NodeKind::Sequence { .. })) => {
                flatten_sequence(doc, value, key, key_range, property, out);
            }
            Some((value, _)) => out.push(ConfigEntry {
                key,
                value: Some(doc.scalar_text(value).to_owned()),
                key_range,
                value_range: Some(doc.range(value)),
                property,
            }),
            None => out.push(ConfigEntry {
                key,
                value: None,
                key_range,
                value_range: None,
                property,
            }),
        }
    }
}

fn flatten_sequence(
    doc: &Document,
    sequence: NodeId,
    key: String,
    key_range: TextRange,
    property: NodeId,
    out: &mut Vec<ConfigEntry>,
) {
    let items: Vec<NodeId> = doc
        .children(sequence)
        .iter()
        .copied()
        .filter(|&c| !matches!(doc.kind_of(c), NodeKind::Comment))
        .collect();
    if items
        .iter()
        .all(|&i| matches!(doc.kind_of(i), NodeKind::Scalar(_)))
    {
        let joined: Vec<&str> = items.iter().map(|&i| doc.scalar_text(i)).collect();
        out.push(ConfigEntry {
            key,
            value: Some(joined.join(",")),
            key_range,
            value_range: Some(doc.range(sequence)),
            property,
        });
        return;
    }
    for (index, &item) in items.iter().enumerate() {
        let indexed = format!("{key}[{index}]");
        match doc.kind_of(item) {
            NodeKind::Mapping { .. } => flatten_mapping(doc, item, &indexed, out),
            NodeKind::Sequence { .. } => {
                flatten_sequence(doc, item, indexed, key_range, property, out);
            }
            _ => out.push(ConfigEntry {
                key: indexed,
                value: Some(doc.scalar_text(item).to_owned()),
                key_range,
                value_range: Some(doc.range(item)),
                property,
            }),
        }
    }
}

// ============================================================================
// SOURCES & ORDINALS
// ============================================================================

/// Ordinal of `.properties` documents unless they set `config_ordinal`.
pub const PROPERTIES_ORDINAL: i32 = 250;
/// Ordinal of YAML documents unless they set `config_ordinal`.
pub const YAML_ORDINAL: i32 = 255;

/// A config entry with the document it came from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourcedEntry {
    pub uri: Arc<str>,
    pub ordinal: i32,
    pub entry: ConfigEntry,
}

/// All config documents of a project, for effective-value lookup.
#[derive(Clone, Debug, Default)]
pub struct ConfigSources {
    entries: Vec<SourcedEntry>,
}

impl ConfigSources {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_document(&mut self, doc: &Document) {
        let entries = config_entries(doc);
        let ordinal = entries
            .iter()
            .rev()
            .find(|e| e.key == "config_ordinal")
            .and_then(|e| e.value.as_deref())
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(match doc.kind() {
                DocumentKind::Yaml => YAML_ORDINAL,
                _ => PROPERTIES_ORDINAL,
            });
        self.entries.extend(entries.into_iter().map(|entry| SourcedEntry {
            uri: Arc::clone(doc.uri()),
            ordinal,
            entry,
        }));
    }

    /// The entry that supplies `key` under `profile`: a profile-specific
    /// entry beats the plain key, then the highest ordinal wins, then the
    /// entry added last.
    pub fn effective(&self, key: &str, profile: Option<&str>) -> Option<&SourcedEntry> {
        let (_, plain) = strip_profile(key);
        let best = |wanted: &str| {
            self.entries
                .iter()
                .filter(|e| e.entry.key == wanted)
                .fold(None, |best: Option<&SourcedEntry>, e| match best {
                    Some(b) if b.ordinal > e.ordinal => Some(b),
                    _ => Some(e),
                })
        };
        profile
            .and_then(|p| best(&format!("%{p}.{plain}")))
            .or_else(|| best(plain))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use rstest::rstest;
    use tokio_util::sync::CancellationToken;

    fn doc(uri: &str, text: &str) -> Document {
        parse(uri, text, &CancellationToken::new()).unwrap()
    }

    #[test]
    fn test_strip_profile_and_split() {
        assert_eq!(strip_profile("%dev.a.b"), (Some("dev"), "a.b"));
        assert_eq!(strip_profile("a.b"), (None, "a.b"));
        assert_eq!(strip_profile("%nodot"), (None, "%nodot"));
        assert_eq!(
            split_key("quarkus.log.category.\"io.quarkus\".level"),
            vec!["quarkus", "log", "category", "io.quarkus", "level"]
        );
    }

    #[test]
    fn test_metadata_lookup_with_placeholders() {
        let metadata = ConfigMetadata::new([
            PropertyInfo::new("quarkus.http.port", "int"),
            PropertyInfo::new("quarkus.log.category.{*}.level", "java.lang.String"),
            PropertyInfo::new("app.servers[*].host", "java.lang.String"),
        ]);
        assert!(metadata.lookup("%dev.quarkus.http.port").is_some());
        assert!(metadata.lookup("quarkus.log.category.\"io.quarkus\".level").is_some());
        assert!(metadata.lookup("app.servers[3].host").is_some());
        assert!(metadata.lookup("app.servers.host").is_none());
        assert!(metadata.lookup("quarkus.http.prot").is_none());
    }

    #[rstest]
    #[case("boolean", "YES", true)]
    #[case("boolean", "maybe", false)]
    #[case("int", "8080", true)]
    #[case("int", "99999999999", false)]
    #[case("java.lang.Long", "99999999999", true)]
    #[case("byte", "200", false)]
    #[case("double", "1.5", true)]
    #[case("java.util.Optional<java.lang.Integer>", "x", false)]
    #[case("int", "${port}", true)]
    #[case("java.lang.String", "anything", true)]
    fn test_check_value(#[case] type_name: &str, #[case] value: &str, #[case] ok: bool) {
        let info = PropertyInfo::new("k", type_name);
        assert_eq!(check_value(&info, value).is_ok(), ok);
    }

    #[test]
    fn test_enum_converters() {
        let verbatim = PropertyInfo::new("k", "org.acme.Mode").with_enum_values(&["FAST_MODE"]);
        assert!(check_value(&verbatim, "FAST_MODE").is_ok());
        assert!(check_value(&verbatim, "fast-mode").is_err());

        let kebab = verbatim.clone().with_converter(ConverterKind::KebabCase);
        assert!(check_value(&kebab, "fast-mode").is_ok());
        let err = check_value(&kebab, "slow").unwrap_err();
        assert_eq!(err.to_string(), "'slow' is not one of: fast-mode");
    }

    #[test]
    fn test_flatten_yaml() {
        let d = doc(
            "application.yaml",
            "quarkus:\n  http:\n    cors:\n      ~: true\n      origins: [a, b]\n  list:\n    - name: x\n    - name: y\n",
        );
        let flat: Vec<_> = flatten_yaml(&d)
            .into_iter()
            .map(|e| format!("{}={}", e.key, e.value.unwrap_or_default()))
            .collect();
        assert_eq!(
            flat,
            vec![
                "quarkus.http.cors=true",
                "quarkus.http.cors.origins=a,b",
                "quarkus.list[0].name=x",
                "quarkus.list[1].name=y",
            ]
        );
    }

    #[test]
    fn test_effective_value_ordinals_and_profiles() {
        let props = doc("application.properties", "a=props\n%dev.a=dev\nb=props");
        let yaml = doc("application.yaml", "a: yaml\n");
        let mut sources = ConfigSources::new();
        sources.add_document(&props);
        sources.add_document(&yaml);

        let a = sources.effective("a", None).unwrap();
        assert_eq!(a.entry.value.as_deref(), Some("yaml"));
        assert_eq!(a.ordinal, YAML_ORDINAL);
        let dev = sources.effective("a", Some("dev")).unwrap();
        assert_eq!(dev.entry.value.as_deref(), Some("dev"));
        assert_eq!(
            sources.effective("b", Some("prod")).unwrap().entry.value.as_deref(),
            Some("props")
        );
    }

    #[test]
    fn test_config_ordinal_override() {
        let props = doc("application.properties", "config_ordinal=300\na=props");
        let yaml = doc("application.yaml", "a: yaml\n");
        let mut sources = ConfigSources::new();
        sources.add_document(&yaml);
        sources.add_document(&props);
        assert_eq!(
            sources.effective("a", None).unwrap().entry.value.as_deref(),
            Some("props")
        );
    }
}
