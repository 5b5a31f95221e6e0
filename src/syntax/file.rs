//! Document kinds recognised by the parsers.

/// The front end a document is parsed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentKind {
    /// HTML-like markup with `{...}` expressions and `{#...}` sections.
    Template,
    /// `key=value` configuration.
    Properties,
    /// Block/flow structured configuration.
    Yaml,
}

impl DocumentKind {
    /// Pick the kind from a URI or path. Anything that is not a
    /// configuration file is treated as a template.
    pub fn from_uri(uri: &str) -> Self {
        let path = uri.split(['?', '#']).next().unwrap_or(uri);
        let extension = path
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();
        match extension.as_str() {
            "properties" => DocumentKind::Properties,
            "yaml" | "yml" => DocumentKind::Yaml,
            _ => DocumentKind::Template,
        }
    }

    /// Whether documents of this kind hold configuration keys.
    pub fn is_config(&self) -> bool {
        matches!(self, DocumentKind::Properties | DocumentKind::Yaml)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_uri() {
        assert_eq!(
            DocumentKind::from_uri("file:///app/application.properties"),
            DocumentKind::Properties
        );
        assert_eq!(DocumentKind::from_uri("file:///a/app.YML"), DocumentKind::Yaml);
        assert_eq!(
            DocumentKind::from_uri("file:///t/templates/page.html"),
            DocumentKind::Template
        );
        assert_eq!(DocumentKind::from_uri("untitled"), DocumentKind::Template);
    }
}
