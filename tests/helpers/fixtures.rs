//! Shared oracle and project fixtures.

use std::sync::Arc;

use quill::hir::{NamespaceResolver, PropertyInfo, StaticOracle, TagPayload, TypeInfo};
use quill::project::{Project, ProjectSettings, ValidationSettings};
use quill::{CancellationToken, Document, ProjectId};

pub const PAGE: &str = "file:///app/src/main/resources/templates/page.html";
pub const PROPERTIES: &str = "file:///app/src/main/resources/application.properties";
pub const YAML: &str = "file:///app/src/main/resources/application.yaml";

/// A small catalogue domain.
pub fn oracle() -> StaticOracle {
    StaticOracle::new()
        .with_type(
            TypeInfo::new("java.lang.String")
                .with_doc("A character sequence.")
                .with_method("length", &[], "int")
                .with_method("isEmpty", &[], "boolean"),
        )
        .with_type(TypeInfo::new("java.lang.Integer"))
        .with_type(TypeInfo::new("java.lang.Boolean"))
        .with_type(
            TypeInfo::new("java.util.List")
                .with_type_params(&["E"])
                .with_method("get", &["int"], "E")
                .with_method("size", &[], "int"),
        )
        .with_type(
            TypeInfo::new("org.acme.Item")
                .with_field("name", "java.lang.String")
                .with_method("getPrice", &[], "java.lang.Integer")
                .with_method("discount", &["int"], "java.lang.Integer"),
        )
        .with_type(
            TypeInfo::new("org.acme.Catalog")
                .with_method("items", &[], "java.util.List<org.acme.Item>"),
        )
        .with_tag(TagPayload::new(
            "card",
            "{#if subtitle}{subtitle}{/if}{title}",
            "jar:///app/templates/tags/card.html",
        ))
        .with_property(PropertyInfo::new("quarkus.http.port", "int").with_default("8080"))
        .with_property(PropertyInfo::new("quarkus.log.enabled", "boolean"))
        .with_property(
            PropertyInfo::new("quarkus.log.level", "java.util.logging.Level")
                .with_enum_values(&["INFO", "DEBUG", "WARNING"]),
        )
        .with_property(PropertyInfo::new("org.acme.Client/mp-rest/url", "java.lang.String"))
}

pub fn settings() -> ProjectSettings {
    ProjectSettings::new().with_namespace(NamespaceResolver::new("cdi", "org.acme.Catalog"))
}

pub fn project() -> Project {
    project_with(ValidationSettings::default())
}

pub fn project_with(validation: ValidationSettings) -> Project {
    Project::new(
        ProjectId::new("app"),
        Arc::new(oracle()),
        settings().with_validation(validation),
    )
}

/// Parse a document with a fresh token.
pub fn parse(uri: &str, text: &str) -> Document {
    quill::parse(uri, text, &CancellationToken::new()).expect("not cancelled")
}
