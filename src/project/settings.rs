//! Client-facing project settings.
//!
//! These mirror the JSON payloads an editor sends (camelCase keys) and are
//! turned into the [`DiagnosticOptions`] the checker reads.

use std::collections::BTreeMap;
use std::path::PathBuf;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::base::PositionEncoding;
use crate::hir::{CheckOptions, DiagnosticCode, DiagnosticOptions, ExclusionFilter, NamespaceResolver, Severity};

/// Severity as written in settings. `ignore` turns a check off.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeverityLevel {
    Error,
    Warning,
    Info,
    Hint,
    Ignore,
}

impl SeverityLevel {
    fn severity(self) -> Option<Severity> {
        match self {
            SeverityLevel::Error => Some(Severity::Error),
            SeverityLevel::Warning => Some(Severity::Warning),
            SeverityLevel::Info => Some(Severity::Info),
            SeverityLevel::Hint => Some(Severity::Hint),
            SeverityLevel::Ignore => None,
        }
    }
}

/// Settings of one check, keyed by its code name (`unknownObject`, ...).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CheckSettings {
    pub severity: Option<SeverityLevel>,
    /// Globs matched against the reported key.
    pub excluded: Vec<String>,
}

/// Validation settings of a project.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ValidationSettings {
    pub enabled: bool,
    /// Globs excluding keys from every check.
    pub excluded: Vec<String>,
    pub checks: BTreeMap<String, CheckSettings>,
    /// Globs matched against document URIs.
    pub disabled_documents: Vec<String>,
}

impl Default for ValidationSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            excluded: Vec::new(),
            checks: BTreeMap::new(),
            disabled_documents: Vec::new(),
        }
    }
}

impl ValidationSettings {
    pub fn with_excluded(mut self, pattern: impl Into<String>) -> Self {
        self.excluded.push(pattern.into());
        self
    }

    pub fn with_severity(mut self, code: DiagnosticCode, level: SeverityLevel) -> Self {
        self.checks.entry(code.as_str().to_owned()).or_default().severity = Some(level);
        self
    }

    pub fn with_check_excluded(mut self, code: DiagnosticCode, pattern: impl Into<String>) -> Self {
        self.checks
            .entry(code.as_str().to_owned())
            .or_default()
            .excluded
            .push(pattern.into());
        self
    }

    pub fn with_disabled_document(mut self, pattern: impl Into<String>) -> Self {
        self.disabled_documents.push(pattern.into());
        self
    }

    /// Compile globs and resolve check names. Unknown check names are
    /// logged and skipped.
    pub fn to_options(&self) -> DiagnosticOptions {
        let mut checks = FxHashMap::default();
        for (name, settings) in &self.checks {
            let Some(code) = DiagnosticCode::from_name(name) else {
                warn!(check = %name, "unknown check in validation settings");
                continue;
            };
            checks.insert(
                code,
                CheckOptions {
                    severity: settings.severity.and_then(SeverityLevel::severity),
                    ignore: settings.severity == Some(SeverityLevel::Ignore),
                    exclusions: ExclusionFilter::new(&settings.excluded),
                },
            );
        }
        DiagnosticOptions {
            enabled: self.enabled,
            exclusions: ExclusionFilter::new(&self.excluded),
            checks,
            disabled_documents: ExclusionFilter::new(&self.disabled_documents),
        }
    }
}

/// Everything a project is configured with besides its documents.
#[derive(Clone, Debug, Default)]
pub struct ProjectSettings {
    pub validation: ValidationSettings,
    /// Directories holding user tag templates.
    pub tag_roots: Vec<PathBuf>,
    pub namespaces: Vec<NamespaceResolver>,
    pub encoding: PositionEncoding,
}

impl ProjectSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_validation(mut self, validation: ValidationSettings) -> Self {
        self.validation = validation;
        self
    }

    pub fn with_tag_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.tag_roots.push(root.into());
        self
    }

    pub fn with_namespace(mut self, namespace: NamespaceResolver) -> Self {
        self.namespaces.push(namespace);
        self
    }

    pub fn with_encoding(mut self, encoding: PositionEncoding) -> Self {
        self.encoding = encoding;
        self
    }
}
