//! Quick fixes for reference and configuration diagnostics.

use std::sync::Arc;

use indexmap::IndexMap;
use text_size::{TextRange, TextSize};

use crate::base::Span;
use crate::hir::{Diagnostic, DiagnosticCode, DiagnosticData};
use crate::parser::expression::expression_end;
use crate::syntax::Document;

use super::analysis::Analysis;
use super::suggest::suggestions;

/// Type used when declaring an unknown object.
const FALLBACK_TYPE: &str = "java.lang.Object";

/// Replace `range` with `new_text`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextEdit {
    pub range: TextRange,
    /// Editor span of `range`.
    pub span: Span,
    pub new_text: String,
}

impl TextEdit {
    pub fn replace(doc: &Document, range: TextRange, new_text: impl Into<String>) -> Self {
        Self {
            range,
            span: doc.span(range),
            new_text: new_text.into(),
        }
    }

    pub fn insert(doc: &Document, offset: TextSize, new_text: impl Into<String>) -> Self {
        Self::replace(doc, TextRange::empty(offset), new_text)
    }
}

/// Edits grouped per document URI.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WorkspaceEdit {
    pub changes: IndexMap<Arc<str>, Vec<TextEdit>>,
}

impl WorkspaceEdit {
    pub fn single(uri: Arc<str>, edit: TextEdit) -> Self {
        let mut changes = IndexMap::new();
        changes.insert(uri, vec![edit]);
        Self { changes }
    }

    pub fn edits(&self, uri: &str) -> &[TextEdit] {
        self.changes.get(uri).map_or(&[], Vec::as_slice)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CodeActionKind {
    QuickFix,
}

impl CodeActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CodeActionKind::QuickFix => "quickfix",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CodeAction {
    pub title: String,
    pub kind: CodeActionKind,
    /// The diagnostic this action fixes.
    pub diagnostic: Diagnostic,
    pub edit: WorkspaceEdit,
    pub is_preferred: bool,
}

impl CodeAction {
    fn quick_fix(title: impl Into<String>, diagnostic: &Diagnostic, edit: WorkspaceEdit) -> Self {
        Self {
            title: title.into(),
            kind: CodeActionKind::QuickFix,
            diagnostic: diagnostic.clone(),
            edit,
            is_preferred: false,
        }
    }

    fn preferred(mut self) -> Self {
        self.is_preferred = true;
        self
    }
}

/// Code actions for `diagnostics` that overlap `range`.
pub fn code_actions(analysis: &Analysis, range: TextRange, diagnostics: &[Diagnostic]) -> Vec<CodeAction> {
    let doc = analysis.document();
    let mut actions = Vec::new();
    for diagnostic in diagnostics {
        let overlaps = diagnostic.range.start() <= range.end() && range.start() <= diagnostic.range.end();
        if diagnostic.uri != *doc.uri() || !overlaps {
            continue;
        }
        match diagnostic.code {
            DiagnosticCode::UnknownObject
            | DiagnosticCode::UnknownProperty
            | DiagnosticCode::UnknownMethod
            | DiagnosticCode::UnknownNamespace
            | DiagnosticCode::UnknownConfigProperty => {
                did_you_mean(analysis, diagnostic, &mut actions);
            }
            _ => {}
        }
        if diagnostic.code == DiagnosticCode::UnknownObject {
            unknown_object_fixes(doc, diagnostic, &mut actions);
        }
    }
    actions
}

fn did_you_mean(analysis: &Analysis, diagnostic: &Diagnostic, actions: &mut Vec<CodeAction>) {
    let doc = analysis.document();
    let names = suggestions(analysis.resolver(), doc, analysis.config(), diagnostic);
    for (i, name) in names.iter().enumerate() {
        let replacement = match &diagnostic.data {
            // keep the profile prefix of the key being fixed
            Some(DiagnosticData::ConfigKey { key }) => match key.strip_prefix('%') {
                Some(rest) => match rest.split_once('.') {
                    Some((profile, _)) => format!("%{profile}.{name}"),
                    None => name.to_string(),
                },
                None => name.to_string(),
            },
            _ => name.to_string(),
        };
        let edit = TextEdit::replace(doc, diagnostic.range, replacement.clone());
        let action = CodeAction::quick_fix(
            format!("Did you mean '{replacement}'?"),
            diagnostic,
            WorkspaceEdit::single(Arc::clone(doc.uri()), edit),
        );
        actions.push(if i == 0 { action.preferred() } else { action });
    }
}

fn unknown_object_fixes(doc: &Document, diagnostic: &Diagnostic, actions: &mut Vec<CodeAction>) {
    let Some(DiagnosticData::Reference { name, expression, .. }) = &diagnostic.data else {
        return;
    };

    let declaration = format!("{{@{FALLBACK_TYPE} {name}}}\n");
    actions.push(CodeAction::quick_fix(
        format!("Declare '{name}' with type '{FALLBACK_TYPE}'"),
        diagnostic,
        WorkspaceEdit::single(
            Arc::clone(doc.uri()),
            TextEdit::insert(doc, TextSize::new(0), declaration),
        ),
    ));

    actions.push(CodeAction::quick_fix(
        format!("Mark '{name}' as optional with '??'"),
        diagnostic,
        WorkspaceEdit::single(
            Arc::clone(doc.uri()),
            TextEdit::insert(doc, expression_end(doc, *expression), "??"),
        ),
    ));
}
