//! Assertions over trees and diagnostics.

use quill::hir::{Diagnostic, DiagnosticCode};
use quill::project::Project;
use quill::{CancellationToken, Document};

/// Every child lies inside its parent and siblings never overlap.
pub fn assert_well_nested(doc: &Document) {
    for id in doc.ids() {
        let parent = doc.range(id);
        let mut previous_end = parent.start();
        for &child in doc.children(id) {
            let range = doc.range(child);
            assert!(
                parent.contains_range(range),
                "child {child:?} {range:?} escapes parent {id:?} {parent:?} in {:?}",
                doc.text()
            );
            assert!(
                range.start() >= previous_end,
                "child {child:?} {range:?} overlaps its previous sibling in {:?}",
                doc.text()
            );
            previous_end = range.end();
        }
    }
}

/// Open `text` at `uri` and check it.
pub fn diagnostics(project: &mut Project, uri: &str, text: &str) -> Vec<Diagnostic> {
    let cancel = CancellationToken::new();
    project.open_document(uri, text, &cancel).expect("not cancelled");
    project.diagnostics(uri, &cancel).expect("document is open")
}

pub fn codes(diagnostics: &[Diagnostic]) -> Vec<DiagnosticCode> {
    diagnostics.iter().map(|d| d.code).collect()
}

/// The flagged source text of each diagnostic.
pub fn flagged<'t>(text: &'t str, diagnostics: &[Diagnostic]) -> Vec<&'t str> {
    diagnostics.iter().map(|d| &text[d.range]).collect()
}
