//! In-memory archive view state with staged recomputation.
//!
//! Forest and buckets are rebuilt only when the incoming collection differs
//! from the previous load; toggles only re-run the flattener.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::diagnostics::{Diagnostic, DiagnosticsSink, TracingSink};
use crate::expansion::ExpansionState;
use crate::flatten::{flatten, Row, RowView};
use crate::resolver::{resolve, Buckets};
use crate::schema::{
    ingest_categories, ingest_documents, CategoryId, CategoryNode, Document, DocumentId,
};
use crate::tree::{build_tree, Forest};

pub struct ArchiveSession {
    sink: Arc<dyn DiagnosticsSink>,
    categories_hash: Option<String>,
    documents_hash: Option<String>,
    forest: Forest,
    documents: Vec<Document>,
    document_index: HashMap<DocumentId, usize>,
    buckets: Buckets,
    expansion: ExpansionState,
    category_diagnostics: Vec<Diagnostic>,
    document_diagnostics: Vec<Diagnostic>,
    resolve_diagnostics: Vec<Diagnostic>,
}

impl Default for ArchiveSession {
    fn default() -> Self {
        Self::new(Arc::new(TracingSink))
    }
}

impl ArchiveSession {
    pub fn new(sink: Arc<dyn DiagnosticsSink>) -> Self {
        Self {
            sink,
            categories_hash: None,
            documents_hash: None,
            forest: Forest::default(),
            documents: Vec::new(),
            document_index: HashMap::new(),
            buckets: Buckets::default(),
            expansion: ExpansionState::new(),
            category_diagnostics: Vec::new(),
            document_diagnostics: Vec::new(),
            resolve_diagnostics: Vec::new(),
        }
    }

    /// Replace the category collection. Returns false when it is unchanged.
    pub fn load_categories(&mut self, values: &[Value]) -> bool {
        let hash = fingerprint(values);
        if self.categories_hash.as_deref() == Some(hash.as_str()) {
            debug!("Category collection unchanged ({}), skipping rebuild", &hash[..12]);
            return false;
        }

        let (categories, mut diagnostics) = ingest_categories(values);
        let (forest, tree_diagnostics) = build_tree(&categories);
        diagnostics.extend(tree_diagnostics);

        let newly_expanded = self.expansion.observe(&forest);
        info!(
            "Loaded {} categories ({} new, expanded)",
            forest.len(),
            newly_expanded
        );

        self.forest = forest;
        self.categories_hash = Some(hash);
        self.report(&diagnostics);
        self.category_diagnostics = diagnostics;
        self.reresolve();
        true
    }

    /// Replace the document collection. Returns false when it is unchanged.
    pub fn load_documents(&mut self, values: &[Value]) -> bool {
        let hash = fingerprint(values);
        if self.documents_hash.as_deref() == Some(hash.as_str()) {
            debug!("Document collection unchanged ({}), skipping resolve", &hash[..12]);
            return false;
        }

        let (documents, diagnostics) = ingest_documents(values);
        info!("Loaded {} documents", documents.len());

        self.document_index = documents
            .iter()
            .enumerate()
            .map(|(idx, doc)| (doc.id, idx))
            .collect();
        self.documents = documents;
        self.documents_hash = Some(hash);
        self.report(&diagnostics);
        self.document_diagnostics = diagnostics;
        self.reresolve();
        true
    }

    fn reresolve(&mut self) {
        let (buckets, diagnostics) = resolve(&self.documents, &self.forest);
        self.buckets = buckets;
        self.report(&diagnostics);
        self.resolve_diagnostics = diagnostics;
    }

    fn report(&self, diagnostics: &[Diagnostic]) {
        for diagnostic in diagnostics {
            self.sink.report(diagnostic);
        }
    }

    /// Current render rows.
    pub fn rows(&self) -> Vec<Row<'_>> {
        flatten(&self.forest, &self.buckets, &self.expansion)
    }

    pub fn row_views(&self) -> Vec<RowView> {
        self.rows()
            .iter()
            .map(|row| RowView::from_row(row, &self.buckets, &self.expansion))
            .collect()
    }

    /// Flip a category. `None` when the id is not in the forest.
    pub fn toggle(&mut self, id: CategoryId) -> Option<bool> {
        if !self.forest.contains(id) {
            return None;
        }
        let expanded = self.expansion.toggle(id);
        debug!("Category {} {}", id, if expanded { "expanded" } else { "collapsed" });
        Some(expanded)
    }

    pub fn expand_all(&mut self) {
        self.expansion.expand_all(&self.forest);
    }

    pub fn collapse_all(&mut self) {
        self.expansion.collapse_all();
    }

    pub fn category(&self, id: CategoryId) -> Option<&CategoryNode> {
        self.forest.node(id)
    }

    /// Last document with this id wins.
    pub fn document(&self, id: DocumentId) -> Option<&Document> {
        self.document_index.get(&id).map(|idx| &self.documents[*idx])
    }

    pub fn forest(&self) -> &Forest {
        &self.forest
    }

    pub fn buckets(&self) -> &Buckets {
        &self.buckets
    }

    pub fn expansion(&self) -> &ExpansionState {
        &self.expansion
    }

    /// Diagnostics from the most recent category, document and resolve passes.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.category_diagnostics
            .iter()
            .chain(&self.document_diagnostics)
            .chain(&self.resolve_diagnostics)
            .cloned()
            .collect()
    }
}

/// SHA-256 of the canonical JSON encoding of a collection.
fn fingerprint(values: &[Value]) -> String {
    let mut hasher = Sha256::new();
    for value in values {
        hasher.update(value.to_string().as_bytes());
        hasher.update(b"\n");
    }
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::CollectingSink;
    use serde_json::json;

    fn categories() -> Vec<Value> {
        vec![
            json!({"id": 1, "name": "Policies", "parent": null, "order": 0}),
            json!({"id": 2, "name": "HR", "parent": 1, "order": 0}),
        ]
    }

    fn documents() -> Vec<Value> {
        vec![
            json!({"id": 10, "title": "Leave Form", "category": {"id": 2}}),
            json!({"id": 11, "title": "Misc", "category": null}),
        ]
    }

    fn labels(session: &ArchiveSession) -> Vec<(String, usize)> {
        session
            .row_views()
            .into_iter()
            .map(|v| match v {
                RowView::Category { label, depth, .. } | RowView::Document { label, depth, .. } => {
                    (label, depth)
                }
            })
            .collect()
    }

    #[test]
    fn test_first_load_expands_everything() {
        let mut session = ArchiveSession::default();
        session.load_categories(&categories());
        session.load_documents(&documents());
        assert_eq!(
            labels(&session),
            vec![
                ("Policies".to_string(), 0),
                ("HR".to_string(), 1),
                ("Leave Form".to_string(), 2),
                ("Misc".to_string(), 0),
            ]
        );
    }

    #[test]
    fn test_toggle_collapses_root() {
        let mut session = ArchiveSession::default();
        session.load_categories(&categories());
        session.load_documents(&documents());
        assert_eq!(session.toggle(1), Some(false));
        assert_eq!(
            labels(&session),
            vec![("Policies".to_string(), 0), ("Misc".to_string(), 0)]
        );
        assert_eq!(session.toggle(404), None);
    }

    #[test]
    fn test_unchanged_reload_is_skipped_and_keeps_collapse() {
        let mut session = ArchiveSession::default();
        assert!(session.load_categories(&categories()));
        session.toggle(2);
        assert!(!session.load_categories(&categories()));

        let mut more = categories();
        more.push(json!({"id": 3, "name": "Finance", "parent": null, "order": 1}));
        assert!(session.load_categories(&more));
        assert!(!session.expansion().is_expanded(2));
        assert!(session.expansion().is_expanded(3));
    }

    #[test]
    fn test_documents_before_categories() {
        let sink = Arc::new(CollectingSink::new());
        let mut session = ArchiveSession::new(sink.clone());
        session.load_documents(&[json!({"id": 10, "title": "Leave Form", "category": 2})]);
        assert_eq!(sink.take(), vec![Diagnostic::NoCategories { documents: 1 }]);

        session.load_categories(&categories());
        assert_eq!(session.buckets().documents_in(2).len(), 1);
        assert!(session.diagnostics().is_empty());
    }

    #[test]
    fn test_diagnostics_forwarded() {
        let sink = Arc::new(CollectingSink::new());
        let mut session = ArchiveSession::new(sink.clone());
        session.load_categories(&[
            json!({"id": 1, "parent": 2}),
            json!({"id": 2, "parent": 1}),
            json!({"name": "no id"}),
        ]);
        session.load_documents(&[json!({"id": 5, "category": 77})]);

        let codes: Vec<&str> = session.diagnostics().iter().map(|d| d.code()).collect();
        assert_eq!(
            codes,
            vec![
                "invalid_shape",
                "cyclic_parent",
                "cyclic_parent",
                "unresolved_category",
                "systemic_mismatch"
            ]
        );
        assert_eq!(sink.take().len(), 5);
    }

    #[test]
    fn test_lookups() {
        let mut session = ArchiveSession::default();
        session.load_categories(&categories());
        session.load_documents(&documents());
        assert_eq!(session.category(2).map(|n| n.name.as_str()), Some("HR"));
        assert_eq!(session.document(11).map(|d| d.title.as_str()), Some("Misc"));
        assert!(session.document(99).is_none());
    }

    #[test]
    fn test_collapse_then_expand_all() {
        let mut session = ArchiveSession::default();
        session.load_categories(&categories());
        session.load_documents(&documents());
        session.collapse_all();
        assert_eq!(session.rows().len(), 2);
        session.expand_all();
        assert_eq!(session.rows().len(), 4);
    }
}
