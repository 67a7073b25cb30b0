//! Document to category association.

use std::collections::HashMap;

use tracing::debug;

use crate::diagnostics::Diagnostic;
use crate::schema::{CategoryId, CategoryRef, Document};
use crate::tree::Forest;

/// Documents grouped by resolved category, in input order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Buckets {
    pub by_category: HashMap<CategoryId, Vec<Document>>,
    pub uncategorized: Vec<Document>,
}

impl Buckets {
    pub fn documents_in(&self, id: CategoryId) -> &[Document] {
        self.by_category.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn uncategorized(&self) -> &[Document] {
        &self.uncategorized
    }

    /// Number of documents across all buckets.
    pub fn total(&self) -> usize {
        self.by_category.values().map(Vec::len).sum::<usize>() + self.uncategorized.len()
    }
}

/// Assign every document to exactly one bucket.
///
/// A canonical id that is not in the forest sends the document to
/// `uncategorized`. Nothing is dropped.
pub fn resolve(documents: &[Document], forest: &Forest) -> (Buckets, Vec<Diagnostic>) {
    let mut buckets = Buckets::default();
    let mut diagnostics = Vec::new();
    let mut referenced = 0usize;
    let mut resolved = 0usize;

    for doc in documents {
        if doc.has_category_reference() {
            referenced += 1;
        }

        match doc.canonical_category() {
            Some(id) if forest.contains(id) => {
                resolved += 1;
                buckets.by_category.entry(id).or_default().push(doc.clone());
            }
            Some(id) => {
                if !forest.is_empty() {
                    diagnostics.push(Diagnostic::UnresolvedCategory {
                        document: doc.id,
                        category: id,
                    });
                }
                buckets.uncategorized.push(doc.clone());
            }
            None => {
                if doc.category == CategoryRef::Unrecognized {
                    diagnostics.push(Diagnostic::UnrecognizedReference { document: doc.id });
                }
                buckets.uncategorized.push(doc.clone());
            }
        }
    }

    if !documents.is_empty() && referenced == documents.len() && resolved == 0 {
        diagnostics.push(if forest.is_empty() {
            Diagnostic::NoCategories {
                documents: documents.len(),
            }
        } else {
            Diagnostic::SystemicMismatch {
                documents: documents.len(),
            }
        });
    }

    debug!(
        "Resolved {} documents: {} categorized, {} uncategorized",
        documents.len(),
        resolved,
        buckets.uncategorized.len()
    );

    (buckets, diagnostics)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ingest_documents, Category};
    use crate::tree::build_tree;
    use serde_json::json;

    fn forest(ids: &[CategoryId]) -> Forest {
        let cats: Vec<Category> = ids.iter().map(|id| Category::new(*id, "c", None)).collect();
        build_tree(&cats).0
    }

    fn doc(id: i64, category: CategoryRef) -> Document {
        Document::new(id, format!("Doc {}", id), category)
    }

    #[test]
    fn test_embedded_wins_over_category_id() {
        let docs = vec![doc(1, CategoryRef::Embedded { id: 3 }).with_category_id(7)];
        let (buckets, diags) = resolve(&docs, &forest(&[3, 7]));
        assert_eq!(buckets.documents_in(3).len(), 1);
        assert!(buckets.documents_in(7).is_empty());
        assert!(diags.is_empty());
    }

    #[test]
    fn test_unknown_category_falls_back() {
        let docs = vec![
            doc(1, CategoryRef::BareId { id: 1 }),
            doc(2, CategoryRef::BareId { id: 404 }),
        ];
        let (buckets, diags) = resolve(&docs, &forest(&[1]));
        assert_eq!(buckets.uncategorized().len(), 1);
        assert_eq!(buckets.uncategorized()[0].id, 2);
        assert_eq!(
            diags,
            vec![Diagnostic::UnresolvedCategory {
                document: 2,
                category: 404
            }]
        );
    }

    #[test]
    fn test_size_preserving() {
        let docs = vec![
            doc(1, CategoryRef::Embedded { id: 1 }),
            doc(2, CategoryRef::Absent),
            doc(3, CategoryRef::BareId { id: 2 }),
            doc(4, CategoryRef::Absent).with_category_id(2),
            doc(5, CategoryRef::BareId { id: 99 }),
        ];
        let (buckets, _) = resolve(&docs, &forest(&[1, 2]));
        assert_eq!(buckets.total(), docs.len());
        let ids: Vec<_> = buckets.documents_in(2).iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![3, 4]);
    }

    #[test]
    fn test_systemic_mismatch() {
        let docs = vec![
            doc(1, CategoryRef::BareId { id: 100 }),
            doc(2, CategoryRef::Absent).with_category_id(101),
        ];
        let (buckets, diags) = resolve(&docs, &forest(&[1, 2]));
        assert_eq!(buckets.uncategorized().len(), 2);
        assert_eq!(diags.last(), Some(&Diagnostic::SystemicMismatch { documents: 2 }));
    }

    #[test]
    fn test_mismatch_with_unusable_reference_shapes() {
        let (docs, _) = ingest_documents(&[
            json!({"id": 1, "title": "a", "category": {"pk": 1}}),
            json!({"id": 2, "title": "b", "category": "2"}),
        ]);
        let (buckets, diags) = resolve(&docs, &forest(&[1, 2]));
        assert_eq!(buckets.uncategorized().len(), 2);
        assert_eq!(
            diags,
            vec![
                Diagnostic::UnrecognizedReference { document: 1 },
                Diagnostic::UnrecognizedReference { document: 2 },
                Diagnostic::SystemicMismatch { documents: 2 },
            ]
        );
    }

    #[test]
    fn test_no_categories_is_distinct() {
        let docs = vec![doc(1, CategoryRef::BareId { id: 1 })];
        let (buckets, diags) = resolve(&docs, &Forest::default());
        assert_eq!(buckets.uncategorized().len(), 1);
        assert_eq!(diags, vec![Diagnostic::NoCategories { documents: 1 }]);
    }

    #[test]
    fn test_no_mismatch_when_some_absent() {
        let docs = vec![doc(1, CategoryRef::BareId { id: 100 }), doc(2, CategoryRef::Absent)];
        let (_, diags) = resolve(&docs, &forest(&[1]));
        assert_eq!(diags.len(), 1);
        assert!(matches!(diags[0], Diagnostic::UnresolvedCategory { .. }));
    }

    #[test]
    fn test_empty_documents() {
        let (buckets, diags) = resolve(&[], &forest(&[1]));
        assert_eq!(buckets.total(), 0);
        assert!(diags.is_empty());
    }
}
