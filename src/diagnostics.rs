//! Data-quality signals raised while building the taxonomy.
//!
//! None of these are errors: the engine always recovers by degrading to root
//! placement or the uncategorized bucket. They are handed to a
//! [`DiagnosticsSink`] so the host can log or display them.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::schema::{CategoryId, DocumentId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Category,
    Document,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Diagnostic {
    /// Record dropped: not an object, or `id` missing / non-numeric.
    InvalidShape {
        kind: RecordKind,
        position: usize,
        reason: String,
    },
    /// An earlier category with the same id was shadowed by a later one.
    DuplicateCategory { id: CategoryId },
    /// Parent id does not exist; the category was placed at the root.
    OrphanedParent { id: CategoryId, parent: CategoryId },
    /// Parent chain loops back to the category; it was placed at the root.
    CyclicParent { id: CategoryId },
    /// Document references a category that is not in the forest.
    UnresolvedCategory {
        document: DocumentId,
        category: CategoryId,
    },
    /// Document has a non-null `category` value of no recognised shape.
    UnrecognizedReference { document: DocumentId },
    /// Every document references a category but none resolved.
    /// Usually an id-space or field-name mismatch between sources.
    SystemicMismatch { documents: usize },
    /// Documents exist but the category list is empty.
    NoCategories { documents: usize },
}

impl Diagnostic {
    /// Short stable code, handy for log filtering and the HTTP surface.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidShape { .. } => "invalid_shape",
            Self::DuplicateCategory { .. } => "duplicate_category",
            Self::OrphanedParent { .. } => "orphaned_parent",
            Self::CyclicParent { .. } => "cyclic_parent",
            Self::UnresolvedCategory { .. } => "unresolved_category",
            Self::UnrecognizedReference { .. } => "unrecognized_reference",
            Self::SystemicMismatch { .. } => "systemic_mismatch",
            Self::NoCategories { .. } => "no_categories",
        }
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidShape {
                kind,
                position,
                reason,
            } => write!(f, "dropped {:?} record #{}: {}", kind, position, reason),
            Self::DuplicateCategory { id } => {
                write!(f, "duplicate category id {}, keeping the last one", id)
            }
            Self::OrphanedParent { id, parent } => write!(
                f,
                "category {} references missing parent {}, placed at root",
                id, parent
            ),
            Self::CyclicParent { id } => {
                write!(f, "category {} has a cyclic parent chain, placed at root", id)
            }
            Self::UnresolvedCategory { document, category } => write!(
                f,
                "document {} references unknown category {}, left uncategorized",
                document, category
            ),
            Self::UnrecognizedReference { document } => write!(
                f,
                "document {} has a category value without a usable id, left uncategorized",
                document
            ),
            Self::SystemicMismatch { documents } => write!(
                f,
                "all {} documents reference categories but none resolved; check id space or field names",
                documents
            ),
            Self::NoCategories { documents } => {
                write!(f, "{} documents loaded but there are no categories yet", documents)
            }
        }
    }
}

/// Receiver for diagnostics produced by a session.
pub trait DiagnosticsSink: Send + Sync {
    fn report(&self, diagnostic: &Diagnostic);
}

/// Logs each diagnostic through `tracing` at a level matching its severity.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticsSink for TracingSink {
    fn report(&self, diagnostic: &Diagnostic) {
        match diagnostic {
            Diagnostic::InvalidShape { .. }
            | Diagnostic::CyclicParent { .. }
            | Diagnostic::SystemicMismatch { .. } => warn!(code = diagnostic.code(), "{}", diagnostic),
            Diagnostic::DuplicateCategory { .. }
            | Diagnostic::OrphanedParent { .. }
            | Diagnostic::UnresolvedCategory { .. }
            | Diagnostic::UnrecognizedReference { .. } => info!(code = diagnostic.code(), "{}", diagnostic),
            Diagnostic::NoCategories { .. } => debug!(code = diagnostic.code(), "{}", diagnostic),
        }
    }
}

/// Keeps every reported diagnostic in memory.
#[derive(Debug, Default)]
pub struct CollectingSink {
    inner: std::sync::Mutex<Vec<Diagnostic>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take(&self) -> Vec<Diagnostic> {
        std::mem::take(&mut *self.inner.lock().unwrap_or_else(|e| e.into_inner()))
    }
}

impl DiagnosticsSink for CollectingSink {
    fn report(&self, diagnostic: &Diagnostic) {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(diagnostic.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialized_tag() {
        let json = serde_json::to_value(Diagnostic::OrphanedParent { id: 3, parent: 99 }).unwrap();
        assert_eq!(json["type"], "orphaned_parent");
        assert_eq!(json["parent"], 99);
    }

    #[test]
    fn test_collecting_sink_take() {
        let sink = CollectingSink::new();
        sink.report(&Diagnostic::CyclicParent { id: 1 });
        sink.report(&Diagnostic::NoCategories { documents: 2 });
        assert_eq!(sink.take().len(), 2);
        assert!(sink.take().is_empty());
    }
}
