//! Archive taxonomy engine.
//!
//! Rebuilds a category tree from flat records, files each document under its
//! resolved category, and flattens the result into indented display rows that
//! honour per-category expand/collapse state.

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod expansion;
pub mod flatten;
pub mod resolver;
pub mod schema;
pub mod session;
pub mod source;
pub mod tree;

pub use diagnostics::{Diagnostic, DiagnosticsSink, TracingSink};
pub use expansion::ExpansionState;
pub use flatten::{flatten, Row, RowView};
pub use resolver::{resolve, Buckets};
pub use schema::{Category, CategoryId, CategoryNode, CategoryRef, Document, DocumentId};
pub use session::ArchiveSession;
pub use tree::{build_tree, Forest};
