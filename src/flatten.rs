//! Render-ready row sequence from a forest, its document buckets and the
//! current expansion state.

use serde::Serialize;

use crate::expansion::ExpansionState;
use crate::resolver::Buckets;
use crate::schema::{CategoryNode, Document};
use crate::tree::Forest;

/// One display line: a category header or a document entry.
#[derive(Debug, Clone, PartialEq)]
pub enum Row<'a> {
    Category {
        node: &'a CategoryNode,
        depth: usize,
    },
    Document {
        document: &'a Document,
        depth: usize,
    },
}

impl Row<'_> {
    pub fn depth(&self) -> usize {
        match self {
            Row::Category { depth, .. } | Row::Document { depth, .. } => *depth,
        }
    }
}

/// Walk the forest depth-first.
///
/// An expanded category shows its documents first, then its child
/// categories. A collapsed category hides its whole subtree whatever the
/// descendants' own flags say. Uncategorized documents trail at depth 0.
pub fn flatten<'a>(
    forest: &'a Forest,
    buckets: &'a Buckets,
    expanded: &ExpansionState,
) -> Vec<Row<'a>> {
    let mut rows = Vec::with_capacity(forest.len() + buckets.total());
    let mut stack: Vec<(&CategoryNode, usize)> =
        forest.roots().iter().rev().map(|n| (n, 0)).collect();
    while let Some((node, depth)) = stack.pop() {
        rows.push(Row::Category { node, depth });
        if !expanded.is_expanded(node.id) {
            continue;
        }
        rows.extend(
            buckets
                .documents_in(node.id)
                .iter()
                .map(|document| Row::Document {
                    document,
                    depth: depth + 1,
                }),
        );
        stack.extend(node.children.iter().rev().map(|child| (child, depth + 1)));
    }

    rows.extend(
        buckets
            .uncategorized()
            .iter()
            .map(|document| Row::Document { document, depth: 0 }),
    );
    rows
}

/// Flat, serializable projection of a [`Row`] for the rendering layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RowView {
    Category {
        id: i64,
        label: String,
        depth: usize,
        expanded: bool,
        has_children: bool,
        document_count: usize,
    },
    Document {
        id: i64,
        label: String,
        depth: usize,
    },
}

impl RowView {
    pub fn from_row(row: &Row<'_>, buckets: &Buckets, expanded: &ExpansionState) -> Self {
        let depth = row.depth();
        match row {
            Row::Category { node, .. } => RowView::Category {
                id: node.id,
                label: node.name.clone(),
                depth,
                expanded: expanded.is_expanded(node.id),
                has_children: !node.children.is_empty(),
                document_count: buckets.documents_in(node.id).len(),
            },
            Row::Document { document, .. } => RowView::Document {
                id: document.id,
                label: document.title.clone(),
                depth,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::resolve;
    use crate::schema::{ingest_categories, ingest_documents, Category, CategoryRef};
    use crate::tree::build_tree;
    use serde_json::json;

    fn describe(rows: &[Row<'_>]) -> Vec<String> {
        rows.iter()
            .map(|row| match row {
                Row::Category { node, depth } => format!("category {}({})", node.name, depth),
                Row::Document { document, depth } => {
                    format!("document {}({})", document.title, depth)
                }
            })
            .collect()
    }

    fn policies_fixture() -> (Forest, Buckets) {
        let (cats, _) = ingest_categories(&[
            json!({"id": 1, "name": "Policies", "parent": null, "order": 0}),
            json!({"id": 2, "name": "HR", "parent": 1, "order": 0}),
        ]);
        let (docs, _) = ingest_documents(&[
            json!({"id": 10, "title": "Leave Form", "category": {"id": 2}}),
            json!({"id": 11, "title": "Misc", "category": null}),
        ]);
        let (forest, _) = build_tree(&cats);
        let (buckets, _) = resolve(&docs, &forest);
        (forest, buckets)
    }

    #[test]
    fn test_policies_all_expanded() {
        let (forest, buckets) = policies_fixture();
        let expanded = ExpansionState::from_expanded([1, 2]);
        let rows = flatten(&forest, &buckets, &expanded);
        assert_eq!(
            describe(&rows),
            vec![
                "category Policies(0)",
                "category HR(1)",
                "document Leave Form(2)",
                "document Misc(0)",
            ]
        );
    }

    #[test]
    fn test_policies_root_collapsed() {
        let (forest, buckets) = policies_fixture();
        let expanded = ExpansionState::from_expanded([2]);
        let rows = flatten(&forest, &buckets, &expanded);
        assert_eq!(describe(&rows), vec!["category Policies(0)", "document Misc(0)"]);
    }

    #[test]
    fn test_documents_before_child_categories() {
        let cats = vec![Category::new(1, "Root", None), Category::new(2, "Child", Some(1))];
        let docs = vec![
            Document::new(20, "First", CategoryRef::BareId { id: 1 }),
            Document::new(21, "Second", CategoryRef::BareId { id: 1 }),
        ];
        let (forest, _) = build_tree(&cats);
        let (buckets, _) = resolve(&docs, &forest);
        let rows = flatten(&forest, &buckets, &ExpansionState::from_expanded([1, 2]));
        assert_eq!(
            describe(&rows),
            vec![
                "category Root(0)",
                "document First(1)",
                "document Second(1)",
                "category Child(1)",
            ]
        );
    }

    #[test]
    fn test_collapse_hides_subtree_only() {
        let cats = vec![
            Category::new(1, "A", None),
            Category::new(2, "A1", Some(1)),
            Category::new(3, "A1a", Some(2)),
            Category::new(4, "B", None),
            Category::new(5, "B1", Some(4)),
        ];
        let docs = vec![
            Document::new(30, "deep", CategoryRef::BareId { id: 3 }),
            Document::new(31, "in b1", CategoryRef::BareId { id: 5 }),
        ];
        let (forest, _) = build_tree(&cats);
        let (buckets, _) = resolve(&docs, &forest);

        // 2 and 3 stay flagged expanded but are hidden under collapsed 1
        let expanded = ExpansionState::from_expanded([2, 3, 4, 5]);
        let rows = flatten(&forest, &buckets, &expanded);
        assert_eq!(
            describe(&rows),
            vec![
                "category A(0)",
                "category B(0)",
                "category B1(1)",
                "document in b1(2)",
            ]
        );
    }

    #[test]
    fn test_every_document_once_when_expanded() {
        let (forest, buckets) = policies_fixture();
        let expanded = ExpansionState::from_expanded(forest.ids());
        let rows = flatten(&forest, &buckets, &expanded);
        let docs = rows
            .iter()
            .filter(|r| matches!(r, Row::Document { .. }))
            .count();
        assert_eq!(docs, buckets.total());
    }

    #[test]
    fn test_flatten_idempotent() {
        let (forest, buckets) = policies_fixture();
        let expanded = ExpansionState::from_expanded([1]);
        assert_eq!(
            flatten(&forest, &buckets, &expanded),
            flatten(&forest, &buckets, &expanded)
        );
    }

    #[test]
    fn test_row_view_serialization() {
        let (forest, buckets) = policies_fixture();
        let expanded = ExpansionState::from_expanded([1, 2]);
        let rows = flatten(&forest, &buckets, &expanded);
        let view = RowView::from_row(&rows[1], &buckets, &expanded);
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["kind"], "category");
        assert_eq!(json["depth"], 1);
        assert_eq!(json["label"], "HR");
        assert_eq!(json["document_count"], 1);
        assert_eq!(json["has_children"], false);
    }

    #[test]
    fn test_deep_chain_rows() {
        let cats: Vec<Category> = (0..5000)
            .map(|id| Category::new(id, "c", if id == 0 { None } else { Some(id - 1) }))
            .collect();
        let docs = vec![Document::new(1, "leaf doc", CategoryRef::BareId { id: 4999 })];
        let (forest, _) = build_tree(&cats);
        let (buckets, _) = resolve(&docs, &forest);
        let mut expanded = ExpansionState::new();
        expanded.expand_all(&forest);

        let rows = flatten(&forest, &buckets, &expanded);
        assert_eq!(rows.len(), 5001);
        assert_eq!(rows[4999].depth(), 4999);
        assert!(matches!(rows[5000], Row::Document { depth: 5000, .. }));
        assert!(rows.windows(2).take(4999).all(|w| w[1].depth() == w[0].depth() + 1));

        expanded.toggle(2500);
        assert_eq!(flatten(&forest, &buckets, &expanded).len(), 2501);
    }
}
