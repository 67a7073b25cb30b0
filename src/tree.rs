//! Category forest construction from flat parent-pointer records.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::diagnostics::Diagnostic;
use crate::schema::{Category, CategoryId, CategoryNode};

/// Root category nodes plus a flat id index into them.
///
/// Immutable once built; a new category list means a new forest.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Forest {
    roots: Vec<CategoryNode>,
    slots: HashMap<CategoryId, Slot>,
}

/// Where a node sits: its parent and its index among that parent's children.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Slot {
    parent: Option<CategoryId>,
    index: usize,
    depth: usize,
}

impl Forest {
    pub fn roots(&self) -> &[CategoryNode] {
        &self.roots
    }

    pub fn node(&self, id: CategoryId) -> Option<&CategoryNode> {
        let mut slot = self.slots.get(&id)?;
        let mut indices = Vec::with_capacity(slot.depth + 1);
        indices.push(slot.index);
        while let Some(parent) = slot.parent {
            slot = self.slots.get(&parent)?;
            indices.push(slot.index);
        }

        let mut node = self.roots.get(indices.pop()?)?;
        while let Some(idx) = indices.pop() {
            node = node.children.get(idx)?;
        }
        Some(node)
    }

    pub fn contains(&self, id: CategoryId) -> bool {
        self.slots.contains_key(&id)
    }

    /// Nesting level of a category, 0 for roots.
    pub fn depth_of(&self, id: CategoryId) -> Option<usize> {
        self.slots.get(&id).map(|s| s.depth)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// All category ids in pre-order.
    pub fn ids(&self) -> Vec<CategoryId> {
        let mut out = Vec::with_capacity(self.len());
        let mut stack: Vec<&CategoryNode> = self.roots.iter().rev().collect();
        while let Some(node) = stack.pop() {
            out.push(node.id);
            stack.extend(node.children.iter().rev());
        }
        out
    }
}

/// Build the category forest.
///
/// Never fails. Missing parents and cyclic parent chains degrade to root
/// placement and are reported in the returned diagnostics. Siblings are
/// ordered by `order`, then `id`. Works without recursion, so chain depth
/// is bounded by memory only.
pub fn build_tree(categories: &[Category]) -> (Forest, Vec<Diagnostic>) {
    let mut diagnostics = Vec::new();

    // Index by id, last duplicate wins
    let mut by_id: HashMap<CategoryId, &Category> = HashMap::with_capacity(categories.len());
    for cat in categories {
        if by_id.insert(cat.id, cat).is_some() {
            diagnostics.push(Diagnostic::DuplicateCategory { id: cat.id });
        }
    }

    // Unique ids, first-seen order
    let mut seen = HashSet::with_capacity(by_id.len());
    let ids: Vec<CategoryId> = categories
        .iter()
        .map(|c| c.id)
        .filter(|id| seen.insert(*id))
        .collect();

    let mut roots: Vec<CategoryId> = Vec::new();
    let mut children_of: HashMap<CategoryId, Vec<CategoryId>> = HashMap::new();

    for &id in &ids {
        let cat = by_id[&id];
        match cat.parent {
            None => roots.push(id),
            Some(parent) if !by_id.contains_key(&parent) => {
                diagnostics.push(Diagnostic::OrphanedParent { id, parent });
                roots.push(id);
            }
            Some(_) if on_cycle(id, &by_id) => {
                diagnostics.push(Diagnostic::CyclicParent { id });
                roots.push(id);
            }
            Some(parent) => children_of.entry(parent).or_default().push(id),
        }
    }

    let sort_key = |id: &CategoryId| (by_id[id].order, *id);
    let by_order = |a: &CategoryId, b: &CategoryId| {
        let (oa, ia) = sort_key(a);
        let (ob, ib) = sort_key(b);
        oa.total_cmp(&ob).then(ia.cmp(&ib))
    };
    roots.sort_by(by_order);
    for siblings in children_of.values_mut() {
        siblings.sort_by(by_order);
    }

    // Pre-order walk assigns every reachable id its slot
    let mut slots: HashMap<CategoryId, Slot> = HashMap::with_capacity(ids.len());
    let mut preorder: Vec<CategoryId> = Vec::with_capacity(ids.len());
    let mut stack: Vec<(CategoryId, Slot)> = roots
        .iter()
        .enumerate()
        .rev()
        .map(|(index, id)| (*id, Slot { parent: None, index, depth: 0 }))
        .collect();
    while let Some((id, slot)) = stack.pop() {
        slots.insert(id, slot);
        preorder.push(id);
        if let Some(children) = children_of.get(&id) {
            stack.extend(children.iter().enumerate().rev().map(|(index, child)| {
                let slot = Slot {
                    parent: Some(id),
                    index,
                    depth: slot.depth + 1,
                };
                (*child, slot)
            }));
        }
    }

    // Children always follow their parent in pre-order, so building in
    // reverse finds every child finished before its parent.
    let mut built: HashMap<CategoryId, CategoryNode> = HashMap::with_capacity(preorder.len());
    for &id in preorder.iter().rev() {
        let cat = by_id[&id];
        let children = children_of
            .get(&id)
            .map(|ids| ids.iter().filter_map(|child| built.remove(child)).collect())
            .unwrap_or_default();
        built.insert(
            id,
            CategoryNode {
                id,
                name: cat.name.clone(),
                order: cat.order,
                children,
            },
        );
    }
    let roots: Vec<CategoryNode> = roots.iter().filter_map(|id| built.remove(id)).collect();

    debug!(
        "Built category forest: {} categories, {} roots, {} diagnostics",
        slots.len(),
        roots.len(),
        diagnostics.len()
    );

    (Forest { roots, slots }, diagnostics)
}

/// True when following parents from `id` leads back to `id`.
///
/// A chain that runs into some other loop without returning is not a cycle
/// for this category; it attaches normally.
fn on_cycle(id: CategoryId, by_id: &HashMap<CategoryId, &Category>) -> bool {
    let mut visited = HashSet::new();
    let mut current = by_id.get(&id).and_then(|c| c.parent);
    while let Some(parent) = current {
        if parent == id {
            return true;
        }
        if !visited.insert(parent) {
            return false;
        }
        current = by_id.get(&parent).and_then(|c| c.parent);
    }
    false
}
