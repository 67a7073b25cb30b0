//! Caller-owned expand/collapse state for category nodes.

use std::collections::BTreeSet;

use crate::schema::CategoryId;
use crate::tree::Forest;

/// Set of expanded category ids. Absence means collapsed.
///
/// Ids seen for the first time start expanded; ids already seen keep whatever
/// state the user left them in across category reloads.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpansionState {
    expanded: BTreeSet<CategoryId>,
    seen: BTreeSet<CategoryId>,
}

impl ExpansionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from an explicit set, marking those ids as seen.
    pub fn from_expanded(ids: impl IntoIterator<Item = CategoryId>) -> Self {
        let expanded: BTreeSet<_> = ids.into_iter().collect();
        Self {
            seen: expanded.clone(),
            expanded,
        }
    }

    pub fn is_expanded(&self, id: CategoryId) -> bool {
        self.expanded.contains(&id)
    }

    /// Flip one node. Returns the new state (`true` = expanded).
    pub fn toggle(&mut self, id: CategoryId) -> bool {
        self.seen.insert(id);
        if self.expanded.remove(&id) {
            false
        } else {
            self.expanded.insert(id);
            true
        }
    }

    /// Expand every category the forest holds that was never seen before.
    /// Returns how many ids were newly expanded.
    pub fn observe(&mut self, forest: &Forest) -> usize {
        let mut added = 0;
        for id in forest.ids() {
            if self.seen.insert(id) {
                self.expanded.insert(id);
                added += 1;
            }
        }
        added
    }

    pub fn expand_all(&mut self, forest: &Forest) {
        for id in forest.ids() {
            self.seen.insert(id);
            self.expanded.insert(id);
        }
    }

    pub fn collapse_all(&mut self) {
        self.expanded.clear();
    }

    pub fn expanded(&self) -> impl Iterator<Item = CategoryId> + '_ {
        self.expanded.iter().copied()
    }
}
