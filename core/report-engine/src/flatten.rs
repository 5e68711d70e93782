//! FILENAME: core/report-engine/src/flatten.rs
//! Flattener - turns the group tree into the linear display sequence.
//!
//! Depth-first pre-order: every group is emitted as a header, and its
//! children follow only when its id is in the expand set. Nothing in the
//! tree is mutated; the display rows borrow from it.

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use crate::group::{GroupChild, GroupNode, ID_SEPARATOR};
use crate::sort::Sortable;
use crate::value::{CellValue, Row};

// ============================================================================
// EXPAND STATE
// ============================================================================

/// Ids of the groups currently shown expanded. Owned by the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExpandState {
    expanded: FxHashSet<String>,
}

impl ExpandState {
    pub fn new() -> Self {
        ExpandState::default()
    }

    pub fn is_expanded(&self, id: &str) -> bool {
        self.expanded.contains(id)
    }

    pub fn expand(&mut self, id: impl Into<String>) {
        self.expanded.insert(id.into());
    }

    /// Removes only `id`; descendants keep their state.
    pub fn collapse(&mut self, id: &str) {
        self.expanded.remove(id);
    }

    /// Removes `id` and every id nested under it.
    pub fn collapse_subtree(&mut self, id: &str) {
        let prefix = format!("{}{}", id, ID_SEPARATOR);
        self.expanded
            .retain(|expanded| expanded != id && !expanded.starts_with(&prefix));
    }

    /// Expands a collapsed id, collapses an expanded one with its
    /// descendants. Returns whether `id` is now expanded.
    pub fn toggle(&mut self, id: &str) -> bool {
        if self.is_expanded(id) {
            self.collapse_subtree(id);
            false
        } else {
            self.expand(id);
            true
        }
    }

    pub fn clear(&mut self) {
        self.expanded.clear();
    }

    pub fn len(&self) -> usize {
        self.expanded.len()
    }

    pub fn is_empty(&self) -> bool {
        self.expanded.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.expanded.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for ExpandState {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        ExpandState {
            expanded: iter.into_iter().map(Into::into).collect(),
        }
    }
}

// ============================================================================
// DISPLAY ROWS
// ============================================================================

/// One entry of the flattened sequence: a group header or a data row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DisplayRow<'g, 'a> {
    Group(&'g GroupNode<'a>),
    Row(&'a Row),
}

impl<'g, 'a> DisplayRow<'g, 'a> {
    pub fn as_group(&self) -> Option<&'g GroupNode<'a>> {
        match self {
            DisplayRow::Group(group) => Some(*group),
            DisplayRow::Row(_) => None,
        }
    }

    pub fn as_row(&self) -> Option<&'a Row> {
        match self {
            DisplayRow::Group(_) => None,
            DisplayRow::Row(row) => Some(*row),
        }
    }
}

impl Sortable for DisplayRow<'_, '_> {
    fn sort_value(&self, key: &str) -> Option<&CellValue> {
        match self {
            DisplayRow::Group(group) => group.sort_value(key),
            DisplayRow::Row(row) => row.sort_value(key),
        }
    }

    fn is_group_header(&self) -> bool {
        matches!(self, DisplayRow::Group(_))
    }
}

// ============================================================================
// FLATTENING
// ============================================================================

/// Flattens the group tree under `expanded`.
pub fn flatten<'g, 'a>(nodes: &'g [GroupNode<'a>], expanded: &ExpandState) -> Vec<DisplayRow<'g, 'a>> {
    let mut items = Vec::new();
    flatten_nodes(nodes, expanded, &mut items);
    items
}

/// Recursively flattens nodes with DFS traversal.
fn flatten_nodes<'g, 'a>(nodes: &'g [GroupNode<'a>], expanded: &ExpandState, items: &mut Vec<DisplayRow<'g, 'a>>) {
    for node in nodes {
        items.push(DisplayRow::Group(node));
        if !expanded.is_expanded(&node.id) {
            continue;
        }
        for child in &node.children {
            match child {
                GroupChild::Group(group) => flatten_nodes(std::slice::from_ref(group), expanded, items),
                GroupChild::Row(row) => items.push(DisplayRow::Row(*row)),
            }
        }
    }
}

/// The ungrouped path: every row is its own display entry.
pub fn rows_as_display<'g, 'a>(rows: &[&'a Row]) -> Vec<DisplayRow<'g, 'a>> {
    rows.iter().map(|row| DisplayRow::Row(*row)).collect()
}
