//! FILENAME: core/report-engine/src/view.rs
//! Report View - Renderable output for the frontend.
//!
//! Upstream stages borrow the caller's rows and the group tree. Only the
//! rows on the current page are copied into the view, so the view owns
//! everything it holds and serializes straight to the frontend.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::definition::{Column, DataType, FieldId, SortDirection, SortSpec};
use crate::flatten::{DisplayRow, ExpandState};
use crate::group::GroupNode;
use crate::paginate::PageInfo;
use crate::totals::ColumnTotal;
use crate::value::{CellValue, Row};

// ============================================================================
// COLUMNS
// ============================================================================

/// A visible column with its current sort indicator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewColumn {
    pub id: FieldId,
    pub label: String,
    pub data_type: DataType,
    pub summable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_direction: Option<SortDirection>,
    /// 1-based position in the sort spec.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_priority: Option<usize>,
}

impl ViewColumn {
    pub fn new(column: &Column, sort: &SortSpec) -> Self {
        ViewColumn {
            id: column.id.clone(),
            label: column.label.clone(),
            data_type: column.data_type,
            summable: column.summable,
            sort_direction: sort.direction_of(&column.id),
            sort_priority: sort.priority_of(&column.id),
        }
    }
}

// ============================================================================
// ROWS
// ============================================================================

/// A group header as the frontend renders it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupHeaderRow {
    pub id: String,
    pub group_key_field: FieldId,
    pub group_value: CellValue,
    pub aggregates: FxHashMap<FieldId, CellValue>,
    pub child_row_count: usize,
    pub level: u8,
    pub expanded: bool,
    pub has_children: bool,
}

impl GroupHeaderRow {
    pub fn new(node: &GroupNode<'_>, expanded: &ExpandState) -> Self {
        GroupHeaderRow {
            id: node.id.clone(),
            group_key_field: node.group_key_field.clone(),
            group_value: node.group_value.clone(),
            aggregates: node.aggregates.clone(),
            child_row_count: node.child_row_count,
            level: node.level,
            expanded: expanded.is_expanded(&node.id),
            has_children: node.has_children(),
        }
    }
}

/// One rendered line of the page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "row", rename_all = "camelCase")]
pub enum ViewRow {
    GroupHeader(GroupHeaderRow),
    Data(Row),
}

impl ViewRow {
    pub fn from_display(item: &DisplayRow<'_, '_>, expanded: &ExpandState) -> Self {
        match item {
            DisplayRow::Group(node) => ViewRow::GroupHeader(GroupHeaderRow::new(node, expanded)),
            DisplayRow::Row(row) => ViewRow::Data((*row).clone()),
        }
    }

    pub fn is_group_header(&self) -> bool {
        matches!(self, ViewRow::GroupHeader(_))
    }

    pub fn as_group_header(&self) -> Option<&GroupHeaderRow> {
        match self {
            ViewRow::GroupHeader(header) => Some(header),
            ViewRow::Data(_) => None,
        }
    }

    pub fn as_data(&self) -> Option<&Row> {
        match self {
            ViewRow::GroupHeader(_) => None,
            ViewRow::Data(row) => Some(row),
        }
    }
}

// ============================================================================
// MAIN VIEW STRUCT
// ============================================================================

/// Everything one render of the report needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportView {
    /// Visible columns, in display order.
    pub columns: Vec<ViewColumn>,

    /// The current page of the flattened sequence.
    pub rows: Vec<ViewRow>,

    pub page: PageInfo,

    /// Footer totals over every filtered row, independent of the page.
    pub totals: FxHashMap<FieldId, ColumnTotal>,

    /// Rows that passed the fixed filters and the rule chain.
    pub filtered_row_count: usize,

    /// Top-level groups; 0 when the report is not grouped.
    pub group_count: usize,
}

impl ReportView {
    pub fn data_rows(&self) -> impl Iterator<Item = &Row> {
        self.rows.iter().filter_map(ViewRow::as_data)
    }

    pub fn group_headers(&self) -> impl Iterator<Item = &GroupHeaderRow> {
        self.rows.iter().filter_map(ViewRow::as_group_header)
    }

    pub fn total(&self, column: &str) -> Option<ColumnTotal> {
        self.totals.get(column).copied()
    }
}
