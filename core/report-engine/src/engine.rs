//! FILENAME: core/report-engine/src/engine.rs
//! Report Engine - wires the stages into one recomputation.
//!
//! raw rows -> filter -> (sort | group) -> flatten -> paginate -> view
//!                  \-> totals
//!
//! Every run is a pure function of the rows, the definition and the state.
//! Rows are borrowed all the way down; only the page is cloned.

use std::path::Path;

use crate::definition::{Column, ReportDefinition};
use crate::error::ReportError;
use crate::filter::filter_rows;
use crate::flatten::{flatten, rows_as_display, DisplayRow};
use crate::group::{group_rows, GroupNode};
use crate::log_debug;
use crate::paginate::{paginate, PageInfo};
use crate::sort::sort_items;
use crate::state::ReportState;
use crate::totals::column_totals;
use crate::value::Row;
use crate::view::{ReportView, ViewColumn, ViewRow};

// ============================================================================
// REPORT CALCULATOR
// ============================================================================

/// Runs the pipeline for one definition and one state snapshot.
pub struct ReportCalculator<'a> {
    definition: &'a ReportDefinition,
    state: &'a ReportState,
    /// Visible columns resolved against the catalog.
    visible: Vec<&'a Column>,
}

impl<'a> ReportCalculator<'a> {
    pub fn new(definition: &'a ReportDefinition, state: &'a ReportState) -> Self {
        let visible = state.visible(&definition.columns);
        ReportCalculator {
            definition,
            state,
            visible,
        }
    }

    /// Computes the view for `rows`.
    pub fn calculate(&self, rows: &[Row]) -> ReportView {
        let filtered = filter_rows(rows, &self.state.fixed_filters, &self.state.rules);
        log_debug!(
            "FILTER",
            "{} of {} rows kept ({} fixed, {} rules)",
            filtered.len(),
            rows.len(),
            self.state.fixed_filters.active_count(),
            self.state.rules.len()
        );

        let totals = column_totals(&filtered, &self.visible);

        let groups = self.build_groups(&filtered);
        let display = self.display_rows(&filtered, &groups);

        let page_rows: Vec<ViewRow> = paginate(&display, self.state.page, self.state.page_size)
            .iter()
            .map(|item| ViewRow::from_display(item, &self.state.expanded))
            .collect();
        let page = PageInfo::new(
            self.state.page,
            self.state.page_size,
            display.len(),
            self.definition.max_page_buttons,
        );
        log_debug!(
            "PAGE",
            "page {}/{}: {} of {} display rows",
            page.current_page,
            page.total_pages,
            page_rows.len(),
            display.len()
        );

        ReportView {
            columns: self
                .visible
                .iter()
                .map(|column| ViewColumn::new(column, &self.state.sort))
                .collect(),
            rows: page_rows,
            page,
            totals,
            filtered_row_count: filtered.len(),
            group_count: groups.len(),
        }
    }

    /// The group tree, empty when the report is not grouped.
    pub fn build_groups<'r>(&self, filtered: &[&'r Row]) -> Vec<GroupNode<'r>> {
        if !self.state.grouping.is_active() {
            return Vec::new();
        }
        let groups = group_rows(
            filtered,
            &self.state.grouping,
            &self.state.sort,
            &self.definition.columns,
            &self.visible,
        );
        log_debug!(
            "GROUP",
            "{} groups by {:?} / {:?}",
            groups.len(),
            self.state.grouping.primary(),
            self.state.grouping.secondary()
        );
        groups
    }

    /// The flattened display sequence: the group tree under the expand
    /// set, or the sorted rows when the report is not grouped.
    pub fn display_rows<'g, 'r>(&self, filtered: &[&'r Row], groups: &'g [GroupNode<'r>]) -> Vec<DisplayRow<'g, 'r>> {
        if self.state.grouping.is_active() {
            flatten(groups, &self.state.expanded)
        } else {
            rows_as_display(&sort_items(filtered, &self.state.sort, &self.definition.columns))
        }
    }
}

// ============================================================================
// PUBLIC API
// ============================================================================

/// Calculates one render of the report.
/// This is the main entry point for the calculation engine.
pub fn calculate_report(rows: &[Row], definition: &ReportDefinition, state: &ReportState) -> ReportView {
    ReportCalculator::new(definition, state).calculate(rows)
}

/// Parses rows from a JSON array of flat objects.
pub fn load_rows_from_json_str(json: &str) -> Result<Vec<Row>, ReportError> {
    let rows: Vec<Row> = serde_json::from_str(json)?;
    log_debug!("LOAD", "{} rows parsed", rows.len());
    Ok(rows)
}

pub fn load_rows_from_json_file(path: impl AsRef<Path>) -> Result<Vec<Row>, ReportError> {
    let json = std::fs::read_to_string(path)?;
    load_rows_from_json_str(&json)
}
