//! FILENAME: core/report-engine/src/lib.rs
//! Tabular report engine.
//!
//! Given a flat collection of records, the engine applies fixed-field
//! filters and an ordered rule chain, sorts by several keys, optionally
//! groups into a two-level hierarchy with per-column aggregates, flattens
//! the hierarchy under the caller's expand set, paginates, and computes
//! column totals over the whole filtered set.
//!
//! Layers:
//! - `definition`: Serializable configuration (what the report IS)
//! - `value`: Row and cell model
//! - `filter`, `sort`, `group`, `flatten`, `paginate`, `totals`: the stages
//! - `state`: Caller-owned session choices and their transitions
//! - `view`: Renderable output for the frontend (WHAT we display)
//! - `engine`: Pipeline wiring (HOW we calculate)

pub mod logging;
pub mod definition;
pub mod engine;
pub mod error;
pub mod filter;
pub mod flatten;
pub mod group;
pub mod paginate;
pub mod sort;
pub mod state;
pub mod totals;
pub mod value;
pub mod view;

pub use definition::*;
pub use engine::{calculate_report, load_rows_from_json_file, load_rows_from_json_str, ReportCalculator};
pub use error::ReportError;
pub use filter::{evaluate_rule, filter_rows, matches_rules, FixedFilter, FixedFilters};
pub use flatten::{flatten, rows_as_display, DisplayRow, ExpandState};
pub use group::{group_id, group_rows, sanitize_id_value, GroupChild, GroupEngine, GroupNode, ID_SEPARATOR};
pub use paginate::{page_window, paginate, total_pages, PageInfo};
pub use sort::{collate, compare_items, sort_in_place, sort_items, Sortable};
pub use state::ReportState;
pub use totals::{column_totals, ColumnTotal};
pub use value::{CellValue, Row};
pub use view::{GroupHeaderRow, ReportView, ViewColumn, ViewRow};
