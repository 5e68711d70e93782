//! FILENAME: core/report-engine/src/state.rs
//! Report State - the caller-owned session choices fed to the pipeline.
//!
//! The engine keeps nothing between runs. A UI owns one `ReportState`,
//! applies the transitions below as the user interacts, and hands the
//! state to `calculate_report` after every change.

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use crate::definition::{Column, ColumnCatalog, FieldId, FilterRule, Grouping, ReportDefinition, SortSpec};
use crate::filter::FixedFilters;
use crate::flatten::ExpandState;
use crate::log_debug;
use crate::value::CellValue;

fn default_page() -> usize {
    1
}

fn default_page_size() -> usize {
    crate::definition::DEFAULT_PAGE_SIZE
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportState {
    /// Visible column ids, in display order.
    pub visible_columns: Vec<FieldId>,

    #[serde(default)]
    pub fixed_filters: FixedFilters,

    /// Advanced rule chain, evaluated as a left-to-right fold.
    #[serde(default)]
    pub rules: Vec<FilterRule>,

    #[serde(default)]
    pub sort: SortSpec,

    #[serde(default)]
    pub grouping: Grouping,

    #[serde(default)]
    pub expanded: ExpandState,

    /// 1-based.
    #[serde(default = "default_page")]
    pub page: usize,

    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

impl ReportState {
    /// Fresh session: default columns, empty selections, first page.
    pub fn new(definition: &ReportDefinition) -> Self {
        let visible_columns = if definition.default_visible_columns.is_empty() {
            definition.columns.iter().map(|c| c.id.clone()).collect()
        } else {
            definition.default_visible_columns.clone()
        };

        let mut fixed_filters = FixedFilters::new();
        for field in &definition.fixed_filter_fields {
            fixed_filters.set(field.clone(), Vec::new());
        }

        ReportState {
            visible_columns,
            fixed_filters,
            rules: Vec::new(),
            sort: SortSpec::new(),
            grouping: Grouping::none(),
            expanded: ExpandState::new(),
            page: default_page(),
            page_size: definition.default_page_size,
        }
    }

    /// Visible columns resolved against the catalog, unknown ids skipped.
    pub fn visible<'c>(&self, catalog: &'c ColumnCatalog) -> Vec<&'c Column> {
        catalog.resolve(&self.visible_columns)
    }

    // ========================================================================
    // FILTERS
    // ========================================================================

    pub fn set_fixed_filter(&mut self, field: impl Into<String>, values: Vec<CellValue>) {
        self.fixed_filters.set(field, values);
        self.page = 1;
    }

    /// Replaces the rules on visible columns with `rules`. Rules on hidden
    /// columns were not editable, so they survive, ahead of the new ones.
    pub fn apply_rules(&mut self, rules: Vec<FilterRule>) {
        let visible: FxHashSet<&str> = self.visible_columns.iter().map(String::as_str).collect();
        let mut combined: Vec<FilterRule> = self
            .rules
            .iter()
            .filter(|rule| !visible.contains(rule.field.as_str()))
            .cloned()
            .collect();
        let kept = combined.len();
        combined.extend(rules);

        log_debug!(
            "STATE",
            "rules applied: {} kept for hidden columns, {} total",
            kept,
            combined.len()
        );
        self.rules = combined;
        self.page = 1;
    }

    /// Drops fixed selections, grouping, rules and expansion. Sort order and
    /// visible columns stay.
    pub fn clear_filters(&mut self) {
        self.fixed_filters.clear_selections();
        self.grouping = Grouping::none();
        self.rules.clear();
        self.expanded.clear();
        self.page = 1;
    }

    /// Number of fixed selections plus advanced rules in effect.
    pub fn active_filter_count(&self) -> usize {
        self.fixed_filters.active_count() + self.rules.len()
    }

    // ========================================================================
    // GROUPING
    // ========================================================================

    /// Sets the primary field. Clearing it clears the sub field too.
    pub fn set_group_by(&mut self, field: Option<&str>) {
        let field = field.filter(|f| !f.is_empty()).map(str::to_string);
        let clashes = field.is_some() && field == self.grouping.sub_group_by;
        if field.is_none() || clashes {
            self.grouping.sub_group_by = None;
        }
        self.grouping.group_by = field;
        self.reset_grouping_view();
    }

    /// Sets the sub field; ignored while no primary is set or when it
    /// repeats the primary.
    pub fn set_sub_group_by(&mut self, field: Option<&str>) {
        let field = field.filter(|f| !f.is_empty());
        self.grouping.sub_group_by = match (self.grouping.primary(), field) {
            (Some(primary), Some(sub)) if sub != primary => Some(sub.to_string()),
            _ => None,
        };
        self.reset_grouping_view();
    }

    fn reset_grouping_view(&mut self) {
        self.expanded.clear();
        self.page = 1;
    }

    /// Fields offered for the primary picker, without the current sub field.
    pub fn group_by_options<'d>(&self, definition: &'d ReportDefinition) -> Vec<&'d FieldId> {
        let sub = self.grouping.sub_group_by.as_deref();
        definition
            .group_by_fields
            .iter()
            .filter(|f| Some(f.as_str()) != sub)
            .collect()
    }

    /// Fields offered for the sub picker; none until a primary is chosen.
    pub fn sub_group_by_options<'d>(&self, definition: &'d ReportDefinition) -> Vec<&'d FieldId> {
        match self.grouping.primary() {
            Some(primary) => definition
                .group_by_fields
                .iter()
                .filter(|f| f.as_str() != primary)
                .collect(),
            None => Vec::new(),
        }
    }

    /// Expands a collapsed group, or collapses it with all its descendants.
    /// Returns whether the group is now expanded.
    pub fn toggle_group(&mut self, id: &str) -> bool {
        self.expanded.toggle(id)
    }

    // ========================================================================
    // SORTING & COLUMNS
    // ========================================================================

    pub fn toggle_sort(&mut self, key: &str) {
        self.sort.toggle(key);
    }

    pub fn remove_sort(&mut self, key: &str) {
        self.sort.remove(key);
    }

    /// Sets the visible columns and sort order from the column chooser.
    /// Sort keys on columns that are no longer visible are dropped.
    pub fn apply_columns(&mut self, visible_columns: Vec<FieldId>, mut sort: SortSpec) {
        {
            let visible: FxHashSet<&str> = visible_columns.iter().map(String::as_str).collect();
            sort.retain_keys(|key| visible.contains(key));
        }
        self.visible_columns = visible_columns;
        self.sort = sort;
    }

    // ========================================================================
    // PAGINATION
    // ========================================================================

    pub fn set_page(&mut self, page: usize) {
        self.page = page;
    }

    pub fn set_page_size(&mut self, page_size: usize) {
        self.page_size = page_size;
        self.page = 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::{DataType, FilterOperator, SortDirection};

    fn definition() -> ReportDefinition {
        let mut definition = ReportDefinition::new(vec![
            Column::new("region", "Region", DataType::String),
            Column::new("manager", "Manager", DataType::String),
            Column::new("building", "Building", DataType::String),
            Column::new("units", "Units", DataType::Number).summable(),
        ]);
        definition.default_visible_columns = vec!["region".into(), "units".into()];
        definition.fixed_filter_fields = vec!["region".into()];
        definition.group_by_fields = vec!["region".into(), "manager".into(), "building".into()];
        definition
    }

    #[test]
    fn test_new_state_uses_definition_defaults() {
        let state = ReportState::new(&definition());
        assert_eq!(state.visible_columns, vec!["region", "units"]);
        assert_eq!(state.page, 1);
        assert_eq!(state.page_size, 25);
        assert!(state.fixed_filters.selection("region").is_empty());
        assert_eq!(state.active_filter_count(), 0);
    }

    #[test]
    fn test_group_by_changes_reset_expansion_and_page() {
        let definition = definition();
        let mut state = ReportState::new(&definition);
        state.set_group_by(Some("region"));
        state.set_sub_group_by(Some("manager"));
        state.expanded.expand("level0_region_North");
        state.set_page(3);

        state.set_sub_group_by(Some("building"));
        assert!(state.expanded.is_empty());
        assert_eq!(state.page, 1);

        state.set_group_by(None);
        assert_eq!(state.grouping, Grouping::none());
    }

    #[test]
    fn test_sub_group_requires_distinct_primary() {
        let definition = definition();
        let mut state = ReportState::new(&definition);

        state.set_sub_group_by(Some("manager"));
        assert_eq!(state.grouping.sub_group_by, None);

        state.set_group_by(Some("region"));
        state.set_sub_group_by(Some("region"));
        assert_eq!(state.grouping.sub_group_by, None);

        state.set_sub_group_by(Some("manager"));
        state.set_group_by(Some("manager"));
        assert_eq!(state.grouping, Grouping::by("manager"));
    }

    #[test]
    fn test_group_by_options_exclude_other_level() {
        let definition = definition();
        let mut state = ReportState::new(&definition);
        assert!(state.sub_group_by_options(&definition).is_empty());
        assert_eq!(state.group_by_options(&definition).len(), 3);

        state.set_group_by(Some("region"));
        state.set_sub_group_by(Some("manager"));
        assert_eq!(state.group_by_options(&definition), vec!["region", "building"]);
        assert_eq!(state.sub_group_by_options(&definition), vec!["manager", "building"]);
    }

    #[test]
    fn test_apply_rules_keeps_hidden_column_rules_first() {
        let mut state = ReportState::new(&definition());
        state.rules = vec![
            FilterRule::new("r1", "region", DataType::String, FilterOperator::Is, "North"),
            FilterRule::new("r2", "building", DataType::String, FilterOperator::Contains, "Tower"),
        ];
        state.set_page(4);

        state.apply_rules(vec![FilterRule::new("r3", "units", DataType::Number, FilterOperator::Gt, "5")]);
        let ids: Vec<&str> = state.rules.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["r2", "r3"]);
        assert_eq!(state.page, 1);
    }

    #[test]
    fn test_apply_columns_prunes_sort_keys() {
        let mut state = ReportState::new(&definition());
        let sort = SortSpec::new()
            .then("units", SortDirection::Desc)
            .then("manager", SortDirection::Asc);

        state.apply_columns(vec!["units".into(), "building".into()], sort);
        assert_eq!(state.visible_columns, vec!["units", "building"]);
        assert_eq!(state.sort.len(), 1);
        assert_eq!(state.sort.direction_of("units"), Some(SortDirection::Desc));
    }

    #[test]
    fn test_clear_filters_keeps_sort_and_columns() {
        let mut state = ReportState::new(&definition());
        state.set_fixed_filter("region", vec![CellValue::text("North")]);
        state.apply_rules(vec![FilterRule::new("r1", "units", DataType::Number, FilterOperator::Gt, "5")]);
        state.set_group_by(Some("region"));
        state.toggle_group("level0_region_North");
        state.toggle_sort("units");
        assert_eq!(state.active_filter_count(), 2);

        state.clear_filters();
        assert_eq!(state.active_filter_count(), 0);
        assert!(!state.grouping.is_active());
        assert!(state.expanded.is_empty());
        assert_eq!(state.sort.direction_of("units"), Some(SortDirection::Asc));
        assert_eq!(state.visible_columns, vec!["region", "units"]);
    }

    #[test]
    fn test_page_size_change_returns_to_first_page() {
        let mut state = ReportState::new(&definition());
        state.set_page(5);
        state.set_page_size(50);
        assert_eq!(state.page, 1);
        assert_eq!(state.page_size, 50);
    }

    #[test]
    fn test_state_json_defaults() {
        let state: ReportState = serde_json::from_str(
            r#"{"visibleColumns":["region"],"sort":[{"key":"units","direction":"DESC"}],"grouping":{"groupBy":"region"}}"#,
        )
        .unwrap();
        assert_eq!(state.page, 1);
        assert_eq!(state.page_size, 25);
        assert_eq!(state.sort.direction_of("units"), Some(SortDirection::Desc));
        assert_eq!(state.grouping.primary(), Some("region"));
    }
}
