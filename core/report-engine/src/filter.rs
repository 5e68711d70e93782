//! FILENAME: core/report-engine/src/filter.rs
//! Filter Engine - fixed-field selections and the advanced rule chain.
//!
//! Fixed filters keep a row when its field value is one of the selected
//! values (AND across fields). The advanced chain is a strict left-to-right
//! fold: the first rule seeds the result and every later rule combines with
//! the running result through its own conjunction. There is no precedence,
//! so `A OR B AND C` means `(A OR B) AND C`.
//!
//! Malformed data never raises: an unparseable number or date, a null cell
//! or an operator that does not fit the rule's data type all evaluate false.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::definition::{Conjunction, DataType, FieldId, FilterOperator, FilterRule};
use crate::value::{CellValue, Row};

/// Strict calendar-date shape, ASCII digits only.
static ISO_DATE: Lazy<regex::Regex> = Lazy::new(|| {
    regex::Regex::new(r"^[0-9]{4}-[0-9]{2}-[0-9]{2}$").expect("ISO date pattern compiles")
});

// ============================================================================
// FIXED FILTERS
// ============================================================================

/// Accepted raw values for one fixed field. An empty list is no restriction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FixedFilter {
    pub field: FieldId,
    #[serde(default)]
    pub values: Vec<CellValue>,
}

impl FixedFilter {
    pub fn is_active(&self) -> bool {
        !self.values.is_empty()
    }

    pub fn matches(&self, row: &Row) -> bool {
        if self.values.is_empty() {
            return true;
        }
        match row.get(&self.field) {
            Some(value) => self.values.contains(value),
            None => false,
        }
    }
}

/// The fixed multi-select filters, one entry per configured field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FixedFilters {
    filters: Vec<FixedFilter>,
}

impl FixedFilters {
    pub fn new() -> Self {
        FixedFilters::default()
    }

    pub fn with(mut self, field: impl Into<String>, values: Vec<CellValue>) -> Self {
        self.set(field, values);
        self
    }

    /// Replaces the selection for `field`.
    pub fn set(&mut self, field: impl Into<String>, values: Vec<CellValue>) {
        let field = field.into();
        match self.filters.iter_mut().find(|f| f.field == field) {
            Some(existing) => existing.values = values,
            None => self.filters.push(FixedFilter { field, values }),
        }
    }

    pub fn selection(&self, field: &str) -> &[CellValue] {
        self.filters
            .iter()
            .find(|f| f.field == field)
            .map(|f| f.values.as_slice())
            .unwrap_or(&[])
    }

    pub fn clear(&mut self) {
        self.filters.clear();
    }

    /// Empties every selection but keeps the configured fields.
    pub fn clear_selections(&mut self) {
        for filter in &mut self.filters {
            filter.values.clear();
        }
    }

    pub fn active_count(&self) -> usize {
        self.filters.iter().filter(|f| f.is_active()).count()
    }

    pub fn matches(&self, row: &Row) -> bool {
        self.filters.iter().all(|f| f.matches(row))
    }

    pub fn iter(&self) -> impl Iterator<Item = &FixedFilter> {
        self.filters.iter()
    }
}

// ============================================================================
// RULE EVALUATION
// ============================================================================

/// Evaluates one rule against one row.
pub fn evaluate_rule(row: &Row, rule: &FilterRule) -> bool {
    // Emptiness checks run before any type-specific handling.
    match rule.operator {
        FilterOperator::IsEmpty => return row.get(&rule.field).map_or(true, CellValue::is_blank),
        FilterOperator::IsNotEmpty => {
            return row.get(&rule.field).map_or(false, |v| !v.is_blank())
        }
        _ => {}
    }

    let cell = match row.value(&rule.field) {
        Some(cell) => cell,
        None => return false,
    };

    match rule.data_type {
        DataType::String => evaluate_text(cell, rule),
        DataType::Number => evaluate_number(cell, rule),
        DataType::Date => evaluate_date(cell, rule),
        DataType::Boolean => evaluate_boolean(cell, rule),
    }
}

fn evaluate_text(cell: &CellValue, rule: &FilterRule) -> bool {
    let cell_text = cell.as_text().to_lowercase();
    let rule_text = rule.value.as_text().to_lowercase();

    match rule.operator {
        FilterOperator::Is => cell_text == rule_text,
        FilterOperator::IsNot => cell_text != rule_text,
        FilterOperator::Contains => cell_text.contains(&rule_text),
        FilterOperator::DoesNotContain => !cell_text.contains(&rule_text),
        FilterOperator::StartsWith => cell_text.starts_with(&rule_text),
        FilterOperator::EndsWith => cell_text.ends_with(&rule_text),
        _ => false,
    }
}

fn evaluate_number(cell: &CellValue, rule: &FilterRule) -> bool {
    let (cell_num, rule_num) = match (cell.parse_number_prefix(), rule.value.parse_number_prefix()) {
        (Some(c), Some(r)) => (c, r),
        _ => return false,
    };

    match rule.operator {
        FilterOperator::Eq => cell_num == rule_num,
        FilterOperator::Neq => cell_num != rule_num,
        FilterOperator::Gt => cell_num > rule_num,
        FilterOperator::Lt => cell_num < rule_num,
        FilterOperator::Gte => cell_num >= rule_num,
        FilterOperator::Lte => cell_num <= rule_num,
        _ => false,
    }
}

fn evaluate_date(cell: &CellValue, rule: &FilterRule) -> bool {
    let (cell_date, rule_date) = match (parse_strict_date(cell), parse_strict_date(&rule.value)) {
        (Some(c), Some(r)) => (c, r),
        _ => return false,
    };

    match rule.operator {
        FilterOperator::DateIs => cell_date == rule_date,
        FilterOperator::DateIsNot => cell_date != rule_date,
        FilterOperator::DateIsBefore => cell_date < rule_date,
        FilterOperator::DateIsAfter => cell_date > rule_date,
        FilterOperator::DateIsOnOrBefore => cell_date <= rule_date,
        FilterOperator::DateIsOnOrAfter => cell_date >= rule_date,
        _ => false,
    }
}

fn evaluate_boolean(cell: &CellValue, rule: &FilterRule) -> bool {
    match rule.operator {
        FilterOperator::IsTrue => *cell == CellValue::Boolean(true),
        FilterOperator::IsFalse => *cell == CellValue::Boolean(false),
        FilterOperator::Unknown => false,
        _ => *cell == CellValue::Boolean(rule_bool(&rule.value)),
    }
}

/// A rule value counts as true when it is `true` or the text "true" in any case.
fn rule_bool(value: &CellValue) -> bool {
    match value {
        CellValue::Boolean(b) => *b,
        other => other.as_text().eq_ignore_ascii_case("true"),
    }
}

/// Strict `YYYY-MM-DD` calendar date; anything else is not a date.
pub(crate) fn parse_strict_date(value: &CellValue) -> Option<NaiveDate> {
    let text = value.as_text();
    if !ISO_DATE.is_match(&text) {
        return None;
    }
    NaiveDate::parse_from_str(&text, "%Y-%m-%d").ok()
}

/// Folds the rule chain left to right. An empty chain keeps every row.
pub fn matches_rules(row: &Row, rules: &[FilterRule]) -> bool {
    let mut rules = rules.iter();
    let first = match rules.next() {
        Some(rule) => rule,
        None => return true,
    };

    rules.fold(evaluate_rule(row, first), |acc, rule| {
        match rule.conjunction.unwrap_or_default() {
            Conjunction::And => acc && evaluate_rule(row, rule),
            Conjunction::Or => acc || evaluate_rule(row, rule),
        }
    })
}

/// Applies fixed filters then the rule chain. Input order is preserved.
pub fn filter_rows<'a>(rows: &'a [Row], fixed: &FixedFilters, rules: &[FilterRule]) -> Vec<&'a Row> {
    rows.iter()
        .filter(|row| fixed.matches(row) && matches_rules(row, rules))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_rows() -> Vec<Row> {
        vec![
            Row::new().with("region", "North").with("units", 10.0),
            Row::new().with("region", "South").with("units", 5.0),
        ]
    }

    fn rule(field: &str, data_type: DataType, op: FilterOperator, value: impl Into<CellValue>) -> FilterRule {
        FilterRule::new(format!("r-{}", field), field, data_type, op, value)
    }

    #[test]
    fn test_fixed_filter_membership() {
        let rows = sample_rows();
        let fixed = FixedFilters::new().with("region", vec![CellValue::text("North")]);

        let kept = filter_rows(&rows, &fixed, &[]);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].get("units"), Some(&CellValue::Number(10.0)));
    }

    #[test]
    fn test_empty_fixed_selection_is_no_restriction() {
        let rows = sample_rows();
        let fixed = FixedFilters::new().with("region", vec![]);
        assert_eq!(filter_rows(&rows, &fixed, &[]).len(), 2);
        assert_eq!(fixed.active_count(), 0);
    }

    #[test]
    fn test_fixed_filters_and_across_fields() {
        let rows = vec![
            Row::new().with("region", "North").with("manager", "Alice"),
            Row::new().with("region", "North").with("manager", "Bob"),
            Row::new().with("region", "South").with("manager", "Alice"),
        ];
        let fixed = FixedFilters::new()
            .with("region", vec![CellValue::text("North")])
            .with("manager", vec![CellValue::text("Alice"), CellValue::text("Carol")]);
        assert_eq!(filter_rows(&rows, &fixed, &[]).len(), 1);
    }

    #[test]
    fn test_number_rule_gt() {
        let rows = sample_rows();
        let rules = vec![rule("units", DataType::Number, FilterOperator::Gt, "7")];
        let kept = filter_rows(&rows, &FixedFilters::new(), &rules);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].get("region"), Some(&CellValue::text("North")));
    }

    #[test]
    fn test_number_rule_fails_closed_on_garbage() {
        let row = Row::new().with("units", "n/a");
        assert!(!evaluate_rule(&row, &rule("units", DataType::Number, FilterOperator::Neq, "7")));

        let row = Row::new().with("units", 3.0);
        assert!(!evaluate_rule(&row, &rule("units", DataType::Number, FilterOperator::Lt, "seven")));
        assert!(evaluate_rule(&row, &rule("units", DataType::Number, FilterOperator::Lt, "7 units")));
    }

    #[test]
    fn test_text_rules_are_case_insensitive() {
        let row = Row::new().with("building", "Alpha Tower");
        let check = |op, value: &str| evaluate_rule(&row, &rule("building", DataType::String, op, value));

        assert!(check(FilterOperator::Is, "alpha tower"));
        assert!(!check(FilterOperator::IsNot, "ALPHA TOWER"));
        assert!(check(FilterOperator::Contains, "PHA t"));
        assert!(check(FilterOperator::DoesNotContain, "beta"));
        assert!(check(FilterOperator::StartsWith, "alp"));
        assert!(check(FilterOperator::EndsWith, "TOWER"));
        assert!(!check(FilterOperator::Gt, "a"));
    }

    #[test]
    fn test_empty_checks_run_before_type_handling() {
        let blank = Row::new().with("note", "");
        let null = Row::new().with("note", CellValue::Empty);
        let missing = Row::new();
        let filled = Row::new().with("note", "x");

        for row in [&blank, &null, &missing] {
            assert!(evaluate_rule(row, &rule("note", DataType::Number, FilterOperator::IsEmpty, CellValue::Empty)));
            assert!(!evaluate_rule(row, &rule("note", DataType::Number, FilterOperator::IsNotEmpty, CellValue::Empty)));
        }
        assert!(evaluate_rule(&filled, &rule("note", DataType::Date, FilterOperator::IsNotEmpty, CellValue::Empty)));
    }

    #[test]
    fn test_null_cell_fails_every_other_rule() {
        let row = Row::new().with("region", CellValue::Empty);
        assert!(!evaluate_rule(&row, &rule("region", DataType::String, FilterOperator::IsNot, "North")));
        assert!(!evaluate_rule(&row, &rule("region", DataType::String, FilterOperator::DoesNotContain, "x")));
        assert!(!evaluate_rule(&Row::new(), &rule("region", DataType::String, FilterOperator::IsNot, "North")));
    }

    #[test]
    fn test_date_rules() {
        let row = Row::new().with("leaseStartDate", "2024-03-15");
        let check = |op, value: &str| evaluate_rule(&row, &rule("leaseStartDate", DataType::Date, op, value));

        assert!(check(FilterOperator::DateIs, "2024-03-15"));
        assert!(check(FilterOperator::DateIsNot, "2024-03-16"));
        assert!(check(FilterOperator::DateIsBefore, "2024-04-01"));
        assert!(check(FilterOperator::DateIsAfter, "2023-12-31"));
        assert!(check(FilterOperator::DateIsOnOrBefore, "2024-03-15"));
        assert!(check(FilterOperator::DateIsOnOrAfter, "2024-03-15"));
    }

    #[test]
    fn test_date_rules_fail_closed() {
        let row = Row::new().with("d", "2024-03-15");
        // Wrong shape, impossible calendar date, non-ASCII digits.
        for bad in ["2024-3-15", "2024-02-30", "15/03/2024", "２０２４-03-15", "2024-03-15T00:00:00Z"] {
            assert!(!evaluate_rule(&row, &rule("d", DataType::Date, FilterOperator::DateIsOnOrBefore, bad)), "{}", bad);
        }
        let bad_cell = Row::new().with("d", "March 15");
        assert!(!evaluate_rule(&bad_cell, &rule("d", DataType::Date, FilterOperator::DateIsNot, "2024-03-15")));
    }

    #[test]
    fn test_boolean_rules() {
        let yes = Row::new().with("active", true);
        let no = Row::new().with("active", false);
        let text = Row::new().with("active", "true");

        let is_true = rule("active", DataType::Boolean, FilterOperator::IsTrue, CellValue::Empty);
        let is_false = rule("active", DataType::Boolean, FilterOperator::IsFalse, CellValue::Empty);
        assert!(evaluate_rule(&yes, &is_true));
        assert!(!evaluate_rule(&no, &is_true));
        assert!(evaluate_rule(&no, &is_false));
        assert!(!evaluate_rule(&text, &is_true));

        let equals_true = rule("active", DataType::Boolean, FilterOperator::Is, "TRUE");
        assert!(evaluate_rule(&yes, &equals_true));
        assert!(!evaluate_rule(&no, &equals_true));
        let equals_false = rule("active", DataType::Boolean, FilterOperator::Is, false);
        assert!(evaluate_rule(&no, &equals_false));
    }

    #[test]
    fn test_mismatched_operator_and_type_fail_closed() {
        let row = Row::new().with("units", 10.0).with("region", "North");
        assert!(!evaluate_rule(&row, &rule("units", DataType::Number, FilterOperator::Contains, "1")));
        assert!(!evaluate_rule(&row, &rule("region", DataType::String, FilterOperator::IsTrue, CellValue::Empty)));
        assert!(!evaluate_rule(&row, &rule("region", DataType::String, FilterOperator::Unknown, "North")));
        assert!(!evaluate_rule(&row, &rule("units", DataType::Boolean, FilterOperator::Unknown, true)));
    }

    #[test]
    fn test_chain_is_a_left_to_right_fold() {
        // A = false, B = true, C = false
        let row = Row::new().with("x", 1.0);
        let a = rule("x", DataType::Number, FilterOperator::Eq, "2");
        let b = rule("x", DataType::Number, FilterOperator::Eq, "1").joined_by(Conjunction::Or);
        let c = rule("x", DataType::Number, FilterOperator::Eq, "3").joined_by(Conjunction::And);

        // A OR B AND C: (A OR B) AND C = false.
        assert!(!matches_rules(&row, &[a.clone(), b.clone(), c.clone()]));

        // A AND C OR B: fold gives (A AND C) OR B = true.
        let c_and = rule("x", DataType::Number, FilterOperator::Eq, "3").joined_by(Conjunction::And);
        let b_or = b.clone();
        assert!(matches_rules(&row, &[a.clone(), c_and, b_or]));

        // B OR A AND C: fold gives (B OR A) AND C = false; precedence would give true.
        let a_or = a.clone().joined_by(Conjunction::Or);
        let b_first = rule("x", DataType::Number, FilterOperator::Eq, "1");
        assert!(!matches_rules(&row, &[b_first, a_or, c]));
    }

    #[test]
    fn test_missing_conjunction_means_and() {
        let row = Row::new().with("x", 1.0);
        let yes = rule("x", DataType::Number, FilterOperator::Eq, "1");
        let no = rule("x", DataType::Number, FilterOperator::Eq, "2");
        assert!(!matches_rules(&row, &[yes.clone(), no]));
        // The first rule's conjunction is ignored.
        assert!(matches_rules(&row, &[yes.joined_by(Conjunction::Or)]));
    }

    #[test]
    fn test_adding_and_rule_never_grows_result() {
        let rows: Vec<Row> = (0..20)
            .map(|i| Row::new().with("units", i as f64).with("region", if i % 2 == 0 { "North" } else { "South" }))
            .collect();
        let mut rules = vec![rule("units", DataType::Number, FilterOperator::Gte, "5")];
        let before = filter_rows(&rows, &FixedFilters::new(), &rules).len();
        rules.push(rule("region", DataType::String, FilterOperator::Is, "north").joined_by(Conjunction::And));
        let after = filter_rows(&rows, &FixedFilters::new(), &rules).len();

        assert!(before <= rows.len());
        assert!(after <= before);
        assert_eq!(before, 15);
        assert_eq!(after, 7);
    }
}
