//! FILENAME: core/report-engine/src/sort.rs
//! Sort Engine - stable multi-key ordering for rows and group headers.
//!
//! A `SortSpec` is a lexicographic comparator: the first key decides unless
//! it ties, then the next key, and so on. Ties on every key keep the input
//! order (the underlying sort is stable).
//!
//! Per key:
//! - null/missing values come first, in both directions;
//! - the column's declared data type picks the comparison (dates as
//!   instants, numbers numerically, text with locale-style collation);
//! - two values of the same native kind keep their native order under a
//!   text, boolean or undeclared column (false before true, numbers
//!   numerically, text collated); mixed kinds rank by kind.

use std::cmp::Ordering;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use rustc_hash::FxHashMap;

use crate::definition::{ColumnCatalog, DataType, SortDirection, SortSpec};
use crate::value::{CellValue, Row};

// ============================================================================
// SORTABLE ITEMS
// ============================================================================

/// Something the sort engine can order: a plain row or a group header.
pub trait Sortable {
    /// The value compared for `key`; `None` when the item has none.
    fn sort_value(&self, key: &str) -> Option<&CellValue>;

    /// Group headers only ever compare against other group headers.
    fn is_group_header(&self) -> bool {
        false
    }
}

impl Sortable for Row {
    fn sort_value(&self, key: &str) -> Option<&CellValue> {
        self.get(key)
    }
}

impl<T: Sortable + ?Sized> Sortable for &T {
    fn sort_value(&self, key: &str) -> Option<&CellValue> {
        (**self).sort_value(key)
    }

    fn is_group_header(&self) -> bool {
        (**self).is_group_header()
    }
}

// ============================================================================
// SORTING
// ============================================================================

/// Sorts `items` in place. Stable; an empty spec leaves the order untouched.
pub fn sort_in_place<T: Sortable>(items: &mut [T], spec: &SortSpec, catalog: &ColumnCatalog) {
    if spec.is_empty() || items.len() < 2 {
        return;
    }
    let data_types = catalog.data_types();
    items.sort_by(|a, b| compare_items(a, b, spec, &data_types));
}

/// Returns a sorted copy, leaving `items` unmodified.
pub fn sort_items<T: Sortable + Clone>(items: &[T], spec: &SortSpec, catalog: &ColumnCatalog) -> Vec<T> {
    let mut sorted = items.to_vec();
    sort_in_place(&mut sorted, spec, catalog);
    sorted
}

/// Full multi-key comparison of two items.
pub fn compare_items<T: Sortable>(
    a: &T,
    b: &T,
    spec: &SortSpec,
    data_types: &FxHashMap<&str, DataType>,
) -> Ordering {
    if a.is_group_header() != b.is_group_header() {
        return Ordering::Equal;
    }

    for sort_key in spec.iter() {
        let data_type = data_types.get(sort_key.key.as_str()).copied();
        let ordering = compare_for_key(
            a.sort_value(&sort_key.key),
            b.sort_value(&sort_key.key),
            data_type,
            sort_key.direction,
        );
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

/// Compares one key. Direction flips defined values only; nulls stay first.
pub fn compare_for_key(
    a: Option<&CellValue>,
    b: Option<&CellValue>,
    data_type: Option<DataType>,
    direction: SortDirection,
) -> Ordering {
    let a = a.filter(|v| !v.is_null());
    let b = b.filter(|v| !v.is_null());

    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => {
            let ordering = compare_defined(a, b, data_type);
            match direction {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            }
        }
    }
}

/// Ascending comparison of two non-null values.
pub fn compare_defined(a: &CellValue, b: &CellValue, data_type: Option<DataType>) -> Ordering {
    match data_type {
        Some(DataType::Date) => compare_dates(a, b),
        Some(DataType::Number) => compare_numbers(a.to_number(), b.to_number()),
        Some(DataType::String) => compare_text(a, b),
        Some(DataType::Boolean) | None => compare_native(a, b),
    }
}

/// Text columns: native numbers compare numerically and come first,
/// everything else collates by its rendering.
fn compare_text(a: &CellValue, b: &CellValue) -> Ordering {
    match (a, b) {
        (CellValue::Number(x), CellValue::Number(y)) => compare_numbers(*x, *y),
        (CellValue::Number(_), _) => Ordering::Less,
        (_, CellValue::Number(_)) => Ordering::Greater,
        _ => collate(&a.as_text(), &b.as_text()),
    }
}

fn compare_native(a: &CellValue, b: &CellValue) -> Ordering {
    match (a, b) {
        (CellValue::Number(x), CellValue::Number(y)) => compare_numbers(*x, *y),
        (CellValue::Text(x), CellValue::Text(y)) => collate(x, y),
        (CellValue::Boolean(x), CellValue::Boolean(y)) => x.cmp(y),
        _ => kind_rank(a).cmp(&kind_rank(b)),
    }
}

fn kind_rank(value: &CellValue) -> u8 {
    match value {
        CellValue::Empty => 0,
        CellValue::Boolean(_) => 1,
        CellValue::Number(_) => 2,
        CellValue::Text(_) => 3,
    }
}

/// Numeric order with NaN ahead of every number.
fn compare_numbers(x: f64, y: f64) -> Ordering {
    match (x.is_nan(), y.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
    }
}

/// Parsed dates compare as instants and precede unparseable values, which
/// compare as plain text among themselves.
fn compare_dates(a: &CellValue, b: &CellValue) -> Ordering {
    match (parse_sort_date(a), parse_sort_date(b)) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.as_text().cmp(&b.as_text()),
    }
}

/// Lenient date parsing for ordering, as UTC milliseconds.
pub fn parse_sort_date(value: &CellValue) -> Option<i64> {
    let text = match value {
        CellValue::Text(s) => s.trim(),
        _ => return None,
    };

    if let Ok(instant) = DateTime::parse_from_rfc3339(text) {
        return Some(instant.timestamp_millis());
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(local) = NaiveDateTime::parse_from_str(text, format) {
            return Some(local.and_utc().timestamp_millis());
        }
    }
    for format in ["%Y-%m-%d", "%Y/%m/%d"] {
        if let Ok(date) = NaiveDate::parse_from_str(text, format) {
            return date
                .and_hms_opt(0, 0, 0)
                .map(|midnight| midnight.and_utc().timestamp_millis());
        }
    }
    None
}

/// Locale-style text ordering: letters compare case-insensitively first,
/// then lowercase sorts ahead of uppercase.
pub fn collate(a: &str, b: &str) -> Ordering {
    let primary = a
        .chars()
        .flat_map(char::to_lowercase)
        .cmp(b.chars().flat_map(char::to_lowercase));
    primary.then_with(|| a.chars().map(case_weight).cmp(b.chars().map(case_weight)))
}

fn case_weight(c: char) -> (bool, char) {
    (!c.is_lowercase(), c)
}
