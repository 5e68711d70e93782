//! FILENAME: core/report-engine/src/totals.rs
//! Totals Calculator - column footers over the whole filtered set.
//!
//! Totals read the filter output directly, so sort order, grouping and
//! the current page never change them.

use rustc_hash::FxHashMap;
use serde::de::Error as _;
use serde::{Deserialize, Serialize};

use crate::definition::{Column, FieldId};
use crate::value::{format_number, Row};

/// Footer value of one visible column.
///
/// On the wire a finite sum is a number and a placeholder is `null`. A
/// non-finite sum is the text `"Infinity"`, `"-Infinity"` or `"NaN"`, so it
/// never reads back as a placeholder.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ColumnTotal {
    /// Sum of a summable column.
    Sum(f64),
    /// Shown as a dash by the footer.
    Placeholder,
}

impl ColumnTotal {
    pub fn as_sum(&self) -> Option<f64> {
        match self {
            ColumnTotal::Sum(sum) => Some(*sum),
            ColumnTotal::Placeholder => None,
        }
    }
}

impl Serialize for ColumnTotal {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            ColumnTotal::Sum(sum) if sum.is_finite() => serializer.serialize_f64(*sum),
            ColumnTotal::Sum(sum) => serializer.serialize_str(&format_number(*sum)),
            ColumnTotal::Placeholder => serializer.serialize_none(),
        }
    }
}

impl<'de> Deserialize<'de> for ColumnTotal {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Helper {
            Number(f64),
            Text(String),
            Null,
        }

        match Helper::deserialize(deserializer)? {
            Helper::Number(sum) => Ok(ColumnTotal::Sum(sum)),
            Helper::Text(text) => match text.as_str() {
                "Infinity" => Ok(ColumnTotal::Sum(f64::INFINITY)),
                "-Infinity" => Ok(ColumnTotal::Sum(f64::NEG_INFINITY)),
                "NaN" => Ok(ColumnTotal::Sum(f64::NAN)),
                other => Err(D::Error::custom(format!("invalid column total '{}'", other))),
            },
            Helper::Null => Ok(ColumnTotal::Placeholder),
        }
    }
}

/// Totals for every visible column. Only native numeric cells are added;
/// anything else contributes 0.
pub fn column_totals(rows: &[&Row], visible: &[&Column]) -> FxHashMap<FieldId, ColumnTotal> {
    visible
        .iter()
        .map(|column| {
            let total = if column.summable {
                ColumnTotal::Sum(sum_native(rows, &column.id))
            } else {
                ColumnTotal::Placeholder
            };
            (column.id.clone(), total)
        })
        .collect()
}

fn sum_native(rows: &[&Row], field: &str) -> f64 {
    rows.iter()
        .filter_map(|row| row.get(field).and_then(|value| value.as_number()))
        .fold(0.0, |sum, n| sum + n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::DataType;
    use crate::value::CellValue;

    #[test]
    fn test_sums_only_native_numbers() {
        let rows = vec![
            Row::new().with("units", 10.0).with("region", "North"),
            Row::new().with("units", "5"),
            Row::new().with("units", f64::NAN),
            Row::new().with("units", CellValue::Empty),
            Row::new().with("units", 2.5),
            Row::new(),
        ];
        let refs: Vec<&Row> = rows.iter().collect();
        let units = Column::new("units", "Units", DataType::Number).summable();
        let region = Column::new("region", "Region", DataType::String);

        let totals = column_totals(&refs, &[&units, &region]);
        assert_eq!(totals.len(), 2);
        assert_eq!(totals.get("units"), Some(&ColumnTotal::Sum(12.5)));
        assert_eq!(totals.get("region"), Some(&ColumnTotal::Placeholder));
    }

    #[test]
    fn test_placeholder_serializes_as_null() {
        assert_eq!(serde_json::to_string(&ColumnTotal::Placeholder).unwrap(), "null");
        assert_eq!(serde_json::to_string(&ColumnTotal::Sum(3.0)).unwrap(), "3.0");
    }

    #[test]
    fn test_non_finite_sum_stays_distinct_from_placeholder() {
        let infinite = serde_json::to_value(ColumnTotal::Sum(f64::INFINITY)).unwrap();
        assert_eq!(infinite, serde_json::json!("Infinity"));

        let back: ColumnTotal = serde_json::from_value(infinite).unwrap();
        assert_eq!(back, ColumnTotal::Sum(f64::INFINITY));
        let placeholder: ColumnTotal = serde_json::from_str("null").unwrap();
        assert_eq!(placeholder, ColumnTotal::Placeholder);
        let finite: ColumnTotal = serde_json::from_str("12.5").unwrap();
        assert_eq!(finite, ColumnTotal::Sum(12.5));
        assert!(serde_json::from_str::<ColumnTotal>("\"lots\"").is_err());

        let rows = vec![Row::new().with("units", f64::MAX), Row::new().with("units", f64::MAX)];
        let refs: Vec<&Row> = rows.iter().collect();
        let units = Column::new("units", "Units", DataType::Number).summable();
        let totals = column_totals(&refs, &[&units]);
        assert_eq!(serde_json::to_value(&totals).unwrap()["units"], "Infinity");
    }

    #[test]
    fn test_empty_input_sums_to_zero() {
        let units = Column::new("units", "Units", DataType::Number).summable();
        let totals = column_totals(&[], &[&units]);
        assert_eq!(totals.get("units").and_then(ColumnTotal::as_sum), Some(0.0));
    }
}
