//! FILENAME: core/report-engine/src/definition.rs
//! Report Definition - The serializable configuration.
//!
//! This module contains the types that DESCRIBE a report: which columns
//! exist and how they compare, which rules and sort keys the user built,
//! and how rows are grouped. These structures are:
//! - Serializable (camelCase on the wire, rule-builder operator keys)
//! - Immutable snapshots of user intent, re-fed on every recomputation

use std::path::Path;

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::error::ReportError;
use crate::value::CellValue;

/// Identifier of a field, shared between rows and the column catalog.
pub type FieldId = String;

pub const DEFAULT_PAGE_SIZE: usize = 25;
pub const DEFAULT_MAX_PAGE_BUTTONS: usize = 5;

// ============================================================================
// COLUMNS
// ============================================================================

/// Comparison and aggregation semantics of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    #[default]
    String,
    Number,
    Boolean,
    Date,
}

/// A field the report knows about.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    pub id: FieldId,
    pub label: String,
    #[serde(default)]
    pub data_type: DataType,
    /// Whether the column is summed in group aggregates and totals.
    #[serde(default)]
    pub summable: bool,
    /// Chooser category ("General", "Financials", ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl Column {
    pub fn new(id: impl Into<String>, label: impl Into<String>, data_type: DataType) -> Self {
        Column {
            id: id.into(),
            label: label.into(),
            data_type,
            summable: false,
            category: None,
        }
    }

    pub fn summable(mut self) -> Self {
        self.summable = true;
        self
    }

    pub fn in_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }
}

/// Every column the report can show, in catalog order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColumnCatalog {
    columns: Vec<Column>,
}

impl ColumnCatalog {
    pub fn new(columns: Vec<Column>) -> Self {
        ColumnCatalog { columns }
    }

    pub fn get(&self, id: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.id == id)
    }

    pub fn data_type_of(&self, id: &str) -> Option<DataType> {
        self.get(id).map(|c| c.data_type)
    }

    /// Lookup table from field id to data type, built once per sort.
    pub fn data_types(&self) -> FxHashMap<&str, DataType> {
        self.columns
            .iter()
            .map(|c| (c.id.as_str(), c.data_type))
            .collect()
    }

    /// Resolves visible ids to columns in the given order, skipping unknown ids.
    pub fn resolve<'c>(&'c self, ids: &[FieldId]) -> Vec<&'c Column> {
        ids.iter().filter_map(|id| self.get(id)).collect()
    }

    /// Distinct categories in first-seen order.
    pub fn categories(&self) -> Vec<&str> {
        let mut seen = FxHashSet::default();
        self.columns
            .iter()
            .filter_map(|c| c.category.as_deref())
            .filter(|c| seen.insert(*c))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Column> {
        self.columns.iter()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

// ============================================================================
// FILTER RULES
// ============================================================================

/// Rule-builder operators. Keys match the builder's snake_case keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOperator {
    // String
    Is,
    IsNot,
    Contains,
    DoesNotContain,
    StartsWith,
    EndsWith,
    // Number
    Eq,
    Neq,
    Gt,
    Lt,
    Gte,
    Lte,
    // Date
    DateIs,
    DateIsNot,
    DateIsBefore,
    DateIsAfter,
    DateIsOnOrBefore,
    DateIsOnOrAfter,
    // Boolean
    IsTrue,
    IsFalse,
    // Any type
    IsEmpty,
    IsNotEmpty,
    /// Any key the builder sent that this engine does not know. Never matches.
    #[serde(other)]
    Unknown,
}

const STRING_TYPES: &[DataType] = &[DataType::String];
const NUMBER_TYPES: &[DataType] = &[DataType::Number];
const DATE_TYPES: &[DataType] = &[DataType::Date];
const BOOLEAN_TYPES: &[DataType] = &[DataType::Boolean];
const EMPTY_CHECK_TYPES: &[DataType] = &[DataType::String, DataType::Number, DataType::Date];

impl FilterOperator {
    /// All known operators in builder order.
    pub const ALL: [FilterOperator; 22] = [
        FilterOperator::Is,
        FilterOperator::IsNot,
        FilterOperator::Contains,
        FilterOperator::DoesNotContain,
        FilterOperator::StartsWith,
        FilterOperator::EndsWith,
        FilterOperator::Eq,
        FilterOperator::Neq,
        FilterOperator::Gt,
        FilterOperator::Lt,
        FilterOperator::Gte,
        FilterOperator::Lte,
        FilterOperator::DateIs,
        FilterOperator::DateIsNot,
        FilterOperator::DateIsBefore,
        FilterOperator::DateIsAfter,
        FilterOperator::DateIsOnOrBefore,
        FilterOperator::DateIsOnOrAfter,
        FilterOperator::IsTrue,
        FilterOperator::IsFalse,
        FilterOperator::IsEmpty,
        FilterOperator::IsNotEmpty,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            FilterOperator::Is => "is",
            FilterOperator::IsNot => "is_not",
            FilterOperator::Contains => "contains",
            FilterOperator::DoesNotContain => "does_not_contain",
            FilterOperator::StartsWith => "starts_with",
            FilterOperator::EndsWith => "ends_with",
            FilterOperator::Eq => "eq",
            FilterOperator::Neq => "neq",
            FilterOperator::Gt => "gt",
            FilterOperator::Lt => "lt",
            FilterOperator::Gte => "gte",
            FilterOperator::Lte => "lte",
            FilterOperator::DateIs => "date_is",
            FilterOperator::DateIsNot => "date_is_not",
            FilterOperator::DateIsBefore => "date_is_before",
            FilterOperator::DateIsAfter => "date_is_after",
            FilterOperator::DateIsOnOrBefore => "date_is_on_or_before",
            FilterOperator::DateIsOnOrAfter => "date_is_on_or_after",
            FilterOperator::IsTrue => "is_true",
            FilterOperator::IsFalse => "is_false",
            FilterOperator::IsEmpty => "is_empty",
            FilterOperator::IsNotEmpty => "is_not_empty",
            FilterOperator::Unknown => "unknown",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            FilterOperator::Is => "Is",
            FilterOperator::IsNot => "Is not",
            FilterOperator::Contains => "Contains",
            FilterOperator::DoesNotContain => "Does not contain",
            FilterOperator::StartsWith => "Starts with",
            FilterOperator::EndsWith => "Ends with",
            FilterOperator::Eq => "Equals (=)",
            FilterOperator::Neq => "Not equals (!=)",
            FilterOperator::Gt => "Greater than (>)",
            FilterOperator::Lt => "Less than (<)",
            FilterOperator::Gte => "Greater than or equal to (>=)",
            FilterOperator::Lte => "Less than or equal to (<=)",
            FilterOperator::DateIs => "Is on",
            FilterOperator::DateIsNot => "Is not on",
            FilterOperator::DateIsBefore => "Is before",
            FilterOperator::DateIsAfter => "Is after",
            FilterOperator::DateIsOnOrBefore => "Is on or before",
            FilterOperator::DateIsOnOrAfter => "Is on or after",
            FilterOperator::IsTrue => "Is true",
            FilterOperator::IsFalse => "Is false",
            FilterOperator::IsEmpty => "Is empty",
            FilterOperator::IsNotEmpty => "Is not empty",
            FilterOperator::Unknown => "Unknown",
        }
    }

    pub fn applicable_data_types(&self) -> &'static [DataType] {
        use FilterOperator::*;
        match self {
            Is | IsNot | Contains | DoesNotContain | StartsWith | EndsWith => STRING_TYPES,
            Eq | Neq | Gt | Lt | Gte | Lte => NUMBER_TYPES,
            DateIs | DateIsNot | DateIsBefore | DateIsAfter | DateIsOnOrBefore
            | DateIsOnOrAfter => DATE_TYPES,
            IsTrue | IsFalse => BOOLEAN_TYPES,
            IsEmpty | IsNotEmpty => EMPTY_CHECK_TYPES,
            Unknown => &[],
        }
    }

    /// Whether the builder asks the user for a comparison value.
    pub fn requires_value(&self) -> bool {
        !matches!(
            self,
            FilterOperator::IsTrue
                | FilterOperator::IsFalse
                | FilterOperator::IsEmpty
                | FilterOperator::IsNotEmpty
        )
    }

    pub fn applies_to(&self, data_type: DataType) -> bool {
        self.applicable_data_types().contains(&data_type)
    }
}

/// Operators offered for a column of the given type, in builder order.
pub fn operators_for(data_type: DataType) -> Vec<FilterOperator> {
    FilterOperator::ALL
        .iter()
        .copied()
        .filter(|op| op.applies_to(data_type))
        .collect()
}

/// How a rule joins the result of the rules before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Conjunction {
    #[default]
    #[serde(alias = "and")]
    And,
    #[serde(alias = "or")]
    Or,
}

/// One predicate in the advanced rule chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterRule {
    pub id: String,
    pub field: FieldId,
    pub data_type: DataType,
    pub operator: FilterOperator,
    #[serde(default)]
    pub value: CellValue,
    /// Absent on the first rule; a missing conjunction later in the chain means AND.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conjunction: Option<Conjunction>,
}

impl FilterRule {
    pub fn new(
        id: impl Into<String>,
        field: impl Into<String>,
        data_type: DataType,
        operator: FilterOperator,
        value: impl Into<CellValue>,
    ) -> Self {
        FilterRule {
            id: id.into(),
            field: field.into(),
            data_type,
            operator,
            value: value.into(),
            conjunction: None,
        }
    }

    pub fn joined_by(mut self, conjunction: Conjunction) -> Self {
        self.conjunction = Some(conjunction);
        self
    }
}

// ============================================================================
// SORTING
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortDirection {
    #[default]
    #[serde(alias = "asc")]
    Asc,
    #[serde(alias = "desc")]
    Desc,
}

impl SortDirection {
    pub fn flipped(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortKey {
    pub key: FieldId,
    pub direction: SortDirection,
}

impl SortKey {
    pub fn new(key: impl Into<String>, direction: SortDirection) -> Self {
        SortKey {
            key: key.into(),
            direction,
        }
    }
}

/// Ordered, unique-by-key list of sort keys. The first key is primary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SortSpec {
    keys: SmallVec<[SortKey; 4]>,
}

impl SortSpec {
    pub fn new() -> Self {
        SortSpec::default()
    }

    /// Builds a spec, keeping the first occurrence of each key.
    pub fn from_keys(keys: impl IntoIterator<Item = SortKey>) -> Self {
        let mut spec = SortSpec::new();
        for key in keys {
            if spec.position(&key.key).is_none() {
                spec.keys.push(key);
            }
        }
        spec
    }

    pub fn then(mut self, key: impl Into<String>, direction: SortDirection) -> Self {
        self.set(key, direction);
        self
    }

    /// Sets the direction of `key`, appending it when absent.
    pub fn set(&mut self, key: impl Into<String>, direction: SortDirection) {
        let key = key.into();
        match self.position(&key) {
            Some(idx) => self.keys[idx].direction = direction,
            None => self.keys.push(SortKey { key, direction }),
        }
    }

    /// Appends `key` ascending, or flips it in place if already sorted.
    pub fn toggle(&mut self, key: &str) {
        match self.position(key) {
            Some(idx) => self.keys[idx].direction = self.keys[idx].direction.flipped(),
            None => self.keys.push(SortKey::new(key, SortDirection::Asc)),
        }
    }

    pub fn remove(&mut self, key: &str) -> bool {
        let before = self.keys.len();
        self.keys.retain(|k| k.key != key);
        self.keys.len() != before
    }

    pub fn retain_keys(&mut self, keep: impl Fn(&str) -> bool) {
        self.keys.retain(|k| keep(&k.key));
    }

    pub fn position(&self, key: &str) -> Option<usize> {
        self.keys.iter().position(|k| k.key == key)
    }

    pub fn direction_of(&self, key: &str) -> Option<SortDirection> {
        self.position(key).map(|idx| self.keys[idx].direction)
    }

    /// 1-based sort priority shown next to a column header.
    pub fn priority_of(&self, key: &str) -> Option<usize> {
        self.position(key).map(|idx| idx + 1)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SortKey> {
        self.keys.iter()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

// ============================================================================
// GROUPING
// ============================================================================

/// Primary and optional secondary grouping field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Grouping {
    #[serde(default)]
    pub group_by: Option<FieldId>,
    #[serde(default)]
    pub sub_group_by: Option<FieldId>,
}

impl Grouping {
    pub fn none() -> Self {
        Grouping::default()
    }

    pub fn by(field: impl Into<String>) -> Self {
        Grouping {
            group_by: Some(field.into()),
            sub_group_by: None,
        }
    }

    pub fn then_by(mut self, field: impl Into<String>) -> Self {
        self.sub_group_by = Some(field.into());
        self
    }

    pub fn primary(&self) -> Option<&str> {
        self.group_by.as_deref().filter(|f| !f.is_empty())
    }

    /// The sub field, only when a primary is set and the two differ.
    pub fn secondary(&self) -> Option<&str> {
        let primary = self.primary()?;
        self.sub_group_by
            .as_deref()
            .filter(|f| !f.is_empty() && *f != primary)
    }

    pub fn is_active(&self) -> bool {
        self.primary().is_some()
    }
}

// ============================================================================
// MAIN DEFINITION STRUCT
// ============================================================================

/// Static configuration of a report: the column catalog and the option
/// lists the caller offers. Per-session choices live in `ReportState`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportDefinition {
    /// User-friendly report title.
    #[serde(default)]
    pub name: Option<String>,

    /// Every column the report can show.
    pub columns: ColumnCatalog,

    /// Columns visible when a session starts, in display order.
    #[serde(default)]
    pub default_visible_columns: Vec<FieldId>,

    /// Fields that get a fixed multi-select filter.
    #[serde(default)]
    pub fixed_filter_fields: Vec<FieldId>,

    /// Fields offered in the group-by pickers.
    #[serde(default)]
    pub group_by_fields: Vec<FieldId>,

    #[serde(default = "default_page_size")]
    pub default_page_size: usize,

    #[serde(default = "default_page_size_options")]
    pub page_size_options: Vec<usize>,

    /// Width of the page-number window in the pager.
    #[serde(default = "default_max_page_buttons")]
    pub max_page_buttons: usize,
}

fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

fn default_page_size_options() -> Vec<usize> {
    vec![5, 10, 15, 25, 50, 100]
}

fn default_max_page_buttons() -> usize {
    DEFAULT_MAX_PAGE_BUTTONS
}

impl Default for ReportDefinition {
    fn default() -> Self {
        ReportDefinition {
            name: None,
            columns: ColumnCatalog::default(),
            default_visible_columns: Vec::new(),
            fixed_filter_fields: Vec::new(),
            group_by_fields: Vec::new(),
            default_page_size: default_page_size(),
            page_size_options: default_page_size_options(),
            max_page_buttons: default_max_page_buttons(),
        }
    }
}

impl ReportDefinition {
    pub fn new(columns: Vec<Column>) -> Self {
        let default_visible_columns = columns.iter().map(|c| c.id.clone()).collect();
        ReportDefinition {
            columns: ColumnCatalog::new(columns),
            default_visible_columns,
            ..ReportDefinition::default()
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self, ReportError> {
        let definition: ReportDefinition = serde_json::from_str(json)?;
        definition.validate()?;
        Ok(definition)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ReportError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Checks caller-level consistency. The pipeline itself never relies on it.
    pub fn validate(&self) -> Result<(), ReportError> {
        let mut seen = FxHashSet::default();
        for column in self.columns.iter() {
            if !seen.insert(column.id.as_str()) {
                return Err(ReportError::InvalidDefinition(format!(
                    "duplicate column id '{}'",
                    column.id
                )));
            }
        }

        let referenced = self
            .default_visible_columns
            .iter()
            .map(|f| ("visible column", f))
            .chain(self.fixed_filter_fields.iter().map(|f| ("fixed filter field", f)))
            .chain(self.group_by_fields.iter().map(|f| ("group-by field", f)));
        for (role, field) in referenced {
            if self.columns.get(field).is_none() {
                return Err(ReportError::InvalidDefinition(format!(
                    "{} '{}' is not in the column catalog",
                    role, field
                )));
            }
        }

        if self.default_page_size == 0 {
            return Err(ReportError::InvalidDefinition(
                "default page size must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
