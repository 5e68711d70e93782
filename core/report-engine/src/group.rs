//! FILENAME: core/report-engine/src/group.rs
//! Group Engine - partitions filtered rows into a two-level hierarchy.
//!
//! Rows are partitioned by the primary field, and each partition optionally
//! by the sub field. Every group carries one aggregate per visible column:
//! the group value for its own field, a sum for summable columns and an
//! empty placeholder otherwise. Groups at each level and the rows under each
//! leaf group are ordered with the same sort spec.
//!
//! Group ids are hierarchical paths: `level<N>_<field>_<sanitizedValue>`
//! segments joined with `||`, so a level-1 id always starts with its
//! parent's id.

use std::borrow::Cow;
use std::cmp::Ordering;

use once_cell::sync::Lazy;
use regex::Regex;
use rustc_hash::FxHashMap;

use crate::definition::{Column, ColumnCatalog, FieldId, Grouping, SortSpec};
use crate::log_warn;
use crate::sort::{sort_in_place, Sortable};
use crate::value::{CellValue, Row};

/// Joins the per-level segments of a group id.
pub const ID_SEPARATOR: &str = "||";

static WHITESPACE_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("whitespace pattern compiles"));
static UNSAFE_ID_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Za-z0-9_]").expect("id character pattern compiles"));

// ============================================================================
// GROUP TREE
// ============================================================================

/// A synthetic header aggregating the rows that share one field value.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupNode<'a> {
    /// Hierarchical id, stable for a given field, value and parent.
    pub id: String,

    /// The field this level groups by.
    pub group_key_field: FieldId,

    /// The shared value. Null when the rows lack the field.
    pub group_value: CellValue,

    /// One entry per visible column.
    pub aggregates: FxHashMap<FieldId, CellValue>,

    /// Sub-groups (level 0 with a sub field) or rows.
    pub children: Vec<GroupChild<'a>>,

    /// Leaf rows under this group, never the number of sub-groups.
    pub child_row_count: usize,

    /// 0 for the primary field, 1 for the sub field.
    pub level: u8,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GroupChild<'a> {
    Group(GroupNode<'a>),
    Row(&'a Row),
}

impl<'a> GroupNode<'a> {
    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    /// Sub-groups directly under this node.
    pub fn subgroups(&self) -> impl Iterator<Item = &GroupNode<'a>> {
        self.children.iter().filter_map(|child| match child {
            GroupChild::Group(group) => Some(group),
            GroupChild::Row(_) => None,
        })
    }

    /// Every leaf row under this node, in display order.
    pub fn leaf_rows(&self) -> Vec<&'a Row> {
        let mut rows = Vec::with_capacity(self.child_row_count);
        self.collect_rows(&mut rows);
        rows
    }

    fn collect_rows(&self, rows: &mut Vec<&'a Row>) {
        for child in &self.children {
            match child {
                GroupChild::Group(group) => group.collect_rows(rows),
                GroupChild::Row(row) => rows.push(*row),
            }
        }
    }
}

impl Sortable for GroupNode<'_> {
    fn sort_value(&self, key: &str) -> Option<&CellValue> {
        if key == self.group_key_field {
            Some(&self.group_value)
        } else {
            self.aggregates.get(key)
        }
    }

    fn is_group_header(&self) -> bool {
        true
    }
}

// ============================================================================
// GROUP IDS
// ============================================================================

/// Collapses whitespace runs to `_`, then drops anything outside `[A-Za-z0-9_]`.
pub fn sanitize_id_value(raw: &str) -> String {
    let collapsed = WHITESPACE_RUN.replace_all(raw, "_");
    UNSAFE_ID_CHARS.replace_all(&collapsed, "").into_owned()
}

fn id_value_text(value: Option<&CellValue>) -> Cow<'_, str> {
    match value {
        None => Cow::Borrowed("undefined"),
        Some(CellValue::Empty) => Cow::Borrowed("null"),
        Some(value) => value.as_text(),
    }
}

/// Builds the id of a group at `level` under `parent_id`.
pub fn group_id(parent_id: Option<&str>, level: u8, field: &str, value: Option<&CellValue>) -> String {
    let segment = format!(
        "level{}_{}_{}",
        level,
        field,
        sanitize_id_value(&id_value_text(value))
    );
    match parent_id {
        Some(parent) => format!("{}{}{}", parent, ID_SEPARATOR, segment),
        None => segment,
    }
}

/// Ids for one level of siblings. Values can sanitize to the same id
/// ("N/A" and "NA"); colliding siblings are ordered by their raw value and
/// all but the first get a `~N` suffix, which no sanitized value contains.
/// The result does not depend on row order.
fn sibling_ids(parts: &[Partition<'_>], parent_id: Option<&str>, level: u8, field: &str) -> Vec<String> {
    let mut ids: Vec<String> = parts
        .iter()
        .map(|part| group_id(parent_id, level, field, part.value))
        .collect();

    let mut slots: FxHashMap<String, Vec<usize>> = FxHashMap::default();
    for (idx, id) in ids.iter().enumerate() {
        slots.entry(id.clone()).or_default().push(idx);
    }

    for (id, mut members) in slots {
        if members.len() < 2 {
            continue;
        }
        members.sort_by(|&a, &b| collision_order(parts[a].value, parts[b].value));
        for (n, &idx) in members.iter().enumerate().skip(1) {
            ids[idx] = format!("{}~{}", id, n + 1);
        }
    }
    ids
}

fn collision_order(a: Option<&CellValue>, b: Option<&CellValue>) -> Ordering {
    fn rank(value: Option<&CellValue>) -> u8 {
        match value {
            None => 0,
            Some(CellValue::Empty) => 1,
            Some(CellValue::Boolean(_)) => 2,
            Some(CellValue::Number(_)) => 3,
            Some(CellValue::Text(_)) => 4,
        }
    }
    rank(a)
        .cmp(&rank(b))
        .then_with(|| id_value_text(a).cmp(&id_value_text(b)))
}

// ============================================================================
// PARTITIONING
// ============================================================================

/// Partition key. Numbers compare with `-0 == 0` and `NaN == NaN`; a missing
/// field is its own partition, apart from an explicit null.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum GroupKey<'a> {
    Missing,
    Null,
    Boolean(bool),
    Number(u64),
    Text(&'a str),
}

impl<'a> GroupKey<'a> {
    fn of(value: Option<&'a CellValue>) -> Self {
        match value {
            None => GroupKey::Missing,
            Some(CellValue::Empty) => GroupKey::Null,
            Some(CellValue::Boolean(b)) => GroupKey::Boolean(*b),
            Some(CellValue::Number(n)) => GroupKey::Number(normalized_bits(*n)),
            Some(CellValue::Text(s)) => GroupKey::Text(s.as_str()),
        }
    }
}

fn normalized_bits(n: f64) -> u64 {
    if n.is_nan() {
        f64::NAN.to_bits()
    } else if n == 0.0 {
        0
    } else {
        n.to_bits()
    }
}

struct Partition<'a> {
    value: Option<&'a CellValue>,
    rows: Vec<&'a Row>,
}

/// Splits rows by `field`, partitions in first-occurrence order.
fn partition<'a>(rows: &[&'a Row], field: &str) -> Vec<Partition<'a>> {
    let mut index: FxHashMap<GroupKey<'a>, usize> = FxHashMap::default();
    let mut partitions: Vec<Partition<'a>> = Vec::new();

    for &row in rows {
        let value = row.get(field);
        let slot = *index.entry(GroupKey::of(value)).or_insert_with(|| {
            partitions.push(Partition {
                value,
                rows: Vec::new(),
            });
            partitions.len() - 1
        });
        partitions[slot].rows.push(row);
    }
    partitions
}

// ============================================================================
// GROUP ENGINE
// ============================================================================

/// Builds group trees for one sort spec and one set of visible columns.
pub struct GroupEngine<'d> {
    sort: &'d SortSpec,
    catalog: &'d ColumnCatalog,
    visible: &'d [&'d Column],
    /// Present, non-null cells that were not numbers and summed as 0.
    coerced_cells: usize,
}

impl<'d> GroupEngine<'d> {
    pub fn new(sort: &'d SortSpec, catalog: &'d ColumnCatalog, visible: &'d [&'d Column]) -> Self {
        GroupEngine {
            sort,
            catalog,
            visible,
            coerced_cells: 0,
        }
    }

    /// Cells coerced to 0 during summation so far.
    pub fn coerced_cells(&self) -> usize {
        self.coerced_cells
    }

    /// Groups `rows` by the primary field, and by the sub field when one is
    /// set and differs from the primary. No primary field yields no groups.
    pub fn build<'a>(&mut self, rows: &[&'a Row], grouping: &Grouping) -> Vec<GroupNode<'a>> {
        match grouping.primary() {
            Some(primary) => self.build_level(rows, primary, grouping.secondary(), None, 0),
            None => Vec::new(),
        }
    }

    fn build_level<'a>(
        &mut self,
        rows: &[&'a Row],
        field: &str,
        sub_field: Option<&str>,
        parent_id: Option<&str>,
        level: u8,
    ) -> Vec<GroupNode<'a>> {
        let parts = partition(rows, field);
        let ids = sibling_ids(&parts, parent_id, level, field);
        let mut nodes = Vec::with_capacity(parts.len());

        for (part, id) in parts.into_iter().zip(ids) {
            let aggregates = self.aggregate(&part.rows, field, part.value);

            let children = match sub_field {
                Some(sub) => self
                    .build_level(&part.rows, sub, None, Some(id.as_str()), level + 1)
                    .into_iter()
                    .map(GroupChild::Group)
                    .collect(),
                None => {
                    let mut leaf_rows = part.rows.clone();
                    sort_in_place(&mut leaf_rows, self.sort, self.catalog);
                    leaf_rows.into_iter().map(GroupChild::Row).collect()
                }
            };

            nodes.push(GroupNode {
                id,
                group_key_field: field.to_string(),
                group_value: part.value.cloned().unwrap_or_default(),
                aggregates,
                children,
                child_row_count: part.rows.len(),
                level,
            });
        }

        sort_in_place(&mut nodes, self.sort, self.catalog);
        nodes
    }

    fn aggregate(
        &mut self,
        rows: &[&Row],
        field: &str,
        value: Option<&CellValue>,
    ) -> FxHashMap<FieldId, CellValue> {
        let mut aggregates = FxHashMap::default();
        for column in self.visible {
            let aggregate = if column.id == field {
                value.cloned().unwrap_or_default()
            } else if column.summable {
                CellValue::Number(self.sum_field(rows, &column.id))
            } else {
                CellValue::text("")
            };
            aggregates.insert(column.id.clone(), aggregate);
        }
        aggregates
    }

    fn sum_field(&mut self, rows: &[&Row], field: &str) -> f64 {
        let mut sum = 0.0;
        for row in rows {
            if let Some(value) = row.value(field) {
                let n = value.to_number();
                if n.is_nan() {
                    self.coerced_cells += 1;
                } else {
                    sum += n;
                }
            }
        }
        sum
    }
}

/// Groups `rows` and reports any cells that summed as 0.
pub fn group_rows<'a>(
    rows: &[&'a Row],
    grouping: &Grouping,
    sort: &SortSpec,
    catalog: &ColumnCatalog,
    visible: &[&Column],
) -> Vec<GroupNode<'a>> {
    let mut engine = GroupEngine::new(sort, catalog, visible);
    let groups = engine.build(rows, grouping);
    if engine.coerced_cells() > 0 {
        log_warn!(
            "GROUP",
            "{} non-numeric cells counted as 0 in group sums",
            engine.coerced_cells()
        );
    }
    groups
}
