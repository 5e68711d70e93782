//! FILENAME: tests/common/mod.rs
//! Fixtures shared by the report engine integration tests.

#![allow(dead_code)]

use report_engine::{
    calculate_report, CellValue, Column, DataType, ReportDefinition, ReportState, ReportView, Row,
};

// ============================================================================
// PROPERTY FIXTURE
// ============================================================================

/// A small property portfolio: one row per building.
pub struct PropertyFixture;

impl PropertyFixture {
    pub fn columns() -> Vec<Column> {
        vec![
            Column::new("id", "Record ID", DataType::String).in_category("General"),
            Column::new("manager", "Manager", DataType::String).in_category("General"),
            Column::new("propertyType", "Property Type", DataType::String).in_category("General"),
            Column::new("region", "Region", DataType::String).in_category("General"),
            Column::new("building", "Building Name", DataType::String).in_category("General"),
            Column::new("leaseStartDate", "Lease Start Date", DataType::Date).in_category("General"),
            Column::new("petFriendly", "Pet Friendly", DataType::Boolean).in_category("General"),
            Column::new("units", "Total Units", DataType::Number)
                .summable()
                .in_category("Occupancy"),
            Column::new("occupiedUnits", "Occupied Units", DataType::Number)
                .summable()
                .in_category("Occupancy"),
            Column::new("rentCollected", "Rent Collected ($)", DataType::Number)
                .summable()
                .in_category("Financials"),
            Column::new("capRate", "Cap Rate (%)", DataType::Number).in_category("Financials"),
        ]
    }

    /// (id, manager, type, region, building, lease start, pets, units, occupied, rent, cap rate)
    #[allow(clippy::type_complexity)]
    pub fn data() -> Vec<(
        &'static str,
        &'static str,
        &'static str,
        &'static str,
        &'static str,
        &'static str,
        bool,
        f64,
        f64,
        f64,
        f64,
    )> {
        vec![
            ("P-001", "Alice", "Residential", "North", "Alpha Tower", "2023-01-15", true, 120.0, 110.0, 240000.0, 5.1),
            ("P-002", "Bob", "Commercial", "South", "Beacon Plaza", "2022-06-01", false, 40.0, 35.0, 310000.0, 6.4),
            ("P-003", "Alice", "Residential", "North", "Cedar Court", "2024-03-10", true, 80.0, 72.0, 150000.0, 4.8),
            ("P-004", "Carol", "Industrial", "East", "Delta Works", "2021-11-20", false, 10.0, 10.0, 95000.0, 7.2),
            ("P-005", "Bob", "Residential", "South", "Elm Residences", "2023-09-05", true, 60.0, 51.0, 118000.0, 5.5),
            ("P-006", "Carol", "Commercial", "East", "Foundry Lofts", "2024-01-30", false, 25.0, 20.0, 205000.0, 6.0),
            ("P-007", "Alice", "Commercial", "North", "Granite Center", "2022-02-14", false, 30.0, 29.0, 275000.0, 6.8),
            ("P-008", "Dave", "Residential", "West", "Harbor View", "2023-07-22", true, 150.0, 141.0, 330000.0, 4.5),
            ("P-009", "Dave", "Industrial", "West", "Iron Yard", "2020-10-01", false, 12.0, 9.0, 88000.0, 7.9),
            ("P-010", "Bob", "Residential", "South", "Juniper Gardens", "2024-05-18", true, 90.0, 84.0, 171000.0, 5.0),
            ("P-011", "Carol", "Residential", "East", "Kestrel House", "2021-04-09", true, 45.0, 40.0, 86000.0, 5.7),
            ("P-012", "Dave", "Commercial", "West", "Lumen Exchange", "2022-12-01", false, 35.0, 33.0, 295000.0, 6.1),
        ]
    }

    pub fn rows() -> Vec<Row> {
        Self::data()
            .into_iter()
            .map(|(id, manager, kind, region, building, lease, pets, units, occupied, rent, cap)| {
                Row::new()
                    .with("id", id)
                    .with("manager", manager)
                    .with("propertyType", kind)
                    .with("region", region)
                    .with("building", building)
                    .with("leaseStartDate", lease)
                    .with("petFriendly", pets)
                    .with("units", units)
                    .with("occupiedUnits", occupied)
                    .with("rentCollected", rent)
                    .with("capRate", cap)
            })
            .collect()
    }

    pub fn definition() -> ReportDefinition {
        let mut definition = ReportDefinition::new(Self::columns());
        definition.name = Some("Portfolio Overview".to_string());
        definition.default_visible_columns = [
            "building",
            "manager",
            "region",
            "propertyType",
            "units",
            "occupiedUnits",
            "rentCollected",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        definition.fixed_filter_fields = ["manager", "propertyType", "region", "building"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        definition.group_by_fields = ["manager", "propertyType", "region", "building"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        definition
    }
}

// ============================================================================
// HARNESS
// ============================================================================

/// Rows, definition and a session state, recomputed on demand.
pub struct ReportHarness {
    pub rows: Vec<Row>,
    pub definition: ReportDefinition,
    pub state: ReportState,
}

impl ReportHarness {
    pub fn new() -> Self {
        let definition = PropertyFixture::definition();
        let state = ReportState::new(&definition);
        ReportHarness {
            rows: PropertyFixture::rows(),
            definition,
            state,
        }
    }

    pub fn view(&self) -> ReportView {
        calculate_report(&self.rows, &self.definition, &self.state)
    }
}

// ============================================================================
// ASSERTION HELPERS
// ============================================================================

/// Text of `field` for every data row on the page.
pub fn column_text(view: &ReportView, field: &str) -> Vec<String> {
    view.data_rows()
        .map(|row| row.get(field).map(|v| v.as_text().into_owned()).unwrap_or_default())
        .collect()
}

/// Ids of every group header on the page.
pub fn header_ids(view: &ReportView) -> Vec<String> {
    view.group_headers().map(|h| h.id.clone()).collect()
}

pub fn text(value: &str) -> CellValue {
    CellValue::text(value)
}
