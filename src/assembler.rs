//! Pure mappings from computed rows to what a dashboard draws: chart points,
//! series metadata and a flat table with totals.
//!
//! None of these functions sort; output order is input order.

use crate::schema::ComparisonType;
use crate::{ComparisonResult, ComparisonRow, ForecastBlock, ScenarioQuarterRow, Totals};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const SERIES_CURRENT: &str = "current";
pub const SERIES_COMPARISON: &str = "comparison";
pub const SERIES_REFERENCE: &str = "reference";
pub const SERIES_FORECAST: &str = "forecast";

pub const FORECAST_LABEL: &str = "Tendencia";
pub const TOTAL_LABEL: &str = "Total";
pub const PROJECTED_TOTAL_LABEL: &str = "Total proyectado";

const TABLE_COLUMNS: [&str; 5] = [
    "Actual",
    "Comparación",
    "Referencia",
    "Diferencia",
    "Variación",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ChartPoint {
    pub label: String,
    /// Series key → y value; `None` leaves a gap in the line
    pub values: BTreeMap<String, Option<f64>>,
    pub projected: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum SeriesKind {
    Observed,
    Comparison,
    Reference,
    Projected,
    Scenario,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SeriesMeta {
    pub key: String,
    pub label: String,
    pub kind: SeriesKind,
}

impl SeriesMeta {
    fn new(key: &str, label: impl Into<String>, kind: SeriesKind) -> Self {
        Self {
            key: key.to_string(),
            label: label.into(),
            kind,
        }
    }
}

/// One point per row. Observed rows plot under `current`, projected rows
/// under `forecast`.
pub fn chart_points(rows: &[ComparisonRow]) -> Vec<ChartPoint> {
    rows.iter()
        .map(|row| {
            let mut values = BTreeMap::new();
            if row.is_forecast() {
                values.insert(SERIES_FORECAST.to_string(), row.current_value);
            } else {
                values.insert(SERIES_CURRENT.to_string(), row.current_value);
                values.insert(SERIES_COMPARISON.to_string(), row.comparison_value);
            }
            values.insert(SERIES_REFERENCE.to_string(), row.reference_value);

            ChartPoint {
                label: row.label.clone(),
                values,
                projected: row.is_forecast(),
            }
        })
        .collect()
}

/// Series drawn for an observed comparison. `comparison_label` names the
/// prior year, or the scenario in scenario comparisons.
pub fn chart_series(
    comparison: ComparisonType,
    current_year: i32,
    comparison_label: &str,
    reference_label: Option<&str>,
) -> Vec<SeriesMeta> {
    let comparison_kind = match comparison {
        ComparisonType::Scenario => SeriesKind::Scenario,
        _ => SeriesKind::Comparison,
    };

    let mut series = vec![
        SeriesMeta::new(SERIES_CURRENT, current_year.to_string(), SeriesKind::Observed),
        SeriesMeta::new(SERIES_COMPARISON, comparison_label, comparison_kind),
    ];
    if let Some(label) = reference_label {
        series.push(SeriesMeta::new(SERIES_REFERENCE, label, SeriesKind::Reference));
    }
    series
}

pub fn forecast_series(reference_label: Option<&str>) -> Vec<SeriesMeta> {
    let mut series = vec![SeriesMeta::new(
        SERIES_FORECAST,
        FORECAST_LABEL,
        SeriesKind::Projected,
    )];
    if let Some(label) = reference_label {
        series.push(SeriesMeta::new(SERIES_REFERENCE, label, SeriesKind::Reference));
    }
    series
}

/// Plan-only indicators: one point per quarter, one value per scenario.
pub fn plan_chart_points(rows: &[ScenarioQuarterRow]) -> Vec<ChartPoint> {
    rows.iter()
        .map(|row| ChartPoint {
            label: row.label.clone(),
            values: row.values.clone(),
            projected: false,
        })
        .collect()
}

pub fn plan_series(columns: &[String]) -> Vec<SeriesMeta> {
    columns
        .iter()
        .map(|column| SeriesMeta::new(column, column.as_str(), SeriesKind::Scenario))
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum TableRowKind {
    Period,
    Total,
    Projected,
    ProjectedTotal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TableRow {
    pub label: String,
    pub kind: TableRowKind,
    /// One cell per table column
    pub values: Vec<Option<f64>>,
}

impl TableRow {
    fn from_row(row: &ComparisonRow, kind: TableRowKind) -> Self {
        Self {
            label: row.label.clone(),
            kind,
            values: vec![
                row.current_value,
                row.comparison_value,
                row.reference_value,
                row.diff,
                row.pct,
            ],
        }
    }

    fn from_totals(label: &str, totals: &Totals, kind: TableRowKind) -> Self {
        Self {
            label: label.to_string(),
            kind,
            values: vec![
                totals.current_value,
                totals.comparison_value,
                totals.reference_value,
                totals.diff,
                totals.pct,
            ],
        }
    }

    pub fn is_total(&self) -> bool {
        matches!(self.kind, TableRowKind::Total | TableRowKind::ProjectedTotal)
    }
}

/// Period rows, then the "Total" line, then forecast rows and their own
/// total. Absent totals produce no line.
pub fn table_rows(
    rows: &[ComparisonRow],
    totals: Option<&Totals>,
    forecast: Option<&ForecastBlock>,
) -> Vec<TableRow> {
    let mut table: Vec<TableRow> = rows
        .iter()
        .map(|row| TableRow::from_row(row, TableRowKind::Period))
        .collect();

    if let Some(totals) = totals {
        table.push(TableRow::from_totals(TOTAL_LABEL, totals, TableRowKind::Total));
    }

    if let Some(forecast) = forecast {
        table.extend(
            forecast
                .rows
                .iter()
                .map(|row| TableRow::from_row(row, TableRowKind::Projected)),
        );
        if let Some(totals) = &forecast.totals {
            table.push(TableRow::from_totals(
                PROJECTED_TOTAL_LABEL,
                totals,
                TableRowKind::ProjectedTotal,
            ));
        }
    }

    table
}

/// A rendered comparison as a flat table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ComparisonTable {
    pub title: String,
    pub columns: Vec<String>,
    pub rows: Vec<TableRow>,
    /// Columns holding ratios rather than amounts
    pub ratio_columns: Vec<usize>,
}

impl ComparisonTable {
    pub fn from_result(result: &ComparisonResult) -> Self {
        if !result.scenario_rows.is_empty() {
            return Self::from_plan(result);
        }

        Self {
            title: result.comparison_label.clone(),
            columns: TABLE_COLUMNS.iter().map(|c| c.to_string()).collect(),
            rows: table_rows(&result.rows, result.totals.as_ref(), result.forecast.as_ref()),
            ratio_columns: vec![TABLE_COLUMNS.len() - 1],
        }
    }

    fn from_plan(result: &ComparisonResult) -> Self {
        let rows = result
            .scenario_rows
            .iter()
            .map(|row| TableRow {
                label: row.label.clone(),
                kind: TableRowKind::Period,
                values: result
                    .scenario_columns
                    .iter()
                    .map(|column| row.values.get(column).copied().flatten())
                    .collect(),
            })
            .collect();

        Self {
            title: result.comparison_label.clone(),
            columns: result.scenario_columns.clone(),
            rows,
            ratio_columns: Vec::new(),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Raw values, empty cells for missing ones.
    pub fn to_csv(&self) -> String {
        let mut output = String::new();

        let header: Vec<String> = std::iter::once("Periodo")
            .chain(self.columns.iter().map(String::as_str))
            .map(csv_field)
            .collect();
        output.push_str(&header.join(","));
        output.push('\n');

        for row in &self.rows {
            let cells: Vec<String> = std::iter::once(csv_field(&row.label))
                .chain(
                    row.values
                        .iter()
                        .map(|v| v.map(|v| v.to_string()).unwrap_or_default()),
                )
                .collect();
            output.push_str(&cells.join(","));
            output.push('\n');
        }

        output
    }

    /// Amounts with two decimals, ratios as percentages, `-` for missing
    /// cells. Total lines are bold.
    pub fn to_markdown(&self) -> String {
        let mut output = String::new();

        if !self.title.is_empty() {
            output.push_str(&format!("## {}\n\n", self.title));
        }

        output.push_str(&format!("| Periodo | {} |\n", self.columns.join(" | ")));
        output.push_str(&format!("|---|{}\n", "---:|".repeat(self.columns.len())));

        for row in &self.rows {
            let cells: Vec<String> = row
                .values
                .iter()
                .enumerate()
                .map(|(i, value)| match value {
                    None => "-".to_string(),
                    Some(v) if self.ratio_columns.contains(&i) => format!("{:.1}%", v * 100.0),
                    Some(v) => format!("{:.2}", v),
                })
                .collect();

            let label = if row.is_total() {
                format!("**{}**", row.label)
            } else {
                row.label.clone()
            };
            output.push_str(&format!("| {} | {} |\n", label, cells.join(" | ")));
        }

        output
    }
}

fn csv_field(text: &str) -> String {
    if text.contains(',') || text.contains('"') || text.contains('\n') {
        format!("\"{}\"", text.replace('"', "\"\""))
    } else {
        text.to_string()
    }
}
