//! # Indicator History Builder
//!
//! A library for turning sparse monthly indicator history (operations, cargo,
//! wildlife strikes, pavement condition, lighting reliability...) and scenario
//! targets into comparison rows, rollups and short-horizon forecasts ready for
//! a dashboard to render.
//!
//! ## Core Concepts
//!
//! - **History**: `{anio, mes, valor}` observations. Unparsable values are "no
//!   observation", never zero.
//! - **Targets**: `{anio, mes, escenario, valor}` scenario trajectories, filled
//!   forward within a year.
//! - **Comparisons**: monthly, quarterly and annual year-over-year rows, or
//!   month-by-month rows against a scenario.
//! - **Totals**: one summary line per result, summed or averaged.
//! - **Forecasts**: Holt-Winters (or Holt linear for short series) projections
//!   anchored to the last observed month.
//!
//! The engine is pure: the "current year" is always passed in, never read
//! from the clock.
//!
//! ## Example
//!
//! ```rust,ignore
//! use indicator_history_builder::*;
//!
//! let history = vec![
//!     HistoryRecord::observed(2023, 6, 100.0),
//!     HistoryRecord::observed(2024, 6, 120.0),
//! ];
//!
//! let result = aggregate(ComparisonType::Monthly, &history, &[], &AggregationOptions::default())?;
//! assert_eq!(result.rows[0].diff, Some(20.0));
//! ```

pub mod assembler;
pub mod cache;
pub mod engine;
pub mod error;
pub mod forecasting;
pub mod index;
pub mod ingestion;
pub mod overrides;
pub mod schema;
pub mod seasonality;
pub mod series;
pub mod targets;
pub mod totals;
pub mod utils;

pub use assembler::{ChartPoint, ComparisonTable, SeriesKind, SeriesMeta, TableRow, TableRowKind};
pub use cache::SeriesCache;
pub use engine::{aggregate, PeriodAggregator};
pub use error::{IndicatorError, Result};
pub use forecasting::{forecast, Forecast, ForecastMethod, HoltLinear, HoltWinters};
pub use index::{HistoryIndex, Timeline, TimelinePoint, YearMonthIndex};
pub use ingestion::{parse_history_json, parse_targets_json, split_target_rows};
pub use overrides::{IndicatorOverrides, IndicatorProfile};
pub use schema::*;
pub use series::IndicatorSeries;
pub use targets::{MonthlyTargets, ScenarioTargetIndex};
pub use totals::{compute_totals, TotalsAggregator};
pub use utils::{sort_chronological, to_number};

use log::info;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Period {
    Month { year: i32, month: u32 },
    Quarter { year: i32, quarter: u32 },
    Year { year: i32 },
}

impl Period {
    pub fn year(&self) -> i32 {
        match *self {
            Period::Month { year, .. } | Period::Quarter { year, .. } | Period::Year { year } => {
                year
            }
        }
    }

    /// "Jun 2024", "T2 2024" or "2024".
    pub fn label(&self) -> String {
        match *self {
            Period::Month { year, month } => format!("{} {}", utils::month_label(month), year),
            Period::Quarter { year, quarter } => format!("T{} {}", quarter, year),
            Period::Year { year } => year.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowOrigin {
    /// Built from observed values
    Observed,
    /// Produced by the forecasting engine; the renderer styles it apart
    Projected,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonRow {
    pub period: Period,
    pub label: String,
    pub current_value: Option<f64>,
    /// Prior-year value, or the scenario target in scenario comparisons
    pub comparison_value: Option<f64>,
    /// Scenario target drawn as a reference line
    pub reference_value: Option<f64>,
    pub diff: Option<f64>,
    pub pct: Option<f64>,
    pub origin: RowOrigin,
}

impl ComparisonRow {
    /// `diff` and `pct` are measured against the reference when there is one,
    /// otherwise against the comparison value.
    pub fn observed(
        period: Period,
        current_value: Option<f64>,
        comparison_value: Option<f64>,
        reference_value: Option<f64>,
    ) -> Self {
        let (diff, pct) = utils::diff_and_pct(current_value, reference_value.or(comparison_value));
        Self {
            label: period.label(),
            period,
            current_value,
            comparison_value,
            reference_value,
            diff,
            pct,
            origin: RowOrigin::Observed,
        }
    }

    pub fn projected(period: Period, value: f64, reference_value: Option<f64>) -> Self {
        let (diff, pct) = utils::diff_and_pct(Some(value), reference_value);
        Self {
            label: period.label(),
            period,
            current_value: Some(value),
            comparison_value: None,
            reference_value,
            diff,
            pct,
            origin: RowOrigin::Projected,
        }
    }

    pub fn is_forecast(&self) -> bool {
        self.origin == RowOrigin::Projected
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Totals {
    pub current_value: Option<f64>,
    pub comparison_value: Option<f64>,
    pub reference_value: Option<f64>,
    pub diff: Option<f64>,
    pub pct: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastBlock {
    pub method: ForecastMethod,
    pub rows: Vec<ComparisonRow>,
    pub totals: Option<Totals>,
    pub chart_points: Vec<ChartPoint>,
    pub series: Vec<SeriesMeta>,
}

/// One quarter of a plan-only indicator, with one column per scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioQuarterRow {
    pub period: Period,
    pub label: String,
    pub values: BTreeMap<String, Option<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonResult {
    #[serde(rename = "type")]
    pub comparison: ComparisonType,
    pub current_year: Option<i32>,
    pub previous_year: Option<i32>,
    pub latest_month: Option<u32>,
    pub rows: Vec<ComparisonRow>,
    pub totals: Option<Totals>,
    pub forecast: Option<ForecastBlock>,
    pub comparison_label: String,
    pub chart_data: Vec<ChartPoint>,
    pub chart_series: Vec<SeriesMeta>,
    /// Filled only for indicators whose history is entirely planned values
    pub scenario_rows: Vec<ScenarioQuarterRow>,
    pub scenario_columns: Vec<String>,
}

impl ComparisonResult {
    pub fn empty(comparison: ComparisonType, current_year: Option<i32>) -> Self {
        Self {
            comparison,
            current_year,
            previous_year: current_year.map(|y| y - 1),
            latest_month: None,
            rows: Vec::new(),
            totals: None,
            forecast: None,
            comparison_label: String::new(),
            chart_data: Vec::new(),
            chart_series: Vec::new(),
            scenario_rows: Vec::new(),
            scenario_columns: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty() && self.scenario_rows.is_empty()
    }

    pub fn table(&self) -> ComparisonTable {
        ComparisonTable::from_result(self)
    }
}

/// Rejects option values no data could make sense of. Data problems are never
/// errors; they surface as empty rows and `None` values instead.
pub fn validate_options(options: &AggregationOptions) -> Result<()> {
    if let Some(year) = options.current_year {
        if year <= 0 {
            return Err(IndicatorError::InvalidReferenceYear(year));
        }
    }

    let forecast = &options.forecast;
    for (name, value) in [
        ("alpha", forecast.alpha),
        ("beta", forecast.beta),
        ("gamma", forecast.gamma),
        ("linear_alpha", forecast.linear_alpha),
        ("linear_beta", forecast.linear_beta),
    ] {
        if !value.is_finite() || value <= 0.0 || value > 1.0 {
            return Err(IndicatorError::InvalidSmoothingParameter {
                name: name.to_string(),
                value,
            });
        }
    }

    if forecast.season_length < 2 {
        return Err(IndicatorError::InvalidSeasonLength(forecast.season_length));
    }

    Ok(())
}

/// Aggregates one indicator, applying its behavioral overrides (see
/// [`IndicatorOverrides::for_profile`]) on top of the caller's options.
pub fn process_indicator(
    profile: &IndicatorProfile,
    history: &[HistoryRecord],
    targets: &[TargetRecord],
    options: &AggregationOptions,
) -> Result<ComparisonResult> {
    let overrides = IndicatorOverrides::for_profile(profile);
    let options = overrides.apply(options);

    info!(
        "Processing indicator {} ({:?} comparison, {} history rows, {} targets)",
        profile.display_name(),
        options.comparison,
        history.len(),
        targets.len()
    );

    IndicatorSeries::new(history, targets).aggregate(&options)
}
