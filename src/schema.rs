use crate::error::IndicatorError;
use crate::ingestion::de;
use crate::utils::Chronological;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

pub const DEFAULT_FORECAST_PERIODS: usize = 6;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct HistoryRecord {
    #[serde(rename = "anio", default, deserialize_with = "de::lenient_year")]
    #[schemars(
        description = "Calendar year of the observation. Unparsable years exclude the record."
    )]
    pub year: Option<i32>,

    #[serde(rename = "mes", default, deserialize_with = "de::lenient_month")]
    #[schemars(description = "Month 1-12. Missing or 0 means an annual value with no month.")]
    pub month: Option<u32>,

    #[serde(rename = "valor", default, deserialize_with = "de::lenient_number")]
    #[schemars(
        description = "Observed value. Numbers and numeric strings are accepted; anything else means no observation, never zero."
    )]
    pub value: Option<f64>,

    #[serde(rename = "es_meta", default, deserialize_with = "de::lenient_bool")]
    #[schemars(
        description = "True when the row is a planned/target value rather than an observation."
    )]
    pub is_target: bool,

    #[serde(
        rename = "escenario",
        default,
        deserialize_with = "de::lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    #[schemars(description = "Scenario label for target rows (e.g. 'Meta Programada').")]
    pub scenario: Option<String>,
}

impl HistoryRecord {
    pub fn observed(year: i32, month: u32, value: f64) -> Self {
        Self {
            year: Some(year),
            month: Some(month),
            value: Some(value),
            is_target: false,
            scenario: None,
        }
    }

    pub fn planned(year: i32, month: u32, scenario: &str, value: f64) -> Self {
        Self {
            year: Some(year),
            month: Some(month),
            value: Some(value),
            is_target: true,
            scenario: Some(scenario.to_string()),
        }
    }

    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(Vec<HistoryRecord>)
    }

    pub fn schema_as_json() -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&Self::generate_json_schema())
    }
}

impl Chronological for HistoryRecord {
    fn year(&self) -> Option<i32> {
        self.year
    }

    fn month(&self) -> Option<u32> {
        self.month
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TargetRecord {
    #[serde(rename = "anio", default, deserialize_with = "de::lenient_year")]
    pub year: Option<i32>,

    #[serde(rename = "mes", default, deserialize_with = "de::lenient_month")]
    #[schemars(description = "Month 1-12. Missing means the value is an annual/fallback target.")]
    pub month: Option<u32>,

    #[serde(rename = "escenario", default, deserialize_with = "de::lenient_label")]
    #[schemars(
        description = "Free-text scenario label. Matched case and diacritic insensitively, ignoring META/OBJETIVO/ESCENARIO/ANUAL."
    )]
    pub scenario: String,

    #[serde(rename = "valor", default, deserialize_with = "de::lenient_number")]
    pub value: Option<f64>,
}

impl TargetRecord {
    pub fn monthly(year: i32, month: u32, scenario: &str, value: f64) -> Self {
        Self {
            year: Some(year),
            month: Some(month),
            scenario: scenario.to_string(),
            value: Some(value),
        }
    }

    pub fn annual(year: i32, scenario: &str, value: f64) -> Self {
        Self {
            year: Some(year),
            month: None,
            scenario: scenario.to_string(),
            value: Some(value),
        }
    }

    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(Vec<TargetRecord>)
    }
}

impl Chronological for TargetRecord {
    fn year(&self) -> Option<i32> {
        self.year
    }

    fn month(&self) -> Option<u32> {
        self.month
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonType {
    #[default]
    #[schemars(
        description = "Each month of the current year against the same month of the previous year"
    )]
    Monthly,

    #[schemars(
        description = "Complete quarters of the current year against the same quarters of the previous year"
    )]
    Quarterly,

    #[schemars(description = "Year-to-date sum against the same months of the previous year")]
    Annual,

    #[schemars(description = "Each month of the current year against a scenario target trajectory")]
    Scenario,
}

impl FromStr for ComparisonType {
    type Err = IndicatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "monthly" | "mensual" => Ok(Self::Monthly),
            "quarterly" | "trimestral" => Ok(Self::Quarterly),
            "annual" | "anual" => Ok(Self::Annual),
            "scenario" | "escenario" => Ok(Self::Scenario),
            _ => Err(IndicatorError::InvalidComparisonType(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum TotalsStrategy {
    #[default]
    Sum,
    Average,
}

impl FromStr for TotalsStrategy {
    type Err = IndicatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sum" | "suma" => Ok(Self::Sum),
            "average" | "avg" | "promedio" => Ok(Self::Average),
            _ => Err(IndicatorError::InvalidTotalsStrategy(s.to_string())),
        }
    }
}

/// Fixed smoothing constants. These are not fitted to the data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ForecastOptions {
    #[schemars(description = "Requested season length; capped to half the series length")]
    pub season_length: usize,
    pub alpha: f64,
    pub beta: f64,
    pub gamma: f64,
    #[schemars(description = "Level smoothing used by the Holt linear fallback")]
    pub linear_alpha: f64,
    #[schemars(description = "Trend smoothing used by the Holt linear fallback")]
    pub linear_beta: f64,
    #[schemars(description = "Fewer usable points than this produce no forecast")]
    pub min_points: usize,
}

impl Default for ForecastOptions {
    fn default() -> Self {
        Self {
            season_length: 12,
            alpha: 0.4,
            beta: 0.3,
            gamma: 0.3,
            linear_alpha: 0.5,
            linear_beta: 0.3,
            min_points: 3,
        }
    }
}

fn default_forecast_periods() -> usize {
    DEFAULT_FORECAST_PERIODS
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AggregationOptions {
    #[serde(rename = "type", default)]
    pub comparison: ComparisonType,

    #[serde(default)]
    #[schemars(
        description = "Year treated as current. Defaults to the latest observed year; the engine never reads the clock."
    )]
    pub current_year: Option<i32>,

    #[serde(default)]
    #[schemars(description = "Scenario compared against when type is 'scenario'")]
    pub scenario: Option<String>,

    #[serde(default)]
    pub totals_strategy: TotalsStrategy,

    #[serde(default)]
    #[schemars(
        description = "Scenario whose targets become the reference line of a year-over-year comparison"
    )]
    pub diff_scenario: Option<String>,

    #[serde(default = "default_forecast_periods")]
    #[schemars(description = "Forecast horizon in months; 0 disables forecasting")]
    pub periods: usize,

    #[serde(default)]
    pub forecast: ForecastOptions,
}

impl Default for AggregationOptions {
    fn default() -> Self {
        Self {
            comparison: ComparisonType::Monthly,
            current_year: None,
            scenario: None,
            totals_strategy: TotalsStrategy::Sum,
            diff_scenario: None,
            periods: DEFAULT_FORECAST_PERIODS,
            forecast: ForecastOptions::default(),
        }
    }
}

impl AggregationOptions {
    pub fn new(comparison: ComparisonType) -> Self {
        Self {
            comparison,
            ..Self::default()
        }
    }

    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(AggregationOptions)
    }

    pub fn schema_as_json() -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&Self::generate_json_schema())
    }
}
