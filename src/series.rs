use crate::assembler::{
    chart_points, chart_series, forecast_series, plan_chart_points, plan_series,
};
use crate::engine::{forecast_rows, scenario_plan_rows, PeriodAggregator};
use crate::error::Result;
use crate::forecasting::project_timeline;
use crate::index::HistoryIndex;
use crate::ingestion::split_target_rows;
use crate::schema::{AggregationOptions, ComparisonType, HistoryRecord, TargetRecord};
use crate::targets::ScenarioTargetIndex;
use crate::totals::compute_totals;
use crate::{validate_options, ComparisonResult, ForecastBlock};
use log::{debug, info};

/// One indicator's history and targets, indexed once and aggregated any
/// number of times.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorSeries {
    history: HistoryIndex,
    targets: ScenarioTargetIndex,
    /// Present when every history row is a planned value
    plan: Option<ScenarioTargetIndex>,
}

impl IndicatorSeries {
    /// Planned (`es_meta`) history rows become targets. When every row is
    /// planned the series is aggregated as a scenario plan instead.
    pub fn new(history: &[HistoryRecord], targets: &[TargetRecord]) -> Self {
        let (observed, planned) = split_target_rows(history);

        if !history.is_empty() && observed.is_empty() {
            debug!(
                "History holds only planned values ({} rows), aggregating as scenario plan",
                planned.len()
            );
            return Self {
                history: HistoryIndex::default(),
                targets: ScenarioTargetIndex::build(targets),
                plan: Some(ScenarioTargetIndex::build(&planned)),
            };
        }

        let targets = if planned.is_empty() {
            ScenarioTargetIndex::build(targets)
        } else {
            debug!(
                "Merging {} planned history rows into {} targets",
                planned.len(),
                targets.len()
            );
            let merged: Vec<TargetRecord> = targets.iter().cloned().chain(planned).collect();
            ScenarioTargetIndex::build(&merged)
        };

        Self {
            history: HistoryIndex::build(&observed),
            targets,
            plan: None,
        }
    }

    pub fn is_scenario_only(&self) -> bool {
        self.plan.is_some()
    }

    pub fn history(&self) -> &HistoryIndex {
        &self.history
    }

    pub fn targets(&self) -> &ScenarioTargetIndex {
        &self.targets
    }

    pub fn aggregate(&self, options: &AggregationOptions) -> Result<ComparisonResult> {
        validate_options(options)?;

        if let Some(plan) = &self.plan {
            return Ok(self.aggregate_plan(plan, options));
        }

        let comparison = options.comparison;
        let Some(current_year) = options
            .current_year
            .or_else(|| self.history.by_year.latest_year())
        else {
            debug!("No observed history, nothing to aggregate");
            return Ok(ComparisonResult::empty(comparison, None));
        };

        let Some(aggregator) = PeriodAggregator::new(&self.history, &self.targets, current_year)
        else {
            debug!("No observations in {}, nothing to aggregate", current_year);
            return Ok(ComparisonResult::empty(comparison, Some(current_year)));
        };

        let scenario = match comparison {
            ComparisonType::Scenario => options
                .scenario
                .clone()
                .or_else(|| {
                    options
                        .diff_scenario
                        .clone()
                        .filter(|s| self.targets.contains(s))
                })
                .or_else(|| self.targets.scenario_keys().next().map(str::to_string)),
            _ => None,
        };
        let diff_scenario = options.diff_scenario.as_deref();

        let rows = aggregator.rows(comparison, scenario.as_deref(), diff_scenario);
        let totals = compute_totals(&rows, comparison, options.totals_strategy);

        let previous_year = aggregator.previous_year();
        let reference_label = diff_scenario
            .filter(|s| comparison != ComparisonType::Scenario && self.targets.contains(s))
            .map(|s| self.scenario_label(s));

        let (comparison_label, chart) = match comparison {
            ComparisonType::Scenario => {
                let label = scenario
                    .as_deref()
                    .map(|s| self.scenario_label(s))
                    .unwrap_or_default();
                let text = if label.is_empty() {
                    current_year.to_string()
                } else {
                    format!("{} vs {}", current_year, label)
                };
                (text, chart_series(comparison, current_year, &label, None))
            }
            _ => {
                let mut text = format!("{} vs {}", current_year, previous_year);
                if let Some(label) = &reference_label {
                    text.push_str(&format!(" (referencia: {})", label));
                }
                (
                    text,
                    chart_series(
                        comparison,
                        current_year,
                        &previous_year.to_string(),
                        reference_label.as_deref(),
                    ),
                )
            }
        };

        let forecast_reference = match comparison {
            ComparisonType::Scenario => scenario.as_deref(),
            _ => diff_scenario,
        };
        let forecast = self.forecast_block(options, forecast_reference);

        info!(
            "Aggregated {:?} comparison for {}: {} rows, forecast {}",
            comparison,
            current_year,
            rows.len(),
            if forecast.is_some() { "available" } else { "skipped" }
        );

        Ok(ComparisonResult {
            comparison,
            current_year: Some(current_year),
            previous_year: Some(previous_year),
            latest_month: Some(aggregator.latest_month()),
            chart_data: chart_points(&rows),
            chart_series: chart,
            rows,
            totals,
            forecast,
            comparison_label,
            scenario_rows: Vec::new(),
            scenario_columns: Vec::new(),
        })
    }

    /// Monthly projections, only for comparison types that are themselves
    /// monthly.
    fn forecast_block(
        &self,
        options: &AggregationOptions,
        reference: Option<&str>,
    ) -> Option<ForecastBlock> {
        if !matches!(
            options.comparison,
            ComparisonType::Monthly | ComparisonType::Scenario
        ) || options.periods == 0
        {
            return None;
        }

        let projection =
            project_timeline(&self.history.timeline, options.periods, &options.forecast)?;
        let rows = forecast_rows(&projection, &self.targets, reference);
        let totals = compute_totals(&rows, options.comparison, options.totals_strategy);

        let reference_label = reference
            .filter(|s| self.targets.contains(s))
            .map(|s| self.scenario_label(s));

        Some(ForecastBlock {
            method: projection.method,
            chart_points: chart_points(&rows),
            series: forecast_series(reference_label.as_deref()),
            rows,
            totals,
        })
    }

    fn aggregate_plan(
        &self,
        plan: &ScenarioTargetIndex,
        options: &AggregationOptions,
    ) -> ComparisonResult {
        let Some(year) = options.current_year.or_else(|| plan.latest_year()) else {
            debug!("Planned history has no usable year");
            return ComparisonResult::empty(options.comparison, None);
        };

        let (columns, rows) = scenario_plan_rows(plan, year);
        info!(
            "Aggregated scenario plan for {}: {} quarters across {} scenarios",
            year,
            rows.len(),
            columns.len()
        );

        ComparisonResult {
            comparison_label: format!("Escenarios {}", year),
            chart_data: plan_chart_points(&rows),
            chart_series: plan_series(&columns),
            scenario_rows: rows,
            scenario_columns: columns,
            ..ComparisonResult::empty(options.comparison, Some(year))
        }
    }

    fn scenario_label(&self, scenario: &str) -> String {
        self.targets
            .label_for(scenario)
            .unwrap_or(scenario)
            .to_string()
    }
}
