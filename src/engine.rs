use crate::error::Result;
use crate::forecasting::Projection;
use crate::index::HistoryIndex;
use crate::schema::{AggregationOptions, ComparisonType, HistoryRecord, TargetRecord};
use crate::series::IndicatorSeries;
use crate::targets::{MonthlyTargets, ScenarioTargetIndex};
use crate::utils::{quarter_months, sum_present};
use crate::{ComparisonResult, ComparisonRow, Period, ScenarioQuarterRow};
use std::collections::BTreeMap;

/// Builds per-period comparison rows for one current year.
///
/// Rows exist only for periods with a current value: an unobserved month is
/// absent, never a zero row.
pub struct PeriodAggregator<'a> {
    history: &'a HistoryIndex,
    targets: &'a ScenarioTargetIndex,
    current_year: i32,
    latest_month: u32,
}

impl<'a> PeriodAggregator<'a> {
    /// `None` when nothing was observed in `current_year`.
    pub fn new(
        history: &'a HistoryIndex,
        targets: &'a ScenarioTargetIndex,
        current_year: i32,
    ) -> Option<Self> {
        let latest_month = history.by_year.latest_month(current_year)?;
        Some(Self {
            history,
            targets,
            current_year,
            latest_month,
        })
    }

    pub fn current_year(&self) -> i32 {
        self.current_year
    }

    pub fn previous_year(&self) -> i32 {
        self.current_year - 1
    }

    pub fn latest_month(&self) -> u32 {
        self.latest_month
    }

    /// Quarters whose last month is already behind the latest observation.
    pub fn complete_quarters(&self) -> u32 {
        self.latest_month / 3
    }

    fn current(&self, month: u32) -> Option<f64> {
        self.history.by_year.value(self.current_year, month)
    }

    fn prior(&self, month: u32) -> Option<f64> {
        self.history
            .timeline
            .same_month_previous_year(self.current_year, month)
    }

    fn trajectory(&self, scenario: Option<&str>) -> Option<MonthlyTargets> {
        scenario.and_then(|s| self.targets.resolve(s, self.current_year))
    }

    /// Month-by-month against the same month of the previous year, with the
    /// optional `diff_scenario` target as reference.
    pub fn monthly_rows(&self, diff_scenario: Option<&str>) -> Vec<ComparisonRow> {
        let reference = self.trajectory(diff_scenario);

        (1..=self.latest_month)
            .filter_map(|month| {
                let current = self.current(month)?;
                Some(ComparisonRow::observed(
                    Period::Month {
                        year: self.current_year,
                        month,
                    },
                    Some(current),
                    self.prior(month),
                    reference.and_then(|r| r.get(month)),
                ))
            })
            .collect()
    }

    /// Sums per quarter. A quarter is emitted only inside the
    /// `floor(latest_month / 3)` window and only when all three of its
    /// current-year months hold a value (zero counts). Prior-year and
    /// reference sums add whichever months are present.
    pub fn quarter_rows(&self, diff_scenario: Option<&str>) -> Vec<ComparisonRow> {
        let reference = self.trajectory(diff_scenario);

        (1..=self.complete_quarters())
            .filter_map(|quarter| {
                let months: Vec<u32> = quarter_months(quarter).collect();
                let current: Vec<f64> = months.iter().filter_map(|&m| self.current(m)).collect();
                if current.len() < months.len() {
                    return None;
                }

                Some(ComparisonRow::observed(
                    Period::Quarter {
                        year: self.current_year,
                        quarter,
                    },
                    Some(current.iter().sum()),
                    sum_present(months.iter().map(|&m| self.prior(m))),
                    reference.and_then(|r| r.sum_months(months.iter().copied())),
                ))
            })
            .collect()
    }

    /// Year-to-date sum through the latest observed month, against the same
    /// months of the previous year.
    pub fn annual_rows(&self, diff_scenario: Option<&str>) -> Vec<ComparisonRow> {
        let reference = self.trajectory(diff_scenario);
        let months = 1..=self.latest_month;

        let Some(current) = sum_present(months.clone().map(|m| self.current(m))) else {
            return Vec::new();
        };

        vec![ComparisonRow::observed(
            Period::Year {
                year: self.current_year,
            },
            Some(current),
            sum_present(months.clone().map(|m| self.prior(m))),
            reference.and_then(|r| r.sum_months(months)),
        )]
    }

    /// Month-by-month against a scenario trajectory. The scenario value is
    /// the comparison basis (100%), there is no separate reference.
    pub fn scenario_rows(&self, scenario: Option<&str>) -> Vec<ComparisonRow> {
        let trajectory = self.trajectory(scenario);

        (1..=self.latest_month)
            .filter_map(|month| {
                let current = self.current(month)?;
                Some(ComparisonRow::observed(
                    Period::Month {
                        year: self.current_year,
                        month,
                    },
                    Some(current),
                    trajectory.and_then(|t| t.get(month)),
                    None,
                ))
            })
            .collect()
    }

    pub fn rows(
        &self,
        comparison: ComparisonType,
        scenario: Option<&str>,
        diff_scenario: Option<&str>,
    ) -> Vec<ComparisonRow> {
        match comparison {
            ComparisonType::Monthly => self.monthly_rows(diff_scenario),
            ComparisonType::Quarterly => self.quarter_rows(diff_scenario),
            ComparisonType::Annual => self.annual_rows(diff_scenario),
            ComparisonType::Scenario => self.scenario_rows(scenario),
        }
    }
}

/// Converts a projection into forecast rows, each measured against the
/// reference scenario's target for its own year and month.
pub fn forecast_rows(
    projection: &Projection,
    targets: &ScenarioTargetIndex,
    reference_scenario: Option<&str>,
) -> Vec<ComparisonRow> {
    let mut trajectories: BTreeMap<i32, Option<MonthlyTargets>> = BTreeMap::new();

    projection
        .points
        .iter()
        .map(|point| {
            let reference = reference_scenario.and_then(|scenario| {
                trajectories
                    .entry(point.year)
                    .or_insert_with(|| targets.resolve(scenario, point.year))
                    .and_then(|t| t.get(point.month))
            });
            ComparisonRow::projected(
                Period::Month {
                    year: point.year,
                    month: point.month,
                },
                point.value,
                reference,
            )
        })
        .collect()
}

/// Rows for indicators that only carry planned trajectories: one row per
/// quarter with a column per scenario, holding the last explicit value of
/// that quarter. Quarters where no scenario has a value are omitted.
///
/// Returns the column labels, in scenario-key order, alongside the rows.
pub fn scenario_plan_rows(
    plan: &ScenarioTargetIndex,
    year: i32,
) -> (Vec<String>, Vec<ScenarioQuarterRow>) {
    let columns: Vec<(&str, String)> = plan
        .scenario_keys()
        .map(|key| (key, plan.label_for(key).unwrap_or(key).to_string()))
        .collect();

    let rows = (1..=4u32)
        .filter_map(|quarter| {
            let values: BTreeMap<String, Option<f64>> = columns
                .iter()
                .map(|(key, label)| (label.clone(), plan.quarter_snapshot(key, year, quarter)))
                .collect();

            if values.values().all(Option::is_none) {
                return None;
            }

            let period = Period::Quarter { year, quarter };
            Some(ScenarioQuarterRow {
                label: period.label(),
                period,
                values,
            })
        })
        .collect();

    (columns.into_iter().map(|(_, label)| label).collect(), rows)
}

/// One-shot aggregation of `history` against `targets`. Callers running
/// several comparison types over the same data should build an
/// [`IndicatorSeries`] once instead.
pub fn aggregate(
    comparison: ComparisonType,
    history: &[HistoryRecord],
    targets: &[TargetRecord],
    options: &AggregationOptions,
) -> Result<ComparisonResult> {
    let options = AggregationOptions {
        comparison,
        ..options.clone()
    };
    IndicatorSeries::new(history, targets).aggregate(&options)
}
