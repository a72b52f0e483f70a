use crate::schema::TargetRecord;
use crate::utils::{normalize_scenario_key, quarter_months, sort_chronological};
use log::debug;
use std::collections::BTreeMap;

/// A full January..December target trajectory for one scenario.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonthlyTargets {
    values: [f64; 12],
}

impl MonthlyTargets {
    /// Applies the fill policy to explicit `(month, value)` pairs: months
    /// before the first explicit value take that first value, and every
    /// explicit value carries forward until the next one.
    pub fn fill(explicit: &BTreeMap<u32, f64>) -> Option<Self> {
        let mut carry = *explicit.values().next()?;
        let mut values = [0.0; 12];

        for month in 1..=12u32 {
            if let Some(&v) = explicit.get(&month) {
                carry = v;
            }
            values[(month - 1) as usize] = carry;
        }

        Some(Self { values })
    }

    pub fn uniform(value: f64) -> Self {
        Self { values: [value; 12] }
    }

    pub fn get(&self, month: u32) -> Option<f64> {
        match month {
            1..=12 => Some(self.values[(month - 1) as usize]),
            _ => None,
        }
    }

    pub fn values(&self) -> &[f64; 12] {
        &self.values
    }

    pub fn sum_months(&self, months: impl IntoIterator<Item = u32>) -> Option<f64> {
        let picked: Vec<f64> = months.into_iter().filter_map(|m| self.get(m)).collect();
        if picked.is_empty() {
            None
        } else {
            Some(picked.iter().sum())
        }
    }
}

/// Scenario targets keyed by normalized scenario label.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScenarioTargetIndex {
    monthly: BTreeMap<String, BTreeMap<(i32, u32), f64>>,
    annual: BTreeMap<String, BTreeMap<i32, f64>>,
    labels: BTreeMap<String, String>,
}

impl ScenarioTargetIndex {
    /// Records without a year or a parsable value are ignored. A record with
    /// no month is an annual/fallback target for its year.
    ///
    /// Records are walked in chronological order, so a scenario's label is
    /// the one written on its earliest record and duplicates resolve to the
    /// last one in input order.
    pub fn build(targets: &[TargetRecord]) -> Self {
        let mut index = Self::default();

        for target in &sort_chronological(targets) {
            let (Some(year), Some(value)) = (target.year, target.value) else {
                continue;
            };
            let key = normalize_scenario_key(&target.scenario);
            index
                .labels
                .entry(key.clone())
                .or_insert_with(|| target.scenario.trim().to_string());

            match target.month {
                Some(month) => {
                    index.monthly.entry(key).or_default().insert((year, month), value);
                }
                None => {
                    index.annual.entry(key).or_default().insert(year, value);
                }
            }
        }

        index
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Normalized scenario keys in sorted order.
    pub fn scenario_keys(&self) -> impl Iterator<Item = &str> {
        self.labels.keys().map(String::as_str)
    }

    /// Label of the scenario's earliest record, looked up by any spelling.
    pub fn label_for(&self, scenario: &str) -> Option<&str> {
        self.labels
            .get(&normalize_scenario_key(scenario))
            .map(String::as_str)
    }

    pub fn contains(&self, scenario: &str) -> bool {
        self.labels.contains_key(&normalize_scenario_key(scenario))
    }

    pub fn latest_year(&self) -> Option<i32> {
        let monthly = self
            .monthly
            .values()
            .filter_map(|m| m.keys().next_back().map(|(y, _)| *y));
        let annual = self.annual.values().filter_map(|a| a.keys().next_back().copied());
        monthly.chain(annual).max()
    }

    /// Explicit monthly value, without any filling.
    pub fn raw_value(&self, scenario: &str, year: i32, month: u32) -> Option<f64> {
        self.monthly
            .get(&normalize_scenario_key(scenario))
            .and_then(|m| m.get(&(year, month)))
            .copied()
    }

    pub fn annual_value(&self, scenario: &str, year: i32) -> Option<f64> {
        self.annual
            .get(&normalize_scenario_key(scenario))
            .and_then(|a| a.get(&year))
            .copied()
    }

    /// Filled trajectory for exactly `year`. Explicit monthly values win;
    /// an annual target covers the whole year when no month is explicit.
    pub fn filled_year(&self, scenario: &str, year: i32) -> Option<MonthlyTargets> {
        let key = normalize_scenario_key(scenario);

        let explicit: BTreeMap<u32, f64> = self
            .monthly
            .get(&key)
            .map(|m| {
                m.range((year, 1)..=(year, 12))
                    .map(|(&(_, month), &value)| (month, value))
                    .collect()
            })
            .unwrap_or_default();

        MonthlyTargets::fill(&explicit).or_else(|| {
            self.annual
                .get(&key)
                .and_then(|a| a.get(&year))
                .map(|&v| MonthlyTargets::uniform(v))
        })
    }

    /// Filled trajectory built from every year of the scenario pooled
    /// together, the most recent year winning per month.
    pub fn pooled(&self, scenario: &str) -> Option<MonthlyTargets> {
        let key = normalize_scenario_key(scenario);

        let mut by_month = BTreeMap::new();
        if let Some(monthly) = self.monthly.get(&key) {
            for (&(_, month), &value) in monthly {
                by_month.insert(month, value);
            }
        }

        MonthlyTargets::fill(&by_month).or_else(|| {
            self.annual
                .get(&key)
                .and_then(|a| a.values().next_back())
                .map(|&v| MonthlyTargets::uniform(v))
        })
    }

    /// Trajectory for `year`, falling back to the pooled targets when the
    /// year has no explicit value.
    pub fn resolve(&self, scenario: &str, year: i32) -> Option<MonthlyTargets> {
        self.filled_year(scenario, year).or_else(|| {
            let pooled = self.pooled(scenario);
            if pooled.is_some() {
                debug!(
                    "No targets for scenario '{}' in {}, using pooled targets",
                    scenario, year
                );
            }
            pooled
        })
    }

    /// Last explicit value inside a quarter, for plans tracked as
    /// quarter-end snapshots.
    pub fn quarter_snapshot(&self, scenario: &str, year: i32, quarter: u32) -> Option<f64> {
        quarter_months(quarter)
            .rev()
            .find_map(|month| self.raw_value(scenario, year, month))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_and_back_fill() {
        let targets = vec![
            TargetRecord::monthly(2024, 9, "BAJO", 20.0),
            TargetRecord::monthly(2024, 3, "BAJO", 10.0),
        ];
        let index = ScenarioTargetIndex::build(&targets);

        let filled = index.filled_year("bajo", 2024).unwrap();
        assert_eq!(
            filled.values(),
            &[10.0, 10.0, 10.0, 10.0, 10.0, 10.0, 10.0, 10.0, 20.0, 20.0, 20.0, 20.0]
        );
    }

    #[test]
    fn test_scenario_labels_are_normalized() {
        let targets = vec![TargetRecord::monthly(2024, 1, "Meta Bajo", 3.0)];
        let index = ScenarioTargetIndex::build(&targets);

        assert!(index.contains("BAJO"));
        assert!(index.contains("escenario bajo"));
        assert_eq!(index.label_for("bajo"), Some("Meta Bajo"));
        assert_eq!(index.raw_value("Bajo", 2024, 1), Some(3.0));
        assert_eq!(index.scenario_keys().collect::<Vec<_>>(), vec!["BAJO"]);
    }

    #[test]
    fn test_label_comes_from_earliest_record() {
        let targets = vec![
            TargetRecord::monthly(2024, 2, "ESCENARIO BAJO", 4.0),
            TargetRecord::monthly(2023, 5, "Meta Bajo", 3.0),
            TargetRecord::monthly(2024, 2, "bajo", 5.0),
        ];
        let index = ScenarioTargetIndex::build(&targets);

        assert_eq!(index.label_for("BAJO"), Some("Meta Bajo"));
        assert_eq!(index.raw_value("BAJO", 2024, 2), Some(5.0));
    }

    #[test]
    fn test_annual_target_covers_year() {
        let targets = vec![TargetRecord::annual(2024, "ALTO", 12.0)];
        let index = ScenarioTargetIndex::build(&targets);

        let filled = index.filled_year("ALTO", 2024).unwrap();
        assert_eq!(filled.get(1), Some(12.0));
        assert_eq!(filled.get(12), Some(12.0));
        assert_eq!(filled.get(13), None);
        assert_eq!(index.annual_value("alto", 2024), Some(12.0));
    }

    #[test]
    fn test_resolve_falls_back_to_pool() {
        let targets = vec![
            TargetRecord::monthly(2022, 1, "MEDIO", 1.0),
            TargetRecord::monthly(2023, 1, "MEDIO", 2.0),
            TargetRecord::monthly(2023, 6, "MEDIO", 4.0),
        ];
        let index = ScenarioTargetIndex::build(&targets);

        assert!(index.filled_year("MEDIO", 2024).is_none());
        let resolved = index.resolve("MEDIO", 2024).unwrap();
        assert_eq!(resolved.get(1), Some(2.0));
        assert_eq!(resolved.get(5), Some(2.0));
        assert_eq!(resolved.get(6), Some(4.0));
        assert!(index.resolve("UNKNOWN", 2024).is_none());
    }

    #[test]
    fn test_quarter_snapshot_takes_last_month() {
        let targets = vec![
            TargetRecord::monthly(2024, 1, "Programada", 5.0),
            TargetRecord::monthly(2024, 3, "Programada", 15.0),
        ];
        let index = ScenarioTargetIndex::build(&targets);

        assert_eq!(index.quarter_snapshot("Programada", 2024, 1), Some(15.0));
        assert_eq!(index.quarter_snapshot("Programada", 2024, 2), None);
        assert_eq!(index.latest_year(), Some(2024));
    }

    #[test]
    fn test_records_without_value_ignored() {
        let targets = vec![TargetRecord {
            value: None,
            ..TargetRecord::monthly(2024, 1, "BAJO", 0.0)
        }];
        let index = ScenarioTargetIndex::build(&targets);
        assert!(index.is_empty());
    }
}
