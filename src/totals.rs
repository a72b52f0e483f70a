use crate::schema::{ComparisonType, TotalsStrategy};
use crate::utils::{finite, mean, safe_ratio};
use crate::{ComparisonRow, Totals};

/// Reduces a row collection into a single summary line.
pub struct TotalsAggregator {
    comparison: ComparisonType,
    strategy: TotalsStrategy,
}

impl TotalsAggregator {
    pub fn new(comparison: ComparisonType, strategy: TotalsStrategy) -> Self {
        Self {
            comparison,
            strategy,
        }
    }

    /// Each column is aggregated over its own non-null values, so a row
    /// missing one field still contributes to the others.
    ///
    /// The reference total, when present, is the basis for `diff` and
    /// `pct`. Otherwise the comparison total is: as a "% achieved" ratio
    /// for scenario comparisons, as a relative change for the rest.
    pub fn aggregate(&self, rows: &[ComparisonRow]) -> Option<Totals> {
        let current = self.combine(rows.iter().filter_map(|r| r.current_value));
        let comparison = self.combine(rows.iter().filter_map(|r| r.comparison_value));
        let reference = self.combine(rows.iter().filter_map(|r| r.reference_value));

        if current.is_none() && comparison.is_none() && reference.is_none() {
            return None;
        }

        let diff = match (current, reference.or(comparison)) {
            (Some(c), Some(base)) => finite(c - base),
            _ => None,
        };

        let pct = if let Some(reference) = reference {
            diff.and_then(|d| safe_ratio(d, reference))
        } else if let Some(comparison) = comparison {
            if self.comparison == ComparisonType::Scenario {
                current.and_then(|c| safe_ratio(c, comparison))
            } else {
                diff.and_then(|d| safe_ratio(d, comparison))
            }
        } else {
            None
        };

        Some(Totals {
            current_value: current,
            comparison_value: comparison,
            reference_value: reference,
            diff,
            pct,
        })
    }

    fn combine(&self, values: impl Iterator<Item = f64>) -> Option<f64> {
        let values: Vec<f64> = values.collect();
        if values.is_empty() {
            return None;
        }
        match self.strategy {
            TotalsStrategy::Average => mean(&values),
            TotalsStrategy::Sum => finite(values.iter().sum()),
        }
    }
}

pub fn compute_totals(
    rows: &[ComparisonRow],
    comparison: ComparisonType,
    strategy: TotalsStrategy,
) -> Option<Totals> {
    TotalsAggregator::new(comparison, strategy).aggregate(rows)
}
