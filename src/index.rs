use crate::schema::HistoryRecord;
use crate::utils::sub_months;
use log::debug;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// `year → (month → value)` lookup over observed values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct YearMonthIndex {
    years: BTreeMap<i32, BTreeMap<u32, f64>>,
}

impl YearMonthIndex {
    pub fn value(&self, year: i32, month: u32) -> Option<f64> {
        self.years.get(&year).and_then(|months| months.get(&month)).copied()
    }

    pub fn months(&self, year: i32) -> Option<&BTreeMap<u32, f64>> {
        self.years.get(&year)
    }

    pub fn contains_year(&self, year: i32) -> bool {
        self.years.contains_key(&year)
    }

    pub fn years(&self) -> impl Iterator<Item = i32> + '_ {
        self.years.keys().copied()
    }

    pub fn latest_year(&self) -> Option<i32> {
        self.years.keys().next_back().copied()
    }

    /// Highest month with an observation in `year`.
    pub fn latest_month(&self, year: i32) -> Option<u32> {
        self.years
            .get(&year)
            .and_then(|months| months.keys().next_back().copied())
    }

    pub fn is_empty(&self) -> bool {
        self.years.is_empty()
    }

    /// Returns the value previously stored at the key, if any.
    fn insert(&mut self, year: i32, month: u32, value: f64) -> Option<f64> {
        self.years.entry(year).or_default().insert(month, value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TimelinePoint {
    pub year: i32,
    pub month: u32,
    pub value: f64,
}

/// Chronological flat view of the observations with an O(1) position lookup,
/// used for look-backs at arbitrary month offsets.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Timeline {
    points: Vec<TimelinePoint>,
    positions: HashMap<(i32, u32), usize>,
}

impl Timeline {
    fn from_index(index: &YearMonthIndex) -> Self {
        let mut points = Vec::new();
        let mut positions = HashMap::new();

        for (&year, months) in &index.years {
            for (&month, &value) in months {
                positions.insert((year, month), points.len());
                points.push(TimelinePoint { year, month, value });
            }
        }

        Self { points, positions }
    }

    pub fn points(&self) -> &[TimelinePoint] {
        &self.points
    }

    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.value).collect()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn last(&self) -> Option<&TimelinePoint> {
        self.points.last()
    }

    pub fn position(&self, year: i32, month: u32) -> Option<usize> {
        self.positions.get(&(year, month)).copied()
    }

    pub fn value_at(&self, year: i32, month: u32) -> Option<f64> {
        self.position(year, month).map(|idx| self.points[idx].value)
    }

    /// Value observed `months_back` calendar months before `(year, month)`.
    pub fn lookback(&self, year: i32, month: u32, months_back: u32) -> Option<f64> {
        let (y, m) = sub_months(year, month, months_back)?;
        self.value_at(y, m)
    }

    pub fn same_month_previous_year(&self, year: i32, month: u32) -> Option<f64> {
        self.lookback(year, month, 12)
    }
}

/// Observed history indexed both ways. Built once per history snapshot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoryIndex {
    pub by_year: YearMonthIndex,
    pub timeline: Timeline,
    skipped: usize,
}

impl HistoryIndex {
    /// Indexes observed rows. Planned (`es_meta`) rows, rows with an
    /// unparsable year or month and rows without a value are skipped, so an
    /// empty entry never shadows a real one at the same period. Duplicates
    /// resolve to the last record.
    pub fn build(records: &[HistoryRecord]) -> Self {
        let mut by_year = YearMonthIndex::default();
        let mut skipped = 0;

        for record in records.iter().filter(|r| !r.is_target) {
            let (Some(year), Some(month), Some(value)) = (record.year, record.month, record.value)
            else {
                skipped += 1;
                continue;
            };

            if let Some(previous) = by_year.insert(year, month, value) {
                debug!(
                    "Duplicate observation for {}-{:02}: {} replaced by {}",
                    year, month, previous, value
                );
            }
        }

        if skipped > 0 {
            debug!("Skipped {} history records without a usable period or value", skipped);
        }

        let timeline = Timeline::from_index(&by_year);

        Self {
            by_year,
            timeline,
            skipped,
        }
    }

    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn is_empty(&self) -> bool {
        self.by_year.is_empty()
    }
}
