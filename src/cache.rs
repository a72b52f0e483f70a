use crate::schema::{HistoryRecord, TargetRecord};
use crate::series::IndicatorSeries;
use log::debug;
use std::collections::HashMap;

/// Request-scoped store of indexed series keyed by indicator code. Owned by
/// the caller and dropped with the request; nothing is shared globally.
#[derive(Debug, Default)]
pub struct SeriesCache {
    entries: HashMap<String, IndicatorSeries>,
}

impl SeriesCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached series for `key`, indexing `history` and `targets`
    /// only on a miss. Callers must [`invalidate`](Self::invalidate) a key
    /// when its data changes.
    pub fn get_or_build(
        &mut self,
        key: &str,
        history: &[HistoryRecord],
        targets: &[TargetRecord],
    ) -> &IndicatorSeries {
        self.entries.entry(key.to_string()).or_insert_with(|| {
            debug!("Indexing series for {}", key);
            IndicatorSeries::new(history, targets)
        })
    }

    pub fn get(&self, key: &str) -> Option<&IndicatorSeries> {
        self.entries.get(key)
    }

    pub fn invalidate(&mut self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
