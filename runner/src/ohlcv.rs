//! OHLCVSource — the trait boundary to historical bar data, plus an
//! in-memory mock for tests. No network fetchers live here; the runner
//! assumes delivered bars are already valid and trusts the source for
//! caching and rate limiting on its end.

use crate::error::DataError;
use chrono::NaiveDate;
use std::collections::HashMap;
use trendlab_core::domain::Bar;

/// Delivers bars for one symbol over a date range, strictly increasing by
/// timestamp. Implementations own any caching or synthesis; the runner only
/// consumes the resulting iterator.
pub trait OHLCVSource: Send + Sync {
    fn iter_bars(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
        timeframe: &str,
    ) -> Result<Box<dyn Iterator<Item = Bar> + Send>, DataError>;
}

/// Deterministic in-memory source keyed by symbol, for tests and the mock
/// end-to-end scenarios. Bars outside `[start, end]` are filtered out but
/// ordering within the stored vector is otherwise trusted as-is.
#[derive(Debug, Default, Clone)]
pub struct InMemoryOHLCVSource {
    bars_by_symbol: HashMap<String, Vec<Bar>>,
}

impl InMemoryOHLCVSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bars(mut self, symbol: impl Into<String>, bars: Vec<Bar>) -> Self {
        self.bars_by_symbol.insert(symbol.into(), bars);
        self
    }
}

impl OHLCVSource for InMemoryOHLCVSource {
    fn iter_bars(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
        _timeframe: &str,
    ) -> Result<Box<dyn Iterator<Item = Bar> + Send>, DataError> {
        let bars = self.bars_by_symbol.get(symbol).cloned().unwrap_or_default();
        let filtered: Vec<Bar> = bars
            .into_iter()
            .filter(|b| {
                let d = b.timestamp.date_naive();
                d >= start && d <= end
            })
            .collect();
        Ok(Box::new(filtered.into_iter()))
    }
}
