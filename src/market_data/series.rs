//! Candle Series - per-day OHLC records for one instrument, keyed by date

use chrono::NaiveDate;
use std::collections::BTreeMap;
use tracing::warn;

use crate::error::CandleNotFound;
use crate::types::Candle;

/// Ordered daily candles for a single instrument.
///
/// Holds at most one candle per calendar day. Iteration and [`dates`](Self::dates)
/// are always ascending by date regardless of insertion order.
#[derive(Debug, Clone, PartialEq)]
pub struct CandleSeries {
    instrument: String,
    candles: BTreeMap<NaiveDate, Candle>,
}

impl CandleSeries {
    pub fn new(instrument: impl Into<String>) -> Self {
        Self {
            instrument: instrument.into(),
            candles: BTreeMap::new(),
        }
    }

    /// Build a series, keeping the first candle seen for any repeated date
    pub fn from_candles(
        instrument: impl Into<String>,
        candles: impl IntoIterator<Item = Candle>,
    ) -> Self {
        let mut series = Self::new(instrument);
        for candle in candles {
            if !series.insert(candle) {
                warn!(
                    instrument = %series.instrument,
                    date = %candle.date,
                    "Duplicate candle date in payload, keeping first"
                );
            }
        }
        series
    }

    /// Insert a candle. Returns false (and leaves the series untouched)
    /// if the date is already present.
    pub fn insert(&mut self, candle: Candle) -> bool {
        if self.candles.contains_key(&candle.date) {
            return false;
        }
        self.candles.insert(candle.date, candle);
        true
    }

    /// Exact-day lookup
    pub fn lookup(&self, date: NaiveDate) -> Result<&Candle, CandleNotFound> {
        self.candles.get(&date).ok_or_else(|| CandleNotFound {
            instrument: self.instrument.clone(),
            date,
        })
    }

    pub fn instrument(&self) -> &str {
        &self.instrument
    }

    /// Trading dates, oldest first
    pub fn dates(&self) -> Vec<NaiveDate> {
        self.candles.keys().copied().collect()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.candles.keys().next().copied()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.candles.keys().next_back().copied()
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }
}
