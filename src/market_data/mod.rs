//! Market data - candle series and historical candle sources
//!
//! Fetching and parsing live here; the backtesting engine only ever sees
//! already-built [`CandleSeries`] values.

mod series;
mod upstox;

pub use series::CandleSeries;
pub use upstox::{encode_instrument_key, UpstoxClient};

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;

/// Trait for historical daily candle providers
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CandleSource: Send + Sync {
    /// Fetch daily candles for `instrument` covering `from..=to`
    async fn fetch_daily(
        &self,
        instrument: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<CandleSeries>;
}
