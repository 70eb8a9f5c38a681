//! Upstox REST client for daily historical candles
//!
//! Endpoint: `GET {base}/{instrument}/days/1/{to}/{from}`, answered with
//! `{"status":"success","data":{"candles":[[ts, o, h, l, c, volume, oi], ...]}}`
//! newest candle first.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::ProviderConfig;
use crate::error::BacktestError;
use crate::market_data::{CandleSeries, CandleSource};
use crate::types::Candle;

#[derive(Debug, Deserialize)]
struct HistoricalCandleResponse {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    data: Option<HistoricalCandleData>,
    #[serde(default)]
    errors: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct HistoricalCandleData {
    candles: Vec<Vec<serde_json::Value>>,
}

impl CandleSeries {
    /// Parse a raw historical-candle response body.
    ///
    /// Timestamps such as `2024-01-05T00:00:00+05:30` are truncated to their
    /// `YYYY-MM-DD` prefix.
    pub fn from_upstox_payload(
        instrument: impl Into<String>,
        body: &str,
    ) -> Result<Self, BacktestError> {
        let instrument = instrument.into();
        let response: HistoricalCandleResponse = serde_json::from_str(body)
            .map_err(|e| BacktestError::Payload(format!("{}: {}", instrument, e)))?;

        if response.status.as_deref() == Some("error") {
            return Err(BacktestError::Payload(format!(
                "{}: provider returned error status {:?}",
                instrument, response.errors
            )));
        }

        let data = response.data.ok_or_else(|| {
            BacktestError::Payload(format!("{}: response has no data section", instrument))
        })?;

        let mut candles = Vec::with_capacity(data.candles.len());
        for (idx, row) in data.candles.iter().enumerate() {
            let candle = parse_row(row).ok_or_else(|| {
                BacktestError::Payload(format!("{}: malformed candle row {}", instrument, idx))
            })?;
            candles.push(candle);
        }

        Ok(CandleSeries::from_candles(instrument, candles))
    }
}

fn parse_row(row: &[serde_json::Value]) -> Option<Candle> {
    if row.len() < 5 {
        return None;
    }
    let ts = row[0].as_str()?;
    let date = NaiveDate::parse_from_str(ts.get(..10)?, "%Y-%m-%d").ok()?;
    Some(Candle {
        date,
        open: row[1].as_f64()?,
        high: row[2].as_f64()?,
        low: row[3].as_f64()?,
        close: row[4].as_f64()?,
    })
}

/// Everything outside the RFC 3986 unreserved set
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Percent-encode an instrument key for use as a single path segment
/// (`NSE_INDEX|Nifty 50` -> `NSE_INDEX%7CNifty%2050`).
pub fn encode_instrument_key(key: &str) -> String {
    utf8_percent_encode(key, PATH_SEGMENT).to_string()
}

/// Historical candle client
#[derive(Debug, Clone)]
pub struct UpstoxClient {
    client: reqwest::Client,
    base_url: String,
    access_token: Option<String>,
}

impl UpstoxClient {
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            access_token: config.access_token.clone().filter(|t| !t.is_empty()),
        })
    }

    /// Daily-interval URL covering `from..=to`
    pub fn candle_url(&self, instrument: &str, from: NaiveDate, to: NaiveDate) -> String {
        format!(
            "{}/{}/days/1/{}/{}",
            self.base_url,
            encode_instrument_key(instrument),
            to.format("%Y-%m-%d"),
            from.format("%Y-%m-%d")
        )
    }
}

#[async_trait]
impl CandleSource for UpstoxClient {
    async fn fetch_daily(
        &self,
        instrument: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<CandleSeries> {
        let url = self.candle_url(instrument, from, to);
        info!(instrument = %instrument, %from, %to, "📥 Fetching daily candles");

        let mut request = self.client.get(&url).header("Accept", "application/json");
        if let Some(token) = &self.access_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("Failed to fetch candles for {}", instrument))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .with_context(|| format!("Failed to read candle response for {}", instrument))?;

        if !status.is_success() {
            bail!("Upstox returned {} for {}: {}", status, instrument, body);
        }

        let series = CandleSeries::from_upstox_payload(instrument, &body)?;
        debug!(instrument = %instrument, count = series.len(), "Parsed candle payload");
        Ok(series)
    }
}
