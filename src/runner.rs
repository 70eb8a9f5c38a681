//! Backtest pipeline: fetch both series, evaluate, stream to a sink

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::backtesting::{AnchorEvaluation, Backtester, StreakBook};
use crate::config::{CycleConfig, RunPlan};
use crate::market_data::{CandleSeries, CandleSource};
use crate::persistence::ReportSink;

/// Totals for a finished run
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub classified: usize,
    pub skipped: usize,
    pub streaks: StreakBook,
}

/// Fetch index and volatility series concurrently, then evaluate them
pub async fn run_backtest<S>(
    source: &S,
    plan: &RunPlan,
    sink: &mut dyn ReportSink,
) -> Result<RunSummary>
where
    S: CandleSource + ?Sized,
{
    plan.cycle.validate()?;

    let (index, vix) = tokio::try_join!(
        source.fetch_daily(&plan.index_key, plan.start, plan.end),
        source.fetch_daily(&plan.vix_key, plan.start, plan.end),
    )
    .context("Failed to fetch candle series")?;

    for series in [&index, &vix] {
        info!(
            instrument = %series.instrument(),
            candles = series.len(),
            first = ?series.first_date(),
            last = ?series.last_date(),
            "✅ Candle series ready"
        );
    }

    evaluate_series(&index, &vix, plan.cycle, sink)
}

/// Run the engine over already-fetched series, feeding every record to `sink`
pub fn evaluate_series(
    index: &CandleSeries,
    vix: &CandleSeries,
    cycle: CycleConfig,
    sink: &mut dyn ReportSink,
) -> Result<RunSummary> {
    let backtester = Backtester::new(index, vix, cycle)?;
    let mut evaluations = backtester.evaluations();
    let mut classified = 0usize;
    let mut skipped = 0usize;

    for evaluation in evaluations.by_ref() {
        match evaluation {
            AnchorEvaluation::Classified(record) => {
                sink.record(&record)?;
                classified += 1;
            }
            AnchorEvaluation::Skipped { .. } => skipped += 1,
        }
    }

    let streaks = evaluations.into_streaks();
    sink.finish(&streaks)?;

    debug!(categories = streaks.len(), "Streak book closed");
    info!(
        cycle = %backtester.cycle(),
        classified,
        skipped,
        "✅ Backtest complete"
    );

    Ok(RunSummary {
        classified,
        skipped,
        streaks,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market_data::MockCandleSource;
    use crate::persistence::MemorySink;
    use crate::types::{Candle, Cycle, Outcome, Weekday};
    use chrono::NaiveDate;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn flat(date: &str, price: f64) -> Candle {
        Candle {
            date: d(date),
            open: price,
            high: price,
            low: price,
            close: price,
        }
    }

    fn plan(cycle: CycleConfig) -> RunPlan {
        RunPlan {
            index_key: "NSE_INDEX|Nifty 50".into(),
            vix_key: "NSE_INDEX|India VIX".into(),
            start: d("2024-03-01"),
            end: d("2024-03-31"),
            cycle,
        }
    }

    #[test]
    fn test_run_backtest_with_mock_source() {
        let index = CandleSeries::from_candles(
            "NSE_INDEX|Nifty 50",
            vec![
                flat("2024-03-04", 22000.0),
                flat("2024-03-05", 22000.0),
                flat("2024-03-06", 22000.0),
            ],
        );
        let vix = CandleSeries::from_candles(
            "NSE_INDEX|India VIX",
            vec![flat("2024-03-04", 14.0), flat("2024-03-06", 14.0)],
        );

        let mut source = MockCandleSource::new();
        source
            .expect_fetch_daily()
            .times(2)
            .returning(move |instrument, _, _| {
                if instrument == "NSE_INDEX|Nifty 50" {
                    Ok(index.clone())
                } else {
                    Ok(vix.clone())
                }
            });

        let mut sink = MemorySink::default();
        let summary =
            tokio_test::block_on(run_backtest(&source, &plan(CycleConfig::daily()), &mut sink))
                .unwrap();

        assert_eq!(summary.classified, 2);
        assert_eq!(summary.skipped, 1);
        assert_eq!(sink.records.len(), 2);
        assert!(sink.records.iter().all(|r| r.outcome == Outcome::Pass));

        let streaks = sink.streaks.unwrap();
        assert_eq!(streaks.get(Weekday::Monday).unwrap().pass_count, 1);
        assert_eq!(streaks.get(Weekday::Wednesday).unwrap().pass_count, 1);
        assert!(streaks.get(Weekday::Tuesday).is_none());
    }

    #[test]
    fn test_invalid_cycle_refuses_before_fetch() {
        let mut source = MockCandleSource::new();
        source.expect_fetch_daily().never();

        let cycle = CycleConfig {
            cycle: Cycle::Weekly,
            start_weekday: Some(Weekday::Monday),
            expiry_weekday: None,
        };
        let mut sink = MemorySink::default();
        let result = tokio_test::block_on(run_backtest(&source, &plan(cycle), &mut sink));

        assert!(result.is_err());
        assert!(sink.records.is_empty());
        assert!(sink.streaks.is_none());
    }

    #[test]
    fn test_fetch_failure_propagates() {
        let mut source = MockCandleSource::new();
        source
            .expect_fetch_daily()
            .returning(|instrument, _, _| Err(anyhow::anyhow!("timeout fetching {}", instrument)));

        let mut sink = MemorySink::default();
        let err = tokio_test::block_on(run_backtest(
            &source,
            &plan(CycleConfig::daily()),
            &mut sink,
        ))
        .unwrap_err();

        assert!(format!("{:#}", err).contains("timeout fetching"));
    }
}
