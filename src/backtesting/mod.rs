//! Backtesting Module
//!
//! Replays the volatility-range hypothesis over two aligned daily series:
//! - Anchor/target selection (daily or weekly cycle)
//! - Band evaluation from the volatility index open
//! - PASS/FAIL classification and per-weekday streak statistics
//!
//! Evaluation is lazy and strictly chronological; streaks depend on order.

pub mod range;
pub mod selection;
pub mod streaks;

pub use range::{classify, evaluate_band, period_pct, Band};
pub use selection::{DailySelector, Selection, WeeklyScanner};
pub use streaks::{StreakBook, StreakState};

use chrono::NaiveDate;
use serde::Serialize;
use tracing::debug;

use crate::config::CycleConfig;
use crate::error::{BacktestError, SkipReason};
use crate::market_data::CandleSeries;
use crate::types::{weekday_of, Cycle, Outcome, Weekday};

/// One evaluated anchor
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationRecord {
    pub anchor_date: NaiveDate,
    /// Weekday bucket the record is filed under
    pub category: Weekday,
    pub vol_open: f64,
    pub index_open: f64,
    pub band_lower: f64,
    pub band_upper: f64,
    pub target_date: NaiveDate,
    pub target_low: f64,
    pub target_high: f64,
    pub target_close: f64,
    pub outcome: Outcome,
}

/// Result of looking at one anchor
#[derive(Debug, Clone, PartialEq)]
pub enum AnchorEvaluation {
    Classified(ClassificationRecord),
    Skipped { anchor: NaiveDate, reason: SkipReason },
}

/// Everything a finished run produced
#[derive(Debug, Clone, Default)]
pub struct BacktestReport {
    pub records: Vec<ClassificationRecord>,
    pub skipped: Vec<(NaiveDate, SkipReason)>,
    pub streaks: StreakBook,
}

#[derive(Debug, Clone, Copy)]
enum Schedule {
    Daily,
    Weekly { start: Weekday, expiry: Weekday },
}

/// Backtester over an index series and its volatility index series
pub struct Backtester<'a> {
    index: &'a CandleSeries,
    vix: &'a CandleSeries,
    cycle: Cycle,
    schedule: Schedule,
    dates: Vec<NaiveDate>,
}

impl<'a> Backtester<'a> {
    pub fn new(
        index: &'a CandleSeries,
        vix: &'a CandleSeries,
        config: CycleConfig,
    ) -> Result<Self, BacktestError> {
        config.validate()?;
        let schedule = match (config.cycle, config.start_weekday, config.expiry_weekday) {
            (Cycle::Daily, _, _) => Schedule::Daily,
            (Cycle::Weekly, Some(start), Some(expiry)) => Schedule::Weekly { start, expiry },
            (Cycle::Weekly, _, _) => {
                return Err(BacktestError::InvalidConfiguration(
                    "weekly cycle needs start and expiry weekdays".into(),
                ))
            }
        };

        Ok(Self {
            index,
            vix,
            cycle: config.cycle,
            schedule,
            dates: index.dates(),
        })
    }

    pub fn cycle(&self) -> Cycle {
        self.cycle
    }

    /// Lazy, chronological evaluation of every anchor
    pub fn evaluations(&self) -> Evaluations<'_> {
        let selector = match self.schedule {
            Schedule::Daily => Selector::Daily(DailySelector::new(&self.dates)),
            Schedule::Weekly { start, expiry } => {
                Selector::Weekly(WeeklyScanner::new(&self.dates, start, expiry))
            }
        };
        Evaluations {
            backtester: self,
            selector,
            streaks: StreakBook::new(),
        }
    }

    /// Run to completion and collect the results
    pub fn run(&self) -> BacktestReport {
        let mut report = BacktestReport::default();
        let mut evaluations = self.evaluations();
        for evaluation in evaluations.by_ref() {
            match evaluation {
                AnchorEvaluation::Classified(record) => report.records.push(record),
                AnchorEvaluation::Skipped { anchor, reason } => {
                    report.skipped.push((anchor, reason))
                }
            }
        }
        report.streaks = evaluations.into_streaks();
        report
    }

    fn category(&self, anchor: NaiveDate) -> Weekday {
        match self.schedule {
            Schedule::Daily => weekday_of(anchor),
            Schedule::Weekly { expiry, .. } => expiry,
        }
    }

    fn classify_selection(
        &self,
        selection: Selection,
    ) -> Result<ClassificationRecord, SkipReason> {
        let anchor_date = selection.anchor;
        let vix = self.vix.lookup(anchor_date)?;
        let anchor = self.index.lookup(anchor_date)?;

        let Some(target_date) = selection.target else {
            return Err(SkipReason::NoTargetAvailable {
                anchor: anchor_date,
                expiry: self.category(anchor_date),
            });
        };
        let target = self.index.lookup(target_date)?;

        let band = evaluate_band(vix.open, anchor.open, self.cycle.periods_per_year());
        let outcome = classify(target.close, &band);

        Ok(ClassificationRecord {
            anchor_date,
            category: self.category(anchor_date),
            vol_open: vix.open,
            index_open: anchor.open,
            band_lower: band.lower,
            band_upper: band.upper,
            target_date,
            target_low: target.low,
            target_high: target.high,
            target_close: target.close,
            outcome,
        })
    }
}

enum Selector<'a> {
    Daily(DailySelector<'a>),
    Weekly(WeeklyScanner<'a>),
}

impl Iterator for Selector<'_> {
    type Item = Selection;

    fn next(&mut self) -> Option<Selection> {
        match self {
            Selector::Daily(s) => s.next(),
            Selector::Weekly(s) => s.next(),
        }
    }
}

/// Iterator of anchor evaluations.
///
/// Streak state advances as classified records are yielded; read it with
/// [`streaks`](Self::streaks) or take it with [`into_streaks`](Self::into_streaks)
/// once the iterator is exhausted.
pub struct Evaluations<'a> {
    backtester: &'a Backtester<'a>,
    selector: Selector<'a>,
    streaks: StreakBook,
}

impl Evaluations<'_> {
    pub fn streaks(&self) -> &StreakBook {
        &self.streaks
    }

    pub fn into_streaks(self) -> StreakBook {
        self.streaks
    }
}

impl Iterator for Evaluations<'_> {
    type Item = AnchorEvaluation;

    fn next(&mut self) -> Option<AnchorEvaluation> {
        let selection = self.selector.next()?;
        match self.backtester.classify_selection(selection) {
            Ok(record) => {
                self.streaks.record(record.category, record.outcome);
                Some(AnchorEvaluation::Classified(record))
            }
            Err(reason) => {
                debug!(anchor = %selection.anchor, %reason, "Skipping anchor");
                Some(AnchorEvaluation::Skipped {
                    anchor: selection.anchor,
                    reason,
                })
            }
        }
    }
}
