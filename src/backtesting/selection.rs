//! Anchor and target selection over an ascending list of trading dates
//!
//! Daily: every date anchors itself. Weekly: a two-state scanner that looks
//! for the start weekday, then for the first expiry weekday strictly after it.
//! After emitting a pair the anchor search resumes from the slot right after
//! the anchor, not after the target, so weekly windows may overlap.

use chrono::NaiveDate;

use crate::types::{weekday_of, Weekday};

/// One anchor and the date whose close it is judged against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub anchor: NaiveDate,
    /// `None` when the series ends before a target is found
    pub target: Option<NaiveDate>,
}

/// Every trading date is an anchor and its own target
#[derive(Debug, Clone)]
pub struct DailySelector<'a> {
    dates: std::slice::Iter<'a, NaiveDate>,
}

impl<'a> DailySelector<'a> {
    pub fn new(dates: &'a [NaiveDate]) -> Self {
        Self { dates: dates.iter() }
    }
}

impl Iterator for DailySelector<'_> {
    type Item = Selection;

    fn next(&mut self) -> Option<Selection> {
        self.dates.next().map(|&date| Selection {
            anchor: date,
            target: Some(date),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    ScanningForAnchor { from: usize },
    ScanningForTarget { anchor: usize, from: usize },
    Exhausted,
}

/// Weekly anchor/target state machine
#[derive(Debug, Clone)]
pub struct WeeklyScanner<'a> {
    dates: &'a [NaiveDate],
    start: Weekday,
    expiry: Weekday,
    state: ScanState,
}

impl<'a> WeeklyScanner<'a> {
    pub fn new(dates: &'a [NaiveDate], start: Weekday, expiry: Weekday) -> Self {
        Self {
            dates,
            start,
            expiry,
            state: ScanState::ScanningForAnchor { from: 0 },
        }
    }

    fn position_from(&self, from: usize, day: Weekday) -> Option<usize> {
        self.dates
            .get(from..)?
            .iter()
            .position(|&d| weekday_of(d) == day)
            .map(|offset| from + offset)
    }
}

impl Iterator for WeeklyScanner<'_> {
    type Item = Selection;

    fn next(&mut self) -> Option<Selection> {
        loop {
            match self.state {
                ScanState::ScanningForAnchor { from } => {
                    self.state = match self.position_from(from, self.start) {
                        Some(anchor) => ScanState::ScanningForTarget {
                            anchor,
                            from: anchor + 1,
                        },
                        None => ScanState::Exhausted,
                    };
                }
                ScanState::ScanningForTarget { anchor, from } => {
                    let target = self
                        .position_from(from, self.expiry)
                        .map(|idx| self.dates[idx]);
                    self.state = ScanState::ScanningForAnchor { from: anchor + 1 };
                    return Some(Selection {
                        anchor: self.dates[anchor],
                        target,
                    });
                }
                ScanState::Exhausted => return None,
            }
        }
    }
}
