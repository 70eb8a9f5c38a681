//! Per-category pass/fail counters and win/loss streaks

use serde::Serialize;
use std::collections::BTreeMap;

use crate::types::{Outcome, Weekday};

/// Running counters for one category
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StreakState {
    pub pass_count: u32,
    pub fail_count: u32,
    pub current_win_run: u32,
    pub current_loss_run: u32,
    pub max_win_run: u32,
    pub max_loss_run: u32,
}

impl StreakState {
    /// Pure transition: returns the state after one more outcome
    #[must_use]
    pub fn update(self, outcome: Outcome) -> Self {
        let mut next = self;
        match outcome {
            Outcome::Pass => {
                next.pass_count += 1;
                next.current_win_run += 1;
                next.current_loss_run = 0;
                next.max_win_run = next.max_win_run.max(next.current_win_run);
            }
            Outcome::Fail => {
                next.fail_count += 1;
                next.current_loss_run += 1;
                next.current_win_run = 0;
                next.max_loss_run = next.max_loss_run.max(next.current_loss_run);
            }
        }
        next
    }

    pub fn total(&self) -> u32 {
        self.pass_count + self.fail_count
    }

    /// Pass percentage (0-100), zero when nothing was recorded
    pub fn win_probability(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        self.pass_count as f64 / total as f64 * 100.0
    }
}

/// Streak state for every category seen during a run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreakBook {
    categories: BTreeMap<Weekday, StreakState>,
}

impl StreakBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one outcome, creating the category on first use
    pub fn record(&mut self, category: Weekday, outcome: Outcome) -> StreakState {
        let state = self.categories.entry(category).or_default();
        *state = state.update(outcome);
        *state
    }

    pub fn get(&self, category: Weekday) -> Option<&StreakState> {
        self.categories.get(&category)
    }

    /// Categories in weekday order
    pub fn iter(&self) -> impl Iterator<Item = (Weekday, &StreakState)> {
        self.categories.iter().map(|(day, state)| (*day, state))
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    pub fn total_records(&self) -> u32 {
        self.categories.values().map(StreakState::total).sum()
    }
}
