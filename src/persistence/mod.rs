//! CSV Persistence Module
//!
//! Writes one log and one summary per weekday category:
//! `<root>/<Weekday>/output.csv`, `<root>/<Weekday>/summary.txt`, plus a
//! combined `<root>/summary.csv`.

use anyhow::{Context, Result};
use csv::WriterBuilder;
use serde::Serialize;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::backtesting::{ClassificationRecord, StreakBook, StreakState};
use crate::types::{Cycle, Weekday};

const DAILY_HEADER: [&str; 7] = [
    "DATE",
    "VIX_OPEN",
    "INDEX_OPEN",
    "DAY_LOW-HIGH",
    "BAND_LOWER-UPPER",
    "CLOSE",
    "RESULT",
];

const WEEKLY_HEADER: [&str; 7] = [
    "WEEK_START",
    "VIX_OPEN",
    "START_OPEN",
    "LOWER-UPPER",
    "EXPIRY_DATE",
    "EXPIRY_CLOSE",
    "RESULT",
];

/// Consumer of classification records and the final streak snapshot
pub trait ReportSink {
    fn record(&mut self, record: &ClassificationRecord) -> Result<()>;

    /// Called once after the last record
    fn finish(&mut self, streaks: &StreakBook) -> Result<()>;
}

/// Summary row for the combined summary.csv
#[derive(Debug, Clone, Serialize)]
pub struct SummaryRecord {
    pub category: String,
    pub total: u32,
    pub pass: u32,
    pub fail: u32,
    pub max_win_streak: u32,
    pub max_loss_streak: u32,
    pub win_probability: f64,
}

impl SummaryRecord {
    pub fn new(category: Weekday, state: &StreakState) -> Self {
        Self {
            category: category.to_string(),
            total: state.total(),
            pass: state.pass_count,
            fail: state.fail_count,
            max_win_streak: state.max_win_run,
            max_loss_streak: state.max_loss_run,
            win_probability: round2(state.win_probability()),
        }
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Column values for one log row
pub fn csv_row(cycle: Cycle, record: &ClassificationRecord) -> Vec<String> {
    let band = format!("{:.2}-{:.2}", record.band_lower, record.band_upper);
    match cycle {
        Cycle::Daily => vec![
            record.anchor_date.to_string(),
            record.vol_open.to_string(),
            record.index_open.to_string(),
            format!("{}-{}", record.target_low, record.target_high),
            band,
            record.target_close.to_string(),
            record.outcome.to_string(),
        ],
        Cycle::Weekly => vec![
            record.anchor_date.to_string(),
            record.vol_open.to_string(),
            record.index_open.to_string(),
            band,
            record.target_date.to_string(),
            record.target_close.to_string(),
            record.outcome.to_string(),
        ],
    }
}

/// Text body of a per-category summary.txt
pub fn render_summary(cycle: Cycle, state: &StreakState) -> String {
    let total_label = match cycle {
        Cycle::Daily => "TOTAL_DAYS",
        Cycle::Weekly => "TOTAL_WEEKS",
    };
    format!(
        "{:<16}: {}\n{:<16}: {}\n{:<16}: {}\n{:<16}: {}\n{:<16}: {}\n{:<16}: {:.2} %\n",
        total_label,
        state.total(),
        "TOTAL_PASS",
        state.pass_count,
        "TOTAL_FAIL",
        state.fail_count,
        "MAX_WIN_STREAK",
        state.max_win_run,
        "MAX_LOSS_STREAK",
        state.max_loss_run,
        "WIN_PROBABILITY",
        state.win_probability()
    )
}

/// Per-weekday CSV log writer
pub struct CsvReportWriter {
    root: PathBuf,
    cycle: Cycle,
    writers: BTreeMap<Weekday, csv::Writer<File>>,
}

impl CsvReportWriter {
    pub fn new(root: impl AsRef<Path>, cycle: Cycle) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)
            .with_context(|| format!("Failed to create output directory {}", root.display()))?;
        clear_previous_run(&root)?;
        Ok(Self {
            root,
            cycle,
            writers: BTreeMap::new(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn category_dir(&self, category: Weekday) -> PathBuf {
        self.root.join(category.name())
    }

    fn open_log(root: &Path, cycle: Cycle, category: Weekday) -> Result<csv::Writer<File>> {
        let dir = root.join(category.name());
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;

        let path = dir.join("output.csv");
        let file =
            File::create(&path).with_context(|| format!("Failed to open {}", path.display()))?;
        let mut writer = WriterBuilder::new().has_headers(false).from_writer(file);

        let header = match cycle {
            Cycle::Daily => DAILY_HEADER,
            Cycle::Weekly => WEEKLY_HEADER,
        };
        writer.write_record(header)?;
        Ok(writer)
    }
}

/// Remove report files left by an earlier run so stale categories cannot
/// sit next to fresh ones. Category folders left empty are removed too.
fn clear_previous_run(root: &Path) -> Result<()> {
    remove_if_exists(&root.join("summary.csv"))?;
    for category in Weekday::ALL {
        let dir = root.join(category.name());
        if !dir.is_dir() {
            continue;
        }
        remove_if_exists(&dir.join("output.csv"))?;
        remove_if_exists(&dir.join("summary.txt"))?;
        if fs::read_dir(&dir)?.next().is_none() {
            fs::remove_dir(&dir)
                .with_context(|| format!("Failed to remove {}", dir.display()))?;
        }
    }
    Ok(())
}

fn remove_if_exists(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).with_context(|| format!("Failed to remove {}", path.display())),
    }
}

impl ReportSink for CsvReportWriter {
    fn record(&mut self, record: &ClassificationRecord) -> Result<()> {
        let writer = match self.writers.entry(record.category) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                entry.insert(Self::open_log(&self.root, self.cycle, record.category)?)
            }
        };
        writer
            .write_record(csv_row(self.cycle, record))
            .with_context(|| format!("Failed to write {} row", record.category))?;
        Ok(())
    }

    fn finish(&mut self, streaks: &StreakBook) -> Result<()> {
        for writer in self.writers.values_mut() {
            writer.flush()?;
        }

        let summary_path = self.root.join("summary.csv");
        let mut summary = csv::Writer::from_path(&summary_path)
            .with_context(|| format!("Failed to open {}", summary_path.display()))?;

        for (category, state) in streaks.iter() {
            let dir = self.category_dir(category);
            fs::create_dir_all(&dir)?;
            let path = dir.join("summary.txt");
            fs::write(&path, render_summary(self.cycle, state))
                .with_context(|| format!("Failed to write {}", path.display()))?;

            summary.serialize(SummaryRecord::new(category, state))?;

            info!(
                category = %category,
                total = state.total(),
                pass = state.pass_count,
                fail = state.fail_count,
                max_win = state.max_win_run,
                max_loss = state.max_loss_run,
                win_pct = %format!("{:.2}", state.win_probability()),
                "📊 Category summary"
            );
        }
        summary.flush()?;

        Ok(())
    }
}

/// Keeps everything in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    pub records: Vec<ClassificationRecord>,
    pub streaks: Option<StreakBook>,
}

impl ReportSink for MemorySink {
    fn record(&mut self, record: &ClassificationRecord) -> Result<()> {
        self.records.push(record.clone());
        Ok(())
    }

    fn finish(&mut self, streaks: &StreakBook) -> Result<()> {
        self.streaks = Some(streaks.clone());
        Ok(())
    }
}
