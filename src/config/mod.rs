//! Configuration management for vixband
//!
//! Loads from config files + environment variables via .env

use anyhow::{Context, Result};
use chrono::NaiveDate;
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::Path;

use crate::error::BacktestError;
use crate::types::{Cycle, Weekday};

/// Main application configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    pub provider: ProviderConfig,
    pub instruments: InstrumentsConfig,
    pub run: RunConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    /// Historical candle endpoint, without trailing slash
    pub base_url: String,
    /// HTTP timeout in seconds
    pub timeout_secs: u64,
    /// Optional bearer token
    #[serde(default)]
    pub access_token: Option<String>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.upstox.com/v3/historical-candle".to_string(),
            timeout_secs: 30,
            access_token: None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InstrumentsConfig {
    /// Instrument key of the index, e.g. `NSE_INDEX|Nifty 50`
    pub index_key: String,
    /// Instrument key of the volatility index, e.g. `NSE_INDEX|India VIX`
    pub vix_key: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RunConfig {
    /// First day of the window (YYYY-MM-DD)
    pub start_date: String,
    /// Last day of the window (YYYY-MM-DD)
    pub end_date: String,
    /// daily | weekly
    pub cycle: String,
    /// Weekday anchors are taken on (weekly only)
    #[serde(default)]
    pub start_day: Option<String>,
    /// Weekday whose close is checked (weekly only)
    #[serde(default)]
    pub expiry_day: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Root directory for per-weekday logs and summaries
    pub dir: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: "output".to_string(),
        }
    }
}

/// Anchor/target selection settings for one run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleConfig {
    pub cycle: Cycle,
    pub start_weekday: Option<Weekday>,
    pub expiry_weekday: Option<Weekday>,
}

impl CycleConfig {
    pub fn daily() -> Self {
        Self {
            cycle: Cycle::Daily,
            start_weekday: None,
            expiry_weekday: None,
        }
    }

    pub fn weekly(start: Weekday, expiry: Weekday) -> Self {
        Self {
            cycle: Cycle::Weekly,
            start_weekday: Some(start),
            expiry_weekday: Some(expiry),
        }
    }

    /// Weekly cycles need both weekdays; daily cycles ignore them
    pub fn validate(&self) -> Result<(), BacktestError> {
        if self.cycle == Cycle::Weekly {
            if self.start_weekday.is_none() {
                return Err(BacktestError::InvalidConfiguration(
                    "run.start_day is required for the weekly cycle".into(),
                ));
            }
            if self.expiry_weekday.is_none() {
                return Err(BacktestError::InvalidConfiguration(
                    "run.expiry_day is required for the weekly cycle".into(),
                ));
            }
        }
        Ok(())
    }
}

/// Validated, immutable inputs for one backtest run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunPlan {
    pub index_key: String,
    pub vix_key: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub cycle: CycleConfig,
}

impl AppConfig {
    /// Load configuration, layering `extra` (if given) above the default files
    pub fn load_with(extra: Option<&Path>) -> Result<Self> {
        // Load .env file first
        dotenvy::dotenv().ok();

        let mut builder = Config::builder()
            .set_default("provider.base_url", ProviderConfig::default().base_url)?
            .set_default("provider.timeout_secs", 30)?
            .set_default("instruments.index_key", "")?
            .set_default("instruments.vix_key", "")?
            .set_default("run.start_date", "")?
            .set_default("run.end_date", "")?
            .set_default("run.cycle", "daily")?
            .set_default("output.dir", "output")?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false));

        if let Some(path) = extra {
            builder = builder.add_source(File::from(path).required(true));
        }

        let config = builder
            // Override with environment variables (VIXBAND__RUN__CYCLE=weekly)
            .add_source(Environment::with_prefix("VIXBAND").separator("__"))
            .build()
            .context("Failed to build configuration")?;

        let app_config: AppConfig = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        Ok(app_config)
    }

    /// Check required fields and resolve names into a [`RunPlan`]
    pub fn validate(&self) -> Result<RunPlan, BacktestError> {
        let index_key = required("instruments.index_key", &self.instruments.index_key)?;
        let vix_key = required("instruments.vix_key", &self.instruments.vix_key)?;
        let start = parse_date("run.start_date", &self.run.start_date)?;
        let end = parse_date("run.end_date", &self.run.end_date)?;
        if start > end {
            return Err(BacktestError::InvalidConfiguration(format!(
                "run.start_date {} is after run.end_date {}",
                start, end
            )));
        }

        let cycle: Cycle = self
            .run
            .cycle
            .parse()
            .map_err(|e| BacktestError::InvalidConfiguration(format!("run.cycle: {}", e)))?;

        let cycle = match cycle {
            Cycle::Daily => CycleConfig::daily(),
            Cycle::Weekly => CycleConfig {
                cycle,
                start_weekday: parse_weekday("run.start_day", self.run.start_day.as_deref())?,
                expiry_weekday: parse_weekday("run.expiry_day", self.run.expiry_day.as_deref())?,
            },
        };
        cycle.validate()?;

        Ok(RunPlan {
            index_key: index_key.to_string(),
            vix_key: vix_key.to_string(),
            start,
            end,
            cycle,
        })
    }

    /// Generate a digest of the config (without secrets) for logging
    pub fn digest(&self) -> String {
        format!(
            "index={} vix={} window={}..{} cycle={} start_day={} expiry_day={} output={}",
            self.instruments.index_key,
            self.instruments.vix_key,
            self.run.start_date,
            self.run.end_date,
            self.run.cycle,
            self.run.start_day.as_deref().unwrap_or("-"),
            self.run.expiry_day.as_deref().unwrap_or("-"),
            self.output.dir
        )
    }
}

impl std::fmt::Display for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.digest())
    }
}

fn required<'a>(field: &str, value: &'a str) -> Result<&'a str, BacktestError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(BacktestError::InvalidConfiguration(format!(
            "{} is required",
            field
        )));
    }
    Ok(value)
}

fn parse_date(field: &str, value: &str) -> Result<NaiveDate, BacktestError> {
    let value = required(field, value)?;
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| {
        BacktestError::InvalidConfiguration(format!(
            "{} must be YYYY-MM-DD, got '{}'",
            field, value
        ))
    })
}

/// Missing or blank names resolve to `None`; unknown names are an error
fn parse_weekday(field: &str, value: Option<&str>) -> Result<Option<Weekday>, BacktestError> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(name) => name
            .parse()
            .map(Some)
            .map_err(|e| BacktestError::InvalidConfiguration(format!("{}: {}", field, e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> AppConfig {
        AppConfig {
            instruments: InstrumentsConfig {
                index_key: "NSE_INDEX|Nifty 50".into(),
                vix_key: "NSE_INDEX|India VIX".into(),
            },
            run: RunConfig {
                start_date: "2023-01-01".into(),
                end_date: "2023-12-31".into(),
                cycle: "daily".into(),
                start_day: None,
                expiry_day: None,
            },
            ..AppConfig::default()
        }
    }

    #[test]
    fn test_validate_daily() {
        let plan = base_config().validate().unwrap();
        assert_eq!(plan.cycle, CycleConfig::daily());
        assert_eq!(plan.start, NaiveDate::from_ymd_opt(2023, 1, 1).unwrap());
        assert_eq!(plan.index_key, "NSE_INDEX|Nifty 50");
    }

    #[test]
    fn test_validate_weekly() {
        let mut cfg = base_config();
        cfg.run.cycle = "weekly".into();
        cfg.run.start_day = Some("Monday".into());
        cfg.run.expiry_day = Some("thu".into());

        let plan = cfg.validate().unwrap();
        assert_eq!(
            plan.cycle,
            CycleConfig::weekly(Weekday::Monday, Weekday::Thursday)
        );
    }

    #[test]
    fn test_weekly_requires_weekdays() {
        let mut cfg = base_config();
        cfg.run.cycle = "weekly".into();
        cfg.run.expiry_day = Some("Friday".into());
        cfg.run.start_day = Some("  ".into());

        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("run.start_day"));
    }

    #[test]
    fn test_missing_instrument_is_invalid() {
        let mut cfg = base_config();
        cfg.instruments.vix_key = String::new();
        assert_eq!(
            cfg.validate().unwrap_err(),
            BacktestError::InvalidConfiguration("instruments.vix_key is required".into())
        );
    }

    #[test]
    fn test_bad_dates_are_invalid() {
        let mut cfg = base_config();
        cfg.run.start_date = "01-01-2023".into();
        assert!(cfg.validate().is_err());

        let mut cfg = base_config();
        cfg.run.start_date = "2024-01-01".into();
        assert!(cfg.validate().unwrap_err().to_string().contains("after"));
    }

    #[test]
    fn test_unknown_weekday_is_invalid() {
        let mut cfg = base_config();
        cfg.run.cycle = "weekly".into();
        cfg.run.start_day = Some("Mon".into());
        cfg.run.expiry_day = Some("Someday".into());
        assert!(cfg.validate().unwrap_err().to_string().contains("run.expiry_day"));
    }

    #[test]
    fn test_daily_ignores_weekday_names() {
        let mut cfg = base_config();
        cfg.run.start_day = Some("Someday".into());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_cycle_config_validate() {
        let cfg = CycleConfig {
            cycle: Cycle::Weekly,
            start_weekday: Some(Weekday::Monday),
            expiry_weekday: None,
        };
        assert!(cfg.validate().is_err());
        assert!(CycleConfig::daily().validate().is_ok());
    }
}
