use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use vixband::config::AppConfig;
use vixband::market_data::UpstoxClient;
use vixband::persistence::CsvReportWriter;
use vixband::runner::run_backtest;

#[derive(Parser, Debug)]
#[command(
    name = "vixband",
    about = "Backtest volatility-implied price ranges against index closes"
)]
struct Cli {
    /// Extra config file layered above config/default and config/local
    #[arg(long)]
    config: Option<PathBuf>,

    /// Evaluation cycle: daily or weekly
    #[arg(long)]
    cycle: Option<String>,

    /// Anchor weekday for the weekly cycle
    #[arg(long)]
    start_day: Option<String>,

    /// Expiry weekday for the weekly cycle
    #[arg(long)]
    expiry_day: Option<String>,

    /// Output directory
    #[arg(long)]
    output: Option<String>,

    /// Emit JSON log lines
    #[arg(long, default_value_t = false)]
    json_logs: bool,
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    let mut config = AppConfig::load_with(cli.config.as_deref())?;
    if let Some(cycle) = cli.cycle {
        config.run.cycle = cycle;
    }
    if cli.start_day.is_some() {
        config.run.start_day = cli.start_day;
    }
    if cli.expiry_day.is_some() {
        config.run.expiry_day = cli.expiry_day;
    }
    if let Some(output) = cli.output {
        config.output.dir = output;
    }

    info!(config = %config, "🚀 Starting vixband");
    let plan = config.validate()?;

    let client = UpstoxClient::new(&config.provider)?;
    let mut writer = CsvReportWriter::new(&config.output.dir, plan.cycle.cycle)?;

    let summary = run_backtest(&client, &plan, &mut writer)
        .await
        .context("Backtest run failed")?;

    info!(
        output = %writer.root().display(),
        records = summary.classified,
        skipped = summary.skipped,
        categories = summary.streaks.len(),
        "✅ Per-weekday CSV and summary files generated"
    );

    Ok(())
}
