use std::path::PathBuf;

use anyhow::Result;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use costanomaly::config::AppConfig;

#[derive(Parser)]
#[command(
    name = "costanomaly",
    about = "Daily cloud cost anomaly detection for Azure subscriptions",
    version,
    long_about = None
)]
struct Cli {
    /// Configuration file (falls back to /etc/costanomaly/costanomaly.toml)
    #[arg(long, global = true, env = "COSTANOMALY_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one detection now
    Run {
        /// Day to check (YYYY-MM-DD); defaults to the configured days back from today
        #[arg(long)]
        day: Option<NaiveDate>,

        /// JSON output for machine parsing
        #[arg(long)]
        json: bool,
    },

    /// Start the daemon (scheduler + status API)
    Serve,

    /// Inspect the detection schedule
    Schedule {
        #[command(subcommand)]
        action: ScheduleAction,
    },

    /// Resolve a lookback period expression into days
    Period {
        /// Expression such as "3 months" or "90 days"
        expr: String,
    },
}

#[derive(Subcommand)]
enum ScheduleAction {
    /// Preview what will run in the next N hours
    DryRun {
        /// Hours to preview
        #[arg(long, default_value = "24")]
        hours: u64,
    },
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if config.logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::resolve(cli.config.as_deref())?;
    init_tracing(&config);

    match cli.command {
        Commands::Run { day, json } => {
            let http = costanomaly::run::http_client()?;
            let summary = costanomaly::run::run_detection(&config, &http, day).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                println!(
                    "\nCost anomaly detection for {} ({} days of history)",
                    summary.day_checked, summary.period_days
                );
                println!("{:<45} | {:<6} | {:>12}", "Resource Type", "Kind", "Cost");
                println!("{:-<45}-|-{:-<6}-|-{:->12}", "", "", "");
                for alert in &summary.alerts {
                    println!(
                        "{:<45} | {:<6} | {:>12.2}",
                        alert.category,
                        alert.kind.to_string(),
                        alert.amount
                    );
                }
                if summary.alerts.is_empty() {
                    println!("No anomalies detected.");
                }
                if !summary.not_enough_values.is_empty() {
                    println!("\nNot enough history: {}", summary.not_enough_values.join(", "));
                }
                for failed in &summary.failed_categories {
                    println!("Failed: {} ({})", failed.category, failed.error);
                }
                println!();
            }
        }
        Commands::Serve => {
            tracing::info!(cron = %config.schedule.cron, "Starting costanomaly daemon");
            costanomaly::serve(config).await?;
        }
        Commands::Schedule { action } => match action {
            ScheduleAction::DryRun { hours } => {
                let trigger = costanomaly::scheduler::DailyTrigger::new(&config.schedule.cron)?;
                let preview = trigger.preview(&chrono::Utc::now(), hours);
                if preview.is_empty() {
                    println!("No runs scheduled in next {} hours.", hours);
                } else {
                    println!("Upcoming runs (next {} hours):", hours);
                    for time in preview {
                        println!("{}", time.to_rfc3339());
                    }
                }
            }
        },
        Commands::Period { expr } => {
            println!("{}", costanomaly::detect::period::parse_period_days(&expr));
        }
    }

    Ok(())
}
