use anyhow::anyhow;
use clap::{Parser, Subcommand};
use std::sync::Arc;

use crate::config::{AppConfig, EnvCredential};
use crate::server::{self, AppState};
use crate::services::insights::{AchievementRules, StatsReport};
use crate::services::{Aggregator, HttpUpstream, StatsGateway};
use crate::types::GatewayError;

/// WakaTime stats gateway for a portfolio site
#[derive(Parser)]
#[command(name = "wakastats")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP gateway (default)
    Serve {
        /// Listen address, overrides WAKASTATS_BIND
        #[arg(long)]
        bind: Option<String>,
    },

    /// Fetch the last 7 days once and print the report
    Stats {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        let mut config = AppConfig::from_env();
        let achievements = match &config.achievements_path {
            Some(path) => AchievementRules::load(path)?,
            None => AchievementRules::default(),
        };
        let gateway = StatsGateway::new(Arc::new(HttpUpstream::new()?), &config.api_base_url);

        match self.command {
            None => serve(config, gateway, achievements).await,
            Some(Commands::Serve { bind }) => {
                if let Some(bind) = bind {
                    config.bind_addr = bind;
                }
                serve(config, gateway, achievements).await
            }
            Some(Commands::Stats { json }) => {
                let week = gateway
                    .fetch_week(&EnvCredential)
                    .await
                    .map_err(describe)?;
                let totals = Aggregator::aggregate(&week);
                let report = StatsReport::build(&totals, &achievements);

                if json {
                    println!("{}", serde_json::to_string_pretty(&report)?);
                } else {
                    print_report(&report);
                }
                Ok(())
            }
        }
    }
}

async fn serve(
    config: AppConfig,
    gateway: StatsGateway,
    achievements: AchievementRules,
) -> anyhow::Result<()> {
    let state = Arc::new(AppState {
        gateway,
        credentials: Arc::new(EnvCredential),
        achievements,
    });
    server::run(&config, state).await
}

fn describe(err: GatewayError) -> anyhow::Error {
    match err.hint() {
        Some(hint) => anyhow!("{} ({})", err, hint),
        None => anyhow!(err),
    }
}

fn print_report(report: &StatsReport) {
    println!("Total coding time  {}", report.total_text);
    println!("Daily average      {}", report.daily_average_text);
    println!("Productivity       {}", report.productivity);
    println!("Top language       {}", report.top_language);
    println!("Favorite editor    {}", report.top_editor);

    for breakdown in &report.breakdowns {
        println!();
        println!("{} ({} items)", breakdown.label, breakdown.item_count);
        if breakdown.entries.is_empty() {
            println!("  No data available");
        }
        for entry in &breakdown.entries {
            println!(
                "  {:<24} {:>8} {:>7}",
                entry.name, entry.duration, entry.percentage
            );
        }
    }

    let unlocked: Vec<&str> = report
        .achievements
        .iter()
        .filter(|a| a.unlocked)
        .map(|a| a.label.as_str())
        .collect();
    println!();
    println!(
        "Achievements       {}/{} {}",
        unlocked.len(),
        report.achievements.len(),
        unlocked.join(", ")
    );
}
