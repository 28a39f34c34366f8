//! Replay command implementation with parallel multi-market support

use anyhow::{Context, Result};
use betsim::replay::{SimulationReport, Simulator};
use betsim::snapshot::RecordedAdapter;
use betsim::traders::{self, TraderSlot};
use betsim::{data, Config};
use indicatif::{ProgressBar, ProgressStyle};
use itertools::Itertools;
use rayon::prelude::*;
use std::path::PathBuf;
use tracing::{info, warn};

pub fn run(
    config_path: String,
    data_override: Option<String>,
    trader_override: Option<String>,
) -> Result<()> {
    info!("Starting replay");

    // Load configuration
    let mut config = Config::from_file(&config_path)?;
    info!("Loaded configuration from: {}", config_path);

    // Apply overrides
    if let Some(dir) = data_override {
        info!("Overriding data directory to: {}", dir);
        config.simulation.data_dir = dir;
    }

    if let Some(trader) = trader_override {
        info!("Overriding trader to: {}", trader);
        config.trader_name = trader;
    }

    // Fail fast on an unknown trader before touching any recordings
    traders::create_trader(&config)?;

    let recordings = data::find_recordings(&config.simulation.data_dir)?;
    if recordings.is_empty() {
        info!(
            "No recordings found in {}. Nothing to replay.",
            config.simulation.data_dir
        );
        return Ok(());
    }

    println!("\n{}", "=".repeat(60));
    println!("REPLAY SUMMARY");
    println!("{}", "=".repeat(60));
    println!("  Markets:    {}", recordings.len());
    println!("  Trader:     {}", config.trader_name);
    println!("  Commission: {:.2}%", config.simulation.commission * 100.0);
    println!("{}\n", "=".repeat(60));

    let pb = ProgressBar::new(recordings.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("⚡ {percent:>3}%|{bar:40}| {pos}/{len} [{elapsed}<{eta}] {msg}")
            .unwrap()
            .progress_chars("█░ "),
    );
    pb.tick();

    // One independent simulation per recording file
    let outcomes: Vec<(PathBuf, Result<SimulationReport>)> = recordings
        .par_iter()
        .map(|path| {
            let result = replay_one(path.clone(), &config);
            pb.inc(1);
            (path.clone(), result)
        })
        .collect();

    pb.finish_and_clear();

    let mut reports = Vec::new();
    for (path, outcome) in outcomes {
        match outcome {
            Ok(report) => reports.push(report),
            Err(e) => warn!("Skipping {}: {:#}", path.display(), e),
        }
    }

    print_reports(&reports);

    info!("Replay completed: {} of {} markets", reports.len(), recordings.len());

    Ok(())
}

fn replay_one(path: PathBuf, config: &Config) -> Result<SimulationReport> {
    let recording = data::load_recording(&path)?;

    let trader = traders::create_trader(config)?;
    let mut slots = vec![TraderSlot {
        user_id: config.simulation.trader_user_id,
        trader,
    }];

    let mut adapter = RecordedAdapter::new(recording.definition.market_id, recording.snapshots);
    let mut simulator = Simulator::new(
        recording.definition,
        config.simulation.synth_user_id,
        config.simulation.commission,
    );

    simulator
        .run(&mut adapter, &mut slots)
        .with_context(|| format!("Replay failed for {}", path.display()))
}

fn print_reports(reports: &[SimulationReport]) {
    if reports.is_empty() {
        println!("No markets replayed successfully.");
        return;
    }

    println!("\n{}", "=".repeat(100));
    println!("REPLAY RESULTS");
    println!("{}", "=".repeat(100));
    println!(
        "{:<10} {:<30} {:>10} {:>8} {:>6} {:>12} {:>12}",
        "Market", "Name", "Snapshots", "Events", "Bets", "Matched", "E[Profit]"
    );
    println!("{}", "-".repeat(100));

    let mut total_profit = 0.0;
    for report in reports
        .iter()
        .sorted_by(|a, b| a.market_id.cmp(&b.market_id))
    {
        for trader in &report.traders {
            total_profit += trader.expected_profit;
            println!(
                "{:<10} {:<30} {:>10} {:>8} {:>6} {:>12.2} {:>12.2}",
                report.market_id,
                report.market_name,
                report.snapshots_processed,
                report.events_synthesized,
                trader.bets_placed,
                trader.matched_volume,
                trader.expected_profit
            );
        }
    }

    println!("{}", "-".repeat(100));
    println!("Total expected profit: {:.2}", total_profit);
    println!("{}", "=".repeat(100));
}
