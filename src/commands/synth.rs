//! Synth command implementation
//!
//! Dumps the order-flow events synthesized from a recording without
//! applying them to a matching engine. Useful for inspecting what a
//! replay would feed the market, one JSON event per line.

use anyhow::{Context, Result};
use betsim::snapshot::SnapshotStore;
use betsim::types::UserId;
use betsim::{data, delta, synth};
use tracing::info;

pub fn run(market_file: String, user_id: UserId) -> Result<()> {
    info!("Synthesizing events from: {}", market_file);

    let recording = data::load_recording(&market_file)?;
    let market_id = recording.definition.market_id;

    let mut store = SnapshotStore::new();
    let mut total = 0usize;

    for timed in &recording.snapshots {
        let previous = store.swap(market_id, timed.runner_id, timed.snapshot.clone());

        let prices_delta =
            delta::calculate_runner_prices_delta(&timed.snapshot.prices, &previous.prices);
        let traded_delta = delta::calculate_traded_volume_delta(
            &timed.snapshot.traded_volume,
            &previous.traded_volume,
        );
        let combined = delta::combine(&prices_delta, &traded_delta);
        let events = synth::calculate_market_events(user_id, market_id, timed.runner_id, &combined);

        for event in &events {
            let line = serde_json::to_string(event).context("Failed to serialize event")?;
            println!("{}", line);
        }
        total += events.len();
    }

    info!(
        "Synthesized {} events from {} snapshots",
        total,
        recording.snapshots.len()
    );

    Ok(())
}
