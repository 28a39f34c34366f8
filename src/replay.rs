//! Replay driver
//!
//! Reconstructs a market from a snapshot stream and runs traders against
//! it. Each polled snapshot is diffed against the previous one, the delta
//! is synthesized into place/cancel events, the events are applied to the
//! matching engine, and every trader gets a callback with the updated
//! market. Strictly single-threaded per market; snapshots apply in
//! arrival order.

use thiserror::Error;
use tracing::{debug, info};

use crate::delta;
use crate::market::{Market, MarketError};
use crate::risk;
use crate::snapshot::{AdapterError, ExchangeAdapter, SnapshotStore, TimedRunnerSnapshot};
use crate::synth;
use crate::traders::{TraderContext, TraderSlot};
use crate::types::{BetId, MarketDefinition, MarketEvent, MarketId, UserId};

/// Replay failure: either the upstream feed broke or a synthesized event
/// was rejected by the engine (corrupt recording). Nothing is swallowed;
/// retry/skip policy belongs to the caller.
#[derive(Debug, Error)]
pub enum ReplayError {
    #[error(transparent)]
    Adapter(#[from] AdapterError),

    #[error("synthesized event rejected: {0}")]
    Market(#[from] MarketError),
}

/// Per-trader outcome of one simulation run
#[derive(Debug, Clone)]
pub struct TraderReport {
    pub user_id: UserId,
    pub trader_name: String,
    pub bets_placed: usize,
    pub matched_volume: f64,
    pub expected_profit: f64,
}

/// Outcome of replaying one market
#[derive(Debug, Clone)]
pub struct SimulationReport {
    pub market_id: MarketId,
    pub market_name: String,
    pub snapshots_processed: usize,
    pub events_synthesized: usize,
    pub traders: Vec<TraderReport>,
}

/// Drives one market through a recorded (or live) snapshot stream
pub struct Simulator {
    market: Market,
    store: SnapshotStore,
    synth_user_id: UserId,
    commission: f64,
    next_bet_id: BetId,
}

impl Simulator {
    pub fn new(definition: MarketDefinition, synth_user_id: UserId, commission: f64) -> Self {
        Self {
            market: Market::new(definition),
            store: SnapshotStore::new(),
            synth_user_id,
            commission,
            next_bet_id: 1,
        }
    }

    pub fn market(&self) -> &Market {
        &self.market
    }

    /// Diff one polled snapshot against the stored previous one,
    /// synthesize the order-flow events and apply them to the engine.
    /// Returns the applied events.
    pub fn process_snapshot(
        &mut self,
        polled: &TimedRunnerSnapshot,
    ) -> Result<Vec<MarketEvent>, MarketError> {
        let market_id = self.market.market_id();
        let previous = self
            .store
            .swap(market_id, polled.runner_id, polled.snapshot.clone());

        let prices_delta =
            delta::calculate_runner_prices_delta(&polled.snapshot.prices, &previous.prices);
        let traded_delta = delta::calculate_traded_volume_delta(
            &polled.snapshot.traded_volume,
            &previous.traded_volume,
        );
        let combined = delta::combine(&prices_delta, &traded_delta);
        let events =
            synth::calculate_market_events(self.synth_user_id, market_id, polled.runner_id, &combined);

        for event in &events {
            self.apply(event)?;
        }

        debug!(
            runner_id = polled.runner_id,
            events = events.len(),
            "Processed snapshot"
        );
        Ok(events)
    }

    fn apply(&mut self, event: &MarketEvent) -> Result<(), MarketError> {
        match *event {
            MarketEvent::PlaceBet {
                user_id,
                bet_size,
                bet_price,
                bet_type,
                runner_id,
                ..
            } => {
                let bet_id = self.next_bet_id;
                self.market
                    .place_bet(bet_id, user_id, bet_size, bet_price, bet_type, runner_id)?;
                self.next_bet_id += 1;
                Ok(())
            }
            MarketEvent::CancelBets {
                user_id,
                bets_size,
                bet_price,
                bet_type,
                runner_id,
                ..
            } => {
                // aggregated snapshots can shrink by more than we hold;
                // cancelling less than requested is the expected outcome
                self.market
                    .cancel_bets(user_id, bets_size, bet_price, bet_type, runner_id);
                Ok(())
            }
        }
    }

    /// Context for one trader callback
    pub fn trader_context(
        &mut self,
        user_id: UserId,
        time: chrono::DateTime<chrono::Utc>,
    ) -> TraderContext<'_> {
        TraderContext::new(
            user_id,
            time,
            self.commission,
            &mut self.market,
            &mut self.next_bet_id,
        )
    }

    /// Drain the adapter, applying every snapshot and invoking every
    /// trader after each one. Produces the final per-trader report.
    pub fn run(
        &mut self,
        adapter: &mut dyn ExchangeAdapter,
        traders: &mut [TraderSlot],
    ) -> Result<SimulationReport, ReplayError> {
        let market_time = self.market.definition().market_time;
        for slot in traders.iter_mut() {
            let mut ctx = self.trader_context(slot.user_id, market_time);
            slot.trader.init(&mut ctx);
        }

        let mut snapshots_processed = 0;
        let mut events_synthesized = 0;

        while let Some(polled) = adapter.poll()? {
            let events = self.process_snapshot(&polled)?;
            snapshots_processed += 1;
            events_synthesized += events.len();

            for slot in traders.iter_mut() {
                let mut ctx = self.trader_context(slot.user_id, polled.time);
                slot.trader.on_snapshot(&mut ctx);
            }
        }

        let report = self.report(traders, snapshots_processed, events_synthesized);
        info!(
            market_id = report.market_id,
            snapshots = snapshots_processed,
            events = events_synthesized,
            "Replay finished"
        );
        Ok(report)
    }

    fn report(
        &self,
        traders: &[TraderSlot],
        snapshots_processed: usize,
        events_synthesized: usize,
    ) -> SimulationReport {
        let definition = self.market.definition();
        let best_prices = self.market.get_all_best_prices();

        let trader_reports = traders
            .iter()
            .map(|slot| {
                let bets = self.market.get_bets(slot.user_id, false);
                let matched_volume = bets.iter().map(|b| b.matched_size).sum();
                let profit = risk::market_expected_profit(
                    &bets,
                    &definition.runners,
                    &best_prices,
                    self.commission,
                );
                TraderReport {
                    user_id: slot.user_id,
                    trader_name: slot.trader.name().to_string(),
                    bets_placed: bets.len(),
                    matched_volume,
                    expected_profit: profit.expected_profit,
                }
            })
            .collect();

        SimulationReport {
            market_id: definition.market_id,
            market_name: definition.market_name.clone(),
            snapshots_processed,
            events_synthesized,
            traders: trader_reports,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::{RecordedAdapter, RunnerSnapshot};
    use crate::types::{BetType, PriceTradedVolume, Runner, RunnerPrice};
    use approx::assert_relative_eq;
    use chrono::{Duration, Utc};

    const RUNNER: u64 = 10;

    fn definition() -> MarketDefinition {
        MarketDefinition {
            market_id: 100,
            market_name: "Match Odds".to_string(),
            event_name: "Home vs Away".to_string(),
            num_of_winners: 1,
            market_time: Utc::now(),
            runners: vec![Runner {
                runner_id: RUNNER,
                runner_name: "Home".to_string(),
            }],
        }
    }

    fn timed(offset_secs: i64, snapshot: RunnerSnapshot) -> TimedRunnerSnapshot {
        TimedRunnerSnapshot {
            time: Utc::now() + Duration::seconds(offset_secs),
            runner_id: RUNNER,
            snapshot,
        }
    }

    #[test]
    fn test_first_snapshot_seeds_the_book() {
        let mut sim = Simulator::new(definition(), 1, 0.05);

        // 5 available to back at 1.9 appears from nothing: the delta is
        // the full snapshot and the synthesized event is a LAY placement
        let events = sim
            .process_snapshot(&timed(
                0,
                RunnerSnapshot {
                    prices: vec![RunnerPrice::new(1.9, 5.0, 0.0)],
                    traded_volume: vec![],
                },
            ))
            .unwrap();

        assert_eq!(events.len(), 1);
        assert!(matches!(
            events[0],
            MarketEvent::PlaceBet {
                bet_type: BetType::Lay,
                ..
            }
        ));

        let prices = sim.market().get_runner_prices(RUNNER).unwrap();
        assert_eq!(prices.len(), 1);
        assert_relative_eq!(prices[0].total_unmatched_lay, 5.0);
    }

    #[test]
    fn test_replayed_trade_reproduces_traded_volume() {
        let mut sim = Simulator::new(definition(), 1, 0.05);

        sim.process_snapshot(&timed(
            0,
            RunnerSnapshot {
                prices: vec![RunnerPrice::new(1.9, 5.0, 0.0)],
                traded_volume: vec![],
            },
        ))
        .unwrap();

        // next poll: level grew to 7 and 5 traded at 1.9. The combined
        // delta (7, 5) becomes LAY 7 then BACK 5; the back crosses the
        // resting lay volume and the engine's traded volume matches the
        // exchange's.
        sim.process_snapshot(&timed(
            30,
            RunnerSnapshot {
                prices: vec![RunnerPrice::new(1.9, 7.0, 0.0)],
                traded_volume: vec![PriceTradedVolume::new(1.9, 5.0)],
            },
        ))
        .unwrap();

        let traded = sim.market().get_runner_traded_volume(RUNNER).unwrap();
        assert_eq!(traded.len(), 1);
        assert_relative_eq!(traded[0].price, 1.9);
        assert_relative_eq!(traded[0].total_matched_amount, 5.0);
    }

    #[test]
    fn test_identical_snapshots_are_idempotent() {
        let mut sim = Simulator::new(definition(), 1, 0.05);
        let snapshot = RunnerSnapshot {
            prices: vec![RunnerPrice::new(2.0, 3.0, 4.0)],
            traded_volume: vec![PriceTradedVolume::new(2.0, 1.0)],
        };

        let first = sim.process_snapshot(&timed(0, snapshot.clone())).unwrap();
        assert!(!first.is_empty());
        let second = sim.process_snapshot(&timed(30, snapshot)).unwrap();
        assert!(second.is_empty());
    }

    #[test]
    fn test_run_reports_trader_outcomes() {
        #[derive(Debug)]
        struct TakeEverything;
        impl crate::traders::Trader for TakeEverything {
            fn name(&self) -> &'static str {
                "take_everything"
            }
            fn on_snapshot(&mut self, ctx: &mut TraderContext) {
                let best = ctx.best_prices(RUNNER).unwrap();
                if let Some(price) = best.to_back {
                    ctx.place_bet(1.0, price, BetType::Back, RUNNER).unwrap();
                }
            }
        }

        let mut adapter = RecordedAdapter::new(
            100,
            vec![timed(
                0,
                RunnerSnapshot {
                    prices: vec![RunnerPrice::new(1.9, 5.0, 0.0)],
                    traded_volume: vec![],
                },
            )],
        );
        let mut traders = vec![TraderSlot {
            user_id: 100,
            trader: Box::new(TakeEverything),
        }];

        let mut sim = Simulator::new(definition(), 1, 0.05);
        let report = sim.run(&mut adapter, &mut traders).unwrap();

        assert_eq!(report.snapshots_processed, 1);
        assert_eq!(report.events_synthesized, 1);
        assert_eq!(report.traders.len(), 1);
        assert_eq!(report.traders[0].trader_name, "take_everything");
        assert_eq!(report.traders[0].bets_placed, 1);
        assert_relative_eq!(report.traders[0].matched_volume, 1.0);
    }

    #[test]
    fn test_adapter_failure_propagates() {
        struct BrokenAdapter;
        impl ExchangeAdapter for BrokenAdapter {
            fn market_id(&self) -> MarketId {
                100
            }
            fn poll(&mut self) -> Result<Option<TimedRunnerSnapshot>, AdapterError> {
                Err(AdapterError::Unavailable {
                    reason: "market suspended".to_string(),
                })
            }
        }

        let mut sim = Simulator::new(definition(), 1, 0.05);
        let result = sim.run(&mut BrokenAdapter, &mut []);
        assert!(matches!(result, Err(ReplayError::Adapter(_))));
    }

    #[test]
    fn test_corrupt_recording_surfaces_market_error() {
        let mut sim = Simulator::new(definition(), 1, 0.05);

        // price outside the tick ladder must not be clamped
        let result = sim.process_snapshot(&timed(
            0,
            RunnerSnapshot {
                prices: vec![RunnerPrice::new(1.0, 5.0, 0.0)],
                traded_volume: vec![],
            },
        ));
        assert!(matches!(result, Err(MarketError::InvalidBetPrice(_))));
    }
}
