//! Betting Exchange Simulator
//!
//! A backtesting system for betting exchange markets. It combines a
//! price-time priority matching engine for back and lay bets with a
//! snapshot-delta synthesizer that reconstructs the order flow implied
//! by a stream of recorded exchange snapshots, so traders can be run
//! against historical markets as if they were live.
//!
//! ## Replay Example
//! ```no_run
//! use betsim::replay::Simulator;
//! use betsim::snapshot::RecordedAdapter;
//! use betsim::{data, traders, Config};
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = Config::default();
//!     let recording = data::load_recording("marketdata/12345.json")?;
//!
//!     let mut adapter = RecordedAdapter::new(recording.definition.market_id, recording.snapshots);
//!     let mut slots = vec![traders::TraderSlot {
//!         user_id: config.simulation.trader_user_id,
//!         trader: traders::create_trader(&config)?,
//!     }];
//!
//!     let mut simulator = Simulator::new(
//!         recording.definition,
//!         config.simulation.synth_user_id,
//!         config.simulation.commission,
//!     );
//!     let report = simulator.run(&mut adapter, &mut slots)?;
//!     println!("Matched {:.2}", report.traders[0].matched_volume);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod data;
pub mod delta;
pub mod market;
pub mod replay;
pub mod risk;
pub mod snapshot;
pub mod synth;
pub mod traders;
pub mod types;

pub use config::Config;
pub use market::{Market, MarketError};
pub use replay::{SimulationReport, Simulator};
pub use snapshot::{ExchangeAdapter, SnapshotStore};
pub use traders::Trader;
pub use types::*;
