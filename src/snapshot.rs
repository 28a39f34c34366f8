//! Exchange snapshots and the adapter seam
//!
//! The simulator never talks to the exchange itself; it consumes typed
//! snapshots from an [`ExchangeAdapter`]. The [`SnapshotStore`] retains
//! exactly one previous snapshot per (market, runner) so deltas are always
//! computed against the value being replaced.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

use crate::types::{MarketId, PriceTradedVolume, RunnerId, RunnerPrice};

/// Point-in-time aggregated state of one runner: price levels plus traded
/// volume. Replaced wholesale on each poll.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunnerSnapshot {
    pub prices: Vec<RunnerPrice>,
    pub traded_volume: Vec<PriceTradedVolume>,
}

/// A runner snapshot with its poll timestamp, as recorded from the exchange
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimedRunnerSnapshot {
    pub time: DateTime<Utc>,
    pub runner_id: RunnerId,
    #[serde(flatten)]
    pub snapshot: RunnerSnapshot,
}

/// Failure of the upstream exchange feed, e.g. a suspended or closed
/// market. Transient from the simulator's point of view; retry policy
/// belongs to the caller, never to the core.
#[derive(Debug, Error, PartialEq)]
pub enum AdapterError {
    #[error("exchange unavailable: {reason}")]
    Unavailable { reason: String },
}

/// Source of timed runner snapshots for one market.
///
/// Live polling adapters are external collaborators; the in-crate
/// implementation replays a recording. `poll` yields snapshots in recorded
/// order and `Ok(None)` once the stream is exhausted.
pub trait ExchangeAdapter {
    fn market_id(&self) -> MarketId;

    fn poll(&mut self) -> Result<Option<TimedRunnerSnapshot>, AdapterError>;
}

/// Adapter over an in-memory sequence of recorded snapshots
pub struct RecordedAdapter {
    market_id: MarketId,
    snapshots: std::vec::IntoIter<TimedRunnerSnapshot>,
}

impl RecordedAdapter {
    pub fn new(market_id: MarketId, snapshots: Vec<TimedRunnerSnapshot>) -> Self {
        Self {
            market_id,
            snapshots: snapshots.into_iter(),
        }
    }
}

impl ExchangeAdapter for RecordedAdapter {
    fn market_id(&self) -> MarketId {
        self.market_id
    }

    fn poll(&mut self) -> Result<Option<TimedRunnerSnapshot>, AdapterError> {
        Ok(self.snapshots.next())
    }
}

/// Holds the previous snapshot per (market, runner) for delta computation.
/// Replacing a snapshot is atomic with respect to the delta: `swap` hands
/// back the old value and installs the new one in a single call.
#[derive(Debug, Default)]
pub struct SnapshotStore {
    previous: HashMap<(MarketId, RunnerId), RunnerSnapshot>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `new` as the retained snapshot and return the one it
    /// replaces; an empty snapshot when the runner was never polled.
    pub fn swap(
        &mut self,
        market_id: MarketId,
        runner_id: RunnerId,
        new: RunnerSnapshot,
    ) -> RunnerSnapshot {
        self.previous
            .insert((market_id, runner_id), new)
            .unwrap_or_default()
    }

    /// Read-only view of the retained snapshot, if any
    pub fn previous(&self, market_id: MarketId, runner_id: RunnerId) -> Option<&RunnerSnapshot> {
        self.previous.get(&(market_id, runner_id))
    }
}
