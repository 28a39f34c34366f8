//! Per-runner unmatched-bet book with price-time priority
//!
//! Uses BTreeMap for price-sorted storage and VecDeque for FIFO ordering.
//! The book holds bet IDs only; bet records live in the market's ledger.

use crate::types::{BetId, BetType, PriceTradedVolume, SIZE_EPSILON};
use ordered_float::OrderedFloat;
use std::collections::{BTreeMap, VecDeque};

/// Price-time queues of unmatched bets for one runner, plus the traded
/// volume ever matched on that runner.
///
/// Invariant: every queued bet has unmatched size above [`SIZE_EPSILON`];
/// exhausted bets are removed immediately and empty levels dropped.
#[derive(Debug, Default)]
pub struct RunnerBook {
    /// Unmatched BACK bets by price, FIFO within a level
    back_bets: BTreeMap<OrderedFloat<f64>, VecDeque<BetId>>,

    /// Unmatched LAY bets by price, FIFO within a level
    lay_bets: BTreeMap<OrderedFloat<f64>, VecDeque<BetId>>,

    /// Total matched amount per price, monotonically non-decreasing
    traded: BTreeMap<OrderedFloat<f64>, f64>,
}

impl RunnerBook {
    pub fn new() -> Self {
        Self::default()
    }

    fn queue(&self, side: BetType) -> &BTreeMap<OrderedFloat<f64>, VecDeque<BetId>> {
        match side {
            BetType::Back => &self.back_bets,
            BetType::Lay => &self.lay_bets,
        }
    }

    fn queue_mut(&mut self, side: BetType) -> &mut BTreeMap<OrderedFloat<f64>, VecDeque<BetId>> {
        match side {
            BetType::Back => &mut self.back_bets,
            BetType::Lay => &mut self.lay_bets,
        }
    }

    /// Rest an unmatched bet at its own price, behind earlier arrivals
    pub fn rest(&mut self, side: BetType, price: f64, bet_id: BetId) {
        self.queue_mut(side)
            .entry(OrderedFloat(price))
            .or_default()
            .push_back(bet_id);
    }

    /// Remove one bet from its level, dropping the level when it empties
    pub fn remove(&mut self, side: BetType, price: f64, bet_id: BetId) {
        let queue = self.queue_mut(side);
        if let Some(level) = queue.get_mut(&OrderedFloat(price)) {
            level.retain(|&id| id != bet_id);
            if level.is_empty() {
                queue.remove(&OrderedFloat(price));
            }
        }
    }

    /// Best resting counterparty for an incoming bet.
    ///
    /// An incoming BACK at price P crosses LAY bets priced <= P, lowest
    /// price first; an incoming LAY at P crosses BACK bets priced >= P,
    /// highest first. Within a level the front of the queue (earliest
    /// placement) wins. Returns the resting price and bet id.
    pub fn best_crossing(&self, incoming: BetType, price: f64) -> Option<(f64, BetId)> {
        let (level_price, level) = match incoming {
            BetType::Back => self.lay_bets.range(..=OrderedFloat(price)).next()?,
            BetType::Lay => self.back_bets.range(OrderedFloat(price)..).next_back()?,
        };
        level.front().map(|&id| (level_price.0, id))
    }

    /// Pop the front bet of a level after it got fully matched
    pub fn pop_front(&mut self, side: BetType, price: f64) {
        let queue = self.queue_mut(side);
        if let Some(level) = queue.get_mut(&OrderedFloat(price)) {
            level.pop_front();
            if level.is_empty() {
                queue.remove(&OrderedFloat(price));
            }
        }
    }

    /// Record a match executed at the resting bet's price
    pub fn record_trade(&mut self, price: f64, size: f64) {
        *self.traded.entry(OrderedFloat(price)).or_insert(0.0) += size;
    }

    /// Bet IDs resting at exactly this price on one side, oldest first
    pub fn level_ids(&self, side: BetType, price: f64) -> Vec<BetId> {
        self.queue(side)
            .get(&OrderedFloat(price))
            .map(|level| level.iter().copied().collect())
            .unwrap_or_default()
    }

    /// All (price, bet ids) levels on one side, ascending by price
    pub fn levels(&self, side: BetType) -> impl Iterator<Item = (f64, &VecDeque<BetId>)> {
        self.queue(side).iter().map(|(p, q)| (p.0, q))
    }

    /// Lowest resting LAY price: the best price a new back bet trades at
    pub fn best_price_to_back(&self) -> Option<f64> {
        self.lay_bets.keys().next().map(|p| p.0)
    }

    /// Highest resting BACK price: the best price a new lay bet trades at
    pub fn best_price_to_lay(&self) -> Option<f64> {
        self.back_bets.keys().next_back().map(|p| p.0)
    }

    /// All prices with non-zero matched amount
    pub fn traded_volume(&self) -> Vec<PriceTradedVolume> {
        self.traded
            .iter()
            .filter(|(_, &amount)| amount > SIZE_EPSILON)
            .map(|(price, &amount)| PriceTradedVolume::new(price.0, amount))
            .collect()
    }
}
