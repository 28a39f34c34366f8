//! Core data types used across the simulator

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Bet ID type - u64 for performance
pub type BetId = u64;

/// User (trader) ID type
pub type UserId = u64;

/// Market ID type
pub type MarketId = u64;

/// Runner ID type
pub type RunnerId = u64;

/// Lowest valid decimal price on the exchange tick ladder
pub const MIN_PRICE: f64 = 1.01;

/// Highest valid decimal price on the exchange tick ladder
pub const MAX_PRICE: f64 = 1000.0;

/// Sizes below this are treated as zero (floating point residue from matching)
pub const SIZE_EPSILON: f64 = 1e-8;

/// Check whether a price lies inside the valid exchange tick range
pub fn is_valid_price(price: f64) -> bool {
    price.is_finite() && (MIN_PRICE..=MAX_PRICE).contains(&price)
}

/// Bet side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BetType {
    /// Wager that the runner wins
    Back,
    /// Wager that the runner does not win (counterparty to a back)
    Lay,
}

impl BetType {
    /// The opposing side
    pub fn opposite(self) -> Self {
        match self {
            BetType::Back => BetType::Lay,
            BetType::Lay => BetType::Back,
        }
    }
}

impl std::fmt::Display for BetType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BetType::Back => write!(f, "BACK"),
            BetType::Lay => write!(f, "LAY"),
        }
    }
}

/// Matching state of a bet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BetStatus {
    /// Nothing matched yet
    Unmatched,
    /// Some but not all of the requested size is matched
    PartiallyMatched,
    /// The whole requested size is matched
    FullyMatched,
}

/// A single bet owned by one market.
///
/// Identity fields are fixed at placement; only the accounting fields
/// (`matched_size`, `unmatched_size`, `cancelled_size`) change afterwards.
/// `matched_size + unmatched_size + cancelled_size == requested_size` holds
/// at all times, and `matched_size` never decreases.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bet {
    pub bet_id: BetId,
    pub user_id: UserId,
    pub market_id: MarketId,
    pub runner_id: RunnerId,
    pub bet_type: BetType,
    /// Decimal odds the bet was placed at
    pub requested_price: f64,
    pub requested_size: f64,
    pub matched_size: f64,
    pub unmatched_size: f64,
    pub cancelled_size: f64,
}

impl Bet {
    /// Create a freshly placed, fully unmatched bet
    pub fn new(
        bet_id: BetId,
        user_id: UserId,
        market_id: MarketId,
        runner_id: RunnerId,
        bet_type: BetType,
        requested_price: f64,
        requested_size: f64,
    ) -> Self {
        Self {
            bet_id,
            user_id,
            market_id,
            runner_id,
            bet_type,
            requested_price,
            requested_size,
            matched_size: 0.0,
            unmatched_size: requested_size,
            cancelled_size: 0.0,
        }
    }

    /// Current matching state
    pub fn status(&self) -> BetStatus {
        if self.matched_size >= self.requested_size - SIZE_EPSILON {
            BetStatus::FullyMatched
        } else if self.matched_size > SIZE_EPSILON {
            BetStatus::PartiallyMatched
        } else {
            BetStatus::Unmatched
        }
    }

    /// Whether any unmatched size remains
    pub fn has_unmatched(&self) -> bool {
        self.unmatched_size > SIZE_EPSILON
    }

    /// Accounting invariant: matched + unmatched + cancelled == requested
    pub fn is_consistent(&self) -> bool {
        (self.matched_size + self.unmatched_size + self.cancelled_size - self.requested_size).abs()
            < 1e-6
    }
}

/// One selectable outcome within a market
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Runner {
    pub runner_id: RunnerId,
    pub runner_name: String,
}

/// Immutable market reference data, fixed at creation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketDefinition {
    pub market_id: MarketId,
    pub market_name: String,
    pub event_name: String,
    pub num_of_winners: u32,
    pub market_time: DateTime<Utc>,
    pub runners: Vec<Runner>,
}

/// Unmatched volume at one price on one runner.
///
/// Derived view, never stored: `total_unmatched_back` (resp. lay) sums the
/// unmatched sizes of all BACK (resp. LAY) bets at exactly this price.
/// Also the per-price row of an exchange snapshot; the components may be
/// negative when the row represents a delta between two snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunnerPrice {
    pub price: f64,
    pub total_unmatched_back: f64,
    pub total_unmatched_lay: f64,
}

impl RunnerPrice {
    pub fn new(price: f64, total_unmatched_back: f64, total_unmatched_lay: f64) -> Self {
        Self {
            price,
            total_unmatched_back,
            total_unmatched_lay,
        }
    }
}

/// Total volume ever matched at one price on one runner. Never decreases.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceTradedVolume {
    pub price: f64,
    pub total_matched_amount: f64,
}

impl PriceTradedVolume {
    pub fn new(price: f64, total_matched_amount: f64) -> Self {
        Self {
            price,
            total_matched_amount,
        }
    }
}

/// Best immediately-tradable price on each side of a runner.
///
/// `to_back` is the lowest resting LAY price, `to_lay` the highest resting
/// BACK price; `None` when no unmatched volume exists on that side.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BestPrices {
    pub to_back: Option<f64>,
    pub to_lay: Option<f64>,
}

/// Per-price combined delta between two snapshots of the same runner.
///
/// The traded-volume delta is folded into both channels, so `to_back` /
/// `to_lay` carry price-level change plus newly matched volume.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceDelta {
    pub price: f64,
    pub to_back: f64,
    pub to_lay: f64,
}

/// Synthetic order-flow event reconstructed from snapshot deltas.
///
/// Serializes to the wire shape consumed downstream:
/// `{"eventType":"PLACE_BET","userId":1,"betSize":7.0,"betPrice":1.9,
///   "betType":"LAY","marketId":100,"runnerId":10}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "eventType")]
pub enum MarketEvent {
    #[serde(rename = "PLACE_BET", rename_all = "camelCase")]
    PlaceBet {
        user_id: UserId,
        bet_size: f64,
        bet_price: f64,
        bet_type: BetType,
        market_id: MarketId,
        runner_id: RunnerId,
    },
    #[serde(rename = "CANCEL_BETS", rename_all = "camelCase")]
    CancelBets {
        user_id: UserId,
        bets_size: f64,
        bet_price: f64,
        bet_type: BetType,
        market_id: MarketId,
        runner_id: RunnerId,
    },
}
