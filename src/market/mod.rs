//! In-memory betting-exchange market with bet matching
//!
//! One [`Market`] owns the complete bet ledger for a single exchange market
//! and enforces the matching semantics: back/lay crossing with
//! price-then-time priority, execution at the resting bet's price, and
//! permanent traded-volume accounting. All views (runner prices, best
//! prices, traded volume) are derived from the ledger on demand.

mod book;

pub use book::RunnerBook;

use std::collections::HashMap;

use ordered_float::OrderedFloat;
use thiserror::Error;
use tracing::debug;

use crate::types::{
    is_valid_price, BestPrices, Bet, BetId, BetType, MarketDefinition, MarketId, RunnerId,
    RunnerPrice, UserId, MAX_PRICE, MIN_PRICE, SIZE_EPSILON,
};

/// Errors surfaced by market commands. Invalid input is never clamped.
#[derive(Debug, Error, PartialEq)]
pub enum MarketError {
    #[error("invalid bet size {0}: must be positive")]
    InvalidBetSize(f64),

    #[error("invalid bet price {0}: must be within {MIN_PRICE}..={MAX_PRICE}")]
    InvalidBetPrice(f64),

    #[error("unknown runner {0}")]
    UnknownRunner(RunnerId),

    #[error("duplicate bet id {0}")]
    DuplicateBetId(BetId),

    #[error("bet {0} not found")]
    BetNotFound(BetId),
}

/// A single market: reference data plus the owned bet ledger and per-runner
/// books. Bets are created by [`Market::place_bet`], mutated in place by
/// matching and cancellation, and never deleted.
pub struct Market {
    definition: MarketDefinition,

    /// Every bet ever placed, fast lookup by id
    bets: HashMap<BetId, Bet>,

    /// Bet ids in placement order (the matching and cancellation tie-break)
    placement_order: Vec<BetId>,

    /// Unmatched queues and traded volume per runner
    books: HashMap<RunnerId, RunnerBook>,
}

impl Market {
    /// Create an empty market from its immutable definition
    pub fn new(definition: MarketDefinition) -> Self {
        let books = definition
            .runners
            .iter()
            .map(|r| (r.runner_id, RunnerBook::new()))
            .collect();

        Self {
            definition,
            bets: HashMap::new(),
            placement_order: Vec::new(),
            books,
        }
    }

    pub fn market_id(&self) -> MarketId {
        self.definition.market_id
    }

    pub fn definition(&self) -> &MarketDefinition {
        &self.definition
    }

    /// Place a bet and immediately match it against the opposing side.
    ///
    /// Eligible counterparties are consumed best crossing price first,
    /// earliest placement first within a level. Each match executes at the
    /// resting bet's price and is recorded against that price in the traded
    /// volume. Any remainder rests unmatched at the incoming bet's own
    /// price. Effects are observable only through subsequent queries.
    pub fn place_bet(
        &mut self,
        bet_id: BetId,
        user_id: UserId,
        bet_size: f64,
        bet_price: f64,
        bet_type: BetType,
        runner_id: RunnerId,
    ) -> Result<(), MarketError> {
        if !(bet_size > 0.0) || !bet_size.is_finite() {
            return Err(MarketError::InvalidBetSize(bet_size));
        }
        if !is_valid_price(bet_price) {
            return Err(MarketError::InvalidBetPrice(bet_price));
        }
        if !self.books.contains_key(&runner_id) {
            return Err(MarketError::UnknownRunner(runner_id));
        }
        if self.bets.contains_key(&bet_id) {
            return Err(MarketError::DuplicateBetId(bet_id));
        }

        let market_id = self.definition.market_id;
        let book = self
            .books
            .get_mut(&runner_id)
            .expect("runner validated above");

        let resting_side = bet_type.opposite();
        let mut remaining = bet_size;

        while remaining > SIZE_EPSILON {
            let Some((resting_price, resting_id)) = book.best_crossing(bet_type, bet_price) else {
                break;
            };

            let resting = self
                .bets
                .get_mut(&resting_id)
                .expect("queued bet exists in the ledger");

            let take = remaining.min(resting.unmatched_size);
            resting.matched_size += take;
            resting.unmatched_size -= take;
            if !resting.has_unmatched() {
                // fold float residue into the matched side
                resting.matched_size = resting.requested_size - resting.cancelled_size;
                resting.unmatched_size = 0.0;
                book.pop_front(resting_side, resting_price);
            }
            debug_assert!(resting.is_consistent());

            book.record_trade(resting_price, take);
            remaining -= take;

            debug!(
                bet_id,
                counterparty = resting_id,
                price = resting_price,
                size = take,
                "Matched"
            );
        }

        let mut bet = Bet::new(
            bet_id,
            user_id,
            market_id,
            runner_id,
            bet_type,
            bet_price,
            bet_size,
        );
        if remaining > SIZE_EPSILON {
            bet.matched_size = bet_size - remaining;
            bet.unmatched_size = remaining;
            book.rest(bet_type, bet_price, bet_id);
        } else {
            bet.matched_size = bet_size;
            bet.unmatched_size = 0.0;
        }
        debug_assert!(bet.is_consistent());

        self.bets.insert(bet_id, bet);
        self.placement_order.push(bet_id);
        Ok(())
    }

    /// Cancel the entire unmatched remainder of one bet.
    ///
    /// The matched portion is untouched and permanent. Returns the amount
    /// cancelled, 0 when the bet was already fully matched.
    pub fn cancel_bet(&mut self, bet_id: BetId) -> Result<f64, MarketError> {
        let bet = self
            .bets
            .get_mut(&bet_id)
            .ok_or(MarketError::BetNotFound(bet_id))?;

        if !bet.has_unmatched() {
            return Ok(0.0);
        }

        let cancelled = bet.unmatched_size;
        bet.cancelled_size += cancelled;
        bet.unmatched_size = 0.0;
        debug_assert!(bet.is_consistent());

        let (side, price, runner_id) = (bet.bet_type, bet.requested_price, bet.runner_id);
        self.books
            .get_mut(&runner_id)
            .expect("bet runner has a book")
            .remove(side, price, bet_id);

        debug!(bet_id, size = cancelled, "Cancelled bet remainder");
        Ok(cancelled)
    }

    /// Cancel up to `bets_size` of unmatched volume, oldest placed first,
    /// from `user_id`'s bets at exactly `(bet_price, bet_type, runner_id)`.
    ///
    /// Returns the amount actually cancelled, 0 when nothing matches.
    /// A partially cancelled bet keeps its queue position.
    pub fn cancel_bets(
        &mut self,
        user_id: UserId,
        bets_size: f64,
        bet_price: f64,
        bet_type: BetType,
        runner_id: RunnerId,
    ) -> f64 {
        let Some(book) = self.books.get_mut(&runner_id) else {
            return 0.0;
        };

        let mut remaining = bets_size;
        let mut total_cancelled = 0.0;

        for bet_id in book.level_ids(bet_type, bet_price) {
            if remaining <= SIZE_EPSILON {
                break;
            }
            let bet = self
                .bets
                .get_mut(&bet_id)
                .expect("queued bet exists in the ledger");
            if bet.user_id != user_id {
                continue;
            }

            let take = remaining.min(bet.unmatched_size);
            bet.unmatched_size -= take;
            bet.cancelled_size += take;
            if !bet.has_unmatched() {
                bet.cancelled_size = bet.requested_size - bet.matched_size;
                bet.unmatched_size = 0.0;
                book.remove(bet_type, bet_price, bet_id);
            }
            debug_assert!(bet.is_consistent());

            remaining -= take;
            total_cancelled += take;
        }

        if total_cancelled > 0.0 {
            debug!(
                user_id,
                price = bet_price,
                side = %bet_type,
                size = total_cancelled,
                "Cancelled bets"
            );
        }
        total_cancelled
    }

    /// All prices with non-zero unmatched volume on a runner, with the
    /// unmatched back and lay totals at each price. No ordering contract.
    pub fn get_runner_prices(&self, runner_id: RunnerId) -> Result<Vec<RunnerPrice>, MarketError> {
        let book = self
            .books
            .get(&runner_id)
            .ok_or(MarketError::UnknownRunner(runner_id))?;

        let mut levels: std::collections::BTreeMap<OrderedFloat<f64>, (f64, f64)> =
            std::collections::BTreeMap::new();

        for (price, ids) in book.levels(BetType::Back) {
            let total: f64 = ids.iter().map(|id| self.bets[id].unmatched_size).sum();
            levels.entry(OrderedFloat(price)).or_default().0 += total;
        }
        for (price, ids) in book.levels(BetType::Lay) {
            let total: f64 = ids.iter().map(|id| self.bets[id].unmatched_size).sum();
            levels.entry(OrderedFloat(price)).or_default().1 += total;
        }

        Ok(levels
            .into_iter()
            .filter(|(_, (back, lay))| *back > SIZE_EPSILON || *lay > SIZE_EPSILON)
            .map(|(price, (back, lay))| RunnerPrice::new(price.0, back, lay))
            .collect())
    }

    /// Best immediately-tradable price on each side of one runner
    pub fn get_best_prices(&self, runner_id: RunnerId) -> Result<BestPrices, MarketError> {
        let book = self
            .books
            .get(&runner_id)
            .ok_or(MarketError::UnknownRunner(runner_id))?;
        Ok(BestPrices {
            to_back: book.best_price_to_back(),
            to_lay: book.best_price_to_lay(),
        })
    }

    /// Best prices for every runner in the market
    pub fn get_all_best_prices(&self) -> HashMap<RunnerId, BestPrices> {
        self.books
            .iter()
            .map(|(&runner_id, book)| {
                (
                    runner_id,
                    BestPrices {
                        to_back: book.best_price_to_back(),
                        to_lay: book.best_price_to_lay(),
                    },
                )
            })
            .collect()
    }

    /// All prices with non-zero matched amount on a runner
    pub fn get_runner_traded_volume(
        &self,
        runner_id: RunnerId,
    ) -> Result<Vec<crate::types::PriceTradedVolume>, MarketError> {
        self.books
            .get(&runner_id)
            .map(|book| book.traded_volume())
            .ok_or(MarketError::UnknownRunner(runner_id))
    }

    /// A user's bets in placement order; `matched_only` restricts the
    /// result to bets with matched size above zero.
    pub fn get_bets(&self, user_id: UserId, matched_only: bool) -> Vec<Bet> {
        self.placement_order
            .iter()
            .map(|id| &self.bets[id])
            .filter(|bet| bet.user_id == user_id)
            .filter(|bet| !matched_only || bet.matched_size > SIZE_EPSILON)
            .cloned()
            .collect()
    }

    /// Look up a single bet by id
    pub fn get_bet(&self, bet_id: BetId) -> Option<&Bet> {
        self.bets.get(&bet_id)
    }

    /// Number of bets ever placed on this market
    pub fn bet_count(&self) -> usize {
        self.bets.len()
    }
}
