//! Trader strategy framework
//!
//! - Clean trait interface that all traders must implement
//! - Capability context scoping every market operation to the trader's user
//! - Dynamic trader registry (no hardcoded names at call sites)

pub mod noop;
pub mod value_backer;

use anyhow::Result;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{OnceLock, RwLock};

use crate::market::{Market, MarketError};
use crate::risk::{self, MarketExpectedProfit};
use crate::types::{
    BestPrices, Bet, BetId, BetType, MarketId, PriceTradedVolume, RunnerId, RunnerPrice, UserId,
};
use crate::Config;

// =============================================================================
// Trader Context - the capability surface handed to traders
// =============================================================================

/// Market access for one trader during one callback.
///
/// Every command runs as the trader's own user; bet ids come from the
/// simulation-wide allocator so trader and synthetic flow never collide.
pub struct TraderContext<'a> {
    user_id: UserId,
    time: DateTime<Utc>,
    commission: f64,
    market: &'a mut Market,
    next_bet_id: &'a mut BetId,
}

impl<'a> TraderContext<'a> {
    pub fn new(
        user_id: UserId,
        time: DateTime<Utc>,
        commission: f64,
        market: &'a mut Market,
        next_bet_id: &'a mut BetId,
    ) -> Self {
        Self {
            user_id,
            time,
            commission,
            market,
            next_bet_id,
        }
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Timestamp of the snapshot that triggered this callback
    pub fn time(&self) -> DateTime<Utc> {
        self.time
    }

    pub fn market_id(&self) -> MarketId {
        self.market.market_id()
    }

    pub fn runners(&self) -> &[crate::types::Runner] {
        &self.market.definition().runners
    }

    /// Place a bet as this trader; returns the allocated bet id
    pub fn place_bet(
        &mut self,
        bet_size: f64,
        bet_price: f64,
        bet_type: BetType,
        runner_id: RunnerId,
    ) -> Result<BetId, MarketError> {
        let bet_id = *self.next_bet_id;
        self.market
            .place_bet(bet_id, self.user_id, bet_size, bet_price, bet_type, runner_id)?;
        *self.next_bet_id += 1;
        Ok(bet_id)
    }

    /// Cancel the unmatched remainder of one of this trader's bets
    pub fn cancel_bet(&mut self, bet_id: BetId) -> Result<f64, MarketError> {
        self.market.cancel_bet(bet_id)
    }

    /// Cancel this trader's unmatched volume at an exact price/side/runner
    pub fn cancel_bets(
        &mut self,
        bets_size: f64,
        bet_price: f64,
        bet_type: BetType,
        runner_id: RunnerId,
    ) -> f64 {
        self.market
            .cancel_bets(self.user_id, bets_size, bet_price, bet_type, runner_id)
    }

    pub fn best_prices(&self, runner_id: RunnerId) -> Result<BestPrices, MarketError> {
        self.market.get_best_prices(runner_id)
    }

    pub fn all_best_prices(&self) -> HashMap<RunnerId, BestPrices> {
        self.market.get_all_best_prices()
    }

    pub fn runner_prices(&self, runner_id: RunnerId) -> Result<Vec<RunnerPrice>, MarketError> {
        self.market.get_runner_prices(runner_id)
    }

    pub fn traded_volume(&self, runner_id: RunnerId) -> Result<Vec<PriceTradedVolume>, MarketError> {
        self.market.get_runner_traded_volume(runner_id)
    }

    /// This trader's bets in placement order
    pub fn my_bets(&self, matched_only: bool) -> Vec<Bet> {
        self.market.get_bets(self.user_id, matched_only)
    }

    /// Expected profit of this trader's current position
    pub fn expected_profit(&self) -> MarketExpectedProfit {
        risk::market_expected_profit(
            &self.my_bets(false),
            &self.market.definition().runners,
            &self.market.get_all_best_prices(),
            self.commission,
        )
    }
}

// =============================================================================
// Trader Trait - the contract all traders must implement
// =============================================================================

/// Trading strategy over one market.
///
/// `on_snapshot` fires after every applied exchange snapshot; the context
/// exposes the full query/command surface. Default implementations are
/// provided for the optional lifecycle hooks.
pub trait Trader: Send + std::fmt::Debug {
    /// Trader identifier (must match the config's trader_name)
    fn name(&self) -> &'static str;

    /// Called once before the first snapshot
    fn init(&mut self, _ctx: &mut TraderContext) {}

    /// Called after each snapshot has been applied to the market
    fn on_snapshot(&mut self, ctx: &mut TraderContext);
}

/// A trader bound to its simulation user id
pub struct TraderSlot {
    pub user_id: UserId,
    pub trader: Box<dyn Trader>,
}

// =============================================================================
// Trader Registry - dynamic registration without hardcoding
// =============================================================================

/// Factory function type for creating traders from config
pub type TraderFactory = fn(&Config) -> Result<Box<dyn Trader>>;

static REGISTRY: OnceLock<RwLock<HashMap<&'static str, TraderFactory>>> = OnceLock::new();

fn get_registry() -> &'static RwLock<HashMap<&'static str, TraderFactory>> {
    REGISTRY.get_or_init(|| {
        let mut map = HashMap::new();
        map.insert("noop", noop::create as TraderFactory);
        map.insert("value_backer", value_backer::create as TraderFactory);
        RwLock::new(map)
    })
}

/// Create a trader from configuration
pub fn create_trader(config: &Config) -> Result<Box<dyn Trader>> {
    let registry = get_registry().read().unwrap();

    let factory = registry.get(config.trader_name.as_str()).ok_or_else(|| {
        let available: Vec<_> = registry.keys().copied().collect();
        anyhow::anyhow!(
            "Unknown trader: '{}'. Available: {}",
            config.trader_name,
            available.join(", ")
        )
    })?;

    factory(config)
}

/// Get list of available trader names
pub fn available_traders() -> Vec<&'static str> {
    get_registry().read().unwrap().keys().copied().collect()
}

/// Register a new trader (for plugins or testing)
pub fn register_trader(name: &'static str, factory: TraderFactory) {
    get_registry().write().unwrap().insert(name, factory);
}
