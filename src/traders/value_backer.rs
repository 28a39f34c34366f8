//! Back-when-price-clears-threshold trader

use anyhow::{Context as _, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{Trader, TraderContext};
use crate::types::{BetType, RunnerId};
use crate::Config;

/// Configuration for [`ValueBackerTrader`]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValueBackerConfig {
    /// Runner to back; the market's first runner when unset
    pub runner_id: Option<RunnerId>,
    /// Only back when the best price to back is at least this
    pub min_price: f64,
    /// Stake per bet
    pub stake: f64,
    /// Stop after this many placed bets
    pub max_bets: usize,
}

impl Default for ValueBackerConfig {
    fn default() -> Self {
        Self {
            runner_id: None,
            min_price: 2.0,
            stake: 2.0,
            max_bets: 10,
        }
    }
}

/// Backs one runner whenever the best available back price clears a
/// configured threshold, up to a bet budget. Deliberately simple: it
/// exists to exercise the full place/match/report loop, not to make money.
#[derive(Debug)]
pub struct ValueBackerTrader {
    config: ValueBackerConfig,
    runner_id: Option<RunnerId>,
    bets_placed: usize,
}

pub fn create(config: &Config) -> Result<Box<dyn Trader>> {
    let trader_config: ValueBackerConfig = if config.trader.is_null() {
        ValueBackerConfig::default()
    } else {
        serde_json::from_value(config.trader.clone())
            .context("Failed to parse value_backer trader config")?
    };

    Ok(Box::new(ValueBackerTrader {
        runner_id: trader_config.runner_id,
        config: trader_config,
        bets_placed: 0,
    }))
}

impl Trader for ValueBackerTrader {
    fn name(&self) -> &'static str {
        "value_backer"
    }

    fn init(&mut self, ctx: &mut TraderContext) {
        if self.runner_id.is_none() {
            self.runner_id = ctx.runners().first().map(|r| r.runner_id);
        }
    }

    fn on_snapshot(&mut self, ctx: &mut TraderContext) {
        if self.bets_placed >= self.config.max_bets {
            return;
        }
        let Some(runner_id) = self.runner_id else {
            return;
        };
        let Ok(best) = ctx.best_prices(runner_id) else {
            return;
        };
        let Some(to_back) = best.to_back else {
            return;
        };

        if to_back >= self.config.min_price {
            match ctx.place_bet(self.config.stake, to_back, BetType::Back, runner_id) {
                Ok(bet_id) => {
                    self.bets_placed += 1;
                    debug!(bet_id, price = to_back, stake = self.config.stake, "Backed");
                }
                Err(error) => {
                    tracing::warn!(%error, "Back bet rejected");
                }
            }
        }
    }
}
