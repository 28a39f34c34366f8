//! Profit and exposure calculation
//!
//! Pure functions over a user's bets on one market. Only matched portions
//! count: unmatched volume carries no settlement exposure. All monetary
//! values are dimensionless and share whatever currency the bet sizes were
//! denominated in.

use std::collections::HashMap;

use crate::types::{BestPrices, Bet, BetType, Runner, RunnerId, SIZE_EPSILON};

/// Expected profit with its per-runner breakdown
#[derive(Debug, Clone, Default)]
pub struct MarketExpectedProfit {
    pub expected_profit: f64,
    /// Payout for the user if this runner wins
    pub runner_payouts: HashMap<RunnerId, f64>,
}

/// Payout for each possible winner given a set of bets.
///
/// For a back of matched size `m` at price `p` on the winning runner the
/// payout is `m * (p - 1)`; on a losing runner the stake `m` is gone. Lay
/// bets are the exact counterparty: `-m * (p - 1)` when the laid runner
/// wins, `+m` when it loses.
pub fn runner_payouts(bets: &[Bet], runners: &[Runner]) -> HashMap<RunnerId, f64> {
    let mut payouts: HashMap<RunnerId, f64> =
        runners.iter().map(|r| (r.runner_id, 0.0)).collect();

    for bet in bets {
        if bet.matched_size <= SIZE_EPSILON {
            continue;
        }
        let m = bet.matched_size;
        let p = bet.requested_price;
        for (&runner_id, payout) in payouts.iter_mut() {
            let wins = runner_id == bet.runner_id;
            *payout += match (bet.bet_type, wins) {
                (BetType::Back, true) => m * (p - 1.0),
                (BetType::Back, false) => -m,
                (BetType::Lay, true) => -m * (p - 1.0),
                (BetType::Lay, false) => m,
            };
        }
    }

    payouts
}

/// Win probabilities implied by current best prices.
///
/// Uses the reciprocal of the mid between best to-back and best to-lay
/// (or whichever side exists), normalized to sum to one. Runners with no
/// prices at all fall back to a uniform share of the residual mass only
/// when no runner is priced.
pub fn implied_probabilities(best_prices: &HashMap<RunnerId, BestPrices>) -> HashMap<RunnerId, f64> {
    let mut raw: HashMap<RunnerId, f64> = HashMap::new();

    for (&runner_id, best) in best_prices {
        let mid = match (best.to_back, best.to_lay) {
            (Some(b), Some(l)) => Some((b + l) / 2.0),
            (Some(b), None) => Some(b),
            (None, Some(l)) => Some(l),
            (None, None) => None,
        };
        let prob = mid.map(|price| 1.0 / price).unwrap_or(0.0);
        raw.insert(runner_id, prob);
    }

    let total: f64 = raw.values().sum();
    if total <= 0.0 {
        let uniform = 1.0 / best_prices.len().max(1) as f64;
        return best_prices.keys().map(|&id| (id, uniform)).collect();
    }

    raw.into_iter().map(|(id, p)| (id, p / total)).collect()
}

/// Probability-weighted profit over all outcomes, with exchange commission
/// charged on winnings only.
pub fn expected_profit(
    payouts: &HashMap<RunnerId, f64>,
    probabilities: &HashMap<RunnerId, f64>,
    commission: f64,
) -> f64 {
    payouts
        .iter()
        .map(|(runner_id, &payout)| {
            let prob = probabilities.get(runner_id).copied().unwrap_or(0.0);
            let net = if payout > 0.0 {
                payout * (1.0 - commission)
            } else {
                payout
            };
            prob * net
        })
        .sum()
}

/// Convenience wrapper computing the full breakdown in one call
pub fn market_expected_profit(
    bets: &[Bet],
    runners: &[Runner],
    best_prices: &HashMap<RunnerId, BestPrices>,
    commission: f64,
) -> MarketExpectedProfit {
    let runner_payouts = runner_payouts(bets, runners);
    let probabilities = implied_probabilities(best_prices);
    let expected = expected_profit(&runner_payouts, &probabilities, commission);

    MarketExpectedProfit {
        expected_profit: expected,
        runner_payouts,
    }
}
