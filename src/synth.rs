//! Synthetic order-flow reconstruction
//!
//! Individual bets are never observed on the external exchange, only
//! aggregated price-level snapshots. This module turns a combined snapshot
//! delta into a plausible discrete stream of place/cancel events that,
//! replayed through the matching engine, reproduces the observed aggregate
//! movement.

use crate::types::{BetType, MarketEvent, MarketId, PriceDelta, RunnerId, UserId, SIZE_EPSILON};

/// Synthesize the event stream for one runner from its combined delta list.
///
/// Emits all events derived from the to-back channel first, then all from
/// the to-lay channel. A positive delta at a price becomes a `PLACE_BET`
/// of the opposite resting side: growth in to-back volume means new LAY
/// liquidity appeared (to-back volume is what someone could back against),
/// so the event is a LAY placement, and symmetrically for to-lay growth.
/// A negative delta becomes a `CANCEL_BETS` of the absolute size with the
/// same side mapping; a zero delta produces nothing.
pub fn calculate_market_events(
    user_id: UserId,
    market_id: MarketId,
    runner_id: RunnerId,
    deltas: &[PriceDelta],
) -> Vec<MarketEvent> {
    let mut events = Vec::new();

    for delta in deltas {
        push_channel_event(
            &mut events,
            user_id,
            market_id,
            runner_id,
            delta.price,
            delta.to_back,
            BetType::Lay,
        );
    }
    for delta in deltas {
        push_channel_event(
            &mut events,
            user_id,
            market_id,
            runner_id,
            delta.price,
            delta.to_lay,
            BetType::Back,
        );
    }

    events
}

fn push_channel_event(
    events: &mut Vec<MarketEvent>,
    user_id: UserId,
    market_id: MarketId,
    runner_id: RunnerId,
    bet_price: f64,
    delta: f64,
    bet_type: BetType,
) {
    if delta > SIZE_EPSILON {
        events.push(MarketEvent::PlaceBet {
            user_id,
            bet_size: delta,
            bet_price,
            bet_type,
            market_id,
            runner_id,
        });
    } else if delta < -SIZE_EPSILON {
        events.push(MarketEvent::CancelBets {
            user_id,
            bets_size: -delta,
            bet_price,
            bet_type,
            market_id,
            runner_id,
        });
    }
}
