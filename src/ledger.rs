// 4.1: the position ledger. every read and write goes through `resolve`,
// which first catches a stored position up with any liquidity migrations it
// slept through, then folds accrued funding into its margin. pure reads get a
// resolved copy; only writes persist the advanced pointers.

use crate::position::Position;
use crate::types::{Direction, MarketId, TraderId};
use crate::vamm::migration::base_size_across_curves;
use crate::vamm::{input_price_with_reserves, Vamm, VammError};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct PositionLedger {
    positions: HashMap<(MarketId, TraderId), Position>,
}

impl PositionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored state, untouched by resolution. Mostly useful for audits.
    pub fn raw(&self, market_id: MarketId, trader: TraderId) -> Option<&Position> {
        self.positions.get(&(market_id, trader))
    }

    /// Resolved view of a trader's position. The stored record is not
    /// modified.
    pub fn resolved(
        &self,
        market_id: MarketId,
        trader: TraderId,
        vamm: &Vamm,
    ) -> Result<Option<Position>, VammError> {
        match self.positions.get(&(market_id, trader)) {
            None => Ok(None),
            Some(stored) => {
                let mut position = stored.clone();
                resolve(&mut position, vamm)?;
                Ok(Some(position))
            }
        }
    }

    /// Resolved position for a write path, creating the empty record when the
    /// trader has none. The caller mutates the result and hands it back to
    /// `put` (or `remove`), which is what persists the advanced pointers.
    pub fn take_resolved(
        &self,
        market_id: MarketId,
        trader: TraderId,
        vamm: &Vamm,
    ) -> Result<Position, VammError> {
        match self.resolved(market_id, trader, vamm)? {
            Some(position) => Ok(position),
            None => Ok(Position::empty(
                market_id,
                vamm.latest_liquidity_index(),
                0,
            )),
        }
    }

    pub fn put(&mut self, market_id: MarketId, trader: TraderId, position: Position) {
        self.positions.insert((market_id, trader), position);
    }

    pub fn remove(&mut self, market_id: MarketId, trader: TraderId) {
        self.positions.remove(&(market_id, trader));
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// The resolution choke point: migration catch-up first, funding second.
/// Rescaling changes only `size`; migration realizes no PnL, so
/// `open_notional` is untouched. Funding changes only `margin`.
fn resolve(position: &mut Position, vamm: &Vamm) -> Result<(), VammError> {
    let latest = vamm.latest_liquidity_index();
    debug_assert!(position.liquidity_history_index <= latest);

    if position.liquidity_history_index < latest {
        if !position.size.is_zero() {
            let snapshot = vamm
                .liquidity_snapshot(position.liquidity_history_index)
                .expect("position index is bounded by snapshot history");
            // the snapshot curve predates every trade since; replay the net
            // quote flow onto it so the position is valued where that curve
            // would sit today, then re-express at the live depth
            let notional_delta = vamm.cumulative_notional() - snapshot.cumulative_notional;
            let (from_quote, from_base) = if notional_delta.is_zero() {
                (snapshot.quote_reserve, snapshot.base_reserve)
            } else {
                let direction = if notional_delta > Decimal::ZERO {
                    Direction::AddToAmm
                } else {
                    Direction::RemoveFromAmm
                };
                let base_moved = input_price_with_reserves(
                    direction,
                    notional_delta.abs(),
                    snapshot.quote_reserve,
                    snapshot.base_reserve,
                )?;
                match direction {
                    Direction::AddToAmm => (
                        snapshot.quote_reserve + notional_delta.abs(),
                        snapshot.base_reserve - base_moved,
                    ),
                    Direction::RemoveFromAmm => (
                        snapshot.quote_reserve - notional_delta.abs(),
                        snapshot.base_reserve + base_moved,
                    ),
                }
            };
            position.size = base_size_across_curves(
                position.size,
                from_quote,
                from_base,
                vamm.quote_reserve,
                vamm.base_reserve,
            )?;
        }
        position.liquidity_history_index = latest;
    }

    position.accrue_funding(vamm.funding.cumulative_premium_fraction)?;
    Ok(())
}
