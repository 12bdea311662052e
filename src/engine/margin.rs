// 8.1 engine/margin.rs: solvency math. pure queries shared by the read-only
// views and the mutating paths, so the two can never disagree about whether
// a position is healthy.

use super::core::ClearingEngine;
use super::results::EngineError;
use crate::custody::Custody;
use crate::fixed::{div_dn, mul_dn};
use crate::oracle::Oracle;
use crate::position::{realized_pnl, Position};
use crate::reserve::{FeeSink, ReserveFund};
use crate::types::{Direction, MarketId, Side, Timestamp, TraderId};
use crate::vamm::{Vamm, VammError};
use rust_decimal::Decimal;

/// Which price path values an open position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PnlMeasure {
    Spot,
    Twap,
}

/// Closing a long sells base into the pool; closing a short buys it back.
pub(super) fn close_direction(side: Side) -> Direction {
    match side {
        Side::Long => Direction::AddToAmm,
        Side::Short => Direction::RemoveFromAmm,
    }
}

/// Value a position's full close and the PnL that close would realize.
pub(super) fn notional_and_pnl(
    vamm: &Vamm,
    position: &Position,
    measure: PnlMeasure,
    now: Timestamp,
    twap_interval: i64,
) -> Result<(Decimal, Decimal), VammError> {
    let side = position.side().expect("caller checks for a live position");
    let direction = close_direction(side);
    let notional = match measure {
        PnlMeasure::Spot => vamm.output_price(direction, position.size.abs())?,
        PnlMeasure::Twap => {
            vamm.output_twap(direction, position.size.abs(), now, twap_interval)?
        }
    };
    Ok((notional, realized_pnl(side, position.open_notional, notional)))
}

/// The PnL measure least damaging to the trader: a liquidation decision is
/// never triggered by a one-batch price excursion alone.
pub(super) fn favorable_pnl(
    vamm: &Vamm,
    position: &Position,
    now: Timestamp,
    twap_interval: i64,
) -> Result<Decimal, VammError> {
    let (_, spot) = notional_and_pnl(vamm, position, PnlMeasure::Spot, now, twap_interval)?;
    let (_, twap) = notional_and_pnl(vamm, position, PnlMeasure::Twap, now, twap_interval)?;
    Ok(spot.max(twap))
}

/// (resolved margin + favorable PnL) / open notional.
pub(super) fn margin_ratio_of(
    vamm: &Vamm,
    position: &Position,
    now: Timestamp,
    twap_interval: i64,
) -> Result<Decimal, VammError> {
    let pnl = favorable_pnl(vamm, position, now, twap_interval)?;
    Ok(div_dn(position.margin + pnl, position.open_notional)?)
}

/// Collateral removable while the favorable-PnL margin ratio stays at or
/// above the initial requirement. Unrealized profit does not raise the
/// withdrawable amount past the margin itself.
pub(super) fn free_collateral_of(
    vamm: &Vamm,
    position: &Position,
    init_margin_ratio: Decimal,
    now: Timestamp,
    twap_interval: i64,
) -> Result<Decimal, VammError> {
    let pnl = favorable_pnl(vamm, position, now, twap_interval)?;
    let required = mul_dn(position.open_notional, init_margin_ratio)?;
    let free = (position.margin + pnl - required).min(position.margin);
    Ok(free.max(Decimal::ZERO))
}

impl<C, R, O, F> ClearingEngine<C, R, O, F>
where
    C: Custody,
    R: ReserveFund,
    O: Oracle,
    F: FeeSink,
{
    /// Close value and unrealized PnL of a trader's position under an
    /// explicit measure.
    pub fn position_notional_and_pnl(
        &self,
        market_id: MarketId,
        trader: TraderId,
        measure: PnlMeasure,
    ) -> Result<(Decimal, Decimal), EngineError> {
        let market = self.market(market_id)?;
        let position = self
            .ledger
            .resolved(market_id, trader, &market.vamm)?
            .filter(|p| !p.is_empty())
            .ok_or(EngineError::NoPosition)?;
        Ok(notional_and_pnl(
            &market.vamm,
            &position,
            measure,
            self.current_time,
            self.config.twap_interval_secs,
        )?)
    }

    /// Margin ratio under the favorable-PnL rule.
    pub fn margin_ratio(&self, market_id: MarketId, trader: TraderId) -> Result<Decimal, EngineError> {
        let market = self.market(market_id)?;
        let position = self
            .ledger
            .resolved(market_id, trader, &market.vamm)?
            .filter(|p| !p.is_empty())
            .ok_or(EngineError::NoPosition)?;
        Ok(margin_ratio_of(
            &market.vamm,
            &position,
            self.current_time,
            self.config.twap_interval_secs,
        )?)
    }

    /// How much margin `remove_margin` would let the trader take out right
    /// now.
    pub fn free_collateral(&self, market_id: MarketId, trader: TraderId) -> Result<Decimal, EngineError> {
        let market = self.market(market_id)?;
        let position = self
            .ledger
            .resolved(market_id, trader, &market.vamm)?
            .filter(|p| !p.is_empty())
            .ok_or(EngineError::NoPosition)?;
        Ok(free_collateral_of(
            &market.vamm,
            &position,
            self.config.init_margin_ratio,
            self.current_time,
            self.config.twap_interval_secs,
        )?)
    }
}
