// 8.3 engine/liquidations.rs: liquidation. eligibility is judged with the
// favorable PnL measure so a one-batch excursion alone cannot trigger it;
// execution happens at the actual spot price with the fluctuation override.
// the two price paths are deliberately distinct.

use super::core::ClearingEngine;
use super::margin::{close_direction, margin_ratio_of, notional_and_pnl, PnlMeasure};
use super::results::{EngineError, LiquidationOutcome};
use crate::custody::Custody;
use crate::events::{
    EventPayload, PositionChangedEvent, PositionLiquidatedEvent, ReserveSnapshotTakenEvent,
    SwapExecutedEvent,
};
use crate::fixed::mul_dn;
use crate::oracle::Oracle;
use crate::reserve::{FeeSink, ReserveFund};
use crate::types::{MarketId, TraderId};
use rust_decimal::Decimal;

impl<C, R, O, F> ClearingEngine<C, R, O, F>
where
    C: Custody,
    R: ReserveFund,
    O: Oracle,
    F: FeeSink,
{
    /// Liquidate an undercollateralized position. The caller is paid
    /// `executed notional · liquidation_fee_ratio`; any deficit against the
    /// remaining margin, bad debt included, is covered by the reserve fund
    /// and any surplus is returned to it.
    pub fn liquidate(
        &mut self,
        liquidator: TraderId,
        market_id: MarketId,
        trader: TraderId,
    ) -> Result<LiquidationOutcome, EngineError> {
        self.require_open_market(market_id)?;
        self.check_restriction(market_id)?;

        let position = self.resolve_and_persist(market_id, trader)?;
        let side = position.side().ok_or(EngineError::NoPosition)?;

        let ratio = {
            let market = self.market(market_id)?;
            margin_ratio_of(
                &market.vamm,
                &position,
                self.current_time,
                self.config.twap_interval_secs,
            )?
        };
        if ratio >= self.config.maintenance_margin_ratio {
            return Err(EngineError::MarginRatioAboveRequirement);
        }

        // executed at spot, not at the favorable measure used above
        let (exchanged, realized) = {
            let market = self.market(market_id)?;
            notional_and_pnl(
                &market.vamm,
                &position,
                PnlMeasure::Spot,
                self.current_time,
                self.config.twap_interval_secs,
            )?
        };
        let remain = position.margin + realized;
        let reward = mul_dn(exchanged, self.config.liquidation_fee_ratio)?;

        let now = self.current_time;
        let batch = self.current_batch;
        let (outcome, quote_reserve, base_reserve) = {
            let market = self
                .markets
                .get_mut(&market_id)
                .ok_or(EngineError::MarketNotFound(market_id))?;
            let outcome = market.vamm.swap_output(
                close_direction(side),
                position.size.abs(),
                Decimal::ZERO,
                true,
                now,
                batch,
            )?;
            // a liquidation always restricts the market for the rest of the batch
            market.restricted_batch = Some(batch);
            market.open_interest_notional =
                (market.open_interest_notional - position.open_notional).max(Decimal::ZERO);
            (outcome, market.vamm.quote_reserve, market.vamm.base_reserve)
        };

        self.ledger.remove(market_id, trader);

        let bad_debt = if remain < Decimal::ZERO {
            -remain
        } else {
            Decimal::ZERO
        };
        if remain >= reward {
            self.reserve_fund.receive_surplus(remain - reward);
        } else {
            self.reserve_fund.cover_shortfall(reward - remain);
        }
        if reward > Decimal::ZERO {
            self.custody.transfer_out(liquidator, reward)?;
        }

        tracing::info!(
            market = market_id.0,
            trader = trader.0,
            liquidator = liquidator.0,
            %ratio,
            %bad_debt,
            "position liquidated"
        );
        self.emit(EventPayload::SwapExecuted(SwapExecutedEvent {
            market_id,
            direction: close_direction(side),
            quote_amount: outcome.amount,
            base_amount: position.size.abs(),
        }));
        self.emit(EventPayload::ReserveSnapshotTaken(ReserveSnapshotTakenEvent {
            market_id,
            quote_reserve,
            base_reserve,
        }));
        self.emit(EventPayload::PositionChanged(PositionChangedEvent {
            market_id,
            trader,
            side,
            exchanged_quote: outcome.amount,
            exchanged_size: position.size.abs(),
            realized_pnl: realized,
            fee: reward,
            size: Decimal::ZERO,
            margin: Decimal::ZERO,
            spot_price: outcome.spot_after,
        }));
        self.emit(EventPayload::PositionLiquidated(PositionLiquidatedEvent {
            market_id,
            trader,
            liquidator,
            size: position.size,
            notional: exchanged,
            fee: reward,
            bad_debt,
        }));

        Ok(LiquidationOutcome {
            liquidated_size: position.size,
            exchanged_quote: exchanged,
            liquidator_reward: reward,
            bad_debt,
            realized_pnl: realized,
        })
    }
}
