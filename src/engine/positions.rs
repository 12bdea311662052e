// 8.2 engine/positions.rs: open, close, and margin maintenance. dispatch
// mirrors the trade's relation to the existing position: same direction
// grows it, a smaller opposite order shrinks it pro rata, a larger one
// closes it and opens the residue fresh.

use super::core::ClearingEngine;
use super::margin::{close_direction, margin_ratio_of, notional_and_pnl, PnlMeasure};
use super::results::{EngineError, PositionChange};
use crate::custody::{Custody, CustodyError};
use crate::events::{
    EventPayload, MarginChangedEvent, PositionAdjustedEvent, PositionChangedEvent,
    ReserveSnapshotTakenEvent, SwapExecutedEvent,
};
use crate::fixed::{div_dn, mul_dn};
use crate::oracle::Oracle;
use crate::position::Position;
use crate::reserve::{FeeSink, ReserveFund};
use crate::types::{Direction, MarketId, Side, TraderId};
use crate::vamm::Fee;
use rust_decimal::Decimal;

impl<C, R, O, F> ClearingEngine<C, R, O, F>
where
    C: Custody,
    R: ReserveFund,
    O: Oracle,
    F: FeeSink,
{
    /// Open or adjust a position. Target notional is `margin · leverage`;
    /// toll and spread come out of the posted margin. `base_limit` bounds
    /// the base leg of the executed swap (0 disables).
    pub fn open_position(
        &mut self,
        trader: TraderId,
        market_id: MarketId,
        side: Side,
        margin_amount: Decimal,
        leverage: Decimal,
        base_limit: Decimal,
    ) -> Result<PositionChange, EngineError> {
        self.require_open_market(market_id)?;
        self.check_restriction(market_id)?;
        if margin_amount <= Decimal::ZERO {
            return Err(EngineError::InvalidMarginAmount);
        }
        if leverage < Decimal::ONE || leverage > self.config.max_leverage() {
            return Err(EngineError::InvalidLeverage);
        }

        let notional = mul_dn(margin_amount, leverage)?;
        let position = self.resolve_and_persist(market_id, trader)?;

        let same_direction = position.is_empty() || position.side() == Some(side);
        if same_direction {
            return self.increase_position(trader, market_id, side, position, margin_amount, notional, base_limit);
        }

        let (old_notional, spot_pnl) = {
            let market = self.market(market_id)?;
            notional_and_pnl(
                &market.vamm,
                &position,
                PnlMeasure::Spot,
                self.current_time,
                self.config.twap_interval_secs,
            )?
        };

        if notional < old_notional {
            self.reverse_partial(trader, market_id, position, notional, base_limit, spot_pnl)
        } else {
            self.reverse_close_and_open(
                trader, market_id, side, position, leverage, notional, base_limit, old_notional,
                spot_pnl,
            )
        }
    }

    /// Close the whole position at the spot price. Closing may override the
    /// fluctuation guard once; doing so restricts the market for the rest of
    /// the batch.
    pub fn close_position(
        &mut self,
        trader: TraderId,
        market_id: MarketId,
        quote_limit: Decimal,
    ) -> Result<PositionChange, EngineError> {
        self.require_open_market(market_id)?;
        self.check_restriction(market_id)?;

        let position = self.resolve_and_persist(market_id, trader)?;
        let side = position.side().ok_or(EngineError::NoPosition)?;

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
        let mut remain = position.margin + realized;
        if remain < Decimal::ZERO {
            return Err(EngineError::InsufficientMargin);
        }
        let fee = {
            let market = self.market(market_id)?;
            market.vamm.calc_fee(exchanged)?
        };
        remain -= fee.total();
        if remain < Decimal::ZERO {
            return Err(EngineError::InsufficientMargin);
        }

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
                quote_limit,
                true,
                now,
                batch,
            )?;
            if outcome.fluctuation_breached {
                market.restricted_batch = Some(batch);
            }
            market.open_interest_notional =
                (market.open_interest_notional - position.open_notional).max(Decimal::ZERO);
            (outcome, market.vamm.quote_reserve, market.vamm.base_reserve)
        };

        self.ledger.remove(market_id, trader);
        if remain > Decimal::ZERO {
            self.custody.transfer_out(trader, remain)?;
        }
        self.fee_sink.collect(fee.toll, fee.spread);

        tracing::debug!(
            market = market_id.0,
            trader = trader.0,
            %realized,
            "position closed"
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
            fee: fee.total(),
            size: Decimal::ZERO,
            margin: Decimal::ZERO,
            spot_price: outcome.spot_after,
        }));

        Ok(PositionChange {
            exchanged_quote: outcome.amount,
            exchanged_size: position.size.abs(),
            realized_pnl: realized,
            fee: fee.total(),
            size: Decimal::ZERO,
            margin: Decimal::ZERO,
        })
    }

    /// Add collateral to an existing position. Does not count as a
    /// position-changing action for restriction mode.
    pub fn add_margin(
        &mut self,
        trader: TraderId,
        market_id: MarketId,
        amount: Decimal,
    ) -> Result<(), EngineError> {
        self.require_open_market(market_id)?;
        if amount <= Decimal::ZERO {
            return Err(EngineError::InvalidMarginAmount);
        }

        let mut position = self.resolve_and_persist(market_id, trader)?;
        if position.is_empty() {
            return Err(EngineError::NoPosition);
        }

        let available = self.custody.balance_of(trader);
        if available < amount {
            return Err(EngineError::Custody(CustodyError::InsufficientBalance {
                requested: amount,
                available,
            }));
        }

        position.margin += amount;
        position.last_touched_batch = self.current_batch;
        self.ledger.put(market_id, trader, position);
        self.custody.transfer_in(trader, amount)?;

        self.emit(EventPayload::MarginChanged(MarginChangedEvent {
            market_id,
            trader,
            amount,
            funding_payment: Decimal::ZERO,
        }));
        Ok(())
    }

    /// Remove collateral. Funding is resolved first; the remaining margin
    /// must be non-negative and keep the favorable-PnL margin ratio at or
    /// above the initial requirement.
    pub fn remove_margin(
        &mut self,
        trader: TraderId,
        market_id: MarketId,
        amount: Decimal,
    ) -> Result<(), EngineError> {
        self.require_open_market(market_id)?;
        if amount <= Decimal::ZERO {
            return Err(EngineError::InvalidMarginAmount);
        }

        let stored_margin = self
            .ledger
            .raw(market_id, trader)
            .map(|p| p.margin)
            .unwrap_or(Decimal::ZERO);
        let mut position = self.resolve_and_persist(market_id, trader)?;
        if position.is_empty() {
            return Err(EngineError::NoPosition);
        }
        let funding_payment = stored_margin - position.margin;

        position.margin -= amount;
        if position.margin < Decimal::ZERO {
            return Err(EngineError::InsufficientMargin);
        }

        let ratio = {
            let market = self.market(market_id)?;
            margin_ratio_of(
                &market.vamm,
                &position,
                self.current_time,
                self.config.twap_interval_secs,
            )?
        };
        if ratio < self.config.init_margin_ratio {
            return Err(EngineError::MarginRatioTooLow);
        }

        position.last_touched_batch = self.current_batch;
        self.ledger.put(market_id, trader, position);
        self.custody.transfer_out(trader, amount)?;

        self.emit(EventPayload::MarginChanged(MarginChangedEvent {
            market_id,
            trader,
            amount: -amount,
            funding_payment,
        }));
        Ok(())
    }

    /// Resolve a trader's stored position (migration catch-up, then funding)
    /// and persist the advanced pointers. Resolution is lazy catch-up, not
    /// part of the calling action's effect, so it commits even when the
    /// action later rejects.
    pub(super) fn resolve_and_persist(
        &mut self,
        market_id: MarketId,
        trader: TraderId,
    ) -> Result<Position, EngineError> {
        let old_index = self
            .ledger
            .raw(market_id, trader)
            .map(|p| p.liquidity_history_index);
        let position = {
            let market = self.market(market_id)?;
            self.ledger.take_resolved(market_id, trader, &market.vamm)?
        };

        if let Some(old_index) = old_index {
            self.ledger.put(market_id, trader, position.clone());
            if old_index < position.liquidity_history_index {
                self.emit(EventPayload::PositionAdjusted(PositionAdjustedEvent {
                    market_id,
                    trader,
                    new_size: position.size,
                    old_liquidity_index: old_index,
                    new_liquidity_index: position.liquidity_history_index,
                }));
            }
        }
        Ok(position)
    }

    fn increase_position(
        &mut self,
        trader: TraderId,
        market_id: MarketId,
        side: Side,
        mut position: Position,
        margin_amount: Decimal,
        notional: Decimal,
        base_limit: Decimal,
    ) -> Result<PositionChange, EngineError> {
        let now = self.current_time;
        let batch = self.current_batch;

        let fee = {
            let market = self.market(market_id)?;
            market.vamm.calc_fee(notional)?
        };
        let margin_added = margin_amount - fee.total();
        if margin_added <= Decimal::ZERO {
            return Err(EngineError::InsufficientMargin);
        }

        {
            let market = self.market(market_id)?;
            if market.open_interest_cap > Decimal::ZERO
                && market.open_interest_notional + notional > market.open_interest_cap
            {
                return Err(EngineError::OverOpenInterestCap);
            }
        }

        let available = self.custody.balance_of(trader);
        if available < margin_amount {
            return Err(EngineError::Custody(CustodyError::InsufficientBalance {
                requested: margin_amount,
                available,
            }));
        }

        let direction = open_direction(side);
        let (outcome, quote_reserve, base_reserve) = {
            let market = self
                .markets
                .get_mut(&market_id)
                .ok_or(EngineError::MarketNotFound(market_id))?;
            let outcome =
                market.vamm.swap_input(direction, notional, base_limit, false, now, batch)?;
            market.open_interest_notional += notional;
            (outcome, market.vamm.quote_reserve, market.vamm.base_reserve)
        };

        position.size += side.sign() * outcome.amount;
        position.open_notional += notional;
        position.margin += margin_added;
        position.last_touched_batch = batch;

        self.ledger.put(market_id, trader, position.clone());
        self.custody.transfer_in(trader, margin_amount)?;
        self.fee_sink.collect(fee.toll, fee.spread);

        tracing::debug!(
            market = market_id.0,
            trader = trader.0,
            %side,
            %notional,
            "position increased"
        );
        self.emit(EventPayload::SwapExecuted(SwapExecutedEvent {
            market_id,
            direction,
            quote_amount: notional,
            base_amount: outcome.amount,
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
            exchanged_quote: notional,
            exchanged_size: outcome.amount,
            realized_pnl: Decimal::ZERO,
            fee: fee.total(),
            size: position.size,
            margin: position.margin,
            spot_price: outcome.spot_after,
        }));

        Ok(PositionChange {
            exchanged_quote: notional,
            exchanged_size: outcome.amount,
            realized_pnl: Decimal::ZERO,
            fee: fee.total(),
            size: position.size,
            margin: position.margin,
        })
    }

    /// Opposite-direction order smaller than the position: a partial close.
    fn reverse_partial(
        &mut self,
        trader: TraderId,
        market_id: MarketId,
        mut position: Position,
        notional: Decimal,
        base_limit: Decimal,
        spot_pnl: Decimal,
    ) -> Result<PositionChange, EngineError> {
        let now = self.current_time;
        let batch = self.current_batch;
        let side = position.side().ok_or(EngineError::NoPosition)?;
        // reducing a long removes quote from the pool, reducing a short adds it
        let direction = open_direction(side).opposite();

        let (fee, closed_size) = {
            let market = self.market(market_id)?;
            (
                market.vamm.calc_fee(notional)?,
                market.vamm.input_price(direction, notional)?,
            )
        };
        let fraction = div_dn(closed_size, position.size.abs())?;
        let realized = mul_dn(spot_pnl, fraction)?;

        let margin_after_pnl = position.margin + realized;
        if margin_after_pnl < Decimal::ZERO {
            return Err(EngineError::UnderwaterReduction);
        }
        let margin_after_fee = margin_after_pnl - fee.total();
        if margin_after_fee < Decimal::ZERO {
            return Err(EngineError::InsufficientMargin);
        }
        let notional_reduction = mul_dn(position.open_notional, fraction)?;

        let (outcome, quote_reserve, base_reserve) = {
            let market = self
                .markets
                .get_mut(&market_id)
                .ok_or(EngineError::MarketNotFound(market_id))?;
            let outcome =
                market.vamm.swap_input(direction, notional, base_limit, false, now, batch)?;
            market.open_interest_notional =
                (market.open_interest_notional - notional_reduction).max(Decimal::ZERO);
            (outcome, market.vamm.quote_reserve, market.vamm.base_reserve)
        };
        debug_assert_eq!(outcome.amount, closed_size);

        position.size -= side.sign() * closed_size;
        position.open_notional -= notional_reduction;
        position.margin = margin_after_fee;
        position.last_touched_batch = batch;

        self.ledger.put(market_id, trader, position.clone());
        self.fee_sink.collect(fee.toll, fee.spread);

        tracing::debug!(
            market = market_id.0,
            trader = trader.0,
            %realized,
            "position reduced"
        );
        self.emit(EventPayload::SwapExecuted(SwapExecutedEvent {
            market_id,
            direction,
            quote_amount: notional,
            base_amount: closed_size,
        }));
        self.emit(EventPayload::ReserveSnapshotTaken(ReserveSnapshotTakenEvent {
            market_id,
            quote_reserve,
            base_reserve,
        }));
        self.emit(EventPayload::PositionChanged(PositionChangedEvent {
            market_id,
            trader,
            side: side.opposite(),
            exchanged_quote: notional,
            exchanged_size: closed_size,
            realized_pnl: realized,
            fee: fee.total(),
            size: position.size,
            margin: position.margin,
            spot_price: outcome.spot_after,
        }));

        Ok(PositionChange {
            exchanged_quote: notional,
            exchanged_size: closed_size,
            realized_pnl: realized,
            fee: fee.total(),
            size: position.size,
            margin: position.margin,
        })
    }

    /// Opposite-direction order at least as large as the position: close it
    /// entirely, then open whatever notional is left over in the new
    /// direction. The open-interest cap is re-checked only on the net
    /// increase.
    #[allow(clippy::too_many_arguments)]
    fn reverse_close_and_open(
        &mut self,
        trader: TraderId,
        market_id: MarketId,
        new_side: Side,
        position: Position,
        leverage: Decimal,
        target_notional: Decimal,
        base_limit: Decimal,
        exchanged: Decimal,
        spot_pnl: Decimal,
    ) -> Result<PositionChange, EngineError> {
        let now = self.current_time;
        let batch = self.current_batch;
        let old_side = position.side().ok_or(EngineError::NoPosition)?;

        let mut remain = position.margin + spot_pnl;
        if remain < Decimal::ZERO {
            return Err(EngineError::UnderwaterReduction);
        }
        let (fee_close, fee_open, residual) = {
            let market = self.market(market_id)?;
            let residual = target_notional - exchanged;
            (
                market.vamm.calc_fee(exchanged)?,
                market.vamm.calc_fee(residual)?,
                residual,
            )
        };
        remain -= fee_close.total();
        if remain < Decimal::ZERO {
            return Err(EngineError::InsufficientMargin);
        }

        let (new_margin_required, new_margin) = if residual > Decimal::ZERO {
            let required = div_dn(residual, leverage)?;
            let after_fee = required - fee_open.total();
            if after_fee <= Decimal::ZERO {
                return Err(EngineError::InsufficientMargin);
            }
            (required, after_fee)
        } else {
            (Decimal::ZERO, Decimal::ZERO)
        };

        {
            let market = self.market(market_id)?;
            let oi_after = (market.open_interest_notional - position.open_notional
                + residual)
                .max(Decimal::ZERO);
            if market.open_interest_cap > Decimal::ZERO
                && oi_after > market.open_interest_notional
                && oi_after > market.open_interest_cap
            {
                return Err(EngineError::OverOpenInterestCap);
            }
        }

        let available = self.custody.balance_of(trader);
        if available + remain < new_margin_required {
            return Err(EngineError::Custody(CustodyError::InsufficientBalance {
                requested: new_margin_required,
                available: available + remain,
            }));
        }

        // two swaps commit together or not at all
        let close_dir = close_direction(old_side);
        let open_dir = open_direction(new_side);
        let (close_outcome, open_outcome, quote_reserve, base_reserve) = {
            let market = self
                .markets
                .get_mut(&market_id)
                .ok_or(EngineError::MarketNotFound(market_id))?;
            let rollback = market.vamm.clone();
            let result = (|| {
                let close_outcome = market.vamm.swap_output(
                    close_dir,
                    position.size.abs(),
                    Decimal::ZERO,
                    false,
                    now,
                    batch,
                )?;
                let open_outcome = if residual > Decimal::ZERO {
                    Some(market.vamm.swap_input(
                        open_dir, residual, base_limit, false, now, batch,
                    )?)
                } else {
                    None
                };
                Ok::<_, EngineError>((close_outcome, open_outcome))
            })();
            match result {
                Ok((close_outcome, open_outcome)) => {
                    market.open_interest_notional = (market.open_interest_notional
                        - position.open_notional
                        + residual)
                        .max(Decimal::ZERO);
                    (
                        close_outcome,
                        open_outcome,
                        market.vamm.quote_reserve,
                        market.vamm.base_reserve,
                    )
                }
                Err(err) => {
                    market.vamm = rollback;
                    return Err(err);
                }
            }
        };

        let new_size = open_outcome
            .map(|o| new_side.sign() * o.amount)
            .unwrap_or(Decimal::ZERO);
        let spot_after = open_outcome
            .map(|o| o.spot_after)
            .unwrap_or(close_outcome.spot_after);

        if new_size.is_zero() {
            self.ledger.remove(market_id, trader);
        } else {
            self.ledger.put(
                market_id,
                trader,
                Position {
                    market_id,
                    size: new_size,
                    margin: new_margin,
                    open_notional: residual,
                    last_premium_fraction: position.last_premium_fraction,
                    liquidity_history_index: position.liquidity_history_index,
                    last_touched_batch: batch,
                },
            );
        }

        if remain > Decimal::ZERO {
            self.custody.transfer_out(trader, remain)?;
        }
        if new_margin_required > Decimal::ZERO {
            self.custody.transfer_in(trader, new_margin_required)?;
        }
        self.fee_sink
            .collect(fee_close.toll + fee_open.toll, fee_close.spread + fee_open.spread);

        let fee_total = Fee {
            toll: fee_close.toll + fee_open.toll,
            spread: fee_close.spread + fee_open.spread,
        }
        .total();

        tracing::debug!(
            market = market_id.0,
            trader = trader.0,
            %spot_pnl,
            %residual,
            "position flipped"
        );
        self.emit(EventPayload::SwapExecuted(SwapExecutedEvent {
            market_id,
            direction: close_dir,
            quote_amount: close_outcome.amount,
            base_amount: position.size.abs(),
        }));
        if let Some(open_outcome) = open_outcome {
            self.emit(EventPayload::SwapExecuted(SwapExecutedEvent {
                market_id,
                direction: open_dir,
                quote_amount: residual,
                base_amount: open_outcome.amount,
            }));
        }
        self.emit(EventPayload::ReserveSnapshotTaken(ReserveSnapshotTakenEvent {
            market_id,
            quote_reserve,
            base_reserve,
        }));
        self.emit(EventPayload::PositionChanged(PositionChangedEvent {
            market_id,
            trader,
            side: new_side,
            exchanged_quote: close_outcome.amount + residual,
            exchanged_size: position.size.abs() + new_size.abs(),
            realized_pnl: spot_pnl,
            fee: fee_total,
            size: new_size,
            margin: new_margin,
            spot_price: spot_after,
        }));

        Ok(PositionChange {
            exchanged_quote: close_outcome.amount + residual,
            exchanged_size: position.size.abs() + new_size.abs(),
            realized_pnl: spot_pnl,
            fee: fee_total,
            size: new_size,
            margin: new_margin,
        })
    }
}

/// Opening a long adds quote to the pool; opening a short removes it.
pub(super) fn open_direction(side: Side) -> Direction {
    match side {
        Side::Long => Direction::AddToAmm,
        Side::Short => Direction::RemoveFromAmm,
    }
}
