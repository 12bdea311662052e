// 4.0: per-trader position record. size is signed base exposure, margin is
// quote collateral, open_notional is the quote value locked at trade time.
// size == 0 is the canonical empty state.

use crate::fixed::{checked_sub, MathError};
use crate::types::{MarketId, Side};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub market_id: MarketId,
    pub size: Decimal,
    pub margin: Decimal,
    pub open_notional: Decimal,
    /// Cumulative premium fraction at the last funding accrual.
    pub last_premium_fraction: Decimal,
    /// Index into the market's liquidity snapshot history. Monotone
    /// non-decreasing; advanced lazily by resolution.
    pub liquidity_history_index: usize,
    pub last_touched_batch: u64,
}

impl Position {
    pub fn empty(market_id: MarketId, liquidity_history_index: usize, batch: u64) -> Self {
        Self {
            market_id,
            size: Decimal::ZERO,
            margin: Decimal::ZERO,
            open_notional: Decimal::ZERO,
            last_premium_fraction: Decimal::ZERO,
            liquidity_history_index,
            last_touched_batch: batch,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.size.is_zero()
    }

    pub fn side(&self) -> Option<Side> {
        Side::of_size(self.size)
    }

    /// What this position owes for funding since its last accrual. Positive
    /// premium fraction with a long position means the long pays.
    pub fn funding_payment(&self, cumulative_premium_fraction: Decimal) -> Decimal {
        self.size * (cumulative_premium_fraction - self.last_premium_fraction)
    }

    /// Fold accrued funding into margin and advance the pointer.
    pub fn accrue_funding(
        &mut self,
        cumulative_premium_fraction: Decimal,
    ) -> Result<Decimal, MathError> {
        let payment = self.funding_payment(cumulative_premium_fraction);
        self.margin = checked_sub(self.margin, payment)?;
        self.last_premium_fraction = cumulative_premium_fraction;
        Ok(payment)
    }
}

/// PnL realized by closing `open_notional` worth of entry exposure against
/// `exchanged_notional` of exit value. Longs profit when the exit leg is
/// worth more than entry, shorts when it is worth less.
pub fn realized_pnl(side: Side, open_notional: Decimal, exchanged_notional: Decimal) -> Decimal {
    match side {
        Side::Long => exchanged_notional - open_notional,
        Side::Short => open_notional - exchanged_notional,
    }
}
