// 3.3: liquidity depth migration. both reserves scale by the multiplier so
// spot price is untouched; outstanding exposure is re-expressed at the new
// depth through the same curve math the swaps use, so aggregate notional is
// preserved and no PnL is ever realized by the move itself.

use super::snapshots::LiquiditySnapshot;
use super::{input_price_with_reserves, output_price_with_reserves, Vamm, VammError};
use crate::fixed::{checked_add, checked_sub, mul_dn};
use crate::types::{Direction, Timestamp};
use rust_decimal::Decimal;

/// Re-express a signed base size from one curve onto another: value the
/// position's closing leg on the `from` reserves, then invert that closing
/// trade on the `to` reserves. The result is the size whose close at the new
/// depth yields the same notional, so the move itself carries no PnL.
pub fn base_size_across_curves(
    size: Decimal,
    from_quote: Decimal,
    from_base: Decimal,
    to_quote: Decimal,
    to_base: Decimal,
) -> Result<Decimal, VammError> {
    if size.is_zero() {
        return Ok(Decimal::ZERO);
    }
    let long = size > Decimal::ZERO;
    let close_direction = if long {
        Direction::AddToAmm
    } else {
        Direction::RemoveFromAmm
    };
    let notional =
        output_price_with_reserves(close_direction, size.abs(), from_quote, from_base)?;
    // a long's close adds base and removes quote, so its inverse pulls the
    // notional back out of the quote side; symmetric for shorts
    let invert_direction = if long {
        Direction::RemoveFromAmm
    } else {
        Direction::AddToAmm
    };
    let new_abs = input_price_with_reserves(invert_direction, notional, to_quote, to_base)?;
    Ok(if long { new_abs } else { -new_abs })
}

impl Vamm {
    /// Scale both reserves by `multiplier` and append a liquidity snapshot.
    /// The aggregate position size is re-derived at the new depth, and the
    /// funding-period volume counter absorbs the negative of the size delta
    /// so the migration never looks like organic volume.
    pub fn migrate_liquidity(
        &mut self,
        multiplier: Decimal,
        now: Timestamp,
        batch: u64,
    ) -> Result<LiquiditySnapshot, VammError> {
        if multiplier == Decimal::ONE || multiplier <= Decimal::ZERO {
            return Err(VammError::InvalidMigrationMultiplier);
        }

        let old_quote = self.quote_reserve;
        let old_base = self.base_reserve;
        let new_quote = mul_dn(old_quote, multiplier)?;
        let new_base = mul_dn(old_base, multiplier)?;
        if new_quote <= Decimal::ZERO || new_base <= Decimal::ZERO {
            return Err(VammError::InvalidReserve);
        }

        let old_size = self.total_position_size;
        let new_size =
            base_size_across_curves(old_size, old_quote, old_base, new_quote, new_base)?;

        self.quote_reserve = new_quote;
        self.base_reserve = new_base;
        self.total_position_size = new_size;
        let size_delta = checked_sub(new_size, old_size)?;
        self.base_asset_delta = checked_sub(self.base_asset_delta, size_delta)?;

        let snapshot = LiquiditySnapshot {
            quote_reserve: new_quote,
            base_reserve: new_base,
            total_position_size: new_size,
            cumulative_notional: self.cumulative_notional,
        };
        self.liquidity_snapshots.push(snapshot);
        self.record_reserve_snapshot(now, batch);

        Ok(snapshot)
    }
}
