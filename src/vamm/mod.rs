// 3.0 vamm: the virtual automated market maker. owns the two-asset reserve,
// prices trades on the constant-product curve, guards against reserve drain
// and single-batch price swings, and keeps the snapshot history that TWAP,
// funding, and migration all read.
//
// 3.1 snapshots.rs: reserve/liquidity snapshot history, TWAP walk
// 3.2 funding.rs: funding state and periodic settlement
// 3.3 migration.rs: depth migration and the cross-curve size transform

pub mod funding;
pub mod migration;
pub mod snapshots;

use crate::config::AmmConfig;
use crate::fixed::{checked_add, checked_sub, div_dn, div_up, mul_dn, MathError};
use crate::types::{Direction, Timestamp};
use funding::FundingState;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use snapshots::{LiquiditySnapshot, ReserveSnapshot};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum VammError {
    #[error("over trading limit")]
    OverTradingLimit,

    #[error("price is over fluctuation limit")]
    OverFluctuationLimit,

    #[error("trade got worse price than the limit")]
    PriceSlippage,

    #[error("swap would deplete the reserve")]
    InsufficientReserve,

    #[error("swap amount must be positive")]
    InvalidSwapAmount,

    #[error("settle funding too early")]
    SettleFundingTooEarly,

    #[error("multiplier can't be 1")]
    InvalidMigrationMultiplier,

    #[error("zero funding period")]
    ZeroFundingPeriod,

    #[error("reserves must be positive")]
    InvalidReserve,

    #[error(transparent)]
    Math(#[from] MathError),
}

/// Toll and spread quoted on a trade's notional. Routing is the caller's
/// concern; the amm only prices them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Fee {
    pub toll: Decimal,
    pub spread: Decimal,
}

impl Fee {
    pub fn total(&self) -> Decimal {
        self.toll + self.spread
    }
}

/// Result of a committed swap. `amount` is the counter-leg: base for a
/// quote-denominated swap, quote for a base-denominated one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SwapOutcome {
    pub amount: Decimal,
    pub spot_after: Decimal,
    pub fluctuation_breached: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vamm {
    pub quote_reserve: Decimal,
    pub base_reserve: Decimal,
    trade_limit_ratio: Decimal,
    fluctuation_limit_ratio: Decimal,
    toll_ratio: Decimal,
    spread_ratio: Decimal,
    pub funding: FundingState,
    reserve_snapshots: Vec<ReserveSnapshot>,
    liquidity_snapshots: Vec<LiquiditySnapshot>,
    /// Net base-asset exposure held by all traders against this pool.
    total_position_size: Decimal,
    /// Signed base volume since the last funding settlement. Migration
    /// corrects this so rescaling is invisible to funding attribution.
    base_asset_delta: Decimal,
    /// Running signed sum of quote notional transacted since genesis.
    cumulative_notional: Decimal,
}

impl Vamm {
    pub fn new(config: AmmConfig, now: Timestamp, batch: u64) -> Result<Self, VammError> {
        if config.quote_reserve <= Decimal::ZERO || config.base_reserve <= Decimal::ZERO {
            return Err(VammError::InvalidReserve);
        }
        if config.funding_period_secs <= 0 {
            return Err(VammError::ZeroFundingPeriod);
        }

        let genesis_reserve = ReserveSnapshot {
            quote_reserve: config.quote_reserve,
            base_reserve: config.base_reserve,
            timestamp: now,
            batch,
        };
        let genesis_liquidity = LiquiditySnapshot {
            quote_reserve: config.quote_reserve,
            base_reserve: config.base_reserve,
            total_position_size: Decimal::ZERO,
            cumulative_notional: Decimal::ZERO,
        };

        Ok(Self {
            quote_reserve: config.quote_reserve,
            base_reserve: config.base_reserve,
            trade_limit_ratio: config.trade_limit_ratio,
            fluctuation_limit_ratio: config.fluctuation_limit_ratio,
            toll_ratio: config.toll_ratio,
            spread_ratio: config.spread_ratio,
            funding: FundingState::new(
                now,
                config.funding_period_secs,
                config.funding_buffer_secs,
            ),
            reserve_snapshots: vec![genesis_reserve],
            liquidity_snapshots: vec![genesis_liquidity],
            total_position_size: Decimal::ZERO,
            base_asset_delta: Decimal::ZERO,
            cumulative_notional: Decimal::ZERO,
        })
    }

    pub fn spot_price(&self) -> Result<Decimal, VammError> {
        Ok(div_dn(self.quote_reserve, self.base_reserve)?)
    }

    pub fn total_position_size(&self) -> Decimal {
        self.total_position_size
    }

    pub fn base_asset_delta(&self) -> Decimal {
        self.base_asset_delta
    }

    pub fn cumulative_notional(&self) -> Decimal {
        self.cumulative_notional
    }

    pub fn latest_reserve_snapshot(&self) -> &ReserveSnapshot {
        self.reserve_snapshots
            .last()
            .expect("history starts at genesis")
    }

    pub fn latest_liquidity_index(&self) -> usize {
        self.liquidity_snapshots.len() - 1
    }

    pub fn liquidity_snapshot(&self, index: usize) -> Option<&LiquiditySnapshot> {
        self.liquidity_snapshots.get(index)
    }

    /// Base received/owed for a quote-denominated order at current reserves.
    pub fn input_price(&self, direction: Direction, quote_amount: Decimal) -> Result<Decimal, VammError> {
        input_price_with_reserves(direction, quote_amount, self.quote_reserve, self.base_reserve)
    }

    /// Quote received/owed for a base-denominated order at current reserves.
    pub fn output_price(&self, direction: Direction, base_amount: Decimal) -> Result<Decimal, VammError> {
        output_price_with_reserves(direction, base_amount, self.quote_reserve, self.base_reserve)
    }

    pub fn calc_fee(&self, notional: Decimal) -> Result<Fee, VammError> {
        Ok(Fee {
            toll: mul_dn(notional, self.toll_ratio)?,
            spread: mul_dn(notional, self.spread_ratio)?,
        })
    }

    /// Execute a quote-denominated swap. `base_limit` is the trader's
    /// slippage bound on the base leg (0 disables). A fluctuation breach is
    /// only tolerated when `can_override_fluctuation` is set; the caller is
    /// expected to restrict the batch when the returned flag is raised.
    pub fn swap_input(
        &mut self,
        direction: Direction,
        quote_amount: Decimal,
        base_limit: Decimal,
        can_override_fluctuation: bool,
        now: Timestamp,
        batch: u64,
    ) -> Result<SwapOutcome, VammError> {
        if quote_amount <= Decimal::ZERO {
            return Err(VammError::InvalidSwapAmount);
        }
        if direction == Direction::RemoveFromAmm {
            let removable = mul_dn(self.quote_reserve, self.trade_limit_ratio)?;
            if quote_amount > removable {
                return Err(VammError::OverTradingLimit);
            }
        }

        let base_amount = self.input_price(direction, quote_amount)?;
        if base_limit > Decimal::ZERO {
            match direction {
                // trader receives base: insist on at least the limit
                Direction::AddToAmm if base_amount < base_limit => {
                    return Err(VammError::PriceSlippage)
                }
                // trader owes base: insist on at most the limit
                Direction::RemoveFromAmm if base_amount > base_limit => {
                    return Err(VammError::PriceSlippage)
                }
                _ => {}
            }
        }

        let (new_quote, new_base, position_delta, notional_delta) = match direction {
            Direction::AddToAmm => (
                checked_add(self.quote_reserve, quote_amount)?,
                checked_sub(self.base_reserve, base_amount)?,
                base_amount,
                quote_amount,
            ),
            Direction::RemoveFromAmm => (
                checked_sub(self.quote_reserve, quote_amount)?,
                checked_add(self.base_reserve, base_amount)?,
                -base_amount,
                -quote_amount,
            ),
        };

        let outcome = self.commit_swap(
            new_quote,
            new_base,
            base_amount,
            position_delta,
            notional_delta,
            can_override_fluctuation,
            now,
            batch,
        )?;
        Ok(outcome)
    }

    /// Execute a base-denominated swap. `quote_limit` bounds the quote leg
    /// (0 disables).
    pub fn swap_output(
        &mut self,
        direction: Direction,
        base_amount: Decimal,
        quote_limit: Decimal,
        can_override_fluctuation: bool,
        now: Timestamp,
        batch: u64,
    ) -> Result<SwapOutcome, VammError> {
        if base_amount <= Decimal::ZERO {
            return Err(VammError::InvalidSwapAmount);
        }
        if direction == Direction::RemoveFromAmm {
            let removable = mul_dn(self.base_reserve, self.trade_limit_ratio)?;
            if base_amount > removable {
                return Err(VammError::OverTradingLimit);
            }
        }

        let quote_amount = self.output_price(direction, base_amount)?;
        if quote_limit > Decimal::ZERO {
            match direction {
                // trader receives quote: insist on at least the limit
                Direction::AddToAmm if quote_amount < quote_limit => {
                    return Err(VammError::PriceSlippage)
                }
                // trader pays quote: insist on at most the limit
                Direction::RemoveFromAmm if quote_amount > quote_limit => {
                    return Err(VammError::PriceSlippage)
                }
                _ => {}
            }
        }

        let (new_quote, new_base, position_delta, notional_delta) = match direction {
            Direction::AddToAmm => (
                checked_sub(self.quote_reserve, quote_amount)?,
                checked_add(self.base_reserve, base_amount)?,
                -base_amount,
                -quote_amount,
            ),
            Direction::RemoveFromAmm => (
                checked_add(self.quote_reserve, quote_amount)?,
                checked_sub(self.base_reserve, base_amount)?,
                base_amount,
                quote_amount,
            ),
        };

        let outcome = self.commit_swap(
            new_quote,
            new_base,
            quote_amount,
            position_delta,
            notional_delta,
            can_override_fluctuation,
            now,
            batch,
        )?;
        Ok(outcome)
    }

    /// Spot price time-weighted over the trailing interval.
    pub fn twap_price(&self, now: Timestamp, interval_secs: i64) -> Result<Decimal, VammError> {
        snapshots::time_weighted(&self.reserve_snapshots, now, interval_secs, |s| {
            s.spot_price().map_err(Into::into)
        })
    }

    /// Base amount for a fixed quote order, time-weighted over the interval.
    pub fn input_twap(
        &self,
        direction: Direction,
        quote_amount: Decimal,
        now: Timestamp,
        interval_secs: i64,
    ) -> Result<Decimal, VammError> {
        snapshots::time_weighted(&self.reserve_snapshots, now, interval_secs, |s| {
            input_price_with_reserves(direction, quote_amount, s.quote_reserve, s.base_reserve)
        })
    }

    /// Quote amount for a fixed base order, time-weighted over the interval.
    pub fn output_twap(
        &self,
        direction: Direction,
        base_amount: Decimal,
        now: Timestamp,
        interval_secs: i64,
    ) -> Result<Decimal, VammError> {
        snapshots::time_weighted(&self.reserve_snapshots, now, interval_secs, |s| {
            output_price_with_reserves(direction, base_amount, s.quote_reserve, s.base_reserve)
        })
    }

    /// Spot price at the start of the batch: the latest snapshot taken in an
    /// earlier batch, carried forward when the batch has had no trade yet.
    pub fn fluctuation_reference(&self, batch: u64) -> Result<Decimal, VammError> {
        let snapshot = snapshots::reference_before_batch(&self.reserve_snapshots, batch);
        Ok(snapshot.spot_price()?)
    }

    fn price_breaches_fluctuation_limit(
        &self,
        price: Decimal,
        batch: u64,
    ) -> Result<bool, VammError> {
        if self.fluctuation_limit_ratio.is_zero() {
            return Ok(false);
        }
        let reference = self.fluctuation_reference(batch)?;
        let band = mul_dn(reference, self.fluctuation_limit_ratio)?;
        Ok(price > reference + band || price < reference - band)
    }

    #[allow(clippy::too_many_arguments)]
    fn commit_swap(
        &mut self,
        new_quote: Decimal,
        new_base: Decimal,
        counter_amount: Decimal,
        position_delta: Decimal,
        notional_delta: Decimal,
        can_override_fluctuation: bool,
        now: Timestamp,
        batch: u64,
    ) -> Result<SwapOutcome, VammError> {
        if new_quote <= Decimal::ZERO || new_base <= Decimal::ZERO {
            return Err(VammError::InsufficientReserve);
        }

        let spot_after = div_dn(new_quote, new_base)?;
        let breached = self.price_breaches_fluctuation_limit(spot_after, batch)?;
        if breached && !can_override_fluctuation {
            return Err(VammError::OverFluctuationLimit);
        }

        self.quote_reserve = new_quote;
        self.base_reserve = new_base;
        self.total_position_size = checked_add(self.total_position_size, position_delta)?;
        self.base_asset_delta = checked_add(self.base_asset_delta, position_delta)?;
        self.cumulative_notional = checked_add(self.cumulative_notional, notional_delta)?;
        self.record_reserve_snapshot(now, batch);

        Ok(SwapOutcome {
            amount: counter_amount,
            spot_after,
            fluctuation_breached: breached,
        })
    }

    fn record_reserve_snapshot(&mut self, now: Timestamp, batch: u64) {
        snapshots::record(
            &mut self.reserve_snapshots,
            ReserveSnapshot {
                quote_reserve: self.quote_reserve,
                base_reserve: self.base_reserve,
                timestamp: now,
                batch,
            },
        );
    }
}

/// Base moved for a quote-denominated order of `quote_amount` against the
/// given reserves. The after-trade base reserve is rounded up, so an inexact
/// quotient always leaves the extra tick with the pool: a trader adding quote
/// receives one tick less base, a trader removing quote owes one tick more.
pub fn input_price_with_reserves(
    direction: Direction,
    quote_amount: Decimal,
    quote_reserve: Decimal,
    base_reserve: Decimal,
) -> Result<Decimal, VammError> {
    if quote_amount.is_zero() {
        return Ok(Decimal::ZERO);
    }
    let invariant = quote_reserve
        .checked_mul(base_reserve)
        .ok_or(MathError::Overflow)?;

    match direction {
        Direction::AddToAmm => {
            let quote_after = checked_add(quote_reserve, quote_amount)?;
            let base_after = div_up(invariant, quote_after)?;
            Ok(checked_sub(base_reserve, base_after)?)
        }
        Direction::RemoveFromAmm => {
            if quote_amount >= quote_reserve {
                return Err(VammError::InsufficientReserve);
            }
            let quote_after = checked_sub(quote_reserve, quote_amount)?;
            let base_after = div_up(invariant, quote_after)?;
            Ok(checked_sub(base_after, base_reserve)?)
        }
    }
}

/// Quote moved for a base-denominated order, same rounding discipline on the
/// quote side of the curve.
pub fn output_price_with_reserves(
    direction: Direction,
    base_amount: Decimal,
    quote_reserve: Decimal,
    base_reserve: Decimal,
) -> Result<Decimal, VammError> {
    if base_amount.is_zero() {
        return Ok(Decimal::ZERO);
    }
    let invariant = quote_reserve
        .checked_mul(base_reserve)
        .ok_or(MathError::Overflow)?;

    match direction {
        Direction::AddToAmm => {
            let base_after = checked_add(base_reserve, base_amount)?;
            let quote_after = div_up(invariant, base_after)?;
            Ok(checked_sub(quote_reserve, quote_after)?)
        }
        Direction::RemoveFromAmm => {
            if base_amount >= base_reserve {
                return Err(VammError::InsufficientReserve);
            }
            let base_after = checked_sub(base_reserve, base_amount)?;
            let quote_after = div_up(invariant, base_after)?;
            Ok(checked_sub(quote_after, quote_reserve)?)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AmmConfig;
    use rust_decimal_macros::dec;

    fn test_amm() -> Vamm {
        let config = AmmConfig {
            quote_reserve: dec!(1000),
            base_reserve: dec!(100),
            ..AmmConfig::default()
        };
        Vamm::new(config, Timestamp::from_secs(0), 1).unwrap()
    }

    #[test]
    fn spot_price_is_quote_over_base() {
        let amm = test_amm();
        assert_eq!(amm.spot_price().unwrap(), dec!(10));
    }

    #[test]
    fn add_quote_order_pricing() {
        // 1000/100 pool, 600 quote in: base out = 100 - 100000/1600 = 37.5
        let amm = test_amm();
        let base = amm.input_price(Direction::AddToAmm, dec!(600)).unwrap();
        assert_eq!(base, dec!(37.5));
    }

    #[test]
    fn remove_quote_order_pricing() {
        let amm = test_amm();
        // removing 200 quote: base in = 100000/800 - 100 = 25
        let base = amm.input_price(Direction::RemoveFromAmm, dec!(200)).unwrap();
        assert_eq!(base, dec!(25));
    }

    #[test]
    fn base_denominated_order_pricing() {
        let amm = test_amm();
        // selling 25 base: quote out = 1000 - 100000/125 = 200
        let quote = amm.output_price(Direction::AddToAmm, dec!(25)).unwrap();
        assert_eq!(quote, dec!(200));

        // buying 20 base: quote in = 100000/80 - 1000 = 250
        let quote = amm.output_price(Direction::RemoveFromAmm, dec!(20)).unwrap();
        assert_eq!(quote, dec!(250));
    }

    #[test]
    fn inexact_division_favors_the_pool() {
        let amm = test_amm();
        // 1000/100 pool, 3 quote in: 100000/1003 is inexact
        let base = amm.input_price(Direction::AddToAmm, dec!(3)).unwrap();
        let exact = dec!(100) - dec!(100000) / dec!(1003);
        assert!(base < exact);
        assert!(exact - base < dec!(0.000000000000000002));
    }

    #[test]
    fn swap_mutates_reserves_and_tracks_exposure() {
        let mut amm = test_amm();
        let outcome = amm
            .swap_input(
                Direction::AddToAmm,
                dec!(600),
                Decimal::ZERO,
                false,
                Timestamp::from_secs(10),
                2,
            )
            .unwrap();

        assert_eq!(outcome.amount, dec!(37.5));
        assert_eq!(amm.quote_reserve, dec!(1600));
        assert_eq!(amm.base_reserve, dec!(62.5));
        assert_eq!(amm.total_position_size(), dec!(37.5));
        assert_eq!(amm.base_asset_delta(), dec!(37.5));
        assert_eq!(amm.cumulative_notional(), dec!(600));
        assert_eq!(outcome.spot_after, dec!(25.6));
    }

    #[test]
    fn over_trading_limit_rejected() {
        let mut amm = test_amm();
        // default limit 0.9: removing more than 900 quote must fail
        let result = amm.swap_input(
            Direction::RemoveFromAmm,
            dec!(901),
            Decimal::ZERO,
            false,
            Timestamp::from_secs(10),
            2,
        );
        assert_eq!(result.unwrap_err(), VammError::OverTradingLimit);

        let result = amm.swap_output(
            Direction::RemoveFromAmm,
            dec!(91),
            Decimal::ZERO,
            false,
            Timestamp::from_secs(10),
            2,
        );
        assert_eq!(result.unwrap_err(), VammError::OverTradingLimit);
    }

    #[test]
    fn slippage_bounds_enforced() {
        let mut amm = test_amm();
        // long 600 quote yields 37.5 base; demanding 38 must fail
        let result = amm.swap_input(
            Direction::AddToAmm,
            dec!(600),
            dec!(38),
            false,
            Timestamp::from_secs(10),
            2,
        );
        assert_eq!(result.unwrap_err(), VammError::PriceSlippage);

        // short 200 quote costs 25 base; capping at 24 must fail
        let result = amm.swap_input(
            Direction::RemoveFromAmm,
            dec!(200),
            dec!(24),
            false,
            Timestamp::from_secs(10),
            2,
        );
        assert_eq!(result.unwrap_err(), VammError::PriceSlippage);
    }

    #[test]
    fn fluctuation_guard_uses_batch_reference() {
        let config = AmmConfig {
            quote_reserve: dec!(1000),
            base_reserve: dec!(100),
            fluctuation_limit_ratio: dec!(0.05),
            ..AmmConfig::default()
        };
        let mut amm = Vamm::new(config, Timestamp::from_secs(0), 1).unwrap();

        // 600 quote moves spot from 10 to 25.6: way past 5%
        let result = amm.swap_input(
            Direction::AddToAmm,
            dec!(600),
            Decimal::ZERO,
            false,
            Timestamp::from_secs(10),
            2,
        );
        assert_eq!(result.unwrap_err(), VammError::OverFluctuationLimit);

        // small trade stays inside the band
        let outcome = amm
            .swap_input(
                Direction::AddToAmm,
                dec!(10),
                Decimal::ZERO,
                false,
                Timestamp::from_secs(10),
                2,
            )
            .unwrap();
        assert!(!outcome.fluctuation_breached);

        // override lets the big trade through but reports the breach
        let outcome = amm
            .swap_input(
                Direction::AddToAmm,
                dec!(600),
                Decimal::ZERO,
                true,
                Timestamp::from_secs(10),
                2,
            )
            .unwrap();
        assert!(outcome.fluctuation_breached);
    }

    #[test]
    fn intra_batch_trades_share_one_reference() {
        let config = AmmConfig {
            quote_reserve: dec!(1000),
            base_reserve: dec!(100),
            fluctuation_limit_ratio: dec!(0.1),
            ..AmmConfig::default()
        };
        let mut amm = Vamm::new(config, Timestamp::from_secs(0), 1).unwrap();

        // two 30-quote trades individually stay near the reference, but the
        // second lands past 10% of the batch-start price and must fail
        amm.swap_input(Direction::AddToAmm, dec!(30), Decimal::ZERO, false, Timestamp::from_secs(10), 2)
            .unwrap();
        let result = amm.swap_input(
            Direction::AddToAmm,
            dec!(30),
            Decimal::ZERO,
            false,
            Timestamp::from_secs(10),
            2,
        );
        assert_eq!(result.unwrap_err(), VammError::OverFluctuationLimit);
    }

    #[test]
    fn round_trip_reproduces_input_against_resulting_reserves() {
        let mut amm = test_amm();
        let base = amm
            .swap_input(Direction::AddToAmm, dec!(600), Decimal::ZERO, false, Timestamp::from_secs(10), 2)
            .unwrap()
            .amount;
        // selling the received base back against the new reserves returns
        // exactly the quote that went in
        let quote = amm.output_price(Direction::AddToAmm, base).unwrap();
        assert_eq!(quote, dec!(600));

        // and the same the other way around
        let mut amm = test_amm();
        let base = amm
            .swap_input(Direction::RemoveFromAmm, dec!(200), Decimal::ZERO, false, Timestamp::from_secs(10), 2)
            .unwrap()
            .amount;
        let quote = amm.output_price(Direction::RemoveFromAmm, base).unwrap();
        assert_eq!(quote, dec!(200));
    }

    #[test]
    fn order_twaps_weight_the_whole_order_not_the_price() {
        let mut amm = test_amm();
        // second curve state from t=100: 1600/62.5
        amm.swap_input(Direction::AddToAmm, dec!(600), Decimal::ZERO, false, Timestamp::from_secs(100), 2)
            .unwrap();

        // 100 quote in on 1000/100 buys 100 - 100000/1100 = 9.0909...;
        // on 1600/62.5 it buys 62.5 - 100000/1700 = 3.6764...; equal weight
        let now = Timestamp::from_secs(200);
        let twap = amm
            .input_twap(Direction::AddToAmm, dec!(100), now, 200)
            .unwrap();
        let early = input_price_with_reserves(Direction::AddToAmm, dec!(100), dec!(1000), dec!(100)).unwrap();
        let late = input_price_with_reserves(Direction::AddToAmm, dec!(100), dec!(1600), dec!(62.5)).unwrap();
        assert!(twap > late && twap < early);
        assert_eq!(twap, div_dn(early + late, dec!(2)).unwrap());

        // base-denominated order, same weighting
        let twap = amm
            .output_twap(Direction::AddToAmm, dec!(10), now, 200)
            .unwrap();
        let early = output_price_with_reserves(Direction::AddToAmm, dec!(10), dec!(1000), dec!(100)).unwrap();
        let late = output_price_with_reserves(Direction::AddToAmm, dec!(10), dec!(1600), dec!(62.5)).unwrap();
        assert_eq!(twap, div_dn(early + late, dec!(2)).unwrap());
    }

    #[test]
    fn fee_quote_uses_both_ratios() {
        let config = AmmConfig {
            quote_reserve: dec!(1000),
            base_reserve: dec!(100),
            toll_ratio: dec!(0.01),
            spread_ratio: dec!(0.005),
            ..AmmConfig::default()
        };
        let amm = Vamm::new(config, Timestamp::from_secs(0), 1).unwrap();
        let fee = amm.calc_fee(dec!(1000)).unwrap();
        assert_eq!(fee.toll, dec!(10));
        assert_eq!(fee.spread, dec!(5));
        assert_eq!(fee.total(), dec!(15));
    }

    #[test]
    fn depleting_swap_rejected() {
        let amm = test_amm();
        let result = amm.input_price(Direction::RemoveFromAmm, dec!(1000));
        assert_eq!(result.unwrap_err(), VammError::InsufficientReserve);
    }

    #[test]
    fn zero_funding_period_rejected() {
        let config = AmmConfig {
            quote_reserve: dec!(1000),
            base_reserve: dec!(100),
            funding_period_secs: 0,
            ..AmmConfig::default()
        };
        let result = Vamm::new(config, Timestamp::from_secs(0), 1);
        assert!(matches!(result, Err(VammError::ZeroFundingPeriod)));
    }
}
