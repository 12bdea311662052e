//! Property-based tests for the curve and settlement math.
//!
//! These verify the rounding and rescaling invariants hold under random
//! inputs.

use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use vamm_core::*;

fn reserve_strategy() -> impl Strategy<Value = Decimal> {
    (1_000i64..1_000_000i64).prop_map(Decimal::from)
}

fn quote_amount_strategy() -> impl Strategy<Value = Decimal> {
    (1i64..50_000i64).prop_map(|x| Decimal::new(x, 2)) // 0.01 to 500
}

fn multiplier_strategy() -> impl Strategy<Value = Decimal> {
    // 0.25x to 4x, never exactly 1
    (25i64..400i64)
        .prop_filter("multiplier can't be 1", |x| *x != 100)
        .prop_map(|x| Decimal::new(x, 2))
}

fn amm_with(quote: Decimal, base: Decimal) -> Vamm {
    let config = AmmConfig {
        quote_reserve: quote,
        base_reserve: base,
        ..AmmConfig::default()
    };
    Vamm::new(config, Timestamp::from_secs(0), 1).unwrap()
}

proptest! {
    /// The pool invariant never shrinks under swaps: rounding always favors
    /// the reserves.
    #[test]
    fn invariant_non_decreasing_under_swaps(
        quote in reserve_strategy(),
        base in reserve_strategy(),
        trades in proptest::collection::vec((any::<bool>(), quote_amount_strategy()), 1..20),
    ) {
        let mut amm = amm_with(quote, base);
        let mut invariant = quote * base;

        for (batch, (add, amount)) in trades.into_iter().enumerate() {
            let direction = if add { Direction::AddToAmm } else { Direction::RemoveFromAmm };
            let result = amm.swap_input(
                direction,
                amount,
                Decimal::ZERO,
                false,
                Timestamp::from_secs(batch as i64),
                batch as u64 + 2,
            );
            if result.is_ok() {
                let next = amm.quote_reserve * amm.base_reserve;
                prop_assert!(next >= invariant, "invariant shrank: {} -> {}", invariant, next);
                invariant = next;
            }
        }
    }

    /// Swapping quote in and valuing the received base against the resulting
    /// reserves recovers the quote amount up to rounding ticks.
    #[test]
    fn round_trip_recovers_input(
        quote in reserve_strategy(),
        base in reserve_strategy(),
        amount in quote_amount_strategy(),
    ) {
        let mut amm = amm_with(quote, base);
        let outcome = amm.swap_input(
            Direction::AddToAmm,
            amount,
            Decimal::ZERO,
            false,
            Timestamp::from_secs(1),
            2,
        ).unwrap();

        let recovered = amm.output_price(Direction::AddToAmm, outcome.amount).unwrap();
        prop_assert!(recovered <= amount);
        prop_assert!(amount - recovered < dec!(0.000000000001));
    }

    /// Migration changes size but neither margin, open notional, nor the
    /// recoverable notional value of the aggregate position.
    #[test]
    fn migration_preserves_position_value(
        amount in (100i64..5_000i64).prop_map(Decimal::from),
        multiplier in multiplier_strategy(),
    ) {
        let mut amm = amm_with(dec!(100000), dec!(10000));
        amm.swap_input(
            Direction::AddToAmm,
            amount,
            Decimal::ZERO,
            false,
            Timestamp::from_secs(1),
            2,
        ).unwrap();

        let value_before = amm
            .output_price(Direction::AddToAmm, amm.total_position_size())
            .unwrap();

        amm.migrate_liquidity(multiplier, Timestamp::from_secs(2), 3).unwrap();

        let value_after = amm
            .output_price(Direction::AddToAmm, amm.total_position_size())
            .unwrap();
        prop_assert!((value_before - value_after).abs() < dec!(0.000000001));
    }

    /// Equal and opposite positions transfer equal and opposite funding.
    #[test]
    fn funding_symmetry(
        size in (1i64..100_000i64).prop_map(|x| Decimal::new(x, 3)),
        fraction in (-1_000i64..1_000i64).prop_map(|x| Decimal::new(x, 4)),
    ) {
        let long = Position {
            market_id: MarketId(1),
            size,
            margin: dec!(1000),
            open_notional: dec!(1000),
            last_premium_fraction: Decimal::ZERO,
            liquidity_history_index: 0,
            last_touched_batch: 1,
        };
        let mut short = long.clone();
        short.size = -size;

        let long_pays = long.funding_payment(fraction);
        let short_pays = short.funding_payment(fraction);
        prop_assert_eq!(long_pays, -short_pays);
    }

    /// The favorable-PnL margin ratio decides liquidation eligibility both
    /// ways: at or above maintenance is never liquidatable, below always is.
    #[test]
    fn liquidation_threshold_is_sharp(
        short_notional in (50i64..180i64).prop_map(Decimal::from),
    ) {
        let mut engine = ClearingEngine::new(EngineConfig::default());
        engine.add_market(MarketId(1), AmmConfig {
            quote_reserve: dec!(1000),
            base_reserve: dec!(100),
            ..AmmConfig::default()
        }).unwrap();

        let alice = TraderId(1);
        let bob = TraderId(2);
        let keeper = TraderId(9);
        engine.custody_mut().credit(alice, dec!(1000));
        engine.custody_mut().credit(bob, dec!(1000));

        engine.open_position(alice, MarketId(1), Side::Long, dec!(20), dec!(5), Decimal::ZERO).unwrap();
        engine.advance_batch();
        engine.open_position(bob, MarketId(1), Side::Short, short_notional / dec!(5), dec!(5), Decimal::ZERO).unwrap();

        // long enough that the TWAP window has converged to spot
        engine.advance_time(2000);
        engine.advance_batch();

        let ratio = engine.margin_ratio(MarketId(1), alice).unwrap();
        let result = engine.liquidate(keeper, MarketId(1), alice);
        let maintenance = EngineConfig::default().maintenance_margin_ratio;

        if ratio >= maintenance {
            prop_assert_eq!(result.unwrap_err(), EngineError::MarginRatioAboveRequirement);
        } else {
            prop_assert!(result.is_ok());
        }
    }
}
