//! Solvency rules under stress: margin maintenance, underwater reductions,
//! bad debt, and the reserve fund's role in funding settlement.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use vamm_core::*;

fn setup() -> ClearingEngine {
    let mut engine = ClearingEngine::new(EngineConfig::default());
    engine
        .add_market(
            MarketId(1),
            AmmConfig {
                quote_reserve: dec!(1000),
                base_reserve: dec!(100),
                ..AmmConfig::default()
            },
        )
        .unwrap();
    engine
}

fn fund(engine: &mut ClearingEngine, trader: TraderId, amount: Decimal) {
    engine.custody_mut().credit(trader, amount);
}

#[test]
fn remove_margin_respects_initial_ratio() {
    let mut engine = setup();
    let alice = TraderId(1);
    fund(&mut engine, alice, dec!(1000));

    // 5x leverage: 20% margin ratio, 10% required
    engine
        .open_position(alice, MarketId(1), Side::Long, dec!(20), dec!(5), Decimal::ZERO)
        .unwrap();

    // taking out more than the buffer violates the requirement
    let result = engine.remove_margin(alice, MarketId(1), dec!(15));
    assert_eq!(result.unwrap_err(), EngineError::MarginRatioTooLow);

    // within the buffer is fine
    engine.remove_margin(alice, MarketId(1), dec!(5)).unwrap();
    let position = engine.position(MarketId(1), alice).unwrap().unwrap();
    assert_eq!(position.margin, dec!(15));
    assert_eq!(engine.custody().balance_of(alice), dec!(985));
}

#[test]
fn free_collateral_matches_what_remove_margin_allows() {
    let mut engine = setup();
    let alice = TraderId(1);
    fund(&mut engine, alice, dec!(1000));

    // 100 notional at 5x with no price move: 20 margin against a 10
    // requirement leaves 10 free... minus the curve's closing loss
    engine
        .open_position(alice, MarketId(1), Side::Long, dec!(20), dec!(5), Decimal::ZERO)
        .unwrap();

    let free = engine.free_collateral(MarketId(1), alice).unwrap();
    assert!(free > Decimal::ZERO);
    assert!(free < dec!(10));

    let over = free + dec!(0.01);
    let result = engine.remove_margin(alice, MarketId(1), over);
    assert_eq!(result.unwrap_err(), EngineError::MarginRatioTooLow);

    engine.remove_margin(alice, MarketId(1), free).unwrap();
    let position = engine.position(MarketId(1), alice).unwrap().unwrap();
    assert_eq!(position.margin, dec!(20) - free);
}

#[test]
fn remove_more_than_margin_rejected() {
    let mut engine = setup();
    let alice = TraderId(1);
    fund(&mut engine, alice, dec!(1000));
    engine
        .open_position(alice, MarketId(1), Side::Long, dec!(20), dec!(5), Decimal::ZERO)
        .unwrap();

    let result = engine.remove_margin(alice, MarketId(1), dec!(25));
    assert_eq!(result.unwrap_err(), EngineError::InsufficientMargin);
}

#[test]
fn add_margin_needs_a_position() {
    let mut engine = setup();
    fund(&mut engine, TraderId(1), dec!(100));
    let result = engine.add_margin(TraderId(1), MarketId(1), dec!(10));
    assert_eq!(result.unwrap_err(), EngineError::NoPosition);
}

#[test]
fn add_margin_improves_ratio() {
    let mut engine = setup();
    let alice = TraderId(1);
    fund(&mut engine, alice, dec!(1000));
    engine
        .open_position(alice, MarketId(1), Side::Long, dec!(20), dec!(5), Decimal::ZERO)
        .unwrap();

    let before = engine.margin_ratio(MarketId(1), alice).unwrap();
    engine.add_margin(alice, MarketId(1), dec!(20)).unwrap();
    let after = engine.margin_ratio(MarketId(1), alice).unwrap();
    assert!(after > before);
}

#[test]
fn underwater_reduction_rejected() {
    let mut engine = setup();
    let alice = TraderId(1);
    let bob = TraderId(2);
    fund(&mut engine, alice, dec!(1000));
    fund(&mut engine, bob, dec!(1000));

    engine
        .open_position(alice, MarketId(1), Side::Long, dec!(20), dec!(5), Decimal::ZERO)
        .unwrap();
    engine.advance_batch();
    // a large short drives alice deep underwater
    engine
        .open_position(bob, MarketId(1), Side::Short, dec!(40), dec!(5), Decimal::ZERO)
        .unwrap();
    engine.advance_batch();

    let (_, pnl) = engine
        .position_notional_and_pnl(MarketId(1), alice, PnlMeasure::Spot)
        .unwrap();
    assert!(pnl < dec!(-20), "alice must be underwater: {}", pnl);

    let result =
        engine.open_position(alice, MarketId(1), Side::Short, dec!(10), dec!(5), Decimal::ZERO);
    assert_eq!(result.unwrap_err(), EngineError::UnderwaterReduction);
}

#[test]
fn close_of_an_insolvent_position_rejected() {
    let mut engine = setup();
    let alice = TraderId(1);
    let bob = TraderId(2);
    fund(&mut engine, alice, dec!(1000));
    fund(&mut engine, bob, dec!(1000));

    engine
        .open_position(alice, MarketId(1), Side::Long, dec!(20), dec!(5), Decimal::ZERO)
        .unwrap();
    engine.advance_batch();
    engine
        .open_position(bob, MarketId(1), Side::Short, dec!(40), dec!(5), Decimal::ZERO)
        .unwrap();
    engine.advance_batch();

    let result = engine.close_position(alice, MarketId(1), Decimal::ZERO);
    assert_eq!(result.unwrap_err(), EngineError::InsufficientMargin);
}

#[test]
fn bankrupt_liquidation_socializes_bad_debt() {
    let mut engine = setup();
    let alice = TraderId(1);
    let bob = TraderId(2);
    let keeper = TraderId(9);
    fund(&mut engine, alice, dec!(1000));
    fund(&mut engine, bob, dec!(1000));

    engine
        .open_position(alice, MarketId(1), Side::Long, dec!(20), dec!(5), Decimal::ZERO)
        .unwrap();
    engine.advance_batch();
    engine
        .open_position(bob, MarketId(1), Side::Short, dec!(40), dec!(5), Decimal::ZERO)
        .unwrap();

    engine.advance_time(2000);
    engine.advance_batch();

    let outcome = engine.liquidate(keeper, MarketId(1), alice).unwrap();
    assert!(outcome.bad_debt > Decimal::ZERO);

    // the fund covered both the keeper's reward and the hole in the margin
    let covered = -engine.reserve_fund().balance();
    assert_eq!(covered, outcome.liquidator_reward + outcome.bad_debt);
    assert_eq!(engine.custody().balance_of(keeper), outcome.liquidator_reward);
}

#[test]
fn funding_imbalance_settles_with_reserve_fund() {
    let mut engine = ClearingEngine::new(EngineConfig::default());
    engine
        .add_market(
            MarketId(1),
            AmmConfig {
                quote_reserve: dec!(1000),
                base_reserve: dec!(100),
                funding_period_secs: 3600,
                funding_buffer_secs: 1800,
                ..AmmConfig::default()
            },
        )
        .unwrap();
    let alice = TraderId(1);
    fund(&mut engine, alice, dec!(1000));

    // net long market trading above the oracle: longs pay and the pool's
    // gain goes to the reserve fund
    engine
        .open_position(alice, MarketId(1), Side::Long, dec!(60), dec!(10), Decimal::ZERO)
        .unwrap();
    engine.oracle_mut().set_price(dec!(20));
    engine.advance_time(3600);
    engine.advance_batch();

    let outcome = engine.pay_funding(MarketId(1)).unwrap();
    assert!(outcome.premium_fraction > Decimal::ZERO);
    assert!(outcome.imbalance > Decimal::ZERO);
    assert_eq!(engine.reserve_fund().balance(), outcome.imbalance);

    // alice's margin shrinks by her funding payment on next touch
    let position = engine.position(MarketId(1), alice).unwrap().unwrap();
    assert!(position.margin < dec!(60));
    assert_eq!(
        dec!(60) - position.margin,
        outcome.premium_fraction * position.size
    );
}

#[test]
fn funding_flows_reverse_when_pool_trades_below_oracle() {
    let mut engine = setup();
    let alice = TraderId(1);
    fund(&mut engine, alice, dec!(1000));

    engine
        .open_position(alice, MarketId(1), Side::Long, dec!(60), dec!(10), Decimal::ZERO)
        .unwrap();
    // oracle far above the pool: premium fraction negative, longs receive
    engine.oracle_mut().set_price(dec!(40));
    engine.advance_time(3600);
    engine.advance_batch();

    let outcome = engine.pay_funding(MarketId(1)).unwrap();
    assert!(outcome.premium_fraction < Decimal::ZERO);
    assert!(outcome.imbalance < Decimal::ZERO);
    assert!(engine.reserve_fund().balance() < Decimal::ZERO);

    let position = engine.position(MarketId(1), alice).unwrap().unwrap();
    assert!(position.margin > dec!(60));
}

#[test]
fn resolution_is_idempotent_across_touches() {
    let mut engine = setup();
    let alice = TraderId(1);
    fund(&mut engine, alice, dec!(1000));

    engine
        .open_position(alice, MarketId(1), Side::Long, dec!(60), dec!(10), Decimal::ZERO)
        .unwrap();
    engine.oracle_mut().set_price(dec!(20));
    engine.advance_time(3600);
    engine.advance_batch();
    engine.pay_funding(MarketId(1)).unwrap();

    let first = engine.position(MarketId(1), alice).unwrap().unwrap();
    // touching the position persists the accrual; reading again must not
    // charge funding twice
    engine.add_margin(alice, MarketId(1), dec!(1)).unwrap();
    let second = engine.position(MarketId(1), alice).unwrap().unwrap();
    assert_eq!(second.margin, first.margin + dec!(1));
}
