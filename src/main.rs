//! Virtual AMM Settlement Engine Simulation.
//!
//! Walks the full engine lifecycle: curve pricing, leveraged opens, funding
//! settlement, liquidity migration, and a liquidation with reserve-fund
//! settlement.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use vamm_core::*;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    println!("Virtual AMM Settlement Engine Simulation");
    println!("Single Market, Curve Pricing, Full Lifecycle\n");

    scenario_1_curve_pricing();
    scenario_2_open_and_close();
    scenario_3_funding_settlement();
    scenario_4_liquidity_migration();
    scenario_5_liquidation();

    println!("\nAll simulations completed successfully.");
}

fn market_config() -> AmmConfig {
    AmmConfig {
        quote_reserve: dec!(1000),
        base_reserve: dec!(100),
        ..AmmConfig::default()
    }
}

fn setup_engine() -> ClearingEngine {
    let mut engine = ClearingEngine::new(EngineConfig::default());
    engine.add_market(MarketId(1), market_config()).unwrap();
    engine
}

/// Constant-product pricing against the reserve pair.
fn scenario_1_curve_pricing() {
    println!("Scenario 1: Curve Pricing\n");

    let engine = setup_engine();
    println!("  Reserves 1000 quote / 100 base");
    println!("  Spot price: {}", engine.spot_price(MarketId(1)).unwrap());

    let market = engine.market(MarketId(1)).unwrap();
    let base = market
        .vamm
        .input_price(Direction::AddToAmm, dec!(600))
        .unwrap();
    println!("  600 quote buys {} base\n", base);
}

/// A trader opens with leverage, price moves, the trader closes at a profit.
fn scenario_2_open_and_close() {
    println!("Scenario 2: Open and Close\n");

    let mut engine = setup_engine();
    let alice = TraderId(1);
    let bob = TraderId(2);
    engine.custody_mut().credit(alice, dec!(1000));
    engine.custody_mut().credit(bob, dec!(1000));

    let change = engine
        .open_position(alice, MarketId(1), Side::Long, dec!(60), dec!(10), Decimal::ZERO)
        .unwrap();
    println!("  Alice opens long: {} base for 600 quote", change.exchanged_size);

    engine.advance_batch();
    engine
        .open_position(bob, MarketId(1), Side::Long, dec!(40), dec!(5), Decimal::ZERO)
        .unwrap();
    println!("  Bob's long pushes the price to {}", engine.spot_price(MarketId(1)).unwrap());

    engine.advance_batch();
    let close = engine.close_position(alice, MarketId(1), Decimal::ZERO).unwrap();
    println!("  Alice closes, realized PnL {}\n", close.realized_pnl);
}

/// Longs pay shorts (or vice versa) from the premium between pool and oracle.
fn scenario_3_funding_settlement() {
    println!("Scenario 3: Funding Settlement\n");

    let mut engine = setup_engine();
    let alice = TraderId(1);
    engine.custody_mut().credit(alice, dec!(1000));
    engine
        .open_position(alice, MarketId(1), Side::Long, dec!(60), dec!(10), Decimal::ZERO)
        .unwrap();

    engine.oracle_mut().set_price(dec!(20));
    engine.advance_time(3600);
    engine.advance_batch();

    let outcome = engine.pay_funding(MarketId(1)).unwrap();
    println!("  Premium fraction: {}", outcome.premium_fraction);
    println!("  Funding rate: {}", outcome.funding_rate);
    println!("  Pool imbalance booked with reserve fund: {}\n", outcome.imbalance);
}

/// Depth migration rescales size but not value.
fn scenario_4_liquidity_migration() {
    println!("Scenario 4: Liquidity Migration\n");

    let mut engine = setup_engine();
    let alice = TraderId(1);
    engine.custody_mut().credit(alice, dec!(1000));
    engine
        .open_position(alice, MarketId(1), Side::Long, dec!(60), dec!(10), Decimal::ZERO)
        .unwrap();

    let before = engine.position(MarketId(1), alice).unwrap().unwrap();
    println!("  Size before migration: {}", before.size);

    engine.advance_batch();
    engine.migrate_liquidity(MarketId(1), dec!(2)).unwrap();

    let after = engine.position(MarketId(1), alice).unwrap().unwrap();
    println!("  Size after 2x migration: {}", after.size);
    println!("  Margin unchanged: {}", after.margin);
    println!("  Open notional unchanged: {}\n", after.open_notional);
}

/// An underwater long is liquidated; the reserve fund absorbs the deficit.
fn scenario_5_liquidation() {
    println!("Scenario 5: Liquidation\n");

    let mut engine = setup_engine();
    let alice = TraderId(1);
    let bob = TraderId(2);
    let keeper = TraderId(3);
    engine.custody_mut().credit(alice, dec!(1000));
    engine.custody_mut().credit(bob, dec!(1000));

    engine
        .open_position(alice, MarketId(1), Side::Long, dec!(20), dec!(5), Decimal::ZERO)
        .unwrap();
    engine.advance_batch();
    engine
        .open_position(bob, MarketId(1), Side::Short, dec!(20), dec!(5), Decimal::ZERO)
        .unwrap();
    engine.advance_time(1000);
    engine.advance_batch();

    let ratio = engine.margin_ratio(MarketId(1), alice).unwrap();
    println!("  Alice margin ratio after Bob's short: {}", ratio);

    let outcome = engine.liquidate(keeper, MarketId(1), alice).unwrap();
    println!("  Liquidated size: {}", outcome.liquidated_size);
    println!("  Liquidator reward: {}", outcome.liquidator_reward);
    println!("  Reserve fund balance: {}", engine.reserve_fund().balance());
}
