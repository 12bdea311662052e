// 7.0 config.rs: all settings in one place. per-market amm parameters and
// engine-wide margin/liquidation ratios.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Per-market amm parameters, fixed at market creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AmmConfig {
    pub quote_reserve: Decimal,
    pub base_reserve: Decimal,
    /// Largest fraction of a reserve one swap may remove.
    pub trade_limit_ratio: Decimal,
    /// Allowed spot move per batch relative to the batch reference price.
    /// Zero disables the guard.
    pub fluctuation_limit_ratio: Decimal,
    pub toll_ratio: Decimal,
    pub spread_ratio: Decimal,
    pub funding_period_secs: i64,
    pub funding_buffer_secs: i64,
    /// Cap on aggregate open notional. Zero means uncapped.
    pub open_interest_cap: Decimal,
}

impl Default for AmmConfig {
    fn default() -> Self {
        Self {
            quote_reserve: dec!(1000),
            base_reserve: dec!(100),
            trade_limit_ratio: dec!(0.9),
            fluctuation_limit_ratio: Decimal::ZERO,
            toll_ratio: Decimal::ZERO,
            spread_ratio: Decimal::ZERO,
            funding_period_secs: 3600,
            funding_buffer_secs: 1800,
            open_interest_cap: Decimal::ZERO,
        }
    }
}

impl AmmConfig {
    /// Preset with fees and the fluctuation guard switched on, the shape a
    /// production market runs with.
    pub fn guarded() -> Self {
        Self {
            fluctuation_limit_ratio: dec!(0.012),
            toll_ratio: dec!(0.01),
            spread_ratio: dec!(0.005),
            open_interest_cap: dec!(100_000),
            ..Self::default()
        }
    }
}

/// Engine-wide risk parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Minimum margin ratio to open or to keep after removing margin.
    pub init_margin_ratio: Decimal,
    /// Below this ratio a position is liquidatable.
    pub maintenance_margin_ratio: Decimal,
    /// Liquidator reward as a fraction of the executed close notional.
    pub liquidation_fee_ratio: Decimal,
    /// Window for the time-weighted PnL measure.
    pub twap_interval_secs: i64,
    /// Event buffer cap; oldest entries are dropped past this.
    pub max_events: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            init_margin_ratio: dec!(0.1),
            maintenance_margin_ratio: dec!(0.0625),
            liquidation_fee_ratio: dec!(0.05),
            twap_interval_secs: 900,
            max_events: 10_000,
        }
    }
}

impl EngineConfig {
    /// Highest leverage the initial margin ratio admits.
    pub fn max_leverage(&self) -> Decimal {
        Decimal::ONE / self.init_margin_ratio
    }

    /// Tighter risk settings: 5x leverage cap, earlier liquidation.
    pub fn conservative() -> Self {
        Self {
            init_margin_ratio: dec!(0.2),
            maintenance_margin_ratio: dec!(0.1),
            ..Self::default()
        }
    }
}
