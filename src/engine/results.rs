// 8.0.2: result types and errors for clearing operations.

use crate::custody::CustodyError;
use crate::fixed::MathError;
use crate::types::MarketId;
use crate::vamm::VammError;
use rust_decimal::Decimal;

/// Summary of a position-changing action.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionChange {
    pub exchanged_quote: Decimal,
    pub exchanged_size: Decimal,
    pub realized_pnl: Decimal,
    pub fee: Decimal,
    pub size: Decimal,
    pub margin: Decimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FundingOutcome {
    pub premium_fraction: Decimal,
    pub funding_rate: Decimal,
    /// Net quote the pool gained (+) or lost (-) against traders this
    /// settlement, booked with the reserve fund.
    pub imbalance: Decimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LiquidationOutcome {
    pub liquidated_size: Decimal,
    pub exchanged_quote: Decimal,
    pub liquidator_reward: Decimal,
    pub bad_debt: Decimal,
    pub realized_pnl: Decimal,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EngineError {
    #[error("market {0:?} not found")]
    MarketNotFound(MarketId),

    #[error("market is closed")]
    MarketClosed(MarketId),

    #[error("positionSize is 0")]
    NoPosition,

    #[error("Margin is not enough")]
    InsufficientMargin,

    #[error("marginRatio not enough")]
    MarginRatioTooLow,

    #[error("Margin ratio is larger than min requirement")]
    MarginRatioAboveRequirement,

    #[error("reduce an underwater position")]
    UnderwaterReduction,

    #[error("only one action allowed")]
    OnlyOneActionPerBatch,

    #[error("over open interest cap")]
    OverOpenInterestCap,

    #[error("margin amount must be positive")]
    InvalidMarginAmount,

    #[error("invalid leverage")]
    InvalidLeverage,

    #[error(transparent)]
    Amm(#[from] VammError),

    #[error("custody: {0}")]
    Custody(#[from] CustodyError),

    #[error(transparent)]
    Math(#[from] MathError),
}
