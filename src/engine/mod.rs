// 8.0: the clearing engine. coordinates position changes, margin
// maintenance, funding settlement, and liquidations against each market's
// amm. deterministic and event-driven with no external I/O.

mod core;
mod funding;
mod liquidations;
mod margin;
mod positions;
mod results;

pub use self::core::{ClearingEngine, MarketState};
pub use margin::PnlMeasure;
pub use results::{EngineError, FundingOutcome, LiquidationOutcome, PositionChange};
