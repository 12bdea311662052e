// vamm-core: perpetual futures settlement engine on a virtual AMM.
// curve-first architecture: pricing, funding, and solvency all derive from
// the constant-product reserve pair. all computation is deterministic with
// no external I/O; time and batch ordering are injected.
//
// file map (search X.0 for structs, X.1+ for logic):
//   1.x  types.rs: primitives: MarketId, TraderId, Side, Direction, Timestamp
//   2.x  fixed.rs: fixed-point rounding rules, checked arithmetic
//   3.x  vamm/: reserve pair, curve pricing, swaps, snapshots, TWAP,
//        funding settlement, liquidity migration
//   4.x  position.rs, ledger.rs: position records and the resolve choke point
//   7.x  config.rs: amm and engine parameters
//   8.x  engine/: clearing engine: open/close/margin, liquidation, funding
//   9.x  custody.rs, reserve.rs, oracle.rs: collaborator boundaries (mocked)
//   11.x events.rs: state transition events for audit

pub mod config;
pub mod custody;
pub mod engine;
pub mod events;
pub mod fixed;
pub mod ledger;
pub mod oracle;
pub mod position;
pub mod reserve;
pub mod types;
pub mod vamm;

pub use config::{AmmConfig, EngineConfig};
pub use custody::{Custody, CustodyError, VaultCustody};
pub use engine::{
    ClearingEngine, EngineError, FundingOutcome, LiquidationOutcome, MarketState, PnlMeasure,
    PositionChange,
};
pub use events::{Event, EventId, EventPayload};
pub use fixed::MathError;
pub use ledger::PositionLedger;
pub use oracle::{FixedOracle, Oracle};
pub use position::Position;
pub use reserve::{AccumulatingFeeSink, FeeSink, InMemoryReserveFund, ReserveFund};
pub use types::{Direction, MarketId, Side, Timestamp, TraderId};
pub use vamm::{Fee, SwapOutcome, Vamm, VammError};
