// 11.0: every state change produces an event. numeric fields are written
// exactly as computed so downstream consumers can reconcile bit for bit.

use crate::types::{Direction, MarketId, Side, Timestamp, TraderId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventId(pub u64);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub timestamp: Timestamp,
    pub batch: u64,
    pub payload: EventPayload,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EventPayload {
    SwapExecuted(SwapExecutedEvent),
    ReserveSnapshotTaken(ReserveSnapshotTakenEvent),
    FundingRateUpdated(FundingRateUpdatedEvent),
    PositionAdjusted(PositionAdjustedEvent),
    PositionChanged(PositionChangedEvent),
    PositionLiquidated(PositionLiquidatedEvent),
    LiquidityChanged(LiquidityChangedEvent),
    MarginChanged(MarginChangedEvent),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwapExecutedEvent {
    pub market_id: MarketId,
    pub direction: Direction,
    pub quote_amount: Decimal,
    pub base_amount: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReserveSnapshotTakenEvent {
    pub market_id: MarketId,
    pub quote_reserve: Decimal,
    pub base_reserve: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FundingRateUpdatedEvent {
    pub market_id: MarketId,
    pub rate: Decimal,
    pub underlying_price: Decimal,
    pub cumulative_premium_fraction: Decimal,
}

/// A position's size changed without a trade by its owner: liquidity
/// migration catch-up.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionAdjustedEvent {
    pub market_id: MarketId,
    pub trader: TraderId,
    pub new_size: Decimal,
    pub old_liquidity_index: usize,
    pub new_liquidity_index: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionChangedEvent {
    pub market_id: MarketId,
    pub trader: TraderId,
    pub side: Side,
    pub exchanged_quote: Decimal,
    pub exchanged_size: Decimal,
    pub realized_pnl: Decimal,
    pub fee: Decimal,
    pub size: Decimal,
    pub margin: Decimal,
    pub spot_price: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionLiquidatedEvent {
    pub market_id: MarketId,
    pub trader: TraderId,
    pub liquidator: TraderId,
    pub size: Decimal,
    pub notional: Decimal,
    pub fee: Decimal,
    pub bad_debt: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiquidityChangedEvent {
    pub market_id: MarketId,
    pub quote_reserve: Decimal,
    pub base_reserve: Decimal,
    pub cumulative_notional: Decimal,
    pub total_position_size: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarginChangedEvent {
    pub market_id: MarketId,
    pub trader: TraderId,
    /// Positive for added margin, negative for removed.
    pub amount: Decimal,
    pub funding_payment: Decimal,
}

/// Capped event buffer with sequential ids.
#[derive(Debug)]
pub struct EventLog {
    events: Vec<Event>,
    next_id: u64,
    cap: usize,
}

impl EventLog {
    pub fn new(cap: usize) -> Self {
        Self {
            events: Vec::new(),
            next_id: 1,
            cap,
        }
    }

    pub fn emit(&mut self, timestamp: Timestamp, batch: u64, payload: EventPayload) {
        let event = Event {
            id: EventId(self.next_id),
            timestamp,
            batch,
            payload,
        };
        self.next_id += 1;
        self.events.push(event);

        if self.events.len() > self.cap {
            let drain = self.events.len() - self.cap;
            self.events.drain(0..drain);
        }
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn recent(&self, count: usize) -> &[Event] {
        let start = self.events.len().saturating_sub(count);
        &self.events[start..]
    }
}
