// 8.0 engine/core.rs: the clearing engine. holds every market's amm and
// restriction state, the position ledger, the collaborator boundaries, and
// the injected batch/time clock. all mutation funnels through here, one
// logical transaction at a time.

use super::results::EngineError;
use crate::config::{AmmConfig, EngineConfig};
use crate::custody::{Custody, VaultCustody};
use crate::events::{EventLog, EventPayload};
use crate::ledger::PositionLedger;
use crate::oracle::{FixedOracle, Oracle};
use crate::position::Position;
use crate::reserve::{AccumulatingFeeSink, FeeSink, InMemoryReserveFund, ReserveFund};
use crate::types::{MarketId, Timestamp, TraderId};
use crate::vamm::Vamm;
use rust_decimal::Decimal;

/// Per-market runtime state around the amm.
#[derive(Debug)]
pub struct MarketState {
    pub vamm: Vamm,
    pub open: bool,
    pub open_interest_notional: Decimal,
    pub open_interest_cap: Decimal,
    /// Batch in which an override/liquidation restricted this market.
    pub(super) restricted_batch: Option<u64>,
}

impl MarketState {
    pub fn is_restricted_in(&self, batch: u64) -> bool {
        self.restricted_batch == Some(batch)
    }
}

#[derive(Debug)]
pub struct ClearingEngine<
    C = VaultCustody,
    R = InMemoryReserveFund,
    O = FixedOracle,
    F = AccumulatingFeeSink,
> {
    pub(super) config: EngineConfig,
    pub(super) markets: std::collections::HashMap<MarketId, MarketState>,
    pub(super) ledger: PositionLedger,
    pub(super) custody: C,
    pub(super) reserve_fund: R,
    pub(super) oracle: O,
    pub(super) fee_sink: F,
    pub(super) events: EventLog,
    pub(super) current_time: Timestamp,
    pub(super) current_batch: u64,
}

impl ClearingEngine {
    /// Engine wired to the in-memory collaborators.
    pub fn new(config: EngineConfig) -> Self {
        Self::with_collaborators(
            config,
            VaultCustody::new(),
            InMemoryReserveFund::default(),
            FixedOracle::new(Decimal::ONE),
            AccumulatingFeeSink::default(),
        )
    }
}

impl<C, R, O, F> ClearingEngine<C, R, O, F>
where
    C: Custody,
    R: ReserveFund,
    O: Oracle,
    F: FeeSink,
{
    pub fn with_collaborators(
        config: EngineConfig,
        custody: C,
        reserve_fund: R,
        oracle: O,
        fee_sink: F,
    ) -> Self {
        let max_events = config.max_events;
        Self {
            config,
            markets: std::collections::HashMap::new(),
            ledger: PositionLedger::new(),
            custody,
            reserve_fund,
            oracle,
            fee_sink,
            events: EventLog::new(max_events),
            current_time: Timestamp::from_secs(0),
            current_batch: 1,
        }
    }

    pub fn set_time(&mut self, timestamp: Timestamp) {
        self.current_time = timestamp;
    }

    pub fn advance_time(&mut self, secs: i64) {
        self.current_time = self.current_time.plus(secs);
    }

    pub fn time(&self) -> Timestamp {
        self.current_time
    }

    /// Start the next batch. Fluctuation references and restriction flags
    /// are scoped to a batch, so the sequencer calls this between units of
    /// ordering.
    pub fn advance_batch(&mut self) {
        self.current_batch += 1;
    }

    pub fn batch(&self) -> u64 {
        self.current_batch
    }

    pub fn add_market(&mut self, market_id: MarketId, config: AmmConfig) -> Result<MarketId, EngineError> {
        let cap = config.open_interest_cap;
        let vamm = Vamm::new(config, self.current_time, self.current_batch)?;
        self.markets.insert(
            market_id,
            MarketState {
                vamm,
                open: true,
                open_interest_notional: Decimal::ZERO,
                open_interest_cap: cap,
                restricted_batch: None,
            },
        );
        tracing::info!(market = market_id.0, "market added");
        Ok(market_id)
    }

    pub fn close_market(&mut self, market_id: MarketId) -> Result<(), EngineError> {
        let market = self
            .markets
            .get_mut(&market_id)
            .ok_or(EngineError::MarketNotFound(market_id))?;
        market.open = false;
        Ok(())
    }

    pub fn market(&self, market_id: MarketId) -> Result<&MarketState, EngineError> {
        self.markets
            .get(&market_id)
            .ok_or(EngineError::MarketNotFound(market_id))
    }

    pub fn spot_price(&self, market_id: MarketId) -> Result<Decimal, EngineError> {
        Ok(self.market(market_id)?.vamm.spot_price()?)
    }

    pub fn twap_price(&self, market_id: MarketId, interval_secs: i64) -> Result<Decimal, EngineError> {
        Ok(self
            .market(market_id)?
            .vamm
            .twap_price(self.current_time, interval_secs)?)
    }

    /// Resolved view of a trader's position: migration catch-up and funding
    /// applied, stored state untouched.
    pub fn position(
        &self,
        market_id: MarketId,
        trader: TraderId,
    ) -> Result<Option<Position>, EngineError> {
        let market = self.market(market_id)?;
        Ok(self.ledger.resolved(market_id, trader, &market.vamm)?)
    }

    pub fn custody(&self) -> &C {
        &self.custody
    }

    pub fn custody_mut(&mut self) -> &mut C {
        &mut self.custody
    }

    pub fn reserve_fund(&self) -> &R {
        &self.reserve_fund
    }

    pub fn oracle_mut(&mut self) -> &mut O {
        &mut self.oracle
    }

    pub fn fee_sink(&self) -> &F {
        &self.fee_sink
    }

    pub fn events(&self) -> &[crate::events::Event] {
        self.events.events()
    }

    pub(super) fn require_open_market(&self, market_id: MarketId) -> Result<(), EngineError> {
        let market = self.market(market_id)?;
        if !market.open {
            return Err(EngineError::MarketClosed(market_id));
        }
        Ok(())
    }

    /// Restriction mode: once an override or liquidation has touched the
    /// market in this batch, no further open/close/liquidate is allowed in
    /// it, no matter who calls.
    pub(super) fn check_restriction(&self, market_id: MarketId) -> Result<(), EngineError> {
        let market = self.market(market_id)?;
        if market.is_restricted_in(self.current_batch) {
            return Err(EngineError::OnlyOneActionPerBatch);
        }
        Ok(())
    }

    pub(super) fn emit(&mut self, payload: EventPayload) {
        self.events.emit(self.current_time, self.current_batch, payload);
    }

    /// Migrate a market's liquidity depth and report the new snapshot.
    pub fn migrate_liquidity(
        &mut self,
        market_id: MarketId,
        multiplier: Decimal,
    ) -> Result<(), EngineError> {
        let now = self.current_time;
        let batch = self.current_batch;
        let market = self
            .markets
            .get_mut(&market_id)
            .ok_or(EngineError::MarketNotFound(market_id))?;

        let snapshot = market.vamm.migrate_liquidity(multiplier, now, batch)?;
        tracing::info!(
            market = market_id.0,
            %multiplier,
            "liquidity migrated"
        );
        self.emit(EventPayload::LiquidityChanged(
            crate::events::LiquidityChangedEvent {
                market_id,
                quote_reserve: snapshot.quote_reserve,
                base_reserve: snapshot.base_reserve,
                cumulative_notional: snapshot.cumulative_notional,
                total_position_size: snapshot.total_position_size,
            },
        ));
        Ok(())
    }
}
