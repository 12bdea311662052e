// 8.4 engine/funding.rs: funding settlement. the amm produces the premium
// fraction; the engine books the resulting imbalance between what longs pay
// and shorts receive against the reserve fund.

use super::core::ClearingEngine;
use super::results::{EngineError, FundingOutcome};
use crate::custody::Custody;
use crate::events::{EventPayload, FundingRateUpdatedEvent};
use crate::fixed::{div_dn, mul_dn};
use crate::oracle::Oracle;
use crate::reserve::{FeeSink, ReserveFund};
use crate::types::MarketId;
use rust_decimal::Decimal;

impl<C, R, O, F> ClearingEngine<C, R, O, F>
where
    C: Custody,
    R: ReserveFund,
    O: Oracle,
    F: FeeSink,
{
    /// Settle the funding period for a market. The premium fraction applies
    /// to every position lazily via the cumulative sum; the pool's net gain
    /// or loss against aggregate trader exposure settles with the reserve
    /// fund immediately.
    pub fn pay_funding(&mut self, market_id: MarketId) -> Result<FundingOutcome, EngineError> {
        self.require_open_market(market_id)?;
        let now = self.current_time;

        let window = {
            let market = self.market(market_id)?;
            market.vamm.funding.funding_period
        };
        let oracle_twap = self.oracle.twap_price(window);
        let underlying_price = self.oracle.twap_price(0);

        let (settlement, total_position_size, cumulative) = {
            let market = self
                .markets
                .get_mut(&market_id)
                .ok_or(EngineError::MarketNotFound(market_id))?;
            let settlement = market.vamm.settle_funding(now, oracle_twap)?;
            (
                settlement,
                market.vamm.total_position_size(),
                market.vamm.funding.cumulative_premium_fraction,
            )
        };

        let funding_rate = div_dn(settlement.premium_fraction, underlying_price)?;

        // longs pay when the fraction is positive; with traders net long the
        // pool collects the difference, otherwise it owes it
        let imbalance = mul_dn(settlement.premium_fraction, total_position_size)?;
        if imbalance > Decimal::ZERO {
            self.reserve_fund.receive_surplus(imbalance);
        } else if imbalance < Decimal::ZERO {
            self.reserve_fund.cover_shortfall(-imbalance);
        }

        tracing::info!(
            market = market_id.0,
            premium_fraction = %settlement.premium_fraction,
            %funding_rate,
            "funding settled"
        );
        self.emit(EventPayload::FundingRateUpdated(FundingRateUpdatedEvent {
            market_id,
            rate: funding_rate,
            underlying_price,
            cumulative_premium_fraction: cumulative,
        }));

        Ok(FundingOutcome {
            premium_fraction: settlement.premium_fraction,
            funding_rate,
            imbalance,
        })
    }
}
