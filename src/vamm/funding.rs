// 3.2: periodic funding. once per period the premium between the pool's
// time-weighted price and the oracle's is folded into a cumulative fraction;
// positions accrue against that running sum, never against mutable history.

use super::{Vamm, VammError};
use crate::fixed::{checked_add, div_dn, MathError};
use crate::types::{Timestamp, SECONDS_PER_DAY};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FundingState {
    pub next_funding_time: Timestamp,
    pub funding_period: i64,
    pub funding_buffer: i64,
    /// Running sum of settled premium fractions. Only settlement ever moves
    /// it, and only forward in history.
    pub cumulative_premium_fraction: Decimal,
}

impl FundingState {
    pub fn new(now: Timestamp, funding_period: i64, funding_buffer: i64) -> Self {
        Self {
            next_funding_time: now.plus(funding_period),
            funding_period,
            funding_buffer,
            cumulative_premium_fraction: Decimal::ZERO,
        }
    }
}

/// What one settlement produced.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FundingSettlement {
    pub premium_fraction: Decimal,
    pub amm_twap: Decimal,
    pub oracle_twap: Decimal,
}

impl Vamm {
    /// Settle the funding period. Rejected before `next_funding_time`. The
    /// premium is measured between the pool's TWAP over the funding window
    /// and the oracle's, scaled by period length over one day. Calling inside
    /// the buffer keeps the schedule un-drifted; calling late restarts it
    /// from now.
    pub fn settle_funding(
        &mut self,
        now: Timestamp,
        oracle_twap: Decimal,
    ) -> Result<FundingSettlement, VammError> {
        if now < self.funding.next_funding_time {
            return Err(VammError::SettleFundingTooEarly);
        }

        let amm_twap = self.twap_price(now, self.funding.funding_period)?;
        let premium = amm_twap
            .checked_sub(oracle_twap)
            .ok_or(MathError::Overflow)?;
        let scaled = premium
            .checked_mul(Decimal::from(self.funding.funding_period))
            .ok_or(MathError::Overflow)?;
        let premium_fraction = div_dn(scaled, Decimal::from(SECONDS_PER_DAY))?;

        self.funding.cumulative_premium_fraction = checked_add(
            self.funding.cumulative_premium_fraction,
            premium_fraction,
        )?;

        let scheduled = self.funding.next_funding_time;
        let in_buffer = now < scheduled.plus(self.funding.funding_buffer);
        self.funding.next_funding_time = if in_buffer {
            scheduled.plus(self.funding.funding_period)
        } else {
            now.plus(self.funding.funding_buffer)
        };

        // migration-corrected volume counter starts fresh each period
        self.base_asset_delta = Decimal::ZERO;

        Ok(FundingSettlement {
            premium_fraction,
            amm_twap,
            oracle_twap,
        })
    }
}
