// 3.1: reserve and liquidity snapshot history. reserve snapshots feed the
// time-weighted price walks; liquidity snapshots anchor position rescaling
// after depth migrations.

use crate::fixed::{div_dn, MathError};
use crate::types::Timestamp;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Reserve state after a mutating call. At most one snapshot is retained per
/// batch: a repeat mutation in the same batch overwrites the last entry, so
/// time weighting never sees more than one zero-duration sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReserveSnapshot {
    pub quote_reserve: Decimal,
    pub base_reserve: Decimal,
    pub timestamp: Timestamp,
    pub batch: u64,
}

impl ReserveSnapshot {
    pub fn spot_price(&self) -> Result<Decimal, MathError> {
        div_dn(self.quote_reserve, self.base_reserve)
    }
}

/// Append-only record of a depth migration. Index 0 is genesis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LiquiditySnapshot {
    pub quote_reserve: Decimal,
    pub base_reserve: Decimal,
    pub total_position_size: Decimal,
    pub cumulative_notional: Decimal,
}

pub(crate) fn record(history: &mut Vec<ReserveSnapshot>, snapshot: ReserveSnapshot) {
    if let Some(last) = history.last_mut() {
        if last.batch == snapshot.batch {
            *last = snapshot;
            return;
        }
    }
    history.push(snapshot);
}

/// Latest snapshot taken before the given batch. This is the fluctuation
/// reference: the reserve state at the start of the batch, carried forward
/// when no trade has happened since.
pub(crate) fn reference_before_batch(history: &[ReserveSnapshot], batch: u64) -> &ReserveSnapshot {
    history
        .iter()
        .rev()
        .find(|s| s.batch < batch)
        .unwrap_or(&history[0])
}

/// Walk the snapshot history backward from `now`, weighting each snapshot's
/// derived value by the wall-clock seconds it was the current reserve state.
/// The oldest snapshot crossed gets partial weight; if recorded history is
/// shorter than the interval only the available history is averaged. A zero
/// interval returns the latest snapshot's value.
pub(crate) fn time_weighted<F>(
    history: &[ReserveSnapshot],
    now: Timestamp,
    interval_secs: i64,
    value_of: F,
) -> Result<Decimal, super::VammError>
where
    F: Fn(&ReserveSnapshot) -> Result<Decimal, super::VammError>,
{
    debug_assert!(!history.is_empty(), "snapshot history starts at genesis");
    let latest = history.last().expect("non-empty history");
    if interval_secs <= 0 || history.len() == 1 {
        return value_of(latest);
    }

    let boundary = now.as_secs() - interval_secs;
    let mut weighted_sum = Decimal::ZERO;
    let mut total_secs: i64 = 0;
    let mut period_end = now.as_secs();

    for snapshot in history.iter().rev() {
        let value = value_of(snapshot)?;
        if snapshot.timestamp.as_secs() <= boundary {
            let weight = period_end - boundary;
            weighted_sum += value * Decimal::from(weight);
            total_secs += weight;
            break;
        }
        let weight = period_end - snapshot.timestamp.as_secs();
        weighted_sum += value * Decimal::from(weight);
        total_secs += weight;
        period_end = snapshot.timestamp.as_secs();
    }

    if total_secs == 0 {
        return value_of(latest);
    }
    Ok(div_dn(weighted_sum, Decimal::from(total_secs))?)
}
