// 9.1 reserve.rs: the reserve fund that backstops the engine, and the fee
// sink trades pay into. both mocked as balance counters; where the money goes
// from there is someone else's problem.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Absorbs funding and liquidation shortfalls, receives surpluses.
pub trait ReserveFund {
    fn cover_shortfall(&mut self, amount: Decimal);
    fn receive_surplus(&mut self, amount: Decimal);
    fn balance(&self) -> Decimal;
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct InMemoryReserveFund {
    balance: Decimal,
    total_covered: Decimal,
    total_received: Decimal,
}

impl InMemoryReserveFund {
    pub fn with_balance(balance: Decimal) -> Self {
        Self {
            balance,
            total_covered: Decimal::ZERO,
            total_received: Decimal::ZERO,
        }
    }

    pub fn total_covered(&self) -> Decimal {
        self.total_covered
    }

    pub fn total_received(&self) -> Decimal {
        self.total_received
    }
}

impl ReserveFund for InMemoryReserveFund {
    fn cover_shortfall(&mut self, amount: Decimal) {
        debug_assert!(amount >= Decimal::ZERO);
        self.balance -= amount;
        self.total_covered += amount;
    }

    fn receive_surplus(&mut self, amount: Decimal) {
        debug_assert!(amount >= Decimal::ZERO);
        self.balance += amount;
        self.total_received += amount;
    }

    fn balance(&self) -> Decimal {
        self.balance
    }
}

/// Where toll and spread go. Kept as an interface: the engine only prices
/// the fees, routing policy lives behind this trait.
pub trait FeeSink {
    fn collect(&mut self, toll: Decimal, spread: Decimal);
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct AccumulatingFeeSink {
    pub toll_collected: Decimal,
    pub spread_collected: Decimal,
}

impl AccumulatingFeeSink {
    pub fn total(&self) -> Decimal {
        self.toll_collected + self.spread_collected
    }
}

impl FeeSink for AccumulatingFeeSink {
    fn collect(&mut self, toll: Decimal, spread: Decimal) {
        self.toll_collected += toll;
        self.spread_collected += spread;
    }
}
