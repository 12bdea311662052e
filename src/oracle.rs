// 9.2 oracle.rs: external reference price feed. the engine is agnostic to
// where the price comes from; it only ever asks for a time-weighted value
// over a window. window 0 means the current spot reference.

use rust_decimal::Decimal;

pub trait Oracle {
    fn twap_price(&self, window_secs: i64) -> Decimal;
}

/// Fixed-price oracle for tests and simulation.
#[derive(Debug, Clone)]
pub struct FixedOracle {
    price: Decimal,
}

impl FixedOracle {
    pub fn new(price: Decimal) -> Self {
        Self { price }
    }

    pub fn set_price(&mut self, price: Decimal) {
        self.price = price;
    }
}

impl Oracle for FixedOracle {
    fn twap_price(&self, _window_secs: i64) -> Decimal {
        self.price
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn fixed_oracle_returns_set_price() {
        let mut oracle = FixedOracle::new(dec!(2.1));
        assert_eq!(oracle.twap_price(3600), dec!(2.1));

        oracle.set_price(dec!(1.9));
        assert_eq!(oracle.twap_price(0), dec!(1.9));
    }
}
