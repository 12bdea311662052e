// 9.0 custody.rs: quote-asset movement at the engine boundary. MOCKED here:
// the in-memory vault just moves balances, no real token transfers. transfers
// settle synchronously and atomically with the calling action.

use crate::types::TraderId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CustodyError {
    #[error("insufficient balance: requested {requested}, available {available}")]
    InsufficientBalance {
        requested: Decimal,
        available: Decimal,
    },

    #[error("transfer amount must be positive")]
    InvalidAmount,
}

/// Quote-asset custody as the engine sees it. `transfer_in` pulls collateral
/// from the trader into the vault, `transfer_out` pays it back.
pub trait Custody {
    fn transfer_in(&mut self, trader: TraderId, amount: Decimal) -> Result<(), CustodyError>;
    fn transfer_out(&mut self, trader: TraderId, amount: Decimal) -> Result<(), CustodyError>;
    fn balance_of(&self, trader: TraderId) -> Decimal;
}

/// In-memory vault: each trader has a free balance, transfers move quote
/// between it and the engine's pooled holdings.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct VaultCustody {
    balances: HashMap<TraderId, Decimal>,
    vault_balance: Decimal,
}

impl VaultCustody {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn credit(&mut self, trader: TraderId, amount: Decimal) {
        *self.balances.entry(trader).or_insert(Decimal::ZERO) += amount;
    }

    pub fn vault_balance(&self) -> Decimal {
        self.vault_balance
    }
}

impl Custody for VaultCustody {
    fn transfer_in(&mut self, trader: TraderId, amount: Decimal) -> Result<(), CustodyError> {
        if amount <= Decimal::ZERO {
            return Err(CustodyError::InvalidAmount);
        }
        let balance = self.balances.entry(trader).or_insert(Decimal::ZERO);
        if *balance < amount {
            return Err(CustodyError::InsufficientBalance {
                requested: amount,
                available: *balance,
            });
        }
        *balance -= amount;
        self.vault_balance += amount;
        Ok(())
    }

    fn transfer_out(&mut self, trader: TraderId, amount: Decimal) -> Result<(), CustodyError> {
        if amount <= Decimal::ZERO {
            return Err(CustodyError::InvalidAmount);
        }
        self.vault_balance -= amount;
        *self.balances.entry(trader).or_insert(Decimal::ZERO) += amount;
        Ok(())
    }

    fn balance_of(&self, trader: TraderId) -> Decimal {
        self.balances
            .get(&trader)
            .copied()
            .unwrap_or(Decimal::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn transfers_move_quote_both_ways() {
        let mut vault = VaultCustody::new();
        vault.credit(TraderId(1), dec!(1000));

        vault.transfer_in(TraderId(1), dec!(400)).unwrap();
        assert_eq!(vault.balance_of(TraderId(1)), dec!(600));
        assert_eq!(vault.vault_balance(), dec!(400));

        vault.transfer_out(TraderId(1), dec!(150)).unwrap();
        assert_eq!(vault.balance_of(TraderId(1)), dec!(750));
        assert_eq!(vault.vault_balance(), dec!(250));
    }

    #[test]
    fn transfer_in_requires_balance() {
        let mut vault = VaultCustody::new();
        vault.credit(TraderId(1), dec!(100));

        let result = vault.transfer_in(TraderId(1), dec!(200));
        assert!(matches!(
            result,
            Err(CustodyError::InsufficientBalance { .. })
        ));
    }

    #[test]
    fn zero_transfers_rejected() {
        let mut vault = VaultCustody::new();
        assert_eq!(
            vault.transfer_in(TraderId(1), Decimal::ZERO),
            Err(CustodyError::InvalidAmount)
        );
    }
}
