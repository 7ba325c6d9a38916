// In-memory token ledger.
//
// Collateral and synthetic balances the engine moves during an operation. Every call is
// atomic on its own and can fail; the engine's rollback makes a failure abort the whole
// operation. There is no allowance step: a `transfer` from an owner is treated as an
// approved pull.

use crate::fixed_point::{FixedPoint, MathError};
use crate::types::Address;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("ERC20: transfer amount exceeds balance")]
    InsufficientBalance { owner: Address, available: FixedPoint, requested: FixedPoint },
    #[error("ERC20: burn amount exceeds balance")]
    BurnExceedsBalance { owner: Address, available: FixedPoint, requested: FixedPoint },
    #[error("token supply overflow: {0}")]
    Math(#[from] MathError),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenLedger {
    symbol: String,
    balances: HashMap<Address, FixedPoint>,
    total_supply: FixedPoint,
}

impl TokenLedger {
    pub fn new(symbol: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            balances: HashMap::new(),
            total_supply: FixedPoint::ZERO,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn balance_of(&self, owner: Address) -> FixedPoint {
        self.balances.get(&owner).copied().unwrap_or_default()
    }

    pub fn total_supply(&self) -> FixedPoint {
        self.total_supply
    }

    pub fn transfer(&mut self, from: Address, to: Address, amount: FixedPoint) -> Result<(), TokenError> {
        let available = self.balance_of(from);
        if available < amount {
            return Err(TokenError::InsufficientBalance {
                owner: from,
                available,
                requested: amount,
            });
        }
        if amount.is_zero() || from == to {
            return Ok(());
        }
        let credited = self.balance_of(to).add(amount)?;
        self.balances.insert(from, available.sub(amount)?);
        self.balances.insert(to, credited);
        Ok(())
    }

    pub fn mint(&mut self, to: Address, amount: FixedPoint) -> Result<(), TokenError> {
        let supply = self.total_supply.add(amount)?;
        let balance = self.balance_of(to).add(amount)?;
        self.total_supply = supply;
        self.balances.insert(to, balance);
        Ok(())
    }

    pub fn burn(&mut self, from: Address, amount: FixedPoint) -> Result<(), TokenError> {
        let available = self.balance_of(from);
        if available < amount {
            return Err(TokenError::BurnExceedsBalance {
                owner: from,
                available,
                requested: amount,
            });
        }
        self.total_supply = self.total_supply.sub(amount)?;
        self.balances.insert(from, available.sub(amount)?);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn units(n: u64) -> FixedPoint {
        FixedPoint::from_unscaled(n)
    }

    #[test]
    fn test_transfer_flow() {
        let mut ledger = TokenLedger::new("USDC");
        ledger.mint(Address(1), units(100)).unwrap();
        ledger.transfer(Address(1), Address(2), units(40)).unwrap();

        assert_eq!(ledger.balance_of(Address(1)), units(60));
        assert_eq!(ledger.balance_of(Address(2)), units(40));
        assert_eq!(ledger.total_supply(), units(100));
    }

    #[test]
    fn test_insufficient_balance() {
        let mut ledger = TokenLedger::new("USDC");
        ledger.mint(Address(1), units(10)).unwrap();

        let err = ledger.transfer(Address(1), Address(2), units(11)).unwrap_err();
        assert_eq!(err.to_string(), "ERC20: transfer amount exceeds balance");
        assert_eq!(ledger.balance_of(Address(1)), units(10));
    }

    #[test]
    fn test_burn() {
        let mut ledger = TokenLedger::new("jEUR");
        ledger.mint(Address(1), units(10)).unwrap();
        ledger.burn(Address(1), units(4)).unwrap();
        assert_eq!(ledger.total_supply(), units(6));

        let err = ledger.burn(Address(1), units(7)).unwrap_err();
        assert!(matches!(err, TokenError::BurnExceedsBalance { .. }));
    }

    #[test]
    fn test_self_transfer_is_noop() {
        let mut ledger = TokenLedger::new("USDC");
        ledger.mint(Address(1), units(5)).unwrap();
        ledger.transfer(Address(1), Address(1), units(5)).unwrap();
        assert_eq!(ledger.balance_of(Address(1)), units(5));
    }
}
