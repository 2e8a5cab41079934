//! Fungible token contracts hosted by the ledger.

use std::collections::HashMap;

use dispas_core::{Address, Amount};

use crate::balances::Balances;

/// State of one fungible token: balances plus approve-then-pull allowances.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenContract {
    name: String,
    symbol: String,
    decimals: u8,
    pub(crate) balances: Balances,
    /// (owner, spender) → remaining allowance.
    pub(crate) allowances: HashMap<(Address, Address), Amount>,
}

impl TokenContract {
    pub fn new(name: impl Into<String>, symbol: impl Into<String>, decimals: u8) -> Self {
        Self {
            name: name.into(),
            symbol: symbol.into(),
            decimals,
            balances: Balances::new(),
            allowances: HashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn decimals(&self) -> u8 {
        self.decimals
    }

    pub fn balance_of(&self, owner: Address) -> Amount {
        self.balances.get(&owner).copied().unwrap_or(Amount::ZERO)
    }

    pub fn allowance(&self, owner: Address, spender: Address) -> Amount {
        self.allowances
            .get(&(owner, spender))
            .copied()
            .unwrap_or(Amount::ZERO)
    }

    pub fn total_supply(&self) -> Amount {
        self.balances
            .values()
            .fold(Amount::ZERO, |acc, b| acc.saturating_add(*b))
    }

    pub(crate) fn set_allowance(&mut self, owner: Address, spender: Address, amount: Amount) {
        if amount.is_zero() {
            self.allowances.remove(&(owner, spender));
        } else {
            self.allowances.insert((owner, spender), amount);
        }
    }

    pub(crate) fn spend_allowance(&mut self, owner: Address, spender: Address, amount: Amount) {
        let remaining = self.allowance(owner, spender).saturating_sub(amount);
        self.set_allowance(owner, spender, remaining);
    }
}
