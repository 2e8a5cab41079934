//! Scratch balance sheets for planning a transaction before it commits.

use std::collections::HashMap;

use dispas_core::{Address, Amount};

use crate::error::LedgerError;

/// Committed balances of one asset.
pub type Balances = HashMap<Address, Amount>;

/// Copy-on-write view over committed balances.
///
/// A command replays its transfers here first. Only when every step succeeds
/// are the corresponding events emitted; a failure simply drops the sheet.
#[derive(Debug)]
pub(crate) struct BalanceSheet<'a> {
    committed: &'a Balances,
    pending: HashMap<Address, Amount>,
}

impl<'a> BalanceSheet<'a> {
    pub(crate) fn new(committed: &'a Balances) -> Self {
        Self {
            committed,
            pending: HashMap::new(),
        }
    }

    pub(crate) fn balance(&self, account: Address) -> Amount {
        self.pending
            .get(&account)
            .or_else(|| self.committed.get(&account))
            .copied()
            .unwrap_or(Amount::ZERO)
    }

    pub(crate) fn credit(&mut self, account: Address, amount: Amount) -> Result<(), LedgerError> {
        let next = self
            .balance(account)
            .checked_add(amount)
            .ok_or(LedgerError::Overflow)?;
        self.pending.insert(account, next);
        Ok(())
    }

    pub(crate) fn debit(&mut self, account: Address, amount: Amount) -> Result<(), LedgerError> {
        let available = self.balance(account);
        let next = available
            .checked_sub(amount)
            .ok_or(LedgerError::InsufficientBalance {
                account,
                available,
                required: amount,
            })?;
        self.pending.insert(account, next);
        Ok(())
    }

    pub(crate) fn transfer(
        &mut self,
        from: Address,
        to: Address,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        self.debit(from, amount)?;
        self.credit(to, amount)
    }
}

/// Apply a committed credit. Overflow was ruled out when the event was decided.
pub(crate) fn credit(balances: &mut Balances, account: Address, amount: Amount) {
    let entry = balances.entry(account).or_insert(Amount::ZERO);
    *entry = entry.saturating_add(amount);
}

/// Apply a committed debit. Sufficiency was checked when the event was decided.
pub(crate) fn debit(balances: &mut Balances, account: Address, amount: Amount) {
    let entry = balances.entry(account).or_insert(Amount::ZERO);
    *entry = entry.saturating_sub(amount);
}
