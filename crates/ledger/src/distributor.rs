//! Batch distribution: the distributor's two entry points.
//!
//! Both paths share the same shape: validate every entry in order, sum the
//! batch, check the funding, then replay all transfers on a scratch sheet.
//! Only a fully successful replay produces events.

use dispas_core::{Amount, Asset, PaymentBatch};

use crate::error::LedgerError;
use crate::ledger::{
    AllowanceSpent, DistributeFunds, DistributeTokens, FundsDistributed, Ledger, LedgerEvent,
    TokensDistributed, Transferred,
};

/// Check entries in sequence order (first violation wins) and return the sum.
pub fn validate_batch(payments: &PaymentBatch) -> Result<Amount, LedgerError> {
    if let Some((index, violation)) = payments.first_violation() {
        return Err(LedgerError::from_violation(index, violation));
    }
    payments.total().ok_or(LedgerError::Overflow)
}

impl Ledger {
    pub(crate) fn handle_distribute_funds(
        &self,
        cmd: &DistributeFunds,
    ) -> Result<Vec<LedgerEvent>, LedgerError> {
        let total = validate_batch(&cmd.payments)?;

        // Exact match only: overpayment is rejected just like underpayment.
        if cmd.value != total {
            return Err(LedgerError::InsufficientValue {
                sent: cmd.value,
                required: total,
            });
        }

        let events = self.plan_payouts(Asset::Native, cmd.sender, &cmd.payments, total)?;
        Ok(with_summary(
            events,
            LedgerEvent::FundsDistributed(FundsDistributed {
                sender: cmd.sender,
                total,
            }),
        ))
    }

    pub(crate) fn handle_distribute_tokens(
        &self,
        cmd: &DistributeTokens,
    ) -> Result<Vec<LedgerEvent>, LedgerError> {
        let total = validate_batch(&cmd.payments)?;

        let distributor = self.distributor();
        let allowed = self
            .known_token(cmd.token)?
            .allowance(cmd.sender, distributor);
        if allowed < total {
            return Err(LedgerError::InsufficientAllowance {
                allowed,
                required: total,
            });
        }

        let mut events = Vec::with_capacity(cmd.payments.len() + 3);
        if !total.is_zero() {
            events.push(LedgerEvent::AllowanceSpent(AllowanceSpent {
                token: cmd.token,
                owner: cmd.sender,
                spender: distributor,
                amount: total,
            }));
        }
        events.extend(self.plan_payouts(Asset::Token(cmd.token), cmd.sender, &cmd.payments, total)?);

        Ok(with_summary(
            events,
            LedgerEvent::TokensDistributed(TokensDistributed {
                sender: cmd.sender,
                token: cmd.token,
                total,
            }),
        ))
    }

    /// Pull `total` from the sender into the distributor, then push each payment.
    fn plan_payouts(
        &self,
        asset: Asset,
        sender: dispas_core::Address,
        payments: &PaymentBatch,
        total: Amount,
    ) -> Result<Vec<LedgerEvent>, LedgerError> {
        let distributor = self.distributor();
        let mut sheet = self.sheet(asset)?;
        let mut events = Vec::with_capacity(payments.len() + 1);

        if !total.is_zero() {
            sheet.transfer(sender, distributor, total)?;
            events.push(LedgerEvent::Transferred(Transferred {
                asset,
                from: sender,
                to: distributor,
                amount: total,
            }));
        }

        for payment in payments {
            // The distributor has no way to forward value sent to itself.
            if payment.recipient == distributor {
                return Err(LedgerError::DirectTransferRejected);
            }
            sheet.transfer(distributor, payment.recipient, payment.amount)?;
            events.push(LedgerEvent::Transferred(Transferred {
                asset,
                from: distributor,
                to: payment.recipient,
                amount: payment.amount,
            }));
        }

        Ok(events)
    }
}

fn with_summary(mut events: Vec<LedgerEvent>, summary: LedgerEvent) -> Vec<LedgerEvent> {
    events.push(summary);
    events
}
