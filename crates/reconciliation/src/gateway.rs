//! Collaborator adapter over an in-process [`LedgerService`].

use std::sync::{Arc, Mutex, MutexGuard};

use dispas_core::{Address, Amount};
use dispas_ledger::{LedgerError, LedgerService};

use crate::collaborators::{AllowanceProvider, TransactionSubmitter, TxHandle, TxIntent};
use crate::error::SubmitError;

/// Submits intents straight to a shared ledger. Clones share the same ledger.
#[derive(Debug, Clone)]
pub struct LedgerGateway {
    service: Arc<Mutex<LedgerService>>,
}

impl LedgerGateway {
    pub fn new(service: LedgerService) -> Self {
        Self::shared(Arc::new(Mutex::new(service)))
    }

    pub fn shared(service: Arc<Mutex<LedgerService>>) -> Self {
        Self { service }
    }

    pub fn service(&self) -> Arc<Mutex<LedgerService>> {
        Arc::clone(&self.service)
    }

    /// Run `f` against the ledger while holding the lock.
    pub fn with_service<T>(
        &self,
        f: impl FnOnce(&mut LedgerService) -> T,
    ) -> Result<T, SubmitError> {
        let mut guard = self.lock()?;
        Ok(f(&mut guard))
    }

    fn lock(&self) -> Result<MutexGuard<'_, LedgerService>, SubmitError> {
        self.service
            .lock()
            .map_err(|_| SubmitError::Unavailable("ledger lock poisoned".to_string()))
    }
}

impl TransactionSubmitter for LedgerGateway {
    fn submit(&mut self, sender: Address, intent: &TxIntent) -> Result<TxHandle, SubmitError> {
        let mut service = self.lock()?;
        let receipt = match intent {
            TxIntent::Transfer { asset, to, amount } => service.transfer(*asset, sender, *to, *amount),
            TxIntent::DistributeFunds { payments, value } => {
                service.distribute_funds(sender, payments.clone(), *value)
            }
            TxIntent::DistributeTokens { token, payments } => {
                service.distribute_tokens(sender, *token, payments.clone())
            }
            TxIntent::Approve { token, amount } => service.approve(*token, sender, *amount),
        }
        .map_err(SubmitError::Rejected)?;

        tracing::debug!(tx = %receipt.tx_id, kind = intent.kind(), sender = %sender, "intent submitted");
        Ok(TxHandle {
            tx_id: receipt.tx_id,
        })
    }
}

impl AllowanceProvider for LedgerGateway {
    fn allowance(&self, token: Address, owner: Address) -> Result<Amount, SubmitError> {
        let service = self.lock()?;
        if service.token(token).is_none() {
            return Err(SubmitError::Rejected(LedgerError::UnknownToken(token)));
        }
        Ok(service.allowance(token, owner, service.distributor()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dispas_core::{Asset, Payment, PaymentBatch};

    fn addr(n: u8) -> Address {
        let mut bytes = [0u8; 20];
        bytes[19] = n;
        Address::from_bytes(bytes)
    }

    fn funded() -> LedgerGateway {
        let mut service = LedgerService::new(addr(0xd1));
        service.mint(Asset::Native, addr(1), Amount::from_units(1_000)).unwrap();
        LedgerGateway::new(service)
    }

    #[test]
    fn distribute_funds_intent_reaches_the_ledger() {
        let mut gateway = funded();
        let handle = gateway
            .submit(
                addr(1),
                &TxIntent::DistributeFunds {
                    payments: PaymentBatch::new(vec![
                        Payment::new(addr(2), Amount::from_units(300)),
                        Payment::new(addr(3), Amount::from_units(200)),
                    ]),
                    value: Amount::from_units(500),
                },
            )
            .unwrap();

        let (b2, logged) = gateway
            .with_service(|s| (s.balance_of(addr(2)), s.logs_for(handle.tx_id).count()))
            .unwrap();
        assert_eq!(b2, Amount::from_units(300));
        assert!(logged > 0);
    }

    #[test]
    fn reverts_come_back_as_rejections() {
        let mut gateway = funded();
        let err = gateway
            .submit(
                addr(1),
                &TxIntent::DistributeFunds {
                    payments: PaymentBatch::new(vec![Payment::new(addr(2), Amount::from_units(1))]),
                    value: Amount::from_units(2),
                },
            )
            .unwrap_err();
        assert_eq!(
            err,
            SubmitError::Rejected(LedgerError::InsufficientValue {
                sent: Amount::from_units(2),
                required: Amount::from_units(1),
            })
        );
    }

    #[test]
    fn allowance_reads_the_distributor_allowance() {
        let mut gateway = funded();
        assert!(matches!(
            gateway.allowance(addr(0x70), addr(1)),
            Err(SubmitError::Rejected(LedgerError::UnknownToken(_)))
        ));

        gateway
            .with_service(|s| s.deploy_token(addr(0x70), "Test Token", "TEST", 18))
            .unwrap()
            .unwrap();
        gateway
            .submit(
                addr(1),
                &TxIntent::Approve {
                    token: addr(0x70),
                    amount: Amount::from_units(42),
                },
            )
            .unwrap();
        assert_eq!(gateway.allowance(addr(0x70), addr(1)).unwrap(), Amount::from_units(42));
    }
}
