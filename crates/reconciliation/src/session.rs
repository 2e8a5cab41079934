//! Settlement orchestration around one [`ReconciliationEngine`].
//!
//! ```text
//! send()
//!   ↓
//! 1. prepare_settlement (pure integrity check)
//!   ↓
//! 2. BeginSettlement (the "sending" lock)
//!   ↓
//! 3. Approve shortfall (token batches only, best effort)
//!   ↓
//! 4. Submit the batch
//!   ↓
//! 5. CompleteSettlement (clear form) | FailSettlement (keep form)
//! ```

use rust_decimal::Decimal;

use dispas_core::{Address, AggregateRoot, Amount, FundingSource, SessionId};
use dispas_events::{Event, execute};

use crate::collaborators::{
    AllowanceProvider, PriceFeed, PriceQuote, TransactionSubmitter, TxHandle, TxIntent,
};
use crate::config::EngineConfig;
use crate::engine::{
    ReconciliationCommand, ReconciliationEngine, ReconciliationEvent, SettlementPlan,
};
use crate::error::EngineError;

/// A payment form bound to a submitter and (optionally) a connected sender.
#[derive(Debug)]
pub struct PaymentSession<S> {
    engine: ReconciliationEngine,
    submitter: S,
    sender: Option<Address>,
}

impl<S> PaymentSession<S>
where
    S: TransactionSubmitter + AllowanceProvider,
{
    pub fn new(config: EngineConfig, submitter: S) -> Self {
        Self {
            engine: ReconciliationEngine::new(SessionId::new(), config),
            submitter,
            sender: None,
        }
    }

    pub fn engine(&self) -> &ReconciliationEngine {
        &self.engine
    }

    pub fn submitter(&self) -> &S {
        &self.submitter
    }

    pub fn sender(&self) -> Option<Address> {
        self.sender
    }

    pub fn connect(&mut self, sender: Address) {
        tracing::info!(session = %self.engine.id(), sender = %sender, "wallet connected");
        self.sender = Some(sender);
    }

    pub fn disconnect(&mut self) {
        self.sender = None;
    }

    /// Run one engine transition.
    pub fn dispatch(
        &mut self,
        command: ReconciliationCommand,
    ) -> Result<Vec<ReconciliationEvent>, EngineError> {
        match execute(&mut self.engine, &command) {
            Ok(events) => {
                for ev in &events {
                    tracing::debug!(
                        session = %self.engine.id(),
                        event = ev.event_type(),
                        total = %self.engine.total(),
                        "transition applied"
                    );
                }
                Ok(events)
            }
            Err(err) => {
                tracing::warn!(
                    session = %self.engine.id(),
                    command = command.kind(),
                    error = %err,
                    "transition rejected"
                );
                Err(err)
            }
        }
    }

    /// Ask the feed for a rate. A pending quote leaves the current rate alone.
    pub fn refresh_price<P: PriceFeed>(&mut self, feed: &mut P) -> Result<Option<Decimal>, EngineError> {
        match feed.fetch_price() {
            PriceQuote::Rate(rate) => {
                self.dispatch(ReconciliationCommand::UpdatePrice { rate: Some(rate) })?;
                Ok(Some(rate))
            }
            PriceQuote::Pending => Ok(self.engine.rate()),
        }
    }

    /// Advisory check against the connected sender's balance.
    pub fn balance_insufficient(&self, balance: Amount) -> bool {
        self.engine.balance_insufficient(balance)
    }

    /// Settle the current form. On failure the form is left as it was.
    pub fn send(&mut self) -> Result<TxHandle, EngineError> {
        let sender = self.sender.ok_or(EngineError::WalletNotConnected)?;
        let plan = self.engine.prepare_settlement()?;
        self.dispatch(ReconciliationCommand::BeginSettlement)?;

        match self.submit_plan(sender, &plan) {
            Ok(handle) => {
                self.dispatch(ReconciliationCommand::CompleteSettlement { handle })?;
                tracing::info!(
                    session = %self.engine.id(),
                    tx = %handle.tx_id,
                    sender = %sender,
                    total = %plan.total(),
                    recipients = plan.batch.len(),
                    "settlement succeeded"
                );
                Ok(handle)
            }
            Err(err) => {
                tracing::error!(
                    session = %self.engine.id(),
                    sender = %sender,
                    total = %plan.total(),
                    error = %err,
                    "settlement failed"
                );
                self.dispatch(ReconciliationCommand::FailSettlement {
                    reason: err.to_string(),
                })?;
                Err(err)
            }
        }
    }

    fn submit_plan(&mut self, sender: Address, plan: &SettlementPlan) -> Result<TxHandle, EngineError> {
        if let [only] = plan.batch.payments() {
            let intent = TxIntent::Transfer {
                asset: self.engine.config().asset,
                to: only.recipient,
                amount: only.amount,
            };
            return Ok(self.submitter.submit(sender, &intent)?);
        }

        let intent = match plan.funding {
            FundingSource::Native { value } => TxIntent::DistributeFunds {
                payments: plan.batch.clone(),
                value,
            },
            FundingSource::Token { contract, allowance } => {
                self.ensure_allowance(sender, contract, allowance)?;
                TxIntent::DistributeTokens {
                    token: contract,
                    payments: plan.batch.clone(),
                }
            }
        };
        Ok(self.submitter.submit(sender, &intent)?)
    }

    /// Approve `required` unless the distributor can already pull it.
    fn ensure_allowance(
        &mut self,
        sender: Address,
        token: Address,
        required: Amount,
    ) -> Result<(), EngineError> {
        match self.submitter.allowance(token, sender) {
            Ok(current) if current >= required => return Ok(()),
            Ok(current) => {
                tracing::debug!(token = %token, current = %current, required = %required, "allowance short");
            }
            // The ledger checks again; approving is always safe.
            Err(err) => {
                tracing::warn!(token = %token, error = %err, "allowance lookup failed");
            }
        }
        self.submitter.submit(
            sender,
            &TxIntent::Approve {
                token,
                amount: required,
            },
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SubmitError;
    use dispas_core::{Asset, Denomination, TxId};
    use dispas_ledger::LedgerError;
    use rust_decimal_macros::dec;

    fn addr(n: u8) -> Address {
        let mut bytes = [0u8; 20];
        bytes[19] = n;
        Address::from_bytes(bytes)
    }

    #[derive(Debug, Default)]
    struct FakeSubmitter {
        submitted: Vec<TxIntent>,
        allowance: Option<Amount>,
        fail_with: Option<SubmitError>,
    }

    impl TransactionSubmitter for FakeSubmitter {
        fn submit(&mut self, _sender: Address, intent: &TxIntent) -> Result<TxHandle, SubmitError> {
            if let Some(err) = &self.fail_with {
                return Err(err.clone());
            }
            self.submitted.push(intent.clone());
            Ok(TxHandle { tx_id: TxId::new() })
        }
    }

    impl AllowanceProvider for FakeSubmitter {
        fn allowance(&self, _token: Address, _owner: Address) -> Result<Amount, SubmitError> {
            self.allowance
                .ok_or_else(|| SubmitError::Unavailable("no node".into()))
        }
    }

    struct FixedFeed(PriceQuote);

    impl PriceFeed for FixedFeed {
        fn fetch_price(&mut self) -> PriceQuote {
            self.0
        }
    }

    fn config(asset: Asset) -> EngineConfig {
        EngineConfig {
            asset,
            denomination: Denomination::new(2, "LYX"),
            ..EngineConfig::default()
        }
    }

    fn session_with(asset: Asset, submitter: FakeSubmitter) -> PaymentSession<FakeSubmitter> {
        let mut session = PaymentSession::new(config(asset), submitter);
        session.connect(addr(0xee));
        session
    }

    fn fill(session: &mut PaymentSession<FakeSubmitter>, amounts: &[(u8, &str)]) {
        for (n, input) in amounts {
            session
                .dispatch(ReconciliationCommand::AddRecipient { address: addr(*n) })
                .unwrap();
            session
                .dispatch(ReconciliationCommand::SetRecipientAmount {
                    address: addr(*n),
                    input: input.to_string(),
                })
                .unwrap();
        }
    }

    #[test]
    fn send_requires_a_connected_wallet() {
        let mut session = PaymentSession::new(config(Asset::Native), FakeSubmitter::default());
        fill(&mut session, &[(1, "1")]);
        assert_eq!(session.send().unwrap_err(), EngineError::WalletNotConnected);
        assert!(!session.engine().is_sending());
        assert!(session.submitter().submitted.is_empty());
    }

    #[test]
    fn single_recipient_is_a_plain_transfer() {
        let mut session = session_with(Asset::Native, FakeSubmitter::default());
        fill(&mut session, &[(1, "2.5")]);
        session.send().unwrap();

        assert_eq!(
            session.submitter().submitted,
            vec![TxIntent::Transfer {
                asset: Asset::Native,
                to: addr(1),
                amount: Amount::from_units(250),
            }]
        );
        assert!(session.engine().recipients().is_empty());
    }

    #[test]
    fn native_batch_attaches_exact_value() {
        let mut session = session_with(Asset::Native, FakeSubmitter::default());
        fill(&mut session, &[(1, "1"), (2, "0.5"), (3, "0.25")]);
        session.send().unwrap();

        match session.submitter().submitted.as_slice() {
            [TxIntent::DistributeFunds { payments, value }] => {
                assert_eq!(payments.len(), 3);
                assert_eq!(*value, Amount::from_units(175));
            }
            other => panic!("unexpected intents {other:?}"),
        }
    }

    #[test]
    fn token_batch_approves_only_on_shortfall() {
        let token = addr(0x70);
        let mut session = session_with(
            Asset::Token(token),
            FakeSubmitter {
                allowance: Some(Amount::from_units(1_000)),
                ..FakeSubmitter::default()
            },
        );
        fill(&mut session, &[(1, "1"), (2, "2")]);
        session.send().unwrap();
        assert_eq!(session.submitter().submitted.len(), 1);

        let mut session = session_with(
            Asset::Token(token),
            FakeSubmitter {
                allowance: Some(Amount::from_units(10)),
                ..FakeSubmitter::default()
            },
        );
        fill(&mut session, &[(1, "1"), (2, "2")]);
        session.send().unwrap();
        assert_eq!(
            session.submitter().submitted[0],
            TxIntent::Approve {
                token,
                amount: Amount::from_units(300),
            }
        );
        assert!(matches!(
            session.submitter().submitted[1],
            TxIntent::DistributeTokens { .. }
        ));
    }

    #[test]
    fn allowance_lookup_failure_still_approves() {
        let token = addr(0x70);
        let mut session = session_with(Asset::Token(token), FakeSubmitter::default());
        fill(&mut session, &[(1, "1"), (2, "2")]);
        session.send().unwrap();
        assert_eq!(session.submitter().submitted.len(), 2);
    }

    #[test]
    fn failed_submission_keeps_the_form() {
        let mut session = session_with(
            Asset::Native,
            FakeSubmitter {
                fail_with: Some(SubmitError::Declined("user rejected".into())),
                ..FakeSubmitter::default()
            },
        );
        fill(&mut session, &[(1, "1"), (2, "1")]);
        let before = session.engine().clone();

        let err = session.send().unwrap_err();
        assert!(matches!(err, EngineError::SettlementFailed(_)));
        assert!(!session.engine().is_sending());
        assert_eq!(session.engine().recipients(), before.recipients());
        assert_eq!(session.engine().total(), before.total());
    }

    #[test]
    fn ledger_rejections_are_reported_verbatim() {
        let mut session = session_with(
            Asset::Native,
            FakeSubmitter {
                fail_with: Some(SubmitError::Rejected(LedgerError::DirectTransferRejected)),
                ..FakeSubmitter::default()
            },
        );
        fill(&mut session, &[(1, "1")]);
        assert_eq!(
            session.send().unwrap_err(),
            EngineError::Ledger(LedgerError::DirectTransferRejected)
        );
    }

    #[test]
    fn unbalanced_form_never_reaches_the_submitter() {
        let mut session = session_with(Asset::Native, FakeSubmitter::default());
        fill(&mut session, &[(1, "1")]);
        session
            .dispatch(ReconciliationCommand::SetTotal { input: "2".into() })
            .unwrap();
        assert!(matches!(session.send(), Err(EngineError::Unbalanced { .. })));
        assert!(session.submitter().submitted.is_empty());
        assert!(!session.engine().is_sending());
    }

    #[test]
    fn pending_quote_keeps_previous_rate() {
        let mut session = session_with(Asset::Native, FakeSubmitter::default());
        assert_eq!(session.refresh_price(&mut FixedFeed(PriceQuote::Pending)).unwrap(), None);
        assert_eq!(
            session
                .refresh_price(&mut FixedFeed(PriceQuote::Rate(dec!(1.5))))
                .unwrap(),
            Some(dec!(1.5))
        );
        assert_eq!(
            session.refresh_price(&mut FixedFeed(PriceQuote::Pending)).unwrap(),
            Some(dec!(1.5))
        );
    }
}
