//! Ledger host: transaction execution, event log and publication.
//!
//! ```text
//! LedgerCommand
//!   ↓
//! 1. Decide (pure; every check, including balances, happens here)
//!   ↓
//! 2. Apply all events (cannot fail)
//!   ↓
//! 3. Append envelopes to the log (one tx id, increasing sequence numbers)
//!   ↓
//! 4. Publish envelopes on the bus
//! ```
//!
//! A rejected command stops at step 1, so nothing is applied, logged or
//! published.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use dispas_core::{Address, Aggregate, AggregateRoot, Amount, Asset, EventId, PaymentBatch, TxId};
use dispas_events::{Event, EventBus, EventEnvelope, InMemoryEventBus, Subscription};

use crate::error::LedgerError;
use crate::ledger::{
    Approve, DeployToken, DistributeFunds, DistributeTokens, Ledger, LedgerCommand, LedgerEvent,
    Mint, Transfer,
};
use crate::token::TokenContract;

/// A recorded ledger event.
pub type LogEntry = EventEnvelope<LedgerEvent>;

/// Result of a committed transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub tx_id: TxId,
    pub events: Vec<LedgerEvent>,
}

impl Receipt {
    /// The distributor summary, if this transaction was a batch distribution.
    pub fn distribution(&self) -> Option<&LedgerEvent> {
        self.events.iter().find(|e| e.is_distribution())
    }
}

/// In-process execution environment for the [`Ledger`].
#[derive(Debug)]
pub struct LedgerService<B = InMemoryEventBus<LogEntry>> {
    ledger: Ledger,
    log: Vec<LogEntry>,
    bus: B,
}

impl LedgerService {
    /// Ledger with an in-memory bus.
    pub fn new(distributor: Address) -> Self {
        Self::with_bus(distributor, InMemoryEventBus::new())
    }
}

impl<B> LedgerService<B>
where
    B: EventBus<LogEntry>,
{
    pub fn with_bus(distributor: Address, bus: B) -> Self {
        Self {
            ledger: Ledger::new(distributor),
            log: Vec::new(),
            bus,
        }
    }

    /// Execute one command as an atomic transaction.
    pub fn submit(&mut self, command: LedgerCommand) -> Result<Receipt, LedgerError> {
        let events = match self.ledger.handle(&command) {
            Ok(events) => events,
            Err(err) => {
                tracing::warn!(kind = command.kind(), error = %err, code = err.code(), "transaction reverted");
                return Err(err);
            }
        };

        for ev in &events {
            self.ledger.apply(ev);
        }

        let tx_id = TxId::new();
        let recorded_at = Utc::now();
        let distributor = self.ledger.distributor();
        for ev in &events {
            let envelope = EventEnvelope::new(
                EventId::new(),
                tx_id,
                ev.emitter(distributor),
                self.log.len() as u64 + 1,
                recorded_at,
                ev.clone(),
            );
            self.log.push(envelope.clone());
            if let Err(err) = self.bus.publish(envelope) {
                // The transaction is committed; observers can catch up from the log.
                tracing::warn!(tx = %tx_id, event = ev.event_type(), error = ?err, "event publication failed");
            }
        }

        tracing::info!(
            tx = %tx_id,
            kind = command.kind(),
            events = events.len(),
            version = self.ledger.version(),
            "transaction committed"
        );

        Ok(Receipt { tx_id, events })
    }

    pub fn subscribe(&self) -> Subscription<LogEntry> {
        self.bus.subscribe()
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn distributor(&self) -> Address {
        self.ledger.distributor()
    }

    pub fn logs(&self) -> &[LogEntry] {
        &self.log
    }

    /// Log entries produced by one transaction.
    pub fn logs_for(&self, tx_id: TxId) -> impl Iterator<Item = &LogEntry> {
        self.log.iter().filter(move |e| e.tx_id() == tx_id)
    }

    pub fn balance_of(&self, account: Address) -> Amount {
        self.ledger.balance_of(account)
    }

    pub fn token_balance_of(&self, token: Address, owner: Address) -> Amount {
        self.ledger.token_balance_of(token, owner)
    }

    pub fn allowance(&self, token: Address, owner: Address, spender: Address) -> Amount {
        self.ledger.allowance(token, owner, spender)
    }

    pub fn token(&self, contract: Address) -> Option<&TokenContract> {
        self.ledger.token(contract)
    }

    pub fn mint(&mut self, asset: Asset, to: Address, amount: Amount) -> Result<Receipt, LedgerError> {
        self.submit(LedgerCommand::Mint(Mint { asset, to, amount }))
    }

    pub fn deploy_token(
        &mut self,
        contract: Address,
        name: impl Into<String>,
        symbol: impl Into<String>,
        decimals: u8,
    ) -> Result<Receipt, LedgerError> {
        self.submit(LedgerCommand::DeployToken(DeployToken {
            contract,
            name: name.into(),
            symbol: symbol.into(),
            decimals,
        }))
    }

    /// Owner sets the distributor's allowance on `token`.
    pub fn approve(&mut self, token: Address, owner: Address, amount: Amount) -> Result<Receipt, LedgerError> {
        let spender = self.distributor();
        self.submit(LedgerCommand::Approve(Approve {
            token,
            owner,
            spender,
            amount,
        }))
    }

    pub fn transfer(
        &mut self,
        asset: Asset,
        from: Address,
        to: Address,
        amount: Amount,
    ) -> Result<Receipt, LedgerError> {
        self.submit(LedgerCommand::Transfer(Transfer {
            asset,
            from,
            to,
            amount,
        }))
    }

    pub fn distribute_funds(
        &mut self,
        sender: Address,
        payments: PaymentBatch,
        value: Amount,
    ) -> Result<Receipt, LedgerError> {
        self.submit(LedgerCommand::DistributeFunds(DistributeFunds {
            sender,
            payments,
            value,
        }))
    }

    pub fn distribute_tokens(
        &mut self,
        sender: Address,
        token: Address,
        payments: PaymentBatch,
    ) -> Result<Receipt, LedgerError> {
        self.submit(LedgerCommand::DistributeTokens(DistributeTokens {
            sender,
            token,
            payments,
        }))
    }
}
