use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use dispas_core::{
    Address, Aggregate, AggregateRoot, Amount, Asset, FundingSource, Payment, PaymentBatch,
    SessionId,
};
use dispas_events::Event;

use crate::collaborators::TxHandle;
use crate::config::EngineConfig;
use crate::currency::{self, DisplayCurrency};
use crate::error::EngineError;

/// One line of the payment form. `amount` is `None` until the user enters one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipientEntry {
    pub address: Address,
    pub amount: Option<Amount>,
}

impl RecipientEntry {
    pub fn amount_or_zero(&self) -> Amount {
        self.amount.unwrap_or(Amount::ZERO)
    }
}

/// A batch ready to submit, with the funding it requires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementPlan {
    pub batch: PaymentBatch,
    pub funding: FundingSource,
}

impl SettlementPlan {
    pub fn total(&self) -> Amount {
        match self.funding {
            FundingSource::Native { value } => value,
            FundingSource::Token { allowance, .. } => allowance,
        }
    }
}

/// Aggregate root: the reconciliation state of one payment form.
///
/// Holds a total, per-recipient amounts and the change left over by the last
/// even split. Edits go through `handle` + `apply` so the dependent fields are
/// always updated together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconciliationEngine {
    id: SessionId,
    config: EngineConfig,
    total: Amount,
    recipients: Vec<RecipientEntry>,
    change: Amount,
    currency: DisplayCurrency,
    rate: Option<Decimal>,
    /// Fiat total typed before a rate was known.
    deferred_fiat: Option<Decimal>,
    sending: bool,
    version: u64,
}

impl ReconciliationEngine {
    pub fn new(id: SessionId, config: EngineConfig) -> Self {
        Self {
            id,
            config,
            total: Amount::ZERO,
            recipients: Vec::new(),
            change: Amount::ZERO,
            currency: DisplayCurrency::Native,
            rate: None,
            deferred_fiat: None,
            sending: false,
            version: 0,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn total(&self) -> Amount {
        self.total
    }

    pub fn recipients(&self) -> &[RecipientEntry] {
        &self.recipients
    }

    pub fn recipient(&self, address: Address) -> Option<&RecipientEntry> {
        self.recipients.iter().find(|r| r.address == address)
    }

    pub fn change(&self) -> Amount {
        self.change
    }

    pub fn currency(&self) -> DisplayCurrency {
        self.currency
    }

    pub fn rate(&self) -> Option<Decimal> {
        self.rate
    }

    pub fn deferred_fiat(&self) -> Option<Decimal> {
        self.deferred_fiat
    }

    pub fn is_sending(&self) -> bool {
        self.sending
    }

    /// Fresh sum of recipient amounts (unset counts as zero).
    pub fn recipients_sum(&self) -> Option<Amount> {
        Amount::checked_sum(self.recipients.iter().map(RecipientEntry::amount_or_zero))
    }

    /// Whether the form may be sent as far as totals go.
    ///
    /// An empty total or an empty list counts as balanced.
    pub fn is_balanced(&self) -> bool {
        if self.total.is_zero() || self.recipients.is_empty() {
            return true;
        }
        self.recipients
            .iter()
            .all(|r| r.amount.is_some())
            && self.recipients_sum() == Some(self.total)
    }

    /// Total converted for display. `None` without a rate.
    pub fn fiat_total(&self) -> Option<Decimal> {
        let rate = self.rate?;
        currency::native_to_fiat(self.total, rate, self.config.decimals())
    }

    /// Total as shown in the current display currency; empty when cleared.
    pub fn display_total(&self) -> String {
        match (self.currency, self.deferred_fiat) {
            (_, Some(fiat)) => fiat.to_string(),
            _ if self.total.is_zero() => String::new(),
            (DisplayCurrency::Native, None) => self.config.denomination.format(self.total),
            (DisplayCurrency::Fiat, None) => self
                .fiat_total()
                .map(|f| format!("{f:.2}"))
                .unwrap_or_default(),
        }
    }

    /// Whether the total exceeds `balance`. Advisory only.
    pub fn balance_insufficient(&self, balance: Amount) -> bool {
        self.total > balance
    }

    /// Integrity checkpoint before money moves.
    ///
    /// Recomputes the sum from scratch rather than trusting the incremental
    /// bookkeeping. Never mutates.
    pub fn prepare_settlement(&self) -> Result<SettlementPlan, EngineError> {
        if self.recipients.is_empty() {
            return Err(EngineError::NoRecipients);
        }
        // The entered total is still in fiat; nothing native to settle yet.
        if self.deferred_fiat.is_some() {
            return Err(EngineError::RateUnavailable);
        }
        if self.total.is_zero() {
            return Err(EngineError::invalid_amount("total must be greater than zero"));
        }

        let mut payments = Vec::with_capacity(self.recipients.len());
        for entry in &self.recipients {
            match entry.amount {
                Some(amount) if !amount.is_zero() => {
                    payments.push(Payment::new(entry.address, amount));
                }
                _ => {
                    return Err(EngineError::invalid_amount(format!(
                        "recipient {} needs an amount greater than zero",
                        entry.address
                    )));
                }
            }
        }

        let batch = PaymentBatch::new(payments);
        let sum = batch
            .total()
            .ok_or_else(|| EngineError::invalid_amount("sum of payments overflows"))?;
        if sum != self.total {
            return Err(EngineError::Unbalanced {
                total: self.total,
                sum,
            });
        }

        let funding = match self.config.asset {
            Asset::Native => FundingSource::Native { value: sum },
            Asset::Token(contract) => FundingSource::Token {
                contract,
                allowance: sum,
            },
        };

        Ok(SettlementPlan { batch, funding })
    }
}

impl AggregateRoot for ReconciliationEngine {
    type Id = SessionId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReconciliationCommand {
    /// Raw user input for the total, in the current display currency.
    SetTotal { input: String },
    AddRecipient { address: Address },
    RemoveRecipient { address: Address },
    /// Raw user input for one recipient; empty input unsets the amount.
    SetRecipientAmount { address: Address, input: String },
    SplitEvenly,
    GiftChange { address: Address },
    SwitchCurrency,
    /// Price-feed callback. `None` means the rate is unknown again.
    UpdatePrice { rate: Option<Decimal> },
    BeginSettlement,
    CompleteSettlement { handle: TxHandle },
    FailSettlement { reason: String },
}

impl ReconciliationCommand {
    pub fn kind(&self) -> &'static str {
        match self {
            ReconciliationCommand::SetTotal { .. } => "set_total",
            ReconciliationCommand::AddRecipient { .. } => "add_recipient",
            ReconciliationCommand::RemoveRecipient { .. } => "remove_recipient",
            ReconciliationCommand::SetRecipientAmount { .. } => "set_recipient_amount",
            ReconciliationCommand::SplitEvenly => "split_evenly",
            ReconciliationCommand::GiftChange { .. } => "gift_change",
            ReconciliationCommand::SwitchCurrency => "switch_currency",
            ReconciliationCommand::UpdatePrice { .. } => "update_price",
            ReconciliationCommand::BeginSettlement => "begin_settlement",
            ReconciliationCommand::CompleteSettlement { .. } => "complete_settlement",
            ReconciliationCommand::FailSettlement { .. } => "fail_settlement",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReconciliationEvent {
    TotalSet { total: Amount },
    /// Fiat total stored until a rate arrives.
    TotalDeferred { fiat: Decimal },
    TotalCleared,
    RecipientAdded { address: Address },
    RecipientRemoved { address: Address, total: Amount },
    RecipientAmountSet {
        address: Address,
        amount: Option<Amount>,
        total: Amount,
    },
    FundsSplit {
        share: Amount,
        distributed: Amount,
        remainder: Amount,
    },
    ChangeGifted {
        address: Address,
        gifted: Amount,
        amount: Amount,
        total: Amount,
    },
    CurrencySwitched { currency: DisplayCurrency },
    PriceUpdated { rate: Option<Decimal> },
    SettlementStarted,
    SettlementSucceeded { handle: TxHandle },
    SettlementFailed { reason: String },
}

impl Event for ReconciliationEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ReconciliationEvent::TotalSet { .. } => "reconciliation.total_set",
            ReconciliationEvent::TotalDeferred { .. } => "reconciliation.total_deferred",
            ReconciliationEvent::TotalCleared => "reconciliation.total_cleared",
            ReconciliationEvent::RecipientAdded { .. } => "reconciliation.recipient_added",
            ReconciliationEvent::RecipientRemoved { .. } => "reconciliation.recipient_removed",
            ReconciliationEvent::RecipientAmountSet { .. } => "reconciliation.recipient_amount_set",
            ReconciliationEvent::FundsSplit { .. } => "reconciliation.funds_split",
            ReconciliationEvent::ChangeGifted { .. } => "reconciliation.change_gifted",
            ReconciliationEvent::CurrencySwitched { .. } => "reconciliation.currency_switched",
            ReconciliationEvent::PriceUpdated { .. } => "reconciliation.price_updated",
            ReconciliationEvent::SettlementStarted => "reconciliation.settlement_started",
            ReconciliationEvent::SettlementSucceeded { .. } => "reconciliation.settlement_succeeded",
            ReconciliationEvent::SettlementFailed { .. } => "reconciliation.settlement_failed",
        }
    }
}

impl Aggregate for ReconciliationEngine {
    type Command = ReconciliationCommand;
    type Event = ReconciliationEvent;
    type Error = EngineError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            ReconciliationEvent::TotalSet { total } => {
                self.total = *total;
                self.deferred_fiat = None;
            }
            ReconciliationEvent::TotalDeferred { fiat } => {
                self.total = Amount::ZERO;
                self.deferred_fiat = Some(*fiat);
            }
            ReconciliationEvent::TotalCleared => {
                self.total = Amount::ZERO;
                self.deferred_fiat = None;
            }
            ReconciliationEvent::RecipientAdded { address } => {
                self.recipients.push(RecipientEntry {
                    address: *address,
                    amount: None,
                });
            }
            ReconciliationEvent::RecipientRemoved { address, total } => {
                self.recipients.retain(|r| r.address != *address);
                self.total = *total;
            }
            ReconciliationEvent::RecipientAmountSet {
                address,
                amount,
                total,
            } => {
                self.set_entry(*address, *amount);
                self.total = *total;
            }
            ReconciliationEvent::FundsSplit {
                share,
                distributed,
                remainder,
            } => {
                for entry in &mut self.recipients {
                    entry.amount = Some(*share);
                }
                self.total = *distributed;
                self.change = *remainder;
            }
            ReconciliationEvent::ChangeGifted {
                address,
                amount,
                total,
                ..
            } => {
                self.set_entry(*address, Some(*amount));
                self.total = *total;
                self.change = Amount::ZERO;
            }
            ReconciliationEvent::CurrencySwitched { currency } => {
                self.currency = *currency;
            }
            ReconciliationEvent::PriceUpdated { rate } => {
                self.rate = *rate;
            }
            ReconciliationEvent::SettlementStarted => {
                self.sending = true;
            }
            ReconciliationEvent::SettlementSucceeded { .. } => {
                self.total = Amount::ZERO;
                self.recipients.clear();
                self.change = Amount::ZERO;
                self.deferred_fiat = None;
                self.sending = false;
            }
            ReconciliationEvent::SettlementFailed { .. } => {
                self.sending = false;
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            ReconciliationCommand::SetTotal { input } => self.handle_set_total(input),
            ReconciliationCommand::AddRecipient { address } => self.handle_add(*address),
            ReconciliationCommand::RemoveRecipient { address } => self.handle_remove(*address),
            ReconciliationCommand::SetRecipientAmount { address, input } => {
                self.handle_set_amount(*address, input)
            }
            ReconciliationCommand::SplitEvenly => self.handle_split(),
            ReconciliationCommand::GiftChange { address } => self.handle_gift(*address),
            ReconciliationCommand::SwitchCurrency => self.handle_switch_currency(),
            ReconciliationCommand::UpdatePrice { rate } => self.handle_price(*rate),
            ReconciliationCommand::BeginSettlement => self.handle_begin(),
            ReconciliationCommand::CompleteSettlement { handle } => {
                self.ensure_sending()?;
                Ok(vec![ReconciliationEvent::SettlementSucceeded { handle: *handle }])
            }
            ReconciliationCommand::FailSettlement { reason } => {
                self.ensure_sending()?;
                Ok(vec![ReconciliationEvent::SettlementFailed {
                    reason: reason.clone(),
                }])
            }
        }
    }
}

/// Typed result of reading one amount field.
enum ParsedInput {
    Empty,
    Native(Amount),
    /// Fiat value that cannot be converted yet.
    Deferred(Decimal),
}

impl ReconciliationEngine {
    fn set_entry(&mut self, address: Address, amount: Option<Amount>) {
        if let Some(entry) = self.recipients.iter_mut().find(|r| r.address == address) {
            entry.amount = amount;
        }
    }

    fn ensure_editable(&self) -> Result<(), EngineError> {
        if self.sending {
            return Err(EngineError::SettlementInFlight);
        }
        Ok(())
    }

    fn ensure_sending(&self) -> Result<(), EngineError> {
        if !self.sending {
            return Err(EngineError::NoSettlementInFlight);
        }
        Ok(())
    }

    fn existing(&self, address: Address) -> Result<&RecipientEntry, EngineError> {
        self.recipient(address)
            .ok_or(EngineError::UnknownRecipient(address))
    }

    fn parse_input(&self, input: &str) -> Result<ParsedInput, EngineError> {
        if input.trim().is_empty() {
            return Ok(ParsedInput::Empty);
        }
        match self.currency {
            DisplayCurrency::Native => Ok(ParsedInput::Native(self.config.denomination.parse(input)?)),
            DisplayCurrency::Fiat => {
                let fiat = currency::parse_fiat(input)?;
                match self.rate {
                    Some(rate) => Ok(ParsedInput::Native(currency::fiat_to_native(
                        fiat,
                        rate,
                        self.config.decimals(),
                    )?)),
                    None => Ok(ParsedInput::Deferred(fiat)),
                }
            }
        }
    }

    /// `total + new - old`, clamped at zero.
    fn rebalanced_total(&self, new: Amount, old: Amount) -> Result<Amount, EngineError> {
        self.total
            .checked_add(new)
            .map(|t| t.saturating_sub(old))
            .ok_or_else(|| EngineError::invalid_amount("total overflows"))
    }

    fn handle_set_total(&self, input: &str) -> Result<Vec<ReconciliationEvent>, EngineError> {
        self.ensure_editable()?;
        let event = match self.parse_input(input)? {
            ParsedInput::Empty => ReconciliationEvent::TotalCleared,
            ParsedInput::Native(total) => ReconciliationEvent::TotalSet { total },
            ParsedInput::Deferred(fiat) => ReconciliationEvent::TotalDeferred { fiat },
        };
        Ok(vec![event])
    }

    fn handle_add(&self, address: Address) -> Result<Vec<ReconciliationEvent>, EngineError> {
        self.ensure_editable()?;
        if self.recipient(address).is_some() {
            return Err(EngineError::DuplicateRecipient(address));
        }
        Ok(vec![ReconciliationEvent::RecipientAdded { address }])
    }

    fn handle_remove(&self, address: Address) -> Result<Vec<ReconciliationEvent>, EngineError> {
        self.ensure_editable()?;
        let entry = self.existing(address)?;
        Ok(vec![ReconciliationEvent::RecipientRemoved {
            address,
            total: self.total.saturating_sub(entry.amount_or_zero()),
        }])
    }

    fn handle_set_amount(
        &self,
        address: Address,
        input: &str,
    ) -> Result<Vec<ReconciliationEvent>, EngineError> {
        self.ensure_editable()?;
        let old = self.existing(address)?.amount_or_zero();
        let amount = match self.parse_input(input)? {
            ParsedInput::Empty => None,
            ParsedInput::Native(amount) => Some(amount),
            ParsedInput::Deferred(_) => return Err(EngineError::RateUnavailable),
        };
        let total = self.rebalanced_total(amount.unwrap_or(Amount::ZERO), old)?;
        Ok(vec![ReconciliationEvent::RecipientAmountSet {
            address,
            amount,
            total,
        }])
    }

    fn handle_split(&self) -> Result<Vec<ReconciliationEvent>, EngineError> {
        self.ensure_editable()?;
        if self.recipients.is_empty() {
            return Err(EngineError::NoRecipients);
        }
        if self.total.is_zero() {
            return Err(EngineError::invalid_amount("nothing to split"));
        }
        let split = self
            .total
            .split_evenly(self.recipients.len())
            .ok_or(EngineError::NoRecipients)?;
        Ok(vec![ReconciliationEvent::FundsSplit {
            share: split.share,
            distributed: split.distributed,
            remainder: split.remainder,
        }])
    }

    fn handle_gift(&self, address: Address) -> Result<Vec<ReconciliationEvent>, EngineError> {
        self.ensure_editable()?;
        if self.change.is_zero() {
            return Err(EngineError::NoChange);
        }
        let old = self.existing(address)?.amount_or_zero();
        let amount = old
            .checked_add(self.change)
            .ok_or_else(|| EngineError::invalid_amount("amount overflows"))?;
        let total = self.rebalanced_total(amount, old)?;
        Ok(vec![ReconciliationEvent::ChangeGifted {
            address,
            gifted: self.change,
            amount,
            total,
        }])
    }

    fn handle_switch_currency(&self) -> Result<Vec<ReconciliationEvent>, EngineError> {
        if self.rate.is_none() {
            return Err(EngineError::RateUnavailable);
        }
        Ok(vec![ReconciliationEvent::CurrencySwitched {
            currency: self.currency.toggled(),
        }])
    }

    fn handle_price(&self, rate: Option<Decimal>) -> Result<Vec<ReconciliationEvent>, EngineError> {
        let rate = rate.map(currency::validate_rate).transpose()?;
        let mut events = vec![ReconciliationEvent::PriceUpdated { rate }];

        // A deferred fiat total is converted as soon as a rate is known.
        if let (Some(rate), Some(fiat)) = (rate, self.deferred_fiat) {
            let total = currency::fiat_to_native(fiat, rate, self.config.decimals())?;
            events.push(ReconciliationEvent::TotalSet { total });
        }
        Ok(events)
    }

    fn handle_begin(&self) -> Result<Vec<ReconciliationEvent>, EngineError> {
        if self.sending {
            return Err(EngineError::SettlementInFlight);
        }
        Ok(vec![ReconciliationEvent::SettlementStarted])
    }
}
