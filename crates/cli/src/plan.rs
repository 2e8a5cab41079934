//! Scripted payment plans.
//!
//! A plan describes one payment form the way a user would fill it in: decimal
//! strings in the configured denomination, optional split and gift steps. It is
//! run against a fresh in-process ledger that funds the sender first.

use anyhow::{Context, bail};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use dispas_core::{Address, Asset};
use dispas_events::Event;
use dispas_ledger::{LedgerEvent, LedgerService};
use dispas_reconciliation::{
    EngineConfig, LedgerGateway, PaymentSession, ReconciliationCommand,
};

/// Distributor address used when the plan does not name one.
pub const DEFAULT_DISTRIBUTOR: &str = "0xd15a5000000000000000000000000000000000d1";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanRecipient {
    pub address: Address,
    /// Left empty to be filled by `split_evenly`.
    #[serde(default)]
    pub amount: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    pub sender: Address,
    #[serde(default)]
    pub distributor: Option<Address>,
    /// Balance minted to the sender before settling.
    pub funding: String,
    #[serde(default)]
    pub total: Option<String>,
    pub recipients: Vec<PlanRecipient>,
    #[serde(default)]
    pub split_evenly: bool,
    #[serde(default)]
    pub gift_change_to: Option<Address>,
    /// Fiat per whole unit, for the report only.
    #[serde(default)]
    pub rate: Option<Decimal>,
}

impl Plan {
    pub fn from_json(raw: &str) -> anyhow::Result<Self> {
        serde_json::from_str(raw).context("invalid payment plan")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Payout {
    pub address: Address,
    pub received: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    pub tx_id: String,
    pub asset: Asset,
    pub symbol: String,
    pub total: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fiat_total: Option<String>,
    pub sender_balance: String,
    pub payouts: Vec<Payout>,
    pub events: Vec<String>,
}

/// Fund the sender, fill the form, settle, and summarize.
pub fn run(plan: &Plan, config: &EngineConfig) -> anyhow::Result<Report> {
    let denomination = &config.denomination;
    let funding = denomination
        .parse(&plan.funding)
        .with_context(|| format!("funding {:?}", plan.funding))?;
    let distributor = match plan.distributor {
        Some(addr) => addr,
        None => DEFAULT_DISTRIBUTOR.parse()?,
    };

    let mut service = LedgerService::new(distributor);
    if let Asset::Token(contract) = config.asset {
        let symbol = denomination.symbol.clone();
        service.deploy_token(contract, symbol.clone(), symbol, denomination.decimals)?;
    }
    service.mint(config.asset, plan.sender, funding)?;
    let gateway = LedgerGateway::new(service);

    let mut session = PaymentSession::new(config.clone(), gateway.clone());
    session.connect(plan.sender);
    fill(&mut session, plan)?;

    let total = session.engine().total();
    let fiat_total = session.engine().fiat_total().map(|f| format!("{f:.2}"));
    if session.balance_insufficient(funding) {
        tracing::warn!(total = %denomination.format(total), funding = %plan.funding, "total exceeds sender balance");
    }

    let handle = session.send()?;

    let report = gateway.with_service(|s| {
        let payouts = plan
            .recipients
            .iter()
            .map(|r| Payout {
                address: r.address,
                received: denomination.format(s.ledger().asset_balance_of(config.asset, r.address)),
            })
            .collect();
        let events = s
            .logs_for(handle.tx_id)
            .map(|e| describe(e.payload()))
            .collect();
        Report {
            tx_id: handle.tx_id.to_string(),
            asset: config.asset,
            symbol: denomination.symbol.clone(),
            total: denomination.format(total),
            fiat_total,
            sender_balance: denomination.format(s.ledger().asset_balance_of(config.asset, plan.sender)),
            payouts,
            events,
        }
    })?;
    Ok(report)
}

fn fill(session: &mut PaymentSession<LedgerGateway>, plan: &Plan) -> anyhow::Result<()> {
    if plan.recipients.is_empty() {
        bail!("plan has no recipients");
    }
    if let Some(rate) = plan.rate {
        session.dispatch(ReconciliationCommand::UpdatePrice { rate: Some(rate) })?;
    }
    for r in &plan.recipients {
        session.dispatch(ReconciliationCommand::AddRecipient { address: r.address })?;
        if let Some(input) = &r.amount {
            session.dispatch(ReconciliationCommand::SetRecipientAmount {
                address: r.address,
                input: input.clone(),
            })?;
        }
    }
    // The total is set last so it overrides the sum built up above.
    if let Some(total) = &plan.total {
        session.dispatch(ReconciliationCommand::SetTotal { input: total.clone() })?;
    }
    if plan.split_evenly {
        session.dispatch(ReconciliationCommand::SplitEvenly)?;
    }
    if let Some(address) = plan.gift_change_to {
        if !session.engine().change().is_zero() {
            session.dispatch(ReconciliationCommand::GiftChange { address })?;
        }
    }
    Ok(())
}

fn describe(event: &LedgerEvent) -> String {
    event.event_type().to_string()
}
