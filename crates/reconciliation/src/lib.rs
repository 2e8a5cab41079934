//! Client-side reconciliation of a batch payment before it is sent.
//!
//! The [`ReconciliationEngine`] keeps a total, per-recipient amounts and
//! leftover change consistent; [`PaymentSession`] turns a balanced form into
//! ledger transactions through the collaborator traits.

pub mod collaborators;
pub mod config;
pub mod currency;
pub mod engine;
pub mod error;
pub mod gateway;
pub mod search;
pub mod session;

pub use collaborators::{
    AllowanceProvider, PriceFeed, PriceQuote, Profile, ProfileResolver, TransactionSubmitter,
    TxHandle, TxIntent,
};
pub use config::EngineConfig;
pub use currency::DisplayCurrency;
pub use engine::{
    ReconciliationCommand, ReconciliationEngine, ReconciliationEvent, RecipientEntry,
    SettlementPlan,
};
pub use error::{EngineError, ResolveError, SubmitError};
pub use gateway::LedgerGateway;
pub use search::{ProfileSearch, SearchTicket};
pub use session::PaymentSession;
