//! Distribution ledger (batch settlement, event-sourced).
//!
//! The [`Ledger`] aggregate is pure: it decides and applies. [`LedgerService`]
//! hosts it, assigning transaction ids, appending to the event log and
//! publishing committed events.

pub mod balances;
pub mod distributor;
pub mod error;
pub mod ledger;
pub mod service;
pub mod token;

pub use balances::Balances;
pub use distributor::validate_batch;
pub use error::LedgerError;
pub use ledger::{
    AllowanceSpent, Approve, Approved, DeployToken, DistributeFunds, DistributeTokens,
    FundsDistributed, Ledger, LedgerCommand, LedgerEvent, Mint, Minted, TokenDeployed,
    TokensDistributed, Transfer, Transferred,
};
pub use service::{LedgerService, LogEntry, Receipt};
pub use token::TokenContract;
