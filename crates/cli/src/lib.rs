//! Drives a payment plan through the reconciliation engine against an
//! in-process ledger.

pub mod plan;

pub use plan::{Payout, Plan, PlanRecipient, Report, run};
