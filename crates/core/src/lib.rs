//! `dispas-core` — shared building blocks for batch payment distribution.
//!
//! This crate contains **pure** primitives (no IO): addresses, fixed-point
//! amounts, payments and the aggregate traits used by the ledger and the
//! reconciliation engine.

pub mod address;
pub mod aggregate;
pub mod amount;
pub mod error;
pub mod id;
pub mod payment;
pub mod value_object;

pub use address::Address;
pub use aggregate::{Aggregate, AggregateRoot};
pub use amount::{Amount, Denomination, EvenSplit, MAX_DECIMALS};
pub use error::ParseError;
pub use id::{EventId, SessionId, TxId};
pub use payment::{Asset, FundingSource, Payment, PaymentBatch, PaymentViolation};
pub use value_object::ValueObject;
