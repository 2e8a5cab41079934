use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use dispas_core::{Address, EventId, TxId};

/// Envelope for a recorded event, with transaction and log metadata.
///
/// This is the unit appended to the ledger's event log.
///
/// Notes:
/// - `emitter` is the account that produced the event (the distributor or a
///   token contract).
/// - `sequence_number` is monotonically increasing across the whole log.
/// - Every envelope of one transaction shares the same `tx_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventEnvelope<E> {
    event_id: EventId,
    tx_id: TxId,
    emitter: Address,

    /// Monotonically increasing position in the log.
    sequence_number: u64,
    recorded_at: DateTime<Utc>,

    payload: E,
}

impl<E> EventEnvelope<E> {
    pub fn new(
        event_id: EventId,
        tx_id: TxId,
        emitter: Address,
        sequence_number: u64,
        recorded_at: DateTime<Utc>,
        payload: E,
    ) -> Self {
        Self {
            event_id,
            tx_id,
            emitter,
            sequence_number,
            recorded_at,
            payload,
        }
    }

    pub fn event_id(&self) -> EventId {
        self.event_id
    }

    pub fn tx_id(&self) -> TxId {
        self.tx_id
    }

    pub fn emitter(&self) -> Address {
        self.emitter
    }

    pub fn sequence_number(&self) -> u64 {
        self.sequence_number
    }

    pub fn recorded_at(&self) -> DateTime<Utc> {
        self.recorded_at
    }

    pub fn payload(&self) -> &E {
        &self.payload
    }

    pub fn into_payload(self) -> E {
        self.payload
    }
}
