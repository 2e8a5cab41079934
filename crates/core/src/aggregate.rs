//! Aggregate traits: the reducer shape shared by the ledger and the engine.

/// Aggregate root marker + minimal interface.
pub trait AggregateRoot {
    /// Identifier of the aggregate instance.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the aggregate identifier.
    fn id(&self) -> &Self::Id;

    /// Number of events applied so far.
    fn version(&self) -> u64;
}

/// Aggregate execution semantics (pure, deterministic).
///
/// - **Decision logic**: `handle(&self, cmd)` validates a command against the
///   current state and returns the events it produces.
/// - **State mutation**: `apply(&mut self, event)` evolves state.
///
/// `handle` must perform every check that could fail. `apply` is infallible, so a
/// command either yields its whole event list or nothing at all. Callers rely on
/// this to commit a batch of effects as a unit.
pub trait Aggregate: AggregateRoot {
    type Command: Clone + core::fmt::Debug;
    type Event: Clone + core::fmt::Debug;
    type Error: core::fmt::Debug;

    /// Evolve in-memory state from a single event.
    ///
    /// Implementations bump their `version()` by one per applied event.
    fn apply(&mut self, event: &Self::Event);

    /// Decide which events to emit given the current state and a command.
    ///
    /// This must not mutate state.
    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error>;
}
