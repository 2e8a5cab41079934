use dispas_core::Aggregate;

/// Execute an aggregate command deterministically (no IO, no async).
///
/// 1. **Decide**: `aggregate.handle(command)` produces events without mutating.
/// 2. **Evolve**: each event is applied in order.
///
/// Because `handle` performs every check up front and `apply` cannot fail, the
/// aggregate is either fully updated with all returned events or left exactly
/// as it was.
pub fn execute<A>(aggregate: &mut A, command: &A::Command) -> Result<Vec<A::Event>, A::Error>
where
    A: Aggregate,
{
    let events = A::handle(aggregate, command)?;
    for ev in &events {
        A::apply(aggregate, ev);
    }
    tracing::trace!(events = events.len(), version = aggregate.version(), "command executed");
    Ok(events)
}
