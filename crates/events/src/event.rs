/// A recorded fact emitted by an aggregate.
///
/// Ledger events end up in the append-only log; engine events only drive local
/// state. Both are named by a dotted `event_type` (`"dispas.funds_distributed"`,
/// `"reconciliation.funds_split"`) that observers can match on without
/// knowing the Rust type.
pub trait Event: Clone + core::fmt::Debug + Send + Sync + 'static {
    fn event_type(&self) -> &'static str;

    /// Payload schema revision. Bumped when a variant's fields change.
    fn version(&self) -> u32 {
        1
    }
}
