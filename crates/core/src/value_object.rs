//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects are immutable and compared by their attribute values. Two
/// [`crate::Payment`]s with the same recipient and amount are the same payment.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
