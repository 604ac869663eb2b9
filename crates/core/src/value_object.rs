//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects are **immutable** and **compared by value** - they have no
/// identity of their own. `Amount { 5000 }` equals `Amount { 5000 }` wherever
/// the two came from; a `Campaign` with the same title is still a different
/// campaign if the id differs.
///
/// To "modify" a value object, create a new one with the new values.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
