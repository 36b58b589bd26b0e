//! Value object trait: equality by value, not identity.
//!
//! Value objects have **no identity**: they are defined entirely by their
//! attribute values. `Quantity` is the main one in this workspace.

/// Marker trait for value objects.
///
/// Value objects are **immutable** and **compared by value**. To "modify" one,
/// build a new one (e.g. `remaining.saturating_sub(amount)` returns a fresh
/// `Quantity`).
///
/// ```ignore
/// let a = Quantity::new(Decimal::from(5))?;
/// let b = Quantity::new(Decimal::new(50, 1))?;
/// assert_eq!(a, b); // 5 == 5.0
/// ```
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
