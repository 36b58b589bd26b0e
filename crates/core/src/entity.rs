//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
///
/// Stock items and usage events are entities: two rows with identical
/// quantities are still distinct physical spools or distinct consumption records.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;

    /// Returns the owner (tenant partition key) the entity belongs to.
    fn owner_id(&self) -> crate::OwnerId;
}
