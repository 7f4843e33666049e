//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
///
/// Every stored record (shipper, consignee, notify party, container, user
/// profile) is an entity keyed by a generated identifier.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Copy + Eq + core::hash::Hash + core::fmt::Debug + core::fmt::Display;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}
