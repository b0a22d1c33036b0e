//! Compositional queries over the registered component and tag lists.
//!
//! A query is a tuple of registered types. Component members both filter
//! and appear in the yielded item as `&mut C`; tag members only filter and
//! contribute a unit to the item. The empty tuple matches every entity.

use crate::entity::EntityId;
use crate::mask::Mask;
use crate::schema::{Member, Schema};

/// A filter over entities, expressed as a tuple of registered types.
///
/// The manager uses the query in two steps: [`mask`](Query::mask) folds
/// the members' bits into the required mask, and [`base`](Query::base)
/// picks the smallest component storage as the iteration substrate (or
/// `None` for tag-only and empty queries, which iterate the registry).
pub trait Query<S: Schema> {
    /// What one matching entity yields: `&mut C` per component member,
    /// `()` per tag member.
    type Item<'a>;

    /// Number of member types, including duplicates. Compared against the
    /// mask's population count to reject queries that list a type twice.
    const LEN: u32;

    /// The mask an entity must be a superset of to match.
    fn mask() -> Mask;

    /// Ids of the smallest component storage among the members, or `None`
    /// if the query has no component members.
    fn base(schema: &S) -> Option<&[EntityId]>;

    /// Fetches the item for `id`.
    ///
    /// # Safety
    ///
    /// Same contract as [`Member::fetch`], plus the member types must be
    /// pairwise distinct so the yielded borrows cannot alias.
    unsafe fn fetch<'a>(schema: *mut S, id: EntityId) -> Self::Item<'a>;
}

/// The empty filter needs to be special cased: it has no members to fold
/// over and matches unconditionally.
impl<S: Schema> Query<S> for () {
    type Item<'a> = ();

    const LEN: u32 = 0;

    fn mask() -> Mask {
        Mask::EMPTY
    }

    fn base(_schema: &S) -> Option<&[EntityId]> {
        None
    }

    unsafe fn fetch<'a>(_schema: *mut S, _id: EntityId) -> Self::Item<'a> {}
}

macro_rules! tuple_query {
    // use variables to indicate the arity of the tuple
    ($($from:ident),*) => {
        impl<S, $($from),*> Query<S> for ($($from,)*)
        where
            S: Schema,
            $($from: Member<S>),*
        {
            type Item<'a> = ($($from::Ref<'a>,)*);

            const LEN: u32 = 0 $(+ { let _ = stringify!($from); 1 })*;

            fn mask() -> Mask {
                let mut mask = Mask::EMPTY;
                $(mask.set($from::BIT);)*
                mask
            }

            fn base(schema: &S) -> Option<&[EntityId]> {
                let mut smallest: Option<&[EntityId]> = None;
                $(
                    if let Some(ids) = $from::storage_ids(schema) {
                        if smallest.map_or(true, |s| ids.len() < s.len()) {
                            smallest = Some(ids);
                        }
                    }
                )*
                smallest
            }

            unsafe fn fetch<'a>(schema: *mut S, id: EntityId) -> Self::Item<'a> {
                // SAFETY: forwarded to the members, which are pairwise
                // distinct slots by the caller's contract.
                unsafe { ($($from::fetch(schema, id),)*) }
            }
        }
    }
}

tuple_query! {A}
tuple_query! {A, B}
tuple_query! {A, B, C}
tuple_query! {A, B, C, D}
tuple_query! {A, B, C, D, E}
tuple_query! {A, B, C, D, E, F}
tuple_query! {A, B, C, D, E, F, G}
tuple_query! {A, B, C, D, E, F, G, H}
tuple_query! {A, B, C, D, E, F, G, H, I}
tuple_query! {A, B, C, D, E, F, G, H, I, J}
tuple_query! {A, B, C, D, E, F, G, H, I, J, K}
tuple_query! {A, B, C, D, E, F, G, H, I, J, K, L}
tuple_query! {A, B, C, D, E, F, G, H, I, J, K, L, M}
tuple_query! {A, B, C, D, E, F, G, H, I, J, K, L, M, N}
tuple_query! {A, B, C, D, E, F, G, H, I, J, K, L, M, N, O}
tuple_query! {A, B, C, D, E, F, G, H, I, J, K, L, M, N, O, P}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Entities;
    use crate::schema::Component;

    struct Common(u8);
    struct Rare(u8);
    struct Marked;

    crate::schema! {
        struct Fixture {
            components {
                common: Common,
                rare: Rare,
            }
            tags { Marked }
        }
    }

    #[test]
    fn mask_folds_all_members() {
        let mask = <(Common, Rare, Marked) as Query<Fixture>>::mask();
        assert_eq!(mask.count(), 3);
        assert!(mask.contains(<Common as Member<Fixture>>::BIT));
        assert!(mask.contains(<Rare as Member<Fixture>>::BIT));
        assert!(mask.contains(<Marked as Member<Fixture>>::BIT));
    }

    #[test]
    fn base_prefers_the_smallest_storage() {
        let mut entities = Entities::default();
        let mut fixture = Fixture::default();

        for i in 0..4 {
            let id = entities.create();
            <Common as Component<Fixture>>::storage_mut(&mut fixture).insert(id, Common(i));
            if i == 0 {
                <Rare as Component<Fixture>>::storage_mut(&mut fixture).insert(id, Rare(i));
            }
        }

        let base = <(Common, Rare) as Query<Fixture>>::base(&fixture).unwrap();
        assert_eq!(base.len(), 1);
        assert_eq!(base, <Rare as Component<Fixture>>::storage(&fixture).ids());
    }

    #[test]
    fn tag_only_queries_have_no_base() {
        let fixture = Fixture::default();
        assert!(<(Marked,) as Query<Fixture>>::base(&fixture).is_none());
        assert!(<() as Query<Fixture>>::base(&fixture).is_none());
    }
}
