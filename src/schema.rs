//! Compile-time declaration of a manager's component and tag lists.
//!
//! A schema is a closed list: the [`schema!`] macro turns the declared
//! components and tags into a concrete storage struct plus one
//! [`Member`] implementation per registered type. All routing from a type
//! to its storage and mask bit is resolved at compile time; there is no
//! `TypeId` lookup anywhere on the entity path.
//!
//! Duplicates within a list, or a type appearing in both lists, produce
//! conflicting `Member` implementations: one coherence error per
//! violation. Using an unregistered type with a manager fails the
//! `Component`/`Tag` bound of the operation.

use crate::entity::EntityId;
use crate::mask::Mask;
use crate::storage::SortedVecStorage;

/// A compile-time component/tag list, declared with [`schema!`].
///
/// The implementing struct owns one [`SortedVecStorage`] per component;
/// an [`EntityManager`](crate::EntityManager) is parameterized by it.
pub trait Schema: Default + Sized + 'static {
    /// Number of component slots.
    const COMPONENTS: u32;
    /// Number of tag slots.
    const TAGS: u32;

    /// Removes `id` from every component storage whose bit is set in
    /// `mask`. Called on entity destruction.
    fn drop_entity(&mut self, mask: Mask, id: EntityId);
}

/// A type registered in a schema, either as a component or as a tag.
///
/// Implementations are generated by [`schema!`]; the trait routes a type
/// to its mask bit and, for queries, to its fetched item.
pub trait Member<S: Schema>: Sized + 'static {
    /// This type's bit in the membership mask. Components occupy
    /// `0..S::COMPONENTS`, tags the bits directly above.
    const BIT: u32;

    /// What a query yields for this member: `&mut Self` for components,
    /// `()` for tags (tags filter but carry no data).
    type Ref<'a>;

    /// The member's storage ids for smallest-substrate selection, or
    /// `None` for tags, which have no storage of their own.
    fn storage_ids(schema: &S) -> Option<&[EntityId]>;

    /// Fetches this member's item for `id`.
    ///
    /// # Safety
    ///
    /// `schema` must be exclusively borrowed for `'a`, `id` must be
    /// present in this member's storage (mask-checked), and no other
    /// fetch for the same member and id may be live.
    unsafe fn fetch<'a>(schema: *mut S, id: EntityId) -> Self::Ref<'a>;
}

/// A component type of schema `S`: a value attached to at most one entity.
pub trait Component<S: Schema>: Member<S> {
    /// The storage holding this component for every owning entity.
    fn storage(schema: &S) -> &SortedVecStorage<Self>;
    /// Exclusive access to the storage.
    fn storage_mut(schema: &mut S) -> &mut SortedVecStorage<Self>;
}

/// A tag type of schema `S`: a boolean marker with no value.
pub trait Tag<S: Schema>: Member<S> {}

/// Declares a schema: the closed component and tag lists of a manager.
///
/// Expands to the named storage struct (one field per component), the
/// [`Schema`] implementation, and a [`Member`] plus [`Component`] or
/// [`Tag`] implementation for every listed type.
///
/// ```
/// struct Position {
///     x: f32,
///     y: f32,
/// }
/// struct Frozen;
///
/// statecs::schema! {
///     /// Storage layout of the demo world.
///     struct Demo {
///         components {
///             positions: Position,
///         }
///         tags { Frozen }
///     }
/// }
///
/// let mut manager = statecs::EntityManager::<Demo>::new();
/// let mut e = manager.create();
/// manager.add_component(&mut e, Position { x: 1.0, y: 2.0 }).unwrap();
/// assert!(manager.has_component::<Position>(&e).unwrap());
/// ```
///
/// Registering the same type twice, in one list or across both, is a
/// compile error:
///
/// ```compile_fail
/// struct Position(f32);
///
/// statecs::schema! {
///     struct Broken {
///         components {
///             first: Position,
///             second: Position,
///         }
///         tags {}
///     }
/// }
/// ```
#[macro_export]
macro_rules! schema {
    (@components $name:ident, $bit:expr $(,)?) => {};
    (@components $name:ident, $bit:expr, $cfield:ident : $cty:ty $(, $rfield:ident : $rty:ty)*) => {
        impl $crate::schema::Member<$name> for $cty {
            const BIT: u32 = $bit;

            type Ref<'a> = &'a mut $cty;

            fn storage_ids(schema: &$name) -> ::core::option::Option<&[$crate::entity::EntityId]> {
                ::core::option::Option::Some(schema.$cfield.ids())
            }

            unsafe fn fetch<'a>(schema: *mut $name, id: $crate::entity::EntityId) -> &'a mut $cty {
                // SAFETY: the caller promises exclusive access to `schema`
                // for 'a and that `id` passed the mask check.
                unsafe {
                    (*schema)
                        .$cfield
                        .get_mut(id)
                        .expect("entity mask and component storage out of sync")
                }
            }
        }

        impl $crate::schema::Component<$name> for $cty {
            fn storage(schema: &$name) -> &$crate::storage::SortedVecStorage<$cty> {
                &schema.$cfield
            }

            fn storage_mut(schema: &mut $name) -> &mut $crate::storage::SortedVecStorage<$cty> {
                &mut schema.$cfield
            }
        }

        $crate::schema!(@components $name, ($bit + 1u32) $(, $rfield : $rty)*);
    };
    (@tags $name:ident, $bit:expr $(,)?) => {};
    (@tags $name:ident, $bit:expr, $tag:ident $(, $rest:ident)*) => {
        impl $crate::schema::Member<$name> for $tag {
            const BIT: u32 = $bit;

            type Ref<'a> = ();

            fn storage_ids(_schema: &$name) -> ::core::option::Option<&[$crate::entity::EntityId]> {
                ::core::option::Option::None
            }

            unsafe fn fetch<'a>(_schema: *mut $name, _id: $crate::entity::EntityId) -> Self::Ref<'a> {}
        }

        impl $crate::schema::Tag<$name> for $tag {}

        $crate::schema!(@tags $name, ($bit + 1u32) $(, $rest)*);
    };
    (
        $(#[$attr:meta])*
        $vis:vis struct $name:ident {
            components { $($cfield:ident : $cty:ty),* $(,)? }
            tags { $($tag:ident),* $(,)? }
        }
    ) => {
        $(#[$attr])*
        #[derive(Default)]
        $vis struct $name {
            $($cfield: $crate::storage::SortedVecStorage<$cty>,)*
        }

        impl $crate::schema::Schema for $name {
            const COMPONENTS: u32 = 0 $(+ { let _ = stringify!($cfield); 1 })*;
            const TAGS: u32 = 0 $(+ { let _ = stringify!($tag); 1 })*;

            #[allow(unused_variables)]
            fn drop_entity(&mut self, mask: $crate::mask::Mask, id: $crate::entity::EntityId) {
                $(
                    if mask.contains(<$cty as $crate::schema::Member<Self>>::BIT) {
                        self.$cfield.remove(id);
                    }
                )*
            }
        }

        const _: () = ::core::assert!(
            <$name as $crate::schema::Schema>::COMPONENTS
                + <$name as $crate::schema::Schema>::TAGS
                <= $crate::mask::Mask::BITS,
            "a schema supports at most 64 component and tag slots"
        );

        $crate::schema!(@components $name, 0u32 $(, $cfield : $cty)*);
        $crate::schema!(
            @tags $name,
            <$name as $crate::schema::Schema>::COMPONENTS
            $(, $tag)*
        );
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Entities;

    struct Pos(i32);
    struct Vel(i32);
    struct Frozen;
    struct Hidden;

    crate::schema! {
        struct Fixture {
            components {
                positions: Pos,
                velocities: Vel,
            }
            tags { Frozen, Hidden }
        }
    }

    #[test]
    fn bits_cover_both_regions() {
        assert_eq!(Fixture::COMPONENTS, 2);
        assert_eq!(Fixture::TAGS, 2);

        assert_eq!(<Pos as Member<Fixture>>::BIT, 0);
        assert_eq!(<Vel as Member<Fixture>>::BIT, 1);
        assert_eq!(<Frozen as Member<Fixture>>::BIT, 2);
        assert_eq!(<Hidden as Member<Fixture>>::BIT, 3);
    }

    #[test]
    fn drop_entity_honors_the_mask() {
        let mut entities = Entities::default();
        let id = entities.create();

        let mut fixture = Fixture::default();
        <Pos as Component<Fixture>>::storage_mut(&mut fixture).insert(id, Pos(1));
        <Vel as Component<Fixture>>::storage_mut(&mut fixture).insert(id, Vel(2));

        // Only the Pos bit is set; Vel must survive.
        let mut mask = Mask::EMPTY;
        mask.set(<Pos as Member<Fixture>>::BIT);
        fixture.drop_entity(mask, id);

        assert!(!<Pos as Component<Fixture>>::storage(&fixture).contains(id));
        assert!(<Vel as Component<Fixture>>::storage(&fixture).contains(id));
    }

    #[test]
    fn tags_expose_no_storage() {
        let fixture = Fixture::default();
        assert!(<Frozen as Member<Fixture>>::storage_ids(&fixture).is_none());
        assert!(<Pos as Member<Fixture>>::storage_ids(&fixture).is_some());
    }
}
