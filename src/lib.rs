#![deny(missing_docs)]

//! # Statecs
//!
//! A statically-scoped Entity-Component-System container. The component
//! and tag lists of a manager form a closed set declared once with
//! [`schema!`]; all per-type routing is resolved at compile time, and
//! entities are reached through cheap copyable handles that detect their
//! own staleness by comparing a mask snapshot against the registry.
//!
//! ```
//! use statecs::prelude::*;
//!
//! struct Pos {
//!     x: f32,
//!     y: f32,
//! }
//! struct Vel {
//!     x: f32,
//!     y: f32,
//! }
//! struct Anchored;
//!
//! statecs::schema! {
//!     struct Space {
//!         components {
//!             positions: Pos,
//!             velocities: Vel,
//!         }
//!         tags { Anchored }
//!     }
//! }
//!
//! let mut space = EntityManager::<Space>::new();
//!
//! let mut probe = space.create();
//! space.add_component(&mut probe, Pos { x: 0.0, y: 0.0 }).unwrap();
//! space.add_component(&mut probe, Vel { x: 1.0, y: 0.5 }).unwrap();
//!
//! let mut buoy = space.create();
//! space.add_component(&mut buoy, Pos { x: 4.0, y: 2.0 }).unwrap();
//! space.set_tag::<Anchored>(&mut buoy, true).unwrap();
//!
//! // Only the probe has both a position and a velocity.
//! space.for_each::<(Pos, Vel), _>(|_entity, (pos, vel)| {
//!     pos.x += vel.x;
//!     pos.y += vel.y;
//! });
//!
//! assert_eq!(space.get_component::<Pos>(&probe).unwrap().x, 1.0);
//! assert_eq!(space.get_entities::<(Anchored,)>(), vec![buoy]);
//! ```
//!
//! Handles to an entity whose shape changed elsewhere turn stale instead
//! of silently observing the new shape:
//!
//! ```
//! # use statecs::prelude::*;
//! # struct Hp(u32);
//! # statecs::schema! {
//! #     struct Game {
//! #         components { hp: Hp }
//! #         tags {}
//! #     }
//! # }
//! let mut game = EntityManager::<Game>::new();
//! let mut unit = game.create();
//! let observer = unit;
//!
//! game.add_component(&mut unit, Hp(10)).unwrap();
//! assert_eq!(game.status_of(&unit), EntityStatus::Ok);
//! assert_eq!(game.status_of(&observer), EntityStatus::Stale);
//! ```

pub use crate::{
    entity::{Entities, EntityHandle, EntityId, EntityRecord, EntityStatus},
    error::{BadEntity, Error, MissingComponent},
    event::{EventManager, HandlerId},
    manager::EntityManager,
    mask::Mask,
    query::Query,
    schema::{Component, Member, Schema, Tag},
    storage::SortedVecStorage,
};

pub mod entity;
pub mod error;
pub mod event;
pub mod manager;
pub mod mask;
pub mod prelude;
pub mod query;
pub mod schema;
pub mod storage;
