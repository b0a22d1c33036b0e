//! Prelude module
//!
//! Contains the most common types and traits you need to work with a
//! manager, plus [`ControlFlow`] for breakable iteration.

pub use core::ops::ControlFlow;

pub use crate::{
    entity::{Entities, EntityHandle, EntityId, EntityStatus},
    error::{BadEntity, Error, MissingComponent},
    event::{EventManager, HandlerId},
    manager::EntityManager,
    mask::Mask,
    query::Query,
    schema::{Component, Member, Schema, Tag},
    storage::SortedVecStorage,
};
