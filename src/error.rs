//! Statecs error module.
//!
//! There are specific types for errors (e.g. [`BadEntity`]) and one
//! [`Error`] type that can represent them all. Each error in this module
//! has an `Into<Error>` implementation.

use core::fmt::{Display, Formatter, Result as FmtResult};
use std::error::Error as StdError;

use crate::entity::{EntityId, EntityStatus};

/// The statecs error type, able to represent every error of this library.
///
/// Every mutation validates before it touches any storage, so an `Err`
/// means the operation had no effect.
#[derive(Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// The handle used for the operation did not pass validation.
    BadEntity(BadEntity),
    /// The entity is valid but does not own the requested component.
    MissingComponent(MissingComponent),
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        match self {
            Error::BadEntity(e) => write!(f, "bad entity: {}", e),
            Error::MissingComponent(e) => write!(f, "missing component: {}", e),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Error::BadEntity(e) => Some(e),
            Error::MissingComponent(e) => Some(e),
        }
    }
}

impl From<BadEntity> for Error {
    fn from(e: BadEntity) -> Self {
        Error::BadEntity(e)
    }
}

impl From<MissingComponent> for Error {
    fn from(e: MissingComponent) -> Self {
        Error::MissingComponent(e)
    }
}

/// A handle failed validation.
///
/// The checks run in a fixed order (manager identity, existence,
/// snapshot freshness) and `status` reports the first one that failed.
#[derive(Debug, PartialEq, Eq)]
pub struct BadEntity {
    /// The action that was refused.
    pub action: &'static str,
    /// Why the handle was rejected.
    pub status: EntityStatus,
    /// The id the handle carries.
    pub entity: EntityId,
}

impl Display for BadEntity {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        write!(
            f,
            "tried to {} entity {}, but {}",
            self.action, self.entity, self.status
        )
    }
}

impl StdError for BadEntity {}

/// An entity was asked for a component type it does not hold.
#[derive(Debug, PartialEq, Eq)]
pub struct MissingComponent {
    /// The entity that was queried.
    pub entity: EntityId,
    /// Name of the requested component type.
    pub component: &'static str,
}

impl Display for MissingComponent {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        write!(
            f,
            "entity {} does not hold a {} component",
            self.entity, self.component
        )
    }
}

impl StdError for MissingComponent {}
