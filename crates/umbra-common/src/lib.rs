//! # Umbra Common
//!
//! Common types, utilities, and shared abstractions for Project Umbra.
//!
//! This crate provides foundational types used by the enemy decision core:
//! - Unit handles (`UnitId`, `HitboxId`)
//! - Planar geometry helpers over `glam::Vec3`
//! - Configuration and top-level error types
//! - Prelude for convenient imports

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod error;
pub mod geometry;
pub mod ids;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::*;
    pub use crate::geometry::*;
    pub use crate::ids::*;
}

pub use prelude::*;
