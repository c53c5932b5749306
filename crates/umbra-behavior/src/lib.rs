//! # Umbra Behavior
//!
//! Enemy and boss decision core for Project Umbra.
//!
//! This crate decides what hostile units do each tick and coordinates the
//! transitions between those decisions:
//! - Target sensing with a lost-sight debounce
//! - Interruptible branch strategies (melee chase, kiting, charged beams,
//!   turrets, patrol, scouting, holding a post)
//! - Per-unit behavior controller (cancel-then-restart on every trigger)
//! - Health, stun and boss phase state machines
//! - Event bus for deaths, phase windows and resets
//! - TOML unit profiles and a fixed-step scheduler
//!
//! Movement, perception geometry, combat resolution and presentation are
//! collaborators behind the traits in [`collab`].

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod boss;
pub mod branches;
pub mod collab;
pub mod controller;
pub mod events;
pub mod profile;
pub mod scheduler;
pub mod sensing;
pub mod sequence;
pub mod status;
pub mod unit;

#[cfg(test)]
mod testing;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::boss::*;
    pub use crate::branches::{
        AggressiveConfig, Branch, BranchRole, BranchSet, Engagement, PassiveConfig,
        SequenceContext,
    };
    pub use crate::collab::*;
    pub use crate::controller::*;
    pub use crate::events::*;
    pub use crate::profile::*;
    pub use crate::scheduler::*;
    pub use crate::sensing::*;
    pub use crate::sequence::*;
    pub use crate::status::*;
    pub use crate::unit::*;
}

pub use prelude::*;
