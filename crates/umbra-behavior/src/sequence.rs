//! Building blocks for resumable branch sequences.
//!
//! A sequence is a plain state value that a branch advances one suspension
//! point at a time when the scheduler resumes it. Cancelling a sequence means
//! dropping that value; nothing resumes it afterwards.

use thiserror::Error;
use umbra_common::Vec3;

use crate::collab::Navigator;

/// Identifies one started sequence of a unit.
///
/// Every start hands out a new token, so anything that remembers an older
/// token can tell that its sequence has been cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SequenceToken(u64);

impl SequenceToken {
    /// Creates a token from a raw counter value.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }

    /// Returns the token following this one.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

/// Outcome of resuming a sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// Suspended; resume again next tick
    Running,
    /// Reached its logical end
    Completed,
}

/// Runtime failure inside a branch sequence.
///
/// Never escapes the behavior controller: the branch is reset and its
/// sequence restarted.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum BranchFault {
    /// `resume` called on a branch without a started sequence
    #[error("branch '{0}' resumed without a running sequence")]
    NotStarted(&'static str),
    /// Aggressive branch asked to run without a live target
    #[error("branch '{0}' has no target to engage")]
    NoTarget(&'static str),
    /// Collaborator produced a value the branch cannot work with
    #[error("branch '{branch}' got an unusable value: {detail}")]
    BadInput {
        /// Branch name
        branch: &'static str,
        /// What was wrong
        detail: String,
    },
}

/// Countdown for timed waits.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Countdown {
    remaining: f32,
    duration: f32,
}

impl Countdown {
    /// Creates a countdown of `seconds`.
    #[must_use]
    pub fn new(seconds: f32) -> Self {
        let seconds = seconds.max(0.0);
        Self {
            remaining: seconds,
            duration: seconds,
        }
    }

    /// Advances by `dt`. Returns `true` once the countdown has elapsed.
    pub fn tick(&mut self, dt: f32) -> bool {
        self.remaining = (self.remaining - dt).max(0.0);
        self.is_done()
    }

    /// Whether the countdown has elapsed.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.remaining <= 0.0
    }

    /// Seconds left.
    #[must_use]
    pub fn remaining(&self) -> f32 {
        self.remaining
    }

    /// Elapsed share of the duration in `[0, 1]`.
    #[must_use]
    pub fn progress(&self) -> f32 {
        if self.duration <= 0.0 {
            1.0
        } else {
            1.0 - self.remaining / self.duration
        }
    }

    /// Restarts from the full duration.
    pub fn restart(&mut self) {
        self.remaining = self.duration;
    }
}

/// State of a movement sub-goal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveStatus {
    /// Still travelling
    InProgress,
    /// Within tolerance of the destination
    Arrived,
    /// Rejected or expired; the sequence carries on without it
    Abandoned,
}

/// A "move to point and wait" sub-task with an expiration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoveOrder {
    destination: Vec3,
    tolerance: f32,
    expires: Countdown,
    accepted: bool,
}

impl MoveOrder {
    /// Requests a path and starts the expiration clock.
    pub fn issue(nav: &mut dyn Navigator, destination: Vec3, tolerance: f32, timeout: f32) -> Self {
        let accepted = nav.request_move_to(destination);
        if !accepted {
            tracing::trace!("move request to {destination} rejected");
        }
        Self {
            destination,
            tolerance,
            expires: Countdown::new(timeout),
            accepted,
        }
    }

    /// Checks progress of the sub-goal.
    pub fn poll(&mut self, nav: &dyn Navigator, dt: f32) -> MoveStatus {
        if !self.accepted {
            return MoveStatus::Abandoned;
        }
        if !nav.is_path_pending() && nav.remaining_distance() <= self.tolerance {
            return MoveStatus::Arrived;
        }
        if self.expires.tick(dt) {
            tracing::trace!("move to {} expired", self.destination);
            return MoveStatus::Abandoned;
        }
        MoveStatus::InProgress
    }

    /// Where the order leads.
    #[must_use]
    pub fn destination(&self) -> Vec3 {
        self.destination
    }
}
