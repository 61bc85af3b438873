//! The seam between the overlay core and its hosting client.
//!
//! Everything the core needs from the client lives behind these traits:
//! player and zone queries, world-object enumeration, interactions, UI
//! surfaces, and the host-context executor. Production wires them to the
//! client's plugin API; tests wire them to in-memory fakes.
//!
//! # The host-context contract
//!
//! [`WorldSource::objects`] and [`Interactor`] touch client memory that is
//! only coherent on the client's own update context. They must only be
//! called from inside a job submitted through [`HostExecutor::run`]. The
//! read-only queries on [`ClientView`] are safe from any thread.

use std::time::Duration;

use glam::Vec3;

use crate::entity::{EntityId, ObjectView};

// =============================================================================
// Status flags
// =============================================================================

bitflags::bitflags! {
    /// Client conditions that block scanning.
    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    pub struct ConditionFlags: u32 {
        /// The client is logging out.
        const LOGGING_OUT = 1 << 0;
        /// A zone change is in progress.
        const BETWEEN_AREAS = 1 << 1;
        /// A long-distance transit is in progress.
        const BETWEEN_AREAS_TRANSIT = 1 << 2;
    }
}

impl ConditionFlags {
    /// Returns `true` if any condition that blocks scanning is set.
    #[must_use]
    pub const fn blocks_scanning(self) -> bool {
        !self.is_empty()
    }
}

bitflags::bitflags! {
    /// Per-player status flags.
    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    pub struct PlayerFlags: u32 {
        /// The player is in combat.
        const IN_COMBAT = 1 << 0;
        /// An item-use penalty is active (consumables cannot be invoked).
        const ITEM_PENALTY = 1 << 1;
    }
}

/// Snapshot of the local player's status.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerStatus {
    /// The player's entity id.
    pub entity_id: EntityId,
    /// World position.
    pub position: Vec3,
    /// Health as a fraction of maximum, 0.0..=1.0.
    pub health_fraction: f32,
    /// Status flags.
    pub flags: PlayerFlags,
}

// =============================================================================
// Host traits
// =============================================================================

/// Read-only queries about the client's current state. Thread-safe.
pub trait ClientView: Send + Sync {
    /// The current zone id.
    fn zone_id(&self) -> u16;
    /// The local player's status, if a player exists.
    fn local_player(&self) -> Option<PlayerStatus>;
    /// Current blocking conditions.
    fn conditions(&self) -> ConditionFlags;
    /// Whether a character is logged in.
    fn logged_in(&self) -> bool;
    /// Current party size, 1 when solo.
    fn party_size(&self) -> u8;
}

/// World-object enumeration. Host-context only.
pub trait WorldSource: Send + Sync {
    /// Captures every world object as plain data, in one pass.
    fn objects(&self) -> Vec<ObjectView>;
    /// Cheap object count, used to skip cycles in empty zones.
    fn object_count(&self) -> usize;
}

/// Outbound actions against the client. Host-context only.
pub trait Interactor: Send + Sync {
    /// Interacts with (opens, steps on, talks to) a world object.
    fn interact(&self, id: EntityId);
    /// Invokes a consumable by its variant-specific wire id.
    fn invoke_consumable(&self, wire_id: u8);
}

/// UI surfaces the core drives. Thread-safe.
pub trait UiPort: Send + Sync {
    /// Opens or closes the main overlay window.
    fn set_main_ui_open(&self, open: bool);
    /// The floor number shown by the client's own readout, if visible.
    fn floor_readout(&self) -> Option<u32>;
    /// Passage activation progress in percent, if the readout is visible.
    fn passage_progress(&self) -> Option<u8>;
    /// Prints a line to the client's chat log.
    fn print_message(&self, text: &str);
}

// =============================================================================
// HostExecutor
// =============================================================================

/// Outcome of a host-context job submission.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ExecOutcome {
    /// The job ran to completion on the host context.
    Completed,
    /// The deadline expired before the host ran the job. The submission is
    /// abandoned; the caller must treat any shared output slot as unset.
    TimedOut,
}

/// Marshals jobs onto the client's update context.
pub trait HostExecutor: Send + Sync {
    /// Runs a job on the host context, waiting up to `timeout` for it to
    /// finish. Jobs communicate results through captured shared state.
    fn run(&self, job: Box<dyn FnOnce() + Send>, timeout: Duration) -> ExecOutcome;
}

/// Executor that runs jobs inline on the calling thread. Only suitable for
/// tests and single-threaded hosts.
#[derive(Debug, Default)]
pub struct InlineExecutor;

impl HostExecutor for InlineExecutor {
    fn run(&self, job: Box<dyn FnOnce() + Send>, _timeout: Duration) -> ExecOutcome {
        job();
        ExecOutcome::Completed
    }
}
