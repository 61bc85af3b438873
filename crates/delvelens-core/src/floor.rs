//! Per-floor state: effects, timers, registries, and the transfer handshake.
//!
//! A floor transfer is a two-step handshake. A transference event only sets
//! [`FloorState::transfer_pending`]; the floor number, timers, and registries
//! change later, in [`FloorState::advance_floor`], when the recommencement
//! event for the new floor arrives. Scan results captured while the flag is
//! set still belong to the *old* floor and are never tracked.
//!
//! All timestamps are passed in explicitly so tests can drive the clock.

use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

use tracing::debug;

use crate::consumable::Consumable;
use crate::content::{DungeonKind, FloorSet};
use crate::entity::data_ids;
use crate::entity::{ClassifiedEntity, DataId, EntityId, NameId};

// =============================================================================
// Tracked objects
// =============================================================================

/// Plain-data record of a creature sighted on a floor, promoted out of a
/// scan snapshot into the floor registry. This is the unit of telemetry.
#[derive(Debug, Clone, PartialEq)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct TrackedObject {
    /// Template id.
    pub data_id: DataId,
    /// Creature name id, if known.
    pub name_id: Option<NameId>,
    /// Display name at sighting time.
    pub name: String,
    /// Content id of the active floor set.
    pub content_id: u16,
    /// Floor the sighting happened on.
    pub floor: u32,
    /// Hitbox radius at sighting time.
    pub hitbox_radius: f32,
}

/// Hazard visibility on the current floor, derived from active effects.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum HazardStatus {
    /// Hazards are neutralized (a ward effect is active).
    Inactive,
    /// Hazards are visible but armed (a reveal effect is active).
    Visible,
    /// Hazards are armed and hidden.
    Active,
}

// =============================================================================
// FloorState
// =============================================================================

/// Mutable state of the floor the party is currently on.
#[derive(Debug, Clone, Default)]
pub struct FloorState {
    /// Active dungeon variant; `None` outside a run.
    pub variant: Option<DungeonKind>,
    /// Current floor number. 0 before the first advancement of a run.
    pub current_floor: u32,
    /// Set when a transference has begun but the next floor has not
    /// recommenced yet.
    pub transfer_pending: bool,
    /// Set once the floor number has been confirmed against the client's
    /// floor readout.
    pub floor_verified: bool,
    /// Set once this floor's hidden hoard has been reported found.
    pub hoard_found: bool,

    floor_start: Option<Instant>,
    next_respawn: Option<Instant>,
    respawn_interval: Duration,

    active_effects: Vec<Consumable>,
    consumed: Vec<Consumable>,

    interacted: HashSet<EntityId>,
    tracked: HashMap<EntityId, TrackedObject>,
    reward_containers: HashMap<EntityId, Consumable>,
}

impl FloorState {
    /// Resets everything to the out-of-run state.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Prepares floor state for a freshly commenced run.
    ///
    /// The floor number is set one below the set's start floor with a
    /// pending transfer, so the first recommencement advances onto the
    /// actual start floor through the normal path.
    pub fn begin_run(&mut self, set: &FloorSet) {
        self.clear();
        self.variant = Some(set.variant);
        self.current_floor = set.start_floor.saturating_sub(1);
        self.respawn_interval = Duration::from_secs(set.respawn_secs);
        self.transfer_pending = true;
    }

    /// Marks a transference as begun. Idempotent.
    pub fn begin_transfer(&mut self) {
        self.transfer_pending = true;
    }

    /// Advances onto the next floor. No-op unless a transfer is pending.
    ///
    /// Carry-over effects are recomputed from the finished floor's consumed
    /// items; every per-floor registry and flag resets.
    pub fn advance_floor(&mut self, now: Instant) {
        if !self.transfer_pending {
            return;
        }

        self.active_effects = self
            .consumed
            .iter()
            .copied()
            .filter(|kind| kind.is_carry_over())
            .collect();
        self.consumed.clear();

        self.interacted.clear();
        self.tracked.clear();
        self.reward_containers.clear();
        self.hoard_found = false;
        self.floor_verified = false;

        self.current_floor += 1;
        self.floor_start = Some(now);
        self.next_respawn = if self.has_respawn_timer() {
            Some(now + self.respawn_interval)
        } else {
            None
        };
        self.transfer_pending = false;

        debug!(floor = self.current_floor, carry_over = self.active_effects.len(), "floor_advanced");
    }

    /// Records a consumed item. Carry-over kinds do not affect the current
    /// floor, so they are recorded for the advancement but not activated.
    ///
    /// Expects the canonical (already remapped) kind.
    pub fn on_item_consumed(&mut self, kind: Consumable) {
        self.consumed.push(kind);
        if !kind.is_carry_over() {
            self.active_effects.push(kind);
        }
    }

    /// Current hazard visibility. Ward takes precedence over reveal.
    #[must_use]
    pub fn hazard_status(&self) -> HazardStatus {
        if self.active_effects.contains(&Consumable::Ward) {
            HazardStatus::Inactive
        } else if self.active_effects.contains(&Consumable::Reveal) {
            HazardStatus::Visible
        } else {
            HazardStatus::Active
        }
    }

    /// Effects active on the current floor, in canonical id order.
    #[must_use]
    pub fn floor_effects(&self) -> Vec<Consumable> {
        let mut effects = self.active_effects.clone();
        effects.sort_unstable();
        effects.dedup();
        effects
    }

    /// Whether the current floor has a mob respawn cycle at all. Boss floors
    /// (every tenth) do not, and neither does floor 99 of the Reliquary.
    #[must_use]
    pub fn has_respawn_timer(&self) -> bool {
        if self.current_floor % 10 == 0 {
            return false;
        }
        !(self.variant == Some(DungeonKind::Reliquary) && self.current_floor == 99)
    }

    /// Seconds until the next mob respawn, saturating at zero.
    ///
    /// When a respawn boundary has passed, the cycle rolls forward before
    /// computing the remainder, so the countdown restarts on query.
    #[must_use]
    pub fn seconds_until_respawn(&mut self, now: Instant) -> Option<u64> {
        let next = self.next_respawn?;
        if now >= next {
            if self.respawn_interval.is_zero() {
                return Some(0);
            }
            let mut next = next;
            while now >= next {
                next += self.respawn_interval;
            }
            self.next_respawn = Some(next);
            return Some(next.duration_since(now).as_secs());
        }
        Some(next.duration_since(now).as_secs())
    }

    /// Seconds spent on the current floor so far.
    #[must_use]
    pub fn elapsed_floor_seconds(&self, now: Instant) -> u64 {
        self.floor_start
            .map_or(0, |start| now.duration_since(start).as_secs())
    }

    /// Confirms (or corrects) the floor number from the client's readout.
    pub fn verify_floor(&mut self, observed: u32) {
        if observed != self.current_floor {
            debug!(expected = self.current_floor, observed, "floor_corrected");
            self.current_floor = observed;
        }
        self.floor_verified = true;
    }

    /// Returns `true` if the given kind was consumed on this floor, which
    /// for carry-over kinds means its effect is queued for the next floor.
    /// The overlay uses this to show what the upcoming floor starts with.
    #[must_use]
    pub fn is_next_floor_with(&self, kind: Consumable) -> bool {
        self.consumed.contains(&kind)
    }

    // -------------------------------------------------------------------------
    // Registries
    // -------------------------------------------------------------------------

    /// Records a creature sighting in the floor registry.
    ///
    /// Skipped while a transfer is pending (the capture belongs to the old
    /// floor), for passive landmarks, and for ids already present. The
    /// first sighting of an id wins.
    pub fn track(&mut self, entity: &ClassifiedEntity, content_id: u16) {
        if self.transfer_pending {
            return;
        }
        let view = entity.view();
        if data_ids::is_passive_landmark(view.data_id) {
            return;
        }
        self.tracked
            .entry(view.entity_id)
            .or_insert_with(|| TrackedObject {
                data_id: view.data_id,
                name_id: view.name_id,
                name: view.name.clone(),
                content_id,
                floor: self.current_floor,
                hitbox_radius: view.hitbox_radius,
            });
    }

    /// The creature sightings recorded on this floor.
    #[must_use]
    pub fn tracked(&self) -> &HashMap<EntityId, TrackedObject> {
        &self.tracked
    }

    /// Marks an entity as interacted with this floor.
    pub fn mark_interacted(&mut self, id: EntityId) {
        self.interacted.insert(id);
    }

    /// Returns `true` if the entity was already interacted with this floor.
    #[must_use]
    pub fn was_interacted(&self, id: EntityId) -> bool {
        self.interacted.contains(&id)
    }

    /// Tags a container as holding a bonus reward of the given kind.
    pub fn record_reward_container(&mut self, id: EntityId, kind: Consumable) {
        self.reward_containers.insert(id, kind);
    }

    /// The bonus reward recorded for a container, if any.
    #[must_use]
    pub fn reward_for(&self, id: EntityId) -> Option<Consumable> {
        self.reward_containers.get(&id).copied()
    }
}

// =============================================================================
// Tests
// =============================================================================
