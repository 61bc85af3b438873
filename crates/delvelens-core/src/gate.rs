//! The container auto-open gate.
//!
//! One pure decision function, ordered from cheapest check to most
//! situational. Every refusal is a typed reason so the caller can log or
//! surface it; the gate itself never acts and never mutates state. The
//! caller records the entity id in the floor's interaction registry after
//! acting, which is what makes the permit one-shot per floor.

use crate::config::OverlayConfig;
use crate::content::AmbushTier;
use crate::entity::{ClassifiedEntity, EntityKind};

/// Silver containers are refused below this health fraction: a possible
/// ambush at low health is a run killer.
pub const SILVER_HEALTH_FLOOR: f32 = 0.77;

/// Why the gate refused to open a container.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Refusal {
    /// The entity is not an openable container.
    NotInteractable,
    /// The player is in combat.
    InCombat,
    /// Auto-opening is disabled for this tier (or entirely).
    ToggleOff,
    /// Player health is too low to risk a silver container.
    LowHealth,
    /// This tier carries the ambush risk in the current floor set and the
    /// user has not opted in.
    AmbushRisk,
    /// The container is beyond its interaction range.
    OutOfRange,
    /// This container was already opened this floor.
    AlreadyOpened,
}

/// Everything about the current moment the gate needs to decide.
#[derive(Debug, Clone, Copy)]
pub struct GateInput {
    /// Whether the local player is in combat.
    pub player_in_combat: bool,
    /// Player health as a fraction of maximum, 0.0..=1.0.
    pub health_fraction: f32,
    /// Ground-plane distance from the player to the container.
    pub distance: f32,
    /// Which container tier is unsafe in the active floor set.
    pub ambush_tier: AmbushTier,
    /// Whether this container was already opened this floor.
    pub already_opened: bool,
}

fn tier_enabled(kind: EntityKind, config: &OverlayConfig) -> bool {
    if !config.open_chests {
        return false;
    }
    match kind {
        EntityKind::BronzeChest => config.open_bronze_chests,
        EntityKind::SilverChest => config.open_silver_chests,
        EntityKind::GoldChest => config.open_gold_chests,
        EntityKind::HoardChest => config.open_hoard_chests,
        _ => false,
    }
}

fn ambush_applies(kind: EntityKind, tier: AmbushTier) -> bool {
    match tier {
        AmbushTier::None => false,
        AmbushTier::Silver => kind == EntityKind::SilverChest,
        AmbushTier::Gold => kind == EntityKind::GoldChest,
    }
}

/// Decides whether a container may be auto-opened right now.
///
/// # Errors
///
/// Returns the first applicable [`Refusal`], checked in a fixed order:
/// kind, combat, toggles, health, ambush risk, range, dedup.
pub fn decide(
    entity: &ClassifiedEntity,
    config: &OverlayConfig,
    input: &GateInput,
) -> Result<(), Refusal> {
    if !entity.is_chest() {
        return Err(Refusal::NotInteractable);
    }
    if input.player_in_combat {
        return Err(Refusal::InCombat);
    }
    if !tier_enabled(entity.kind(), config) {
        return Err(Refusal::ToggleOff);
    }
    if entity.kind() == EntityKind::SilverChest && input.health_fraction <= SILVER_HEALTH_FLOOR {
        return Err(Refusal::LowHealth);
    }
    if ambush_applies(entity.kind(), input.ambush_tier) && !config.open_unsafe_chests {
        return Err(Refusal::AmbushRisk);
    }
    if input.distance > entity.interaction_distance() {
        return Err(Refusal::OutOfRange);
    }
    if input.already_opened {
        return Err(Refusal::AlreadyOpened);
    }
    Ok(())
}

// =============================================================================
// Tests
// =============================================================================
