//! Static/template id tables used by classification.
//!
//! These are observed game data: the template ids shared by all instances of
//! one kind of world object. They are collected in one place so a data patch
//! can correct them wholesale.

use super::DataId;

/// Zone-return landmarks, one per dungeon variant generation.
pub const RETURNS: &[u32] = &[2_007_187, 2_009_506, 2_013_287];

/// Zone-passage landmarks.
pub const PASSAGES: &[u32] = &[2_007_188, 2_009_507, 2_013_288];

/// Bronze-tier reward containers.
pub const BRONZE_CHESTS: &[u32] = &[2_007_358, 2_009_728, 2_013_290];

/// Silver-tier reward container.
pub const SILVER_CHEST: u32 = 2_007_357;

/// Gold-tier reward container.
pub const GOLD_CHEST: u32 = 2_007_536;

/// The undiscovered hazard reward (buried hoard).
pub const HOARD: u32 = 2_007_542;

/// The container revealed by digging up a hoard.
pub const HOARD_CHEST: u32 = 2_007_543;

/// A reward container that is actually a disguised hostile.
pub const MIMIC_CHEST: u32 = 2_006_020;

/// Hazard traps, with their display labels.
pub const TRAPS: &[(u32, &str)] = &[
    (2_007_182, "Explosive Trap"),
    (2_007_183, "Luring Trap"),
    (2_007_184, "Enfeebling Trap"),
    (2_007_185, "Impeding Trap"),
    (2_007_186, "Transforming Trap"),
    (2_013_284, "Hidden Trap"),
];

/// Creatures that spawn disguised as reward containers.
pub const MIMICS: &[u32] = &[2_566, 5_414, 12_246];

/// Hostiles that present as friendly until approached.
pub const DISGUISED_HOSTILES: &[u32] = &[4_986, 8_598, 12_422];

/// Looks up the display label of a trap template id.
#[must_use]
pub fn trap_label(data_id: DataId) -> Option<&'static str> {
    TRAPS
        .iter()
        .find(|(id, _)| *id == data_id.as_u32())
        .map(|(_, label)| *label)
}

/// Returns `true` if the template id is a passive landmark: returns,
/// passages, traps, and every reward-container variant.
///
/// The floor-tracking registry exists only for telemetry of creatures, so
/// these are excluded from it by design.
#[must_use]
pub fn is_passive_landmark(data_id: DataId) -> bool {
    let id = data_id.as_u32();
    RETURNS.contains(&id)
        || PASSAGES.contains(&id)
        || TRAPS.iter().any(|(trap, _)| *trap == id)
        || BRONZE_CHESTS.contains(&id)
        || id == SILVER_CHEST
        || id == GOLD_CHEST
        || id == MIMIC_CHEST
        || id == HOARD
        || id == HOARD_CHEST
}
