//! Dungeon variants, zone membership, and floor-set parameters.
//!
//! Every run belongs to one of three dungeon variants. A run-commenced event
//! carries a content id; [`floor_set_for`] maps it to the parameters of the
//! ten-floor set being entered (start floor, mob respawn interval, which
//! container tier carries the ambush risk). Zone-id membership
//! ([`variant_for_zone`]) backs the failsafe check: if the client's zone
//! stops being a dungeon zone mid-run, the run is force-exited.
//!
//! All numeric tables in this module are observed game data.

// =============================================================================
// DungeonKind
// =============================================================================

/// The three dungeon variants.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[derive(serde::Serialize, serde::Deserialize)]
pub enum DungeonKind {
    /// The original 200-floor dungeon.
    Catacombs,
    /// The 100-floor second dungeon.
    Spire,
    /// The 100-floor third dungeon, with the remapped item numbering.
    Reliquary,
}

/// Which reward-container tier is statistically unsafe (possible ambush)
/// for a floor set.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum AmbushTier {
    /// No tier carries the ambush risk in this floor set.
    None,
    /// Silver-tier containers may be ambushes.
    Silver,
    /// Gold-tier containers may be ambushes.
    Gold,
}

/// Parameters for one ten-floor set of a dungeon variant.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct FloorSet {
    /// The variant this set belongs to.
    pub variant: DungeonKind,
    /// First floor of the set.
    pub start_floor: u32,
    /// Mob respawn interval in seconds.
    pub respawn_secs: u64,
    /// Which container tier is unsafe in this set.
    pub ambush_tier: AmbushTier,
}

// =============================================================================
// Zone membership
// =============================================================================

const CATACOMBS_ZONES: &[u16] = &[
    561, 562, 563, 564, 565, 593, 594, 595, 596, 597, 598, 599, 600, 601, 602, 603, 604, 605, 606,
    607,
];
const SPIRE_ZONES: &[u16] = &[770, 771, 772, 773, 774, 775, 782, 783, 784, 785];
const RELIQUARY_ZONES: &[u16] = &[1099, 1100, 1101, 1102, 1103, 1104, 1105, 1106, 1107];

/// Returns the dungeon variant a zone id belongs to, if any.
#[must_use]
pub fn variant_for_zone(zone_id: u16) -> Option<DungeonKind> {
    if CATACOMBS_ZONES.contains(&zone_id) {
        Some(DungeonKind::Catacombs)
    } else if SPIRE_ZONES.contains(&zone_id) {
        Some(DungeonKind::Spire)
    } else if RELIQUARY_ZONES.contains(&zone_id) {
        Some(DungeonKind::Reliquary)
    } else {
        None
    }
}

/// Returns `true` if the zone id is any dungeon zone.
#[must_use]
pub fn is_dungeon_zone(zone_id: u16) -> bool {
    variant_for_zone(zone_id).is_some()
}

// =============================================================================
// Floor sets
// =============================================================================

/// `(content_id, start_floor, respawn_secs, ambush_tier)` per floor set.
type FloorSetRow = (u16, u32, u64, AmbushTier);

const CATACOMBS_SETS: &[FloorSetRow] = &[
    (174, 1, 40, AmbushTier::None),
    (175, 11, 40, AmbushTier::None),
    (176, 21, 60, AmbushTier::None),
    (177, 31, 60, AmbushTier::None),
    (178, 41, 60, AmbushTier::Silver),
    (179, 51, 60, AmbushTier::Silver),
    (180, 61, 60, AmbushTier::Silver),
    (181, 71, 60, AmbushTier::Silver),
    (182, 81, 60, AmbushTier::Silver),
    (183, 91, 60, AmbushTier::Silver),
    (184, 101, 120, AmbushTier::Silver),
    (185, 111, 120, AmbushTier::Silver),
    (186, 121, 120, AmbushTier::Silver),
    (187, 131, 120, AmbushTier::Silver),
    (188, 141, 120, AmbushTier::Silver),
    (189, 151, 120, AmbushTier::Silver),
    (190, 161, 180, AmbushTier::Silver),
    (191, 171, 180, AmbushTier::Silver),
    (192, 181, 240, AmbushTier::Silver),
    (193, 191, 300, AmbushTier::Silver),
];

const SPIRE_SETS: &[FloorSetRow] = &[
    (204, 1, 60, AmbushTier::None),
    (205, 11, 60, AmbushTier::None),
    (206, 21, 60, AmbushTier::Silver),
    (207, 31, 120, AmbushTier::Silver),
    (208, 41, 120, AmbushTier::Silver),
    (209, 51, 120, AmbushTier::Gold),
    (210, 61, 180, AmbushTier::Gold),
    (211, 71, 180, AmbushTier::Gold),
    (212, 81, 240, AmbushTier::Gold),
    (213, 91, 300, AmbushTier::Gold),
];

const RELIQUARY_SETS: &[FloorSetRow] = &[
    (899, 1, 60, AmbushTier::None),
    (900, 11, 60, AmbushTier::None),
    (901, 21, 60, AmbushTier::Silver),
    (902, 31, 120, AmbushTier::Silver),
    (903, 41, 120, AmbushTier::Silver),
    (904, 51, 120, AmbushTier::Gold),
    (905, 61, 180, AmbushTier::Gold),
    (906, 71, 180, AmbushTier::Gold),
    (907, 81, 240, AmbushTier::Gold),
    (908, 91, 300, AmbushTier::Gold),
];

fn lookup(rows: &[FloorSetRow], variant: DungeonKind, content_id: u16) -> Option<FloorSet> {
    rows.iter()
        .find(|(id, _, _, _)| *id == content_id)
        .map(|&(_, start_floor, respawn_secs, ambush_tier)| FloorSet {
            variant,
            start_floor,
            respawn_secs,
            ambush_tier,
        })
}

/// Maps a run-commenced content id to its floor-set parameters.
///
/// Returns `None` for content ids outside the known tables; a run-commenced
/// event with an unknown id is ignored by the run controller.
#[must_use]
pub fn floor_set_for(content_id: u16) -> Option<FloorSet> {
    lookup(CATACOMBS_SETS, DungeonKind::Catacombs, content_id)
        .or_else(|| lookup(SPIRE_SETS, DungeonKind::Spire, content_id))
        .or_else(|| lookup(RELIQUARY_SETS, DungeonKind::Reliquary, content_id))
}

// =============================================================================
// Tests
// =============================================================================
