//! Entity identifiers, world-object captures, and the pure classifier.
//!
//! The classifier is the leaf of the whole system: given one captured world
//! object ([`ObjectView`]) and optional static mob metadata
//! ([`MobInfo`](crate::mob::MobInfo)), it produces a [`ClassifiedEntity`]
//! with a semantic kind and danger attributes. It is pure and total: unknown
//! template ids fall back to a default hostile with proximity aggro and the
//! lowest danger tier, never an error.
//!
//! # Captures, not live references
//!
//! The host's world-object memory is only safe to touch on its own execution
//! context. [`ObjectView`] is a plain-data capture taken there in one pass;
//! creature-only fields (`name_id`, `in_combat`) are filled through the
//! host's fallible accessors and default when a read fails mid-capture.
//! The in-combat flag is read once per scan cycle because the underlying
//! memory read is expensive; consumers must use the cached value.

pub mod data_ids;

use std::fmt;

use glam::Vec3;

use crate::config::OverlayConfig;
use crate::consumable::Consumable;
use crate::content::DungeonKind;
use crate::mob::MobInfo;

// =============================================================================
// Identifiers
// =============================================================================

/// Per-instance world-object identifier.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct EntityId(u32);

impl EntityId {
    /// Creates an `EntityId` from a raw `u32` value.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the raw `u32` value.
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityId({})", self.0)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Static/template identifier shared by all instances of one object kind.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct DataId(u32);

impl DataId {
    /// Creates a `DataId` from a raw `u32` value.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the raw `u32` value.
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for DataId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DataId({})", self.0)
    }
}

/// Creature name identifier, the key into the static mob-metadata table.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct NameId(u32);

impl NameId {
    /// Creates a `NameId` from a raw `u32` value.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the raw `u32` value.
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for NameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NameId({})", self.0)
    }
}

// =============================================================================
// Object captures
// =============================================================================

/// Broad host-side category of a world object.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ObjectCategory {
    /// A player character (the local player or a party member).
    Player,
    /// A creature with combat state and a name id.
    Creature,
    /// A fixed world object: containers, traps, passages, returns.
    Fixture,
}

/// Subkind value marking an openly hostile creature.
pub const HOSTILE_SUBKIND: u8 = 5;

/// Plain-data capture of one live world object, taken on the host's safe
/// execution context.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectView {
    /// Per-instance id.
    pub entity_id: EntityId,
    /// Template id.
    pub data_id: DataId,
    /// Host-side category.
    pub category: ObjectCategory,
    /// Creature name id; `None` for non-creatures or failed reads.
    pub name_id: Option<NameId>,
    /// Display name as the client renders it.
    pub name: String,
    /// Creature subkind byte; 0 for non-creatures.
    pub subkind: u8,
    /// World position.
    pub position: Vec3,
    /// Facing direction in radians, used to render sight cones.
    pub heading: f32,
    /// Hitbox radius in distance units.
    pub hitbox_radius: f32,
    /// Whether the object was valid at capture time. Validity can flip
    /// between host frames; a capture with `valid == false` is skipped.
    pub valid: bool,
    /// In-combat flag, read once at capture time.
    pub in_combat: bool,
}

/// 2-D distance on the ground plane, matching the client's range checks.
#[must_use]
pub fn distance_xz(a: Vec3, b: Vec3) -> f32 {
    let dx = a.x - b.x;
    let dz = a.z - b.z;
    (dx * dx + dz * dz).sqrt()
}

// =============================================================================
// Semantic kinds and attributes
// =============================================================================

/// Semantic kind of a classified entity.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum EntityKind {
    /// The local player.
    Player,
    /// A hostile creature.
    Hostile,
    /// A creature disguised as a reward container.
    Mimic,
    /// A hostile presenting as friendly.
    DisguisedHostile,
    /// Bronze-tier reward container.
    BronzeChest,
    /// Silver-tier reward container.
    SilverChest,
    /// Gold-tier reward container.
    GoldChest,
    /// Undiscovered hazard reward.
    Hoard,
    /// Container revealed from a hazard reward.
    HoardChest,
    /// Reward container that is actually a disguised hostile.
    MimicChest,
    /// Hazard trap.
    Trap,
    /// Zone return landmark.
    Return,
    /// Zone passage landmark.
    Passage,
}

impl EntityKind {
    /// Returns `true` for the openable reward-container kinds.
    #[must_use]
    pub const fn is_chest(self) -> bool {
        matches!(
            self,
            Self::BronzeChest | Self::SilverChest | Self::GoldChest | Self::HoardChest
        )
    }

    /// Interaction range for this kind, in distance units.
    #[must_use]
    pub const fn interaction_distance(self) -> f32 {
        match self {
            Self::BronzeChest => 3.1,
            Self::SilverChest | Self::GoldChest | Self::HoardChest => 4.4,
            _ => 2.0,
        }
    }

    /// Game-font marker glyph shown before the display label, if any.
    #[must_use]
    pub const fn symbol(self) -> Option<&'static str> {
        match self {
            Self::Trap => Some("\u{E0BF}"),
            Self::Hoard => Some("\u{E03C}"),
            Self::BronzeChest | Self::SilverChest | Self::GoldChest => Some("\u{E03D}"),
            Self::Return => Some("\u{E03B}"),
            Self::Passage => Some("\u{E035}"),
            Self::DisguisedHostile => Some("\u{E034}"),
            _ => None,
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Player => "Player",
            Self::Hostile => "Hostile",
            Self::Mimic => "Mimic",
            Self::DisguisedHostile => "DisguisedHostile",
            Self::BronzeChest => "BronzeChest",
            Self::SilverChest => "SilverChest",
            Self::GoldChest => "GoldChest",
            Self::Hoard => "Hoard",
            Self::HoardChest => "HoardChest",
            Self::MimicChest => "MimicChest",
            Self::Trap => "Trap",
            Self::Return => "Return",
            Self::Passage => "Passage",
        };
        f.write_str(label)
    }
}

/// How a hostile acquires aggro.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
#[derive(serde::Serialize, serde::Deserialize)]
pub enum AggroKind {
    /// Aggros on proximity.
    #[default]
    Proximity,
    /// Aggros on nearby movement noise.
    Sound,
    /// Aggros on entering a forward sight cone.
    Sight,
}

/// Relative threat of a hostile.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[derive(serde::Serialize, serde::Deserialize)]
pub enum DangerTier {
    /// Routine.
    #[default]
    Easy,
    /// Needs attention.
    Caution,
    /// Avoid or burst down.
    Danger,
}

// =============================================================================
// Classification constants and overrides
// =============================================================================

/// Default aggro radius in distance units. Roughly safe for most hostiles.
pub const DEFAULT_AGGRO_RADIUS: f32 = 10.8;

/// Mimics in the Catacombs variant aggro from much further out.
pub const CATACOMBS_MIMIC_AGGRO_RADIUS: f32 = 14.6;

/// Forward sight cone for sight-aggro hostiles, in radians (~90°).
pub const SIGHT_CONE_RADIAN: f32 = 1.571;

// One creature's patrol flag cannot be trusted from static metadata: the
// mob with this name id patrols only when it spawns under this template id.
// Preserved verbatim from observed behavior; unconfirmed whether this is a
// data correction or a patch for a single bad record.
const PATROL_OVERRIDE_NAME_ID: u32 = 7_305;
const PATROL_OVERRIDE_DATA_ID: u32 = 8_922;

/// Per-content metadata corrections: `(name_id, patrol, aggro)` overrides
/// applied on top of the static table for specific floor sets.
/// Observed game data.
const CONTENT_OVERRIDES: &[(u16, &[(u32, Option<bool>, Option<AggroKind>)])] = &[
    (190, &[(5_041, Some(true), None)]),
    (211, &[(7_392, None, Some(AggroKind::Sight))]),
];

fn override_for(content_id: u16, name_id: NameId) -> Option<(Option<bool>, Option<AggroKind>)> {
    CONTENT_OVERRIDES
        .iter()
        .find(|(id, _)| *id == content_id)
        .and_then(|(_, rows)| {
            rows.iter()
                .find(|(id, _, _)| *id == name_id.as_u32())
                .map(|&(_, patrol, aggro)| (patrol, aggro))
        })
}

// =============================================================================
// ClassifiedEntity
// =============================================================================

/// Inputs that vary per run and affect classification.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClassifyContext {
    /// Active dungeon variant, if a run is in progress.
    pub variant: Option<DungeonKind>,
    /// Active content id (0 outside a run).
    pub content_id: u16,
    /// The local player's entity id, if present.
    pub local_player: Option<EntityId>,
}

/// One classified world object, rebuilt every scan cycle.
///
/// Lives only as long as the [`ScanSnapshot`](crate::scan::ScanSnapshot) it
/// was published in; the subset promoted into the floor registry is copied
/// out as plain data.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedEntity {
    view: ObjectView,
    kind: EntityKind,
    aggro: AggroKind,
    danger: DangerTier,
    patrol: bool,
    special: bool,
    boss_or_add: bool,
    aggro_radius: f32,
    sight_radian: f32,
    bonus_reward: Option<Consumable>,
}

impl ClassifiedEntity {
    /// The captured world object.
    #[must_use]
    pub fn view(&self) -> &ObjectView {
        &self.view
    }

    /// Per-instance id of the underlying object.
    #[must_use]
    pub fn entity_id(&self) -> EntityId {
        self.view.entity_id
    }

    /// Semantic kind.
    #[must_use]
    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    /// Aggro modality.
    #[must_use]
    pub fn aggro(&self) -> AggroKind {
        self.aggro
    }

    /// Danger tier.
    #[must_use]
    pub fn danger(&self) -> DangerTier {
        self.danger
    }

    /// Whether the creature patrols.
    #[must_use]
    pub fn is_patrol(&self) -> bool {
        self.patrol
    }

    /// Whether the creature is flagged special (rare spawn).
    #[must_use]
    pub fn is_special(&self) -> bool {
        self.special
    }

    /// Whether the creature is a boss or a boss add.
    #[must_use]
    pub fn is_boss_or_add(&self) -> bool {
        self.boss_or_add
    }

    /// Aggro radius in distance units, fixed at classification time.
    #[must_use]
    pub fn aggro_radius(&self) -> f32 {
        self.aggro_radius
    }

    /// Sight-cone half-angle for sight-aggro hostiles.
    #[must_use]
    pub fn sight_radian(&self) -> f32 {
        self.sight_radian
    }

    /// The consumable kind that unlocked a bonus reward inside this
    /// container, if one was recorded for it.
    #[must_use]
    pub fn bonus_reward(&self) -> Option<Consumable> {
        self.bonus_reward
    }

    /// Attaches a bonus-reward tag (gold containers only in practice).
    pub fn set_bonus_reward(&mut self, kind: Consumable) {
        self.bonus_reward = Some(kind);
    }

    /// Cached in-combat flag from capture time. Never re-read per frame.
    #[must_use]
    pub fn in_combat(&self) -> bool {
        self.view.in_combat
    }

    /// Returns `true` for openable reward containers.
    #[must_use]
    pub fn is_chest(&self) -> bool {
        self.kind.is_chest()
    }

    /// Interaction range for this entity's kind.
    #[must_use]
    pub fn interaction_distance(&self) -> f32 {
        self.kind.interaction_distance()
    }

    /// Ground-plane distance from a reference position (usually the player).
    #[must_use]
    pub fn distance_from(&self, position: Vec3) -> f32 {
        distance_xz(self.view.position, position)
    }

    /// Whether the overlay should render this entity's label.
    ///
    /// Hostile kinds hide their label once in combat; the hazard reward
    /// hides once the floor's hoard has been found.
    #[must_use]
    pub fn is_displayed(&self, config: &OverlayConfig, hoard_found: bool) -> bool {
        match self.kind {
            EntityKind::Player => false,
            EntityKind::Hostile | EntityKind::Mimic | EntityKind::DisguisedHostile => {
                !self.in_combat()
            }
            EntityKind::BronzeChest => config.show_bronze_chests,
            EntityKind::SilverChest => config.show_silver_chests,
            EntityKind::GoldChest => config.show_gold_chests,
            EntityKind::Hoard => config.show_hoards && !hoard_found,
            EntityKind::HoardChest => config.show_hoards,
            EntityKind::MimicChest => config.show_mimic_chests,
            EntityKind::Trap => config.show_traps,
            EntityKind::Return => config.show_returns,
            EntityKind::Passage => config.show_passages,
        }
    }

    /// Builds the display label: marker glyphs, kind or creature name, and
    /// the distance suffix for passages.
    ///
    /// Bosses and their adds are unlabeled, as are hostiles whose subkind is
    /// not openly hostile (pets, retainers).
    #[must_use]
    pub fn display_label(&self, player_position: Option<Vec3>, show_debug: bool) -> String {
        if self.boss_or_add {
            return String::new();
        }
        if self.kind == EntityKind::Hostile && self.view.subkind != HOSTILE_SUBKIND {
            return String::new();
        }

        let mut label = String::new();
        if self.special {
            label.push_str("\u{E0C0} ");
        } else if self.patrol {
            label.push_str("\u{E05E} ");
        } else if let Some(symbol) = self.kind.symbol() {
            label.push_str(symbol);
            label.push(' ');
        }

        let main = match self.kind {
            EntityKind::Trap => data_ids::trap_label(self.view.data_id)
                .unwrap_or("Unknown Trap")
                .to_string(),
            EntityKind::Hoard => "Buried Hoard".to_string(),
            EntityKind::BronzeChest => "Bronze Coffer".to_string(),
            EntityKind::SilverChest => "Silver Coffer".to_string(),
            EntityKind::GoldChest => "Gold Coffer".to_string(),
            EntityKind::HoardChest => "Hoard Coffer".to_string(),
            EntityKind::MimicChest => "Mimic".to_string(),
            _ => self.view.name.clone(),
        };
        label.push_str(&main);

        if self.kind == EntityKind::Passage {
            if let Some(player) = player_position {
                label.push_str(&format!(" - {:.1}", self.distance_from(player)));
            }
        }

        if show_debug {
            label.push_str(&format!("\nD:{}", self.view.data_id.as_u32()));
            if let Some(name_id) = self.view.name_id {
                label.push_str(&format!(" N:{}", name_id.as_u32()));
            }
        }

        label
    }
}

// =============================================================================
// classify
// =============================================================================

/// Classifies one captured world object.
///
/// Pure and total: identical inputs produce identical semantic fields, and
/// every input produces *some* classification. With metadata present the
/// object is a known creature and takes its attributes (plus per-content
/// corrections and the patrol quirk); without metadata the template id
/// decides the kind directly, defaulting to a proximity/easy hostile.
#[must_use]
pub fn classify(view: ObjectView, mob: Option<&MobInfo>, ctx: &ClassifyContext) -> ClassifiedEntity {
    let mut kind = EntityKind::Hostile;
    let mut aggro = AggroKind::Proximity;
    let mut danger = DangerTier::Easy;
    let mut patrol = false;
    let mut special = false;
    let mut boss_or_add = false;

    if ctx.local_player == Some(view.entity_id) {
        kind = EntityKind::Player;
    } else if let Some(info) = mob {
        aggro = info.aggro;
        danger = info.danger;
        patrol = info.patrol;
        special = info.special;
        boss_or_add = info.boss_or_add;

        if let Some((patrol_override, aggro_override)) = override_for(ctx.content_id, info.id) {
            if let Some(value) = patrol_override {
                patrol = value;
            }
            if let Some(value) = aggro_override {
                aggro = value;
            }
        }

        // Patrol quirk: see PATROL_OVERRIDE_NAME_ID above.
        if info.id.as_u32() == PATROL_OVERRIDE_NAME_ID {
            patrol = view.data_id.as_u32() == PATROL_OVERRIDE_DATA_ID;
        }
    } else {
        let id = view.data_id.as_u32();
        kind = if data_ids::BRONZE_CHESTS.contains(&id) {
            EntityKind::BronzeChest
        } else if id == data_ids::SILVER_CHEST {
            EntityKind::SilverChest
        } else if id == data_ids::GOLD_CHEST {
            EntityKind::GoldChest
        } else if id == data_ids::MIMIC_CHEST {
            EntityKind::MimicChest
        } else if id == data_ids::HOARD {
            EntityKind::Hoard
        } else if id == data_ids::HOARD_CHEST {
            EntityKind::HoardChest
        } else if data_ids::PASSAGES.contains(&id) {
            EntityKind::Passage
        } else if data_ids::RETURNS.contains(&id) {
            EntityKind::Return
        } else if data_ids::trap_label(view.data_id).is_some() {
            EntityKind::Trap
        } else if data_ids::DISGUISED_HOSTILES.contains(&id) {
            EntityKind::DisguisedHostile
        } else if data_ids::MIMICS.contains(&id) {
            EntityKind::Mimic
        } else {
            EntityKind::Hostile
        };
    }

    let aggro_radius =
        if kind == EntityKind::Mimic && ctx.variant == Some(DungeonKind::Catacombs) {
            CATACOMBS_MIMIC_AGGRO_RADIUS
        } else {
            DEFAULT_AGGRO_RADIUS
        };

    ClassifiedEntity {
        view,
        kind,
        aggro,
        danger,
        patrol,
        special,
        boss_or_add,
        aggro_radius,
        sight_radian: SIGHT_CONE_RADIAN,
        bonus_reward: None,
    }
}

// =============================================================================
// Tests
// =============================================================================
