//! Consumable item kinds and the per-variant id remap.
//!
//! The dungeon mode distributes consumable items ("draughts") whose effects
//! modify the current floor or carry into the next one. The event feed
//! reports them as raw numeric kinds. Two complications live here:
//!
//! - The Reliquary variant enumerates the same items under shifted ids
//!   (a contiguous band moved by +22, two stragglers by +20). [`remap`]
//!   normalizes a raw wire id back to the canonical numbering before any
//!   other code sees it. The shift is table-driven, matching observed game
//!   data; do not re-derive it.
//! - Three kinds ([`Consumable::is_carry_over`]) apply their effect to the
//!   *next* floor rather than the current one.

use std::fmt;

use crate::content::DungeonKind;

// =============================================================================
// Consumable
// =============================================================================

/// A consumable item kind, in canonical numbering.
///
/// The discriminants are the canonical wire ids used by the Catacombs and
/// Spire variants. The Reliquary variant's shifted ids are normalized by
/// [`remap`] and never appear as variants here.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[derive(serde::Serialize, serde::Deserialize)]
#[repr(u8)]
pub enum Consumable {
    /// Neutralizes floor hazards for the current floor.
    Ward = 1,
    /// Reveals floor hazards without disarming them.
    Reveal = 2,
    /// Strength buff.
    Strength = 3,
    /// Defense buff.
    Steel = 4,
    /// Extra reward containers on the next floor (carry-over).
    Bounty = 5,
    /// Skip directly to the next floor (carry-over).
    Flight = 6,
    /// Changes mob composition on the next floor (carry-over).
    Alteration = 7,
    /// Removes active debuffs.
    Purity = 8,
    /// Improves drop quality this floor.
    Fortune = 9,
    /// Transforms nearby mobs.
    Witching = 10,
    /// Prevents mob aggression this floor.
    Serenity = 11,
    /// Damage frenzy (Catacombs only).
    Rage = 12,
    /// Lure buff (Catacombs only).
    Lust = 13,
    /// Reveals the hidden hoard this floor.
    Intuition = 14,
    /// Revives a fallen party member.
    Raising = 15,
    /// Full party restoration (Catacombs only).
    Resolution = 16,
    /// Weakens mobs (Spire only).
    Frailty = 17,
    /// Concealment from mobs (Spire only).
    Concealment = 18,
    /// Petrifies nearby mobs (Spire only).
    Petrification = 19,
}

/// Every consumable kind, in canonical id order.
pub const ALL_CONSUMABLES: &[Consumable] = &[
    Consumable::Ward,
    Consumable::Reveal,
    Consumable::Strength,
    Consumable::Steel,
    Consumable::Bounty,
    Consumable::Flight,
    Consumable::Alteration,
    Consumable::Purity,
    Consumable::Fortune,
    Consumable::Witching,
    Consumable::Serenity,
    Consumable::Rage,
    Consumable::Lust,
    Consumable::Intuition,
    Consumable::Raising,
    Consumable::Resolution,
    Consumable::Frailty,
    Consumable::Concealment,
    Consumable::Petrification,
];

// Reliquary id shift: canonical 1..=11 appear as 23..=33, canonical 14/15
// appear as 34/35. Observed game data.
const BAND_SHIFT: u8 = 22;
const STRAGGLER_SHIFT: u8 = 20;

impl Consumable {
    /// Decodes a canonical raw id. Returns `None` for ids outside the table.
    #[must_use]
    pub const fn from_raw(raw: u8) -> Option<Self> {
        Some(match raw {
            1 => Self::Ward,
            2 => Self::Reveal,
            3 => Self::Strength,
            4 => Self::Steel,
            5 => Self::Bounty,
            6 => Self::Flight,
            7 => Self::Alteration,
            8 => Self::Purity,
            9 => Self::Fortune,
            10 => Self::Witching,
            11 => Self::Serenity,
            12 => Self::Rage,
            13 => Self::Lust,
            14 => Self::Intuition,
            15 => Self::Raising,
            16 => Self::Resolution,
            17 => Self::Frailty,
            18 => Self::Concealment,
            19 => Self::Petrification,
            _ => return None,
        })
    }

    /// Returns the canonical raw id of this kind.
    #[must_use]
    pub const fn raw(self) -> u8 {
        self as u8
    }

    /// Returns `true` if this kind's effect carries into the next floor
    /// instead of applying to the current one.
    #[must_use]
    pub const fn is_carry_over(self) -> bool {
        matches!(self, Self::Bounty | Self::Flight | Self::Alteration)
    }

    /// Returns the wire id used to invoke this consumable in the given
    /// dungeon variant.
    ///
    /// The Reliquary variant expects the shifted ids; the other variants use
    /// the canonical ones.
    #[must_use]
    pub const fn wire_id(self, variant: DungeonKind) -> u8 {
        let id = self.raw();
        match variant {
            DungeonKind::Reliquary => match id {
                1..=11 => id + BAND_SHIFT,
                14 | 15 => id + STRAGGLER_SHIFT,
                _ => id,
            },
            _ => id,
        }
    }

    /// Returns `true` if this kind can be invoked in the given variant.
    #[must_use]
    pub const fn usable_in(self, variant: DungeonKind) -> bool {
        match self {
            Self::Rage | Self::Lust | Self::Resolution => {
                matches!(variant, DungeonKind::Catacombs)
            }
            Self::Frailty | Self::Concealment | Self::Petrification => {
                matches!(variant, DungeonKind::Spire)
            }
            _ => true,
        }
    }

    /// The display name of this kind.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Ward => "Ward",
            Self::Reveal => "Reveal",
            Self::Strength => "Strength",
            Self::Steel => "Steel",
            Self::Bounty => "Bounty",
            Self::Flight => "Flight",
            Self::Alteration => "Alteration",
            Self::Purity => "Purity",
            Self::Fortune => "Fortune",
            Self::Witching => "Witching",
            Self::Serenity => "Serenity",
            Self::Rage => "Rage",
            Self::Lust => "Lust",
            Self::Intuition => "Intuition",
            Self::Raising => "Raising",
            Self::Resolution => "Resolution",
            Self::Frailty => "Frailty",
            Self::Concealment => "Concealment",
            Self::Petrification => "Petrification",
        }
    }
}

impl fmt::Display for Consumable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// Remap and name resolution
// =============================================================================

/// Normalizes a raw consumed-item id to the canonical numbering.
///
/// For the Reliquary variant, the shifted band 23..=33 maps back by −22 and
/// the pair 34/35 by −20. All other variants pass the id through unchanged.
#[must_use]
pub const fn remap(raw: u8, variant: Option<DungeonKind>) -> u8 {
    match variant {
        Some(DungeonKind::Reliquary) => match raw {
            23..=33 => raw - BAND_SHIFT,
            34 | 35 => raw - STRAGGLER_SHIFT,
            _ => raw,
        },
        _ => raw,
    }
}

/// Why a free-text consumable name failed to resolve.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    /// The query string was empty.
    #[error("no consumable name given")]
    Empty,
    /// More than one kind matched the partial name.
    #[error("'{query}' is ambiguous: matches {matches:?}")]
    Ambiguous {
        /// The query as given.
        query: String,
        /// The display names of every matching kind.
        matches: Vec<&'static str>,
    },
    /// No kind matched.
    #[error("no consumable matches '{query}'")]
    NotFound {
        /// The query as given.
        query: String,
    },
}

/// Resolves a free-text or partial name to a consumable kind.
///
/// Matching is case-insensitive substring search over display names; an
/// exact (case-insensitive) full-name match wins outright even when it is
/// also a substring of other names.
pub fn resolve_by_name(query: &str) -> Result<Consumable, ResolveError> {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        return Err(ResolveError::Empty);
    }
    let needle = trimmed.to_ascii_lowercase();

    let mut matches: Vec<Consumable> = Vec::new();
    for &kind in ALL_CONSUMABLES {
        let name = kind.name().to_ascii_lowercase();
        if name == needle {
            return Ok(kind);
        }
        if name.contains(&needle) {
            matches.push(kind);
        }
    }

    match matches.as_slice() {
        [] => Err(ResolveError::NotFound {
            query: trimmed.to_string(),
        }),
        [single] => Ok(*single),
        many => Err(ResolveError::Ambiguous {
            query: trimmed.to_string(),
            matches: many.iter().map(|k| k.name()).collect(),
        }),
    }
}

// =============================================================================
// Tests
// =============================================================================
