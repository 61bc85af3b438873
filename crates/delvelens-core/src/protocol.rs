//! Decoding of opaque network events into typed run events.
//!
//! The hosting layer forwards raw packet payloads here without interpreting
//! them. Decoding is deliberately silent: a payload that is upstream, too
//! short, or carries an unknown id yields `None` and is dropped. Events
//! outside a run are the caller's problem; this module only answers "what
//! does this payload say".
//!
//! Offsets and ids in this module are observed wire data. Consumed-item
//! kinds are returned raw; the caller normalizes them with
//! [`remap`](crate::consumable::remap) because the shift depends on the
//! active variant, which the decoder does not know.

use tracing::trace;

/// Direction of a forwarded packet.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Channel {
    /// Server to client. The only direction decoded.
    Downstream,
    /// Client to server.
    Upstream,
}

/// A typed event decoded from the wire.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum GameEvent {
    /// A run has commenced under the given content id.
    RunCommenced {
        /// Content id of the floor set being entered.
        content_id: u16,
    },
    /// The next floor of an active run has recommenced.
    RunRecommenced,
    /// A consumable item was used. The kind is the raw wire id.
    ItemConsumed {
        /// Raw (unremapped) consumable kind.
        raw_kind: u8,
    },
    /// The duty has ended (completion, wipe, or withdrawal).
    DutyEnded,
    /// A floor transference has begun.
    TransferenceInitiated,
    /// The floor's hidden hoard was located.
    HoardLocated,
    /// A container's bonus reward was unlocked. The kind is the raw wire id.
    BonusRewardUnlocked {
        /// Raw (unremapped) consumable kind.
        raw_kind: u8,
    },
}

// =============================================================================
// Wire constants
// =============================================================================

/// Packet opcodes delvelens decodes.
pub mod opcode {
    /// Duty director state updates.
    pub const DIRECTOR_UPDATE: u16 = 0x022F;
    /// System log messages.
    pub const SYSTEM_LOG: u16 = 0x02E6;
}

// Director payloads: byte 0 is the director category, byte 8 the update
// subtype, bytes 4..6 the content id.
const DIRECTOR_DEEP_DUNGEON: u8 = 0x0D;
const DIRECTOR_COMMENCED: u8 = 0x01;
const DIRECTOR_RECOMMENCED: u8 = 0x06;

// System log payloads: bytes 4..8 are the log id.
mod log_id {
    pub const ITEM_USED: u32 = 0x1C34;
    pub const DUTY_ENDED: u32 = 0x1C3A;
    pub const TRANSFERENCE_INITIATED: u32 = 0x1C3C;
    pub const HOARD_FOUND: &[u32] = &[0x1C6A, 0x1C6B, 0x1C6C];
    pub const BONUS_REWARD: &[u32] = &[0x1C36, 0x23F8];
}

// Consumed-item kind offsets within system log payloads.
const ITEM_USED_KIND_OFFSET: usize = 16;
const BONUS_REWARD_KIND_OFFSET: usize = 12;

// =============================================================================
// decode
// =============================================================================

fn read_u16_le(payload: &[u8], offset: usize) -> Option<u16> {
    let bytes = payload.get(offset..offset + 2)?;
    Some(u16::from_le_bytes([bytes[0], bytes[1]]))
}

fn read_u32_le(payload: &[u8], offset: usize) -> Option<u32> {
    let bytes = payload.get(offset..offset + 4)?;
    Some(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

/// Decodes one forwarded packet into a typed event, if it is one we track.
#[must_use]
pub fn decode(opcode: u16, channel: Channel, payload: &[u8]) -> Option<GameEvent> {
    if channel != Channel::Downstream {
        return None;
    }
    match opcode {
        opcode::DIRECTOR_UPDATE => decode_director(payload),
        opcode::SYSTEM_LOG => decode_system_log(payload),
        _ => None,
    }
}

fn decode_director(payload: &[u8]) -> Option<GameEvent> {
    if *payload.first()? != DIRECTOR_DEEP_DUNGEON {
        return None;
    }
    match *payload.get(8)? {
        DIRECTOR_COMMENCED => {
            let content_id = read_u16_le(payload, 4)?;
            trace!(content_id, "director_commenced");
            Some(GameEvent::RunCommenced { content_id })
        }
        DIRECTOR_RECOMMENCED => Some(GameEvent::RunRecommenced),
        _ => None,
    }
}

fn decode_system_log(payload: &[u8]) -> Option<GameEvent> {
    let id = read_u32_le(payload, 4)?;
    match id {
        log_id::ITEM_USED => {
            let raw_kind = *payload.get(ITEM_USED_KIND_OFFSET)?;
            Some(GameEvent::ItemConsumed { raw_kind })
        }
        log_id::DUTY_ENDED => Some(GameEvent::DutyEnded),
        log_id::TRANSFERENCE_INITIATED => Some(GameEvent::TransferenceInitiated),
        _ if log_id::HOARD_FOUND.contains(&id) => Some(GameEvent::HoardLocated),
        _ if log_id::BONUS_REWARD.contains(&id) => {
            let raw_kind = *payload.get(BONUS_REWARD_KIND_OFFSET)?;
            Some(GameEvent::BonusRewardUnlocked { raw_kind })
        }
        _ => None,
    }
}

// =============================================================================
// Tests
// =============================================================================
