//! Opt-in creature sighting reports.
//!
//! When a floor is left, its sighting registry is folded into one
//! [`FloorReport`] and handed to the configured [`TelemetrySink`].
//! Submission is fire-and-forget: a sink must never block the caller and a
//! failed upload is logged and dropped. Reports carry no player-identifying
//! data beyond the pseudonymous sender id the user configured.

use std::collections::HashSet;

use tracing::debug;

use crate::entity::{DataId, NameId};
use crate::floor::TrackedObject;

/// Current report schema version.
pub const REPORT_VERSION: u32 = 2;

/// One creature sighting, deduplicated by template id.
#[derive(Debug, Clone, PartialEq)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct MobRecord {
    /// Template id.
    pub data_id: DataId,
    /// Name id, if known.
    pub name_id: Option<NameId>,
    /// Display name at sighting time.
    pub name: String,
    /// Content id of the floor set.
    pub content_id: u16,
    /// Floor the sighting happened on.
    pub floor: u32,
    /// Hitbox radius at sighting time.
    pub hitbox_radius: f32,
    /// Reserved for a future schema revision. Always empty.
    pub move_times: Vec<f32>,
    /// Reserved for a future schema revision. Always empty.
    pub aggro_distances: Vec<f32>,
}

/// One run's worth of sightings.
#[derive(Debug, Clone, PartialEq)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct FloorReport {
    /// Schema version.
    pub version: u32,
    /// Pseudonymous sender id.
    pub sender: String,
    /// Party size during the run.
    pub party_size: u8,
    /// Deduplicated sightings.
    pub mobs: Vec<MobRecord>,
}

impl FloorReport {
    /// Folds tracked sightings into a report, keeping the first sighting
    /// per template id.
    #[must_use]
    pub fn build<'a>(
        sender: &str,
        party_size: u8,
        tracked: impl IntoIterator<Item = &'a TrackedObject>,
    ) -> Self {
        let mut seen: HashSet<DataId> = HashSet::new();
        let mut mobs = Vec::new();
        for object in tracked {
            if !seen.insert(object.data_id) {
                continue;
            }
            mobs.push(MobRecord {
                data_id: object.data_id,
                name_id: object.name_id,
                name: object.name.clone(),
                content_id: object.content_id,
                floor: object.floor,
                hitbox_radius: object.hitbox_radius,
                move_times: Vec::new(),
                aggro_distances: Vec::new(),
            });
        }
        Self {
            version: REPORT_VERSION,
            sender: sender.to_string(),
            party_size,
            mobs,
        }
    }

    /// Returns `true` when the report carries no sightings.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mobs.is_empty()
    }
}

/// Destination for finished reports.
pub trait TelemetrySink: Send + Sync {
    /// Submits a report. Must return promptly; uploads happen off-thread
    /// inside the sink.
    fn submit(&self, report: FloorReport);
}

/// Sink that drops every report. Used when telemetry is opted out.
#[derive(Debug, Default)]
pub struct NullSink;

impl TelemetrySink for NullSink {
    fn submit(&self, report: FloorReport) {
        debug!(mobs = report.mobs.len(), "telemetry_dropped");
    }
}
