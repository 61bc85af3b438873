//! # delvelens-core
//!
//! Run tracking and entity-scan core for the Delvelens dungeon overlay.
//!
//! The core keeps a live model of a timed, procedurally-structured dungeon
//! run and continuously classifies nearby world objects for an overlay UI.
//! It is client-agnostic: everything it needs from the hosting client sits
//! behind the traits in [`host`].
//!
//! ## Architecture
//!
//! Two flows feed one state machine:
//!
//! - **Events.** The hosting layer forwards opaque network payloads to
//!   [`protocol::decode`]; decoded [`protocol::GameEvent`]s drive the
//!   [`run::RunController`] through run commencement, floor advancement,
//!   item consumption, and run end.
//! - **Scanning.** The [`scan::ScanPipeline`] ticks every 250ms, marshals
//!   one job onto the client's update context, classifies every world
//!   object there ([`entity::classify`]), applies the container auto-open
//!   gate ([`gate`]), and publishes an immutable [`scan::ScanSnapshot`]
//!   for the renderer.
//!
//! All mutable run state lives behind one controller lock, so events,
//! timers, commands, and scan cycles each see a consistent point-in-time
//! view of the run.
//!
//! ## Module map
//!
//! - [`content`]: dungeon variants, zone membership, floor-set tables.
//! - [`consumable`]: item kinds, the per-variant id remap, name resolution.
//! - [`entity`]: identifiers, object captures, the pure classifier.
//! - [`floor`]: per-floor state, timers, and registries.
//! - [`run`]: the run controller.
//! - [`protocol`]: network event decoding.
//! - [`gate`]: the container auto-open policy.
//! - [`scan`]: workers, host handoff, snapshot publication.
//! - [`mob`]: static creature metadata and its loading chain.
//! - [`telemetry`]: opt-in sighting reports.
//! - [`config`]: overlay settings.
//! - [`host`]: the client abstraction seam.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_precision_loss)]

pub mod config;
pub mod consumable;
pub mod content;
pub mod entity;
pub mod floor;
pub mod gate;
pub mod host;
pub mod mob;
pub mod protocol;
pub mod run;
pub mod scan;
pub mod telemetry;

#[cfg(test)]
mod tests;

pub use config::OverlayConfig;
pub use consumable::Consumable;
pub use content::DungeonKind;
pub use entity::{ClassifiedEntity, EntityKind};
pub use protocol::GameEvent;
pub use run::RunController;
pub use scan::{ScanPipeline, ScanSnapshot, SnapshotHandle};
