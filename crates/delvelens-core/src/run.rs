//! The run controller: lifecycle, event handling, and the scan cycle body.
//!
//! One controller instance owns all mutable run state behind a single lock
//! (the [`ScanPipeline`](crate::scan::ScanPipeline) takes it as
//! `Arc<Mutex<RunController>>`).
//! Network events, the one-second timer, user commands, and the scan cycle
//! all funnel through that lock, so every decision sees one consistent
//! point-in-time view of the run.
//!
//! A run becomes `ready` only through a commencement event whose content id
//! resolves to a known floor set. Every other event is ignored until then,
//! and everything shuts down again through [`RunController::exit_run`],
//! whether triggered by a duty-ended event or the zone failsafe.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::config::OverlayConfig;
use crate::consumable::{self, Consumable, ResolveError};
use crate::content::{self, AmbushTier, FloorSet};
use crate::entity::{
    classify, distance_xz, ClassifiedEntity, ClassifyContext, EntityId, EntityKind,
    ObjectCategory,
};
use crate::floor::{FloorState, HazardStatus};
use crate::gate::{self, GateInput, Refusal};
use crate::host::{ClientView, Interactor, PlayerFlags, PlayerStatus, UiPort, WorldSource};
use crate::mob::MobInfoStore;
use crate::protocol::GameEvent;
use crate::telemetry::{FloorReport, TelemetrySink};

/// A bonus reward is attached to the gold container nearest the player
/// within this ground-plane radius.
pub const BONUS_TAG_RADIUS: f32 = 4.6;

/// Why a consumable command was refused.
#[derive(Debug, thiserror::Error)]
pub enum UseError {
    /// No run is active.
    #[error("not inside a dungeon run")]
    NotInRun,
    /// The name did not resolve to a kind.
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    /// The kind exists but cannot be invoked in the active variant.
    #[error("{name} cannot be used in this dungeon")]
    NotUsableHere {
        /// Display name of the kind.
        name: &'static str,
    },
    /// An item-use penalty is active.
    #[error("item use is currently blocked")]
    ItemPenalty,
}

/// Why a manual interaction command was refused.
#[derive(Debug, thiserror::Error)]
pub enum InteractError {
    /// No run is active or no player is present.
    #[error("not inside a dungeon run")]
    NotInRun,
    /// The entity id is not present in the world.
    #[error("no such entity")]
    NoSuchEntity,
    /// No openable container was found in the last scan.
    #[error("no container nearby")]
    NoChestNearby,
    /// The gate refused the interaction.
    #[error("refused: {0:?}")]
    Refused(Refusal),
}

/// Everything the controller needs from the outside world.
pub struct RunDeps {
    /// Client state queries.
    pub client: Arc<dyn ClientView>,
    /// World-object enumeration (host-context only).
    pub world: Arc<dyn WorldSource>,
    /// Outbound interactions (host-context only).
    pub interactor: Arc<dyn Interactor>,
    /// UI surfaces.
    pub ui: Arc<dyn UiPort>,
    /// Telemetry destination.
    pub telemetry: Arc<dyn TelemetrySink>,
    /// Shared overlay configuration.
    pub config: Arc<RwLock<OverlayConfig>>,
    /// Static creature metadata.
    pub mobs: Arc<MobInfoStore>,
}

/// Owner of all per-run mutable state.
pub struct RunController {
    deps: RunDeps,
    ready: bool,
    content_id: u16,
    ambush_tier: AmbushTier,
    floor: FloorState,
    floor_times: HashMap<u32, u64>,
    last_scan: Vec<ClassifiedEntity>,
}

impl RunController {
    /// Creates a controller in the out-of-run state.
    #[must_use]
    pub fn new(deps: RunDeps) -> Self {
        Self {
            deps,
            ready: false,
            content_id: 0,
            ambush_tier: AmbushTier::None,
            floor: FloorState::default(),
            floor_times: HashMap::new(),
            last_scan: Vec::new(),
        }
    }

    fn config(&self) -> OverlayConfig {
        match self.deps.config.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    // -------------------------------------------------------------------------
    // Lifecycle
    // -------------------------------------------------------------------------

    fn enter_run(&mut self, set: &FloorSet, content_id: u16, now: Instant) {
        self.deps.mobs.reload_if_empty();

        self.content_id = content_id;
        self.ambush_tier = set.ambush_tier;
        self.floor_times = (set.start_floor..set.start_floor + 10).map(|f| (f, 0)).collect();
        self.last_scan.clear();
        self.floor.begin_run(set);
        self.floor.advance_floor(now);
        self.ready = true;

        if self.config().auto_open_on_enter {
            self.deps.ui.set_main_ui_open(true);
        }
        info!(
            content_id,
            variant = ?set.variant,
            start_floor = set.start_floor,
            "run_commenced"
        );
    }

    /// Ends the run: flushes the final floor's telemetry, clears state,
    /// closes the UI.
    pub fn exit_run(&mut self) {
        if !self.ready {
            return;
        }
        // A transfer in flight means the floor was already flushed.
        if !self.floor.transfer_pending {
            self.flush_floor_telemetry();
        }

        info!(content_id = self.content_id, last_floor = self.floor.current_floor, "run_ended");
        self.floor.clear();
        self.last_scan.clear();
        self.content_id = 0;
        self.ambush_tier = AmbushTier::None;
        self.ready = false;
        self.deps.ui.set_main_ui_open(false);
    }

    /// Submits one report covering the floor being left. Called on every
    /// transference and at run end, so each floor produces its own record.
    fn flush_floor_telemetry(&mut self) {
        let config = self.config();
        if !config.telemetry_opt_in {
            return;
        }
        let report = FloorReport::build(
            &config.sender_id,
            self.deps.client.party_size(),
            self.floor.tracked().values(),
        );
        if !report.is_empty() {
            self.deps.telemetry.submit(report);
        }
    }

    // -------------------------------------------------------------------------
    // Events
    // -------------------------------------------------------------------------

    /// Applies one decoded network event.
    pub fn on_event(&mut self, event: GameEvent, now: Instant) {
        match event {
            GameEvent::RunCommenced { content_id } => {
                if self.ready {
                    return;
                }
                match content::floor_set_for(content_id) {
                    Some(set) => self.enter_run(&set, content_id, now),
                    None => warn!(content_id, "unknown_content_id"),
                }
            }
            GameEvent::RunRecommenced => {
                if self.ready && self.floor.transfer_pending {
                    self.floor.advance_floor(now);
                    self.floor_times.entry(self.floor.current_floor).or_insert(0);
                    // Scan results from the floor just left must not leak
                    // into decisions made on the new one.
                    self.last_scan.clear();
                }
            }
            GameEvent::TransferenceInitiated => {
                if self.ready {
                    self.record_floor_time(now);
                    self.flush_floor_telemetry();
                    self.floor.begin_transfer();
                }
            }
            GameEvent::ItemConsumed { raw_kind } => {
                if self.ready {
                    let canonical = consumable::remap(raw_kind, self.floor.variant);
                    match Consumable::from_raw(canonical) {
                        Some(kind) => self.floor.on_item_consumed(kind),
                        None => warn!(raw_kind, "unknown_consumable"),
                    }
                }
            }
            GameEvent::HoardLocated => {
                if self.ready {
                    self.floor.hoard_found = true;
                }
            }
            GameEvent::BonusRewardUnlocked { raw_kind } => {
                if self.ready {
                    let canonical = consumable::remap(raw_kind, self.floor.variant);
                    match Consumable::from_raw(canonical) {
                        Some(kind) => self.record_bonus_container(kind),
                        None => warn!(raw_kind, "unknown_bonus_reward"),
                    }
                }
            }
            GameEvent::DutyEnded => self.exit_run(),
        }
    }

    // -------------------------------------------------------------------------
    // Timer
    // -------------------------------------------------------------------------

    /// One-second housekeeping: the zone failsafe, lazy floor verification,
    /// and the per-floor time ledger.
    pub fn on_timer_tick(&mut self, now: Instant) {
        if !self.ready {
            return;
        }
        // Failsafe: a duty-ended event can be missed on a disconnect. The
        // zone id is ground truth.
        if !content::is_dungeon_zone(self.deps.client.zone_id()) {
            warn!(zone_id = self.deps.client.zone_id(), "left_dungeon_zone_failsafe");
            self.exit_run();
            return;
        }
        if self.floor.transfer_pending {
            return;
        }
        if !self.floor.floor_verified {
            if let Some(observed) = self.deps.ui.floor_readout() {
                self.floor.verify_floor(observed);
            }
        }
        self.record_floor_time(now);
    }

    fn record_floor_time(&mut self, now: Instant) {
        let elapsed = self.floor.elapsed_floor_seconds(now);
        self.floor_times.insert(self.floor.current_floor, elapsed);
    }

    // -------------------------------------------------------------------------
    // Scan cycle body (host context)
    // -------------------------------------------------------------------------

    fn should_scan(&self) -> bool {
        if !self.ready || self.floor.transfer_pending || !self.config().enabled {
            return false;
        }
        let client = &self.deps.client;
        if !client.logged_in()
            || client.conditions().blocks_scanning()
            || !content::is_dungeon_zone(client.zone_id())
            || client.local_player().is_none()
        {
            return false;
        }
        self.deps.world.object_count() > 0
    }

    /// Runs one full scan cycle. Must be called on the host context.
    ///
    /// Returns `None` when the cycle's preconditions fail; the previous
    /// snapshot stays published in that case.
    pub fn scan_cycle(&mut self) -> Option<Vec<ClassifiedEntity>> {
        if !self.should_scan() {
            return None;
        }
        let config = self.config();
        let (player, entities) = self.classify_world()?;
        // The sighting registry is for creature telemetry only.
        for entity in &entities {
            if entity.view().category == ObjectCategory::Creature {
                self.floor.track(entity, self.content_id);
            }
        }
        self.auto_open(&entities, &config, &player);

        self.last_scan = entities.clone();
        Some(entities)
    }

    /// Enumerates and classifies every valid world object. Must be called
    /// on the host context. Players other than the local one are skipped;
    /// party members are not dungeon entities.
    fn classify_world(&self) -> Option<(PlayerStatus, Vec<ClassifiedEntity>)> {
        let player = self.deps.client.local_player()?;
        let ctx = ClassifyContext {
            variant: self.floor.variant,
            content_id: self.content_id,
            local_player: Some(player.entity_id),
        };

        let mut entities: Vec<ClassifiedEntity> = Vec::new();
        for view in self.deps.world.objects() {
            if !view.valid {
                continue;
            }
            if view.category == ObjectCategory::Player && view.entity_id != player.entity_id {
                continue;
            }
            let mob = match view.category {
                ObjectCategory::Creature => {
                    view.name_id.and_then(|id| self.deps.mobs.lookup(id))
                }
                _ => None,
            };
            let mut entity = classify(view, mob.as_ref(), &ctx);
            if let Some(kind) = self.floor.reward_for(entity.entity_id()) {
                entity.set_bonus_reward(kind);
            }
            entities.push(entity);
        }
        Some((player, entities))
    }

    /// Ties a just-unlocked bonus reward to the gold container nearest the
    /// player within [`BONUS_TAG_RADIUS`], using the latest scan results.
    /// A reward with no container in radius cannot be attributed to one
    /// and is dropped.
    fn record_bonus_container(&mut self, kind: Consumable) {
        let Some(player) = self.deps.client.local_player() else {
            debug!(%kind, "bonus_reward_without_player");
            return;
        };
        let candidate = self
            .last_scan
            .iter()
            .filter(|e| e.kind() == EntityKind::GoldChest)
            .map(|e| (distance_xz(e.view().position, player.position), e.entity_id()))
            .filter(|(distance, _)| *distance <= BONUS_TAG_RADIUS)
            .min_by(|(a, _), (b, _)| a.total_cmp(b));
        match candidate {
            Some((_, id)) => {
                self.floor.record_reward_container(id, kind);
                info!(%id, %kind, "bonus_reward_recorded");
            }
            None => debug!(%kind, "bonus_reward_unattributed"),
        }
    }

    fn auto_open(
        &mut self,
        entities: &[ClassifiedEntity],
        config: &OverlayConfig,
        player: &PlayerStatus,
    ) {
        for entity in entities.iter().filter(|e| e.is_chest()) {
            let input = GateInput {
                player_in_combat: player.flags.contains(PlayerFlags::IN_COMBAT),
                health_fraction: player.health_fraction,
                distance: entity.distance_from(player.position),
                ambush_tier: self.ambush_tier,
                already_opened: self.floor.was_interacted(entity.entity_id()),
            };
            if gate::decide(entity, config, &input).is_ok() {
                self.deps.interactor.interact(entity.entity_id());
                self.floor.mark_interacted(entity.entity_id());
                info!(id = %entity.entity_id(), kind = %entity.kind(), "container_opened");
            }
        }
    }

    // -------------------------------------------------------------------------
    // Commands
    // -------------------------------------------------------------------------

    /// Resolves a free-text consumable name and invokes it. Must be called
    /// on the host context (it goes through the [`Interactor`]).
    ///
    /// # Errors
    ///
    /// Returns [`UseError`] when out of a run, the name does not resolve,
    /// the kind is not usable in the active variant, or an item penalty is
    /// active.
    pub fn use_consumable_by_name(&mut self, query: &str) -> Result<Consumable, UseError> {
        let variant = if self.ready {
            self.floor.variant.ok_or(UseError::NotInRun)?
        } else {
            return Err(UseError::NotInRun);
        };
        let kind = consumable::resolve_by_name(query)?;
        if !kind.usable_in(variant) {
            return Err(UseError::NotUsableHere { name: kind.name() });
        }
        let penalized = self
            .deps
            .client
            .local_player()
            .is_some_and(|p| p.flags.contains(PlayerFlags::ITEM_PENALTY));
        if penalized {
            return Err(UseError::ItemPenalty);
        }
        self.deps.interactor.invoke_consumable(kind.wire_id(variant));
        self.deps.ui.print_message(&format!("Using {kind}."));
        Ok(kind)
    }

    /// Opens one container by entity id, enumerating the world directly so
    /// the command works even when scanning is disabled or paused. Must be
    /// called on the host context.
    ///
    /// Explicit commands bypass the auto-open toggles but keep every safety
    /// check (combat, health, ambush risk, range, dedup).
    ///
    /// # Errors
    ///
    /// Returns [`InteractError`] when no run is active, the id is unknown,
    /// or the gate refuses.
    pub fn try_interact(&mut self, id: EntityId) -> Result<(), InteractError> {
        if !self.ready {
            return Err(InteractError::NotInRun);
        }
        let (player, entities) = self.classify_world().ok_or(InteractError::NotInRun)?;
        let entity = entities
            .iter()
            .find(|e| e.entity_id() == id)
            .ok_or(InteractError::NoSuchEntity)?;
        self.open_gated(entity, &player)
    }

    /// Opens the closest openable container in the world right now. Does
    /// not depend on scan results, so it works with the overlay disabled.
    /// Must be called on the host context.
    ///
    /// # Errors
    ///
    /// Returns [`InteractError`] when no run is active, no container is
    /// present, or the gate refuses the closest one.
    pub fn try_nearest_chest(&mut self) -> Result<EntityId, InteractError> {
        if !self.ready {
            return Err(InteractError::NotInRun);
        }
        let (player, entities) = self.classify_world().ok_or(InteractError::NotInRun)?;
        let nearest = entities
            .iter()
            .filter(|e| e.is_chest() && !self.floor.was_interacted(e.entity_id()))
            .min_by(|a, b| {
                a.distance_from(player.position)
                    .total_cmp(&b.distance_from(player.position))
            })
            .ok_or(InteractError::NoChestNearby)?;
        self.open_gated(nearest, &player)?;
        Ok(nearest.entity_id())
    }

    /// Gates and performs one explicit interaction. All toggles are forced
    /// on; the safety checks stay.
    fn open_gated(
        &mut self,
        entity: &ClassifiedEntity,
        player: &PlayerStatus,
    ) -> Result<(), InteractError> {
        let mut config = self.config();
        config.open_chests = true;
        config.open_bronze_chests = true;
        config.open_silver_chests = true;
        config.open_gold_chests = true;
        config.open_hoard_chests = true;

        let input = GateInput {
            player_in_combat: player.flags.contains(PlayerFlags::IN_COMBAT),
            health_fraction: player.health_fraction,
            distance: entity.distance_from(player.position),
            ambush_tier: self.ambush_tier,
            already_opened: self.floor.was_interacted(entity.entity_id()),
        };
        gate::decide(entity, &config, &input).map_err(InteractError::Refused)?;
        self.deps.interactor.interact(entity.entity_id());
        self.floor.mark_interacted(entity.entity_id());
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    /// Whether a run is active.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// The active content id, or 0 outside a run.
    #[must_use]
    pub fn content_id(&self) -> u16 {
        self.content_id
    }

    /// The current floor number.
    #[must_use]
    pub fn current_floor(&self) -> u32 {
        self.floor.current_floor
    }

    /// Seconds spent per floor of the current (or last) run.
    #[must_use]
    pub fn floor_times(&self) -> &HashMap<u32, u64> {
        &self.floor_times
    }

    /// Hazard visibility on the current floor.
    #[must_use]
    pub fn hazard_status(&self) -> HazardStatus {
        self.floor.hazard_status()
    }

    /// Effects active on the current floor.
    #[must_use]
    pub fn floor_effects(&self) -> Vec<Consumable> {
        self.floor.floor_effects()
    }

    /// Whether the given kind was consumed on this floor. For carry-over
    /// kinds this means the next floor starts with its effect.
    #[must_use]
    pub fn is_next_floor_with(&self, kind: Consumable) -> bool {
        self.ready && self.floor.is_next_floor_with(kind)
    }

    /// Seconds until the next mob respawn, if the floor has a cycle.
    #[must_use]
    pub fn seconds_until_respawn(&mut self, now: Instant) -> Option<u64> {
        if !self.ready {
            return None;
        }
        self.floor.seconds_until_respawn(now)
    }

    /// Passage activation progress in percent, if visible.
    #[must_use]
    pub fn passage_progress(&self) -> Option<u8> {
        self.deps.ui.passage_progress()
    }

    /// Read access to floor state, for the overlay UI.
    #[must_use]
    pub fn floor(&self) -> &FloorState {
        &self.floor
    }
}
