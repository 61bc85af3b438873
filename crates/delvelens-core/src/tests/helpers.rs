//! Shared fakes and builders for integration tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use glam::Vec3;

use crate::config::OverlayConfig;
use crate::entity::{DataId, EntityId, NameId, ObjectCategory, ObjectView, HOSTILE_SUBKIND};
use crate::host::{
    ClientView, ConditionFlags, Interactor, PlayerFlags, PlayerStatus, UiPort, WorldSource,
};
use crate::mob::MobInfoStore;
use crate::run::{RunController, RunDeps};
use crate::telemetry::{FloorReport, TelemetrySink};

/// A Spire zone id, so the default harness sits inside a dungeon.
pub const SPIRE_ZONE: u16 = 770;

/// Content id of the Spire 21-30 floor set (silver ambush tier).
pub const SPIRE_21_30: u16 = 206;

// =============================================================================
// FakeHost
// =============================================================================

#[derive(Debug, Clone)]
pub struct HostState {
    pub zone_id: u16,
    pub logged_in: bool,
    pub conditions: ConditionFlags,
    pub player: Option<PlayerStatus>,
    pub party_size: u8,
    pub objects: Vec<ObjectView>,
    pub floor_readout: Option<u32>,
    pub passage_progress: Option<u8>,
}

impl Default for HostState {
    fn default() -> Self {
        Self {
            zone_id: SPIRE_ZONE,
            logged_in: true,
            conditions: ConditionFlags::empty(),
            player: Some(default_player()),
            party_size: 1,
            objects: Vec::new(),
            floor_readout: None,
            passage_progress: None,
        }
    }
}

/// One fake implementing every host trait, with recorded outputs.
#[derive(Debug, Default)]
pub struct FakeHost {
    pub state: Mutex<HostState>,
    pub interactions: Mutex<Vec<EntityId>>,
    pub invoked: Mutex<Vec<u8>>,
    pub messages: Mutex<Vec<String>>,
    pub ui_open: AtomicBool,
}

impl FakeHost {
    pub fn set_state(&self, f: impl FnOnce(&mut HostState)) {
        f(&mut self.state.lock().unwrap());
    }

    pub fn interactions(&self) -> Vec<EntityId> {
        self.interactions.lock().unwrap().clone()
    }

    pub fn invoked(&self) -> Vec<u8> {
        self.invoked.lock().unwrap().clone()
    }
}

impl ClientView for FakeHost {
    fn zone_id(&self) -> u16 {
        self.state.lock().unwrap().zone_id
    }

    fn local_player(&self) -> Option<PlayerStatus> {
        self.state.lock().unwrap().player
    }

    fn conditions(&self) -> ConditionFlags {
        self.state.lock().unwrap().conditions
    }

    fn logged_in(&self) -> bool {
        self.state.lock().unwrap().logged_in
    }

    fn party_size(&self) -> u8 {
        self.state.lock().unwrap().party_size
    }
}

impl WorldSource for FakeHost {
    fn objects(&self) -> Vec<ObjectView> {
        self.state.lock().unwrap().objects.clone()
    }

    fn object_count(&self) -> usize {
        self.state.lock().unwrap().objects.len()
    }
}

impl Interactor for FakeHost {
    fn interact(&self, id: EntityId) {
        self.interactions.lock().unwrap().push(id);
    }

    fn invoke_consumable(&self, wire_id: u8) {
        self.invoked.lock().unwrap().push(wire_id);
    }
}

impl UiPort for FakeHost {
    fn set_main_ui_open(&self, open: bool) {
        self.ui_open.store(open, Ordering::SeqCst);
    }

    fn floor_readout(&self) -> Option<u32> {
        self.state.lock().unwrap().floor_readout
    }

    fn passage_progress(&self) -> Option<u8> {
        self.state.lock().unwrap().passage_progress
    }

    fn print_message(&self, text: &str) {
        self.messages.lock().unwrap().push(text.to_string());
    }
}

// =============================================================================
// RecordingSink
// =============================================================================

#[derive(Debug, Default)]
pub struct RecordingSink {
    pub reports: Mutex<Vec<FloorReport>>,
}

impl RecordingSink {
    pub fn reports(&self) -> Vec<FloorReport> {
        self.reports.lock().unwrap().clone()
    }
}

impl TelemetrySink for RecordingSink {
    fn submit(&self, report: FloorReport) {
        self.reports.lock().unwrap().push(report);
    }
}

// =============================================================================
// Object builders
// =============================================================================

pub const PLAYER_ID: u32 = 1;

pub fn default_player() -> PlayerStatus {
    PlayerStatus {
        entity_id: EntityId::new(PLAYER_ID),
        position: Vec3::ZERO,
        health_fraction: 1.0,
        flags: PlayerFlags::empty(),
    }
}

pub fn player_view() -> ObjectView {
    ObjectView {
        entity_id: EntityId::new(PLAYER_ID),
        data_id: DataId::new(0),
        category: ObjectCategory::Player,
        name_id: None,
        name: "Adventurer".to_string(),
        subkind: 0,
        position: Vec3::ZERO,
        heading: 0.0,
        hitbox_radius: 0.5,
        valid: true,
        in_combat: false,
    }
}

pub fn party_member_view(entity_id: u32, position: Vec3) -> ObjectView {
    ObjectView {
        entity_id: EntityId::new(entity_id),
        name: "Comrade".to_string(),
        position,
        ..player_view()
    }
}

pub fn fixture_view(entity_id: u32, data_id: u32, position: Vec3) -> ObjectView {
    ObjectView {
        entity_id: EntityId::new(entity_id),
        data_id: DataId::new(data_id),
        category: ObjectCategory::Fixture,
        name_id: None,
        name: String::new(),
        subkind: 0,
        position,
        heading: 0.0,
        hitbox_radius: 0.5,
        valid: true,
        in_combat: false,
    }
}

pub fn creature_view(entity_id: u32, data_id: u32, name_id: u32, position: Vec3) -> ObjectView {
    ObjectView {
        entity_id: EntityId::new(entity_id),
        data_id: DataId::new(data_id),
        category: ObjectCategory::Creature,
        name_id: Some(NameId::new(name_id)),
        name: format!("Creature {name_id}"),
        subkind: HOSTILE_SUBKIND,
        position,
        heading: 0.0,
        hitbox_radius: 1.0,
        valid: true,
        in_combat: false,
    }
}

// =============================================================================
// Payload builders
// =============================================================================

pub fn commenced_payload(content_id: u16) -> Vec<u8> {
    let mut payload = vec![0_u8; 16];
    payload[0] = 0x0D;
    payload[4..6].copy_from_slice(&content_id.to_le_bytes());
    payload[8] = 0x01;
    payload
}

pub fn recommenced_payload() -> Vec<u8> {
    let mut payload = vec![0_u8; 16];
    payload[0] = 0x0D;
    payload[8] = 0x06;
    payload
}

pub fn item_used_payload(raw_kind: u8) -> Vec<u8> {
    let mut payload = vec![0_u8; 20];
    payload[4..8].copy_from_slice(&0x1C34_u32.to_le_bytes());
    payload[16] = raw_kind;
    payload
}

// =============================================================================
// Harness
// =============================================================================

pub struct Harness {
    pub host: Arc<FakeHost>,
    pub sink: Arc<RecordingSink>,
    pub config: Arc<RwLock<OverlayConfig>>,
    pub controller: RunController,
}

pub fn harness() -> Harness {
    let host = Arc::new(FakeHost::default());
    let sink = Arc::new(RecordingSink::default());
    let config = Arc::new(RwLock::new(OverlayConfig::default()));
    let deps = RunDeps {
        client: host.clone(),
        world: host.clone(),
        interactor: host.clone(),
        ui: host.clone(),
        telemetry: sink.clone(),
        config: config.clone(),
        mobs: Arc::new(MobInfoStore::new(Vec::new())),
    };
    Harness {
        host,
        sink,
        config,
        controller: RunController::new(deps),
    }
}

/// Minimal deps for tests that only need a controller to exist.
pub fn fake_deps() -> RunDeps {
    let host = Arc::new(FakeHost::default());
    RunDeps {
        client: host.clone(),
        world: host.clone(),
        interactor: host.clone(),
        ui: host,
        telemetry: Arc::new(RecordingSink::default()),
        config: Arc::new(RwLock::new(OverlayConfig::default())),
        mobs: Arc::new(MobInfoStore::new(Vec::new())),
    }
}
