//! End-to-end lifecycles: decoded payloads in, state and actions out.

use std::sync::atomic::Ordering;
use std::time::Instant;

use glam::Vec3;
use proptest::prelude::*;

use super::helpers::{
    commenced_payload, creature_view, fixture_view, harness, item_used_payload,
    party_member_view, player_view, recommenced_payload, SPIRE_21_30,
};
use crate::consumable::Consumable;
use crate::content::{AmbushTier, FloorSet};
use crate::entity::{data_ids, EntityId, EntityKind};
use crate::floor::{FloorState, HazardStatus};
use crate::host::ConditionFlags;
use crate::protocol::{decode, opcode, Channel, GameEvent};
use crate::DungeonKind;

fn decoded(op: u16, payload: &[u8]) -> GameEvent {
    decode(op, Channel::Downstream, payload).expect("payload decodes")
}

// =============================================================================
// Run lifecycle
// =============================================================================

#[test]
fn commencement_through_duty_end() {
    let mut h = harness();
    let now = Instant::now();

    assert!(!h.controller.is_ready());
    let event = decoded(opcode::DIRECTOR_UPDATE, &commenced_payload(SPIRE_21_30));
    h.controller.on_event(event, now);

    assert!(h.controller.is_ready());
    assert_eq!(h.controller.content_id(), SPIRE_21_30);
    assert_eq!(h.controller.current_floor(), 21);
    assert!(h.host.ui_open.load(Ordering::SeqCst), "UI opened on entry");
    // The floor-time ledger is prefilled for the whole set.
    assert_eq!(h.controller.floor_times().len(), 10);

    // Transference then recommencement advances exactly one floor.
    h.controller.on_event(GameEvent::TransferenceInitiated, now);
    let event = decoded(opcode::DIRECTOR_UPDATE, &recommenced_payload());
    h.controller.on_event(event, now);
    assert_eq!(h.controller.current_floor(), 22);

    h.controller.on_event(GameEvent::DutyEnded, now);
    assert!(!h.controller.is_ready());
    assert_eq!(h.controller.content_id(), 0);
    assert!(!h.host.ui_open.load(Ordering::SeqCst), "UI closed on exit");
}

#[test]
fn recommencement_without_pending_transfer_is_ignored() {
    let mut h = harness();
    let now = Instant::now();
    h.controller
        .on_event(GameEvent::RunCommenced { content_id: SPIRE_21_30 }, now);
    assert_eq!(h.controller.current_floor(), 21);

    h.controller.on_event(GameEvent::RunRecommenced, now);
    h.controller.on_event(GameEvent::RunRecommenced, now);
    assert_eq!(h.controller.current_floor(), 21);
}

#[test]
fn unknown_content_id_never_arms_the_run() {
    let mut h = harness();
    h.controller
        .on_event(GameEvent::RunCommenced { content_id: 60_000 }, Instant::now());
    assert!(!h.controller.is_ready());
}

#[test]
fn events_outside_a_run_are_ignored() {
    let mut h = harness();
    let now = Instant::now();
    h.controller.on_event(GameEvent::ItemConsumed { raw_kind: 1 }, now);
    h.controller.on_event(GameEvent::HoardLocated, now);
    h.controller.on_event(GameEvent::TransferenceInitiated, now);
    h.controller.on_event(GameEvent::DutyEnded, now);
    assert!(!h.controller.is_ready());
    assert!(h.controller.floor_effects().is_empty());
}

#[test]
fn zone_failsafe_force_exits_a_stale_run() {
    let mut h = harness();
    let now = Instant::now();
    h.controller
        .on_event(GameEvent::RunCommenced { content_id: SPIRE_21_30 }, now);
    assert!(h.controller.is_ready());

    h.host.set_state(|s| s.zone_id = 129);
    h.controller.on_timer_tick(now);
    assert!(!h.controller.is_ready());
}

#[test]
fn floor_readout_corrects_drift_once_visible() {
    let mut h = harness();
    let now = Instant::now();
    h.controller
        .on_event(GameEvent::RunCommenced { content_id: SPIRE_21_30 }, now);

    h.host.set_state(|s| s.floor_readout = Some(23));
    h.controller.on_timer_tick(now);
    assert_eq!(h.controller.current_floor(), 23);
}

// =============================================================================
// Consumables
// =============================================================================

#[test]
fn reliquary_item_ids_are_remapped_before_recording() {
    let mut h = harness();
    let now = Instant::now();
    // Reliquary 21-30.
    h.controller
        .on_event(GameEvent::RunCommenced { content_id: 901 }, now);

    // Raw 23 on the wire is canonical Ward in the Reliquary.
    let event = decoded(opcode::SYSTEM_LOG, &item_used_payload(23));
    h.controller.on_event(event, now);

    assert_eq!(h.controller.floor_effects(), vec![Consumable::Ward]);
    assert_eq!(h.controller.hazard_status(), HazardStatus::Inactive);
}

#[test]
fn spire_item_ids_pass_through_unshifted() {
    let mut h = harness();
    let now = Instant::now();
    h.controller
        .on_event(GameEvent::RunCommenced { content_id: SPIRE_21_30 }, now);

    let event = decoded(opcode::SYSTEM_LOG, &item_used_payload(2));
    h.controller.on_event(event, now);
    assert_eq!(h.controller.hazard_status(), HazardStatus::Visible);
}

#[test]
fn consumable_command_invokes_the_variant_wire_id() {
    let mut h = harness();
    let now = Instant::now();
    h.controller
        .on_event(GameEvent::RunCommenced { content_id: 901 }, now);

    let kind = h
        .controller
        .use_consumable_by_name("ward")
        .expect("ward resolves and is usable");
    assert_eq!(kind, Consumable::Ward);
    // Reliquary shifts the band up by 22 on invocation.
    assert_eq!(h.host.invoked(), vec![23]);
}

#[test]
fn variant_exclusive_consumables_are_refused_elsewhere() {
    let mut h = harness();
    h.controller
        .on_event(GameEvent::RunCommenced { content_id: SPIRE_21_30 }, Instant::now());
    assert!(h.controller.use_consumable_by_name("rage").is_err());
    assert!(h.host.invoked().is_empty());
}

#[test]
fn consumable_command_requires_a_run() {
    let mut h = harness();
    assert!(h.controller.use_consumable_by_name("ward").is_err());
}

#[test]
fn carry_over_query_reflects_consumed_items() {
    let mut h = harness();
    let now = Instant::now();
    assert!(!h.controller.is_next_floor_with(Consumable::Flight));

    h.controller
        .on_event(GameEvent::RunCommenced { content_id: SPIRE_21_30 }, now);
    h.controller
        .on_event(GameEvent::ItemConsumed { raw_kind: 6 }, now);

    assert!(h.controller.is_next_floor_with(Consumable::Flight));
    assert!(!h.controller.is_next_floor_with(Consumable::Bounty));

    // Advancing consumes the queue; the new floor starts fresh.
    h.controller.on_event(GameEvent::TransferenceInitiated, now);
    h.controller.on_event(GameEvent::RunRecommenced, now);
    assert!(!h.controller.is_next_floor_with(Consumable::Flight));
    assert_eq!(h.controller.floor_effects(), vec![Consumable::Flight]);
}

// =============================================================================
// Scanning and auto-open
// =============================================================================

fn arm_scan_run(h: &mut super::helpers::Harness) {
    h.controller
        .on_event(GameEvent::RunCommenced { content_id: SPIRE_21_30 }, Instant::now());
}

#[test]
fn scan_skips_until_preconditions_hold() {
    let mut h = harness();
    // Not ready, no objects.
    assert!(h.controller.scan_cycle().is_none());

    arm_scan_run(&mut h);
    // Ready but the zone is empty.
    assert!(h.controller.scan_cycle().is_none());

    h.host.set_state(|s| s.objects = vec![player_view()]);
    assert!(h.controller.scan_cycle().is_some());

    h.host
        .set_state(|s| s.conditions = ConditionFlags::BETWEEN_AREAS);
    assert!(h.controller.scan_cycle().is_none());
}

#[test]
fn bronze_chest_is_opened_exactly_once() {
    let mut h = harness();
    arm_scan_run(&mut h);
    h.config.write().unwrap().open_chests = true;

    h.host.set_state(|s| {
        s.objects = vec![
            player_view(),
            fixture_view(10, data_ids::BRONZE_CHESTS[0], Vec3::new(2.0, 0.0, 0.0)),
        ];
    });

    h.controller.scan_cycle().expect("cycle runs");
    h.controller.scan_cycle().expect("cycle runs");
    assert_eq!(h.host.interactions(), vec![EntityId::new(10)]);
}

#[test]
fn silver_health_floor_holds_at_the_boundary() {
    let mut h = harness();
    arm_scan_run(&mut h);
    {
        let mut config = h.config.write().unwrap();
        config.open_chests = true;
        config.open_silver_chests = true;
        config.open_unsafe_chests = true; // Spire 21-30 is silver ambush tier.
    }
    h.host.set_state(|s| {
        s.objects = vec![
            player_view(),
            fixture_view(11, data_ids::SILVER_CHEST, Vec3::new(2.0, 0.0, 0.0)),
        ];
    });

    h.host.set_state(|s| {
        if let Some(player) = s.player.as_mut() {
            player.health_fraction = 0.77;
        }
    });
    h.controller.scan_cycle().expect("cycle runs");
    assert!(h.host.interactions().is_empty(), "refused at the floor");

    h.host.set_state(|s| {
        if let Some(player) = s.player.as_mut() {
            player.health_fraction = 0.78;
        }
    });
    h.controller.scan_cycle().expect("cycle runs");
    assert_eq!(h.host.interactions(), vec![EntityId::new(11)]);
}

#[test]
fn ambush_tier_blocks_without_opt_in() {
    let mut h = harness();
    arm_scan_run(&mut h);
    {
        let mut config = h.config.write().unwrap();
        config.open_chests = true;
        config.open_silver_chests = true;
    }
    h.host.set_state(|s| {
        s.objects = vec![
            player_view(),
            fixture_view(11, data_ids::SILVER_CHEST, Vec3::new(2.0, 0.0, 0.0)),
        ];
    });
    h.controller.scan_cycle().expect("cycle runs");
    assert!(h.host.interactions().is_empty());
}

#[test]
fn bonus_reward_tags_the_nearest_gold_chest() {
    let mut h = harness();
    arm_scan_run(&mut h);
    h.host.set_state(|s| {
        s.objects = vec![
            player_view(),
            fixture_view(20, data_ids::GOLD_CHEST, Vec3::new(3.0, 0.0, 0.0)),
            fixture_view(21, data_ids::GOLD_CHEST, Vec3::new(4.5, 0.0, 0.0)),
            fixture_view(22, data_ids::GOLD_CHEST, Vec3::new(20.0, 0.0, 0.0)),
        ];
    });
    h.controller.scan_cycle().expect("cycle runs");

    // Raw kind 9 is Fortune in the Spire. The unlock resolves against the
    // containers just scanned; the closest one in radius gets the tag.
    h.controller
        .on_event(GameEvent::BonusRewardUnlocked { raw_kind: 9 }, Instant::now());
    assert_eq!(
        h.controller.floor().reward_for(EntityId::new(20)),
        Some(Consumable::Fortune)
    );
    assert_eq!(h.controller.floor().reward_for(EntityId::new(21)), None);

    // The tag shows on subsequent cycles through the floor registry.
    let entities = h.controller.scan_cycle().expect("cycle runs");
    let tagged: Vec<_> = entities
        .iter()
        .filter(|e| e.bonus_reward().is_some())
        .collect();
    assert_eq!(tagged.len(), 1);
    assert_eq!(tagged[0].entity_id(), EntityId::new(20));
    assert_eq!(tagged[0].bonus_reward(), Some(Consumable::Fortune));
}

#[test]
fn bonus_reward_is_dropped_when_no_gold_chest_is_in_radius() {
    let mut h = harness();
    arm_scan_run(&mut h);
    h.host.set_state(|s| {
        s.objects = vec![
            player_view(),
            fixture_view(22, data_ids::GOLD_CHEST, Vec3::new(20.0, 0.0, 0.0)),
        ];
    });
    h.controller.scan_cycle().expect("cycle runs");
    h.controller
        .on_event(GameEvent::BonusRewardUnlocked { raw_kind: 9 }, Instant::now());
    assert_eq!(h.controller.floor().reward_for(EntityId::new(22)), None);

    // Walking into range later must not resurrect the unlock.
    h.host.set_state(|s| {
        if let Some(player) = s.player.as_mut() {
            player.position = Vec3::new(16.0, 0.0, 0.0);
        }
    });
    let entities = h.controller.scan_cycle().expect("cycle runs");
    assert!(entities.iter().all(|e| e.bonus_reward().is_none()));
}

#[test]
fn bonus_reward_ignores_chests_from_the_previous_floor() {
    let mut h = harness();
    let now = Instant::now();
    arm_scan_run(&mut h);
    h.host.set_state(|s| {
        s.objects = vec![
            player_view(),
            fixture_view(20, data_ids::GOLD_CHEST, Vec3::new(3.0, 0.0, 0.0)),
        ];
    });
    h.controller.scan_cycle().expect("cycle runs");

    // Transference wipes the scan results along with the floor registries,
    // so an unlock arriving on the new floor has nothing stale to hit.
    h.controller.on_event(GameEvent::TransferenceInitiated, now);
    h.controller.on_event(GameEvent::RunRecommenced, now);
    h.controller
        .on_event(GameEvent::BonusRewardUnlocked { raw_kind: 9 }, now);
    assert_eq!(h.controller.floor().reward_for(EntityId::new(20)), None);
}

#[test]
fn scanning_pauses_during_a_floor_transfer() {
    let mut h = harness();
    let now = Instant::now();
    arm_scan_run(&mut h);
    h.config.write().unwrap().open_chests = true;
    h.host.set_state(|s| {
        s.objects = vec![
            player_view(),
            fixture_view(10, data_ids::BRONZE_CHESTS[0], Vec3::new(2.0, 0.0, 0.0)),
        ];
    });
    assert!(h.controller.scan_cycle().is_some());
    assert_eq!(h.host.interactions().len(), 1);

    // Between transference and recommencement the world belongs to the
    // floor being left; nothing scans and nothing opens.
    h.controller.on_event(GameEvent::TransferenceInitiated, now);
    assert!(h.controller.scan_cycle().is_none());
    assert_eq!(h.host.interactions().len(), 1);

    h.controller.on_event(GameEvent::RunRecommenced, now);
    assert!(h.controller.scan_cycle().is_some());
}

#[test]
fn party_members_are_not_classified_or_tracked() {
    let mut h = harness();
    arm_scan_run(&mut h);
    h.host.set_state(|s| {
        s.objects = vec![
            player_view(),
            party_member_view(2, Vec3::new(3.0, 0.0, 0.0)),
            creature_view(30, 5_000, 2_500, Vec3::new(5.0, 0.0, 0.0)),
        ];
    });
    let entities = h.controller.scan_cycle().expect("cycle runs");

    assert_eq!(entities.len(), 2);
    assert!(entities.iter().all(|e| e.entity_id() != EntityId::new(2)));
    assert!(
        !h.controller.floor().tracked().contains_key(&EntityId::new(2)),
        "other players never enter the sighting registry"
    );
    // The local player still classifies as such.
    assert!(entities.iter().any(|e| e.kind() == EntityKind::Player));
}

#[test]
fn scan_classifies_hostiles_and_the_player() {
    let mut h = harness();
    arm_scan_run(&mut h);
    h.host.set_state(|s| {
        s.objects = vec![
            player_view(),
            creature_view(30, 5_000, 2_500, Vec3::new(5.0, 0.0, 0.0)),
        ];
    });
    let entities = h.controller.scan_cycle().expect("cycle runs");
    assert_eq!(entities.len(), 2);
    assert!(entities.iter().any(|e| e.kind() == EntityKind::Player));
    assert!(entities.iter().any(|e| e.kind() == EntityKind::Hostile));
}

#[test]
fn manual_open_bypasses_toggles_but_keeps_safety_checks() {
    let mut h = harness();
    arm_scan_run(&mut h);
    // Auto-open stays off; only the explicit command opens anything.
    h.host.set_state(|s| {
        s.objects = vec![
            player_view(),
            fixture_view(40, data_ids::BRONZE_CHESTS[0], Vec3::new(2.0, 0.0, 0.0)),
            fixture_view(41, data_ids::SILVER_CHEST, Vec3::new(3.0, 0.0, 0.0)),
        ];
    });
    h.controller.scan_cycle().expect("cycle runs");
    assert!(h.host.interactions().is_empty());

    let opened = h.controller.try_nearest_chest().expect("bronze opens");
    assert_eq!(opened, EntityId::new(40));
    assert_eq!(h.host.interactions(), vec![EntityId::new(40)]);

    // Next candidate is the silver chest; Spire 21-30 puts the ambush risk
    // on silver and the user has not opted in, so the gate still refuses.
    assert!(h.controller.try_nearest_chest().is_err());
    assert_eq!(h.host.interactions().len(), 1);
}

#[test]
fn manual_open_rejects_unknown_ids() {
    let mut h = harness();
    arm_scan_run(&mut h);
    h.host.set_state(|s| s.objects = vec![player_view()]);
    h.controller.scan_cycle().expect("cycle runs");
    assert!(h.controller.try_interact(EntityId::new(999)).is_err());
}

#[test]
fn nearest_chest_command_works_with_scanning_disabled() {
    let mut h = harness();
    arm_scan_run(&mut h);
    h.config.write().unwrap().enabled = false;
    h.host.set_state(|s| {
        s.objects = vec![
            player_view(),
            fixture_view(40, data_ids::BRONZE_CHESTS[0], Vec3::new(2.0, 0.0, 0.0)),
        ];
    });

    // No cycles run while the overlay is off, but the explicit command
    // reads the world directly.
    assert!(h.controller.scan_cycle().is_none());
    let opened = h.controller.try_nearest_chest().expect("bronze opens");
    assert_eq!(opened, EntityId::new(40));
    assert_eq!(h.host.interactions(), vec![EntityId::new(40)]);
}

// =============================================================================
// Telemetry
// =============================================================================

#[test]
fn opted_in_run_submits_one_report_with_sightings() {
    let mut h = harness();
    {
        let mut config = h.config.write().unwrap();
        config.telemetry_opt_in = true;
        config.sender_id = "abcd".to_string();
    }
    arm_scan_run(&mut h);
    h.host.set_state(|s| {
        s.objects = vec![
            player_view(),
            creature_view(30, 5_000, 2_500, Vec3::new(5.0, 0.0, 0.0)),
        ];
    });
    h.controller.scan_cycle().expect("cycle runs");
    h.controller.on_event(GameEvent::DutyEnded, Instant::now());

    let reports = h.sink.reports();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].sender, "abcd");
    assert_eq!(reports[0].party_size, 1);
    assert_eq!(reports[0].mobs.len(), 1);
    assert_eq!(reports[0].mobs[0].floor, 21);
}

#[test]
fn each_transference_flushes_a_report_for_the_finished_floor() {
    let mut h = harness();
    let now = Instant::now();
    {
        let mut config = h.config.write().unwrap();
        config.telemetry_opt_in = true;
        config.sender_id = "abcd".to_string();
    }
    arm_scan_run(&mut h);
    h.host.set_state(|s| {
        s.party_size = 2;
        s.objects = vec![
            player_view(),
            creature_view(30, 5_000, 2_500, Vec3::new(5.0, 0.0, 0.0)),
        ];
    });
    h.controller.scan_cycle().expect("cycle runs");

    // Leaving floor 21 flushes its sightings immediately.
    h.controller.on_event(GameEvent::TransferenceInitiated, now);
    let reports = h.sink.reports();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].party_size, 2);
    assert_eq!(reports[0].mobs[0].floor, 21);

    // Floor 22 gets its own report at run end, not a merged one.
    h.controller.on_event(GameEvent::RunRecommenced, now);
    h.controller.scan_cycle().expect("cycle runs");
    h.controller.on_event(GameEvent::DutyEnded, now);

    let reports = h.sink.reports();
    assert_eq!(reports.len(), 2);
    assert_eq!(reports[1].mobs.len(), 1);
    assert_eq!(reports[1].mobs[0].floor, 22);
}

#[test]
fn opted_out_run_submits_nothing() {
    let mut h = harness();
    arm_scan_run(&mut h);
    h.host.set_state(|s| {
        s.objects = vec![
            player_view(),
            creature_view(30, 5_000, 2_500, Vec3::new(5.0, 0.0, 0.0)),
        ];
    });
    h.controller.scan_cycle().expect("cycle runs");
    h.controller.on_event(GameEvent::DutyEnded, Instant::now());
    assert!(h.sink.reports().is_empty());
}

// =============================================================================
// Property: the advancement effect law
// =============================================================================

proptest! {
    #[test]
    fn effects_after_advancement_are_exactly_the_carried_kinds(
        raw_kinds in proptest::collection::vec(1_u8..=19, 0..12)
    ) {
        let mut floor = FloorState::default();
        floor.begin_run(&FloorSet {
            variant: DungeonKind::Spire,
            start_floor: 21,
            respawn_secs: 60,
            ambush_tier: AmbushTier::Silver,
        });
        floor.advance_floor(Instant::now());

        let mut expected: Vec<Consumable> = Vec::new();
        for raw in raw_kinds {
            let kind = Consumable::from_raw(raw).expect("raw in table");
            floor.on_item_consumed(kind);
            if kind.is_carry_over() {
                expected.push(kind);
            }
        }
        expected.sort_unstable();
        expected.dedup();

        floor.begin_transfer();
        floor.advance_floor(Instant::now());
        prop_assert_eq!(floor.floor_effects(), expected);
    }
}
