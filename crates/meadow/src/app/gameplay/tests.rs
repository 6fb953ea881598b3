use super::*;

fn signals(npc_present: bool, total_animals: usize, backpack_empty: bool) -> WorldSignals {
    WorldSignals {
        npc_present,
        total_animals,
        backpack_empty,
    }
}

fn npc_visit_chance(happened: bool, signals: &WorldSignals) -> i32 {
    calculate_chance(EventKind::NpcVisit, true, happened, signals)
}

fn test_rng() -> StdRng {
    StdRng::seed_from_u64(42)
}

fn test_world() -> WorldState {
    WorldState::new(default_world(), HOME_MAP_NAME)
}

/// Builds a loaded scene without touching the filesystem: built-in maps,
/// seeded rng, player spawned, mirrors in place.
fn scene_with_world() -> (GameplayScene, SceneWorld) {
    let mut scene = GameplayScene::new_seeded(7);
    let mut world = SceneWorld::default();

    scene
        .events
        .register(EventKind::NpcVisit, true)
        .expect("register");
    let spawn = scene.world.active_map().spawn_px();
    let player_id = world.spawn(
        Transform { position: spawn },
        RenderableDesc {
            kind: RenderableKind::Sprite(SpriteRef {
                sheet: SHEET_ACTORS,
                index: PLAYER_SPRITE_INDEX,
            }),
            debug_name: "player",
        },
    );
    scene.player_id = Some(player_id);
    world.set_tilemap(scene.world.active_map().tiles.clone());
    scene.spawn_animal_entities(&mut world);
    world.apply_pending();
    scene
        .gui
        .refresh(&scene.registry, &scene.world, (1280, 720));
    (scene, world)
}

fn tick(scene: &mut GameplayScene, world: &mut SceneWorld, input: &InputSnapshot) {
    scene.update(1.0 / 60.0, input, world);
    world.apply_pending();
}

fn left_click_snapshot(cursor: Vec2) -> InputSnapshot {
    InputSnapshot::empty()
        .with_left_click_pressed(true)
        .with_cursor_position_px(Some(cursor))
        .with_window_size((1280, 720))
}

fn right_click_snapshot(cursor: Vec2) -> InputSnapshot {
    InputSnapshot::empty()
        .with_right_click_pressed(true)
        .with_cursor_position_px(Some(cursor))
        .with_window_size((1280, 720))
}

/// Cursor position that lands on world tile (tile_x, tile_y) given the
/// scene world's current camera.
fn cursor_over_tile(world: &SceneWorld, tile_x: u32, tile_y: u32) -> Vec2 {
    let target = tile_center_px(tile_x, tile_y);
    Vec2 {
        x: target.x - world.camera().position.x + 640.0,
        y: target.y - world.camera().position.y + 360.0,
    }
}

fn animal_count(scene: &GameplayScene) -> usize {
    scene.world.active_map().animals.len()
}

// --- chance formula -------------------------------------------------------

#[test]
fn npc_present_forces_zero_chance_regardless_of_other_factors() {
    assert_eq!(npc_visit_chance(false, &signals(true, 50, true)), 0);
    assert_eq!(npc_visit_chance(true, &signals(true, 50, true)), 0);
    assert_eq!(npc_visit_chance(false, &signals(true, 0, false)), 0);
}

#[test]
fn non_repeatable_event_is_inert_forever_after_firing() {
    for animals in 0..20 {
        let chance =
            calculate_chance(EventKind::NpcVisit, false, true, &signals(false, animals, true));
        assert!(chance <= 0, "animals={animals} gave chance {chance}");
    }
}

#[test]
fn chance_strictly_increases_with_total_animal_count() {
    for animals in 0..10 {
        let lower = npc_visit_chance(false, &signals(false, animals, true));
        let higher = npc_visit_chance(false, &signals(false, animals + 1, true));
        assert_eq!(higher, lower + 1);
    }
}

#[test]
fn scenario_empty_backpack_three_animals_never_happened_is_four() {
    assert_eq!(npc_visit_chance(false, &signals(false, 3, true)), 4);
}

#[test]
fn scenario_full_backpack_three_animals_happened_repeatable_is_one() {
    assert_eq!(npc_visit_chance(true, &signals(false, 3, false)), 1);
}

#[test]
fn happened_suppresses_future_chance_by_one() {
    let fresh = npc_visit_chance(false, &signals(false, 5, true));
    let after = npc_visit_chance(true, &signals(false, 5, true));
    assert_eq!(after, fresh - 1);
}

#[test]
fn full_backpack_lowers_chance_by_two_versus_empty() {
    let empty = npc_visit_chance(false, &signals(false, 4, true));
    let full = npc_visit_chance(false, &signals(false, 4, false));
    assert_eq!(full, empty - 2);
}

#[test]
fn acceptance_draw_requires_positive_chance_and_roll_below_it() {
    assert!(!accepts(0, 0));
    assert!(!accepts(-3, 0));
    assert!(accepts(4, 0));
    assert!(accepts(4, 3));
    assert!(!accepts(4, 4));
    assert!(accepts(CHANCE_SCALE, CHANCE_SCALE - 1));
}

// --- world signals --------------------------------------------------------

#[test]
fn signals_count_animals_across_all_maps_but_npcs_only_live() {
    let mut world = test_world();
    world.active_map_mut().animals.clear();
    let forest = world
        .maps
        .get_mut(FOREST_MAP_NAME)
        .expect("forest map exists");
    for _ in 0..3 {
        forest.animals.push(Animal {
            species: AnimalSpecies::Rabbit,
            position: tile_center_px(2, 2),
            wander: WanderState::default(),
            entity: None,
        });
    }

    let captured = WorldSignals::capture(&world);
    assert_eq!(captured.total_animals, 3);
    assert!(!captured.npc_present);
    assert_eq!(npc_visit_chance(false, &captured), 4);
}

#[test]
fn signals_reflect_backpack_contents() {
    let mut world = test_world();
    assert!(WorldSignals::capture(&world).backpack_empty);
    world.backpack = Some(AnimalSpecies::Cat);
    assert!(!WorldSignals::capture(&world).backpack_empty);
}

// --- event engine ---------------------------------------------------------

#[test]
fn duplicate_event_registration_fails() {
    let mut engine = EventEngine::new();
    engine
        .register(EventKind::NpcVisit, true)
        .expect("first registration");
    let error = engine
        .register(EventKind::NpcVisit, true)
        .expect_err("second registration must fail");
    assert!(error.to_string().contains("npc_visit"));
}

#[test]
fn evaluate_recomputes_chance_from_live_world_each_cycle() {
    let mut engine = EventEngine::new();
    engine.register(EventKind::NpcVisit, true).expect("register");
    let mut world = test_world();
    let mut rng = test_rng();

    // Default world: two animals, empty backpack, no NPC.
    engine.evaluate(&mut world, &mut rng);
    let first = engine.event(EventKind::NpcVisit).expect("event").chance;
    if !engine.event(EventKind::NpcVisit).expect("event").happened {
        assert_eq!(first, 3);
    }

    world.backpack = Some(AnimalSpecies::Mouse);
    world.npcs.clear();
    let happened = engine.event(EventKind::NpcVisit).expect("event").happened;
    engine.evaluate(&mut world, &mut rng);
    let second = engine.event(EventKind::NpcVisit).expect("event").chance;
    let expected = npc_visit_chance(happened, &signals(false, 2, false));
    assert_eq!(second, expected);
}

#[test]
fn evaluate_never_fires_while_npc_is_present() {
    let mut engine = EventEngine::new();
    engine.register(EventKind::NpcVisit, true).expect("register");
    let mut world = test_world();
    world.npcs.push(Npc::new(tile_center_px(1, 1)));
    let mut rng = test_rng();

    for _ in 0..500 {
        let outcome = engine.evaluate(&mut world, &mut rng);
        assert!(outcome.fired.is_empty());
    }
    assert!(!engine.event(EventKind::NpcVisit).expect("event").happened);
    assert_eq!(world.npcs.len(), 1);
}

#[test]
fn event_eventually_fires_and_spawns_exactly_one_npc() {
    let mut engine = EventEngine::new();
    engine.register(EventKind::NpcVisit, true).expect("register");
    let mut world = test_world();
    let mut rng = test_rng();

    let mut fired = false;
    for _ in 0..5_000 {
        if !engine.evaluate(&mut world, &mut rng).fired.is_empty() {
            fired = true;
            break;
        }
    }
    assert!(fired, "a 3%-per-cycle event must fire within 5000 cycles");
    assert!(engine.event(EventKind::NpcVisit).expect("event").happened);
    assert_eq!(world.npcs.len(), 1);

    // With the NPC in the world the chance pins to zero; no second visitor.
    for _ in 0..500 {
        assert!(engine.evaluate(&mut world, &mut rng).fired.is_empty());
    }
    assert_eq!(world.npcs.len(), 1);
    assert_eq!(engine.event(EventKind::NpcVisit).expect("event").chance, 0);
}

#[test]
fn npc_visit_effect_rejects_second_concurrent_npc() {
    let mut world = test_world();
    apply_effect(EventKind::NpcVisit, &mut world).expect("first visit");
    let error = apply_effect(EventKind::NpcVisit, &mut world).expect_err("second visit");
    assert!(error.to_string().contains(HOME_MAP_NAME));
    assert_eq!(world.npcs.len(), 1);
}

#[test]
fn engine_tick_evaluates_once_per_interval() {
    let mut engine = EventEngine::new();
    engine.register(EventKind::NpcVisit, true).expect("register");
    let mut world = test_world();
    let mut rng = test_rng();

    for _ in 0..EVENT_EVAL_INTERVAL_TICKS - 1 {
        assert!(engine.tick(&mut world, &mut rng).is_none());
    }
    assert!(engine.tick(&mut world, &mut rng).is_some());
    assert!(engine.tick(&mut world, &mut rng).is_none());
}

#[test]
fn event_state_survives_map_switch() {
    let (mut scene, mut world) = scene_with_world();
    scene.events.events[0].happened = true;

    scene.switch_map(&mut world, FOREST_MAP_NAME);
    world.apply_pending();

    assert_eq!(scene.world.active_map, FOREST_MAP_NAME);
    assert!(scene.events.event(EventKind::NpcVisit).expect("event").happened);
}

// --- animals and capacity -------------------------------------------------

#[test]
fn add_animal_succeeds_at_nine_and_rejects_at_ten() {
    let (mut scene, mut world) = scene_with_world();
    scene.world.active_map_mut().animals.clear();

    for index in 0..9 {
        scene.add_animal_at(
            &mut world,
            tile_center_px(index + 1, 2),
            AnimalSpecies::Chicken,
        );
    }
    assert_eq!(animal_count(&scene), 9);

    scene.add_animal_at(&mut world, tile_center_px(11, 2), AnimalSpecies::Chicken);
    assert_eq!(animal_count(&scene), 10);

    scene.add_animal_at(&mut world, tile_center_px(12, 2), AnimalSpecies::Chicken);
    assert_eq!(animal_count(&scene), 10);
}

#[test]
fn added_animal_is_mirrored_as_render_entity_after_apply() {
    let (mut scene, mut world) = scene_with_world();
    let before = world.entity_count();

    scene.add_animal_at(&mut world, tile_center_px(4, 4), AnimalSpecies::Rabbit);
    // Pending until the apply point between passes.
    assert_eq!(world.entity_count(), before);
    world.apply_pending();
    assert_eq!(world.entity_count(), before + 1);
}

#[test]
fn registry_capacity_error_names_map_and_cap() {
    let registry = AnimalRegistry::new();
    let mut rng = test_rng();
    let mut map = build_home_map();
    map.animals.clear();
    for _ in 0..MAX_ANIMALS_PER_MAP {
        registry
            .add_to_map(&mut map, AnimalSpecies::Mouse, tile_center_px(1, 1), &mut rng)
            .expect("under cap");
    }
    let error = registry
        .add_to_map(&mut map, AnimalSpecies::Mouse, tile_center_px(1, 1), &mut rng)
        .expect_err("over cap");
    assert!(error.to_string().contains(HOME_MAP_NAME));
    assert!(error.to_string().contains("10"));
}

#[test]
fn wander_clamps_animals_inside_map_bounds() {
    let mut rng = test_rng();
    let mut animal = Animal {
        species: AnimalSpecies::Butterfly,
        position: Vec2 { x: 20.0, y: 20.0 },
        wander: WanderState {
            direction: Direction::West,
            seconds_until_turn: 100.0,
        },
        entity: None,
    };
    for _ in 0..120 {
        update_animal_wander(&mut animal, 1.0 / 60.0, (768.0, 576.0), &mut rng);
    }
    let half_tile = TILE_SIZE_PX as f32 * 0.5;
    assert!(animal.position.x >= half_tile);
    assert!(animal.position.y >= half_tile);
    assert!(animal.position.x <= 768.0 - half_tile);
    assert!(animal.position.y <= 576.0 - half_tile);
}

#[test]
fn wander_rerolls_direction_when_timer_expires() {
    let mut rng = test_rng();
    let mut animal = Animal {
        species: AnimalSpecies::Mouse,
        position: tile_center_px(5, 5),
        wander: WanderState {
            direction: Direction::South,
            seconds_until_turn: 0.0,
        },
        entity: None,
    };
    update_animal_wander(&mut animal, 1.0 / 60.0, (768.0, 576.0), &mut rng);
    assert!(animal.wander.seconds_until_turn > 0.0);
}

// --- tile mutators --------------------------------------------------------

#[test]
fn set_tile_writes_catalog_layer_and_mirrors_to_render_tilemap() {
    let (mut scene, mut world) = scene_with_world();
    scene.set_tile(&mut world, 3, 3, 4); // flowers, layer 1

    assert_eq!(scene.world.active_map().tiles.tile_at(3, 3, 1), Some(4));
    assert_eq!(
        world.tilemap().expect("tilemap").tile_at(3, 3, 1),
        Some(4)
    );
}

#[test]
fn set_tile_with_unknown_id_is_a_noop() {
    let (mut scene, mut world) = scene_with_world();
    let before = scene.world.active_map().tiles.occupied_cells();
    scene.set_tile(&mut world, 3, 3, 999);
    assert_eq!(scene.world.active_map().tiles.occupied_cells(), before);
}

#[test]
fn set_tile_out_of_bounds_is_a_noop() {
    let (mut scene, mut world) = scene_with_world();
    let before = scene.world.active_map().tiles.occupied_cells();
    scene.set_tile(&mut world, 10_000, 3, 0);
    assert_eq!(scene.world.active_map().tiles.occupied_cells(), before);
}

#[test]
fn remove_tile_clears_only_the_given_layer() {
    let (mut scene, mut world) = scene_with_world();
    scene.set_tile(&mut world, 6, 6, 1); // dirt, layer 0
    scene.set_tile(&mut world, 6, 6, 5); // bush, layer 1

    scene.remove_tile(&mut world, 6, 6, 1);
    assert_eq!(scene.world.active_map().tiles.tile_at(6, 6, 1), None);
    assert_eq!(scene.world.active_map().tiles.tile_at(6, 6, 0), Some(1));
}

#[test]
fn right_click_without_selection_strips_topmost_layer() {
    let (mut scene, mut world) = scene_with_world();
    scene.world.selection.selected_tile = None;
    scene.gui.visible = false;
    scene.set_tile(&mut world, 6, 6, 1); // layer 0
    scene.set_tile(&mut world, 6, 6, 5); // layer 1

    let cursor = cursor_over_tile(&world, 6, 6);
    let input = right_click_snapshot(cursor);
    tick(&mut scene, &mut world, &input);

    assert_eq!(scene.world.active_map().tiles.tile_at(6, 6, 1), None);
    assert_eq!(scene.world.active_map().tiles.tile_at(6, 6, 0), Some(1));
}

// --- GUI click-through ----------------------------------------------------

#[test]
fn gui_click_is_consumed_before_world_editing() {
    let (mut scene, mut world) = scene_with_world();
    world.camera_mut().position = Vec2 { x: 640.0, y: 360.0 };
    scene.world.selection.selected_tile = Some(2); // water

    // The first palette button sits at the top-left HUD margin.
    let cursor = Vec2 { x: 12.0, y: 12.0 };
    let before = scene.world.active_map().tiles.occupied_cells();
    let input = left_click_snapshot(cursor);
    tick(&mut scene, &mut world, &input);

    // The click selected a tile instead of editing the world under it.
    assert_eq!(
        scene.world.selection.selected_tile,
        Some(TILE_CATALOG[0].id)
    );
    assert_eq!(scene.world.active_map().tiles.occupied_cells(), before);
}

#[test]
fn hidden_gui_passes_clicks_through_to_the_world() {
    let (mut scene, mut world) = scene_with_world();
    scene.gui.visible = false;
    scene.world.selection.selected_tile = Some(3); // sand, layer 0

    let cursor = cursor_over_tile(&world, 2, 9);
    let input = left_click_snapshot(cursor);
    tick(&mut scene, &mut world, &input);

    assert_eq!(scene.world.active_map().tiles.tile_at(2, 9, 0), Some(3));
}

#[test]
fn adoptable_panel_click_selects_species() {
    let (mut scene, mut world) = scene_with_world();
    scene.switch_top_panel(ADOPTABLE_PANEL_ID);
    scene
        .gui
        .refresh(&scene.registry, &scene.world, (1280, 720));

    // Second adoptable button.
    let rect = top_panel_button_rect(1);
    let cursor = Vec2 {
        x: rect.x as f32 + 2.0,
        y: rect.y as f32 + 2.0,
    };
    let input = left_click_snapshot(cursor);
    tick(&mut scene, &mut world, &input);

    assert_eq!(scene.world.selection.selected_species, AnimalSpecies::Cat);
}

#[test]
fn adoptable_panel_world_click_places_selected_species() {
    let (mut scene, mut world) = scene_with_world();
    scene.world.active_map_mut().animals.clear();
    scene.switch_top_panel(ADOPTABLE_PANEL_ID);
    scene.world.selection.selected_species = AnimalSpecies::Rabbit;

    let cursor = cursor_over_tile(&world, 9, 12);
    let input = left_click_snapshot(cursor);
    tick(&mut scene, &mut world, &input);

    let animals = &scene.world.active_map().animals;
    assert_eq!(animals.len(), 1);
    assert_eq!(animals[0].species, AnimalSpecies::Rabbit);
    // The same tick's wander pass may already have moved it a step.
    assert!(distance_sq(animals[0].position, tile_center_px(9, 12)) < 25.0);
}

#[test]
fn switch_top_panel_rejects_out_of_range_pages() {
    let (mut scene, _world) = scene_with_world();
    let before = scene.world.selection.selected_panel;
    scene.switch_top_panel(9);
    assert_eq!(scene.world.selection.selected_panel, before);

    scene.switch_top_panel(tile_page_count());
    assert_eq!(scene.world.selection.selected_panel, tile_page_count());
}

#[test]
fn hud_frame_marks_selected_tile_button() {
    let (mut scene, _world) = scene_with_world();
    scene.world.selection.selected_tile = Some(TILE_CATALOG[0].id);
    scene
        .gui
        .refresh(&scene.registry, &scene.world, (1280, 720));

    let hud = scene.gui.hud_frame(&scene.world.selection);
    let top = &hud.panels[0];
    assert!(top.buttons[0].selected);
    assert!(!top.buttons[1].selected);
}

#[test]
fn hidden_gui_renders_no_panels() {
    let (mut scene, _world) = scene_with_world();
    scene.gui.visible = false;
    let hud = scene.gui.hud_frame(&scene.world.selection);
    assert!(hud.panels.is_empty());
}

// --- backpack -------------------------------------------------------------

#[test]
fn picking_up_an_animal_fills_backpack_and_removes_it_from_map() {
    let (mut scene, mut world) = scene_with_world();
    let before = animal_count(&scene);
    let species = scene.world.active_map().animals[0].species;

    scene.apply_gui_action(&mut world, GuiAction::PickUpAnimal(0));
    world.apply_pending();

    assert_eq!(animal_count(&scene), before - 1);
    assert_eq!(scene.world.backpack, Some(species));
}

#[test]
fn second_pick_up_is_rejected_while_backpack_is_full() {
    let (mut scene, mut world) = scene_with_world();
    scene.apply_gui_action(&mut world, GuiAction::PickUpAnimal(0));
    let count_after_first = animal_count(&scene);

    scene.apply_gui_action(&mut world, GuiAction::PickUpAnimal(0));
    assert_eq!(animal_count(&scene), count_after_first);
}

#[test]
fn placing_backpack_animal_empties_backpack() {
    let (mut scene, mut world) = scene_with_world();
    scene.apply_gui_action(&mut world, GuiAction::PickUpAnimal(0));
    let species = scene.world.backpack.expect("backpack filled");
    scene.gui.visible = false;
    let before = animal_count(&scene);

    let cursor = cursor_over_tile(&world, 3, 14);
    let input = left_click_snapshot(cursor);
    tick(&mut scene, &mut world, &input);

    assert!(scene.world.backpack.is_none());
    assert_eq!(animal_count(&scene), before + 1);
    let placed = scene.world.active_map().animals.last().expect("placed");
    assert_eq!(placed.species, species);
}

// --- player, portals, NPCs ------------------------------------------------

#[test]
fn held_move_action_moves_the_player() {
    let (mut scene, mut world) = scene_with_world();
    let player_id = scene.player_id.expect("player");
    let before = world.find_entity(player_id).expect("player").transform.position;

    let input = InputSnapshot::empty()
        .with_action_down(InputAction::MoveRight, true)
        .with_window_size((1280, 720));
    tick(&mut scene, &mut world, &input);

    let after = world.find_entity(player_id).expect("player").transform.position;
    assert!(after.x > before.x);
    assert_eq!(after.y, before.y);
}

#[test]
fn portal_hop_switches_map_and_spawns_at_return_portal() {
    let (mut scene, mut world) = scene_with_world();
    let player_id = scene.player_id.expect("player");
    world
        .find_entity_mut(player_id)
        .expect("player")
        .transform
        .position = tile_center_px(23, 9);

    tick(&mut scene, &mut world, &InputSnapshot::empty().with_window_size((1280, 720)));

    assert_eq!(scene.world.active_map, FOREST_MAP_NAME);
    // The forest's return portal sits on the west edge; arrival is one tile
    // inward.
    let position = world.find_entity(player_id).expect("player").transform.position;
    assert_eq!(position, tile_center_px(1, 8));
}

#[test]
fn map_switch_freezes_departed_animals_and_keeps_their_records() {
    let (mut scene, mut world) = scene_with_world();
    let home_animals = animal_count(&scene);
    assert!(home_animals > 0);

    scene.switch_map(&mut world, FOREST_MAP_NAME);
    world.apply_pending();

    let home = scene.world.maps.get(HOME_MAP_NAME).expect("home map");
    assert_eq!(home.animals.len(), home_animals);
    assert!(home.animals.iter().all(|animal| animal.entity.is_none()));
    // Only the player remains mirrored; the forest starts empty.
    assert_eq!(world.entity_count(), 1);
}

#[test]
fn npc_does_not_survive_map_switch() {
    let (mut scene, mut world) = scene_with_world();
    scene.world.npcs.push(Npc::new(tile_center_px(2, 2)));
    scene.spawn_npc_entities(&mut world);
    world.apply_pending();

    scene.switch_map(&mut world, FOREST_MAP_NAME);
    world.apply_pending();

    assert!(scene.world.npcs.is_empty());
}

#[test]
fn approaching_npc_walks_toward_the_player() {
    let (mut scene, mut world) = scene_with_world();
    let player_position = world
        .find_entity(scene.player_id.expect("player"))
        .expect("player")
        .transform
        .position;
    let start = Vec2 {
        x: player_position.x - 300.0,
        y: player_position.y,
    };
    scene.world.npcs.push(Npc::new(start));

    scene.update_npcs(1.0 / 60.0, &mut world);

    let npc = &scene.world.npcs[0];
    assert!(npc.position.x > start.x);
    assert!(distance_sq(npc.position, player_position) < distance_sq(start, player_position));
}

#[test]
fn npc_waits_in_arrival_range_then_adopts_nearest_animal_and_leaves() {
    let (mut scene, mut world) = scene_with_world();
    let player_position = world
        .find_entity(scene.player_id.expect("player"))
        .expect("player")
        .transform
        .position;
    let mut npc = Npc::new(player_position);
    npc.goal = NpcGoal::Wait {
        patience_seconds: 0.01,
    };
    scene.world.npcs.push(npc);
    let before = animal_count(&scene);

    scene.update_npcs(1.0 / 60.0, &mut world);
    world.apply_pending();

    assert!(scene.world.npcs.is_empty());
    assert_eq!(animal_count(&scene), before - 1);
}

#[test]
fn full_update_eventually_spawns_a_visiting_npc() {
    let (mut scene, mut world) = scene_with_world();
    let input = InputSnapshot::empty().with_window_size((1280, 720));

    let mut arrived = false;
    for _ in 0..60_000 {
        tick(&mut scene, &mut world, &input);
        if !scene.world.npcs.is_empty() {
            arrived = true;
            break;
        }
    }

    assert!(arrived, "npc visit must fire within 1000 evaluation cycles");
    assert!(scene.events.event(EventKind::NpcVisit).expect("event").happened);
    assert!(scene
        .world
        .npcs
        .iter()
        .all(|npc| npc.entity.is_some()));
}

// --- map store ------------------------------------------------------------

#[test]
fn map_save_then_load_round_trips_the_animal_list() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut map = build_home_map();
    map.animals.clear();
    let mut rng = test_rng();
    let registry = AnimalRegistry::new();
    for (index, species) in [
        AnimalSpecies::Mouse,
        AnimalSpecies::Butterfly,
        AnimalSpecies::Cat,
    ]
    .into_iter()
    .enumerate()
    {
        registry
            .add_to_map(
                &mut map,
                species,
                Vec2 {
                    x: 100.5 + index as f32 * 33.0,
                    y: 64.25,
                },
                &mut rng,
            )
            .expect("add");
    }

    let path = map_file_path(dir.path(), &map.name);
    save_map(&path, &map).expect("save");
    let loaded = load_map(&path).expect("load");

    assert_eq!(loaded.animals.len(), map.animals.len());
    for (loaded_animal, original) in loaded.animals.iter().zip(&map.animals) {
        assert_eq!(loaded_animal.species, original.species);
        assert_eq!(loaded_animal.position, original.position);
        assert!(loaded_animal.entity.is_none());
    }
}

#[test]
fn map_save_then_load_round_trips_tiles_portals_and_spawn() {
    let dir = tempfile::tempdir().expect("tempdir");
    let map = build_home_map();
    let path = map_file_path(dir.path(), &map.name);

    save_map(&path, &map).expect("save");
    let loaded = load_map(&path).expect("load");

    assert_eq!(loaded.name, map.name);
    assert_eq!(loaded.tiles, map.tiles);
    assert_eq!(loaded.portals, map.portals);
    assert_eq!(loaded.spawn_tile, map.spawn_tile);
}

#[test]
fn load_map_rejects_wrong_version() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut saved = map_to_saved(&build_home_map());
    saved.map_version = 99;
    let path = dir.path().join("bad.json");
    std::fs::write(&path, serde_json::to_string(&saved).expect("encode")).expect("write");

    let error = load_map(&path).expect_err("must fail");
    assert!(matches!(
        error,
        MapStoreError::Validate { ref path, .. } if path == "map_version"
    ));
}

#[test]
fn load_map_rejects_unknown_tile_id() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut saved = map_to_saved(&build_home_map());
    saved.tiles[0].tile_id = 999;
    let path = dir.path().join("bad.json");
    std::fs::write(&path, serde_json::to_string(&saved).expect("encode")).expect("write");

    let error = load_map(&path).expect_err("must fail");
    assert!(error.to_string().contains("unknown tile id 999"));
}

#[test]
fn load_map_rejects_tile_on_wrong_layer() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut saved = map_to_saved(&build_home_map());
    saved.tiles[0] = SavedTileCell {
        x: 0,
        y: 0,
        layer: 2,
        tile_id: 0, // grass belongs to layer 0
    };
    let path = dir.path().join("bad.json");
    std::fs::write(&path, serde_json::to_string(&saved).expect("encode")).expect("write");

    let error = load_map(&path).expect_err("must fail");
    assert!(error.to_string().contains("belongs to layer 0"));
}

#[test]
fn load_map_rejects_more_animals_than_the_cap() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut saved = map_to_saved(&build_home_map());
    saved.animals = (0..MAX_ANIMALS_PER_MAP as u32 + 1)
        .map(|index| SavedAnimal {
            species: SavedSpecies::Mouse,
            x: 40.0 + index as f32,
            y: 40.0,
        })
        .collect();
    let path = dir.path().join("bad.json");
    std::fs::write(&path, serde_json::to_string(&saved).expect("encode")).expect("write");

    let error = load_map(&path).expect_err("must fail");
    assert!(error.to_string().contains("per-map cap"));
}

#[test]
fn parse_error_names_the_failing_json_path() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("bad.json");
    std::fs::write(
        &path,
        r#"{"map_version":1,"name":"x","width":"oops","height":4,"spawn":{"x":0,"y":0},"tiles":[]}"#,
    )
    .expect("write");

    let error = load_map(&path).expect_err("must fail");
    assert!(matches!(
        error,
        MapStoreError::Parse { ref json_path, .. } if json_path.contains("width")
    ));
}

#[test]
fn load_or_default_falls_back_to_builtin_map_when_file_missing() {
    let dir = tempfile::tempdir().expect("tempdir");
    let map = load_or_default_map(Some(dir.path()), HOME_MAP_NAME).expect("fallback");
    assert_eq!(map.name, HOME_MAP_NAME);
    assert!(!map.animals.is_empty());
}

#[test]
fn save_active_map_requires_a_maps_dir() {
    let (scene, _world) = scene_with_world();
    let error = scene.save_active_map().expect_err("no maps dir");
    assert!(matches!(error, MapStoreError::NoMapsDir));
}

#[test]
fn save_active_map_writes_a_loadable_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (mut scene, _world) = scene_with_world();
    scene.maps_dir = Some(dir.path().to_path_buf());

    let path = scene.save_active_map().expect("save");
    assert!(path.is_file());
    let loaded = load_map(&path).expect("load");
    assert_eq!(loaded.name, scene.world.active_map);
    assert_eq!(loaded.animals.len(), animal_count(&scene));
}

// --- tile catalog ---------------------------------------------------------

#[test]
fn tile_catalog_ids_are_unique_and_layers_in_range() {
    for (index, def) in TILE_CATALOG.iter().enumerate() {
        assert!(def.layer < TILE_LAYER_COUNT, "{} layer", def.name);
        assert!(
            TILE_CATALOG[index + 1..].iter().all(|other| other.id != def.id),
            "duplicate tile id {}",
            def.id
        );
    }
}

#[test]
fn tile_def_resolves_known_ids_only() {
    assert_eq!(tile_def(0).expect("grass").name, "grass");
    assert!(tile_def(900).is_none());
}
