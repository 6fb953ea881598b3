struct GameplayScene {
    world: WorldState,
    registry: AnimalRegistry,
    events: EventEngine,
    gui: GuiOverlay,
    rng: StdRng,
    player_id: Option<EntityId>,
    maps_dir: Option<PathBuf>,
    last_window_size: (u32, u32),
}

impl GameplayScene {
    fn new() -> Self {
        Self::with_world(
            WorldState::new(default_world(), HOME_MAP_NAME),
            StdRng::from_os_rng(),
        )
    }

    #[cfg(test)]
    fn new_seeded(seed: u64) -> Self {
        Self::with_world(
            WorldState::new(default_world(), HOME_MAP_NAME),
            StdRng::seed_from_u64(seed),
        )
    }

    fn with_world(world: WorldState, rng: StdRng) -> Self {
        Self {
            world,
            registry: AnimalRegistry::new(),
            events: EventEngine::new(),
            gui: GuiOverlay::new(),
            rng,
            player_id: None,
            maps_dir: None,
            last_window_size: (1280, 720),
        }
    }

    fn spawn_animal_entities(&mut self, scene_world: &mut SceneWorld) {
        let map = self.world.active_map_mut();
        for animal in &mut map.animals {
            if animal.entity.is_none() {
                let id = scene_world.spawn(
                    Transform {
                        position: animal.position,
                    },
                    RenderableDesc {
                        kind: RenderableKind::Sprite(animal.species.sprite()),
                        debug_name: animal.species.name(),
                    },
                );
                animal.entity = Some(id);
            }
        }
    }

    fn spawn_npc_entities(&mut self, scene_world: &mut SceneWorld) {
        for npc in &mut self.world.npcs {
            if npc.entity.is_none() {
                let id = scene_world.spawn(
                    Transform {
                        position: npc.position,
                    },
                    RenderableDesc {
                        kind: RenderableKind::Sprite(SpriteRef {
                            sheet: SHEET_ACTORS,
                            index: NPC_SPRITE_INDEX,
                        }),
                        debug_name: "npc",
                    },
                );
                npc.entity = Some(id);
            }
        }
    }

    /// Places the selected tile on its catalog layer. Unknown ids and
    /// out-of-bounds coordinates are silent no-ops apart from a log line.
    fn set_tile(&mut self, scene_world: &mut SceneWorld, tile_x: u32, tile_y: u32, tile_id: u16) {
        let Some(def) = tile_def(tile_id) else {
            debug!(tile_id, "set_tile_unknown_id");
            return;
        };
        let map = self.world.active_map_mut();
        if !map.tiles.set_tile(tile_x, tile_y, def.layer, tile_id) {
            debug!(x = tile_x, y = tile_y, "set_tile_out_of_bounds");
            return;
        }
        if let Some(tilemap) = scene_world.tilemap_mut() {
            tilemap.set_tile(tile_x, tile_y, def.layer, tile_id);
        }
        debug!(
            x = tile_x,
            y = tile_y,
            layer = def.layer,
            tile = def.name,
            "tile_placed"
        );
    }

    fn remove_tile(&mut self, scene_world: &mut SceneWorld, tile_x: u32, tile_y: u32, layer: u8) {
        let map = self.world.active_map_mut();
        let removed = map.tiles.remove_tile(tile_x, tile_y, layer);
        if let Some(tilemap) = scene_world.tilemap_mut() {
            tilemap.remove_tile(tile_x, tile_y, layer);
        }
        if let Some(tile_id) = removed {
            debug!(x = tile_x, y = tile_y, layer, tile_id, "tile_removed");
        }
    }

    /// Registers a new animal on the active map, enforcing the capacity cap.
    fn add_animal_at(
        &mut self,
        scene_world: &mut SceneWorld,
        position: Vec2,
        species: AnimalSpecies,
    ) {
        let map = self.world.active_map_mut();
        match self
            .registry
            .add_to_map(map, species, position, &mut self.rng)
        {
            Ok(()) => {
                if let Some(animal) = map.animals.last_mut() {
                    let id = scene_world.spawn(
                        Transform {
                            position: animal.position,
                        },
                        RenderableDesc {
                            kind: RenderableKind::Sprite(animal.species.sprite()),
                            debug_name: animal.species.name(),
                        },
                    );
                    animal.entity = Some(id);
                }
                info!(species = species.name(), map = %map.name, "animal_added");
            }
            Err(error) => warn!(error = %error, "animal_add_rejected"),
        }
    }

    fn pick_up_animal(&mut self, scene_world: &mut SceneWorld, index: usize) {
        if self.world.backpack.is_some() {
            debug!("backpack_already_full");
            return;
        }
        let map = self.world.active_map_mut();
        if index >= map.animals.len() {
            return;
        }
        let animal = map.animals.remove(index);
        if let Some(id) = animal.entity {
            scene_world.despawn(id);
        }
        let species = animal.species;
        self.world.backpack = Some(species);
        info!(species = species.name(), "animal_picked_up");
    }

    fn place_backpack_animal(&mut self, scene_world: &mut SceneWorld, position: Vec2) {
        let Some(species) = self.world.backpack else {
            return;
        };
        let placed = {
            let map = self.world.active_map_mut();
            match self
                .registry
                .add_to_map(map, species, position, &mut self.rng)
            {
                Ok(()) => {
                    if let Some(animal) = map.animals.last_mut() {
                        let id = scene_world.spawn(
                            Transform {
                                position: animal.position,
                            },
                            RenderableDesc {
                                kind: RenderableKind::Sprite(animal.species.sprite()),
                                debug_name: animal.species.name(),
                            },
                        );
                        animal.entity = Some(id);
                    }
                    true
                }
                Err(error) => {
                    warn!(error = %error, "backpack_place_rejected");
                    false
                }
            }
        };
        if placed {
            self.world.backpack = None;
            info!(species = species.name(), "animal_placed_from_backpack");
        }
    }

    /// Switches the active map. Animals of the departed map stay in its list
    /// (frozen); the visiting NPC does not survive the switch.
    fn switch_map(&mut self, scene_world: &mut SceneWorld, target: &str) {
        if !self.world.maps.contains_key(target) {
            warn!(map = target, "switch_map_unknown_target");
            return;
        }
        let previous = self.world.active_map.clone();
        {
            let map = self.world.active_map_mut();
            for animal in &mut map.animals {
                if let Some(id) = animal.entity.take() {
                    scene_world.despawn(id);
                }
            }
        }
        for npc in &mut self.world.npcs {
            if let Some(id) = npc.entity.take() {
                scene_world.despawn(id);
            }
        }
        self.world.npcs.clear();

        self.world.active_map = target.to_string();
        let spawn = {
            let map = self.world.active_map();
            map.portal_to(&previous)
                .map(|portal| portal_spawn_px(map, portal))
                .unwrap_or_else(|| map.spawn_px())
        };
        scene_world.set_tilemap(self.world.active_map().tiles.clone());
        self.spawn_animal_entities(scene_world);
        if let Some(player) = self
            .player_id
            .and_then(|id| scene_world.find_entity_mut(id))
        {
            player.transform.position = spawn;
        }
        scene_world.camera_mut().position = spawn;
        self.gui
            .refresh(&self.registry, &self.world, self.last_window_size);
        info!(from = %previous, to = %self.world.active_map, "map_switched");
    }

    fn save_active_map(&self) -> Result<PathBuf, MapStoreError> {
        let dir = self.maps_dir.as_deref().ok_or(MapStoreError::NoMapsDir)?;
        let map = self.world.active_map();
        let path = map_file_path(dir, &map.name);
        save_map(&path, map)?;
        Ok(path)
    }

    fn switch_top_panel(&mut self, panel: u8) {
        if panel != ADOPTABLE_PANEL_ID && panel > tile_page_count() {
            debug!(panel, "panel_out_of_range");
            return;
        }
        self.world.selection.selected_panel = panel;
        info!(panel, "panel_switched");
    }

    fn apply_gui_action(&mut self, scene_world: &mut SceneWorld, action: GuiAction) {
        match action {
            GuiAction::SelectTile(tile_id) => {
                self.world.selection.selected_tile = tile_id;
                info!(tile_id = ?tile_id, "tile_selected");
            }
            GuiAction::SelectSpecies(species) => {
                self.world.selection.selected_species = species;
                info!(species = species.name(), "species_selected");
            }
            GuiAction::PickUpAnimal(index) => self.pick_up_animal(scene_world, index),
        }
    }

    fn handle_left_click(&mut self, input: &InputSnapshot, scene_world: &mut SceneWorld) {
        let Some(cursor) = input.cursor_position_px() else {
            return;
        };
        if let Some(action) = self.gui.handle_click(cursor) {
            self.apply_gui_action(scene_world, action);
            return;
        }

        let world_px = screen_to_world_px(scene_world.camera(), input.window_size(), cursor);
        let Some((tile_x, tile_y)) = tile_coords_of(world_px) else {
            return;
        };
        if !self.world.active_map().tiles.in_bounds(tile_x, tile_y) {
            return;
        }

        if self.world.backpack.is_some() {
            self.place_backpack_animal(scene_world, tile_center_px(tile_x, tile_y));
        } else if self.world.selection.selected_panel == ADOPTABLE_PANEL_ID {
            let species = self.world.selection.selected_species;
            self.add_animal_at(scene_world, tile_center_px(tile_x, tile_y), species);
        } else if let Some(tile_id) = self.world.selection.selected_tile {
            self.set_tile(scene_world, tile_x, tile_y, tile_id);
        } else {
            debug!("left_click_without_tile_selection");
        }
    }

    fn handle_right_click(&mut self, input: &InputSnapshot, scene_world: &mut SceneWorld) {
        let Some(cursor) = input.cursor_position_px() else {
            return;
        };
        if self.gui.handle_click(cursor).is_some() {
            return;
        }

        let world_px = screen_to_world_px(scene_world.camera(), input.window_size(), cursor);
        let Some((tile_x, tile_y)) = tile_coords_of(world_px) else {
            return;
        };

        let selected_layer = self
            .world
            .selection
            .selected_tile
            .and_then(tile_def)
            .map(|def| def.layer);
        match selected_layer {
            Some(layer) => self.remove_tile(scene_world, tile_x, tile_y, layer),
            None => {
                // No selection: strip the topmost occupied layer.
                for layer in (0..TILE_LAYER_COUNT).rev() {
                    if self
                        .world
                        .active_map()
                        .tiles
                        .tile_at(tile_x, tile_y, layer)
                        .is_some()
                    {
                        self.remove_tile(scene_world, tile_x, tile_y, layer);
                        break;
                    }
                }
            }
        }
    }

    /// Moves the player from held actions and reports the portal target when
    /// the player ends the step on a portal tile.
    fn update_player(
        &mut self,
        fixed_dt_seconds: f32,
        input: &InputSnapshot,
        scene_world: &mut SceneWorld,
    ) -> Option<String> {
        let player_id = self.player_id?;
        let delta = movement_delta(input, fixed_dt_seconds, PLAYER_SPEED_PX_PER_SECOND);
        let bounds = self.world.active_map().bounds_px();
        let half_tile = TILE_SIZE_PX as f32 * 0.5;

        let player = scene_world.find_entity_mut(player_id)?;
        player.transform.position.x =
            (player.transform.position.x + delta.x).clamp(half_tile, bounds.0 - half_tile);
        player.transform.position.y =
            (player.transform.position.y + delta.y).clamp(half_tile, bounds.1 - half_tile);
        let position = player.transform.position;

        let (tile_x, tile_y) = tile_coords_of(position)?;
        self.world
            .active_map()
            .portal_at(tile_x, tile_y)
            .map(|portal| portal.target_map.clone())
    }

    fn update_npcs(&mut self, fixed_dt_seconds: f32, scene_world: &mut SceneWorld) {
        let player_position = self
            .player_id
            .and_then(|id| scene_world.find_entity(id))
            .map(|entity| entity.transform.position);

        let WorldState {
            npcs,
            maps,
            active_map,
            ..
        } = &mut self.world;
        let Some(map) = maps.get_mut(active_map.as_str()) else {
            return;
        };

        let mut departed = Vec::new();
        for (index, npc) in npcs.iter_mut().enumerate() {
            match npc.goal {
                NpcGoal::Approach => {
                    let Some(target) = player_position else {
                        continue;
                    };
                    if distance_sq(npc.position, target)
                        <= NPC_ARRIVE_DISTANCE_PX * NPC_ARRIVE_DISTANCE_PX
                    {
                        npc.goal = NpcGoal::Wait {
                            patience_seconds: NPC_PATIENCE_SECONDS,
                        };
                        continue;
                    }
                    let (next, _) = step_toward(
                        npc.position,
                        target,
                        NPC_SPEED_PX_PER_SECOND,
                        fixed_dt_seconds,
                        NPC_ARRIVE_DISTANCE_PX,
                    );
                    npc.position = next;
                }
                NpcGoal::Wait { patience_seconds } => {
                    let remaining = patience_seconds - fixed_dt_seconds;
                    if remaining > 0.0 {
                        npc.goal = NpcGoal::Wait {
                            patience_seconds: remaining,
                        };
                        continue;
                    }
                    if let Some(best) = nearest_animal_index(map, npc.position) {
                        let animal = map.animals.remove(best);
                        if let Some(id) = animal.entity {
                            scene_world.despawn(id);
                        }
                        info!(species = animal.species.name(), "animal_adopted");
                    }
                    departed.push(index);
                }
            }
        }

        for index in departed.into_iter().rev() {
            let npc = npcs.remove(index);
            if let Some(id) = npc.entity {
                scene_world.despawn(id);
            }
            info!("npc_departed");
        }
    }

    fn update_animals(&mut self, fixed_dt_seconds: f32) {
        let WorldState {
            maps, active_map, ..
        } = &mut self.world;
        let Some(map) = maps.get_mut(active_map.as_str()) else {
            return;
        };
        let bounds = (map.tiles.pixel_width(), map.tiles.pixel_height());
        for animal in &mut map.animals {
            update_animal_wander(animal, fixed_dt_seconds, bounds, &mut self.rng);
        }
    }

    fn sync_render_entities(&self, scene_world: &mut SceneWorld) {
        let map = self.world.active_map();
        for animal in &map.animals {
            if let Some(entity) = animal
                .entity
                .and_then(|id| scene_world.find_entity_mut(id))
            {
                entity.transform.position = animal.position;
            }
        }
        for npc in &self.world.npcs {
            if let Some(entity) = npc.entity.and_then(|id| scene_world.find_entity_mut(id)) {
                entity.transform.position = npc.position;
            }
        }
    }

    fn update_camera(&self, scene_world: &mut SceneWorld) {
        let Some(position) = self
            .player_id
            .and_then(|id| scene_world.find_entity(id))
            .map(|entity| entity.transform.position)
        else {
            return;
        };
        let bounds = self.world.active_map().bounds_px();
        scene_world.camera_mut().position =
            camera_position_for(position, bounds, self.last_window_size);
    }
}
