impl Scene for GameplayScene {
    fn load(&mut self, world: &mut SceneWorld) {
        self.maps_dir = match resolve_app_paths() {
            Ok(paths) => Some(paths.maps_dir),
            Err(error) => {
                warn!(error = %error, "app_paths_unresolved_using_builtin_maps");
                None
            }
        };

        let mut maps = BTreeMap::new();
        for name in [HOME_MAP_NAME, FOREST_MAP_NAME] {
            let map = load_or_default_map(self.maps_dir.as_deref(), name)
                .unwrap_or_else(|error| panic!("map '{name}' failed to load: {error}"));
            maps.insert(name.to_string(), map);
        }
        self.world = WorldState::new(maps, HOME_MAP_NAME);

        self.events = EventEngine::new();
        self.events
            .register(EventKind::NpcVisit, true)
            .expect("event kinds are registered once");

        let spawn = self.world.active_map().spawn_px();
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
        self.player_id = Some(player_id);

        world.set_tilemap(self.world.active_map().tiles.clone());
        self.spawn_animal_entities(world);
        world.camera_mut().position = spawn;
        world.apply_pending();

        self.gui = GuiOverlay::new();
        self.gui
            .refresh(&self.registry, &self.world, self.last_window_size);

        info!(
            map = %self.world.active_map,
            entity_count = world.entity_count(),
            animal_count = self.world.total_animal_count(),
            "gameplay_loaded"
        );
    }

    fn update(
        &mut self,
        fixed_dt_seconds: f32,
        input: &InputSnapshot,
        world: &mut SceneWorld,
    ) -> SceneCommand {
        self.last_window_size = input.window_size();

        if input.save_pressed() {
            match self.save_active_map() {
                Ok(path) => info!(path = %path.display(), "map_saved"),
                Err(error) => warn!(error = %error, "map_save_failed"),
            }
        }
        if input.hud_toggle_pressed() {
            self.gui.visible = !self.gui.visible;
            info!(visible = self.gui.visible, "hud_toggled");
        }
        if let Some(panel) = input.panel_select() {
            self.switch_top_panel(panel);
        }

        // Click intents queued by the input collector, applied before any
        // update pass touches the world.
        if input.left_click_pressed() {
            self.handle_left_click(input, world);
        }
        if input.right_click_pressed() {
            self.handle_right_click(input, world);
        }

        // Entities first: the player (and a possible portal hop), then the
        // visiting NPC.
        if let Some(target) = self.update_player(fixed_dt_seconds, input, world) {
            self.switch_map(world, &target);
        }
        self.update_npcs(fixed_dt_seconds, world);

        self.gui
            .refresh(&self.registry, &self.world, self.last_window_size);

        // Animal motion settles before event chances read the counts.
        self.update_animals(fixed_dt_seconds);

        if let Some(outcome) = self.events.tick(&mut self.world, &mut self.rng) {
            debug!(
                evaluated = outcome.evaluated,
                fired = outcome.fired.len(),
                "events_evaluated"
            );
            if !outcome.fired.is_empty() {
                self.spawn_npc_entities(world);
            }
        }

        self.sync_render_entities(world);
        self.update_camera(world);

        SceneCommand::None
    }

    fn unload(&mut self, _world: &mut SceneWorld) {
        for map in self.world.maps.values_mut() {
            for animal in &mut map.animals {
                animal.entity = None;
            }
        }
        self.world.npcs.clear();
        self.player_id = None;
        info!("gameplay_unloaded");
    }

    fn hud(&self, _world: &SceneWorld) -> HudFrame {
        self.gui.hud_frame(&self.world.selection)
    }

    fn debug_title(&self, _world: &SceneWorld) -> Option<String> {
        Some(format!(
            "Meadow - {} [{} animals]",
            self.world.active_map,
            self.world.total_animal_count()
        ))
    }
}
