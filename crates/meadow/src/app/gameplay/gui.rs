#[derive(Debug, Clone, Copy, PartialEq)]
struct GuiButton {
    rect: RectPx,
    sprite: Option<SpriteRef>,
    action: GuiAction,
}

#[derive(Debug, Clone, Default, PartialEq)]
struct GuiPanel {
    buttons: Vec<GuiButton>,
}

/// Screen-space button overlay: one top panel (tile palette page or the
/// adoptable-animals list) plus the owned-animals column on the right. The
/// overlay is queried before any world click handling; a hit consumes the
/// click.
#[derive(Debug, Default)]
struct GuiOverlay {
    visible: bool,
    panels: Vec<GuiPanel>,
}

impl GuiOverlay {
    fn new() -> Self {
        Self {
            visible: true,
            panels: Vec::new(),
        }
    }

    /// Rebuilds button layout from current world state. Cheap enough to run
    /// every tick; keeps the owned-animals column in sync with the list.
    fn refresh(&mut self, registry: &AnimalRegistry, world: &WorldState, window_size: (u32, u32)) {
        self.panels.clear();
        self.panels.push(build_top_panel(registry, world));
        self.panels.push(build_owned_animals_panel(world, window_size));
    }

    fn handle_click(&self, point: Vec2) -> Option<GuiAction> {
        if !self.visible {
            return None;
        }
        for panel in &self.panels {
            for button in &panel.buttons {
                if button.rect.contains(point.x, point.y) {
                    return Some(button.action);
                }
            }
        }
        None
    }

    fn hud_frame(&self, selection: &SelectionState) -> HudFrame {
        if !self.visible {
            return HudFrame::default();
        }
        HudFrame {
            panels: self
                .panels
                .iter()
                .map(|panel| HudPanel {
                    buttons: panel
                        .buttons
                        .iter()
                        .map(|button| HudButton {
                            rect: button.rect,
                            sprite: button.sprite,
                            selected: button_is_selected(button.action, selection),
                        })
                        .collect(),
                })
                .collect(),
        }
    }
}

fn button_is_selected(action: GuiAction, selection: &SelectionState) -> bool {
    match action {
        GuiAction::SelectTile(tile_id) => selection.selected_tile == tile_id,
        GuiAction::SelectSpecies(species) => selection.selected_species == species,
        GuiAction::PickUpAnimal(_) => false,
    }
}

fn top_panel_button_rect(index: usize) -> RectPx {
    RectPx {
        x: HUD_MARGIN_PX + index as i32 * (HUD_BUTTON_SIZE_PX as i32 + HUD_BUTTON_GAP_PX),
        y: HUD_MARGIN_PX,
        width: HUD_BUTTON_SIZE_PX,
        height: HUD_BUTTON_SIZE_PX,
    }
}

fn tile_page_count() -> u8 {
    TILE_CATALOG.len().div_ceil(TILE_PAGE_SIZE) as u8
}

fn build_top_panel(registry: &AnimalRegistry, world: &WorldState) -> GuiPanel {
    let mut buttons = Vec::new();
    if world.selection.selected_panel == ADOPTABLE_PANEL_ID {
        for (index, species) in registry.adoptable().iter().enumerate() {
            buttons.push(GuiButton {
                rect: top_panel_button_rect(index),
                sprite: Some(species.sprite()),
                action: GuiAction::SelectSpecies(*species),
            });
        }
    } else {
        let page_index = world.selection.selected_panel.saturating_sub(1) as usize;
        let start = page_index * TILE_PAGE_SIZE;
        let defs = TILE_CATALOG
            .iter()
            .skip(start)
            .take(TILE_PAGE_SIZE)
            .collect::<Vec<_>>();
        for (index, def) in defs.iter().enumerate() {
            buttons.push(GuiButton {
                rect: top_panel_button_rect(index),
                sprite: Some(SpriteRef {
                    sheet: SHEET_TILES,
                    index: def.id,
                }),
                action: GuiAction::SelectTile(Some(def.id)),
            });
        }
        // Trailing blank button deselects the tile (the eraser slot).
        buttons.push(GuiButton {
            rect: top_panel_button_rect(defs.len()),
            sprite: None,
            action: GuiAction::SelectTile(None),
        });
    }
    GuiPanel { buttons }
}

fn build_owned_animals_panel(world: &WorldState, window_size: (u32, u32)) -> GuiPanel {
    let x = window_size.0 as i32 - HUD_BUTTON_SIZE_PX as i32 - HUD_MARGIN_PX;
    let buttons = world
        .active_map()
        .animals
        .iter()
        .enumerate()
        .map(|(index, animal)| GuiButton {
            rect: RectPx {
                x,
                y: HUD_MARGIN_PX + index as i32 * (HUD_BUTTON_SIZE_PX as i32 + HUD_BUTTON_GAP_PX),
                width: HUD_BUTTON_SIZE_PX,
                height: HUD_BUTTON_SIZE_PX,
            },
            sprite: Some(animal.species.sprite()),
            action: GuiAction::PickUpAnimal(index),
        })
        .collect();
    GuiPanel { buttons }
}
