use super::input::{ActionStates, InputAction};
use thiserror::Error;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityId(pub u64);

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Transform {
    pub position: Vec2,
}

/// Camera position is the world-pixel point shown at the viewport center.
#[derive(Debug, Clone, Copy, Default)]
pub struct Camera2D {
    pub position: Vec2,
}

/// Index of a sprite sheet registered through `LoopConfig::sprite_sheets`,
/// in registration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SheetId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpriteRef {
    pub sheet: SheetId,
    pub index: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderableKind {
    Placeholder,
    Sprite(SpriteRef),
}

#[derive(Debug, Clone)]
pub struct RenderableDesc {
    pub kind: RenderableKind,
    pub debug_name: &'static str,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RectPx {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl RectPx {
    pub fn contains(&self, px: f32, py: f32) -> bool {
        let x = px.floor() as i32;
        let y = py.floor() as i32;
        x >= self.x
            && y >= self.y
            && x < self.x.saturating_add(self.width as i32)
            && y < self.y.saturating_add(self.height as i32)
    }
}

/// Screen-space HUD description produced by the scene each frame. The
/// renderer draws it verbatim after the world; it carries no behavior.
#[derive(Debug, Clone, Default)]
pub struct HudFrame {
    pub panels: Vec<HudPanel>,
}

#[derive(Debug, Clone, Default)]
pub struct HudPanel {
    pub buttons: Vec<HudButton>,
}

#[derive(Debug, Clone)]
pub struct HudButton {
    pub rect: RectPx,
    pub sprite: Option<SpriteRef>,
    pub selected: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneCommand {
    None,
    Quit,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct InputSnapshot {
    quit_requested: bool,
    actions: ActionStates,
    cursor_position_px: Option<Vec2>,
    left_click_pressed: bool,
    right_click_pressed: bool,
    save_pressed: bool,
    hud_toggle_pressed: bool,
    panel_select: Option<u8>,
    window_width: u32,
    window_height: u32,
}

impl InputSnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        quit_requested: bool,
        actions: ActionStates,
        cursor_position_px: Option<Vec2>,
        left_click_pressed: bool,
        right_click_pressed: bool,
        save_pressed: bool,
        hud_toggle_pressed: bool,
        panel_select: Option<u8>,
        window_width: u32,
        window_height: u32,
    ) -> Self {
        Self {
            quit_requested,
            actions,
            cursor_position_px,
            left_click_pressed,
            right_click_pressed,
            save_pressed,
            hud_toggle_pressed,
            panel_select,
            window_width,
            window_height,
        }
    }

    pub fn quit_requested(&self) -> bool {
        self.quit_requested
    }

    pub fn is_down(&self, action: InputAction) -> bool {
        self.actions.is_down(action)
    }

    pub fn cursor_position_px(&self) -> Option<Vec2> {
        self.cursor_position_px
    }

    pub fn left_click_pressed(&self) -> bool {
        self.left_click_pressed
    }

    pub fn right_click_pressed(&self) -> bool {
        self.right_click_pressed
    }

    pub fn save_pressed(&self) -> bool {
        self.save_pressed
    }

    pub fn hud_toggle_pressed(&self) -> bool {
        self.hud_toggle_pressed
    }

    pub fn panel_select(&self) -> Option<u8> {
        self.panel_select
    }

    pub fn window_size(&self) -> (u32, u32) {
        (self.window_width, self.window_height)
    }

    pub fn with_action_down(mut self, action: InputAction, is_down: bool) -> Self {
        self.actions.set(action, is_down);
        self
    }

    pub fn with_cursor_position_px(mut self, cursor_position_px: Option<Vec2>) -> Self {
        self.cursor_position_px = cursor_position_px;
        self
    }

    pub fn with_left_click_pressed(mut self, left_click_pressed: bool) -> Self {
        self.left_click_pressed = left_click_pressed;
        self
    }

    pub fn with_right_click_pressed(mut self, right_click_pressed: bool) -> Self {
        self.right_click_pressed = right_click_pressed;
        self
    }

    pub fn with_save_pressed(mut self, save_pressed: bool) -> Self {
        self.save_pressed = save_pressed;
        self
    }

    pub fn with_hud_toggle_pressed(mut self, hud_toggle_pressed: bool) -> Self {
        self.hud_toggle_pressed = hud_toggle_pressed;
        self
    }

    pub fn with_panel_select(mut self, panel_select: Option<u8>) -> Self {
        self.panel_select = panel_select;
        self
    }

    pub fn with_window_size(mut self, window_size: (u32, u32)) -> Self {
        self.window_width = window_size.0;
        self.window_height = window_size.1;
        self
    }
}

/// Layered tile grid. Cell values are sprite indices into `sheet`; an empty
/// cell is `None`. Layers draw in ascending order.
#[derive(Debug, Clone, PartialEq)]
pub struct Tilemap {
    width: u32,
    height: u32,
    tile_size_px: u32,
    sheet: SheetId,
    layers: Vec<Vec<Option<u16>>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TilemapError {
    #[error("tilemap dimensions must be non-zero: {width}x{height}")]
    ZeroDimension { width: u32, height: u32 },
    #[error("tilemap needs at least one layer")]
    NoLayers,
    #[error("tile size must be non-zero")]
    ZeroTileSize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileCell {
    pub x: u32,
    pub y: u32,
    pub layer: u8,
    pub tile_id: u16,
}

impl Tilemap {
    pub fn new(
        width: u32,
        height: u32,
        layer_count: u8,
        tile_size_px: u32,
        sheet: SheetId,
    ) -> Result<Self, TilemapError> {
        if width == 0 || height == 0 {
            return Err(TilemapError::ZeroDimension { width, height });
        }
        if layer_count == 0 {
            return Err(TilemapError::NoLayers);
        }
        if tile_size_px == 0 {
            return Err(TilemapError::ZeroTileSize);
        }
        let cells = width as usize * height as usize;
        Ok(Self {
            width,
            height,
            tile_size_px,
            sheet,
            layers: vec![vec![None; cells]; layer_count as usize],
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn layer_count(&self) -> u8 {
        self.layers.len() as u8
    }

    pub fn tile_size_px(&self) -> u32 {
        self.tile_size_px
    }

    pub fn sheet(&self) -> SheetId {
        self.sheet
    }

    pub fn pixel_width(&self) -> f32 {
        (self.width * self.tile_size_px) as f32
    }

    pub fn pixel_height(&self) -> f32 {
        (self.height * self.tile_size_px) as f32
    }

    pub fn in_bounds(&self, x: u32, y: u32) -> bool {
        x < self.width && y < self.height
    }

    fn index_of(&self, x: u32, y: u32) -> Option<usize> {
        if !self.in_bounds(x, y) {
            return None;
        }
        Some(y as usize * self.width as usize + x as usize)
    }

    /// Returns false when the coordinate or layer is out of range.
    pub fn set_tile(&mut self, x: u32, y: u32, layer: u8, tile_id: u16) -> bool {
        let Some(index) = self.index_of(x, y) else {
            return false;
        };
        let Some(cells) = self.layers.get_mut(layer as usize) else {
            return false;
        };
        cells[index] = Some(tile_id);
        true
    }

    pub fn tile_at(&self, x: u32, y: u32, layer: u8) -> Option<u16> {
        let index = self.index_of(x, y)?;
        self.layers.get(layer as usize)?.get(index).copied()?
    }

    /// Clears the cell and returns the removed tile id, if any.
    pub fn remove_tile(&mut self, x: u32, y: u32, layer: u8) -> Option<u16> {
        let index = self.index_of(x, y)?;
        let cells = self.layers.get_mut(layer as usize)?;
        cells.get_mut(index)?.take()
    }

    /// Occupied cells in layer-major, row-major order. Used by map saving.
    pub fn occupied_cells(&self) -> Vec<TileCell> {
        let mut cells = Vec::new();
        for (layer, layer_cells) in self.layers.iter().enumerate() {
            for (index, cell) in layer_cells.iter().enumerate() {
                if let Some(tile_id) = *cell {
                    cells.push(TileCell {
                        x: (index % self.width as usize) as u32,
                        y: (index / self.width as usize) as u32,
                        layer: layer as u8,
                        tile_id,
                    });
                }
            }
        }
        cells
    }
}

#[derive(Debug, Clone)]
pub struct Entity {
    pub id: EntityId,
    pub transform: Transform,
    pub renderable: RenderableDesc,
    pub active: bool,
}

#[derive(Debug, Default)]
pub struct EntityIdAllocator {
    next: u64,
}

impl EntityIdAllocator {
    pub fn allocate(&mut self) -> EntityId {
        let id = EntityId(self.next);
        self.next = self.next.saturating_add(1);
        id
    }
}

/// Entity store for one running scene. Spawns and despawns requested during
/// an update pass are queued and take effect only at `apply_pending`, so no
/// list is mutated while it is being iterated.
#[derive(Debug, Default)]
pub struct SceneWorld {
    allocator: EntityIdAllocator,
    entities: Vec<Entity>,
    pending_spawns: Vec<Entity>,
    pending_despawns: Vec<EntityId>,
    camera: Camera2D,
    tilemap: Option<Tilemap>,
}

impl SceneWorld {
    pub fn spawn(&mut self, transform: Transform, renderable: RenderableDesc) -> EntityId {
        let id = self.allocator.allocate();
        self.pending_spawns.push(Entity {
            id,
            transform,
            renderable,
            active: true,
        });
        id
    }

    pub fn despawn(&mut self, id: EntityId) -> bool {
        let exists_now = self.entities.iter().any(|entity| entity.id == id);
        let pending_spawn = self.pending_spawns.iter().any(|entity| entity.id == id);
        if !exists_now && !pending_spawn {
            return false;
        }
        self.pending_despawns.push(id);
        true
    }

    pub fn apply_pending(&mut self) {
        if !self.pending_despawns.is_empty() {
            self.pending_despawns.sort_by_key(|id| id.0);
            self.pending_despawns.dedup();
            let pending = &self.pending_despawns;
            self.entities.retain(|entity| {
                pending
                    .binary_search_by_key(&entity.id.0, |id| id.0)
                    .is_err()
            });
            self.pending_spawns.retain(|entity| {
                pending
                    .binary_search_by_key(&entity.id.0, |id| id.0)
                    .is_err()
            });
            self.pending_despawns.clear();
        }

        if !self.pending_spawns.is_empty() {
            self.entities.append(&mut self.pending_spawns);
        }
    }

    pub fn clear(&mut self) {
        self.entities.clear();
        self.pending_spawns.clear();
        self.pending_despawns.clear();
        self.camera = Camera2D::default();
        self.tilemap = None;
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn entities_mut(&mut self) -> &mut [Entity] {
        &mut self.entities
    }

    pub fn find_entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.iter().find(|entity| entity.id == id)
    }

    pub fn find_entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.iter_mut().find(|entity| entity.id == id)
    }

    pub fn camera(&self) -> &Camera2D {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut Camera2D {
        &mut self.camera
    }

    pub fn set_tilemap(&mut self, tilemap: Tilemap) {
        self.tilemap = Some(tilemap);
    }

    pub fn tilemap(&self) -> Option<&Tilemap> {
        self.tilemap.as_ref()
    }

    pub fn tilemap_mut(&mut self) -> Option<&mut Tilemap> {
        self.tilemap.as_mut()
    }

    pub fn clear_tilemap(&mut self) {
        self.tilemap = None;
    }
}

pub trait Scene {
    fn load(&mut self, world: &mut SceneWorld);
    fn update(
        &mut self,
        fixed_dt_seconds: f32,
        input: &InputSnapshot,
        world: &mut SceneWorld,
    ) -> SceneCommand;
    fn unload(&mut self, world: &mut SceneWorld);
    fn hud(&self, _world: &SceneWorld) -> HudFrame {
        HudFrame::default()
    }
    fn debug_title(&self, _world: &SceneWorld) -> Option<String> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn placeholder(debug_name: &'static str) -> RenderableDesc {
        RenderableDesc {
            kind: RenderableKind::Placeholder,
            debug_name,
        }
    }

    fn make_tilemap(width: u32, height: u32, layers: u8) -> Tilemap {
        Tilemap::new(width, height, layers, 32, SheetId(0)).expect("tilemap")
    }

    #[test]
    fn allocator_never_reuses_ids() {
        let mut allocator = EntityIdAllocator::default();
        assert_eq!(allocator.allocate().0, 0);
        assert_eq!(allocator.allocate().0, 1);
        assert_eq!(allocator.allocate().0, 2);
    }

    #[test]
    fn spawn_is_not_visible_until_apply_pending() {
        let mut world = SceneWorld::default();
        let id = world.spawn(Transform::default(), placeholder("spawned"));
        assert_eq!(world.entity_count(), 0);
        assert!(world.find_entity(id).is_none());

        world.apply_pending();
        assert_eq!(world.entity_count(), 1);
        assert!(world.find_entity(id).is_some());
    }

    #[test]
    fn despawn_takes_effect_only_at_apply_pending() {
        let mut world = SceneWorld::default();
        let id = world.spawn(Transform::default(), placeholder("doomed"));
        world.apply_pending();

        assert!(world.despawn(id));
        assert_eq!(world.entity_count(), 1);
        world.apply_pending();
        assert_eq!(world.entity_count(), 0);
    }

    #[test]
    fn duplicate_pending_despawns_are_idempotent() {
        let mut world = SceneWorld::default();
        let doomed = world.spawn(Transform::default(), placeholder("doomed"));
        let survivor = world.spawn(
            Transform {
                position: Vec2 { x: 64.0, y: 32.0 },
            },
            placeholder("survivor"),
        );
        world.apply_pending();

        assert!(world.despawn(doomed));
        assert!(world.despawn(doomed));
        world.apply_pending();

        assert_eq!(world.entity_count(), 1);
        assert!(world.find_entity(doomed).is_none());
        assert!(world.find_entity(survivor).is_some());
    }

    #[test]
    fn despawn_of_still_pending_spawn_cancels_it() {
        let mut world = SceneWorld::default();
        let id = world.spawn(Transform::default(), placeholder("never_lands"));
        assert!(world.despawn(id));
        world.apply_pending();
        assert_eq!(world.entity_count(), 0);
    }

    #[test]
    fn despawn_of_unknown_id_is_rejected() {
        let mut world = SceneWorld::default();
        assert!(!world.despawn(EntityId(99)));
    }

    #[test]
    fn clear_resets_entities_camera_and_tilemap() {
        let mut world = SceneWorld::default();
        world.spawn(Transform::default(), placeholder("entity"));
        world.apply_pending();
        world.camera_mut().position = Vec2 { x: 10.0, y: 20.0 };
        world.set_tilemap(make_tilemap(4, 4, 2));

        world.clear();
        assert_eq!(world.entity_count(), 0);
        assert_eq!(world.camera().position, Vec2::default());
        assert!(world.tilemap().is_none());
    }

    #[test]
    fn tilemap_rejects_degenerate_shapes() {
        assert_eq!(
            Tilemap::new(0, 4, 1, 32, SheetId(0)).expect_err("zero width"),
            TilemapError::ZeroDimension {
                width: 0,
                height: 4
            }
        );
        assert_eq!(
            Tilemap::new(4, 4, 0, 32, SheetId(0)).expect_err("no layers"),
            TilemapError::NoLayers
        );
        assert_eq!(
            Tilemap::new(4, 4, 1, 0, SheetId(0)).expect_err("zero tile"),
            TilemapError::ZeroTileSize
        );
    }

    #[test]
    fn tilemap_set_get_remove_per_layer() {
        let mut tilemap = make_tilemap(3, 3, 3);
        assert!(tilemap.set_tile(1, 2, 0, 7));
        assert!(tilemap.set_tile(1, 2, 1, 9));

        assert_eq!(tilemap.tile_at(1, 2, 0), Some(7));
        assert_eq!(tilemap.tile_at(1, 2, 1), Some(9));
        assert_eq!(tilemap.tile_at(1, 2, 2), None);

        assert_eq!(tilemap.remove_tile(1, 2, 1), Some(9));
        assert_eq!(tilemap.tile_at(1, 2, 1), None);
        assert_eq!(tilemap.tile_at(1, 2, 0), Some(7));
    }

    #[test]
    fn tilemap_out_of_range_access_is_rejected() {
        let mut tilemap = make_tilemap(2, 2, 1);
        assert!(!tilemap.set_tile(2, 0, 0, 1));
        assert!(!tilemap.set_tile(0, 2, 0, 1));
        assert!(!tilemap.set_tile(0, 0, 1, 1));
        assert_eq!(tilemap.tile_at(2, 2, 0), None);
        assert_eq!(tilemap.remove_tile(0, 0, 3), None);
        assert_eq!(tilemap.remove_tile(0, 0, 0), None);
    }

    #[test]
    fn occupied_cells_reports_layer_major_row_major_order() {
        let mut tilemap = make_tilemap(2, 2, 2);
        tilemap.set_tile(1, 1, 1, 5);
        tilemap.set_tile(0, 0, 0, 3);
        tilemap.set_tile(1, 0, 0, 4);

        let cells = tilemap.occupied_cells();
        assert_eq!(
            cells,
            vec![
                TileCell {
                    x: 0,
                    y: 0,
                    layer: 0,
                    tile_id: 3
                },
                TileCell {
                    x: 1,
                    y: 0,
                    layer: 0,
                    tile_id: 4
                },
                TileCell {
                    x: 1,
                    y: 1,
                    layer: 1,
                    tile_id: 5
                },
            ]
        );
    }

    #[test]
    fn rect_contains_is_half_open() {
        let rect = RectPx {
            x: 10,
            y: 10,
            width: 20,
            height: 20,
        };
        assert!(rect.contains(10.0, 10.0));
        assert!(rect.contains(29.9, 29.9));
        assert!(!rect.contains(30.0, 10.0));
        assert!(!rect.contains(9.9, 10.0));
    }

    #[test]
    fn input_snapshot_builders_round_trip() {
        let snapshot = InputSnapshot::empty()
            .with_action_down(InputAction::MoveLeft, true)
            .with_cursor_position_px(Some(Vec2 { x: 5.0, y: 6.0 }))
            .with_left_click_pressed(true)
            .with_panel_select(Some(2))
            .with_window_size((640, 480));

        assert!(snapshot.is_down(InputAction::MoveLeft));
        assert!(!snapshot.is_down(InputAction::MoveRight));
        assert!(snapshot.left_click_pressed());
        assert!(!snapshot.right_click_pressed());
        assert_eq!(snapshot.panel_select(), Some(2));
        assert_eq!(snapshot.window_size(), (640, 480));
        let cursor = snapshot.cursor_position_px().expect("cursor");
        assert!((cursor.x - 5.0).abs() < 0.0001);
    }
}
