use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use engine::{
    resolve_app_paths, screen_to_world_px, EntityId, HudButton, HudFrame, HudPanel, InputAction,
    InputSnapshot, RectPx, RenderableDesc, RenderableKind, Scene, SceneCommand, SceneWorld,
    SheetId, SpriteRef, Tilemap, Transform, Vec2,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

const TILE_SIZE_PX: u32 = 32;
const TILE_LAYER_COUNT: u8 = 3;
const SHEET_TILES: SheetId = SheetId(0);
const SHEET_ACTORS: SheetId = SheetId(1);
const PLAYER_SPRITE_INDEX: u16 = 0;
const NPC_SPRITE_INDEX: u16 = 1;

const MAX_ANIMALS_PER_MAP: usize = 10;
const CHANCE_SCALE: i32 = 100;
const EVENT_EVAL_INTERVAL_TICKS: u32 = 60;

const PLAYER_SPEED_PX_PER_SECOND: f32 = 160.0;
const NPC_SPEED_PX_PER_SECOND: f32 = 96.0;
const NPC_ARRIVE_DISTANCE_PX: f32 = 48.0;
const NPC_PATIENCE_SECONDS: f32 = 6.0;
const WANDER_MIN_SECONDS: f32 = 0.5;
const WANDER_MAX_SECONDS: f32 = 2.5;

const MAP_FILE_VERSION: u32 = 1;
const HOME_MAP_NAME: &str = "meadow";
const FOREST_MAP_NAME: &str = "forest";

const HUD_BUTTON_SIZE_PX: u32 = 40;
const HUD_BUTTON_GAP_PX: i32 = 4;
const HUD_MARGIN_PX: i32 = 8;
const TILE_PAGE_SIZE: usize = 10;
const ADOPTABLE_PANEL_ID: u8 = 0;

include!("types.rs");
include!("animals.rs");
include!("events.rs");
include!("map_store.rs");
include!("gui.rs");
include!("scene_state.rs");
include!("scene_impl.rs");
include!("util.rs");

pub(crate) fn build_scene() -> Box<dyn Scene> {
    Box::new(GameplayScene::new())
}
