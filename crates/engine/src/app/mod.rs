mod input;
mod loop_runner;
mod metrics;
mod rendering;
mod scene;

pub use input::{ActionStates, InputAction};
pub use loop_runner::{run_app, AppError, LoopConfig, SpriteSheetConfig, SLOW_FRAME_ENV_VAR};
pub use metrics::LoopMetricsSnapshot;
pub use rendering::{screen_to_world_px, world_to_screen_px, Renderer, Viewport};
pub use scene::{
    Camera2D, Entity, EntityId, HudButton, HudFrame, HudPanel, InputSnapshot, RectPx,
    RenderableDesc, RenderableKind, Scene, SceneCommand, SceneWorld, SheetId, SpriteRef, TileCell,
    Tilemap, TilemapError, Transform, Vec2,
};
