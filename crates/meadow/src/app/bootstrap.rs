use engine::{resolve_app_paths, AppError, LoopConfig, Scene, SpriteSheetConfig};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use super::gameplay;

const TILE_SHEET_FILE: &str = "img/tiles.png";
const ACTOR_SHEET_FILE: &str = "img/actors.png";
const SHEET_TILE_SIZE_PX: u32 = 32;

pub(crate) struct AppWiring {
    pub(crate) config: LoopConfig,
    pub(crate) scene: Box<dyn Scene>,
}

pub(crate) fn build_app() -> Result<AppWiring, AppError> {
    init_tracing();
    info!("=== Meadow Startup ===");

    let app_paths = resolve_app_paths()?;
    info!(
        root = %app_paths.root.display(),
        assets_dir = %app_paths.assets_dir.display(),
        maps_dir = %app_paths.maps_dir.display(),
        "startup"
    );

    let config = LoopConfig {
        sprite_sheets: sheet_configs(&app_paths.assets_dir),
        ..LoopConfig::default()
    };
    let scene = gameplay::build_scene();

    Ok(AppWiring { config, scene })
}

/// Sheets are registered in `SheetId` order: tiles first, then actors. A
/// missing file downgrades to placeholder rendering instead of configuring a
/// sheet the loader would reject at startup.
fn sheet_configs(assets_dir: &std::path::Path) -> Vec<SpriteSheetConfig> {
    let tiles_path = assets_dir.join(TILE_SHEET_FILE);
    let actors_path = assets_dir.join(ACTOR_SHEET_FILE);
    if !tiles_path.is_file() || !actors_path.is_file() {
        warn!(
            tiles = %tiles_path.display(),
            actors = %actors_path.display(),
            "sprite sheets not found; running with placeholder rendering"
        );
        return Vec::new();
    }

    vec![
        SpriteSheetConfig {
            path: tiles_path,
            tile_width: SHEET_TILE_SIZE_PX,
            tile_height: SHEET_TILE_SIZE_PX,
            margin: 0,
        },
        SpriteSheetConfig {
            path: actors_path,
            tile_width: SHEET_TILE_SIZE_PX,
            tile_height: SHEET_TILE_SIZE_PX,
            margin: 0,
        },
    ]
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}
