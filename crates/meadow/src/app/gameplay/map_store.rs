#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct TileDef {
    id: u16,
    name: &'static str,
    layer: u8,
}

/// Placeable tiles. Ids double as sprite indices into the tile sheet; each
/// tile belongs to exactly one layer.
const TILE_CATALOG: [TileDef; 12] = [
    TileDef { id: 0, name: "grass", layer: 0 },
    TileDef { id: 1, name: "dirt", layer: 0 },
    TileDef { id: 2, name: "water", layer: 0 },
    TileDef { id: 3, name: "sand", layer: 0 },
    TileDef { id: 4, name: "flowers", layer: 1 },
    TileDef { id: 5, name: "bush", layer: 1 },
    TileDef { id: 6, name: "fence", layer: 1 },
    TileDef { id: 7, name: "stone", layer: 1 },
    TileDef { id: 8, name: "stump", layer: 1 },
    TileDef { id: 9, name: "treetop", layer: 2 },
    TileDef { id: 10, name: "vines", layer: 2 },
    TileDef { id: 11, name: "roof", layer: 2 },
];

fn tile_def(tile_id: u16) -> Option<&'static TileDef> {
    TILE_CATALOG.iter().find(|def| def.id == tile_id)
}

#[derive(Debug, Error)]
enum MapStoreError {
    #[error("read map file '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parse map json at {json_path}: {detail}")]
    Parse { json_path: String, detail: String },
    #[error("map validation failed at {path}: {message}")]
    Validate { path: String, message: String },
    #[error("encode map json: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("write map file '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("maps directory is not available")]
    NoMapsDir,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
enum SavedSpecies {
    Mouse,
    Cat,
    Rabbit,
    Chicken,
    Butterfly,
}

impl SavedSpecies {
    fn from_species(species: AnimalSpecies) -> Self {
        match species {
            AnimalSpecies::Mouse => Self::Mouse,
            AnimalSpecies::Cat => Self::Cat,
            AnimalSpecies::Rabbit => Self::Rabbit,
            AnimalSpecies::Chicken => Self::Chicken,
            AnimalSpecies::Butterfly => Self::Butterfly,
        }
    }

    fn to_species(self) -> AnimalSpecies {
        match self {
            Self::Mouse => AnimalSpecies::Mouse,
            Self::Cat => AnimalSpecies::Cat,
            Self::Rabbit => AnimalSpecies::Rabbit,
            Self::Chicken => AnimalSpecies::Chicken,
            Self::Butterfly => AnimalSpecies::Butterfly,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
struct SavedPoint {
    x: u32,
    y: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
struct SavedTileCell {
    x: u32,
    y: u32,
    layer: u8,
    tile_id: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct SavedPortal {
    x: u32,
    y: u32,
    target_map: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
struct SavedAnimal {
    species: SavedSpecies,
    x: f32,
    y: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct SavedMap {
    map_version: u32,
    name: String,
    width: u32,
    height: u32,
    spawn: SavedPoint,
    tiles: Vec<SavedTileCell>,
    #[serde(default)]
    portals: Vec<SavedPortal>,
    #[serde(default)]
    animals: Vec<SavedAnimal>,
}

fn map_file_path(maps_dir: &Path, name: &str) -> PathBuf {
    maps_dir.join(format!("{name}.json"))
}

fn load_map(path: &Path) -> Result<MapState, MapStoreError> {
    let raw = std::fs::read_to_string(path).map_err(|source| MapStoreError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let saved = parse_map_json(&raw)?;
    validate_saved_map(&saved)?;
    saved_to_map_state(saved)
}

fn save_map(path: &Path, map: &MapState) -> Result<(), MapStoreError> {
    let saved = map_to_saved(map);
    let json = serde_json::to_string_pretty(&saved).map_err(MapStoreError::Encode)?;
    engine::write_text_atomic(path, &json).map_err(|source| MapStoreError::Write {
        path: path.to_path_buf(),
        source,
    })
}

fn parse_map_json(raw: &str) -> Result<SavedMap, MapStoreError> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    match serde_path_to_error::deserialize::<_, SavedMap>(&mut deserializer) {
        Ok(saved) => Ok(saved),
        Err(error) => {
            let json_path = error.path().to_string();
            let detail = error.into_inner().to_string();
            let json_path = if json_path.is_empty() || json_path == "." {
                "<root>".to_string()
            } else {
                json_path
            };
            Err(MapStoreError::Parse { json_path, detail })
        }
    }
}

fn validation_err(path: &str, message: impl Into<String>) -> MapStoreError {
    MapStoreError::Validate {
        path: path.to_string(),
        message: message.into(),
    }
}

fn validate_saved_map(saved: &SavedMap) -> Result<(), MapStoreError> {
    if saved.map_version != MAP_FILE_VERSION {
        return Err(validation_err(
            "map_version",
            format!("expected {MAP_FILE_VERSION}, got {}", saved.map_version),
        ));
    }
    if saved.name.is_empty() {
        return Err(validation_err("name", "map name must not be empty"));
    }
    if saved.width == 0 || saved.height == 0 {
        return Err(validation_err(
            "width",
            format!("map must be non-empty, got {}x{}", saved.width, saved.height),
        ));
    }
    if saved.spawn.x >= saved.width || saved.spawn.y >= saved.height {
        return Err(validation_err(
            "spawn",
            format!(
                "spawn ({}, {}) is outside the {}x{} map",
                saved.spawn.x, saved.spawn.y, saved.width, saved.height
            ),
        ));
    }

    for (index, cell) in saved.tiles.iter().enumerate() {
        let path = format!("tiles[{index}]");
        if cell.x >= saved.width || cell.y >= saved.height {
            return Err(validation_err(
                &path,
                format!("cell ({}, {}) is out of bounds", cell.x, cell.y),
            ));
        }
        if cell.layer >= TILE_LAYER_COUNT {
            return Err(validation_err(
                &path,
                format!("layer {} exceeds layer count {TILE_LAYER_COUNT}", cell.layer),
            ));
        }
        let Some(def) = tile_def(cell.tile_id) else {
            return Err(validation_err(
                &path,
                format!("unknown tile id {}", cell.tile_id),
            ));
        };
        if def.layer != cell.layer {
            return Err(validation_err(
                &path,
                format!(
                    "tile '{}' belongs to layer {}, saved on layer {}",
                    def.name, def.layer, cell.layer
                ),
            ));
        }
    }

    for (index, portal) in saved.portals.iter().enumerate() {
        let path = format!("portals[{index}]");
        if portal.x >= saved.width || portal.y >= saved.height {
            return Err(validation_err(
                &path,
                format!("portal ({}, {}) is out of bounds", portal.x, portal.y),
            ));
        }
        if portal.target_map.is_empty() {
            return Err(validation_err(&path, "portal target map must not be empty"));
        }
    }

    if saved.animals.len() > MAX_ANIMALS_PER_MAP {
        return Err(validation_err(
            "animals",
            format!(
                "{} animals exceed the per-map cap of {MAX_ANIMALS_PER_MAP}",
                saved.animals.len()
            ),
        ));
    }
    let bounds_x = (saved.width * TILE_SIZE_PX) as f32;
    let bounds_y = (saved.height * TILE_SIZE_PX) as f32;
    for (index, animal) in saved.animals.iter().enumerate() {
        let path = format!("animals[{index}]");
        if !animal.x.is_finite() || !animal.y.is_finite() {
            return Err(validation_err(&path, "position must be finite"));
        }
        if animal.x < 0.0 || animal.y < 0.0 || animal.x > bounds_x || animal.y > bounds_y {
            return Err(validation_err(
                &path,
                format!("position ({}, {}) is outside the map", animal.x, animal.y),
            ));
        }
    }

    Ok(())
}

fn saved_to_map_state(saved: SavedMap) -> Result<MapState, MapStoreError> {
    let mut tiles = Tilemap::new(
        saved.width,
        saved.height,
        TILE_LAYER_COUNT,
        TILE_SIZE_PX,
        SHEET_TILES,
    )
    .map_err(|error| validation_err("tiles", error.to_string()))?;
    for cell in &saved.tiles {
        tiles.set_tile(cell.x, cell.y, cell.layer, cell.tile_id);
    }

    let animals = saved
        .animals
        .iter()
        .map(|animal| Animal {
            species: animal.species.to_species(),
            position: Vec2 {
                x: animal.x,
                y: animal.y,
            },
            wander: WanderState::default(),
            entity: None,
        })
        .collect();

    let portals = saved
        .portals
        .into_iter()
        .map(|portal| Portal {
            x: portal.x,
            y: portal.y,
            target_map: portal.target_map,
        })
        .collect();

    Ok(MapState {
        name: saved.name,
        tiles,
        animals,
        portals,
        spawn_tile: (saved.spawn.x, saved.spawn.y),
    })
}

fn map_to_saved(map: &MapState) -> SavedMap {
    SavedMap {
        map_version: MAP_FILE_VERSION,
        name: map.name.clone(),
        width: map.tiles.width(),
        height: map.tiles.height(),
        spawn: SavedPoint {
            x: map.spawn_tile.0,
            y: map.spawn_tile.1,
        },
        tiles: map
            .tiles
            .occupied_cells()
            .into_iter()
            .map(|cell| SavedTileCell {
                x: cell.x,
                y: cell.y,
                layer: cell.layer,
                tile_id: cell.tile_id,
            })
            .collect(),
        portals: map
            .portals
            .iter()
            .map(|portal| SavedPortal {
                x: portal.x,
                y: portal.y,
                target_map: portal.target_map.clone(),
            })
            .collect(),
        animals: map
            .animals
            .iter()
            .map(|animal| SavedAnimal {
                species: SavedSpecies::from_species(animal.species),
                x: animal.position.x,
                y: animal.position.y,
            })
            .collect(),
    }
}

fn load_or_default_map(maps_dir: Option<&Path>, name: &str) -> Result<MapState, MapStoreError> {
    if let Some(dir) = maps_dir {
        let path = map_file_path(dir, name);
        if path.is_file() {
            return load_map(&path);
        }
    }
    Ok(default_map(name))
}

fn default_map(name: &str) -> MapState {
    match name {
        FOREST_MAP_NAME => build_forest_map(),
        _ => build_home_map(),
    }
}

fn default_world() -> BTreeMap<String, MapState> {
    let mut maps = BTreeMap::new();
    maps.insert(HOME_MAP_NAME.to_string(), build_home_map());
    maps.insert(FOREST_MAP_NAME.to_string(), build_forest_map());
    maps
}

fn empty_tilemap(width: u32, height: u32) -> Tilemap {
    Tilemap::new(width, height, TILE_LAYER_COUNT, TILE_SIZE_PX, SHEET_TILES)
        .expect("built-in map shapes are valid")
}

fn build_home_map() -> MapState {
    let width = 24;
    let height = 18;
    let mut tiles = empty_tilemap(width, height);
    for y in 0..height {
        for x in 0..width {
            tiles.set_tile(x, y, 0, 0);
        }
    }
    // Dirt path toward the forest portal, a pond, and some greenery.
    for x in 12..width {
        tiles.set_tile(x, 9, 0, 1);
    }
    for y in 3..6 {
        for x in 4..8 {
            tiles.set_tile(x, y, 0, 2);
        }
    }
    for (x, y) in [(3, 12), (7, 14), (15, 4), (18, 13), (10, 6)] {
        tiles.set_tile(x, y, 1, 4);
    }
    for (x, y) in [(2, 2), (20, 3), (16, 15)] {
        tiles.set_tile(x, y, 1, 5);
    }

    MapState {
        name: HOME_MAP_NAME.to_string(),
        tiles,
        animals: vec![
            Animal {
                species: AnimalSpecies::Cat,
                position: tile_center_px(9, 11),
                wander: WanderState::default(),
                entity: None,
            },
            Animal {
                species: AnimalSpecies::Mouse,
                position: tile_center_px(14, 6),
                wander: WanderState::default(),
                entity: None,
            },
        ],
        portals: vec![Portal {
            x: width - 1,
            y: 9,
            target_map: FOREST_MAP_NAME.to_string(),
        }],
        spawn_tile: (width / 2, height / 2),
    }
}

fn build_forest_map() -> MapState {
    let width = 20;
    let height = 16;
    let mut tiles = empty_tilemap(width, height);
    for y in 0..height {
        for x in 0..width {
            tiles.set_tile(x, y, 0, 0);
        }
    }
    for x in 0..8 {
        tiles.set_tile(x, 8, 0, 1);
    }
    for (x, y) in [(5, 2), (9, 5), (13, 10), (3, 13), (17, 3), (11, 14)] {
        tiles.set_tile(x, y, 1, 5);
        tiles.set_tile(x, y, 2, 9);
    }
    for (x, y) in [(7, 9), (15, 6)] {
        tiles.set_tile(x, y, 1, 8);
    }

    MapState {
        name: FOREST_MAP_NAME.to_string(),
        tiles,
        animals: Vec::new(),
        portals: vec![Portal {
            x: 0,
            y: 8,
            target_map: HOME_MAP_NAME.to_string(),
        }],
        spawn_tile: (width / 2, height / 2),
    }
}
