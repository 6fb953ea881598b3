/// Closed set of adoptable species. Per-species differences are data, not
/// types: see `params`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum AnimalSpecies {
    Mouse,
    Cat,
    Rabbit,
    Chicken,
    Butterfly,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct SpeciesParams {
    speed_px_per_second: f32,
    sprite_index: u16,
}

impl AnimalSpecies {
    const ALL: [AnimalSpecies; 5] = [
        AnimalSpecies::Mouse,
        AnimalSpecies::Cat,
        AnimalSpecies::Rabbit,
        AnimalSpecies::Chicken,
        AnimalSpecies::Butterfly,
    ];

    fn name(self) -> &'static str {
        match self {
            AnimalSpecies::Mouse => "mouse",
            AnimalSpecies::Cat => "cat",
            AnimalSpecies::Rabbit => "rabbit",
            AnimalSpecies::Chicken => "chicken",
            AnimalSpecies::Butterfly => "butterfly",
        }
    }

    fn params(self) -> SpeciesParams {
        match self {
            AnimalSpecies::Mouse => SpeciesParams {
                speed_px_per_second: 110.0,
                sprite_index: 2,
            },
            AnimalSpecies::Cat => SpeciesParams {
                speed_px_per_second: 90.0,
                sprite_index: 3,
            },
            AnimalSpecies::Rabbit => SpeciesParams {
                speed_px_per_second: 120.0,
                sprite_index: 4,
            },
            AnimalSpecies::Chicken => SpeciesParams {
                speed_px_per_second: 70.0,
                sprite_index: 5,
            },
            AnimalSpecies::Butterfly => SpeciesParams {
                speed_px_per_second: 140.0,
                sprite_index: 6,
            },
        }
    }

    fn sprite(self) -> SpriteRef {
        SpriteRef {
            sheet: SHEET_ACTORS,
            index: self.params().sprite_index,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    North,
    South,
    East,
    West,
}

impl Direction {
    const ALL: [Direction; 4] = [
        Direction::North,
        Direction::South,
        Direction::East,
        Direction::West,
    ];

    fn unit(self) -> Vec2 {
        match self {
            Direction::North => Vec2 { x: 0.0, y: -1.0 },
            Direction::South => Vec2 { x: 0.0, y: 1.0 },
            Direction::East => Vec2 { x: 1.0, y: 0.0 },
            Direction::West => Vec2 { x: -1.0, y: 0.0 },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct WanderState {
    direction: Direction,
    seconds_until_turn: f32,
}

impl Default for WanderState {
    fn default() -> Self {
        Self {
            direction: Direction::South,
            seconds_until_turn: 0.0,
        }
    }
}

/// A live animal. `entity` is the render mirror and is populated only while
/// the animal's map is active.
#[derive(Debug, Clone, PartialEq)]
struct Animal {
    species: AnimalSpecies,
    position: Vec2,
    wander: WanderState,
    entity: Option<EntityId>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum NpcGoal {
    Approach,
    Wait { patience_seconds: f32 },
}

/// A visiting character spawned by the event engine. NPCs exist only on the
/// active map and do not survive a map switch.
#[derive(Debug, Clone, PartialEq)]
struct Npc {
    position: Vec2,
    goal: NpcGoal,
    entity: Option<EntityId>,
}

impl Npc {
    fn new(position: Vec2) -> Self {
        Self {
            position,
            goal: NpcGoal::Approach,
            entity: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Portal {
    x: u32,
    y: u32,
    target_map: String,
}

#[derive(Debug, Clone, PartialEq)]
struct MapState {
    name: String,
    tiles: Tilemap,
    animals: Vec<Animal>,
    portals: Vec<Portal>,
    spawn_tile: (u32, u32),
}

impl MapState {
    fn bounds_px(&self) -> (f32, f32) {
        (self.tiles.pixel_width(), self.tiles.pixel_height())
    }

    fn spawn_px(&self) -> Vec2 {
        tile_center_px(self.spawn_tile.0, self.spawn_tile.1)
    }

    fn portal_to(&self, target_map: &str) -> Option<&Portal> {
        self.portals
            .iter()
            .find(|portal| portal.target_map == target_map)
    }

    fn portal_at(&self, x: u32, y: u32) -> Option<&Portal> {
        self.portals
            .iter()
            .find(|portal| portal.x == x && portal.y == y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct SelectionState {
    selected_tile: Option<u16>,
    selected_species: AnimalSpecies,
    selected_panel: u8,
}

impl Default for SelectionState {
    fn default() -> Self {
        Self {
            selected_tile: None,
            selected_species: AnimalSpecies::Mouse,
            selected_panel: 1,
        }
    }
}

/// The mutable aggregate everything simulates against. All mutation happens
/// from inside the tick's call chain; rendering only reads the mirrored
/// entities.
#[derive(Debug)]
struct WorldState {
    active_map: String,
    maps: BTreeMap<String, MapState>,
    npcs: Vec<Npc>,
    backpack: Option<AnimalSpecies>,
    selection: SelectionState,
}

impl WorldState {
    fn new(maps: BTreeMap<String, MapState>, active_map: &str) -> Self {
        debug_assert!(maps.contains_key(active_map));
        Self {
            active_map: active_map.to_string(),
            maps,
            npcs: Vec::new(),
            backpack: None,
            selection: SelectionState::default(),
        }
    }

    fn active_map(&self) -> &MapState {
        self.maps
            .get(&self.active_map)
            .expect("active map is always present")
    }

    fn active_map_mut(&mut self) -> &mut MapState {
        self.maps
            .get_mut(&self.active_map)
            .expect("active map is always present")
    }

    fn backpack_is_empty(&self) -> bool {
        self.backpack.is_none()
    }

    /// Animals across every map, active or not.
    fn total_animal_count(&self) -> usize {
        self.maps.values().map(|map| map.animals.len()).sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum GuiAction {
    SelectTile(Option<u16>),
    SelectSpecies(AnimalSpecies),
    PickUpAnimal(usize),
}
