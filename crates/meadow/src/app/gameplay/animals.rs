#[derive(Debug, Error)]
#[error("map '{map}' already holds {count} animals (cap {cap})")]
struct AnimalCapacityError {
    map: String,
    count: usize,
    cap: usize,
}

/// Owns the catalog of adoptable species and creates live animals. The
/// per-map animal lists themselves live in `WorldState`.
#[derive(Debug)]
struct AnimalRegistry {
    catalog: Vec<AnimalSpecies>,
}

impl AnimalRegistry {
    fn new() -> Self {
        Self {
            catalog: AnimalSpecies::ALL.to_vec(),
        }
    }

    fn adoptable(&self) -> &[AnimalSpecies] {
        &self.catalog
    }

    fn spawn(&self, species: AnimalSpecies, position: Vec2, rng: &mut StdRng) -> Animal {
        Animal {
            species,
            position,
            wander: WanderState {
                direction: random_direction(rng),
                seconds_until_turn: rng.random_range(WANDER_MIN_SECONDS..WANDER_MAX_SECONDS),
            },
            entity: None,
        }
    }

    /// Registers a new animal on `map`, enforcing the per-map capacity.
    fn add_to_map(
        &self,
        map: &mut MapState,
        species: AnimalSpecies,
        position: Vec2,
        rng: &mut StdRng,
    ) -> Result<(), AnimalCapacityError> {
        if map.animals.len() >= MAX_ANIMALS_PER_MAP {
            return Err(AnimalCapacityError {
                map: map.name.clone(),
                count: map.animals.len(),
                cap: MAX_ANIMALS_PER_MAP,
            });
        }
        map.animals.push(self.spawn(species, position, rng));
        Ok(())
    }
}

fn random_direction(rng: &mut StdRng) -> Direction {
    Direction::ALL[rng.random_range(0..Direction::ALL.len())]
}

/// One wander step: walk the current direction at species speed, re-rolling
/// direction when the turn timer runs out, clamped to the map's pixel bounds.
fn update_animal_wander(
    animal: &mut Animal,
    fixed_dt_seconds: f32,
    bounds_px: (f32, f32),
    rng: &mut StdRng,
) {
    animal.wander.seconds_until_turn -= fixed_dt_seconds;
    if animal.wander.seconds_until_turn <= 0.0 {
        animal.wander.direction = random_direction(rng);
        animal.wander.seconds_until_turn =
            rng.random_range(WANDER_MIN_SECONDS..WANDER_MAX_SECONDS);
    }

    let speed = animal.species.params().speed_px_per_second;
    let step = animal.wander.direction.unit();
    let half_tile = TILE_SIZE_PX as f32 * 0.5;
    animal.position.x =
        (animal.position.x + step.x * speed * fixed_dt_seconds).clamp(half_tile, bounds_px.0 - half_tile);
    animal.position.y =
        (animal.position.y + step.y * speed * fixed_dt_seconds).clamp(half_tile, bounds_px.1 - half_tile);
}
