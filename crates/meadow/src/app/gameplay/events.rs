#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum EventKind {
    NpcVisit,
}

impl EventKind {
    fn name(self) -> &'static str {
        match self {
            EventKind::NpcVisit => "npc_visit",
        }
    }
}

#[derive(Debug, Error)]
#[error("event kind '{}' is already registered", .0.name())]
struct DuplicateEventError(EventKind);

#[derive(Debug, Error)]
enum EventEffectError {
    #[error("an npc is already visiting map '{0}'")]
    NpcAlreadyPresent(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct EventState {
    kind: EventKind,
    repeatable: bool,
    happened: bool,
    chance: i32,
}

/// Live world readings the chance formulas run against, captured fresh for
/// every evaluation. The NPC gate reads the current NPC list while the
/// animal term sums across all maps; that asymmetry is intentional.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct WorldSignals {
    npc_present: bool,
    total_animals: usize,
    backpack_empty: bool,
}

impl WorldSignals {
    fn capture(world: &WorldState) -> Self {
        Self {
            npc_present: !world.npcs.is_empty(),
            total_animals: world.total_animal_count(),
            backpack_empty: world.backpack_is_empty(),
        }
    }
}

/// Recomputed every cycle; never carried over. A non-positive result can
/// never fire. A one-shot event that has fired stays at zero forever.
fn calculate_chance(
    kind: EventKind,
    repeatable: bool,
    happened: bool,
    signals: &WorldSignals,
) -> i32 {
    if !repeatable && happened {
        return 0;
    }

    match kind {
        EventKind::NpcVisit => {
            if signals.npc_present {
                return 0;
            }
            let mut chance = 0;
            if happened {
                chance -= 1;
            }
            chance += signals.total_animals as i32;
            chance += if signals.backpack_empty { 1 } else { -1 };
            chance
        }
    }
}

/// `chance` is a percent-style weight: one uniform roll in
/// `[0, CHANCE_SCALE)` per event per cycle, fire iff the roll lands below it.
fn accepts(chance: i32, roll: i32) -> bool {
    chance > 0 && roll < chance
}

fn apply_effect(kind: EventKind, world: &mut WorldState) -> Result<(), EventEffectError> {
    match kind {
        EventKind::NpcVisit => {
            if !world.npcs.is_empty() {
                return Err(EventEffectError::NpcAlreadyPresent(world.active_map.clone()));
            }
            let spawn = world.active_map().spawn_px();
            world.npcs.push(Npc::new(spawn));
            info!(map = %world.active_map, "npc_arrived");
            Ok(())
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct EventOutcome {
    evaluated: usize,
    fired: Vec<EventKind>,
}

/// Decides once per evaluation cycle whether each registered event fires,
/// and applies the effects of those that do. Event state lives for the whole
/// session; nothing here resets on a map switch.
#[derive(Debug, Default)]
struct EventEngine {
    events: Vec<EventState>,
    ticks_since_eval: u32,
}

impl EventEngine {
    fn new() -> Self {
        Self::default()
    }

    fn register(&mut self, kind: EventKind, repeatable: bool) -> Result<(), DuplicateEventError> {
        if self.events.iter().any(|event| event.kind == kind) {
            return Err(DuplicateEventError(kind));
        }
        self.events.push(EventState {
            kind,
            repeatable,
            happened: false,
            chance: 0,
        });
        Ok(())
    }

    #[cfg(test)]
    fn event(&self, kind: EventKind) -> Option<&EventState> {
        self.events.iter().find(|event| event.kind == kind)
    }

    /// Called every simulation tick; runs a full evaluation once per
    /// `EVENT_EVAL_INTERVAL_TICKS`.
    fn tick(&mut self, world: &mut WorldState, rng: &mut StdRng) -> Option<EventOutcome> {
        self.ticks_since_eval = self.ticks_since_eval.saturating_add(1);
        if self.ticks_since_eval < EVENT_EVAL_INTERVAL_TICKS {
            return None;
        }
        self.ticks_since_eval = 0;
        Some(self.evaluate(world, rng))
    }

    /// Evaluates every registered event in registration order. An effect
    /// failure is logged and does not stop the pass.
    fn evaluate(&mut self, world: &mut WorldState, rng: &mut StdRng) -> EventOutcome {
        let mut outcome = EventOutcome::default();
        for event in &mut self.events {
            let signals = WorldSignals::capture(world);
            event.chance = calculate_chance(event.kind, event.repeatable, event.happened, &signals);
            debug!(event = event.kind.name(), chance = event.chance, "event_chance");
            outcome.evaluated += 1;

            let roll = rng.random_range(0..CHANCE_SCALE);
            if !accepts(event.chance, roll) {
                continue;
            }

            event.happened = true;
            info!(
                event = event.kind.name(),
                chance = event.chance,
                roll,
                "event_fired"
            );
            outcome.fired.push(event.kind);
            if let Err(error) = apply_effect(event.kind, world) {
                warn!(event = event.kind.name(), error = %error, "event_effect_failed");
            }
        }
        outcome
    }
}
