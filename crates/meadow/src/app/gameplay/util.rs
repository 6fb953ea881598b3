fn movement_delta(input: &InputSnapshot, fixed_dt_seconds: f32, speed: f32) -> Vec2 {
    let mut x = 0.0f32;
    let mut y = 0.0f32;

    if input.is_down(InputAction::MoveRight) {
        x += 1.0;
    }
    if input.is_down(InputAction::MoveLeft) {
        x -= 1.0;
    }
    if input.is_down(InputAction::MoveUp) {
        y -= 1.0;
    }
    if input.is_down(InputAction::MoveDown) {
        y += 1.0;
    }

    let len_sq = x * x + y * y;
    if len_sq > 0.0 {
        let inv_len = len_sq.sqrt().recip();
        x *= inv_len;
        y *= inv_len;
    }

    Vec2 {
        x: x * speed * fixed_dt_seconds,
        y: y * speed * fixed_dt_seconds,
    }
}

fn step_toward(
    current: Vec2,
    target: Vec2,
    speed: f32,
    fixed_dt_seconds: f32,
    arrival_threshold: f32,
) -> (Vec2, bool) {
    let dx = target.x - current.x;
    let dy = target.y - current.y;
    let distance_sq = dx * dx + dy * dy;
    let threshold_sq = arrival_threshold * arrival_threshold;
    if distance_sq <= threshold_sq {
        return (current, true);
    }

    let distance = distance_sq.sqrt();
    let max_step = speed * fixed_dt_seconds;
    if max_step >= distance {
        return (target, true);
    }

    let inv_distance = distance.recip();
    (
        Vec2 {
            x: current.x + dx * inv_distance * max_step,
            y: current.y + dy * inv_distance * max_step,
        },
        false,
    )
}

fn distance_sq(a: Vec2, b: Vec2) -> f32 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    dx * dx + dy * dy
}

/// World pixel position to tile coordinates; negative coordinates are off
/// the map.
fn tile_coords_of(world_px: Vec2) -> Option<(u32, u32)> {
    if world_px.x < 0.0 || world_px.y < 0.0 {
        return None;
    }
    let tile_size = TILE_SIZE_PX as f32;
    Some((
        (world_px.x / tile_size).floor() as u32,
        (world_px.y / tile_size).floor() as u32,
    ))
}

fn tile_center_px(tile_x: u32, tile_y: u32) -> Vec2 {
    Vec2 {
        x: (tile_x * TILE_SIZE_PX) as f32 + TILE_SIZE_PX as f32 * 0.5,
        y: (tile_y * TILE_SIZE_PX) as f32 + TILE_SIZE_PX as f32 * 0.5,
    }
}

/// Arrival point for a player stepping out of `portal`: one tile inward
/// from the map edge the portal sits on, so the hop does not immediately
/// re-trigger.
fn portal_spawn_px(map: &MapState, portal: &Portal) -> Vec2 {
    let width = map.tiles.width();
    let height = map.tiles.height();
    let mut x = portal.x;
    let mut y = portal.y;
    if portal.x == 0 {
        x = 1.min(width - 1);
    } else if portal.x == width - 1 {
        x = width.saturating_sub(2);
    } else if portal.y == 0 {
        y = 1.min(height - 1);
    } else if portal.y == height - 1 {
        y = height.saturating_sub(2);
    }
    tile_center_px(x, y)
}

fn nearest_animal_index(map: &MapState, position: Vec2) -> Option<usize> {
    map.animals
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| {
            distance_sq(a.position, position)
                .partial_cmp(&distance_sq(b.position, position))
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .map(|(index, _)| index)
}

fn camera_axis(center: f32, map_size: f32, window_size: f32) -> f32 {
    if map_size <= window_size {
        map_size * 0.5
    } else {
        center.clamp(window_size * 0.5, map_size - window_size * 0.5)
    }
}

/// Follows the player but never shows past the map edge on an axis where
/// the map is larger than the window.
fn camera_position_for(player: Vec2, bounds_px: (f32, f32), window_size: (u32, u32)) -> Vec2 {
    Vec2 {
        x: camera_axis(player.x, bounds_px.0, window_size.0 as f32),
        y: camera_axis(player.y, bounds_px.1, window_size.1 as f32),
    }
}
