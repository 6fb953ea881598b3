use std::sync::Arc;

use pixels::{Error, Pixels, SurfaceTexture};
use winit::window::Window;

use crate::app::{Camera2D, HudFrame, RenderableKind, SceneWorld, SpriteRef, Tilemap, Vec2};
use crate::assets::{Sprite, SpriteSheet};

use super::transform::world_to_screen_px;
use super::{Viewport, PLACEHOLDER_HALF_SIZE_PX};

const CLEAR_COLOR: [u8; 4] = [20, 22, 28, 255];
const PLACEHOLDER_COLOR: [u8; 4] = [220, 220, 240, 255];
const HUD_BUTTON_FILL: [u8; 4] = [30, 33, 41, 255];
const HUD_BUTTON_BORDER: [u8; 4] = [70, 76, 92, 255];
const HUD_BUTTON_SELECTED_BORDER: [u8; 4] = [255, 210, 70, 255];
const ALPHA_OPAQUE_THRESHOLD: u8 = 128;

const TILE_FALLBACK_COLORS: [[u8; 4]; 6] = [
    [74, 112, 56, 255],
    [112, 83, 58, 255],
    [52, 86, 130, 255],
    [132, 120, 58, 255],
    [96, 64, 96, 255],
    [68, 74, 62, 255],
];

pub struct Renderer {
    window: Arc<Window>,
    pixels: Pixels<'static>,
    viewport: Viewport,
    sheets: Vec<SpriteSheet>,
}

impl Renderer {
    pub fn new(window: Arc<Window>, sheets: Vec<SpriteSheet>) -> Result<Self, Error> {
        let size = window.inner_size();
        let pixels = Self::build_pixels(Arc::clone(&window), size.width, size.height)?;
        Ok(Self {
            window,
            pixels,
            viewport: Viewport {
                width: size.width,
                height: size.height,
            },
            sheets,
        })
    }

    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), Error> {
        if width == 0 || height == 0 {
            return Ok(());
        }
        self.pixels = Self::build_pixels(Arc::clone(&self.window), width, height)?;
        self.viewport = Viewport { width, height };
        Ok(())
    }

    fn build_pixels(
        window: Arc<Window>,
        width: u32,
        height: u32,
    ) -> Result<Pixels<'static>, Error> {
        let surface = SurfaceTexture::new(width, height, window);
        Pixels::new(width, height, surface)
    }

    pub(crate) fn render_world(&mut self, world: &SceneWorld, hud: &HudFrame) -> Result<(), Error> {
        if self.viewport.width == 0 || self.viewport.height == 0 {
            return Ok(());
        }

        let width = self.viewport.width;
        let height = self.viewport.height;
        let sheets = &self.sheets;
        let frame = self.pixels.frame_mut();

        for chunk in frame.chunks_exact_mut(4) {
            chunk.copy_from_slice(&CLEAR_COLOR);
        }

        if let Some(tilemap) = world.tilemap() {
            draw_tilemap(frame, width, height, world.camera(), tilemap, sheets);
        }

        for entity in world.entities() {
            if !entity.active {
                continue;
            }
            let (cx, cy) = world_to_screen_px(
                world.camera(),
                (width, height),
                entity.transform.position,
            );
            match entity.renderable.kind {
                RenderableKind::Placeholder => {
                    draw_square(frame, width, height, cx, cy, PLACEHOLDER_HALF_SIZE_PX, PLACEHOLDER_COLOR);
                }
                RenderableKind::Sprite(sprite_ref) => {
                    if let Some(sprite) = resolve_sprite(sheets, sprite_ref) {
                        blit_sprite_centered(frame, width, height, cx, cy, sprite);
                    } else {
                        draw_square(
                            frame,
                            width,
                            height,
                            cx,
                            cy,
                            PLACEHOLDER_HALF_SIZE_PX,
                            PLACEHOLDER_COLOR,
                        );
                    }
                }
            }
        }

        draw_hud(frame, width, height, hud, sheets);

        self.pixels.render()
    }
}

fn resolve_sprite(sheets: &[SpriteSheet], sprite_ref: SpriteRef) -> Option<&Sprite> {
    sheets.get(sprite_ref.sheet.0)?.get(sprite_ref.index as usize)
}

pub(crate) fn tile_fallback_color(tile_id: u16) -> [u8; 4] {
    TILE_FALLBACK_COLORS[tile_id as usize % TILE_FALLBACK_COLORS.len()]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct TileRange {
    pub(crate) x_min: u32,
    pub(crate) x_max: u32,
    pub(crate) y_min: u32,
    pub(crate) y_max: u32,
}

/// Inclusive range of tiles whose pixels can intersect the viewport.
pub(crate) fn visible_tile_range(
    camera: &Camera2D,
    window_size: (u32, u32),
    tilemap: &Tilemap,
) -> Option<TileRange> {
    let tile_size = tilemap.tile_size_px() as f32;
    let half_w = window_size.0 as f32 * 0.5;
    let half_h = window_size.1 as f32 * 0.5;

    let min_world_x = camera.position.x - half_w;
    let max_world_x = camera.position.x + half_w;
    let min_world_y = camera.position.y - half_h;
    let max_world_y = camera.position.y + half_h;

    if max_world_x < 0.0 || max_world_y < 0.0 {
        return None;
    }

    let x_min = (min_world_x / tile_size).floor().max(0.0) as u32;
    let y_min = (min_world_y / tile_size).floor().max(0.0) as u32;
    if x_min >= tilemap.width() || y_min >= tilemap.height() {
        return None;
    }
    let x_max = ((max_world_x / tile_size).floor() as u32).min(tilemap.width() - 1);
    let y_max = ((max_world_y / tile_size).floor() as u32).min(tilemap.height() - 1);

    Some(TileRange {
        x_min,
        x_max,
        y_min,
        y_max,
    })
}

fn draw_tilemap(
    frame: &mut [u8],
    width: u32,
    height: u32,
    camera: &Camera2D,
    tilemap: &Tilemap,
    sheets: &[SpriteSheet],
) {
    let Some(range) = visible_tile_range(camera, (width, height), tilemap) else {
        return;
    };
    let tile_size = tilemap.tile_size_px();

    for layer in 0..tilemap.layer_count() {
        for tile_y in range.y_min..=range.y_max {
            for tile_x in range.x_min..=range.x_max {
                let Some(tile_id) = tilemap.tile_at(tile_x, tile_y, layer) else {
                    continue;
                };
                let world = Vec2 {
                    x: (tile_x * tile_size) as f32,
                    y: (tile_y * tile_size) as f32,
                };
                let (sx, sy) = world_to_screen_px(camera, (width, height), world);
                let sprite_ref = SpriteRef {
                    sheet: tilemap.sheet(),
                    index: tile_id,
                };
                if let Some(sprite) = resolve_sprite(sheets, sprite_ref) {
                    blit_sprite(frame, width, height, sx, sy, sprite);
                } else {
                    fill_rect(
                        frame,
                        width,
                        height,
                        sx,
                        sy,
                        tile_size,
                        tile_size,
                        tile_fallback_color(tile_id),
                    );
                }
            }
        }
    }
}

fn draw_hud(frame: &mut [u8], width: u32, height: u32, hud: &HudFrame, sheets: &[SpriteSheet]) {
    for panel in &hud.panels {
        for button in &panel.buttons {
            fill_rect(
                frame,
                width,
                height,
                button.rect.x,
                button.rect.y,
                button.rect.width,
                button.rect.height,
                HUD_BUTTON_FILL,
            );
            if let Some(sprite) = button.sprite.and_then(|sprite_ref| resolve_sprite(sheets, sprite_ref)) {
                let cx = button.rect.x + button.rect.width as i32 / 2;
                let cy = button.rect.y + button.rect.height as i32 / 2;
                blit_sprite_centered(frame, width, height, cx, cy, sprite);
            }
            let border = if button.selected {
                HUD_BUTTON_SELECTED_BORDER
            } else {
                HUD_BUTTON_BORDER
            };
            draw_rect_border(
                frame,
                width,
                height,
                button.rect.x,
                button.rect.y,
                button.rect.width,
                button.rect.height,
                border,
            );
        }
    }
}

pub(crate) fn put_pixel(frame: &mut [u8], width: u32, height: u32, x: i32, y: i32, color: [u8; 4]) {
    if x < 0 || y < 0 || x >= width as i32 || y >= height as i32 {
        return;
    }
    let index = (y as usize * width as usize + x as usize) * 4;
    if let Some(slot) = frame.get_mut(index..index + 4) {
        slot.copy_from_slice(&color);
    }
}

#[allow(clippy::too_many_arguments)]
pub(crate) fn fill_rect(
    frame: &mut [u8],
    width: u32,
    height: u32,
    x: i32,
    y: i32,
    rect_width: u32,
    rect_height: u32,
    color: [u8; 4],
) {
    for dy in 0..rect_height as i32 {
        for dx in 0..rect_width as i32 {
            put_pixel(frame, width, height, x + dx, y + dy, color);
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn draw_rect_border(
    frame: &mut [u8],
    width: u32,
    height: u32,
    x: i32,
    y: i32,
    rect_width: u32,
    rect_height: u32,
    color: [u8; 4],
) {
    let right = x + rect_width as i32 - 1;
    let bottom = y + rect_height as i32 - 1;
    for dx in 0..rect_width as i32 {
        put_pixel(frame, width, height, x + dx, y, color);
        put_pixel(frame, width, height, x + dx, bottom, color);
    }
    for dy in 0..rect_height as i32 {
        put_pixel(frame, width, height, x, y + dy, color);
        put_pixel(frame, width, height, right, y + dy, color);
    }
}

fn draw_square(
    frame: &mut [u8],
    width: u32,
    height: u32,
    cx: i32,
    cy: i32,
    half_size: i32,
    color: [u8; 4],
) {
    for dy in -half_size..=half_size {
        for dx in -half_size..=half_size {
            put_pixel(frame, width, height, cx + dx, cy + dy, color);
        }
    }
}

/// Blits with the sprite's top-left at (x, y). Pixels below the alpha
/// threshold are skipped, not blended.
pub(crate) fn blit_sprite(
    frame: &mut [u8],
    width: u32,
    height: u32,
    x: i32,
    y: i32,
    sprite: &Sprite,
) {
    for sy in 0..sprite.height {
        for sx in 0..sprite.width {
            let src = ((sy * sprite.width + sx) * 4) as usize;
            let Some(texel) = sprite.rgba.get(src..src + 4) else {
                continue;
            };
            if texel[3] < ALPHA_OPAQUE_THRESHOLD {
                continue;
            }
            put_pixel(
                frame,
                width,
                height,
                x + sx as i32,
                y + sy as i32,
                [texel[0], texel[1], texel[2], 255],
            );
        }
    }
}

fn blit_sprite_centered(
    frame: &mut [u8],
    width: u32,
    height: u32,
    cx: i32,
    cy: i32,
    sprite: &Sprite,
) {
    blit_sprite(
        frame,
        width,
        height,
        cx - sprite.width as i32 / 2,
        cy - sprite.height as i32 / 2,
        sprite,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::SheetId;

    fn frame_of(width: u32, height: u32) -> Vec<u8> {
        vec![0; (width * height * 4) as usize]
    }

    fn pixel_at(frame: &[u8], width: u32, x: u32, y: u32) -> [u8; 4] {
        let index = ((y * width + x) * 4) as usize;
        [
            frame[index],
            frame[index + 1],
            frame[index + 2],
            frame[index + 3],
        ]
    }

    fn make_tilemap(width: u32, height: u32) -> Tilemap {
        Tilemap::new(width, height, 1, 32, SheetId(0)).expect("tilemap")
    }

    #[test]
    fn put_pixel_ignores_out_of_bounds_writes() {
        let mut frame = frame_of(4, 4);
        put_pixel(&mut frame, 4, 4, -1, 0, [255; 4]);
        put_pixel(&mut frame, 4, 4, 0, 4, [255; 4]);
        put_pixel(&mut frame, 4, 4, 4, 0, [255; 4]);
        assert!(frame.iter().all(|byte| *byte == 0));
    }

    #[test]
    fn fill_rect_clips_to_frame() {
        let mut frame = frame_of(4, 4);
        fill_rect(&mut frame, 4, 4, 2, 2, 4, 4, [9, 9, 9, 255]);
        assert_eq!(pixel_at(&frame, 4, 3, 3), [9, 9, 9, 255]);
        assert_eq!(pixel_at(&frame, 4, 1, 1), [0, 0, 0, 0]);
    }

    #[test]
    fn blit_sprite_skips_transparent_texels() {
        let mut frame = frame_of(2, 1);
        let sprite = Sprite {
            width: 2,
            height: 1,
            rgba: vec![10, 20, 30, 255, 40, 50, 60, 0],
        };
        blit_sprite(&mut frame, 2, 1, 0, 0, &sprite);
        assert_eq!(pixel_at(&frame, 2, 0, 0), [10, 20, 30, 255]);
        assert_eq!(pixel_at(&frame, 2, 1, 0), [0, 0, 0, 0]);
    }

    #[test]
    fn visible_tile_range_clamps_to_map_edges() {
        let tilemap = make_tilemap(10, 10);
        let camera = Camera2D {
            position: Vec2 { x: 0.0, y: 0.0 },
        };
        let range = visible_tile_range(&camera, (128, 128), &tilemap).expect("range");
        assert_eq!(range.x_min, 0);
        assert_eq!(range.y_min, 0);
        assert_eq!(range.x_max, 2);
        assert_eq!(range.y_max, 2);
    }

    #[test]
    fn visible_tile_range_none_when_camera_far_off_map() {
        let tilemap = make_tilemap(4, 4);
        let camera = Camera2D {
            position: Vec2 {
                x: -10_000.0,
                y: 0.0,
            },
        };
        assert!(visible_tile_range(&camera, (128, 128), &tilemap).is_none());
        let camera = Camera2D {
            position: Vec2 {
                x: 10_000.0,
                y: 0.0,
            },
        };
        assert!(visible_tile_range(&camera, (128, 128), &tilemap).is_none());
    }

    #[test]
    fn tile_fallback_color_cycles_catalog() {
        assert_eq!(tile_fallback_color(0), tile_fallback_color(6));
        assert_ne!(tile_fallback_color(0), tile_fallback_color(1));
    }
}
