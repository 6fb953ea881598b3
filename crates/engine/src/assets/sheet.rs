use std::path::{Path, PathBuf};

use image::{ImageReader, RgbaImage};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AssetLoadError {
    #[error("failed to open sprite sheet '{path}': {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode sprite sheet '{path}': {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("sprite sheet '{path}' uses a zero tile dimension")]
    ZeroTileSize { path: PathBuf },
    #[error(
        "sprite sheet '{path}' ({image_width}x{image_height}) does not fit one \
{tile_width}x{tile_height} tile"
    )]
    NoTiles {
        path: PathBuf,
        image_width: u32,
        image_height: u32,
        tile_width: u32,
        tile_height: u32,
    },
}

/// One cut-out cell of a sprite sheet, RGBA8 row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sprite {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

/// A decoded sheet sliced into equally sized sprites, left-to-right then
/// top-to-bottom, with `margin` pixels between cells.
#[derive(Debug, Clone)]
pub struct SpriteSheet {
    sprites: Vec<Sprite>,
}

impl SpriteSheet {
    pub fn load(
        path: &Path,
        tile_width: u32,
        tile_height: u32,
        margin: u32,
    ) -> Result<Self, AssetLoadError> {
        if tile_width == 0 || tile_height == 0 {
            return Err(AssetLoadError::ZeroTileSize {
                path: path.to_path_buf(),
            });
        }
        let reader = ImageReader::open(path).map_err(|source| AssetLoadError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        let image = reader
            .decode()
            .map_err(|source| AssetLoadError::Decode {
                path: path.to_path_buf(),
                source,
            })?
            .to_rgba8();

        let sprites = slice_sheet(&image, tile_width, tile_height, margin);
        if sprites.is_empty() {
            return Err(AssetLoadError::NoTiles {
                path: path.to_path_buf(),
                image_width: image.width(),
                image_height: image.height(),
                tile_width,
                tile_height,
            });
        }
        Ok(Self { sprites })
    }

    pub fn from_sprites(sprites: Vec<Sprite>) -> Self {
        Self { sprites }
    }

    pub fn len(&self) -> usize {
        self.sprites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sprites.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Sprite> {
        self.sprites.get(index)
    }

    pub fn sprites(&self) -> &[Sprite] {
        &self.sprites
    }
}

fn slice_sheet(image: &RgbaImage, tile_width: u32, tile_height: u32, margin: u32) -> Vec<Sprite> {
    let mut sprites = Vec::new();
    let step_x = tile_width + margin;
    let step_y = tile_height + margin;

    let mut y = 0;
    while y + tile_height <= image.height() {
        let mut x = 0;
        while x + tile_width <= image.width() {
            let mut rgba = Vec::with_capacity((tile_width * tile_height * 4) as usize);
            for sy in 0..tile_height {
                for sx in 0..tile_width {
                    let pixel = image.get_pixel(x + sx, y + sy);
                    rgba.extend_from_slice(&pixel.0);
                }
            }
            sprites.push(Sprite {
                width: tile_width,
                height: tile_height,
                rgba,
            });
            x += step_x;
        }
        y += step_y;
    }
    sprites
}
