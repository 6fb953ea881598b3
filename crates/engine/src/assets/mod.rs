mod atomic_io;
mod sheet;

pub use atomic_io::{write_bytes_atomic, write_text_atomic};
pub use sheet::{AssetLoadError, Sprite, SpriteSheet};
