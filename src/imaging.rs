//! Image decoding collaborator.
//!
//! The manager only hands bytes over to an [`ImageCodec`]; anything able to
//! turn a buffer into a [`DynamicImage`] can be plugged in with
//! [`Vfs::set_image_codec`](crate::Vfs::set_image_codec).

use image::{DynamicImage, RgbaImage};

use crate::core::Result;
use crate::error::VfsError;

/// Decoded RGBA8 raster.
pub type Pixmap = RgbaImage;

pub trait ImageCodec {
    fn decode(&self, bytes: &[u8]) -> Result<DynamicImage>;
}

/// Default codec backed by the `image` crate; the format is guessed from the bytes.
#[derive(Debug, Default, Copy, Clone)]
pub struct RasterCodec;

impl ImageCodec for RasterCodec {
    fn decode(&self, bytes: &[u8]) -> Result<DynamicImage> {
        if bytes.is_empty() {
            return Err(VfsError::decode("empty buffer"));
        }
        image::load_from_memory(bytes).map_err(|e| VfsError::decode(e.to_string()))
    }
}

/// An icon made of a single pixmap.
#[derive(Debug, Clone, PartialEq)]
pub struct Icon {
    pixmap: Pixmap,
}

impl Icon {
    pub fn from_pixmap(pixmap: Pixmap) -> Self {
        Self { pixmap }
    }

    pub fn pixmap(&self) -> &Pixmap {
        &self.pixmap
    }

    pub fn into_pixmap(self) -> Pixmap {
        self.pixmap
    }

    /// Width and height in pixels.
    pub fn size(&self) -> (u32, u32) {
        self.pixmap.dimensions()
    }
}
