//! Composite frame layout.
//!
//! ```text
//! +-----------+-----------+-----------+
//! | primary 0 | primary 1 | primary 2 |   h
//! +-----------+-----------+-----------+
//! |          trace panel              |   floor(2h/3)
//! +-----------+-----------+-----------+
//! | second. 0 | second. 1 | second. 2 |   h
//! +-----------+-----------+-----------+
//!      w           w           w
//! ```

use contracts::{ContractError, EncodedFrame, LayoutConfig, StreamKind};
use image::buffer::ConvertBuffer;
use image::{imageops, RgbImage, RgbaImage};

/// Geometry of one video tile
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileSize {
    pub width: u32,
    pub height: u32,
}

impl TileSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Trace panel size: full composite width, two thirds of a tile high
    pub fn trace_panel(&self) -> (u32, u32) {
        (3 * self.width, 2 * self.height / 3)
    }

    /// Final composite size
    pub fn composite(&self) -> (u32, u32) {
        let (_, trace_h) = self.trace_panel();
        (3 * self.width, 2 * self.height + trace_h)
    }
}

impl From<&LayoutConfig> for TileSize {
    fn from(layout: &LayoutConfig) -> Self {
        Self::new(layout.tile_width, layout.tile_height)
    }
}

/// Decode an encoded frame to RGB
pub fn decode_tile(stream: StreamKind, frame: &EncodedFrame) -> Result<RgbImage, ContractError> {
    image::load_from_memory(&frame.data)
        .map(|img| img.to_rgb8())
        .map_err(|e| ContractError::frame_decode(stream, frame.index, e.to_string()))
}

/// Places six tiles and the trace panel on one canvas
#[derive(Debug, Clone, Copy)]
pub struct FrameCompositor {
    tile: TileSize,
}

impl FrameCompositor {
    pub fn new(tile: TileSize) -> Self {
        Self { tile }
    }

    pub fn tile(&self) -> TileSize {
        self.tile
    }

    /// Assemble the composite
    ///
    /// Tiles are copied without scaling; any tile that does not match the
    /// declared geometry fails with `TileSizeMismatch`.
    pub fn assemble(
        &self,
        primary: &[RgbImage; 3],
        secondary: &[RgbImage; 3],
        trace: &RgbaImage,
    ) -> Result<RgbImage, ContractError> {
        let TileSize { width, height } = self.tile;
        for (row, tiles) in [(StreamKind::PrimaryVideo, primary), (StreamKind::SecondaryVideo, secondary)] {
            for (slot, tile) in tiles.iter().enumerate() {
                self.check(&format!("{row} tile {slot}"), tile.dimensions(), (width, height))?;
            }
        }
        let trace_size = self.tile.trace_panel();
        self.check("trace panel", trace.dimensions(), trace_size)?;

        let (cw, ch) = self.tile.composite();
        let trace_h = trace_size.1;
        let mut canvas = RgbImage::new(cw, ch);
        for (top, tiles) in [(0, primary), (height + trace_h, secondary)] {
            for (col, tile) in tiles.iter().enumerate() {
                imageops::replace(
                    &mut canvas,
                    tile,
                    i64::from(col as u32 * width),
                    i64::from(top),
                );
            }
        }
        let trace_rgb: RgbImage = trace.convert();
        imageops::replace(&mut canvas, &trace_rgb, 0, i64::from(height));
        Ok(canvas)
    }

    fn check(&self, tile: &str, actual: (u32, u32), expected: (u32, u32)) -> Result<(), ContractError> {
        if actual == expected {
            return Ok(());
        }
        Err(ContractError::TileSizeMismatch {
            tile: tile.to_string(),
            expected_width: expected.0,
            expected_height: expected.1,
            actual_width: actual.0,
            actual_height: actual.1,
        })
    }
}
