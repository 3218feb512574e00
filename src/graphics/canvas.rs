use std::collections::TryReserveError;

use super::codec::{self, BitDepth};
use super::Colour;

// ============================================================================
// Pixel Format
// ============================================================================

/// Depth-specific sample accessors, picked once when a surface is created
#[derive(Clone, Copy)]
pub(crate) struct PixelFormat {
    pub(crate) depth: BitDepth,
    get: fn(&[u8], usize) -> u8,
    put: fn(&mut [u8], usize, u8),
}

macro_rules! pixel_format {
    ($depth:expr) => {{
        fn get(row: &[u8], x: usize) -> u8 {
            codec::sample(row, x, $depth)
        }
        fn put(row: &mut [u8], x: usize, value: u8) {
            codec::put_sample(row, x, $depth, value);
        }
        PixelFormat {
            depth: $depth,
            get,
            put,
        }
    }};
}

const FORMATS: [PixelFormat; 4] = [
    pixel_format!(BitDepth::One),
    pixel_format!(BitDepth::Two),
    pixel_format!(BitDepth::Four),
    pixel_format!(BitDepth::Eight),
];

impl PixelFormat {
    pub(crate) fn for_depth(depth: BitDepth) -> Self {
        match depth {
            BitDepth::One => FORMATS[0],
            BitDepth::Two => FORMATS[1],
            BitDepth::Four => FORMATS[2],
            BitDepth::Eight => FORMATS[3],
        }
    }

    #[inline]
    pub(crate) fn get(&self, row: &[u8], x: usize) -> u8 {
        (self.get)(row, x)
    }

    #[inline]
    pub(crate) fn put(&self, row: &mut [u8], x: usize, value: u8) {
        (self.put)(row, x, value);
    }
}

// ============================================================================
// Canvas
// ============================================================================

/// Indexed framebuffer
///
/// Only the visible screen is stored. The canvas size is the addressable
/// space that wrapping sprites and tile layers fold back into.
pub struct Canvas {
    pixels: Vec<u8>,
    screen_width: usize,
    screen_height: usize,
    canvas_width: usize,
    canvas_height: usize,
    stride: usize,
    format: PixelFormat,
}

impl Canvas {
    /// Allocate a zeroed canvas. Dimensions are expected to be validated already.
    pub(crate) fn try_new(
        screen_width: usize,
        screen_height: usize,
        canvas_width: usize,
        canvas_height: usize,
        depth: BitDepth,
    ) -> Result<Self, TryReserveError> {
        // Rows are padded to 4 bytes, the alignment display surfaces expect
        let stride = (depth.row_bytes(screen_width) + 3) & !3;
        let mut pixels = Vec::new();
        pixels.try_reserve_exact(stride * screen_height)?;
        pixels.resize(stride * screen_height, 0);
        Ok(Self {
            pixels,
            screen_width,
            screen_height,
            canvas_width,
            canvas_height,
            stride,
            format: PixelFormat::for_depth(depth),
        })
    }

    #[inline]
    pub fn screen_width(&self) -> usize {
        self.screen_width
    }

    #[inline]
    pub fn screen_height(&self) -> usize {
        self.screen_height
    }

    #[inline]
    pub fn canvas_width(&self) -> usize {
        self.canvas_width
    }

    #[inline]
    pub fn canvas_height(&self) -> usize {
        self.canvas_height
    }

    /// Bytes per stored row, including padding
    #[inline]
    pub fn stride(&self) -> usize {
        self.stride
    }

    #[inline]
    pub fn depth(&self) -> BitDepth {
        self.format.depth
    }

    /// Check if coordinates are within the visible screen
    #[inline]
    fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && (x as usize) < self.screen_width && y >= 0 && (y as usize) < self.screen_height
    }

    #[inline]
    fn row(&self, y: usize) -> &[u8] {
        &self.pixels[y * self.stride..(y + 1) * self.stride]
    }

    #[inline]
    fn row_mut(&mut self, y: usize) -> &mut [u8] {
        &mut self.pixels[y * self.stride..(y + 1) * self.stride]
    }

    /// Colour index at (x, y), or 0 outside the screen
    #[inline]
    pub fn get_pixel(&self, x: i32, y: i32) -> u8 {
        if self.in_bounds(x, y) {
            self.pixel(x as usize, y as usize)
        } else {
            0
        }
    }

    /// Store a colour index at (x, y); ignored outside the screen
    #[inline]
    pub fn set_pixel(&mut self, x: i32, y: i32, index: u8) {
        if self.in_bounds(x, y) {
            self.put(x as usize, y as usize, index);
        }
    }

    /// Unchecked-coordinate read for callers that already clipped
    #[inline]
    pub(crate) fn pixel(&self, x: usize, y: usize) -> u8 {
        self.format.get(self.row(y), x)
    }

    /// Unchecked-coordinate write, masked to the colour count
    #[inline]
    pub(crate) fn put(&mut self, x: usize, y: usize, index: u8) {
        let format = self.format;
        format.put(self.row_mut(y), x, index & format.depth.mask());
    }

    /// Reset every pixel to colour 0
    pub fn clear(&mut self) {
        self.pixels.fill(0);
    }

    /// Raw packed rows, `stride` bytes each
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.pixels
    }

    /// Stored rows, top to bottom
    pub fn rows(&self) -> impl Iterator<Item = &[u8]> + '_ {
        self.pixels.chunks_exact(self.stride)
    }

    /// Expand the screen through `palette` into packed 0xAARRGGBB words (native byte order)
    /// Missing palette entries come out black.
    pub fn expand_argb(&self, palette: &[Colour], out: &mut [u8]) {
        let width = self.screen_width;
        for (row, dest_row) in self.rows().zip(out.chunks_exact_mut(width * 4)) {
            for (x, dest) in dest_row.chunks_exact_mut(4).enumerate() {
                let index = self.format.get(row, x) as usize;
                let colour = palette.get(index).copied().unwrap_or_default();
                dest.copy_from_slice(&(0xFF00_0000 | colour.packed()).to_ne_bytes());
            }
        }
    }
}
