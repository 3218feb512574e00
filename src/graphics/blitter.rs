//! Sprite and tile layer blitting
//!
//! Both blitters walk destination pixels and sample patterns with the same
//! wrap/clip rule. On a wrapping axis the coordinate folds back into the
//! canvas and anything landing off-screen is skipped. On a clipping axis
//! negative coordinates are skipped, while reaching the screen edge ends the
//! row (x) or the whole draw (y).

use super::canvas::Canvas;
use super::codec::{PATTERN_HEIGHT, PATTERN_WIDTH};
use super::patterns::PatternStore;
use super::Tile;

/// What to do with one destination coordinate
enum Placement {
    Draw(usize),
    Skip,
    Stop,
}

#[inline]
fn place(coord: i32, wrap: bool, canvas: i32, screen: i32) -> Placement {
    if wrap {
        let coord = if coord >= canvas { coord % canvas } else { coord };
        if coord >= screen {
            Placement::Skip
        } else {
            Placement::Draw(coord as usize)
        }
    } else if coord < 0 {
        Placement::Skip
    } else if coord >= screen {
        Placement::Stop
    } else {
        Placement::Draw(coord as usize)
    }
}

/// Fold an origin into [0, canvas) when its axis wraps
#[inline]
fn origin(coord: i32, wrap: bool, canvas: i32) -> i32 {
    if wrap {
        coord.rem_euclid(canvas)
    } else {
        coord
    }
}

#[inline]
fn flip(sample: usize, flipped: bool, size: usize) -> usize {
    if flipped {
        size - 1 - sample
    } else {
        sample
    }
}

/// Draw one 8x8 pattern with its top-left corner at (x, y).
/// Colour 0 is always transparent.
pub(crate) fn draw_sprite(
    canvas: &mut Canvas,
    patterns: &PatternStore,
    x: i32,
    y: i32,
    pattern: u8,
    palette: Option<&[u8]>,
    hflip: bool,
    vflip: bool,
    hwrap: bool,
    vwrap: bool,
) {
    let canvas_width = canvas.canvas_width() as i32;
    let canvas_height = canvas.canvas_height() as i32;
    let screen_width = canvas.screen_width() as i32;
    let screen_height = canvas.screen_height() as i32;
    let x = origin(x, hwrap, canvas_width);
    let y = origin(y, vwrap, canvas_height);

    for sample_y in 0..PATTERN_HEIGHT {
        let pixel_y = match place(y.saturating_add(sample_y as i32), vwrap, canvas_height, screen_height) {
            Placement::Draw(p) => p,
            Placement::Skip => continue,
            Placement::Stop => break,
        };
        let source_y = flip(sample_y, vflip, PATTERN_HEIGHT);
        for sample_x in 0..PATTERN_WIDTH {
            let pixel_x = match place(x.saturating_add(sample_x as i32), hwrap, canvas_width, screen_width) {
                Placement::Draw(p) => p,
                Placement::Skip => continue,
                Placement::Stop => break,
            };
            let sample = patterns.sample(pattern, flip(sample_x, hflip, PATTERN_WIDTH), source_y);
            if sample == 0 {
                continue;
            }
            let index = match palette {
                Some(table) => match table.get(usize::from(sample)) {
                    Some(&index) => index,
                    None => continue,
                },
                None => sample,
            };
            canvas.put(pixel_x, pixel_y, index);
        }
    }
}

/// Draw a tile grid covering the whole canvas, offset by (x, y).
/// `tiles` is row-major, ceil(canvas_width / 8) tiles per row.
pub(crate) fn draw_tiles<P: AsRef<[u8]>>(
    canvas: &mut Canvas,
    patterns: &PatternStore,
    x: i32,
    y: i32,
    tiles: &[Tile],
    palettes: &[P],
    hwrap: bool,
    vwrap: bool,
    transparent: bool,
) {
    let columns = (canvas.canvas_width() + PATTERN_WIDTH - 1) / PATTERN_WIDTH;
    let rows = (canvas.canvas_height() + PATTERN_HEIGHT - 1) / PATTERN_HEIGHT;
    if tiles.len() < columns * rows || palettes.is_empty() {
        return;
    }

    let canvas_width = canvas.canvas_width() as i32;
    let canvas_height = canvas.canvas_height() as i32;
    let screen_width = canvas.screen_width() as i32;
    let screen_height = canvas.screen_height() as i32;
    let x = origin(x, hwrap, canvas_width);
    let y = origin(y, vwrap, canvas_height);

    // Saturating so far-off unwrapped layers land on Stop instead of overflowing
    for offset_y in 0..canvas.canvas_height() {
        let layer_y = y.saturating_add(offset_y as i32);
        let pixel_y = match place(layer_y, vwrap, canvas_height, screen_height) {
            Placement::Draw(p) => p,
            Placement::Skip => continue,
            Placement::Stop => break,
        };
        let sample_y = offset_y & (PATTERN_HEIGHT - 1);
        let tile_row = (offset_y >> 3) * columns;

        for offset_x in 0..canvas.canvas_width() {
            let layer_x = x.saturating_add(offset_x as i32);
            let pixel_x = match place(layer_x, hwrap, canvas_width, screen_width) {
                Placement::Draw(p) => p,
                Placement::Skip => continue,
                Placement::Stop => break,
            };
            let sample_x = offset_x & (PATTERN_WIDTH - 1);
            let tile = tiles[tile_row + (offset_x >> 3)];

            let sample = patterns.sample(
                tile.pattern,
                flip(sample_x, tile.hflip, PATTERN_WIDTH),
                flip(sample_y, tile.vflip, PATTERN_HEIGHT),
            );
            if transparent && sample == 0 {
                continue;
            }
            let Some(&index) = palettes
                .get(usize::from(tile.palette))
                .and_then(|table| table.as_ref().get(usize::from(sample)))
            else {
                continue;
            };
            canvas.put(pixel_x, pixel_y, index);
        }
    }
}
