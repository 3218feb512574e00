//! Indexed-colour graphics
//!
//! [`Graphics`] owns the canvas, the pattern bank and the palette. Everything a
//! game can do to them is gated by the current [`Phase`]: palette and pattern
//! access only while modifying (begin, update, end), pixel access and drawing
//! only while rendering. Calls made in the wrong phase do nothing.

pub mod canvas;
pub mod codec;
pub mod patterns;

mod blitter;

use crate::config::GraphicsConfig;
use crate::error::Error;
use crate::output::Output;
use crate::util::Cadence;

pub use canvas::Canvas;
pub use codec::BitDepth;
pub use patterns::PatternStore;

const SENDER: &str = "Graphics";

/// Largest canvas side in pixels
pub const MAX_CANVAS_SIZE: u32 = 1024;
/// Highest (and default) frame rate
pub const MAX_FRAME_RATE: u32 = 60;

// ============================================================================
// Colour
// ============================================================================

/// Packed 0x00RRGGBB colour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Colour(pub u32);

impl Colour {
    pub const BLACK: Self = Self(0);
    pub const WHITE: Self = Self(0x00FF_FFFF);

    #[inline]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self(((r as u32) << 16) | ((g as u32) << 8) | b as u32)
    }

    #[inline]
    pub const fn red(self) -> u8 {
        (self.0 >> 16) as u8
    }

    #[inline]
    pub const fn green(self) -> u8 {
        (self.0 >> 8) as u8
    }

    #[inline]
    pub const fn blue(self) -> u8 {
        self.0 as u8
    }

    /// RGB bits only, anything above bit 23 dropped
    #[inline]
    pub const fn packed(self) -> u32 {
        self.0 & 0x00FF_FFFF
    }
}

/// One cell of a tile layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Tile {
    pub pattern: u8,
    /// Index into the palettes passed to [`Graphics::draw_tiles`]
    pub palette: u8,
    pub hflip: bool,
    pub vflip: bool,
}

impl Tile {
    pub const fn new(pattern: u8, palette: u8) -> Self {
        Self {
            pattern,
            palette,
            hflip: false,
            vflip: false,
        }
    }

    pub const fn flipped(self, hflip: bool, vflip: bool) -> Self {
        Self { hflip, vflip, ..self }
    }
}

/// What the context currently allows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Ready,
    Modifying,
    Rendering,
}

// ============================================================================
// Settings
// ============================================================================

/// Validated graphics configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settings {
    pub screen_width: usize,
    pub screen_height: usize,
    pub canvas_width: usize,
    pub canvas_height: usize,
    pub depth: BitDepth,
    pub frame_rate: u32,
}

impl Settings {
    /// Clamp every out-of-range field, warning once per correction
    pub fn validate(config: &GraphicsConfig, output: &dyn Output) -> Self {
        let canvas_width = clamp_canvas("width", config.canvas_width, output);
        let canvas_height = clamp_canvas("height", config.canvas_height, output);
        let screen_width = clamp_screen("width", config.screen_width, canvas_width, output);
        let screen_height = clamp_screen("height", config.screen_height, canvas_height, output);

        let depth = BitDepth::snap(config.bits_per_pixel);
        if depth.bits() != config.bits_per_pixel {
            output.warning(
                SENDER,
                &format!(
                    "{} bits per pixel is not supported, using {}",
                    config.bits_per_pixel,
                    depth.bits()
                ),
            );
        }

        let mut frame_rate = config.frame_rate;
        if frame_rate == 0 || frame_rate > MAX_FRAME_RATE {
            output.warning(
                SENDER,
                &format!(
                    "frame rate {} is out of range, using {}",
                    frame_rate, MAX_FRAME_RATE
                ),
            );
            frame_rate = MAX_FRAME_RATE;
        }

        Self {
            screen_width: screen_width as usize,
            screen_height: screen_height as usize,
            canvas_width: canvas_width as usize,
            canvas_height: canvas_height as usize,
            depth,
            frame_rate,
        }
    }
}

fn clamp_canvas(axis: &str, size: u32, output: &dyn Output) -> u32 {
    if size == 0 || size > MAX_CANVAS_SIZE || size % 8 != 0 {
        output.warning(
            SENDER,
            &format!(
                "canvas {} {} must be a multiple of 8 between 8 and {}, using {}",
                axis, size, MAX_CANVAS_SIZE, MAX_CANVAS_SIZE
            ),
        );
        MAX_CANVAS_SIZE
    } else {
        size
    }
}

fn clamp_screen(axis: &str, size: u32, canvas: u32, output: &dyn Output) -> u32 {
    if size == 0 || size > canvas {
        output.warning(
            SENDER,
            &format!(
                "screen {} {} does not fit the canvas, using {}",
                axis, size, canvas
            ),
        );
        canvas
    } else if size % 8 != 0 {
        let rounded = (size & !7).max(8);
        output.warning(
            SENDER,
            &format!(
                "screen {} {} is not a multiple of 8, using {}",
                axis, size, rounded
            ),
        );
        rounded
    } else {
        size
    }
}

/// Grey ramp from black to white across every slot
fn default_palette(depth: BitDepth) -> Vec<Colour> {
    let colours = depth.colours();
    let step = 255 / (colours - 1);
    (0..colours)
        .map(|index| {
            let value = (index * step) as u8;
            Colour::rgb(value, value, value)
        })
        .collect()
}

// ============================================================================
// Graphics Context
// ============================================================================

pub struct Graphics {
    settings: Settings,
    canvas: Canvas,
    patterns: PatternStore,
    palette: Vec<Colour>,
    phase: Phase,
    cadence: Cadence,
}

impl Graphics {
    /// Validate `config` and allocate the canvas and pattern bank.
    /// Allocation failure is reported as a fatal error.
    pub fn new(config: &GraphicsConfig, output: &dyn Output) -> Result<Self, Error> {
        let settings = Settings::validate(config, output);

        let patterns = PatternStore::try_new(settings.depth).map_err(|_| {
            output.error(SENDER, "could not allocate pattern memory", true);
            Error::Allocation("pattern memory")
        })?;
        let canvas = Canvas::try_new(
            settings.screen_width,
            settings.screen_height,
            settings.canvas_width,
            settings.canvas_height,
            settings.depth,
        )
        .map_err(|_| {
            output.error(SENDER, "could not allocate pixel memory", true);
            Error::Allocation("pixel memory")
        })?;

        tracing::debug!(
            sender = SENDER,
            screen_width = settings.screen_width,
            screen_height = settings.screen_height,
            canvas_width = settings.canvas_width,
            canvas_height = settings.canvas_height,
            bits = settings.depth.bits(),
            frame_rate = settings.frame_rate,
            "graphics ready"
        );

        Ok(Self {
            palette: default_palette(settings.depth),
            cadence: Cadence::per_second(settings.frame_rate),
            settings,
            canvas,
            patterns,
            phase: Phase::Ready,
        })
    }

    #[inline]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    #[inline]
    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    #[inline]
    pub fn palette(&self) -> &[Colour] {
        &self.palette
    }

    #[inline]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    #[inline]
    pub fn depth(&self) -> BitDepth {
        self.settings.depth
    }

    #[inline]
    pub fn colour_count(&self) -> usize {
        self.palette.len()
    }

    #[inline]
    fn modifying(&self) -> bool {
        self.phase == Phase::Modifying
    }

    #[inline]
    fn rendering(&self) -> bool {
        self.phase == Phase::Rendering
    }

    pub(crate) fn begin_modify(&mut self) {
        self.phase = Phase::Modifying;
    }

    pub(crate) fn end_modify(&mut self) {
        self.phase = Phase::Ready;
    }

    pub(crate) fn begin_render(&mut self) {
        self.phase = Phase::Rendering;
    }

    pub(crate) fn end_render(&mut self) {
        self.phase = Phase::Ready;
    }

    // ------------------------------------------------------------------------
    // Palette
    // ------------------------------------------------------------------------

    /// Colour in slot `index` (wrapped to the palette size); black unless modifying
    pub fn get_colour(&self, index: u8) -> Colour {
        if !self.modifying() {
            return Colour::BLACK;
        }
        self.palette[usize::from(index) % self.palette.len()]
    }

    pub fn set_colour(&mut self, index: u8, colour: Colour) {
        if !self.modifying() {
            return;
        }
        let len = self.palette.len();
        self.palette[usize::from(index) % len] = colour;
    }

    /// Copy the whole palette into `out`, which must hold `colour_count()` entries
    pub fn read_colours(&self, out: &mut [Colour]) {
        if !self.modifying() || out.len() < self.palette.len() {
            return;
        }
        out[..self.palette.len()].copy_from_slice(&self.palette);
    }

    /// Replace the whole palette from the first `colour_count()` entries of `colours`
    pub fn write_colours(&mut self, colours: &[Colour]) {
        if !self.modifying() || colours.len() < self.palette.len() {
            return;
        }
        let len = self.palette.len();
        self.palette.copy_from_slice(&colours[..len]);
    }

    // ------------------------------------------------------------------------
    // Patterns
    // ------------------------------------------------------------------------

    /// Decode pattern `index` into `out` at `bits` per pixel
    pub fn read_pattern(&self, index: u8, bits: u32, out: &mut [u8]) {
        if self.modifying() {
            self.patterns.read(index, bits, out);
        }
    }

    /// Store `input`, packed at `bits` per pixel, as pattern `index`
    pub fn write_pattern(&mut self, index: u8, bits: u32, input: &[u8]) {
        if self.modifying() {
            self.patterns.write(index, bits, input);
        }
    }

    // ------------------------------------------------------------------------
    // Pixels and drawing
    // ------------------------------------------------------------------------

    pub fn get_pixel(&self, x: i32, y: i32) -> u8 {
        if self.rendering() {
            self.canvas.get_pixel(x, y)
        } else {
            0
        }
    }

    pub fn set_pixel(&mut self, x: i32, y: i32, index: u8) {
        if self.rendering() {
            self.canvas.set_pixel(x, y, index);
        }
    }

    /// Draw pattern `pattern` at (x, y). `palette` remaps pattern colours to
    /// palette slots; colour 0 is always transparent.
    pub fn draw_sprite(
        &mut self,
        x: i32,
        y: i32,
        pattern: u8,
        palette: Option<&[u8]>,
        hflip: bool,
        vflip: bool,
        hwrap: bool,
        vwrap: bool,
    ) {
        if !self.rendering() {
            return;
        }
        blitter::draw_sprite(
            &mut self.canvas,
            &self.patterns,
            x,
            y,
            pattern,
            palette,
            hflip,
            vflip,
            hwrap,
            vwrap,
        );
    }

    /// Draw a canvas-sized tile layer offset by (x, y). `tiles` must cover
    /// ceil(canvas_width / 8) x ceil(canvas_height / 8) cells, row-major.
    pub fn draw_tiles<P: AsRef<[u8]>>(
        &mut self,
        x: i32,
        y: i32,
        tiles: &[Tile],
        palettes: &[P],
        hwrap: bool,
        vwrap: bool,
        transparent: bool,
    ) {
        if !self.rendering() {
            return;
        }
        blitter::draw_tiles(
            &mut self.canvas,
            &self.patterns,
            x,
            y,
            tiles,
            palettes,
            hwrap,
            vwrap,
            transparent,
        );
    }

    /// Tile cells per row and per column for this canvas
    pub fn tile_grid(&self) -> (usize, usize) {
        (
            (self.settings.canvas_width + 7) / 8,
            (self.settings.canvas_height + 7) / 8,
        )
    }

    // ------------------------------------------------------------------------
    // Frame cadence
    // ------------------------------------------------------------------------

    /// Render a frame if one is due at `now` (microseconds). The canvas is
    /// cleared and `render` runs while rendering. Returns true when a frame
    /// was produced and should be presented.
    pub fn render_frame(&mut self, now: u64, render: impl FnOnce(&mut Self)) -> bool {
        if !self.cadence.due(now) {
            return false;
        }
        self.canvas.clear();
        self.begin_render();
        render(self);
        self.end_render();
        self.cadence.mark(now);
        true
    }

    /// Microseconds until the next frame is due
    pub fn until_next_frame(&self, now: u64) -> u64 {
        self.cadence.interval().saturating_sub(self.cadence.elapsed(now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::testing::Recorder;

    fn config(size: u32, bits: u32) -> GraphicsConfig {
        GraphicsConfig {
            screen_width: size,
            screen_height: size,
            canvas_width: size,
            canvas_height: size,
            bits_per_pixel: bits,
            ..GraphicsConfig::default()
        }
    }

    fn graphics(size: u32, bits: u32) -> Graphics {
        Graphics::new(&config(size, bits), &Recorder::default()).unwrap()
    }

    #[test]
    fn test_defaults_are_accepted_silently() {
        let output = Recorder::default();
        let g = Graphics::new(&GraphicsConfig::default(), &output).unwrap();
        assert_eq!(output.warning_count(), 0);
        assert_eq!(g.settings().screen_width, 1024);
        assert_eq!(g.depth(), BitDepth::Eight);
        assert_eq!(g.phase(), Phase::Ready);
    }

    #[test]
    fn test_bits_snap_up_with_one_warning() {
        let output = Recorder::default();
        let g = Graphics::new(&config(64, 3), &output).unwrap();
        assert_eq!(g.depth(), BitDepth::Four);
        assert_eq!(g.colour_count(), 16);
        assert_eq!(output.warning_count(), 1);
        assert_eq!(output.warnings.lock().unwrap()[0].0, "Graphics");
    }

    #[test]
    fn test_frame_rate_clamp() {
        for rate in [0, 61, 1000] {
            let output = Recorder::default();
            let g = Graphics::new(&GraphicsConfig { frame_rate: rate, ..config(64, 8) }, &output).unwrap();
            assert_eq!(g.settings().frame_rate, 60);
            assert_eq!(output.warning_count(), 1);
        }
    }

    #[test]
    fn test_canvas_clamp() {
        let output = Recorder::default();
        let settings = Settings::validate(
            &GraphicsConfig {
                canvas_width: 1000,
                canvas_height: 2048,
                screen_width: 320,
                screen_height: 240,
                ..GraphicsConfig::default()
            },
            &output,
        );
        assert_eq!(settings.canvas_width, 1024);
        assert_eq!(settings.canvas_height, 1024);
        assert_eq!(settings.screen_width, 320);
        assert_eq!(output.warning_count(), 2);
    }

    #[test]
    fn test_screen_clamp() {
        let output = Recorder::default();
        let settings = Settings::validate(
            &GraphicsConfig {
                canvas_width: 256,
                canvas_height: 128,
                screen_width: 0,
                screen_height: 200,
                ..GraphicsConfig::default()
            },
            &output,
        );
        assert_eq!((settings.screen_width, settings.screen_height), (256, 128));
        assert_eq!(output.warning_count(), 2);

        let output = Recorder::default();
        let settings = Settings::validate(
            &GraphicsConfig {
                canvas_width: 256,
                canvas_height: 256,
                screen_width: 100,
                screen_height: 5,
                ..GraphicsConfig::default()
            },
            &output,
        );
        assert_eq!((settings.screen_width, settings.screen_height), (96, 8));
        assert_eq!(output.warning_count(), 2);
    }

    #[test]
    fn test_default_palette_is_grey_ramp() {
        let mut g = graphics(8, 2);
        assert_eq!(
            g.palette(),
            &[Colour(0), Colour(0x555555), Colour(0xAAAAAA), Colour(0xFFFFFF)]
        );
        let g8 = graphics(8, 8);
        assert_eq!(g8.palette()[255], Colour::WHITE);
        assert_eq!(g8.palette()[16], Colour(0x101010));

        g.begin_modify();
        assert_eq!(g.get_colour(6), Colour(0xAAAAAA));
    }

    #[test]
    fn test_colour_channels() {
        let c = Colour::rgb(0x12, 0x34, 0x56);
        assert_eq!(c, Colour(0x123456));
        assert_eq!((c.red(), c.green(), c.blue()), (0x12, 0x34, 0x56));
        assert_eq!(Colour(0xFF12_3456).packed(), 0x123456);
    }

    #[test]
    fn test_palette_only_changes_while_modifying() {
        let mut g = graphics(8, 4);
        let before = g.palette().to_vec();
        g.set_colour(1, Colour(0x123456));
        g.write_colours(&[Colour(0xFF); 16]);
        assert_eq!(g.palette(), &before[..]);
        assert_eq!(g.get_colour(15), Colour::BLACK);

        g.begin_modify();
        g.set_colour(17, Colour(0x123456));
        assert_eq!(g.get_colour(1), Colour(0x123456));
        g.end_modify();

        g.begin_render();
        g.set_colour(2, Colour(0x654321));
        g.end_render();
        assert_ne!(g.palette()[2], Colour(0x654321));
    }

    #[test]
    fn test_read_write_colours() {
        let mut g = graphics(8, 1);
        g.begin_modify();
        g.write_colours(&[Colour(0x0000FF)]);
        assert_eq!(g.palette()[1], Colour::WHITE);

        g.write_colours(&[Colour(0x0000FF), Colour(0x00FF00), Colour(0xFF0000)]);
        let mut out = [Colour::BLACK; 2];
        g.read_colours(&mut out);
        assert_eq!(out, [Colour(0x0000FF), Colour(0x00FF00)]);
    }

    #[test]
    fn test_patterns_only_change_while_modifying() {
        let mut g = graphics(8, 8);
        g.write_pattern(1, 8, &[7u8; 64]);

        g.begin_modify();
        let mut out = [0u8; 64];
        g.read_pattern(1, 8, &mut out);
        assert_eq!(out, [0u8; 64]);

        g.write_pattern(1, 8, &[7u8; 64]);
        g.read_pattern(1, 8, &mut out);
        assert_eq!(out, [7u8; 64]);
        g.end_modify();

        let mut out = [0u8; 64];
        g.read_pattern(1, 8, &mut out);
        assert_eq!(out, [0u8; 64]);
    }

    #[test]
    fn test_pattern_round_trip_every_depth() {
        for bits in [1, 2, 4, 8] {
            let mut g = graphics(8, bits);
            let len = BitDepth::snap(bits).pattern_bytes();
            let input: Vec<u8> = (0..len).map(|i| (i * 29 + 3) as u8).collect();
            g.begin_modify();
            g.write_pattern(200, bits, &input);
            let mut out = vec![0u8; len];
            g.read_pattern(200, bits, &mut out);
            assert_eq!(out, input, "{} bits", bits);
        }
    }

    #[test]
    fn test_pixels_only_while_rendering() {
        let mut g = graphics(16, 2);
        g.set_pixel(1, 1, 3);
        g.begin_render();
        assert_eq!(g.get_pixel(1, 1), 0);
        g.set_pixel(1, 1, 7);
        assert_eq!(g.get_pixel(1, 1), 3);
        g.end_render();

        assert_eq!(g.get_pixel(1, 1), 0);
        g.begin_modify();
        g.set_pixel(1, 1, 1);
        assert_eq!(g.get_pixel(1, 1), 0);
        g.end_modify();
        assert_eq!(g.canvas().get_pixel(1, 1), 3);
    }

    #[test]
    fn test_drawing_ignored_outside_render() {
        let mut g = graphics(16, 8);
        g.begin_modify();
        g.write_pattern(1, 8, &[9u8; 64]);
        g.draw_sprite(0, 0, 1, None, false, false, false, false);
        let tiles = vec![Tile::new(1, 0); 4];
        g.draw_tiles(0, 0, &tiles, &[[1u8; 256]], false, false, false);
        g.end_modify();
        assert!(g.canvas().as_bytes().iter().all(|&b| b == 0));

        g.begin_render();
        g.draw_sprite(0, 0, 1, None, false, false, false, false);
        assert_eq!(g.get_pixel(7, 7), 9);
        assert_eq!(g.get_pixel(8, 8), 0);
        g.end_render();
    }

    #[test]
    fn test_tile_grid() {
        let g = graphics(64, 4);
        assert_eq!(g.tile_grid(), (8, 8));
    }

    #[test]
    fn test_render_frame_cadence() {
        let mut g = graphics(16, 4);
        assert!(!g.render_frame(0, |_| panic!("frame not due")));

        let mut phase = Phase::Ready;
        assert!(g.render_frame(16_666, |g| {
            phase = g.phase();
            g.set_pixel(0, 0, 5);
        }));
        assert_eq!(phase, Phase::Rendering);
        assert_eq!(g.phase(), Phase::Ready);
        assert_eq!(g.canvas().get_pixel(0, 0), 5);

        assert!(!g.render_frame(20_000, |_| panic!("frame not due")));
        assert_eq!(g.until_next_frame(20_000), 16_666 - (20_000 - 16_666));

        // Each frame starts from a cleared canvas
        assert!(g.render_frame(40_000, |_| {}));
        assert_eq!(g.canvas().get_pixel(0, 0), 0);
    }
}
