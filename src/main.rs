//! Demo host: runs a small showcase game on the retrogress runtime

use std::f32::consts::TAU;
use std::sync::Arc;

use retrogress::{
    run, Colour, Config, Game, Graphics, Key, MouseButton, Output, System, Tile, TracingOutput,
};
use tracing::Level;
use tracing_subscriber::util::SubscriberInitExt;

// ============================================================================
// Assets
// ============================================================================

const CHECKER: u8 = 1;
const BRICK: u8 = 2;
const ARROW: u8 = 3;
const BALL: u8 = 4;

/// 2-bit checkerboard: two shades in 4x4 blocks
fn checker_pattern() -> [u8; 16] {
    let mut data = [0u8; 16];
    for (row, pair) in data.chunks_exact_mut(2).enumerate() {
        let (a, b) = if row < 4 { (0b0101_0101, 0b1010_1010) } else { (0b1010_1010, 0b0101_0101) };
        pair[0] = a;
        pair[1] = b;
    }
    data
}

/// 2-bit brick: mortar lines in colour 3, brick faces in colour 1
fn brick_pattern() -> [u8; 16] {
    let mut data = [0b0101_0101u8; 16];
    for row in [0, 4] {
        data[row * 2] = 0xFF;
        data[row * 2 + 1] = 0xFF;
    }
    // Vertical joints, offset on alternate courses
    for row in [1, 2, 3] {
        data[row * 2] = 0b1101_0101;
    }
    for row in [5, 6, 7] {
        data[row * 2 + 1] = 0b1101_0101;
    }
    data
}

/// 1-bit arrow pointing up and left
const ARROW_PATTERN: [u8; 8] = [
    0b1111_1000,
    0b1100_0000,
    0b1010_0000,
    0b1001_0000,
    0b1000_1000,
    0b0000_0100,
    0b0000_0010,
    0b0000_0000,
];

/// 1-bit filled circle
const BALL_PATTERN: [u8; 8] = [
    0b0011_1100,
    0b0111_1110,
    0b1111_1111,
    0b1111_1111,
    0b1111_1111,
    0b1111_1111,
    0b0111_1110,
    0b0011_1100,
];

/// Frequency of a MIDI note number
fn frequency(note: u8) -> f32 {
    440.0 * 2f32.powf((f32::from(note) - 69.0) / 12.0)
}

fn sine(note: u8, offset: f32) -> f32 {
    (offset * frequency(note) * TAU).sin()
}

fn square(note: u8, offset: f32) -> f32 {
    if (offset * frequency(note)).fract() < 0.5 {
        0.5
    } else {
        -0.5
    }
}

const MELODY: [u8; 8] = [60, 64, 67, 72, 67, 64, 60, 55];

// ============================================================================
// Showcase
// ============================================================================

/// Scrolling tile layer, flipped sprites, a mouse cursor and a melody
struct Showcase {
    tiles: Vec<Tile>,
    palettes: Vec<[u8; 4]>,
    scroll: u64,
    note_timer: u64,
    note_index: usize,
    mouse: (i32, i32),
    cursor_palette: [u8; 2],
}

impl Showcase {
    fn new() -> Self {
        Self {
            tiles: Vec::new(),
            palettes: vec![[1, 2, 3, 4], [5, 6, 7, 8], [0, 9, 10, 11]],
            scroll: 0,
            note_timer: 0,
            note_index: 0,
            mouse: (0, 0),
            cursor_palette: [0, 12],
        }
    }
}

impl Game for Showcase {
    fn configure(&mut self, config: &mut Config) {
        config.game.name = "retrogress showcase".to_string();
        config.game.version_major = 0;
        config.game.version_minor = 1;
        config.graphics.screen_width = 128;
        config.graphics.screen_height = 112;
        config.graphics.canvas_width = 160;
        config.graphics.canvas_height = 128;
        config.graphics.bits_per_pixel = 4;
        config.audio.instrument_count = 2;
    }

    fn begin(&mut self, system: &mut System) {
        let graphics = &mut *system.graphics;
        let ramp = [
            Colour(0x101018),
            Colour(0x2B3A67),
            Colour(0x496A81),
            Colour(0x66999B),
            Colour(0xB3AF8F),
            Colour(0x5C2E2E),
            Colour(0x8C4A3A),
            Colour(0xB86F50),
            Colour(0xD9A066),
            Colour(0x3F6E3F),
            Colour(0x6FA86F),
            Colour(0xA8D8A8),
            Colour::WHITE,
            Colour::rgb(0xFF, 0xD7, 0x00),
            Colour::rgb(0xE0, 0x40, 0x40),
            Colour::rgb(0x40, 0x80, 0xE0),
        ];
        graphics.write_colours(&ramp);

        graphics.write_pattern(CHECKER, 2, &checker_pattern());
        graphics.write_pattern(BRICK, 2, &brick_pattern());
        graphics.write_pattern(ARROW, 1, &ARROW_PATTERN);
        graphics.write_pattern(BALL, 1, &BALL_PATTERN);

        let (columns, rows) = graphics.tile_grid();
        self.tiles = (0..columns * rows)
            .map(|i| {
                let (x, y) = (i % columns, i / columns);
                if y % 4 == 3 {
                    Tile::new(BRICK, 1).flipped(x % 2 == 1, false)
                } else {
                    Tile::new(CHECKER, if (x / 2 + y / 2) % 2 == 0 { 0 } else { 2 })
                }
            })
            .collect();

        system.audio.set_instrument(0, Some(sine));
        system.audio.set_instrument(1, Some(square));

        tracing::info!(columns, rows, "showcase ready");
    }

    fn update(&mut self, system: &mut System, elapsed: u64) {
        let input = system.input;
        if input.key(Key::Escape).is_pressed() {
            system.quit();
            return;
        }

        self.scroll += elapsed;
        self.mouse = input.mouse_position();
        if input.mouse(MouseButton::Left).is_pressed() {
            self.cursor_palette[1] = 13 + (self.cursor_palette[1] - 12) % 3;
        }

        self.note_timer += elapsed;
        if self.note_timer >= 500_000 {
            self.note_timer -= 500_000;
            let note = MELODY[self.note_index % MELODY.len()];
            let pan = (self.note_index % 3) as f32 - 1.0;
            let instrument = u8::from(input.key(Key::Space).is_down());
            system.audio.play_note(instrument, note, 2.0, 0.4, pan);
            self.note_index += 1;
        }
    }

    fn render(&mut self, graphics: &mut Graphics) {
        // 20 pixels per second
        let offset = (self.scroll / 50_000) as i32;
        graphics.draw_tiles(-offset, offset / 2, &self.tiles, &self.palettes, true, true, false);

        let orbit = (self.scroll / 20_000) as i32 % 96;
        for (i, (hflip, vflip)) in [(false, false), (true, false), (false, true), (true, true)]
            .into_iter()
            .enumerate()
        {
            let x = 16 + i as i32 * 24;
            graphics.draw_sprite(x, 8 + orbit / 4, ARROW, Some(&[0, 12]), hflip, vflip, false, false);
        }

        let (x, y) = self.mouse;
        graphics.draw_sprite(x - 4, y - 4, BALL, Some(&self.cursor_palette), false, false, true, true);
    }
}

// ============================================================================
// Entry Point
// ============================================================================

struct Args {
    config: Option<String>,
    verbose: bool,
}

/// Parse command line arguments
fn parse_args() -> Args {
    let args: Vec<String> = std::env::args().collect();
    let mut parsed = Args {
        config: None,
        verbose: false,
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--verbose" | "-v" => parsed.verbose = true,
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    parsed.config = Some(args[i + 1].clone());
                    i += 1;
                }
            },
            "--help" => {
                println!("Usage: retrogress [OPTIONS]");
                println!();
                println!("Options:");
                println!("  --config JSON, -c JSON  Override configuration, e.g. '{{\"graphics\":{{\"bits_per_pixel\":2}}}}'");
                println!("  --verbose, -v           Log debug output");
                println!("  --help                  Show this help message");
                println!();
                println!("Controls:");
                println!("  Mouse        - Move the ball (wraps around the canvas)");
                println!("  Left click   - Change ball colour");
                println!("  Space (hold) - Square wave melody");
                println!("  Escape       - Quit");
                std::process::exit(0);
            },
            _ => {},
        }
        i += 1;
    }

    parsed
}

fn main() -> Result<(), String> {
    let args = parse_args();

    tracing_subscriber::fmt()
        .with_max_level(if args.verbose { Level::DEBUG } else { Level::INFO })
        .compact()
        .finish()
        .init();

    let output = Arc::new(TracingOutput::new());
    run(Box::new(Showcase::new()), args.config.as_deref(), output.clone())?;

    if output.is_safe() {
        Ok(())
    } else {
        Err("stopped after a fatal error".to_string())
    }
}
