//! retrogress: a small fantasy console runtime
//!
//! A game implements [`Game`] and hands itself to [`run`]. It draws 8x8
//! patterns as sprites and tile layers onto an indexed canvas of 1, 2, 4 or
//! 8 bits per pixel, plays notes through a tiny mixer and reads keyboard and
//! mouse state once per update.

pub mod audio;
pub mod config;
pub mod display;
pub mod error;
pub mod graphics;
pub mod input;
pub mod output;
pub mod runtime;
pub mod util;

pub use audio::{Instrument, Mixer};
pub use config::{AudioConfig, Config, GameInfo, GraphicsConfig};
pub use error::Error;
pub use graphics::{BitDepth, Colour, Graphics, Phase, Tile};
pub use input::{Input, InputEvent, InputState, Key, MouseButton};
pub use output::{Output, TracingOutput};
pub use runtime::{run, Game, Session, System};
