//! SDL2 presentation window
//!
//! Shows the indexed canvas through the palette at the largest whole-number
//! scale that fits the window, centred on black, and turns SDL events into
//! [`InputEvent`]s in screen pixel coordinates.

use sdl2::event::{Event, WindowEvent};
use sdl2::keyboard::Keycode;
use sdl2::mouse::MouseButton as SdlMouseButton;
use sdl2::pixels::{Color, PixelFormatEnum};
use sdl2::rect::Rect;
use sdl2::render::{Canvas, Texture, TextureCreator};
use sdl2::video::{Window, WindowContext};
use sdl2::{EventPump, Sdl};

use crate::error::Error;
use crate::graphics::{self, Colour};
use crate::input::{InputEvent, Key, MouseButton};

/// The window grows in whole screen multiples until it is at least this wide
/// (or taller than this)
const PREFERRED_SIZE: u32 = 512;

pub struct Display {
    sdl: Sdl,
    renderer: Canvas<Window>,
    event_pump: EventPump,
    screen_width: u32,
    screen_height: u32,
    pixels: Vec<u8>,
}

/// Streaming texture the staged frame is uploaded into
pub struct Screen<'a> {
    texture: Texture<'a>,
    width: u32,
}

/// Where the scaled screen sits inside the window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub x: i32,
    pub y: i32,
    pub scale: u32,
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    /// Largest whole-number scale of the screen that fits `output`, centred
    pub fn fit(output_width: u32, output_height: u32, screen_width: u32, screen_height: u32) -> Self {
        let scale = (output_width / screen_width.max(1))
            .min(output_height / screen_height.max(1))
            .max(1);
        let width = screen_width * scale;
        let height = screen_height * scale;
        Self {
            x: (output_width as i32 >> 1) - (width as i32 >> 1),
            y: (output_height as i32 >> 1) - (height as i32 >> 1),
            scale,
            width,
            height,
        }
    }

    /// Window coordinates back to screen pixels
    #[inline]
    pub fn to_screen(&self, x: i32, y: i32) -> (i32, i32) {
        let scale = self.scale as i32;
        ((x - self.x).div_euclid(scale), (y - self.y).div_euclid(scale))
    }

    fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }
}

/// Initial window size: whole multiples of the screen
pub fn initial_window_size(screen_width: u32, screen_height: u32) -> (u32, u32) {
    let (mut width, mut height) = (screen_width, screen_height);
    while width < PREFERRED_SIZE && height <= PREFERRED_SIZE {
        width += screen_width;
        height += screen_height;
    }
    (width, height)
}

impl Display {
    /// Create the window and renderer for a screen of the given size
    pub fn open(
        title: &str,
        screen_width: u32,
        screen_height: u32,
    ) -> Result<(Self, TextureCreator<WindowContext>), Error> {
        let sdl_context = sdl2::init().map_err(Error::Window)?;
        let video_subsystem = sdl_context.video().map_err(Error::Window)?;

        let (width, height) = initial_window_size(screen_width, screen_height);
        let mut window = video_subsystem
            .window(title, width, height)
            .position_centered()
            .resizable()
            .build()
            .map_err(|e| Error::Window(e.to_string()))?;
        window
            .set_minimum_size(screen_width, screen_height)
            .map_err(|e| Error::Window(e.to_string()))?;

        let renderer = window
            .into_canvas()
            .accelerated()
            .build()
            .map_err(|e| Error::Window(e.to_string()))?;

        let texture_creator = renderer.texture_creator();
        let event_pump = sdl_context.event_pump().map_err(Error::Window)?;

        tracing::info!(
            sender = "Graphics",
            title,
            width,
            height,
            "window open"
        );

        Ok((
            Self {
                sdl: sdl_context,
                renderer,
                event_pump,
                screen_width,
                screen_height,
                pixels: vec![0; (screen_width * screen_height * 4) as usize],
            },
            texture_creator,
        ))
    }

    /// SDL context, for opening the audio device
    pub fn sdl(&self) -> &Sdl {
        &self.sdl
    }

    pub fn screen_width(&self) -> u32 {
        self.screen_width
    }

    pub fn screen_height(&self) -> u32 {
        self.screen_height
    }

    fn viewport(&self) -> Result<Viewport, Error> {
        let (width, height) = self.renderer.output_size().map_err(Error::Window)?;
        Ok(Viewport::fit(width, height, self.screen_width, self.screen_height))
    }

    /// Expand a finished frame through the palette. Cheap enough to call
    /// while holding the graphics lock.
    pub fn stage(&mut self, canvas: &graphics::Canvas, palette: &[Colour]) {
        canvas.expand_argb(palette, &mut self.pixels);
    }

    /// Upload the staged frame and show it
    pub fn show(&mut self, screen: &mut Screen) -> Result<(), Error> {
        screen
            .texture
            .update(None, &self.pixels, (screen.width * 4) as usize)
            .map_err(|e| Error::Window(e.to_string()))?;

        let viewport = self.viewport()?;
        self.renderer.set_draw_color(Color::BLACK);
        self.renderer.clear();
        self.renderer
            .copy(&screen.texture, None, Some(viewport.rect()))
            .map_err(Error::Window)?;
        self.renderer.present();
        Ok(())
    }

    pub fn poll_events(&mut self) -> Vec<InputEvent> {
        // Mouse positions arrive in window points, not renderer pixels
        let (window_width, window_height) = self.renderer.window().size();
        let viewport = Viewport::fit(window_width, window_height, self.screen_width, self.screen_height);
        let mut events = Vec::new();

        for event in self.event_pump.poll_iter() {
            match event {
                Event::Quit { .. } => events.push(InputEvent::Quit),
                Event::KeyDown {
                    keycode: Some(k),
                    repeat: false,
                    ..
                } => {
                    if let Some(key) = map_key(k) {
                        events.push(InputEvent::KeyDown(key));
                    }
                },
                Event::KeyUp {
                    keycode: Some(k), ..
                } => {
                    if let Some(key) = map_key(k) {
                        events.push(InputEvent::KeyUp(key));
                    }
                },
                Event::MouseMotion { x, y, .. } => {
                    let (x, y) = viewport.to_screen(x, y);
                    events.push(InputEvent::MouseMove { x, y });
                },
                Event::MouseButtonDown { mouse_btn, .. } => {
                    if let Some(button) = map_mouse_button(mouse_btn) {
                        events.push(InputEvent::MouseDown(button));
                    }
                },
                Event::MouseButtonUp { mouse_btn, .. } => {
                    if let Some(button) = map_mouse_button(mouse_btn) {
                        events.push(InputEvent::MouseUp(button));
                    }
                },
                Event::Window { win_event, .. } => match win_event {
                    WindowEvent::FocusGained => events.push(InputEvent::FocusGained),
                    WindowEvent::FocusLost => events.push(InputEvent::FocusLost),
                    WindowEvent::Minimized => events.push(InputEvent::Minimized),
                    WindowEvent::Restored => events.push(InputEvent::Restored),
                    _ => {},
                },
                _ => {},
            }
        }

        events
    }
}

impl<'a> Screen<'a> {
    pub fn with_size(
        texture_creator: &'a TextureCreator<WindowContext>,
        width: u32,
        height: u32,
    ) -> Result<Self, Error> {
        let texture = texture_creator
            .create_texture_streaming(PixelFormatEnum::ARGB8888, width, height)
            .map_err(|e| Error::Window(e.to_string()))?;
        Ok(Self { texture, width })
    }
}

fn map_key(keycode: Keycode) -> Option<Key> {
    let key = match keycode {
        Keycode::Escape => Key::Escape,
        Keycode::Return | Keycode::KpEnter => Key::Return,
        Keycode::Menu | Keycode::Application => Key::Menu,
        Keycode::LCtrl => Key::LeftControl,
        Keycode::RCtrl => Key::RightControl,
        Keycode::LShift => Key::LeftShift,
        Keycode::RShift => Key::RightShift,
        Keycode::LAlt => Key::LeftAlt,
        Keycode::RAlt => Key::RightAlt,
        Keycode::Backspace => Key::Backspace,
        Keycode::Space => Key::Space,
        Keycode::Tab => Key::Tab,
        Keycode::Up => Key::Up,
        Keycode::Down => Key::Down,
        Keycode::Left => Key::Left,
        Keycode::Right => Key::Right,
        Keycode::Period => Key::Period,
        Keycode::Comma => Key::Comma,
        Keycode::Minus | Keycode::KpMinus => Key::Minus,
        // '+' shares the '=' key on most layouts
        Keycode::Plus | Keycode::Equals | Keycode::KpPlus => Key::Plus,
        Keycode::F1 => Key::F(1),
        Keycode::F2 => Key::F(2),
        Keycode::F3 => Key::F(3),
        Keycode::F4 => Key::F(4),
        Keycode::F5 => Key::F(5),
        Keycode::F6 => Key::F(6),
        Keycode::F7 => Key::F(7),
        Keycode::F8 => Key::F(8),
        Keycode::F9 => Key::F(9),
        Keycode::F10 => Key::F(10),
        Keycode::F11 => Key::F(11),
        Keycode::F12 => Key::F(12),
        other => return char_key(&other.name()),
    };
    Some(key)
}

/// Single letters and digits, by SDL key name
fn char_key(name: &str) -> Option<Key> {
    match name.as_bytes() {
        [c] if c.is_ascii_alphanumeric() => Some(Key::Char(c.to_ascii_uppercase())),
        _ => None,
    }
}

fn map_mouse_button(btn: SdlMouseButton) -> Option<MouseButton> {
    match btn {
        SdlMouseButton::Left => Some(MouseButton::Left),
        SdlMouseButton::Right => Some(MouseButton::Right),
        SdlMouseButton::Middle => Some(MouseButton::Middle),
        _ => None,
    }
}
