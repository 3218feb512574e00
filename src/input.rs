//! Keyboard and mouse state
//!
//! The presenter turns window events into [`InputEvent`]s that set raw held
//! flags. Once per update tick [`Input::update`] folds those flags into a
//! four-state machine per key, so games can tell the tick a key went down
//! from the ticks it was merely held.

/// Window events the runtime understands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    Quit,
    KeyDown(Key),
    KeyUp(Key),
    /// Position in screen pixels
    MouseMove { x: i32, y: i32 },
    MouseDown(MouseButton),
    MouseUp(MouseButton),
    FocusGained,
    FocusLost,
    Minimized,
    Restored,
}

/// State of one key or button for the current tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputState {
    #[default]
    Up,
    /// Went down this tick
    Pressed,
    /// Held since an earlier tick
    Down,
    /// Went up this tick
    Released,
}

impl InputState {
    #[inline]
    pub fn is_up(self) -> bool {
        matches!(self, Self::Up | Self::Released)
    }

    #[inline]
    pub fn is_down(self) -> bool {
        matches!(self, Self::Pressed | Self::Down)
    }

    #[inline]
    pub fn is_pressed(self) -> bool {
        self == Self::Pressed
    }

    #[inline]
    pub fn is_released(self) -> bool {
        self == Self::Released
    }

    /// State after one tick with the key `held` or not
    #[inline]
    fn next(self, held: bool) -> Self {
        match (held, self.is_down()) {
            (true, false) => Self::Pressed,
            (true, true) => Self::Down,
            (false, true) => Self::Released,
            (false, false) => Self::Up,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    /// `0`-`9` or `A`-`Z`; lowercase letters are folded to uppercase
    Char(u8),
    Escape,
    Return,
    Menu,
    LeftControl,
    RightControl,
    LeftShift,
    RightShift,
    LeftAlt,
    RightAlt,
    Backspace,
    Space,
    Tab,
    Up,
    Down,
    Left,
    Right,
    Period,
    Comma,
    Minus,
    Plus,
    /// F1 to F12
    F(u8),
}

impl Key {
    /// Slot in the state table, None for keys outside the supported set
    pub fn code(self) -> Option<usize> {
        let code = match self {
            Self::Char(c) if c.is_ascii_alphanumeric() => c.to_ascii_uppercase(),
            Self::Char(_) => return None,
            Self::Escape => 0x80,
            Self::Return => 0x81,
            Self::Menu => 0x82,
            Self::LeftControl => 0x83,
            Self::RightControl => 0x84,
            Self::LeftShift => 0x85,
            Self::RightShift => 0x86,
            Self::LeftAlt => 0x87,
            Self::RightAlt => 0x88,
            Self::Backspace => 0x89,
            Self::Space => 0x8A,
            Self::Tab => 0x8B,
            Self::Up => 0x8C,
            Self::Down => 0x8D,
            Self::Left => 0x8E,
            Self::Right => 0x8F,
            Self::Period => 0x90,
            Self::Comma => 0x91,
            Self::Minus => 0x92,
            Self::Plus => 0x93,
            Self::F(n @ 1..=12) => 0xA0 + n,
            Self::F(_) => return None,
        };
        Some(usize::from(code))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Middle,
    Right,
}

impl MouseButton {
    #[inline]
    fn code(self) -> usize {
        match self {
            Self::Left => 1,
            Self::Middle => 2,
            Self::Right => 3,
        }
    }
}

const SLOTS: usize = 256;

pub struct Input {
    held: [bool; SLOTS],
    states: [InputState; SLOTS],
    focused: bool,
    mouse_x: i32,
    mouse_y: i32,
}

impl Input {
    pub fn new() -> Self {
        Self {
            held: [false; SLOTS],
            states: [InputState::Up; SLOTS],
            focused: true,
            mouse_x: 0,
            mouse_y: 0,
        }
    }

    #[inline]
    pub fn focused(&self) -> bool {
        self.focused
    }

    /// Record a window event. Takes effect on the next [`Input::update`],
    /// except mouse motion which is immediate.
    pub fn handle(&mut self, event: &InputEvent) {
        match *event {
            InputEvent::KeyDown(key) => self.set_key(key, true),
            InputEvent::KeyUp(key) => self.set_key(key, false),
            InputEvent::MouseDown(button) => self.held[button.code()] = true,
            InputEvent::MouseUp(button) => self.held[button.code()] = false,
            InputEvent::MouseMove { x, y } => {
                if self.focused {
                    self.mouse_x = x;
                    self.mouse_y = y;
                }
            },
            InputEvent::FocusGained => self.focused = true,
            InputEvent::FocusLost => {
                self.focused = false;
                self.held = [false; SLOTS];
            },
            InputEvent::Quit | InputEvent::Minimized | InputEvent::Restored => {},
        }
    }

    fn set_key(&mut self, key: Key, held: bool) {
        if let Some(code) = key.code() {
            self.held[code] = held;
        }
    }

    /// Advance every key and button by one tick
    pub fn update(&mut self) {
        let focused = self.focused;
        for (state, &held) in self.states.iter_mut().zip(self.held.iter()) {
            *state = state.next(held && focused);
        }
    }

    pub fn key(&self, key: Key) -> InputState {
        key.code().map_or(InputState::Up, |code| self.states[code])
    }

    pub fn mouse(&self, button: MouseButton) -> InputState {
        self.states[button.code()]
    }

    /// Last mouse position in screen pixels
    pub fn mouse_position(&self) -> (i32, i32) {
        (self.mouse_x, self.mouse_y)
    }
}

impl Default for Input {
    fn default() -> Self {
        Self::new()
    }
}
