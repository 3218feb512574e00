//! Game loop
//!
//! A [`Session`] owns the shared state and implements one step of each
//! phase without touching SDL, so the loop logic can run headless. [`run`]
//! wires a session to a window and an audio device.
//!
//! Locking: the mixer and the machine (graphics, input and game) each sit
//! behind a mutex. Updates take the mixer first and then the machine,
//! rendering takes the machine only and the audio callback the mixer only.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::audio::{Mixer, Speaker};
use crate::config::Config;
use crate::display::{Display, Screen};
use crate::error::Error;
use crate::graphics::{Canvas, Colour, Graphics};
use crate::input::{Input, InputEvent};
use crate::output::Output;
use crate::util::{Cadence, Clock, ONE_SECOND};

/// Shortest gap between two updates, in microseconds
pub const UPDATE_INTERVAL: u64 = ONE_SECOND / 1000;

/// Main loop sleep between polls
const IDLE: Duration = Duration::from_micros(250);

// ============================================================================
// Game Interface
// ============================================================================

/// Callbacks a game implements. Everything except `render` is optional.
pub trait Game: Send {
    /// Adjust the configuration before anything is created
    fn configure(&mut self, _config: &mut Config) {}

    /// Runs once with palette, patterns and instruments writable
    fn begin(&mut self, _system: &mut System) {}

    /// Runs at most once per millisecond; `elapsed` is in microseconds
    fn update(&mut self, _system: &mut System, _elapsed: u64) {}

    /// Draws one frame onto a cleared canvas
    fn render(&mut self, graphics: &mut Graphics);

    /// Runs once before shutdown
    fn end(&mut self, _system: &mut System) {}
}

/// What a game can reach from `begin`, `update` and `end`
pub struct System<'a> {
    pub graphics: &'a mut Graphics,
    pub audio: &'a mut Mixer,
    pub input: &'a Input,
    running: &'a AtomicBool,
}

impl System<'_> {
    /// Stop the game after the current callback
    pub fn quit(&self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

struct Machine {
    graphics: Graphics,
    input: Input,
    game: Box<dyn Game>,
}

#[inline]
fn lock<'a, T>(mutex: &'a Mutex<T>, what: &'static str) -> Result<MutexGuard<'a, T>, Error> {
    mutex.lock().map_err(|_| Error::Poisoned(what))
}

/// Render one frame if due. Returns whether a frame was produced and the
/// microseconds until the next one.
fn render_machine(machine: &Mutex<Machine>, now: u64) -> Result<(bool, u64), Error> {
    let mut machine = lock(machine, "graphics")?;
    let Machine { graphics, game, .. } = &mut *machine;
    let rendered = graphics.render_frame(now, |graphics| game.render(graphics));
    Ok((rendered, graphics.until_next_frame(now)))
}

// ============================================================================
// Session
// ============================================================================

pub struct Session {
    machine: Arc<Mutex<Machine>>,
    mixer: Arc<Mutex<Mixer>>,
    running: Arc<AtomicBool>,
    frame_ready: Arc<AtomicBool>,
    output: Arc<dyn Output>,
    updates: Cadence,
    threaded: bool,
    active: bool,
    resuming: bool,
    started: bool,
}

impl Session {
    /// Validate the configuration and create graphics and audio state
    pub fn new(game: Box<dyn Game>, config: &Config, output: Arc<dyn Output>) -> Result<Self, Error> {
        let mixer = Mixer::new(&config.audio, &*output)?;
        let graphics = Graphics::new(&config.graphics, &*output)?;
        Ok(Self {
            machine: Arc::new(Mutex::new(Machine {
                graphics,
                input: Input::new(),
                game,
            })),
            mixer: Arc::new(Mutex::new(mixer)),
            running: Arc::new(AtomicBool::new(true)),
            frame_ready: Arc::new(AtomicBool::new(false)),
            output,
            updates: Cadence::new(UPDATE_INTERVAL),
            threaded: config.graphics.threaded,
            active: true,
            resuming: false,
            started: false,
        })
    }

    pub fn mixer(&self) -> &Arc<Mutex<Mixer>> {
        &self.mixer
    }

    /// Whether frames are rendered on their own thread
    pub fn threaded(&self) -> bool {
        self.threaded
    }

    /// False once the game quit, the window closed or a fatal error was reported
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst) && self.output.is_safe()
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Run `callback` with both subsystems in the modifying phase
    fn modify(
        &self,
        update_input: bool,
        callback: impl FnOnce(&mut dyn Game, &mut System<'_>),
    ) -> Result<(), Error> {
        let mut mixer = lock(&self.mixer, "audio")?;
        let mut machine = lock(&self.machine, "graphics")?;
        let Machine {
            graphics,
            input,
            game,
        } = &mut *machine;

        if update_input {
            input.update();
        }
        graphics.begin_modify();
        mixer.begin_modify();
        let mut system = System {
            graphics: &mut *graphics,
            audio: &mut *mixer,
            input: &*input,
            running: &self.running,
        };
        callback(game.as_mut(), &mut system);
        mixer.end_modify();
        graphics.end_modify();
        Ok(())
    }

    /// Call the game's `begin` and start the update clock at `now`.
    /// A game that quits during `begin` never gets `end`.
    pub fn begin(&mut self, now: u64) -> Result<(), Error> {
        self.modify(false, |game, system| game.begin(system))?;
        self.started = self.is_running();
        self.updates.mark(now);
        Ok(())
    }

    /// Update the game if at least a millisecond passed since the last tick.
    /// While paused the clock keeps moving, and the first tick after a
    /// pause only restarts it. Returns whether the game was updated.
    pub fn tick(&mut self, now: u64) -> Result<bool, Error> {
        if !self.updates.due(now) {
            return Ok(false);
        }
        let elapsed = self.updates.elapsed(now);
        let mut updated = false;
        if self.active {
            if self.resuming {
                self.resuming = false;
            } else {
                self.modify(true, |game, system| game.update(system, elapsed))?;
                updated = true;
            }
        }
        self.updates.mark(now);
        Ok(updated)
    }

    /// Render a frame on the calling thread if one is due
    pub fn render(&self, now: u64) -> Result<bool, Error> {
        render_machine(&self.machine, now).map(|(rendered, _)| rendered)
    }

    /// Call the game's `end` if it started
    pub fn end(&self) -> Result<(), Error> {
        if !self.started {
            return Ok(());
        }
        self.modify(false, |game, system| game.end(system))
    }

    /// React to a window event and forward it to the input state
    pub fn handle(&mut self, event: &InputEvent) -> Result<(), Error> {
        match event {
            InputEvent::Quit => self.stop(),
            InputEvent::FocusLost | InputEvent::Minimized => {
                self.active = false;
                self.resuming = true;
            },
            InputEvent::FocusGained | InputEvent::Restored => self.active = true,
            _ => {},
        }
        lock(&self.machine, "graphics")?.input.handle(event);
        Ok(())
    }

    /// Validated screen size in pixels
    pub fn screen_size(&self) -> Result<(u32, u32), Error> {
        let machine = lock(&self.machine, "graphics")?;
        let settings = machine.graphics.settings();
        Ok((settings.screen_width as u32, settings.screen_height as u32))
    }

    /// Let `f` read the last rendered canvas and the palette
    pub fn with_frame(&self, f: impl FnOnce(&Canvas, &[Colour])) -> Result<(), Error> {
        let machine = lock(&self.machine, "graphics")?;
        f(machine.graphics.canvas(), machine.graphics.palette());
        Ok(())
    }

    /// True once per frame finished by the render thread
    pub fn take_frame(&self) -> bool {
        self.frame_ready.swap(false, Ordering::AcqRel)
    }

    /// Start the render thread. It stops when the session stops running.
    pub fn spawn_renderer(&self, clock: Clock) -> Result<JoinHandle<()>, Error> {
        let machine = Arc::clone(&self.machine);
        let running = Arc::clone(&self.running);
        let frame_ready = Arc::clone(&self.frame_ready);
        let output = Arc::clone(&self.output);

        thread::Builder::new()
            .name("render".to_string())
            .spawn(move || {
                while running.load(Ordering::SeqCst) && output.is_safe() {
                    match render_machine(&machine, clock.now()) {
                        Ok((rendered, wait)) => {
                            if rendered {
                                frame_ready.store(true, Ordering::Release);
                            }
                            thread::sleep(Duration::from_micros(wait.clamp(100, UPDATE_INTERVAL)));
                        },
                        Err(e) => {
                            output.error("Graphics", &e.to_string(), true);
                            break;
                        },
                    }
                }
                tracing::debug!(sender = "Graphics", "render thread finished");
            })
            .map_err(|e| Error::Thread(e.to_string()))
    }
}

// ============================================================================
// Host
// ============================================================================

/// Run `game` until it quits, the window closes or a fatal error is reported.
/// `overrides` is a JSON object merged over the game's configuration.
pub fn run(mut game: Box<dyn Game>, overrides: Option<&str>, output: Arc<dyn Output>) -> Result<(), Error> {
    let mut config = Config::default();
    game.configure(&mut config);
    if let Some(json) = overrides {
        if let Err(e) = config.apply_json(json) {
            output.warning("Config", &format!("ignoring configuration override: {}", e));
        }
    }
    if !output.is_safe() {
        return Ok(());
    }

    tracing::info!(
        game = %config.game.name,
        version = %config.game.version(),
        "starting"
    );

    let mut session = Session::new(game, &config, Arc::clone(&output))?;
    let (width, height) = session.screen_size()?;

    let (mut display, texture_creator) =
        Display::open(config.window_title(), width, height).map_err(|e| fatal(&*output, "Graphics", e))?;
    let mut screen =
        Screen::with_size(&texture_creator, width, height).map_err(|e| fatal(&*output, "Graphics", e))?;
    let mut speaker = Speaker::open(display.sdl(), session.mixer(), config.audio.threaded, &*output);

    let clock = Clock::new();
    session.begin(clock.now())?;

    let renderer = if session.threaded() && session.is_running() {
        Some(session.spawn_renderer(clock)?)
    } else {
        None
    };

    let result = main_loop(&mut session, &mut display, &mut screen, &mut speaker, &clock, &*output);

    session.stop();
    if let Some(handle) = renderer {
        handle
            .join()
            .map_err(|_| Error::Thread("render thread panicked".to_string()))?;
    }
    if let Err(e) = result {
        return Err(fatal(&*output, "Game", e));
    }
    session.end()?;
    tracing::info!("stopped");
    Ok(())
}

fn fatal(output: &dyn Output, sender: &str, error: Error) -> Error {
    output.error(sender, &error.to_string(), true);
    error
}

fn main_loop(
    session: &mut Session,
    display: &mut Display,
    screen: &mut Screen,
    speaker: &mut Speaker,
    clock: &Clock,
    output: &dyn Output,
) -> Result<(), Error> {
    while session.is_running() {
        for event in display.poll_events() {
            session.handle(&event)?;
        }

        let now = clock.now();
        session.tick(now)?;

        if !speaker.is_threaded() {
            match speaker.pump(session.mixer(), now) {
                Ok(()) => {},
                Err(e @ Error::Poisoned(_)) => return Err(e),
                Err(e) => {
                    output.error("Audio", &e.to_string(), false);
                    *speaker = Speaker::Silent { last: now };
                },
            }
        }

        let frame = if session.threaded() {
            session.take_frame()
        } else {
            session.render(now)?
        };
        if frame {
            session.with_frame(|canvas, palette| display.stage(canvas, palette))?;
            display.show(screen)?;
        }

        thread::sleep(IDLE);
    }
    Ok(())
}
