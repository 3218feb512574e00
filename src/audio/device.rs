//! Audio output
//!
//! The mixer is either pulled from the SDL audio callback (threaded) or
//! pushed into an SDL queue from the game loop. Without a device the notes
//! still advance with wall-clock time so games behave the same when silent.

use std::sync::{Arc, Mutex};

use sdl2::audio::{AudioCallback, AudioDevice, AudioQueue, AudioSpecDesired};
use sdl2::Sdl;

use super::{Mixer, SENDER};
use crate::error::Error;
use crate::output::Output;
use crate::util::ONE_SECOND;

/// Requested output sample rate in Hz
pub const SAMPLE_RATE: i32 = 44_100;

/// Minimum wall-clock step before silent notes advance, in microseconds
const SILENT_STEP: u64 = 100;

/// Queue depth the loop keeps topped up, as a fraction of a second
const QUEUE_DIVISOR: usize = 20;

/// Pulls frames from the shared mixer on SDL's audio thread
pub struct MixerCallback {
    mixer: Arc<Mutex<Mixer>>,
    channels: usize,
    sample_rate: u32,
}

impl AudioCallback for MixerCallback {
    type Channel = f32;

    fn callback(&mut self, out: &mut [f32]) {
        match self.mixer.lock() {
            Ok(mut mixer) => mixer.mix(out, self.channels, self.sample_rate),
            Err(_) => out.fill(0.0),
        }
    }
}

pub enum Speaker {
    Callback(AudioDevice<MixerCallback>),
    Queue {
        queue: AudioQueue<f32>,
        buffer: Vec<f32>,
    },
    Silent {
        last: u64,
    },
}

impl Speaker {
    /// Open the default output device. Failure is reported as a non-fatal
    /// error and yields a silent speaker.
    pub fn open(sdl: &Sdl, mixer: &Arc<Mutex<Mixer>>, threaded: bool, output: &dyn Output) -> Self {
        match Self::try_open(sdl, mixer, threaded) {
            Ok(speaker) => speaker,
            Err(e) => {
                output.error(SENDER, &e, false);
                Self::silent()
            },
        }
    }

    fn try_open(sdl: &Sdl, mixer: &Arc<Mutex<Mixer>>, threaded: bool) -> Result<Self, String> {
        let audio = sdl.audio()?;
        let desired = AudioSpecDesired {
            freq: Some(SAMPLE_RATE),
            channels: Some(2),
            samples: None,
        };

        if threaded {
            let mixer = Arc::clone(mixer);
            let device = audio.open_playback(None, &desired, |spec| MixerCallback {
                mixer,
                channels: usize::from(spec.channels),
                sample_rate: spec.freq.max(0) as u32,
            })?;
            device.resume();
            tracing::info!(
                sender = SENDER,
                freq = device.spec().freq,
                channels = device.spec().channels,
                "audio callback running"
            );
            Ok(Self::Callback(device))
        } else {
            let queue = audio.open_queue::<f32, _>(None, &desired)?;
            queue.resume();
            tracing::info!(
                sender = SENDER,
                freq = queue.spec().freq,
                channels = queue.spec().channels,
                "audio queue open"
            );
            Ok(Self::Queue {
                queue,
                buffer: Vec::new(),
            })
        }
    }

    pub fn silent() -> Self {
        Self::Silent { last: 0 }
    }

    /// True when SDL pulls audio on its own thread
    #[inline]
    pub fn is_threaded(&self) -> bool {
        matches!(self, Self::Callback(_))
    }

    /// Feed the device from the game loop. `now` is in microseconds.
    pub fn pump(&mut self, mixer: &Mutex<Mixer>, now: u64) -> Result<(), Error> {
        match self {
            Self::Callback(_) => Ok(()),
            Self::Queue { queue, buffer } => {
                let spec = queue.spec();
                let channels = usize::from(spec.channels).max(1);
                let rate = spec.freq.max(0) as u32;
                let target = rate as usize / QUEUE_DIVISOR;
                let queued = queue.size() as usize / (std::mem::size_of::<f32>() * channels);
                if queued >= target {
                    return Ok(());
                }
                buffer.clear();
                buffer.resize((target - queued) * channels, 0.0);
                mixer
                    .lock()
                    .map_err(|_| Error::Poisoned("audio"))?
                    .mix(buffer, channels, rate);
                queue.queue_audio(buffer).map_err(Error::Audio)
            },
            Self::Silent { last } => {
                let elapsed = now.saturating_sub(*last);
                if elapsed >= SILENT_STEP {
                    mixer
                        .lock()
                        .map_err(|_| Error::Poisoned("audio"))?
                        .advance(elapsed as f32 / ONE_SECOND as f32);
                    *last = now;
                }
                Ok(())
            },
        }
    }
}
