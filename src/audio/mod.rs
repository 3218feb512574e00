//! Note mixer
//!
//! Games register instruments (plain functions from note and time to a
//! sample) and queue notes against them. The mixer renders all playing notes
//! into float frames, panned and crunched to the configured sample depth.

pub mod device;

use crate::config::AudioConfig;
use crate::error::Error;
use crate::output::Output;

pub use device::Speaker;

const SENDER: &str = "Audio";

/// Most instrument slots a mixer can hold
pub const MAX_INSTRUMENTS: u32 = 256;

/// Length of every note, in instrument time
const NOTE_LENGTH: f32 = 1.0;
/// Fade in and fade out span at each end of a note
const FADE: f32 = 0.1;

/// Produces the sample for `note` at `offset` into the note (0.0 to 1.0)
pub type Instrument = fn(note: u8, offset: f32) -> f32;

#[derive(Debug, Clone, Copy)]
struct Note {
    instrument: Instrument,
    note: u8,
    offset: f32,
    length: f32,
    speed: f32,
    volume: f32,
    position: f32,
}

impl Note {
    /// Sample `time` seconds ahead of the current offset, or None once finished
    #[inline]
    fn sample(&self, time: f32) -> Option<f32> {
        let offset = self.offset + time * self.speed;
        if offset >= self.length {
            return None;
        }
        Some((self.instrument)(self.note, offset) * self.volume * envelope(offset, self.length))
    }
}

/// Linear fade in over the first 0.1 and fade out over the last 0.1
#[inline]
pub(crate) fn envelope(offset: f32, length: f32) -> f32 {
    if offset < FADE {
        offset * 10.0
    } else if offset >= length - FADE {
        1.0 - (offset - (length - FADE)) * 10.0
    } else {
        1.0
    }
}

pub struct Mixer {
    instruments: Vec<Option<Instrument>>,
    notes: Vec<Note>,
    bits: u32,
    stereo: bool,
    modifying: bool,
}

impl Mixer {
    pub fn new(config: &AudioConfig, output: &dyn Output) -> Result<Self, Error> {
        let mut count = config.instrument_count;
        if count > MAX_INSTRUMENTS {
            output.warning(
                SENDER,
                &format!(
                    "instrument count {} is above {}, using {}",
                    count, MAX_INSTRUMENTS, MAX_INSTRUMENTS
                ),
            );
            count = MAX_INSTRUMENTS;
        }
        let mut instruments = Vec::new();
        instruments
            .try_reserve_exact(count as usize)
            .map_err(|_| {
                output.error(SENDER, "could not allocate instrument table", true);
                Error::Allocation("instrument table")
            })?;
        instruments.resize(count as usize, None);

        let bits = match config.bits_per_sample {
            8 | 16 => config.bits_per_sample,
            other => {
                let snapped = if other > 8 { 16 } else { 8 };
                output.warning(
                    SENDER,
                    &format!("{} bits per sample is not supported, using {}", other, snapped),
                );
                snapped
            },
        };

        Ok(Self {
            instruments,
            notes: Vec::new(),
            bits,
            stereo: config.stereo,
            modifying: false,
        })
    }

    #[inline]
    pub fn bits_per_sample(&self) -> u32 {
        self.bits
    }

    #[inline]
    pub fn stereo(&self) -> bool {
        self.stereo
    }

    #[inline]
    pub fn instrument_count(&self) -> usize {
        self.instruments.len()
    }

    /// Notes still playing
    #[inline]
    pub fn active_notes(&self) -> usize {
        self.notes.len()
    }

    pub(crate) fn begin_modify(&mut self) {
        self.modifying = true;
    }

    pub(crate) fn end_modify(&mut self) {
        self.modifying = false;
    }

    #[inline]
    fn slot(&self, index: u8) -> Option<usize> {
        if self.modifying && !self.instruments.is_empty() {
            Some(usize::from(index) % self.instruments.len())
        } else {
            None
        }
    }

    pub fn get_instrument(&self, index: u8) -> Option<Instrument> {
        self.slot(index).and_then(|slot| self.instruments[slot])
    }

    pub fn set_instrument(&mut self, index: u8, instrument: Option<Instrument>) {
        if let Some(slot) = self.slot(index) {
            self.instruments[slot] = instrument;
        }
    }

    /// Queue `note` on `instrument`. `speed` scales playback time, `volume`
    /// is capped at 1 and `position` pans from -1 (left) to 1 (right).
    /// Returns false when nothing was queued.
    pub fn play_note(&mut self, instrument: u8, note: u8, speed: f32, volume: f32, position: f32) -> bool {
        if !(speed > 0.0 && volume > 0.0) {
            return false;
        }
        let Some(instrument) = self.get_instrument(instrument) else {
            return false;
        };
        if self.notes.try_reserve(1).is_err() {
            tracing::error!(sender = SENDER, "could not grow the note list");
            return false;
        }
        self.notes.push(Note {
            instrument,
            note,
            offset: 0.0,
            length: NOTE_LENGTH,
            speed,
            volume: volume.min(1.0),
            position: (position.clamp(-1.0, 1.0) * 10.0).round() / 10.0,
        });
        true
    }

    /// Mix one frame `time` seconds ahead, as (left, right) in [-1, 1]
    fn frame(&self, time: f32) -> (f32, f32) {
        let (mut left, mut right) = (0.0f32, 0.0f32);
        for note in &self.notes {
            let Some(value) = note.sample(time) else {
                continue;
            };
            let pan = (note.position + 1.0) * 0.5;
            left = (if left != 0.0 { left * 0.5 + value * 0.5 } else { value }) * (1.0 - pan);
            right = (if right != 0.0 { right * 0.5 + value * 0.5 } else { value }) * pan;
        }
        (left.clamp(-1.0, 1.0), right.clamp(-1.0, 1.0))
    }

    /// Quantise to the configured sample depth
    #[inline]
    fn crunch(&self, value: f32) -> f32 {
        let factor = ((1u32 << self.bits >> 1) - 1) as f32;
        (value * factor).floor() / factor
    }

    /// Fill `out` with interleaved frames of `channels` samples, then move
    /// every note forward by the time rendered. Only mono and stereo
    /// layouts are mixed; anything else is filled with silence.
    pub fn mix(&mut self, out: &mut [f32], channels: usize, sample_rate: u32) {
        if sample_rate == 0 || !(channels == 1 || channels == 2) {
            out.fill(0.0);
            return;
        }
        let rate = sample_rate as f32;
        let mut frames = 0usize;
        for (index, frame) in out.chunks_exact_mut(channels).enumerate() {
            let (left, right) = self.frame(index as f32 / rate);
            if channels == 1 {
                frame[0] = self.crunch(left * 0.5 + right * 0.5);
            } else if self.stereo {
                frame[0] = self.crunch(left);
                frame[1] = self.crunch(right);
            } else {
                let mono = self.crunch(left * 0.5 + right * 0.5);
                frame[0] = mono;
                frame[1] = mono;
            }
            frames += 1;
        }
        self.advance(frames as f32 / rate);
    }

    /// Move every note forward by `seconds` and drop the finished ones
    pub fn advance(&mut self, seconds: f32) {
        for note in &mut self.notes {
            note.offset += seconds * note.speed;
        }
        self.notes.retain(|note| note.offset < note.length);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::testing::Recorder;

    fn constant(_: u8, _: f32) -> f32 {
        1.0
    }

    fn loud(_: u8, _: f32) -> f32 {
        5.0
    }

    fn mixer(instruments: u32, stereo: bool) -> Mixer {
        let config = AudioConfig {
            instrument_count: instruments,
            stereo,
            ..AudioConfig::default()
        };
        let mut mixer = Mixer::new(&config, &Recorder::default()).unwrap();
        mixer.begin_modify();
        mixer
    }

    #[test]
    fn test_config_clamps() {
        let output = Recorder::default();
        let config = AudioConfig {
            instrument_count: 300,
            bits_per_sample: 12,
            ..AudioConfig::default()
        };
        let m = Mixer::new(&config, &output).unwrap();
        assert_eq!(m.instrument_count(), 256);
        assert_eq!(m.bits_per_sample(), 16);
        assert_eq!(output.warning_count(), 2);

        let output = Recorder::default();
        let config = AudioConfig {
            bits_per_sample: 4,
            ..AudioConfig::default()
        };
        assert_eq!(Mixer::new(&config, &output).unwrap().bits_per_sample(), 8);
        assert_eq!(output.warning_count(), 1);
    }

    #[test]
    fn test_instruments_wrap_and_need_modifying() {
        let mut m = mixer(4, true);
        m.set_instrument(5, Some(constant));
        assert!(m.get_instrument(1).is_some());
        assert!(m.get_instrument(0).is_none());
        m.end_modify();
        assert!(m.get_instrument(1).is_none());
        m.set_instrument(2, Some(constant));
        m.begin_modify();
        assert!(m.get_instrument(2).is_none());
    }

    #[test]
    fn test_no_instruments_means_no_notes() {
        let mut m = mixer(0, true);
        m.set_instrument(0, Some(constant));
        assert!(!m.play_note(0, 60, 1.0, 1.0, 0.0));
        assert_eq!(m.active_notes(), 0);
    }

    #[test]
    fn test_play_note_rejects_bad_requests() {
        let mut m = mixer(2, true);
        m.set_instrument(0, Some(constant));
        assert!(!m.play_note(0, 60, 0.0, 1.0, 0.0));
        assert!(!m.play_note(0, 60, -1.0, 1.0, 0.0));
        assert!(!m.play_note(0, 60, 1.0, 0.0, 0.0));
        assert!(!m.play_note(0, 60, f32::NAN, 1.0, 0.0));
        assert!(!m.play_note(1, 60, 1.0, 1.0, 0.0));
        m.end_modify();
        assert!(!m.play_note(0, 60, 1.0, 1.0, 0.0));
        assert_eq!(m.active_notes(), 0);
    }

    #[test]
    fn test_note_parameters_are_clamped() {
        let mut m = mixer(1, true);
        m.set_instrument(0, Some(constant));
        assert!(m.play_note(0, 60, 1.0, 3.0, 0.34));
        assert!(m.play_note(0, 60, 1.0, 0.5, -7.0));
        assert_eq!(m.notes[0].volume, 1.0);
        assert!((m.notes[0].position - 0.3).abs() < 1e-6);
        assert_eq!(m.notes[1].volume, 0.5);
        assert_eq!(m.notes[1].position, -1.0);
    }

    #[test]
    fn test_envelope() {
        assert_eq!(envelope(0.0, 1.0), 0.0);
        assert!((envelope(0.05, 1.0) - 0.5).abs() < 1e-6);
        assert_eq!(envelope(0.5, 1.0), 1.0);
        assert!((envelope(0.95, 1.0) - 0.5).abs() < 1e-5);
    }

    #[test]
    fn test_centre_pan_halves_each_side() {
        let mut m = mixer(1, true);
        m.set_instrument(0, Some(constant));
        m.play_note(0, 60, 1.0, 1.0, 0.0);
        m.notes[0].offset = 0.5;
        let (left, right) = m.frame(0.0);
        assert!((left - 0.5).abs() < 1e-6);
        assert!((right - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_output_is_clamped() {
        let mut m = mixer(1, true);
        m.set_instrument(0, Some(loud));
        m.play_note(0, 60, 1.0, 1.0, 1.0);
        m.notes[0].offset = 0.5;
        let mut out = [0.0f32; 8];
        m.mix(&mut out, 2, 44_100);
        for frame in out.chunks_exact(2) {
            assert_eq!(frame[0], 0.0);
            assert_eq!(frame[1], 1.0);
        }
    }

    #[test]
    fn test_crunch_to_eight_bits() {
        let m = Mixer::new(
            &AudioConfig {
                bits_per_sample: 8,
                ..AudioConfig::default()
            },
            &Recorder::default(),
        )
        .unwrap();
        assert_eq!(m.crunch(1.0), 1.0);
        assert_eq!(m.crunch(0.5), 63.0 / 127.0);
        assert_eq!(m.crunch(-1.0), -1.0);
    }

    #[test]
    fn test_mono_layouts_match() {
        let mut stereo_off = mixer(1, false);
        stereo_off.set_instrument(0, Some(constant));
        stereo_off.play_note(0, 1, 1.0, 1.0, 0.6);
        stereo_off.notes[0].offset = 0.5;
        let mut duplicated = [0.0f32; 4];
        stereo_off.mix(&mut duplicated, 2, 48_000);
        assert_eq!(duplicated[0], duplicated[1]);

        let mut mono = mixer(1, true);
        mono.set_instrument(0, Some(constant));
        mono.play_note(0, 1, 1.0, 1.0, 0.6);
        mono.notes[0].offset = 0.5;
        let mut single = [0.0f32; 2];
        mono.mix(&mut single, 1, 48_000);
        assert_eq!(single[0], duplicated[0]);
    }

    #[test]
    fn test_unsupported_channel_layout_is_silent() {
        let mut m = mixer(1, true);
        m.set_instrument(0, Some(constant));
        m.play_note(0, 1, 1.0, 1.0, 0.0);
        let mut out = [0.5f32; 6];
        m.mix(&mut out, 3, 48_000);
        assert!(out.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_notes_finish() {
        let mut m = mixer(1, true);
        m.set_instrument(0, Some(constant));
        m.play_note(0, 60, 1.0, 1.0, 0.0);
        m.play_note(0, 60, 2.0, 1.0, 0.0);
        m.advance(0.5);
        assert_eq!(m.active_notes(), 1);
        m.advance(0.25);
        assert_eq!(m.active_notes(), 1);
        m.advance(0.25);
        assert_eq!(m.active_notes(), 0);
    }

    #[test]
    fn test_mix_advances_by_rendered_time() {
        let mut m = mixer(1, true);
        m.set_instrument(0, Some(constant));
        m.play_note(0, 60, 2.0, 1.0, 0.0);
        let mut out = vec![0.0f32; 2 * 1000];
        m.mix(&mut out, 2, 4000);
        assert!((m.notes[0].offset - 0.5).abs() < 1e-6);
        m.mix(&mut out, 2, 4000);
        assert_eq!(m.active_notes(), 0);
    }
}
