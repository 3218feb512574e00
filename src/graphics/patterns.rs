//! Bank of 256 reusable 8x8 patterns stored at the console's bit depth

use std::collections::TryReserveError;

use super::canvas::PixelFormat;
use super::codec::{self, BitDepth, PATTERN_COUNT, PATTERN_HEIGHT, PATTERN_WIDTH};

pub struct PatternStore {
    data: Vec<u8>,
    format: PixelFormat,
}

impl PatternStore {
    pub(crate) fn try_new(depth: BitDepth) -> Result<Self, TryReserveError> {
        let len = depth.pattern_bytes() * PATTERN_COUNT;
        let mut data = Vec::new();
        data.try_reserve_exact(len)?;
        data.resize(len, 0);
        Ok(Self {
            data,
            format: PixelFormat::for_depth(depth),
        })
    }

    #[inline]
    pub fn depth(&self) -> BitDepth {
        self.format.depth
    }

    /// Packed bytes of one pattern. The index wraps at the bank size.
    #[inline]
    pub fn pattern(&self, index: u8) -> &[u8] {
        let size = self.format.depth.pattern_bytes();
        let start = size * (usize::from(index) & (PATTERN_COUNT - 1));
        &self.data[start..start + size]
    }

    #[inline]
    fn pattern_mut(&mut self, index: u8) -> &mut [u8] {
        let size = self.format.depth.pattern_bytes();
        let start = size * (usize::from(index) & (PATTERN_COUNT - 1));
        &mut self.data[start..start + size]
    }

    /// Colour index of pattern pixel (x, y); both must be below 8
    #[inline]
    pub fn sample(&self, index: u8, x: usize, y: usize) -> u8 {
        debug_assert!(x < PATTERN_WIDTH && y < PATTERN_HEIGHT);
        self.format.get(self.pattern(index), x + y * PATTERN_WIDTH)
    }

    /// Decode pattern `index` into `out` packed at `bits` per pixel
    pub fn read(&self, index: u8, bits: u32, out: &mut [u8]) {
        let Some(requested) = BitDepth::from_bits(bits) else {
            return;
        };
        if codec::converts(self.depth(), requested) {
            codec::convert_pattern(self.pattern(index), self.depth(), out, requested);
        }
    }

    /// Encode `input`, packed at `bits` per pixel, into pattern `index`
    pub fn write(&mut self, index: u8, bits: u32, input: &[u8]) {
        let Some(requested) = BitDepth::from_bits(bits) else {
            return;
        };
        let native = self.depth();
        if codec::converts(native, requested) {
            codec::convert_pattern(input, requested, self.pattern_mut(index), native);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEPTHS: [BitDepth; 4] = [BitDepth::One, BitDepth::Two, BitDepth::Four, BitDepth::Eight];

    fn ramp(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i * 37 + 11) as u8).collect()
    }

    #[test]
    fn test_round_trip_at_native_depth() {
        for depth in DEPTHS {
            let mut store = PatternStore::try_new(depth).unwrap();
            let input = ramp(depth.pattern_bytes());
            store.write(42, depth.bits(), &input);
            let mut out = vec![0u8; depth.pattern_bytes()];
            store.read(42, depth.bits(), &mut out);
            assert_eq!(out, input, "{:?}", depth);
        }
    }

    #[test]
    fn test_round_trip_through_narrower_authoring_depth() {
        // A 1-bit pattern survives any bank that can hold it
        for depth in [BitDepth::One, BitDepth::Four, BitDepth::Eight] {
            let mut store = PatternStore::try_new(depth).unwrap();
            let input = ramp(8);
            store.write(3, 1, &input);
            let mut out = vec![0u8; 8];
            store.read(3, 1, &mut out);
            assert_eq!(out, input, "{:?}", depth);
        }
    }

    #[test]
    fn test_samples_follow_authoring_layout() {
        let mut store = PatternStore::try_new(BitDepth::Eight).unwrap();
        let mut sprite = [0u8; 8];
        sprite[2] = 0b0100_0001;
        store.write(7, 1, &sprite);
        assert_eq!(store.sample(7, 1, 2), 1);
        assert_eq!(store.sample(7, 7, 2), 1);
        assert_eq!(store.sample(7, 0, 2), 0);
        assert_eq!(store.sample(7, 1, 3), 0);
    }

    #[test]
    fn test_two_bit_bank_ignores_other_depths() {
        let mut store = PatternStore::try_new(BitDepth::Two).unwrap();
        store.write(0, 8, &[1u8; 64]);
        store.write(0, 1, &[0xFF; 8]);
        store.write(0, 4, &[0x11; 32]);
        assert!(store.pattern(0).iter().all(|&b| b == 0));

        store.write(0, 2, &[0xE4; 16]);
        let mut out = [0xAAu8; 64];
        store.read(0, 8, &mut out);
        assert!(out.iter().all(|&b| b == 0xAA));
        let mut out = [0u8; 16];
        store.read(0, 2, &mut out);
        assert_eq!(out, [0xE4; 16]);
    }

    #[test]
    fn test_invalid_bit_count_is_ignored() {
        let mut store = PatternStore::try_new(BitDepth::Four).unwrap();
        store.write(1, 3, &[0xFF; 64]);
        assert!(store.pattern(1).iter().all(|&b| b == 0));
    }

    #[test]
    fn test_patterns_do_not_overlap() {
        let mut store = PatternStore::try_new(BitDepth::Four).unwrap();
        store.write(255, 4, &[0x77; 32]);
        assert!(store.pattern(254).iter().all(|&b| b == 0));
        assert!(store.pattern(0).iter().all(|&b| b == 0));
        assert_eq!(store.sample(255, 7, 7), 7);
    }
}
