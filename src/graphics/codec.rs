//! Indexed pixel packing
//!
//! Every surface in the console (the canvas and the pattern bank) stores
//! samples packed most-significant-first: at 1 bit per pixel bit 7 is the
//! leftmost pixel, at 2 bits bits 7-6, at 4 bits the high nibble.
//! All bit twiddling lives here so the blitters stay depth-agnostic.

/// Width of a pattern in pixels
pub const PATTERN_WIDTH: usize = 8;
/// Height of a pattern in pixels
pub const PATTERN_HEIGHT: usize = 8;
/// Number of patterns in the bank (must stay a power of two)
pub const PATTERN_COUNT: usize = 256;
/// Samples in one pattern
pub const PATTERN_SAMPLES: usize = PATTERN_WIDTH * PATTERN_HEIGHT;

// ============================================================================
// Bit Depth
// ============================================================================

/// Supported bits per pixel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BitDepth {
    One,
    Two,
    Four,
    Eight,
}

impl BitDepth {
    /// Exact match only
    pub fn from_bits(bits: u32) -> Option<Self> {
        match bits {
            1 => Some(Self::One),
            2 => Some(Self::Two),
            4 => Some(Self::Four),
            8 => Some(Self::Eight),
            _ => None,
        }
    }

    /// Snap an arbitrary request to the next supported depth up (0 becomes 1, anything above 8 becomes 8)
    pub fn snap(bits: u32) -> Self {
        match bits {
            0 | 1 => Self::One,
            2 => Self::Two,
            3 | 4 => Self::Four,
            _ => Self::Eight,
        }
    }

    #[inline]
    pub fn bits(self) -> u32 {
        match self {
            Self::One => 1,
            Self::Two => 2,
            Self::Four => 4,
            Self::Eight => 8,
        }
    }

    /// Number of palette slots addressable at this depth
    #[inline]
    pub fn colours(self) -> usize {
        1 << self.bits()
    }

    /// Mask that keeps a colour index inside the palette
    #[inline]
    pub fn mask(self) -> u8 {
        (self.colours() - 1) as u8
    }

    #[inline]
    pub fn samples_per_byte(self) -> usize {
        8 / self.bits() as usize
    }

    /// Bytes needed to hold `width` samples, without any padding
    #[inline]
    pub fn row_bytes(self, width: usize) -> usize {
        (width * self.bits() as usize + 7) >> 3
    }

    /// Bytes occupied by one 8x8 pattern
    #[inline]
    pub fn pattern_bytes(self) -> usize {
        self.row_bytes(PATTERN_SAMPLES)
    }
}

// ============================================================================
// Sample Access
// ============================================================================

/// Bit offset of sample `index` inside its byte
#[inline]
fn shift(index: usize, depth: BitDepth) -> u32 {
    let per_byte = depth.samples_per_byte();
    ((per_byte - 1 - (index % per_byte)) as u32) * depth.bits()
}

/// Read the `index`-th packed sample
#[inline]
pub fn sample(bytes: &[u8], index: usize, depth: BitDepth) -> u8 {
    let byte = bytes[index / depth.samples_per_byte()];
    (byte >> shift(index, depth)) & depth.mask()
}

/// Overwrite the `index`-th packed sample, keeping only the low bits of `value`
#[inline]
pub fn put_sample(bytes: &mut [u8], index: usize, depth: BitDepth, value: u8) {
    let shift = shift(index, depth);
    let mask = depth.mask() << shift;
    let byte = &mut bytes[index / depth.samples_per_byte()];
    *byte = (*byte & !mask) | ((value << shift) & mask);
}

// ============================================================================
// Pattern Conversion
// ============================================================================

/// Whether a pattern stored at `native` depth can be exchanged at `requested` depth.
/// A 2-bit bank only exchanges 2-bit data; every other pairing converts.
#[inline]
pub fn converts(native: BitDepth, requested: BitDepth) -> bool {
    native != BitDepth::Two || requested == BitDepth::Two
}

/// Re-encode one pattern from `from` depth into `to` depth.
/// Narrowing keeps the low bits of every sample. Returns false (and leaves
/// `dst` untouched) when the pairing is unsupported or a buffer is short.
pub fn convert_pattern(src: &[u8], from: BitDepth, dst: &mut [u8], to: BitDepth) -> bool {
    if src.len() < from.pattern_bytes() || dst.len() < to.pattern_bytes() {
        return false;
    }
    if from == to {
        let len = from.pattern_bytes();
        dst[..len].copy_from_slice(&src[..len]);
        return true;
    }
    for index in 0..PATTERN_SAMPLES {
        put_sample(dst, index, to, sample(src, index, from));
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snap_rounds_up() {
        assert_eq!(BitDepth::snap(0), BitDepth::One);
        assert_eq!(BitDepth::snap(3), BitDepth::Four);
        assert_eq!(BitDepth::snap(5), BitDepth::Eight);
        assert_eq!(BitDepth::snap(32), BitDepth::Eight);
        assert_eq!(BitDepth::from_bits(3), None);
    }

    #[test]
    fn test_sample_order_is_msb_first() {
        assert_eq!(sample(&[0b1000_0000], 0, BitDepth::One), 1);
        assert_eq!(sample(&[0b1000_0000], 7, BitDepth::One), 0);
        assert_eq!(sample(&[0b1101_0010], 0, BitDepth::Two), 0b11);
        assert_eq!(sample(&[0b1101_0010], 3, BitDepth::Two), 0b10);
        assert_eq!(sample(&[0xA5], 0, BitDepth::Four), 0xA);
        assert_eq!(sample(&[0xA5], 1, BitDepth::Four), 0x5);
        assert_eq!(sample(&[0x00, 0xC8], 1, BitDepth::Eight), 0xC8);
    }

    #[test]
    fn test_put_sample_preserves_neighbours() {
        let mut bytes = [0xFF];
        put_sample(&mut bytes, 2, BitDepth::One, 0);
        assert_eq!(bytes[0], 0b1101_1111);

        let mut bytes = [0x12];
        put_sample(&mut bytes, 1, BitDepth::Four, 0x1F);
        assert_eq!(bytes[0], 0x1F);

        let mut bytes = [0b0000_0000];
        put_sample(&mut bytes, 1, BitDepth::Two, 0b11);
        assert_eq!(bytes[0], 0b0011_0000);
    }

    #[test]
    fn test_pattern_sizes() {
        assert_eq!(BitDepth::One.pattern_bytes(), 8);
        assert_eq!(BitDepth::Two.pattern_bytes(), 16);
        assert_eq!(BitDepth::Four.pattern_bytes(), 32);
        assert_eq!(BitDepth::Eight.pattern_bytes(), 64);
    }

    #[test]
    fn test_widen_one_bit_row() {
        let mut src = [0u8; 8];
        src[0] = 0b1010_0001;
        let mut dst = [0u8; 32];
        assert!(convert_pattern(&src, BitDepth::One, &mut dst, BitDepth::Four));
        assert_eq!(&dst[..4], &[0x10, 0x10, 0x00, 0x01]);
        assert!(dst[4..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_narrow_keeps_low_bits() {
        let mut src = [0u8; 64];
        src[0] = 0x0F;
        src[1] = 0x12;
        src[2] = 0x03;
        let mut dst = [0u8; 16];
        assert!(convert_pattern(&src, BitDepth::Eight, &mut dst, BitDepth::Two));
        // 0x0F -> 3, 0x12 -> 2, 0x03 -> 3, 0x00 -> 0
        assert_eq!(dst[0], 0b1110_1100);
    }

    #[test]
    fn test_two_bit_bank_only_converts_two_bit_data() {
        assert!(converts(BitDepth::Two, BitDepth::Two));
        assert!(!converts(BitDepth::Two, BitDepth::One));
        assert!(!converts(BitDepth::Two, BitDepth::Four));
        assert!(!converts(BitDepth::Two, BitDepth::Eight));
        assert!(converts(BitDepth::Four, BitDepth::Two));
        assert!(converts(BitDepth::One, BitDepth::Eight));
    }

    #[test]
    fn test_short_buffers_are_rejected() {
        let src = [0xFFu8; 4];
        let mut dst = [0u8; 8];
        assert!(!convert_pattern(&src, BitDepth::One, &mut dst, BitDepth::One));
        assert_eq!(dst, [0u8; 8]);
    }
}
