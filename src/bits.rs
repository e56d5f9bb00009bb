//! Register field helpers
//!
//! Fields are described by a shift and a width in bits.

/// All-ones mask of `width` bits
pub const fn field_mask(width: u32) -> u32 {
    if width >= 32 {
        !0
    } else {
        (1 << width) - 1
    }
}

/// Largest value a `width`-bit field holds
pub const fn field_max(width: u32) -> u64 {
    field_mask(width) as u64
}

/// Extract the field at `shift`/`width` from `word`
pub const fn field_get(word: u32, shift: u32, width: u32) -> u32 {
    (word >> shift) & field_mask(width)
}

/// Place `value` in the field at `shift`/`width`. Bits of `value` beyond the
/// field width are dropped; callers range-check first.
pub const fn field_prep(value: u32, shift: u32, width: u32) -> u32 {
    (value & field_mask(width)) << shift
}

/// Whether `value` fits in a `width`-bit field
pub const fn field_fits(value: u64, width: u32) -> bool {
    value <= field_max(width)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_widths() {
        assert_eq!(field_mask(0), 0);
        assert_eq!(field_mask(14), 0x3FFF);
        assert_eq!(field_mask(16), 0xFFFF);
        assert_eq!(field_mask(32), 0xFFFF_FFFF);
    }

    #[test]
    fn test_get_prep() {
        let word = field_prep(0x1234, 16, 16) | field_prep(0x2A, 2, 14) | 3;
        assert_eq!(word, 0x1234_00AB);
        assert_eq!(field_get(word, 16, 16), 0x1234);
        assert_eq!(field_get(word, 2, 14), 0x2A);
        assert_eq!(field_get(word, 0, 2), 3);
    }

    #[test]
    fn test_fits() {
        assert!(field_fits(16383, 14));
        assert!(!field_fits(16384, 14));
        assert!(field_fits(65535, 16));
        assert!(!field_fits(66000, 16));
    }
}
