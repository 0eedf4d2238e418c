//! Bit utilities for 32-bit indices and 32-slot levels.
//!
//! # Examples
//!
//! ```rust
//! use trie_array::bits::int;
//!
//! let bitmap = int::add_bit(int::bit_from_index(3), int::bit_from_index(9));
//! assert_eq!(int::array_index_for_bit(bitmap, int::bit_from_index(9)), 1);
//! assert_eq!(int::find_shift_for_index(1 << 12), 10);
//! ```

/// Number of index bits consumed per trie level.
pub const SHIFT_PER_LEVEL: u32 = 5;

/// Shift of the topmost level (its window holds the two highest bits).
pub const MAX_SHIFT: u32 = 30;

/// Mask extracting a slot number from a shifted key.
pub const SLOT_MASK: u32 = (1 << SHIFT_PER_LEVEL) - 1;

/// XOR constant turning signed order into unsigned order.
pub const SIGN_FLIP: u32 = 0x8000_0000;

/// Converts a signed index into its internal unsigned key.
#[inline]
#[must_use]
pub const fn flip(index: i32) -> u32 {
    index.cast_unsigned() ^ SIGN_FLIP
}

/// Converts an internal key back into the signed index.
#[inline]
#[must_use]
pub const fn unflip(key: u32) -> i32 {
    (key ^ SIGN_FLIP).cast_signed()
}

/// Slot number of `key` at the level branching on `shift`.
#[inline]
#[must_use]
pub const fn slot_at(shift: u32, key: u32) -> u32 {
    (key >> shift) & SLOT_MASK
}

/// Single-bit mask for a slot number.
#[inline]
#[must_use]
pub const fn bit_from_index(slot: u32) -> u32 {
    1 << slot
}

/// Slot number a single-bit mask stands for.
#[inline]
#[must_use]
pub const fn index_from_bit(bit: u32) -> u32 {
    bit.trailing_zeros()
}

/// Returns `true` if `bit` is set in `bitmap`.
#[inline]
#[must_use]
pub const fn bit_is_present(bitmap: u32, bit: u32) -> bool {
    bitmap & bit != 0
}

/// Offset of `bit` within the compacted array described by `bitmap`.
#[inline]
#[must_use]
pub const fn array_index_for_bit(bitmap: u32, bit: u32) -> usize {
    (bitmap & (bit - 1)).count_ones() as usize
}

/// Sets `bit` in `bitmap`.
#[inline]
#[must_use]
pub const fn add_bit(bitmap: u32, bit: u32) -> u32 {
    bitmap | bit
}

/// Clears `bit` in `bitmap`.
#[inline]
#[must_use]
pub const fn remove_bit(bitmap: u32, bit: u32) -> u32 {
    bitmap & !bit
}

/// Lowest set bit of `bitmap`, or zero.
#[inline]
#[must_use]
pub const fn least_bit(bitmap: u32) -> u32 {
    bitmap & bitmap.wrapping_neg()
}

/// Mask of the lowest `bits` bits, saturating at the full word.
#[inline]
#[must_use]
pub const fn low_mask(bits: u32) -> u32 {
    if bits >= u32::BITS {
        u32::MAX
    } else {
        (1 << bits) - 1
    }
}

/// Minimal multiple-of-5 shift whose window contains every set bit of `index`.
///
/// Applied to `a ^ b` this is the shift of the lowest level at which the two
/// keys can share a node.
#[inline]
#[must_use]
pub const fn find_shift_for_index(index: u32) -> u32 {
    if index <= SLOT_MASK {
        0
    } else {
        ((u32::BITS - 1 - index.leading_zeros()) / SHIFT_PER_LEVEL) * SHIFT_PER_LEVEL
    }
}

/// `key` with every bit below the top of the `shift` window cleared.
#[inline]
#[must_use]
pub const fn base_index_at_shift(shift: u32, key: u32) -> u32 {
    key & !low_mask(shift + SHIFT_PER_LEVEL)
}

/// Returns `true` if all bits of `key` below `shift` are zero.
#[inline]
#[must_use]
pub const fn is_aligned_at_shift(shift: u32, key: u32) -> bool {
    key & low_mask(shift) == 0
}

/// Highest level shift at which `key` is aligned.
#[inline]
#[must_use]
pub const fn natural_shift(key: u32) -> u32 {
    let shift = (key.trailing_zeros() / SHIFT_PER_LEVEL) * SHIFT_PER_LEVEL;
    if shift > MAX_SHIFT { MAX_SHIFT } else { shift }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(i32::MIN, 0)]
    #[case(-1, 0x7fff_ffff)]
    #[case(0, 0x8000_0000)]
    #[case(i32::MAX, u32::MAX)]
    fn test_flip(#[case] index: i32, #[case] key: u32) {
        assert_eq!(flip(index), key);
        assert_eq!(unflip(key), index);
    }

    #[rstest]
    fn test_flip_preserves_order() {
        let indices = [i32::MIN, -1_000_000, -5, -1, 0, 1, 5, 1_000_000, i32::MAX];
        for pair in indices.windows(2) {
            assert!(flip(pair[0]) < flip(pair[1]));
        }
    }

    #[rstest]
    fn test_bit_round_trip_over_every_slot() {
        for slot in 0..32 {
            let bit = bit_from_index(slot);
            assert_eq!(bit.count_ones(), 1);
            assert_eq!(index_from_bit(bit), slot);
            assert!(bit_is_present(u32::MAX, bit));
            assert!(!bit_is_present(remove_bit(u32::MAX, bit), bit));
            assert_eq!(array_index_for_bit(u32::MAX, bit), slot as usize);
            assert_eq!(array_index_for_bit(bit, bit), 0);
            assert_eq!(least_bit(add_bit(bit, 1 << 31)), bit);
        }
    }

    #[rstest]
    fn test_array_index_for_bit_counts_lower_bits_only() {
        let bitmap = 0b1011_0010;
        assert_eq!(array_index_for_bit(bitmap, 0b10), 0);
        assert_eq!(array_index_for_bit(bitmap, 0b1_0000), 1);
        assert_eq!(array_index_for_bit(bitmap, 0b10_0000), 2);
        assert_eq!(array_index_for_bit(bitmap, 0b1000_0000), 3);
    }

    #[rstest]
    fn test_slot_at_every_level() {
        let key = 0b11_00001_00010_00011_00100_00101_00110;
        assert_eq!(slot_at(0, key), 6);
        assert_eq!(slot_at(5, key), 5);
        assert_eq!(slot_at(10, key), 4);
        assert_eq!(slot_at(15, key), 3);
        assert_eq!(slot_at(20, key), 2);
        assert_eq!(slot_at(25, key), 1);
        assert_eq!(slot_at(30, key), 3);
    }

    #[rstest]
    fn test_find_shift_for_every_highest_bit() {
        assert_eq!(find_shift_for_index(0), 0);
        for bit in 0..32 {
            let expected = (bit / SHIFT_PER_LEVEL) * SHIFT_PER_LEVEL;
            assert_eq!(find_shift_for_index(1 << bit), expected, "bit {bit}");
            assert_eq!(find_shift_for_index((1 << bit) | 1), expected, "bit {bit}");
        }
    }

    #[rstest]
    #[case(0, 0x1234_5678, 0x1234_5660)]
    #[case(5, 0x1234_5678, 0x1234_5400)]
    #[case(25, 0x1234_5678, 0)]
    #[case(30, 0xffff_ffff, 0)]
    fn test_base_index_at_shift(#[case] shift: u32, #[case] key: u32, #[case] expected: u32) {
        assert_eq!(base_index_at_shift(shift, key), expected);
    }

    #[rstest]
    #[case(0, 30)]
    #[case(1, 0)]
    #[case(32, 5)]
    #[case(1 << 9, 5)]
    #[case(1 << 10, 10)]
    #[case(0x8000_0000, 30)]
    fn test_natural_shift(#[case] key: u32, #[case] expected: u32) {
        assert_eq!(natural_shift(key), expected);
        assert!(is_aligned_at_shift(expected, key));
    }
}
