//! Bit utilities for 64-bit indices and 64-slot levels.
//!
//! A `u64` bitmap addresses 64 slots, so each level consumes 6 index bits.
//! The topmost level (shift 60) only ever sees 4 bits.

/// Number of index bits consumed per trie level.
pub const SHIFT_PER_LEVEL: u32 = 6;

/// Shift of the topmost level.
pub const MAX_SHIFT: u32 = 60;

/// Mask extracting a slot number from a shifted key.
pub const SLOT_MASK: u64 = (1 << SHIFT_PER_LEVEL) - 1;

/// XOR constant turning signed order into unsigned order.
pub const SIGN_FLIP: u64 = 0x8000_0000_0000_0000;

/// Converts a signed index into its internal unsigned key.
#[inline]
#[must_use]
pub const fn flip(index: i64) -> u64 {
    index.cast_unsigned() ^ SIGN_FLIP
}

/// Converts an internal key back into the signed index.
#[inline]
#[must_use]
pub const fn unflip(key: u64) -> i64 {
    (key ^ SIGN_FLIP).cast_signed()
}

/// Slot number of `key` at the level branching on `shift`.
#[inline]
#[must_use]
pub const fn slot_at(shift: u32, key: u64) -> u32 {
    ((key >> shift) & SLOT_MASK) as u32
}

/// Single-bit mask for a slot number.
#[inline]
#[must_use]
pub const fn bit_from_index(slot: u32) -> u64 {
    1 << slot
}

/// Slot number a single-bit mask stands for.
#[inline]
#[must_use]
pub const fn index_from_bit(bit: u64) -> u32 {
    bit.trailing_zeros()
}

/// Returns `true` if `bit` is set in `bitmap`.
#[inline]
#[must_use]
pub const fn bit_is_present(bitmap: u64, bit: u64) -> bool {
    bitmap & bit != 0
}

/// Offset of `bit` within the compacted array described by `bitmap`.
#[inline]
#[must_use]
pub const fn array_index_for_bit(bitmap: u64, bit: u64) -> usize {
    (bitmap & (bit - 1)).count_ones() as usize
}

/// Sets `bit` in `bitmap`.
#[inline]
#[must_use]
pub const fn add_bit(bitmap: u64, bit: u64) -> u64 {
    bitmap | bit
}

/// Clears `bit` in `bitmap`.
#[inline]
#[must_use]
pub const fn remove_bit(bitmap: u64, bit: u64) -> u64 {
    bitmap & !bit
}

/// Lowest set bit of `bitmap`, or zero.
#[inline]
#[must_use]
pub const fn least_bit(bitmap: u64) -> u64 {
    bitmap & bitmap.wrapping_neg()
}

/// Mask of the lowest `bits` bits, saturating at the full word.
#[inline]
#[must_use]
pub const fn low_mask(bits: u32) -> u64 {
    if bits >= u64::BITS {
        u64::MAX
    } else {
        (1 << bits) - 1
    }
}

/// Minimal multiple-of-6 shift whose window contains every set bit of `index`.
#[inline]
#[must_use]
pub const fn find_shift_for_index(index: u64) -> u32 {
    if index <= SLOT_MASK {
        0
    } else {
        ((u64::BITS - 1 - index.leading_zeros()) / SHIFT_PER_LEVEL) * SHIFT_PER_LEVEL
    }
}

/// `key` with every bit below the top of the `shift` window cleared.
#[inline]
#[must_use]
pub const fn base_index_at_shift(shift: u32, key: u64) -> u64 {
    key & !low_mask(shift + SHIFT_PER_LEVEL)
}

/// Returns `true` if all bits of `key` below `shift` are zero.
#[inline]
#[must_use]
pub const fn is_aligned_at_shift(shift: u32, key: u64) -> bool {
    key & low_mask(shift) == 0
}

/// Highest level shift at which `key` is aligned.
#[inline]
#[must_use]
pub const fn natural_shift(key: u64) -> u32 {
    let shift = (key.trailing_zeros() / SHIFT_PER_LEVEL) * SHIFT_PER_LEVEL;
    if shift > MAX_SHIFT { MAX_SHIFT } else { shift }
}
