//! Bit-level index arithmetic shared by every node family.
//!
//! A trie level branches on one fixed-width chunk of the index. The chunk
//! selects a slot, the slot selects a bit in a bitmap, and the population count
//! of the bitmap below that bit gives the offset into the node's compacted
//! array.
//!
//! - [`int`]: 32-bit indices, 5 bits per level, `u32` bitmaps (32 slots)
//! - [`long`]: 64-bit indices, 6 bits per level, `u64` bitmaps (64 slots)
//!
//! Indices are stored sign-flipped (`index ^ MIN`) so that comparing the
//! unsigned keys chunk by chunk preserves the signed order of the indices.

pub mod int;
pub mod long;
