//! Fixed-capacity byte arena with a lock-free bump allocator.
//!
//! The arena is a single zero-initialised region addressed by byte offset.
//! Its first 12 bytes are a global header:
//!
//! | bytes    | slot                                   |
//! |----------|----------------------------------------|
//! | `[0,4)`  | block-type tag of the arena itself     |
//! | `[4,8)`  | total byte length                      |
//! | `[8,12)` | allocation cursor (next free offset)   |
//!
//! Every allocation is prefixed by an 8-byte block header holding the
//! block's type tag and declared payload length. Callers receive the
//! payload offset.
//!
//! Storage is a slice of `AtomicU32` words. Header slots and cursors are
//! updated with atomic read-modify-write operations, and byte ranges are
//! written with per-word masked compare-and-swap so that two writers owning
//! different bytes of the same word never race.

use std::sync::atomic::{AtomicU32, Ordering};

use crate::error::{DbError, Result};

/// Size of the arena's global header in bytes.
pub const HEADER_BYTES: usize = 12;

/// Size of the header preceding every block payload.
pub const BLOCK_HEADER_BYTES: usize = 8;

const TYPE_SLOT: usize = 0;
const LENGTH_SLOT: usize = 1;
const CURSOR_SLOT: usize = 2;

/// Header stored in front of every allocated block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockHeader {
    /// Block type tag from the type identifier registry
    pub type_tag: u32,
    /// Declared payload length in bytes (excluding header and padding)
    pub byte_length: u32,
}

/// Rounds `n` up to the next multiple of 4.
fn align4(n: usize) -> Option<usize> {
    n.checked_add(3).map(|v| v & !3)
}

/// Fixed-capacity byte region shared by every table of an engine.
///
/// # Invariants
/// - The allocation cursor only increases, stays a multiple of 4 and never
///   exceeds [`capacity`](Self::capacity).
/// - Ranges returned by [`reserve`](Self::reserve) are pairwise disjoint.
pub struct Arena {
    /// Backing storage, little-endian bytes within each word
    words: Box<[AtomicU32]>,
    /// Total capacity in bytes
    byte_length: usize,
}

impl std::fmt::Debug for Arena {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Arena")
            .field("byte_length", &self.byte_length)
            .field("cursor", &self.cursor())
            .field("type_tag", &self.type_tag())
            .finish_non_exhaustive()
    }
}

impl Arena {
    /// Creates a zero-filled arena of `byte_length` bytes and writes its header.
    ///
    /// # Errors
    /// `InvalidArenaSize` unless `byte_length` is a multiple of 4, at least
    /// [`HEADER_BYTES`] and addressable by a 32-bit offset.
    pub fn new(byte_length: usize, type_tag: u32) -> Result<Self> {
        if byte_length < HEADER_BYTES
            || byte_length % 4 != 0
            || byte_length > u32::MAX as usize
        {
            return Err(DbError::InvalidArenaSize(byte_length));
        }

        let words: Box<[AtomicU32]> = (0..byte_length / 4).map(|_| AtomicU32::new(0)).collect();
        let arena = Self { words, byte_length };

        arena.words[TYPE_SLOT].store(type_tag, Ordering::Release);
        arena.words[LENGTH_SLOT].store(byte_length as u32, Ordering::Release);
        arena.words[CURSOR_SLOT].store(HEADER_BYTES as u32, Ordering::Release);

        tracing::debug!(byte_length, type_tag, "arena initialised");
        Ok(arena)
    }

    /// Total capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.byte_length
    }

    /// Type tag stored in the arena header.
    pub fn type_tag(&self) -> u32 {
        self.words[TYPE_SLOT].load(Ordering::Acquire)
    }

    /// Byte length recorded in the arena header.
    pub fn header_length(&self) -> usize {
        self.words[LENGTH_SLOT].load(Ordering::Acquire) as usize
    }

    /// Current allocation cursor.
    pub fn cursor(&self) -> usize {
        self.words[CURSOR_SLOT].load(Ordering::Acquire) as usize
    }

    /// Bytes still available for allocation, headers included.
    pub fn remaining(&self) -> usize {
        self.byte_length - self.cursor()
    }

    /// Reserves a block of `byte_length` payload bytes tagged with `type_tag`.
    ///
    /// The block (header plus payload, padded to 4 bytes) is claimed by a
    /// single atomic update of the allocation cursor. Concurrent callers
    /// always receive disjoint ranges.
    ///
    /// # Returns
    /// Offset of the payload, just past the 8-byte block header.
    ///
    /// # Errors
    /// `CapacityExceeded` if the block does not fit; the cursor is left
    /// untouched in that case.
    pub fn reserve(&self, byte_length: usize, type_tag: u32) -> Result<usize> {
        let alloc_length = byte_length
            .checked_add(BLOCK_HEADER_BYTES)
            .and_then(align4)
            .filter(|&n| n <= u32::MAX as usize);

        let overflow = |requested: usize| DbError::CapacityExceeded {
            region: "arena".to_string(),
            requested,
            available: self.remaining(),
        };

        let alloc_length = match alloc_length {
            Some(n) => n as u32,
            None => return Err(overflow(byte_length)),
        };

        let capacity = self.byte_length;
        let start = self.words[CURSOR_SLOT]
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |cursor| {
                cursor
                    .checked_add(alloc_length)
                    .filter(|&next| next as usize <= capacity)
            })
            .map_err(|_| overflow(alloc_length as usize))? as usize;

        let index = start / 4;
        self.words[index].store(type_tag, Ordering::Release);
        self.words[index + 1].store(byte_length as u32, Ordering::Release);

        tracing::trace!(
            offset = start,
            alloc_length,
            type_tag,
            "reserved arena block"
        );
        Ok(start + BLOCK_HEADER_BYTES)
    }

    /// Reads the header of the block whose payload starts at `payload_offset`.
    pub fn block_header(&self, payload_offset: usize) -> Result<BlockHeader> {
        let start = payload_offset
            .checked_sub(BLOCK_HEADER_BYTES)
            .filter(|&s| s >= HEADER_BYTES && s % 4 == 0 && s + BLOCK_HEADER_BYTES <= self.cursor())
            .ok_or(DbError::InvalidOffset {
                offset: payload_offset,
                max: self.cursor(),
            })?;
        Ok(BlockHeader {
            type_tag: self.words[start / 4].load(Ordering::Acquire),
            byte_length: self.words[start / 4 + 1].load(Ordering::Acquire),
        })
    }

    fn check_range(&self, offset: usize, len: usize) -> Result<()> {
        match offset.checked_add(len) {
            Some(end) if end <= self.byte_length => Ok(()),
            _ => Err(DbError::InvalidOffset {
                offset: offset.saturating_add(len),
                max: self.byte_length,
            }),
        }
    }

    /// Atomically loads the 32-bit word at the 4-aligned `offset`.
    pub fn load_u32(&self, offset: usize) -> u32 {
        debug_assert_eq!(offset % 4, 0, "word offsets must be 4-aligned");
        self.words[offset / 4].load(Ordering::Acquire)
    }

    /// Atomically adds `delta` to the word at `offset` unless the result
    /// would exceed `limit`.
    ///
    /// # Returns
    /// `Ok(previous)` on success, `Err(current)` when the bound would be
    /// crossed.
    pub fn bounded_fetch_add(&self, offset: usize, delta: u32, limit: u32) -> std::result::Result<u32, u32> {
        debug_assert_eq!(offset % 4, 0, "word offsets must be 4-aligned");
        self.words[offset / 4].fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
            current.checked_add(delta).filter(|&next| next <= limit)
        })
    }

    /// Writes `bytes` starting at `offset`.
    ///
    /// Each touched word is updated with a masked compare-and-swap, leaving
    /// bytes outside the range intact.
    pub fn write_bytes(&self, offset: usize, bytes: &[u8]) -> Result<()> {
        self.check_range(offset, bytes.len())?;

        let mut position = offset;
        let mut remaining = bytes;
        while !remaining.is_empty() {
            let index = position / 4;
            let lane = position % 4;
            let take = (4 - lane).min(remaining.len());

            let mut mask = 0u32;
            let mut bits = 0u32;
            for (i, &byte) in remaining[..take].iter().enumerate() {
                let shift = ((lane + i) * 8) as u32;
                mask |= 0xFF << shift;
                bits |= u32::from(byte) << shift;
            }

            // The closure never returns None, so the update cannot fail.
            let _ = self.words[index].fetch_update(Ordering::AcqRel, Ordering::Acquire, |word| {
                Some((word & !mask) | bits)
            });

            position += take;
            remaining = &remaining[take..];
        }
        Ok(())
    }

    /// Copies `dst.len()` bytes starting at `offset` into `dst`.
    pub fn read_into(&self, offset: usize, dst: &mut [u8]) -> Result<()> {
        self.check_range(offset, dst.len())?;

        let mut position = offset;
        let mut filled = 0;
        while filled < dst.len() {
            let index = position / 4;
            let lane = position % 4;
            let take = (4 - lane).min(dst.len() - filled);
            let word = self.words[index].load(Ordering::Acquire).to_le_bytes();
            dst[filled..filled + take].copy_from_slice(&word[lane..lane + take]);
            position += take;
            filled += take;
        }
        Ok(())
    }

    /// Reads `len` bytes starting at `offset`.
    pub fn read_bytes(&self, offset: usize, len: usize) -> Result<Vec<u8>> {
        let mut out = vec![0u8; len];
        self.read_into(offset, &mut out)?;
        Ok(out)
    }
}
