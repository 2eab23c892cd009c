//! On-disk block layout of the occurrences file.
//!
//! The file is an array of 512-byte blocks. Block 0 is a zeroed sentinel; a
//! link of 0 therefore always means "end of chain". Every other allocation is
//! a *sequence* of `size` contiguous blocks starting with a 12-byte header:
//!
//! ```text
//! +--------+--------+--------+------------------------------------+
//! | size   | link   | used   | used x (row, position)             |
//! | u32 BE | u32 BE | u32 BE | u32 BE, u32 BE                     |
//! +--------+--------+--------+------------------------------------+
//! ```
//!
//! `size` is one of [`BLOCK_SIZES`]. When a sequence fills up, a sequence of
//! the next size class is appended to the file and linked from the full one.

use byteorder::{BigEndian, ByteOrder};
use tabula_common::{Result, verify_data};

pub const BLOCK_SIZE: usize = 512;
pub const HEADER_SIZE: usize = 12;
pub const ENTRY_SIZE: usize = 8;

/// Allowed sequence lengths, in blocks.
pub const BLOCK_SIZES: [u32; 11] = [1, 2, 4, 8, 16, 32, 64, 128, 256, 512, 1024];

/// Number of (row, position) entries a sequence of `size` blocks holds.
pub const fn entry_capacity(size: u32) -> usize {
    (size as usize * BLOCK_SIZE - HEADER_SIZE) / ENTRY_SIZE
}

/// Smallest size class holding at least `blocks` blocks; the largest class
/// for anything bigger.
pub fn round_size(blocks: u32) -> u32 {
    let idx = BLOCK_SIZES.partition_point(|&s| s < blocks);
    BLOCK_SIZES[idx.min(BLOCK_SIZES.len() - 1)]
}

/// Size class for a sequence expected to receive `entries` entries.
pub fn size_for_entries(entries: usize) -> u32 {
    let per_block = entry_capacity(1);
    round_size(entries.div_ceil(per_block).max(1) as u32)
}

/// The size class following `size`, capped at the largest.
pub fn next_size(size: u32) -> u32 {
    round_size(size.saturating_add(1))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockHeader {
    pub size: u32,
    pub link: u32,
    pub used: u32,
}

impl BlockHeader {
    pub fn new(size: u32) -> BlockHeader {
        BlockHeader {
            size,
            link: 0,
            used: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        entry_capacity(self.size)
    }

    pub fn encode(&self, buf: &mut [u8; HEADER_SIZE]) {
        BigEndian::write_u32(&mut buf[0..4], self.size);
        BigEndian::write_u32(&mut buf[4..8], self.link);
        BigEndian::write_u32(&mut buf[8..12], self.used);
    }

    pub fn decode(buf: &[u8; HEADER_SIZE]) -> Result<BlockHeader> {
        let header = BlockHeader {
            size: BigEndian::read_u32(&buf[0..4]),
            link: BigEndian::read_u32(&buf[4..8]),
            used: BigEndian::read_u32(&buf[8..12]),
        };
        verify_data!(block_size, BLOCK_SIZES.contains(&header.size));
        verify_data!(block_used, header.used as usize <= header.capacity());
        Ok(header)
    }
}

/// Encodes entries as consecutive big-endian (row, position) pairs.
pub fn encode_entries(entries: &[(u32, u32)]) -> Vec<u8> {
    let mut buf = vec![0u8; entries.len() * ENTRY_SIZE];
    for (chunk, &(row, pos)) in buf.chunks_exact_mut(ENTRY_SIZE).zip(entries) {
        BigEndian::write_u32(&mut chunk[0..4], row);
        BigEndian::write_u32(&mut chunk[4..8], pos);
    }
    buf
}

pub fn decode_entries(buf: &[u8]) -> Vec<(u32, u32)> {
    buf.chunks_exact(ENTRY_SIZE)
        .map(|c| (BigEndian::read_u32(&c[0..4]), BigEndian::read_u32(&c[4..8])))
        .collect()
}
