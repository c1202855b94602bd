//! Zstd frame-level structures: magic number, frame header, block header.

mod block;
mod header;

pub use block::{BlockHeader, BlockType};
pub use header::{FrameDescriptor, FrameHeader};

/// Zstd magic number (little-endian: 0xFD2FB528).
pub const ZSTD_MAGIC: u32 = 0xFD2FB528;

/// Maximum window size this decoder accepts (128 MB).
pub const MAX_WINDOW_SIZE: usize = 1 << 27;

/// Minimum window size the format defines (1 KB).
pub const MIN_WINDOW_SIZE: usize = 1 << 10;

/// Maximum block size (128 KiB).
pub const MAX_BLOCK_SIZE: usize = 128 * 1024;
