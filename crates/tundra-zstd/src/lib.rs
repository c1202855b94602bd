//! # Tundra Zstd
//!
//! Streaming Zstandard (RFC 8878) frame decompressor in pure Rust.
//!
//! Decoding is the whole story here: frames are parsed and decoded
//! block by block against a sliding window sized to the frame header,
//! with output flushed to a sink as the window evicts it. Input is
//! untrusted by default: corrupt or truncated frames surface as
//! [`Error`](tundra_core::Error) values, never panics.
//!
//! ## Quick Start
//!
//! ```rust
//! use tundra_zstd::decompress_frame;
//!
//! // A tiny hand-built frame: one raw block holding "Hello".
//! let frame = [
//!     0x28, 0xB5, 0x2F, 0xFD, // magic
//!     0x20, 0x05,             // single segment, content size 5
//!     0x29, 0x00, 0x00,       // last block, raw, size 5
//!     b'H', b'e', b'l', b'l', b'o',
//! ];
//! assert_eq!(decompress_frame(&frame).unwrap(), b"Hello");
//! ```
//!
//! ## Consumption modes
//!
//! - [`decompress_frame`] / [`ZstdDecompressor`]: one-shot, whole frame
//!   in, bytes out.
//! - [`FrameDecompressor`]: source-to-sink streaming over any
//!   `Read`/`Write` pair.
//! - [`FrameReader`]: pull-based, implements `std::io::Read` and decodes
//!   blocks only as bytes are demanded.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │  reader.rs          │  decompress.rs                       │
//! │  (pull adapter)     │  (frame state machine + sequences)   │
//! ├────────────────────────────────────────────────────────────┤
//! │  block/             │  window.rs                           │
//! │  ├── literals.rs    │  (sliding window ring buffer)        │
//! │  └── sequences.rs   │                                      │
//! ├────────────────────────────────────────────────────────────┤
//! │  huffman/           │  fse/                                │
//! │  ├── table.rs       │  ├── table.rs                        │
//! │  └── decoder.rs     │  └── decoder.rs                      │
//! ├────────────────────────────────────────────────────────────┤
//! │  frame/ (headers)   │  bits/ (forward + backward readers)  │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Not here
//!
//! Compression, dictionaries, and checksum verification (a trailing
//! checksum is skipped, not checked).
//!
//! ## References
//!
//! - [RFC 8878 - Zstandard Compression](https://datatracker.ietf.org/doc/html/rfc8878)
//! - [Zstd Format Specification](https://github.com/facebook/zstd/blob/dev/doc/zstd_compression_format.md)

pub mod bits;
pub mod block;
pub mod decompress;
pub mod frame;
pub mod fse;
pub mod huffman;
pub mod reader;
pub mod window;

pub use decompress::FrameDecompressor;
pub use frame::{MAX_BLOCK_SIZE, MAX_WINDOW_SIZE, MIN_WINDOW_SIZE, ZSTD_MAGIC};
pub use reader::FrameReader;

use std::io::Cursor;

use tundra_core::{Algorithm, Decompressor, Error, Result};

/// Decompress one complete frame from a byte slice.
pub fn decompress_frame(input: &[u8]) -> Result<Vec<u8>> {
    let mut output = Vec::new();
    let mut decoder = FrameDecompressor::new(Cursor::new(input), &mut output);
    decoder.decompress()?;
    Ok(output)
}

/// Zstandard decompressor.
#[derive(Debug, Clone, Default)]
pub struct ZstdDecompressor;

impl ZstdDecompressor {
    /// Create a new Zstd decompressor.
    pub fn new() -> Self {
        Self
    }
}

impl Decompressor for ZstdDecompressor {
    fn algorithm(&self) -> Algorithm {
        Algorithm::Zstd
    }

    fn decompress(&self, input: &[u8]) -> Result<Vec<u8>> {
        decompress_frame(input)
    }

    fn decompress_to(&self, input: &[u8], output: &mut [u8]) -> Result<usize> {
        let result = self.decompress(input)?;
        if result.len() > output.len() {
            return Err(Error::buffer_too_small(result.len(), output.len()));
        }
        output[..result.len()].copy_from_slice(&result);
        Ok(result.len())
    }
}

// =============================================================================
// Tests
// =============================================================================
