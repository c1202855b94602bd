//! Canonical Huffman decoding for literals.
//!
//! Zstandard encodes a Huffman tree as per-symbol *weights*. A weight `w`
//! contributes `2^(w-1)` to a total that must round up to a power of two;
//! the gap determines one final, implicit weight. Code lengths follow from
//! the weights, and codes are assigned canonically: within each length,
//! ascending symbol order.
//!
//! Weights themselves arrive either as raw nibbles or FSE-compressed as
//! two interleaved streams sharing a single table.

mod decoder;
mod table;

pub use decoder::{decode_stream, HuffmanDecoder};
pub use table::HuffmanTable;

/// Maximum Huffman code length supported by the format.
pub const MAX_HUFFMAN_BITS: u8 = 11;
