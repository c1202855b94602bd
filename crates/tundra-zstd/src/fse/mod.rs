//! Finite State Entropy (FSE) decoding.
//!
//! FSE is the table-driven entropy coder used throughout Zstandard. A
//! decoding table maps every state of a `2^accuracy_log`-sized state
//! machine to a symbol plus the information needed to compute the next
//! state from bits of the backward stream.
//!
//! The predefined tables for the three sequence alphabets are built once
//! and cached for the lifetime of the program.
//!
//! ## References
//!
//! - [RFC 8878 Section 4.1](https://datatracker.ietf.org/doc/html/rfc8878#section-4.1)

mod decoder;
mod table;

pub use decoder::{decode_interleaved, FseDecoder};
pub use table::{FseEntry, FseTable};

pub(crate) use table::highbit_u32;

use std::sync::{Arc, OnceLock};

/// Hard ceiling on any FSE accuracy log.
pub const FSE_MAX_ACCURACY_LOG: u8 = 15;

/// Maximum accuracy log for literal length tables.
pub const LITERAL_LENGTH_MAX_ACCURACY_LOG: u8 = 9;
/// Maximum accuracy log for match length tables.
pub const MATCH_LENGTH_MAX_ACCURACY_LOG: u8 = 9;
/// Maximum accuracy log for offset tables.
pub const OFFSET_MAX_ACCURACY_LOG: u8 = 8;
/// Maximum accuracy log for Huffman weight tables.
pub const WEIGHT_MAX_ACCURACY_LOG: u8 = 6;

/// Highest literal length code.
pub const LITERAL_LENGTH_MAX_SYMBOL: usize = 35;
/// Highest match length code.
pub const MATCH_LENGTH_MAX_SYMBOL: usize = 52;
/// Highest offset code.
pub const OFFSET_MAX_SYMBOL: usize = 31;

// =============================================================================
// Predefined distributions and code translations (RFC 8878 Section 3.1.1.3.2.2)
// =============================================================================

/// Default distribution for literal length codes (accuracy_log = 6).
pub const LITERAL_LENGTH_DEFAULT_DISTRIBUTION: [i16; 36] = [
    4, 3, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 1, 1, 1, 2, 2, 2, 2, 2, 2, 2, 2, 2, 3, 2, 1, 1, 1, 1, 1,
    -1, -1, -1, -1,
];

/// Base literal length per literal length code.
pub const LITERAL_LENGTH_BASELINES: [u32; 36] = [
    0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16, 18, 20, 22, 24, 28, 32, 40, 48, 64,
    0x80, 0x100, 0x200, 0x400, 0x800, 0x1000, 0x2000, 0x4000, 0x8000, 0x10000,
];

/// Extra bits read per literal length code.
pub const LITERAL_LENGTH_EXTRA_BITS: [u8; 36] = [
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1, 1, 1, 1, 2, 2, 3, 3, 4, 6, 7, 8, 9, 10, 11,
    12, 13, 14, 15, 16,
];

/// Default distribution for match length codes (accuracy_log = 6).
pub const MATCH_LENGTH_DEFAULT_DISTRIBUTION: [i16; 53] = [
    1, 4, 3, 2, 2, 2, 2, 2, 2, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1,
    1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, -1, -1, -1, -1, -1, -1, -1,
];

/// Base match length per match length code.
pub const MATCH_LENGTH_BASELINES: [u32; 53] = [
    3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16, 17, 18, 19, 20, 21, 22, 23, 24, 25, 26, 27,
    28, 29, 30, 31, 32, 33, 34, 35, 37, 39, 41, 43, 47, 51, 59, 67, 83, 99, 131, 259, 515, 1027,
    2051, 4099, 8195, 16387, 32771, 65539,
];

/// Extra bits read per match length code.
pub const MATCH_LENGTH_EXTRA_BITS: [u8; 53] = [
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    1, 1, 1, 1, 2, 2, 3, 3, 4, 4, 5, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16,
];

/// Default distribution for offset codes (accuracy_log = 5).
pub const OFFSET_DEFAULT_DISTRIBUTION: [i16; 29] = [
    1, 1, 1, 1, 1, 1, 2, 2, 2, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, -1, -1, -1, -1, -1,
];

// =============================================================================
// Cached predefined tables
// =============================================================================

static PREDEFINED_LL: OnceLock<Arc<FseTable>> = OnceLock::new();
static PREDEFINED_ML: OnceLock<Arc<FseTable>> = OnceLock::new();
static PREDEFINED_OF: OnceLock<Arc<FseTable>> = OnceLock::new();

/// Get the predefined literal length table (built once, then shared).
pub fn predefined_literal_lengths_table() -> Arc<FseTable> {
    PREDEFINED_LL
        .get_or_init(|| {
            Arc::new(
                FseTable::build(
                    &LITERAL_LENGTH_DEFAULT_DISTRIBUTION,
                    6,
                    Some(&LITERAL_LENGTH_BASELINES),
                    Some(&LITERAL_LENGTH_EXTRA_BITS),
                )
                .expect("predefined literal length table must build"),
            )
        })
        .clone()
}

/// Get the predefined match length table (built once, then shared).
pub fn predefined_match_lengths_table() -> Arc<FseTable> {
    PREDEFINED_ML
        .get_or_init(|| {
            Arc::new(
                FseTable::build(
                    &MATCH_LENGTH_DEFAULT_DISTRIBUTION,
                    6,
                    Some(&MATCH_LENGTH_BASELINES),
                    Some(&MATCH_LENGTH_EXTRA_BITS),
                )
                .expect("predefined match length table must build"),
            )
        })
        .clone()
}

/// Get the predefined offset table (built once, then shared).
///
/// Offset codes are not translated; the symbol *is* the code, and the
/// number of bits to read for the offset value is the code itself.
pub fn predefined_offsets_table() -> Arc<FseTable> {
    PREDEFINED_OF
        .get_or_init(|| {
            Arc::new(
                FseTable::build(&OFFSET_DEFAULT_DISTRIBUTION, 5, None, None)
                    .expect("predefined offset table must build"),
            )
        })
        .clone()
}
