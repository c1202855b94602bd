//! Bit-level stream primitives.
//!
//! Zstandard uses two kinds of bit streams:
//!
//! - Headers and table descriptions are read *forward*, least significant
//!   bit first within each byte ([`ForwardBitReader`]).
//! - Entropy-coded payloads are written back to front and must be read
//!   *backward*, starting from a sentinel `1` bit at the end of the buffer
//!   ([`ReverseBitReader`]).

mod forward;
mod reverse;

pub use forward::ForwardBitReader;
pub use reverse::ReverseBitReader;

use tundra_core::{Error, Result};

/// Skip the zero padding at the tail of a backward stream, up to and
/// including the sentinel `1` bit that marks where data starts.
///
/// Returns the number of bits consumed (1 to 8). Padding never spans more
/// than the final byte; if no sentinel is found within 8 bits the stream is
/// corrupt.
pub fn skip_to_sentinel(reader: &mut ReverseBitReader<'_>) -> Result<usize> {
    for consumed in 1..=8usize {
        if reader.read(1)? == 1 {
            return Ok(consumed);
        }
    }
    Err(Error::corrupted(
        "backward bitstream has no sentinel bit in its last byte",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinel_at_top_bit() {
        let data = [0x00, 0x80];
        let mut reader = ReverseBitReader::new(&data);
        assert_eq!(skip_to_sentinel(&mut reader).unwrap(), 1);
        assert_eq!(reader.bits_remaining(), 14);
    }

    #[test]
    fn test_sentinel_after_padding() {
        // 0b0001_0000: three padding zeros, then the sentinel.
        let data = [0xFF, 0x10];
        let mut reader = ReverseBitReader::new(&data);
        assert_eq!(skip_to_sentinel(&mut reader).unwrap(), 4);
        assert_eq!(reader.bits_remaining(), 11);
    }

    #[test]
    fn test_missing_sentinel_rejected() {
        let data = [0xFF, 0x00];
        let mut reader = ReverseBitReader::new(&data);
        assert!(skip_to_sentinel(&mut reader).is_err());
    }
}
