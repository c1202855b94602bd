//! Huffman decoding table construction.

use crate::fse::{decode_interleaved, FseTable, WEIGHT_MAX_ACCURACY_LOG};
use tundra_core::{Error, Result};

use super::MAX_HUFFMAN_BITS;

/// Flat canonical-Huffman lookup table.
///
/// Sized `2^max_bits`; every code of length `L` occupies
/// `2^(max_bits - L)` consecutive slots, so a `max_bits`-wide window of the
/// stream indexes directly to `(symbol, code_length)`.
#[derive(Debug, Clone)]
pub struct HuffmanTable {
    max_bits: u8,
    num_bits: Vec<u8>,
    symbols: Vec<u8>,
}

impl HuffmanTable {
    /// Parse a Huffman tree description and build the table.
    ///
    /// Returns the table and the number of bytes consumed. The first byte
    /// selects the encoding: below 128 it is the byte length of an
    /// FSE-compressed weight section (one table description plus two
    /// interleaved weight streams); from 128 up it is `127 + count` of raw
    /// 4-bit weights.
    pub fn parse(data: &[u8]) -> Result<(Self, usize)> {
        let header = *data
            .first()
            .ok_or_else(|| Error::unexpected_eof(0))?;
        let mut consumed = 1usize;

        let weights = if header < 128 {
            let compressed_len = header as usize;
            let rest = &data[1..];
            if rest.len() < compressed_len {
                return Err(Error::unexpected_eof(data.len()));
            }
            let (fse_table, description_bytes) =
                FseTable::parse(rest, 255, WEIGHT_MAX_ACCURACY_LOG, None, None)?;
            if description_bytes >= compressed_len {
                return Err(Error::corrupted(
                    "FSE weight table description leaves no room for the weight streams",
                ));
            }
            consumed += compressed_len;
            decode_interleaved(&fse_table, 2, &rest[description_bytes..compressed_len], 255)?
        } else {
            let count = (header - 127) as usize;
            let nibble_bytes = count.div_ceil(2);
            if data.len() < 1 + nibble_bytes {
                return Err(Error::unexpected_eof(data.len()));
            }
            let mut weights = Vec::with_capacity(count);
            for i in 0..count {
                let byte = data[1 + i / 2];
                weights.push(if i % 2 == 0 { byte >> 4 } else { byte & 0x0F });
            }
            consumed += nibble_bytes;
            weights
        };

        let table = Self::from_weights(&weights)?;
        Ok((table, consumed))
    }

    /// Build the decoding table from explicit weights.
    ///
    /// The final symbol's weight is implicit: the weight sum must leave a
    /// power-of-two gap below the next power of two, and that gap *is* the
    /// last weight's contribution.
    pub fn from_weights(weights: &[u8]) -> Result<Self> {
        if weights.len() > 255 {
            return Err(Error::corrupted("more than 255 Huffman weights"));
        }

        let mut sum = 0u32;
        for &w in weights {
            if w as usize > MAX_HUFFMAN_BITS as usize + 1 {
                return Err(Error::corrupted(format!("Huffman weight {} too large", w)));
            }
            if w > 0 {
                sum += 1u32 << (w - 1);
            }
        }
        if sum == 0 {
            return Err(Error::corrupted("Huffman weights are all zero"));
        }

        let max_bits = crate::fse::highbit_u32(sum) + 1;
        if max_bits > MAX_HUFFMAN_BITS as u32 {
            return Err(Error::corrupted(format!(
                "Huffman code length {} exceeds maximum {}",
                max_bits, MAX_HUFFMAN_BITS
            )));
        }
        let left_over = (1u32 << max_bits) - sum;
        if left_over & (left_over - 1) != 0 {
            return Err(Error::corrupted(
                "Huffman weight sum does not leave a power-of-two remainder",
            ));
        }
        let last_weight = crate::fse::highbit_u32(left_over) + 1;

        // Code length per symbol: max_bits + 1 - weight, zero-weight
        // symbols get no code. The implicit last symbol is appended.
        let num_symbols = weights.len() + 1;
        let mut lengths = vec![0u8; num_symbols];
        let mut rank_count = vec![0usize; max_bits as usize + 1];
        for (symbol, &w) in weights.iter().enumerate() {
            let len = if w > 0 { (max_bits + 1 - w as u32) as u8 } else { 0 };
            lengths[symbol] = len;
            rank_count[len as usize] += 1;
        }
        let last_len = (max_bits + 1 - last_weight) as u8;
        lengths[num_symbols - 1] = last_len;
        rank_count[last_len as usize] += 1;

        // Fill the flat table: longer codes first from slot 0 upward, each
        // length class owning a contiguous range.
        let table_size = 1usize << max_bits;
        let mut num_bits = vec![0u8; table_size];
        let mut symbols = vec![0u8; table_size];

        let mut rank_idx = vec![0usize; max_bits as usize + 1];
        for len in (1..=max_bits as usize).rev() {
            rank_idx[len - 1] = rank_idx[len] + rank_count[len] * (1 << (max_bits as usize - len));
            for slot in rank_idx[len]..rank_idx[len - 1] {
                num_bits[slot] = len as u8;
            }
        }
        if rank_idx[0] != table_size {
            return Err(Error::corrupted(
                "Huffman code lengths do not exactly fill the table",
            ));
        }

        for (symbol, &len) in lengths.iter().enumerate() {
            if len == 0 {
                continue;
            }
            let base = rank_idx[len as usize];
            let span = 1usize << (max_bits as usize - len as usize);
            for slot in base..base + span {
                symbols[slot] = symbol as u8;
            }
            rank_idx[len as usize] += span;
        }

        Ok(Self {
            max_bits: max_bits as u8,
            num_bits,
            symbols,
        })
    }

    /// Widest code length in this table; also the state width in bits.
    #[inline]
    pub fn max_bits(&self) -> u8 {
        self.max_bits
    }

    /// `(symbol, code_length)` at a table slot.
    #[inline]
    pub fn lookup(&self, state: usize) -> (u8, u8) {
        (self.symbols[state], self.num_bits[state])
    }

    /// Number of table slots.
    #[inline]
    pub fn size(&self) -> usize {
        self.num_bits.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_weight_implies_partner_symbol() {
        // One explicit weight of 1: sum = 1, so max_bits = 1 and the
        // implicit symbol 1 also gets weight 1. Two one-bit codes.
        let table = HuffmanTable::from_weights(&[1]).unwrap();
        assert_eq!(table.max_bits(), 1);
        assert_eq!(table.size(), 2);
        assert_eq!(table.lookup(0), (0, 1));
        assert_eq!(table.lookup(1), (1, 1));
    }

    #[test]
    fn test_skewed_weights() {
        // Weights [2, 1]: sum = 3, max_bits = 2, leftover = 1 so the
        // implicit symbol 2 has weight 1. Lengths: sym0 -> 1 bit,
        // sym1 -> 2 bits, sym2 -> 2 bits.
        let table = HuffmanTable::from_weights(&[2, 1]).unwrap();
        assert_eq!(table.max_bits(), 2);
        // Two-bit codes occupy single slots from the bottom, the one-bit
        // code spans two slots above them.
        assert_eq!(table.lookup(0), (1, 2));
        assert_eq!(table.lookup(1), (2, 2));
        assert_eq!(table.lookup(2), (0, 1));
        assert_eq!(table.lookup(3), (0, 1));
    }

    #[test]
    fn test_zero_weight_symbols_get_no_code() {
        // Symbol 1 absent: weights [1, 0, 1] -> sum 2, max_bits 2,
        // leftover 2 -> implicit symbol 3 weight 2 (1-bit code).
        let table = HuffmanTable::from_weights(&[1, 0, 1]).unwrap();
        assert_eq!(table.max_bits(), 2);
        assert_eq!(table.lookup(0), (0, 2));
        assert_eq!(table.lookup(1), (2, 2));
        assert_eq!(table.lookup(2), (3, 1));
        assert_eq!(table.lookup(3), (3, 1));
    }

    #[test]
    fn test_non_power_of_two_remainder_rejected() {
        // Weights [2, 2, 1]: sum = 5, next power of two is 8, leftover 3.
        assert!(HuffmanTable::from_weights(&[2, 2, 1]).is_err());
    }

    #[test]
    fn test_all_zero_weights_rejected() {
        assert!(HuffmanTable::from_weights(&[0, 0, 0]).is_err());
    }

    #[test]
    fn test_oversized_weight_rejected() {
        assert!(HuffmanTable::from_weights(&[13]).is_err());
    }

    #[test]
    fn test_parse_direct_weights() {
        // Header 127 + 3 = raw nibble weights [2, 1, 0] -> plus implicit
        // symbol 3. Sum = 3, max_bits 2, implicit weight 1.
        let data = [130u8, 0x21, 0x00];
        let (table, consumed) = HuffmanTable::parse(&data).unwrap();
        assert_eq!(consumed, 3);
        assert_eq!(table.max_bits(), 2);
        assert_eq!(table.lookup(3), (0, 1));
    }

    #[test]
    fn test_parse_truncated_direct_weights() {
        // Claims 5 weights (3 nibble bytes) but provides only one byte.
        let data = [132u8, 0x21];
        assert!(HuffmanTable::parse(&data).is_err());
    }
}
