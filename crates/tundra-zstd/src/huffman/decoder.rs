//! Huffman stream decoding.

use crate::bits::{skip_to_sentinel, ReverseBitReader};
use tundra_core::{Error, Result};

use super::table::HuffmanTable;

/// Mutable decode state over a shared [`HuffmanTable`].
///
/// The state is a `max_bits`-wide window of the stream; each decoded symbol
/// shifts its code length out and folds the same number of fresh bits in.
#[derive(Debug, Clone)]
pub struct HuffmanDecoder<'a> {
    table: &'a HuffmanTable,
    state: usize,
}

impl<'a> HuffmanDecoder<'a> {
    /// Create a cursor over `table` with an unseeded state.
    pub fn new(table: &'a HuffmanTable) -> Self {
        Self { table, state: 0 }
    }

    /// Seed the state with `max_bits` bits from the stream.
    pub fn init_state(&mut self, reader: &mut ReverseBitReader<'_>) -> Result<()> {
        self.state = reader.read(self.table.max_bits() as usize)? as usize;
        Ok(())
    }

    /// Decode the symbol at the current state and refill the state window.
    pub fn decode_symbol(&mut self, reader: &mut ReverseBitReader<'_>) -> Result<u8> {
        let (symbol, bits) = self.table.lookup(self.state);
        let rest = reader.read(bits as usize)? as usize;
        let mask = (1usize << self.table.max_bits()) - 1;
        self.state = ((self.state << bits) + rest) & mask;
        Ok(symbol)
    }
}

/// Decode one Huffman-coded sub-stream into `output`.
///
/// The stream must account for itself exactly: decoding continues while the
/// cursor sits above `-max_bits`, and a stream that stops anywhere else is
/// corrupt (the final state reads `max_bits` virtual zero bits, hence the
/// negative landing point). Returns the number of bytes produced.
pub fn decode_stream(table: &HuffmanTable, data: &[u8], output: &mut [u8]) -> Result<usize> {
    if data.is_empty() {
        return Err(Error::corrupted("empty Huffman stream"));
    }

    let mut reader = ReverseBitReader::new(data);
    skip_to_sentinel(&mut reader)?;

    let mut decoder = HuffmanDecoder::new(table);
    decoder.init_state(&mut reader)?;

    let max_bits = table.max_bits() as isize;
    let mut produced = 0usize;
    while reader.bits_remaining() + 1 > -max_bits {
        if produced >= output.len() {
            return Err(Error::corrupted(
                "Huffman stream produces more bytes than declared",
            ));
        }
        output[produced] = decoder.decode_symbol(&mut reader)?;
        produced += 1;
    }
    if reader.bits_remaining() + 1 != -max_bits {
        return Err(Error::corrupted(
            "Huffman stream did not consume its bits exactly",
        ));
    }

    Ok(produced)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_two_symbol_stream() {
        // Weights [1]: symbols 0 and 1, one bit each (code = symbol here).
        let table = HuffmanTable::from_weights(&[1]).unwrap();
        // One byte: three padding zeros, sentinel, then bits 0,1,1,0.
        let data = [0b0001_0110];
        let mut output = [0u8; 8];
        let produced = decode_stream(&table, &data, &mut output).unwrap();
        assert_eq!(produced, 4);
        assert_eq!(&output[..4], &[0, 1, 1, 0]);
    }

    #[test]
    fn test_decode_skewed_codes() {
        // Weights [2, 1]: sym0 = 1 bit (code 1x), sym1 = 2 bits (code 00),
        // sym2 = 2 bits (code 01).
        let table = HuffmanTable::from_weights(&[2, 1]).unwrap();
        // State map: 0 -> (sym1, 2), 1 -> (sym2, 2), 2/3 -> (sym0, 1).
        // Encoded [sym0, sym2, sym1]: init state 2 (bits 10), fold 1 to
        // reach state 1, fold 00 to reach state 0; the last symbol's fold
        // runs off the front. Two padding zeros, sentinel, then 10 1 00.
        let data = [0b0011_0100];
        let mut output = [0u8; 8];
        let produced = decode_stream(&table, &data, &mut output).unwrap();
        assert_eq!(produced, 3);
        assert_eq!(&output[..3], &[0, 2, 1]);
    }

    #[test]
    fn test_overlong_stream_rejected() {
        let table = HuffmanTable::from_weights(&[1]).unwrap();
        let data = [0b0001_0110];
        // Output room for only 2 of the 4 encoded symbols.
        let mut output = [0u8; 2];
        assert!(decode_stream(&table, &data, &mut output).is_err());
    }

    #[test]
    fn test_empty_stream_rejected() {
        let table = HuffmanTable::from_weights(&[1]).unwrap();
        let mut output = [0u8; 4];
        assert!(decode_stream(&table, &[], &mut output).is_err());
    }

    #[test]
    fn test_all_zero_stream_rejected() {
        let table = HuffmanTable::from_weights(&[1]).unwrap();
        let mut output = [0u8; 4];
        assert!(decode_stream(&table, &[0x00], &mut output).is_err());
    }
}
