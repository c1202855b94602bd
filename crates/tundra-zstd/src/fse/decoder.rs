//! FSE decode cursors and interleaved stream decoding.

use crate::bits::{skip_to_sentinel, ReverseBitReader};
use tundra_core::{Error, Result};

use super::table::FseTable;

/// Mutable decode state over a shared, immutable [`FseTable`].
///
/// Several cursors may reference the same table; each carries only its own
/// state, so interleaved streams share one table definition without copying
/// it.
#[derive(Debug, Clone)]
pub struct FseDecoder<'a> {
    table: &'a FseTable,
    state: usize,
}

impl<'a> FseDecoder<'a> {
    /// Create a cursor over `table` with an unseeded state.
    pub fn new(table: &'a FseTable) -> Self {
        Self { table, state: 0 }
    }

    /// Seed the state with `accuracy_log` bits from the stream.
    pub fn init_state(&mut self, reader: &mut ReverseBitReader<'_>) -> Result<()> {
        self.state = reader.read(self.table.accuracy_log() as usize)? as usize;
        Ok(())
    }

    /// Symbol the current state decodes to, without advancing.
    #[inline]
    pub fn peek_symbol(&self) -> u32 {
        self.table.entry(self.state).symbol
    }

    /// Extra value bits attached to the current state's symbol.
    #[inline]
    pub fn additional_bits(&self) -> u8 {
        self.table.entry(self.state).extra_bits
    }

    /// Consume the current state's transition bits and move to the next
    /// state.
    pub fn update_state(&mut self, reader: &mut ReverseBitReader<'_>) -> Result<()> {
        let entry = self.table.entry(self.state);
        let add = reader.read(entry.num_bits as usize)? as usize;
        self.state = entry.baseline as usize + add;
        if self.state >= self.table.size() {
            return Err(Error::internal("FSE transition left the table"));
        }
        Ok(())
    }

    /// Peek the current symbol, then advance the state.
    pub fn decode_symbol(&mut self, reader: &mut ReverseBitReader<'_>) -> Result<u32> {
        let symbol = self.peek_symbol();
        self.update_state(reader)?;
        Ok(symbol)
    }

    /// Current state (exposed for tests).
    #[cfg(test)]
    pub fn state(&self) -> usize {
        self.state
    }
}

/// Decode `num_states` interleaved FSE streams sharing one table and one
/// physical backward bit stream.
///
/// States are initialised in stream order, then symbols are decoded round
/// robin. The stream carries no symbol count; exhaustion is detected by the
/// cursor dropping below -1, at which point every *other* stream still
/// holds one final symbol in its current state; those are emitted
/// round-robin, without a final transition, before returning.
///
/// At most `max_symbols` symbols are accepted; more is a corruption error.
pub fn decode_interleaved(
    table: &FseTable,
    num_states: usize,
    data: &[u8],
    max_symbols: usize,
) -> Result<Vec<u8>> {
    if data.is_empty() {
        return Err(Error::corrupted("empty interleaved FSE stream"));
    }

    let mut reader = ReverseBitReader::new(data);
    skip_to_sentinel(&mut reader)?;

    let mut cursors: Vec<FseDecoder<'_>> =
        (0..num_states).map(|_| FseDecoder::new(table)).collect();
    for cursor in &mut cursors {
        cursor.init_state(&mut reader)?;
    }

    let mut output = Vec::new();
    loop {
        for idx in 0..cursors.len() {
            let symbol = cursors[idx].decode_symbol(&mut reader)?;
            if output.len() >= max_symbols {
                return Err(Error::corrupted(
                    "interleaved FSE stream produced more symbols than allowed",
                ));
            }
            output.push(symbol as u8);

            if reader.bits_remaining() < -1 {
                // Drain: each remaining stream's current symbol, in
                // round-robin order starting after the stream that just
                // decoded.
                for i in 1..cursors.len() {
                    let peek_idx = (idx + i) % cursors.len();
                    if output.len() >= max_symbols {
                        return Err(Error::corrupted(
                            "interleaved FSE stream produced more symbols than allowed",
                        ));
                    }
                    output.push(cursors[peek_idx].peek_symbol() as u8);
                }
                return Ok(output);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fse::predefined_offsets_table;

    #[test]
    fn test_init_state_reads_accuracy_log_bits() {
        let table = predefined_offsets_table();
        // Two padding zeros, the sentinel, then state bits 01110 (14);
        // the low byte is untouched.
        let data = [0b0000_0000, 0b0010_1110];
        let mut reader = ReverseBitReader::new(&data);
        assert_eq!(skip_to_sentinel(&mut reader).unwrap(), 3);
        let mut cursor = FseDecoder::new(&table);
        cursor.init_state(&mut reader).unwrap();
        assert_eq!(cursor.state(), 14);
        assert_eq!(cursor.peek_symbol(), 2);
    }

    #[test]
    fn test_interleaved_decode_drains_peeked_symbols() {
        // Two cursors over the offset table sharing one 16-bit stream:
        // padding 0, sentinel, init states 00001 (1) and 01110 (14), then
        // four transition bits. States 1 and 14 decode to symbols 6 and 2;
        // the second transition overshoots the stream, so the other
        // cursor's current symbol (state 0 -> symbol 0) drains last.
        let table = predefined_offsets_table();
        let data = [0xE0, 0x42];
        let symbols = decode_interleaved(&table, 2, &data, 10).unwrap();
        assert_eq!(symbols, vec![6, 2, 0]);
    }

    #[test]
    fn test_interleaved_decode_respects_symbol_limit() {
        let table = predefined_offsets_table();
        let data = [0xE0, 0x42];
        assert!(decode_interleaved(&table, 2, &data, 2).is_err());
    }

    #[test]
    fn test_update_state_follows_baseline_plus_bits() {
        let table = predefined_offsets_table();
        let mut cursor = FseDecoder::new(&table);
        // All-zero stream: cursor may run negative, reads yield 0.
        let data = [0u8; 2];
        let mut reader = ReverseBitReader::new(&data);
        // State 14 -> entry (symbol 2, 5 bits, baseline 0); zero bits read
        // moves to state 0.
        cursor.state = 14;
        cursor.update_state(&mut reader).unwrap();
        assert_eq!(cursor.state(), 0);
        assert_eq!(cursor.peek_symbol(), 0);
    }
}
