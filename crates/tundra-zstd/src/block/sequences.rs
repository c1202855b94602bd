//! Sequences section parsing and decoding.
//!
//! A sequences section declares three symbol tables (literal lengths,
//! offsets, match lengths), each in one of four modes, then one backward
//! bit stream that decodes every sequence by round-robin state
//! transitions across the three tables.

use std::sync::Arc;

use crate::bits::{skip_to_sentinel, ReverseBitReader};
use crate::fse::{
    predefined_literal_lengths_table, predefined_match_lengths_table, predefined_offsets_table,
    FseDecoder, FseEntry, FseTable, LITERAL_LENGTH_BASELINES, LITERAL_LENGTH_EXTRA_BITS,
    LITERAL_LENGTH_MAX_ACCURACY_LOG, LITERAL_LENGTH_MAX_SYMBOL, MATCH_LENGTH_BASELINES,
    MATCH_LENGTH_EXTRA_BITS, MATCH_LENGTH_MAX_ACCURACY_LOG, MATCH_LENGTH_MAX_SYMBOL,
    OFFSET_MAX_ACCURACY_LOG, OFFSET_MAX_SYMBOL,
};
use tundra_core::{Error, Result};

/// One decoded copy instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sequence {
    /// Literal bytes to copy before the match.
    pub literal_length: u32,
    /// Match bytes to copy from history.
    pub match_length: u32,
    /// Raw offset value `(1 << code) + bits`; interpretation against the
    /// recent-offset history happens at execution time.
    pub offset: u64,
}

/// How a symbol table is encoded in the section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionMode {
    /// Use the format's predefined table.
    Predefined,
    /// One byte: every sequence uses that symbol.
    Rle,
    /// A fresh FSE table description follows.
    Compressed,
    /// Reuse the previous block's table.
    Repeat,
}

impl CompressionMode {
    fn from_bits(bits: u8) -> Self {
        match bits & 0x03 {
            0 => CompressionMode::Predefined,
            1 => CompressionMode::Rle,
            2 => CompressionMode::Compressed,
            _ => CompressionMode::Repeat,
        }
    }
}

/// A symbol table in decodable form: the closed set of shapes the format
/// allows. Cloning is cheap; FSE tables are shared by reference.
#[derive(Debug, Clone)]
pub enum SymbolTable {
    /// A real state machine (predefined or freshly parsed).
    Fse(Arc<FseTable>),
    /// A single symbol, already translated, with zero transition bits.
    Rle(FseEntry),
}

/// Per-stream decode cursor over a [`SymbolTable`].
#[derive(Debug)]
enum TableDecoder<'a> {
    Fse(FseDecoder<'a>),
    Rle(FseEntry),
}

impl<'a> TableDecoder<'a> {
    fn new(table: &'a SymbolTable) -> Self {
        match table {
            SymbolTable::Fse(table) => TableDecoder::Fse(FseDecoder::new(table)),
            SymbolTable::Rle(entry) => TableDecoder::Rle(*entry),
        }
    }

    fn init_state(&mut self, reader: &mut ReverseBitReader<'_>) -> Result<()> {
        match self {
            TableDecoder::Fse(decoder) => decoder.init_state(reader),
            TableDecoder::Rle(_) => Ok(()),
        }
    }

    fn peek_symbol(&self) -> u32 {
        match self {
            TableDecoder::Fse(decoder) => decoder.peek_symbol(),
            TableDecoder::Rle(entry) => entry.symbol,
        }
    }

    fn additional_bits(&self) -> u8 {
        match self {
            TableDecoder::Fse(decoder) => decoder.additional_bits(),
            TableDecoder::Rle(entry) => entry.extra_bits,
        }
    }

    fn update_state(&mut self, reader: &mut ReverseBitReader<'_>) -> Result<()> {
        match self {
            TableDecoder::Fse(decoder) => decoder.update_state(reader),
            TableDecoder::Rle(_) => Ok(()),
        }
    }
}

/// The three symbol tables of one block, kept for carry-over.
#[derive(Debug, Clone)]
pub struct SequenceTables {
    /// Literal length table.
    pub literal_lengths: SymbolTable,
    /// Offset table.
    pub offsets: SymbolTable,
    /// Match length table.
    pub match_lengths: SymbolTable,
}

/// Tables inherited from the previous block, referenced (not copied) by
/// "repeat" mode sections.
#[derive(Debug, Clone, Default)]
pub struct CarryOverTables {
    /// Previous literal length table.
    pub literal_lengths: Option<SymbolTable>,
    /// Previous offset table.
    pub offsets: Option<SymbolTable>,
    /// Previous match length table.
    pub match_lengths: Option<SymbolTable>,
}

/// Everything needed to build one alphabet's table from its mode.
struct Alphabet {
    name: &'static str,
    max_symbol: usize,
    max_accuracy_log: u8,
    baselines: Option<&'static [u32]>,
    extra_bits: Option<&'static [u8]>,
    predefined: fn() -> Arc<FseTable>,
}

const LITERAL_LENGTHS: Alphabet = Alphabet {
    name: "literal length",
    max_symbol: LITERAL_LENGTH_MAX_SYMBOL,
    max_accuracy_log: LITERAL_LENGTH_MAX_ACCURACY_LOG,
    baselines: Some(&LITERAL_LENGTH_BASELINES),
    extra_bits: Some(&LITERAL_LENGTH_EXTRA_BITS),
    predefined: predefined_literal_lengths_table,
};

const OFFSETS: Alphabet = Alphabet {
    name: "offset",
    max_symbol: OFFSET_MAX_SYMBOL,
    max_accuracy_log: OFFSET_MAX_ACCURACY_LOG,
    baselines: None,
    extra_bits: None,
    predefined: predefined_offsets_table,
};

const MATCH_LENGTHS: Alphabet = Alphabet {
    name: "match length",
    max_symbol: MATCH_LENGTH_MAX_SYMBOL,
    max_accuracy_log: MATCH_LENGTH_MAX_ACCURACY_LOG,
    baselines: Some(&MATCH_LENGTH_BASELINES),
    extra_bits: Some(&MATCH_LENGTH_EXTRA_BITS),
    predefined: predefined_match_lengths_table,
};

impl Alphabet {
    /// Build this alphabet's table for `mode`, consuming bytes from the
    /// block at `cursor` when the mode carries data.
    fn decode_table(
        &self,
        mode: CompressionMode,
        data: &[u8],
        cursor: &mut usize,
        previous: Option<&SymbolTable>,
    ) -> Result<SymbolTable> {
        match mode {
            CompressionMode::Predefined => Ok(SymbolTable::Fse((self.predefined)())),
            CompressionMode::Rle => {
                let symbol = *data.get(*cursor).ok_or_else(|| {
                    Error::corrupted("sequences section ends inside an RLE table byte")
                })?;
                *cursor += 1;
                self.rle_entry(symbol)
            }
            CompressionMode::Compressed => {
                let (table, consumed) = FseTable::parse(
                    &data[*cursor..],
                    self.max_symbol,
                    self.max_accuracy_log,
                    self.baselines,
                    self.extra_bits,
                )?;
                *cursor += consumed;
                Ok(SymbolTable::Fse(Arc::new(table)))
            }
            CompressionMode::Repeat => previous.cloned().ok_or_else(|| {
                Error::missing_carry_over("sequence table from a previous block")
            }),
        }
    }

    /// Translate an RLE mode byte exactly like a table symbol.
    fn rle_entry(&self, symbol: u8) -> Result<SymbolTable> {
        if symbol as usize > self.max_symbol {
            return Err(Error::corrupted(format!(
                "RLE {} symbol {} outside the alphabet",
                self.name, symbol
            )));
        }
        let translated = match self.baselines {
            Some(baselines) => baselines[symbol as usize],
            None => symbol as u32,
        };
        let extra = match self.extra_bits {
            Some(extra_bits) => extra_bits[symbol as usize],
            None => 0,
        };
        Ok(SymbolTable::Rle(FseEntry {
            symbol: translated,
            baseline: 0,
            num_bits: 0,
            extra_bits: extra,
        }))
    }
}

/// A block's decoded sequences section.
#[derive(Debug)]
pub struct SequencesSection {
    /// Decoded sequences, in execution order.
    pub sequences: Vec<Sequence>,
    /// Tables used by this section (None when the section is empty);
    /// the next block's "repeat" mode references these.
    pub tables: Option<SequenceTables>,
    /// Exact bytes this section occupied in the block.
    pub bytes_consumed: usize,
}

impl SequencesSection {
    /// Parse and decode the sequences section from the remainder of a
    /// block's content. A compressed block's sequences section extends to
    /// the end of the block, so a non-empty section must consume `data`
    /// entirely.
    pub fn parse(data: &[u8], previous: &CarryOverTables) -> Result<Self> {
        let byte0 = *data
            .first()
            .ok_or_else(|| Error::corrupted("block too short for a sequences section"))?;

        let (count, count_bytes) = Self::decode_sequence_count(data, byte0)?;
        if count == 0 {
            return Ok(Self {
                sequences: Vec::new(),
                tables: None,
                bytes_consumed: count_bytes,
            });
        }

        let mut cursor = count_bytes;
        let modes = *data.get(cursor).ok_or_else(|| {
            Error::corrupted("sequences section ends before its mode byte")
        })?;
        cursor += 1;
        if modes & 0x03 != 0 {
            return Err(Error::corrupted(
                "reserved bits in the sequences mode byte must be 0",
            ));
        }

        let ll_mode = CompressionMode::from_bits(modes >> 6);
        let of_mode = CompressionMode::from_bits(modes >> 4);
        let ml_mode = CompressionMode::from_bits(modes >> 2);

        let literal_lengths = LITERAL_LENGTHS.decode_table(
            ll_mode,
            data,
            &mut cursor,
            previous.literal_lengths.as_ref(),
        )?;
        let offsets =
            OFFSETS.decode_table(of_mode, data, &mut cursor, previous.offsets.as_ref())?;
        let match_lengths = MATCH_LENGTHS.decode_table(
            ml_mode,
            data,
            &mut cursor,
            previous.match_lengths.as_ref(),
        )?;

        let tables = SequenceTables {
            literal_lengths,
            offsets,
            match_lengths,
        };

        let payload = &data[cursor..];
        let sequences = Self::decode_sequences(count, &tables, payload)?;

        Ok(Self {
            sequences,
            tables: Some(tables),
            bytes_consumed: data.len(),
        })
    }

    /// Sequence count: 1 byte below 128, 2 bytes below 255, 3 bytes at
    /// 255.
    fn decode_sequence_count(data: &[u8], byte0: u8) -> Result<(usize, usize)> {
        if byte0 < 128 {
            return Ok((byte0 as usize, 1));
        }
        if byte0 < 255 {
            let byte1 = *data.get(1).ok_or_else(|| {
                Error::corrupted("sequences section ends inside its sequence count")
            })?;
            return Ok((((byte0 as usize - 128) << 8) + byte1 as usize, 2));
        }
        let rest = data.get(1..3).ok_or_else(|| {
            Error::corrupted("sequences section ends inside its sequence count")
        })?;
        Ok((rest[0] as usize + ((rest[1] as usize) << 8) + 0x7F00, 3))
    }

    /// Decode `count` sequences from the backward bit stream.
    ///
    /// The stream must land exactly on its first bit: finishing with bits
    /// to spare or overshooting both mean corruption.
    fn decode_sequences(
        count: usize,
        tables: &SequenceTables,
        payload: &[u8],
    ) -> Result<Vec<Sequence>> {
        if payload.is_empty() {
            return Err(Error::corrupted("sequences section has no bit stream"));
        }

        let mut reader = ReverseBitReader::new(payload);
        skip_to_sentinel(&mut reader)?;

        let mut literal_lengths = TableDecoder::new(&tables.literal_lengths);
        let mut offsets = TableDecoder::new(&tables.offsets);
        let mut match_lengths = TableDecoder::new(&tables.match_lengths);

        literal_lengths.init_state(&mut reader)?;
        offsets.init_state(&mut reader)?;
        match_lengths.init_state(&mut reader)?;

        let mut sequences = Vec::with_capacity(count);
        for i in 0..count {
            let offset_code = offsets.peek_symbol();
            if offset_code as usize > OFFSET_MAX_SYMBOL {
                return Err(Error::corrupted(format!(
                    "offset code {} too large",
                    offset_code
                )));
            }
            let offset = (1u64 << offset_code) + reader.read(offset_code as usize)?;

            let match_length = match_lengths.peek_symbol()
                + reader.read(match_lengths.additional_bits() as usize)? as u32;
            let literal_length = literal_lengths.peek_symbol()
                + reader.read(literal_lengths.additional_bits() as usize)? as u32;

            sequences.push(Sequence {
                literal_length,
                match_length,
                offset,
            });

            // The last sequence leaves the states alone; the stream does
            // not carry transition bits for it.
            if i + 1 < count {
                literal_lengths.update_state(&mut reader)?;
                match_lengths.update_state(&mut reader)?;
                offsets.update_state(&mut reader)?;
            }
        }

        if reader.bits_remaining() >= 0 {
            return Err(Error::corrupted(
                "sequence bit stream has unconsumed bits",
            ));
        }
        if reader.bits_remaining() != -1 {
            return Err(Error::corrupted("sequence bit stream overran its payload"));
        }

        Ok(sequences)
    }
}
