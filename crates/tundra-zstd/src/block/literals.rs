//! Literals section parsing and decoding.
//!
//! The literals section carries the bytes of a block that no sequence can
//! reconstruct from history. They arrive raw, as a single repeated byte,
//! or Huffman-compressed across one or four interleaved sub-streams; the
//! "treeless" variant reuses the previous block's Huffman table.

use std::sync::Arc;

use crate::frame::MAX_BLOCK_SIZE;
use crate::huffman::{decode_stream, HuffmanTable};
use tundra_core::{Error, Result};

/// Slice `n` bytes off the block content at `cursor`, advancing it.
fn take<'a>(data: &'a [u8], cursor: &mut usize, n: usize) -> Result<&'a [u8]> {
    let slice = data
        .get(*cursor..*cursor + n)
        .ok_or_else(|| Error::corrupted("literals section overruns its block"))?;
    *cursor += n;
    Ok(slice)
}

/// Encoding of a literals section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiteralsType {
    /// Verbatim bytes.
    Raw,
    /// One byte, repeated.
    Rle,
    /// Huffman-compressed, with a fresh tree description.
    Compressed,
    /// Huffman-compressed with the previous block's tree.
    Treeless,
}

/// A block's fully decoded literals plus a read cursor for sequence
/// execution.
#[derive(Debug)]
pub struct LiteralsSection {
    /// Encoding this section used.
    pub literals_type: LiteralsType,
    /// Decoded (regenerated) size in bytes.
    pub regenerated_size: usize,
    /// Huffman table in effect, for carry-over into the next block.
    pub table: Option<Arc<HuffmanTable>>,
    /// Exact bytes this section occupied in the block.
    pub bytes_consumed: usize,
    data: Vec<u8>,
    read_pos: usize,
}

impl LiteralsSection {
    /// Parse and decode one literals section from the front of a block's
    /// content. `previous_table` is the Huffman table carried over from
    /// the previous block, if any.
    pub fn parse(
        data: &[u8],
        previous_table: Option<&Arc<HuffmanTable>>,
    ) -> Result<Self> {
        let byte0 = *data
            .first()
            .ok_or_else(|| Error::corrupted("block too short for a literals section"))?;

        let literals_type = match byte0 & 0x03 {
            0 => LiteralsType::Raw,
            1 => LiteralsType::Rle,
            2 => LiteralsType::Compressed,
            _ => LiteralsType::Treeless,
        };
        let size_format = (byte0 >> 2) & 0x03;

        let (header_bytes, regenerated_size, mut compressed_size, four_streams) =
            Self::decode_sizes(data, literals_type, size_format)?;

        if regenerated_size > MAX_BLOCK_SIZE {
            return Err(Error::corrupted(format!(
                "literals section regenerates {} bytes, over the block maximum",
                regenerated_size
            )));
        }

        let mut cursor = header_bytes;

        match literals_type {
            LiteralsType::Raw => {
                let payload = take(data, &mut cursor, regenerated_size)?;
                Ok(Self {
                    literals_type,
                    regenerated_size,
                    table: previous_table.cloned(),
                    bytes_consumed: cursor,
                    data: payload.to_vec(),
                    read_pos: 0,
                })
            }
            LiteralsType::Rle => {
                let byte = take(data, &mut cursor, 1)?[0];
                Ok(Self {
                    literals_type,
                    regenerated_size,
                    table: previous_table.cloned(),
                    bytes_consumed: cursor,
                    data: vec![byte; regenerated_size],
                    read_pos: 0,
                })
            }
            LiteralsType::Compressed | LiteralsType::Treeless => {
                let table = if literals_type == LiteralsType::Compressed {
                    let (table, tree_bytes) = HuffmanTable::parse(&data[cursor..])?;
                    cursor += tree_bytes;
                    compressed_size = compressed_size.checked_sub(tree_bytes).ok_or_else(|| {
                        Error::corrupted(
                            "Huffman tree description larger than the literals section",
                        )
                    })?;
                    Arc::new(table)
                } else {
                    previous_table
                        .cloned()
                        .ok_or_else(|| Error::missing_carry_over("Huffman table"))?
                };

                let data_decoded = if four_streams {
                    compressed_size = compressed_size.checked_sub(6).ok_or_else(|| {
                        Error::corrupted("literals section too small for its jump table")
                    })?;
                    let jump = take(data, &mut cursor, 6)?;
                    let sizes = [
                        u16::from_le_bytes([jump[0], jump[1]]) as usize,
                        u16::from_le_bytes([jump[2], jump[3]]) as usize,
                        u16::from_le_bytes([jump[4], jump[5]]) as usize,
                    ];
                    let payload = take(data, &mut cursor, compressed_size)?;
                    Self::decode_four_streams(&table, payload, sizes, regenerated_size)?
                } else {
                    let payload = take(data, &mut cursor, compressed_size)?;
                    let mut output = vec![0u8; regenerated_size];
                    let produced = decode_stream(&table, payload, &mut output)?;
                    if produced != regenerated_size {
                        return Err(Error::corrupted(format!(
                            "literals stream produced {} of {} declared bytes",
                            produced, regenerated_size
                        )));
                    }
                    output
                };

                Ok(Self {
                    literals_type,
                    regenerated_size,
                    table: Some(table),
                    bytes_consumed: cursor,
                    data: data_decoded,
                    read_pos: 0,
                })
            }
        }
    }

    /// Decode the size fields. Returns
    /// `(header_bytes, regenerated_size, compressed_size, four_streams)`.
    fn decode_sizes(
        data: &[u8],
        literals_type: LiteralsType,
        size_format: u8,
    ) -> Result<(usize, usize, usize, bool)> {
        fn need(data: &[u8], n: usize) -> Result<&[u8]> {
            data.get(..n)
                .ok_or_else(|| Error::corrupted("literals header overruns its block"))
        }

        match literals_type {
            LiteralsType::Raw | LiteralsType::Rle => match size_format {
                // The low size-format bit doubles as part of the size, so
                // formats 0 and 2 are the same 1-byte, 5-bit shape.
                0 | 2 => {
                    let raw = need(data, 1)?;
                    let size = (raw[0] >> 3) as usize;
                    Ok((1, size, size, false))
                }
                1 => {
                    let raw = need(data, 2)?;
                    let size = (raw[0] >> 4) as usize + ((raw[1] as usize) << 4);
                    Ok((2, size, size, false))
                }
                _ => {
                    let raw = need(data, 3)?;
                    let size = (raw[0] >> 4) as usize
                        + ((raw[1] as usize) << 4)
                        + ((raw[2] as usize) << 12);
                    Ok((3, size, size, false))
                }
            },
            LiteralsType::Compressed | LiteralsType::Treeless => {
                let (header_bytes, field_bits, four_streams) = match size_format {
                    0 => (3, 10, false),
                    1 => (3, 10, true),
                    2 => (4, 14, true),
                    _ => (5, 18, true),
                };
                let raw = need(data, header_bytes)?;

                let mut word = [0u8; 4];
                word[..raw.len().min(4)].copy_from_slice(&raw[..raw.len().min(4)]);
                let sizes = u32::from_le_bytes(word) >> 4;

                let mask = (1u32 << field_bits) - 1;
                let regenerated = (sizes & mask) as usize;
                let mut compressed = ((sizes >> field_bits) & mask) as usize;
                if header_bytes == 5 {
                    // The top bits of the compressed size live in byte 4.
                    compressed += (raw[4] as usize) << 10;
                }
                Ok((header_bytes, regenerated, compressed, four_streams))
            }
        }
    }

    /// Decode four interleaved Huffman sub-streams. The jump table gives
    /// the first three compressed sizes; the fourth is whatever remains.
    fn decode_four_streams(
        table: &Arc<HuffmanTable>,
        payload: &[u8],
        sizes: [usize; 3],
        regenerated_size: usize,
    ) -> Result<Vec<u8>> {
        let head = sizes[0] + sizes[1] + sizes[2];
        if head > payload.len() {
            return Err(Error::corrupted(
                "literals jump table exceeds the section payload",
            ));
        }

        // Streams 1-3 regenerate an equal share, stream 4 the remainder.
        let share = regenerated_size.div_ceil(4);
        let last = regenerated_size.checked_sub(3 * share).ok_or_else(|| {
            Error::corrupted("four-stream literals smaller than three shares")
        })?;

        let mut output = vec![0u8; regenerated_size];
        let mut in_pos = 0usize;
        let mut out_pos = 0usize;
        for (i, expected) in [share, share, share, last].into_iter().enumerate() {
            let compressed = if i < 3 {
                sizes[i]
            } else {
                payload.len() - head
            };
            let stream = &payload[in_pos..in_pos + compressed];
            let produced = decode_stream(table, stream, &mut output[out_pos..out_pos + expected])?;
            if produced != expected {
                return Err(Error::corrupted(format!(
                    "literals sub-stream {} produced {} of {} bytes",
                    i + 1,
                    produced,
                    expected
                )));
            }
            in_pos += compressed;
            out_pos += expected;
        }

        Ok(output)
    }

    /// Hand out the next `n` literal bytes for a sequence.
    pub fn take(&mut self, n: usize) -> Result<&[u8]> {
        if n > self.data.len() - self.read_pos {
            return Err(Error::corrupted(
                "sequence consumes more literals than the section holds",
            ));
        }
        let slice = &self.data[self.read_pos..self.read_pos + n];
        self.read_pos += n;
        Ok(slice)
    }

    /// Literal bytes no sequence consumed; appended after the last
    /// sequence.
    pub fn rest(&self) -> &[u8] {
        &self.data[self.read_pos..]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_literals_one_byte_header() {
        // type=Raw, size_format=0, size=5: byte0 = 5 << 3.
        let mut data = vec![5u8 << 3];
        data.extend_from_slice(b"hello");
        data.extend_from_slice(b"trailing");
        let mut section = LiteralsSection::parse(&data, None).unwrap();
        assert_eq!(section.literals_type, LiteralsType::Raw);
        assert_eq!(section.regenerated_size, 5);
        assert_eq!(section.bytes_consumed, 6);
        assert_eq!(section.take(2).unwrap(), b"he");
        assert_eq!(section.rest(), b"llo");
    }

    #[test]
    fn test_raw_literals_two_byte_header() {
        // size_format=1, size=300: byte0 = (300 & 0xF) << 4 | (1 << 2),
        // byte1 = 300 >> 4.
        let size = 300usize;
        let mut data = vec![
            (((size & 0xF) as u8) << 4) | (1 << 2),
            (size >> 4) as u8,
        ];
        data.extend(std::iter::repeat(0x61).take(size));
        let section = LiteralsSection::parse(&data, None).unwrap();
        assert_eq!(section.regenerated_size, size);
        assert_eq!(section.bytes_consumed, 2 + size);
    }

    #[test]
    fn test_rle_literals() {
        // type=RLE, size_format=0, size=17.
        let data = [((17u8) << 3) | 1, b'Z'];
        let section = LiteralsSection::parse(&data, None).unwrap();
        assert_eq!(section.literals_type, LiteralsType::Rle);
        assert_eq!(section.bytes_consumed, 2);
        assert_eq!(section.rest(), vec![b'Z'; 17].as_slice());
    }

    #[test]
    fn test_truncated_raw_literals_rejected() {
        let data = [5u8 << 3, b'h', b'i'];
        assert!(LiteralsSection::parse(&data, None).is_err());
    }

    #[test]
    fn test_treeless_without_previous_table_rejected() {
        // type=Treeless, size_format=0: 3-byte header, sizes irrelevant.
        let data = [0x03u8 | (10 << 4), 0x00, 0x00, 0xFF];
        let result = LiteralsSection::parse(&data, None);
        assert!(matches!(
            result,
            Err(Error::MissingCarryOver { .. })
        ));
    }

    #[test]
    fn test_compressed_single_stream() {
        // Huffman weights [1]: symbols 0/1, one bit each. Stream encodes
        // [0, 1, 1, 0] (see the huffman decoder tests for the layout).
        //
        // Header: type=Compressed(2), size_format=0 (1 stream),
        // regenerated=4, compressed=3 (tree description 2 bytes + stream 1
        // byte). Fields: byte0 = 2 | (0 << 2) | ((4 & 0xF) << 4),
        // byte1 = (4 >> 4) | ((3 & 0x3F) << 2), byte2 = 3 >> 6.
        let regenerated = 4u32;
        let compressed = 3u32;
        let packed = (regenerated | (compressed << 10)) << 4 | 2;
        let header = packed.to_le_bytes();
        let mut data = vec![header[0], header[1], header[2]];
        // Tree: direct weights, 1 weight -> header byte 128, nibble 0x10.
        data.push(128);
        data.push(0x10);
        // Stream byte from the huffman decoder test.
        data.push(0b0001_0110);

        let mut section = LiteralsSection::parse(&data, None).unwrap();
        assert_eq!(section.literals_type, LiteralsType::Compressed);
        assert_eq!(section.bytes_consumed, data.len());
        assert!(section.table.is_some());
        assert_eq!(section.take(4).unwrap(), &[0, 1, 1, 0]);
    }

    #[test]
    fn test_compressed_four_streams() {
        // Four sub-streams, each the 1-byte stream from the single-stream
        // test, regenerating 4 bytes apiece. Compressed size counts the
        // tree (2), the jump table (6) and the four streams (4).
        //
        // Header: type=Compressed(2), size_format=1 (4 streams),
        // regenerated=16, compressed=12, 10-bit fields over 3 bytes.
        let regenerated = 16u32;
        let compressed = 12u32;
        let packed = ((regenerated | (compressed << 10)) << 4) | (1 << 2) | 2;
        let header = packed.to_le_bytes();
        let mut data = vec![header[0], header[1], header[2]];
        data.extend_from_slice(&[128, 0x10]); // tree: one direct weight
        data.extend_from_slice(&[1, 0, 1, 0, 1, 0]); // jump table
        data.extend_from_slice(&[0b0001_0110; 4]); // four streams

        let mut section = LiteralsSection::parse(&data, None).unwrap();
        assert_eq!(section.regenerated_size, 16);
        assert_eq!(section.bytes_consumed, data.len());
        assert_eq!(section.take(16).unwrap(), [0u8, 1, 1, 0].repeat(4).as_slice());
    }

    #[test]
    fn test_compressed_four_streams_bad_jump_table_rejected() {
        // Jump table claims more stream bytes than the section holds.
        let regenerated = 16u32;
        let compressed = 12u32;
        let packed = ((regenerated | (compressed << 10)) << 4) | (1 << 2) | 2;
        let header = packed.to_le_bytes();
        let mut data = vec![header[0], header[1], header[2]];
        data.extend_from_slice(&[128, 0x10]);
        data.extend_from_slice(&[200, 0, 1, 0, 1, 0]);
        data.extend_from_slice(&[0b0001_0110; 4]);

        assert!(LiteralsSection::parse(&data, None).is_err());
    }

    #[test]
    fn test_compressed_stream_wrong_length_rejected() {
        // Same as above but declares 5 regenerated bytes; the stream only
        // yields 4.
        let regenerated = 5u32;
        let compressed = 3u32;
        let packed = (regenerated | (compressed << 10)) << 4 | 2;
        let header = packed.to_le_bytes();
        let data = vec![header[0], header[1], header[2], 128, 0x10, 0b0001_0110];
        assert!(LiteralsSection::parse(&data, None).is_err());
    }

    #[test]
    fn test_take_beyond_available_rejected() {
        let mut data = vec![3u8 << 3];
        data.extend_from_slice(b"abc");
        let mut section = LiteralsSection::parse(&data, None).unwrap();
        assert!(section.take(4).is_err());
    }
}
