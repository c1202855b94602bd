//! Frame decompression: magic number, frame header, block loop and
//! sequence execution.

use std::io::{BufReader, Read, Write};
use std::sync::Arc;

use tracing::{debug, trace};
use tundra_core::{DecodeStats, Error, Result};

use crate::block::{CarryOverTables, LiteralsSection, Sequence, SequencesSection};
use crate::frame::{BlockHeader, BlockType, FrameDescriptor, FrameHeader, ZSTD_MAGIC};
use crate::huffman::HuffmanTable;
use crate::window::RingBuffer;

/// Where the decoder stands in the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FrameState {
    AwaitingMagic,
    AwaitingHeader,
    DecodingBlocks,
    Done,
}

/// Streaming Zstd frame decompressor.
///
/// Reads compressed bytes from `source`, writes decompressed bytes to
/// `sink` as the sliding window evicts them. One instance decodes one
/// frame at a time; [`reset`](Self::reset) re-arms it for another stream
/// while keeping its scratch allocations.
#[derive(Debug)]
pub struct FrameDecompressor<R: Read, W: Write> {
    source: BufReader<R>,
    /// Parked until the frame header determines the window size.
    sink: Option<W>,
    window: Option<RingBuffer<W>>,
    header: Option<FrameHeader>,
    state: FrameState,
    /// The three most recently used match offsets.
    offset_history: [u64; 3],
    /// Sequence tables inherited by "repeat" mode sections.
    carry_over: CarryOverTables,
    /// Huffman table inherited by "treeless" literals sections.
    previous_huffman: Option<Arc<HuffmanTable>>,
    /// Scratch for one block's content (bounded by the format's 128 KiB
    /// block ceiling).
    block_buf: Vec<u8>,
    stats: DecodeStats,
}

impl<R: Read, W: Write> FrameDecompressor<R, W> {
    /// Create a decompressor reading from `source` and writing to `sink`.
    pub fn new(source: R, sink: W) -> Self {
        Self {
            source: BufReader::new(source),
            sink: Some(sink),
            window: None,
            header: None,
            state: FrameState::AwaitingMagic,
            offset_history: [1, 4, 8],
            carry_over: CarryOverTables::default(),
            previous_huffman: None,
            block_buf: Vec::new(),
            stats: DecodeStats::new(),
        }
    }

    /// Re-arm for a fresh input stream, reusing scratch allocations.
    pub fn reset(&mut self, source: R, sink: W) {
        self.source = BufReader::new(source);
        self.sink = Some(sink);
        self.header = None;
        self.state = FrameState::AwaitingMagic;
        self.offset_history = [1, 4, 8];
        self.carry_over = CarryOverTables::default();
        self.previous_huffman = None;
        self.stats.reset();
    }

    /// Statistics accumulated so far.
    pub fn stats(&self) -> DecodeStats {
        self.stats
    }

    /// The parsed frame header, once it has been read.
    pub fn frame_header(&self) -> Option<&FrameHeader> {
        self.header.as_ref()
    }

    /// Whether the frame has been fully decoded and flushed.
    pub fn is_done(&self) -> bool {
        self.state == FrameState::Done
    }

    /// Access the sink (used by the stream adapter to drain its buffer).
    pub fn sink_mut(&mut self) -> &mut W {
        match self.window.as_mut() {
            Some(window) => window.sink_mut(),
            None => self
                .sink
                .as_mut()
                .expect("sink is parked whenever no window holds it"),
        }
    }

    fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        read_exact_from(&mut self.source, &mut self.stats, buf)
    }

    /// Read and verify the 4-byte magic number.
    pub fn check_magic(&mut self) -> Result<()> {
        if self.state != FrameState::AwaitingMagic {
            return Err(Error::internal("magic number already consumed"));
        }
        let mut magic = [0u8; 4];
        self.read_exact(&mut magic)?;
        let value = u32::from_le_bytes(magic);
        if value != ZSTD_MAGIC {
            return Err(Error::corrupted(format!(
                "bad magic number 0x{:08X}, expected 0x{:08X}",
                value, ZSTD_MAGIC
            )));
        }
        self.state = FrameState::AwaitingHeader;
        Ok(())
    }

    /// Read the frame header and size the window to it.
    pub fn read_frame_header(&mut self) -> Result<()> {
        if self.state != FrameState::AwaitingHeader {
            return Err(Error::internal("frame header read out of order"));
        }

        let mut descriptor_byte = [0u8; 1];
        self.read_exact(&mut descriptor_byte)?;
        let descriptor = FrameDescriptor::new(descriptor_byte[0])?;

        let mut fields = [0u8; 13];
        let fields = &mut fields[..descriptor.remaining_header_bytes()];
        self.read_exact(fields)?;
        let header = FrameHeader::from_descriptor(descriptor, fields)?;

        debug!(
            window_size = header.window_size,
            content_size = ?header.frame_content_size,
            checksum = header.has_checksum(),
            "frame header parsed"
        );

        let sink = self
            .sink
            .take()
            .ok_or_else(|| Error::internal("sink already moved into a window"))?;
        match self.window.as_mut() {
            Some(window) => window.reset(header.window_size, sink),
            None => self.window = Some(RingBuffer::new(header.window_size, sink)),
        }

        self.header = Some(header);
        self.state = FrameState::DecodingBlocks;
        Ok(())
    }

    /// Decode one block, flushing the window when it was the last.
    pub fn decode_next_block(&mut self) -> Result<()> {
        if self.state != FrameState::DecodingBlocks {
            return Err(Error::internal("no block to decode in this state"));
        }

        let mut raw_header = [0u8; BlockHeader::SIZE];
        self.read_exact(&mut raw_header)?;
        let header = BlockHeader::parse(raw_header)?;
        trace!(
            block = self.stats.blocks_decoded,
            block_type = ?header.block_type,
            size = header.block_size,
            last = header.last_block,
            "decoding block"
        );

        match header.block_type {
            BlockType::Raw => {
                self.block_buf.resize(header.block_size, 0);
                read_exact_from(&mut self.source, &mut self.stats, &mut self.block_buf)?;
                self.window
                    .as_mut()
                    .ok_or_else(no_window)?
                    .push(&self.block_buf)?;
            }
            BlockType::Rle => {
                let mut byte = [0u8; 1];
                self.read_exact(&mut byte)?;
                self.block_buf.clear();
                self.block_buf.resize(header.block_size, byte[0]);
                self.window
                    .as_mut()
                    .ok_or_else(no_window)?
                    .push(&self.block_buf)?;
            }
            BlockType::Compressed => {
                self.block_buf.resize(header.block_size, 0);
                read_exact_from(&mut self.source, &mut self.stats, &mut self.block_buf)?;
                self.decode_compressed_block()?;
            }
        }

        self.stats.blocks_decoded += 1;

        if header.last_block {
            self.finish_frame()?;
        } else if let Some(window) = self.window.as_ref() {
            self.stats.bytes_written = window.flushed_bytes();
        }
        Ok(())
    }

    /// Decode and execute the literals and sequences of one compressed
    /// block sitting in `block_buf`.
    fn decode_compressed_block(&mut self) -> Result<()> {
        // The buffer is swapped out for the duration so its contents can
        // be parsed while the window and carry-over state are mutated.
        let content = std::mem::take(&mut self.block_buf);
        let result = self.decode_block_content(&content);
        self.block_buf = content;
        result
    }

    fn decode_block_content(&mut self, content: &[u8]) -> Result<()> {
        let mut literals = LiteralsSection::parse(content, self.previous_huffman.as_ref())?;
        self.previous_huffman = literals.table.clone();

        let sequences =
            SequencesSection::parse(&content[literals.bytes_consumed..], &self.carry_over)?;

        // Every byte of the block must be claimed by exactly one section.
        let accounted = literals.bytes_consumed + sequences.bytes_consumed;
        if accounted != content.len() {
            return Err(Error::corrupted(format!(
                "block sections account for {} of {} bytes",
                accounted,
                content.len()
            )));
        }

        if let Some(tables) = &sequences.tables {
            self.carry_over.literal_lengths = Some(tables.literal_lengths.clone());
            self.carry_over.offsets = Some(tables.offsets.clone());
            self.carry_over.match_lengths = Some(tables.match_lengths.clone());
        }

        self.execute_sequences(&mut literals, &sequences.sequences)
    }

    /// Run the block's sequences against the window, then append whatever
    /// literals no sequence claimed.
    fn execute_sequences(
        &mut self,
        literals: &mut LiteralsSection,
        sequences: &[Sequence],
    ) -> Result<()> {
        for sequence in sequences {
            let offset = next_offset(&mut self.offset_history, sequence);

            let window = self.window_mut()?;
            if sequence.literal_length > 0 {
                let run = literals.take(sequence.literal_length as usize)?;
                window.push(run)?;
            }
            if sequence.match_length > 0 {
                let distance = usize::try_from(offset)
                    .map_err(|_| Error::corrupted("match offset overflows this platform"))?;
                window.repeat_before_index(sequence.match_length as usize, distance)?;
            }
        }

        let window = self.window_mut()?;
        window.push(literals.rest())?;
        Ok(())
    }

    /// Flush the window, verify the declared content size, and skip the
    /// checksum if the header announced one.
    fn finish_frame(&mut self) -> Result<()> {
        let window = self.window.as_mut().ok_or_else(no_window)?;
        window.flush()?;
        let produced = window.flushed_bytes();
        self.stats.bytes_written = produced;

        let header = self
            .header
            .as_ref()
            .ok_or_else(|| Error::internal("finishing a frame with no header"))?;
        let declared = header.frame_content_size;
        let has_checksum = header.has_checksum();

        if let Some(declared) = declared {
            if produced != declared {
                return Err(Error::corrupted(format!(
                    "frame produced {} bytes but declared {}",
                    produced, declared
                )));
            }
        }

        // The checksum is skipped, not verified.
        if has_checksum {
            let mut checksum = [0u8; 4];
            self.read_exact(&mut checksum)?;
        }

        self.state = FrameState::Done;
        debug!(
            bytes_read = self.stats.bytes_read,
            bytes_written = self.stats.bytes_written,
            blocks = self.stats.blocks_decoded,
            "frame decompressed"
        );
        Ok(())
    }

    /// Decompress the whole frame, start to finish.
    pub fn decompress(&mut self) -> Result<()> {
        self.check_magic()?;
        self.read_frame_header()?;
        while !self.is_done() {
            self.decode_next_block()?;
        }
        Ok(())
    }

    fn window_mut(&mut self) -> Result<&mut RingBuffer<W>> {
        self.window.as_mut().ok_or_else(no_window)
    }
}

fn no_window() -> Error {
    Error::internal("window used before the frame header")
}

fn read_exact_from<R: Read>(
    source: &mut BufReader<R>,
    stats: &mut DecodeStats,
    buf: &mut [u8],
) -> Result<()> {
    source.read_exact(buf).map_err(|err| {
        if err.kind() == std::io::ErrorKind::UnexpectedEof {
            Error::unexpected_eof(stats.bytes_read as usize)
        } else {
            Error::Io(err)
        }
    })?;
    stats.bytes_read += buf.len() as u64;
    Ok(())
}

/// Resolve a sequence's raw offset value against the recent-offset
/// history.
///
/// Values above 3 are literal offsets (minus the 3 reserved codes) and
/// push the history. Values 1 to 3 select a history slot, but the slot
/// choice and rotation differ when the sequence carries no literals;
/// code 3 then means "most recent offset minus one".
fn next_offset(history: &mut [u64; 3], sequence: &Sequence) -> u64 {
    let value = sequence.offset;

    if value > 3 {
        let offset = value - 3;
        history[2] = history[1];
        history[1] = history[0];
        history[0] = offset;
        return offset;
    }

    if sequence.literal_length > 0 {
        match value {
            1 => history[0],
            2 => {
                let offset = history[1];
                history[1] = history[0];
                history[0] = offset;
                offset
            }
            _ => {
                let offset = history[2];
                history[2] = history[1];
                history[1] = history[0];
                history[0] = offset;
                offset
            }
        }
    } else {
        match value {
            1 => {
                let offset = history[1];
                history[1] = history[0];
                history[0] = offset;
                offset
            }
            2 => {
                let offset = history[2];
                history[2] = history[1];
                history[1] = history[0];
                history[0] = offset;
                offset
            }
            _ => {
                // An offset of zero is rejected at execution time.
                let offset = history[0].saturating_sub(1);
                history[2] = history[1];
                history[1] = history[0];
                history[0] = offset;
                offset
            }
        }
    }
}
