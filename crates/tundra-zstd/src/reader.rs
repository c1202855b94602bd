//! Pull-based stream adapter over the frame decompressor.

use std::collections::VecDeque;
use std::io::{Read, Write};

use tundra_core::{Algorithm, Result, StreamState, StreamingDecompressor};

use crate::decompress::FrameDecompressor;

/// In-memory sink the decompressor flushes into; the reader drains it.
#[derive(Debug, Default)]
struct DrainBuffer {
    queue: VecDeque<u8>,
}

impl Write for DrainBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.queue.extend(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Incremental frame reader: decodes blocks only as the consumer demands
/// bytes.
///
/// Wraps a [`FrameDecompressor`] behind [`std::io::Read`] (a read of 0
/// into a non-empty buffer signals end of stream) and the
/// [`StreamingDecompressor`] trait.
#[derive(Debug)]
pub struct FrameReader<R: Read> {
    decoder: FrameDecompressor<R, DrainBuffer>,
    state: StreamState,
}

impl<R: Read> FrameReader<R> {
    /// Create a reader: consumes the magic number and frame header
    /// immediately so errors in them surface before the first read.
    pub fn new(source: R) -> Result<Self> {
        let mut decoder = FrameDecompressor::new(source, DrainBuffer::default());
        decoder.check_magic()?;
        decoder.read_frame_header()?;
        Ok(Self {
            decoder,
            state: StreamState::Active,
        })
    }

    /// Bytes decoded but not yet handed to the consumer.
    pub fn buffered_len(&mut self) -> usize {
        self.decoder.sink_mut().queue.len()
    }

    fn drain_into(&mut self, output: &mut [u8]) -> usize {
        let queue = &mut self.decoder.sink_mut().queue;
        let n = queue.len().min(output.len());
        for (slot, byte) in output.iter_mut().zip(queue.drain(..n)) {
            *slot = byte;
        }
        n
    }
}

impl<R: Read> StreamingDecompressor for FrameReader<R> {
    fn algorithm(&self) -> Algorithm {
        Algorithm::Zstd
    }

    fn read_decoded(&mut self, output: &mut [u8]) -> Result<usize> {
        if output.is_empty() || self.state.is_terminal() {
            return Ok(0);
        }

        loop {
            let drained = self.drain_into(output);
            if drained > 0 {
                return Ok(drained);
            }
            if self.decoder.is_done() {
                self.state = StreamState::Finished;
                return Ok(0);
            }
            // Decode until the next block yields output (the final block
            // also flushes the window).
            if let Err(err) = self.decoder.decode_next_block() {
                self.state = StreamState::Error;
                return Err(err);
            }
        }
    }

    fn is_finished(&self) -> bool {
        self.state == StreamState::Finished
    }
}

impl<R: Read> Read for FrameReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        StreamingDecompressor::read_decoded(self, buf).map_err(std::io::Error::other)
    }
}
