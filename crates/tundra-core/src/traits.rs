//! Core traits for decompression.
//!
//! Two consumption modes are modelled:
//!
//! - [`Decompressor`]: one-shot, whole-input operations.
//! - [`StreamingDecompressor`]: pull-based incremental decoding, where each
//!   call fills a caller-supplied buffer with whatever output is currently
//!   available and decodes more input only on demand.

use crate::error::Result;
use crate::stats::DecodeStats;
use crate::types::Algorithm;

/// One-shot decompression operations.
pub trait Decompressor {
    /// Get the decompression algorithm.
    fn algorithm(&self) -> Algorithm;

    /// Decompress data in one shot.
    fn decompress(&self, input: &[u8]) -> Result<Vec<u8>>;

    /// Decompress data into an existing buffer.
    ///
    /// Returns the number of bytes written to `output`.
    fn decompress_to(&self, input: &[u8], output: &mut [u8]) -> Result<usize>;

    /// Decompress with known output size (pre-sizes the allocation).
    fn decompress_with_size(&self, input: &[u8], output_size: usize) -> Result<Vec<u8>> {
        let mut output = vec![0u8; output_size];
        let written = self.decompress_to(input, &mut output)?;
        output.truncate(written);
        Ok(output)
    }

    /// Get statistics for the most recent operation, if tracked.
    fn stats(&self) -> Option<DecodeStats> {
        None
    }
}

/// Pull-based streaming decompression.
///
/// Implementations decode further input lazily: a call to
/// [`read_decoded`](StreamingDecompressor::read_decoded) may consume an
/// arbitrary amount of compressed input before producing any output, but
/// never decodes more than the consumer asks for (plus at most one block of
/// lookahead).
pub trait StreamingDecompressor {
    /// Get the decompression algorithm.
    fn algorithm(&self) -> Algorithm;

    /// Fill `output` with as many decoded bytes as are available,
    /// decoding additional input as needed.
    ///
    /// Returns the number of bytes written. A return of 0 with a non-empty
    /// `output` buffer means end of stream.
    fn read_decoded(&mut self, output: &mut [u8]) -> Result<usize>;

    /// Check whether the stream has been fully decoded and drained.
    fn is_finished(&self) -> bool;
}
