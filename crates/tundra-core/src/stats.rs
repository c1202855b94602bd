//! Decode statistics.
//!
//! An explicit, caller-visible statistics struct owned by the decoder
//! instance. There is no global state; independent decoders count
//! independently.

/// Counters accumulated over one decompression run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecodeStats {
    /// Compressed bytes consumed from the source (headers included).
    pub bytes_read: u64,
    /// Decompressed bytes handed to the sink.
    pub bytes_written: u64,
    /// Blocks decoded so far.
    pub blocks_decoded: u64,
}

impl DecodeStats {
    /// Create zeroed statistics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset all counters to zero.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Expansion factor achieved so far (written / read).
    pub fn expansion_ratio(&self) -> f64 {
        if self.bytes_read == 0 {
            return 0.0;
        }
        self.bytes_written as f64 / self.bytes_read as f64
    }
}
