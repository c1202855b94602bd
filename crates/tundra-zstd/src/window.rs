//! Sliding-window output buffer.
//!
//! Decoded output accumulates in a circular buffer sized to the frame's
//! window. New bytes evict the oldest ones, which are flushed to the sink
//! at eviction time; [`RingBuffer::flush`] drains the remainder once the
//! frame ends. Every byte produced reaches the sink exactly once, in
//! production order.
//!
//! Back-references ("repeats") read already-produced bytes out of the
//! buffer and append them as new output, including the self-referential
//! case where the match is longer than its distance and the copy source
//! overlaps the bytes being written.

use std::io::Write;

use tundra_core::{Error, Result};

/// Circular decode buffer with eviction-time flushing.
#[derive(Debug)]
pub struct RingBuffer<W: Write> {
    data: Vec<u8>,
    /// Scratch for assembling repeat sources that straddle the wrap point.
    repeat_buf: Vec<u8>,
    /// Whether every slot has been written at least once. Distinguishes a
    /// full buffer (everything flushable) from a fresh one (slots above
    /// `offset` hold nothing).
    all_dirty: bool,
    /// Next write position.
    offset: usize,
    capacity: usize,
    sink: W,
    flushed: u64,
}

impl<W: Write> RingBuffer<W> {
    /// Create a buffer of `capacity` bytes draining into `sink`.
    pub fn new(capacity: usize, sink: W) -> Self {
        // Zero-sized windows (empty single-segment frames) still need
        // valid modular arithmetic.
        let capacity = capacity.max(1);
        Self {
            data: vec![0; capacity],
            repeat_buf: vec![0; capacity],
            all_dirty: false,
            offset: 0,
            capacity,
            sink,
            flushed: 0,
        }
    }

    /// Re-arm the buffer for a new frame, reusing the allocation when the
    /// window size allows.
    pub fn reset(&mut self, capacity: usize, sink: W) {
        let capacity = capacity.max(1);
        self.data.clear();
        self.data.resize(capacity, 0);
        self.repeat_buf.clear();
        self.repeat_buf.resize(capacity, 0);
        self.all_dirty = false;
        self.offset = 0;
        self.capacity = capacity;
        self.sink = sink;
        self.flushed = 0;
    }

    /// Total bytes flushed to the sink so far.
    pub fn flushed_bytes(&self) -> u64 {
        self.flushed
    }

    /// Bytes currently resident (produced but not yet flushed).
    pub fn resident_len(&self) -> usize {
        if self.all_dirty {
            self.capacity
        } else {
            self.offset
        }
    }

    /// Access the sink (the stream adapter drains its buffer through this).
    pub fn sink_mut(&mut self) -> &mut W {
        &mut self.sink
    }

    fn dump(&mut self, low: usize, high: usize) -> Result<()> {
        self.sink.write_all(&self.data[low..high])?;
        self.flushed += (high - low) as u64;
        Ok(())
    }

    fn dump_all_dirty(&mut self) -> Result<()> {
        if self.all_dirty {
            self.dump(self.offset, self.capacity)?;
        }
        self.dump(0, self.offset)?;
        self.offset = 0;
        self.all_dirty = false;
        Ok(())
    }

    /// Append new output bytes, flushing whatever they evict.
    pub fn push(&mut self, new_data: &[u8]) -> Result<()> {
        // Input at least as large as the window: everything currently
        // buffered flushes, the excess streams straight through, and the
        // newest `capacity` bytes become the entire buffer.
        if new_data.len() >= self.capacity {
            self.dump_all_dirty()?;
            let excess = new_data.len() - self.capacity;
            self.sink.write_all(&new_data[..excess])?;
            self.flushed += excess as u64;
            self.data.copy_from_slice(&new_data[excess..]);
            self.offset = 0;
            self.all_dirty = true;
            return Ok(());
        }

        let end = self.offset + new_data.len();
        if end <= self.capacity {
            // Fits without wrapping.
            if self.all_dirty {
                self.dump(self.offset, end)?;
            }
            self.data[self.offset..end].copy_from_slice(new_data);
            self.offset = end % self.capacity;
            if end == self.capacity {
                self.all_dirty = true;
            }
            return Ok(());
        }

        // Wraps: fill to the top, then overwrite from the bottom. The
        // bottom slots hold the oldest unflushed bytes in either dirty
        // state, so they are dumped before being overwritten.
        let split = self.capacity - self.offset;
        if self.all_dirty {
            self.dump(self.offset, self.capacity)?;
        }
        self.data[self.offset..].copy_from_slice(&new_data[..split]);
        let rest_len = new_data.len() - split;
        self.dump(0, rest_len)?;
        self.data[..rest_len].copy_from_slice(&new_data[split..]);
        self.offset = rest_len;
        self.all_dirty = true;
        Ok(())
    }

    /// Copy `n` already-produced bytes that end `skip_from_end` bytes
    /// before the write position, appending them as new output.
    ///
    /// The source range must lie entirely within produced data;
    /// referencing never-written slots is a corruption report, since only
    /// bad input can request it.
    pub fn repeat(&mut self, n: usize, skip_from_end: usize) -> Result<()> {
        if n == 0 {
            return Ok(());
        }
        if skip_from_end.checked_add(n).map_or(true, |span| span > self.capacity) {
            return Err(Error::corrupted(
                "match source reaches further back than the window",
            ));
        }

        let start = self.offset as isize - skip_from_end as isize;
        let lower = start - n as isize;

        if lower >= 0 {
            self.repeat_buf[..n]
                .copy_from_slice(&self.data[lower as usize..lower as usize + n]);
        } else {
            if !self.all_dirty {
                return Err(Error::corrupted(
                    "match references data that was never produced",
                ));
            }
            let from_top = (-lower) as usize;
            if start >= 0 {
                // Source straddles the wrap point.
                self.repeat_buf[..from_top].copy_from_slice(&self.data[self.capacity - from_top..]);
                self.repeat_buf[from_top..n].copy_from_slice(&self.data[..start as usize]);
            } else {
                // Source sits entirely in the top region.
                let skip_top = (-start) as usize;
                if from_top - skip_top != n {
                    return Err(Error::internal("repeat source range accounting broke"));
                }
                self.repeat_buf[..n].copy_from_slice(
                    &self.data[self.capacity - from_top..self.capacity - skip_top],
                );
            }
        }

        let buf = std::mem::take(&mut self.repeat_buf);
        let result = self.push(&buf[..n]);
        self.repeat_buf = buf;
        result
    }

    /// Append `n` bytes copied from `distance` bytes behind the write
    /// position, the match semantics of the sequence decoder.
    ///
    /// When `n > distance` the source overlaps the destination and the
    /// output repeats with period `distance`; chunking each copy to at most
    /// one period keeps every read inside already-produced data, and lets
    /// matches longer than the window evict and flush as they go.
    pub fn repeat_before_index(&mut self, n: usize, distance: usize) -> Result<()> {
        if distance == 0 {
            return Err(Error::corrupted("match offset of zero"));
        }
        if distance > self.capacity {
            return Err(Error::corrupted("match offset larger than the window"));
        }
        if !self.all_dirty && distance > self.offset {
            return Err(Error::corrupted(
                "match offset reaches beyond all produced data",
            ));
        }

        let mut remaining = n;
        while remaining > 0 {
            let chunk = remaining.min(distance);
            self.repeat(chunk, distance - chunk)?;
            remaining -= chunk;
        }
        Ok(())
    }

    /// Flush every remaining buffered byte to the sink.
    pub fn flush(&mut self) -> Result<()> {
        self.dump_all_dirty()
    }

    /// Buffer contents in production order (oldest unflushed byte first).
    #[cfg(test)]
    fn contents(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.resident_len());
        if self.all_dirty {
            out.extend_from_slice(&self.data[self.offset..]);
        }
        out.extend_from_slice(&self.data[..self.offset]);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn test_push_and_flush_in_order() {
        let mut rb = RingBuffer::new(8, Vec::new());
        rb.push(b"abc").unwrap();
        rb.push(b"def").unwrap();
        assert_eq!(rb.flushed_bytes(), 0);
        rb.flush().unwrap();
        assert_eq!(rb.sink_mut().as_slice(), b"abcdef");
        assert_eq!(rb.flushed_bytes(), 6);
    }

    #[test]
    fn test_wraparound_evicts_oldest_first() {
        let mut rb = RingBuffer::new(4, Vec::new());
        rb.push(b"abcd").unwrap();
        rb.push(b"ef").unwrap();
        // "ab" was evicted and must already be in the sink.
        assert_eq!(rb.sink_mut().as_slice(), b"ab");
        rb.flush().unwrap();
        assert_eq!(rb.sink_mut().as_slice(), b"abcdef");
    }

    #[test]
    fn test_oversized_push_streams_through() {
        let mut rb = RingBuffer::new(4, Vec::new());
        rb.push(b"xy").unwrap();
        rb.push(b"0123456789").unwrap();
        rb.flush().unwrap();
        assert_eq!(rb.sink_mut().as_slice(), b"xy0123456789");
    }

    #[test]
    fn test_repeat_skip_from_end() {
        // Mirrors the copy semantics: skip 4 newest, repeat 3 bytes.
        let mut rb = RingBuffer::new(16, Vec::new());
        rb.push(b"1234123456").unwrap();
        rb.repeat(3, 4).unwrap();
        assert_eq!(rb.contents(), b"1234123456412");
    }

    #[test]
    fn test_repeat_before_index_simple() {
        let mut rb = RingBuffer::new(16, Vec::new());
        rb.push(b"abcdefgh").unwrap();
        rb.repeat_before_index(3, 5).unwrap();
        assert_eq!(rb.contents(), b"abcdefghdef");
    }

    #[test]
    fn test_repeat_before_index_overlapping_is_periodic() {
        let mut rb = RingBuffer::new(16, Vec::new());
        rb.push(b"ab").unwrap();
        rb.repeat_before_index(6, 2).unwrap();
        assert_eq!(rb.contents(), b"abababab");
    }

    #[test]
    fn test_repeat_single_byte_run() {
        let mut rb = RingBuffer::new(8, Vec::new());
        rb.push(b"z").unwrap();
        rb.repeat_before_index(20, 1).unwrap();
        rb.flush().unwrap();
        assert_eq!(rb.sink_mut().as_slice(), vec![b'z'; 21].as_slice());
    }

    #[test]
    fn test_match_longer_than_window_flushes_correctly() {
        let mut rb = RingBuffer::new(4, Vec::new());
        rb.push(b"abc").unwrap();
        rb.repeat_before_index(10, 3).unwrap();
        rb.flush().unwrap();
        assert_eq!(rb.sink_mut().as_slice(), b"abcabcabcabca");
    }

    #[test]
    fn test_zero_length_repeat_is_noop() {
        let mut rb = RingBuffer::new(8, Vec::new());
        rb.push(b"abc").unwrap();
        rb.repeat_before_index(0, 2).unwrap();
        rb.flush().unwrap();
        assert_eq!(rb.sink_mut().as_slice(), b"abc");
    }

    #[test]
    fn test_offset_beyond_produced_data_rejected() {
        let mut rb = RingBuffer::new(8, Vec::new());
        rb.push(b"ab").unwrap();
        assert!(rb.repeat_before_index(1, 3).is_err());
    }

    #[test]
    fn test_offset_larger_than_window_rejected() {
        let mut rb = RingBuffer::new(4, Vec::new());
        rb.push(b"abcd").unwrap();
        rb.push(b"efgh").unwrap();
        assert!(rb.repeat_before_index(1, 5).is_err());
    }

    #[test]
    fn test_zero_offset_rejected() {
        let mut rb = RingBuffer::new(4, Vec::new());
        rb.push(b"ab").unwrap();
        assert!(rb.repeat_before_index(1, 0).is_err());
    }

    /// Randomized conservation check against a naive unbounded model:
    /// flushed bytes plus resident bytes always equal the bytes produced,
    /// the sink always holds exactly the model's evicted prefix, and the
    /// final flush yields the model byte for byte.
    #[test]
    fn test_randomized_conservation_against_model() {
        const CAPACITY: usize = 100;
        const OPERATIONS: usize = 10_000;

        let mut rng = StdRng::seed_from_u64(0x7465_7374);
        let mut rb = RingBuffer::new(CAPACITY, Vec::new());
        let mut model: Vec<u8> = Vec::new();

        for _ in 0..OPERATIONS {
            if model.is_empty() || rng.gen_bool(0.5) {
                let len = rng.gen_range(0..150);
                let chunk: Vec<u8> = (0..len).map(|_| rng.gen()).collect();
                rb.push(&chunk).unwrap();
                model.extend_from_slice(&chunk);
            } else {
                let distance = rng.gen_range(1..=model.len().min(CAPACITY));
                let len = rng.gen_range(1..40);
                rb.repeat_before_index(len, distance).unwrap();
                for _ in 0..len {
                    let byte = model[model.len() - distance];
                    model.push(byte);
                }
            }

            let flushed = rb.flushed_bytes() as usize;
            assert_eq!(flushed + rb.resident_len(), model.len());
            assert_eq!(rb.sink_mut().as_slice(), &model[..flushed]);
        }

        rb.flush().unwrap();
        assert_eq!(rb.flushed_bytes() as usize, model.len());
        assert_eq!(rb.sink_mut().as_slice(), model.as_slice());
    }

    /// Randomized generative-repeat check: every (length, distance) pair,
    /// including overlapping ones, must reproduce the naive
    /// copy-one-byte-at-a-time pattern.
    #[test]
    fn test_randomized_generative_repeat_against_model() {
        let mut rng = StdRng::seed_from_u64(0x6D6F_64656C);
        for _ in 0..500 {
            let seed_len = rng.gen_range(1..30);
            let seed: Vec<u8> = (0..seed_len).map(|_| rng.gen()).collect();
            let distance = rng.gen_range(1..=seed_len);
            let length = rng.gen_range(0..200);

            let mut rb = RingBuffer::new(64, Vec::new());
            rb.push(&seed).unwrap();
            rb.repeat_before_index(length, distance).unwrap();
            rb.flush().unwrap();

            let mut model = seed.clone();
            for _ in 0..length {
                let byte = model[model.len() - distance];
                model.push(byte);
            }
            assert_eq!(rb.sink_mut().as_slice(), model.as_slice());
        }
    }

    #[test]
    fn test_reset_reuses_buffer() {
        let mut rb = RingBuffer::new(8, Vec::new());
        rb.push(b"abc").unwrap();
        rb.flush().unwrap();
        rb.reset(16, Vec::new());
        assert_eq!(rb.flushed_bytes(), 0);
        assert_eq!(rb.resident_len(), 0);
        rb.push(b"xyz").unwrap();
        rb.flush().unwrap();
        assert_eq!(rb.sink_mut().as_slice(), b"xyz");
    }
}
