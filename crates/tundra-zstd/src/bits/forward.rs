//! Forward bit reader.

use tundra_core::{Error, Result};

/// Reads bits from a byte slice front to back, least significant bit first
/// within each byte.
///
/// Used for frame/table headers and FSE table descriptions. The table
/// description format needs to give back a single bit when it detects a
/// "small" probability encoding, hence [`unwind_bit`](Self::unwind_bit).
#[derive(Debug, Clone)]
pub struct ForwardBitReader<'a> {
    data: &'a [u8],
    /// Absolute index of the next bit to read.
    bit_pos: usize,
}

impl<'a> ForwardBitReader<'a> {
    /// Create a reader positioned at the first bit of `data`.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, bit_pos: 0 }
    }

    /// Read the next `n` bits (0 to 64) as an unsigned integer.
    ///
    /// Fails with [`Error::UnexpectedEof`] if the slice holds fewer than
    /// `n` unread bits.
    pub fn read(&mut self, n: usize) -> Result<u64> {
        if n == 0 {
            return Ok(0);
        }
        if n > 64 {
            return Err(Error::internal(format!(
                "forward bit reader asked for {} bits at once",
                n
            )));
        }
        if self.bit_pos + n > self.data.len() * 8 {
            return Err(Error::unexpected_eof(self.data.len()));
        }

        let mut value = 0u64;
        let mut got = 0;
        while got < n {
            let byte = self.data[self.bit_pos >> 3];
            let bit_in_byte = self.bit_pos & 7;
            let take = (n - got).min(8 - bit_in_byte);
            let mask = ((1u16 << take) - 1) as u8;
            let bits = (byte >> bit_in_byte) & mask;
            value |= (bits as u64) << got;
            got += take;
            self.bit_pos += take;
        }
        Ok(value)
    }

    /// Push the most recently consumed bit back onto the stream.
    ///
    /// Failing here means the caller's bookkeeping is broken, so this is an
    /// [`Error::Internal`], not a data error.
    pub fn unwind_bit(&mut self) -> Result<()> {
        if self.bit_pos == 0 {
            return Err(Error::internal("no consumed bit available to unwind"));
        }
        self.bit_pos -= 1;
        Ok(())
    }

    /// Total bits consumed so far (unwinds included).
    pub fn bits_consumed(&self) -> usize {
        self.bit_pos
    }

    /// Bytes touched so far, i.e. consumed bits rounded up to whole bytes.
    pub fn bytes_consumed(&self) -> usize {
        self.bit_pos.div_ceil(8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// LSB-first bit writer, the inverse of `ForwardBitReader`.
    struct BitWriter {
        bytes: Vec<u8>,
        filled: usize,
    }

    impl BitWriter {
        fn new() -> Self {
            Self {
                bytes: Vec::new(),
                filled: 0,
            }
        }

        fn write(&mut self, value: u64, n: usize) {
            for i in 0..n {
                if self.filled % 8 == 0 {
                    self.bytes.push(0);
                }
                let bit = (value >> i) & 1;
                let last = self.bytes.len() - 1;
                self.bytes[last] |= (bit as u8) << (self.filled % 8);
                self.filled += 1;
            }
        }
    }

    #[test]
    fn test_read_lsb_first_within_byte() {
        let data = [0b1011_0100];
        let mut reader = ForwardBitReader::new(&data);
        assert_eq!(reader.read(4).unwrap(), 0b0100);
        assert_eq!(reader.read(4).unwrap(), 0b1011);
    }

    #[test]
    fn test_read_crosses_byte_boundary() {
        let data = [0xFF, 0x00];
        let mut reader = ForwardBitReader::new(&data);
        assert_eq!(reader.read(4).unwrap(), 0x0F);
        assert_eq!(reader.read(8).unwrap(), 0x0F);
        assert_eq!(reader.read(4).unwrap(), 0);
    }

    #[test]
    fn test_read_zero_consumes_nothing() {
        let data = [0xAB];
        let mut reader = ForwardBitReader::new(&data);
        assert_eq!(reader.read(0).unwrap(), 0);
        assert_eq!(reader.bits_consumed(), 0);
    }

    #[test]
    fn test_read_past_end_fails() {
        let data = [0xAB];
        let mut reader = ForwardBitReader::new(&data);
        assert_eq!(reader.read(8).unwrap(), 0xAB);
        assert!(matches!(
            reader.read(1),
            Err(Error::UnexpectedEof { .. })
        ));
    }

    #[test]
    fn test_unwind_restores_one_bit() {
        let data = [0b0000_0110];
        let mut reader = ForwardBitReader::new(&data);
        assert_eq!(reader.read(3).unwrap(), 0b110);
        reader.unwind_bit().unwrap();
        assert_eq!(reader.bits_consumed(), 2);
        // The unwound bit reads again as the low bit of the next value.
        assert_eq!(reader.read(1).unwrap(), 1);
    }

    #[test]
    fn test_unwind_without_read_is_internal_error() {
        let data = [0x00];
        let mut reader = ForwardBitReader::new(&data);
        assert!(matches!(
            reader.unwind_bit(),
            Err(Error::Internal { .. })
        ));
    }

    #[test]
    fn test_bytes_consumed_rounds_up() {
        let data = [0xFF, 0xFF];
        let mut reader = ForwardBitReader::new(&data);
        reader.read(3).unwrap();
        assert_eq!(reader.bytes_consumed(), 1);
        reader.read(6).unwrap();
        assert_eq!(reader.bytes_consumed(), 2);
    }

    #[test]
    fn test_write_read_inverse_property() {
        // Writing values of every width 0..=64 and reading them back must
        // reproduce the originals.
        let widths = [1usize, 2, 3, 5, 7, 8, 9, 13, 16, 21, 31, 32, 33, 48, 64];
        let mut writer = BitWriter::new();
        let mut expected = Vec::new();
        let mut seed = 0x9E37_79B9_7F4A_7C15u64;
        for &w in &widths {
            seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            let value = if w == 64 { seed } else { seed & ((1u64 << w) - 1) };
            writer.write(value, w);
            expected.push((value, w));
        }

        let mut reader = ForwardBitReader::new(&writer.bytes);
        for (value, w) in expected {
            assert_eq!(reader.read(w).unwrap(), value, "width {}", w);
        }
    }
}
