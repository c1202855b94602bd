//! Frame header parsing.

use tundra_core::{Error, Result};

/// Frame header descriptor byte.
///
/// ```text
/// Bit 7-6: Frame_Content_Size_flag
/// Bit 5:   Single_Segment_flag
/// Bit 4:   Unused_bit
/// Bit 3:   Reserved_bit (must be 0)
/// Bit 2:   Content_Checksum_flag
/// Bit 1-0: Dictionary_ID_flag
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameDescriptor {
    raw: u8,
}

impl FrameDescriptor {
    /// Parse a frame descriptor byte.
    pub fn new(byte: u8) -> Result<Self> {
        if byte & 0x08 != 0 {
            return Err(Error::corrupted(
                "reserved bit in frame descriptor must be 0",
            ));
        }
        Ok(Self { raw: byte })
    }

    /// Number of bytes used by the frame content size field
    /// (0, 1, 2, 4 or 8).
    pub fn frame_content_size_bytes(&self) -> usize {
        match (self.raw >> 6) & 0x03 {
            0 => {
                if self.single_segment_flag() {
                    1
                } else {
                    0
                }
            }
            1 => 2,
            2 => 4,
            _ => 8,
        }
    }

    /// Single_Segment_flag: window size is the content size and no window
    /// descriptor byte is present.
    #[inline]
    pub fn single_segment_flag(&self) -> bool {
        (self.raw & 0x20) != 0
    }

    /// Content_Checksum_flag: 4 checksum bytes follow the last block.
    #[inline]
    pub fn content_checksum_flag(&self) -> bool {
        (self.raw & 0x04) != 0
    }

    /// Number of bytes used by the dictionary ID field (0, 1, 2 or 4).
    pub fn dictionary_id_bytes(&self) -> usize {
        match self.raw & 0x03 {
            0 => 0,
            1 => 1,
            2 => 2,
            _ => 4,
        }
    }

    /// Whether a window descriptor byte follows the descriptor.
    #[inline]
    pub fn has_window_descriptor(&self) -> bool {
        !self.single_segment_flag()
    }

    /// Header bytes that follow the descriptor byte itself.
    pub fn remaining_header_bytes(&self) -> usize {
        usize::from(self.has_window_descriptor())
            + self.dictionary_id_bytes()
            + self.frame_content_size_bytes()
    }
}

/// Parsed Zstd frame header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameHeader {
    /// Frame descriptor.
    pub descriptor: FrameDescriptor,
    /// Window size in bytes.
    pub window_size: usize,
    /// Dictionary ID (0 if not present).
    pub dictionary_id: u32,
    /// Declared decompressed size (None if not announced).
    pub frame_content_size: Option<u64>,
}

impl FrameHeader {
    /// Assemble a header from its descriptor plus the
    /// [`remaining_header_bytes`](FrameDescriptor::remaining_header_bytes)
    /// that follow it.
    pub fn from_descriptor(descriptor: FrameDescriptor, rest: &[u8]) -> Result<Self> {
        if rest.len() != descriptor.remaining_header_bytes() {
            return Err(Error::internal(
                "frame header field buffer does not match the descriptor",
            ));
        }

        let mut rest = rest;

        let mut window_size = 0usize;
        if descriptor.has_window_descriptor() {
            window_size = Self::decode_window_size(rest[0])?;
            rest = &rest[1..];
        }

        let dict_bytes = descriptor.dictionary_id_bytes();
        let dictionary_id = read_le_uint(&rest[..dict_bytes]) as u32;
        rest = &rest[dict_bytes..];

        let fcs_bytes = descriptor.frame_content_size_bytes();
        let frame_content_size = if fcs_bytes > 0 {
            let mut fcs = read_le_uint(&rest[..fcs_bytes]);
            // The 2-byte form shifts its range up by 256.
            if fcs_bytes == 2 {
                fcs += 256;
            }
            Some(fcs)
        } else {
            None
        };

        if descriptor.single_segment_flag() {
            let content = frame_content_size.unwrap_or(0);
            if content > super::MAX_WINDOW_SIZE as u64 {
                return Err(Error::Unsupported(format!(
                    "single-segment frame of {} bytes exceeds the {} byte window limit",
                    content,
                    super::MAX_WINDOW_SIZE
                )));
            }
            window_size = content as usize;
        }

        Ok(Self {
            descriptor,
            window_size,
            dictionary_id,
            frame_content_size,
        })
    }

    /// Parse a header from the bytes following the magic number
    /// (slice-based convenience; the streaming decoder assembles the same
    /// pieces from its source).
    pub fn parse(data: &[u8]) -> Result<Self> {
        let descriptor = FrameDescriptor::new(
            *data.first().ok_or_else(|| Error::unexpected_eof(0))?,
        )?;
        let needed = descriptor.remaining_header_bytes();
        if data.len() < 1 + needed {
            return Err(Error::unexpected_eof(data.len()));
        }
        Self::from_descriptor(descriptor, &data[1..1 + needed])
    }

    /// Total encoded header size in bytes, descriptor included.
    pub fn header_size(&self) -> usize {
        1 + self.descriptor.remaining_header_bytes()
    }

    /// Whether a 4-byte content checksum trails the last block.
    pub fn has_checksum(&self) -> bool {
        self.descriptor.content_checksum_flag()
    }

    /// Decode the window descriptor byte: a power of two from the 5-bit
    /// exponent plus eighths of it from the 3-bit mantissa.
    fn decode_window_size(byte: u8) -> Result<usize> {
        let exponent = (byte >> 3) as u32;
        let mantissa = (byte & 0x07) as usize;

        let window_log = 10 + exponent;
        if window_log >= usize::BITS {
            return Err(Error::Unsupported(format!(
                "window log {} cannot be represented",
                window_log
            )));
        }
        let window_base = 1usize << window_log;
        let window_size = window_base + (window_base >> 3) * mantissa;

        if window_size > super::MAX_WINDOW_SIZE {
            return Err(Error::Unsupported(format!(
                "window size {} exceeds the supported maximum {}",
                window_size,
                super::MAX_WINDOW_SIZE
            )));
        }
        Ok(window_size)
    }
}

fn read_le_uint(data: &[u8]) -> u64 {
    let mut result = 0u64;
    for (i, &byte) in data.iter().enumerate() {
        result |= (byte as u64) << (8 * i);
    }
    result
}
