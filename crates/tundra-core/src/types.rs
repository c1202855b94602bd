//! Core type definitions.

/// Supported decompression algorithms.
///
/// Identifies the codec behind a [`Decompressor`](crate::Decompressor)
/// implementation; useful for dispatch and diagnostics in multi-codec
/// consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Algorithm {
    /// Zstandard (RFC 8878).
    Zstd,
    /// Deflate (RFC 1951).
    Deflate,
    /// LZ4 block/frame format.
    Lz4,
}

impl Algorithm {
    /// Get algorithm name as string.
    pub fn name(self) -> &'static str {
        match self {
            Algorithm::Zstd => "zstd",
            Algorithm::Deflate => "deflate",
            Algorithm::Lz4 => "lz4",
        }
    }
}

impl core::fmt::Display for Algorithm {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names() {
        assert_eq!(Algorithm::Zstd.name(), "zstd");
        assert_eq!(Algorithm::Zstd.to_string(), "zstd");
    }
}
