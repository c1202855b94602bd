//! # Tundra Core
//!
//! Core traits, error taxonomy and stream types for the tundra
//! decompression crates.
//!
//! ## Design Philosophy
//!
//! - **Untrusted input**: every decoder built on these types must report
//!   corrupt data as an [`Error`], never panic on it
//! - **Streaming-first**: decoders expose both one-shot and pull-based
//!   incremental interfaces
//! - **No global state**: statistics and carry-over state belong to decoder
//!   instances
//!
//! ## Core Traits
//!
//! - [`Decompressor`]: one-shot decompression operations
//! - [`StreamingDecompressor`]: incremental, pull-based decoding

pub mod error;
pub mod stats;
pub mod stream;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
pub use stats::DecodeStats;
pub use stream::StreamState;
pub use traits::{Decompressor, StreamingDecompressor};
pub use types::Algorithm;
