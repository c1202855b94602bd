//! Block content sections: literals and sequences.

mod literals;
mod sequences;

pub use literals::{LiteralsSection, LiteralsType};
pub use sequences::{
    CarryOverTables, CompressionMode, Sequence, SequenceTables, SequencesSection, SymbolTable,
};
