//! FSE decoding tables: description parsing and table construction.

use crate::bits::ForwardBitReader;
use tundra_core::{Error, Result};

use super::FSE_MAX_ACCURACY_LOG;

/// One state's worth of decoding information.
///
/// `symbol` already carries the translated base value for alphabets that
/// use one (literal lengths, match lengths); `extra_bits` is the number of
/// value bits to read on top of it. For untranslated alphabets (offsets,
/// Huffman weights) `symbol` is the raw code and `extra_bits` is zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FseEntry {
    /// Decoded symbol, translated to a base value where applicable.
    pub symbol: u32,
    /// Base value of the next-state range.
    pub baseline: u16,
    /// Bits consumed from the stream to pick the next state.
    pub num_bits: u8,
    /// Extra value bits on top of `symbol`.
    pub extra_bits: u8,
}

/// Immutable FSE decoding table.
///
/// Built once per block (or once per program for the predefined
/// distributions) and shared read-only between decode cursors; the mutable
/// per-stream state lives in [`FseDecoder`](super::FseDecoder).
#[derive(Debug, Clone)]
pub struct FseTable {
    accuracy_log: u8,
    entries: Vec<FseEntry>,
}

impl FseTable {
    /// Parse a table description from a forward bit stream and build the
    /// decoding table.
    ///
    /// Returns the table and the number of whole bytes the description
    /// consumed (the caller advances its block cursor by that amount).
    ///
    /// Format (RFC 8878 Section 4.1.1): 4 bits `accuracy_log - 5`, then
    /// one variable-width probability per symbol. Each probability is read
    /// with `highbit(remaining + 1) + 1` bits; values below a threshold
    /// only needed one bit fewer, in which case the last bit is unwound.
    /// A probability of zero is followed by 2-bit runs counting further
    /// zero-probability symbols.
    pub fn parse(
        data: &[u8],
        max_symbol: usize,
        max_accuracy_log: u8,
        translation: Option<&[u32]>,
        extra_bits: Option<&[u8]>,
    ) -> Result<(Self, usize)> {
        if data.is_empty() {
            return Err(Error::corrupted("empty FSE table description"));
        }

        let mut reader = ForwardBitReader::new(data);

        let accuracy_log = reader.read(4)? as u8 + 5;
        if accuracy_log > max_accuracy_log {
            return Err(Error::corrupted(format!(
                "FSE accuracy log {} exceeds maximum {} for this alphabet",
                accuracy_log, max_accuracy_log
            )));
        }

        let table_size = 1i32 << accuracy_log;
        let mut remaining = table_size;
        let mut probabilities: Vec<i16> = Vec::with_capacity(max_symbol + 1);

        while remaining > 0 {
            if probabilities.len() > max_symbol {
                return Err(Error::corrupted(
                    "FSE table description has more symbols than the alphabet",
                ));
            }

            let bits_needed = (highbit_u32((remaining + 1) as u32) + 1) as usize;
            let mut value = reader.read(bits_needed)? as u32;

            let lower_mask = (1u32 << (bits_needed - 1)) - 1;
            let threshold = (1u32 << bits_needed) - 1 - (remaining + 1) as u32;

            if (value & lower_mask) < threshold {
                // Small value: it fit in one bit less than we read.
                reader.unwind_bit()?;
                value &= lower_mask;
            } else if value > lower_mask {
                value -= threshold;
            }

            // The encoded value is probability + 1; zero means "less than 1"
            // which still occupies one table slot.
            let probability = value as i32 - 1;
            if probability == -1 {
                remaining -= 1;
            } else {
                remaining -= probability;
            }
            probabilities.push(probability as i16);

            if probability == 0 {
                loop {
                    let zeros = reader.read(2)?;
                    for _ in 0..zeros {
                        if probabilities.len() > max_symbol {
                            return Err(Error::corrupted(
                                "FSE zero run exceeds the alphabet",
                            ));
                        }
                        probabilities.push(0);
                    }
                    if zeros < 3 {
                        break;
                    }
                }
            }
        }

        if remaining != 0 {
            return Err(Error::corrupted(format!(
                "FSE probabilities overshoot the table size by {}",
                -remaining
            )));
        }

        let table = Self::build_with_log_check(
            &probabilities,
            accuracy_log,
            translation,
            extra_bits,
        )?;
        Ok((table, reader.bytes_consumed()))
    }

    /// Build a decoding table from a probability distribution.
    ///
    /// Probabilities must sum to the table size, counting each `-1`
    /// ("less than one") entry as a single slot. `translation` maps symbol
    /// indices to base values and `extra_bits` to their extra bit counts;
    /// when absent, symbols stay raw.
    pub fn build(
        probabilities: &[i16],
        accuracy_log: u8,
        translation: Option<&[u32]>,
        extra_bits: Option<&[u8]>,
    ) -> Result<Self> {
        Self::build_with_log_check(probabilities, accuracy_log, translation, extra_bits)
    }

    fn build_with_log_check(
        probabilities: &[i16],
        accuracy_log: u8,
        translation: Option<&[u32]>,
        extra_bits: Option<&[u8]>,
    ) -> Result<Self> {
        // Below 5 the spread stride is not coprime with the table size.
        if !(5..=FSE_MAX_ACCURACY_LOG).contains(&accuracy_log) {
            return Err(Error::corrupted(format!(
                "FSE accuracy log {} outside supported range 5..={}",
                accuracy_log, FSE_MAX_ACCURACY_LOG
            )));
        }

        let table_size = 1usize << accuracy_log;

        let mut slots = 0i64;
        for &p in probabilities {
            if p < -1 {
                return Err(Error::corrupted("FSE probability below -1"));
            }
            slots += if p == -1 { 1 } else { p as i64 };
        }
        if slots != table_size as i64 {
            return Err(Error::corrupted(format!(
                "FSE probabilities fill {} of {} table slots",
                slots, table_size
            )));
        }

        // Step 1: low-probability symbols take single slots from the high
        // end downward; everyone else remembers its starting occurrence
        // count for the num_bits/baseline pass.
        let mut state_symbol = vec![0usize; table_size];
        let mut symbol_next = vec![0u32; probabilities.len()];
        let mut high_position = table_size as isize - 1;
        for (symbol, &p) in probabilities.iter().enumerate() {
            if p == -1 {
                state_symbol[high_position as usize] = symbol;
                high_position -= 1;
                symbol_next[symbol] = 1;
            } else {
                symbol_next[symbol] = p as u32;
            }
        }

        // Step 2: spread the remaining symbols with the standard stride,
        // skipping the slots claimed in step 1.
        let step = (table_size >> 1) + (table_size >> 3) + 3;
        let mask = table_size - 1;
        let mut position = 0usize;
        for (symbol, &p) in probabilities.iter().enumerate() {
            if p <= 0 {
                continue;
            }
            for _ in 0..p {
                state_symbol[position] = symbol;
                position = (position + step) & mask;
                while position as isize > high_position {
                    position = (position + step) & mask;
                }
            }
        }
        if position != 0 {
            // The stride walks every remaining slot exactly once, so with a
            // valid slot sum it must return to zero.
            return Err(Error::internal("FSE spread did not return to state 0"));
        }

        // Step 3: derive per-state bit counts and baselines by counting
        // symbol occurrences in state order.
        let mut entries = vec![FseEntry::default(); table_size];
        for (state, entry) in entries.iter_mut().enumerate() {
            let symbol = state_symbol[state];
            let next = symbol_next[symbol];
            symbol_next[symbol] += 1;

            let num_bits = (accuracy_log as u32 - highbit_u32(next)) as u8;
            let baseline = ((next << num_bits) - table_size as u32) as u16;

            let translated = match translation {
                Some(t) => *t.get(symbol).ok_or_else(|| {
                    Error::internal("symbol outside translation table")
                })?,
                None => symbol as u32,
            };
            let extra = match extra_bits {
                Some(e) => *e.get(symbol).ok_or_else(|| {
                    Error::internal("symbol outside extra-bits table")
                })?,
                None => 0,
            };

            *entry = FseEntry {
                symbol: translated,
                baseline,
                num_bits,
                extra_bits: extra,
            };
        }

        Ok(Self {
            accuracy_log,
            entries,
        })
    }

    /// Number of states (`2^accuracy_log`).
    #[inline]
    pub fn size(&self) -> usize {
        self.entries.len()
    }

    /// Accuracy log of this table.
    #[inline]
    pub fn accuracy_log(&self) -> u8 {
        self.accuracy_log
    }

    /// Look up the entry for a state.
    #[inline]
    pub fn entry(&self, state: usize) -> &FseEntry {
        &self.entries[state]
    }
}

/// Index of the highest set bit. `value` must be non-zero.
#[inline]
pub(crate) fn highbit_u32(value: u32) -> u32 {
    debug_assert!(value != 0);
    31 - value.leading_zeros()
}
