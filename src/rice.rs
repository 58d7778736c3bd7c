//! Rice decoding support: fast-path lookup tables and the zigzag fold.
//!
//! Rice codes store a unary quotient followed by a `param`-bit remainder,
//! mapped to signed values with the LSB-is-sign zigzag transform. The bit
//! reader decodes short codes through a table lookup keyed by the next
//! [`RICE_DECODING_TABLE_BITS`] bits of its bit buffer: each populated entry
//! gives the decoded value and the number of bits it spans. A `consumed`
//! entry of 0 marks a code longer than the table window, which falls back
//! to bit-by-bit decoding.

use std::sync::OnceLock;

/// Window width of the fast-path lookup, in bits.
pub(crate) const RICE_DECODING_TABLE_BITS: u32 = 13;

/// Number of entries per table.
pub(crate) const RICE_DECODING_TABLE_SIZE: usize = 1 << RICE_DECODING_TABLE_BITS;

/// Mask for extracting a table window from the bit buffer.
pub(crate) const RICE_DECODING_TABLE_MASK: u64 = (RICE_DECODING_TABLE_SIZE - 1) as u64;

/// Codes decoded per refill check in the fast path.
/// RICE_DECODING_CHUNK * RICE_DECODING_TABLE_BITS must not exceed 64.
pub(crate) const RICE_DECODING_CHUNK: u32 = 4;

/// Lookup table for one Rice parameter.
pub(crate) struct RiceDecodingTable {
    /// Bits spanned by the code at each window value; 0 = not in table.
    pub consumed: [u8; RICE_DECODING_TABLE_SIZE],
    /// Decoded (zigzag-folded) value at each window value.
    pub value: [i32; RICE_DECODING_TABLE_SIZE],
}

static RICE_DECODING_TABLES: OnceLock<Box<[RiceDecodingTable]>> = OnceLock::new();

/// Tables for parameters 0 through 31. Parameters of 13 and above never
/// fit the window, leaving their tables empty so every code takes the
/// fallback path.
pub(crate) fn rice_decoding_tables() -> &'static [RiceDecodingTable] {
    RICE_DECODING_TABLES.get_or_init(build_tables)
}

fn build_tables() -> Box<[RiceDecodingTable]> {
    let mut tables = Vec::with_capacity(32);
    for param in 0..32u32 {
        let mut table = RiceDecodingTable {
            consumed: [0; RICE_DECODING_TABLE_SIZE],
            value: [0; RICE_DECODING_TABLE_SIZE],
        };
        let mut i: u32 = 0;
        loop {
            let num_bits = (i >> param) + 1 + param;
            if num_bits > RICE_DECODING_TABLE_BITS {
                break;
            }
            // The code pattern: unary quotient, terminating 1, remainder
            let bits = (1 << param) | (i & ((1 << param) - 1));
            let shift = RICE_DECODING_TABLE_BITS - num_bits;
            for j in 0..(1u32 << shift) {
                let window = ((bits << shift) | j) as usize;
                table.consumed[window] = num_bits as u8;
                table.value[window] = zigzag_to_signed(u64::from(i)) as i32;
            }
            i += 1;
        }
        debug_assert_eq!(table.consumed[0], 0);
        tables.push(table);
    }
    tables.into_boxed_slice()
}

/// Fold an unsigned zigzag representation back to signed:
/// 0 -> 0, 1 -> -1, 2 -> 1, 3 -> -2, 4 -> 2, ...
#[inline]
pub(crate) const fn zigzag_to_signed(value: u64) -> i64 {
    ((value >> 1) as i64) ^ -((value & 1) as i64)
}
