//! Buffered bit-level reader with integrated CRC tracking.
//!
//! FLAC frames are bit-packed MSB-first and carry checksums over their raw
//! bytes, so the reader co-maintains three pieces of state:
//!
//! - a byte buffer refilled from the underlying [`ByteSource`],
//! - a 64-bit register holding the next bits to hand out, and
//! - CRC-8/CRC-16 registers folded over consumed bytes.
//!
//! Bytes move from the byte buffer into the bit register before the caller
//! consumes them, so the logical stream position lags `byte_buffer_index`
//! by the whole bytes still sitting in the register. CRC queries account
//! for that lag: they fold exactly the bytes consumed since the last
//! [`reset_crcs`](BitInput::reset_crcs), and are only legal at a byte
//! boundary.
//!
//! The Rice decoder keeps a >= 56-bit register so that up to four short
//! codes can be table-decoded per refill check.

use crate::crc::{update_crc16, update_crc8};
use crate::error::{FlacError, FlacResult};
use crate::rice::{
    rice_decoding_tables, RICE_DECODING_CHUNK, RICE_DECODING_TABLE_BITS,
    RICE_DECODING_TABLE_MASK,
};
use crate::source::ByteSource;

/// Byte buffer capacity; one refill's worth of CRC accumulation.
const BYTE_BUFFER_SIZE: usize = 4096;

/// Bit-level reader over a [`ByteSource`].
pub struct BitInput<S> {
    source: S,

    /// Data from the source is staged here before entering the bit register.
    byte_buffer: Box<[u8]>,
    /// Absolute stream position of `byte_buffer[0]`.
    byte_buffer_start_pos: u64,
    /// Bytes of `byte_buffer` holding meaningful content.
    byte_buffer_len: usize,
    /// Next unconsumed byte in `byte_buffer`.
    byte_buffer_index: usize,

    /// Only the bottom `bit_buffer_len` bits are valid; the rest is garbage.
    bit_buffer: u64,
    /// Always in the range [0, 64].
    bit_buffer_len: u32,

    crc8: u8,
    crc16: u16,
    /// Index into `byte_buffer` from which bytes have not yet been folded
    /// into the CRC registers.
    crc_start_index: usize,
}

impl<S: ByteSource> BitInput<S> {
    /// Wrap a byte source in a bit reader positioned at stream offset 0.
    pub fn new(source: S) -> Self {
        BitInput {
            source,
            byte_buffer: vec![0u8; BYTE_BUFFER_SIZE].into_boxed_slice(),
            byte_buffer_start_pos: 0,
            byte_buffer_len: 0,
            byte_buffer_index: 0,
            bit_buffer: 0,
            bit_buffer_len: 0,
            crc8: 0,
            crc16: 0,
            crc_start_index: 0,
        }
    }

    /// Destroy the reader, returning the wrapped source.
    pub fn into_source(self) -> S {
        self.source
    }

    /// Total length of the underlying source, if knowable.
    pub fn length(&self) -> Option<u64> {
        self.source.length()
    }

    // ------------------------------------------------------------------
    // Stream position
    // ------------------------------------------------------------------

    /// Absolute byte position of the next bit to be read.
    pub fn position(&self) -> u64 {
        self.byte_buffer_start_pos + self.byte_buffer_index as u64
            - u64::from((self.bit_buffer_len + 7) / 8)
    }

    /// Bit offset within the current byte, in the range [0, 7].
    pub fn bit_position(&self) -> u32 {
        (8 - (self.bit_buffer_len & 7)) & 7
    }

    /// Reposition the source and discard all buffered data and CRC state.
    ///
    /// Fails with [`FlacError::SeekUnsupported`] on forward-only sources.
    pub fn seek_to(&mut self, pos: u64) -> FlacResult<()> {
        self.source.seek_to(pos)?;
        self.byte_buffer_start_pos = pos;
        self.byte_buffer_len = 0;
        self.byte_buffer_index = 0;
        self.bit_buffer = 0;
        self.bit_buffer_len = 0;
        self.crc8 = 0;
        self.crc16 = 0;
        self.crc_start_index = 0;
        Ok(())
    }

    fn check_byte_aligned(&self) -> FlacResult<()> {
        if self.bit_buffer_len % 8 == 0 {
            Ok(())
        } else {
            Err(FlacError::NotByteAligned)
        }
    }

    // ------------------------------------------------------------------
    // Reading bitwise integers
    // ------------------------------------------------------------------

    /// Read the next `n` bits MSB-first as an unsigned value, 0 <= n <= 32.
    pub fn read_uint(&mut self, n: u32) -> FlacResult<u32> {
        if n > 32 {
            return Err(FlacError::InvalidBitCount(n));
        }
        if n == 0 {
            return Ok(0);
        }
        while self.bit_buffer_len < n {
            match self.read_underlying_byte()? {
                Some(b) => {
                    self.bit_buffer = self.bit_buffer << 8 | u64::from(b);
                    self.bit_buffer_len += 8;
                }
                None => return Err(FlacError::UnexpectedEof),
            }
        }
        self.bit_buffer_len -= n;
        let mut result = (self.bit_buffer >> self.bit_buffer_len) as u32;
        if n < 32 {
            result &= (1 << n) - 1;
        }
        Ok(result)
    }

    /// Read an `n`-bit two's-complement value, sign-extended to `i32`.
    pub fn read_signed_int(&mut self, n: u32) -> FlacResult<i32> {
        if n > 32 {
            return Err(FlacError::InvalidBitCount(n));
        }
        if n == 0 {
            return Ok(0);
        }
        let shift = 32 - n;
        Ok((self.read_uint(n)? as i32) << shift >> shift)
    }

    /// Decode `end - start` Rice-coded signed values into
    /// `result[start..end]`, 0 <= param <= 31.
    ///
    /// Short codes go through the precomputed window tables, up to four per
    /// refill check; codes longer than the table window fall back to
    /// bit-by-bit decoding. A quotient large enough that `q << param` would
    /// leave the 53-bit range is rejected early as
    /// [`FlacError::ResidualTooLarge`], since the downstream prediction
    /// result could never fit its sample depth.
    pub fn read_rice_signed_ints(
        &mut self,
        param: u32,
        result: &mut [i64],
        mut start: usize,
        end: usize,
    ) -> FlacResult<()> {
        if param > 31 {
            return Err(FlacError::InvalidBitCount(param));
        }
        let unary_limit = 1i64 << (53 - param);
        let table = &rice_decoding_tables()[param as usize];

        loop {
            'fast: while start + RICE_DECODING_CHUNK as usize <= end {
                if self.bit_buffer_len < RICE_DECODING_CHUNK * RICE_DECODING_TABLE_BITS {
                    if self.byte_buffer_index + 8 > self.byte_buffer_len {
                        break;
                    }
                    self.fill_bit_buffer()?;
                }
                for _ in 0..RICE_DECODING_CHUNK {
                    let window = ((self.bit_buffer
                        >> (self.bit_buffer_len - RICE_DECODING_TABLE_BITS))
                        & RICE_DECODING_TABLE_MASK) as usize;
                    let consumed = table.consumed[window];
                    if consumed == 0 {
                        break 'fast;
                    }
                    self.bit_buffer_len -= u32::from(consumed);
                    result[start] = i64::from(table.value[window]);
                    start += 1;
                }
            }

            // Code longer than the table window, or tail of the range
            if start >= end {
                break;
            }
            let mut val: i64 = 0;
            while self.read_uint(1)? == 0 {
                if val >= unary_limit {
                    return Err(FlacError::ResidualTooLarge);
                }
                val += 1;
            }
            val = val << param | i64::from(self.read_uint(param)?);
            debug_assert_eq!(val >> 53, 0);
            result[start] = (val >> 1) ^ -(val & 1);
            start += 1;
        }
        Ok(())
    }

    /// Append whole bytes to the bit register, preferring a bulk copy from
    /// the byte buffer.
    fn fill_bit_buffer(&mut self) -> FlacResult<()> {
        let mut i = self.byte_buffer_index;
        let n = usize::min(
            ((64 - self.bit_buffer_len) >> 3) as usize,
            self.byte_buffer_len - i,
        );
        if n > 0 {
            for _ in 0..n {
                self.bit_buffer = self.bit_buffer << 8 | u64::from(self.byte_buffer[i]);
                i += 1;
            }
            self.bit_buffer_len += (n as u32) << 3;
        } else if self.bit_buffer_len <= 56 {
            match self.read_underlying_byte()? {
                Some(b) => {
                    self.bit_buffer = self.bit_buffer << 8 | u64::from(b);
                    self.bit_buffer_len += 8;
                }
                None => return Err(FlacError::UnexpectedEof),
            }
        }
        debug_assert!(8 <= self.bit_buffer_len && self.bit_buffer_len <= 64);
        self.byte_buffer_index += n;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Reading bytes
    // ------------------------------------------------------------------

    /// Read one byte at a byte boundary; `None` signals end of stream.
    pub fn read_byte(&mut self) -> FlacResult<Option<u8>> {
        self.check_byte_aligned()?;
        if self.bit_buffer_len >= 8 {
            return Ok(Some(self.read_uint(8)? as u8));
        }
        debug_assert_eq!(self.bit_buffer_len, 0);
        self.read_underlying_byte()
    }

    /// Fill `buf` from the stream at a byte boundary, failing on EOF.
    pub fn read_fully(&mut self, buf: &mut [u8]) -> FlacResult<()> {
        self.check_byte_aligned()?;
        for slot in buf.iter_mut() {
            *slot = self.read_uint(8)? as u8;
        }
        Ok(())
    }

    /// Take one byte from the byte buffer, refilling it from the source
    /// when exhausted. Refilling first folds the outstanding bytes of the
    /// old buffer into the CRC registers.
    fn read_underlying_byte(&mut self) -> FlacResult<Option<u8>> {
        if self.byte_buffer_index >= self.byte_buffer_len {
            self.byte_buffer_start_pos += self.byte_buffer_len as u64;
            self.update_crcs(0);
            self.byte_buffer_len = self.source.read(&mut self.byte_buffer)?;
            self.crc_start_index = 0;
            self.byte_buffer_index = 0;
            if self.byte_buffer_len == 0 {
                return Ok(None);
            }
        }
        let b = self.byte_buffer[self.byte_buffer_index];
        self.byte_buffer_index += 1;
        Ok(Some(b))
    }

    // ------------------------------------------------------------------
    // CRC calculations
    // ------------------------------------------------------------------

    /// Begin CRC accumulation at the current (byte-aligned) position.
    pub fn reset_crcs(&mut self) -> FlacResult<()> {
        self.check_byte_aligned()?;
        self.crc_start_index = self.byte_buffer_index - (self.bit_buffer_len / 8) as usize;
        self.crc8 = 0;
        self.crc16 = 0;
        Ok(())
    }

    /// CRC-8 of the bytes consumed since the last [`reset_crcs`](Self::reset_crcs).
    /// Must be queried at a byte boundary.
    pub fn crc8(&mut self) -> FlacResult<u8> {
        self.check_byte_aligned()?;
        self.update_crcs((self.bit_buffer_len / 8) as usize);
        Ok(self.crc8)
    }

    /// CRC-16 of the bytes consumed since the last [`reset_crcs`](Self::reset_crcs).
    /// Must be queried at a byte boundary.
    pub fn crc16(&mut self) -> FlacResult<u16> {
        self.check_byte_aligned()?;
        self.update_crcs((self.bit_buffer_len / 8) as usize);
        Ok(self.crc16)
    }

    /// Fold `byte_buffer[crc_start_index .. byte_buffer_index - unused_trailing_bytes]`
    /// into both CRC registers. Trailing bytes still in the bit register are
    /// excluded by the caller passing their count.
    fn update_crcs(&mut self, unused_trailing_bytes: usize) {
        let end = self.byte_buffer_index - unused_trailing_bytes;
        for &b in &self.byte_buffer[self.crc_start_index..end] {
            self.crc8 = update_crc8(self.crc8, b);
            self.crc16 = update_crc16(self.crc16, b);
        }
        self.crc_start_index = end;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crc::{crc16_of, crc8_of};
    use crate::source::{MemorySource, StreamSource};
    use crate::testutil::BitWriter;

    fn reader(data: &[u8]) -> BitInput<MemorySource<'_>> {
        BitInput::new(MemorySource::new(data))
    }

    #[test]
    fn test_read_uint_basic() {
        let data = [0b10110100, 0b01101001];
        let mut input = reader(&data);
        assert_eq!(input.read_uint(4).unwrap(), 0b1011);
        assert_eq!(input.read_uint(4).unwrap(), 0b0100);
        assert_eq!(input.read_uint(8).unwrap(), 0b01101001);
    }

    #[test]
    fn test_read_uint_across_bytes() {
        let data = [0b10110100, 0b01101001, 0xFF, 0x00];
        let mut input = reader(&data);
        assert_eq!(input.read_uint(6).unwrap(), 0b101101);
        assert_eq!(input.read_uint(6).unwrap(), 0b000110);
        assert_eq!(input.read_uint(20).unwrap(), 0b1001_11111111_00000000);
    }

    #[test]
    fn test_read_uint_32_bits() {
        let data = [0xDE, 0xAD, 0xBE, 0xEF];
        let mut input = reader(&data);
        assert_eq!(input.read_uint(32).unwrap(), 0xDEADBEEF);
    }

    #[test]
    fn test_read_uint_zero_bits() {
        let mut input = reader(&[]);
        assert_eq!(input.read_uint(0).unwrap(), 0);
    }

    #[test]
    fn test_read_uint_eof() {
        let mut input = reader(&[0xAB]);
        assert_eq!(input.read_uint(8).unwrap(), 0xAB);
        assert!(matches!(input.read_uint(1), Err(FlacError::UnexpectedEof)));
    }

    #[test]
    fn test_read_uint_rejects_wide_reads() {
        let mut input = reader(&[0; 8]);
        assert!(matches!(input.read_uint(33), Err(FlacError::InvalidBitCount(33))));
    }

    #[test]
    fn test_read_signed_int() {
        // 0xFF as 8-bit signed is -1; 0x80 is -128; 0x7F is 127
        let data = [0xFF, 0x80, 0x7F];
        let mut input = reader(&data);
        assert_eq!(input.read_signed_int(8).unwrap(), -1);
        assert_eq!(input.read_signed_int(8).unwrap(), -128);
        assert_eq!(input.read_signed_int(8).unwrap(), 127);
    }

    #[test]
    fn test_read_signed_int_narrow() {
        // 4-bit values 0b1000 = -8 and 0b0111 = 7
        let data = [0b1000_0111];
        let mut input = reader(&data);
        assert_eq!(input.read_signed_int(4).unwrap(), -8);
        assert_eq!(input.read_signed_int(4).unwrap(), 7);
    }

    #[test]
    fn test_position_tracking() {
        let data = [0u8; 16];
        let mut input = reader(&data);
        assert_eq!(input.position(), 0);
        assert_eq!(input.bit_position(), 0);

        input.read_uint(3).unwrap();
        assert_eq!(input.position(), 0);
        assert_eq!(input.bit_position(), 3);

        input.read_uint(5).unwrap();
        assert_eq!(input.position(), 1);
        assert_eq!(input.bit_position(), 0);

        input.read_uint(32).unwrap();
        assert_eq!(input.position(), 5);
        assert_eq!(input.bit_position(), 0);
    }

    #[test]
    fn test_read_byte_and_eof() {
        let data = [0x12, 0x34];
        let mut input = reader(&data);
        assert_eq!(input.read_byte().unwrap(), Some(0x12));
        assert_eq!(input.read_byte().unwrap(), Some(0x34));
        assert_eq!(input.read_byte().unwrap(), None);
    }

    #[test]
    fn test_read_byte_requires_alignment() {
        let data = [0x12, 0x34];
        let mut input = reader(&data);
        input.read_uint(3).unwrap();
        assert!(matches!(input.read_byte(), Err(FlacError::NotByteAligned)));
    }

    #[test]
    fn test_read_fully() {
        let data = [1u8, 2, 3, 4, 5];
        let mut input = reader(&data);
        let mut buf = [0u8; 4];
        input.read_fully(&mut buf).unwrap();
        assert_eq!(buf, [1, 2, 3, 4]);
        let mut rest = [0u8; 2];
        assert!(matches!(
            input.read_fully(&mut rest),
            Err(FlacError::UnexpectedEof)
        ));
    }

    #[test]
    fn test_crcs_cover_consumed_bytes() {
        let data = [0x10, 0x20, 0x30, 0x40, 0x50];
        let mut input = reader(&data);
        input.reset_crcs().unwrap();
        input.read_uint(16).unwrap();
        input.read_uint(8).unwrap();
        assert_eq!(input.crc8().unwrap(), crc8_of(&data[..3]));
        assert_eq!(input.crc16().unwrap(), crc16_of(&data[..3]));

        // Resetting restarts accumulation mid-stream
        input.reset_crcs().unwrap();
        input.read_uint(8).unwrap();
        assert_eq!(input.crc8().unwrap(), crc8_of(&data[3..4]));
        assert_eq!(input.crc16().unwrap(), crc16_of(&data[3..4]));
    }

    #[test]
    fn test_crcs_exclude_bits_still_buffered() {
        // The Rice fast path bulk-loads 8 bytes into the bit register but
        // decoding 8 one-bit codes consumes a single byte of them. The CRC
        // and position must account only for the consumed byte.
        let data = [0xFFu8; 16];
        let mut input = reader(&data);
        input.read_uint(8).unwrap();
        input.reset_crcs().unwrap();
        let mut out = [0i64; 8];
        input.read_rice_signed_ints(0, &mut out, 0, 8).unwrap();
        assert_eq!(out, [0i64; 8]);
        assert_eq!(input.position(), 2);
        assert_eq!(input.crc8().unwrap(), crc8_of(&data[1..2]));
        assert_eq!(input.crc16().unwrap(), crc16_of(&data[1..2]));
    }

    #[test]
    fn test_crcs_across_buffer_refills() {
        // More data than one 4096-byte buffer; CRC must accumulate across
        // the refill boundary.
        let data: Vec<u8> = (0..5000u32).map(|i| (i % 251) as u8).collect();
        let mut input = reader(&data);
        input.reset_crcs().unwrap();
        let mut buf = vec![0u8; 4500];
        input.read_fully(&mut buf).unwrap();
        assert_eq!(input.crc8().unwrap(), crc8_of(&data[..4500]));
        assert_eq!(input.crc16().unwrap(), crc16_of(&data[..4500]));
    }

    #[test]
    fn test_seek_resets_position_and_crcs() {
        let data = [0x11, 0x22, 0x33, 0x44, 0x55];
        let mut input = reader(&data);
        input.read_uint(20).unwrap();
        input.seek_to(2).unwrap();
        assert_eq!(input.position(), 2);
        assert_eq!(input.bit_position(), 0);

        input.reset_crcs().unwrap();
        assert_eq!(input.read_uint(8).unwrap(), 0x33);
        assert_eq!(input.crc8().unwrap(), crc8_of(&[0x33]));
    }

    #[test]
    fn test_seek_unsupported_on_stream_source() {
        let data = [1u8, 2, 3];
        let mut input = BitInput::new(StreamSource::new(&data[..]));
        assert!(matches!(input.seek_to(0), Err(FlacError::SeekUnsupported)));
    }

    fn write_rice(w: &mut BitWriter, value: i64, param: u32) {
        let unsigned = if value >= 0 {
            (value as u64) << 1
        } else {
            ((-value as u64) << 1) - 1
        };
        let quotient = (unsigned >> param) as u32;
        for _ in 0..quotient {
            w.write_bits(0, 1);
        }
        w.write_bits(1, 1);
        if param > 0 {
            w.write_bits((unsigned & ((1 << param) - 1)) as u32, param);
        }
    }

    #[test]
    fn test_rice_decode_fast_path() {
        let values: [i64; 12] = [0, -1, 1, -2, 2, 7, -7, 3, 0, 0, -5, 4];
        let mut w = BitWriter::new();
        for &v in &values {
            write_rice(&mut w, v, 3);
        }
        // Trailing slack so the fast path sees a full byte-buffer window
        let mut data = w.finish();
        data.extend_from_slice(&[0u8; 16]);

        let mut input = reader(&data);
        let mut out = [0i64; 12];
        input.read_rice_signed_ints(3, &mut out, 0, 12).unwrap();
        assert_eq!(out, values);
    }

    #[test]
    fn test_rice_decode_slow_path_large_param() {
        // Parameter 20 exceeds the table window, forcing bit-by-bit decode
        let values: [i64; 5] = [100_000, -250_000, 0, 524_287, -1];
        let mut w = BitWriter::new();
        for &v in &values {
            write_rice(&mut w, v, 20);
        }
        let data = w.finish();

        let mut input = reader(&data);
        let mut out = [0i64; 5];
        input.read_rice_signed_ints(20, &mut out, 0, 5).unwrap();
        assert_eq!(out, values);
    }

    #[test]
    fn test_rice_decode_subrange() {
        let mut w = BitWriter::new();
        write_rice(&mut w, -3, 0);
        write_rice(&mut w, 5, 0);
        let data = w.finish();

        let mut input = reader(&data);
        let mut out = [99i64; 4];
        input.read_rice_signed_ints(0, &mut out, 1, 3).unwrap();
        assert_eq!(out, [99, -3, 5, 99]);
    }

    #[test]
    fn test_rice_unary_limit_rejects_runaway() {
        // With param = 31 the quotient guard fires after 1 << 22 zero bits,
        // i.e. 512 KiB of zeros; feed more than that with no terminator.
        let data = vec![0u8; 600_000];
        let mut input = reader(&data);
        let mut out = [0i64; 1];
        assert!(matches!(
            input.read_rice_signed_ints(31, &mut out, 0, 1),
            Err(FlacError::ResidualTooLarge)
        ));
    }

    #[test]
    fn test_truncated_rice_run_is_eof() {
        let data = [0u8; 8];
        let mut input = reader(&data);
        let mut out = [0i64; 1];
        assert!(matches!(
            input.read_rice_signed_ints(4, &mut out, 0, 1),
            Err(FlacError::UnexpectedEof)
        ));
    }
}
