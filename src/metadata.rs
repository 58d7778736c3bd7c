//! Metadata block parsing and the STREAMINFO structure.
//!
//! A FLAC stream opens with the `fLaC` marker followed by metadata blocks,
//! the first of which must be STREAMINFO. The decoder core parses and
//! validates STREAMINFO; every other block type only needs its 4-byte
//! header read so the payload can be skipped by length.

use core::fmt::{Display, Formatter, Result as FmtResult};

use crate::bitstream::BitInput;
use crate::constants::{MAX_CHANNELS, MD5_SIZE, STREAMINFO_SIZE};
use crate::error::{FlacError, FlacResult};
use crate::frame::FrameInfo;
use crate::source::MemorySource;

/// Metadata block types defined by the FLAC specification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetadataBlockType {
    /// STREAMINFO: mandatory, must be first
    StreamInfo,
    /// PADDING: placeholder for future use
    Padding,
    /// APPLICATION: third-party application data
    Application,
    /// SEEKTABLE: seek points for fast seeking
    SeekTable,
    /// VORBIS_COMMENT: Vorbis-style comments (tags)
    VorbisComment,
    /// CUESHEET: CD cue sheet information
    CueSheet,
    /// PICTURE: embedded picture (album art, etc.)
    Picture,
    /// Reserved or invalid block type
    Reserved(u8),
}

impl MetadataBlockType {
    /// Parse a block type from its 7-bit code.
    pub const fn from_code(value: u8) -> Self {
        match value {
            0 => MetadataBlockType::StreamInfo,
            1 => MetadataBlockType::Padding,
            2 => MetadataBlockType::Application,
            3 => MetadataBlockType::SeekTable,
            4 => MetadataBlockType::VorbisComment,
            5 => MetadataBlockType::CueSheet,
            6 => MetadataBlockType::Picture,
            n => MetadataBlockType::Reserved(n),
        }
    }

    /// Convert to the 7-bit code.
    pub const fn code(self) -> u8 {
        match self {
            MetadataBlockType::StreamInfo => 0,
            MetadataBlockType::Padding => 1,
            MetadataBlockType::Application => 2,
            MetadataBlockType::SeekTable => 3,
            MetadataBlockType::VorbisComment => 4,
            MetadataBlockType::CueSheet => 5,
            MetadataBlockType::Picture => 6,
            MetadataBlockType::Reserved(n) => n,
        }
    }
}

impl Display for MetadataBlockType {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            MetadataBlockType::StreamInfo => write!(f, "STREAMINFO"),
            MetadataBlockType::Padding => write!(f, "PADDING"),
            MetadataBlockType::Application => write!(f, "APPLICATION"),
            MetadataBlockType::SeekTable => write!(f, "SEEKTABLE"),
            MetadataBlockType::VorbisComment => write!(f, "VORBIS_COMMENT"),
            MetadataBlockType::CueSheet => write!(f, "CUESHEET"),
            MetadataBlockType::Picture => write!(f, "PICTURE"),
            MetadataBlockType::Reserved(n) => write!(f, "RESERVED({})", n),
        }
    }
}

/// Header of a metadata block (1 byte flags/type + 3 bytes length).
#[derive(Debug, Clone, Copy)]
pub struct MetadataBlockHeader {
    /// Whether this is the last metadata block before audio frames
    pub is_last: bool,
    /// Block type
    pub block_type: MetadataBlockType,
    /// Length of block payload in bytes (not including this header)
    pub length: u32,
}

impl MetadataBlockHeader {
    /// Parse a metadata block header from 4 bytes.
    pub fn from_bytes(bytes: &[u8; 4]) -> Self {
        MetadataBlockHeader {
            is_last: bytes[0] & 0x80 != 0,
            block_type: MetadataBlockType::from_code(bytes[0] & 0x7F),
            length: u32::from_be_bytes([0, bytes[1], bytes[2], bytes[3]]),
        }
    }

    /// Serialize to 4 bytes.
    pub fn to_bytes(&self) -> [u8; 4] {
        let type_byte = self.block_type.code() | if self.is_last { 0x80 } else { 0 };
        let len = self.length.to_be_bytes();
        [type_byte, len[1], len[2], len[3]]
    }
}

/// STREAMINFO metadata block: stream-wide parameters, parsed once per
/// stream and immutable from the decoder's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamInfo {
    /// Minimum block size in samples per channel (>= 16). When equal to
    /// `max_block_size`, the final block of the stream may still be shorter.
    pub min_block_size: u16,
    /// Maximum block size in samples per channel
    pub max_block_size: u16,
    /// Minimum frame size in bytes, a 24-bit value (0 = unknown)
    pub min_frame_size: u32,
    /// Maximum frame size in bytes, a 24-bit value (0 = unknown)
    pub max_frame_size: u32,
    /// Sample rate in Hz (1-655350)
    pub sample_rate: u32,
    /// Number of channels (1-8)
    pub channels: u8,
    /// Bits per sample (4-32)
    pub bits_per_sample: u8,
    /// Total samples per channel, a 36-bit value (0 = unknown)
    pub total_samples: u64,
    /// MD5 of the raw audio, little-endian channel-interleaved; all zeros
    /// means the hash was not computed
    pub md5_signature: [u8; MD5_SIZE],
}

impl StreamInfo {
    /// Parse STREAMINFO from exactly 34 payload bytes (no block header).
    pub fn from_bytes(bytes: &[u8]) -> FlacResult<Self> {
        if bytes.len() != STREAMINFO_SIZE {
            return Err(FlacError::InvalidStreamInfoSize(bytes.len()));
        }
        let mut input = BitInput::new(MemorySource::new(bytes));

        let min_block_size = input.read_uint(16)? as u16;
        let max_block_size = input.read_uint(16)? as u16;
        let min_frame_size = input.read_uint(24)?;
        let max_frame_size = input.read_uint(24)?;
        if min_block_size < 16 {
            return Err(FlacError::InvalidBlockSize {
                size: u32::from(min_block_size),
            });
        }
        if max_block_size < min_block_size {
            return Err(FlacError::BlockSizeBounds {
                min: min_block_size,
                max: max_block_size,
            });
        }
        if min_frame_size != 0 && max_frame_size != 0 && max_frame_size < min_frame_size {
            return Err(FlacError::FrameSizeBounds {
                min: min_frame_size,
                max: max_frame_size,
            });
        }
        let sample_rate = input.read_uint(20)?;
        if sample_rate == 0 || sample_rate > 655350 {
            return Err(FlacError::InvalidSampleRate { rate: sample_rate });
        }
        let channels = input.read_uint(3)? as u8 + 1;
        let bits_per_sample = input.read_uint(5)? as u8 + 1;
        // 36-bit total, stored as two 18-bit halves, high half first
        let total_samples = u64::from(input.read_uint(18)?) << 18 | u64::from(input.read_uint(18)?);
        let mut md5_signature = [0u8; MD5_SIZE];
        input.read_fully(&mut md5_signature)?;

        Ok(StreamInfo {
            min_block_size,
            max_block_size,
            min_frame_size,
            max_frame_size,
            sample_rate,
            channels,
            bits_per_sample,
            total_samples,
            md5_signature,
        })
    }

    /// Serialize the 34-byte payload (no block header).
    pub fn to_bytes(&self) -> [u8; STREAMINFO_SIZE] {
        let mut bytes = [0u8; STREAMINFO_SIZE];

        bytes[0..2].copy_from_slice(&self.min_block_size.to_be_bytes());
        bytes[2..4].copy_from_slice(&self.max_block_size.to_be_bytes());
        bytes[4..7].copy_from_slice(&self.min_frame_size.to_be_bytes()[1..4]);
        bytes[7..10].copy_from_slice(&self.max_frame_size.to_be_bytes()[1..4]);

        // 20-bit sample rate, 3-bit channels-1, 5-bit depth-1, then the
        // 36-bit total sample count straddling byte 13
        let channels_minus_1 = self.channels - 1;
        let bits_minus_1 = self.bits_per_sample - 1;
        bytes[10] = (self.sample_rate >> 12) as u8;
        bytes[11] = (self.sample_rate >> 4) as u8;
        bytes[12] = ((self.sample_rate & 0x0F) << 4) as u8
            | ((channels_minus_1 & 0x07) << 1)
            | ((bits_minus_1 >> 4) & 0x01);
        bytes[13] = ((bits_minus_1 & 0x0F) << 4) | ((self.total_samples >> 32) as u8 & 0x0F);
        bytes[14..18].copy_from_slice(&(self.total_samples as u32).to_be_bytes());

        bytes[18..34].copy_from_slice(&self.md5_signature);
        bytes
    }

    /// Serialize as a complete metadata block: 4-byte header (type 0,
    /// length 34, last-block flag as given) followed by the payload.
    pub fn serialize(&self, last: bool) -> FlacResult<[u8; STREAMINFO_SIZE + 4]> {
        self.validate()?;
        let header = MetadataBlockHeader {
            is_last: last,
            block_type: MetadataBlockType::StreamInfo,
            length: STREAMINFO_SIZE as u32,
        };
        let mut out = [0u8; STREAMINFO_SIZE + 4];
        out[..4].copy_from_slice(&header.to_bytes());
        out[4..].copy_from_slice(&self.to_bytes());
        Ok(out)
    }

    /// Check every field against its legal range.
    pub fn validate(&self) -> FlacResult<()> {
        if self.min_block_size < 16 {
            return Err(FlacError::InvalidBlockSize {
                size: u32::from(self.min_block_size),
            });
        }
        if self.max_block_size < self.min_block_size {
            return Err(FlacError::BlockSizeBounds {
                min: self.min_block_size,
                max: self.max_block_size,
            });
        }
        if self.min_frame_size >> 24 != 0 || self.max_frame_size >> 24 != 0 {
            return Err(FlacError::FrameSizeBounds {
                min: self.min_frame_size,
                max: self.max_frame_size,
            });
        }
        if self.min_frame_size != 0
            && self.max_frame_size != 0
            && self.max_frame_size < self.min_frame_size
        {
            return Err(FlacError::FrameSizeBounds {
                min: self.min_frame_size,
                max: self.max_frame_size,
            });
        }
        if self.sample_rate == 0 || self.sample_rate > 655350 {
            return Err(FlacError::InvalidSampleRate {
                rate: self.sample_rate,
            });
        }
        if self.channels < 1 || self.channels > MAX_CHANNELS {
            return Err(FlacError::InvalidChannelCount {
                channels: self.channels,
            });
        }
        if self.bits_per_sample < 4 || self.bits_per_sample > 32 {
            return Err(FlacError::InvalidBitsPerSample {
                bits: self.bits_per_sample,
            });
        }
        if self.total_samples >> 36 != 0 {
            return Err(FlacError::InvalidTotalSamples(self.total_samples));
        }
        Ok(())
    }

    /// Check that a decoded frame is consistent with this stream.
    ///
    /// The frame's `frame_size` field must already be filled in; size
    /// bounds are only enforced when the stream declares them.
    pub fn check_frame(&self, frame: &FrameInfo) -> FlacResult<()> {
        if frame.num_channels != self.channels {
            return Err(FlacError::ChannelCountMismatch {
                frame: frame.num_channels,
                stream: self.channels,
            });
        }
        if let Some(rate) = frame.sample_rate {
            if rate != self.sample_rate {
                return Err(FlacError::SampleRateMismatch {
                    frame: rate,
                    stream: self.sample_rate,
                });
            }
        }
        if let Some(depth) = frame.sample_depth {
            if depth != u32::from(self.bits_per_sample) {
                return Err(FlacError::SampleDepthMismatch {
                    frame: depth,
                    stream: u32::from(self.bits_per_sample),
                });
            }
        }
        if self.total_samples != 0 && u64::from(frame.block_size) > self.total_samples {
            return Err(FlacError::BlockSizeExceedsTotalSamples {
                size: frame.block_size,
                total: self.total_samples,
            });
        }
        // When min_block_size == max_block_size, the final block is still
        // allowed to fall below the minimum, so only the upper bound holds.
        if frame.block_size > u32::from(self.max_block_size) {
            return Err(FlacError::BlockSizeExceedsMaximum {
                size: frame.block_size,
                max: self.max_block_size,
            });
        }
        if self.min_frame_size != 0 && frame.frame_size < self.min_frame_size {
            return Err(FlacError::FrameSizeBelowMinimum {
                size: frame.frame_size,
                min: self.min_frame_size,
            });
        }
        if self.max_frame_size != 0 && frame.frame_size > self.max_frame_size {
            return Err(FlacError::FrameSizeAboveMaximum {
                size: frame.frame_size,
                max: self.max_frame_size,
            });
        }
        Ok(())
    }

    /// Whether the MD5 signature is present (not all zeros).
    pub fn has_md5(&self) -> bool {
        self.md5_signature.iter().any(|&b| b != 0)
    }
}

impl Display for StreamInfo {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        writeln!(f, "STREAMINFO:")?;
        writeln!(
            f,
            "  Block size: {}-{} samples",
            self.min_block_size, self.max_block_size
        )?;
        writeln!(
            f,
            "  Frame size: {}-{} bytes",
            self.min_frame_size, self.max_frame_size
        )?;
        writeln!(f, "  Sample rate: {} Hz", self.sample_rate)?;
        writeln!(f, "  Channels: {}", self.channels)?;
        writeln!(f, "  Bits per sample: {}", self.bits_per_sample)?;
        writeln!(f, "  Total samples: {}", self.total_samples)?;
        write!(f, "  MD5: ")?;
        for b in &self.md5_signature {
            write!(f, "{:02x}", b)?;
        }
        Ok(())
    }
}

/// MD5 over channel-planar samples, serialized the way STREAMINFO defines
/// the audio hash: little-endian two's complement, `depth / 8` bytes per
/// sample, interleaved across channels per sample index.
///
/// `depth` must be 8, 16, 24, or 32 and all channels the same length.
/// Comparing the result against [`StreamInfo::md5_signature`] is the
/// caller's choice.
pub fn md5_of_samples<C: AsRef<[i32]>>(samples: &[C], depth: u32) -> FlacResult<[u8; MD5_SIZE]> {
    if depth == 0 || depth > 32 || depth % 8 != 0 {
        return Err(FlacError::UnsupportedMd5Depth(depth));
    }
    let num_samples = samples.first().map_or(0, |c| c.as_ref().len());
    if samples.iter().any(|c| c.as_ref().len() != num_samples) {
        return Err(FlacError::ChannelLengthMismatch);
    }

    let num_bytes = (depth / 8) as usize;
    let mut context = md5::Context::new();
    let mut buf = Vec::with_capacity(samples.len() * num_bytes * usize::min(num_samples, 2048));
    for i in 0..num_samples {
        for channel in samples {
            let val = channel.as_ref()[i];
            buf.extend_from_slice(&val.to_le_bytes()[..num_bytes]);
        }
        if buf.len() >= buf.capacity() {
            context.consume(&buf);
            buf.clear();
        }
    }
    context.consume(&buf);
    Ok(context.compute().0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_info() -> StreamInfo {
        StreamInfo {
            min_block_size: 4096,
            max_block_size: 4096,
            min_frame_size: 14,
            max_frame_size: 12288,
            sample_rate: 44100,
            channels: 2,
            bits_per_sample: 16,
            total_samples: 88200,
            md5_signature: [0xAB; MD5_SIZE],
        }
    }

    #[test]
    fn test_streaminfo_roundtrip() {
        let info = sample_info();
        let bytes = info.to_bytes();
        let parsed = StreamInfo::from_bytes(&bytes).unwrap();
        assert_eq!(parsed, info);
    }

    #[test]
    fn test_streaminfo_roundtrip_extremes() {
        let info = StreamInfo {
            min_block_size: 16,
            max_block_size: 65535,
            min_frame_size: 0,
            max_frame_size: 0xFFFFFF,
            sample_rate: 655350,
            channels: 8,
            bits_per_sample: 32,
            total_samples: (1 << 36) - 1,
            md5_signature: [0xFF; MD5_SIZE],
        };
        let parsed = StreamInfo::from_bytes(&info.to_bytes()).unwrap();
        assert_eq!(parsed, info);
    }

    #[test]
    fn test_streaminfo_serialize_with_header() {
        let info = sample_info();
        let block = info.serialize(true).unwrap();
        assert_eq!(block.len(), 38);
        assert_eq!(block[0], 0x80); // last flag set, type 0
        assert_eq!(&block[1..4], &[0, 0, 34]);
        assert_eq!(StreamInfo::from_bytes(&block[4..]).unwrap(), info);

        let block = info.serialize(false).unwrap();
        assert_eq!(block[0], 0x00);
    }

    #[test]
    fn test_streaminfo_wrong_length_rejected() {
        assert!(matches!(
            StreamInfo::from_bytes(&[0u8; 33]),
            Err(FlacError::InvalidStreamInfoSize(33))
        ));
    }

    #[test]
    fn test_streaminfo_invalid_fields_rejected() {
        let mut info = sample_info();
        info.min_block_size = 8;
        assert!(StreamInfo::from_bytes(&info.to_bytes()).is_err());

        let mut info = sample_info();
        info.max_block_size = 1024; // below min
        assert!(matches!(
            StreamInfo::from_bytes(&info.to_bytes()),
            Err(FlacError::BlockSizeBounds { .. })
        ));

        let mut info = sample_info();
        info.min_frame_size = 5000;
        info.max_frame_size = 100;
        assert!(matches!(
            StreamInfo::from_bytes(&info.to_bytes()),
            Err(FlacError::FrameSizeBounds { .. })
        ));

        let mut info = sample_info();
        info.sample_rate = 0;
        assert!(matches!(
            StreamInfo::from_bytes(&info.to_bytes()),
            Err(FlacError::InvalidSampleRate { rate: 0 })
        ));
    }

    #[test]
    fn test_validate_catches_out_of_range_fields() {
        let mut info = sample_info();
        info.bits_per_sample = 3;
        assert!(matches!(
            info.validate(),
            Err(FlacError::InvalidBitsPerSample { bits: 3 })
        ));

        let mut info = sample_info();
        info.channels = 9;
        assert!(matches!(
            info.validate(),
            Err(FlacError::InvalidChannelCount { channels: 9 })
        ));

        let mut info = sample_info();
        info.total_samples = 1 << 36;
        assert!(matches!(
            info.validate(),
            Err(FlacError::InvalidTotalSamples(_))
        ));

        assert!(sample_info().validate().is_ok());
    }

    #[test]
    fn test_metadata_block_header_roundtrip() {
        let header = MetadataBlockHeader {
            is_last: true,
            block_type: MetadataBlockType::SeekTable,
            length: 0x012345,
        };
        let bytes = header.to_bytes();
        assert_eq!(bytes, [0x83, 0x01, 0x23, 0x45]);
        let parsed = MetadataBlockHeader::from_bytes(&bytes);
        assert!(parsed.is_last);
        assert_eq!(parsed.block_type, MetadataBlockType::SeekTable);
        assert_eq!(parsed.length, 0x012345);
    }

    #[test]
    fn test_metadata_block_type_codes() {
        for code in 0..=127u8 {
            assert_eq!(MetadataBlockType::from_code(code).code(), code);
        }
        assert_eq!(MetadataBlockType::from_code(99), MetadataBlockType::Reserved(99));
    }

    #[test]
    fn test_has_md5() {
        let mut info = sample_info();
        assert!(info.has_md5());
        info.md5_signature = [0; MD5_SIZE];
        assert!(!info.has_md5());
    }

    #[test]
    fn test_md5_interleaves_channels_little_endian() {
        // Two 8-bit channels: the hashed byte stream must be the samples
        // interleaved per index.
        let left = [1i32, 3];
        let right = [2i32, 4];
        let digest = md5_of_samples(&[&left[..], &right[..]], 8).unwrap();
        assert_eq!(digest, md5::compute([1u8, 2, 3, 4]).0);

        // 16-bit: each sample contributes two little-endian bytes
        let mono = [0x0102i32, -2];
        let digest = md5_of_samples(&[&mono[..]], 16).unwrap();
        assert_eq!(digest, md5::compute([0x02u8, 0x01, 0xFE, 0xFF]).0);
    }

    #[test]
    fn test_md5_rejects_unsupported_depths() {
        let mono = [0i32];
        assert!(matches!(
            md5_of_samples(&[&mono[..]], 12),
            Err(FlacError::UnsupportedMd5Depth(12))
        ));
        assert!(matches!(
            md5_of_samples(&[&mono[..]], 0),
            Err(FlacError::UnsupportedMd5Depth(0))
        ));
    }

    #[test]
    fn test_md5_rejects_ragged_channels() {
        let a = [0i32, 1];
        let b = [0i32];
        assert!(matches!(
            md5_of_samples(&[&a[..], &b[..]], 16),
            Err(FlacError::ChannelLengthMismatch)
        ));
    }
}
