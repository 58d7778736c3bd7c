//! Error types for FLAC decoding.

use std::io;
use thiserror::Error;

/// Result type for all decoding operations.
pub type FlacResult<T> = Result<T, FlacError>;

/// Errors produced while decoding a FLAC stream.
///
/// Grammar violations and CRC failures abort the current frame; the decoder
/// does not attempt mid-stream recovery. A clean end of stream before a frame
/// header begins is not an error and is reported as `Ok(None)` by the
/// frame-reading entry points.
#[derive(Debug, Error)]
pub enum FlacError {
    // ========================================================================
    // Stream-level errors
    // ========================================================================
    #[error("Invalid FLAC marker: expected 'fLaC', found {found:?}")]
    InvalidMarker { found: [u8; 4] },

    #[error("Missing STREAMINFO block (must be first metadata block)")]
    MissingStreamInfo,

    #[error("STREAMINFO block has invalid size: expected 34 bytes, found {0}")]
    InvalidStreamInfoSize(usize),

    #[error("Minimum block size {min} exceeds maximum block size {max}")]
    BlockSizeBounds { min: u16, max: u16 },

    #[error("Minimum frame size {min} exceeds maximum frame size {max}")]
    FrameSizeBounds { min: u32, max: u32 },

    #[error("Block size {size} is invalid (must be 16-65535)")]
    InvalidBlockSize { size: u32 },

    #[error("Sample rate {rate} is invalid (must be 1-655350 Hz)")]
    InvalidSampleRate { rate: u32 },

    #[error("Bits per sample {bits} is invalid (must be 4-32)")]
    InvalidBitsPerSample { bits: u8 },

    #[error("Channel count {channels} is invalid (must be 1-8)")]
    InvalidChannelCount { channels: u8 },

    #[error("Total sample count {0} exceeds 36 bits")]
    InvalidTotalSamples(u64),

    // ========================================================================
    // Frame header errors
    // ========================================================================
    #[error("Invalid frame sync code: expected 0x3FFE, found 0x{found:04X}")]
    InvalidFrameSync { found: u16 },

    #[error("Reserved frame header bit is set")]
    ReservedHeaderBit,

    #[error("Reserved block size code in frame header")]
    ReservedBlockSizeCode,

    #[error("Reserved sample rate code in frame header")]
    ReservedSampleRateCode,

    #[error("Reserved bits per sample code in frame header")]
    ReservedBitsPerSampleCode,

    #[error("Invalid channel assignment code: {0}")]
    InvalidChannelAssignment(u8),

    #[error("Invalid UTF-8 coded number in frame header")]
    InvalidUtf8CodedNumber,

    #[error("Frame/sample number overflow")]
    FrameNumberOverflow,

    #[error("Frame header CRC-8 mismatch: stored 0x{stored:02X}, computed 0x{computed:02X}")]
    FrameHeaderCrcMismatch { stored: u8, computed: u8 },

    #[error("Frame CRC-16 mismatch: stored 0x{stored:04X}, computed 0x{computed:04X}")]
    FrameCrcMismatch { stored: u16, computed: u16 },

    #[error("Non-zero padding bits")]
    InvalidPaddingBits,

    // ========================================================================
    // Cross-frame consistency errors
    // ========================================================================
    #[error("Channel count mismatch: frame has {frame}, stream declares {stream}")]
    ChannelCountMismatch { frame: u8, stream: u8 },

    #[error("Sample rate mismatch: frame has {frame} Hz, stream declares {stream} Hz")]
    SampleRateMismatch { frame: u32, stream: u32 },

    #[error("Sample depth mismatch: frame has {frame} bits, stream declares {stream} bits")]
    SampleDepthMismatch { frame: u32, stream: u32 },

    #[error("Block size {size} exceeds stream maximum {max}")]
    BlockSizeExceedsMaximum { size: u32, max: u16 },

    #[error("Block size {size} exceeds total sample count {total}")]
    BlockSizeExceedsTotalSamples { size: u32, total: u64 },

    #[error("Frame size {size} below stream minimum {min}")]
    FrameSizeBelowMinimum { size: u32, min: u32 },

    #[error("Frame size {size} exceeds stream maximum {max}")]
    FrameSizeAboveMaximum { size: u32, max: u32 },

    // ========================================================================
    // Subframe errors
    // ========================================================================
    #[error("Reserved subframe type code: {0}")]
    ReservedSubframeType(u8),

    #[error("Predictor order {order} exceeds block size {block_size}")]
    PredictorOrderTooLarge { order: u8, block_size: u32 },

    #[error("Invalid QLP coefficient precision: {precision}")]
    InvalidQlpPrecision { precision: u8 },

    #[error("LPC shift is negative: {shift}")]
    InvalidLpcShift { shift: i8 },

    #[error("Wasted bits per sample meet or exceed sample depth")]
    ExcessiveWastedBits,

    #[error("Sample after prediction exceeds bit depth")]
    PostLpcOverflow,

    #[error("Sample value {value} exceeds {bits}-bit range")]
    SampleOverflow { value: i64, bits: u8 },

    // ========================================================================
    // Residual coding errors
    // ========================================================================
    #[error("Reserved residual coding method: {0}")]
    ReservedResidualMethod(u8),

    #[error("Block size {block_size} is not divisible by {partitions} Rice partitions")]
    PartitionedBlockSize { block_size: u32, partitions: u32 },

    #[error("First Rice partition is smaller than the predictor order")]
    RicePartitionOverflow,

    #[error("Rice-coded residual value too large")]
    ResidualTooLarge,

    // ========================================================================
    // API misuse
    // ========================================================================
    #[error("Bit count {0} is out of range (must be 0-32)")]
    InvalidBitCount(u32),

    #[error("Bit reader is not at a byte boundary")]
    NotByteAligned,

    #[error("Decoder is mid-frame or aborted a previous frame")]
    DecoderPoisoned,

    #[error("Output buffer too small for channel count and block size")]
    OutputBufferTooSmall,

    #[error("Unsupported MD5 sample depth: {0} bits")]
    UnsupportedMd5Depth(u32),

    #[error("Channel buffers have differing lengths")]
    ChannelLengthMismatch,

    #[error("Underlying byte source does not support seeking")]
    SeekUnsupported,

    // ========================================================================
    // I/O
    // ========================================================================
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Unexpected end of stream")]
    UnexpectedEof,
}
