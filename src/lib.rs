//! Pure-Rust FLAC decoder core.
//!
//! This crate recovers bit-exact integer PCM samples from a FLAC
//! bitstream. It implements the layers the format's hard engineering
//! lives in:
//!
//! - `source`: byte-granular input with optional length and seek
//! - `bitstream`: a buffered bit reader that co-maintains CRC-8/CRC-16
//!   state and a table-driven Rice fast path
//! - `metadata`: STREAMINFO parsing, serialization, and validation
//! - `frame` / `subframe` / `lpc`: the frame grammar, subframe types
//!   (CONSTANT, VERBATIM, FIXED, LPC), Rice residual partitions, and the
//!   inverse prediction step
//! - `decoder`: the stream-level walk (marker, metadata blocks, frames)
//!
//! # Example
//!
//! ```no_run
//! use flac_decode::{FlacDecoder, FileSource};
//!
//! let mut decoder = FlacDecoder::new(FileSource::open("audio.flac")?)?;
//! let info = *decoder.stream_info();
//! let mut samples: Vec<Vec<i32>> =
//!     vec![vec![0; info.max_block_size as usize]; info.channels as usize];
//! while let Some(frame) = decoder.read_frame(&mut samples, 0)? {
//!     let block = &samples[0][..frame.block_size as usize];
//!     // feed `block` (and the other channels) to your sink
//!     let _ = block;
//! }
//! # Ok::<(), flac_decode::FlacError>(())
//! ```
//!
//! Decoding is single-threaded per decoder instance; run independent
//! decoders on disjoint sources for parallelism. Encoding, seek-table
//! lookup, and mid-stream corruption recovery are out of scope.

// Correctness and logic
#![warn(clippy::unit_cmp)]
#![warn(clippy::match_same_arms)]
#![allow(clippy::result_large_err)] // One error enum covers the whole grammar
// Performance-focused
#![warn(clippy::inefficient_to_string)]
#![warn(clippy::redundant_clone)]
#![warn(clippy::large_stack_arrays)]
// Style and idiomatic Rust
#![warn(clippy::needless_return)]
#![warn(clippy::manual_map)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::panic)]

pub mod bitstream;
pub mod crc;
pub mod decoder;
pub mod error;
pub mod frame;
pub mod metadata;
pub mod source;
pub mod subframe;

mod constants;
mod lpc;
mod rice;

#[cfg(test)]
mod testutil;

pub use bitstream::BitInput;
pub use decoder::FlacDecoder;
pub use error::{FlacError, FlacResult};
pub use frame::{FrameDecoder, FrameInfo};
pub use metadata::{md5_of_samples, MetadataBlockHeader, MetadataBlockType, StreamInfo};
pub use source::{ByteSource, FileSource, MemorySource, MmapSource, StreamSource};

use core::fmt::{Display, Formatter, Result as FmtResult};

/// Channel assignment of a frame: independently coded channels or one of
/// the stereo decorrelation modes, where the side channel carries the
/// inter-channel difference at one extra bit of width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelAssignment {
    /// 1 to 8 independently coded channels
    Independent(u8),
    /// Left-side stereo: (left, left - right)
    LeftSide,
    /// Side-right stereo: (left - right, right)
    RightSide,
    /// Mid-side stereo: ((left + right) >> 1, left - right)
    MidSide,
}

impl ChannelAssignment {
    /// Parse the 4-bit channel assignment code from a frame header.
    /// Codes 11 through 15 are reserved and yield `None`.
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            0..=7 => Some(ChannelAssignment::Independent(code + 1)),
            0b1000 => Some(ChannelAssignment::LeftSide),
            0b1001 => Some(ChannelAssignment::RightSide),
            0b1010 => Some(ChannelAssignment::MidSide),
            _ => None,
        }
    }

    /// The 4-bit frame header code for this assignment.
    pub const fn code(self) -> u8 {
        match self {
            ChannelAssignment::Independent(n) => n - 1,
            ChannelAssignment::LeftSide => 0b1000,
            ChannelAssignment::RightSide => 0b1001,
            ChannelAssignment::MidSide => 0b1010,
        }
    }

    /// The number of audio channels this assignment produces.
    pub const fn channels(self) -> u8 {
        match self {
            ChannelAssignment::Independent(n) => n,
            ChannelAssignment::LeftSide
            | ChannelAssignment::RightSide
            | ChannelAssignment::MidSide => 2,
        }
    }

    /// Whether this is a stereo decorrelation mode.
    pub const fn is_stereo_decorrelated(self) -> bool {
        !matches!(self, ChannelAssignment::Independent(_))
    }
}

impl Display for ChannelAssignment {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            ChannelAssignment::Independent(n) => write!(f, "{} independent channel(s)", n),
            ChannelAssignment::LeftSide => write!(f, "left-side stereo"),
            ChannelAssignment::RightSide => write!(f, "side-right stereo"),
            ChannelAssignment::MidSide => write!(f, "mid-side stereo"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_assignment_code_roundtrip() {
        let assignments = [
            ChannelAssignment::Independent(1),
            ChannelAssignment::Independent(8),
            ChannelAssignment::LeftSide,
            ChannelAssignment::RightSide,
            ChannelAssignment::MidSide,
        ];
        for assignment in assignments {
            assert_eq!(ChannelAssignment::from_code(assignment.code()), Some(assignment));
        }
    }

    #[test]
    fn test_reserved_channel_codes() {
        for code in 11..=15u8 {
            assert_eq!(ChannelAssignment::from_code(code), None);
        }
    }

    #[test]
    fn test_channel_counts() {
        assert_eq!(ChannelAssignment::Independent(5).channels(), 5);
        assert_eq!(ChannelAssignment::MidSide.channels(), 2);
        assert!(!ChannelAssignment::Independent(2).is_stereo_decorrelated());
        assert!(ChannelAssignment::LeftSide.is_stereo_decorrelated());
    }
}
