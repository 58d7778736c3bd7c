//! Stream-level decoding: marker, metadata walk, and the frame loop.
//!
//! [`FlacDecoder`] reads the `fLaC` marker, captures and validates the
//! mandatory STREAMINFO block, skips every other metadata block by its
//! declared length, and then hands out audio frames one at a time. Each
//! decoded frame is checked against STREAMINFO for cross-frame
//! consistency before being returned.

use log::debug;

use crate::bitstream::BitInput;
use crate::constants::{FLAC_MARKER, STREAMINFO_SIZE};
use crate::error::{FlacError, FlacResult};
use crate::frame::{FrameDecoder, FrameInfo};
use crate::metadata::{MetadataBlockHeader, MetadataBlockType, StreamInfo};
use crate::source::ByteSource;

/// Decoder for a whole FLAC stream.
///
/// ```no_run
/// use flac_decode::{FlacDecoder, FileSource};
///
/// let mut decoder = FlacDecoder::new(FileSource::open("audio.flac")?)?;
/// let info = *decoder.stream_info();
/// let mut samples: Vec<Vec<i32>> =
///     vec![vec![0; info.max_block_size as usize]; info.channels as usize];
/// while let Some(frame) = decoder.read_frame(&mut samples, 0)? {
///     // samples[ch][..frame.block_size as usize] now holds PCM data
/// }
/// # Ok::<(), flac_decode::FlacError>(())
/// ```
pub struct FlacDecoder<S> {
    stream_info: StreamInfo,
    frames: FrameDecoder<S>,
}

impl<S: ByteSource> FlacDecoder<S> {
    /// Read the stream marker and all metadata blocks from `source`,
    /// leaving the decoder positioned at the first audio frame.
    pub fn new(source: S) -> FlacResult<Self> {
        let mut input = BitInput::new(source);

        let mut marker = [0u8; 4];
        input.read_fully(&mut marker)?;
        if marker != FLAC_MARKER {
            return Err(FlacError::InvalidMarker { found: marker });
        }

        let mut stream_info: Option<StreamInfo> = None;
        loop {
            let mut header_bytes = [0u8; 4];
            input.read_fully(&mut header_bytes)?;
            let header = MetadataBlockHeader::from_bytes(&header_bytes);

            if stream_info.is_none() {
                if header.block_type != MetadataBlockType::StreamInfo {
                    return Err(FlacError::MissingStreamInfo);
                }
                if header.length as usize != STREAMINFO_SIZE {
                    return Err(FlacError::InvalidStreamInfoSize(header.length as usize));
                }
                let mut payload = [0u8; STREAMINFO_SIZE];
                input.read_fully(&mut payload)?;
                let info = StreamInfo::from_bytes(&payload)?;
                info.validate()?;
                stream_info = Some(info);
            } else {
                debug!(
                    "skipping {} metadata block ({} bytes)",
                    header.block_type, header.length
                );
                skip_bytes(&mut input, header.length as usize)?;
            }

            if header.is_last {
                break;
            }
        }

        // The loop cannot finish without capturing STREAMINFO
        let stream_info = stream_info.ok_or(FlacError::MissingStreamInfo)?;
        debug!(
            "stream: {} Hz, {} channels, {} bits, {} total samples",
            stream_info.sample_rate,
            stream_info.channels,
            stream_info.bits_per_sample,
            stream_info.total_samples
        );
        let frames = FrameDecoder::new(input, u32::from(stream_info.bits_per_sample))?;
        Ok(FlacDecoder {
            stream_info,
            frames,
        })
    }

    /// The stream's STREAMINFO parameters.
    pub fn stream_info(&self) -> &StreamInfo {
        &self.stream_info
    }

    /// Decode the next frame into `out_samples[ch][out_offset ..]`,
    /// checking it against STREAMINFO. `Ok(None)` signals a clean end of
    /// stream.
    pub fn read_frame(
        &mut self,
        out_samples: &mut [Vec<i32>],
        out_offset: usize,
    ) -> FlacResult<Option<FrameInfo>> {
        let info = match self.frames.read_frame(out_samples, out_offset)? {
            Some(info) => info,
            None => return Ok(None),
        };
        self.stream_info.check_frame(&info)?;
        Ok(Some(info))
    }

    /// Destroy the decoder, returning the underlying byte source.
    pub fn into_source(self) -> S {
        self.frames.into_input().into_source()
    }
}

/// Consume `count` bytes, failing on EOF.
fn skip_bytes<S: ByteSource>(input: &mut BitInput<S>, count: usize) -> FlacResult<()> {
    let mut scratch = [0u8; 1024];
    let mut remaining = count;
    while remaining > 0 {
        let n = usize::min(remaining, scratch.len());
        input.read_fully(&mut scratch[..n])?;
        remaining -= n;
    }
    Ok(())
}
