//! FLAC constants and magic numbers.

/// FLAC stream marker "fLaC"
pub const FLAC_MARKER: [u8; 4] = *b"fLaC";

/// Frame sync code (14 bits: 0b11111111111110)
pub const FRAME_SYNC_CODE: u32 = 0x3FFE;

/// STREAMINFO block payload size (always 34 bytes)
pub const STREAMINFO_SIZE: usize = 34;

/// MD5 signature size
pub const MD5_SIZE: usize = 16;

/// Maximum channels
pub const MAX_CHANNELS: u8 = 8;

/// Largest block size a frame header can declare (code 7: u16 value + 1).
///
/// Scratch buffers are sized for this; a strict reading of the format caps
/// streams at 65535 samples per block.
pub const MAX_BLOCK_SAMPLES: usize = 65536;

/// Sample rate lookup table for frame header
/// Index 0 means "get from STREAMINFO"; 12-14 read extra bytes from the
/// end of the header; 15 is reserved.
pub const SAMPLE_RATE_TABLE: [u32; 12] = [
    0,      // 0: get from STREAMINFO
    88200,  // 1
    176400, // 2
    192000, // 3
    8000,   // 4
    16000,  // 5
    22050,  // 6
    24000,  // 7
    32000,  // 8
    44100,  // 9
    48000,  // 10
    96000,  // 11
];

/// Block size lookup table for frame header
/// Values with special meaning: 0 = reserved, 6 = get 8-bit (blocksize-1),
/// 7 = get 16-bit (blocksize-1)
pub const BLOCK_SIZE_TABLE: [u32; 16] = [
    0,     // 0: reserved
    192,   // 1
    576,   // 2
    1152,  // 3
    2304,  // 4
    4608,  // 5
    0,     // 6: get 8-bit (blocksize-1) from end of header
    0,     // 7: get 16-bit (blocksize-1) from end of header
    256,   // 8
    512,   // 9
    1024,  // 10
    2048,  // 11
    4096,  // 12
    8192,  // 13
    16384, // 14
    32768, // 15
];
