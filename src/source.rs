//! Byte-oriented input sources feeding the bit reader.
//!
//! The decoder consumes bytes through the [`ByteSource`] trait rather than
//! `std::io::Read` directly, because seeking must flow through the bit
//! reader (which flushes its buffers and CRC state on reposition). Four
//! backings are provided: a borrowed slice, a memory-mapped file, a
//! seekable file, and a forward-only stream.

use memmap2::Mmap;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use crate::error::{FlacError, FlacResult};

/// A byte-granular input with optional length and seek capabilities.
///
/// Do not call [`seek_to`](ByteSource::seek_to) directly while a bit reader
/// owns the source; use [`BitInput::seek_to`](crate::bitstream::BitInput::seek_to),
/// which repositions the source and then discards its own buffered state.
pub trait ByteSource {
    /// Read up to `buf.len()` bytes into `buf`, returning the number of
    /// bytes read. `Ok(0)` signals the end of the stream.
    fn read(&mut self, buf: &mut [u8]) -> FlacResult<usize>;

    /// Total length of the underlying data in bytes, if knowable.
    fn length(&self) -> Option<u64> {
        None
    }

    /// Reposition the source to an absolute byte offset.
    fn seek_to(&mut self, pos: u64) -> FlacResult<()> {
        let _ = pos;
        Err(FlacError::SeekUnsupported)
    }
}

/// Fixed in-memory source over a borrowed byte slice.
#[derive(Debug)]
pub struct MemorySource<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> MemorySource<'a> {
    /// Create a source reading from the given slice.
    pub const fn new(data: &'a [u8]) -> Self {
        MemorySource { data, offset: 0 }
    }
}

impl ByteSource for MemorySource<'_> {
    fn read(&mut self, buf: &mut [u8]) -> FlacResult<usize> {
        let n = usize::min(self.data.len() - self.offset, buf.len());
        buf[..n].copy_from_slice(&self.data[self.offset..self.offset + n]);
        self.offset += n;
        Ok(n)
    }

    fn length(&self) -> Option<u64> {
        Some(self.data.len() as u64)
    }

    fn seek_to(&mut self, pos: u64) -> FlacResult<()> {
        self.offset = usize::min(pos as usize, self.data.len());
        Ok(())
    }
}

/// Memory-mapped file source (zero-copy, OS-backed).
#[derive(Debug)]
pub struct MmapSource {
    mmap: Mmap,
    offset: usize,
}

impl MmapSource {
    /// Map the file at `path` read-only.
    pub fn open<P: AsRef<Path>>(path: P) -> FlacResult<Self> {
        let file = File::open(path)?;
        let mmap = unsafe { Mmap::map(&file)? };
        Ok(MmapSource { mmap, offset: 0 })
    }
}

impl ByteSource for MmapSource {
    fn read(&mut self, buf: &mut [u8]) -> FlacResult<usize> {
        let data: &[u8] = self.mmap.as_ref();
        let n = usize::min(data.len() - self.offset, buf.len());
        buf[..n].copy_from_slice(&data[self.offset..self.offset + n]);
        self.offset += n;
        Ok(n)
    }

    fn length(&self) -> Option<u64> {
        Some(self.mmap.len() as u64)
    }

    fn seek_to(&mut self, pos: u64) -> FlacResult<()> {
        self.offset = usize::min(pos as usize, self.mmap.len());
        Ok(())
    }
}

/// Seekable file source.
///
/// Reads go straight to the file; the bit reader provides the buffering.
#[derive(Debug)]
pub struct FileSource {
    file: File,
    len: u64,
}

impl FileSource {
    /// Open the file at `path` for reading.
    pub fn open<P: AsRef<Path>>(path: P) -> FlacResult<Self> {
        let file = File::open(path)?;
        let len = file.metadata()?.len();
        Ok(FileSource { file, len })
    }
}

impl ByteSource for FileSource {
    fn read(&mut self, buf: &mut [u8]) -> FlacResult<usize> {
        Ok(self.file.read(buf)?)
    }

    fn length(&self) -> Option<u64> {
        Some(self.len)
    }

    fn seek_to(&mut self, pos: u64) -> FlacResult<()> {
        self.file.seek(SeekFrom::Start(pos))?;
        Ok(())
    }
}

/// Forward-only stream source; length is unknown and seeking fails.
#[derive(Debug)]
pub struct StreamSource<R> {
    inner: R,
}

impl<R: Read> StreamSource<R> {
    /// Wrap an arbitrary reader.
    pub const fn new(inner: R) -> Self {
        StreamSource { inner }
    }

    /// Destroy the source, returning the wrapped reader.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> ByteSource for StreamSource<R> {
    fn read(&mut self, buf: &mut [u8]) -> FlacResult<usize> {
        Ok(self.inner.read(buf)?)
    }
}
