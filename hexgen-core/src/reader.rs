use crate::error::{ParseError, ParseResult};
use byteorder::{ReadBytesExt, LE};
use std::io::{Cursor, Read, Seek, SeekFrom};

/// Bounds-checked little-endian reads at absolute offsets.
///
/// Every read seeks to the requested offset first, so callers never depend on
/// where a previous read left the cursor. The source length is captured once
/// at construction and every read is checked against it before touching the
/// stream.
#[derive(Debug)]
pub struct HeaderReader<R> {
    inner: R,
    len: u64,
}

impl<'a> HeaderReader<Cursor<&'a [u8]>> {
    pub fn from_bytes(data: &'a [u8]) -> Self {
        Self {
            len: data.len() as u64,
            inner: Cursor::new(data),
        }
    }
}

impl<R: Read + Seek> HeaderReader<R> {
    pub fn new(mut inner: R) -> ParseResult<Self> {
        let len = inner.seek(SeekFrom::End(0))?;
        inner.seek(SeekFrom::Start(0))?;
        Ok(Self { inner, len })
    }

    /// Fails unless `needed` bytes are available starting at `offset`.
    pub fn require(&self, offset: u64, needed: usize) -> ParseResult<()> {
        let end = offset.checked_add(needed as u64);
        match end {
            Some(end) if end <= self.len => Ok(()),
            _ => Err(ParseError::truncated(
                offset,
                needed,
                self.len.saturating_sub(offset),
            )),
        }
    }

    fn seek_checked(&mut self, offset: u64, needed: usize) -> ParseResult<()> {
        self.require(offset, needed)?;
        self.inner.seek(SeekFrom::Start(offset))?;
        Ok(())
    }

    pub fn u16_at(&mut self, offset: u64) -> ParseResult<u16> {
        self.seek_checked(offset, 2)?;
        Ok(self.inner.read_u16::<LE>()?)
    }

    pub fn u32_at(&mut self, offset: u64) -> ParseResult<u32> {
        self.seek_checked(offset, 4)?;
        Ok(self.inner.read_u32::<LE>()?)
    }

    pub fn u64_at(&mut self, offset: u64) -> ParseResult<u64> {
        self.seek_checked(offset, 8)?;
        Ok(self.inner.read_u64::<LE>()?)
    }

    /// Reads exactly `N` bytes at `offset`.
    pub fn array_at<const N: usize>(&mut self, offset: u64) -> ParseResult<[u8; N]> {
        self.seek_checked(offset, N)?;
        let mut buf = [0u8; N];
        self.inner.read_exact(&mut buf)?;
        Ok(buf)
    }

    /// Reads up to `max` bytes at `offset`, returning fewer when the source
    /// ends early. Never fails on a short source.
    pub fn bytes_up_to(&mut self, offset: u64, max: usize) -> ParseResult<Vec<u8>> {
        if offset >= self.len {
            return Ok(Vec::new());
        }
        let take = (self.len - offset).min(max as u64) as usize;
        self.inner.seek(SeekFrom::Start(offset))?;
        let mut buf = vec![0u8; take];
        self.inner.read_exact(&mut buf)?;
        Ok(buf)
    }
}
