use anyhow::{Context, Result};
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};

use crate::decoder::SourceRange;

/// `Read + Seek` view of a byte range inside a file.
///
/// Positions are relative to the start of the range; reads stop at its end
/// even when the file continues.
pub struct SourceWindow {
    file: File,
    start: u64,
    len: u64,
    pos: u64,
}

impl SourceWindow {
    pub fn new(source: SourceRange) -> Result<Self> {
        let SourceRange { mut file, offset, size } = source;
        file.seek(SeekFrom::Start(offset))
            .with_context(|| format!("failed to seek to source offset {offset}"))?;

        Ok(Self {
            file,
            start: offset,
            len: size,
            pos: 0,
        })
    }

    pub const fn len(&self) -> u64 {
        self.len
    }

    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl Read for SourceWindow {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let remaining = self.len.saturating_sub(self.pos);
        if remaining == 0 || buf.is_empty() {
            return Ok(0);
        }

        let want = buf.len().min(usize::try_from(remaining).unwrap_or(usize::MAX));
        let n = self.file.read(&mut buf[..want])?;
        self.pos += n as u64;
        Ok(n)
    }
}

impl Seek for SourceWindow {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(p) => Some(p),
            SeekFrom::End(delta) => self.len.checked_add_signed(delta),
            SeekFrom::Current(delta) => self.pos.checked_add_signed(delta),
        };

        let Some(target) = target else {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "seek before the start of the source window",
            ));
        };

        self.file.seek(SeekFrom::Start(self.start + target))?;
        self.pos = target;
        Ok(target)
    }
}
