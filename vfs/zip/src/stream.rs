//! Entry streams: byte-range windows over the archive stream and deflate
//! decoders on top of them.

use std::io::{self, Read, Seek, SeekFrom, Write};

use flate2::read::DeflateDecoder;

use vfs_core::VfsStream;

fn offset_from(base: u64, delta: i64) -> io::Result<u64> {
    base.checked_add_signed(delta).ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            "seek before the start of the stream",
        )
    })
}

fn deny_write() -> io::Error {
    io::Error::new(io::ErrorKind::PermissionDenied, "stream is read-only")
}

/// Fixed byte-range view over an underlying stream. Used directly for
/// stored entries, where seeking is native.
pub(crate) struct Window {
    inner: Box<dyn VfsStream>,
    start: u64,
    len: u64,
    pos: u64,
}

impl Window {
    pub(crate) fn new(mut inner: Box<dyn VfsStream>, start: u64, len: u64) -> io::Result<Self> {
        inner.seek(SeekFrom::Start(start))?;
        Ok(Self {
            inner,
            start,
            len,
            pos: 0,
        })
    }
}

impl Read for Window {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let remaining = self.len.saturating_sub(self.pos);
        if remaining == 0 {
            return Ok(0);
        }

        let want = (buf.len() as u64).min(remaining) as usize;
        let got = self.inner.read(&mut buf[..want])?;
        self.pos += got as u64;
        Ok(got)
    }
}

impl Seek for Window {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(n) => n,
            SeekFrom::Current(delta) => offset_from(self.pos, delta)?,
            SeekFrom::End(delta) => offset_from(self.len, delta)?,
        };

        self.inner.seek(SeekFrom::Start(self.start + target))?;
        self.pos = target;
        Ok(target)
    }
}

impl Write for Window {
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        Err(deny_write())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Decoder over a deflated entry, with emulated seeking.
///
/// Positions are in decompressed bytes; `len` is the uncompressed size from
/// the central directory. Forward seeks read and discard, backward seeks
/// rewind the compressed window and restart the decoder.
pub(crate) struct DeflateEntry {
    decoder: Option<DeflateDecoder<Window>>,
    len: u64,
    pos: u64,
}

impl DeflateEntry {
    pub(crate) fn new(window: Window, len: u64) -> Self {
        Self {
            decoder: Some(DeflateDecoder::new(window)),
            len,
            pos: 0,
        }
    }

    fn decoder_mut(&mut self) -> io::Result<&mut DeflateDecoder<Window>> {
        self.decoder
            .as_mut()
            .ok_or_else(|| io::Error::other("decoder state lost"))
    }

    fn restart(&mut self) -> io::Result<()> {
        let decoder = self
            .decoder
            .take()
            .ok_or_else(|| io::Error::other("decoder state lost"))?;

        let mut window = decoder.into_inner();
        let res = window.seek(SeekFrom::Start(0));
        self.decoder = Some(DeflateDecoder::new(window));

        res?;
        self.pos = 0;
        Ok(())
    }

    fn skip(&mut self, mut amount: u64) -> io::Result<()> {
        let mut sink = [0u8; 4096];

        while amount > 0 {
            let want = amount.min(sink.len() as u64) as usize;
            let got = self.read(&mut sink[..want])?;
            if got == 0 {
                break;
            }
            amount -= got as u64;
        }

        Ok(())
    }
}

impl Read for DeflateEntry {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.decoder_mut()?.read(buf)?;
        self.pos += n as u64;
        Ok(n)
    }
}

impl Seek for DeflateEntry {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(n) => n,
            SeekFrom::Current(delta) => offset_from(self.pos, delta)?,
            SeekFrom::End(delta) => offset_from(self.len, delta)?,
        };

        if target < self.pos {
            self.restart()?;
        }

        self.skip(target - self.pos)?;
        Ok(self.pos)
    }
}

impl Write for DeflateEntry {
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        Err(deny_write())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
