use std::io::{self, Read, Seek, SeekFrom, Write};

/// Byte stream returned by [`Node::open`](crate::Node::open).
///
/// Every stream carries the full `Read + Write + Seek` surface; backends
/// that can't honor a part of it fail the corresponding call instead.
pub trait VfsStream: Read + Write + Seek + Send + 'static {}

impl<T: Read + Write + Seek + Send + 'static> VfsStream for T {}

/// Write-rejecting guard around another stream.
///
/// Defends against a wrapped node whose own `open` doesn't enforce
/// read-only access.
pub struct ReadOnlyStream<S> {
    inner: S,
}

impl<S> ReadOnlyStream<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }
}

impl<S: Read> Read for ReadOnlyStream<S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl<S: Seek> Seek for ReadOnlyStream<S> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.inner.seek(pos)
    }
}

impl<S> Write for ReadOnlyStream<S> {
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        Err(io::Error::new(
            io::ErrorKind::PermissionDenied,
            "stream is read-only",
        ))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
