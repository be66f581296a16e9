use std::io::{self, Read, Seek, SeekFrom, Write};
use std::sync::Arc;

use parking_lot::Mutex;

use vfs_core::{Node, OpenMode, VfsError, VfsInfo, VfsNodeImpl, VfsResult, VfsStream};

/// Shared-buffer file node. All streams opened from the same node observe
/// the same bytes.
pub struct MemFile {
    data: Arc<Mutex<Vec<u8>>>,
}

impl MemFile {
    pub fn new(contents: impl Into<Vec<u8>>) -> Self {
        Self {
            data: Arc::new(Mutex::new(contents.into())),
        }
    }

    pub fn new_node(contents: impl Into<Vec<u8>>) -> Node {
        Node::new(Self::new(contents))
    }

    pub fn contents(&self) -> Vec<u8> {
        self.data.lock().clone()
    }
}

impl VfsNodeImpl for MemFile {
    fn repr(&self) -> String {
        format!("in-memory file ({} bytes)", self.data.lock().len())
    }

    fn query(&self) -> VfsInfo {
        VfsInfo {
            exists: true,
            is_dir: false,
            is_readonly: false,
            error: false,
        }
    }

    fn open(&self, mode: OpenMode) -> VfsResult<Box<dyn VfsStream>> {
        if !mode.intersects(OpenMode::READ | OpenMode::WRITE) {
            return Err(VfsError::Malformed("open without read or write".into()));
        }

        if mode.is_write() && !mode.contains(OpenMode::READ) {
            self.data.lock().clear();
        }

        Ok(Box::new(MemStream {
            data: Arc::clone(&self.data),
            pos: 0,
        }))
    }
}

struct MemStream {
    data: Arc<Mutex<Vec<u8>>>,
    pos: usize,
}

impl Read for MemStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let data = self.data.lock();
        let available = data.len().saturating_sub(self.pos);
        let n = available.min(buf.len());
        buf[..n].copy_from_slice(&data[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

impl Write for MemStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut data = self.data.lock();
        let end = self.pos + buf.len();
        if end > data.len() {
            data.resize(end, 0);
        }
        data[self.pos..end].copy_from_slice(buf);
        self.pos = end;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Seek for MemStream {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let len = self.data.lock().len() as i64;
        let target = match pos {
            SeekFrom::Start(n) => n as i64,
            SeekFrom::End(d) => len + d,
            SeekFrom::Current(d) => self.pos as i64 + d,
        };

        if target < 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "seek before start of stream",
            ));
        }

        self.pos = target as usize;
        Ok(self.pos as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_read_round_trip() {
        let node = MemFile::new_node(Vec::new());

        let mut w = node.open(OpenMode::WRITE).unwrap();
        w.write_all(b"hello world").unwrap();

        let mut r = node.open(OpenMode::READ | OpenMode::SEEKABLE).unwrap();
        let mut out = String::new();
        r.read_to_string(&mut out).unwrap();
        assert_eq!(out, "hello world");

        r.seek(SeekFrom::Start(6)).unwrap();
        let mut tail = String::new();
        r.read_to_string(&mut tail).unwrap();
        assert_eq!(tail, "world");
    }

    #[test]
    fn read_mode_streams_reject_writes() {
        let node = MemFile::new_node(b"data".to_vec());
        let mut r = node.open(OpenMode::READ).unwrap();
        assert!(r.write(b"x").is_err());
    }

    #[test]
    fn write_mode_truncates() {
        let node = MemFile::new_node(b"long old contents".to_vec());
        node.open(OpenMode::WRITE).unwrap().write_all(b"new").unwrap();

        let mut r = node.open(OpenMode::READ).unwrap();
        let mut out = Vec::new();
        r.read_to_end(&mut out).unwrap();
        assert_eq!(out, b"new");
    }
}
