//! Transparent decompression view.
//!
//! Resolving `"data.txt"` through the view falls back to a compressed
//! sibling `"data.txt.gz"` when the plain name doesn't resolve to anything
//! usable, and opening the result decodes on the fly. The view is always
//! read-only.

use std::collections::HashSet;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::PathBuf;

use flate2::read::GzDecoder;

use vfs_core::{
    DirIter, Node, OpenMode, ReadOnlyStream, Vfs, VfsError, VfsInfo, VfsNodeImpl, VfsResult,
    VfsStream,
};

use crate::remount_wrapped;

pub const COMPRESSED_SUFFIX: &str = ".gz";

/// Proxy node substituting compressed files for their logical names.
/// `compressed` marks views whose wrapped node is the suffixed file itself.
pub struct Decompress {
    wrapped: Node,
    compressed: bool,
}

impl VfsNodeImpl for Decompress {
    fn repr(&self) -> String {
        format!("decompress view of {}", self.wrapped.repr(false))
    }

    fn query(&self) -> VfsInfo {
        let mut info = self.wrapped.query();
        info.is_readonly = true;
        info
    }

    /// Try the verbatim path first. A hit that queries as nonexistent is
    /// kept only as a fallback; the suffixed sibling takes precedence when
    /// it resolves to a non-directory.
    fn locate(&self, path: &str) -> VfsResult<Node> {
        let mut fallback = None;

        match self.wrapped.locate(path) {
            Ok(node) => {
                if node.query().exists {
                    return Ok(wrap_decompress(node));
                }
                fallback = Some(node);
            }
            Err(err) if err.is_not_found() => {}
            Err(err) => return Err(err),
        }

        let suffixed = format!("{path}{COMPRESSED_SUFFIX}");
        if let Ok(node) = self.wrapped.locate(&suffixed) {
            let info = node.query();
            if info.exists && !info.error && !info.is_dir {
                return Ok(Node::new(Decompress {
                    wrapped: node,
                    compressed: true,
                }));
            }
        }

        match fallback {
            Some(node) => Ok(wrap_decompress(node)),
            None => Err(VfsError::NotFound(path.to_string())),
        }
    }

    fn open(&self, mode: OpenMode) -> VfsResult<Box<dyn VfsStream>> {
        if mode.is_write() {
            return Err(VfsError::ReadOnly);
        }

        let raw = self.wrapped.open(mode)?;

        if self.compressed {
            return Ok(Box::new(GzStream::new(raw)));
        }

        Ok(Box::new(ReadOnlyStream::new(raw)))
    }

    /// Child names with the compressed suffix stripped. A plain file and
    /// its compressed sibling collapse into one entry.
    fn iter(&self) -> VfsResult<DirIter> {
        let inner = self.wrapped.iter()?;
        Ok(DirIter::new(DecompIter {
            inner,
            seen: HashSet::new(),
        }))
    }

    fn mount(&self, _name: Option<&str>, _node: Node) -> VfsResult<()> {
        Err(VfsError::ReadOnly)
    }

    fn unmount(&self, _name: &str) -> VfsResult<()> {
        Err(VfsError::ReadOnly)
    }

    fn mkdir(&self, _name: Option<&str>) -> VfsResult<()> {
        Err(VfsError::ReadOnly)
    }

    fn syspath(&self) -> VfsResult<PathBuf> {
        self.wrapped.syspath()
    }
}

struct DecompIter {
    inner: DirIter,
    seen: HashSet<String>,
}

impl Iterator for DecompIter {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        loop {
            let raw = self.inner.next()?;

            let name = match raw.strip_suffix(COMPRESSED_SUFFIX) {
                Some(stripped) if !stripped.is_empty() => stripped.to_string(),
                _ => raw,
            };

            if self.seen.insert(name.clone()) {
                return Some(name);
            }
        }
    }
}

/// Wrap `node` in a decompression view. Existing views pass through.
pub fn wrap_decompress(node: Node) -> Node {
    if node.is_impl::<Decompress>() {
        return node;
    }

    Node::new(Decompress {
        wrapped: node,
        compressed: false,
    })
}

/// Replace the node mounted at `path` with a decompression view of itself.
/// Calling this on an already converted mountpoint is a no-op.
pub fn make_decompress_view(vfs: &Vfs, path: &str) -> VfsResult<()> {
    let node = vfs
        .root()
        .locate(&vfs_core::path::normalize(path))?;

    if node.is_impl::<Decompress>() {
        return Ok(());
    }

    remount_wrapped(vfs, path, wrap_decompress)?;
    Ok(())
}

/// Decoding stream over a gzip member, with emulated seeking.
///
/// Positions are in decompressed bytes. Forward seeks read and discard;
/// backward seeks rewind the raw stream and restart the decoder; `End`
/// drains the member to learn its length first.
struct GzStream {
    decoder: Option<GzDecoder<Box<dyn VfsStream>>>,
    pos: u64,
}

impl GzStream {
    fn new(raw: Box<dyn VfsStream>) -> Self {
        Self {
            decoder: Some(GzDecoder::new(raw)),
            pos: 0,
        }
    }

    fn decoder_mut(&mut self) -> io::Result<&mut GzDecoder<Box<dyn VfsStream>>> {
        self.decoder
            .as_mut()
            .ok_or_else(|| io::Error::other("decoder state lost"))
    }

    fn restart(&mut self) -> io::Result<()> {
        let decoder = self
            .decoder
            .take()
            .ok_or_else(|| io::Error::other("decoder state lost"))?;

        let mut raw = decoder.into_inner();
        let res = raw.seek(SeekFrom::Start(0));
        self.decoder = Some(GzDecoder::new(raw));

        res?;
        self.pos = 0;
        Ok(())
    }

    /// Read and discard up to `amount` bytes. Stops early at end of stream.
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

    fn drain(&mut self) -> io::Result<u64> {
        self.skip(u64::MAX)?;
        Ok(self.pos)
    }
}

fn offset_from(base: u64, delta: i64) -> io::Result<u64> {
    base.checked_add_signed(delta).ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            "seek before the start of the stream",
        )
    })
}

impl Read for GzStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.decoder_mut()?.read(buf)?;
        self.pos += n as u64;
        Ok(n)
    }
}

impl Seek for GzStream {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(n) => n,
            SeekFrom::Current(delta) => offset_from(self.pos, delta)?,
            SeekFrom::End(delta) => {
                let len = self.drain()?;
                offset_from(len, delta)?
            }
        };

        if target < self.pos {
            self.restart()?;
        }

        self.skip(target - self.pos)?;
        Ok(self.pos)
    }
}

impl Write for GzStream {
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
