//! ZIP archive nodes.
//!
//! An archive mounts as a read-only directory tree. The central directory
//! is scanned once at open time into an entry metadata table; entry content
//! is read through per-call streams over a freshly opened source stream, so
//! open entry streams are independent of each other. Name lookups that the
//! metadata side-table doesn't cover go through a per-thread archive handle.

mod handles;
mod stream;

pub use handles::ThreadHandles;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use zip::read::ZipArchive;
use zip::CompressionMethod;

use vfs_core::path::{normalize, split_right, SEPARATOR};
use vfs_core::{DirIter, Node, OpenMode, VfsError, VfsInfo, VfsNodeImpl, VfsResult, VfsStream};

use crate::stream::{DeflateEntry, Window};

type Archive = ZipArchive<Box<dyn VfsStream>>;

/// Central-directory facts about one entry, enough to read its content
/// without consulting the archive handle again.
struct EntryMeta {
    name: String,
    is_dir: bool,
    size: u64,
    compressed_size: u64,
    data_start: u64,
    method: CompressionMethod,
}

struct Shared {
    source: Node,
    /// Indexed by archive entry index; `None` for entries with unusable names.
    entries: Vec<Option<EntryMeta>>,
    /// Normalized name to entry index, only where the stored name differs.
    pathmap: HashMap<String, usize>,
    /// Directory path (`""` is the archive root) to child names. Covers
    /// directories the archive never stores explicit entries for.
    dirs: HashMap<String, Vec<String>>,
    handles: ThreadHandles<Archive>,
}

impl Shared {
    fn open_archive(&self) -> VfsResult<Archive> {
        open_archive(&self.source)
    }
}

fn open_archive(source: &Node) -> VfsResult<Archive> {
    let stream = source.open(OpenMode::READ | OpenMode::SEEKABLE)?;

    ZipArchive::new(stream).map_err(|err| {
        VfsError::Malformed(format!(
            "failed to open zip archive '{}': {err}",
            source.repr(true)
        ))
    })
}

/// Record `path` and all of its ancestors in the directory table.
fn register_entry(dirs: &mut HashMap<String, Vec<String>>, path: &str, is_dir: bool) {
    if is_dir {
        dirs.entry(path.to_string()).or_default();
    }

    let mut current = path;

    loop {
        let (parent, name) = split_right(current);
        let children = dirs.entry(parent.to_string()).or_default();

        if !children.iter().any(|c| c == name) {
            children.push(name.to_string());
        }

        if parent.is_empty() {
            break;
        }

        current = parent;
    }
}

#[derive(Clone, Copy)]
enum Kind {
    Dir,
    File(usize),
}

/// A location inside an archive: the root, a directory, or a file entry.
/// Classification is fixed when the node is created.
pub struct ZipNode {
    shared: Arc<Shared>,
    path: String,
    kind: Kind,
}

impl ZipNode {
    /// Open `source` as a ZIP archive and return its root node.
    ///
    /// The source must be openable as a seekable read stream; each entry
    /// stream and each thread's handle opens it again independently.
    pub fn open(source: Node) -> VfsResult<Node> {
        let handles = ThreadHandles::new();
        let handle = handles.acquire(|| open_archive(&source))?;
        let mut archive = handle.lock();

        let mut entries = Vec::with_capacity(archive.len());
        let mut pathmap = HashMap::new();
        let mut dirs: HashMap<String, Vec<String>> = HashMap::new();
        dirs.insert(String::new(), Vec::new());

        for i in 0..archive.len() {
            let entry = archive.by_index_raw(i).map_err(|err| {
                VfsError::Malformed(format!("corrupt entry #{i} in zip archive: {err}"))
            })?;

            let raw = entry.name().to_string();

            if raw.split(SEPARATOR).any(|seg| seg == "..") {
                tracing::warn!(target: "vfs", "bad path in zip file: {raw}");
                entries.push(None);
                continue;
            }

            let name = normalize(&raw);

            if name.is_empty() {
                entries.push(None);
                continue;
            }

            if name != raw.trim_end_matches(SEPARATOR) {
                pathmap.insert(name.clone(), i);
            }

            register_entry(&mut dirs, &name, entry.is_dir());

            entries.push(Some(EntryMeta {
                name,
                is_dir: entry.is_dir(),
                size: entry.size(),
                compressed_size: entry.compressed_size(),
                data_start: entry.data_start(),
                method: entry.compression(),
            }));
        }

        drop(archive);

        Ok(Node::new(ZipNode {
            shared: Arc::new(Shared {
                source,
                entries,
                pathmap,
                dirs,
                handles,
            }),
            path: String::new(),
            kind: Kind::Dir,
        }))
    }

    fn entry_node(&self, index: usize, meta: &EntryMeta) -> Node {
        Node::new(ZipNode {
            shared: Arc::clone(&self.shared),
            path: meta.name.clone(),
            kind: if meta.is_dir { Kind::Dir } else { Kind::File(index) },
        })
    }

    fn resolve(&self, full: &str) -> VfsResult<Node> {
        let shared = &self.shared;

        if let Some(&index) = shared.pathmap.get(full) {
            if let Some(meta) = shared.entries[index].as_ref() {
                return Ok(self.entry_node(index, meta));
            }
        }

        let handle = shared.handles.acquire(|| shared.open_archive())?;
        let found = {
            let archive = handle.lock();
            archive
                .index_for_name(full)
                .or_else(|| archive.index_for_name(&format!("{full}{SEPARATOR}")))
        };

        if let Some(index) = found {
            if let Some(meta) = shared.entries[index].as_ref() {
                return Ok(self.entry_node(index, meta));
            }
        }

        if shared.dirs.contains_key(full) {
            return Ok(Node::new(ZipNode {
                shared: Arc::clone(shared),
                path: full.to_string(),
                kind: Kind::Dir,
            }));
        }

        Err(VfsError::NotFound(full.to_string()))
    }
}

impl VfsNodeImpl for ZipNode {
    fn repr(&self) -> String {
        let archive = format!("zip archive {}", self.shared.source.repr(false));

        if self.path.is_empty() {
            return archive;
        }

        let kind = match self.kind {
            Kind::Dir => "directory",
            Kind::File(_) => "file",
        };
        format!("{kind} '{}' in {archive}", self.path)
    }

    fn query(&self) -> VfsInfo {
        VfsInfo {
            exists: true,
            is_dir: matches!(self.kind, Kind::Dir),
            is_readonly: true,
            error: false,
        }
    }

    fn locate(&self, path: &str) -> VfsResult<Node> {
        let full = if self.path.is_empty() {
            normalize(path)
        } else {
            normalize(&format!("{}{SEPARATOR}{path}", self.path))
        };

        self.resolve(&full)
    }

    fn open(&self, mode: OpenMode) -> VfsResult<Box<dyn VfsStream>> {
        if mode.is_write() {
            return Err(VfsError::ReadOnly);
        }

        let Kind::File(index) = self.kind else {
            return Err(VfsError::IsDirectory(self.path.clone()));
        };

        let meta = self.shared.entries[index]
            .as_ref()
            .ok_or_else(|| VfsError::Malformed(format!("no metadata for entry #{index}")))?;

        if mode.contains(OpenMode::SEEKABLE) && meta.method != CompressionMethod::Stored {
            tracing::warn!(
                target: "vfs",
                "opening compressed file '{}' in seekable mode, this is suboptimal; \
                 consider storing this file without compression",
                meta.name
            );
        }

        let raw = self.shared.source.open(OpenMode::READ | OpenMode::SEEKABLE)?;
        let window = Window::new(raw, meta.data_start, meta.compressed_size)
            .map_err(|err| VfsError::backend("seeking to zip entry data", err))?;

        match meta.method {
            CompressionMethod::Stored => Ok(Box::new(window)),
            CompressionMethod::Deflated => Ok(Box::new(DeflateEntry::new(window, meta.size))),
            other => Err(VfsError::Malformed(format!(
                "unsupported compression method {other} for '{}'",
                meta.name
            ))),
        }
    }

    fn iter(&self) -> VfsResult<DirIter> {
        if let Kind::File(_) = self.kind {
            return Err(VfsError::NotDirectory(self.path.clone()));
        }

        let children = self
            .shared
            .dirs
            .get(&self.path)
            .cloned()
            .unwrap_or_default();

        Ok(DirIter::new(children.into_iter()))
    }

    fn syspath(&self) -> VfsResult<PathBuf> {
        let base = self.shared.source.syspath()?;

        if self.path.is_empty() {
            Ok(base)
        } else {
            Ok(base.join(&self.path))
        }
    }
}
