//! Resource index: a compiled-in directory/file table bound to a pluggable
//! content backend.
//!
//! The tree shape lives in static tables, typically generated at build time.
//! Directory entries address their children by offset and count into the
//! same tables; file entries carry an opaque content id that the backend
//! turns into a byte stream on demand. The whole subtree is read-only by
//! construction.

use std::sync::Arc;

use vfs_core::path::split_left;
use vfs_core::{
    DirIter, Node, OpenMode, VfsError, VfsInfo, VfsNodeImpl, VfsResult, VfsStream,
};

/// One directory in the index. `dirs[0]` is the unnamed root.
#[derive(Debug, Clone, Copy)]
pub struct RIdxDirEntry {
    pub name: Option<&'static str>,
    pub subdirs_ofs: usize,
    pub subdirs_num: usize,
    pub files_ofs: usize,
    pub files_num: usize,
}

/// One file in the index. `content_id` is meaningful only to the backend.
#[derive(Debug, Clone, Copy)]
pub struct RIdxFileEntry {
    pub name: &'static str,
    pub content_id: &'static str,
}

#[derive(Debug, Clone, Copy)]
pub struct ResIndexTables {
    pub dirs: &'static [RIdxDirEntry],
    pub files: &'static [RIdxFileEntry],
}

impl ResIndexTables {
    fn dir_name(&self, dir: &RIdxDirEntry) -> &'static str {
        dir.name.unwrap_or("<root>")
    }

    fn subdir_lookup(&self, parent: &RIdxDirEntry, name: &str) -> Option<usize> {
        let range = parent.subdirs_ofs..parent.subdirs_ofs + parent.subdirs_num;
        range.clone().find(|&i| self.dirs[i].name == Some(name))
    }

    fn file_lookup(&self, parent: &RIdxDirEntry, name: &str) -> Option<usize> {
        let range = parent.files_ofs..parent.files_ofs + parent.files_num;
        range.clone().find(|&i| self.files[i].name == name)
    }
}

/// Fetches content bytes for index file entries. The tree never learns how
/// the bytes are produced.
pub trait ResIndexBackend: Send + Sync + 'static {
    fn open(&self, content_id: &str, mode: OpenMode) -> VfsResult<Box<dyn VfsStream>>;
}

struct Shared {
    tables: ResIndexTables,
    backend: Box<dyn ResIndexBackend>,
}

/// Position of a node within the tables. Directory/file classification is
/// fixed at discovery time.
#[derive(Debug, Clone, Copy)]
enum Entry {
    Dir(usize),
    File(usize),
}

pub struct ResIndex {
    shared: Arc<Shared>,
    entry: Entry,
}

impl ResIndex {
    /// Build the root node over `tables`, with `backend` serving content.
    /// `tables.dirs[0]` must be the unnamed root directory.
    pub fn create(tables: ResIndexTables, backend: impl ResIndexBackend) -> Node {
        debug_assert!(!tables.dirs.is_empty() && tables.dirs[0].name.is_none());

        Node::new(ResIndex {
            shared: Arc::new(Shared {
                tables,
                backend: Box::new(backend),
            }),
            entry: Entry::Dir(0),
        })
    }

    fn child(&self, entry: Entry) -> Node {
        Node::new(ResIndex {
            shared: Arc::clone(&self.shared),
            entry,
        })
    }
}

impl VfsNodeImpl for ResIndex {
    fn repr(&self) -> String {
        let tables = &self.shared.tables;
        match self.entry {
            Entry::Dir(i) => format!(
                "resource index directory #{i} ({})",
                tables.dir_name(&tables.dirs[i])
            ),
            Entry::File(i) => {
                let f = &tables.files[i];
                format!("resource index file #{i}: {} ({})", f.content_id, f.name)
            }
        }
    }

    fn query(&self) -> VfsInfo {
        VfsInfo {
            exists: true,
            is_dir: matches!(self.entry, Entry::Dir(_)),
            is_readonly: true,
            error: false,
        }
    }

    fn locate(&self, path: &str) -> VfsResult<Node> {
        let tables = &self.shared.tables;

        let mut dir = match self.entry {
            Entry::Dir(i) => i,
            Entry::File(i) => {
                return Err(VfsError::NotDirectory(tables.files[i].name.to_string()));
            }
        };

        let (mut name, mut rest) = split_left(path);

        loop {
            let parent = &tables.dirs[dir];

            if let Some(i) = tables.subdir_lookup(parent, name) {
                if rest.is_empty() {
                    return Ok(self.child(Entry::Dir(i)));
                }
                dir = i;
                (name, rest) = split_left(rest);
                continue;
            }

            if let Some(i) = tables.file_lookup(parent, name) {
                if rest.is_empty() {
                    return Ok(self.child(Entry::File(i)));
                }
                // non-final component is a file
                return Err(VfsError::NotDirectory(tables.files[i].name.to_string()));
            }

            return Err(VfsError::NotFound(name.to_string()));
        }
    }

    fn open(&self, mode: OpenMode) -> VfsResult<Box<dyn VfsStream>> {
        if mode.is_write() {
            return Err(VfsError::ReadOnly);
        }

        let tables = &self.shared.tables;

        match self.entry {
            Entry::Dir(i) => Err(VfsError::IsDirectory(
                tables.dir_name(&tables.dirs[i]).to_string(),
            )),
            Entry::File(i) => self.shared.backend.open(tables.files[i].content_id, mode),
        }
    }

    /// Subdirectory names first, then file names, in table order.
    fn iter(&self) -> VfsResult<DirIter> {
        let Entry::Dir(i) = self.entry else {
            return Err(VfsError::Unsupported("iteration"));
        };

        let tables = self.shared.tables;
        let dir = tables.dirs[i];

        let subdirs = (dir.subdirs_ofs..dir.subdirs_ofs + dir.subdirs_num)
            .filter_map(move |i| tables.dirs[i].name.map(str::to_string));
        let files = (dir.files_ofs..dir.files_ofs + dir.files_num)
            .map(move |i| tables.files[i].name.to_string());

        Ok(DirIter::new(subdirs.chain(files)))
    }
}
