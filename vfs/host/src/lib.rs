//! Real-directory backend.
//!
//! A [`HostDir`] node maps a subtree of the virtual filesystem onto a real
//! directory. `locate` always succeeds; whether the underlying path exists
//! is reported by `query`, so callers (and wrappers layered on top) can
//! resolve paths that don't exist yet.

use std::fs;
use std::io;
use std::path::PathBuf;

use vfs_core::path::SEPARATOR;
use vfs_core::{
    DirIter, Node, OpenMode, Vfs, VfsError, VfsInfo, VfsNodeImpl, VfsResult, VfsStream,
};

pub struct HostDir {
    path: PathBuf,
}

impl HostDir {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn new_node(path: impl Into<PathBuf>) -> Node {
        Node::new(Self::new(path))
    }

    /// Translate a normalized VFS path into an OS path under this node.
    fn os_path(&self, path: &str) -> PathBuf {
        path.split(SEPARATOR)
            .fold(self.path.clone(), |acc, seg| acc.join(seg))
    }
}

impl VfsNodeImpl for HostDir {
    fn repr(&self) -> String {
        format!("filesystem path: {}", self.path.display())
    }

    fn query(&self) -> VfsInfo {
        match fs::metadata(&self.path) {
            Ok(meta) => VfsInfo {
                exists: true,
                is_dir: meta.is_dir(),
                is_readonly: false,
                error: false,
            },
            Err(_) => VfsInfo::default(),
        }
    }

    fn locate(&self, path: &str) -> VfsResult<Node> {
        Ok(HostDir::new_node(self.os_path(path)))
    }

    fn open(&self, mode: OpenMode) -> VfsResult<Box<dyn VfsStream>> {
        let mut options = fs::OpenOptions::new();

        if mode.is_write() {
            options
                .read(mode.contains(OpenMode::READ))
                .write(true)
                .create(true)
                .truncate(true);
        } else {
            options.read(true);
        }

        let file = options
            .open(&self.path)
            .map_err(|err| VfsError::backend(self.path.display().to_string(), err))?;

        Ok(Box::new(file))
    }

    fn iter(&self) -> VfsResult<DirIter> {
        let entries = fs::read_dir(&self.path)
            .map_err(|err| VfsError::backend(self.path.display().to_string(), err))?;

        Ok(DirIter::new(entries.filter_map(|entry| {
            entry
                .ok()
                .map(|e| e.file_name().to_string_lossy().into_owned())
        })))
    }

    fn mkdir(&self, name: Option<&str>) -> VfsResult<()> {
        let target = match name {
            Some(name) => self.os_path(name),
            None => self.path.clone(),
        };

        match fs::create_dir(&target) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
                if target.is_dir() {
                    Ok(())
                } else {
                    Err(VfsError::Malformed(format!(
                        "{} already exists, and is not a directory",
                        target.display()
                    )))
                }
            }
            Err(err) => Err(VfsError::backend(
                format!("can't create directory {}", target.display()),
                err,
            )),
        }
    }

    fn syspath(&self) -> VfsResult<PathBuf> {
        Ok(self.path.clone())
    }
}

/// Mount the real directory `fspath` at `mountpoint`, optionally creating
/// the directory first.
pub fn mount_syspath(
    vfs: &Vfs,
    mountpoint: &str,
    fspath: impl Into<PathBuf>,
    mkdir: bool,
) -> VfsResult<()> {
    let node = HostDir::new_node(fspath);

    if mkdir {
        node.mkdir(None)?;
    }

    tracing::info!(target: "vfs", "mounting {} at '{mountpoint}'", node.repr(true));
    vfs.mount(mountpoint, node)
}
