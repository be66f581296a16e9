//! The node handle and its capability trait.

use std::any::Any;
use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, Weak};

use crate::error::{VfsError, VfsResult};
use crate::flags::OpenMode;
use crate::info::VfsInfo;
use crate::stream::{ReadOnlyStream, VfsStream};

pub trait AsAny {
    fn as_any(&self) -> &dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Capability table of a node kind.
///
/// `query` and `repr` are mandatory; everything else defaults to an
/// explicit [`VfsError::Unsupported`], so "not all nodes support
/// mount/iter/mkdir" is part of the type instead of a nullable function
/// pointer convention.
///
/// Implementations must be safe for concurrent *read* access once
/// published. Structural mutations (`mount`/`unmount`/`mkdir`) are not
/// synchronized against each other beyond what each kind needs for its own
/// integrity; callers serialize them externally.
pub trait VfsNodeImpl: AsAny + Send + Sync + 'static {
    /// Short human-readable description, embedded in [`Node::repr`] output.
    fn repr(&self) -> String;

    /// Describe the node's current reality. Never fails; if the backend
    /// can't even tell, it returns an error-flagged info.
    fn query(&self) -> VfsInfo;

    /// Resolve a non-empty normalized path relative to this node.
    fn locate(&self, path: &str) -> VfsResult<Node> {
        let _ = path;
        Err(VfsError::Unsupported("subpaths"))
    }

    /// Open the node as a byte stream.
    fn open(&self, mode: OpenMode) -> VfsResult<Box<dyn VfsStream>> {
        let _ = mode;
        Err(VfsError::Unsupported("opening as a file"))
    }

    /// Enumerate child names. Dropping the iterator releases its resources.
    fn iter(&self) -> VfsResult<DirIter> {
        Err(VfsError::Unsupported("iteration"))
    }

    /// Attach a named child (`Some(name)`) or merge with this node (`None`).
    fn mount(&self, name: Option<&str>, node: Node) -> VfsResult<()> {
        let _ = (name, node);
        Err(VfsError::Unsupported("mounting"))
    }

    fn unmount(&self, name: &str) -> VfsResult<()> {
        let _ = name;
        Err(VfsError::Unsupported("unmounting"))
    }

    /// Create a subdirectory (`Some(name)`) or this directory itself
    /// (`None`, used for self-creation semantics).
    fn mkdir(&self, name: Option<&str>) -> VfsResult<()> {
        let _ = name;
        Err(VfsError::Unsupported("directory creation"))
    }

    /// The real operating-system path this node corresponds to, if any.
    fn syspath(&self) -> VfsResult<PathBuf> {
        Err(VfsError::Unsupported("system paths"))
    }
}

/// The uniform, reference-counted handle representing any location in the
/// virtual tree.
///
/// Every edge in the mount graph (parent to child, union member list,
/// wrapper to wrapped) holds one counted reference; cloning increments the
/// count and the kind-specific teardown runs when the last clone drops.
#[derive(Clone)]
pub struct Node {
    imp: Arc<dyn VfsNodeImpl>,
}

impl Node {
    pub fn new(imp: impl VfsNodeImpl) -> Self {
        Self { imp: Arc::new(imp) }
    }

    pub fn downgrade(&self) -> WeakNode {
        WeakNode {
            imp: Arc::downgrade(&self.imp),
        }
    }

    /// True when the node's kind-private state is a `T`.
    pub fn is_impl<T: VfsNodeImpl>(&self) -> bool {
        self.imp.as_ref().as_any().downcast_ref::<T>().is_some()
    }

    pub fn query(&self) -> VfsInfo {
        self.imp.query()
    }

    /// Resolve `path` relative to this node. An empty path returns the node
    /// itself. `path` must already be normalized.
    pub fn locate(&self, path: &str) -> VfsResult<Node> {
        debug_assert_eq!(path, crate::path::normalize(path), "unnormalized path");

        if path.is_empty() {
            return Ok(self.clone());
        }

        self.imp.locate(path)
    }

    /// Open the node as a stream. Read-mode streams from writable nodes are
    /// wrapped in a write-rejecting guard.
    pub fn open(&self, mode: OpenMode) -> VfsResult<Box<dyn VfsStream>> {
        let stream = self.imp.open(mode)?;

        if !mode.is_write() && !self.query().is_readonly {
            return Ok(Box::new(ReadOnlyStream::new(stream)));
        }

        Ok(stream)
    }

    pub fn iter(&self) -> VfsResult<DirIter> {
        self.imp.iter()
    }

    pub fn mount(&self, name: Option<&str>, node: Node) -> VfsResult<()> {
        self.imp.mount(name, node)
    }

    pub fn unmount(&self, name: &str) -> VfsResult<()> {
        self.imp.unmount(name)
    }

    pub fn mkdir(&self, name: Option<&str>) -> VfsResult<()> {
        self.imp.mkdir(name)
    }

    pub fn syspath(&self) -> VfsResult<PathBuf> {
        self.imp.syspath()
    }

    /// Diagnostic representation, never machine-parsed. With `try_syspath`,
    /// a node backed by a real path renders as that path.
    pub fn repr(&self, try_syspath: bool) -> String {
        if try_syspath {
            if let Ok(p) = self.imp.syspath() {
                return p.display().to_string();
            }
        }

        let info = self.imp.query();
        format!(
            "<{} (e:{} x:{} d:{})>",
            self.imp.repr(),
            info.error as u8,
            info.exists as u8,
            info.is_dir as u8
        )
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.repr(false))
    }
}

/// Non-owning node reference; upgrades as long as the graph still holds
/// the node.
#[derive(Clone)]
pub struct WeakNode {
    imp: Weak<dyn VfsNodeImpl>,
}

impl WeakNode {
    pub fn upgrade(&self) -> Option<Node> {
        self.imp.upgrade().map(|imp| Node { imp })
    }
}

/// Directory entry name iterator. The cursor state lives inside; dropping
/// it is the `iter_stop` of the C-style API.
pub struct DirIter {
    inner: Box<dyn Iterator<Item = String> + Send>,
}

impl DirIter {
    pub fn new(inner: impl Iterator<Item = String> + Send + 'static) -> Self {
        Self {
            inner: Box::new(inner),
        }
    }

    pub fn empty() -> Self {
        Self::new(std::iter::empty())
    }
}

impl Iterator for DirIter {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        self.inner.next()
    }
}
