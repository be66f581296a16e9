//! The `Vfs` context: root node, shutdown hooks and the public facade.

use std::cmp::Ordering;

use parking_lot::Mutex;

use crate::error::{record_error, VfsError, VfsResult};
use crate::flags::OpenMode;
use crate::info::VfsInfo;
use crate::node::{DirIter, Node};
use crate::path::{normalize, split_right, SEPARATOR};
use crate::stream::VfsStream;

type ShutdownHook = Box<dyn FnOnce() + Send>;

/// An explicit VFS instance: a root node plus process-lifecycle hooks.
///
/// All paths taken by the facade are normalized before resolution. Every
/// failure is also recorded in the thread-local slot readable through
/// [`Vfs::last_error`].
///
/// Structural mutations (`mount`/`unmount`/`mkdir`) are not synchronized
/// against concurrent readers; callers mutate the mount graph only during
/// single-threaded setup and teardown phases.
pub struct Vfs {
    root: Node,
    shutdown_hooks: Mutex<Vec<ShutdownHook>>,
}

impl Vfs {
    /// Create a VFS rooted at `root` (typically an empty virtual directory).
    pub fn new(root: Node) -> Self {
        Self {
            root,
            shutdown_hooks: Mutex::new(Vec::new()),
        }
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    /// Register a teardown callback. Hooks run in reverse registration
    /// order when the VFS shuts down, so later-initialized state unwinds
    /// first.
    pub fn on_shutdown(&self, hook: impl FnOnce() + Send + 'static) {
        self.shutdown_hooks.lock().push(Box::new(hook));
    }

    /// Run pending shutdown hooks. Also invoked by `Drop`.
    pub fn shutdown(&self) {
        let mut hooks = std::mem::take(&mut *self.shutdown_hooks.lock());
        while let Some(hook) = hooks.pop() {
            hook();
        }
    }

    /// The message of the most recent failure on this thread.
    pub fn last_error(&self) -> String {
        crate::error::last_error()
    }

    fn track<T>(&self, result: VfsResult<T>) -> VfsResult<T> {
        if let Err(err) = &result {
            record_error(err);
        }
        result
    }

    /// Open the file at `path`.
    pub fn open(&self, path: &str, mode: OpenMode) -> VfsResult<Box<dyn VfsStream>> {
        let path = normalize(path);
        self.track(
            self.root
                .locate(&path)
                .and_then(|node| node.open(mode))
                .map_err(|err| at_path(err, &path)),
        )
    }

    /// Describe the node at `path`. A path that doesn't resolve at all
    /// yields an error-flagged info.
    pub fn query(&self, path: &str) -> VfsInfo {
        let path = normalize(path);
        match self.root.locate(&path) {
            Ok(node) => node.query(),
            Err(err) => {
                record_error(&at_path(err, &path));
                VfsInfo::ERROR
            }
        }
    }

    /// Mount `node` at `mountpoint`. If the mountpoint already exists, a
    /// merge (`mount(None, ..)`) with the existing node is attempted;
    /// otherwise the parent gets a new named child.
    pub fn mount(&self, mountpoint: &str, node: Node) -> VfsResult<()> {
        let mountpoint = normalize(mountpoint);

        if let Ok(existing) = self.root.locate(&mountpoint) {
            return self.track(existing.mount(None, node).map_err(|err| {
                VfsError::Malformed(format!(
                    "mountpoint '{mountpoint}' already exists and cannot merge: {err}"
                ))
            }));
        }

        let (parent, name) = split_right(&mountpoint);
        self.track(
            self.root
                .locate(parent)
                .and_then(|parent_node| parent_node.mount(Some(name), node))
                .map_err(|err| {
                    VfsError::Malformed(format!(
                        "can't mount '{mountpoint}' under '{parent}': {err}"
                    ))
                }),
        )
    }

    /// Detach the node mounted at `path` from its parent.
    pub fn unmount(&self, path: &str) -> VfsResult<()> {
        let path = normalize(path);
        let (parent, name) = split_right(&path);
        self.track(
            self.root
                .locate(parent)
                .and_then(|parent_node| parent_node.unmount(name))
                .map_err(|err| at_path(err, &path)),
        )
    }

    /// Create the directory at `path`. Tries the node at the exact path
    /// first (self-creation), then falls back to asking the parent for a
    /// named subdirectory.
    pub fn mkdir(&self, path: &str) -> VfsResult<()> {
        let path = normalize(path);

        if let Ok(node) = self.root.locate(&path) {
            if node.mkdir(None).is_ok() {
                return Ok(());
            }
        }

        let (parent, name) = split_right(&path);
        self.track(
            self.root
                .locate(parent)
                .and_then(|parent_node| parent_node.mkdir(Some(name)))
                .map_err(|err| at_path(err, &path)),
        )
    }

    /// Open a directory for iteration.
    pub fn dir_open(&self, path: &str) -> VfsResult<VfsDir> {
        let path = normalize(path);
        self.track((|| {
            let node = self.root.locate(&path).map_err(|err| at_path(err, &path))?;

            if !node.query().is_dir {
                return Err(VfsError::NotDirectory(path.clone()));
            }

            let iter = node.iter()?;
            Ok(VfsDir { _node: node, iter })
        })())
    }

    /// Snapshot of a directory's entries, filtered and sorted.
    pub fn dir_list_sorted(
        &self,
        path: &str,
        filter: impl Fn(&str) -> bool,
        cmp: impl Fn(&str, &str) -> Ordering,
    ) -> VfsResult<Vec<String>> {
        let dir = self.dir_open(path)?;
        let mut entries: Vec<String> = dir.filter(|name| filter(name)).collect();
        entries.sort_by(|a, b| cmp(a, b));
        Ok(entries)
    }

    /// Diagnostic representation of the node at `path`.
    pub fn repr(&self, path: &str, try_syspath: bool) -> VfsResult<String> {
        let path = normalize(path);
        self.track(
            self.root
                .locate(&path)
                .map(|node| node.repr(try_syspath))
                .map_err(|err| at_path(err, &path)),
        )
    }

    /// Recursively dump the subtree at `path` for diagnostics.
    pub fn print_tree(&self, dest: &mut dyn std::io::Write, path: &str) -> VfsResult<()> {
        let path = normalize(path);
        let node = self.track(
            self.root
                .locate(&path)
                .map_err(|err| at_path(err, &path)),
        )?;

        let (prefix, name) = split_right(&path);
        let mut prefix = prefix.to_string();
        if !prefix.is_empty() {
            prefix.push(SEPARATOR);
        }

        print_tree_recurse(dest, &node, &prefix, name).map_err(VfsError::from)
    }
}

impl Drop for Vfs {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn at_path(err: VfsError, path: &str) -> VfsError {
    match err {
        VfsError::Unsupported(what) => {
            VfsError::Malformed(format!("node '{path}' doesn't support {what}"))
        }
        VfsError::NotFound(_) => VfsError::NotFound(path.to_string()),
        other => other,
    }
}

fn print_tree_recurse(
    dest: &mut dyn std::io::Write,
    node: &Node,
    prefix: &str,
    name: &str,
) -> std::io::Result<()> {
    let is_dir = node.query().is_dir;
    let label = format!("{prefix}{name}{}", if is_dir { "/" } else { "" });

    writeln!(dest, "{} = {}", label, node.repr(false))?;

    if !is_dir {
        return Ok(());
    }

    if let Ok(entries) = node.iter() {
        for entry in entries {
            if let Ok(child) = node.locate(&entry) {
                print_tree_recurse(dest, &child, &label, &entry)?;
            }
        }
    }

    Ok(())
}

/// Open directory handle; iterates entry names. Dropping it closes the
/// underlying cursor.
pub struct VfsDir {
    _node: Node,
    iter: DirIter,
}

impl VfsDir {
    /// Cursor-style read, equivalent to `Iterator::next`.
    pub fn read(&mut self) -> Option<String> {
        self.iter.next()
    }
}

impl Iterator for VfsDir {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        self.iter.next()
    }
}
