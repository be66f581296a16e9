//! Read-only view over an arbitrary subtree.

use std::path::PathBuf;

use vfs_core::{
    DirIter, Node, OpenMode, ReadOnlyStream, Vfs, VfsError, VfsInfo, VfsNodeImpl, VfsResult,
    VfsStream,
};

use crate::remount_wrapped;

/// Proxy node that forwards reads to the wrapped node and rejects every
/// mutation. Resolved children come back wrapped too, so the protection
/// covers the whole subtree.
pub struct ReadOnly {
    wrapped: Node,
}

impl VfsNodeImpl for ReadOnly {
    fn repr(&self) -> String {
        format!("read-only view of {}", self.wrapped.repr(false))
    }

    fn query(&self) -> VfsInfo {
        let mut info = self.wrapped.query();
        info.is_readonly = true;
        info
    }

    fn locate(&self, path: &str) -> VfsResult<Node> {
        self.wrapped.locate(path).map(wrap_readonly)
    }

    fn open(&self, mode: OpenMode) -> VfsResult<Box<dyn VfsStream>> {
        if mode.is_write() {
            return Err(VfsError::ReadOnly);
        }

        let stream = self.wrapped.open(mode)?;
        Ok(Box::new(ReadOnlyStream::new(stream)))
    }

    fn iter(&self) -> VfsResult<DirIter> {
        self.wrapped.iter()
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

/// Wrap `node` in a read-only view. Nodes that already query as read-only
/// pass through unwrapped.
pub fn wrap_readonly(node: Node) -> Node {
    if node.query().is_readonly {
        return node;
    }

    Node::new(ReadOnly { wrapped: node })
}

/// Replace the node mounted at `path` with a read-only view of itself.
pub fn make_readonly(vfs: &Vfs, path: &str) -> VfsResult<()> {
    remount_wrapped(vfs, path, wrap_readonly)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use vfs_mem::{MemFile, VDir};

    fn sample_tree() -> Node {
        let root = VDir::new_node();
        root.mkdir(Some("sub")).unwrap();
        root.locate("sub")
            .unwrap()
            .mount(Some("f.txt"), MemFile::new_node(b"hello".to_vec()))
            .unwrap();
        root
    }

    #[test]
    fn mutations_are_rejected() {
        let ro = wrap_readonly(sample_tree());

        assert!(matches!(ro.mkdir(Some("x")), Err(VfsError::ReadOnly)));
        assert!(matches!(ro.unmount("sub"), Err(VfsError::ReadOnly)));
        assert!(matches!(
            ro.mount(Some("x"), VDir::new_node()),
            Err(VfsError::ReadOnly)
        ));
    }

    #[test]
    fn protection_extends_to_located_children() {
        let ro = wrap_readonly(sample_tree());

        let sub = ro.locate("sub").unwrap();
        assert!(sub.query().is_readonly);
        assert!(matches!(sub.mkdir(Some("x")), Err(VfsError::ReadOnly)));

        let file = ro.locate("sub/f.txt").unwrap();
        assert!(matches!(
            file.open(OpenMode::WRITE),
            Err(VfsError::ReadOnly)
        ));

        let mut stream = file.open(OpenMode::READ).unwrap();
        let mut out = Vec::new();
        stream.read_to_end(&mut out).unwrap();
        assert_eq!(out, b"hello");
        assert!(stream.write(b"nope").is_err());
    }

    #[test]
    fn already_readonly_nodes_pass_through() {
        let once = wrap_readonly(sample_tree());
        let twice = wrap_readonly(once.clone());
        assert!(twice.is_impl::<ReadOnly>());
        // no second layer was added
        assert_eq!(twice.repr(false), once.repr(false));
    }

    #[test]
    fn make_readonly_replaces_the_mounted_node() {
        let vfs = Vfs::new(VDir::new_node());
        vfs.mkdir("res").unwrap();
        vfs.mount("res/data", sample_tree()).unwrap();

        make_readonly(&vfs, "res/data").unwrap();

        assert!(vfs.query("res/data").is_readonly);
        assert!(vfs.mkdir("res/data/new").is_err());
        assert!(vfs
            .open("res/data/sub/f.txt", OpenMode::READ)
            .is_ok());
    }
}
