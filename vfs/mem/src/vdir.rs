use indexmap::IndexMap;
use parking_lot::Mutex;

use vfs_core::path::split_left;
use vfs_core::{DirIter, Node, VfsError, VfsInfo, VfsNodeImpl, VfsResult};

/// In-memory named-child container. Exists by construction, always a
/// directory, never read-only.
#[derive(Default)]
pub struct VDir {
    children: Mutex<IndexMap<String, Node>>,
}

impl VDir {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_node() -> Node {
        Node::new(Self::new())
    }
}

impl VfsNodeImpl for VDir {
    fn repr(&self) -> String {
        "virtual directory".to_string()
    }

    fn query(&self) -> VfsInfo {
        VfsInfo {
            exists: true,
            is_dir: true,
            is_readonly: false,
            error: false,
        }
    }

    fn locate(&self, path: &str) -> VfsResult<Node> {
        let (name, rest) = split_left(path);

        let child = self
            .children
            .lock()
            .get(name)
            .cloned()
            .ok_or_else(|| VfsError::NotFound(name.to_string()))?;

        child.locate(rest)
    }

    fn iter(&self) -> VfsResult<DirIter> {
        let names: Vec<String> = self.children.lock().keys().cloned().collect();
        Ok(DirIter::new(names.into_iter()))
    }

    fn mount(&self, name: Option<&str>, node: Node) -> VfsResult<()> {
        let Some(name) = name else {
            // merge attempt; that's the union's job
            return Err(VfsError::Unsupported("merging"));
        };

        if name.is_empty() || name.contains('/') {
            return Err(VfsError::Malformed(format!("bad mount name: '{name}'")));
        }

        // last writer wins; the displaced child is released here
        self.children.lock().insert(name.to_string(), node);
        Ok(())
    }

    fn unmount(&self, name: &str) -> VfsResult<()> {
        self.children
            .lock()
            .shift_remove(name)
            .map(drop)
            .ok_or_else(|| VfsError::NotFound(name.to_string()))
    }

    fn mkdir(&self, name: Option<&str>) -> VfsResult<()> {
        let Some(name) = name else {
            // directories exist by construction
            return Ok(());
        };

        let mut children = self.children.lock();

        if let Some(existing) = children.get(name) {
            if existing.query().is_dir {
                return Ok(());
            }
            return Err(VfsError::NotDirectory(name.to_string()));
        }

        children.insert(name.to_string(), VDir::new_node());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemFile;
    use vfs_core::OpenMode;

    #[test]
    fn locate_recurses_one_level_at_a_time() {
        let root = VDir::new_node();
        root.mkdir(Some("a")).unwrap();
        let a = root.locate("a").unwrap();
        a.mount(Some("f"), MemFile::new_node(b"hi".to_vec())).unwrap();

        assert!(root.locate("a/f").is_ok());
        assert!(matches!(root.locate("a/g"), Err(VfsError::NotFound(_))));
        assert!(matches!(root.locate("b/f"), Err(VfsError::NotFound(_))));
    }

    #[test]
    fn mount_replaces_existing_child() {
        let root = VDir::new_node();
        let old = MemFile::new_node(b"old".to_vec());
        let weak = old.downgrade();

        root.mount(Some("f"), old).unwrap();
        root.mount(Some("f"), MemFile::new_node(b"new".to_vec()))
            .unwrap();

        assert!(weak.upgrade().is_none(), "displaced child must be released");

        let mut stream = root.locate("f").unwrap().open(OpenMode::READ).unwrap();
        let mut out = Vec::new();
        std::io::Read::read_to_end(&mut stream, &mut out).unwrap();
        assert_eq!(out, b"new");
    }

    #[test]
    fn unmount_fails_when_absent() {
        let root = VDir::new_node();
        assert!(matches!(root.unmount("x"), Err(VfsError::NotFound(_))));

        root.mkdir(Some("x")).unwrap();
        root.unmount("x").unwrap();
        assert!(root.locate("x").is_err());
    }

    #[test]
    fn mkdir_is_idempotent_for_directories_only() {
        let root = VDir::new_node();
        root.mkdir(None).unwrap();
        root.mkdir(Some("d")).unwrap();
        root.mkdir(Some("d")).unwrap();

        root.mount(Some("f"), MemFile::new_node(Vec::new())).unwrap();
        assert!(matches!(
            root.mkdir(Some("f")),
            Err(VfsError::NotDirectory(_))
        ));
    }

    #[test]
    fn iter_lists_children() {
        let root = VDir::new_node();
        root.mkdir(Some("a")).unwrap();
        root.mkdir(Some("b")).unwrap();

        let mut names: Vec<String> = root.iter().unwrap().collect();
        names.sort();
        assert_eq!(names, ["a", "b"]);
    }
}
