//! Union node: presents several subtrees as one, the most recently
//! mounted member taking priority for conflicting children and content.

use std::collections::HashSet;
use std::path::PathBuf;

use parking_lot::Mutex;

use vfs_core::{
    DirIter, Node, OpenMode, Vfs, VfsError, VfsInfo, VfsNodeImpl, VfsResult, VfsStream,
};

/// Merged view over N member subtrees. The member list grows at the back;
/// the last element is the primary (most recently mounted, wins conflicts).
#[derive(Default)]
pub struct Union {
    members: Mutex<Vec<Node>>,
}

impl Union {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_node() -> Node {
        Node::new(Self::new())
    }

    fn from_members(members: Vec<Node>) -> Self {
        Self {
            members: Mutex::new(members),
        }
    }

    fn primary(&self) -> VfsResult<Node> {
        self.members
            .lock()
            .last()
            .cloned()
            .ok_or_else(|| VfsError::Malformed("union has no members".into()))
    }
}

impl VfsNodeImpl for Union {
    fn repr(&self) -> String {
        let members = self.members.lock();
        let list: Vec<String> = members.iter().map(|m| m.repr(false)).collect();
        format!("union: {}", list.join(", "))
    }

    fn query(&self) -> VfsInfo {
        match self.primary() {
            Ok(primary) => {
                let mut info = primary.query();
                // can't trust the primary here, other members might be writable
                info.is_readonly = false;
                info
            }
            Err(_) => VfsInfo::ERROR,
        }
    }

    /// Walk every member in mount order, collecting matches; the last
    /// match collected wins ties. Multiple directory matches merge into a
    /// fresh transient union; a single match, or a non-directory primary,
    /// is returned directly to avoid useless wrapper layers.
    fn locate(&self, path: &str) -> VfsResult<Node> {
        let members: Vec<Node> = self.members.lock().clone();

        let mut found: Vec<Node> = Vec::new();
        let mut primary_info = VfsInfo::ERROR;

        for member in &members {
            if let Ok(node) = member.locate(path) {
                let info = node.query();
                if info.exists {
                    found.push(node);
                    primary_info = info;
                }
            }
        }

        let Some(primary) = found.pop() else {
            return Err(VfsError::NotFound(path.to_string()));
        };

        if found.is_empty() || !primary_info.is_dir {
            return Ok(primary);
        }

        found.push(primary);
        Ok(Node::new(Union::from_members(found)))
    }

    fn iter(&self) -> VfsResult<DirIter> {
        // newest member first, so its names take precedence in the listing
        let members: Vec<Node> = self.members.lock().iter().rev().cloned().collect();
        Ok(DirIter::new(UnionIter {
            members: members.into_iter(),
            current: None,
            seen: HashSet::new(),
        }))
    }

    fn mount(&self, name: Option<&str>, node: Node) -> VfsResult<()> {
        if let Some(name) = name {
            return Err(VfsError::Malformed(format!(
                "attempted to use a named mountpoint '{name}' on a union"
            )));
        }

        let info = node.query();

        if !info.exists {
            return Err(VfsError::Malformed(format!(
                "mountee doesn't represent a usable resource: {}",
                node.repr(true)
            )));
        }

        if !info.is_dir {
            return Err(VfsError::NotDirectory(node.repr(true)));
        }

        self.members.lock().push(node);
        Ok(())
    }

    fn open(&self, mode: OpenMode) -> VfsResult<Box<dyn VfsStream>> {
        self.primary()?.open(mode)
    }

    fn mkdir(&self, name: Option<&str>) -> VfsResult<()> {
        self.primary()?.mkdir(name)
    }

    fn syspath(&self) -> VfsResult<PathBuf> {
        self.primary()?.syspath()
    }
}

struct UnionIter {
    members: std::vec::IntoIter<Node>,
    current: Option<DirIter>,
    seen: HashSet<String>,
}

impl Iterator for UnionIter {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        loop {
            let Some(current) = self.current.as_mut() else {
                let member = self.members.next()?;
                self.current = Some(member.iter().unwrap_or_else(|_| DirIter::empty()));
                continue;
            };

            match current.next() {
                Some(name) => {
                    if self.seen.insert(name.clone()) {
                        return Some(name);
                    }
                }
                None => self.current = None,
            }
        }
    }
}

/// Mount a fresh, empty union node at `mountpoint`.
pub fn create_union_mountpoint(vfs: &Vfs, mountpoint: &str) -> VfsResult<()> {
    vfs.mount(mountpoint, Union::new_node())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use vfs_mem::{MemFile, VDir};

    fn read_all(node: &Node) -> Vec<u8> {
        let mut out = Vec::new();
        node.open(OpenMode::READ)
            .unwrap()
            .read_to_end(&mut out)
            .unwrap();
        out
    }

    fn vdir_with(entries: &[(&str, &[u8])]) -> Node {
        let dir = VDir::new_node();
        for (name, contents) in entries {
            dir.mount(Some(name), MemFile::new_node(contents.to_vec()))
                .unwrap();
        }
        dir
    }

    #[test]
    fn last_mount_wins_for_files() {
        let union = Union::new_node();
        let a = vdir_with(&[("f", b"from-a")]);
        let b = vdir_with(&[("f", b"from-b")]);

        union.mount(None, a.clone()).unwrap();
        union.mount(None, b.clone()).unwrap();
        assert_eq!(read_all(&union.locate("f").unwrap()), b"from-b");

        // removing the file from the later member reverts visibility
        b.unmount("f").unwrap();
        assert_eq!(read_all(&union.locate("f").unwrap()), b"from-a");
    }

    #[test]
    fn mount_rejects_files_names_and_missing_nodes() {
        let union = Union::new_node();

        assert!(union
            .mount(Some("x"), vdir_with(&[]))
            .is_err());
        assert!(union
            .mount(None, MemFile::new_node(Vec::new()))
            .is_err());
        // a fresh union has no members, queries as nonexistent, and is
        // therefore not mountable into another union
        assert!(union.mount(None, Union::new_node()).is_err());
    }

    #[test]
    fn empty_union_queries_as_error() {
        let union = Union::new_node();
        assert!(union.query().error);
        assert!(union.open(OpenMode::READ).is_err());
    }

    #[test]
    fn single_match_collapses_to_the_member_node() {
        let union = Union::new_node();
        let a = VDir::new_node();
        a.mkdir(Some("only")).unwrap();
        union.mount(None, a).unwrap();
        union.mount(None, vdir_with(&[("f", b"x")])).unwrap();

        let only = union.locate("only").unwrap();
        assert!(!only.is_impl::<Union>(), "needless wrapper not collapsed");
    }

    #[test]
    fn directory_matches_merge_recursively() {
        let union = Union::new_node();

        let a = VDir::new_node();
        a.mkdir(Some("sub")).unwrap();
        a.locate("sub")
            .unwrap()
            .mount(Some("a.txt"), MemFile::new_node(b"a".to_vec()))
            .unwrap();

        let b = VDir::new_node();
        b.mkdir(Some("sub")).unwrap();
        b.locate("sub")
            .unwrap()
            .mount(Some("b.txt"), MemFile::new_node(b"b".to_vec()))
            .unwrap();

        union.mount(None, a).unwrap();
        union.mount(None, b).unwrap();

        let sub = union.locate("sub").unwrap();
        assert!(sub.is_impl::<Union>());
        assert_eq!(read_all(&sub.locate("a.txt").unwrap()), b"a");
        assert_eq!(read_all(&sub.locate("b.txt").unwrap()), b"b");
        assert_eq!(read_all(&union.locate("sub/a.txt").unwrap()), b"a");
    }

    #[test]
    fn iter_deduplicates_and_prefers_newest() {
        let union = Union::new_node();
        union
            .mount(None, vdir_with(&[("f", b""), ("old", b"")]))
            .unwrap();
        union
            .mount(None, vdir_with(&[("f", b""), ("new", b"")]))
            .unwrap();

        let names: Vec<String> = union.iter().unwrap().collect();
        assert_eq!(names.iter().filter(|n| *n == "f").count(), 1);
        // newest member's entries come first
        let pos_new = names.iter().position(|n| n == "new").unwrap();
        let pos_old = names.iter().position(|n| n == "old").unwrap();
        assert!(pos_new < pos_old);
    }

    #[test]
    fn query_forces_writable() {
        let union = Union::new_node();
        union.mount(None, vdir_with(&[])).unwrap();
        let info = union.query();
        assert!(info.exists && info.is_dir && !info.is_readonly);
    }
}
