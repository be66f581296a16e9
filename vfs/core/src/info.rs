/// Snapshot of a node's current reality, re-derived on every query.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct VfsInfo {
    pub exists: bool,
    pub is_dir: bool,
    pub is_readonly: bool,
    /// True when the node could not even tell whether it exists.
    /// A file simply not existing on a real filesystem is not an error.
    pub error: bool,
}

impl VfsInfo {
    pub const ERROR: VfsInfo = VfsInfo {
        exists: false,
        is_dir: false,
        is_readonly: false,
        error: true,
    };
}
