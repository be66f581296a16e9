//! In-memory nodes: the virtual directory (the mount-point substrate) and
//! a simple shared-buffer file used for synthetic mounts and tests.

mod file;
mod vdir;

pub use file::MemFile;
pub use vdir::VDir;
