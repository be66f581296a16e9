//! Core of the virtual filesystem: the node handle and capability trait,
//! path utilities, stream traits and the public [`Vfs`] facade.
//!
//! Backends (in-memory directories, unions, wrappers, archives, real
//! directories) live in sibling crates and plug in by implementing
//! [`VfsNodeImpl`].

mod error;
mod flags;
mod fs;
mod info;
mod node;
pub mod path;
mod stream;

pub use error::{last_error, record_error, VfsError, VfsResult};
pub use flags::OpenMode;
pub use fs::{Vfs, VfsDir};
pub use info::VfsInfo;
pub use node::{AsAny, DirIter, Node, VfsNodeImpl, WeakNode};
pub use stream::{ReadOnlyStream, VfsStream};
