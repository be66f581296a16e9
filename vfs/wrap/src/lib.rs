//! Thin proxy nodes: read-only views and transparent decompression views.
//!
//! Both hold one reference to a wrapped node and override a narrow slice
//! of behavior, passing everything else through.

mod decompress;
mod readonly;

pub use decompress::{make_decompress_view, wrap_decompress, Decompress, COMPRESSED_SUFFIX};
pub use readonly::{make_readonly, wrap_readonly, ReadOnly};

use vfs_core::path::{normalize, split_right};
use vfs_core::{Node, Vfs, VfsResult};

/// Detach the node at `path`, rewrap it with `wrap`, and remount it under
/// the same name. Shared remount machinery for both wrappers.
fn remount_wrapped(vfs: &Vfs, path: &str, wrap: impl FnOnce(Node) -> Node) -> VfsResult<Node> {
    let path = normalize(path);
    let (parent_path, name) = split_right(&path);

    let parent = vfs.root().locate(parent_path)?;
    let node = parent.locate(name)?;

    parent.unmount(name)?;
    let wrapper = wrap(node);

    if let Err(err) = parent.mount(Some(name), wrapper.clone()) {
        tracing::error!(
            target: "vfs",
            "couldn't remount '{path}', the subtree is now detached: {err}"
        );
        return Err(err);
    }

    Ok(wrapper)
}
