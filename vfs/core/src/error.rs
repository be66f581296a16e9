//! Error type and the thread-local last-error slot.

use std::cell::RefCell;
use std::io;

use thiserror::Error;

pub type VfsResult<T> = Result<T, VfsError>;

/// Error type for every fallible VFS operation.
///
/// Nothing here is fatal to the process; callers decide whether a failure
/// matters (a missing required mount usually does, a missing optional
/// resource usually doesn't).
#[derive(Debug, Error)]
pub enum VfsError {
    /// No node resolves the path.
    #[error("no such file or directory: {0}")]
    NotFound(String),
    /// The operation requires a directory and got something else.
    #[error("not a directory: {0}")]
    NotDirectory(String),
    /// The operation requires a file and got a directory.
    #[error("is a directory: {0}")]
    IsDirectory(String),
    /// Write attempted through a read-only view.
    #[error("read-only filesystem")]
    ReadOnly,
    /// The node kind doesn't implement this operation at all.
    #[error("node doesn't support {0}")]
    Unsupported(&'static str),
    /// Malformed input: bad subpath, bad compression method, corrupt archive.
    #[error("{0}")]
    Malformed(String),
    /// An OS or library call failed; wraps the underlying error text.
    #[error("{context}: {source}")]
    Backend {
        context: String,
        #[source]
        source: io::Error,
    },
}

impl VfsError {
    pub fn backend(context: impl Into<String>, source: io::Error) -> Self {
        VfsError::Backend {
            context: context.into(),
            source,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, VfsError::NotFound(_))
            || matches!(self, VfsError::Backend { source, .. }
                if source.kind() == io::ErrorKind::NotFound)
    }
}

impl From<io::Error> for VfsError {
    fn from(err: io::Error) -> Self {
        VfsError::backend("io error", err)
    }
}

thread_local! {
    static LAST_ERROR: RefCell<Option<String>> = const { RefCell::new(None) };
}

/// Record an error message in the thread-local slot.
///
/// The slot is overwritten by the next recorded failure; it is a diagnostic
/// aid, not a log. The [`Vfs`](crate::Vfs) facade records every failure it
/// returns.
pub fn record_error(err: &VfsError) {
    let msg = err.to_string();
    tracing::debug!(target: "vfs", "{msg}");
    LAST_ERROR.with(|slot| *slot.borrow_mut() = Some(msg));
}

/// The message recorded by the most recent failed operation on this thread,
/// or `"No error"` if nothing failed yet.
pub fn last_error() -> String {
    LAST_ERROR.with(|slot| {
        slot.borrow()
            .clone()
            .unwrap_or_else(|| "No error".to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_error_defaults_to_no_error() {
        std::thread::spawn(|| assert_eq!(last_error(), "No error"))
            .join()
            .unwrap();
    }

    #[test]
    fn record_error_overwrites_previous_message() {
        record_error(&VfsError::ReadOnly);
        assert_eq!(last_error(), "read-only filesystem");
        record_error(&VfsError::NotFound("a/b".into()));
        assert_eq!(last_error(), "no such file or directory: a/b");
    }

    #[test]
    fn error_slot_is_per_thread() {
        record_error(&VfsError::ReadOnly);
        std::thread::spawn(|| assert_eq!(last_error(), "No error"))
            .join()
            .unwrap();
        assert_eq!(last_error(), "read-only filesystem");
    }
}
