//! Per-thread handle pool.
//!
//! The ZIP reader keeps a read position inside the archive stream, so a
//! single shared handle would let concurrent readers clobber each other.
//! Each thread gets its own lazily created handle instead, keyed by thread
//! identity. Node logic never touches thread-local storage; teardown is
//! deterministic and happens when the pool (and with it the owning node)
//! drops.

use std::collections::HashMap;
use std::sync::Arc;
use std::thread::{self, ThreadId};

use parking_lot::Mutex;

use vfs_core::VfsResult;

pub struct ThreadHandles<T> {
    slots: Mutex<HashMap<ThreadId, Arc<Mutex<T>>>>,
}

impl<T> ThreadHandles<T> {
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Fetch the calling thread's handle, creating it with `init` on first
    /// use. `init` runs outside the pool lock.
    pub fn acquire(&self, init: impl FnOnce() -> VfsResult<T>) -> VfsResult<Arc<Mutex<T>>> {
        let id = thread::current().id();

        if let Some(handle) = self.slots.lock().get(&id) {
            return Ok(Arc::clone(handle));
        }

        let handle = Arc::new(Mutex::new(init()?));
        // no race on the entry: only this thread inserts under this id
        self.slots.lock().insert(id, Arc::clone(&handle));
        Ok(handle)
    }
}

impl<T> Default for ThreadHandles<T> {
    fn default() -> Self {
        Self::new()
    }
}
