//! Per-path mutation locks.
//!
//! Two mutations touching the same path never run at once; mutations on
//! different paths proceed in parallel. Paths are keyed by
//! [`path_key`](crate::scanner::path_utils::path_key), so `A.JPG` and
//! `a.jpg` share a lock where the filesystem treats them as one file.

use std::collections::HashSet;
use std::path::Path;
use std::sync::{Condvar, Mutex, OnceLock, PoisonError};

use crate::scanner::path_utils::path_key;

/// A registry of the paths currently being mutated.
#[derive(Debug, Default)]
pub struct PathLocks {
    held: Mutex<HashSet<String>>,
    released: Condvar,
}

/// Holds the locks for one mutation until dropped.
#[derive(Debug)]
pub struct PathGuard<'a> {
    owner: &'a PathLocks,
    keys: Vec<String>,
}

static SHARED: OnceLock<PathLocks> = OnceLock::new();

impl PathLocks {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry used by the convenience mutation functions.
    #[must_use]
    pub fn shared() -> &'static PathLocks {
        SHARED.get_or_init(PathLocks::new)
    }

    /// Lock every path in `paths` at once, blocking while any of them is
    /// held by another mutation.
    #[must_use]
    pub fn lock(&self, paths: &[&Path]) -> PathGuard<'_> {
        let mut keys: Vec<String> = paths.iter().map(|p| path_key(p)).collect();
        keys.sort();
        keys.dedup();

        let mut held = self.held.lock().unwrap_or_else(PoisonError::into_inner);
        while keys.iter().any(|k| held.contains(k)) {
            held = self
                .released
                .wait(held)
                .unwrap_or_else(PoisonError::into_inner);
        }
        held.extend(keys.iter().cloned());

        PathGuard { owner: self, keys }
    }

    /// Number of paths currently locked.
    #[must_use]
    pub fn len(&self) -> usize {
        self.held
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether no path is currently locked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Drop for PathGuard<'_> {
    fn drop(&mut self) {
        let mut held = self
            .owner
            .held
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        for key in &self.keys {
            held.remove(key);
        }
        drop(held);
        self.owner.released.notify_all();
    }
}
