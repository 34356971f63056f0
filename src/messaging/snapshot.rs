// Published snapshots
// The owning engine is the only writer; readers get immutable copies.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

#[derive(Debug)]
struct SharedSnapshot<T> {
    value: RwLock<T>,
    version: AtomicU64,
}

/// Write side, owned by an engine
#[derive(Debug)]
pub struct SnapshotPublisher<T: Clone> {
    shared: Arc<SharedSnapshot<T>>,
}

/// Read side, handed to UI code. Cheap to clone.
#[derive(Debug)]
pub struct SnapshotReader<T: Clone> {
    shared: Arc<SharedSnapshot<T>>,
}

impl<T: Clone> Clone for SnapshotReader<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: Clone> SnapshotPublisher<T> {
    pub fn new(initial: T) -> Self {
        Self {
            shared: Arc::new(SharedSnapshot {
                value: RwLock::new(initial),
                version: AtomicU64::new(0),
            }),
        }
    }

    /// Replace the published value and bump the version
    pub fn publish(&self, value: T) {
        // A poisoned lock still holds a complete value; keep publishing.
        let mut guard = self
            .shared
            .value
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = value;
        self.shared.version.fetch_add(1, Ordering::Release);
    }

    /// Current value, as readers would see it
    pub fn current(&self) -> T {
        self.reader().get()
    }

    pub fn reader(&self) -> SnapshotReader<T> {
        SnapshotReader {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: Clone> SnapshotReader<T> {
    /// Copy of the latest published value
    pub fn get(&self) -> T {
        self.shared
            .value
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Monotonic publish counter; lets subscribers skip redraws
    pub fn version(&self) -> u64 {
        self.shared.version.load(Ordering::Acquire)
    }

    /// Returns the value only if it was published after `seen_version`
    pub fn get_if_newer(&self, seen_version: u64) -> Option<(u64, T)> {
        let version = self.version();
        if version > seen_version {
            Some((version, self.get()))
        } else {
            None
        }
    }
}
