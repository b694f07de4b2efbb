use crate::index::types::IndexSnapshot;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

/// Holder of the active snapshot.
///
/// Readers take a cheap `Arc` clone and keep working on that generation even
/// if a rebuild swaps in a new one meanwhile.
#[derive(Debug, Default)]
pub struct IndexStore {
    active: RwLock<Arc<IndexSnapshot>>,
    generation: AtomicU64,
}

impl IndexStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The snapshot new operations should read
    pub fn load(&self) -> Arc<IndexSnapshot> {
        match self.active.read() {
            Ok(guard) => Arc::clone(&guard),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    /// The active snapshot together with its generation, read under one lock
    pub fn current(&self) -> (Arc<IndexSnapshot>, u64) {
        let guard = match self.active.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        (Arc::clone(&guard), self.generation.load(Ordering::Acquire))
    }

    /// Replace the active snapshot, returning the previous one
    pub fn swap(&self, snapshot: IndexSnapshot) -> Arc<IndexSnapshot> {
        let next = Arc::new(snapshot);
        let mut guard = match self.active.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let previous = std::mem::replace(&mut *guard, next);
        self.generation.fetch_add(1, Ordering::Release);
        previous
    }

    /// Number of swaps performed so far; 0 means nothing has been built
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }
}
