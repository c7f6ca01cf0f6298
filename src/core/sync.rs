//! Synchronisation utilities
//!
//! Poison-tolerant lock helpers plus per-name async locks used to serialise
//! get-or-create sequences against the remote platform.

use std::collections::HashMap;
use std::sync::{Arc, LockResult, Mutex};

/// Convert a poisoned lock result into an application error
///
/// # Examples
/// ```
/// use std::sync::Mutex;
/// use scanwrap::core::sync::handle_mutex_poison;
///
/// let mutex = Mutex::new(42);
/// let guard = handle_mutex_poison(mutex.lock(), |msg| msg).unwrap();
/// assert_eq!(*guard, 42);
/// ```
pub fn handle_mutex_poison<T, E>(
    result: LockResult<T>,
    error_constructor: impl FnOnce(String) -> E,
) -> Result<T, E> {
    result.map_err(|poison_err| {
        error_constructor(format!(
            "Internal synchronisation error (mutex poisoned). PoisonError: {:?}",
            poison_err
        ))
    })
}

/// Per-name async locks
///
/// Holding the guard for a name guarantees no other task in this process runs
/// a guarded section for the same name concurrently. Entries are dropped once
/// no task holds or waits on them.
#[derive(Debug, Default, Clone)]
pub struct NameLocks {
    locks: Arc<Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>>,
}

/// Guard returned by [`NameLocks::acquire`]
pub struct NameGuard {
    name: String,
    locks: Arc<Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>>,
    guard: Option<tokio::sync::OwnedMutexGuard<()>>,
}

impl NameLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive use of `name`
    pub async fn acquire(&self, name: &str) -> NameGuard {
        let lock = {
            let mut locks = self
                .locks
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            locks
                .entry(name.to_string())
                .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
                .clone()
        };

        let guard = lock.lock_owned().await;
        NameGuard {
            name: name.to_string(),
            locks: self.locks.clone(),
            guard: Some(guard),
        }
    }

    /// Number of names currently tracked
    #[cfg(test)]
    pub(crate) fn tracked(&self) -> usize {
        self.locks
            .lock()
            .map(|locks| locks.len())
            .unwrap_or_default()
    }
}

impl Drop for NameGuard {
    fn drop(&mut self) {
        self.guard.take();
        let mut locks = self
            .locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        // Only the map itself still references an idle lock
        let idle = locks
            .get(&self.name)
            .is_some_and(|lock| Arc::strong_count(lock) == 1);
        if idle {
            locks.remove(&self.name);
        }
    }
}
