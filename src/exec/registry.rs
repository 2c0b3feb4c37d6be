// src/exec/registry.rs

//! The runner's table of live children.
//!
//! Entries are inserted by `launch` after a successful spawn and removed by
//! the worker right before it publishes the completion result.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Local};
use tokio::sync::watch;

use super::HandleId;

/// Snapshot of one running child, as returned by
/// [`ProcessRunner::active`](super::ProcessRunner::active).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveProcess {
    pub id: HandleId,
    pub pid: Option<u32>,
    pub program: PathBuf,
    pub started_at: DateTime<Local>,
}

#[derive(Debug)]
struct Entry {
    info: ActiveProcess,
    cancel: Arc<watch::Sender<bool>>,
}

#[derive(Debug, Default)]
pub(crate) struct Registry {
    next_id: AtomicU64,
    entries: Mutex<HashMap<HandleId, Entry>>,
}

impl Registry {
    pub(crate) fn next_id(&self) -> HandleId {
        HandleId::new(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    pub(crate) fn insert(&self, info: ActiveProcess, cancel: Arc<watch::Sender<bool>>) {
        self.lock().insert(info.id, Entry { info, cancel });
    }

    pub(crate) fn remove(&self, id: HandleId) {
        self.lock().remove(&id);
    }

    pub(crate) fn contains(&self, id: HandleId) -> bool {
        self.lock().contains_key(&id)
    }

    pub(crate) fn snapshot(&self) -> Vec<ActiveProcess> {
        let mut list: Vec<_> = self.lock().values().map(|e| e.info.clone()).collect();
        list.sort_by_key(|p| p.id);
        list
    }

    pub(crate) fn cancel(&self, id: HandleId) -> bool {
        self.lock()
            .get(&id)
            .map(|entry| request_cancel(&entry.cancel))
            .unwrap_or(false)
    }

    pub(crate) fn cancel_all(&self) -> usize {
        self.lock()
            .values()
            .filter(|entry| request_cancel(&entry.cancel))
            .count()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<HandleId, Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Flip the cancel flag once. Returns `false` if it was already set.
pub(crate) fn request_cancel(cancel: &watch::Sender<bool>) -> bool {
    cancel.send_if_modified(|requested| {
        if *requested {
            false
        } else {
            *requested = true;
            true
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(registry: &Registry) -> (HandleId, watch::Receiver<bool>) {
        let id = registry.next_id();
        let (tx, rx) = watch::channel(false);
        registry.insert(
            ActiveProcess {
                id,
                pid: Some(42),
                program: PathBuf::from("/bin/true"),
                started_at: Local::now(),
            },
            Arc::new(tx),
        );
        (id, rx)
    }

    #[test]
    fn ids_are_unique_and_increasing() {
        let registry = Registry::default();
        let a = registry.next_id();
        let b = registry.next_id();
        assert!(b > a);
    }

    #[test]
    fn cancel_is_delivered_once() {
        let registry = Registry::default();
        let (id, rx) = entry(&registry);

        assert!(registry.cancel(id));
        assert!(*rx.borrow());
        assert!(!registry.cancel(id));
    }

    #[test]
    fn removed_entries_are_not_cancellable() {
        let registry = Registry::default();
        let (id, rx) = entry(&registry);
        registry.remove(id);

        assert!(!registry.contains(id));
        assert!(!registry.cancel(id));
        assert!(!*rx.borrow());
    }

    #[test]
    fn cancel_all_counts_new_requests() {
        let registry = Registry::default();
        let (a, _rx_a) = entry(&registry);
        let (_b, _rx_b) = entry(&registry);

        assert!(registry.cancel(a));
        assert_eq!(registry.cancel_all(), 1);
        assert_eq!(registry.snapshot().len(), 2);
    }
}
