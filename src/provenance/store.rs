//! # Process-wide deduplicating stores.
//!
//! [`ThreadSafeRegistry`] is an insert-only map guarded by one mutex; inserting
//! a key that is already present is a no-op reporting "not newly added".
//! [`JobRegistries`] bundles the stores a job needs and is passed around by
//! `Arc`, constructed once when the job is built.

use std::collections::HashMap;
use std::hash::Hash;

use parking_lot::Mutex;

use super::provenance::Parentage;
use crate::config::ParameterSet;
use crate::identity::{ParameterSetID, ParentageID, ProcessHistory, ProcessHistoryID};

/// Insert-only, deduplicating map behind a single mutex.
#[derive(Debug)]
pub struct ThreadSafeRegistry<K, V> {
    inner: Mutex<HashMap<K, V>>,
}

impl<K: Eq + Hash, V: Clone> ThreadSafeRegistry<K, V> {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
        }
    }

    /// Inserts `value` under `key`; returns `true` if it was newly added.
    pub fn insert(&self, key: K, value: V) -> bool {
        let mut map = self.inner.lock();
        if map.contains_key(&key) {
            return false;
        }
        map.insert(key, value);
        true
    }

    pub fn get(&self, key: &K) -> Option<V> {
        self.inner.lock().get(key).cloned()
    }

    pub fn contains(&self, key: &K) -> bool {
        self.inner.lock().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}

impl<K: Eq + Hash, V: Clone> Default for ThreadSafeRegistry<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

pub type ProcessHistoryRegistry = ThreadSafeRegistry<ProcessHistoryID, ProcessHistory>;
pub type ParentageRegistry = ThreadSafeRegistry<ParentageID, Parentage>;
pub type ParameterSetRegistry = ThreadSafeRegistry<ParameterSetID, ParameterSet>;

/// The process-wide stores of one job.
#[derive(Debug, Default)]
pub struct JobRegistries {
    pub process_histories: ProcessHistoryRegistry,
    pub parentages: ParentageRegistry,
    pub parameter_sets: ParameterSetRegistry,
}

impl JobRegistries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_history(&self, history: &ProcessHistory) -> bool {
        self.process_histories.insert(history.id(), history.clone())
    }

    pub fn register_parentage(&self, parentage: &Parentage) -> bool {
        self.parentages.insert(parentage.id(), parentage.clone())
    }

    pub fn register_parameter_set(&self, pset: &ParameterSet) -> ParameterSetID {
        let id = pset.id();
        self.parameter_sets.insert(id, pset.clone());
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::ProductID;
    use std::sync::Arc;

    #[test]
    fn test_insert_is_idempotent() {
        let reg: ThreadSafeRegistry<u32, &str> = ThreadSafeRegistry::new();
        assert!(reg.insert(1, "a"));
        assert!(!reg.insert(1, "b"));
        assert_eq!(reg.get(&1), Some("a"));
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn test_parentage_deduplicated_across_threads() {
        let regs = Arc::new(JobRegistries::new());
        let p = Parentage::new(vec![ProductID::new(3)]);
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let regs = Arc::clone(&regs);
                let p = p.clone();
                std::thread::spawn(move || regs.register_parentage(&p))
            })
            .collect();
        let added: usize = handles.into_iter().map(|h| usize::from(h.join().unwrap())).sum();
        assert_eq!(added, 1);
        assert_eq!(regs.parentages.len(), 1);
    }
}
