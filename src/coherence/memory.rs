use std::collections::HashMap;
use std::hash::Hash;

use crate::common::{CoreId, Value};

/// Canonical address -> value mapping that every core writes through to.
pub struct SharedMemory<A> {
    baseline: Value,
    cells: HashMap<A, Value>,
}

impl<A: Eq + Hash + Clone> SharedMemory<A> {
    pub fn new(baseline: Value) -> Self {
        SharedMemory { baseline, cells: HashMap::new() }
    }

    /// Current value, initialising the cell to the baseline on first touch.
    pub fn fetch(&mut self, addr: &A) -> Value {
        *self.cells.entry(addr.clone()).or_insert(self.baseline)
    }

    pub fn store(&mut self, addr: &A, value: Value) {
        self.cells.insert(addr.clone(), value);
    }

    pub fn get(&self, addr: &A) -> Option<Value> {
        self.cells.get(addr).copied()
    }
}

/// The private caches of all registered cores: core -> address -> last seen value.
pub struct CoreCaches<A> {
    caches: HashMap<CoreId, HashMap<A, Value>>,
}

impl<A: Eq + Hash + Clone> CoreCaches<A> {
    pub fn new() -> Self {
        CoreCaches { caches: HashMap::new() }
    }

    /// Returns false if the core already had a cache.
    pub fn register(&mut self, core: CoreId) -> bool {
        if self.caches.contains_key(&core) {
            return false;
        }
        self.caches.insert(core, HashMap::new());
        true
    }

    pub fn is_registered(&self, core: CoreId) -> bool {
        self.caches.contains_key(&core)
    }

    pub fn get(&self, core: CoreId, addr: &A) -> Option<Value> {
        self.caches.get(&core)?.get(addr).copied()
    }

    pub fn contains(&self, core: CoreId, addr: &A) -> bool {
        self.get(core, addr).is_some()
    }

    pub fn fill(&mut self, core: CoreId, addr: &A, value: Value) {
        if let Some(cache) = self.caches.get_mut(&core) {
            cache.insert(addr.clone(), value);
        }
    }

    pub fn drop_line(&mut self, core: CoreId, addr: &A) {
        if let Some(cache) = self.caches.get_mut(&core) {
            cache.remove(addr);
        }
    }

    /// Snoop: does any core other than `core` hold a copy of `addr`?
    pub fn held_elsewhere(&self, core: CoreId, addr: &A) -> bool {
        self.caches
            .iter()
            .any(|(&c, cache)| c != core && cache.contains_key(addr))
    }
}

impl<A: Eq + Hash + Clone> Default for CoreCaches<A> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_defaults_to_baseline() {
        let mut mem = SharedMemory::new(7);
        assert_eq!(mem.get(&'A'), None);
        assert_eq!(mem.fetch(&'A'), 7);
        mem.store(&'A', 42);
        assert_eq!(mem.fetch(&'A'), 42);
    }

    #[test]
    fn snoop_ignores_requesting_core() {
        let mut caches = CoreCaches::new();
        assert!(caches.register(CoreId(0)));
        assert!(caches.register(CoreId(1)));
        assert!(!caches.register(CoreId(1)));
        caches.fill(CoreId(0), &'A', 1);
        assert!(!caches.held_elsewhere(CoreId(0), &'A'));
        assert!(caches.held_elsewhere(CoreId(1), &'A'));
        caches.drop_line(CoreId(0), &'A');
        assert!(!caches.held_elsewhere(CoreId(1), &'A'));
    }
}
