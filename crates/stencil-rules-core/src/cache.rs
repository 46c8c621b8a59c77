//! # Cache Layer
//!
//! Memoization of rule lookups, keyed by value-type stencil identity tuples.
//!
//! Each table sits behind its own `RefCell` so that computing one entry may
//! consult another table (a connect result needs the merged edge map). No
//! borrow is held while a value is computed.
//!
//! Only stencil-level facts are cached. Instance counts (docked edges,
//! children) change on every gesture and are always read live.
//!
//! There is no partial invalidation: a recompile calls [`RuleCache::clear`].

use crate::tables::ConnectionMap;
use crate::{Limit, RoleId, StencilId};
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;

/// `(source?, edge, target?)`.
pub type ConnectKey = (Option<StencilId>, StencilId, Option<StencilId>);

/// `(endpoint or container, edge or contained)`.
pub type PairKey = (StencilId, StencilId);

/// Hit/miss counters since the last clear.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

/// All memo tables of one engine.
#[derive(Debug, Default)]
pub struct RuleCache {
    connect: RefCell<BTreeMap<ConnectKey, bool>>,
    edge_connections: RefCell<BTreeMap<StencilId, Rc<ConnectionMap>>>,
    outgoing_limits: RefCell<BTreeMap<PairKey, Limit>>,
    incoming_limits: RefCell<BTreeMap<PairKey, Limit>>,
    containment: RefCell<BTreeMap<PairKey, (bool, Limit)>>,
    morph_groups: RefCell<BTreeMap<RoleId, Rc<Vec<StencilId>>>>,
    hits: Cell<u64>,
    misses: Cell<u64>,
}

impl RuleCache {
    /// Create empty tables.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn memo<K: Ord, V: Clone>(
        &self,
        table: &RefCell<BTreeMap<K, V>>,
        key: K,
        compute: impl FnOnce() -> V,
    ) -> V {
        if let Some(value) = table.borrow().get(&key).cloned() {
            self.hits.set(self.hits.get().saturating_add(1));
            return value;
        }
        let misses = self.misses.get().saturating_add(1);
        self.misses.set(misses);
        tracing::trace!(misses, "rule cache miss");
        let value = compute();
        table.borrow_mut().insert(key, value.clone());
        value
    }

    /// Role-reachability result of a connection.
    pub fn connect(&self, key: ConnectKey, compute: impl FnOnce() -> bool) -> bool {
        self.memo(&self.connect, key, compute)
    }

    /// Connection map merged over an edge stencil's roles.
    pub fn edge_connections(
        &self,
        edge: StencilId,
        compute: impl FnOnce() -> ConnectionMap,
    ) -> Rc<ConnectionMap> {
        self.memo(&self.edge_connections, edge, || Rc::new(compute()))
    }

    /// Outgoing edge limit of `(source, edge)`.
    pub fn outgoing_limit(&self, key: PairKey, compute: impl FnOnce() -> Limit) -> Limit {
        self.memo(&self.outgoing_limits, key, compute)
    }

    /// Incoming edge limit of `(target, edge)`.
    pub fn incoming_limit(&self, key: PairKey, compute: impl FnOnce() -> Limit) -> Limit {
        self.memo(&self.incoming_limits, key, compute)
    }

    /// Role-level containment and occurrence limit of `(container, contained)`.
    pub fn containment(&self, key: PairKey, compute: impl FnOnce() -> (bool, Limit)) -> (bool, Limit) {
        self.memo(&self.containment, key, compute)
    }

    /// Morph group of a role.
    pub fn morph_group(
        &self,
        role: RoleId,
        compute: impl FnOnce() -> Vec<StencilId>,
    ) -> Rc<Vec<StencilId>> {
        self.memo(&self.morph_groups, role, || Rc::new(compute()))
    }

    /// Drop every entry and reset the counters.
    pub fn clear(&self) {
        self.connect.borrow_mut().clear();
        self.edge_connections.borrow_mut().clear();
        self.outgoing_limits.borrow_mut().clear();
        self.incoming_limits.borrow_mut().clear();
        self.containment.borrow_mut().clear();
        self.morph_groups.borrow_mut().clear();
        self.hits.set(0);
        self.misses.set(0);
    }

    /// Current counters and total entry count.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.get(),
            misses: self.misses.get(),
            entries: self.len(),
        }
    }

    /// Total number of cached entries across all tables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.connect.borrow().len()
            + self.edge_connections.borrow().len()
            + self.outgoing_limits.borrow().len()
            + self.incoming_limits.borrow().len()
            + self.containment.borrow().len()
            + self.morph_groups.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_lookup_is_a_hit() {
        let cache = RuleCache::new();
        let key = (Some(StencilId(1)), StencilId(2), None);
        let mut calls = 0;
        assert!(cache.connect(key, || {
            calls += 1;
            true
        }));
        assert!(cache.connect(key, || {
            calls += 1;
            false
        }));
        assert_eq!(calls, 1);
        assert_eq!(
            cache.stats(),
            CacheStats {
                hits: 1,
                misses: 1,
                entries: 1
            }
        );
    }

    #[test]
    fn nested_lookups_do_not_conflict() {
        let cache = RuleCache::new();
        let result = cache.connect((None, StencilId(2), Some(StencilId(3))), || {
            let map = cache.edge_connections(StencilId(2), ConnectionMap::new);
            map.is_empty()
        });
        assert!(result);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn clear_empties_everything() {
        let cache = RuleCache::new();
        cache.containment((StencilId(1), StencilId(2)), || (true, Limit::AtMost(2)));
        cache.morph_group(RoleId(5), Vec::new);
        assert!(!cache.is_empty());
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.stats(), CacheStats::default());
    }
}
