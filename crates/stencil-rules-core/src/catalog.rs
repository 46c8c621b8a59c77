//! # Stencil Catalog
//!
//! Immutable registry of the stencils visible in one compiled snapshot.
//! Iteration follows registration order, then declaration order, which is
//! the order every enumeration query reports in.

use crate::{RoleId, StencilId, StencilKind};
use std::collections::{BTreeMap, BTreeSet};

/// A compiled stencil.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stencil {
    /// Interned qualified id.
    pub id: StencilId,
    /// Namespace that declared the stencil.
    pub namespace: String,
    pub kind: StencilKind,
    /// Never empty: always contains `id.as_role()`.
    pub roles: BTreeSet<RoleId>,
}

impl Stencil {
    /// Create a stencil. The stencil's own id is added to `roles`.
    #[must_use]
    pub fn new(
        id: StencilId,
        namespace: impl Into<String>,
        kind: StencilKind,
        roles: impl IntoIterator<Item = RoleId>,
    ) -> Self {
        let mut roles: BTreeSet<RoleId> = roles.into_iter().collect();
        roles.insert(id.as_role());
        Self {
            id,
            namespace: namespace.into(),
            kind,
            roles,
        }
    }

    /// Whether the stencil carries `role`.
    #[must_use]
    pub fn has_role(&self, role: RoleId) -> bool {
        self.roles.contains(&role)
    }

    /// Whether any role of the stencil is in `roles`.
    #[must_use]
    pub fn has_any_role(&self, roles: &BTreeSet<RoleId>) -> bool {
        // Iterate the smaller set.
        if self.roles.len() <= roles.len() {
            self.roles.iter().any(|r| roles.contains(r))
        } else {
            roles.iter().any(|r| self.roles.contains(r))
        }
    }

    #[must_use]
    pub fn is_edge(&self) -> bool {
        self.kind == StencilKind::Edge
    }

    #[must_use]
    pub fn is_node(&self) -> bool {
        self.kind == StencilKind::Node
    }
}

/// All stencils of one snapshot.
#[derive(Debug, Clone, Default)]
pub struct StencilCatalog {
    stencils: Vec<Stencil>,
    index: BTreeMap<StencilId, usize>,
}

impl StencilCatalog {
    /// Create an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a stencil. A stencil id registered twice keeps its first position
    /// and takes the later definition.
    pub fn insert(&mut self, stencil: Stencil) {
        match self.index.get(&stencil.id) {
            Some(&pos) => self.stencils[pos] = stencil,
            None => {
                self.index.insert(stencil.id, self.stencils.len());
                self.stencils.push(stencil);
            }
        }
    }

    /// Remove a stencil, keeping the order of the others.
    pub fn remove(&mut self, id: StencilId) -> Option<Stencil> {
        let pos = self.index.remove(&id)?;
        let removed = self.stencils.remove(pos);
        for slot in self.index.values_mut() {
            if *slot > pos {
                *slot -= 1;
            }
        }
        Some(removed)
    }

    #[must_use]
    pub fn get(&self, id: StencilId) -> Option<&Stencil> {
        self.index.get(&id).and_then(|&pos| self.stencils.get(pos))
    }

    #[must_use]
    pub fn contains(&self, id: StencilId) -> bool {
        self.index.contains_key(&id)
    }

    /// All stencils in catalog order.
    pub fn iter(&self) -> impl Iterator<Item = &Stencil> {
        self.stencils.iter()
    }

    /// Node stencils in catalog order.
    pub fn nodes(&self) -> impl Iterator<Item = &Stencil> {
        self.stencils.iter().filter(|s| s.is_node())
    }

    /// Edge stencils in catalog order.
    pub fn edges(&self) -> impl Iterator<Item = &Stencil> {
        self.stencils.iter().filter(|s| s.is_edge())
    }

    /// Stencils carrying `role`, in catalog order.
    pub fn with_role(&self, role: RoleId) -> impl Iterator<Item = &Stencil> {
        self.stencils.iter().filter(move |s| s.has_role(role))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.stencils.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stencils.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stencil(id: u32, kind: StencilKind, roles: &[u32]) -> Stencil {
        Stencil::new(StencilId(id), "ns#", kind, roles.iter().map(|&r| RoleId(r)))
    }

    #[test]
    fn own_id_is_a_role() {
        let s = stencil(4, StencilKind::Node, &[]);
        assert!(s.has_role(RoleId(4)));
        assert_eq!(s.roles.len(), 1);
    }

    #[test]
    fn order_follows_insertion() {
        let mut catalog = StencilCatalog::new();
        catalog.insert(stencil(9, StencilKind::Node, &[]));
        catalog.insert(stencil(2, StencilKind::Edge, &[]));
        catalog.insert(stencil(5, StencilKind::Node, &[]));

        let ids: Vec<_> = catalog.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![StencilId(9), StencilId(2), StencilId(5)]);
        let nodes: Vec<_> = catalog.nodes().map(|s| s.id).collect();
        assert_eq!(nodes, vec![StencilId(9), StencilId(5)]);
    }

    #[test]
    fn remove_keeps_index_consistent() {
        let mut catalog = StencilCatalog::new();
        catalog.insert(stencil(1, StencilKind::Node, &[]));
        catalog.insert(stencil(2, StencilKind::Node, &[]));
        catalog.insert(stencil(3, StencilKind::Node, &[]));

        assert!(catalog.remove(StencilId(2)).is_some());
        assert!(catalog.remove(StencilId(2)).is_none());
        assert_eq!(catalog.get(StencilId(3)).map(|s| s.id), Some(StencilId(3)));
        assert_eq!(catalog.len(), 2);
    }

    #[test]
    fn with_role_filters() {
        let mut catalog = StencilCatalog::new();
        catalog.insert(stencil(1, StencilKind::Node, &[10]));
        catalog.insert(stencil(2, StencilKind::Node, &[11]));
        catalog.insert(stencil(3, StencilKind::Node, &[10, 11]));
        let ids: Vec<_> = catalog.with_role(RoleId(10)).map(|s| s.id).collect();
        assert_eq!(ids, vec![StencilId(1), StencilId(3)]);
    }
}
