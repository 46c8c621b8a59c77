//! # Rule Tables
//!
//! One compiled, immutable snapshot of every loaded stencil set: the stencil
//! catalog plus the connection, cardinality, containment, morphing and layout
//! tables, all keyed by interned `RoleId`.
//!
//! Lookups here are uncached. The engine memoizes them in [`crate::cache`].

use crate::catalog::{Stencil, StencilCatalog};
use crate::{Limit, RoleId, StencilId, Weights};
use std::collections::{BTreeMap, BTreeSet};

/// Source role -> target roles, for one edge role or merged over an edge
/// stencil's roles.
pub type ConnectionMap = BTreeMap<RoleId, BTreeSet<RoleId>>;

/// Cardinality limits declared for one role.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CardinalityRule {
    /// Edge role -> max outgoing edges of that role.
    pub outgoing_edges: BTreeMap<RoleId, Limit>,
    /// Edge role -> max incoming edges of that role.
    pub incoming_edges: BTreeMap<RoleId, Limit>,
    /// Max children with this role in one container.
    pub maximum_occurrence: Option<Limit>,
}

/// Flags of one declared morphing rule.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MorphFlags {
    pub preserve_bounds: Option<bool>,
    pub show_in_shape_menu: Option<bool>,
}

/// Every morphing rule declared for one role.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MorphingRule {
    pub flags: Vec<MorphFlags>,
    /// Resolved base morphs of this role, declaration order.
    pub base_morphs: Vec<StencilId>,
}

/// Weights that apply when the connecting edge has `edge_role`, or to any
/// edge when `edge_role` is `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeWeights {
    pub edge_role: Option<RoleId>,
    pub weights: Weights,
}

/// Layout stiffness declared for one role.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LayoutRule {
    pub inbound: Option<Weights>,
    pub outbound: Option<Weights>,
    pub inbound_by_edge: Vec<EdgeWeights>,
    pub outbound_by_edge: Vec<EdgeWeights>,
}

impl LayoutRule {
    /// Pick the entry for `edge` from a by-edge list: the first entry whose
    /// edge role the edge carries, else the first entry without an edge role.
    #[must_use]
    pub fn select(entries: &[EdgeWeights], edge: Option<&Stencil>) -> Option<Weights> {
        let matched = edge.and_then(|edge| {
            entries
                .iter()
                .find(|e| e.edge_role.is_some_and(|role| edge.has_role(role)))
        });
        matched
            .or_else(|| entries.iter().find(|e| e.edge_role.is_none()))
            .map(|e| e.weights)
    }
}

/// A compiled snapshot.
#[derive(Debug, Clone, Default)]
pub struct RuleTables {
    pub catalog: StencilCatalog,
    pub connections: BTreeMap<RoleId, ConnectionMap>,
    pub cardinality: BTreeMap<RoleId, CardinalityRule>,
    pub containment: BTreeMap<RoleId, BTreeSet<RoleId>>,
    pub morphing: BTreeMap<RoleId, MorphingRule>,
    /// Every resolved base morph, declaration order, deduplicated.
    pub base_morphs: Vec<StencilId>,
    pub layout: BTreeMap<RoleId, LayoutRule>,
    /// Stencils with a role that is a containment key.
    pub containers: BTreeSet<StencilId>,
    /// Incremented for every compile of the owning engine.
    pub generation: u64,
}

impl RuleTables {
    /// Merge the connection maps of every role the edge stencil carries.
    #[must_use]
    pub fn edge_connections(&self, edge: &Stencil) -> ConnectionMap {
        let mut merged = ConnectionMap::new();
        for role in &edge.roles {
            if let Some(map) = self.connections.get(role) {
                for (from, targets) in map {
                    merged
                        .entry(*from)
                        .or_default()
                        .extend(targets.iter().copied());
                }
            }
        }
        merged
    }

    /// Tightest outgoing limit over all (endpoint role, edge role) pairs.
    #[must_use]
    pub fn outgoing_limit(&self, source: &Stencil, edge: &Stencil) -> Limit {
        self.edge_limit(source, edge, |rule| &rule.outgoing_edges)
    }

    /// Tightest incoming limit over all (endpoint role, edge role) pairs.
    #[must_use]
    pub fn incoming_limit(&self, target: &Stencil, edge: &Stencil) -> Limit {
        self.edge_limit(target, edge, |rule| &rule.incoming_edges)
    }

    fn edge_limit(
        &self,
        endpoint: &Stencil,
        edge: &Stencil,
        side: impl Fn(&CardinalityRule) -> &BTreeMap<RoleId, Limit>,
    ) -> Limit {
        endpoint
            .roles
            .iter()
            .filter_map(|role| self.cardinality.get(role))
            .flat_map(|rule| {
                let limits = side(rule);
                edge.roles.iter().filter_map(move |r| limits.get(r).copied())
            })
            .fold(Limit::Unbounded, Limit::min)
    }

    /// Role-level containment check.
    #[must_use]
    pub fn role_contains(&self, container: &Stencil, contained: &Stencil) -> bool {
        container
            .roles
            .iter()
            .filter_map(|role| self.containment.get(role))
            .any(|allowed| contained.has_any_role(allowed))
    }

    /// Tightest `maximum_occurrence` over the contained stencil's roles.
    #[must_use]
    pub fn maximum_occurrence(&self, contained: &Stencil) -> Limit {
        contained
            .roles
            .iter()
            .filter_map(|role| self.cardinality.get(role))
            .filter_map(|rule| rule.maximum_occurrence)
            .fold(Limit::Unbounded, Limit::min)
    }

    /// Stencils inter-substitutable under `role`.
    ///
    /// Empty unless `role` is a morphing key. Otherwise the role's base morphs
    /// followed by every other catalog stencil carrying the role.
    #[must_use]
    pub fn morph_group(&self, role: RoleId) -> Vec<StencilId> {
        let Some(rule) = self.morphing.get(&role) else {
            return Vec::new();
        };
        let mut group: Vec<StencilId> = rule
            .base_morphs
            .iter()
            .copied()
            .filter(|id| self.catalog.contains(*id))
            .collect();
        for stencil in self.catalog.with_role(role) {
            if !group.contains(&stencil.id) {
                group.push(stencil.id);
            }
        }
        group
    }

    /// Morphing flags of every rule whose role the stencil carries.
    pub fn morph_flags<'a>(&'a self, stencil: &'a Stencil) -> impl Iterator<Item = MorphFlags> + 'a {
        stencil
            .roles
            .iter()
            .filter_map(|role| self.morphing.get(role))
            .flat_map(|rule| rule.flags.iter().copied())
    }

    /// Whether `id` is a designated base morph.
    #[must_use]
    pub fn is_base_morph(&self, id: StencilId) -> bool {
        self.base_morphs.contains(&id)
    }
}

// =============================================================================
// TESTS
// =============================================================================
