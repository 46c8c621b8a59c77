//! # Rule Engine
//!
//! The owner of one editor session's rule state: registered stencil sets and
//! extensions, the compiled snapshot, and the caches.
//!
//! ## Snapshot Contract
//!
//! Loading anything takes `&mut self` and rebuilds the whole snapshot before
//! returning, then clears every cache. Queries take `&self`. A query can
//! therefore never observe a half-compiled table, and no answer computed
//! against an older snapshot survives a reload.
//!
//! The caches use `RefCell`, so a `RuleEngine` is `!Sync`. Hosts that share
//! rules across threads keep one engine per thread.

use crate::cache::{CacheStats, RuleCache};
use crate::catalog::{Stencil, StencilCatalog};
use crate::compiler::compile;
use crate::formats::{ExtensionSource, StencilSetSource};
use crate::query::ConnectQuery;
use crate::shape::Element;
use crate::symbols::{Symbols, qualify};
use crate::tables::{ConnectionMap, RuleTables};
use crate::{Limit, RoleId, RulesError, ShapeId, StencilId};
use std::rc::Rc;

/// The stencil set rules engine.
#[derive(Debug, Default)]
pub struct RuleEngine {
    symbols: Symbols,
    /// Registration order.
    sets: Vec<StencilSetSource>,
    /// Registration order.
    extensions: Vec<ExtensionSource>,
    tables: RuleTables,
    cache: RuleCache,
    generation: u64,
}

impl RuleEngine {
    /// Create an engine with no stencil sets.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // REGISTRATION
    // =========================================================================

    /// Load a stencil set, or reload it if its namespace is already
    /// registered. Every set is recompiled either way.
    pub fn load_stencil_set(&mut self, source: StencilSetSource) -> Result<(), RulesError> {
        if source.namespace.is_empty() {
            return Err(RulesError::InvalidSource("empty namespace".to_string()));
        }
        match self.sets.iter_mut().find(|s| s.namespace == source.namespace) {
            Some(existing) => {
                tracing::info!(namespace = %source.namespace, "reloading stencil set");
                *existing = source;
            }
            None => {
                tracing::info!(namespace = %source.namespace, "loading stencil set");
                self.sets.push(source);
            }
        }
        self.rebuild();
        Ok(())
    }

    /// Activate an extension for the stencil set it extends.
    ///
    /// An extension with an already loaded namespace replaces the old one.
    pub fn load_extension(&mut self, extension: ExtensionSource) -> Result<(), RulesError> {
        if !self.sets.iter().any(|s| s.namespace == extension.extends) {
            return Err(RulesError::UnknownStencilSet(extension.extends));
        }
        tracing::info!(
            namespace = %extension.namespace,
            extends = %extension.extends,
            "loading extension"
        );
        match self
            .extensions
            .iter_mut()
            .find(|e| e.namespace == extension.namespace)
        {
            Some(existing) => *existing = extension,
            None => self.extensions.push(extension),
        }
        self.rebuild();
        Ok(())
    }

    /// Deactivate an extension and return it.
    pub fn unload_extension(&mut self, namespace: &str) -> Result<ExtensionSource, RulesError> {
        let pos = self
            .extensions
            .iter()
            .position(|e| e.namespace == namespace)
            .ok_or_else(|| RulesError::UnknownExtension(namespace.to_string()))?;
        let removed = self.extensions.remove(pos);
        tracing::info!(namespace, "unloading extension");
        self.rebuild();
        Ok(removed)
    }

    /// Build a fresh snapshot from every registered source and drop all
    /// cached answers.
    fn rebuild(&mut self) {
        self.generation = self.generation.saturating_add(1);
        self.tables = compile(&mut self.symbols, &self.sets, &self.extensions, self.generation);
        self.cache.clear();
    }

    // =========================================================================
    // ACCESSORS
    // =========================================================================

    /// Number of compiles so far.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// The current snapshot.
    #[must_use]
    pub fn tables(&self) -> &RuleTables {
        &self.tables
    }

    #[must_use]
    pub fn catalog(&self) -> &StencilCatalog {
        &self.tables.catalog
    }

    #[must_use]
    pub fn symbols(&self) -> &Symbols {
        &self.symbols
    }

    /// Registered stencil sets, registration order.
    #[must_use]
    pub fn stencil_sets(&self) -> &[StencilSetSource] {
        &self.sets
    }

    /// Active extensions, registration order.
    #[must_use]
    pub fn extensions(&self) -> &[ExtensionSource] {
        &self.extensions
    }

    /// Cache counters since the last compile.
    #[must_use]
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// A stencil of the current catalog.
    #[must_use]
    pub fn stencil(&self, id: StencilId) -> Option<&Stencil> {
        self.tables.catalog.get(id)
    }

    /// Qualified name of a stencil.
    #[must_use]
    pub fn stencil_name(&self, id: StencilId) -> Option<&str> {
        self.symbols.stencil_name(id)
    }

    /// Find a stencil of the current catalog by name.
    ///
    /// A qualified name is looked up directly. A bare name is qualified with
    /// each registered namespace in turn; the first match wins.
    #[must_use]
    pub fn resolve(&self, name: &str) -> Option<StencilId> {
        let present = |id: StencilId| self.tables.catalog.contains(id).then_some(id);
        if let Some(id) = self.symbols.stencil(name).and_then(present) {
            return Some(id);
        }
        self.sets
            .iter()
            .filter_map(|set| self.symbols.stencil(&qualify(&set.namespace, name)))
            .find_map(present)
    }

    // =========================================================================
    // CONNECTIONS
    // =========================================================================

    /// Whether the query's edge may connect its endpoints.
    ///
    /// Role reachability is cached per stencil triple. When an endpoint is a
    /// live shape, its docked edges of the same edge stencil are counted
    /// against the tightest outgoing/incoming limit.
    pub fn can_connect(&self, query: &ConnectQuery<'_>) -> Result<bool, RulesError> {
        if query.source.is_none() && query.target.is_none() {
            return Err(RulesError::MissingEndpoint);
        }
        let edge = query.edge.stencil();
        let source = query.source.map(|e| e.stencil());
        let target = query.target.map(|e| e.stencil());

        let reachable = self
            .cache
            .connect((source, edge, target), || self.roles_connect(source, edge, target));
        if !reachable {
            return Ok(false);
        }
        Ok(self.cardinality_allows(query))
    }

    fn roles_connect(
        &self,
        source: Option<StencilId>,
        edge: StencilId,
        target: Option<StencilId>,
    ) -> bool {
        let catalog = &self.tables.catalog;
        let Some(edge) = catalog.get(edge) else {
            return false;
        };
        let lookup = |id: Option<StencilId>| id.map(|id| catalog.get(id));
        let (source, target) = match (lookup(source), lookup(target)) {
            (Some(None), _) | (_, Some(None)) => return false,
            (s, t) => (s.flatten(), t.flatten()),
        };

        let rules = self.edge_connections(edge);
        match (source, target) {
            (Some(source), Some(target)) => source
                .roles
                .iter()
                .filter_map(|role| rules.get(role))
                .any(|targets| target.has_any_role(targets)),
            (Some(source), None) => source.roles.iter().any(|role| rules.contains_key(role)),
            (None, Some(target)) => rules.values().any(|targets| target.has_any_role(targets)),
            (None, None) => false,
        }
    }

    fn edge_connections(&self, edge: &Stencil) -> Rc<ConnectionMap> {
        self.cache
            .edge_connections(edge.id, || self.tables.edge_connections(edge))
    }

    pub(crate) fn morph_group(&self, role: RoleId) -> Rc<Vec<StencilId>> {
        self.cache
            .morph_group(role, || self.tables.morph_group(role))
    }

    fn cardinality_allows(&self, query: &ConnectQuery<'_>) -> bool {
        let edge_id = query.edge.stencil();
        let Some(edge) = self.tables.catalog.get(edge_id) else {
            return false;
        };
        let this_edge = query.edge.shape().map(|e| e.shape_id());
        let count = |docked: Vec<(ShapeId, StencilId)>| {
            docked
                .into_iter()
                .filter(|(id, stencil)| *stencil == edge_id && Some(*id) != this_edge)
                .count()
        };

        if let Some(shape) = query.source.and_then(|e| e.shape()) {
            let limit = self.cache.outgoing_limit((shape.stencil(), edge_id), || {
                self.tables
                    .catalog
                    .get(shape.stencil())
                    .map_or(Limit::Unbounded, |s| self.tables.outgoing_limit(s, edge))
            });
            let docked = count(shape.outgoing_edges());
            if !limit.admits(docked) {
                tracing::trace!(shape = ?shape.shape_id(), docked, ?limit, "outgoing limit reached");
                return false;
            }
        }

        if let Some(shape) = query.target.and_then(|e| e.shape()) {
            let limit = self.cache.incoming_limit((shape.stencil(), edge_id), || {
                self.tables
                    .catalog
                    .get(shape.stencil())
                    .map_or(Limit::Unbounded, |s| self.tables.incoming_limit(s, edge))
            });
            let docked = count(shape.incoming_edges());
            if !limit.admits(docked) {
                tracing::trace!(shape = ?shape.shape_id(), docked, ?limit, "incoming limit reached");
                return false;
            }
        }

        true
    }

    // =========================================================================
    // CONTAINMENT
    // =========================================================================

    /// Whether `contained` may be placed inside `container`.
    ///
    /// Edges are never contained. For a live container, existing children of
    /// the same stencil are counted against the contained stencil's
    /// `maximumOccurrence`.
    pub fn can_contain<'a>(
        &self,
        container: impl Into<Element<'a>>,
        contained: impl Into<Element<'a>>,
    ) -> bool {
        let container = container.into();
        let contained_id = contained.into().stencil();
        let catalog = &self.tables.catalog;
        let Some(contained) = catalog.get(contained_id) else {
            return false;
        };
        if contained.is_edge() {
            return false;
        }

        let (allowed, maximum) = self
            .cache
            .containment((container.stencil(), contained_id), || {
                match catalog.get(container.stencil()) {
                    Some(parent) => (
                        self.tables.role_contains(parent, contained),
                        self.tables.maximum_occurrence(contained),
                    ),
                    None => (false, Limit::Unbounded),
                }
            });
        if !allowed {
            return false;
        }

        match container.shape() {
            None => true,
            Some(shape) => {
                let count = shape
                    .child_stencils()
                    .into_iter()
                    .filter(|child| *child == contained_id)
                    .count();
                maximum.admits(count)
            }
        }
    }

    /// Whether the element's stencil may contain anything at all.
    pub fn is_container<'a>(&self, element: impl Into<Element<'a>>) -> bool {
        self.tables.containers.contains(&element.into().stencil())
    }

    // =========================================================================
    // ENUMERATIONS
    // =========================================================================

    /// Node stencils that `edge` may connect to `target` (or to anything).
    pub fn source_stencils<'a>(
        &self,
        edge: impl Into<Element<'a>>,
        target: Option<Element<'a>>,
    ) -> Vec<StencilId> {
        let edge = edge.into();
        self.tables
            .catalog
            .nodes()
            .map(|s| s.id)
            .filter(|&id| {
                let query = ConnectQuery {
                    source: Some(id.into()),
                    edge,
                    target,
                };
                matches!(self.can_connect(&query), Ok(true))
            })
            .collect()
    }

    /// Node stencils that `edge` may connect from `source` (or from anything).
    pub fn target_stencils<'a>(
        &self,
        source: Option<Element<'a>>,
        edge: impl Into<Element<'a>>,
    ) -> Vec<StencilId> {
        let edge = edge.into();
        self.tables
            .catalog
            .nodes()
            .map(|s| s.id)
            .filter(|&id| {
                let query = ConnectQuery {
                    source,
                    edge,
                    target: Some(id.into()),
                };
                matches!(self.can_connect(&query), Ok(true))
            })
            .collect()
    }

    /// Edge stencils that may leave `source`.
    pub fn outgoing_edge_stencils<'a>(&self, source: impl Into<Element<'a>>) -> Vec<StencilId> {
        let source = source.into();
        self.tables
            .catalog
            .edges()
            .map(|s| s.id)
            .filter(|&id| matches!(self.can_connect(&ConnectQuery::new(id).from(source)), Ok(true)))
            .collect()
    }

    /// Edge stencils that may arrive at `target`.
    pub fn incoming_edge_stencils<'a>(&self, target: impl Into<Element<'a>>) -> Vec<StencilId> {
        let target = target.into();
        self.tables
            .catalog
            .edges()
            .map(|s| s.id)
            .filter(|&id| matches!(self.can_connect(&ConnectQuery::new(id).to(target)), Ok(true)))
            .collect()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::{RuleSpec, StencilDescriptor};
    use crate::{ShapeId, ShapeSnapshot};

    const NS: &str = "http://example.org/bpmn#";

    fn engine(rules: &str) -> RuleEngine {
        let mut engine = RuleEngine::new();
        engine
            .load_stencil_set(StencilSetSource::new(
                NS,
                vec![
                    StencilDescriptor::node("Task", &["activity"]),
                    StencilDescriptor::node("Gateway", &["activity"]),
                    StencilDescriptor::node("Pool", &[]),
                    StencilDescriptor::node("Lane", &[]),
                    StencilDescriptor::edge("SequenceFlow", &["flow"]),
                    StencilDescriptor::edge("Association", &[]),
                ],
                RuleSpec::from_json(rules).expect("rules"),
            ))
            .expect("load");
        engine
    }

    fn id(engine: &RuleEngine, name: &str) -> StencilId {
        engine.resolve(name).expect("stencil")
    }

    #[test]
    fn missing_endpoints_is_an_error() {
        let engine = engine("{}");
        let flow = id(&engine, "SequenceFlow");
        let result = engine.can_connect(&ConnectQuery::new(flow));
        assert!(matches!(result, Err(RulesError::MissingEndpoint)));
    }

    #[test]
    fn one_sided_queries_are_existential() {
        let engine = engine(
            r#"{"connectionRules":[{"role":"flow","connects":[{"from":"activity","to":"Lane"}]}]}"#,
        );
        let (task, lane, pool, flow) = (
            id(&engine, "Task"),
            id(&engine, "Lane"),
            id(&engine, "Pool"),
            id(&engine, "SequenceFlow"),
        );
        assert!(engine.can_connect(&ConnectQuery::new(flow).from(task)).expect("query"));
        assert!(!engine.can_connect(&ConnectQuery::new(flow).from(lane)).expect("query"));
        assert!(engine.can_connect(&ConnectQuery::new(flow).to(lane)).expect("query"));
        assert!(!engine.can_connect(&ConnectQuery::new(flow).to(pool)).expect("query"));
    }

    #[test]
    fn unknown_stencils_do_not_connect() {
        let engine = engine(
            r#"{"connectionRules":[{"role":"flow","connects":[{"from":"activity","to":"activity"}]}]}"#,
        );
        let flow = id(&engine, "SequenceFlow");
        let task = id(&engine, "Task");
        let ghost = StencilId(9999);
        assert!(!engine.can_connect(&ConnectQuery::between(ghost, flow, task)).expect("query"));
        assert!(!engine.can_connect(&ConnectQuery::between(task, ghost, task)).expect("query"));
    }

    #[test]
    fn edge_instance_is_not_counted_against_itself() {
        let engine = engine(
            r#"{"connectionRules":[{"role":"flow","connects":[{"from":"activity","to":"activity"}]}],
                "cardinalityRules":[{"role":"Gateway","outgoingEdges":[{"role":"flow","maximum":1}]}]}"#,
        );
        let (gateway, task, flow) = (
            id(&engine, "Gateway"),
            id(&engine, "Task"),
            id(&engine, "SequenceFlow"),
        );
        let docked = ShapeSnapshot::new(ShapeId(1), gateway).with_outgoing(ShapeId(10), flow);
        let same_edge = ShapeSnapshot::new(ShapeId(10), flow);
        let other_edge = ShapeSnapshot::new(ShapeId(11), flow);

        let reconnect = ConnectQuery::new(&same_edge).from(&docked).to(task);
        assert!(engine.can_connect(&reconnect).expect("query"));
        let second = ConnectQuery::new(&other_edge).from(&docked).to(task);
        assert!(!engine.can_connect(&second).expect("query"));
    }

    #[test]
    fn incoming_limit_applies_to_target_shape() {
        let engine = engine(
            r#"{"connectionRules":[{"role":"flow","connects":[{"from":"activity","to":"activity"}]}],
                "cardinalityRules":[{"role":"activity","incomingEdges":[{"role":"SequenceFlow","maximum":2}]}]}"#,
        );
        let (task, flow) = (id(&engine, "Task"), id(&engine, "SequenceFlow"));
        let mut target = ShapeSnapshot::new(ShapeId(1), task).with_incoming(ShapeId(20), flow);
        assert!(engine.can_connect(&ConnectQuery::between(task, flow, &target)).expect("query"));
        target = target.with_incoming(ShapeId(21), flow);
        assert!(!engine.can_connect(&ConnectQuery::between(task, flow, &target)).expect("query"));
    }

    #[test]
    fn edges_are_never_contained() {
        let engine = engine(r#"{"containmentRules":[{"role":"Pool","contains":["SequenceFlow","Lane"]}]}"#);
        let (pool, lane, flow) = (
            id(&engine, "Pool"),
            id(&engine, "Lane"),
            id(&engine, "SequenceFlow"),
        );
        assert!(engine.can_contain(pool, lane));
        assert!(!engine.can_contain(pool, flow));
        assert!(engine.is_container(pool));
        assert!(!engine.is_container(lane));
    }

    #[test]
    fn enumerations_follow_catalog_order() {
        let engine = engine(
            r#"{"connectionRules":[
                {"role":"flow","connects":[{"from":"activity","to":["activity","Lane"]}]},
                {"role":"Association","connects":[{"from":"Pool","to":"Task"}]}]}"#,
        );
        let (task, gateway, pool, lane, flow, assoc) = (
            id(&engine, "Task"),
            id(&engine, "Gateway"),
            id(&engine, "Pool"),
            id(&engine, "Lane"),
            id(&engine, "SequenceFlow"),
            id(&engine, "Association"),
        );
        assert_eq!(engine.source_stencils(flow, Some(lane.into())), vec![task, gateway]);
        assert_eq!(
            engine.target_stencils(Some(task.into()), flow),
            vec![task, gateway, lane]
        );
        assert_eq!(engine.outgoing_edge_stencils(pool), vec![assoc]);
        assert_eq!(engine.incoming_edge_stencils(task), vec![flow, assoc]);
        assert!(engine.incoming_edge_stencils(pool).is_empty());
    }

    #[test]
    fn resolve_accepts_bare_and_qualified_names() {
        let engine = engine("{}");
        let task = id(&engine, "Task");
        assert_eq!(engine.resolve(&format!("{NS}Task")), Some(task));
        assert_eq!(engine.stencil_name(task), Some("http://example.org/bpmn#Task"));
        assert_eq!(engine.resolve("Ghost"), None);
    }

    #[test]
    fn unknown_extension_target_is_rejected() {
        let mut engine = engine("{}");
        let result = engine.load_extension(ExtensionSource::new(
            "http://example.org/ext#",
            "http://example.org/nowhere#",
            RuleSpec::default(),
        ));
        assert!(matches!(result, Err(RulesError::UnknownStencilSet(_))));
        assert!(matches!(
            engine.unload_extension("http://example.org/ext#"),
            Err(RulesError::UnknownExtension(_))
        ));
    }

    #[test]
    fn reload_bumps_generation_and_clears_cache() {
        let mut engine = engine(r#"{"containmentRules":[{"role":"Pool","contains":["Lane"]}]}"#);
        let (pool, lane) = (id(&engine, "Pool"), id(&engine, "Lane"));
        assert!(engine.can_contain(pool, lane));
        assert!(engine.cache_stats().entries > 0);
        let before = engine.generation();

        let source = engine.stencil_sets()[0].clone();
        engine
            .load_stencil_set(StencilSetSource {
                rules: RuleSpec::default(),
                ..source
            })
            .expect("reload");
        assert_eq!(engine.generation(), before + 1);
        assert_eq!(engine.cache_stats().entries, 0);
        assert!(!engine.can_contain(pool, lane));
        assert_eq!(engine.stencil_sets().len(), 1);
    }
}
