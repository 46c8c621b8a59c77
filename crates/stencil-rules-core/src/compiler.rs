//! # Rule Compiler
//!
//! Builds a complete [`RuleTables`] snapshot from every registered stencil
//! set and its active extensions.
//!
//! - Extension rule lists are appended to their base set's lists before
//!   compiling, and are namespaced with the base set's namespace.
//! - Bare role tokens are qualified with the current namespace; tokens that
//!   contain `#` are foreign roles and are kept verbatim.
//! - There is no incremental path: every compile starts from empty tables.

use crate::catalog::Stencil;
use crate::formats::{ExtensionSource, RuleSpec, StencilDescriptor, StencilSetSource, WeightsSpec};
use crate::primitives::MAX_TOKEN_LENGTH;
use crate::symbols::Symbols;
use crate::tables::{EdgeWeights, MorphFlags, RuleTables};
use crate::{Limit, RoleId, StencilId};
use std::collections::BTreeSet;

/// Compile all stencil sets, in registration order, into a fresh snapshot.
///
/// `extensions` may contain extensions for any set; each is applied to the
/// set whose namespace it extends, in the order given.
pub fn compile(
    symbols: &mut Symbols,
    sets: &[StencilSetSource],
    extensions: &[ExtensionSource],
    generation: u64,
) -> RuleTables {
    let mut tables = RuleTables {
        generation,
        ..RuleTables::default()
    };
    let mut pending_base_morphs: Vec<(RoleId, StencilId)> = Vec::new();

    for set in sets {
        let namespace = set.namespace.as_str();
        let active: Vec<&ExtensionSource> =
            extensions.iter().filter(|e| e.extends == namespace).collect();

        add_stencils(&mut tables, symbols, namespace, &set.stencils);
        for extension in &active {
            add_stencils(&mut tables, symbols, namespace, &extension.stencils);
        }
        for extension in &active {
            for id in &extension.remove_stencils {
                if let Some(role) = intern(symbols, namespace, id) {
                    if tables.catalog.remove(StencilId::from(role)).is_none() {
                        tracing::debug!(namespace, stencil = %id, "removed stencil was not present");
                    }
                }
            }
        }

        let mut rules = set.rules.clone();
        for extension in &active {
            rules.append(&extension.rules);
        }
        compile_rules(&mut tables, symbols, namespace, &rules, &mut pending_base_morphs);
    }

    resolve_base_morphs(&mut tables, symbols, pending_base_morphs);
    collect_containers(&mut tables);

    tracing::debug!(
        generation,
        stencil_sets = sets.len(),
        extensions = extensions.len(),
        stencils = tables.catalog.len(),
        connection_roles = tables.connections.len(),
        cardinality_roles = tables.cardinality.len(),
        containment_roles = tables.containment.len(),
        morphing_roles = tables.morphing.len(),
        layout_roles = tables.layout.len(),
        "compiled rule tables"
    );

    tables
}

/// Intern a rule token, skipping empty and oversized tokens.
fn intern(symbols: &mut Symbols, namespace: &str, token: &str) -> Option<RoleId> {
    if token.is_empty() || token.len() > MAX_TOKEN_LENGTH {
        tracing::warn!(namespace, len = token.len(), "skipping invalid role token");
        return None;
    }
    Some(symbols.intern_qualified(namespace, token))
}

fn add_stencils(
    tables: &mut RuleTables,
    symbols: &mut Symbols,
    namespace: &str,
    stencils: &[StencilDescriptor],
) {
    for descriptor in stencils {
        let Some(id) = intern(symbols, namespace, &descriptor.id) else {
            continue;
        };
        let roles: Vec<RoleId> = descriptor
            .roles
            .iter()
            .filter_map(|role| intern(symbols, namespace, role))
            .collect();
        tables.catalog.insert(Stencil::new(
            StencilId::from(id),
            namespace,
            descriptor.kind,
            roles,
        ));
    }
}

fn compile_rules(
    tables: &mut RuleTables,
    symbols: &mut Symbols,
    namespace: &str,
    rules: &RuleSpec,
    pending_base_morphs: &mut Vec<(RoleId, StencilId)>,
) {
    for rule in &rules.connection_rules {
        let Some(edge_role) = intern(symbols, namespace, &rule.role) else {
            continue;
        };
        let table = tables.connections.entry(edge_role).or_default();
        for connect in &rule.connects {
            let Some(from) = intern(symbols, namespace, &connect.from) else {
                continue;
            };
            let targets = table.entry(from).or_default();
            for to in &connect.to {
                if let Some(to) = intern(symbols, namespace, to) {
                    targets.insert(to);
                }
            }
        }
    }

    for rule in &rules.cardinality_rules {
        let Some(role) = intern(symbols, namespace, &rule.role) else {
            continue;
        };
        let entry = tables.cardinality.entry(role).or_default();
        // Zero or negative occurrence limits carry no restriction.
        if let Some(max) = rule.maximum_occurrence.filter(|&m| m > 0) {
            entry.maximum_occurrence = Some(Limit::from_maximum(max));
        }
        for edge in &rule.outgoing_edges {
            if let (Some(edge_role), Some(max)) = (intern(symbols, namespace, &edge.role), edge.maximum) {
                entry.outgoing_edges.insert(edge_role, Limit::from_maximum(max));
            }
        }
        for edge in &rule.incoming_edges {
            if let (Some(edge_role), Some(max)) = (intern(symbols, namespace, &edge.role), edge.maximum) {
                entry.incoming_edges.insert(edge_role, Limit::from_maximum(max));
            }
        }
    }

    for rule in &rules.containment_rules {
        let Some(role) = intern(symbols, namespace, &rule.role) else {
            continue;
        };
        let contained: BTreeSet<RoleId> = rule
            .contains
            .iter()
            .filter_map(|c| intern(symbols, namespace, c))
            .collect();
        tables.containment.entry(role).or_default().extend(contained);
    }

    for rule in &rules.morphing_rules {
        let Some(role) = intern(symbols, namespace, &rule.role) else {
            continue;
        };
        let entry = tables.morphing.entry(role).or_default();
        entry.flags.push(MorphFlags {
            preserve_bounds: rule.preserve_bounds,
            show_in_shape_menu: rule.show_in_shape_menu,
        });
        for base in &rule.base_morphs {
            if let Some(base_id) = intern(symbols, namespace, base) {
                pending_base_morphs.push((role, StencilId::from(base_id)));
            }
        }
    }

    for rule in &rules.layout_rules {
        let Some(role) = intern(symbols, namespace, &rule.role) else {
            continue;
        };
        let mut by_edge = |specs: &[WeightsSpec]| -> Vec<EdgeWeights> {
            specs
                .iter()
                .map(|spec| EdgeWeights {
                    edge_role: spec
                        .edge_role
                        .as_deref()
                        .and_then(|r| intern(symbols, namespace, r)),
                    weights: spec.weights(),
                })
                .collect()
        };
        let inbound_by_edge = by_edge(&rule.inbound_by_edge);
        let outbound_by_edge = by_edge(&rule.outbound_by_edge);

        let entry = tables.layout.entry(role).or_default();
        if let Some(spec) = &rule.inbound {
            entry.inbound = Some(spec.weights());
        }
        if let Some(spec) = &rule.outbound {
            entry.outbound = Some(spec.weights());
        }
        entry.inbound_by_edge.extend(inbound_by_edge);
        entry.outbound_by_edge.extend(outbound_by_edge);
    }
}

/// Keep base morphs that name a stencil of the final catalog.
fn resolve_base_morphs(
    tables: &mut RuleTables,
    symbols: &Symbols,
    pending: Vec<(RoleId, StencilId)>,
) {
    for (role, id) in pending {
        if !tables.catalog.contains(id) {
            tracing::warn!(
                stencil = symbols.stencil_name(id).unwrap_or("?"),
                "base morph does not name a known stencil"
            );
            continue;
        }
        if let Some(rule) = tables.morphing.get_mut(&role) {
            if !rule.base_morphs.contains(&id) {
                rule.base_morphs.push(id);
            }
        }
        if !tables.base_morphs.contains(&id) {
            tables.base_morphs.push(id);
        }
    }
}

fn collect_containers(tables: &mut RuleTables) {
    let keys: BTreeSet<RoleId> = tables.containment.keys().copied().collect();
    tables.containers = tables
        .catalog
        .iter()
        .filter(|s| s.has_any_role(&keys))
        .map(|s| s.id)
        .collect();
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Weights;

    const NS: &str = "http://example.org/bpmn#";

    fn set(rules: &str) -> StencilSetSource {
        StencilSetSource::new(
            NS,
            vec![
                StencilDescriptor::node("Task", &["activity"]),
                StencilDescriptor::node("Pool", &[]),
                StencilDescriptor::node("Lane", &[]),
                StencilDescriptor::edge("SequenceFlow", &["flow"]),
            ],
            RuleSpec::from_json(rules).expect("rules"),
        )
    }

    fn role(symbols: &Symbols, local: &str) -> RoleId {
        symbols.get(&format!("{NS}{local}")).expect("interned")
    }

    #[test]
    fn connection_rules_union_targets() {
        let mut symbols = Symbols::new();
        let tables = compile(
            &mut symbols,
            &[set(r#"{"connectionRules":[
                {"role":"flow","connects":[{"from":"activity","to":"Task"}]},
                {"role":"flow","connects":[{"from":"activity","to":["Pool"]}]}]}"#)],
            &[],
            1,
        );
        let targets = &tables.connections[&role(&symbols, "flow")][&role(&symbols, "activity")];
        assert_eq!(
            targets,
            &BTreeSet::from([role(&symbols, "Task"), role(&symbols, "Pool")])
        );
    }

    #[test]
    fn foreign_roles_are_verbatim() {
        let mut symbols = Symbols::new();
        let tables = compile(
            &mut symbols,
            &[set(r#"{"containmentRules":[{"role":"Pool","contains":["http://other.org/di#Shape"]}]}"#)],
            &[],
            1,
        );
        let foreign = symbols.get("http://other.org/di#Shape").expect("foreign role");
        assert!(tables.containment[&role(&symbols, "Pool")].contains(&foreign));
    }

    #[test]
    fn containers_are_recorded() {
        let mut symbols = Symbols::new();
        let tables = compile(
            &mut symbols,
            &[set(r#"{"containmentRules":[{"role":"Pool","contains":["Lane"]}]}"#)],
            &[],
            1,
        );
        let pool = StencilId::from(role(&symbols, "Pool"));
        let lane = StencilId::from(role(&symbols, "Lane"));
        assert!(tables.containers.contains(&pool));
        assert!(!tables.containers.contains(&lane));
    }

    #[test]
    fn extension_rules_and_stencils_apply_to_base() {
        let mut symbols = Symbols::new();
        let mut extension = ExtensionSource::new(
            "http://example.org/ext#",
            NS,
            RuleSpec::from_json(r#"{"containmentRules":[{"role":"Lane","contains":["Lane"]}]}"#)
                .expect("rules"),
        );
        extension.stencils = vec![StencilDescriptor::node("Annotation", &[])];
        extension.remove_stencils = vec!["Pool".to_string()];

        let tables = compile(&mut symbols, &[set("{}")], &[extension], 2);
        assert_eq!(tables.generation, 2);
        assert!(tables.containment.contains_key(&role(&symbols, "Lane")));
        assert!(tables.catalog.contains(StencilId::from(role(&symbols, "Annotation"))));
        assert!(!tables.catalog.contains(StencilId::from(role(&symbols, "Pool"))));
    }

    #[test]
    fn extension_for_other_set_is_ignored() {
        let mut symbols = Symbols::new();
        let extension = ExtensionSource::new(
            "http://example.org/ext#",
            "http://example.org/other#",
            RuleSpec::from_json(r#"{"containmentRules":[{"role":"Lane","contains":["Lane"]}]}"#)
                .expect("rules"),
        );
        let tables = compile(&mut symbols, &[set("{}")], &[extension], 1);
        assert!(tables.containment.is_empty());
    }

    #[test]
    fn cardinality_limits_decode() {
        let mut symbols = Symbols::new();
        let tables = compile(
            &mut symbols,
            &[set(r#"{"cardinalityRules":[{"role":"Task","maximumOccurrence":0,
                "outgoingEdges":[{"role":"flow","maximum":1}],
                "incomingEdges":[{"role":"flow","maximum":-1},{"role":"SequenceFlow"}]}]}"#)],
            &[],
            1,
        );
        let rule = &tables.cardinality[&role(&symbols, "Task")];
        assert_eq!(rule.maximum_occurrence, None);
        assert_eq!(rule.outgoing_edges[&role(&symbols, "flow")], Limit::AtMost(1));
        assert_eq!(rule.incoming_edges[&role(&symbols, "flow")], Limit::Unbounded);
        assert_eq!(rule.incoming_edges.len(), 1);
    }

    #[test]
    fn unresolved_base_morphs_are_dropped() {
        let mut symbols = Symbols::new();
        let tables = compile(
            &mut symbols,
            &[set(r#"{"morphingRules":[{"role":"activity","baseMorphs":["Task","Ghost"]}]}"#)],
            &[],
            1,
        );
        assert_eq!(tables.base_morphs, vec![StencilId::from(role(&symbols, "Task"))]);
    }

    #[test]
    fn layout_rules_use_weights_defaults() {
        let mut symbols = Symbols::new();
        let tables = compile(
            &mut symbols,
            &[set(r#"{"layoutRules":[{"role":"Task","in":{"t":4},
                "outs":[{"edgeRole":"flow","r":3},{"b":2}]}]}"#)],
            &[],
            1,
        );
        let rule = &tables.layout[&role(&symbols, "Task")];
        assert_eq!(rule.inbound, Some(Weights { t: 4, r: 1, b: 1, l: 1 }));
        assert_eq!(rule.outbound, None);
        assert_eq!(rule.outbound_by_edge.len(), 2);
        assert_eq!(rule.outbound_by_edge[0].edge_role, Some(role(&symbols, "flow")));
        assert_eq!(rule.outbound_by_edge[1].edge_role, None);
    }
}
