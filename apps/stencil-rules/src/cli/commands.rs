//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands. Every
//! command writes either a human-readable report or, in JSON mode, a single
//! pretty-printed JSON document.

use crate::error::CliError;
use std::io::Write;
use stencil_rules_core::{ConnectQuery, RuleEngine, RulesError, StencilId};

// =============================================================================
// HELPERS
// =============================================================================

/// Resolve a bare or qualified stencil name.
fn resolve(engine: &RuleEngine, name: &str) -> Result<StencilId, CliError> {
    engine
        .resolve(name)
        .ok_or_else(|| CliError::UnknownStencil(name.to_string()))
}

fn resolve_opt(engine: &RuleEngine, name: Option<&str>) -> Result<Option<StencilId>, CliError> {
    name.map(|n| resolve(engine, n)).transpose()
}

/// Qualified name of a stencil, for output.
fn name(engine: &RuleEngine, id: StencilId) -> String {
    engine
        .stencil_name(id)
        .map_or_else(|| format!("#{}", id.0), str::to_string)
}

fn names(engine: &RuleEngine, ids: &[StencilId]) -> Vec<String> {
    ids.iter().map(|&id| name(engine, id)).collect()
}

fn write_json(out: &mut impl Write, value: &serde_json::Value) -> Result<(), CliError> {
    writeln!(
        out,
        "{}",
        serde_json::to_string_pretty(value).unwrap_or_default()
    )?;
    Ok(())
}

fn write_list(out: &mut impl Write, title: &str, items: &[String]) -> Result<(), CliError> {
    writeln!(out, "{} ({})", title, items.len())?;
    for item in items {
        writeln!(out, "  - {}", item)?;
    }
    Ok(())
}

fn verdict(allowed: bool) -> &'static str {
    if allowed { "allowed" } else { "denied" }
}

// =============================================================================
// STATUS COMMAND
// =============================================================================

/// Show loaded stencil sets, extensions and catalog size.
pub fn cmd_status(
    engine: &RuleEngine,
    json_mode: bool,
    out: &mut impl Write,
) -> Result<(), CliError> {
    let catalog = engine.catalog();
    let nodes = catalog.nodes().count();
    let edges = catalog.edges().count();
    let containers = engine.tables().containers.len();
    let base_morphs = names(engine, engine.base_morphs());

    if json_mode {
        let sets: Vec<serde_json::Value> = engine
            .stencil_sets()
            .iter()
            .map(|s| {
                serde_json::json!({
                    "namespace": s.namespace,
                    "title": s.title,
                    "stencils": s.stencils.len(),
                    "rules": s.rules.len()
                })
            })
            .collect();
        let extensions: Vec<serde_json::Value> = engine
            .extensions()
            .iter()
            .map(|e| {
                serde_json::json!({
                    "namespace": e.namespace,
                    "extends": e.extends,
                    "stencils": e.stencils.len(),
                    "removed": e.remove_stencils.len(),
                    "rules": e.rules.len()
                })
            })
            .collect();
        let output = serde_json::json!({
            "generation": engine.generation(),
            "stencil_sets": sets,
            "extensions": extensions,
            "node_stencils": nodes,
            "edge_stencils": edges,
            "containers": containers,
            "morphing_rules": engine.contains_morphing_rules(),
            "base_morphs": base_morphs
        });
        return write_json(out, &output);
    }

    writeln!(out, "Stencil Rules Status")?;
    writeln!(out, "====================")?;
    writeln!(out, "Generation: {}", engine.generation())?;
    writeln!(out)?;
    for set in engine.stencil_sets() {
        writeln!(
            out,
            "Stencil set: {} ({} stencils, {} rules)",
            set.namespace,
            set.stencils.len(),
            set.rules.len()
        )?;
    }
    for ext in engine.extensions() {
        writeln!(out, "Extension:   {} -> {}", ext.namespace, ext.extends)?;
    }
    writeln!(out)?;
    writeln!(out, "Node stencils:  {}", nodes)?;
    writeln!(out, "Edge stencils:  {}", edges)?;
    writeln!(out, "Containers:     {}", containers)?;
    writeln!(out, "Base morphs:    {}", base_morphs.len())?;

    Ok(())
}

// =============================================================================
// CONNECT COMMAND
// =============================================================================

/// Check whether `edge` may connect `source` to `target`.
pub fn cmd_connect(
    engine: &RuleEngine,
    json_mode: bool,
    edge: &str,
    source: Option<&str>,
    target: Option<&str>,
    out: &mut impl Write,
) -> Result<(), CliError> {
    let edge_id = resolve(engine, edge)?;
    let source_id = resolve_opt(engine, source)?;
    let target_id = resolve_opt(engine, target)?;

    let mut query = ConnectQuery::new(edge_id);
    if let Some(id) = source_id {
        query = query.from(id);
    }
    if let Some(id) = target_id {
        query = query.to(id);
    }
    let allowed = engine.can_connect(&query)?;
    tracing::debug!(edge, ?source, ?target, allowed, "connect");

    if json_mode {
        let output = serde_json::json!({
            "edge": name(engine, edge_id),
            "source": source_id.map(|id| name(engine, id)),
            "target": target_id.map(|id| name(engine, id)),
            "allowed": allowed
        });
        return write_json(out, &output);
    }

    writeln!(
        out,
        "{} --[{}]--> {}: {}",
        source.unwrap_or("*"),
        edge,
        target.unwrap_or("*"),
        verdict(allowed)
    )?;
    Ok(())
}

// =============================================================================
// CONTAIN COMMAND
// =============================================================================

/// Check whether `container` may contain `contained`.
pub fn cmd_contain(
    engine: &RuleEngine,
    json_mode: bool,
    container: &str,
    contained: &str,
    out: &mut impl Write,
) -> Result<(), CliError> {
    let container_id = resolve(engine, container)?;
    let contained_id = resolve(engine, contained)?;
    let allowed = engine.can_contain(container_id, contained_id);
    let is_container = engine.is_container(container_id);

    if json_mode {
        let output = serde_json::json!({
            "container": name(engine, container_id),
            "contained": name(engine, contained_id),
            "allowed": allowed,
            "is_container": is_container
        });
        return write_json(out, &output);
    }

    writeln!(out, "{} in {}: {}", contained, container, verdict(allowed))?;
    if !is_container {
        writeln!(out, "({} contains nothing)", container)?;
    }
    Ok(())
}

// =============================================================================
// MORPH COMMANDS
// =============================================================================

/// List the stencils `stencil` can be morphed into.
pub fn cmd_morphs(
    engine: &RuleEngine,
    json_mode: bool,
    stencil: &str,
    out: &mut impl Write,
) -> Result<(), CliError> {
    let id = resolve(engine, stencil)?;
    let morphs = names(engine, &engine.morph_stencils(id));
    let preserve_bounds = engine.preserve_bounds(id);
    let show_in_shape_menu = engine.show_in_shape_menu(id);

    if json_mode {
        let output = serde_json::json!({
            "stencil": name(engine, id),
            "morphs": morphs,
            "preserve_bounds": preserve_bounds,
            "show_in_shape_menu": show_in_shape_menu
        });
        return write_json(out, &output);
    }

    write_list(out, &format!("Morphs of {}", stencil), &morphs)?;
    writeln!(out, "Preserve bounds:    {}", preserve_bounds)?;
    writeln!(out, "Show in shape menu: {}", show_in_shape_menu)?;
    Ok(())
}

/// Pick the edge stencil joining `source` to `target`.
pub fn cmd_connect_morph(
    engine: &RuleEngine,
    json_mode: bool,
    source: &str,
    target: &str,
    out: &mut impl Write,
) -> Result<(), CliError> {
    let source_id = resolve(engine, source)?;
    let target_id = resolve(engine, target)?;
    let edge = engine
        .connect_morph(source_id, target_id)
        .map(|id| name(engine, id));

    if json_mode {
        let output = serde_json::json!({
            "source": name(engine, source_id),
            "target": name(engine, target_id),
            "edge": edge
        });
        return write_json(out, &output);
    }

    match edge {
        Some(edge) => writeln!(out, "{} --[{}]--> {}", source, edge, target)?,
        None => writeln!(out, "No edge stencil joins {} to {}", source, target)?,
    }
    Ok(())
}

// =============================================================================
// LAYOUT COMMAND
// =============================================================================

/// Show the layout weights of `stencil`, optionally for a connecting edge.
pub fn cmd_layout(
    engine: &RuleEngine,
    json_mode: bool,
    stencil: &str,
    edge: Option<&str>,
    out: &mut impl Write,
) -> Result<(), CliError> {
    let id = resolve(engine, stencil)?;
    let edge_id = resolve_opt(engine, edge)?;
    let layout = engine.layouting_rules(id, edge_id.map(Into::into));

    if json_mode {
        let output = serde_json::json!({
            "stencil": name(engine, id),
            "edge": edge_id.map(|e| name(engine, e)),
            "layout": layout
        });
        return write_json(out, &output);
    }

    writeln!(out, "Layout of {}", stencil)?;
    for (label, w) in [("in", layout.inbound), ("out", layout.outbound)] {
        writeln!(out, "  {:<3} t={} r={} b={} l={}", label, w.t, w.r, w.b, w.l)?;
    }
    Ok(())
}

// =============================================================================
// ENUMERATION COMMANDS
// =============================================================================

/// List edge stencils that may leave `source` or enter `target`.
pub fn cmd_edges(
    engine: &RuleEngine,
    json_mode: bool,
    source: Option<&str>,
    target: Option<&str>,
    out: &mut impl Write,
) -> Result<(), CliError> {
    let (title, end, ids) = match (source, target) {
        (Some(s), _) => ("Outgoing edges of", s, engine.outgoing_edge_stencils(resolve(engine, s)?)),
        (None, Some(t)) => ("Incoming edges of", t, engine.incoming_edge_stencils(resolve(engine, t)?)),
        (None, None) => return Err(RulesError::MissingEndpoint.into()),
    };
    let edges = names(engine, &ids);

    if json_mode {
        let output = serde_json::json!({
            "source": source,
            "target": target,
            "edges": edges
        });
        return write_json(out, &output);
    }

    write_list(out, &format!("{} {}", title, end), &edges)
}

/// List node stencils `edge` may connect from `source` or to `target`.
pub fn cmd_endpoints(
    engine: &RuleEngine,
    json_mode: bool,
    edge: &str,
    source: Option<&str>,
    target: Option<&str>,
    out: &mut impl Write,
) -> Result<(), CliError> {
    let edge_id = resolve(engine, edge)?;
    let (title, ids) = match (source, target) {
        (Some(s), _) => (
            format!("Targets of {} from {}", edge, s),
            engine.target_stencils(Some(resolve(engine, s)?.into()), edge_id),
        ),
        (None, Some(t)) => (
            format!("Sources of {} to {}", edge, t),
            engine.source_stencils(edge_id, Some(resolve(engine, t)?.into())),
        ),
        (None, None) => return Err(RulesError::MissingEndpoint.into()),
    };
    let stencils = names(engine, &ids);

    if json_mode {
        let output = serde_json::json!({
            "edge": name(engine, edge_id),
            "source": source,
            "target": target,
            "stencils": stencils
        });
        return write_json(out, &output);
    }

    write_list(out, &title, &stencils)
}
