//! # Morphing Queries
//!
//! Type substitution: which stencils a shape can be morphed into, and which
//! connector to insert when a morph leaves two shapes joined by nothing.

use crate::RuleEngine;
use crate::shape::Element;
use crate::StencilId;

impl RuleEngine {
    /// Stencils the element's stencil can be morphed into, itself included.
    ///
    /// The union of the morph groups of all its roles, deduplicated, with
    /// base morphs first. Within each half the order is stable.
    pub fn morph_stencils<'a>(&self, element: impl Into<Element<'a>>) -> Vec<StencilId> {
        let tables = self.tables();
        let Some(stencil) = tables.catalog.get(element.into().stencil()) else {
            return Vec::new();
        };
        let mut morphs: Vec<StencilId> = Vec::new();
        for &role in &stencil.roles {
            let group = self.morph_group(role);
            for id in group.iter() {
                if !morphs.contains(id) {
                    morphs.push(*id);
                }
            }
        }
        morphs.sort_by_key(|id| !tables.is_base_morph(*id));
        morphs
    }

    /// Every designated base morph, declaration order.
    #[must_use]
    pub fn base_morphs(&self) -> &[StencilId] {
        &self.tables().base_morphs
    }

    /// The edge stencil to use between `source` and `target`, if any.
    ///
    /// Candidates are edges that may both leave `source` and arrive at
    /// `target`. A base morph among them wins, in base-morph order; otherwise
    /// the first candidate in catalog order.
    pub fn connect_morph<'a>(
        &self,
        source: impl Into<Element<'a>>,
        target: impl Into<Element<'a>>,
    ) -> Option<StencilId> {
        let outgoing = self.outgoing_edge_stencils(source);
        let candidates: Vec<StencilId> = self
            .incoming_edge_stencils(target)
            .into_iter()
            .filter(|edge| outgoing.contains(edge))
            .collect();
        self.base_morphs()
            .iter()
            .copied()
            .find(|edge| candidates.contains(edge))
            .or_else(|| candidates.first().copied())
    }

    /// Whether any loaded stencil set declares a morphing rule.
    #[must_use]
    pub fn contains_morphing_rules(&self) -> bool {
        !self.tables().morphing.is_empty()
    }

    /// Whether morphing this element keeps its bounds.
    pub fn preserve_bounds<'a>(&self, element: impl Into<Element<'a>>) -> bool {
        let tables = self.tables();
        tables
            .catalog
            .get(element.into().stencil())
            .is_some_and(|s| tables.morph_flags(s).any(|f| f.preserve_bounds.unwrap_or(false)))
    }

    /// Whether the shape menu offers this element's stencil.
    ///
    /// Stencils without any morphing rule are shown.
    pub fn show_in_shape_menu<'a>(&self, element: impl Into<Element<'a>>) -> bool {
        let tables = self.tables();
        let Some(stencil) = tables.catalog.get(element.into().stencil()) else {
            return false;
        };
        let mut flags = tables.morph_flags(stencil).peekable();
        if flags.peek().is_none() {
            return true;
        }
        flags.any(|f| f.show_in_shape_menu.unwrap_or(true))
    }
}

#[cfg(test)]
mod tests {
    use crate::formats::{RuleSpec, StencilDescriptor, StencilSetSource};
    use crate::RuleEngine;

    fn engine(rules: &str) -> RuleEngine {
        let mut engine = RuleEngine::new();
        engine
            .load_stencil_set(StencilSetSource::new(
                "http://example.org/bpmn#",
                vec![
                    StencilDescriptor::node("Task", &["activity"]),
                    StencilDescriptor::node("SubProcess", &["activity"]),
                    StencilDescriptor::node("Note", &[]),
                    StencilDescriptor::edge("SequenceFlow", &["flow"]),
                    StencilDescriptor::edge("MessageFlow", &["flow"]),
                ],
                RuleSpec::from_json(rules).expect("rules"),
            ))
            .expect("load");
        engine
    }

    #[test]
    fn base_morphs_sort_first() {
        let engine = engine(r#"{"morphingRules":[{"role":"activity","baseMorphs":["SubProcess"]}]}"#);
        let task = engine.resolve("Task").expect("task");
        let sub = engine.resolve("SubProcess").expect("sub");
        assert_eq!(engine.morph_stencils(task), vec![sub, task]);
        assert_eq!(engine.base_morphs(), &[sub]);
        assert!(engine.contains_morphing_rules());
    }

    #[test]
    fn no_morphing_rule_means_no_morphs() {
        let engine = engine("{}");
        let note = engine.resolve("Note").expect("note");
        assert!(engine.morph_stencils(note).is_empty());
        assert!(!engine.contains_morphing_rules());
        assert!(engine.show_in_shape_menu(note));
        assert!(!engine.preserve_bounds(note));
    }

    #[test]
    fn flags_are_or_combined() {
        let engine = engine(
            r#"{"morphingRules":[
                {"role":"activity","showInShapeMenu":false},
                {"role":"Task","preserveBounds":true}]}"#,
        );
        let task = engine.resolve("Task").expect("task");
        let sub = engine.resolve("SubProcess").expect("sub");
        assert!(engine.show_in_shape_menu(task));
        assert!(!engine.show_in_shape_menu(sub));
        assert!(engine.preserve_bounds(task));
        assert!(!engine.preserve_bounds(sub));
    }

    #[test]
    fn connect_morph_prefers_base_edges() {
        let engine = engine(
            r#"{"connectionRules":[{"role":"flow","connects":[{"from":"activity","to":"activity"}]}],
                "morphingRules":[{"role":"flow","baseMorphs":["MessageFlow"]}]}"#,
        );
        let task = engine.resolve("Task").expect("task");
        let note = engine.resolve("Note").expect("note");
        let message = engine.resolve("MessageFlow").expect("message");
        assert_eq!(engine.connect_morph(task, task), Some(message));
        assert_eq!(engine.connect_morph(task, note), None);
    }

    #[test]
    fn connect_morph_falls_back_to_first_candidate() {
        let engine = engine(
            r#"{"connectionRules":[{"role":"flow","connects":[{"from":"activity","to":"activity"}]}]}"#,
        );
        let task = engine.resolve("Task").expect("task");
        let sequence = engine.resolve("SequenceFlow").expect("sequence");
        assert_eq!(engine.connect_morph(task, task), Some(sequence));
    }
}
