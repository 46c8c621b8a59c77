//! # Layout Weights
//!
//! Per-side stiffness of a shape, consumed by the host's edge router to bias
//! which side edges attach to.

use crate::shape::Element;
use crate::tables::LayoutRule;
use crate::{Layout, RuleEngine, Weights};

impl RuleEngine {
    /// Inbound and outbound weights of `shape`, optionally for a specific
    /// connecting edge.
    ///
    /// Every role of the shape with a layout rule contributes its `in`/`out`
    /// weights and the matching `ins`/`outs` entry; contributions fold by
    /// element-wise maximum. Sides nothing mentions stay at 1.
    pub fn layouting_rules<'a>(
        &self,
        shape: impl Into<Element<'a>>,
        edge: Option<Element<'a>>,
    ) -> Layout {
        let tables = self.tables();
        let Some(stencil) = tables.catalog.get(shape.into().stencil()) else {
            return Layout::default();
        };
        let edge = edge.and_then(|e| tables.catalog.get(e.stencil()));

        let mut inbound = Weights::default();
        let mut outbound = Weights::default();
        for rule in stencil.roles.iter().filter_map(|role| tables.layout.get(role)) {
            let ins = rule
                .inbound
                .into_iter()
                .chain(LayoutRule::select(&rule.inbound_by_edge, edge));
            inbound = ins.fold(inbound, Weights::max);

            let outs = rule
                .outbound
                .into_iter()
                .chain(LayoutRule::select(&rule.outbound_by_edge, edge));
            outbound = outs.fold(outbound, Weights::max);
        }
        Layout { inbound, outbound }
    }
}
