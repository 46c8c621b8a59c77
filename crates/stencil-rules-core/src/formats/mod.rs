//! # Formats Module
//!
//! Input document formats accepted by the engine.

pub mod source;

pub use source::{
    CardinalityRuleSpec, ConnectionRuleSpec, ConnectsSpec, ContainmentRuleSpec, EdgeLimitSpec,
    ExtensionSource, LayoutRuleSpec, MorphingRuleSpec, RuleSpec, StencilDescriptor,
    StencilSetSource, WeightsSpec,
};
