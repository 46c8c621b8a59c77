//! # Stencil Set Source Documents
//!
//! Typed records for the JSON documents the engine consumes: stencil sets,
//! extensions, and the rule block they both carry.
//!
//! The envelope (namespace, stencils) is decoded strictly. The rule block is
//! decoded per entry: an entry that cannot be decoded is skipped with a
//! warning, and a list field that is missing or not an array is empty. One
//! broken extension therefore never blocks the rest of a compile.

use crate::primitives::{DEFAULT_WEIGHT, MAX_STENCILS_PER_SET};
use crate::{RulesError, StencilKind, Weights};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

// =============================================================================
// LENIENT LIST DECODING
// =============================================================================

/// Decode a JSON array entry by entry, dropping entries that do not fit `T`.
fn decode_entries<T: DeserializeOwned>(field: &str, value: Value) -> Vec<T> {
    let Value::Array(items) = value else {
        if !value.is_null() {
            tracing::warn!(field, "rule list is not an array, treating as empty");
        }
        return Vec::new();
    };
    items
        .into_iter()
        .enumerate()
        .filter_map(|(index, item)| match serde_json::from_value(item) {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!(field, index, error = %e, "skipping malformed rule entry");
                None
            }
        })
        .collect()
}

fn lenient_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(decode_entries("list", value))
}

/// `to` may be a single role or a list of roles.
fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(vec![s]),
        other => Ok(decode_entries("to", other)),
    }
}

// =============================================================================
// RULE RECORDS
// =============================================================================

/// `connectionRules[]` entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ConnectionRuleSpec {
    pub role: String,
    #[serde(default, deserialize_with = "lenient_list")]
    pub connects: Vec<ConnectsSpec>,
}

/// One `{from, to}` pair of a connection rule.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ConnectsSpec {
    pub from: String,
    #[serde(default, deserialize_with = "one_or_many")]
    pub to: Vec<String>,
}

/// `cardinalityRules[]` entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardinalityRuleSpec {
    pub role: String,
    #[serde(default, deserialize_with = "lenient_list")]
    pub outgoing_edges: Vec<EdgeLimitSpec>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub incoming_edges: Vec<EdgeLimitSpec>,
    #[serde(default)]
    pub maximum_occurrence: Option<i64>,
}

/// Per-edge-role limit inside a cardinality rule.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EdgeLimitSpec {
    pub role: String,
    #[serde(default)]
    pub maximum: Option<i64>,
}

/// `containmentRules[]` entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ContainmentRuleSpec {
    pub role: String,
    #[serde(default, deserialize_with = "lenient_list")]
    pub contains: Vec<String>,
}

/// `morphingRules[]` entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MorphingRuleSpec {
    pub role: String,
    #[serde(default, deserialize_with = "lenient_list")]
    pub base_morphs: Vec<String>,
    #[serde(default)]
    pub preserve_bounds: Option<bool>,
    #[serde(default)]
    pub show_in_shape_menu: Option<bool>,
}

/// `layoutRules[]` entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LayoutRuleSpec {
    pub role: String,
    #[serde(default, rename = "in")]
    pub inbound: Option<WeightsSpec>,
    #[serde(default, rename = "out")]
    pub outbound: Option<WeightsSpec>,
    #[serde(default, rename = "ins", deserialize_with = "lenient_list")]
    pub inbound_by_edge: Vec<WeightsSpec>,
    #[serde(default, rename = "outs", deserialize_with = "lenient_list")]
    pub outbound_by_edge: Vec<WeightsSpec>,
}

/// Directional weights as written in a layout rule.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeightsSpec {
    #[serde(default)]
    pub edge_role: Option<String>,
    #[serde(default)]
    pub t: Option<u32>,
    #[serde(default)]
    pub r: Option<u32>,
    #[serde(default)]
    pub b: Option<u32>,
    #[serde(default)]
    pub l: Option<u32>,
}

impl WeightsSpec {
    /// Resolve to concrete weights. Unset and zero sides take the default.
    #[must_use]
    pub fn weights(&self) -> Weights {
        let side = |v: Option<u32>| v.filter(|&w| w > 0).unwrap_or(DEFAULT_WEIGHT);
        Weights {
            t: side(self.t),
            r: side(self.r),
            b: side(self.b),
            l: side(self.l),
        }
    }
}

// =============================================================================
// RULE SPEC
// =============================================================================

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct RawRuleSpec {
    #[serde(default)]
    connection_rules: Value,
    #[serde(default)]
    cardinality_rules: Value,
    #[serde(default)]
    containment_rules: Value,
    #[serde(default)]
    morphing_rules: Value,
    #[serde(default)]
    layout_rules: Value,
}

/// The rule block of a stencil set or extension.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(from = "RawRuleSpec")]
pub struct RuleSpec {
    pub connection_rules: Vec<ConnectionRuleSpec>,
    pub cardinality_rules: Vec<CardinalityRuleSpec>,
    pub containment_rules: Vec<ContainmentRuleSpec>,
    pub morphing_rules: Vec<MorphingRuleSpec>,
    pub layout_rules: Vec<LayoutRuleSpec>,
}

impl From<RawRuleSpec> for RuleSpec {
    fn from(raw: RawRuleSpec) -> Self {
        Self {
            connection_rules: decode_entries("connectionRules", raw.connection_rules),
            cardinality_rules: decode_entries("cardinalityRules", raw.cardinality_rules),
            containment_rules: decode_entries("containmentRules", raw.containment_rules),
            morphing_rules: decode_entries("morphingRules", raw.morphing_rules),
            layout_rules: decode_entries("layoutRules", raw.layout_rules),
        }
    }
}

impl RuleSpec {
    /// Decode a rule block from JSON text.
    pub fn from_json(json: &str) -> Result<Self, RulesError> {
        serde_json::from_str(json).map_err(|e| RulesError::InvalidSource(e.to_string()))
    }

    /// Append another rule block's entries after this one's.
    pub fn append(&mut self, other: &Self) {
        self.connection_rules.extend_from_slice(&other.connection_rules);
        self.cardinality_rules.extend_from_slice(&other.cardinality_rules);
        self.containment_rules.extend_from_slice(&other.containment_rules);
        self.morphing_rules.extend_from_slice(&other.morphing_rules);
        self.layout_rules.extend_from_slice(&other.layout_rules);
    }

    /// Total number of rule entries across all categories.
    #[must_use]
    pub fn len(&self) -> usize {
        self.connection_rules.len()
            + self.cardinality_rules.len()
            + self.containment_rules.len()
            + self.morphing_rules.len()
            + self.layout_rules.len()
    }

    /// Whether the block holds no rules.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// =============================================================================
// STENCILS, STENCIL SETS, EXTENSIONS
// =============================================================================

/// A stencil as declared in a stencil set or extension.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StencilDescriptor {
    /// Local id, qualified with the declaring namespace at compile time.
    pub id: String,
    #[serde(rename = "type")]
    pub kind: StencilKind,
    #[serde(default)]
    pub roles: Vec<String>,
}

impl StencilDescriptor {
    /// Create a descriptor.
    #[must_use]
    pub fn new(id: impl Into<String>, kind: StencilKind, roles: &[&str]) -> Self {
        Self {
            id: id.into(),
            kind,
            roles: roles.iter().map(|r| (*r).to_string()).collect(),
        }
    }

    /// Node descriptor helper.
    #[must_use]
    pub fn node(id: impl Into<String>, roles: &[&str]) -> Self {
        Self::new(id, StencilKind::Node, roles)
    }

    /// Edge descriptor helper.
    #[must_use]
    pub fn edge(id: impl Into<String>, roles: &[&str]) -> Self {
        Self::new(id, StencilKind::Edge, roles)
    }
}

/// A stencil set: namespace, stencils and rules.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StencilSetSource {
    pub namespace: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub stencils: Vec<StencilDescriptor>,
    #[serde(default)]
    pub rules: RuleSpec,
}

impl StencilSetSource {
    /// Create a stencil set source.
    #[must_use]
    pub fn new(namespace: impl Into<String>, stencils: Vec<StencilDescriptor>, rules: RuleSpec) -> Self {
        Self {
            namespace: namespace.into(),
            title: None,
            stencils,
            rules,
        }
    }

    /// Decode and validate a stencil set document.
    pub fn from_json(json: &str) -> Result<Self, RulesError> {
        let source: Self =
            serde_json::from_str(json).map_err(|e| RulesError::InvalidSource(e.to_string()))?;
        validate_envelope(&source.namespace, source.stencils.len())?;
        Ok(source)
    }
}

/// An extension contributing stencils and rules to another stencil set.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ExtensionSource {
    /// The extension's own namespace. Its stencils and rule tokens are
    /// qualified with the extended set's namespace.
    pub namespace: String,
    #[serde(default)]
    pub title: Option<String>,
    /// Namespace of the stencil set this extension applies to.
    pub extends: String,
    #[serde(default)]
    pub stencils: Vec<StencilDescriptor>,
    /// Stencils of the extended set to hide while this extension is active.
    #[serde(default, rename = "removestencils")]
    pub remove_stencils: Vec<String>,
    #[serde(default)]
    pub rules: RuleSpec,
}

impl ExtensionSource {
    /// Create an extension that only contributes rules.
    #[must_use]
    pub fn new(namespace: impl Into<String>, extends: impl Into<String>, rules: RuleSpec) -> Self {
        Self {
            namespace: namespace.into(),
            title: None,
            extends: extends.into(),
            stencils: Vec::new(),
            remove_stencils: Vec::new(),
            rules,
        }
    }

    /// Decode and validate an extension document.
    pub fn from_json(json: &str) -> Result<Self, RulesError> {
        let source: Self =
            serde_json::from_str(json).map_err(|e| RulesError::InvalidSource(e.to_string()))?;
        validate_envelope(&source.namespace, source.stencils.len())?;
        if source.extends.is_empty() {
            return Err(RulesError::InvalidSource(format!(
                "extension {} does not name the stencil set it extends",
                source.namespace
            )));
        }
        Ok(source)
    }
}

fn validate_envelope(namespace: &str, stencil_count: usize) -> Result<(), RulesError> {
    if namespace.is_empty() {
        return Err(RulesError::InvalidSource("empty namespace".to_string()));
    }
    if stencil_count > MAX_STENCILS_PER_SET {
        return Err(RulesError::InvalidSource(format!(
            "{} declares {} stencils, maximum is {}",
            namespace, stencil_count, MAX_STENCILS_PER_SET
        )));
    }
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn to_accepts_string_or_list() {
        let spec = RuleSpec::from_json(
            r#"{"connectionRules":[{"role":"Flow","connects":[
                {"from":"A","to":"B"},
                {"from":"A","to":["C","D"]}]}]}"#,
        )
        .expect("parse");
        let connects = &spec.connection_rules[0].connects;
        assert_eq!(connects[0].to, vec!["B"]);
        assert_eq!(connects[1].to, vec!["C", "D"]);
    }

    #[test]
    fn missing_lists_are_empty() {
        let spec = RuleSpec::from_json(
            r#"{"connectionRules":[{"role":"Flow"}],
                "containmentRules":[{"role":"Pool","contains":null}],
                "morphingRules":[{"role":"Event"}]}"#,
        )
        .expect("parse");
        assert!(spec.connection_rules[0].connects.is_empty());
        assert!(spec.containment_rules[0].contains.is_empty());
        assert!(spec.morphing_rules[0].base_morphs.is_empty());
        assert_eq!(spec.morphing_rules[0].show_in_shape_menu, None);
    }

    #[test]
    fn malformed_entries_are_skipped() {
        let spec = RuleSpec::from_json(
            r#"{"containmentRules":[{"contains":["Lane"]},{"role":"Pool","contains":["Lane"]}],
                "cardinalityRules":"oops"}"#,
        )
        .expect("parse");
        assert_eq!(spec.containment_rules.len(), 1);
        assert_eq!(spec.containment_rules[0].role, "Pool");
        assert!(spec.cardinality_rules.is_empty());
    }

    #[test]
    fn cardinality_fields_decode() {
        let spec = RuleSpec::from_json(
            r#"{"cardinalityRules":[{"role":"Gateway","maximumOccurrence":2,
                "outgoingEdges":[{"role":"SequenceFlow","maximum":1}],
                "incomingEdges":[{"role":"SequenceFlow"}]}]}"#,
        )
        .expect("parse");
        let rule = &spec.cardinality_rules[0];
        assert_eq!(rule.maximum_occurrence, Some(2));
        assert_eq!(rule.outgoing_edges[0].maximum, Some(1));
        assert_eq!(rule.incoming_edges[0].maximum, None);
    }

    #[test]
    fn weights_default_to_one() {
        let spec = WeightsSpec {
            t: Some(3),
            r: Some(0),
            ..WeightsSpec::default()
        };
        assert_eq!(spec.weights(), Weights { t: 3, r: 1, b: 1, l: 1 });
    }

    #[test]
    fn append_concatenates_in_order() {
        let mut base = RuleSpec::from_json(r#"{"containmentRules":[{"role":"A","contains":["B"]}]}"#)
            .expect("parse");
        let ext = RuleSpec::from_json(r#"{"containmentRules":[{"role":"C","contains":["D"]}]}"#)
            .expect("parse");
        base.append(&ext);
        let roles: Vec<_> = base.containment_rules.iter().map(|r| r.role.as_str()).collect();
        assert_eq!(roles, vec!["A", "C"]);
        assert_eq!(base.len(), 2);
    }

    #[test]
    fn stencil_set_envelope_is_strict() {
        assert!(StencilSetSource::from_json(r#"{"stencils":[]}"#).is_err());
        assert!(StencilSetSource::from_json(r#"{"namespace":""}"#).is_err());
        let set = StencilSetSource::from_json(
            r#"{"namespace":"http://x/bpmn#","stencils":[{"id":"Task","type":"node","roles":["activity"]}]}"#,
        )
        .expect("parse");
        assert_eq!(set.stencils[0].kind, StencilKind::Node);
        assert!(set.rules.is_empty());
    }

    #[test]
    fn extension_requires_extends() {
        let err = ExtensionSource::from_json(r#"{"namespace":"http://x/ext#","extends":""}"#);
        assert!(matches!(err, Err(RulesError::InvalidSource(_))));
        let ext = ExtensionSource::from_json(
            r#"{"namespace":"http://x/ext#","extends":"http://x/bpmn#","removestencils":["Task"]}"#,
        )
        .expect("parse");
        assert_eq!(ext.remove_stencils, vec!["Task"]);
    }
}
