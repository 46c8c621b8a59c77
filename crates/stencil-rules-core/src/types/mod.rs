//! # Core Type Definitions
//!
//! This module contains the value types shared by every part of the engine:
//! - Interned identifiers (`RoleId`, `StencilId`, `ShapeId`)
//! - Stencil classification (`StencilKind`)
//! - Cardinality limits (`Limit`)
//! - Directional layout weights (`Weights`, `Layout`)
//! - Error types (`RulesError`)
//!
//! ## Determinism Guarantees
//!
//! All types in this module:
//! - Use integer arithmetic only (no floating-point)
//! - Implement `Ord` for deterministic ordering in `BTreeMap`/`BTreeSet`

use crate::primitives::DEFAULT_WEIGHT;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// =============================================================================
// IDENTIFIERS
// =============================================================================

/// Interned, namespaced role.
///
/// Produced by [`crate::Symbols`]. Ids are never reused, so a `RoleId` stays
/// valid across recompiles of the same engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RoleId(pub u32);

/// Interned, namespaced stencil id.
///
/// A stencil's own id is always one of its roles, so stencil ids and role ids
/// share one symbol table and convert freely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StencilId(pub u32);

impl StencilId {
    /// The role carrying the same name as this stencil.
    #[must_use]
    pub const fn as_role(self) -> RoleId {
        RoleId(self.0)
    }
}

impl From<RoleId> for StencilId {
    fn from(role: RoleId) -> Self {
        Self(role.0)
    }
}

/// Identity of a live shape instance in the host diagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ShapeId(pub u64);

// =============================================================================
// STENCIL KIND
// =============================================================================

/// Whether a stencil describes a node or an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StencilKind {
    Node,
    Edge,
}

// =============================================================================
// LIMIT
// =============================================================================

/// Upper bound on a number of edges or children.
///
/// "Not yet computed" never appears as a `Limit`: it is the absence of a
/// cache entry. A missing rule is `Unbounded`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Limit {
    /// No upper bound.
    #[default]
    Unbounded,
    /// At most this many.
    AtMost(u32),
}

impl Limit {
    /// Decode a JSON `maximum` value. Negative values mean unbounded.
    #[must_use]
    pub fn from_maximum(maximum: i64) -> Self {
        match u32::try_from(maximum) {
            Ok(n) => Self::AtMost(n),
            Err(_) if maximum < 0 => Self::Unbounded,
            Err(_) => Self::AtMost(u32::MAX),
        }
    }

    /// The tighter of two limits.
    #[must_use]
    pub fn min(self, other: Self) -> Self {
        match (self, other) {
            (Self::Unbounded, x) | (x, Self::Unbounded) => x,
            (Self::AtMost(a), Self::AtMost(b)) => Self::AtMost(a.min(b)),
        }
    }

    /// Whether one more item fits when `count` already exist.
    #[must_use]
    pub fn admits(self, count: usize) -> bool {
        match self {
            Self::Unbounded => true,
            Self::AtMost(n) => count < n as usize,
        }
    }
}

// =============================================================================
// LAYOUT WEIGHTS
// =============================================================================

/// Per-side stiffness weights: top, right, bottom, left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Weights {
    pub t: u32,
    pub r: u32,
    pub b: u32,
    pub l: u32,
}

impl Default for Weights {
    fn default() -> Self {
        Self {
            t: DEFAULT_WEIGHT,
            r: DEFAULT_WEIGHT,
            b: DEFAULT_WEIGHT,
            l: DEFAULT_WEIGHT,
        }
    }
}

impl Weights {
    /// Element-wise maximum.
    #[must_use]
    pub fn max(self, other: Self) -> Self {
        Self {
            t: self.t.max(other.t),
            r: self.r.max(other.r),
            b: self.b.max(other.b),
            l: self.l.max(other.l),
        }
    }
}

/// Resolved inbound and outbound weights for one shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Layout {
    #[serde(rename = "in")]
    pub inbound: Weights,
    #[serde(rename = "out")]
    pub outbound: Weights,
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors surfaced by the rules engine.
///
/// Rule content never produces an error: malformed entries are skipped and
/// unknown roles simply fail to match. These variants cover invalid
/// arguments and invalid registration requests only.
#[derive(Debug, Error)]
pub enum RulesError {
    /// A connection query named neither a source nor a target.
    #[error("Connection query needs a source or a target")]
    MissingEndpoint,

    /// An extension extends a stencil set that is not registered.
    #[error("Unknown stencil set: {0}")]
    UnknownStencilSet(String),

    /// The named extension is not loaded.
    #[error("Unknown extension: {0}")]
    UnknownExtension(String),

    /// A stencil set or extension document could not be decoded.
    #[error("Invalid stencil set source: {0}")]
    InvalidSource(String),
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_from_negative_is_unbounded() {
        assert_eq!(Limit::from_maximum(-1), Limit::Unbounded);
        assert_eq!(Limit::from_maximum(3), Limit::AtMost(3));
    }

    #[test]
    fn limit_min_prefers_bounded() {
        assert_eq!(Limit::Unbounded.min(Limit::AtMost(2)), Limit::AtMost(2));
        assert_eq!(Limit::AtMost(5).min(Limit::AtMost(2)), Limit::AtMost(2));
        assert_eq!(Limit::Unbounded.min(Limit::Unbounded), Limit::Unbounded);
    }

    #[test]
    fn limit_admits_below_bound() {
        assert!(Limit::AtMost(1).admits(0));
        assert!(!Limit::AtMost(1).admits(1));
        assert!(!Limit::AtMost(0).admits(0));
        assert!(Limit::Unbounded.admits(usize::MAX));
    }

    #[test]
    fn weights_default_and_max() {
        let w = Weights::default();
        assert_eq!(w, Weights { t: 1, r: 1, b: 1, l: 1 });
        let m = w.max(Weights { t: 3, r: 0, b: 2, l: 1 });
        assert_eq!(m, Weights { t: 3, r: 1, b: 2, l: 1 });
    }

    #[test]
    fn stencil_id_converts_to_role() {
        let id = StencilId(7);
        assert_eq!(id.as_role(), RoleId(7));
        assert_eq!(StencilId::from(RoleId(7)), id);
    }
}
